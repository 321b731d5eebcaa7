use crate::constants::PROXIED_LIBRARY;
use std::path::{Path, PathBuf};

/// Path of the genuine library inside `system_dir`. The system directory is
/// used instead of the search order which would resolve back to the proxy
pub fn library_path(system_dir: &Path) -> PathBuf {
    system_dir.join(PROXIED_LIBRARY)
}

#[cfg(windows)]
pub use genuine::GenuineLibrary;

#[cfg(windows)]
mod genuine {
    use super::library_path;
    use crate::{
        os,
        proxy::{ExportSymbol, SymbolSource},
    };
    use std::{
        io,
        num::NonZeroUsize,
        path::{Path, PathBuf},
    };
    use windows_sys::Win32::Foundation::HMODULE;

    /// Handle to the genuine library loaded from the system directory.
    /// The library stays loaded for the lifetime of the process
    pub struct GenuineLibrary {
        handle: HMODULE,
        path: PathBuf,
    }

    impl GenuineLibrary {
        /// Loads the genuine library from the system directory
        pub fn load() -> io::Result<Self> {
            let path = library_path(&os::system_directory()?);
            let handle = os::load_library(&path)?;
            Ok(Self { handle, path })
        }

        /// The path the library was loaded from
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl SymbolSource for GenuineLibrary {
        fn resolve(&self, symbol: &ExportSymbol) -> Option<NonZeroUsize> {
            unsafe { os::proc_address(self.handle, symbol.c_name) }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::library_path;
    use std::path::Path;

    #[test]
    fn library_path_is_inside_system_directory() {
        let path = library_path(Path::new("C:\\Windows\\System32"));
        assert_eq!(path.file_name().and_then(|name| name.to_str()), Some("winhttp.dll"));
        assert!(path.starts_with("C:\\Windows\\System32"));
    }
}
