//! The external bootstrap started right before the game's startup routine.
//! What it does is outside the proxy, the proxy only loads it and calls its
//! entry export with the proxy's module handle.

use crate::config::BootstrapConfig;
use std::path::{Path, PathBuf};

/// Bootstrap library and the export to call on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalBootstrap {
    library: PathBuf,
    entry: String,
}

impl ExternalBootstrap {
    /// Resolves the configured bootstrap against the game directory
    pub fn new(game_dir: &Path, config: &BootstrapConfig) -> Self {
        Self {
            library: game_dir.join(&config.library),
            entry: config.entry.clone(),
        }
    }

    /// Absolute path of the bootstrap library
    pub fn library(&self) -> &Path {
        &self.library
    }

    /// Name of the export called on the bootstrap library
    pub fn entry(&self) -> &str {
        &self.entry
    }
}

#[cfg(windows)]
mod attach {
    use super::ExternalBootstrap;
    use crate::{error::BootstrapError, os, ui::error_message};
    use log::{error, info};
    use windows_sys::Win32::Foundation::HMODULE;

    /// `void EntryPoint(HMODULE)`
    type EntryPointFn = unsafe extern "C" fn(HMODULE);

    impl ExternalBootstrap {
        /// Loads the bootstrap library and calls its entry with `module`
        pub fn attach(&self, module: HMODULE) -> Result<(), BootstrapError> {
            let handle = os::load_library(&self.library).map_err(|source| BootstrapError::Load {
                path: self.library.clone(),
                source,
            })?;

            let entry = format!("{}\0", self.entry);
            let address = unsafe { os::proc_address(handle, &entry) }.ok_or_else(|| {
                BootstrapError::MissingEntry {
                    path: self.library.clone(),
                    entry: self.entry.clone(),
                }
            })?;

            info!("Starting bootstrap {}", self.library.display());

            let entry_point: EntryPointFn = unsafe { std::mem::transmute(address.get()) };
            unsafe { entry_point(module) };

            Ok(())
        }

        /// Runs [`ExternalBootstrap::attach`] reporting failures to the user.
        /// The game starts without the bootstrap when it fails
        pub fn run(&self, module: HMODULE) {
            if let Err(err) = self.attach(module) {
                error!("{err}");
                error_message("Failed to start bootstrap", &err.to_string());
            }
        }
    }
}
