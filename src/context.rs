use std::{
    env::current_exe,
    io,
    path::{Path, PathBuf},
};

/// Paths describing the game the proxy was loaded into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameContext {
    /// Path of the running executable
    pub exe_path: PathBuf,
    /// Directory containing the executable
    pub game_dir: PathBuf,
    /// Unity data directory (`<exe name>_Data`)
    pub data_dir: PathBuf,
}

impl GameContext {
    /// Derives the context from the executable path
    pub fn from_exe(exe_path: &Path) -> Option<Self> {
        let game_dir = exe_path.parent()?.to_path_buf();

        let mut data_dir_name = exe_path.file_stem()?.to_os_string();
        data_dir_name.push("_Data");
        let data_dir = game_dir.join(data_dir_name);

        Some(Self {
            exe_path: exe_path.to_path_buf(),
            game_dir,
            data_dir,
        })
    }

    /// Context of the current process
    pub fn current() -> io::Result<Self> {
        let exe_path = current_exe()?;
        Self::from_exe(&exe_path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "Missing parent directory to current exe path",
            )
        })
    }

    /// Whether the process looks like the game. Other processes can pick up
    /// the proxy from the game directory, they lack the data directory
    pub fn is_game(&self) -> bool {
        self.data_dir.is_dir()
    }
}

/// Detects Wine through the export it adds to `ntdll.dll`
#[cfg(windows)]
pub fn is_wine() -> bool {
    crate::os::module_handle("ntdll.dll")
        .ok()
        .and_then(|ntdll| unsafe { crate::os::proc_address(ntdll, "wine_get_version\0") })
        .is_some()
}
