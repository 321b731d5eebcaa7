//! Thin wrappers over the Win32 module loader calls used across the crate

use std::{
    ffi::{OsStr, OsString},
    io,
    num::NonZeroUsize,
    os::windows::ffi::{OsStrExt, OsStringExt},
    path::{Path, PathBuf},
};
use windows_sys::Win32::{
    Foundation::{HMODULE, MAX_PATH},
    System::{
        LibraryLoader::{GetModuleHandleW, GetProcAddress, LoadLibraryW},
        SystemInformation::GetSystemDirectoryW,
    },
};

/// Encodes `value` as a null terminated UTF-16 string
pub fn wide_null(value: impl AsRef<OsStr>) -> Vec<u16> {
    value.as_ref().encode_wide().chain([0]).collect()
}

/// Obtains the handle of an already loaded module by name
pub fn module_handle(name: impl AsRef<OsStr>) -> io::Result<HMODULE> {
    let name = wide_null(name);
    let handle = unsafe { GetModuleHandleW(name.as_ptr()) };
    if handle == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(handle)
}

/// Loads the library at the provided absolute `path`
pub fn load_library(path: &Path) -> io::Result<HMODULE> {
    let path = wide_null(path);
    let handle = unsafe { LoadLibraryW(path.as_ptr()) };
    if handle == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(handle)
}

/// Resolves an exported symbol from `module`
///
/// ## Safety
///
/// `module` must be a handle to a loaded module
///
/// ## Arguments
/// * `module` - The module to search
/// * `c_name` - Null terminated symbol name
pub unsafe fn proc_address(module: HMODULE, c_name: &str) -> Option<NonZeroUsize> {
    debug_assert!(c_name.ends_with('\0'), "symbol name must be null terminated");

    GetProcAddress(module, c_name.as_ptr()).and_then(|function| NonZeroUsize::new(function as usize))
}

/// Provides the system directory (usually `C:\Windows\System32`)
pub fn system_directory() -> io::Result<PathBuf> {
    let mut buffer = vec![0u16; MAX_PATH as usize];

    loop {
        let length =
            unsafe { GetSystemDirectoryW(buffer.as_mut_ptr(), buffer.len() as u32) } as usize;

        if length == 0 {
            return Err(io::Error::last_os_error());
        }

        // Too small, the returned length includes the null terminator
        if length > buffer.len() {
            buffer.resize(length, 0);
            continue;
        }

        buffer.truncate(length);
        return Ok(PathBuf::from(OsString::from_wide(&buffer)));
    }
}
