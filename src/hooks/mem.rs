//! Module for memory protection logic

use std::io;

/// Attempts to apply virtual protect READ/WRITE access
/// over the memory at the provided address for the length
/// provided. Restores the original flags after the action
/// is complete
///
/// ## Safety
///
/// This function acquires the proper write permissions over
/// `addr` for the required `length` but it is unsound if
/// memory past `length` is accessed
///
/// ## Arguments
/// * addr - The address to protect
/// * length - The protected region
/// * action - The action to execute on the memory
#[cfg(windows)]
pub unsafe fn use_memory<F, P, R>(addr: *const P, length: usize, action: F) -> io::Result<R>
where
    F: FnOnce(*mut P) -> R,
{
    use windows_sys::Win32::{
        Foundation::FALSE,
        System::Memory::{VirtualProtect, PAGE_PROTECTION_FLAGS, PAGE_READWRITE},
    };

    // Tmp variable to store the old state
    let mut old_protect: PAGE_PROTECTION_FLAGS = 0;

    // Apply the new read write flags
    if VirtualProtect(addr.cast(), length, PAGE_READWRITE, &mut old_protect) == FALSE {
        return Err(io::Error::last_os_error());
    }

    // Apply the action on the now mutable memory area
    let result = action(addr.cast_mut());

    // Restore the original flags
    VirtualProtect(addr.cast(), length, old_protect, &mut old_protect);

    Ok(result)
}

/// Without page protection the memory is expected to already be writable,
/// used when exercising hooks against images built on the heap
#[cfg(not(windows))]
pub unsafe fn use_memory<F, P, R>(addr: *const P, _length: usize, action: F) -> io::Result<R>
where
    F: FnOnce(*mut P) -> R,
{
    Ok(action(addr.cast_mut()))
}
