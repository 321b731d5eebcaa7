//! Hook on the host's startup routine.
//!
//! The host executable calls its startup routine through an import address
//! table slot. Installing the hook swaps that slot for [`startup_trampoline`]
//! which runs the bootstrap once and then continues into the original routine
//! with the arguments it was given.

use super::{mem::use_memory, pe::ImportTable};
use crate::error::HookError;
use log::{debug, error, info};
use std::{
    mem::size_of,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Once, OnceLock,
    },
};

/// Module handle as handed out by the loader (`HMODULE` / `HINSTANCE`)
pub type ModuleHandle = isize;

/// `int UnityMain(HINSTANCE, HINSTANCE, LPWSTR, int)`
pub type StartupFn = unsafe extern "C" fn(ModuleHandle, ModuleHandle, *mut u16, i32) -> i32;

/// Callback run before the host starts, given the proxy's own module handle
pub type Bootstrap = Box<dyn Fn(ModuleHandle) + Send + Sync>;

/// The process wide entry hook used by [`startup_trampoline`]
pub static ENTRY_HOOK: EntryHook = EntryHook::new();

/// State captured when the hook is installed, never modified afterwards
struct HookState {
    /// Name of the hooked routine
    symbol: String,
    /// The routine the slot pointed to before patching
    original: StartupFn,
    /// Handle of the proxy library passed to the bootstrap
    library: ModuleHandle,
    bootstrap: Bootstrap,
    bootstrapped: Once,
}

/// Outcome of a successful [`EntryHook::install`]
#[derive(Debug, PartialEq, Eq)]
pub enum Installed {
    /// The slot was patched, `library` is the module the routine is imported from
    Hooked { library: String },
    /// A previous call already installed the hook
    AlreadyInstalled,
}

/// Registry for the single startup hook of a process. Holding state marks
/// the hook as installed, it is never cleared.
pub struct EntryHook {
    state: OnceLock<HookState>,
}

impl EntryHook {
    pub const fn new() -> Self {
        Self {
            state: OnceLock::new(),
        }
    }

    /// Whether the hook has been installed
    pub fn is_installed(&self) -> bool {
        self.state.get().is_some()
    }

    /// Replaces the import slot for `symbol` in the module mapped at `image`
    /// with `trampoline`
    ///
    /// The original address is published before the slot is swapped so the
    /// trampoline can never observe a missing original. Any failure leaves
    /// both the slot and the registry untouched.
    ///
    /// ## Safety
    ///
    /// `image` must be the base of a mapped module and `trampoline` must
    /// enter this registry with the arguments it receives
    ///
    /// ## Arguments
    /// * `image`      - Base address of the module whose imports are patched
    /// * `symbol`     - Name of the imported startup routine
    /// * `library`    - Handle of the proxy library, passed to the bootstrap
    /// * `trampoline` - Function stored into the slot
    /// * `bootstrap`  - Callback run once before the original routine
    pub unsafe fn install(
        &self,
        image: *const u8,
        symbol: &str,
        library: ModuleHandle,
        trampoline: StartupFn,
        bootstrap: Bootstrap,
    ) -> Result<Installed, HookError> {
        if self.is_installed() {
            return Ok(Installed::AlreadyInstalled);
        }

        let table = ImportTable::from_module(image)?;
        let import = table
            .find_slot(symbol)
            .ok_or_else(|| HookError::SymbolNotFound(symbol.to_string()))?;

        debug!(
            "Found {} import from {} @ {:#016x}",
            symbol, import.library, import.slot as usize
        );

        let installed = use_memory(import.slot, size_of::<usize>(), |slot| {
            let slot = &*slot.cast::<AtomicUsize>();

            let original = slot.load(Ordering::Acquire);
            if original == 0 {
                return Err(HookError::Unbound(symbol.to_string()));
            }

            let state = HookState {
                symbol: symbol.to_string(),
                original: std::mem::transmute::<usize, StartupFn>(original),
                library,
                bootstrap,
                bootstrapped: Once::new(),
            };

            if self.state.set(state).is_err() {
                return Ok(Installed::AlreadyInstalled);
            }

            slot.store(trampoline as usize, Ordering::Release);

            Ok(Installed::Hooked {
                library: import.library,
            })
        })
        .map_err(HookError::Protect)??;

        Ok(installed)
    }

    /// Body of the trampoline: runs the bootstrap the first time through then
    /// calls the original routine with the untouched arguments, returning
    /// its result
    ///
    /// ## Safety
    ///
    /// The arguments must be valid for the original routine
    pub unsafe fn enter(
        &self,
        instance: ModuleHandle,
        prev_instance: ModuleHandle,
        cmd_line: *mut u16,
        show_cmd: i32,
    ) -> i32 {
        let Some(state) = self.state.get() else {
            error!("Startup trampoline entered without an installed hook");
            return -1;
        };

        state.bootstrapped.call_once(|| {
            info!("Running bootstrap before {}", state.symbol);

            // The host must start regardless of what the bootstrap does
            if catch_unwind(AssertUnwindSafe(|| (state.bootstrap)(state.library))).is_err() {
                error!("Bootstrap panicked, resuming {}", state.symbol);
            }
        });

        debug!("Resuming {}", state.symbol);

        (state.original)(instance, prev_instance, cmd_line, show_cmd)
    }
}

impl Default for EntryHook {
    fn default() -> Self {
        Self::new()
    }
}

/// Replacement startup routine stored in the host's import slot
pub unsafe extern "C" fn startup_trampoline(
    instance: ModuleHandle,
    prev_instance: ModuleHandle,
    cmd_line: *mut u16,
    show_cmd: i32,
) -> i32 {
    ENTRY_HOOK.enter(instance, prev_instance, cmd_line, show_cmd)
}
