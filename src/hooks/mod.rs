pub mod entry;
pub mod mem;
pub mod pe;

pub use entry::{startup_trampoline, EntryHook, Installed, ENTRY_HOOK};

#[cfg(windows)]
use crate::{
    bootstrap::ExternalBootstrap,
    config::ProxyConfig,
    constants::{HOST_MODULE, STARTUP_SYMBOL},
    context::GameContext,
    error::HookError,
    os,
};
#[cfg(windows)]
use log::debug;
#[cfg(windows)]
use windows_sys::Win32::Foundation::HMODULE;

/// Hooks the game's startup routine so the external bootstrap runs before it
///
/// ## Safety
///
/// Must be called while attaching, before the game calls its startup routine
///
/// ## Arguments
/// * `library` - Handle of the proxy library, passed on to the bootstrap
/// * `context` - The game the proxy was loaded into
/// * `config`  - The proxy configuration
#[cfg(windows)]
pub unsafe fn install_entry_hook(
    library: HMODULE,
    context: &GameContext,
    config: &ProxyConfig,
) -> Result<Installed, HookError> {
    let host = os::module_handle(HOST_MODULE).map_err(|source| HookError::ModuleNotFound {
        module: HOST_MODULE,
        source,
    })?;

    let bootstrap = ExternalBootstrap::new(&context.game_dir, &config.bootstrap);
    debug!(
        "Bootstrap {} ({}) will start before {}",
        bootstrap.library().display(),
        bootstrap.entry(),
        STARTUP_SYMBOL
    );

    ENTRY_HOOK.install(
        host as *const u8,
        STARTUP_SYMBOL,
        library,
        startup_trampoline,
        Box::new(move |module: HMODULE| bootstrap.run(module)),
    )
}
