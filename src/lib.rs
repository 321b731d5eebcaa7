#![allow(clippy::missing_safety_doc)]

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod hooks;
#[cfg(windows)]
mod os;
pub mod proxy;
#[cfg(windows)]
pub mod ui;

#[cfg(windows)]
mod attach {
    use crate::{
        config::load_config,
        constants::APP_VERSION,
        context::{is_wine, GameContext},
        error::HookError,
        hooks::{install_entry_hook, Installed, ENTRY_HOOK},
        proxy::bind_genuine_library,
        ui::error_message,
    };
    use log::{debug, error, info, warn};
    use std::sync::atomic::{AtomicBool, Ordering};
    use windows_sys::Win32::{
        Foundation::{BOOL, FALSE, HMODULE, TRUE},
        System::{
            Console::{AllocConsole, FreeConsole},
            SystemServices::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH},
        },
    };

    /// Whether attaching allocated a console that must be released
    static CONSOLE: AtomicBool = AtomicBool::new(false);

    #[no_mangle]
    #[allow(non_snake_case)]
    unsafe extern "system" fn DllMain(dll_module: HMODULE, call_reason: u32, _: *mut ()) -> BOOL {
        match call_reason {
            DLL_PROCESS_ATTACH => attach(dll_module),
            DLL_PROCESS_DETACH => {
                if CONSOLE.swap(false, Ordering::AcqRel) {
                    FreeConsole();
                }
                TRUE
            }
            _ => TRUE,
        }
    }

    /// Handles the proxy being attached to a process, returns `FALSE` when the
    /// game startup could not be hooked
    unsafe fn attach(dll_module: HMODULE) -> BOOL {
        if ENTRY_HOOK.is_installed() {
            return TRUE;
        }

        let context = GameContext::current();
        let loaded = load_config(context.as_ref().ok().map(|context| context.game_dir.as_path()));
        let config = loaded.config;

        if config.console && AllocConsole() != 0 {
            CONSOLE.store(true, Ordering::Release);
        }

        // Logging may already be initialized if the host loaded us twice
        let _ = env_logger::builder()
            .filter_level(config.log_level)
            .parse_default_env()
            .try_init();

        info!("Venus winhttp proxy v{APP_VERSION}");

        if let Some(err) = loaded.error {
            error!("Failed to load config: {err}");
            error_message("Failed to load config", &err.to_string());
        }

        for name in loaded.rejected {
            warn!("Ignoring invalid value for environment variable {name}");
        }

        bind_genuine_library();

        if is_wine() {
            info!("Running under Wine");
        }

        let context = match context {
            Ok(context) => context,
            Err(err) => {
                warn!("Unable to determine game directory, forwarding only: {err}");
                return TRUE;
            }
        };

        if config.disable {
            info!("Loader disabled by config, forwarding only");
            return TRUE;
        }

        if !context.is_game() {
            debug!(
                "{} has no data directory, forwarding only",
                context.exe_path.display()
            );
            return TRUE;
        }

        let outcome = install_entry_hook(dll_module, &context, &config);
        match &outcome {
            Ok(Installed::Hooked { library }) => {
                info!("Hooked startup routine imported from {library}");
            }
            Ok(Installed::AlreadyInstalled) => {}
            Err(err) => {
                error!("{err}");
                error_message(err.title(), &err.to_string());
            }
        }

        loader_result(&outcome)
    }

    /// Value handed back to the loader for a hook install attempt, the
    /// process load fails when the hook could not be installed
    fn loader_result(outcome: &Result<Installed, HookError>) -> BOOL {
        match outcome {
            Ok(_) => TRUE,
            Err(_) => FALSE,
        }
    }

}
