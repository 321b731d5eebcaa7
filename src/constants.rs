/// Constant storing the application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of the genuine library inside the system directory
pub const PROXIED_LIBRARY: &str = "winhttp.dll";

/// Module name of the game executable whose imports are patched
pub const HOST_MODULE: &str = "Bug Fables.exe";
/// Imported function the game calls to start the Unity player
pub const STARTUP_SYMBOL: &str = "UnityMain";

/// Default bootstrap library path, relative to the game directory
pub const BOOTSTRAP_LIBRARY: &str = "VenusRootLoader\\VenusRootLoader.Bootstrap.dll";
/// Default export called on the bootstrap library
pub const BOOTSTRAP_ENTRY: &str = "EntryPoint";

/// Prefix for environment variables overriding the config file
pub const ENV_PREFIX: &str = "VRL_";
