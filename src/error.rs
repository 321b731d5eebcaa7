use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors that abort installing the entry-point hook
#[derive(Debug, Error)]
pub enum HookError {
    /// The host executable is not loaded in this process
    #[error("Failed to find module \"{module}\": {source}")]
    ModuleNotFound {
        module: &'static str,
        #[source]
        source: io::Error,
    },
    /// The host module headers could not be read
    #[error("Host module is not a valid image: {0}")]
    InvalidImage(&'static str),
    /// The host module does not import the startup routine
    #[error("Function \"{0}\" is not imported by the host module")]
    SymbolNotFound(String),
    /// The import slot does not hold an address yet
    #[error("Import slot for \"{0}\" is not bound")]
    Unbound(String),
    /// The import slot could not be made writable
    #[error("Failed to unprotect import slot: {0}")]
    Protect(#[source] io::Error),
}

/// Broad category of a [`HookError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookErrorKind {
    /// Locating the host import table or the startup slot failed
    Resolve,
    /// Overwriting the startup slot failed
    Patch,
}

impl HookError {
    pub fn kind(&self) -> HookErrorKind {
        match self {
            HookError::Protect(_) => HookErrorKind::Patch,
            _ => HookErrorKind::Resolve,
        }
    }

    /// Caption for the dialog reporting this error
    pub fn title(&self) -> &'static str {
        match self.kind() {
            HookErrorKind::Resolve => "Failed to open host import table",
            HookErrorKind::Patch => "Failed to replace startup routine",
        }
    }
}

/// Errors from reading the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors from starting the external bootstrap
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to load bootstrap library \"{}\": {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Bootstrap library \"{}\" does not export \"{entry}\"", .path.display())]
    MissingEntry { path: PathBuf, entry: String },
}
