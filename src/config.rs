use crate::{
    constants::{BOOTSTRAP_ENTRY, BOOTSTRAP_LIBRARY, ENV_PREFIX},
    error::ConfigError,
};
use log::{debug, LevelFilter};
use serde::Deserialize;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// Name of the file that stores the proxy configuration, next to the game
pub const CONFIG_FILE_NAME: &str = "venus-proxy.json";

/// Structure of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Only forward the proxied library, don't hook the game
    pub disable: bool,
    /// Allocate a console window for the logs
    pub console: bool,
    /// Maximum level of logs to output
    pub log_level: LevelFilter,
    /// External bootstrap started before the game
    pub bootstrap: BootstrapConfig,
}

/// Location of the external bootstrap
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Bootstrap library, relative paths are resolved from the game directory
    pub library: PathBuf,
    /// Export called with the proxy module handle
    pub entry: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            disable: false,
            console: cfg!(debug_assertions),
            log_level: LevelFilter::Info,
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            library: PathBuf::from(BOOTSTRAP_LIBRARY),
            entry: BOOTSTRAP_ENTRY.to_string(),
        }
    }
}

impl ProxyConfig {
    /// Applies `VRL_` prefixed overrides from `vars`. Variable names are
    /// matched ignoring case and unknown names are skipped
    ///
    /// Returns the names of variables whose values could not be parsed,
    /// those variables leave the config unchanged
    pub fn apply_env<I>(&mut self, vars: I) -> Vec<String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut rejected = Vec::new();

        for (name, value) in vars {
            let Some(key) = strip_prefix_ignore_case(&name, ENV_PREFIX) else {
                continue;
            };

            let applied = match key.to_ascii_uppercase().as_str() {
                "DISABLE" => parse_bool(&value).map(|value| self.disable = value),
                "CONSOLE" => parse_bool(&value).map(|value| self.console = value),
                "LOG_LEVEL" => value
                    .trim()
                    .parse::<LevelFilter>()
                    .ok()
                    .map(|value| self.log_level = value),
                _ => continue,
            };

            if applied.is_none() {
                rejected.push(name);
            }
        }

        rejected
    }
}

/// Result of loading the config, problems are kept for reporting once
/// logging is available
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: ProxyConfig,
    /// Failure reading the config file, defaults are used instead
    pub error: Option<ConfigError>,
    /// Environment variables with invalid values
    pub rejected: Vec<String>,
}

/// Provides a [`PathBuf`] to the configuration file
pub fn config_path(game_dir: &Path) -> PathBuf {
    game_dir.join(CONFIG_FILE_NAME)
}

/// Reads the [`ProxyConfig`] from the config file if one is present
pub fn read_config_file(path: &Path) -> Result<Option<ProxyConfig>, ConfigError> {
    // Check that the config file exists
    if !path.exists() {
        return Ok(None);
    }

    debug!("Reading config from: {}", path.display());

    // Read and parse the config bytes from the file
    let bytes = std::fs::read(path)?;
    let config = serde_json::from_slice(&bytes)?;
    Ok(Some(config))
}

/// Loads the config file from `game_dir` when known, then applies the
/// process environment overrides
pub fn load_config(game_dir: Option<&Path>) -> LoadedConfig {
    let (mut config, error) = match game_dir.map(|dir| read_config_file(&config_path(dir))) {
        Some(Ok(Some(config))) => (config, None),
        Some(Err(err)) => (ProxyConfig::default(), Some(err)),
        Some(Ok(None)) | None => (ProxyConfig::default(), None),
    };

    let vars = std::env::vars_os().filter_map(|(name, value)| string_pair(name, value));
    let rejected = config.apply_env(vars);

    LoadedConfig {
        config,
        error,
        rejected,
    }
}

fn string_pair(name: OsString, value: OsString) -> Option<(String, String)> {
    Some((name.into_string().ok()?, value.into_string().ok()?))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{config_path, read_config_file, BootstrapConfig, ProxyConfig, CONFIG_FILE_NAME};
    use crate::error::ConfigError;
    use log::LevelFilter;
    use std::{fs, path::PathBuf};

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    /// Fresh directory under the system temp directory
    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("venus-proxy-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("Failed to create temp dir");
        dir
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ProxyConfig =
            serde_json::from_str(r#"{ "log_level": "debug", "bootstrap": { "entry": "Start" } }"#)
                .expect("Config should parse");

        assert_eq!(config.log_level, LevelFilter::Debug);
        assert!(!config.disable);
        assert_eq!(config.bootstrap.entry, "Start");
        assert_eq!(config.bootstrap.library, BootstrapConfig::default().library);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ProxyConfig::default();

        let rejected = config.apply_env(vars(&[
            ("VRL_DISABLE", "true"),
            ("vrl_console", "1"),
            ("VRL_Log_Level", "trace"),
            ("PATH", "C:\\Windows"),
            ("VRL_UNKNOWN", "whatever"),
        ]));

        assert!(rejected.is_empty());
        assert!(config.disable);
        assert!(config.console);
        assert_eq!(config.log_level, LevelFilter::Trace);
    }

    #[test]
    fn invalid_env_values_are_rejected() {
        let mut config = ProxyConfig::default();

        let rejected = config.apply_env(vars(&[
            ("VRL_DISABLE", "maybe"),
            ("VRL_LOG_LEVEL", "loud"),
            ("VRL_CONSOLE", "off"),
        ]));

        assert_eq!(rejected, ["VRL_DISABLE", "VRL_LOG_LEVEL"]);
        assert!(!config.disable);
        assert!(!config.console);
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn reads_config_file() {
        let dir = temp_dir("read");
        let path = config_path(&dir);
        assert_eq!(path.file_name().and_then(|name| name.to_str()), Some(CONFIG_FILE_NAME));

        assert!(read_config_file(&path).expect("Missing file is not an error").is_none());

        fs::write(&path, r#"{ "disable": true }"#).expect("Failed to write config");
        let config = read_config_file(&path)
            .expect("Config should read")
            .expect("Config should exist");
        assert!(config.disable);

        fs::write(&path, "{ disable: ").expect("Failed to write config");
        assert!(matches!(read_config_file(&path), Err(ConfigError::Parse(_))));

        let _ = fs::remove_dir_all(&dir);
    }
}
