use crate::core::{Result, UniqlError};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Password prompts allowed before giving up.
pub const DEFAULT_PASSWORD_ATTEMPTS: u32 = 3;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub ui: UIConfig,
}

/// Session-related configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub password_attempts: u32,
    pub rc_file: Option<String>,
    pub history_file: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            password_attempts: DEFAULT_PASSWORD_ATTEMPTS,
            rc_file: None,
            history_file: None,
        }
    }
}

/// UI-related configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UIConfig {
    /// Interactive prompt; `{driver}` is replaced by the active driver name.
    pub prompt: String,
}

impl Default for UIConfig {
    fn default() -> Self {
        UIConfig {
            prompt: "{driver}=> ".to_string(),
        }
    }
}

/// Loads configuration from a TOML file at the given path.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| UniqlError::Config(e.to_string()))
}

/// Default configuration file location.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("uniql").join("config.toml"))
}

/// Loads the configuration at `path`, falling back to defaults when the
/// file does not exist.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => match load_config(path) {
            Err(UniqlError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
            other => other,
        },
        None => Ok(Config::default()),
    }
}
