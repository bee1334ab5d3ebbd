//! Configuration for execonsole
//!
//! TOML-backed settings for the shell streaming loop and the script
//! host, with defaults for every field so an absent or partial config
//! file still yields a working setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell session configuration
    pub shell: ShellConfig,

    /// Script host configuration
    pub script: ScriptConfig,
}

/// Shell-session-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell executable used to run submitted commands
    pub shell_path: PathBuf,

    /// Interval between output polls, in milliseconds
    pub update_interval_ms: u64,

    /// Upper bound on bytes appended per poll
    pub read_chunk_bytes: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            shell_path: PathBuf::from("/bin/sh"),
            update_interval_ms: 1000,
            read_chunk_bytes: 1024,
        }
    }
}

/// Script-host-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// External interpreter runtime driven by the bundled host
    pub interpreter: String,

    /// Fence language tag pattern accepted on code submissions
    pub language_pattern: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            language_pattern: "py(thon)?".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values
    pub fn validate(&self) -> Result<()> {
        if self.shell.update_interval_ms == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "shell.update_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.shell.read_chunk_bytes == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "shell.read_chunk_bytes".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.script.interpreter.is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "script.interpreter".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
