//! Backing store configuration
//!
//! Every field is optional in TOML; missing fields take their defaults.
//! The config is resolved once when a store is built and never changes
//! afterwards.

use bigset_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest accepted `page_size`
pub const MAX_PAGE_SIZE: usize = 65_536;

/// SQLite `synchronous` pragma levels the store accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synchronous {
    /// No fsync; fastest, unsafe on power loss
    Off,
    /// fsync at WAL checkpoints
    Normal,
    /// fsync on every commit
    Full,
}

impl Synchronous {
    /// Pragma value
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Synchronous::Off => "OFF",
            Synchronous::Normal => "NORMAL",
            Synchronous::Full => "FULL",
        }
    }
}

/// Store configuration.
///
/// # Example
///
/// ```toml
/// busy_timeout_ms = 5000
/// page_size = 512
/// synchronous = "normal"
/// progress_interval = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// Rows fetched per page by lazy iteration, at most [`MAX_PAGE_SIZE`].
    pub page_size: usize,
    /// `"off"`, `"normal"` or `"full"`.
    pub synchronous: String,
    /// SQLite VM steps between cancellation checks inside one statement.
    pub progress_interval: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
            page_size: 512,
            synchronous: "normal".to_string(),
            progress_interval: 1000,
        }
    }
}

impl StoreConfig {
    /// Parse the synchronous string into a `Synchronous`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"off"`, `"normal"` or `"full"`.
    pub fn synchronous_mode(&self) -> Result<Synchronous> {
        match self.synchronous.to_ascii_lowercase().as_str() {
            "off" => Ok(Synchronous::Off),
            "normal" => Ok(Synchronous::Normal),
            "full" => Ok(Synchronous::Full),
            other => Err(Error::invalid_config(format!(
                "invalid synchronous mode '{}'; expected \"off\", \"normal\" or \"full\"",
                other
            ))),
        }
    }

    /// Busy timeout as a `Duration`.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        self.synchronous_mode()?;
        if self.page_size == 0 {
            return Err(Error::invalid_config("page_size must be at least 1"));
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err(Error::invalid_config(format!(
                "page_size {} exceeds the maximum of {}",
                self.page_size, MAX_PAGE_SIZE
            )));
        }
        if self.progress_interval == 0 {
            return Err(Error::invalid_config("progress_interval must be at least 1"));
        }
        if self.progress_interval > i32::MAX as u32 {
            return Err(Error::invalid_config("progress_interval is too large"));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# bigset store configuration
#
# Milliseconds a statement waits on a locked database before failing.
busy_timeout_ms = 5000

# Rows fetched per page when iterating a set lazily (1 to 65536).
page_size = 512

# SQLite synchronous level: "off", "normal" (default) or "full".
synchronous = "normal"

# SQLite VM steps between cancellation checks inside a statement.
progress_interval = 1000
"#
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(content)
            .map_err(|e| Error::invalid_config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::invalid_config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
