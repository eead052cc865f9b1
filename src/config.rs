//! Stripping settings.
//!
//! Settings are read from TOML. Every key is optional:
//!
//! ```toml
//! command = "revision"      # command name, without the backslash
//! discard_argument = false  # drop the argument instead of keeping it
//! max_passes = 100          # fixed-point pass limit
//! ```

use serde::Deserialize;

use crate::clean::{Cleaned, MAX_PASSES, clean_with_limit, command_prefix, wrap};
use crate::scanner::is_name_char;

/// Command used when none is configured.
const DEFAULT_COMMAND: &str = "revision";

/// Settings for stripping a command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Command name to strip, without the leading backslash.
    pub command: String,
    /// Drop the argument along with the command.
    pub discard_argument: bool,
    /// Maximum stripping passes before giving up on a fixed point.
    pub max_passes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_owned(),
            discard_argument: false,
            max_passes: MAX_PASSES,
        }
    }
}

impl Settings {
    /// Parse and validate settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML or unknown keys and
    /// `ConfigError::Validation` for invalid values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the command is a plain control word and the pass limit is
    /// usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.is_empty() {
            return Err(ConfigError::Validation("command cannot be empty".into()));
        }
        if !self.command.chars().all(is_name_char) {
            return Err(ConfigError::Validation(format!(
                "command must be a bare control word name, got `{}`",
                self.command
            )));
        }
        if self.max_passes == 0 {
            return Err(ConfigError::Validation(
                "max_passes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Match prefix for the configured command: `\command{`.
    pub fn prefix(&self) -> String {
        command_prefix(&self.command)
    }

    /// Strip the configured command from `text`.
    pub fn clean(&self, text: &str) -> Cleaned {
        clean_with_limit(text, &self.prefix(), self.discard_argument, self.max_passes)
    }

    /// Wrap `text` in the configured command.
    pub fn wrap(&self, text: &str) -> String {
        wrap(text, &self.command)
    }
}

/// Settings errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parsing error.
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation error.
    #[error("Invalid settings: {0}")]
    Validation(String),
}
