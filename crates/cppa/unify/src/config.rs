//! Unifier configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How strictly the action bindings of a service binding must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMatchMode {
    /// Every required action must unify, and every required action of the
    /// counterparty must be covered.
    #[default]
    All,
    /// Unmatched actions are skipped; at least one action must unify.
    Any,
}

/// Engine-wide settings. Per-run inputs live in [`crate::UnifyRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifierConfig {
    /// Action binding match mode within a service binding
    pub binding_match_mode: BindingMatchMode,

    /// Length of generated `UserAuthentication/Username` values
    pub username_length: usize,

    /// Length of generated `UserAuthentication/Password` values
    pub password_length: usize,

    /// Seed for generated passwords. Unset means seeded from the OS.
    pub credential_seed: Option<u64>,
}

impl Default for UnifierConfig {
    fn default() -> Self {
        Self {
            binding_match_mode: BindingMatchMode::All,
            username_length: 15,
            password_length: 20,
            credential_seed: None,
        }
    }
}

impl UnifierConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: UnifierConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // A SHA-224 digest is 28 bytes, 40 characters in base64 with padding.
        if self.username_length == 0 || self.username_length > 38 {
            return Err(ConfigError::Invalid {
                field: "username_length".into(),
                reason: format!("{} not in 1..=38", self.username_length),
            });
        }
        if self.password_length == 0 {
            return Err(ConfigError::Invalid {
                field: "password_length".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Configuration with a fixed credential seed, for reproducible output.
    pub fn deterministic(seed: u64) -> Self {
        Self {
            credential_seed: Some(seed),
            ..Self::default()
        }
    }
}
