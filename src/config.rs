//! Settings file reader
//!
//! Reads optional settings from a TOML file. Every field has a default, so
//! an absent file and an empty file are equivalent:
//!
//! ```toml
//! [registry]
//! timeout_secs = 30
//! max_retries = 3
//! base_delay_ms = 100
//! user_agent = "depconf/26.1.103"
//!
//! [runtime]
//! python = "3.10"
//!
//! [cache]
//! dir = ".depconf/cache"
//!
//! [refresh]
//! max_age_days = 1
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constraint::{Normalizer, RuntimeTarget, DEFAULT_PYTHON};
use crate::error::{ConfigError, RegistryError};
use crate::registry::{HttpClient, BASE_DELAY_MS, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, MAX_RETRIES};

/// Default cache directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = ".depconf/cache";

/// All settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub registry: RegistrySettings,
    pub runtime: RuntimeSettings,
    pub cache: CacheSettings,
    pub refresh: RefreshSettings,
}

/// `[registry]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub user_agent: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_retries: MAX_RETRIES,
            base_delay_ms: BASE_DELAY_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl RegistrySettings {
    /// HTTP client configured by this section
    pub fn client(&self) -> Result<HttpClient, RegistryError> {
        Ok(
            HttpClient::with_config(Duration::from_secs(self.timeout_secs), &self.user_agent)?
                .with_max_retries(self.max_retries)
                .with_base_delay(Duration::from_millis(self.base_delay_ms)),
        )
    }
}

/// `[runtime]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSettings {
    /// Python version environment markers are evaluated against
    pub python: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_string(),
        }
    }
}

impl RuntimeSettings {
    pub fn target(&self) -> Result<RuntimeTarget, ConfigError> {
        RuntimeTarget::python(&self.python)
    }

    /// Normalizer evaluating markers against this runtime
    pub fn normalizer(&self) -> Result<Normalizer, ConfigError> {
        Ok(Normalizer::new(self.target()?))
    }
}

/// `[cache]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub dir: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

/// `[refresh]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshSettings {
    /// Age after which a stored version list is fetched again
    pub max_age_days: u32,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self { max_age_days: 1 }
    }
}

impl RefreshSettings {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.max_age_days))
    }
}

impl Settings {
    /// Parse settings from TOML text; `path` is used in error messages
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let settings: Settings =
            toml::from_str(content).map_err(|e: toml::de::Error| ConfigError::TomlParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        // Reject an unusable runtime early rather than at the first marker
        settings.runtime.target()?;
        Ok(settings)
    }

    /// Read settings from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Read settings from `path` if given, defaults otherwise
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
