//! Application error types using thiserror
//!
//! Error hierarchy:
//! - RegistryError: Issues with package registry communication
//! - StoreError: Issues with the graph store or the model cache
//! - CodecError: Cached model text that cannot be decoded
//! - ValidationError: Requests rejected before any model is built
//! - ConfigError: Issues with the settings file

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Package registry related errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Graph store or model cache related errors
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Model cache text related errors
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Request validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The blocking solver task did not complete
    #[error("solver task failed: {message}")]
    SolverTask { message: String },
}

/// Errors related to package registry communication
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Package not found in registry
    #[error("package '{package}' not found in {registry} registry")]
    PackageNotFound { package: String, registry: String },

    /// Network request failed
    #[error("failed to fetch package '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry} registry")]
    RateLimitExceeded { registry: String },

    /// Invalid response from registry
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {registry}")]
    Timeout { package: String, registry: String },

    /// Transient failures persisted through every retry
    #[error("giving up on '{package}' from {registry} after {attempts} attempts: {message}")]
    RetriesExhausted {
        package: String,
        registry: String,
        attempts: u32,
        message: String,
    },

    /// Package name does not fit the registry's naming scheme
    #[error("invalid package name '{name}' for {registry}: {reason}")]
    InvalidPackageName {
        name: String,
        registry: String,
        reason: String,
    },
}

/// Errors related to the graph store and the model cache
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read a stored entry
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a stored entry
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored snapshot could not be parsed
    #[error("malformed snapshot in {path}: {message}")]
    MalformedSnapshot { path: PathBuf, message: String },
}

/// Errors related to decoding cached model text
#[derive(Error, Debug)]
pub enum CodecError {
    /// The text is not a valid model document
    #[error("malformed model text: {0}")]
    Json(#[from] serde_json::Error),

    /// The text was written by an incompatible format version
    #[error("unsupported model format {found}, expected {expected}")]
    UnsupportedFormat { found: u32, expected: u32 },
}

/// Errors for requests rejected before model construction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Limit below one
    #[error("invalid limit {value}: must be at least 1")]
    InvalidLimit { value: i64 },

    /// Threshold band outside 0 <= min <= max <= 10
    #[error("invalid thresholds [{min}, {max}]: expected 0 <= min <= max <= 10")]
    InvalidThresholds { min: f64, max: f64 },

    /// Target impact outside [0, 10]
    #[error("invalid impact {value}: expected a value between 0 and 10")]
    InvalidImpact { value: f64 },

    /// Depth other than -1 or a positive level count
    #[error("invalid depth {value}: expected -1 or a positive number of levels")]
    InvalidDepth { value: i64 },

    /// Malformed root identifier
    #[error("invalid root identifier '{value}'")]
    InvalidRootId { value: String },

    /// Malformed pin in a partial configuration
    #[error("invalid pin '{value}': expected name=serial")]
    InvalidPin { value: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the settings file
    #[error("failed to read settings file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the settings file
    #[error("failed to parse TOML in {path}: {message}")]
    TomlParseError { path: PathBuf, message: String },

    /// Runtime target is not a version
    #[error("invalid runtime target '{value}': expected a version like '3.10'")]
    InvalidRuntime { value: String },
}

impl RegistryError {
    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::InvalidResponse {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new RateLimitExceeded error
    pub fn rate_limit_exceeded(registry: impl Into<String>) -> Self {
        RegistryError::RateLimitExceeded {
            registry: registry.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Returns true for failures worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegistryError::NetworkError { .. }
                | RegistryError::RateLimitExceeded { .. }
                | RegistryError::Timeout { .. }
        )
    }

    /// Returns true if the registry answered with data that cannot be used
    pub fn is_malformed(&self) -> bool {
        matches!(self, RegistryError::InvalidResponse { .. })
    }
}

impl StoreError {
    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::WriteError {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_package_not_found() {
        let err = RegistryError::package_not_found("nonexistent-package", "npm");
        let msg = format!("{}", err);
        assert!(msg.contains("package 'nonexistent-package' not found"));
        assert!(msg.contains("npm"));
    }

    #[test]
    fn test_registry_error_network() {
        let err = RegistryError::network_error("lodash", "npm", "connection refused");
        let msg = format!("{}", err);
        assert!(msg.contains("failed to fetch"));
        assert!(msg.contains("connection refused"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_registry_error_retries_exhausted() {
        let err = RegistryError::RetriesExhausted {
            package: "serde".to_string(),
            registry: "crates.io".to_string(),
            attempts: 4,
            message: "connection reset".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("after 4 attempts"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_registry_error_invalid_response_is_malformed() {
        let err = RegistryError::invalid_response("requests", "PyPI", "expected object");
        assert!(err.is_malformed());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_registry_error_timeout() {
        let err = RegistryError::timeout("serde", "crates.io");
        let msg = format!("{}", err);
        assert!(msg.contains("timeout"));
        assert!(msg.contains("serde"));
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::InvalidLimit { value: 0 };
        assert!(err.to_string().contains("at least 1"));

        let err = ValidationError::InvalidThresholds { min: 5.0, max: 1.0 };
        assert!(err.to_string().contains("min <= max"));

        let err = ValidationError::InvalidImpact { value: 12.0 };
        assert!(err.to_string().contains("between 0 and 10"));
    }

    #[test]
    fn test_codec_error_unsupported_format() {
        let err = CodecError::UnsupportedFormat {
            found: 7,
            expected: 1,
        };
        assert!(err.to_string().contains("unsupported model format 7"));
    }

    #[test]
    fn test_store_error_read() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = StoreError::read_error("/cache/root--1.json", io);
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_app_error_from_validation_error() {
        let app_err: AppError = ValidationError::InvalidDepth { value: 0 }.into();
        assert!(app_err.to_string().contains("invalid depth 0"));
    }

    #[test]
    fn test_app_error_from_registry_error() {
        let registry_err = RegistryError::package_not_found("pkg", "npm");
        let app_err: AppError = registry_err.into();
        let msg = format!("{}", app_err);
        assert!(msg.contains("package 'pkg' not found"));
    }

    #[test]
    fn test_error_debug_trait() {
        let err = ConfigError::InvalidRuntime {
            value: "abc".to_string(),
        };
        let debug = format!("{:?}", err);
        assert!(debug.contains("InvalidRuntime"));
    }
}
