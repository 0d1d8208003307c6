//! Error types for Shift Core
//!
//! Provides error handling for:
//! - Fix rule construction
//! - Migration (schema lookup, strict tag failures, warm-up)
//! - Configuration loading

use shift_types::{FieldNotFound, SchemaError};

/// Unified migration error
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Schema lookup failed
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// No schema registered at or below the version
    #[error("no schema registered at or below version {0}")]
    NoSchema(u32),

    /// A fix could not build its rule
    #[error("fix failed: {0}")]
    Fix(#[from] FixError),

    /// Strict mode met a tagged choice key with no alternative
    #[error("unknown key '{key}' in tagged choice '{choice}'")]
    UnknownTag {
        /// Name of the key field
        choice: String,
        /// Key found in the data
        key: String,
    },

    /// A warm-up task failed or was aborted
    #[error("warm-up failed: {0}")]
    Warmup(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl MigrationError {
    /// Check if the error comes from the fix or schema declarations rather
    /// than from the data
    #[inline]
    #[must_use]
    pub fn is_authoring_error(&self) -> bool {
        matches!(self, Self::Fix(_) | Self::Schema(_) | Self::NoSchema(_))
    }
}

/// Errors while building a fix's rule
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FixError {
    /// The fix refers to a type its schema lacks
    #[error("fix '{fix}': {source}")]
    Schema {
        /// Fix name
        fix: String,
        /// Lookup failure
        source: SchemaError,
    },

    /// The fix refers to a field its type lacks
    #[error("fix '{fix}': {source}")]
    Field {
        /// Fix name
        fix: String,
        /// Search failure
        source: FieldNotFound,
    },

    /// Fix-specific failure
    #[error("fix '{fix}': {message}")]
    Invalid {
        /// Fix name
        fix: String,
        /// Description
        message: String,
    },
}

impl FixError {
    /// Create an invalid-fix error
    pub fn invalid(fix: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            fix: fix.into(),
            message: message.into(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed into a configuration
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type for migrations
pub type Result<T> = std::result::Result<T, MigrationError>;
