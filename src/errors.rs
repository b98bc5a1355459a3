//! Configuration error types.
//!
//! Everything here is raised while rules or components are being built.
//! These errors are static properties of the configuration: retrying without
//! changing the rules never helps.

use thiserror::Error;

/// Errors raised while constructing rules, matchers or components.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A direction string outside the allowed set.
    #[error("direction '{direction}' not recognized, must be one of: FORWARD, BACKWARD, BIDIRECTIONAL, TERMINATE, PSEUDO")]
    InvalidDirection { direction: String },

    /// Both `allowed_types` and `excluded_types` were given.
    #[error("rule '{literal}' sets both allowed_types and excluded_types, only one of them can be used")]
    ConflictingTypeFilters { literal: String },

    /// A numeric limit that must be strictly positive.
    #[error("rule '{literal}': {field} must be greater than 0")]
    NonPositive { literal: String, field: &'static str },

    /// `parent_required` without candidate parents.
    #[error("section '{category}' requires a parent but declares no parents")]
    ParentRequiredWithoutParents { category: String },

    /// Window-based scoping was requested but the rule has no `max_scope`.
    #[error("rule '{literal}' needs max_scope when the context window is used instead of sentences")]
    WindowRequiresMaxScope { literal: String },

    /// A regular expression failed to compile.
    #[error("invalid pattern for rule '{literal}': {source}")]
    InvalidPattern {
        literal: String,
        #[source]
        source: regex::Error,
    },

    /// Malformed or closed-schema violating JSON rule data.
    #[error("failed to parse rule JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML configuration.
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A rule or configuration file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other invalid setting.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Read a file into a string, mapping failures to [`ConfigError::Io`].
pub fn read_config_file(path: &std::path::Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
}

/// Write a string to a file, mapping failures to [`ConfigError::Io`].
pub fn write_config_file(path: &std::path::Path, content: &str) -> ConfigResult<()> {
    std::fs::write(path, content).map_err(|e| ConfigError::io(path, e))
}
