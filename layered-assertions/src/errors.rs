//! Errors raised while processing a document.
//!
//! These are data-dependent: the same rules can succeed on one document and
//! fail on another. Configuration problems found at rule construction are
//! [`ConfigError`]s and only pass through here.

use layered_context::ConfigError;
use thiserror::Error;

/// Errors raised while resolving modifiers for one document.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The modifier's first token lies in no sentence and window scoping is off.
    #[error("token {token} is not inside any sentence; set sentence boundaries or enable the context window")]
    MissingSentenceBoundary { token: usize },

    /// An `on_modifies` callback failed instead of answering yes or no.
    #[error("on_modifies callback of rule '{literal}' failed: {message}")]
    OnModifies { literal: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for document processing.
pub type ContextResult<T> = Result<T, ContextError>;
