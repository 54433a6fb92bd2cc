//! Error types for the model cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache and the models it wraps.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A watched read answered synchronously instead of with a pending result
    #[error("{namespace}.{operation}() did not return a pending result but should")]
    NotAsync {
        namespace: String,
        operation: String,
    },

    /// Namespace settings that cannot be turned into a usable configuration
    #[error("Invalid configuration for `{namespace}`: {reason}")]
    InvalidConfig { namespace: String, reason: String },

    /// Settings document could not be parsed
    #[error("Invalid configuration document: {0}")]
    Config(#[from] serde_json::Error),

    /// The wrapped model does not implement the requested operation
    #[error("Unknown operation {model}.{operation}()")]
    UnknownOperation { model: String, operation: String },

    /// Failure raised by the wrapped model itself
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl CacheError {
    /// Shorthand for a model reporting an operation it does not offer.
    pub fn unknown_operation(model: &str, operation: &str) -> Self {
        CacheError::UnknownOperation {
            model: model.to_string(),
            operation: operation.to_string(),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the model cache.
pub type Result<T> = std::result::Result<T, CacheError>;
