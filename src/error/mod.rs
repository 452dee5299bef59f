//! Error types for conductor.

pub mod unified;

pub use unified::{ErrorCategory, ErrorCode};

use thiserror::Error;

/// Primary error type for all conductor operations.
#[derive(Error, Debug)]
pub enum ConductorError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Circular dependency: agent '{slug}' reappears on its own handoff chain")]
    CircularDependency { slug: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream failure from {source_name}: {message}")]
    Upstream { source_name: String, message: String },

    #[error("History error: {0}")]
    History(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ConductorError {
    /// Create an upstream failure attributed to a named source (model, tool server).
    pub fn upstream(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound(_) => ErrorCategory::Lookup,
            Self::Unauthorized(_) => ErrorCategory::Ownership,
            Self::CircularDependency { .. } => ErrorCategory::Composition,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Upstream { .. } => ErrorCategory::Upstream,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::History(_) | Self::Storage(_) | Self::Io(_) => ErrorCategory::Persistence,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) | Self::InvalidState(_) => ErrorCategory::Internal,
        }
    }

    /// Code surfaced to clients on `error` frames.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::CircularDependency { .. } => ErrorCode::CircularDependency,
            Self::Validation(_) | Self::Configuration(_) => ErrorCode::InvalidRequest,
            Self::Upstream { .. } => ErrorCode::UpstreamFailure,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::History(_) | Self::Storage(_) | Self::Io(_) => ErrorCode::StorageFailure,
            Self::Serialization(_) | Self::InvalidState(_) => ErrorCode::Internal,
        }
    }

    /// Whether a client-initiated resend of the same turn may succeed.
    ///
    /// The pipeline never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Upstream | ErrorCategory::Timeout
        ) || matches!(self, Self::Io(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ConductorError>;
