//! Error classification shared by the chat pipeline and the wire protocol.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Machine-readable error code carried on `error` stream frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Unauthorized,
    CircularDependency,
    InvalidRequest,
    UpstreamFailure,
    Timeout,
    StorageFailure,
    Internal,
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller asked for something that does not exist.
    Lookup,
    /// Caller does not own the entity.
    Ownership,
    /// Agent graph could not be assembled.
    Composition,
    /// Request rejected before a run could start.
    Validation,
    /// Model provider or remote tool failed mid-run.
    Upstream,
    Timeout,
    Persistence,
    Configuration,
    Internal,
}

impl ErrorCategory {
    /// Whether errors in this category are reported before a stream opens.
    pub fn is_setup_time(self) -> bool {
        matches!(
            self,
            Self::Lookup | Self::Ownership | Self::Composition | Self::Validation | Self::Configuration
        )
    }
}
