//! # Runtime Error Types
//!
//! Recoverable failures of the ECS runtime.
//!
//! Invariant violations (registering a component twice, reading a component
//! that was never attached, overflowing a recycle queue, destroying while
//! systems run) are programming errors and panic instead. Only conditions a
//! caller can sensibly react to are represented here.

use thiserror::Error;

/// Errors that can occur in the ECS runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Every id below the allocator limit is live and none are queued for reuse.
    #[error("id space exhausted: all {limit} ids are in use")]
    IdSpaceExhausted {
        /// The configured number of distinct ids.
        limit: u64,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),
}

impl From<toml::de::Error> for EcsError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
