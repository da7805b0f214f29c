//! # Game Error Types

use std::path::PathBuf;

use tecs_core::EcsError;
use thiserror::Error;

/// Errors surfaced by the demo game.
#[derive(Error, Debug)]
pub enum GameError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not valid TOML for [`GameConfig`](crate::GameConfig).
    #[error("failed to parse game configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration value is out of range.
    #[error("invalid game configuration: {0}")]
    InvalidConfig(String),

    /// The ECS runtime refused an operation.
    #[error(transparent)]
    Ecs(#[from] EcsError),
}

/// Result type for game operations.
pub type GameResult<T> = Result<T, GameError>;
