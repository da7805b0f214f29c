//! # TECS Demo
//!
//! A headless zombie survival game running on the TECS runtime.
//!
//! The player walks towards a touched target and fights an ever growing horde
//! with three spells paid from a regenerating magic meter. Everything that
//! moves, collides, expires or dies is an entity; every rule is a system in
//! one of four categories run in a fixed order each frame.
//!
//! ## Modules
//!
//! - `components`: game data, resources and category tags
//! - `systems`: the handlers run by each category
//! - `game`: setup, spawning, spells and the frame loop
//! - `config`: TOML-loadable tuning
//!
//! ## Example
//!
//! ```rust
//! use tecs_demo::{Game, GameConfig};
//!
//! let mut game = Game::new(GameConfig::default()).unwrap();
//! let report = game.run(120).unwrap();
//! assert!(report.frame <= 120);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod components;
pub mod config;
pub mod error;
pub mod game;
pub mod systems;

// Re-export the runtime
pub use tecs_core as core;

pub use config::GameConfig;
pub use error::{GameError, GameResult};
pub use game::{FrameInput, FrameReport, Game, Spell};
