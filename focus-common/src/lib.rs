//! # Focus Common Library
//!
//! Shared code for the audio focus arbiter crates:
//! - Focus gain/change value types
//! - Arbitration event types and the EventBus
//! - Bootstrap configuration loading (TOML)
//! - Common error type

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{FocusChange, FocusGain, FocusResult};
