//! # Audio Focus Arbiter Library (focus-arbiter)
//!
//! Arbitrates a shared audio output between independent clients.
//!
//! **Purpose:** Grant focus requests, tell the displaced holder what kind of
//! loss it suffered, restore holders on abandonment, and deliver every
//! notification asynchronously on the listener's execution context.
//!
//! **Architecture:** single-lock arbitration engine over a focus stack, with
//! per-context FIFO worker threads for listener callbacks.

pub mod config;
pub mod error;
pub mod focus;
pub mod scenario;

pub use error::{Error, Result};
pub use focus::{FocusArbiter, FocusRequest, FocusRequestBuilder};
pub use focus_common::events::{FocusChange, FocusGain, FocusResult};
