//! # Utilities Module
//!
//! Shared helpers used across the engine. Currently the random number port.

pub mod rng;

pub use rng::*;
