//! # Rendering Module
//!
//! Text rendering of engine snapshots and game events for terminal hosts.
//!
//! The engine never calls into this module; hosts pass it a snapshot after
//! each accepted input.

pub mod display;

pub use display::*;
