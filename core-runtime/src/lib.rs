//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the sound engine:
//! - Logging and tracing infrastructure
//! - Host log forwarding through `LoggerSink`
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the engine crates share.
//! It establishes the logging conventions (targets, levels, formats) used
//! throughout the system.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
