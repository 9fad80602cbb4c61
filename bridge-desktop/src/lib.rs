//! # Desktop Bridge Implementations
//!
//! Default implementations of the audio bridge traits for desktop and
//! headless hosts (macOS, Windows, Linux, dedicated servers, CI).
//!
//! ## Overview
//!
//! - `MemoryOutput`: headless [`AudioOutput`](bridge_traits::AudioOutput)
//!   whose device thread is driven by explicit `pump` calls
//! - `CpalOutput`: hardware output on the default `cpal` host device
//! - `RingBuffer`: byte queue shared by both outputs between the engine's
//!   stream callback and the device
//!
//! ## Feature Flags
//!
//! - `cpal-output`: Build `CpalOutput` (needs the platform audio development
//!   libraries, e.g. ALSA headers on Linux)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::MemoryOutput;
//! use std::sync::Arc;
//!
//! let output = Arc::new(MemoryOutput::default());
//! // Hand the output to the sound manager, then drive playback:
//! let period = output.pump(handle.raw(), 4096);
//! ```

mod memory;
mod ring_buffer;

#[cfg(feature = "cpal-output")]
mod cpal_output;

pub use memory::{MemoryOutput, MemoryStream, MemoryStreamState, DEFAULT_QUEUE_CAPACITY};
pub use ring_buffer::RingBuffer;

#[cfg(feature = "cpal-output")]
pub use cpal_output::{CpalOutput, CpalStream, DEFAULT_CPAL_QUEUE_CAPACITY};
