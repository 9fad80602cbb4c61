//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the sound engine and the
//! platform-specific audio stack. The engine never talks to a sound card
//! directly: it asks an [`AudioOutput`](playback::AudioOutput) for one
//! [`DeviceStream`](playback::DeviceStream) per playable sound and feeds it
//! through a pull-based [`StreamCallback`](playback::StreamCallback) that the
//! platform invokes from its own audio thread.
//!
//! ## Traits
//!
//! ### Audio output
//! - [`AudioOutput`](playback::AudioOutput) - Opens device streams for a decoded format
//! - [`DeviceStream`](playback::DeviceStream) - Queue, pause, resume and clear one stream
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Headless | `bridge-desktop` (`MemoryOutput`) | ✅ |
//! | Desktop  | `bridge-desktop` (`CpalOutput`, feature `cpal-output`) | ✅ |
//!
//! ## Callback Context
//!
//! The device callback only carries a fixed-width integer token, never a
//! reference. Implementations must hand the token given to `open_stream`
//! back to the callback unchanged; the engine resolves it to a live sound
//! through its handle registry.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should convert platform-specific errors to
//! `BridgeError` and include actionable context (device name, format).
//!
//! ## Thread Safety
//!
//! Streams are touched by the control thread and by the device thread, so
//! every bridge trait requires `Send + Sync`.

pub mod error;
pub mod logging;
pub mod playback;

pub use error::BridgeError;

// Re-export commonly used types
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{AudioFormat, AudioOutput, DeviceStream, SampleEncoding, StreamCallback};
