//! # Sound Playback Engine
//!
//! Loads short sound assets into memory and streams them to a platform audio
//! output on demand.
//!
//! ## Overview
//!
//! This crate handles:
//! - Whole-file decoding of Ogg Vorbis, WAV and MP3 using symphonia
//!   (feature-gated per container)
//! - A registry mapping integer handles to live sound instances
//! - The per-instance playback state machine (play, pause, resume, stop,
//!   loop, close)
//! - The bridge that answers device callbacks by handle
//! - [`SoundManager`], the facade a game uses: pooling, category control and
//!   shutdown
//!
//! ## Threads
//!
//! Control calls come from the game thread; device requests arrive on the
//! platform's audio thread through the callback installed by the manager.
//! Each instance serializes both behind its own lock.

pub mod bridge;
pub mod config;
pub mod decoder;
pub mod error;
pub mod manager;
pub mod registry;
pub mod sound;
pub mod traits;

pub use bridge::service_device_request;
pub use config::SoundConfig;
pub use decoder::{decoder_for, DecodeOptions, FormatDetector, SoundDecoder};
pub use error::{PlaybackError, Result};
pub use manager::SoundManager;
pub use registry::{HandleRegistry, SoundHandle};
pub use sound::{PlaybackState, SoundInstance};
pub use traits::{ContainerFormat, DecodedSound, SampleSource, SoundCategory};
