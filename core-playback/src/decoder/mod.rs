//! # Audio Decoder Module
//!
//! Eager, whole-file decoding of sound assets using the Symphonia library.
//!
//! ## Overview
//!
//! Each supported container has a small decoder that turns a file into a
//! [`DecodedSound`]: the complete interleaved sample buffer plus its
//! [`AudioFormat`](bridge_traits::AudioFormat). Decoding happens once per
//! asset, before playback starts, so the device callback never waits on
//! decode work.
//!
//! ## Supported Formats
//!
//! | Extension | Decoder | Output encoding | Feature Flag |
//! |-----------|---------|-----------------|--------------|
//! | `.ogg` | [`OggDecoder`] | `f32`, native channels | `decoder-vorbis` |
//! | `.wav` | [`WavDecoder`] | native (`u8`/`s16`/`s32`/`f32`) | `decoder-wav` |
//! | `.mp3` | [`Mp3Decoder`] | `s16`, stereo | `decoder-mp3` |
//!
//! ## Architecture
//!
//! ```text
//! path → ContainerFormat → PacketStream (probe, track, codec) → SampleConverter → DecodedSound
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use core_playback::decoder::{decoder_for, DecodeOptions};
//! use std::path::Path;
//!
//! # fn example() -> core_playback::Result<()> {
//! let path = Path::new("sounds/click.wav");
//! let sound = decoder_for(path, &DecodeOptions::default())?.decode(path)?;
//! println!("{} bytes of {}", sound.samples.len(), sound.format);
//! # Ok(())
//! # }
//! ```

mod format_detector;
mod mp3;
mod ogg;
mod sample_converter;
mod symphonia;
mod wav;

pub use self::symphonia::{PacketStream, StreamSummary};
pub use format_detector::FormatDetector;
pub use mp3::Mp3Decoder;
pub use ogg::OggDecoder;
pub use sample_converter::SampleConverter;
pub use wav::WavDecoder;

use crate::config::SoundConfig;
use crate::error::Result;
use crate::traits::{ContainerFormat, DecodedSound};
use bridge_traits::playback::AudioFormat;
use bytes::Bytes;
use core_runtime::logging::strip_path;
use std::path::Path;
use tracing::info;

/// Decodes one container format into memory.
pub trait SoundDecoder: Send + Sync {
    /// Container handled by this decoder.
    fn container(&self) -> ContainerFormat;

    /// Decode the whole file at `path`.
    fn decode(&self, path: &Path) -> Result<DecodedSound>;
}

/// Options shared by all decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Bytes reserved for the sample buffer before decoding starts.
    pub capacity_bytes: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::from(&SoundConfig::default())
    }
}

impl From<&SoundConfig> for DecodeOptions {
    fn from(config: &SoundConfig) -> Self {
        Self {
            capacity_bytes: config.decode_capacity_bytes,
        }
    }
}

/// Pick the decoder for `path` by extension.
///
/// No file I/O happens here; an unknown extension or a decoder disabled at
/// compile time fails with `UnsupportedFormat`.
pub fn decoder_for(path: &Path, options: &DecodeOptions) -> Result<Box<dyn SoundDecoder>> {
    let container = ContainerFormat::from_path(path)?;
    FormatDetector::validate_container_support(container)?;

    Ok(match container {
        ContainerFormat::Ogg => Box::new(OggDecoder::new(*options)),
        ContainerFormat::Wav => Box::new(WavDecoder::new(*options)),
        ContainerFormat::Mp3 => Box::new(Mp3Decoder::new(*options)),
    })
}

/// Shrink the decoded buffer to its length and wrap it.
fn finish(path: &Path, container: ContainerFormat, format: AudioFormat, mut samples: Vec<u8>) -> DecodedSound {
    samples.shrink_to_fit();
    let sound = DecodedSound::new(format, container, Bytes::from(samples));

    info!(
        file = %strip_path(&path.to_string_lossy()),
        format = %sound.format,
        bytes = sound.samples.len(),
        duration_ms = sound.duration().as_millis() as u64,
        "Decoded sound"
    );

    sound
}
