//! # Core Playback Types
//!
//! Shared vocabulary of the engine: sound categories, supported containers
//! and the [`SampleSource`] capability that every decoder produces.
//!
//! ## Architecture
//!
//! Decoders only know how to turn a file into a [`DecodedSound`]. Everything
//! that happens afterwards (state machine, device callback, pooling) is
//! written once against [`SampleSource`], so no playback logic is duplicated
//! per format.
//!
//! ```text
//! path ─▶ ContainerFormat::from_path ─▶ SoundDecoder ─▶ DecodedSound
//!                                                         │ (SampleSource)
//!                                                         ▼
//!                                                    SoundInstance
//! ```

use crate::error::{PlaybackError, Result};
use bridge_traits::playback::AudioFormat;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ============================================================================
// Categories
// ============================================================================

/// Logical grouping used for bulk stop/pause/resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundCategory {
    /// Short one-shot or looping effects.
    Effect,
    /// Background music.
    Music,
}

impl fmt::Display for SoundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundCategory::Effect => f.write_str("effect"),
            SoundCategory::Music => f.write_str("music"),
        }
    }
}

// ============================================================================
// Container Formats
// ============================================================================

/// Supported input containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// Ogg Vorbis
    Ogg,
    /// RIFF/WAVE PCM
    Wav,
    /// MPEG-1/2 Audio Layer III
    Mp3,
}

impl ContainerFormat {
    /// Match a bare extension (without the dot), ignoring case.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "ogg" => Some(ContainerFormat::Ogg),
            "wav" => Some(ContainerFormat::Wav),
            "mp3" => Some(ContainerFormat::Mp3),
            _ => None,
        }
    }

    /// Select the container for `path` from its extension.
    ///
    /// Performs no I/O. A missing extension is reported as an empty one.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self::from_extension(&extension).ok_or_else(|| PlaybackError::UnsupportedFormat {
            extension: extension.to_ascii_lowercase(),
        })
    }

    /// Human-readable format name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            ContainerFormat::Ogg => "ogg vorbis",
            ContainerFormat::Wav => "wav",
            ContainerFormat::Mp3 => "mp3",
        }
    }

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Ogg => "ogg",
            ContainerFormat::Wav => "wav",
            ContainerFormat::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Sample Sources
// ============================================================================

/// Read-only random access into decoded, interleaved sample bytes.
///
/// Owned by exactly one sound instance. The instance calls
/// [`release`](SampleSource::release) once, when it is closed, regardless of
/// where the bytes were allocated.
pub trait SampleSource: Send + Sync {
    /// Format of the bytes returned by [`bytes`](SampleSource::bytes).
    fn format(&self) -> &AudioFormat;

    /// The full decoded buffer.
    fn bytes(&self) -> &[u8];

    /// Length of the decoded buffer in bytes.
    fn len(&self) -> usize {
        self.bytes().len()
    }

    /// Whether the decoded buffer is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release the underlying allocation.
    fn release(self: Box<Self>) {}
}

/// Fully decoded sound held in memory.
///
/// Cloning is cheap: the sample bytes are reference counted, so every pooled
/// instance of the same file shares one allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSound {
    /// Format of `samples`.
    pub format: AudioFormat,
    /// Container the sound was decoded from.
    pub container: ContainerFormat,
    /// Interleaved little-endian samples.
    pub samples: Bytes,
}

impl DecodedSound {
    pub fn new(format: AudioFormat, container: ContainerFormat, samples: Bytes) -> Self {
        Self {
            format,
            container,
            samples,
        }
    }

    /// Playback length of the decoded samples.
    pub fn duration(&self) -> std::time::Duration {
        self.format.duration_of(self.samples.len())
    }
}

impl SampleSource for DecodedSound {
    fn format(&self) -> &AudioFormat {
        &self.format
    }

    fn bytes(&self) -> &[u8] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::playback::SampleEncoding;
    use std::time::Duration;

    #[test]
    fn test_container_from_path_is_case_insensitive() {
        assert_eq!(
            ContainerFormat::from_path(Path::new("sounds/click.WAV")).unwrap(),
            ContainerFormat::Wav
        );
        assert_eq!(
            ContainerFormat::from_path(Path::new("music/theme.Ogg")).unwrap(),
            ContainerFormat::Ogg
        );
        assert_eq!(
            ContainerFormat::from_path(Path::new("jump.mp3")).unwrap(),
            ContainerFormat::Mp3
        );
    }

    #[test]
    fn test_container_rejects_unknown_extension() {
        match ContainerFormat::from_path(Path::new("song.xyz")) {
            Err(PlaybackError::UnsupportedFormat { extension }) => assert_eq!(extension, "xyz"),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }

        match ContainerFormat::from_path(Path::new("README")) {
            Err(PlaybackError::UnsupportedFormat { extension }) => assert!(extension.is_empty()),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_category_display() {
        assert_eq!(SoundCategory::Effect.to_string(), "effect");
        assert_eq!(SoundCategory::Music.to_string(), "music");
    }

    #[test]
    fn test_decoded_sound_shares_bytes() {
        let format = AudioFormat::new(8_000, 1, SampleEncoding::S16);
        let sound = DecodedSound::new(format, ContainerFormat::Wav, Bytes::from(vec![0u8; 16_000]));
        let copy = sound.clone();

        assert_eq!(sound.bytes().as_ptr(), copy.bytes().as_ptr());
        assert_eq!(copy.len(), 16_000);
        assert_eq!(sound.duration(), Duration::from_secs(1));

        let boxed: Box<dyn SampleSource> = Box::new(copy);
        boxed.release();
        assert_eq!(sound.len(), 16_000);
    }
}
