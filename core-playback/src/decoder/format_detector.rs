//! # Format Detection Module
//!
//! Maps containers to Symphonia probe hints and checks which decoders were
//! compiled in.

use crate::error::{PlaybackError, Result};
use crate::traits::ContainerFormat;
use symphonia::core::codecs::CodecType;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Format detector for sound files.
///
/// The container is always chosen from the file extension before any I/O;
/// the hint generated here only steers Symphonia's probe towards the same
/// reader.
pub struct FormatDetector;

impl FormatDetector {
    /// Create a probe hint for a container.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_playback::{ContainerFormat, FormatDetector};
    ///
    /// let hint = FormatDetector::hint_for(ContainerFormat::Wav);
    /// // Hint will contain extension "wav" and MIME type "audio/wav"
    /// ```
    pub fn hint_for(container: ContainerFormat) -> Hint {
        let mut hint = Hint::new();
        debug!("Setting probe hint extension: {}", container.extension());
        hint.with_extension(container.extension());
        hint.mime_type(Self::container_mime_type(container));
        hint
    }

    /// Check that the decoder for `container` is enabled at compile time.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Container is supported
    /// - `Err(PlaybackError::UnsupportedFormat)` - Decoder feature not enabled
    pub fn validate_container_support(container: ContainerFormat) -> Result<()> {
        let enabled = match container {
            ContainerFormat::Ogg => cfg!(feature = "decoder-vorbis"),
            ContainerFormat::Wav => cfg!(feature = "decoder-wav"),
            ContainerFormat::Mp3 => cfg!(feature = "decoder-mp3"),
        };

        if enabled {
            Ok(())
        } else {
            warn!("Decoder for {} not enabled in this build", container);
            Err(PlaybackError::UnsupportedFormat {
                extension: container.extension().to_string(),
            })
        }
    }

    /// Short codec name for logs.
    pub fn codec_name(codec_type: CodecType) -> &'static str {
        use symphonia::core::codecs::*;

        if codec_type == CODEC_TYPE_VORBIS {
            "vorbis"
        } else if codec_type == CODEC_TYPE_MP3 {
            "mp3"
        } else if codec_type == CODEC_TYPE_MP2 || codec_type == CODEC_TYPE_MP1 {
            "mpeg audio"
        } else if codec_type == CODEC_TYPE_PCM_U8
            || codec_type == CODEC_TYPE_PCM_S16LE
            || codec_type == CODEC_TYPE_PCM_S24LE
            || codec_type == CODEC_TYPE_PCM_S32LE
            || codec_type == CODEC_TYPE_PCM_F32LE
            || codec_type == CODEC_TYPE_PCM_F64LE
        {
            "pcm"
        } else if codec_type == CODEC_TYPE_PCM_ALAW || codec_type == CODEC_TYPE_PCM_MULAW {
            "g.711"
        } else {
            "other"
        }
    }

    /// Get the MIME type for a container.
    pub fn container_mime_type(container: ContainerFormat) -> &'static str {
        match container {
            ContainerFormat::Ogg => "audio/ogg",
            ContainerFormat::Wav => "audio/wav",
            ContainerFormat::Mp3 => "audio/mpeg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::codecs::{CODEC_TYPE_MP3, CODEC_TYPE_PCM_S16LE, CODEC_TYPE_VORBIS};

    #[test]
    fn test_container_mime_type() {
        assert_eq!(FormatDetector::container_mime_type(ContainerFormat::Mp3), "audio/mpeg");
        assert_eq!(FormatDetector::container_mime_type(ContainerFormat::Ogg), "audio/ogg");
        assert_eq!(FormatDetector::container_mime_type(ContainerFormat::Wav), "audio/wav");
    }

    #[test]
    fn test_codec_name() {
        assert_eq!(FormatDetector::codec_name(CODEC_TYPE_VORBIS), "vorbis");
        assert_eq!(FormatDetector::codec_name(CODEC_TYPE_MP3), "mp3");
        assert_eq!(FormatDetector::codec_name(CODEC_TYPE_PCM_S16LE), "pcm");
    }

    #[test]
    fn test_default_features_enable_every_container() {
        #[cfg(all(feature = "decoder-vorbis", feature = "decoder-wav", feature = "decoder-mp3"))]
        for container in [ContainerFormat::Ogg, ContainerFormat::Wav, ContainerFormat::Mp3] {
            assert!(FormatDetector::validate_container_support(container).is_ok());
        }
    }
}
