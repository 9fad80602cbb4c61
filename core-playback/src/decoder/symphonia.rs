//! # Symphonia Decode Pipeline
//!
//! Shared open/probe/decode loop used by every format decoder.
//!
//! A [`PacketStream`] owns the full Symphonia pipeline for one file:
//! - Media source (the opened file)
//! - Format reader (demuxer) selected by probing with a container hint
//! - Codec decoder for the first decodable track
//!
//! Format decoders only decide how each decoded buffer is serialized.

use crate::decoder::format_detector::FormatDetector;
use crate::error::{PlaybackError, Result};
use crate::traits::ContainerFormat;
use core_runtime::logging::strip_path;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::AudioBufferRef;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use tracing::{debug, error, instrument, warn};

/// Corrupt packets tolerated in a row before decoding is abandoned.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Shape of the decoded signal, learned from the first decoded packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count of the decoded signal.
    pub channels: u16,
    /// Total frames decoded.
    pub frames: u64,
}

/// Open Symphonia pipeline for one sound file.
pub struct PacketStream {
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    container: ContainerFormat,
    sample_rate: Option<u32>,
    channels: Option<u16>,
}

fn decode_error(container: ContainerFormat, message: impl Into<String>) -> PlaybackError {
    PlaybackError::Decode {
        format: container.name().to_string(),
        message: message.into(),
    }
}

impl PacketStream {
    /// Open `path` and prepare to decode it as `container`.
    ///
    /// # Errors
    ///
    /// - `FileOpen` if the file cannot be opened
    /// - `Decode` if probing fails or no decodable track exists
    #[instrument(skip(path), fields(file = %strip_path(&path.to_string_lossy()), container = %container))]
    pub fn open(path: &Path, container: ContainerFormat) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            error!("Failed to open file {:?}: {}", path, e);
            PlaybackError::FileOpen {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        let media_source = Box::new(file) as Box<dyn MediaSource>;
        let mss = MediaSourceStream::new(media_source, Default::default());

        let probe_result = symphonia::default::get_probe()
            .format(
                &FormatDetector::hint_for(container),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                error!("Format probe failed: {}", e);
                decode_error(container, format!("failed to probe container: {}", e))
            })?;

        let format_reader = probe_result.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                error!("No supported audio tracks found");
                decode_error(container, "no decodable audio track")
            })?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate;
        let channels = track.codec_params.channels.map(|ch| ch.count() as u16);
        debug!(
            track_id,
            codec = FormatDetector::codec_name(track.codec_params.codec),
            ?sample_rate,
            ?channels,
            "Selected track"
        );

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                error!("Failed to create decoder: {}", e);
                decode_error(container, format!("failed to create codec decoder: {}", e))
            })?;

        Ok(Self {
            format_reader,
            decoder,
            track_id,
            container,
            sample_rate,
            channels,
        })
    }

    /// Decode every packet of the selected track, handing each decoded
    /// buffer to `sink`.
    ///
    /// The reader's end-of-data signal ends decoding normally. Corrupt packets
    /// are skipped up to a small limit; any other error is fatal.
    pub fn decode_all<F>(&mut self, mut sink: F) -> Result<StreamSummary>
    where
        F: FnMut(&AudioBufferRef<'_>) -> Result<()>,
    {
        let container = self.container;
        let mut sample_rate = self.sample_rate;
        let mut channels = self.channels;
        let mut frames = 0u64;
        let mut consecutive_errors = 0;

        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!(frames, "Reached end of stream");
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("Decoder reset required for track list change");
                    return Err(decode_error(container, "track list changed mid-stream"));
                }
                Err(e) => {
                    error!("Fatal format reader error: {}", e);
                    return Err(decode_error(container, format!("failed to read packet: {}", e)));
                }
            };

            while !self.format_reader.metadata().is_latest() {
                self.format_reader.metadata().pop();
            }

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    consecutive_errors = 0;

                    let spec = decoded.spec();
                    sample_rate.get_or_insert(spec.rate);
                    if channels != Some(spec.channels.count() as u16) {
                        debug!(
                            "Updating channel count from {:?} to {} (detected from decoded audio)",
                            channels,
                            spec.channels.count()
                        );
                        channels = Some(spec.channels.count() as u16);
                    }

                    frames += decoded.frames() as u64;
                    sink(&decoded)?;
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping packet with decode error (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );

                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        error!("Too many consecutive decode errors, stream may be corrupted");
                        return Err(decode_error(
                            container,
                            format!(
                                "decoder failure after {} failed packets: {}",
                                MAX_CONSECUTIVE_ERRORS, err
                            ),
                        ));
                    }
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!(frames, "Decoder reached end of data");
                    break;
                }
                Err(e) => {
                    error!("Fatal decode error: {}", e);
                    return Err(decode_error(container, format!("failed to decode packet: {}", e)));
                }
            }
        }

        let sample_rate = sample_rate
            .ok_or_else(|| decode_error(container, "stream does not declare a sample rate"))?;

        Ok(StreamSummary {
            sample_rate,
            channels: channels.unwrap_or(1),
            frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_file_open_error() {
        let result = PacketStream::open(Path::new("/definitely/not/here.wav"), ContainerFormat::Wav);
        assert!(matches!(result, Err(PlaybackError::FileOpen { .. })));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(b"this is not a riff file at all").unwrap();
        file.flush().unwrap();

        match PacketStream::open(file.path(), ContainerFormat::Wav) {
            Err(PlaybackError::Decode { format, .. }) => assert_eq!(format, "wav"),
            Err(other) => panic!("expected Decode error, got {:?}", other),
            Ok(_) => panic!("expected Decode error"),
        }
    }
}
