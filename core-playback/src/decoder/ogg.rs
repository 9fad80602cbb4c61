//! Ogg Vorbis decoder.

use super::{finish, DecodeOptions, PacketStream, SampleConverter, SoundDecoder};
use crate::error::Result;
use crate::traits::{ContainerFormat, DecodedSound};
use bridge_traits::playback::{AudioFormat, SampleEncoding};
use std::path::Path;
use tracing::instrument;

/// Decodes Ogg Vorbis into interleaved `f32` with the stream's channel count.
#[derive(Debug, Clone, Copy)]
pub struct OggDecoder {
    options: DecodeOptions,
}

impl OggDecoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }
}

impl SoundDecoder for OggDecoder {
    fn container(&self) -> ContainerFormat {
        ContainerFormat::Ogg
    }

    #[instrument(skip(self, path), level = "debug")]
    fn decode(&self, path: &Path) -> Result<DecodedSound> {
        let mut stream = PacketStream::open(path, ContainerFormat::Ogg)?;
        let mut samples = Vec::with_capacity(self.options.capacity_bytes);

        let summary = stream.decode_all(|buffer| {
            SampleConverter::append_f32(buffer, &mut samples);
            Ok(())
        })?;

        let format = AudioFormat::new(summary.sample_rate, summary.channels, SampleEncoding::F32);
        Ok(finish(path, ContainerFormat::Ogg, format, samples))
    }
}
