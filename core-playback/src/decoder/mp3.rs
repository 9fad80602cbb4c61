//! MP3 decoder.

use super::{finish, DecodeOptions, PacketStream, SampleConverter, SoundDecoder};
use crate::error::Result;
use crate::traits::{ContainerFormat, DecodedSound};
use bridge_traits::playback::{AudioFormat, SampleEncoding};
use std::path::Path;
use tracing::instrument;

/// Decodes MP3 into interleaved `s16` stereo, whatever the source layout.
#[derive(Debug, Clone, Copy)]
pub struct Mp3Decoder {
    options: DecodeOptions,
}

impl Mp3Decoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }
}

impl SoundDecoder for Mp3Decoder {
    fn container(&self) -> ContainerFormat {
        ContainerFormat::Mp3
    }

    #[instrument(skip(self, path), level = "debug")]
    fn decode(&self, path: &Path) -> Result<DecodedSound> {
        let mut stream = PacketStream::open(path, ContainerFormat::Mp3)?;
        let mut samples = Vec::with_capacity(self.options.capacity_bytes);

        let summary = stream.decode_all(|buffer| {
            SampleConverter::append_s16_stereo(buffer, &mut samples);
            Ok(())
        })?;

        let format = AudioFormat::new(summary.sample_rate, 2, SampleEncoding::S16);
        Ok(finish(path, ContainerFormat::Mp3, format, samples))
    }
}
