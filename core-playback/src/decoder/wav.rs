//! RIFF/WAVE decoder.

use super::{finish, DecodeOptions, PacketStream, SampleConverter, SoundDecoder};
use crate::error::Result;
use crate::traits::{ContainerFormat, DecodedSound};
use bridge_traits::playback::{AudioFormat, SampleEncoding};
use std::path::Path;
use tracing::instrument;

/// Decodes WAV keeping the file's own sample encoding where devices accept it.
///
/// `u8` and `s16` are kept as is, 24/32-bit integers are stored as `s32` and
/// floating point as `f32`. The encoding is fixed by the first decoded packet.
#[derive(Debug, Clone, Copy)]
pub struct WavDecoder {
    options: DecodeOptions,
}

impl WavDecoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }
}

impl SoundDecoder for WavDecoder {
    fn container(&self) -> ContainerFormat {
        ContainerFormat::Wav
    }

    #[instrument(skip(self, path), level = "debug")]
    fn decode(&self, path: &Path) -> Result<DecodedSound> {
        let mut stream = PacketStream::open(path, ContainerFormat::Wav)?;
        let mut samples = Vec::with_capacity(self.options.capacity_bytes);
        let mut encoding = None;

        let summary = stream.decode_all(|buffer| {
            let target = *encoding.get_or_insert_with(|| SampleConverter::native_encoding(buffer));
            SampleConverter::append_encoded(buffer, target, &mut samples);
            Ok(())
        })?;

        let format = AudioFormat::new(
            summary.sample_rate,
            summary.channels,
            encoding.unwrap_or(SampleEncoding::F32),
        );
        Ok(finish(path, ContainerFormat::Wav, format, samples))
    }
}
