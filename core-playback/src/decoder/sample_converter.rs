//! # Sample Format Converter
//!
//! Serializes Symphonia's planar audio buffers into the interleaved
//! little-endian byte layouts handed to device streams.

use bridge_traits::playback::SampleEncoding;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;

/// Runs `$body` with `$buf` bound to the typed `&AudioBuffer<_>` of any variant.
macro_rules! with_buffer {
    ($buffer:expr, $buf:ident => $body:expr) => {
        match $buffer {
            AudioBufferRef::U8(cow) => { let $buf = &**cow; $body }
            AudioBufferRef::U16(cow) => { let $buf = &**cow; $body }
            AudioBufferRef::U24(cow) => { let $buf = &**cow; $body }
            AudioBufferRef::U32(cow) => { let $buf = &**cow; $body }
            AudioBufferRef::S8(cow) => { let $buf = &**cow; $body }
            AudioBufferRef::S16(cow) => { let $buf = &**cow; $body }
            AudioBufferRef::S24(cow) => { let $buf = &**cow; $body }
            AudioBufferRef::S32(cow) => { let $buf = &**cow; $body }
            AudioBufferRef::F32(cow) => { let $buf = &**cow; $body }
            AudioBufferRef::F64(cow) => { let $buf = &**cow; $body }
        }
    };
}

/// Sample converter producing device-ready bytes.
///
/// Every method appends to `out`, so a whole file can be decoded packet by
/// packet into one pre-sized buffer.
pub struct SampleConverter;

impl SampleConverter {
    /// Encoding a buffer keeps when stored natively.
    ///
    /// 24-bit integers widen to `S32`, `F64` narrows to `F32`, and the
    /// encodings devices rarely accept (`S8`, `U16`, `U24`, `U32`) become `F32`.
    pub fn native_encoding(buffer: &AudioBufferRef<'_>) -> SampleEncoding {
        match buffer {
            AudioBufferRef::U8(_) => SampleEncoding::U8,
            AudioBufferRef::S16(_) => SampleEncoding::S16,
            AudioBufferRef::S24(_) | AudioBufferRef::S32(_) => SampleEncoding::S32,
            _ => SampleEncoding::F32,
        }
    }

    /// Append interleaved `f32` samples, keeping every channel.
    pub fn append_f32(buffer: &AudioBufferRef<'_>, out: &mut Vec<u8>) {
        with_buffer!(buffer, buf => Self::interleave::<_, f32>(buf, out, |s, out| {
            out.extend_from_slice(&s.to_le_bytes())
        }))
    }

    /// Append interleaved `i16` stereo frames.
    ///
    /// Mono input is duplicated into both channels; channels beyond the
    /// first two are dropped.
    pub fn append_s16_stereo(buffer: &AudioBufferRef<'_>, out: &mut Vec<u8>) {
        with_buffer!(buffer, buf => Self::stereo_s16(buf, out))
    }

    /// Append samples in `encoding`, keeping every channel.
    pub fn append_encoded(buffer: &AudioBufferRef<'_>, encoding: SampleEncoding, out: &mut Vec<u8>) {
        match encoding {
            SampleEncoding::U8 => with_buffer!(buffer, buf => Self::interleave::<_, u8>(buf, out, |s, out| {
                out.push(s)
            })),
            SampleEncoding::S16 => with_buffer!(buffer, buf => Self::interleave::<_, i16>(buf, out, |s, out| {
                out.extend_from_slice(&s.to_le_bytes())
            })),
            SampleEncoding::S32 => with_buffer!(buffer, buf => Self::interleave::<_, i32>(buf, out, |s, out| {
                out.extend_from_slice(&s.to_le_bytes())
            })),
            SampleEncoding::F32 => Self::append_f32(buffer, out),
        }
    }

    /// Convert and interleave samples of any type.
    ///
    /// Converts from planar format (LLLL...RRRR...) to interleaved (LRLRLR...).
    fn interleave<S, T>(buf: &AudioBuffer<S>, out: &mut Vec<u8>, write: fn(T, &mut Vec<u8>))
    where
        S: Sample + IntoSample<T>,
    {
        let num_channels = buf.spec().channels.count();
        let num_frames = buf.frames();
        out.reserve(num_frames * num_channels * std::mem::size_of::<T>());

        for frame_idx in 0..num_frames {
            for chan_idx in 0..num_channels {
                write(buf.chan(chan_idx)[frame_idx].into_sample(), out);
            }
        }
    }

    fn stereo_s16<S>(buf: &AudioBuffer<S>, out: &mut Vec<u8>)
    where
        S: Sample + IntoSample<i16>,
    {
        let num_channels = buf.spec().channels.count();
        if num_channels == 0 {
            return;
        }

        let left = buf.chan(0);
        let right = buf.chan(if num_channels > 1 { 1 } else { 0 });
        out.reserve(buf.frames() * 4);

        for frame_idx in 0..buf.frames() {
            let l: i16 = left[frame_idx].into_sample();
            let r: i16 = right[frame_idx].into_sample();
            out.extend_from_slice(&l.to_le_bytes());
            out.extend_from_slice(&r.to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::audio::{AsAudioBufferRef, Channels, SignalSpec};

    fn stereo_spec() -> SignalSpec {
        SignalSpec::new(44_100, Channels::FRONT_LEFT | Channels::FRONT_RIGHT)
    }

    fn mono_spec() -> SignalSpec {
        SignalSpec::new(22_050, Channels::FRONT_LEFT)
    }

    fn s16_buffer(spec: SignalSpec, planes: &[&[i16]]) -> AudioBuffer<i16> {
        let frames = planes[0].len();
        let mut buf = AudioBuffer::<i16>::new(frames as u64, spec);
        buf.render_reserved(Some(frames));
        for (ch, plane) in planes.iter().enumerate() {
            buf.chan_mut(ch).copy_from_slice(plane);
        }
        buf
    }

    fn read_i16(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn test_native_encoding() {
        let buf = s16_buffer(mono_spec(), &[&[0, 1]]);
        assert_eq!(SampleConverter::native_encoding(&buf.as_audio_buffer_ref()), SampleEncoding::S16);

        let mut float = AudioBuffer::<f64>::new(4, mono_spec());
        float.render_reserved(Some(4));
        assert_eq!(SampleConverter::native_encoding(&float.as_audio_buffer_ref()), SampleEncoding::F32);

        let mut bytes = AudioBuffer::<u8>::new(4, mono_spec());
        bytes.render_reserved(Some(4));
        assert_eq!(SampleConverter::native_encoding(&bytes.as_audio_buffer_ref()), SampleEncoding::U8);
    }

    #[test]
    fn test_interleaves_planar_s16() {
        let buf = s16_buffer(stereo_spec(), &[&[1, 2, 3], &[-1, -2, -3]]);
        let mut out = Vec::new();
        SampleConverter::append_encoded(&buf.as_audio_buffer_ref(), SampleEncoding::S16, &mut out);

        assert_eq!(read_i16(&out), vec![1, -1, 2, -2, 3, -3]);
    }

    #[test]
    fn test_s16_stereo_duplicates_mono() {
        let buf = s16_buffer(mono_spec(), &[&[100, -200]]);
        let mut out = Vec::new();
        SampleConverter::append_s16_stereo(&buf.as_audio_buffer_ref(), &mut out);

        assert_eq!(read_i16(&out), vec![100, 100, -200, -200]);
    }

    #[test]
    fn test_f32_conversion_is_normalized() {
        let buf = s16_buffer(mono_spec(), &[&[0, i16::MAX, i16::MIN]]);
        let mut out = Vec::new();
        SampleConverter::append_f32(&buf.as_audio_buffer_ref(), &mut out);

        let samples: Vec<f32> = out
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 1.0).abs() < 1e-3);
        assert!((samples[2] + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_appends_without_clearing() {
        let buf = s16_buffer(mono_spec(), &[&[7]]);
        let mut out = vec![0xAA];
        SampleConverter::append_encoded(&buf.as_audio_buffer_ref(), SampleEncoding::S16, &mut out);
        assert_eq!(out, vec![0xAA, 7, 0]);
    }
}
