//! Playback bridge traits and supporting audio types.
//!
//! These abstractions allow the sound engine to drive platform-specific
//! audio output devices. Host applications provide an [`AudioOutput`]; the
//! engine opens one [`DeviceStream`] per playable sound and serves sample
//! data on demand through a [`StreamCallback`].
//!
//! ## Pull model
//!
//! ```text
//! device thread ──(token, bytes_requested)──▶ StreamCallback
//!                                                │
//!                                                ▼
//!                                   engine resolves token, locks sound
//!                                                │
//!                                                ▼
//!                                   DeviceStream::put_data(bytes)
//! ```
//!
//! The callback runs on a time-critical thread: it must never block on I/O
//! and implementations must never invoke it while holding a lock that the
//! control thread needs to call `put_data`, `pause`, `resume` or `clear`.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Encoding of a single decoded sample, always little-endian and interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// Unsigned 8-bit PCM (silence at 0x80).
    U8,
    /// Signed 16-bit PCM.
    S16,
    /// Signed 32-bit PCM.
    S32,
    /// 32-bit IEEE float in [-1.0, 1.0].
    F32,
}

impl SampleEncoding {
    /// Size of one sample in bytes.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleEncoding::U8 => 1,
            SampleEncoding::S16 => 2,
            SampleEncoding::S32 | SampleEncoding::F32 => 4,
        }
    }

    /// Byte value that produces silence when repeated.
    pub const fn silence_byte(self) -> u8 {
        match self {
            SampleEncoding::U8 => 0x80,
            _ => 0,
        }
    }
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleEncoding::U8 => "u8",
            SampleEncoding::S16 => "s16",
            SampleEncoding::S32 => "s32",
            SampleEncoding::F32 => "f32",
        };
        f.write_str(name)
    }
}

/// Stream metadata describing decoded PCM data.
///
/// Produced once by a decoder and consumed when a device stream is opened;
/// never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in hertz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Encoding of each sample.
    pub encoding: SampleEncoding,
}

impl AudioFormat {
    /// Create a new audio format description.
    pub fn new(sample_rate: u32, channels: u16, encoding: SampleEncoding) -> Self {
        Self {
            sample_rate,
            channels,
            encoding,
        }
    }

    /// Bytes occupied by one frame (one sample for every channel).
    pub fn bytes_per_frame(&self) -> usize {
        self.encoding.bytes_per_sample() * self.channels as usize
    }

    /// Bytes consumed by one second of playback.
    pub fn bytes_per_second(&self) -> usize {
        self.bytes_per_frame() * self.sample_rate as usize
    }

    /// Number of bytes covering `duration`, truncated to whole frames.
    pub fn bytes_for(&self, duration: Duration) -> usize {
        let frames = duration.as_nanos() * u128::from(self.sample_rate) / 1_000_000_000;
        frames as usize * self.bytes_per_frame()
    }

    /// Playback duration of `bytes` bytes of data in this format.
    pub fn duration_of(&self, bytes: usize) -> Duration {
        let per_second = self.bytes_per_second();
        if per_second == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(bytes as f64 / per_second as f64)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz/{}ch/{}",
            self.sample_rate, self.channels, self.encoding
        )
    }
}

/// Callback invoked by the device thread with `(token, bytes_requested)`.
///
/// The token is the value handed to [`AudioOutput::open_stream`]. The
/// callback answers by calling [`DeviceStream::put_data`] on the stream it
/// owns; it never returns data directly.
pub type StreamCallback = Arc<dyn Fn(u32, usize) + Send + Sync>;

/// One open playback channel bound to one sound.
///
/// Dropping the stream releases the underlying device resource.
pub trait DeviceStream: Send + Sync {
    /// Append bytes to the stream's device queue.
    fn put_data(&self, data: &[u8]);

    /// Stop requesting and consuming data. Queued bytes are kept.
    fn pause(&self);

    /// Start (or continue) requesting and consuming data.
    fn resume(&self);

    /// Discard every byte queued but not yet played.
    fn clear(&self);

    /// Whether the stream is currently paused.
    fn is_paused(&self) -> bool;

    /// Bytes queued but not yet consumed by the device.
    fn queued_bytes(&self) -> usize;
}

/// Platform audio output able to open device streams.
pub trait AudioOutput: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Open a paused stream for `format`.
    ///
    /// `callback` is invoked from the device thread with `token` whenever the
    /// device needs more data.
    fn open_stream(
        &self,
        format: &AudioFormat,
        token: u32,
        callback: StreamCallback,
    ) -> Result<Box<dyn DeviceStream>>;
}
