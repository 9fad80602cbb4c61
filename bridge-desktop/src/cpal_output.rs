//! Hardware audio output using `cpal`.
//!
//! Every device stream gets its own cpal output stream on the default host
//! device, configured with the decoded format so no conversion happens on
//! the audio thread. cpal streams are not `Send` on every platform, so each
//! one lives on a small holder thread; the [`DeviceStream`] handed to the
//! engine only shares the byte queue and the pause flag with it.

use crate::ring_buffer::RingBuffer;
use bridge_traits::{
    error::{BridgeError, Result},
    playback::{AudioFormat, AudioOutput, DeviceStream, SampleEncoding, StreamCallback},
};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};

/// Default per-stream queue capacity (half a second of 48 kHz stereo f32).
pub const DEFAULT_CPAL_QUEUE_CAPACITY: usize = 48_000 * 2 * 4 / 2;

struct CpalShared {
    queue: RingBuffer,
    paused: AtomicBool,
}

/// Device stream backed by a cpal output stream.
pub struct CpalStream {
    shared: Arc<CpalShared>,
    // Dropping the sender wakes the holder thread, which drops the cpal stream.
    _shutdown: mpsc::Sender<()>,
}

impl DeviceStream for CpalStream {
    fn put_data(&self, data: &[u8]) {
        self.shared.queue.write(data);
    }

    fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
    }

    fn clear(&self) {
        self.shared.queue.clear();
    }

    fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    fn queued_bytes(&self) -> usize {
        self.shared.queue.available()
    }
}

/// [`AudioOutput`] playing through the default cpal host device.
pub struct CpalOutput {
    queue_capacity: usize,
}

impl CpalOutput {
    /// Create an output using [`DEFAULT_CPAL_QUEUE_CAPACITY`].
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_CPAL_QUEUE_CAPACITY)
    }

    /// Create an output whose streams queue at most `queue_capacity` bytes.
    ///
    /// Requests never exceed the queue's free space. A capacity smaller than
    /// one device period pads every period with silence and slows playback
    /// down, but no audio is skipped.
    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self { queue_capacity }
    }

    fn sample_format(encoding: SampleEncoding) -> SampleFormat {
        match encoding {
            SampleEncoding::U8 => SampleFormat::U8,
            SampleEncoding::S16 => SampleFormat::I16,
            SampleEncoding::S32 => SampleFormat::I32,
            SampleEncoding::F32 => SampleFormat::F32,
        }
    }

    fn build_stream(
        format: AudioFormat,
        token: u32,
        callback: StreamCallback,
        shared: Arc<CpalShared>,
    ) -> std::result::Result<cpal::Stream, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "no default output device".to_string())?;

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };
        let silence = format.encoding.silence_byte();

        let stream = device
            .build_output_stream_raw(
                &config,
                Self::sample_format(format.encoding),
                move |data: &mut cpal::Data, _: &cpal::OutputCallbackInfo| {
                    let out = data.bytes_mut();
                    if shared.paused.load(Ordering::Acquire) {
                        out.fill(silence);
                        return;
                    }

                    let deficit = out.len().saturating_sub(shared.queue.available());
                    let request = deficit.min(shared.queue.free_space());
                    if request > 0 {
                        callback(token, request);
                    }

                    let read = shared.queue.read(out);
                    out[read..].fill(silence);
                },
                move |err| error!(token, "Audio stream error: {}", err),
                None,
            )
            .map_err(|e| format!("failed to build output stream for {format}: {e}"))?;

        stream
            .play()
            .map_err(|e| format!("failed to start output stream: {e}"))?;

        Ok(stream)
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for CpalOutput {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn open_stream(
        &self,
        format: &AudioFormat,
        token: u32,
        callback: StreamCallback,
    ) -> Result<Box<dyn DeviceStream>> {
        let shared = Arc::new(CpalShared {
            queue: RingBuffer::new(self.queue_capacity),
            paused: AtomicBool::new(true),
        });

        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<(), String>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let thread_shared = Arc::clone(&shared);
        let format = *format;

        thread::Builder::new()
            .name(format!("sound-device-{token}"))
            .spawn(move || {
                let stream = match Self::build_stream(format, token, callback, thread_shared) {
                    Ok(stream) => stream,
                    Err(message) => {
                        let _ = ready_tx.send(Err(message));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Blocks until the CpalStream (and its sender) is dropped.
                let _ = shutdown_rx.recv();
                drop(stream);
                debug!(token, "cpal stream destroyed");
            })
            .map_err(BridgeError::Io)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!(token, format = %format, "Opened cpal stream");
                Ok(Box::new(CpalStream {
                    shared,
                    _shutdown: shutdown_tx,
                }))
            }
            Ok(Err(message)) => Err(BridgeError::OperationFailed(message)),
            Err(_) => Err(BridgeError::OperationFailed(
                "device thread exited before reporting".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_format_mapping() {
        assert_eq!(CpalOutput::sample_format(SampleEncoding::U8), SampleFormat::U8);
        assert_eq!(CpalOutput::sample_format(SampleEncoding::S16), SampleFormat::I16);
        assert_eq!(CpalOutput::sample_format(SampleEncoding::S32), SampleFormat::I32);
        assert_eq!(CpalOutput::sample_format(SampleEncoding::F32), SampleFormat::F32);
    }
}
