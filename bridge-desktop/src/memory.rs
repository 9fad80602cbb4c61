//! Headless audio output.
//!
//! `MemoryOutput` implements [`AudioOutput`] without any sound hardware. The
//! "device thread" is whoever calls [`MemoryOutput::pump`]: each call plays
//! one device period by asking the engine's callback for the missing bytes
//! and draining them from the stream queue. Dedicated servers and tests use
//! it to run the full playback pipeline deterministically.

use crate::ring_buffer::RingBuffer;
use bridge_traits::{
    error::{BridgeError, Result},
    playback::{AudioFormat, AudioOutput, DeviceStream, StreamCallback},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Default per-stream queue capacity (one second of 48 kHz stereo f32).
pub const DEFAULT_QUEUE_CAPACITY: usize = 48_000 * 2 * 4;

/// Snapshot of one stream opened through a [`MemoryOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStreamState {
    /// Format the stream was opened with.
    pub format: AudioFormat,
    /// Whether the stream is paused.
    pub paused: bool,
    /// Bytes queued but not yet pumped.
    pub queued_bytes: usize,
    /// `false` once the owning `DeviceStream` has been dropped.
    pub open: bool,
}

struct MemoryStreamShared {
    token: u32,
    format: AudioFormat,
    queue: RingBuffer,
    paused: AtomicBool,
    open: AtomicBool,
    callback: StreamCallback,
}

/// Device stream handed to the engine by [`MemoryOutput`].
pub struct MemoryStream {
    shared: Arc<MemoryStreamShared>,
}

impl DeviceStream for MemoryStream {
    fn put_data(&self, data: &[u8]) {
        let written = self.shared.queue.write(data);
        if written < data.len() {
            trace!(
                token = self.shared.token,
                dropped = data.len() - written,
                "Memory stream queue full"
            );
        }
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

impl Drop for MemoryStream {
    fn drop(&mut self) {
        self.shared.open.store(false, Ordering::Release);
        self.shared.queue.clear();
        debug!(token = self.shared.token, "Memory stream destroyed");
    }
}

/// In-memory [`AudioOutput`] driven by explicit [`pump`](Self::pump) calls.
pub struct MemoryOutput {
    queue_capacity: usize,
    streams: Mutex<HashMap<u32, Arc<MemoryStreamShared>>>,
    failure: Option<String>,
}

impl MemoryOutput {
    /// Create an output whose streams queue at most `queue_capacity` bytes.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            streams: Mutex::new(HashMap::new()),
            failure: None,
        }
    }

    /// Create an output that refuses to open any stream.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new(0)
        }
    }

    /// Play one device period of `bytes` bytes on the stream bound to `token`.
    ///
    /// A playing stream first asks the callback for whatever the queue is
    /// missing, capped at the queue's free space, then drains up to `bytes`
    /// bytes. The result is always `bytes`
    /// long; missing data is padded with silence. Paused, closed and unknown
    /// streams yield pure silence without invoking the callback.
    pub fn pump(&self, token: u32, bytes: usize) -> Vec<u8> {
        let Some(shared) = self.streams.lock().get(&token).cloned() else {
            return vec![0; bytes];
        };

        let silence = shared.format.encoding.silence_byte();
        let mut output = vec![silence; bytes];

        if !shared.open.load(Ordering::Acquire) || shared.paused.load(Ordering::Acquire) {
            return output;
        }

        let deficit = bytes.saturating_sub(shared.queue.available());
        let request = deficit.min(shared.queue.free_space());
        if request > 0 {
            (shared.callback)(token, request);
        }

        let read = shared.queue.read(&mut output);
        trace!(token, requested = bytes, delivered = read, "Pumped memory stream");
        output
    }

    /// Inspect the stream most recently opened for `token`.
    pub fn stream_state(&self, token: u32) -> Option<MemoryStreamState> {
        self.streams
            .lock()
            .get(&token)
            .map(|shared| MemoryStreamState {
                format: shared.format,
                paused: shared.paused.load(Ordering::Acquire),
                queued_bytes: shared.queue.available(),
                open: shared.open.load(Ordering::Acquire),
            })
    }

    /// Number of streams that have been opened and not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.streams
            .lock()
            .values()
            .filter(|shared| shared.open.load(Ordering::Acquire))
            .count()
    }
}

impl Default for MemoryOutput {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl AudioOutput for MemoryOutput {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open_stream(
        &self,
        format: &AudioFormat,
        token: u32,
        callback: StreamCallback,
    ) -> Result<Box<dyn DeviceStream>> {
        if let Some(reason) = &self.failure {
            return Err(BridgeError::NotAvailable(reason.clone()));
        }

        let shared = Arc::new(MemoryStreamShared {
            token,
            format: *format,
            queue: RingBuffer::new(self.queue_capacity),
            paused: AtomicBool::new(true),
            open: AtomicBool::new(true),
            callback,
        });

        self.streams.lock().insert(token, Arc::clone(&shared));
        debug!(token, format = %format, "Opened memory stream");

        Ok(Box::new(MemoryStream { shared }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::playback::SampleEncoding;
    use std::sync::atomic::AtomicUsize;

    fn format() -> AudioFormat {
        AudioFormat::new(8_000, 1, SampleEncoding::U8)
    }

    #[test]
    fn test_streams_open_paused() {
        let output = MemoryOutput::new(64);
        let callback: StreamCallback = Arc::new(|_, _| {});
        let stream = output.open_stream(&format(), 3, callback).unwrap();

        assert!(stream.is_paused());
        let state = output.stream_state(3).unwrap();
        assert!(state.paused);
        assert!(state.open);
        assert_eq!(output.open_streams(), 1);
    }

    #[test]
    fn test_paused_stream_yields_silence_without_callback() {
        let output = MemoryOutput::new(64);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let callback: StreamCallback = Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let _stream = output.open_stream(&format(), 1, callback).unwrap();

        let played = output.pump(1, 8);
        assert_eq!(played, vec![0x80; 8]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pump_requests_deficit() {
        let output = Arc::new(MemoryOutput::new(64));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let callback: StreamCallback = Arc::new(move |token, bytes| {
            seen.lock().push((token, bytes));
        });
        let stream = output.open_stream(&format(), 9, callback).unwrap();
        stream.put_data(&[1, 2, 3]);
        stream.resume();

        let played = output.pump(9, 5);

        assert_eq!(*requests.lock(), vec![(9, 2)]);
        assert_eq!(played, vec![1, 2, 3, 0x80, 0x80]);
    }

    #[test]
    fn test_pump_request_capped_at_free_space() {
        let output = Arc::new(MemoryOutput::new(4));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let callback: StreamCallback = Arc::new(move |token, bytes| {
            seen.lock().push((token, bytes));
        });
        let stream = output.open_stream(&format(), 2, callback).unwrap();
        stream.put_data(&[7]);
        stream.resume();

        let played = output.pump(2, 10);

        assert_eq!(*requests.lock(), vec![(2, 3)]);
        assert_eq!(played[0], 7);
        assert_eq!(&played[1..], &[0x80; 9]);
    }

    #[test]
    fn test_dropped_stream_is_closed() {
        let output = MemoryOutput::new(64);
        let callback: StreamCallback = Arc::new(|_, _| {});
        let stream = output.open_stream(&format(), 4, callback).unwrap();
        stream.put_data(&[5; 10]);
        drop(stream);

        let state = output.stream_state(4).unwrap();
        assert!(!state.open);
        assert_eq!(state.queued_bytes, 0);
        assert_eq!(output.open_streams(), 0);
    }

    #[test]
    fn test_failing_output() {
        let output = MemoryOutput::failing("no device");
        let callback: StreamCallback = Arc::new(|_, _| {});
        let result = output.open_stream(&format(), 1, callback);
        assert!(matches!(result, Err(BridgeError::NotAvailable(_))));
    }
}
