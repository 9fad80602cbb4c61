//! # Ring Buffer for Device Queues
//!
//! A fixed-capacity circular byte buffer carrying PCM data from the engine's
//! stream callback (producer) to the device output routine (consumer).
//!
//! ## Design
//!
//! - **Capacity**: Fixed size in bytes, determined at creation
//! - **Overflow Policy**: Writes are truncated to the free space; unread data
//!   is never overwritten
//! - **Sharing**: Cloning yields another handle to the same queue
//!
//! ## Usage
//!
//! ```rust
//! use bridge_desktop::RingBuffer;
//!
//! let buffer = RingBuffer::new(4096);
//!
//! // Producer: queue bytes
//! buffer.write(&[1, 2, 3, 4]);
//!
//! // Consumer: drain bytes
//! let mut output = [0u8; 1024];
//! let read = buffer.read(&mut output);
//! assert_eq!(read, 4);
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone)]
pub struct RingBuffer {
    inner: Arc<RingBufferInner>,
}

struct RingBufferInner {
    state: Mutex<RingState>,
    capacity: usize,
}

struct RingState {
    buffer: Vec<u8>,
    read_pos: usize,
    len: usize,
}

impl RingBuffer {
    /// Create a new ring buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RingBufferInner {
                state: Mutex::new(RingState {
                    buffer: vec![0; capacity],
                    read_pos: 0,
                    len: 0,
                }),
                capacity,
            }),
        }
    }

    /// Write bytes to the ring buffer.
    ///
    /// Returns the number of bytes actually written, which is less than
    /// `data.len()` when the buffer runs out of free space.
    pub fn write(&self, data: &[u8]) -> usize {
        if data.is_empty() || self.inner.capacity == 0 {
            return 0;
        }

        let mut state = self.inner.state.lock();
        let free = self.inner.capacity - state.len;
        let to_write = data.len().min(free);
        let write_pos = (state.read_pos + state.len) % self.inner.capacity;

        let first = to_write.min(self.inner.capacity - write_pos);
        state.buffer[write_pos..write_pos + first].copy_from_slice(&data[..first]);
        let second = to_write - first;
        if second > 0 {
            state.buffer[..second].copy_from_slice(&data[first..to_write]);
        }

        state.len += to_write;
        to_write
    }

    /// Read bytes from the ring buffer.
    ///
    /// Fills `output` with as many bytes as available, up to `output.len()`.
    /// Returns the number of bytes actually read.
    pub fn read(&self, output: &mut [u8]) -> usize {
        if output.is_empty() || self.inner.capacity == 0 {
            return 0;
        }

        let mut state = self.inner.state.lock();
        let to_read = state.len.min(output.len());
        let read_pos = state.read_pos;

        let first = to_read.min(self.inner.capacity - read_pos);
        output[..first].copy_from_slice(&state.buffer[read_pos..read_pos + first]);
        let second = to_read - first;
        if second > 0 {
            output[first..to_read].copy_from_slice(&state.buffer[..second]);
        }

        state.read_pos = (read_pos + to_read) % self.inner.capacity;
        state.len -= to_read;
        to_read
    }

    /// Returns the number of bytes currently available to read.
    pub fn available(&self) -> usize {
        self.inner.state.lock().len
    }

    /// Returns the number of bytes that can be written.
    pub fn free_space(&self) -> usize {
        self.inner.capacity - self.available()
    }

    /// Returns the total capacity of the buffer in bytes.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns the buffer fill percentage (0.0 to 1.0).
    pub fn fill_level(&self) -> f32 {
        if self.inner.capacity == 0 {
            return 0.0;
        }
        self.available() as f32 / self.inner.capacity as f32
    }

    /// Discard all queued bytes.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.read_pos = 0;
        state.len = 0;
    }

    /// Returns `true` if the buffer has no bytes available.
    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Returns `true` if no more bytes can be written.
    pub fn is_full(&self) -> bool {
        self.available() >= self.inner.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_creation() {
        let buffer = RingBuffer::new(1024);
        assert_eq!(buffer.capacity(), 1024);
        assert_eq!(buffer.available(), 0);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
    }

    #[test]
    fn test_ring_buffer_write_read() {
        let buffer = RingBuffer::new(1024);

        let data = vec![1u8, 2, 3, 4];
        let written = buffer.write(&data);
        assert_eq!(written, 4);
        assert_eq!(buffer.available(), 4);

        let mut output = vec![0u8; 4];
        let read = buffer.read(&mut output);
        assert_eq!(read, 4);
        assert_eq!(output, data);
        assert_eq!(buffer.available(), 0);
    }

    #[test]
    fn test_ring_buffer_wrap_around() {
        let buffer = RingBuffer::new(8);

        buffer.write(&[1, 2, 3, 4, 5, 6, 7, 8]);

        let mut output = vec![0u8; 4];
        buffer.read(&mut output);
        assert_eq!(output, vec![1, 2, 3, 4]);

        // Write more (wraps to the front)
        buffer.write(&[9, 10, 11, 12]);

        let mut output = vec![0u8; 8];
        let read = buffer.read(&mut output);
        assert_eq!(read, 8);
        assert_eq!(output, vec![5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_ring_buffer_rejects_overflow() {
        let buffer = RingBuffer::new(4);

        let written = buffer.write(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(written, 4);
        assert!(buffer.is_full());

        // Oldest data survives
        let mut output = vec![0u8; 4];
        assert_eq!(buffer.read(&mut output), 4);
        assert_eq!(output, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_ring_buffer_partial_read() {
        let buffer = RingBuffer::new(1024);

        buffer.write(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);

        let mut output = vec![0u8; 5];
        let read = buffer.read(&mut output);
        assert_eq!(read, 5);
        assert_eq!(output, vec![1, 2, 3, 4, 5]);
        assert_eq!(buffer.available(), 5);
    }

    #[test]
    fn test_ring_buffer_fill_level() {
        let buffer = RingBuffer::new(100);
        buffer.write(&[7u8; 50]);

        let fill = buffer.fill_level();
        assert!((fill - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_ring_buffer_clear() {
        let buffer = RingBuffer::new(1024);

        buffer.write(&[1, 2, 3, 4]);
        assert_eq!(buffer.available(), 4);

        buffer.clear();
        assert_eq!(buffer.available(), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_ring_buffer_free_space() {
        let buffer = RingBuffer::new(100);
        buffer.write(&[1u8; 30]);
        assert_eq!(buffer.free_space(), 70);
    }

    #[test]
    fn test_clones_share_queue() {
        let producer = RingBuffer::new(16);
        let consumer = producer.clone();

        producer.write(&[42; 3]);
        assert_eq!(consumer.available(), 3);
    }
}
