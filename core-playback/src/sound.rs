//! # Sound Instance
//!
//! One playable unit: a decoded sample buffer, a device stream, and the
//! playback state machine guarding both.
//!
//! ## State machine
//!
//! ```text
//!            play()               pause()
//!  Stopped ─────────▶ Playing ─────────────▶ Paused
//!     ▲                 │  ▲                   │
//!     │ stop() / end    │  └──── resume() ─────┘
//!     └─────────────────┘
//!
//!  any state ── close() ──▶ Closed (terminal, every call is a no-op)
//! ```
//!
//! `play()` always restarts from the beginning and refuses to restart a
//! sound that is already playing; `resume()` continues from the cursor.
//!
//! ## Concurrency
//!
//! Every mutable field lives in one `parking_lot::Mutex`. Control calls and
//! the device callback take that lock for their whole critical section and
//! never block on anything but the device stream's own queue. Teardown moves
//! the stream and the sample source out under the lock, so an in-flight
//! callback either finishes with the buffer before `close()` gets the lock or
//! observes `Closed` afterwards.

use crate::registry::{HandleRegistry, SoundHandle};
use crate::traits::{SampleSource, SoundCategory};
use bridge_traits::playback::{AudioFormat, DeviceStream};
use core_runtime::logging::strip_path;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, Weak};
use tracing::{debug, trace};

/// Playback state of a sound instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// Not delivering audio; the cursor is at the start (or the end after a
    /// one-shot finished).
    Stopped,
    /// Delivering audio on every device request.
    Playing,
    /// Not delivering audio; the cursor is kept for `resume()`.
    Paused,
    /// Released; the instance is unusable.
    Closed,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Closed => "closed",
        };
        f.write_str(name)
    }
}

struct PlaybackCore {
    source: Option<Box<dyn SampleSource>>,
    stream: Option<Box<dyn DeviceStream>>,
    cursor: usize,
    state: PlaybackState,
    looping: bool,
}

/// A playable sound bound to one decoded buffer and one device stream.
pub struct SoundInstance {
    handle: OnceLock<SoundHandle>,
    category: SoundCategory,
    path: PathBuf,
    format: AudioFormat,
    len_bytes: usize,
    core: Mutex<PlaybackCore>,
    registry: Weak<HandleRegistry>,
}

impl SoundInstance {
    /// Create a stopped, non-looping instance over `source`.
    ///
    /// The instance has no device stream until
    /// [`attach_stream`](Self::attach_stream) is called; until then every
    /// playback call is a no-op. `registry` is where `close()` unregisters
    /// the handle.
    pub fn new(
        category: SoundCategory,
        path: PathBuf,
        source: Box<dyn SampleSource>,
        registry: Weak<HandleRegistry>,
    ) -> Self {
        let format = *source.format();
        let len_bytes = source.len();

        Self {
            handle: OnceLock::new(),
            category,
            path,
            format,
            len_bytes,
            core: Mutex::new(PlaybackCore {
                source: Some(source),
                stream: None,
                cursor: 0,
                state: PlaybackState::Stopped,
                looping: false,
            }),
            registry,
        }
    }

    pub(crate) fn assign_handle(&self, handle: SoundHandle) -> bool {
        self.handle.set(handle).is_ok()
    }

    /// Bind the device stream opened for this instance.
    ///
    /// Returns `false` (and drops `stream`) if the instance is already closed
    /// or already has a stream.
    pub fn attach_stream(&self, stream: Box<dyn DeviceStream>) -> bool {
        let mut core = self.core.lock();
        if core.state == PlaybackState::Closed || core.stream.is_some() {
            return false;
        }
        core.stream = Some(stream);
        true
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Handle assigned at registration.
    pub fn handle(&self) -> Option<SoundHandle> {
        self.handle.get().copied()
    }

    pub fn category(&self) -> SoundCategory {
        self.category
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format of the decoded buffer.
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Length of the decoded buffer in bytes.
    pub fn len_bytes(&self) -> usize {
        self.len_bytes
    }

    pub fn state(&self) -> PlaybackState {
        self.core.lock().state
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn is_closed(&self) -> bool {
        self.state() == PlaybackState::Closed
    }

    pub fn is_looping(&self) -> bool {
        self.core.lock().looping
    }

    /// Byte offset of the next sample to deliver.
    pub fn cursor(&self) -> usize {
        self.core.lock().cursor
    }

    fn raw_handle(&self) -> u32 {
        self.handle().map(SoundHandle::raw).unwrap_or(0)
    }

    // ========================================================================
    // Playback control
    // ========================================================================

    /// Start playback from the beginning.
    ///
    /// Returns `true` if playback started; `false` if the sound was already
    /// playing, is closed, or has no device stream.
    pub fn play(&self) -> bool {
        let mut core = self.core.lock();
        if matches!(core.state, PlaybackState::Playing | PlaybackState::Closed) {
            return false;
        }

        let core = &mut *core;
        let Some(stream) = core.stream.as_ref() else {
            return false;
        };

        core.cursor = 0;
        stream.clear();
        core.state = PlaybackState::Playing;
        stream.resume();

        debug!(handle = self.raw_handle(), looping = core.looping, "Sound playing");
        true
    }

    /// Pause playback, keeping the cursor.
    ///
    /// Only `Playing` moves to `Paused`; other states are kept. The device
    /// stream is paused either way.
    pub fn pause(&self) {
        let mut core = self.core.lock();
        if core.state == PlaybackState::Closed {
            return;
        }

        if core.state == PlaybackState::Playing {
            core.state = PlaybackState::Paused;
        }
        if let Some(stream) = core.stream.as_ref() {
            stream.pause();
        }
    }

    /// Continue playback from the cursor, from any state but `Closed`.
    pub fn resume(&self) {
        let mut core = self.core.lock();
        if core.state == PlaybackState::Closed {
            return;
        }

        let core = &mut *core;
        if let Some(stream) = core.stream.as_ref() {
            core.state = PlaybackState::Playing;
            stream.resume();
        }
    }

    /// Stop playback, rewind, and discard queued device data.
    pub fn stop(&self) {
        let mut core = self.core.lock();
        if core.state == PlaybackState::Closed {
            return;
        }

        core.state = PlaybackState::Stopped;
        core.cursor = 0;
        if let Some(stream) = core.stream.as_ref() {
            stream.pause();
            stream.clear();
        }
    }

    /// Enable or disable looping; takes effect on the next device request.
    pub fn set_loop(&self, looping: bool) {
        let mut core = self.core.lock();
        if core.state != PlaybackState::Closed {
            core.looping = looping;
        }
    }

    /// Release the device stream and the decoded buffer and unregister the
    /// handle.
    ///
    /// Returns `false` if the instance was already closed.
    pub fn close(&self) -> bool {
        let (stream, source) = {
            let mut core = self.core.lock();
            if core.state == PlaybackState::Closed {
                return false;
            }
            core.state = PlaybackState::Closed;
            core.cursor = 0;
            (core.stream.take(), core.source.take())
        };

        if let Some(stream) = stream {
            stream.pause();
            stream.clear();
        }
        if let Some(source) = source {
            source.release();
        }

        if let (Some(handle), Some(registry)) = (self.handle(), self.registry.upgrade()) {
            registry.unregister(handle);
        }

        debug!(
            handle = self.raw_handle(),
            file = %strip_path(&self.path.to_string_lossy()),
            "Sound closed"
        );
        true
    }

    // ========================================================================
    // Device delivery
    // ========================================================================

    /// Serve one device request of `bytes_requested` bytes.
    ///
    /// Called from the device thread. Pushes at most `bytes_requested` bytes
    /// to the device stream and returns how many were pushed. Looping sounds
    /// wrap to the start inside the same request, so the cursor always equals
    /// the total delivered modulo the buffer length. A one-shot that reaches
    /// the end stops and pauses its stream.
    pub fn service_request(&self, bytes_requested: usize) -> usize {
        let mut core = self.core.lock();
        if core.state != PlaybackState::Playing || bytes_requested == 0 {
            return 0;
        }

        let PlaybackCore {
            source,
            stream,
            cursor,
            state,
            looping,
        } = &mut *core;

        let (Some(source), Some(stream)) = (source.as_ref(), stream.as_ref()) else {
            return 0;
        };

        let data = source.bytes();
        let len = data.len();
        if len == 0 {
            return 0;
        }

        if *looping {
            let mut delivered = 0;
            while delivered < bytes_requested {
                if *cursor >= len {
                    *cursor = 0;
                }
                let chunk = (bytes_requested - delivered).min(len - *cursor);
                stream.put_data(&data[*cursor..*cursor + chunk]);
                *cursor += chunk;
                delivered += chunk;
            }
            if *cursor >= len {
                *cursor = 0;
            }

            trace!(handle = self.raw_handle(), delivered, cursor = *cursor, "Served looping request");
            return delivered;
        }

        let remaining = len.saturating_sub(*cursor);
        let to_send = bytes_requested.min(remaining);
        if to_send > 0 {
            stream.put_data(&data[*cursor..*cursor + to_send]);
            *cursor += to_send;
        }

        if *cursor >= len {
            *state = PlaybackState::Stopped;
            stream.pause();
            trace!(handle = self.raw_handle(), "One-shot finished");
        }

        to_send
    }
}

impl fmt::Debug for SoundInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundInstance")
            .field("handle", &self.handle())
            .field("category", &self.category)
            .field("path", &self.path)
            .field("format", &self.format)
            .field("len_bytes", &self.len_bytes)
            .finish_non_exhaustive()
    }
}
