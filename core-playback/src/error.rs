//! # Playback Error Types
//!
//! Error types for sound loading and device setup.
//!
//! Only construction-time work (decoding a file, opening a device stream,
//! allocating a handle) can fail. Playback control calls never return these
//! errors; a stale or closed handle is a silent no-op.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or registering a sound.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Format/Codec Errors
    // ========================================================================
    /// File extension does not map to a supported container.
    #[error("Unsupported audio format: '{extension}'")]
    UnsupportedFormat { extension: String },

    /// The container or codec failed for a reason other than end of data.
    #[error("Failed to decode {format}: {message}")]
    Decode { format: String, message: String },

    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The sound file could not be opened.
    #[error("Failed to open {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // Platform/Device Errors
    // ========================================================================
    /// The platform output could not open a stream for the decoded format.
    #[error("Failed to open audio device stream: {0}")]
    DeviceOpen(String),

    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// No free handle was found within the probe limit.
    ///
    /// Indicates that instances are leaking (never closed).
    #[error("Handle space exhausted after {attempts} probes")]
    HandleExhaustion { attempts: u32 },

    /// A closed instance was handed back to the registry.
    #[error("Sound instance {handle} is closed")]
    InstanceClosed { handle: u32 },

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Configuration rejected by validation.
    #[error("Invalid sound configuration: {0}")]
    InvalidConfig(String),

    /// The sound manager has been shut down.
    #[error("Sound manager is shut down")]
    ShutDown,
}

impl PlaybackError {
    /// Returns `true` if this error is related to audio format/codec issues.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::UnsupportedFormat { .. } | PlaybackError::Decode { .. }
        )
    }

    /// Returns `true` if the platform audio device is at fault.
    pub fn is_device_error(&self) -> bool {
        matches!(self, PlaybackError::DeviceOpen(_))
    }

    /// Returns `true` if the host should treat this error as unrecoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlaybackError::HandleExhaustion { .. })
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
