//! Shared fixtures for core-playback integration tests.
//!
//! Sound files are synthesized into a temporary directory so the tests never
//! depend on assets checked into the repository.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// WAVE `fmt ` codes.
pub const WAVE_FORMAT_PCM: u16 = 1;
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;

/// Temporary directory holding generated sound files.
pub struct Fixtures {
    dir: TempDir,
}

impl Fixtures {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create fixture directory"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a RIFF/WAVE file with the given layout and raw sample data.
    pub fn write_wav(
        &self,
        name: &str,
        format_code: u16,
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
        data: &[u8],
    ) -> PathBuf {
        let block_align = channels * bits_per_sample / 8;
        let byte_rate = sample_rate * u32::from(block_align);

        let mut file = Vec::with_capacity(44 + data.len());
        file.extend_from_slice(b"RIFF");
        file.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        file.extend_from_slice(b"WAVE");
        file.extend_from_slice(b"fmt ");
        file.extend_from_slice(&16u32.to_le_bytes());
        file.extend_from_slice(&format_code.to_le_bytes());
        file.extend_from_slice(&channels.to_le_bytes());
        file.extend_from_slice(&sample_rate.to_le_bytes());
        file.extend_from_slice(&byte_rate.to_le_bytes());
        file.extend_from_slice(&block_align.to_le_bytes());
        file.extend_from_slice(&bits_per_sample.to_le_bytes());
        file.extend_from_slice(b"data");
        file.extend_from_slice(&(data.len() as u32).to_le_bytes());
        file.extend_from_slice(data);

        let path = self.path(name);
        fs::write(&path, file).expect("Failed to write WAV fixture");
        path
    }

    /// Mono 32-bit float ramp lasting `frames` frames.
    pub fn float_wav(&self, name: &str, sample_rate: u32, frames: usize) -> PathBuf {
        self.write_wav(
            name,
            WAVE_FORMAT_IEEE_FLOAT,
            sample_rate,
            1,
            32,
            &float_ramp_bytes(frames),
        )
    }

    /// Interleaved 16-bit PCM built from `samples`.
    pub fn s16_wav(&self, name: &str, sample_rate: u32, channels: u16, samples: &[i16]) -> PathBuf {
        let data: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        self.write_wav(name, WAVE_FORMAT_PCM, sample_rate, channels, 16, &data)
    }

    /// Write arbitrary bytes under `name`.
    pub fn write_raw(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, bytes).expect("Failed to write fixture");
        path
    }
}

/// Little-endian f32 samples cycling through distinct values in [-1, 1).
pub fn float_ramp_bytes(frames: usize) -> Vec<u8> {
    (0..frames)
        .map(|i| ((i % 2000) as f32 / 1000.0) - 1.0)
        .flat_map(|s| s.to_le_bytes())
        .collect()
}
