//! # Sound Engine Usage Example
//!
//! Synthesizes two WAV files, loads them through a `SoundManager` and plays
//! them on a headless `MemoryOutput`, acting as the device thread by pumping
//! one 10 ms period at a time.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use bridge_desktop::MemoryOutput;
use bridge_traits::logging::LogLevel;
use bridge_traits::playback::{AudioFormat, SampleEncoding};
use core_playback::{PlaybackState, Result, SoundCategory, SoundConfig, SoundManager};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44_100;

/// Write a mono float WAV containing a sine tone.
fn write_tone(dir: &Path, name: &str, frequency: f32, duration: Duration) -> std::io::Result<PathBuf> {
    let frames = (duration.as_secs_f32() * SAMPLE_RATE as f32) as usize;
    let data: Vec<u8> = (0..frames)
        .map(|i| (TAU * frequency * i as f32 / SAMPLE_RATE as f32).sin() * 0.3)
        .flat_map(f32::to_le_bytes)
        .collect();

    let mut file = Vec::with_capacity(44 + data.len());
    file.extend_from_slice(b"RIFF");
    file.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
    file.extend_from_slice(b"WAVEfmt ");
    file.extend_from_slice(&16u32.to_le_bytes());
    file.extend_from_slice(&3u16.to_le_bytes());
    file.extend_from_slice(&1u16.to_le_bytes());
    file.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    file.extend_from_slice(&(SAMPLE_RATE * 4).to_le_bytes());
    file.extend_from_slice(&4u16.to_le_bytes());
    file.extend_from_slice(&32u16.to_le_bytes());
    file.extend_from_slice(b"data");
    file.extend_from_slice(&(data.len() as u32).to_le_bytes());
    file.extend_from_slice(&data);

    let path = dir.join(name);
    std::fs::write(&path, file)?;
    Ok(path)
}

/// RMS level of a period of f32 samples.
fn level(period: &[u8]) -> f32 {
    let samples: Vec<f32> = period
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

fn main() -> Result<()> {
    let _ = init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    );

    println!("=== Sound Engine Demo ===\n");

    let dir = tempfile::tempdir().map_err(|e| core_playback::PlaybackError::FileOpen {
        path: PathBuf::from("<tempdir>"),
        source: e,
    })?;
    let tone = |name: &str, frequency: f32, duration: Duration| {
        write_tone(dir.path(), name, frequency, duration).map_err(|e| core_playback::PlaybackError::FileOpen {
            path: dir.path().join(name),
            source: e,
        })
    };
    let blip = tone("blip.wav", 880.0, Duration::from_millis(50))?;
    let theme = tone("theme.wav", 220.0, Duration::from_millis(250))?;

    let output = Arc::new(MemoryOutput::default());
    let manager = SoundManager::new(SoundConfig::default(), output.clone())?;
    let period = AudioFormat::new(SAMPLE_RATE, 1, SampleEncoding::F32).bytes_for(Duration::from_millis(10));

    // Looping music plus two overlapping effects.
    let music = manager
        .play_music(&theme, true)?
        .ok_or(core_playback::PlaybackError::ShutDown)?;
    let first = manager.play_sound(&blip, false)?;
    let second = manager.play_sound(&blip, false)?;
    println!("Music handle: {}", music);
    println!("Effect handles: {:?} {:?}", first, second);
    println!("Pooled blips: {}", manager.pool_size(&blip, SoundCategory::Effect));
    println!("Decoded buffers: {}\n", manager.cached_buffers());

    for tick in 0..40 {
        if tick == 20 {
            println!("-- pausing music --");
            manager.pause_all(SoundCategory::Music);
        }
        if tick == 30 {
            println!("-- resuming music --");
            manager.resume_all(SoundCategory::Music);
        }

        let music_level = level(&output.pump(music.raw(), period));
        let effect_level = first
            .map(|handle| level(&output.pump(handle.raw(), period)))
            .unwrap_or(0.0);

        if tick % 5 == 0 {
            println!(
                "t={:>3}ms music={:.3} ({:?}) blip={:.3}",
                tick * 10,
                music_level,
                manager.state(music).unwrap_or(PlaybackState::Closed),
                effect_level
            );
        }
    }

    manager.shutdown();
    println!("\nLive instances after shutdown: {}", manager.live_instances());
    println!("Open device streams: {}", output.open_streams());

    Ok(())
}
