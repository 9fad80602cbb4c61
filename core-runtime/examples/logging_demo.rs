//! Logging setup for a game using the sound engine.
//!
//! Emits the kind of events the engine produces (decode, spawn, device
//! requests, device failures) from a game thread and a simulated device
//! thread, so each output format and the host sink can be compared.
//!
//! Run with:
//! ```bash
//! cargo run --example logging_demo -- compact
//! cargo run --example logging_demo -- json --sink
//! cargo run --example logging_demo -- pretty "core_playback=trace"
//! ```

use bridge_traits::logging::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, strip_path, LogFormat, LoggingConfig};
use std::env;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, info_span, instrument, trace, warn};

fn main() -> core_runtime::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let format = match args.first().map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug)
        .with_thread_info(true);

    if let Some(filter) = args.get(1).filter(|arg| !arg.starts_with("--")) {
        config = config.with_filter(filter.clone());
    }
    if args.iter().any(|arg| arg == "--sink") {
        config = config.with_logger_sink(Arc::new(ConsoleLogger {
            min_level: LogLevel::Warn,
        }));
    }

    init_logging(config)?;
    info!(target: "core_playback::manager", ?format, "Logging ready");

    let handle = load("/home/player/.local/share/game/sounds/click.wav");

    let device = thread::Builder::new()
        .name("sound-device-1".to_string())
        .spawn(move || serve_device(handle, &[4096, 4096, 2048]))
        .map_err(|e| core_runtime::Error::Internal(e.to_string()))?;
    device
        .join()
        .map_err(|_| core_runtime::Error::Internal("device thread panicked".to_string()))?;

    let _span = info_span!(target: "core_playback::manager", "spawn_instance", file = "theme.ogg").entered();
    warn!(
        target: "core_playback::manager",
        handle = 2u32,
        error = "Bridge capability not available: no output device",
        "Device stream rejected"
    );

    Ok(())
}

#[instrument(target = "core_playback::manager", fields(file = %strip_path(path)))]
fn load(path: &str) -> u32 {
    debug!(target: "core_playback::decoder", container = "wav", "Selected track");
    info!(
        target: "core_playback::decoder",
        format = "44100Hz/1ch/f32",
        bytes = 17_640,
        duration_ms = 100,
        "Decoded sound"
    );
    info!(target: "core_playback::manager", handle = 1u32, category = "effect", "Sound instance ready");
    1
}

fn serve_device(handle: u32, requests: &[usize]) {
    for bytes in requests {
        trace!(target: "core_playback::sound", handle, delivered = *bytes, "Served request");
    }
    debug!(target: "bridge_desktop::memory", token = handle, "Device period complete");
}
