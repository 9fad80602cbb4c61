//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-playback`, `core-runtime`, `bridge-desktop`).
//! Host applications can depend on `sound-engine-workspace` and enable the
//! documented features without needing to wire each crate individually.
//!
//! - `engine` (default): re-exports the playback engine, runtime and the
//!   desktop outputs.
//! - `cpal-output`: additionally builds the hardware output backed by `cpal`.

#[cfg(feature = "engine")]
pub use bridge_desktop;
#[cfg(feature = "engine")]
pub use core_playback;
#[cfg(feature = "engine")]
pub use core_runtime;
