//! # Sound Manager
//!
//! Game-facing facade over decoding, handle registration and device streams.
//!
//! ## Overview
//!
//! The manager owns everything a host needs to play sounds by path:
//! - a cache of decoded buffers, one per distinct file
//! - pools of instances per (category, path), so overlapping plays of the
//!   same effect do not cut each other off
//! - the [`HandleRegistry`] that device callbacks resolve tokens through
//!
//! Several managers may share one registry. Each manager only tracks,
//! controls by category and tears down the instances it spawned itself; the
//! registry is drained on shutdown only by the manager that created it.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use bridge_desktop::MemoryOutput;
//! use core_playback::{SoundCategory, SoundConfig, SoundManager};
//! use std::sync::Arc;
//!
//! # fn example() -> core_playback::Result<()> {
//! let output = Arc::new(MemoryOutput::new(64 * 1024));
//! let manager = SoundManager::new(SoundConfig::default(), output)?;
//!
//! let click = manager.load_or_get("sounds/click.wav", SoundCategory::Effect)?;
//! manager.play(click);
//! manager.play_music("music/theme.ogg", true)?;
//!
//! manager.pause_all(SoundCategory::Music);
//! manager.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Locking
//!
//! Lock order is manager state, then registry. Decoding and device stream
//! setup run with no manager lock held. Category operations work on a
//! registry snapshot so no instance lock is taken under the registry lock.

use crate::bridge::stream_callback;
use crate::config::SoundConfig;
use crate::decoder::{decoder_for, DecodeOptions};
use crate::error::{PlaybackError, Result};
use crate::registry::{HandleRegistry, SoundHandle};
use crate::sound::{PlaybackState, SoundInstance};
use crate::traits::{DecodedSound, SoundCategory};
use bridge_traits::playback::AudioOutput;
use core_runtime::logging::strip_path;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, warn};

#[derive(Default)]
struct ManagerState {
    buffers: HashMap<PathBuf, DecodedSound>,
    pools: HashMap<(SoundCategory, PathBuf), Vec<Weak<SoundInstance>>>,
    shut_down: bool,
}

/// Loads, pools and controls sound instances.
pub struct SoundManager {
    config: SoundConfig,
    output: Arc<dyn AudioOutput>,
    registry: Arc<HandleRegistry>,
    owns_registry: bool,
    decode_options: DecodeOptions,
    state: Mutex<ManagerState>,
}

impl SoundManager {
    /// Create a manager playing through `output`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `config` fails validation.
    pub fn new(config: SoundConfig, output: Arc<dyn AudioOutput>) -> Result<Self> {
        let registry = Arc::new(HandleRegistry::new(config.handle_probe_limit));
        Self::build(config, output, registry, true)
    }

    /// Create a manager registering its instances in a shared `registry`.
    ///
    /// The manager never closes or drains instances it did not spawn.
    pub fn with_registry(
        config: SoundConfig,
        output: Arc<dyn AudioOutput>,
        registry: Arc<HandleRegistry>,
    ) -> Result<Self> {
        Self::build(config, output, registry, false)
    }

    fn build(
        config: SoundConfig,
        output: Arc<dyn AudioOutput>,
        registry: Arc<HandleRegistry>,
        owns_registry: bool,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;

        info!(
            backend = output.name(),
            max_instances_per_path = config.max_instances_per_path,
            owns_registry,
            "Sound manager created"
        );

        Ok(Self {
            decode_options: DecodeOptions::from(&config),
            config,
            output,
            registry,
            owns_registry,
            state: Mutex::new(ManagerState::default()),
        })
    }

    pub fn config(&self) -> &SoundConfig {
        &self.config
    }

    /// Registry device callbacks resolve tokens through.
    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Return a live pooled instance of `path` in `category`, loading a new
    /// one if the pool is empty.
    ///
    /// # Errors
    ///
    /// - `UnsupportedFormat` for an unknown extension (before any file I/O)
    /// - `FileOpen` / `Decode` if the file cannot be decoded
    /// - `DeviceOpen` if the output refuses the decoded format
    /// - `HandleExhaustion` if no handle could be allocated
    /// - `ShutDown` after [`shutdown`](Self::shutdown)
    pub fn load_or_get(&self, path: impl AsRef<Path>, category: SoundCategory) -> Result<SoundHandle> {
        let path = path.as_ref();
        {
            let mut state = self.state.lock();
            if state.shut_down {
                return Err(PlaybackError::ShutDown);
            }
            if let Some(handle) = self
                .live_pool(&mut state, category, path)
                .iter()
                .find_map(|instance| instance.handle())
            {
                return Ok(handle);
            }
        }

        self.spawn_instance(path, category)
    }

    /// Load a new, independently playable instance of `path`.
    ///
    /// The decoded buffer is shared with every other instance of the same
    /// file. Errors as for [`load_or_get`](Self::load_or_get).
    #[instrument(skip(self, path), fields(file = %strip_path(&path.as_ref().to_string_lossy())))]
    pub fn spawn_instance(&self, path: impl AsRef<Path>, category: SoundCategory) -> Result<SoundHandle> {
        let path = path.as_ref();
        let sound = self.load_buffer(path)?;
        let format = sound.format;

        let instance = Arc::new(SoundInstance::new(
            category,
            path.to_path_buf(),
            Box::new(sound),
            Arc::downgrade(&self.registry),
        ));
        let handle = self.registry.register(Arc::clone(&instance))?;

        let stream = match self
            .output
            .open_stream(&format, handle.raw(), stream_callback(&self.registry))
        {
            Ok(stream) => stream,
            Err(e) => {
                warn!(handle = handle.raw(), error = %e, "Device stream rejected");
                instance.close();
                return Err(PlaybackError::DeviceOpen(e.to_string()));
            }
        };
        instance.attach_stream(stream);

        let mut state = self.state.lock();
        if state.shut_down {
            drop(state);
            instance.close();
            return Err(PlaybackError::ShutDown);
        }
        let pool = state.pools.entry((category, path.to_path_buf())).or_default();
        pool.push(Arc::downgrade(&instance));

        info!(
            handle = handle.raw(),
            %category,
            %format,
            pooled = pool.len(),
            "Sound instance ready"
        );
        Ok(handle)
    }

    fn load_buffer(&self, path: &Path) -> Result<DecodedSound> {
        {
            let state = self.state.lock();
            if state.shut_down {
                return Err(PlaybackError::ShutDown);
            }
            if let Some(sound) = state.buffers.get(path) {
                debug!("Reusing decoded buffer");
                return Ok(sound.clone());
            }
        }

        let decoder = decoder_for(path, &self.decode_options)?;
        let sound = decoder.decode(path)?;

        let mut state = self.state.lock();
        if state.shut_down {
            return Err(PlaybackError::ShutDown);
        }
        Ok(state
            .buffers
            .entry(path.to_path_buf())
            .or_insert(sound)
            .clone())
    }

    /// Live pooled instances of (category, path).
    ///
    /// Closed instances are pruned, and a pool left empty is removed.
    fn live_pool(
        &self,
        state: &mut ManagerState,
        category: SoundCategory,
        path: &Path,
    ) -> Vec<Arc<SoundInstance>> {
        let key = (category, path.to_path_buf());
        let Some(pool) = state.pools.get_mut(&key) else {
            return Vec::new();
        };

        let live: Vec<Arc<SoundInstance>> = pool.iter().filter_map(upgrade_live).collect();
        if live.is_empty() {
            state.pools.remove(&key);
        } else {
            pool.retain(|weak| upgrade_live(weak).is_some());
        }
        live
    }

    /// Live instances this manager spawned, optionally limited to `category`.
    fn owned_instances(&self, category: Option<SoundCategory>) -> Vec<Arc<SoundInstance>> {
        let mut state = self.state.lock();
        state.pools.retain(|_, pool| {
            pool.retain(|weak| upgrade_live(weak).is_some());
            !pool.is_empty()
        });
        state
            .pools
            .iter()
            .filter(|((pool_category, _), _)| category.map_or(true, |c| c == *pool_category))
            .flat_map(|(_, pool)| pool.iter().filter_map(upgrade_live))
            .collect()
    }

    // ========================================================================
    // Fire-and-forget playback
    // ========================================================================

    /// Play an effect, reusing an idle pooled instance when possible.
    ///
    /// Returns the handle that started, or `None` when every pooled instance
    /// is busy and the pool is at `max_instances_per_path`.
    pub fn play_sound(&self, path: impl AsRef<Path>, looping: bool) -> Result<Option<SoundHandle>> {
        self.play_pooled(path.as_ref(), SoundCategory::Effect, looping)
    }

    /// Play a music track; pooled like [`play_sound`](Self::play_sound).
    pub fn play_music(&self, path: impl AsRef<Path>, looping: bool) -> Result<Option<SoundHandle>> {
        self.play_pooled(path.as_ref(), SoundCategory::Music, looping)
    }

    fn play_pooled(&self, path: &Path, category: SoundCategory, looping: bool) -> Result<Option<SoundHandle>> {
        let pooled = {
            let mut state = self.state.lock();
            if state.shut_down {
                return Err(PlaybackError::ShutDown);
            }
            self.live_pool(&mut state, category, path)
        };

        for instance in &pooled {
            if instance.is_playing() {
                continue;
            }
            instance.set_loop(looping);
            if instance.play() {
                return Ok(instance.handle());
            }
        }

        if pooled.len() >= self.config.max_instances_per_path {
            debug!(
                file = %strip_path(&path.to_string_lossy()),
                %category,
                pooled = pooled.len(),
                "Pool saturated, sound skipped"
            );
            return Ok(None);
        }

        let handle = self.spawn_instance(path, category)?;
        Ok(self.registry.lookup(handle).and_then(|instance| {
            instance.set_loop(looping);
            instance.play().then_some(handle)
        }))
    }

    // ========================================================================
    // Per-handle control
    // ========================================================================

    /// Live instance behind `handle`.
    pub fn instance(&self, handle: SoundHandle) -> Option<Arc<SoundInstance>> {
        self.registry.lookup(handle)
    }

    /// Start `handle` from the beginning; `false` if it was already playing
    /// or is no longer live.
    pub fn play(&self, handle: SoundHandle) -> bool {
        self.instance(handle).map(|s| s.play()).unwrap_or(false)
    }

    pub fn pause(&self, handle: SoundHandle) {
        if let Some(instance) = self.instance(handle) {
            instance.pause();
        }
    }

    pub fn resume(&self, handle: SoundHandle) {
        if let Some(instance) = self.instance(handle) {
            instance.resume();
        }
    }

    pub fn stop(&self, handle: SoundHandle) {
        if let Some(instance) = self.instance(handle) {
            instance.stop();
        }
    }

    pub fn set_loop(&self, handle: SoundHandle, looping: bool) {
        if let Some(instance) = self.instance(handle) {
            instance.set_loop(looping);
        }
    }

    /// Close `handle` and free its device stream.
    ///
    /// The handle leaves its pool; the decoded buffer stays cached for the
    /// next load of the same file.
    pub fn close(&self, handle: SoundHandle) {
        if let Some(instance) = self.instance(handle) {
            instance.close();
        }
    }

    /// State of `handle`, or `None` once it is closed.
    pub fn state(&self, handle: SoundHandle) -> Option<PlaybackState> {
        self.instance(handle).map(|s| s.state())
    }

    // ========================================================================
    // Category control
    // ========================================================================

    fn for_category(&self, category: SoundCategory, op: impl Fn(&SoundInstance)) -> usize {
        let matching = self.owned_instances(Some(category));

        for instance in &matching {
            op(instance.as_ref());
        }
        matching.len()
    }

    /// Stop every live instance this manager spawned in `category`; returns
    /// how many were touched.
    pub fn stop_all(&self, category: SoundCategory) -> usize {
        let count = self.for_category(category, SoundInstance::stop);
        debug!(%category, count, "Stopped category");
        count
    }

    /// Pause every live instance in `category`.
    pub fn pause_all(&self, category: SoundCategory) -> usize {
        let count = self.for_category(category, SoundInstance::pause);
        debug!(%category, count, "Paused category");
        count
    }

    /// Resume every live instance in `category`.
    pub fn resume_all(&self, category: SoundCategory) -> usize {
        let count = self.for_category(category, SoundInstance::resume);
        debug!(%category, count, "Resumed category");
        count
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Number of live instances this manager spawned.
    pub fn live_instances(&self) -> usize {
        self.owned_instances(None).len()
    }

    /// Live pooled instances of `path` in `category`.
    pub fn pool_size(&self, path: impl AsRef<Path>, category: SoundCategory) -> usize {
        let mut state = self.state.lock();
        self.live_pool(&mut state, category, path.as_ref()).len()
    }

    /// Number of distinct decoded files held in memory.
    pub fn cached_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Close every instance this manager spawned and drop every cached
    /// buffer.
    ///
    /// Idempotent. Later loads fail with `ShutDown`; control calls on old
    /// handles are no-ops. A manager that created its own registry also
    /// drains it; a shared registry keeps the other managers' instances.
    pub fn shutdown(&self) {
        let pools = {
            let mut state = self.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.buffers.clear();
            std::mem::take(&mut state.pools)
        };

        let mut closed = pools
            .values()
            .flat_map(|pool| pool.iter().filter_map(Weak::upgrade))
            .filter(|instance| instance.close())
            .count();
        if self.owns_registry {
            closed += self
                .registry
                .drain()
                .iter()
                .filter(|instance| instance.close())
                .count();
        }
        info!(closed, owns_registry = self.owns_registry, "Sound manager shut down");
    }
}

fn upgrade_live(weak: &Weak<SoundInstance>) -> Option<Arc<SoundInstance>> {
    weak.upgrade().filter(|instance| !instance.is_closed())
}

impl Drop for SoundManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::MemoryOutput;

    fn manager() -> SoundManager {
        SoundManager::new(SoundConfig::default(), Arc::new(MemoryOutput::new(4096))).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SoundConfig {
            max_instances_per_path: 0,
            ..Default::default()
        };
        let result = SoundManager::new(config, Arc::new(MemoryOutput::new(16)));
        assert!(matches!(result, Err(PlaybackError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_extension_fails_before_io() {
        let manager = manager();
        let result = manager.load_or_get("music/song.xyz", SoundCategory::Music);
        match result {
            Err(PlaybackError::UnsupportedFormat { extension }) => assert_eq!(extension, "xyz"),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
        assert_eq!(manager.live_instances(), 0);
        assert_eq!(manager.cached_buffers(), 0);
    }

    #[test]
    fn test_missing_file_is_file_open_error() {
        let manager = manager();
        let result = manager.load_or_get("/no/such/dir/boom.wav", SoundCategory::Effect);
        assert!(matches!(result, Err(PlaybackError::FileOpen { .. })));
        assert_eq!(manager.live_instances(), 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let manager = manager();
        manager.shutdown();
        manager.shutdown();
        assert!(manager.is_shut_down());
        assert!(matches!(
            manager.load_or_get("click.wav", SoundCategory::Effect),
            Err(PlaybackError::ShutDown)
        ));
        assert!(matches!(manager.play_sound("click.wav", false), Err(PlaybackError::ShutDown)));
    }

    #[test]
    fn test_control_on_unknown_handle_is_noop() {
        let manager = manager();
        let handle = SoundHandle::from_raw(77).unwrap();
        assert!(!manager.play(handle));
        manager.pause(handle);
        manager.resume(handle);
        manager.stop(handle);
        manager.set_loop(handle, true);
        manager.close(handle);
        assert_eq!(manager.state(handle), None);
        assert_eq!(manager.stop_all(SoundCategory::Effect), 0);
    }

    #[test]
    fn test_failed_loads_leave_no_pools() {
        let manager = manager();
        assert!(manager.load_or_get("music/song.xyz", SoundCategory::Music).is_err());
        assert!(manager.load_or_get("/no/such/dir/boom.wav", SoundCategory::Effect).is_err());
        assert_eq!(manager.pool_size("sounds/never.wav", SoundCategory::Effect), 0);

        assert!(manager.state.lock().pools.is_empty());
    }
}
