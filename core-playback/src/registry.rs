//! # Handle Registry
//!
//! Maps the small integer tokens carried by device callbacks back to live
//! sound instances.
//!
//! ## Overview
//!
//! A device callback only receives the `u32` token it was opened with. The
//! registry is the single source of truth for which tokens are alive: the
//! callback resolves every token through [`HandleRegistry::lookup_raw`], so a
//! closed instance simply stops resolving.
//!
//! ## Locking
//!
//! The map sits behind a `parking_lot::RwLock`. Lookups share the lock;
//! register/unregister take it exclusively. The lock is eventually fair, so a
//! steady stream of callback lookups cannot starve a writer. No instance lock
//! is ever taken while the registry lock is held.

use crate::error::{PlaybackError, Result};
use crate::sound::SoundInstance;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Identifier of a live sound instance.
///
/// Handle `0` means "no instance" and cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundHandle(NonZeroU32);

impl SoundHandle {
    /// Wrap a raw token; `None` for 0.
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Raw token passed across the device callback boundary.
    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct RegistryInner {
    instances: HashMap<u32, Arc<SoundInstance>>,
    next: u32,
}

/// Table of live sound instances keyed by handle.
///
/// The registry tracks instances; it does not decide their lifetime.
/// Entries are inserted by [`register`](Self::register) and removed when the
/// instance is closed.
pub struct HandleRegistry {
    inner: RwLock<RegistryInner>,
    probe_limit: u32,
}

impl HandleRegistry {
    /// Create an empty registry trying at most `probe_limit` candidate
    /// handles per registration.
    pub fn new(probe_limit: u32) -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                instances: HashMap::new(),
                next: 1,
            }),
            probe_limit,
        }
    }

    /// Register `instance` under the next free handle and bind that handle
    /// to it.
    ///
    /// The counter wraps around and skips 0. If the natural next value is
    /// still live, later values are probed, up to the probe limit. A live
    /// instance that already owns a handle gets that handle back.
    ///
    /// # Errors
    ///
    /// - `HandleExhaustion` when every probed handle is taken
    /// - `InstanceClosed` for an instance that was closed and unregistered
    pub fn register(&self, instance: Arc<SoundInstance>) -> Result<SoundHandle> {
        let mut inner = self.inner.write();

        if let Some(existing) = instance.handle() {
            return match inner.instances.get(&existing.raw()) {
                Some(live) if Arc::ptr_eq(live, &instance) => Ok(existing),
                _ => Err(PlaybackError::InstanceClosed { handle: existing.raw() }),
            };
        }

        for _ in 0..self.probe_limit {
            let candidate = inner.next;
            inner.next = match inner.next.wrapping_add(1) {
                0 => 1,
                next => next,
            };

            if inner.instances.contains_key(&candidate) {
                trace!(candidate, "Handle still live, probing");
                continue;
            }

            let Some(handle) = SoundHandle::from_raw(candidate) else {
                continue;
            };

            instance.assign_handle(handle);
            inner.instances.insert(candidate, instance);
            debug!(handle = candidate, live = inner.instances.len(), "Registered sound instance");
            return Ok(handle);
        }

        error!(
            attempts = self.probe_limit,
            live = inner.instances.len(),
            "Handle space exhausted; sound instances are leaking"
        );
        Err(PlaybackError::HandleExhaustion {
            attempts: self.probe_limit,
        })
    }

    /// Resolve a handle.
    pub fn lookup(&self, handle: SoundHandle) -> Option<Arc<SoundInstance>> {
        self.lookup_raw(handle.raw())
    }

    /// Resolve a raw callback token; 0 and unknown tokens yield `None`.
    pub fn lookup_raw(&self, raw: u32) -> Option<Arc<SoundInstance>> {
        self.inner.read().instances.get(&raw).cloned()
    }

    /// Remove a mapping. Removing an absent handle is a no-op.
    pub fn unregister(&self, handle: SoundHandle) -> Option<Arc<SoundInstance>> {
        let removed = self.inner.write().instances.remove(&handle.raw());
        if removed.is_some() {
            debug!(handle = handle.raw(), "Unregistered sound instance");
        }
        removed
    }

    /// Whether `handle` is live.
    pub fn contains(&self, handle: SoundHandle) -> bool {
        self.inner.read().instances.contains_key(&handle.raw())
    }

    /// Every live instance at this instant.
    ///
    /// The registry lock is released before this returns, so callers may lock
    /// the instances freely.
    pub fn snapshot(&self) -> Vec<Arc<SoundInstance>> {
        self.inner.read().instances.values().cloned().collect()
    }

    /// Remove and return every live instance.
    pub fn drain(&self) -> Vec<Arc<SoundInstance>> {
        self.inner.write().instances.drain().map(|(_, instance)| instance).collect()
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.inner.read().instances.len()
    }

    /// Whether no instance is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn seed_next(&self, next: u32) {
        self.inner.write().next = next;
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new(crate::config::SoundConfig::default().handle_probe_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ContainerFormat, DecodedSound, SoundCategory};
    use bridge_traits::playback::{AudioFormat, SampleEncoding};
    use bytes::Bytes;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Weak;

    fn instance() -> Arc<SoundInstance> {
        let sound = DecodedSound::new(
            AudioFormat::new(8_000, 1, SampleEncoding::U8),
            ContainerFormat::Wav,
            Bytes::from_static(&[0x80; 8]),
        );
        Arc::new(SoundInstance::new(
            SoundCategory::Effect,
            PathBuf::from("blip.wav"),
            Box::new(sound),
            Weak::new(),
        ))
    }

    #[test]
    fn test_handle_zero_is_unrepresentable() {
        assert!(SoundHandle::from_raw(0).is_none());
        assert_eq!(SoundHandle::from_raw(5).unwrap().raw(), 5);
        assert_eq!(SoundHandle::from_raw(5).unwrap().to_string(), "#5");
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = HandleRegistry::new(16);
        let sound = instance();
        let handle = registry.register(Arc::clone(&sound)).unwrap();

        assert_eq!(handle.raw(), 1);
        assert_eq!(sound.handle(), Some(handle));
        assert!(Arc::ptr_eq(&registry.lookup(handle).unwrap(), &sound));
        assert!(registry.lookup_raw(0).is_none());
        assert!(registry.lookup_raw(99).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_twice_returns_same_handle() {
        let registry = HandleRegistry::new(16);
        let sound = instance();
        let first = registry.register(Arc::clone(&sound)).unwrap();
        let second = registry.register(Arc::clone(&sound)).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_closed_instance_cannot_register_again() {
        let registry = Arc::new(HandleRegistry::new(16));
        let sound = Arc::new(SoundInstance::new(
            SoundCategory::Effect,
            PathBuf::from("blip.wav"),
            Box::new(DecodedSound::new(
                AudioFormat::new(8_000, 1, SampleEncoding::U8),
                ContainerFormat::Wav,
                Bytes::from_static(&[0x80; 8]),
            )),
            Arc::downgrade(&registry),
        ));
        let handle = registry.register(Arc::clone(&sound)).unwrap();
        assert!(sound.close());

        let result = registry.register(Arc::clone(&sound));
        assert!(matches!(result, Err(PlaybackError::InstanceClosed { handle: raw }) if raw == handle.raw()));
        assert!(!registry.contains(handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = HandleRegistry::new(16);
        let handle = registry.register(instance()).unwrap();

        assert!(registry.unregister(handle).is_some());
        assert!(registry.unregister(handle).is_none());
        assert!(!registry.contains(handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_live_handles_stay_unique() {
        let registry = HandleRegistry::new(64);
        let mut live: Vec<SoundHandle> = Vec::new();

        for step in 0..500u32 {
            if step % 3 == 2 && !live.is_empty() {
                let victim = live.remove((step as usize * 7) % live.len());
                registry.unregister(victim);
            } else {
                live.push(registry.register(instance()).unwrap());
            }

            let unique: HashSet<u32> = live.iter().map(|h| h.raw()).collect();
            assert_eq!(unique.len(), live.len());
            assert!(!unique.contains(&0));
            assert_eq!(registry.len(), live.len());
        }
    }

    #[test]
    fn test_counter_wraps_and_skips_zero() {
        let registry = HandleRegistry::new(16);
        registry.seed_next(u32::MAX);

        let last = registry.register(instance()).unwrap();
        let wrapped = registry.register(instance()).unwrap();

        assert_eq!(last.raw(), u32::MAX);
        assert_eq!(wrapped.raw(), 1);
    }

    #[test]
    fn test_probes_past_live_handles() {
        let registry = HandleRegistry::new(4);
        for _ in 0..3 {
            registry.register(instance()).unwrap();
        }

        registry.seed_next(1);
        let handle = registry.register(instance()).unwrap();
        assert_eq!(handle.raw(), 4);
    }

    #[test]
    fn test_exhaustion_is_recoverable_error() {
        let registry = HandleRegistry::new(3);
        for _ in 0..3 {
            registry.register(instance()).unwrap();
        }

        registry.seed_next(1);
        let result = registry.register(instance());
        assert!(matches!(result, Err(PlaybackError::HandleExhaustion { attempts: 3 })));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = HandleRegistry::new(16);
        registry.register(instance()).unwrap();
        registry.register(instance()).unwrap();

        assert_eq!(registry.snapshot().len(), 2);
        assert_eq!(registry.drain().len(), 2);
        assert!(registry.is_empty());
    }
}
