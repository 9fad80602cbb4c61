//! Device callback bridge.
//!
//! Device threads only know the `u32` token a stream was opened with. This
//! module turns `(token, bytes_requested)` back into a sound instance and
//! lets it serve the request. Unknown and stale tokens are ignored.

use crate::registry::HandleRegistry;
use bridge_traits::playback::StreamCallback;
use std::sync::{Arc, Weak};
use tracing::trace;

/// Serve one device request for the instance registered under `token`.
///
/// Returns the number of bytes pushed to the instance's device stream; 0 if
/// the token is unknown, the instance is not playing, or its data is
/// exhausted.
pub fn service_device_request(registry: &HandleRegistry, token: u32, bytes_requested: usize) -> usize {
    match registry.lookup_raw(token) {
        Some(instance) => instance.service_request(bytes_requested),
        None => {
            trace!(token, "Device request for unknown sound");
            0
        }
    }
}

/// Build the callback handed to every device stream.
///
/// The callback keeps only a weak reference, so a stream outliving its
/// manager stops receiving data instead of keeping the registry alive.
pub(crate) fn stream_callback(registry: &Arc<HandleRegistry>) -> StreamCallback {
    let registry: Weak<HandleRegistry> = Arc::downgrade(registry);
    Arc::new(move |token, bytes_requested| {
        if let Some(registry) = registry.upgrade() {
            service_device_request(&registry, token, bytes_requested);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::SoundInstance;
    use crate::traits::{ContainerFormat, DecodedSound, SoundCategory};
    use bridge_traits::playback::{AudioFormat, DeviceStream, SampleEncoding};
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::path::PathBuf;

    #[derive(Clone, Default)]
    struct SinkStream(Arc<Mutex<Vec<u8>>>);

    impl DeviceStream for SinkStream {
        fn put_data(&self, data: &[u8]) {
            self.0.lock().extend_from_slice(data);
        }
        fn pause(&self) {}
        fn resume(&self) {}
        fn clear(&self) {
            self.0.lock().clear();
        }
        fn is_paused(&self) -> bool {
            false
        }
        fn queued_bytes(&self) -> usize {
            self.0.lock().len()
        }
    }

    fn registered(registry: &Arc<HandleRegistry>) -> (Arc<SoundInstance>, SinkStream, u32) {
        let decoded = DecodedSound::new(
            AudioFormat::new(8_000, 1, SampleEncoding::U8),
            ContainerFormat::Wav,
            Bytes::from_static(&[1, 2, 3, 4, 5, 6]),
        );
        let instance = Arc::new(SoundInstance::new(
            SoundCategory::Effect,
            PathBuf::from("tick.wav"),
            Box::new(decoded),
            Arc::downgrade(registry),
        ));
        let stream = SinkStream::default();
        instance.attach_stream(Box::new(stream.clone()));
        let handle = registry.register(Arc::clone(&instance)).unwrap();
        (instance, stream, handle.raw())
    }

    #[test]
    fn test_unknown_tokens_are_ignored() {
        let registry = HandleRegistry::new(8);
        assert_eq!(service_device_request(&registry, 0, 128), 0);
        assert_eq!(service_device_request(&registry, 42, 128), 0);
    }

    #[test]
    fn test_request_reaches_instance() {
        let registry = Arc::new(HandleRegistry::new(8));
        let (instance, stream, token) = registered(&registry);
        instance.play();

        assert_eq!(service_device_request(&registry, token, 4), 4);
        assert_eq!(*stream.0.lock(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_closed_token_goes_stale() {
        let registry = Arc::new(HandleRegistry::new(8));
        let (instance, stream, token) = registered(&registry);
        instance.play();
        instance.close();

        assert_eq!(service_device_request(&registry, token, 4), 0);
        assert!(stream.0.lock().is_empty());
    }

    #[test]
    fn test_callback_outliving_registry_is_inert() {
        let registry = Arc::new(HandleRegistry::new(8));
        let (instance, stream, token) = registered(&registry);
        instance.play();

        let callback = stream_callback(&registry);
        callback(token, 2);
        assert_eq!(stream.0.lock().len(), 2);

        drop(registry);
        callback(token, 2);
        assert_eq!(stream.0.lock().len(), 2);
    }
}
