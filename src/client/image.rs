use bytes::Bytes;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    live: AtomicUsize,
    released: AtomicUsize,
}

/// Issues [`ImageRef`]s and keeps count of the ones still alive
#[derive(Debug, Clone, Default)]
pub struct ImageRegistry {
    inner: Arc<RegistryInner>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of downloaded image data
    pub fn create(&self, content_type: impl Into<String>, data: Bytes) -> ImageRef {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.live.fetch_add(1, Ordering::AcqRel);
        trace!(image_id = id, bytes = data.len(), "image ref created");
        ImageRef {
            id,
            content_type: content_type.into(),
            data,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Number of refs created and not yet released
    pub fn live(&self) -> usize {
        self.inner.live.load(Ordering::Acquire)
    }

    /// Number of refs released so far
    pub fn released(&self) -> usize {
        self.inner.released.load(Ordering::Acquire)
    }
}

/// Owned handle to downloaded image bytes
///
/// Not `Clone`: releasing happens when the single owner drops it (or calls
/// [`ImageRef::release`]), so a ref can never be released twice.
pub struct ImageRef {
    id: u64,
    content_type: String,
    data: Bytes,
    registry: Arc<RegistryInner>,
}

impl ImageRef {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ImageRef {
    fn drop(&mut self) {
        self.registry.live.fetch_sub(1, Ordering::AcqRel);
        self.registry.released.fetch_add(1, Ordering::AcqRel);
        trace!(image_id = self.id, "image ref released");
    }
}

impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageRef")
            .field("id", &self.id)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}
