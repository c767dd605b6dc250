use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::{AdviceService, ImageRef};

/// What the renderer should show for the current handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarState {
    /// No handle has been resolved
    Empty,
    /// Lookup racing against the timeout
    Pending,
    /// An image is held
    Ready,
    /// Lookup failed or lost the race; show the placeholder
    Missing,
}

/// Borrowed view of the held image for renderers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarImage {
    pub handle: String,
    pub content_type: String,
    pub data: Bytes,
}

struct Slot {
    generation: u64,
    handle: Option<String>,
    state: AvatarState,
    image: Option<ImageRef>,
    task: Option<JoinHandle<()>>,
    torn_down: bool,
}

impl Slot {
    /// Forget the current handle: release the image and stop any lookup
    fn reset(&mut self) {
        self.generation += 1;
        self.handle = None;
        self.state = AvatarState::Empty;
        if let Some(image) = self.image.take() {
            image.release();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Resolves the display image for a verified handle, best effort
///
/// Each resolution runs under a generation number. Whichever comes first, the
/// lookup or the timeout, settles it; a result whose generation is no longer
/// current is released on arrival instead of adopted.
pub struct AvatarCoordinator {
    service: Arc<dyn AdviceService>,
    timeout: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl AvatarCoordinator {
    pub fn new(service: Arc<dyn AdviceService>, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                handle: None,
                state: AvatarState::Empty,
                image: None,
                task: None,
                torn_down: false,
            })),
        }
    }

    pub fn state(&self) -> AvatarState {
        self.slot.lock().state
    }

    /// Handle the current (or pending) avatar belongs to
    pub fn handle(&self) -> Option<String> {
        self.slot.lock().handle.clone()
    }

    pub fn image(&self) -> Option<AvatarImage> {
        let slot = self.slot.lock();
        let handle = slot.handle.clone()?;
        slot.image.as_ref().map(|image| AvatarImage {
            handle,
            content_type: image.content_type().to_string(),
            data: image.data().clone(),
        })
    }

    /// Claim the slot for `handle`. `None` if it is already keyed to that handle.
    fn claim(&self, handle: &str) -> Option<u64> {
        let mut slot = self.slot.lock();
        if slot.torn_down {
            return None;
        }
        if slot.handle.as_deref() == Some(handle) {
            return None;
        }
        slot.reset();
        slot.handle = Some(handle.to_string());
        slot.state = AvatarState::Pending;
        Some(slot.generation)
    }

    /// Resolve the avatar for `handle` and wait for the race to settle
    pub async fn resolve(&self, handle: &str) -> AvatarState {
        if let Some(generation) = self.claim(handle) {
            race(
                Arc::clone(&self.service),
                self.timeout,
                Arc::clone(&self.slot),
                handle.to_string(),
                generation,
            )
            .await;
        }
        self.state()
    }

    /// Start resolving in the background. Needs a tokio runtime.
    pub fn prefetch(&self, handle: &str) {
        let Some(generation) = self.claim(handle) else {
            return;
        };

        let task = tokio::spawn(race(
            Arc::clone(&self.service),
            self.timeout,
            Arc::clone(&self.slot),
            handle.to_string(),
            generation,
        ));

        let mut slot = self.slot.lock();
        if slot.generation == generation {
            slot.task = Some(task);
        } else {
            task.abort();
        }
    }

    /// The handle changed: drop whatever belonged to the old one
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock();
        if slot.handle.is_some() || slot.image.is_some() {
            debug!(generation = slot.generation, "avatar invalidated");
        }
        slot.reset();
    }

    /// Release everything; later results and prefetches are ignored
    pub fn teardown(&self) {
        let mut slot = self.slot.lock();
        slot.reset();
        slot.torn_down = true;
    }
}

impl Drop for AvatarCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// First of lookup and deadline wins; a timeout means no avatar
async fn race(
    service: Arc<dyn AdviceService>,
    timeout: Duration,
    slot: Arc<Mutex<Slot>>,
    handle: String,
    generation: u64,
) {
    let image = match tokio::time::timeout(timeout, service.fetch_avatar(handle.clone())).await {
        Ok(image) => image,
        Err(_) => {
            debug!(%handle, ?timeout, "avatar lookup timed out");
            None
        }
    };

    let mut slot = slot.lock();
    if slot.torn_down || slot.generation != generation {
        debug!(%handle, generation, current = slot.generation, "discarding stale avatar");
        if let Some(image) = image {
            image.release();
        }
        return;
    }

    slot.task = None;
    match image {
        Some(image) => {
            debug!(%handle, image_id = image.id(), bytes = image.len(), "avatar ready");
            slot.image = Some(image);
            slot.state = AvatarState::Ready;
        }
        None => {
            slot.state = AvatarState::Missing;
        }
    }
}
