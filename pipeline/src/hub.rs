use sentinel_cam_common::frame::{Frame, MotionState};
use std::sync::{Arc, RwLock};

/// The latest (frame, motion) pair, published as one unit.
#[derive(Debug, Clone)]
pub struct FrameUpdate {
    pub frame: Arc<Frame>,
    pub motion: MotionState,
}

/// Single-writer/multi-reader holder of the latest pipeline output.
///
/// The acquisition loop is the only publisher; any number of stream
/// consumers and status queries read concurrently. A publish is an `Arc`
/// pointer swap under a write lock, so the producer never waits on readers
/// beyond their brief clone-and-release read guards, and a reader can never
/// observe a frame paired with a motion state from a different cycle.
/// Readers that fall behind simply skip frames; nothing is replayed.
pub struct FrameHub {
    latest: RwLock<Option<Arc<FrameUpdate>>>,
}

impl FrameHub {
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(None),
        }
    }

    /// Publish a new pair, superseding the previous one. Producer-only.
    pub fn publish(&self, frame: Frame, motion: MotionState) {
        // The pair is assembled before the lock is taken; the critical
        // section is a single pointer store.
        let update = Arc::new(FrameUpdate {
            frame: Arc::new(frame),
            motion,
        });
        let mut guard = self
            .latest
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(update);
    }

    /// Latest published pair, or `None` before the first publish.
    pub fn read_latest(&self) -> Option<Arc<FrameUpdate>> {
        self.latest
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Lightweight accessor for just the motion state.
    pub fn read_motion(&self) -> Option<MotionState> {
        self.latest
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|u| u.motion)
    }
}

impl Default for FrameHub {
    fn default() -> Self {
        Self::new()
    }
}
