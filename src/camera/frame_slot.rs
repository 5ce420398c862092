//! Single-slot, latest-wins hand-off from the capture thread to the UI.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::Frame;

/// Receives every frame the capture worker decodes.
pub trait FrameSink: Send + Sync {
    fn deliver(&self, frame: Frame);
}

/// Holds at most one frame. A new frame overwrites an unconsumed one.
#[derive(Debug, Default)]
pub struct FrameSlot {
    latest: Mutex<Option<Frame>>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the newest frame, leaving the slot empty.
    pub fn take(&self) -> Option<Frame> {
        self.latest.lock().ok()?.take()
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.latest.lock() {
            *slot = None;
        }
    }

    /// Frames published since creation.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Frames overwritten before anyone took them.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl FrameSink for FrameSlot {
    fn deliver(&self, frame: Frame) {
        if let Ok(mut slot) = self.latest.lock() {
            if slot.replace(frame).is_some() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PixelFormat;

    fn frame(tag: u8) -> Frame {
        Frame::new(1, 1, PixelFormat::Rgb8, vec![tag, tag, tag])
    }

    #[test]
    fn newest_frame_wins() {
        let slot = FrameSlot::new();
        slot.deliver(frame(1));
        slot.deliver(frame(2));
        slot.deliver(frame(3));

        assert_eq!(slot.take().map(|f| f.data[0]), Some(3));
        assert!(slot.take().is_none());
        assert_eq!(slot.delivered(), 3);
        assert_eq!(slot.dropped(), 2);
    }

    #[test]
    fn clear_empties_the_slot() {
        let slot = FrameSlot::new();
        slot.deliver(frame(7));
        slot.clear();
        assert!(slot.take().is_none());
    }
}
