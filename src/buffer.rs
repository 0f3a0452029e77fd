// src/buffer.rs - Single-slot landmark frame buffer shared between receiver and tick loop
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::landmarks::LandmarkFrame;

/// The most recent frame and when it arrived.
#[derive(Debug, Clone, Copy)]
pub struct LatestFrame {
    pub frame: LandmarkFrame,
    pub received_at: Instant,
    /// Increases by one per published frame, starting at 1
    pub sequence: u64,
}

#[derive(Debug, Default)]
struct Slot {
    latest: Option<LatestFrame>,
    next_sequence: u64,
    closed: bool,
}

/// Latest-frame-wins buffer. Writers replace the whole slot, there is no queue.
#[derive(Debug, Clone, Default)]
pub struct LandmarkBuffer {
    slot: Arc<Mutex<Slot>>,
}

impl LandmarkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A panicked writer cannot leave a half-written frame behind, the slot is
        // only ever assigned whole, so the poisoned value is still usable.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the stored frame. Returns the new sequence number, or `None` once closed.
    pub fn publish(&self, frame: LandmarkFrame) -> Option<u64> {
        let mut slot = self.lock();
        if slot.closed {
            return None;
        }
        slot.next_sequence += 1;
        let sequence = slot.next_sequence;
        slot.latest = Some(LatestFrame {
            frame,
            received_at: Instant::now(),
            sequence,
        });
        Some(sequence)
    }

    pub fn latest(&self) -> Option<LatestFrame> {
        self.lock().latest
    }

    /// The stored frame, only if it is newer than `sequence`.
    pub fn latest_since(&self, sequence: u64) -> Option<LatestFrame> {
        self.lock().latest.filter(|latest| latest.sequence > sequence)
    }

    /// Stop accepting frames. Anything published afterwards is dropped.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::LANDMARK_COUNT;
    use nalgebra::Vector3;

    fn frame_with_wrist(x: f64) -> LandmarkFrame {
        let mut points = [Vector3::zeros(); LANDMARK_COUNT];
        points[0].x = x;
        LandmarkFrame::new(points)
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = LandmarkBuffer::new();
        assert!(buffer.latest().is_none());
        assert!(buffer.latest_since(0).is_none());
    }

    #[test]
    fn test_latest_frame_wins() {
        let buffer = LandmarkBuffer::new();
        assert_eq!(buffer.publish(frame_with_wrist(1.0)), Some(1));
        assert_eq!(buffer.publish(frame_with_wrist(2.0)), Some(2));
        assert_eq!(buffer.publish(frame_with_wrist(3.0)), Some(3));

        let latest = buffer.latest().unwrap();
        assert_eq!(latest.sequence, 3);
        assert_eq!(latest.frame.wrist().x, 3.0);
    }

    #[test]
    fn test_latest_since_is_idempotent_without_new_frames() {
        let buffer = LandmarkBuffer::new();
        buffer.publish(frame_with_wrist(1.0));

        let first = buffer.latest_since(0).unwrap();
        assert!(buffer.latest_since(first.sequence).is_none());
        assert!(buffer.latest_since(first.sequence).is_none());
        // Reading does not consume
        assert_eq!(buffer.latest().unwrap().sequence, first.sequence);
    }

    #[test]
    fn test_received_at_is_stamped_on_publish() {
        let buffer = LandmarkBuffer::new();
        let before = Instant::now();
        buffer.publish(frame_with_wrist(1.0));
        let first = buffer.latest().unwrap().received_at;
        assert!(first >= before);

        buffer.publish(frame_with_wrist(2.0));
        let second = buffer.latest().unwrap().received_at;
        assert!(second >= first);
        assert!(second <= Instant::now());
    }

    #[test]
    fn test_closed_buffer_discards_publishes() {
        let buffer = LandmarkBuffer::new();
        buffer.publish(frame_with_wrist(1.0));
        buffer.close();
        assert!(buffer.is_closed());
        assert_eq!(buffer.publish(frame_with_wrist(9.0)), None);
        assert_eq!(buffer.latest().unwrap().frame.wrist().x, 1.0);
    }

    #[test]
    fn test_clones_share_the_slot() {
        let writer = LandmarkBuffer::new();
        let reader = writer.clone();
        std::thread::spawn(move || {
            for i in 0..100 {
                writer.publish(frame_with_wrist(i as f64));
            }
        })
        .join()
        .unwrap();
        let latest = reader.latest().unwrap();
        assert_eq!(latest.sequence, 100);
        assert_eq!(latest.frame.wrist().x, 99.0);
    }
}
