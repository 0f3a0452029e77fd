// src/visibility.rs - Tracking / Lost state derived from frame arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    Tracking,
    Lost,
}

#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    state: VisibilityState,
    time_since_frame: f64,
    timeout: f64,
}

impl VisibilityTracker {
    /// Starts out `Lost`: nothing has been seen yet.
    pub fn new(timeout: f64) -> Self {
        Self {
            state: VisibilityState::Lost,
            time_since_frame: 0.0,
            timeout,
        }
    }

    pub fn on_frame_received(&mut self) {
        if self.state == VisibilityState::Lost {
            tracing::info!("Hand tracking acquired");
        }
        self.time_since_frame = 0.0;
        self.state = VisibilityState::Tracking;
    }

    pub fn tick(&mut self, delta_time: f64) -> VisibilityState {
        if delta_time.is_finite() && delta_time > 0.0 {
            self.time_since_frame += delta_time;
        }

        if self.state == VisibilityState::Tracking && self.time_since_frame > self.timeout {
            tracing::info!(
                "Hand tracking lost after {:.2}s without a frame",
                self.time_since_frame
            );
            self.state = VisibilityState::Lost;
        }
        self.state
    }

    pub fn current_state(&self) -> VisibilityState {
        self.state
    }

    pub fn time_since_frame(&self) -> f64 {
        self.time_since_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_lost() {
        let tracker = VisibilityTracker::new(0.5);
        assert_eq!(tracker.current_state(), VisibilityState::Lost);
    }

    #[test]
    fn test_gap_longer_than_timeout_loses_tracking() {
        let mut tracker = VisibilityTracker::new(0.5);
        tracker.on_frame_received();
        assert_eq!(tracker.tick(0.3), VisibilityState::Tracking);
        assert_eq!(tracker.tick(0.3), VisibilityState::Lost);
        assert!((tracker.time_since_frame() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_frames_inside_timeout_never_lose_tracking() {
        let mut tracker = VisibilityTracker::new(0.5);
        tracker.on_frame_received();
        for _ in 0..20 {
            assert_eq!(tracker.tick(0.49), VisibilityState::Tracking);
            tracker.on_frame_received();
            assert_eq!(tracker.time_since_frame(), 0.0);
        }
    }

    #[test]
    fn test_frame_recovers_immediately() {
        let mut tracker = VisibilityTracker::new(0.5);
        tracker.on_frame_received();
        tracker.tick(2.0);
        assert_eq!(tracker.current_state(), VisibilityState::Lost);
        tracker.on_frame_received();
        assert_eq!(tracker.current_state(), VisibilityState::Tracking);
    }

    #[test]
    fn test_elapsed_time_keeps_growing_while_lost() {
        let mut tracker = VisibilityTracker::new(0.5);
        tracker.tick(1.0);
        tracker.tick(1.0);
        assert!((tracker.time_since_frame() - 2.0).abs() < 1e-12);
        assert_eq!(tracker.current_state(), VisibilityState::Lost);
    }

    #[test]
    fn test_bad_delta_is_ignored() {
        let mut tracker = VisibilityTracker::new(0.5);
        tracker.on_frame_received();
        tracker.tick(f64::NAN);
        tracker.tick(-3.0);
        assert_eq!(tracker.time_since_frame(), 0.0);
        assert_eq!(tracker.current_state(), VisibilityState::Tracking);
    }
}
