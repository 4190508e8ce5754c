//! Time management utilities

use std::time::{Duration, Instant};

/// Longest frame delta handed to the scene, in seconds.
///
/// A stall (window drag, breakpoint) otherwise turns into one huge step.
pub const MAX_DELTA_SECONDS: f32 = 0.25;

/// Frame timer producing the per-frame delta in seconds
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        self.advance(now.duration_since(self.last_frame));
        self.last_frame = now;
    }

    /// Advance by an explicit duration instead of the wall clock
    pub fn advance(&mut self, elapsed: Duration) {
        self.delta_time = elapsed.as_secs_f32().clamp(0.0, MAX_DELTA_SECONDS);
        self.total_time += self.delta_time;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the average FPS since timer creation
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

/// Sleeps out the remainder of a frame to hold a target rate
pub struct FrameLimiter {
    frame_budget: Option<Duration>,
    frame_start: Instant,
}

impl FrameLimiter {
    /// Limit to `target_fps`; `None` or zero disables limiting
    pub fn new(target_fps: Option<u32>) -> Self {
        Self {
            frame_budget: target_fps
                .filter(|fps| *fps > 0)
                .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps))),
            frame_start: Instant::now(),
        }
    }

    /// Mark the beginning of a frame
    pub fn begin_frame(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Sleep until the frame budget is used up
    pub fn end_frame(&self) {
        if let Some(budget) = self.frame_budget {
            let spent = self.frame_start.elapsed();
            if spent < budget {
                std::thread::sleep(budget - spent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_advance_accumulates() {
        let mut timer = Timer::new();
        timer.advance(Duration::from_millis(16));
        timer.advance(Duration::from_millis(16));

        assert_eq!(timer.frame_count(), 2);
        assert_relative_eq!(timer.delta_time(), 0.016, epsilon = 1e-6);
        assert_relative_eq!(timer.total_time(), 0.032, epsilon = 1e-6);
    }

    #[test]
    fn test_large_stall_is_clamped() {
        let mut timer = Timer::new();
        timer.advance(Duration::from_secs(3));
        assert_relative_eq!(timer.delta_time(), MAX_DELTA_SECONDS);
    }

    #[test]
    fn test_zero_fps_disables_limiter() {
        let limiter = FrameLimiter::new(Some(0));
        assert!(limiter.frame_budget.is_none());
        let limiter = FrameLimiter::new(Some(60));
        assert!(limiter.frame_budget.is_some());
    }
}
