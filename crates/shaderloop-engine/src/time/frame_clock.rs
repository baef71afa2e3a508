use std::time::{Duration, Instant};

/// Frame timing snapshot handed to the render loop.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTime {
    /// Milliseconds since the clock's epoch. Never decreases between ticks.
    pub timestamp_ms: f64,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// Plays the role of a display-refresh timestamp source: one clock per loop,
/// ticked once per redraw. Timestamps are relative to the clock's epoch
/// (normally the first frame of the loop).
#[derive(Debug, Clone)]
pub struct FrameClock {
    epoch: Instant,
    last_ms: f64,
    frame_index: u64,
}

impl FrameClock {
    /// Creates a clock whose epoch is now.
    pub fn new() -> Self {
        Self::with_epoch(Instant::now())
    }

    /// Creates a clock with an explicit epoch.
    pub fn with_epoch(epoch: Instant) -> Self {
        Self {
            epoch,
            last_ms: 0.0,
            frame_index: 0,
        }
    }

    /// Moves the epoch to now and resets the frame counter.
    pub fn restart(&mut self) {
        *self = Self::new();
    }

    /// Time since the epoch.
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock as if it were `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let ms = now.saturating_duration_since(self.epoch).as_secs_f64() * 1000.0;
        // Instants are monotonic, but callers of `tick_at` may pass anything.
        let timestamp_ms = ms.max(self.last_ms);
        self.last_ms = timestamp_ms;

        let ft = FrameTime {
            timestamp_ms,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
