use std::time::Duration;

/// Frames-per-second estimate published by [`FpsCounter`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FpsSample {
    pub fps: f64,
    pub frames: u32,
    pub window: Duration,
}

/// Counts frames and publishes a rate once per window.
///
/// Frames are accumulated until strictly more than `window` has elapsed since
/// the time base; the rate is then `frames / elapsed` and the count restarts.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: Duration,
    time_base: Duration,
    frames: u32,
    last: Option<FpsSample>,
}

impl FpsCounter {
    pub const DEFAULT_WINDOW: Duration = Duration::from_millis(1000);

    pub fn new() -> Self {
        Self::with_window(Self::DEFAULT_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            time_base: Duration::ZERO,
            frames: 0,
            last: None,
        }
    }

    /// Records one frame at `elapsed` (time since the application started).
    ///
    /// Returns a fresh sample when the window closed on this frame.
    pub fn frame(&mut self, elapsed: Duration) -> Option<FpsSample> {
        self.frames += 1;

        let span = elapsed.saturating_sub(self.time_base);
        if span <= self.window {
            return None;
        }

        let sample = FpsSample {
            fps: self.frames as f64 / span.as_secs_f64(),
            frames: self.frames,
            window: span,
        };

        self.time_base = elapsed;
        self.frames = 0;
        self.last = Some(sample);
        Some(sample)
    }

    /// Most recently published sample.
    pub fn last(&self) -> Option<FpsSample> {
        self.last
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}
