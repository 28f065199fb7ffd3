use std::time::{Duration, Instant};

/// Frames-per-second is recomputed once per window.
const WINDOW: Duration = Duration::from_secs(1);

/// On-screen performance counter state: frame rate averaged over one-second
/// windows and the duration of the most recent frame.
#[derive(Debug, Default, Clone)]
pub struct FrameStats {
    window_start: Option<Instant>,
    window_frames: u32,
    last_frame: Option<Instant>,
    frame_time: Duration,
    fps: f32,
    total_frames: u64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame finishing at `now`.
    pub fn update(&mut self, now: Instant) {
        self.total_frames += 1;
        if let Some(last) = self.last_frame {
            self.frame_time = now.saturating_duration_since(last);
        }
        self.last_frame = Some(now);

        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return;
        };
        self.window_frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed >= WINDOW {
            self.fps = self.window_frames as f32 / elapsed.as_secs_f32();
            self.window_start = Some(now);
            self.window_frames = 0;
        }
    }

    /// Frames per second over the last completed window, 0 before the first
    /// window completes.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

impl std::fmt::Display for FrameStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.0} FPS ({:.1} ms)",
            self.fps,
            self.frame_time.as_secs_f64() * 1000.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rate_before_first_window() {
        let mut stats = FrameStats::new();
        let start = Instant::now();
        stats.update(start);
        stats.update(start + Duration::from_millis(20));
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.frame_time(), Duration::from_millis(20));
        assert_eq!(stats.total_frames(), 2);
    }

    #[test]
    fn rate_over_one_second() {
        let mut stats = FrameStats::new();
        let start = Instant::now();
        for i in 0..=50u64 {
            stats.update(start + Duration::from_millis(i * 20));
        }
        assert!((stats.fps() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn display_shows_rate_and_time() {
        let mut stats = FrameStats::new();
        let start = Instant::now();
        for i in 0..=25u64 {
            stats.update(start + Duration::from_millis(i * 40));
        }
        let s = format!("{stats}");
        assert!(s.contains("25 FPS"));
        assert!(s.contains("40.0 ms"));
    }
}
