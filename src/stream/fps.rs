// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 帧率统计与会话状态

use std::time::Instant;

use tracing::debug;

/// Windowed FPS: recomputed every `window` frames, unknown before the first window closes.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: u32,
    frame_count: u32,
    window_start: Instant,
    fps: Option<f64>,
}

impl FpsMeter {
    pub fn new(window: u32) -> Self {
        Self::start_at(window, Instant::now())
    }

    pub fn start_at(window: u32, start: Instant) -> Self {
        Self {
            window: window.max(1),
            frame_count: 0,
            window_start: start,
            fps: None,
        }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    /// Frames counted in the current window.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn fps(&self) -> Option<f64> {
        self.fps
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        self.frame_count += 1;
        if self.frame_count >= self.window {
            let elapsed = now.saturating_duration_since(self.window_start).as_secs_f64();
            if elapsed > 0.0 {
                let fps = self.frame_count as f64 / elapsed;
                debug!(fps, frames = self.frame_count, elapsed, "fps window closed");
                self.fps = Some(fps);
            }
            self.frame_count = 0;
            self.window_start = now;
        }
        self.fps
    }
}

/// Per-session mutable state. Never shared between sessions.
#[derive(Debug, Clone)]
pub struct StreamState {
    frames: u64,
    meter: FpsMeter,
}

impl StreamState {
    pub fn new(fps_window: u32) -> Self {
        Self {
            frames: 0,
            meter: FpsMeter::new(fps_window),
        }
    }

    pub fn start_at(fps_window: u32, start: Instant) -> Self {
        Self {
            frames: 0,
            meter: FpsMeter::start_at(fps_window, start),
        }
    }

    /// Count one processed frame; returns its 1-based number and the current FPS.
    pub fn on_frame(&mut self, now: Instant) -> (u64, Option<f64>) {
        self.frames += 1;
        (self.frames, self.meter.tick_at(now))
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn fps(&self) -> Option<f64> {
        self.meter.fps()
    }

    pub fn meter(&self) -> &FpsMeter {
        &self.meter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn unknown_until_window_closes() {
        let t0 = Instant::now();
        let mut meter = FpsMeter::start_at(30, t0);
        for i in 1..30 {
            assert_eq!(meter.tick_at(t0 + Duration::from_millis(i * 10)), None);
        }
        // 30 frames in 1.5 s
        let fps = meter.tick_at(t0 + Duration::from_millis(1500)).unwrap();
        assert!((fps - 20.0).abs() < 1e-9);
        assert_eq!(meter.frame_count(), 0);
    }

    #[test]
    fn value_persists_and_refreshes_per_window() {
        let t0 = Instant::now();
        let mut meter = FpsMeter::start_at(3, t0);
        meter.tick_at(t0);
        meter.tick_at(t0);
        assert_eq!(meter.tick_at(t0 + Duration::from_secs(1)), Some(3.0));

        let t1 = t0 + Duration::from_secs(1);
        assert_eq!(meter.tick_at(t1), Some(3.0));
        meter.tick_at(t1);
        assert_eq!(meter.tick_at(t1 + Duration::from_millis(500)), Some(6.0));
    }

    #[test]
    fn zero_elapsed_window_keeps_previous_value() {
        let t0 = Instant::now();
        let mut meter = FpsMeter::start_at(2, t0);
        meter.tick_at(t0);
        assert_eq!(meter.tick_at(t0), None);
        assert_eq!(meter.frame_count(), 0);
    }

    #[test]
    fn state_numbers_frames_from_one() {
        let t0 = Instant::now();
        let mut state = StreamState::start_at(30, t0);
        assert_eq!(state.on_frame(t0), (1, None));
        assert_eq!(state.on_frame(t0).0, 2);
        assert_eq!(state.frames(), 2);
        assert_eq!(state.meter().window(), 30);
    }
}
