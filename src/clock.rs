//! Playback clocks the engine reads.

use std::collections::VecDeque;

use tracing::warn;

/// Source of playback time for the timing engine.
pub trait AudioClock {
    /// Current playback position in milliseconds.
    fn now_ms(&self) -> f64;

    /// The audio has reached its end.
    fn finished(&self) -> bool;
}

/// A clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: f64,
    finished: bool,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, now_ms: f64) {
        self.now_ms = now_ms;
    }

    pub fn advance(&mut self, delta_ms: f64) {
        self.now_ms += delta_ms;
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }
}

impl AudioClock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now_ms
    }

    fn finished(&self) -> bool {
        self.finished
    }
}

const MAX_SAMPLES: usize = 15;
const DRIFT_THRESHOLD_MS: f64 = 50.0;
const DRIFT_FRAME_LIMIT: u32 = 3;
/// Minimum game-time span (seconds) the sample window must cover before the
/// regression is trusted. Playhead readings arrive in buffer-sized steps.
const MIN_REGRESSION_SPAN: f64 = 0.10;
/// Playback milliseconds per game second.
const NOMINAL_SLOPE: f64 = 1000.0;

/// Smooths a stepped audio playhead against frame time.
///
/// Fits a rolling linear regression of playhead position over game time and
/// reports the fitted position, never running backwards. Sustained drift
/// beyond 50 ms re-anchors on the raw reading.
#[derive(Debug, Clone)]
pub struct SmoothedClock {
    samples: VecDeque<(f64, f64)>,
    slope: f64,
    intercept: f64,
    drift_frames: u32,
    current_ms: f64,
    /// Positive when audio is heard late.
    offset_ms: f64,
    finished: bool,
}

impl SmoothedClock {
    pub fn new(offset_ms: f64) -> Self {
        Self {
            samples: VecDeque::with_capacity(MAX_SAMPLES),
            slope: NOMINAL_SLOPE,
            intercept: 0.0,
            drift_frames: 0,
            current_ms: 0.0,
            offset_ms,
            finished: false,
        }
    }

    pub fn set_offset(&mut self, offset_ms: f64) {
        self.offset_ms = offset_ms;
    }

    /// Feed one frame's raw playhead reading.
    pub fn observe(&mut self, game_time_s: f64, audio_ms: f64, finished: bool) {
        self.finished = finished;

        if self.samples.len() >= MAX_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back((game_time_s, audio_ms));

        let covered = self
            .samples
            .front()
            .is_some_and(|&(first, _)| game_time_s - first >= MIN_REGRESSION_SPAN);
        let fitted = if covered { fit_line(&self.samples) } else { None };
        let Some((slope, intercept)) = fitted else {
            // Warming up: follow the raw playhead at nominal rate.
            self.current_ms = audio_ms.max(self.current_ms);
            self.slope = NOMINAL_SLOPE;
            self.intercept = audio_ms - self.slope * game_time_s;
            return;
        };
        self.slope = slope;
        self.intercept = intercept;

        let predicted_ms = slope * game_time_s + intercept;
        let drift_ms = (predicted_ms - audio_ms).abs();

        if drift_ms > DRIFT_THRESHOLD_MS {
            self.drift_frames += 1;
            if self.drift_frames >= DRIFT_FRAME_LIMIT {
                warn!(
                    "Audio drift {drift_ms:.1}ms exceeded threshold for {} frames, hard resyncing",
                    self.drift_frames
                );
                self.resync(game_time_s, audio_ms);
                return;
            }
        } else {
            self.drift_frames = 0;
        }

        self.current_ms = predicted_ms.max(self.current_ms);
    }

    /// Drop history and anchor on a raw reading, e.g. after resuming.
    pub fn resync(&mut self, game_time_s: f64, audio_ms: f64) {
        self.samples.clear();
        self.samples.push_back((game_time_s, audio_ms));
        self.slope = NOMINAL_SLOPE;
        self.intercept = audio_ms - self.slope * game_time_s;
        self.drift_frames = 0;
        self.current_ms = audio_ms;
    }

    /// Forget everything for a new playback from the top.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.slope = NOMINAL_SLOPE;
        self.intercept = 0.0;
        self.drift_frames = 0;
        self.current_ms = 0.0;
        self.finished = false;
    }
}

impl AudioClock for SmoothedClock {
    fn now_ms(&self) -> f64 {
        self.current_ms - self.offset_ms
    }

    fn finished(&self) -> bool {
        self.finished
    }
}

/// Least-squares line through `(game_s, audio_ms)` samples, as
/// `(slope, intercept)`. `None` until the samples spread over time.
fn fit_line(samples: &VecDeque<(f64, f64)>) -> Option<(f64, f64)> {
    // Offsets from the oldest sample keep the sums small when game time
    // has been running for a while.
    let &(origin, _) = samples.front()?;
    let n = samples.len() as f64;
    let mean_dx = samples.iter().map(|&(x, _)| x - origin).sum::<f64>() / n;
    let mean_y = samples.iter().map(|&(_, y)| y).sum::<f64>() / n;

    let (spread, covariance) = samples.iter().fold((0.0, 0.0), |(sxx, sxy), &(x, y)| {
        let dx = x - origin - mean_dx;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });
    if spread < f64::EPSILON {
        return None;
    }

    let slope = covariance / spread;
    Some((slope, mean_y - slope * (origin + mean_dx)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(points: impl IntoIterator<Item = (f64, f64)>) -> VecDeque<(f64, f64)> {
        points.into_iter().collect()
    }

    #[test]
    fn fit_recovers_offset_line() {
        // Menus ran for 100 s before playback started at 250 ms.
        let points = samples((0..15).map(|i| {
            let game = 100.0 + i as f64 * 0.016;
            (game, 1000.0 * (game - 100.0) + 250.0)
        }));
        let (slope, intercept) = fit_line(&points).unwrap();
        assert!((slope - 1000.0).abs() < 1e-4, "slope {slope}");
        let at_start = slope * 100.0 + intercept;
        assert!((at_start - 250.0).abs() < 1e-3, "start {at_start}");
    }

    #[test]
    fn fit_averages_out_steps() {
        // 10 ms playhead steps sampled every 16 ms still fit ~1000 ms/s.
        let points = samples((0..15).map(|i| {
            let game = i as f64 * 0.016;
            (game, (game * 100.0).floor() * 10.0)
        }));
        let (slope, _) = fit_line(&points).unwrap();
        assert!((slope - 1000.0).abs() < 50.0, "slope {slope}");
    }

    #[test]
    fn fit_needs_time_spread() {
        assert_eq!(fit_line(&VecDeque::new()), None);
        assert_eq!(fit_line(&samples([(2.0, 2000.0)])), None);
        assert_eq!(fit_line(&samples([(2.0, 2000.0), (2.0, 2010.0)])), None);
    }

    #[test]
    fn warmup_tracks_raw_reading() {
        let mut clock = SmoothedClock::new(0.0);
        clock.observe(10.0, 0.0, false);
        clock.observe(10.016, 10.0, false);
        assert_eq!(clock.now_ms(), 10.0);
    }

    #[test]
    fn stepped_playhead_is_smoothed() {
        // Playhead advances in 10 ms chunks while frames tick every 16 ms.
        let mut clock = SmoothedClock::new(0.0);
        for i in 0..60 {
            let game = i as f64 * 0.016;
            let audio = (game * 100.0).floor() * 10.0;
            clock.observe(game, audio, false);
        }
        let true_ms = 59.0 * 16.0;
        assert!(
            (clock.now_ms() - true_ms).abs() < 10.0,
            "smoothed {} vs true {true_ms}",
            clock.now_ms()
        );
    }

    #[test]
    fn never_runs_backwards() {
        let mut clock = SmoothedClock::new(0.0);
        clock.observe(0.0, 100.0, false);
        clock.observe(0.016, 90.0, false);
        assert_eq!(clock.now_ms(), 100.0);
    }

    #[test]
    fn sustained_drift_resyncs() {
        let mut clock = SmoothedClock::new(0.0);
        let mut game = 0.0;
        for _ in 0..20 {
            clock.observe(game, game * 1000.0, false);
            game += 0.016;
        }
        // Playback jumps half a second ahead.
        for _ in 0..DRIFT_FRAME_LIMIT {
            clock.observe(game, game * 1000.0 + 500.0, false);
            game += 0.016;
        }
        let last_audio = (game - 0.016) * 1000.0 + 500.0;
        assert!((clock.now_ms() - last_audio).abs() < 1e-6);
    }

    #[test]
    fn offset_shifts_reported_time() {
        let mut clock = SmoothedClock::new(30.0);
        clock.observe(0.0, 1000.0, false);
        assert_eq!(clock.now_ms(), 970.0);
        clock.set_offset(0.0);
        assert_eq!(clock.now_ms(), 1000.0);
    }

    #[test]
    fn resync_and_reset() {
        let mut clock = SmoothedClock::new(0.0);
        clock.observe(0.0, 5000.0, true);
        assert!(clock.finished());
        clock.resync(3.0, 1200.0);
        assert_eq!(clock.now_ms(), 1200.0);
        clock.reset();
        assert_eq!(clock.now_ms(), 0.0);
        assert!(!clock.finished());
    }

    #[test]
    fn manual_clock() {
        let mut clock = ManualClock::new();
        clock.set(100.0);
        clock.advance(50.0);
        assert_eq!(clock.now_ms(), 150.0);
        assert!(!clock.finished());
        clock.finish();
        assert!(clock.finished());
    }
}
