use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};
use tracing::warn;

use super::{BeatPulse, BeatSource, SourceKind};
use crate::config::{HitTolerance, LiveConfig};
use crate::samples::SampleBuffer;

/// Byte-scaled frequency magnitudes at the playhead, lowest bin first.
pub trait SpectrumTap: Send + Sync {
    fn frequency_data(&mut self, now_ms: f64) -> &[f32];

    /// Drop any smoothing history.
    fn reset(&mut self) {}
}

/// Flags a beat whenever bass energy at the playhead crosses a fixed
/// threshold, at most once per refractory interval.
pub struct LiveEstimator {
    tap: Box<dyn SpectrumTap>,
    config: LiveConfig,
    tolerance: HitTolerance,
    last_beat_ms: Option<f64>,
    next_beat_ms: Option<f64>,
    pending_target: bool,
}

impl LiveEstimator {
    pub fn new(tap: Box<dyn SpectrumTap>, config: LiveConfig, tolerance: HitTolerance) -> Self {
        Self {
            tap,
            config,
            tolerance,
            last_beat_ms: None,
            next_beat_ms: None,
            pending_target: false,
        }
    }

    /// Mean of the lowest `bass_bins` bins.
    fn bass_level(&mut self, now_ms: f64) -> f32 {
        let data = self.tap.frequency_data(now_ms);
        let bins = &data[..self.config.bass_bins.min(data.len())];
        if bins.is_empty() {
            return 0.0;
        }
        bins.iter().sum::<f32>() / bins.len() as f32
    }
}

impl BeatSource for LiveEstimator {
    fn poll(&mut self, now_ms: f64) -> BeatPulse {
        let level = self.bass_level(now_ms);
        let rested = self
            .last_beat_ms
            .is_none_or(|last| now_ms - last > self.config.min_interval_ms);

        if level > self.config.threshold * self.config.scale && rested {
            self.last_beat_ms = Some(now_ms);
            self.next_beat_ms = Some(now_ms + self.config.min_interval_ms);
            self.pending_target = true;
            return BeatPulse {
                onset: true,
                last_beat_ms: Some(now_ms),
                window_anchor: Some(now_ms),
            };
        }

        // Between beats only the predicted next beat opens the window.
        let window_anchor = self
            .next_beat_ms
            .filter(|next| self.tolerance.contains(next - now_ms));

        BeatPulse {
            onset: false,
            last_beat_ms: self.last_beat_ms,
            window_anchor,
        }
    }

    fn claim_target(&mut self, _now_ms: f64) -> bool {
        std::mem::take(&mut self.pending_target)
    }

    fn rewind(&mut self) {
        self.last_beat_ms = None;
        self.next_beat_ms = None;
        self.pending_target = false;
        self.tap.reset();
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }
}

/// Analyser-style spectrum over a decoded track.
///
/// Transforms the `fft_size` samples ending at the playhead, smooths
/// magnitudes over time and maps `[min_db, max_db]` onto `[0, scale]`.
pub struct PlayheadTap {
    buffer: Arc<SampleBuffer>,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<realfft::num_complex::Complex<f32>>,
    scratch: Vec<realfft::num_complex::Complex<f32>>,
    smoothed: Vec<f32>,
    levels: Vec<f32>,
    config: LiveConfig,
}

impl PlayheadTap {
    pub fn new(buffer: Arc<SampleBuffer>, config: LiveConfig) -> Self {
        let size = config.fft_size.max(2).next_power_of_two();
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        let window = (0..size)
            .map(|i| 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / size as f32).cos()))
            .collect();
        let bins = size / 2;
        Self {
            buffer,
            input: fft.make_input_vec(),
            spectrum: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            fft,
            window,
            smoothed: vec![0.0; bins],
            levels: vec![0.0; bins],
            config,
        }
    }
}

impl SpectrumTap for PlayheadTap {
    fn frequency_data(&mut self, now_ms: f64) -> &[f32] {
        let size = self.input.len();
        let end = self.buffer.index_at_ms(now_ms);
        let start = end.saturating_sub(size);
        let recent = &self.buffer.samples()[start..end];

        // Right-align so the newest sample sits at the end of the window.
        self.input.fill(0.0);
        let offset = size - recent.len();
        for (i, s) in recent.iter().enumerate() {
            self.input[offset + i] = s * self.window[offset + i];
        }

        if let Err(e) = self
            .fft
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
        {
            warn!("Live spectrum transform failed: {}", e);
            return &self.levels;
        }

        let tau = self.config.smoothing.clamp(0.0, 1.0);
        let db_range = (self.config.max_db - self.config.min_db).max(f32::EPSILON);
        for ((smoothed, level), c) in self
            .smoothed
            .iter_mut()
            .zip(self.levels.iter_mut())
            .zip(&self.spectrum)
        {
            let magnitude = c.norm() / size as f32;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
            let db = 20.0 * smoothed.max(f32::MIN_POSITIVE).log10();
            *level = ((db - self.config.min_db) / db_range * self.config.scale)
                .clamp(0.0, self.config.scale);
        }
        &self.levels
    }

    fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.levels.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Constant bass level that switches at the given times.
    struct ScriptedTap {
        steps: Vec<(f64, f32)>,
        data: Vec<f32>,
    }

    impl ScriptedTap {
        fn boxed(steps: &[(f64, f32)]) -> Box<dyn SpectrumTap> {
            Box::new(Self {
                steps: steps.to_vec(),
                data: vec![0.0; 16],
            })
        }
    }

    impl SpectrumTap for ScriptedTap {
        fn frequency_data(&mut self, now_ms: f64) -> &[f32] {
            let level = self
                .steps
                .iter()
                .rev()
                .find(|(from, _)| *from <= now_ms)
                .map_or(0.0, |(_, level)| *level);
            self.data.fill(level);
            &self.data
        }
    }

    fn estimator(steps: &[(f64, f32)]) -> LiveEstimator {
        let tolerance = HitTolerance {
            early_ms: 200.0,
            late_ms: 200.0,
        };
        LiveEstimator::new(ScriptedTap::boxed(steps), LiveConfig::default(), tolerance)
    }

    #[test]
    fn loud_bass_flags_beat_and_target() {
        let mut live = estimator(&[(0.0, 200.0)]);
        let pulse = live.poll(0.0);
        assert!(pulse.onset);
        assert_eq!(pulse.window_anchor, Some(0.0));
        assert!(live.claim_target(0.0));
        assert!(!live.claim_target(10.0));
    }

    #[test]
    fn quiet_bass_never_fires() {
        // Threshold is 0.15 * 255 = 38.25.
        let mut live = estimator(&[(0.0, 38.0)]);
        for t in 0..20 {
            assert!(!live.poll(t as f64 * 50.0).onset);
        }
        assert!(!live.claim_target(1000.0));
    }

    #[test]
    fn refractory_interval_is_strict() {
        let mut live = estimator(&[(0.0, 200.0)]);
        assert!(live.poll(0.0).onset);
        assert!(!live.poll(100.0).onset);
        assert!(!live.poll(250.0).onset);
        assert!(live.poll(260.0).onset);
    }

    #[test]
    fn window_follows_predicted_beat() {
        let mut live = estimator(&[(0.0, 200.0), (10.0, 0.0)]);
        assert_eq!(live.poll(0.0).window_anchor, Some(0.0));
        // Next beat is predicted at 250: 220 ms early is still closed.
        assert_eq!(live.poll(30.0).window_anchor, None);
        assert_eq!(live.poll(50.0).window_anchor, Some(250.0));
        assert_eq!(live.poll(300.0).window_anchor, Some(250.0));
        assert_eq!(live.poll(450.0).window_anchor, Some(250.0));
        assert_eq!(live.poll(460.0).window_anchor, None);
    }

    #[test]
    fn heard_beat_does_not_hold_window_open() {
        let config = LiveConfig {
            min_interval_ms: 1000.0,
            ..Default::default()
        };
        let tolerance = HitTolerance {
            early_ms: 200.0,
            late_ms: 200.0,
        };
        let tap = ScriptedTap::boxed(&[(0.0, 200.0), (10.0, 0.0)]);
        let mut live = LiveEstimator::new(tap, config, tolerance);
        assert!(live.poll(0.0).onset);
        let pulse = live.poll(100.0);
        assert_eq!(pulse.last_beat_ms, Some(0.0));
        assert_eq!(pulse.window_anchor, None);
        assert_eq!(live.poll(800.0).window_anchor, Some(1000.0));
    }

    #[test]
    fn rewind_forgets_beats() {
        let mut live = estimator(&[(0.0, 200.0)]);
        assert!(live.poll(0.0).onset);
        live.rewind();
        assert!(!live.claim_target(0.0));
        assert!(live.poll(0.0).onset);
    }

    fn tone(freq: f32, secs: f32) -> Arc<SampleBuffer> {
        let rate = 44100;
        let n = (secs * rate as f32) as usize;
        let samples = (0..n)
            .map(|i| (std::f32::consts::TAU * freq * i as f32 / rate as f32).sin())
            .collect();
        Arc::new(SampleBuffer::new(samples, rate))
    }

    #[test]
    fn playhead_tap_hears_bass_tone() {
        let config = LiveConfig::default();
        let mut tap = PlayheadTap::new(tone(60.0, 1.0), config.clone());
        let data = tap.frequency_data(500.0);
        assert_eq!(data.len(), config.fft_size / 2);
        let bass = data[..config.bass_bins].iter().sum::<f32>() / config.bass_bins as f32;
        assert!(bass > config.threshold * config.scale, "bass level {bass}");
    }

    #[test]
    fn playhead_tap_is_silent_at_track_start() {
        let mut tap = PlayheadTap::new(tone(60.0, 1.0), LiveConfig::default());
        assert!(tap.frequency_data(0.0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn playhead_tap_drives_live_estimator() {
        let config = LiveConfig::default();
        let tap = PlayheadTap::new(tone(60.0, 1.0), config.clone());
        let tolerance = HitTolerance {
            early_ms: 200.0,
            late_ms: 200.0,
        };
        let mut live = LiveEstimator::new(Box::new(tap), config, tolerance);
        let onsets = (1..=10)
            .filter(|i| live.poll(*i as f64 * 100.0).onset)
            .count();
        assert!(onsets >= 3, "only {onsets} live beats");
    }
}
