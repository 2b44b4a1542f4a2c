use tracing::debug;

use super::frames::EnergyFrame;
use crate::config::{AnalysisConfig, BandConfig};
use crate::schedule::BeatEvent;

/// Detect beats band by band, in priority order, then merge.
///
/// Each band is thresholded against its own local neighbourhood and its
/// global mean. A band never fires within the merge window of a beat already
/// accepted for a higher-priority band. The merged list is then filtered by
/// per-band strength floors and a minimum spacing that keeps the stronger of
/// two close events.
pub fn detect_beats(frames: &[EnergyFrame], config: &AnalysisConfig) -> Vec<BeatEvent> {
    let mut accepted: Vec<BeatEvent> = Vec::new();

    for band in &config.bands {
        let mut claimed: Vec<f64> = accepted.iter().map(|e| e.time_ms).collect();
        claimed.sort_by(f64::total_cmp);

        let found = detect_band(frames, band, config, &claimed);
        debug!("{} band: {} candidates", band.tag.label(), found.len());
        accepted.extend(found);
    }

    finalize(accepted, config)
}

/// Per-band statistics used for the global ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl BandStats {
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std_dev: variance.sqrt(),
        })
    }

    /// Constant (or silent) bands carry no onsets.
    pub fn is_degenerate(&self) -> bool {
        self.std_dev <= f64::EPSILON * self.mean.abs().max(1.0) || self.mean <= 0.0
    }
}

fn detect_band(
    frames: &[EnergyFrame],
    band: &BandConfig,
    config: &AnalysisConfig,
    claimed: &[f64],
) -> Vec<BeatEvent> {
    let energies: Vec<f64> = frames.iter().map(|f| f.energies[band.tag]).collect();
    let (lookback, lookahead) = (config.lookback.max(1), config.lookahead.max(1));
    let n = energies.len();
    if n < lookback + lookahead + 1 {
        return Vec::new();
    }

    let Some(stats) = BandStats::of(&energies) else {
        return Vec::new();
    };
    if stats.is_degenerate() {
        debug!("{} band has no variance, skipping", band.tag.label());
        return Vec::new();
    }

    let span = (lookback + lookahead + 1) as f64;
    let mut events = Vec::new();
    let mut last_ms: Option<f64> = None;

    for i in lookback..n - lookahead {
        let energy = energies[i];

        let is_peak = energy > energies[i - 1] * config.peak_margin
            && energy > energies[i + 1] * config.peak_margin;
        if !is_peak {
            continue;
        }

        let local_avg = energies[i - lookback..=i + lookahead].iter().sum::<f64>() / span;
        if local_avg <= 0.0 {
            continue;
        }
        let local_ratio = energy / local_avg;
        if local_ratio <= band.local_threshold {
            continue;
        }

        let global_ratio = energy / stats.mean;
        if global_ratio <= band.global_threshold {
            continue;
        }

        let time_ms = frames[i].time_ms;
        if last_ms.is_some_and(|last| time_ms - last < config.min_interval_ms) {
            continue;
        }
        if within(claimed, time_ms, config.merge_window_ms) {
            continue;
        }

        events.push(BeatEvent {
            time_ms,
            band: band.tag,
            strength: local_ratio * global_ratio,
        });
        last_ms = Some(time_ms);
    }

    events
}

/// True if any sorted `times` lies strictly closer than `window` to `t`.
fn within(times: &[f64], t: f64, window: f64) -> bool {
    let start = times.partition_point(|&x| x <= t - window);
    times.get(start).is_some_and(|&x| x < t + window)
}

fn finalize(mut events: Vec<BeatEvent>, config: &AnalysisConfig) -> Vec<BeatEvent> {
    events.sort_by(|a, b| {
        a.time_ms
            .total_cmp(&b.time_ms)
            .then(config.priority(a.band).cmp(&config.priority(b.band)))
    });

    let floor = |e: &BeatEvent| config.band(e.band).map_or(0.0, |b| b.min_strength);

    let mut kept: Vec<BeatEvent> = Vec::with_capacity(events.len());
    for event in events.into_iter().filter(|e| e.strength >= floor(e)) {
        match kept.last_mut() {
            Some(prev) if event.time_ms - prev.time_ms < config.min_spacing_ms => {
                if event.strength > prev.strength {
                    *prev = event;
                }
            }
            _ => kept.push(event),
        }
    }
    kept
}
