//! Tunables for analysis, live detection and the lane engine.
//!
//! Every field has a fixed default so a partial `tuning.ron` only overrides
//! what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::Result;
use crate::schedule::BandTag;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub analysis: AnalysisConfig,
    pub live: LiveConfig,
    pub engine: EngineConfig,
}

impl Tuning {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let tuning = ron::from_str(&contents)?;
        info!("Loaded tuning from {:?}", path);
        Ok(tuning)
    }
}

/// One analysed band. Order inside [`AnalysisConfig::bands`] is priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    pub tag: BandTag,
    /// Inclusive lower edge in Hz.
    pub min_hz: f64,
    /// Exclusive upper edge in Hz.
    pub max_hz: f64,
    /// Required `energy / local_average`.
    pub local_threshold: f64,
    /// Required `energy / global_mean`.
    pub global_threshold: f64,
    /// Minimum `local_ratio * global_ratio` kept in the final pass.
    pub min_strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub window_ms: f64,
    pub fft_size: usize,
    pub lookback: usize,
    pub lookahead: usize,
    pub peak_margin: f64,
    pub min_interval_ms: f64,
    pub merge_window_ms: f64,
    pub min_spacing_ms: f64,
    pub bands: Vec<BandConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_ms: 50.0,
            fft_size: 4096,
            lookback: 8,
            lookahead: 8,
            peak_margin: 1.2,
            min_interval_ms: 300.0,
            merge_window_ms: 150.0,
            min_spacing_ms: 200.0,
            bands: vec![
                BandConfig {
                    tag: BandTag::Bass,
                    min_hz: 35.0,
                    max_hz: 100.0,
                    local_threshold: 1.3,
                    global_threshold: 1.2,
                    min_strength: 1.6,
                },
                BandConfig {
                    tag: BandTag::MidLow,
                    min_hz: 100.0,
                    max_hz: 300.0,
                    local_threshold: 1.35,
                    global_threshold: 1.3,
                    min_strength: 2.0,
                },
                BandConfig {
                    tag: BandTag::Mid,
                    min_hz: 300.0,
                    max_hz: 1500.0,
                    local_threshold: 1.4,
                    global_threshold: 1.4,
                    min_strength: 2.4,
                },
                BandConfig {
                    tag: BandTag::High,
                    min_hz: 1500.0,
                    max_hz: 4000.0,
                    local_threshold: 1.5,
                    global_threshold: 1.5,
                    min_strength: 2.8,
                },
            ],
        }
    }
}

impl AnalysisConfig {
    pub fn band(&self, tag: BandTag) -> Option<&BandConfig> {
        self.bands.iter().find(|b| b.tag == tag)
    }

    /// Position of a band in priority order; unknown bands sort last.
    pub fn priority(&self, tag: BandTag) -> usize {
        self.bands
            .iter()
            .position(|b| b.tag == tag)
            .unwrap_or(self.bands.len())
    }
}

/// Live single-band estimator, modelled on a browser analyser node that
/// reports a byte-scaled spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub fft_size: usize,
    /// Leading bins averaged into the bass energy.
    pub bass_bins: usize,
    pub threshold: f32,
    /// Full-scale value of a spectrum bin.
    pub scale: f32,
    pub min_interval_ms: f64,
    /// Exponential smoothing between successive spectra, 0..1.
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            bass_bins: 10,
            threshold: 0.15,
            scale: 255.0,
            min_interval_ms: 250.0,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub lane_count: usize,
    pub field_width: f32,
    pub field_height: f32,
    pub tile_height: f32,
    /// Resting fall speed in pixels per second.
    pub fall_speed: f32,
    /// Speed multiplier applied right after a beat.
    pub beat_boost: f32,
    /// Amplitude of the sinusoidal speed sway between beats.
    pub beat_sway: f32,
    /// Duration over which a beat's surge decays back to rest.
    pub pulse_ms: f64,
    pub lookahead_ms: f64,
    pub early_tolerance_ms: f64,
    pub late_tolerance_ms: f64,
    /// A keyed hit needs the tile's top edge strictly inside this range.
    pub strike_top: f32,
    pub strike_bottom: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lane_count: 4,
            field_width: 400.0,
            field_height: 600.0,
            tile_height: 120.0,
            fall_speed: 60.0,
            beat_boost: 2.5,
            beat_sway: 0.2,
            pulse_ms: 250.0,
            lookahead_ms: 1000.0,
            early_tolerance_ms: 200.0,
            late_tolerance_ms: 200.0,
            strike_top: 0.0,
            strike_bottom: 600.0,
        }
    }
}

impl EngineConfig {
    pub fn tile_width(&self) -> f32 {
        self.field_width / self.lane_count.max(1) as f32
    }

    pub fn tolerance(&self) -> HitTolerance {
        HitTolerance {
            early_ms: self.early_tolerance_ms,
            late_ms: self.late_tolerance_ms,
        }
    }
}

/// Asymmetric timing tolerance around a beat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTolerance {
    pub early_ms: f64,
    pub late_ms: f64,
}

impl HitTolerance {
    /// `until_beat_ms` is `beat - now`: positive before the beat.
    pub fn contains(&self, until_beat_ms: f64) -> bool {
        (-self.late_ms..=self.early_ms).contains(&until_beat_ms)
    }
}
