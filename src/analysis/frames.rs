use std::ops::Index;

use realfft::RealFftPlanner;

use crate::config::AnalysisConfig;
use crate::samples::SampleBuffer;
use crate::schedule::BandTag;
use crate::{GameError, Result};

/// Summed spectral magnitude per band for one analysis window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandEnergies([f64; BandTag::COUNT]);

impl BandEnergies {
    pub fn from_fn(mut f: impl FnMut(BandTag) -> f64) -> Self {
        Self(BandTag::ALL.map(&mut f))
    }

    pub fn set(&mut self, band: BandTag, energy: f64) {
        self.0[band.index()] = energy;
    }
}

impl Index<BandTag> for BandEnergies {
    type Output = f64;

    fn index(&self, band: BandTag) -> &f64 {
        &self.0[band.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyFrame {
    /// Start of the window, in milliseconds from the start of the track.
    pub time_ms: f64,
    pub energies: BandEnergies,
}

/// Window/hop geometry derived from the sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub window: usize,
    pub hop: usize,
    pub fft_size: usize,
}

impl FrameLayout {
    pub fn new(config: &AnalysisConfig, sample_rate: u32) -> Self {
        let window = (config.window_ms / 1000.0 * sample_rate as f64).round() as usize;
        let hop = (window / 2).max(1);
        // Zero-pad into the configured size; grow it if the window would not fit.
        let fft_size = config.fft_size.max(window).max(2).next_power_of_two();
        Self {
            window,
            hop,
            fft_size,
        }
    }

    /// Milliseconds between consecutive frames.
    pub fn hop_ms(&self, sample_rate: u32) -> f64 {
        self.hop as f64 / sample_rate as f64 * 1000.0
    }
}

/// Split a buffer into half-overlapping Hann windows and sum FFT magnitudes
/// inside each configured band. Only windows that lie entirely inside the
/// buffer produce a frame.
pub fn extract_frames(buffer: &SampleBuffer, config: &AnalysisConfig) -> Result<Vec<EnergyFrame>> {
    let sample_rate = buffer.sample_rate();
    if sample_rate == 0 {
        return Ok(Vec::new());
    }
    let layout = FrameLayout::new(config, sample_rate);
    let samples = buffer.samples();
    if layout.window == 0 || samples.len() < layout.window {
        return Ok(Vec::new());
    }

    let window: Vec<f32> = hann(layout.window);

    // Bin ranges per band, [min_hz, max_hz).
    let bin_hz = sample_rate as f64 / layout.fft_size as f64;
    let num_bins = layout.fft_size / 2 + 1;
    let band_bins: Vec<(BandTag, std::ops::Range<usize>)> = config
        .bands
        .iter()
        .map(|band| {
            let hi = ((band.max_hz / bin_hz).ceil() as usize).min(num_bins);
            let lo = ((band.min_hz / bin_hz).ceil() as usize).min(hi);
            (band.tag, lo..hi)
        })
        .collect();

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(layout.fft_size);
    let mut input = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();
    let mut scratch = fft.make_scratch_vec();
    let mut magnitudes = vec![0.0f64; num_bins];

    let mut frames = Vec::with_capacity((samples.len() - layout.window) / layout.hop + 1);
    let mut pos = 0;

    while pos + layout.window <= samples.len() {
        input.fill(0.0);
        for (dst, (s, w)) in input
            .iter_mut()
            .zip(samples[pos..pos + layout.window].iter().zip(&window))
        {
            *dst = s * w;
        }

        fft.process_with_scratch(&mut input, &mut spectrum, &mut scratch)
            .map_err(|e| GameError::Analysis(e.to_string()))?;

        for (m, c) in magnitudes.iter_mut().zip(&spectrum) {
            *m = (c.re as f64).hypot(c.im as f64);
        }

        let mut energies = BandEnergies::default();
        for (tag, bins) in &band_bins {
            energies.set(*tag, magnitudes[bins.clone()].iter().sum());
        }

        frames.push(EnergyFrame {
            time_ms: pos as f64 / sample_rate as f64 * 1000.0,
            energies,
        });
        pos += layout.hop;
    }

    Ok(frames)
}

fn hann(len: usize) -> Vec<f32> {
    if len == 1 {
        return vec![1.0];
    }
    (0..len)
        .map(|i| 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / (len - 1) as f32).cos()))
        .collect()
}
