/// Decoded mono audio. Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Track length in milliseconds. Zero for an empty buffer or a zero rate.
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64 * 1000.0
    }

    /// Sample index at a playback time, clamped to the buffer.
    pub fn index_at_ms(&self, time_ms: f64) -> usize {
        let idx = (time_ms.max(0.0) / 1000.0 * self.sample_rate as f64) as usize;
        idx.min(self.samples.len())
    }
}
