//! Offline beat analysis: samples → energy frames → beat schedule.

pub mod frames;
pub mod onset;

use tracing::info;

use crate::Result;
use crate::config::AnalysisConfig;
use crate::samples::SampleBuffer;
use crate::schedule::{BandTag, BeatSchedule};

pub use frames::{BandEnergies, EnergyFrame, FrameLayout, extract_frames};
pub use onset::detect_beats;

/// Run the full pipeline over a decoded track.
///
/// Empty or too-short buffers produce an empty schedule rather than an error.
pub fn analyze(buffer: &SampleBuffer, config: &AnalysisConfig) -> Result<BeatSchedule> {
    let frames = extract_frames(buffer, config)?;
    let events = detect_beats(&frames, config);

    let schedule = BeatSchedule::new(events, buffer.duration_ms());
    info!(
        "Analysed {:.1}s: {} frames, {} beats (bass {}, mid-low {}, mid {}, high {})",
        buffer.duration_ms() / 1000.0,
        frames.len(),
        schedule.len(),
        schedule.count_for(BandTag::Bass),
        schedule.count_for(BandTag::MidLow),
        schedule.count_for(BandTag::Mid),
        schedule.count_for(BandTag::High),
    );
    Ok(schedule)
}
