//! Where the engine learns about beats.
//!
//! The timing engine only ever talks to [`BeatSource`]. A track either has a
//! precomputed schedule ([`PrecomputedSchedule`]) or falls back to sampling
//! the live spectrum at the playhead ([`LiveEstimator`]).

mod live;
mod precomputed;

pub use live::{LiveEstimator, PlayheadTap, SpectrumTap};
pub use precomputed::PrecomputedSchedule;

/// What a source reports for one engine tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeatPulse {
    /// A beat landed since the previous poll.
    pub onset: bool,
    /// Most recent beat at or before the polled time.
    pub last_beat_ms: Option<f64>,
    /// Beat the hit window is anchored to, when one is within tolerance.
    pub window_anchor: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Precomputed,
    Live,
}

pub trait BeatSource: Send + Sync {
    /// Observe playback time `now_ms`. Called once per tick, with
    /// non-decreasing times.
    fn poll(&mut self, now_ms: f64) -> BeatPulse;

    /// Whether a row spawning at `now_ms` should carry a target. A beat that
    /// grants a target is consumed.
    fn claim_target(&mut self, now_ms: f64) -> bool;

    /// Return to the start of the track for a fresh session.
    fn rewind(&mut self);

    fn kind(&self) -> SourceKind;
}
