//! The rhythm timing engine.
//!
//! A single-owner state machine advanced by [`TimingEngine::tick`]. It spawns
//! rows as the beat source grants targets, moves them at a beat-driven speed,
//! keeps one global hit window and judges strikes against it. Time always
//! comes from an injected [`AudioClock`] minus the time spent paused.

mod judgment;
mod lanes;
pub mod speed;

use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

pub use judgment::{Judgment, LaneInput, MissReason};
pub use lanes::{LaneSnapshot, Lanes, Row, Tile};

use crate::beat_source::BeatSource;
use crate::clock::AudioClock;
use crate::config::EngineConfig;
use crate::persistence::ScoreStore;
use crate::sink::RenderSink;
use crate::{GameError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Playing,
    Paused,
    Ended,
    Failed,
}

pub struct TimingEngine {
    config: EngineConfig,
    state: SessionState,
    source: Option<Box<dyn BeatSource>>,
    lanes: Lanes,
    rng: StdRng,
    store: Box<dyn ScoreStore>,

    score: u32,
    best_score: u32,
    misses: u32,
    dropped: u32,

    /// Clock time spent paused, subtracted from every reading.
    paused_ms: f64,
    paused_at: Option<f64>,
    playback_ms: f64,

    window_anchor: Option<f64>,
    /// Beat whose hit has already been credited.
    credited_anchor: Option<f64>,
    speed: f32,
    beat_progress: f32,
    failure: Option<String>,
}

impl TimingEngine {
    /// The best score is read from `store` here and nowhere else.
    pub fn new(config: EngineConfig, store: Box<dyn ScoreStore>, rng: StdRng) -> Self {
        let best_score = store.load_best();
        let speed = config.fall_speed;
        Self {
            config,
            state: SessionState::Idle,
            source: None,
            lanes: Lanes::default(),
            rng,
            store,
            score: 0,
            best_score,
            misses: 0,
            dropped: 0,
            paused_ms: 0.0,
            paused_at: None,
            playback_ms: 0.0,
            window_anchor: None,
            credited_anchor: None,
            speed,
            beat_progress: 1.0,
            failure: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn window_active(&self) -> bool {
        self.window_anchor
            .is_some_and(|anchor| self.credited_anchor != Some(anchor))
    }

    /// Install the beat source for the next session, replacing any previous
    /// one. Not allowed mid-session.
    pub fn load(&mut self, source: Box<dyn BeatSource>) -> Result<()> {
        if matches!(self.state, SessionState::Playing | SessionState::Paused) {
            return Err(self.violation("load a track"));
        }
        info!("Loaded {:?} beat source", source.kind());
        self.source = Some(source);
        self.failure = None;
        self.clear_session();
        self.set_state(SessionState::Idle);
        Ok(())
    }

    /// Enter the Failed state, e.g. after a decode or analysis error.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Session failed: {}", reason);
        self.failure = Some(reason);
        self.set_state(SessionState::Failed);
    }

    pub fn start(&mut self, clock: &dyn AudioClock) -> Result<()> {
        if self.source.is_none() {
            return Err(GameError::NoTrackLoaded);
        }
        if self.state != SessionState::Idle {
            return Err(self.violation("start"));
        }

        self.clear_session();
        self.playback_ms = clock.now_ms();
        self.spawn_rows();
        self.set_state(SessionState::Playing);
        Ok(())
    }

    pub fn pause(&mut self, clock: &dyn AudioClock) -> Result<()> {
        if self.state != SessionState::Playing {
            return Err(self.violation("pause"));
        }
        self.paused_at = Some(clock.now_ms());
        self.set_state(SessionState::Paused);
        Ok(())
    }

    pub fn resume(&mut self, clock: &dyn AudioClock) -> Result<()> {
        if self.state != SessionState::Paused {
            return Err(self.violation("resume"));
        }
        if let Some(at) = self.paused_at.take() {
            self.paused_ms += (clock.now_ms() - at).max(0.0);
        }
        self.set_state(SessionState::Playing);
        Ok(())
    }

    /// Return to Idle with the same source, ready for another `start`.
    pub fn reset(&mut self) {
        self.clear_session();
        if self.source.is_some() {
            self.failure = None;
            self.set_state(SessionState::Idle);
        }
    }

    /// Advance one frame and hand the result to `sink`.
    pub fn tick(&mut self, clock: &dyn AudioClock, sink: &mut dyn RenderSink) {
        if self.state == SessionState::Playing {
            if clock.finished() {
                self.end();
            } else {
                self.advance(clock.now_ms() - self.paused_ms);
            }
        }
        sink.present(&self.snapshot());
    }

    fn advance(&mut self, now_ms: f64) {
        let now_ms = now_ms.max(self.playback_ms);
        let dt_ms = now_ms - self.playback_ms;
        self.playback_ms = now_ms;

        let Some(source) = self.source.as_mut() else {
            return;
        };
        let pulse = source.poll(now_ms);
        if pulse.onset {
            debug!("Beat at {:.0}ms", now_ms);
        }

        let rest = self.config.fall_speed;
        self.beat_progress =
            speed::beat_progress(now_ms, pulse.last_beat_ms, self.config.pulse_ms);
        self.speed = match pulse.last_beat_ms {
            Some(_) => speed::ease_speed(rest * self.config.beat_boost, rest, self.beat_progress),
            None => rest,
        };
        let step = self.speed * speed::sway(self.beat_progress, self.config.beat_sway);
        self.lanes.advance(step * (dt_ms / 1000.0) as f32);

        self.spawn_rows();
        self.dropped += self.lanes.discard_below(self.config.field_height);
        self.window_anchor = pulse.window_anchor;
    }

    /// Keep the field filled from the top: spawn while the head row has
    /// fully entered.
    fn spawn_rows(&mut self) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        let lane_count = self.config.lane_count.max(1);
        while self.lanes.head_y().is_none_or(|y| y >= 0.0) {
            let target = source
                .claim_target(self.playback_ms)
                .then(|| self.rng.random_range(0..lane_count));
            let row = self.lanes.spawn(self.config.tile_height, target);
            debug!("Spawned row {} at y={:.1} target={:?}", row.id, row.y, row.target);
        }
    }

    fn end(&mut self) {
        info!(
            "Session ended: score {}, best {}, misses {}, dropped {}",
            self.score, self.best_score, self.misses, self.dropped
        );
        self.window_anchor = None;
        self.set_state(SessionState::Ended);
    }

    /// Judge one strike. Never fails: every outcome is a [`Judgment`].
    pub fn judge(&mut self, input: LaneInput) -> Judgment {
        if self.state != SessionState::Playing {
            return Judgment::Rejected;
        }

        let lane_count = self.config.lane_count;
        let column = match input {
            LaneInput::Column(column) => column,
            LaneInput::Pointer { x, .. } => {
                if !(0.0..self.config.field_width).contains(&x) {
                    return Judgment::Ignored;
                }
                (x / self.config.tile_width()) as usize
            }
        };
        if column >= lane_count {
            return Judgment::Ignored;
        }

        let judgment = self.resolve(input, column);
        match judgment {
            Judgment::Hit { .. } => self.record_hit(),
            Judgment::Miss(reason) => {
                self.misses += 1;
                debug!("Miss on column {}: {:?}", column, reason);
            }
            Judgment::Ignored | Judgment::Rejected => {}
        }
        judgment
    }

    fn resolve(&mut self, input: LaneInput, column: usize) -> Judgment {
        if !self.window_active() {
            return Judgment::Miss(MissReason::WindowClosed);
        }

        let (top, bottom) = (self.config.strike_top, self.config.strike_bottom);
        let tile_height = self.config.tile_height;
        let Some(row) = self.lanes.lowest_target_mut(column) else {
            return Judgment::Miss(MissReason::NoTarget);
        };

        let in_zone = match input {
            LaneInput::Column(_) => row.y > top && row.y < bottom,
            LaneInput::Pointer { y, .. } => (y - (row.y + tile_height / 2.0)).abs() < tile_height / 2.0,
        };
        if !in_zone {
            return Judgment::Miss(MissReason::OutOfZone);
        }

        row.target = None;
        self.credited_anchor = self.window_anchor;
        self.score += 1;
        Judgment::Hit {
            column,
            score: self.score,
        }
    }

    fn record_hit(&mut self) {
        debug!("Hit, score {}", self.score);
        if self.score > self.best_score {
            self.best_score = self.score;
            if let Err(e) = self.store.save_best(self.best_score) {
                warn!("Failed to save best score: {}", e);
            }
        }
    }

    pub fn snapshot(&self) -> LaneSnapshot {
        LaneSnapshot {
            state: self.state,
            rows: self.lanes.rows().iter().cloned().collect(),
            lane_count: self.config.lane_count,
            tile_width: self.config.tile_width(),
            tile_height: self.config.tile_height,
            field_height: self.config.field_height,
            window_active: self.state == SessionState::Playing && self.window_active(),
            score: self.score,
            best_score: self.best_score,
            misses: self.misses,
            dropped: self.dropped,
            speed: self.speed,
            beat_progress: self.beat_progress,
            playback_ms: self.playback_ms,
            failure: self.failure.clone(),
        }
    }

    fn clear_session(&mut self) {
        self.lanes.clear();
        if let Some(source) = self.source.as_mut() {
            source.rewind();
        }
        self.score = 0;
        self.misses = 0;
        self.dropped = 0;
        self.paused_ms = 0.0;
        self.paused_at = None;
        self.playback_ms = 0.0;
        self.window_anchor = None;
        self.credited_anchor = None;
        self.speed = self.config.fall_speed;
        self.beat_progress = 1.0;
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            info!("Session {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn violation(&self, action: &'static str) -> GameError {
        GameError::StateViolation {
            action,
            state: self.state,
        }
    }
}
