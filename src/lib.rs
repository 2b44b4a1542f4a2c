//! Headless core of Beat Tiles: beat analysis and the rhythm timing engine.
//!
//! Audio flows through [`analysis`] into a [`schedule::BeatSchedule`], which a
//! [`beat_source::BeatSource`] feeds to the [`engine::TimingEngine`]. Rendering,
//! clocks and persistence are injected through small traits so the engine runs
//! without a window or an audio device.

pub mod analysis;
pub mod beat_source;
pub mod clock;
pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod samples;
pub mod schedule;
pub mod sink;

pub use error::{GameError, Result};
