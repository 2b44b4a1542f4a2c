use thiserror::Error;

use crate::engine::SessionState;

/// Errors surfaced by decoding, analysis, session lifecycle and file I/O.
///
/// Judgment problems (wrong column, closed hit window) are never errors; they
/// resolve to a [`crate::engine::Judgment`] instead.
#[derive(Error, Debug)]
pub enum GameError {
    /// The track could not be opened, probed or decoded.
    #[error("failed to decode audio: {0}")]
    DecodeFailure(String),

    /// The spectral transform rejected its buffers.
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// A session was started before any beat source was loaded.
    #[error("no track loaded")]
    NoTrackLoaded,

    /// A lifecycle call arrived in a state that does not accept it.
    #[error("cannot {action} while {state:?}")]
    StateViolation {
        action: &'static str,
        state: SessionState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("RON encode error: {0}")]
    RonEncode(#[from] ron::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;
