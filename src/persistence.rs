//! Best-score persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::Result;

/// Holds the best score across sessions. Read once when the engine is built,
/// written whenever a running score beats it.
pub trait ScoreStore: Send + Sync {
    fn load_best(&self) -> u32;
    fn save_best(&mut self, best: u32) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BestScoreFile {
    best_score: u32,
}

/// `best_score.json` in the platform data directory.
#[derive(Debug, Clone)]
pub struct JsonScoreStore {
    path: Option<PathBuf>,
}

impl JsonScoreStore {
    pub fn new() -> Self {
        let path = directories::ProjectDirs::from("", "", "BeatTiles")
            .map(|dirs| dirs.data_dir().join("best_score.json"));
        Self { path }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Default for JsonScoreStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreStore for JsonScoreStore {
    fn load_best(&self) -> u32 {
        let Some(path) = &self.path else {
            info!("No data directory available, best score starts at 0");
            return 0;
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<BestScoreFile>(&contents) {
                Ok(file) => {
                    info!("Loaded best score {} from {:?}", file.best_score, path);
                    file.best_score
                }
                Err(e) => {
                    warn!("Failed to parse best score {:?}: {}, starting at 0", path, e);
                    0
                }
            },
            Err(_) => {
                info!("No best score file found, starting at 0");
                0
            }
        }
    }

    fn save_best(&mut self, best: u32) -> Result<()> {
        let Some(path) = &self.path else {
            warn!("No data directory available, cannot save best score");
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&BestScoreFile { best_score: best })?;
        std::fs::write(path, json)?;
        info!("Saved best score {} to {:?}", best, path);
        Ok(())
    }
}

/// In-memory store for headless sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryScoreStore {
    best: u32,
    writes: usize,
}

impl MemoryScoreStore {
    pub fn new(best: u32) -> Self {
        Self { best, writes: 0 }
    }

    pub fn best(&self) -> u32 {
        self.best
    }

    /// How many times a new best was written.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ScoreStore for MemoryScoreStore {
    fn load_best(&self) -> u32 {
        self.best
    }

    fn save_best(&mut self, best: u32) -> Result<()> {
        self.best = best;
        self.writes += 1;
        Ok(())
    }
}
