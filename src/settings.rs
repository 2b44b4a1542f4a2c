use std::path::{Path, PathBuf};

use beattiles::config::Tuning;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::Cli;

pub struct SettingsPlugin;

impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        let settings = GameSettings::load();
        if GameSettings::config_path().is_some_and(|p| !p.exists()) {
            settings.save();
        }

        let tuning_path = app
            .world()
            .get_resource::<Cli>()
            .and_then(|cli| cli.tuning.clone())
            .or_else(|| config_dir().map(|d| d.join("tuning.ron")));
        let tuning = load_tuning(tuning_path.as_deref());

        app.insert_resource(settings).insert_resource(GameTuning(tuning));
    }
}

fn config_dir() -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "BeatTiles")?;
    Some(dirs.config_dir().to_path_buf())
}

/// Analysis, live-detection and engine tunables for this run.
#[derive(Resource, Debug, Clone)]
pub struct GameTuning(pub Tuning);

fn load_tuning(path: Option<&Path>) -> Tuning {
    let Some(path) = path else {
        info!("No config directory available, using default tuning");
        return Tuning::default();
    };
    if !path.exists() {
        info!("No tuning file at {:?}, using defaults", path);
        return Tuning::default();
    }
    match Tuning::load(path) {
        Ok(tuning) => tuning,
        Err(e) => {
            warn!("Failed to read tuning {:?}: {}, using defaults", path, e);
            Tuning::default()
        }
    }
}

#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub master_volume: f32,
    /// Positive when audio is heard late.
    pub audio_offset_ms: i32,
    pub fall_speed_scale: f32,
    /// Detect beats live even when a schedule could be built.
    pub prefer_live: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            master_volume: 80.0,
            audio_offset_ms: 0,
            fall_speed_scale: 1.0,
            prefer_live: false,
        }
    }
}

impl GameSettings {
    fn config_path() -> Option<PathBuf> {
        Some(config_dir()?.join("settings.json"))
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            info!("No config directory available, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings {:?}: {}, using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No settings file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            warn!("No config directory available, cannot save settings");
            return;
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create config directory {:?}: {}", parent, e);
                return;
            }
        }

        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!("Failed to write settings to {:?}: {}", path, e);
                } else {
                    info!("Saved settings to {:?}", path);
                }
            }
            Err(e) => {
                warn!("Failed to serialize settings: {}", e);
            }
        }
    }

    /// Master volume as a 0.0–1.0 amplitude.
    pub fn master_amplitude(&self) -> f64 {
        (self.master_volume as f64 / 100.0).clamp(0.0, 1.0)
    }
}
