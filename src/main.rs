mod action;
mod audio;
mod hud;
mod loading;
mod overlay;
mod render;
mod session;
mod settings;
mod state;

use std::path::PathBuf;

use bevy::prelude::*;
use clap::Parser;

use action::ActionPlugin;
use audio::KiraPlugin;
use hud::HudPlugin;
use loading::LoadingPlugin;
use overlay::OverlayPlugin;
use render::RenderPlugin;
use session::SessionPlugin;
use settings::SettingsPlugin;
use state::GameStatePlugin;

/// Falling-tile rhythm game driven by the beats of your own track.
#[derive(Parser, Resource, Debug, Clone)]
#[command(name = "beattiles")]
pub struct Cli {
    /// Audio file to play (WAV, MP3, FLAC, OGG)
    pub audio: PathBuf,

    /// Detect beats live at the playhead instead of analysing up front
    #[arg(long)]
    pub live: bool,

    /// Tuning file (RON); defaults to tuning.ron in the config directory
    #[arg(long)]
    pub tuning: Option<PathBuf>,

    /// Seed for target lane selection
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
enum GameSet {
    UpdateClock,
    ReadInput,
    Tick,
    Render,
}

fn main() {
    let cli = Cli::parse();

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Beat Tiles".into(),
                resolution: (400, 600).into(),
                resizable: false,
                ..default()
            }),
            ..default()
        }))
        .insert_resource(cli)
        .configure_sets(
            Update,
            (
                GameSet::UpdateClock,
                GameSet::ReadInput,
                GameSet::Tick,
                GameSet::Render,
            )
                .chain(),
        )
        .add_systems(Startup, spawn_camera)
        .add_plugins((
            KiraPlugin,
            ActionPlugin,
            GameStatePlugin,
            SettingsPlugin,
            LoadingPlugin,
            SessionPlugin,
            RenderPlugin,
            HudPlugin,
            OverlayPlugin,
        ))
        .run();
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}
