use bevy::prelude::*;

#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameScreen {
    /// Decoding and analysing the track off the main thread.
    #[default]
    Loading,
    Ready,
    Playing,
    Paused,
    Results,
    Failed,
}

pub struct GameStatePlugin;

impl Plugin for GameStatePlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameScreen>();
    }
}
