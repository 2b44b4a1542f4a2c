use beattiles::clock::{AudioClock, SmoothedClock};
use beattiles::engine::{Judgment, LaneInput, LaneSnapshot, SessionState, TimingEngine};
use beattiles::persistence::JsonScoreStore;
use beattiles::sink::RenderSink;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use leafwing_input_manager::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::action::GameAction;
use crate::audio::{self, KiraContext};
use crate::settings::{GameSettings, GameTuning};
use crate::state::GameScreen;
use crate::{Cli, GameSet};

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<StrikeResult>()
            .init_resource::<LaneView>()
            .add_systems(PreStartup, setup_session)
            .add_systems(
                Update,
                start_on_confirm.run_if(in_state(GameScreen::Ready)),
            )
            .add_systems(
                Update,
                sample_playhead
                    .in_set(GameSet::UpdateClock)
                    .run_if(in_state(GameScreen::Playing)),
            )
            .add_systems(
                Update,
                (read_lane_keys, read_pointer, detect_pause)
                    .in_set(GameSet::ReadInput)
                    .run_if(in_state(GameScreen::Playing)),
            )
            .add_systems(Update, tick_session.in_set(GameSet::Tick))
            .add_systems(OnEnter(GameScreen::Paused), pause_session)
            .add_systems(
                Update,
                handle_pause_input.run_if(in_state(GameScreen::Paused)),
            )
            .add_systems(OnExit(GameScreen::Paused), resume_session)
            .add_systems(
                Update,
                dismiss_results.run_if(in_state(GameScreen::Results)),
            )
            .add_systems(
                Update,
                handle_failure_input.run_if(in_state(GameScreen::Failed)),
            );
    }
}

#[derive(Resource)]
pub struct Session {
    pub engine: TimingEngine,
}

/// Audio playhead smoothed against frame time.
#[derive(Resource)]
pub struct PlayheadClock(pub SmoothedClock);

/// Latest frame from the engine, for rendering and the HUD.
#[derive(Resource, Default)]
pub struct LaneView(pub Option<LaneSnapshot>);

impl RenderSink for LaneView {
    fn present(&mut self, frame: &LaneSnapshot) {
        self.0 = Some(frame.clone());
    }
}

#[derive(Message, Debug, Clone, Copy)]
pub struct StrikeResult {
    pub column: usize,
    pub judgment: Judgment,
}

fn setup_session(
    mut commands: Commands,
    cli: Res<Cli>,
    settings: Res<GameSettings>,
    tuning: Res<GameTuning>,
) {
    let mut config = tuning.0.engine.clone();
    config.fall_speed *= settings.fall_speed_scale.max(0.1);

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let store = JsonScoreStore::new();
    match store.path() {
        Some(path) => info!("Best score kept in {:?}", path),
        None => warn!("No data directory available, best score will not be kept"),
    }
    let engine = TimingEngine::new(config, Box::new(store), rng);

    commands.insert_resource(Session { engine });
    commands.insert_resource(PlayheadClock(SmoothedClock::new(
        settings.audio_offset_ms as f64,
    )));
}

fn start_on_confirm(
    action: Res<ActionState<GameAction>>,
    time: Res<Time<Real>>,
    settings: Res<GameSettings>,
    mut session: ResMut<Session>,
    mut clock: ResMut<PlayheadClock>,
    mut ctx: NonSendMut<KiraContext>,
    mut next_state: ResMut<NextState<GameScreen>>,
) {
    if !action.just_pressed(&GameAction::Confirm) {
        return;
    }

    if let Err(e) = audio::play_song(&mut ctx, settings.master_amplitude()) {
        session.engine.fail(e);
        next_state.set(GameScreen::Failed);
        return;
    }
    clock.0.reset();
    clock.0.resync(time.elapsed_secs_f64(), 0.0);

    match session.engine.start(&clock.0) {
        Ok(()) => next_state.set(GameScreen::Playing),
        Err(e) => {
            audio::stop_song(&mut ctx);
            session.engine.fail(e.to_string());
            next_state.set(GameScreen::Failed);
        }
    }
}

fn sample_playhead(
    time: Res<Time<Real>>,
    ctx: NonSend<KiraContext>,
    mut clock: ResMut<PlayheadClock>,
) {
    if let Some((position_ms, finished)) = audio::playhead(&ctx) {
        clock.0.observe(time.elapsed_secs_f64(), position_ms, finished);
    }
}

fn read_lane_keys(
    action: Res<ActionState<GameAction>>,
    mut session: ResMut<Session>,
    mut results: MessageWriter<StrikeResult>,
) {
    for (column, lane) in GameAction::LANES.iter().enumerate() {
        if action.just_pressed(lane) {
            let judgment = session.engine.judge(LaneInput::Column(column));
            results.write(StrikeResult { column, judgment });
        }
    }
}

fn read_pointer(
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    camera_q: Query<(&Camera, &GlobalTransform)>,
    mut session: ResMut<Session>,
    mut results: MessageWriter<StrikeResult>,
) {
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }
    let Ok(window) = windows.single() else { return };
    let Ok((camera, camera_transform)) = camera_q.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok(world) = camera.viewport_to_world_2d(camera_transform, cursor) else {
        return;
    };

    let config = session.engine.config();
    let x = world.x + config.field_width / 2.0;
    let y = config.field_height / 2.0 - world.y;
    let judgment = session.engine.judge(LaneInput::Pointer { x, y });
    if judgment != Judgment::Ignored {
        let column = (x / session.engine.config().tile_width()) as usize;
        results.write(StrikeResult { column, judgment });
    }
}

fn detect_pause(
    action: Res<ActionState<GameAction>>,
    mut next_state: ResMut<NextState<GameScreen>>,
) {
    if action.just_pressed(&GameAction::Back) {
        info!("Pausing game");
        next_state.set(GameScreen::Paused);
    }
}

fn tick_session(
    mut session: ResMut<Session>,
    clock: Res<PlayheadClock>,
    mut view: ResMut<LaneView>,
    mut ctx: NonSendMut<KiraContext>,
    state: Res<State<GameScreen>>,
    mut next_state: ResMut<NextState<GameScreen>>,
) {
    session.engine.tick(&clock.0, &mut *view);

    if *state.get() == GameScreen::Playing && session.engine.state() == SessionState::Ended {
        audio::stop_song(&mut ctx);
        next_state.set(GameScreen::Results);
    }
}

fn pause_session(
    mut session: ResMut<Session>,
    clock: Res<PlayheadClock>,
    mut ctx: NonSendMut<KiraContext>,
) {
    audio::pause_song(&mut ctx);
    if let Err(e) = session.engine.pause(&clock.0) {
        warn!("{}", e);
    }
}

fn handle_pause_input(
    action: Res<ActionState<GameAction>>,
    mut next_state: ResMut<NextState<GameScreen>>,
) {
    if action.just_pressed(&GameAction::Back) || action.just_pressed(&GameAction::Confirm) {
        info!("Resuming game");
        next_state.set(GameScreen::Playing);
    }
}

fn resume_session(
    time: Res<Time<Real>>,
    mut session: ResMut<Session>,
    mut clock: ResMut<PlayheadClock>,
    mut ctx: NonSendMut<KiraContext>,
) {
    if session.engine.state() != SessionState::Paused {
        return;
    }
    audio::resume_song(&mut ctx);
    // The playhead stood still while paused; re-anchor on it.
    if let Some((position_ms, _)) = audio::playhead(&ctx) {
        clock.0.resync(time.elapsed_secs_f64(), position_ms);
    }
    if let Err(e) = session.engine.resume(&clock.0) {
        warn!("{}", e);
    }
}

fn dismiss_results(
    action: Res<ActionState<GameAction>>,
    mut session: ResMut<Session>,
    mut view: ResMut<LaneView>,
    mut exit: MessageWriter<AppExit>,
    mut next_state: ResMut<NextState<GameScreen>>,
) {
    if action.just_pressed(&GameAction::Confirm) {
        info!("Replaying track");
        session.engine.reset();
        view.0 = Some(session.engine.snapshot());
        next_state.set(GameScreen::Ready);
    } else if action.just_pressed(&GameAction::Back) {
        exit.write(AppExit::Success);
    }
}

fn handle_failure_input(
    action: Res<ActionState<GameAction>>,
    mut exit: MessageWriter<AppExit>,
    mut next_state: ResMut<NextState<GameScreen>>,
) {
    if action.just_pressed(&GameAction::Confirm) {
        info!("Retrying track");
        next_state.set(GameScreen::Loading);
    } else if action.just_pressed(&GameAction::Back) {
        exit.write(AppExit::Success);
    }
}

/// Playback time shown by the HUD.
pub fn playback_seconds(clock: &PlayheadClock) -> f64 {
    clock.0.now_ms().max(0.0) / 1000.0
}
