use std::path::{Path, PathBuf};
use std::sync::Arc;

use beattiles::GameError;
use beattiles::analysis::analyze;
use beattiles::beat_source::{BeatSource, LiveEstimator, PlayheadTap, PrecomputedSchedule};
use beattiles::config::Tuning;
use beattiles::decode::decode_file;
use beattiles::schedule::BeatSchedule;
use bevy::prelude::*;
use crossbeam_channel::{Receiver, TryRecvError};
use kira::sound::static_sound::StaticSoundData;

use crate::Cli;
use crate::audio::KiraContext;
use crate::session::Session;
use crate::settings::{GameSettings, GameTuning};
use crate::state::GameScreen;

pub struct LoadingPlugin;

impl Plugin for LoadingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameScreen::Loading), begin_loading)
            .add_systems(
                Update,
                poll_loading.run_if(in_state(GameScreen::Loading)),
            );
    }
}

/// Everything the worker hands back for one track.
struct LoadedTrack {
    source: Box<dyn BeatSource>,
    sound: StaticSoundData,
}

#[derive(Resource)]
struct LoadingJob {
    rx: Receiver<beattiles::Result<LoadedTrack>>,
}

fn begin_loading(
    mut commands: Commands,
    cli: Res<Cli>,
    settings: Res<GameSettings>,
    tuning: Res<GameTuning>,
) {
    let path = cli.audio.clone();
    let tuning = tuning.0.clone();
    let live = cli.live || settings.prefer_live;
    let (tx, rx) = crossbeam_channel::bounded(1);

    info!("Loading {:?} ({} beats)", path, if live { "live" } else { "scheduled" });
    std::thread::spawn(move || {
        let _ = tx.send(load_track(&path, &tuning, live));
    });
    commands.insert_resource(LoadingJob { rx });
}

fn load_track(path: &Path, tuning: &Tuning, live: bool) -> beattiles::Result<LoadedTrack> {
    let buffer = Arc::new(decode_file(path)?);
    let sound = StaticSoundData::from_file(path)
        .map_err(|e| GameError::DecodeFailure(e.to_string()))?;

    let tolerance = tuning.engine.tolerance();
    let source: Box<dyn BeatSource> = if live {
        let tap = PlayheadTap::new(buffer, tuning.live.clone());
        Box::new(LiveEstimator::new(Box::new(tap), tuning.live.clone(), tolerance))
    } else {
        let schedule = schedule_for(path, &buffer, tuning)?;
        Box::new(PrecomputedSchedule::new(
            schedule,
            tolerance,
            tuning.engine.lookahead_ms,
        ))
    };

    Ok(LoadedTrack { source, sound })
}

/// Prefer a `.beats.ron` sidecar; analyse when there is none or it is unreadable.
fn schedule_for(
    path: &Path,
    buffer: &beattiles::samples::SampleBuffer,
    tuning: &Tuning,
) -> beattiles::Result<BeatSchedule> {
    let sidecar: PathBuf = BeatSchedule::sidecar_path(path);
    if sidecar.exists() {
        match BeatSchedule::load(&sidecar) {
            Ok(schedule) => return Ok(schedule),
            Err(e) => warn!("Ignoring unreadable schedule {:?}: {}", sidecar, e),
        }
    }
    analyze(buffer, &tuning.analysis)
}

fn poll_loading(
    mut commands: Commands,
    job: Option<Res<LoadingJob>>,
    mut session: ResMut<Session>,
    mut ctx: NonSendMut<KiraContext>,
    mut next_state: ResMut<NextState<GameScreen>>,
) {
    let Some(job) = job else { return };

    let outcome = match job.rx.try_recv() {
        Ok(outcome) => outcome,
        Err(TryRecvError::Empty) => return,
        Err(TryRecvError::Disconnected) => Err(GameError::Analysis("loading worker stopped".into())),
    };
    commands.remove_resource::<LoadingJob>();

    match outcome.and_then(|track| {
        session.engine.load(track.source)?;
        Ok(track.sound)
    }) {
        Ok(sound) => {
            ctx.song = Some(sound);
            next_state.set(GameScreen::Ready);
        }
        Err(e) => {
            session.engine.fail(e.to_string());
            next_state.set(GameScreen::Failed);
        }
    }
}
