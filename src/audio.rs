use bevy::prelude::*;
use kira::{
    AudioManager, AudioManagerSettings, DefaultBackend,
    sound::PlaybackState,
    sound::static_sound::{StaticSoundData, StaticSoundHandle, StaticSoundSettings},
};

pub struct KiraPlugin;

impl Plugin for KiraPlugin {
    fn build(&self, app: &mut App) {
        let manager = match AudioManager::<DefaultBackend>::new(AudioManagerSettings::default()) {
            Ok(manager) => Some(manager),
            Err(e) => {
                error!("Failed to create Kira AudioManager: {}", e);
                None
            }
        };

        app.insert_non_send_resource(KiraContext {
            manager,
            song: None,
            sound: None,
        });
    }
}

pub struct KiraContext {
    pub manager: Option<AudioManager>,
    /// Decoded track waiting to be played.
    pub song: Option<StaticSoundData>,
    pub sound: Option<StaticSoundHandle>,
}

/// Convert a 0.0–1.0 amplitude to decibels (f32).
fn amplitude_to_db(amp: f64) -> f32 {
    if amp <= 0.0 {
        -60.0 // silence
    } else {
        (20.0 * (amp as f32).log10()).max(-60.0)
    }
}

/// Start the loaded track from the top.
pub fn play_song(ctx: &mut KiraContext, volume: f64) -> Result<(), String> {
    stop_song(ctx);

    let Some(song) = ctx.song.clone() else {
        return Err("no track decoded for playback".into());
    };
    let Some(manager) = ctx.manager.as_mut() else {
        return Err("audio output unavailable".into());
    };

    let settings = StaticSoundSettings::new().volume(amplitude_to_db(volume));
    let handle = manager
        .play(song.with_settings(settings))
        .map_err(|e| format!("failed to play track: {e}"))?;
    ctx.sound = Some(handle);
    Ok(())
}

pub fn stop_song(ctx: &mut KiraContext) {
    if let Some(ref mut sound) = ctx.sound {
        let _ = sound.stop(Default::default());
    }
    ctx.sound = None;
}

pub fn pause_song(ctx: &mut KiraContext) {
    if let Some(ref mut sound) = ctx.sound {
        let _ = sound.pause(Default::default());
    }
}

pub fn resume_song(ctx: &mut KiraContext) {
    if let Some(ref mut sound) = ctx.sound {
        let _ = sound.resume(Default::default());
    }
}

/// Raw playhead in milliseconds, and whether playback has run out.
pub fn playhead(ctx: &KiraContext) -> Option<(f64, bool)> {
    let sound = ctx.sound.as_ref()?;
    let finished = sound.state() == PlaybackState::Stopped;
    Some((sound.position() * 1000.0, finished))
}
