//! Beat-driven fall speed as pure functions of beat progress.

use std::f32::consts::PI;

pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * (2.0 - t)
}

/// Interpolate from `last_speed` toward `target_speed` along an ease-out
/// curve. `progress` is clamped to `0..=1`.
pub fn ease_speed(last_speed: f32, target_speed: f32, progress: f32) -> f32 {
    last_speed + (target_speed - last_speed) * ease_out_quad(progress)
}

/// Extra step scale peaking halfway between beats.
pub fn sway(progress: f32, amplitude: f32) -> f32 {
    1.0 + (progress.clamp(0.0, 1.0) * PI).sin() * amplitude
}

/// Fraction of the pulse elapsed since `last_beat_ms`, `1.0` with no beat.
pub fn beat_progress(now_ms: f64, last_beat_ms: Option<f64>, pulse_ms: f64) -> f32 {
    match last_beat_ms {
        Some(beat) if pulse_ms > 0.0 => ((now_ms - beat) / pulse_ms).clamp(0.0, 1.0) as f32,
        _ => 1.0,
    }
}
