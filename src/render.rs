use beattiles::engine::{Judgment, LaneSnapshot};
use bevy::prelude::*;

use crate::GameSet;
use crate::session::{LaneView, StrikeResult};

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StrikeFlashes>().add_systems(
            Update,
            (collect_strikes, draw_field).chain().in_set(GameSet::Render),
        );
    }
}

const LANE_LINE: Color = Color::srgba(0.6, 0.2, 1.0, 0.35);
const TILE_OUTLINE: Color = Color::srgba(0.92, 0.96, 1.0, 0.25);
const TARGET_COLOR: Color = Color::srgb(0.0, 0.9, 1.0);
const WINDOW_ACTIVE: Color = Color::srgb(0.0, 1.0, 0.4);
const WINDOW_IDLE: Color = Color::srgba(0.6, 0.2, 1.0, 0.6);
const HIT_COLOR: Color = Color::srgb(0.0, 1.0, 0.4);
const MISS_COLOR: Color = Color::srgb(1.0, 0.15, 0.3);

const FLASH_LIFETIME: f32 = 0.35;
/// Inset rings drawn to make a target tile read as solid.
const TARGET_RINGS: usize = 8;

struct Flash {
    column: usize,
    hit: bool,
    age: f32,
}

#[derive(Resource, Default)]
struct StrikeFlashes(Vec<Flash>);

fn collect_strikes(
    time: Res<Time>,
    mut reader: MessageReader<StrikeResult>,
    mut flashes: ResMut<StrikeFlashes>,
) {
    let dt = time.delta_secs();
    flashes.0.retain_mut(|f| {
        f.age += dt;
        f.age < FLASH_LIFETIME
    });

    for strike in reader.read() {
        let hit = match strike.judgment {
            Judgment::Hit { .. } => true,
            Judgment::Miss(_) => false,
            Judgment::Ignored | Judgment::Rejected => continue,
        };
        flashes.0.push(Flash {
            column: strike.column,
            hit,
            age: 0.0,
        });
    }
}

/// Field coordinates (origin top-left, y down) to world space.
fn to_world(frame: &LaneSnapshot, x: f32, y: f32) -> Vec2 {
    let width = frame.tile_width * frame.lane_count as f32;
    Vec2::new(x - width / 2.0, frame.field_height / 2.0 - y)
}

fn draw_field(mut gizmos: Gizmos, view: Res<LaneView>, flashes: Res<StrikeFlashes>) {
    let Some(frame) = &view.0 else { return };
    let (tile_w, tile_h) = (frame.tile_width, frame.tile_height);
    let width = tile_w * frame.lane_count as f32;

    for lane in 1..frame.lane_count {
        let x = lane as f32 * tile_w;
        gizmos.line_2d(
            to_world(frame, x, 0.0),
            to_world(frame, x, frame.field_height),
            LANE_LINE,
        );
    }

    let tile_size = Vec2::new(tile_w - 4.0, tile_h - 4.0);
    for tile in frame.tiles() {
        if tile.y + tile_h <= 0.0 || tile.y >= frame.field_height {
            continue;
        }
        let center = to_world(
            frame,
            (tile.column as f32 + 0.5) * tile_w,
            tile.y + tile_h / 2.0,
        );
        if tile.is_target {
            let step = tile_size.min_element() / (2.0 * TARGET_RINGS as f32);
            for ring in 0..TARGET_RINGS {
                let inset = Vec2::splat(step * 2.0 * ring as f32);
                gizmos.rect_2d(center, tile_size - inset, TARGET_COLOR);
            }
        } else {
            gizmos.rect_2d(center, tile_size, TILE_OUTLINE);
        }
    }

    // The field border doubles as the hit-window indicator.
    let border = if frame.window_active {
        WINDOW_ACTIVE
    } else {
        WINDOW_IDLE
    };
    gizmos.rect_2d(Vec2::ZERO, Vec2::new(width, frame.field_height), border);

    // Beat pulse: a ring that shrinks as the surge decays.
    let pulse = 1.0 - frame.beat_progress;
    if pulse > 0.0 {
        let pos = to_world(frame, width / 2.0, frame.field_height - 24.0);
        gizmos.circle_2d(pos, 8.0 + 16.0 * pulse, WINDOW_ACTIVE.with_alpha(pulse));
    }

    for flash in &flashes.0 {
        let t = flash.age / FLASH_LIFETIME;
        let color = if flash.hit { HIT_COLOR } else { MISS_COLOR };
        let pos = to_world(
            frame,
            (flash.column as f32 + 0.5) * tile_w,
            frame.field_height - 60.0,
        );
        gizmos.circle_2d(pos, 10.0 + 30.0 * t, color.with_alpha(1.0 - t));
    }
}
