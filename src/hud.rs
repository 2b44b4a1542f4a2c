use bevy::prelude::*;

use crate::GameSet;
use crate::session::{LaneView, PlayheadClock, playback_seconds};

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_hud)
            .add_systems(Update, update_hud.in_set(GameSet::Render));
    }
}

// --- HUD palette ---

const HUD_BG: Color = Color::srgba(0.04, 0.02, 0.08, 0.7);
const SCORE_COLOR: Color = Color::srgb(0.92, 0.96, 1.0);
const LABEL_COLOR: Color = Color::srgb(0.55, 0.45, 0.65);
const BEST_COLOR: Color = Color::srgb(1.0, 0.85, 0.15);
const MISS_COLOR: Color = Color::srgb(1.0, 0.15, 0.3);

const SCORE_FONT: f32 = 32.0;
const STAT_FONT: f32 = 16.0;
const LABEL_FONT: f32 = 11.0;

// --- Marker components ---

#[derive(Component)]
struct HudScoreText;

#[derive(Component)]
struct HudBestText;

#[derive(Component)]
struct HudMissText;

#[derive(Component)]
struct HudTimeText;

// --- Systems ---

fn setup_hud(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(8.0),
                left: Val::Px(8.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(2.0),
                padding: UiRect::all(Val::Px(8.0)),
                border_radius: BorderRadius::all(Val::Px(4.0)),
                ..default()
            },
            BackgroundColor(HUD_BG),
        ))
        .with_children(|root: &mut ChildSpawnerCommands| {
            root.spawn((
                Text::new("0"),
                TextFont {
                    font_size: SCORE_FONT,
                    ..default()
                },
                TextColor(SCORE_COLOR),
                HudScoreText,
            ));
            spawn_stat_row(root, "BEST", BEST_COLOR, HudBestText);
            spawn_stat_row(root, "MISS", MISS_COLOR, HudMissText);
            spawn_stat_row(root, "TIME", SCORE_COLOR, HudTimeText);
        });
}

fn spawn_stat_row(
    parent: &mut ChildSpawnerCommands,
    label: &str,
    color: Color,
    marker: impl Component,
) {
    parent
        .spawn((Node {
            flex_direction: FlexDirection::Row,
            align_items: AlignItems::Center,
            column_gap: Val::Px(8.0),
            ..default()
        },))
        .with_children(|row: &mut ChildSpawnerCommands| {
            row.spawn((
                Text::new(label.to_string()),
                TextFont {
                    font_size: LABEL_FONT,
                    ..default()
                },
                TextColor(LABEL_COLOR),
            ));
            row.spawn((
                Text::new("0"),
                TextFont {
                    font_size: STAT_FONT,
                    ..default()
                },
                TextColor(color),
                marker,
            ));
        });
}

fn update_hud(
    view: Res<LaneView>,
    clock: Option<Res<PlayheadClock>>,
    mut score_q: Query<&mut Text, (With<HudScoreText>, Without<HudBestText>)>,
    mut best_q: Query<&mut Text, (With<HudBestText>, Without<HudScoreText>)>,
    mut miss_q: Query<&mut Text, (With<HudMissText>, Without<HudScoreText>, Without<HudBestText>)>,
    mut time_q: Query<
        &mut Text,
        (With<HudTimeText>, Without<HudScoreText>, Without<HudBestText>, Without<HudMissText>),
    >,
) {
    let Some(frame) = &view.0 else { return };

    if let Ok(mut text) = score_q.single_mut() {
        **text = format!("{}", frame.score);
    }
    if let Ok(mut text) = best_q.single_mut() {
        **text = format!("{}", frame.best_score);
    }
    if let Ok(mut text) = miss_q.single_mut() {
        **text = format!("{}", frame.misses);
    }
    if let (Ok(mut text), Some(clock)) = (time_q.single_mut(), clock) {
        **text = format!("{:.1}s", playback_seconds(&clock));
    }
}
