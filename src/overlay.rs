use beattiles::engine::SessionState;
use bevy::prelude::*;

use crate::session::Session;
use crate::state::GameScreen;

pub struct OverlayPlugin;

impl Plugin for OverlayPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameScreen::Loading), spawn_loading_overlay)
            .add_systems(OnEnter(GameScreen::Ready), spawn_ready_overlay)
            .add_systems(OnEnter(GameScreen::Paused), spawn_pause_overlay)
            .add_systems(OnEnter(GameScreen::Results), spawn_results_overlay)
            .add_systems(OnEnter(GameScreen::Failed), spawn_failed_overlay);
    }
}

const BACKDROP: Color = Color::srgba(0.02, 0.01, 0.06, 0.75);
const PANEL_BG: Color = Color::srgba(0.06, 0.03, 0.12, 0.95);
const PANEL_BORDER: Color = Color::srgb(0.6, 0.2, 1.0);
const TEXT_PRIMARY: Color = Color::srgb(0.92, 0.96, 1.0);
const TEXT_MUTED: Color = Color::srgb(0.4, 0.35, 0.5);
const TEXT_GOLD: Color = Color::srgb(1.0, 0.85, 0.15);
const TEXT_ERROR: Color = Color::srgb(1.0, 0.15, 0.3);

const TITLE_FONT: f32 = 36.0;
const BODY_FONT: f32 = 18.0;
const HINT_FONT: f32 = 11.0;

struct Line {
    text: String,
    size: f32,
    color: Color,
}

fn line(text: impl Into<String>, size: f32, color: Color) -> Line {
    Line {
        text: text.into(),
        size,
        color,
    }
}

/// Centered panel that lives until `screen` is left.
fn spawn_panel(commands: &mut Commands, screen: GameScreen, lines: Vec<Line>) {
    commands
        .spawn((
            DespawnOnExit(screen),
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(0.0),
                left: Val::Px(0.0),
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(BACKDROP),
        ))
        .with_children(|backdrop: &mut ChildSpawnerCommands| {
            backdrop
                .spawn((
                    Node {
                        flex_direction: FlexDirection::Column,
                        align_items: AlignItems::Center,
                        padding: UiRect::all(Val::Px(24.0)),
                        row_gap: Val::Px(14.0),
                        border: UiRect::all(Val::Px(2.0)),
                        border_radius: BorderRadius::all(Val::Px(6.0)),
                        max_width: Val::Px(360.0),
                        ..default()
                    },
                    BackgroundColor(PANEL_BG),
                    BorderColor::all(PANEL_BORDER),
                ))
                .with_children(|panel: &mut ChildSpawnerCommands| {
                    for line in lines {
                        panel.spawn((
                            Text::new(line.text),
                            TextFont {
                                font_size: line.size,
                                ..default()
                            },
                            TextColor(line.color),
                            TextLayout {
                                justify: Justify::Center,
                                ..default()
                            },
                        ));
                    }
                });
        });
}

fn spawn_loading_overlay(mut commands: Commands) {
    spawn_panel(
        &mut commands,
        GameScreen::Loading,
        vec![
            line("ANALYSING", TITLE_FONT, TEXT_PRIMARY),
            line("Finding the beats in your track...", BODY_FONT, TEXT_MUTED),
        ],
    );
}

fn spawn_ready_overlay(mut commands: Commands, session: Res<Session>) {
    spawn_panel(
        &mut commands,
        GameScreen::Ready,
        vec![
            line("BEAT TILES", TITLE_FONT, TEXT_PRIMARY),
            line(
                format!("Best {}", session.engine.best_score()),
                BODY_FONT,
                TEXT_GOLD,
            ),
            line(
                "Strike the lit tile on the beat with Q W E R or a click",
                BODY_FONT,
                TEXT_MUTED,
            ),
            line("[SPACE] Start", HINT_FONT, TEXT_MUTED),
        ],
    );
}

fn spawn_pause_overlay(mut commands: Commands) {
    spawn_panel(
        &mut commands,
        GameScreen::Paused,
        vec![
            line("PAUSED", TITLE_FONT, TEXT_PRIMARY),
            line("[ESC / SPACE] Resume", HINT_FONT, TEXT_MUTED),
        ],
    );
}

fn spawn_results_overlay(mut commands: Commands, session: Res<Session>) {
    let frame = session.engine.snapshot();
    let headline = if frame.state == SessionState::Ended && frame.score >= frame.best_score && frame.score > 0 {
        "NEW BEST"
    } else {
        "TRACK OVER"
    };
    spawn_panel(
        &mut commands,
        GameScreen::Results,
        vec![
            line(headline, TITLE_FONT, TEXT_PRIMARY),
            line(format!("Score {}", frame.score), BODY_FONT, TEXT_PRIMARY),
            line(format!("Best {}", frame.best_score), BODY_FONT, TEXT_GOLD),
            line(
                format!("Misses {}  /  Missed tiles {}", frame.misses, frame.dropped),
                BODY_FONT,
                TEXT_MUTED,
            ),
            line("[SPACE] Play again  /  [ESC] Quit", HINT_FONT, TEXT_MUTED),
        ],
    );
}

fn spawn_failed_overlay(mut commands: Commands, session: Res<Session>) {
    let reason = session
        .engine
        .snapshot()
        .failure
        .unwrap_or_else(|| "unknown error".into());
    spawn_panel(
        &mut commands,
        GameScreen::Failed,
        vec![
            line("COULD NOT LOAD", TITLE_FONT, TEXT_ERROR),
            line(reason, BODY_FONT, TEXT_PRIMARY),
            line("[SPACE] Retry  /  [ESC] Quit", HINT_FONT, TEXT_MUTED),
        ],
    );
}
