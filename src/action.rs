use bevy::prelude::*;
use leafwing_input_manager::prelude::*;

pub struct ActionPlugin;

impl Plugin for ActionPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(InputManagerPlugin::<GameAction>::default())
            .init_resource::<ActionState<GameAction>>()
            .insert_resource(GameAction::default_input_map());
    }
}

#[derive(Actionlike, PartialEq, Eq, Clone, Copy, Hash, Debug, Reflect)]
pub enum GameAction {
    LaneOne,
    LaneTwo,
    LaneThree,
    LaneFour,
    Confirm,
    Back,
}

impl GameAction {
    /// Lane strikes, left to right.
    pub const LANES: [GameAction; 4] = [
        GameAction::LaneOne,
        GameAction::LaneTwo,
        GameAction::LaneThree,
        GameAction::LaneFour,
    ];

    fn default_input_map() -> InputMap<Self> {
        use GameAction::*;
        let mut map = InputMap::default();

        // Lanes
        map.insert(LaneOne, KeyCode::KeyQ);
        map.insert(LaneTwo, KeyCode::KeyW);
        map.insert(LaneThree, KeyCode::KeyE);
        map.insert(LaneFour, KeyCode::KeyR);
        map.insert(LaneOne, GamepadButton::West);
        map.insert(LaneTwo, GamepadButton::North);
        map.insert(LaneThree, GamepadButton::South);
        map.insert(LaneFour, GamepadButton::East);

        // Menu confirm
        map.insert(Confirm, KeyCode::Space);
        map.insert(Confirm, KeyCode::Enter);
        map.insert(Confirm, GamepadButton::Start);

        // Pause / back
        map.insert(Back, KeyCode::Escape);
        map.insert(Back, GamepadButton::Select);

        map
    }
}
