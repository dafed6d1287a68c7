pub mod components;
pub mod ground;
pub mod input;
pub mod locomotion;
pub mod roll;
pub mod states;

use avian3d::math::Vector2;
use bevy::prelude::*;

use components::*;
use ground::*;
use input::*;
use locomotion::*;
use roll::*;
use states::*;

pub struct CharacterControllerPlugin;

impl Plugin for CharacterControllerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<MovementAction>()
            .init_resource::<KeyboardInput>()
            .init_resource::<TouchJoystick>()
            .init_resource::<ControllerDebug>()
            .init_resource::<InputSettings>()
            .register_type::<MovementProfile>()
            .register_type::<MovementState>()
            .register_type::<GroundSensor>()
            .register_type::<PlayerMode>()
            .configure_sets(
                Update,
                (
                    ControllerSet::Input,
                    ControllerSet::Sense,
                    ControllerSet::Integrate,
                    ControllerSet::Locomotion,
                    ControllerSet::Combat,
                    ControllerSet::Mode,
                    ControllerSet::Apply,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    (
                        keyboard_input,
                        touch_input,
                        dispatch_movement,
                        record_movement_input,
                        toggle_ground_debug,
                    )
                        .chain()
                        .in_set(ControllerSet::Input),
                    probe_ground.in_set(ControllerSet::Sense),
                    integrate_gravity.in_set(ControllerSet::Integrate),
                    (tick_rolls, start_roll, locomotion)
                        .chain()
                        .in_set(ControllerSet::Locomotion),
                    (finish_respawn, update_player_modes)
                        .chain()
                        .in_set(ControllerSet::Mode),
                    apply_velocity.in_set(ControllerSet::Apply),
                    debug_visualize_ground_probe
                        .run_if(|debug: Res<ControllerDebug>| debug.show_ground_probe),
                ),
            );
    }
}

/// Per-frame ordering of the character controller.
///
/// Sensing runs before vertical integration, which runs before the roll and
/// locomotion step, which runs before the mode is re-derived.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerSet {
    Input,
    Sense,
    Integrate,
    Locomotion,
    Combat,
    Mode,
    Apply,
}

/// An event sent by the authoritative input source every frame.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum MovementAction {
    Move(Vector2, bool), // Direction vector and run flag
    Roll,
}

/// Toggles for the debug gizmos.
#[derive(Resource, Default, Debug)]
pub struct ControllerDebug {
    pub show_ground_probe: bool,
}
