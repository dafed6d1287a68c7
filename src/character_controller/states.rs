use avian3d::math::{Scalar, Vector2};
use bevy::prelude::*;

use crate::animation::RespawnAnimationFinished;
use crate::character_controller::MovementAction;
use crate::character_controller::components::*;
use crate::combat::{Damageable, Vitals};

/// Discrete gameplay state of a character, re-derived every frame.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlayerMode {
    #[default]
    Respawning,
    Idle,
    Running,
    Rolling,
    Hurt,
    Death,
    Stunned,
}

impl PlayerMode {
    pub fn blocks_movement(self) -> bool {
        matches!(self, PlayerMode::Death | PlayerMode::Stunned)
    }

    pub fn can_attack(self) -> bool {
        !self.blocks_movement()
    }

    pub fn can_be_attacked(self) -> bool {
        !self.blocks_movement()
    }
}

/// Everything the mode derivation looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModeFlags {
    pub ready_to_move: bool,
    pub rolling: bool,
    pub hurting: bool,
    pub dead: bool,
    pub stunned: bool,
    pub input_magnitude: Scalar,
}

impl ModeFlags {
    pub fn gather(state: &MovementState, vitals: &Vitals) -> Self {
        Self {
            ready_to_move: state.ready_to_move,
            rolling: state.roll.is_rolling(),
            hurting: vitals.is_hurting(),
            dead: vitals.is_dead(),
            stunned: vitals.is_stunned(),
            input_magnitude: state.input_magnitude(),
        }
    }
}

/// Derives the mode from the flags, first match wins:
/// rolling, hurt, death, stunned, then running or idle by input magnitude.
///
/// Until the respawn clip reports ready the mode stays `Respawning`, unless
/// the character dies first.
pub fn derive_mode(flags: ModeFlags) -> PlayerMode {
    if !flags.ready_to_move && !flags.dead {
        return PlayerMode::Respawning;
    }

    if flags.rolling {
        PlayerMode::Rolling
    } else if flags.hurting {
        PlayerMode::Hurt
    } else if flags.dead {
        PlayerMode::Death
    } else if flags.stunned {
        PlayerMode::Stunned
    } else if flags.input_magnitude > MOVE_INPUT_DEADZONE {
        PlayerMode::Running
    } else {
        PlayerMode::Idle
    }
}

/// Whether the locomotion solver may run this frame.
///
/// Death gates movement on the flag itself: a fatal hit also opens the hurt
/// window, and `Hurt` outranks `Death` in the derived mode.
pub fn movement_permitted(flags: ModeFlags) -> bool {
    flags.ready_to_move && !flags.dead && !derive_mode(flags).blocks_movement()
}

/// Stores the latest move input from the authoritative source.
pub fn record_movement_input(
    mut movement_events: EventReader<MovementAction>,
    mut query: Query<&mut MovementState, With<CharacterController>>,
) {
    // Default to no input unless we see a Move event
    let mut input = Vector2::ZERO;
    let mut running = false;

    for event in movement_events.read() {
        if let MovementAction::Move(direction, is_running) = event {
            input = *direction;
            running = *is_running;
        }
    }

    for mut state in &mut query {
        state.input = input;
        state.is_running = running;
    }
}

pub fn update_player_modes(
    mut query: Query<(Entity, &MovementState, &Vitals, &mut PlayerMode), With<CharacterController>>,
) {
    for (entity, state, vitals, mut mode) in &mut query {
        let next = derive_mode(ModeFlags::gather(state, vitals));
        if *mode != next {
            debug!("{entity} mode {:?} -> {:?}", *mode, next);
            *mode = next;
        }
    }
}

/// Lets a character move once its respawn clip has finished. Fires at most
/// once per character; later signals are ignored.
pub fn finish_respawn(
    mut finished: EventReader<RespawnAnimationFinished>,
    mut query: Query<(&mut MovementState, &mut PlayerMode)>,
) {
    for event in finished.read() {
        let Ok((mut state, mut mode)) = query.get_mut(event.entity) else {
            continue;
        };
        if state.ready_to_move {
            continue;
        }

        info!("{} ready to move", event.entity);
        state.ready_to_move = true;
        *mode = PlayerMode::Idle;
    }
}
