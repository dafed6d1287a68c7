use avian3d::math::{Scalar, Vector, Vector2};
use avian3d::prelude::{Collider, GravityScale, LinearVelocity, LockedAxes, RigidBody};
use bevy::prelude::{Component, Reflect};
use serde::{Deserialize, Serialize};

use crate::character_controller::ground::GroundProbe;
use crate::character_controller::roll::RollManeuver;
use crate::physics::GameLayer;

/// Input magnitude below which the stick is treated as released.
pub const MOVE_INPUT_DEADZONE: Scalar = 0.1;

/// A marker component indicating that an entity is using a character controller.
/// Requires the per-character movement state so the systems can always find it.
#[derive(Component)]
#[require(MovementProfile, MovementState, GroundSensor)]
pub struct CharacterController;

/// Tunable movement parameters, shared read-only by every system that moves
/// one character.
///
/// Angles are in degrees, speeds in units per second.
#[derive(Component, Reflect, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MovementProfile {
    pub walk_speed: Scalar,
    pub run_speed: Scalar,
    pub acceleration: Scalar,
    pub deceleration: Scalar,
    pub rotation_speed: Scalar,

    pub roll_speed: Scalar,
    pub rolling_time: Scalar,
    pub roll_cooling_time: Scalar,

    pub gravity: Scalar,
    pub max_slope_angle: Scalar,

    pub ground_check_distance: Scalar,
    pub ground_layer: GameLayer,
}

impl Default for MovementProfile {
    fn default() -> Self {
        Self {
            walk_speed: 5.0,
            run_speed: 8.0,
            acceleration: 10.0,
            deceleration: 15.0,
            rotation_speed: 720.0,

            roll_speed: 8.0,
            rolling_time: 0.4,
            roll_cooling_time: 1.0,

            gravity: -20.0,
            max_slope_angle: 45.0,

            ground_check_distance: 0.2,
            ground_layer: GameLayer::Ground,
        }
    }
}

impl MovementProfile {
    pub fn target_speed(&self, is_running: bool) -> Scalar {
        if is_running { self.run_speed } else { self.walk_speed }
    }
}

/// Mutable movement state owned by one character.
#[derive(Component, Reflect, Clone, Debug)]
pub struct MovementState {
    /// Velocity produced by the locomotion solver (may tilt along a slope).
    pub planar_velocity: Vector,
    pub vertical_velocity: Scalar,
    pub ground: GroundProbe,

    pub input: Vector2,
    pub is_running: bool,

    /// Magnitude of `planar_velocity`, exposed for animation.
    pub speed: Scalar,
    /// Signed yaw (radians) between facing and the last move direction.
    pub angle_delta: Scalar,

    /// Cleared while the respawn clip plays.
    pub ready_to_move: bool,
    pub roll: RollManeuver,
}

impl Default for MovementState {
    fn default() -> Self {
        Self {
            planar_velocity: Vector::ZERO,
            vertical_velocity: 0.0,
            ground: GroundProbe::default(),
            input: Vector2::ZERO,
            is_running: false,
            speed: 0.0,
            angle_delta: 0.0,
            ready_to_move: false,
            roll: RollManeuver::default(),
        }
    }
}

impl MovementState {
    pub fn input_magnitude(&self) -> Scalar {
        self.input.length()
    }
}

/// Where the ground probes start, relative to the entity origin.
#[derive(Component, Reflect, Clone, Debug, Default)]
pub struct GroundSensor {
    /// Distance from the entity origin down to the feet.
    pub foot_offset: Scalar,
}

// Helper functions to create a character controller

impl CharacterController {
    /// Capsule body driven entirely by [`MovementState`]: rotation is locked and
    /// the engine's gravity is disabled because vertical motion is integrated
    /// by the controller.
    pub fn new(radius: Scalar, length: Scalar) -> (
        Self,
        RigidBody,
        Collider,
        LockedAxes,
        GravityScale,
        LinearVelocity,
        GroundSensor,
    ) {
        (
            CharacterController,
            RigidBody::Dynamic,
            Collider::capsule(radius, length),
            LockedAxes::ROTATION_LOCKED,
            GravityScale(0.0),
            LinearVelocity::ZERO,
            GroundSensor {
                foot_offset: length * 0.5 + radius,
            },
        )
    }
}
