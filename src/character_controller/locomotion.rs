use avian3d::math::{Scalar, Vector, Vector2};
use bevy::math::Quat;
use bevy::prelude::{Query, Res, Time, Transform, With};

use crate::camera::CameraBasis;
use crate::character_controller::components::*;
use crate::character_controller::states::{ModeFlags, movement_permitted};
use crate::combat::Vitals;

/// Result of one locomotion step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocomotionStep {
    pub velocity: Vector,
    pub facing: Quat,
    pub angle_delta: Scalar,
}

/// Drops the vertical component and renormalizes. Zero stays zero.
fn flatten(v: Vector) -> Vector {
    Vector::new(v.x, 0.0, v.z).normalize_or_zero()
}

/// World-space move direction for a stick input, relative to the camera.
///
/// On a walkable slope the direction is projected onto the slope plane so the
/// character follows the surface instead of pushing into it.
pub fn move_direction(input: Vector2, basis: &CameraBasis, slope_normal: Option<Vector>) -> Vector {
    let forward = flatten(basis.forward);
    let right = flatten(basis.right);

    let direction = (forward * input.y + right * input.x).normalize_or_zero();

    match slope_normal {
        Some(normal) => direction.reject_from(normal).normalize_or_zero(),
        None => direction,
    }
}

/// Blends the current velocity towards the target for this frame.
///
/// Linear interpolation with `rate * dt` clamped to `[0, 1]`, so a large
/// frame time snaps straight to the target rather than overshooting it.
pub fn blend_velocity(
    current: Vector,
    input_magnitude: Scalar,
    direction: Vector,
    target_speed: Scalar,
    profile: &MovementProfile,
    dt: Scalar,
) -> Vector {
    if input_magnitude < MOVE_INPUT_DEADZONE {
        current.lerp(Vector::ZERO, (profile.deceleration * dt).clamp(0.0, 1.0))
    } else {
        current.lerp(direction * target_speed, (profile.acceleration * dt).clamp(0.0, 1.0))
    }
}

/// Signed yaw from `from` to `to`, positive counter-clockwise seen from above.
pub fn signed_yaw(from: Vector, to: Vector) -> Scalar {
    let from = flatten(from);
    let to = flatten(to);
    from.cross(to).y.atan2(from.dot(to))
}

/// Rotates `current` towards `target` by at most `max_angle` radians.
fn rotate_towards(current: Quat, target: Quat, max_angle: Scalar) -> Quat {
    let angle = current.angle_between(target);
    if angle <= max_angle || angle <= Scalar::EPSILON {
        target
    } else {
        current.slerp(target, max_angle / angle)
    }
}

/// Turns `facing` towards `direction` at `rotation_speed` degrees per second.
///
/// Returns the new facing and the signed yaw that was left to cover before
/// turning. A degenerate direction leaves the facing alone with a zero delta.
pub fn turn_towards(facing: Quat, direction: Vector, rotation_speed: Scalar, dt: Scalar) -> (Quat, Scalar) {
    let flat = flatten(direction);
    if direction.length() < MOVE_INPUT_DEADZONE || flat == Vector::ZERO {
        return (facing, 0.0);
    }

    let angle_delta = signed_yaw(facing * Vector::NEG_Z, flat);
    // Forward is -Z
    let target = Quat::from_rotation_y(Scalar::atan2(-flat.x, -flat.z));
    let turned = rotate_towards(facing, target, (rotation_speed * dt).to_radians());

    (turned, angle_delta)
}

/// One locomotion step: velocity blend plus facing.
pub fn solve_locomotion(
    state: &MovementState,
    facing: Quat,
    basis: &CameraBasis,
    profile: &MovementProfile,
    dt: Scalar,
) -> LocomotionStep {
    let input_magnitude = state.input_magnitude();

    if input_magnitude < MOVE_INPUT_DEADZONE {
        return LocomotionStep {
            velocity: blend_velocity(state.planar_velocity, input_magnitude, Vector::ZERO, 0.0, profile, dt),
            facing,
            angle_delta: state.angle_delta,
        };
    }

    let direction = move_direction(state.input, basis, state.ground.slope());
    let velocity = blend_velocity(
        state.planar_velocity,
        input_magnitude,
        direction,
        profile.target_speed(state.is_running),
        profile,
        dt,
    );
    let (facing, angle_delta) = turn_towards(facing, direction, profile.rotation_speed, dt);

    LocomotionStep {
        velocity,
        facing,
        angle_delta,
    }
}

/// Runs the locomotion solver for every controller allowed to move.
pub fn locomotion(
    time: Res<Time>,
    basis: Res<CameraBasis>,
    mut query: Query<
        (&MovementProfile, &Vitals, &mut MovementState, &mut Transform),
        With<CharacterController>,
    >,
) {
    let dt = time.delta_secs();

    for (profile, vitals, mut state, mut transform) in &mut query {
        // Rolling owns the displacement until it ends
        if state.roll.is_rolling() {
            continue;
        }

        if !movement_permitted(ModeFlags::gather(&state, vitals)) {
            state.planar_velocity = Vector::ZERO;
            state.speed = 0.0;
            continue;
        }

        let step = solve_locomotion(&state, transform.rotation, &basis, profile, dt);

        state.planar_velocity = step.velocity;
        state.speed = step.velocity.length();
        state.angle_delta = step.angle_delta;
        if step.facing != transform.rotation {
            transform.rotation = step.facing;
        }
    }
}
