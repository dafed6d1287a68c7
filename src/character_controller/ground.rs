use avian3d::math::{Scalar, Vector};
use avian3d::prelude::{LinearVelocity, SpatialQuery, SpatialQueryFilter};
use bevy::color::Color;
use bevy::math::{Dir3, Vec3};
use bevy::prelude::{Entity, Gizmos, Query, Reflect, Res, Time, Transform, With};

use crate::character_controller::components::*;

/// Vertical speed a grounded character is pinned to, so it stays seated on
/// uneven ground instead of hovering for a frame.
pub const GROUNDED_VERTICAL_VELOCITY: Scalar = -2.0;

/// The ground ray starts this far above the feet.
pub const GROUND_PROBE_LIFT: Scalar = 0.1;

/// The slope ray reaches this much further than the ground ray.
pub const SLOPE_PROBE_EXTRA: Scalar = 0.1;

/// Result of the ground and slope probes for one frame.
#[derive(Reflect, Clone, Copy, Debug, PartialEq)]
pub struct GroundProbe {
    pub grounded: bool,
    pub normal: Vector,
    pub on_slope: bool,
    pub slope_normal: Vector,
}

impl Default for GroundProbe {
    fn default() -> Self {
        Self {
            grounded: false,
            normal: Vector::Y,
            on_slope: false,
            slope_normal: Vector::Y,
        }
    }
}

impl GroundProbe {
    /// The plane movement should be projected onto, if any.
    pub fn slope(&self) -> Option<Vector> {
        self.on_slope.then_some(self.slope_normal)
    }
}

/// Classifies the hit normals of the two downward probes.
///
/// `ground_hit` is the normal from the short ray starting just above the feet,
/// `slope_hit` the normal from the slightly longer ray starting at the feet.
/// The character is on a slope only while grounded and only when the slope
/// angle is strictly between flat and `max_slope_angle` (degrees).
pub fn classify_ground(
    ground_hit: Option<Vector>,
    slope_hit: Option<Vector>,
    max_slope_angle: Scalar,
) -> GroundProbe {
    let Some(normal) = ground_hit else {
        return GroundProbe::default();
    };

    let (on_slope, slope_normal) = match slope_hit {
        Some(slope_normal) => {
            let angle = slope_normal.angle_between(Vector::Y).to_degrees();
            (angle > 0.0 && angle < max_slope_angle, slope_normal)
        }
        None => (false, Vector::Y),
    };

    GroundProbe {
        grounded: true,
        normal,
        on_slope,
        slope_normal,
    }
}

/// Integrates the vertical velocity for one step.
///
/// While grounded and not moving upwards the velocity is pinned to
/// [`GROUNDED_VERTICAL_VELOCITY`]; otherwise gravity accumulates unclamped.
pub fn integrate_vertical(velocity_y: Scalar, is_grounded: bool, gravity: Scalar, dt: Scalar) -> Scalar {
    if is_grounded && velocity_y <= 0.0 {
        GROUNDED_VERTICAL_VELOCITY
    } else {
        velocity_y + gravity * dt
    }
}

/// Casts the ground and slope rays for every character controller.
pub fn probe_ground(
    spatial_query: SpatialQuery,
    mut query: Query<
        (Entity, &Transform, &GroundSensor, &MovementProfile, &mut MovementState),
        With<CharacterController>,
    >,
) {
    for (entity, transform, sensor, profile, mut state) in &mut query {
        let feet = transform.translation - Vec3::Y * sensor.foot_offset;
        let filter = SpatialQueryFilter::from_mask(profile.ground_layer).with_excluded_entities([entity]);

        let ground_hit = spatial_query
            .cast_ray(
                feet + Vec3::Y * GROUND_PROBE_LIFT,
                Dir3::NEG_Y,
                profile.ground_check_distance,
                true,
                &filter,
            )
            .map(|hit| hit.normal);

        // The slope probe only matters once the character is standing on something
        let slope_hit = if ground_hit.is_some() {
            spatial_query
                .cast_ray(
                    feet,
                    Dir3::NEG_Y,
                    profile.ground_check_distance + SLOPE_PROBE_EXTRA,
                    true,
                    &filter,
                )
                .map(|hit| hit.normal)
        } else {
            None
        };

        state.ground = classify_ground(ground_hit, slope_hit, profile.max_slope_angle);
    }
}

pub fn integrate_gravity(
    time: Res<Time>,
    mut query: Query<(&MovementProfile, &mut MovementState), With<CharacterController>>,
) {
    let dt = time.delta_secs();

    for (profile, mut state) in &mut query {
        state.vertical_velocity = integrate_vertical(
            state.vertical_velocity,
            state.ground.grounded,
            profile.gravity,
            dt,
        );
    }
}

/// Writes the combined planar (or roll) and vertical velocity to the body,
/// once per frame.
pub fn apply_velocity(
    mut query: Query<(&MovementState, &MovementProfile, &mut LinearVelocity), With<CharacterController>>,
) {
    for (state, profile, mut linear_velocity) in &mut query {
        let horizontal = state
            .roll
            .velocity(profile.roll_speed)
            .unwrap_or(state.planar_velocity);

        linear_velocity.0 = horizontal + Vector::Y * state.vertical_velocity;
    }
}

pub fn debug_visualize_ground_probe(
    mut gizmos: Gizmos,
    query: Query<(&Transform, &GroundSensor, &MovementProfile, &MovementState)>,
) {
    for (transform, sensor, profile, state) in &query {
        let start = transform.translation - Vec3::Y * (sensor.foot_offset - GROUND_PROBE_LIFT);
        let end = start - Vec3::Y * profile.ground_check_distance;

        let color = if state.ground.on_slope {
            Color::srgb(1.0, 1.0, 0.0)
        } else if state.ground.grounded {
            Color::srgb(0.0, 1.0, 0.0)
        } else {
            Color::srgb(1.0, 0.0, 0.0)
        };

        gizmos.line(start, end, color);
        gizmos.line(end, end + state.ground.normal, Color::srgb(0.0, 0.0, 1.0));
    }
}
