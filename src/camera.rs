use bevy::{
    core_pipeline::{bloom::Bloom, tonemapping::Tonemapping},
    input::mouse::MouseMotion,
    math::StableInterpolate,
    pbr::{DistanceFog, FogFalloff},
    prelude::*,
};

use crate::character_controller::ControllerSet;
use crate::player::Player;

/// Raising the lag by this much halves the follow speed.
const LAG_DELTA_TIME_ADJUSTMENT: f32 = 20.0;

/// Camera-relative axes the locomotion solver steers by.
///
/// Stays at the default (looking down -Z) when there is no camera.
#[derive(Resource, Reflect, Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub forward: Vec3,
    pub right: Vec3,
}

impl Default for CameraBasis {
    fn default() -> Self {
        Self {
            forward: Vec3::NEG_Z,
            right: Vec3::X,
        }
    }
}

impl CameraBasis {
    pub fn from_transform(transform: &Transform) -> Self {
        Self {
            forward: transform.forward().as_vec3(),
            right: transform.right().as_vec3(),
        }
    }
}

#[derive(Component, Reflect)]
pub struct TopDownCamera {
    pub yaw: f32,
    pub tilt: f32,
    pub distance: f32,
    pub height_offset: f32,
    pub positional_lag: f32,
    pub mouse_sensitivity: f32,
    pub invert: bool,
    pub follow_player: bool,
}

impl Default for TopDownCamera {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            tilt: 0.9,           // Radians below the horizon
            distance: 12.0,
            height_offset: 1.0,  // Focus point above the player origin
            positional_lag: 2.0, // The higher the lazier
            mouse_sensitivity: 0.005,
            invert: false,
            follow_player: true,
        }
    }
}

impl TopDownCamera {
    /// Where the camera sits relative to its focus point.
    pub fn offset(&self) -> Vec3 {
        let rotation = Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(-self.tilt);
        rotation * Vec3::new(0.0, 0.0, self.distance)
    }

    pub fn follow_rate(&self) -> f32 {
        LAG_DELTA_TIME_ADJUSTMENT / self.positional_lag.max(f32::EPSILON)
    }
}

pub fn spawn_camera(mut commands: Commands) {
    let rig = TopDownCamera::default();
    let transform = Transform::from_translation(rig.offset()).looking_at(Vec3::Y * rig.height_offset, Vec3::Y);

    commands.spawn((
        Name::new("Camera"),
        Camera3d::default(),
        Camera {
            hdr: true,
            ..default()
        },
        DistanceFog {
            color: Color::srgb_u8(43, 44, 100),
            falloff: FogFalloff::Exponential { density: 15e-3 },
            ..default()
        },
        Bloom {
            intensity: 0.03,
            ..default()
        },
        Tonemapping::TonyMcMapface,
        transform,
        rig,
    ));
}

/// Yaws the camera while the right mouse button is held.
pub fn rotate_camera(
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut camera_query: Query<&mut TopDownCamera>,
) {
    let Ok(mut rig) = camera_query.single_mut() else {
        mouse_motion.clear();
        return;
    };

    if !mouse_buttons.pressed(MouseButton::Right) {
        mouse_motion.clear();
        return;
    }

    let direction = if rig.invert { 1.0 } else { -1.0 };
    for event in mouse_motion.read() {
        rig.yaw += direction * event.delta.x * rig.mouse_sensitivity;
    }
}

/// Trails the player with positional lag and keeps it in view.
pub fn follow_player(
    time: Res<Time>,
    player_query: Query<&Transform, (With<Player>, Without<TopDownCamera>)>,
    mut camera_query: Query<(&mut Transform, &TopDownCamera)>,
) {
    let (Ok(player_transform), Ok((mut camera_transform, rig))) =
        (player_query.single(), camera_query.single_mut())
    else {
        return;
    };

    if !rig.follow_player {
        return;
    }

    let focus = player_transform.translation + Vec3::Y * rig.height_offset;
    let target = focus + rig.offset();

    camera_transform
        .translation
        .smooth_nudge(&target, rig.follow_rate(), time.delta_secs());
    camera_transform.look_at(focus, Vec3::Y);
}

/// Publishes the camera axes for the locomotion solver.
pub fn publish_camera_basis(
    camera_query: Query<&Transform, With<TopDownCamera>>,
    mut basis: ResMut<CameraBasis>,
) {
    let Ok(transform) = camera_query.single() else {
        return;
    };

    basis.set_if_neq(CameraBasis::from_transform(transform));
}

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraBasis>()
            .register_type::<CameraBasis>()
            .register_type::<TopDownCamera>()
            .add_systems(Startup, spawn_camera)
            .add_systems(
                Update,
                (
                    (rotate_camera, publish_camera_basis)
                        .chain()
                        .before(ControllerSet::Locomotion),
                    follow_player.after(ControllerSet::Apply),
                ),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_basis_without_camera() {
        let mut app = App::new();
        app.init_resource::<CameraBasis>();
        app.add_systems(Update, publish_camera_basis);
        app.update();

        assert_eq!(*app.world().resource::<CameraBasis>(), CameraBasis::default());
    }

    #[test]
    fn test_basis_follows_camera_transform() {
        let mut app = App::new();
        app.init_resource::<CameraBasis>();
        app.add_systems(Update, publish_camera_basis);

        let transform = Transform::from_xyz(0.0, 10.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y);
        app.world_mut().spawn((transform, TopDownCamera::default()));
        app.update();

        let basis = *app.world().resource::<CameraBasis>();
        assert!((basis.right - Vec3::X).length() < 1e-5);
        assert!(basis.forward.z < 0.0 && basis.forward.y < 0.0, "looking down and ahead");
    }

    #[test]
    fn test_offset_sits_behind_and_above() {
        let rig = TopDownCamera::default();
        let offset = rig.offset();

        assert!((offset.length() - rig.distance).abs() < 1e-4);
        assert!(offset.y > 0.0);
        assert!(offset.z > 0.0, "yaw 0 looks towards -Z from +Z");
    }

    #[test]
    fn test_follow_moves_towards_player() {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app.add_systems(Update, follow_player);

        app.world_mut().spawn((Player, Transform::from_xyz(5.0, 0.0, 0.0)));
        let camera = app
            .world_mut()
            .spawn((Transform::default(), TopDownCamera::default()))
            .id();

        let rig = TopDownCamera::default();
        let target = Vec3::new(5.0, rig.height_offset, 0.0) + rig.offset();

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(50));
        app.update();

        let position = app.world().get::<Transform>(camera).unwrap().translation;
        assert!(position.distance(target) < target.length(), "closer than where it started");
        assert!(position.distance(target) > 0.0, "lagging behind the target");
    }
}
