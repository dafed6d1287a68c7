use std::f32::consts::PI;

use avian3d::prelude::*;
use bevy::pbr::CascadeShadowConfigBuilder;
use bevy::prelude::*;

use crate::combat::Enemy;
use crate::physics::GameLayer;

pub(crate) struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(AmbientLight {
            color: Color::WHITE,
            brightness: 500.0,
            ..default()
        })
        .add_systems(Startup, setup);
    }
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let ground_material = materials.add(Color::srgb(0.3, 0.5, 0.3));
    let stone_material = materials.add(Color::srgb(0.55, 0.55, 0.6));

    // Ground
    commands.spawn((
        Name::new("Ground"),
        Mesh3d(meshes.add(Cuboid::new(60.0, 0.2, 60.0))),
        MeshMaterial3d(ground_material),
        Transform::from_xyz(0.0, -0.1, 0.0),
        RigidBody::Static,
        Collider::cuboid(60.0, 0.2, 60.0),
        GameLayer::ground(),
    ));

    // Walkable ramp, well under the default slope limit
    commands.spawn((
        Name::new("Ramp"),
        Mesh3d(meshes.add(Cuboid::new(4.0, 0.3, 10.0))),
        MeshMaterial3d(stone_material.clone()),
        Transform::from_xyz(8.0, 1.5, -6.0).with_rotation(Quat::from_rotation_x(20f32.to_radians())),
        RigidBody::Static,
        Collider::cuboid(4.0, 0.3, 10.0),
        GameLayer::ground(),
    ));

    // Too steep to count as a slope
    commands.spawn((
        Name::new("Steep wall"),
        Mesh3d(meshes.add(Cuboid::new(4.0, 0.3, 6.0))),
        MeshMaterial3d(stone_material),
        Transform::from_xyz(-8.0, 2.0, -6.0).with_rotation(Quat::from_rotation_x(60f32.to_radians())),
        RigidBody::Static,
        Collider::cuboid(4.0, 0.3, 6.0),
        GameLayer::ground(),
    ));

    let enemy_mesh = meshes.add(Capsule3d::new(0.35, 1.0));
    let enemy_material = materials.add(Color::srgb(0.7, 0.2, 0.2));
    for position in [Vec3::new(4.0, 0.85, 4.0), Vec3::new(-5.0, 0.85, 3.0)] {
        commands.spawn((
            Name::new("Enemy"),
            Enemy::default(),
            Mesh3d(enemy_mesh.clone()),
            MeshMaterial3d(enemy_material.clone()),
            Transform::from_translation(position),
            RigidBody::Static,
            Collider::capsule(0.35, 1.0),
            GameLayer::enemy(),
        ));
    }

    // Light
    commands.spawn((
        Transform::from_rotation(Quat::from_euler(EulerRot::ZYX, 0.0, 1.0, -PI / 4.)),
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        CascadeShadowConfigBuilder {
            first_cascade_far_bound: 200.0,
            maximum_distance: 400.0,
            ..default()
        }
        .build(),
    ));
}
