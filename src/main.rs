mod animation;
mod camera;
mod character_controller;
mod combat;
mod config;
mod physics;
mod player;
mod weapon;
mod world;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_inspector_egui::bevy_egui::EguiPlugin;
use bevy_inspector_egui::quick::WorldInspectorPlugin;

fn main() {
    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Top Down RPG".into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(LogPlugin {
                    filter: "wgpu=error,naga=warn,topdown_rpg=debug".into(),
                    ..default()
                }),
        )
        .add_plugins(EguiPlugin {
            enable_multipass_for_primary_context: true,
        })
        .add_plugins(WorldInspectorPlugin::new())
        .add_plugins(config::ConfigPlugin)
        .add_plugins(physics::PhysicsPlugin)
        .add_plugins(character_controller::CharacterControllerPlugin)
        .add_plugins(combat::CombatPlugin)
        .add_plugins(animation::AnimationPlugin)
        .add_plugins(weapon::WeaponPlugin)
        .add_plugins(camera::CameraPlugin)
        .add_plugins(player::PlayerPlugin)
        .add_plugins(world::WorldPlugin)
        .run();
}
