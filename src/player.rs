//! The player character.
//!
//! Spawns a capsule driven by the character controller, with its vitals,
//! animation parameters and weapon sockets. The respawn clip plays first; the
//! player can move once it has finished, and the starter sword is handed over
//! shortly after spawning.

use avian3d::prelude::*;
use bevy::prelude::*;

use crate::animation::{LocomotionAnimation, RespawnClip};
use crate::character_controller::components::CharacterController;
use crate::character_controller::states::PlayerMode;
use crate::combat::Vitals;
use crate::config::GameConfig;
use crate::physics::GameLayer;
use crate::weapon::{PendingWeapon, spawn_sockets};

const CAPSULE_RADIUS: f32 = 0.3;
const CAPSULE_LENGTH: f32 = 1.0;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<Player>()
            .add_systems(Startup, setup);
    }
}

#[derive(Component, Reflect, Debug, Default)]
pub struct Player;

fn setup(
    mut commands: Commands,
    config: Option<Res<GameConfig>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let config = config.as_deref().cloned().unwrap_or_default();

    let player = commands
        .spawn((
            Name::new("Player"),
            Player,
            Mesh3d(meshes.add(Capsule3d::new(CAPSULE_RADIUS, CAPSULE_LENGTH))),
            MeshMaterial3d(materials.add(Color::srgb(0.8, 0.7, 0.6))),
            Transform::from_xyz(0.0, 1.5, 0.0),
            CharacterController::new(CAPSULE_RADIUS, CAPSULE_LENGTH),
            config.movement,
            Vitals::new(&config.stats),
            PlayerMode::default(),
            LocomotionAnimation::default(),
            RespawnClip::new(config.stats.respawn_time),
            GameLayer::player(),
            Friction::ZERO.with_combine_rule(CoefficientCombine::Min),
            Restitution::ZERO.with_combine_rule(CoefficientCombine::Min),
        ))
        .id();

    let sockets = spawn_sockets(&mut commands, player);
    commands
        .entity(player)
        .insert((sockets, PendingWeapon::starter_sword()));

    info!("player spawned, respawning for {}s", config.stats.respawn_time);
}
