use avian3d::prelude::*;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub(crate) struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PhysicsPlugins::default())
            .register_type::<GameLayer>();
    }
}

/// Collision layers used by the game.
///
/// The ground probes only look at [`GameLayer::Ground`], so anything the
/// player should be able to stand on has to be a member of it.
#[derive(PhysicsLayer, Reflect, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GameLayer {
    #[default]
    Default,
    Ground,
    Player,
    Enemy,
}

impl GameLayer {
    pub fn ground() -> CollisionLayers {
        CollisionLayers::new(GameLayer::Ground, LayerMask::ALL)
    }

    pub fn player() -> CollisionLayers {
        CollisionLayers::new(
            GameLayer::Player,
            [GameLayer::Default, GameLayer::Ground, GameLayer::Enemy],
        )
    }

    pub fn enemy() -> CollisionLayers {
        CollisionLayers::new(GameLayer::Enemy, LayerMask::ALL)
    }
}
