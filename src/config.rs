//! Tunables loaded from `assets/config/player.ron`.
//!
//! Every section and field is optional; anything missing keeps its default.
//! A missing or malformed file is logged and replaced by the defaults.
use std::{fs, path::Path};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::character_controller::components::MovementProfile;
use crate::character_controller::input::InputSettings;
use crate::combat::PlayerStats;

pub const CONFIG_PATH: &str = "assets/config/player.ron";

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<InputSettings>()
            .add_systems(PreStartup, load_game_config);
    }
}

#[derive(Resource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub movement: MovementProfile,
    pub stats: PlayerStats,
    pub input: InputSettings,
}

pub fn parse_config(source: &str) -> Result<GameConfig, ron::error::SpannedError> {
    ron::from_str(source)
}

/// Reads and parses `path`, falling back to [`GameConfig::default`].
#[must_use]
pub fn load_config(path: impl AsRef<Path>) -> GameConfig {
    let path = path.as_ref();

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            warn!("could not read {}: {err}, using defaults", path.display());
            return GameConfig::default();
        }
    };

    match parse_config(&source) {
        Ok(config) => {
            info!("loaded {}", path.display());
            config
        }
        Err(err) => {
            warn!("could not parse {}: {err}, using defaults", path.display());
            GameConfig::default()
        }
    }
}

pub fn load_game_config(mut commands: Commands) {
    let config = load_config(CONFIG_PATH);
    commands.insert_resource(config.input.clone());
    commands.insert_resource(config);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_config("(movement: (walk_speed: 3.5), stats: (base_health: 40.0))").unwrap();

        assert_eq!(config.movement.walk_speed, 3.5);
        assert_eq!(config.movement.run_speed, MovementProfile::default().run_speed);
        assert_eq!(config.stats.base_health, 40.0);
        assert_eq!(config.stats.dont_hurt_time, 1.0);
        assert_eq!(config.input, InputSettings::default());
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_config("()").unwrap(), GameConfig::default());
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(parse_config("(movement: (walk_speed: \"fast\"))").is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        assert_eq!(load_config("does/not/exist.ron"), GameConfig::default());
    }

    #[test]
    fn test_shipped_config_parses() {
        let source = include_str!("../assets/config/player.ron");
        let config = parse_config(source).unwrap();

        assert_eq!(config.movement, MovementProfile::default());
        assert_eq!(config.stats, PlayerStats::default());
    }
}
