use std::time::Duration;

use avian3d::math::{Scalar, Vector};
use bevy::prelude::*;

use crate::animation::{AnimationCue, AnimationTrigger};
use crate::character_controller::MovementAction;
use crate::character_controller::components::*;
use crate::character_controller::states::{ModeFlags, movement_permitted};
use crate::combat::Vitals;

/// Timed burst of movement with a cooldown.
///
/// The roll duration and the cooldown start together and run independently:
/// when the cooldown is shorter than the roll, a new roll becomes available
/// before the current one ends.
#[derive(Reflect, Clone, Debug)]
pub struct RollManeuver {
    can_roll: bool,
    is_rolling: bool,
    direction: Vector,
    active: Timer,
    cooldown: Timer,
}

impl Default for RollManeuver {
    fn default() -> Self {
        Self {
            can_roll: true,
            is_rolling: false,
            direction: Vector::NEG_Z,
            active: Timer::default(),
            cooldown: Timer::default(),
        }
    }
}

impl RollManeuver {
    pub fn can_roll(&self) -> bool {
        self.can_roll
    }

    pub fn is_rolling(&self) -> bool {
        self.is_rolling
    }

    pub fn direction(&self) -> Vector {
        self.direction
    }

    /// Starts a roll along `direction`. Returns `false` (and changes nothing)
    /// while the cooldown is still running.
    pub fn try_start(&mut self, direction: Vector, profile: &MovementProfile) -> bool {
        if !self.can_roll {
            return false;
        }

        self.can_roll = false;
        self.is_rolling = true;
        self.direction = direction.normalize_or(Vector::NEG_Z);
        self.active = Timer::from_seconds(profile.rolling_time, TimerMode::Once);
        self.cooldown = Timer::from_seconds(profile.roll_cooling_time, TimerMode::Once);
        true
    }

    /// Advances both countdowns. Expiry always resolves, whatever happened to
    /// the flags in between.
    pub fn tick(&mut self, delta: Duration) {
        if self.is_rolling {
            self.active.tick(delta);
            if self.active.finished() {
                self.is_rolling = false;
            }
        }

        if !self.can_roll {
            self.cooldown.tick(delta);
            if self.cooldown.finished() {
                self.can_roll = true;
            }
        }
    }

    /// Roll displacement velocity while a roll is active.
    pub fn velocity(&self, roll_speed: Scalar) -> Option<Vector> {
        self.is_rolling.then(|| self.direction * roll_speed)
    }
}

/// Direction captured when a roll starts: along the current movement if the
/// character is moving, along its facing otherwise.
pub fn roll_direction(planar_velocity: Vector, facing: Quat) -> Vector {
    if planar_velocity.length() > MOVE_INPUT_DEADZONE {
        return planar_velocity.normalize();
    }

    let forward = facing * Vector::NEG_Z;
    Vector::new(forward.x, 0.0, forward.z).normalize_or(Vector::NEG_Z)
}

pub fn tick_rolls(time: Res<Time>, mut query: Query<&mut MovementState, With<CharacterController>>) {
    for mut state in &mut query {
        state.roll.tick(time.delta());
    }
}

/// Starts a roll for every controller when a roll was requested this frame.
pub fn start_roll(
    mut movement_events: EventReader<MovementAction>,
    mut cues: EventWriter<AnimationCue>,
    mut query: Query<
        (Entity, &MovementProfile, &Vitals, &Transform, &mut MovementState),
        With<CharacterController>,
    >,
) {
    let roll_requested = movement_events
        .read()
        .any(|event| matches!(event, MovementAction::Roll));
    if !roll_requested {
        return;
    }

    for (entity, profile, vitals, transform, mut state) in &mut query {
        if !movement_permitted(ModeFlags::gather(&state, vitals)) {
            debug!("roll ignored for {entity}: movement not permitted");
            continue;
        }

        let direction = roll_direction(state.planar_velocity, transform.rotation);
        if state.roll.try_start(direction, profile) {
            debug!("{entity} rolling towards {direction}");
            cues.write(AnimationCue::new(entity, AnimationTrigger::Roll));
        } else {
            debug!("roll ignored for {entity}: cooling down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::PlayerStats;

    fn profile(rolling_time: f32, roll_cooling_time: f32) -> MovementProfile {
        MovementProfile {
            rolling_time,
            roll_cooling_time,
            ..default()
        }
    }

    #[test]
    fn test_roll_starts_when_ready() {
        let mut roll = RollManeuver::default();

        assert!(roll.try_start(Vec3::X * 3.0, &profile(0.4, 1.0)));
        assert!(roll.is_rolling());
        assert!(!roll.can_roll());
        assert_eq!(roll.direction(), Vec3::X);
    }

    #[test]
    fn test_roll_rejected_while_cooling() {
        let profile = profile(0.4, 1.0);
        let mut roll = RollManeuver::default();
        roll.try_start(Vec3::X, &profile);

        // Let the roll itself end, cooldown still running
        roll.tick(Duration::from_millis(500));
        assert!(!roll.is_rolling());
        assert!(!roll.can_roll());

        assert!(!roll.try_start(Vec3::Z, &profile));
        assert!(!roll.is_rolling(), "a rejected roll must never set is_rolling");
        assert_eq!(roll.direction(), Vec3::X);
    }

    #[test]
    fn test_short_cooldown_frees_roll_before_it_ends() {
        let mut roll = RollManeuver::default();
        roll.try_start(Vec3::X, &profile(0.4, 0.2));

        roll.tick(Duration::from_millis(250));

        assert!(roll.can_roll(), "cooldown runs in parallel with the roll");
        assert!(roll.is_rolling());

        roll.tick(Duration::from_millis(200));
        assert!(!roll.is_rolling());
    }

    #[test]
    fn test_cooldown_longer_than_roll() {
        let mut roll = RollManeuver::default();
        roll.try_start(Vec3::X, &profile(0.4, 1.0));

        roll.tick(Duration::from_millis(450));
        assert!(!roll.is_rolling());
        assert!(!roll.can_roll());

        roll.tick(Duration::from_millis(600));
        assert!(roll.can_roll());
    }

    #[test]
    fn test_roll_velocity_only_while_rolling() {
        let mut roll = RollManeuver::default();
        assert_eq!(roll.velocity(8.0), None);

        roll.try_start(Vec3::Z, &profile(0.4, 1.0));
        assert_eq!(roll.velocity(8.0), Some(Vec3::Z * 8.0));
    }

    #[test]
    fn test_roll_direction_prefers_movement() {
        let direction = roll_direction(Vec3::new(0.0, 0.0, 4.0), Quat::IDENTITY);
        assert_eq!(direction, Vec3::Z);
    }

    #[test]
    fn test_roll_direction_falls_back_to_facing() {
        let facing = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let direction = roll_direction(Vec3::new(0.05, 0.0, 0.0), facing);

        assert!((direction - Vec3::NEG_X).length() < 1e-5, "got {direction}");
    }

    #[test]
    fn test_start_roll_system_emits_cue_once() {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app.add_event::<MovementAction>();
        app.add_event::<AnimationCue>();
        app.add_systems(Update, (tick_rolls, start_roll).chain());

        let entity = app
            .world_mut()
            .spawn((
                CharacterController,
                Transform::default(),
                Vitals::new(&PlayerStats::default()),
                MovementState {
                    ready_to_move: true,
                    ..default()
                },
            ))
            .id();

        app.world_mut().send_event(MovementAction::Roll);
        app.update();
        assert!(app.world().get::<MovementState>(entity).unwrap().roll.is_rolling());

        // Still cooling down, the second request is dropped
        app.world_mut().send_event(MovementAction::Roll);
        app.update();

        let cues: Vec<AnimationCue> = app
            .world_mut()
            .resource_mut::<Events<AnimationCue>>()
            .drain()
            .collect();
        assert_eq!(cues, vec![AnimationCue::new(entity, AnimationTrigger::Roll)]);
    }

    #[test]
    fn test_start_roll_ignored_while_respawning() {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app.add_event::<MovementAction>();
        app.add_event::<AnimationCue>();
        app.add_systems(Update, start_roll);

        let entity = app
            .world_mut()
            .spawn((
                CharacterController,
                Transform::default(),
                Vitals::new(&PlayerStats::default()),
            ))
            .id();

        app.world_mut().send_event(MovementAction::Roll);
        app.update();

        let state = app.world().get::<MovementState>(entity).unwrap();
        assert!(!state.roll.is_rolling());
        assert!(state.roll.can_roll());
    }
}
