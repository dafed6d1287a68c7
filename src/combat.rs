use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::animation::{AnimationCue, AnimationTrigger};
use crate::character_controller::ControllerSet;
use crate::character_controller::states::PlayerMode;
use crate::player::Player;

pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<DamageEvent>()
            .add_event::<HealEvent>()
            .add_event::<StunEvent>()
            .add_event::<RecoverEvent>()
            .register_type::<Vitals>()
            .register_type::<Enemy>()
            .add_systems(
                Update,
                (
                    tick_hurt_windows,
                    enemy_attacks,
                    debug_combat_keys,
                    apply_damage,
                    apply_heals,
                    apply_stuns,
                    apply_recoveries,
                )
                    .chain()
                    .in_set(ControllerSet::Combat),
            );
    }
}

/// Anything that has health and can be hurt, healed, stunned or killed.
pub trait Damageable {
    fn current_health(&self) -> f32;
    fn max_health(&self) -> f32;
    fn is_dead(&self) -> bool;

    fn take_damage(&mut self, hit: &Hit) -> DamageOutcome;
    /// Returns `false` when the heal was refused.
    fn heal(&mut self, amount: f32) -> bool;
    /// Returns `false` when the stun was refused.
    fn stun(&mut self) -> bool;
    /// Returns `true` only for the call that actually killed.
    fn die(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Dead already, or inside the hurt window.
    Ignored,
    Hurt,
    Killed,
}

/// A single incoming hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub source: Option<Entity>,
    pub direction: Vec3,
    pub amount: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

impl Hit {
    pub fn new(amount: f32) -> Self {
        Self {
            source: None,
            direction: Vec3::ZERO,
            amount,
            point: Vec3::ZERO,
            normal: Vec3::Y,
        }
    }
}

/// Base combat stats loaded with the movement profile.
#[derive(Reflect, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PlayerStats {
    pub base_health: f32,
    /// Length of the hurt window in seconds.
    pub dont_hurt_time: f32,
    /// Length of the respawn clip in seconds.
    pub respawn_time: f32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            base_health: 100.0,
            dont_hurt_time: 1.0,
            respawn_time: 1.2,
        }
    }
}

/// Health pool plus the hurt / dead / stunned flags of one character.
#[derive(Component, Reflect, Debug, Clone)]
pub struct Vitals {
    health: f32,
    max_health: f32,
    hurting: bool,
    hurt_window: Timer,
    dead: bool,
    stunned: bool,
}

impl Vitals {
    pub fn new(stats: &PlayerStats) -> Self {
        let max_health = stats.base_health.max(0.0);
        Self {
            health: max_health,
            max_health,
            hurting: false,
            hurt_window: Timer::from_seconds(stats.dont_hurt_time.max(0.0), TimerMode::Once),
            dead: false,
            stunned: false,
        }
    }

    pub fn is_hurting(&self) -> bool {
        self.hurting
    }

    pub fn is_stunned(&self) -> bool {
        self.stunned
    }

    /// Clears a stun. Returns `false` if there was nothing to clear.
    pub fn recover(&mut self) -> bool {
        let was_stunned = self.stunned;
        self.stunned = false;
        was_stunned
    }

    /// Counts the hurt window down; it always closes once it runs out.
    pub fn tick_hurt_window(&mut self, delta: Duration) {
        if !self.hurting {
            return;
        }

        self.hurt_window.tick(delta);
        if self.hurt_window.finished() {
            self.hurting = false;
        }
    }
}

impl Damageable for Vitals {
    fn current_health(&self) -> f32 {
        self.health
    }

    fn max_health(&self) -> f32 {
        self.max_health
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn take_damage(&mut self, hit: &Hit) -> DamageOutcome {
        if self.dead || self.hurting {
            return DamageOutcome::Ignored;
        }

        self.hurting = true;
        self.hurt_window.reset();
        self.health = (self.health - hit.amount).max(0.0);

        if self.health <= 0.0 && self.die() {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Hurt
        }
    }

    fn heal(&mut self, amount: f32) -> bool {
        if self.dead {
            return false;
        }

        self.health = (self.health + amount).min(self.max_health);
        true
    }

    fn stun(&mut self) -> bool {
        if self.dead {
            return false;
        }

        self.stunned = true;
        true
    }

    fn die(&mut self) -> bool {
        if self.dead {
            return false;
        }

        self.health = 0.0;
        self.dead = true;
        true
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub target: Entity,
    pub hit: Hit,
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct HealEvent {
    pub target: Entity,
    pub amount: f32,
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct StunEvent {
    pub target: Entity,
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct RecoverEvent {
    pub target: Entity,
}

pub fn tick_hurt_windows(time: Res<Time>, mut query: Query<&mut Vitals>) {
    for mut vitals in &mut query {
        vitals.tick_hurt_window(time.delta());
    }
}

pub fn apply_damage(
    mut damage_events: EventReader<DamageEvent>,
    mut cues: EventWriter<AnimationCue>,
    mut query: Query<&mut Vitals>,
) {
    for event in damage_events.read() {
        let Ok(mut vitals) = query.get_mut(event.target) else {
            continue;
        };

        match vitals.take_damage(&event.hit) {
            DamageOutcome::Ignored => {}
            DamageOutcome::Hurt => {
                debug!(
                    "{} took {} damage, {} left",
                    event.target,
                    event.hit.amount,
                    vitals.current_health()
                );
                cues.write(AnimationCue::new(event.target, AnimationTrigger::Hurt));
            }
            DamageOutcome::Killed => {
                info!("{} died", event.target);
                cues.write(AnimationCue::new(event.target, AnimationTrigger::Hurt));
                cues.write(AnimationCue::new(event.target, AnimationTrigger::Death));
            }
        }
    }
}

pub fn apply_heals(mut heal_events: EventReader<HealEvent>, mut query: Query<&mut Vitals>) {
    for event in heal_events.read() {
        let Ok(mut vitals) = query.get_mut(event.target) else {
            continue;
        };

        if vitals.heal(event.amount) {
            debug!("{} healed to {}", event.target, vitals.current_health());
        }
    }
}

pub fn apply_stuns(
    mut stun_events: EventReader<StunEvent>,
    mut query: Query<(&mut Vitals, Option<&mut PlayerMode>)>,
) {
    for event in stun_events.read() {
        let Ok((mut vitals, mode)) = query.get_mut(event.target) else {
            continue;
        };

        if vitals.stun() {
            info!("{} stunned", event.target);
            if let Some(mut mode) = mode {
                *mode = PlayerMode::Stunned;
            }
        }
    }
}

pub fn apply_recoveries(mut recover_events: EventReader<RecoverEvent>, mut query: Query<&mut Vitals>) {
    for event in recover_events.read() {
        if let Ok(mut vitals) = query.get_mut(event.target) {
            if vitals.recover() {
                info!("{} recovered from stun", event.target);
            }
        }
    }
}

/// Melee enemy that swings at the player whenever it is close enough.
#[derive(Component, Reflect, Debug, Clone)]
pub struct Enemy {
    pub attack_range: f32,
    pub attack_damage: f32,
    pub attack_cooldown: Timer,
}

impl Default for Enemy {
    fn default() -> Self {
        Self {
            attack_range: 2.0,
            attack_damage: 5.0,
            attack_cooldown: Timer::from_seconds(1.5, TimerMode::Once),
        }
    }
}

pub fn enemy_attacks(
    time: Res<Time>,
    mut damage_events: EventWriter<DamageEvent>,
    player_query: Query<(Entity, &Transform, &PlayerMode, &Vitals), With<Player>>,
    mut enemies: Query<(Entity, &Transform, &mut Enemy), Without<Player>>,
) {
    let Ok((player, player_transform, mode, vitals)) = player_query.single() else {
        return;
    };

    for (entity, transform, mut enemy) in &mut enemies {
        enemy.attack_cooldown.tick(time.delta());

        let distance = transform.translation.distance(player_transform.translation);
        if distance > enemy.attack_range || !enemy.attack_cooldown.finished() {
            continue;
        }
        enemy.attack_cooldown.reset();

        if !mode.can_be_attacked() || vitals.is_dead() || vitals.is_stunned() {
            continue;
        }

        let direction = (player_transform.translation - transform.translation).normalize_or_zero();
        damage_events.write(DamageEvent {
            target: player,
            hit: Hit {
                source: Some(entity),
                direction,
                amount: enemy.attack_damage,
                point: player_transform.translation,
                normal: Vec3::Y,
            },
        });
    }
}

/// Amount restored by the debug heal key.
const DEBUG_HEAL_AMOUNT: f32 = 25.0;

/// F5 heals, F6 stuns and F7 recovers the player.
pub fn debug_combat_keys(
    keyboard_input: Res<ButtonInput<KeyCode>>,
    player_query: Query<Entity, With<Player>>,
    mut heals: EventWriter<HealEvent>,
    mut stuns: EventWriter<StunEvent>,
    mut recoveries: EventWriter<RecoverEvent>,
) {
    let Ok(target) = player_query.single() else {
        return;
    };

    if keyboard_input.just_pressed(KeyCode::F5) {
        heals.write(HealEvent {
            target,
            amount: DEBUG_HEAL_AMOUNT,
        });
    }
    if keyboard_input.just_pressed(KeyCode::F6) {
        stuns.write(StunEvent { target });
    }
    if keyboard_input.just_pressed(KeyCode::F7) {
        recoveries.write(RecoverEvent { target });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(health: f32) -> Vitals {
        Vitals::new(&PlayerStats {
            base_health: health,
            ..default()
        })
    }

    #[test]
    fn test_damage_subtracts_and_opens_window() {
        let mut vitals = vitals(100.0);

        assert_eq!(vitals.take_damage(&Hit::new(30.0)), DamageOutcome::Hurt);
        assert_eq!(vitals.current_health(), 70.0);
        assert!(vitals.is_hurting());
        assert!(!vitals.is_dead());
    }

    #[test]
    fn test_damage_inside_hurt_window_is_ignored() {
        let mut vitals = vitals(100.0);
        vitals.take_damage(&Hit::new(10.0));
        vitals.tick_hurt_window(Duration::from_millis(600));

        assert_eq!(vitals.take_damage(&Hit::new(10.0)), DamageOutcome::Ignored);
        assert_eq!(vitals.current_health(), 90.0);

        // The window was not restarted by the ignored hit
        vitals.tick_hurt_window(Duration::from_millis(500));
        assert!(!vitals.is_hurting());
        assert_eq!(vitals.take_damage(&Hit::new(10.0)), DamageOutcome::Hurt);
        assert_eq!(vitals.current_health(), 80.0);
    }

    #[test]
    fn test_overkill_floors_at_zero_and_dies_once() {
        let mut vitals = vitals(100.0);

        assert_eq!(vitals.take_damage(&Hit::new(150.0)), DamageOutcome::Killed);
        assert_eq!(vitals.current_health(), 0.0);
        assert!(vitals.is_dead());

        assert!(!vitals.die(), "second death is a no-op");
        vitals.tick_hurt_window(Duration::from_secs(2));
        assert_eq!(vitals.take_damage(&Hit::new(5.0)), DamageOutcome::Ignored);
    }

    #[test]
    fn test_damage_matches_saturating_subtraction() {
        for (health, amount) in [(100.0, 1.0), (100.0, 99.5), (40.0, 40.0), (10.0, 250.0)] {
            let mut vitals = vitals(health);
            let outcome = vitals.take_damage(&Hit::new(amount));

            let expected = f32::max(0.0, health - amount);
            assert_eq!(vitals.current_health(), expected);
            assert_eq!(vitals.is_dead(), expected == 0.0);
            assert_eq!(outcome == DamageOutcome::Killed, expected == 0.0);
        }
    }

    #[test]
    fn test_heal_clamps_and_refuses_the_dead() {
        let mut vitals = vitals(100.0);
        vitals.take_damage(&Hit::new(50.0));

        assert!(vitals.heal(80.0));
        assert_eq!(vitals.current_health(), 100.0);

        vitals.die();
        assert!(!vitals.heal(50.0));
        assert_eq!(vitals.current_health(), 0.0);
    }

    #[test]
    fn test_stun_is_sticky_until_recovered() {
        let mut vitals = vitals(100.0);

        assert!(vitals.stun());
        vitals.tick_hurt_window(Duration::from_secs(10));
        assert!(vitals.is_stunned());

        assert!(vitals.recover());
        assert!(!vitals.is_stunned());
        assert!(!vitals.recover());
    }

    #[test]
    fn test_dead_cannot_be_stunned() {
        let mut vitals = vitals(100.0);
        vitals.die();

        assert!(!vitals.stun());
        assert!(!vitals.is_stunned());
    }

    fn combat_app() -> App {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app.init_resource::<ButtonInput<KeyCode>>();
        app.add_event::<DamageEvent>()
            .add_event::<HealEvent>()
            .add_event::<StunEvent>()
            .add_event::<RecoverEvent>()
            .add_event::<AnimationCue>();
        app.add_systems(
            Update,
            (
                tick_hurt_windows,
                enemy_attacks,
                debug_combat_keys,
                apply_damage,
                apply_heals,
                apply_stuns,
                apply_recoveries,
            )
                .chain(),
        );
        app
    }

    fn advance(app: &mut App, millis: u64) {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(millis));
        app.update();
    }

    fn cues(app: &mut App) -> Vec<AnimationTrigger> {
        app.world_mut()
            .resource_mut::<Events<AnimationCue>>()
            .drain()
            .map(|cue| cue.trigger)
            .collect()
    }

    #[test]
    fn test_fatal_damage_fires_death_cue_once() {
        let mut app = combat_app();
        let player = app.world_mut().spawn(vitals(100.0)).id();

        app.world_mut().send_event(DamageEvent {
            target: player,
            hit: Hit::new(150.0),
        });
        advance(&mut app, 16);

        app.world_mut().send_event(DamageEvent {
            target: player,
            hit: Hit::new(150.0),
        });
        advance(&mut app, 2000);

        assert_eq!(cues(&mut app), vec![AnimationTrigger::Hurt, AnimationTrigger::Death]);
        let vitals = app.world().get::<Vitals>(player).unwrap();
        assert!(vitals.is_dead());
        assert_eq!(vitals.current_health(), 0.0);
    }

    #[test]
    fn test_stun_event_sets_mode() {
        let mut app = combat_app();
        let player = app
            .world_mut()
            .spawn((vitals(100.0), PlayerMode::Running))
            .id();

        app.world_mut().send_event(StunEvent { target: player });
        advance(&mut app, 16);
        assert_eq!(*app.world().get::<PlayerMode>(player).unwrap(), PlayerMode::Stunned);

        app.world_mut().send_event(RecoverEvent { target: player });
        advance(&mut app, 16);
        assert!(!app.world().get::<Vitals>(player).unwrap().is_stunned());
    }

    #[test]
    fn test_enemy_attacks_in_range_on_cooldown() {
        let mut app = combat_app();
        let player = app
            .world_mut()
            .spawn((Player, Transform::default(), PlayerMode::Idle, vitals(100.0)))
            .id();
        app.world_mut()
            .spawn((Transform::from_xyz(1.5, 0.0, 0.0), Enemy::default()));
        app.world_mut()
            .spawn((Transform::from_xyz(10.0, 0.0, 0.0), Enemy::default()));

        // Cooldown has not run out yet
        advance(&mut app, 1000);
        assert_eq!(app.world().get::<Vitals>(player).unwrap().current_health(), 100.0);

        advance(&mut app, 600);
        assert_eq!(
            app.world().get::<Vitals>(player).unwrap().current_health(),
            95.0,
            "only the enemy in range hits"
        );
        assert_eq!(cues(&mut app), vec![AnimationTrigger::Hurt]);
    }

    #[test]
    fn test_enemy_skips_dead_player() {
        let mut app = combat_app();
        let mut dead = vitals(100.0);
        dead.die();
        app.world_mut()
            .spawn((Player, Transform::default(), PlayerMode::Death, dead));
        app.world_mut().spawn((Transform::from_xyz(1.0, 0.0, 0.0), Enemy::default()));

        advance(&mut app, 1600);

        assert!(app.world().resource::<Events<DamageEvent>>().is_empty());
    }

    #[test]
    fn test_enemy_skips_player_killed_during_hurt_window() {
        let mut app = combat_app();
        let mut killed = vitals(100.0);
        killed.take_damage(&Hit::new(150.0));
        app.world_mut()
            .spawn((Player, Transform::default(), PlayerMode::Hurt, killed));
        app.world_mut().spawn((Transform::from_xyz(1.0, 0.0, 0.0), Enemy::default()));

        advance(&mut app, 1600);

        assert!(app.world().resource::<Events<DamageEvent>>().is_empty());
    }

    fn press(app: &mut App, key: KeyCode) {
        let mut keys = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
        keys.clear();
        keys.release_all();
        keys.press(key);
    }

    #[test]
    fn test_debug_keys_reach_heal_stun_and_recover() {
        let mut app = combat_app();
        let mut hurt = vitals(100.0);
        hurt.take_damage(&Hit::new(60.0));
        let player = app
            .world_mut()
            .spawn((Player, Transform::default(), PlayerMode::Idle, hurt))
            .id();

        press(&mut app, KeyCode::F5);
        advance(&mut app, 16);
        assert_eq!(app.world().get::<Vitals>(player).unwrap().current_health(), 65.0);

        press(&mut app, KeyCode::F6);
        advance(&mut app, 16);
        assert!(app.world().get::<Vitals>(player).unwrap().is_stunned());
        assert_eq!(*app.world().get::<PlayerMode>(player).unwrap(), PlayerMode::Stunned);

        press(&mut app, KeyCode::F7);
        advance(&mut app, 16);
        assert!(!app.world().get::<Vitals>(player).unwrap().is_stunned());
    }
}
