use bevy::prelude::*;

use crate::character_controller::ControllerSet;
use crate::character_controller::components::MovementState;
use crate::character_controller::states::finish_respawn;

pub struct AnimationPlugin;

impl Plugin for AnimationPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<AnimationCue>()
            .add_event::<RespawnAnimationFinished>()
            .register_type::<LocomotionAnimation>()
            .register_type::<RespawnClip>()
            .add_systems(
                Update,
                (
                    tick_respawn_clips
                        .in_set(ControllerSet::Mode)
                        .before(finish_respawn),
                    (drive_locomotion_parameters, play_cues).in_set(ControllerSet::Apply),
                ),
            );
    }
}

/// One-shot animation triggers.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationTrigger {
    Roll,
    Hurt,
    Death,
    Attack,
}

/// Fire-and-forget trigger aimed at one character's animator.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationCue {
    pub entity: Entity,
    pub trigger: AnimationTrigger,
}

impl AnimationCue {
    pub fn new(entity: Entity, trigger: AnimationTrigger) -> Self {
        Self { entity, trigger }
    }
}

/// Sent when a character's respawn clip has played to the end.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RespawnAnimationFinished {
    pub entity: Entity,
}

/// Continuous animator parameters, refreshed every frame.
#[derive(Component, Reflect, Debug, Clone, Default, PartialEq)]
pub struct LocomotionAnimation {
    pub grounded: bool,
    pub forward_speed: f32,
    pub angle_delta: f32,
    pub last_trigger: Option<AnimationTrigger>,
}

/// Plays the respawn clip once, then reports back.
#[derive(Component, Reflect, Debug, Clone)]
pub struct RespawnClip(pub Timer);

impl RespawnClip {
    pub fn new(seconds: f32) -> Self {
        Self(Timer::from_seconds(seconds.max(0.0), TimerMode::Once))
    }
}

pub fn tick_respawn_clips(
    mut commands: Commands,
    time: Res<Time>,
    mut finished: EventWriter<RespawnAnimationFinished>,
    mut query: Query<(Entity, &mut RespawnClip)>,
) {
    for (entity, mut clip) in &mut query {
        clip.0.tick(time.delta());
        if clip.0.just_finished() {
            finished.write(RespawnAnimationFinished { entity });
            commands.entity(entity).remove::<RespawnClip>();
        }
    }
}

pub fn drive_locomotion_parameters(mut query: Query<(&MovementState, &mut LocomotionAnimation)>) {
    for (state, mut animation) in &mut query {
        animation.grounded = state.ground.grounded;
        animation.forward_speed = state.speed;
        animation.angle_delta = state.angle_delta;
    }
}

pub fn play_cues(mut cues: EventReader<AnimationCue>, mut query: Query<&mut LocomotionAnimation>) {
    for cue in cues.read() {
        let Ok(mut animation) = query.get_mut(cue.entity) else {
            continue;
        };

        debug!("{} plays {:?}", cue.entity, cue.trigger);
        animation.last_trigger = Some(cue.trigger);
    }
}
