use std::collections::HashMap;

use bevy::prelude::*;

use crate::animation::{AnimationCue, AnimationTrigger};
use crate::character_controller::ControllerSet;
use crate::character_controller::states::PlayerMode;
use crate::combat::{Damageable, Vitals};
use crate::player::Player;

/// Delay between spawning and the starter sword showing up in hand.
pub const STARTER_WEAPON_DELAY: f32 = 1.5;

pub struct WeaponPlugin;

impl Plugin for WeaponPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<WeaponCommand>()
            .register_type::<WeaponSlot>()
            .register_type::<Weapon>()
            .add_systems(
                Update,
                (spawn_pending_weapons, apply_weapon_commands, attack_input)
                    .chain()
                    .in_set(ControllerSet::Combat),
            );
    }
}

#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponSlot {
    RightHand,
    LeftHand,
    Back,
    Hip,
}

impl WeaponSlot {
    pub const ALL: [WeaponSlot; 4] = [
        WeaponSlot::RightHand,
        WeaponSlot::LeftHand,
        WeaponSlot::Back,
        WeaponSlot::Hip,
    ];

    /// Local offset of the socket from the character origin.
    pub fn offset(self) -> Vec3 {
        match self {
            WeaponSlot::RightHand => Vec3::new(0.4, 0.1, -0.2),
            WeaponSlot::LeftHand => Vec3::new(-0.4, 0.1, -0.2),
            WeaponSlot::Back => Vec3::new(0.0, 0.4, 0.3),
            WeaponSlot::Hip => Vec3::new(0.35, -0.3, 0.0),
        }
    }
}

#[derive(Component, Reflect, Debug, Clone)]
pub struct Weapon {
    pub name: String,
}

/// Marks a socket entity.
#[derive(Component, Debug, Clone, Copy)]
pub struct WeaponSocket(pub WeaponSlot);

/// Which socket entity backs each slot and which weapon sits in it.
#[derive(Component, Debug, Default, Clone)]
pub struct WeaponSockets {
    sockets: HashMap<WeaponSlot, Entity>,
    weapons: HashMap<WeaponSlot, Entity>,
}

impl WeaponSockets {
    pub fn insert_socket(&mut self, slot: WeaponSlot, socket: Entity) {
        self.sockets.insert(slot, socket);
    }

    pub fn socket(&self, slot: WeaponSlot) -> Option<Entity> {
        self.sockets.get(&slot).copied()
    }

    pub fn weapon_in(&self, slot: WeaponSlot) -> Option<Entity> {
        self.weapons.get(&slot).copied()
    }

    pub fn slot_of(&self, weapon: Entity) -> Option<WeaponSlot> {
        self.weapons
            .iter()
            .find_map(|(slot, held)| (*held == weapon).then_some(*slot))
    }

    /// Puts `weapon` into `slot`, taking it out of any other slot first.
    /// Returns the weapon it displaced. Slots without a socket are refused
    /// and hand the weapon straight back.
    pub fn equip(&mut self, slot: WeaponSlot, weapon: Entity) -> Option<Entity> {
        if !self.sockets.contains_key(&slot) {
            return Some(weapon);
        }

        if let Some(previous) = self.slot_of(weapon) {
            self.weapons.remove(&previous);
        }

        self.weapons.insert(slot, weapon)
    }

    pub fn unequip(&mut self, slot: WeaponSlot) -> Option<Entity> {
        self.weapons.remove(&slot)
    }

    /// Moves the weapon in `from` to `to`, swapping if `to` is occupied.
    pub fn transfer(&mut self, from: WeaponSlot, to: WeaponSlot) -> bool {
        if from == to || !self.sockets.contains_key(&to) {
            return false;
        }
        let Some(weapon) = self.weapons.remove(&from) else {
            return false;
        };

        if let Some(displaced) = self.weapons.insert(to, weapon) {
            self.weapons.insert(from, displaced);
        }
        true
    }
}

/// Whether an actor in `mode` may swing what it holds in its right hand.
/// The dead and the stunned never can, whatever mode they are shown in.
pub fn attack_permitted(mode: PlayerMode, vitals: &Vitals, sockets: &WeaponSockets) -> bool {
    mode.can_attack()
        && !vitals.is_dead()
        && !vitals.is_stunned()
        && sockets.weapon_in(WeaponSlot::RightHand).is_some()
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponCommand {
    Equip {
        owner: Entity,
        slot: WeaponSlot,
        weapon: Entity,
    },
    Unequip {
        owner: Entity,
        slot: WeaponSlot,
    },
    Transfer {
        owner: Entity,
        from: WeaponSlot,
        to: WeaponSlot,
    },
}

/// Spawns a weapon into a slot once its timer runs out.
#[derive(Component, Debug, Clone)]
pub struct PendingWeapon {
    pub name: String,
    pub slot: WeaponSlot,
    pub timer: Timer,
}

impl PendingWeapon {
    pub fn starter_sword() -> Self {
        Self {
            name: "Sword".to_string(),
            slot: WeaponSlot::RightHand,
            timer: Timer::from_seconds(STARTER_WEAPON_DELAY, TimerMode::Once),
        }
    }
}

/// Spawns the socket children of a character and returns the filled map.
pub fn spawn_sockets(commands: &mut Commands, owner: Entity) -> WeaponSockets {
    let mut sockets = WeaponSockets::default();
    for slot in WeaponSlot::ALL {
        let socket = commands
            .spawn((
                Name::new(format!("{slot:?} socket")),
                WeaponSocket(slot),
                Transform::from_translation(slot.offset()),
                Visibility::default(),
                ChildOf(owner),
            ))
            .id();
        sockets.insert_socket(slot, socket);
    }
    sockets
}

pub fn spawn_pending_weapons(
    mut commands: Commands,
    time: Res<Time>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut commands_writer: EventWriter<WeaponCommand>,
    mut query: Query<(Entity, &mut PendingWeapon)>,
) {
    for (owner, mut pending) in &mut query {
        pending.timer.tick(time.delta());
        if !pending.timer.finished() {
            continue;
        }

        let weapon = commands
            .spawn((
                Name::new(pending.name.clone()),
                Weapon {
                    name: pending.name.clone(),
                },
                Mesh3d(meshes.add(Cuboid::new(0.08, 0.08, 0.9))),
                MeshMaterial3d(materials.add(Color::srgb(0.75, 0.75, 0.8))),
                Transform::default(),
                Visibility::Hidden,
            ))
            .id();

        info!("{} spawned into {:?}", pending.name, pending.slot);
        commands_writer.write(WeaponCommand::Equip {
            owner,
            slot: pending.slot,
            weapon,
        });
        commands.entity(owner).remove::<PendingWeapon>();
    }
}

fn stow(commands: &mut Commands, weapon: Entity) {
    commands
        .entity(weapon)
        .remove::<ChildOf>()
        .insert(Visibility::Hidden);
}

fn mount(commands: &mut Commands, weapon: Entity, socket: Entity) {
    commands
        .entity(weapon)
        .insert((ChildOf(socket), Transform::default(), Visibility::Inherited));
}

/// Applies equip / unequip / transfer requests and re-parents the weapons.
pub fn apply_weapon_commands(
    mut commands: Commands,
    mut requests: EventReader<WeaponCommand>,
    mut owners: Query<&mut WeaponSockets>,
) {
    for request in requests.read() {
        match *request {
            WeaponCommand::Equip { owner, slot, weapon } => {
                let Ok(mut sockets) = owners.get_mut(owner) else {
                    continue;
                };
                let Some(socket) = sockets.socket(slot) else {
                    warn!("{owner} has no {slot:?} socket");
                    continue;
                };

                if let Some(displaced) = sockets.equip(slot, weapon) {
                    stow(&mut commands, displaced);
                }
                mount(&mut commands, weapon, socket);
            }
            WeaponCommand::Unequip { owner, slot } => {
                let Ok(mut sockets) = owners.get_mut(owner) else {
                    continue;
                };
                if let Some(weapon) = sockets.unequip(slot) {
                    stow(&mut commands, weapon);
                }
            }
            WeaponCommand::Transfer { owner, from, to } => {
                let Ok(mut sockets) = owners.get_mut(owner) else {
                    continue;
                };
                if !sockets.transfer(from, to) {
                    continue;
                }

                for slot in [from, to] {
                    if let (Some(weapon), Some(socket)) = (sockets.weapon_in(slot), sockets.socket(slot)) {
                        mount(&mut commands, weapon, socket);
                    }
                }
            }
        }
    }
}

/// Left mouse button or gamepad West swings the equipped weapon.
pub fn attack_input(
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    gamepads: Query<&Gamepad>,
    mut cues: EventWriter<AnimationCue>,
    player_query: Query<(Entity, &PlayerMode, &Vitals, &WeaponSockets), With<Player>>,
) {
    let pressed = mouse_buttons.just_pressed(MouseButton::Left)
        || gamepads.iter().any(|gamepad| gamepad.just_pressed(GamepadButton::West));
    if !pressed {
        return;
    }

    let Ok((entity, mode, vitals, sockets)) = player_query.single() else {
        return;
    };

    if attack_permitted(*mode, vitals, sockets) {
        cues.write(AnimationCue::new(entity, AnimationTrigger::Attack));
    } else {
        debug!("attack refused in {:?}", mode);
    }
}
