use avian3d::math::{Scalar, Vector2};
use bevy::input::ButtonInput;
use bevy::input::touch::Touches;
use bevy::prelude::{
    EventWriter, Gamepad, GamepadAxis, GamepadButton, KeyCode, Query, Res, ResMut, Resource, Window, With, info,
};
use bevy::reflect::Reflect;
use bevy::window::PrimaryWindow;
use serde::{Deserialize, Serialize};

use crate::character_controller::{ControllerDebug, MovementAction};

/// A device that can steer the player.
///
/// Only one source is authoritative at a time, picked by
/// [`InputSettings::mobile_enabled`].
pub trait InputSource {
    /// Stick direction, each axis in `[-1, 1]`.
    fn direction(&self) -> Vector2;

    fn magnitude(&self) -> Scalar {
        self.direction().length()
    }

    fn is_running_intent(&self) -> bool;

    fn roll_requested(&self) -> bool;
}

#[derive(Resource, Reflect, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InputSettings {
    /// Use the touch joystick instead of keyboard and gamepad.
    pub mobile_enabled: bool,
    /// Joystick deflection above which the touch stick runs.
    pub run_threshold: Scalar,
    /// Joystick radius in logical pixels.
    pub joystick_radius: Scalar,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            mobile_enabled: cfg!(any(target_os = "android", target_os = "ios")),
            run_threshold: 0.7,
            joystick_radius: 80.0,
        }
    }
}

/// Keyboard and gamepad state sampled this frame.
#[derive(Resource, Default, Clone, Debug, PartialEq)]
pub struct KeyboardInput {
    pub direction: Vector2,
    pub running: bool,
    pub roll: bool,
}

impl KeyboardInput {
    pub fn from_keys(up: bool, down: bool, left: bool, right: bool, running: bool, roll: bool) -> Self {
        let horizontal = right as i8 - left as i8;
        let vertical = up as i8 - down as i8;

        Self {
            direction: Vector2::new(horizontal as Scalar, vertical as Scalar).clamp_length_max(1.0),
            running,
            roll,
        }
    }
}

impl InputSource for KeyboardInput {
    fn direction(&self) -> Vector2 {
        self.direction
    }

    fn is_running_intent(&self) -> bool {
        self.running
    }

    fn roll_requested(&self) -> bool {
        self.roll
    }
}

/// Virtual stick driven by touches.
///
/// A touch on the left half of the screen anchors the stick where it lands;
/// dragging away from the anchor deflects it. A new touch on the right half
/// requests a roll.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct TouchJoystick {
    anchor: Option<(u64, Vector2)>,
    direction: Vector2,
    roll: bool,
    run_threshold: Scalar,
}

impl Default for TouchJoystick {
    fn default() -> Self {
        Self {
            anchor: None,
            direction: Vector2::ZERO,
            roll: false,
            run_threshold: InputSettings::default().run_threshold,
        }
    }
}

impl TouchJoystick {
    /// Screen-space offset to stick deflection. Screen y grows downwards,
    /// stick y grows upwards.
    pub fn deflection(anchor: Vector2, position: Vector2, radius: Scalar) -> Vector2 {
        if radius <= 0.0 {
            return Vector2::ZERO;
        }

        let offset = position - anchor;
        Vector2::new(offset.x, -offset.y).clamp_length_max(radius) / radius
    }

    pub fn press(&mut self, id: u64, position: Vector2, screen_width: Scalar) {
        if position.x > screen_width * 0.5 {
            self.roll = true;
        } else if self.anchor.is_none() {
            self.anchor = Some((id, position));
            self.direction = Vector2::ZERO;
        }
    }

    pub fn drag(&mut self, id: u64, position: Vector2, radius: Scalar) {
        if let Some((anchor_id, anchor)) = self.anchor {
            if anchor_id == id {
                self.direction = Self::deflection(anchor, position, radius);
            }
        }
    }

    pub fn release(&mut self, id: u64) {
        if matches!(self.anchor, Some((anchor_id, _)) if anchor_id == id) {
            self.anchor = None;
            self.direction = Vector2::ZERO;
        }
    }

    /// Clears the one-shot roll request before sampling a new frame.
    pub fn begin_frame(&mut self, run_threshold: Scalar) {
        self.roll = false;
        self.run_threshold = run_threshold;
    }
}

impl InputSource for TouchJoystick {
    fn direction(&self) -> Vector2 {
        self.direction
    }

    fn is_running_intent(&self) -> bool {
        self.magnitude() > self.run_threshold
    }

    fn roll_requested(&self) -> bool {
        self.roll
    }
}

/// Samples keyboard and gamepad into [`KeyboardInput`].
pub fn keyboard_input(
    keyboard_input: Res<ButtonInput<KeyCode>>,
    gamepads: Query<&Gamepad>,
    mut sampled: ResMut<KeyboardInput>,
) {
    let up = keyboard_input.any_pressed([KeyCode::KeyW, KeyCode::ArrowUp]);
    let down = keyboard_input.any_pressed([KeyCode::KeyS, KeyCode::ArrowDown]);
    let left = keyboard_input.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]);
    let right = keyboard_input.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]);

    // Check if running (any shift key)
    let running = keyboard_input.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
    let roll = keyboard_input.just_pressed(KeyCode::Space);

    let mut input = KeyboardInput::from_keys(up, down, left, right, running, roll);

    for gamepad in gamepads.iter() {
        input.roll |= gamepad.just_pressed(GamepadButton::East);

        if input.direction != Vector2::ZERO {
            continue;
        }

        if let (Some(x), Some(y)) = (
            gamepad.get(GamepadAxis::LeftStickX),
            gamepad.get(GamepadAxis::LeftStickY),
        ) {
            let direction = Vector2::new(x as Scalar, y as Scalar).clamp_length_max(1.0);
            if direction.length_squared() > 0.01 {
                input.direction = direction;
                input.running |= gamepad.pressed(GamepadButton::RightTrigger2);
            }
        }
    }

    *sampled = input;
}

/// Samples touches into [`TouchJoystick`].
pub fn touch_input(
    touches: Res<Touches>,
    settings: Res<InputSettings>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut joystick: ResMut<TouchJoystick>,
) {
    let screen_width = windows
        .single()
        .map(|window| window.width())
        .unwrap_or(Scalar::INFINITY);

    joystick.begin_frame(settings.run_threshold);

    for touch in touches.iter_just_pressed() {
        joystick.press(touch.id(), touch.position(), screen_width);
    }
    for touch in touches.iter() {
        joystick.drag(touch.id(), touch.position(), settings.joystick_radius);
    }
    for touch in touches.iter_just_released().chain(touches.iter_just_canceled()) {
        joystick.release(touch.id());
    }
}

/// Forwards the authoritative source as [`MovementAction`] events.
pub fn dispatch_movement(
    settings: Res<InputSettings>,
    keyboard: Res<KeyboardInput>,
    joystick: Res<TouchJoystick>,
    mut movement_event_writer: EventWriter<MovementAction>,
) {
    let source: &dyn InputSource = if settings.mobile_enabled {
        &*joystick
    } else {
        &*keyboard
    };

    movement_event_writer.write(MovementAction::Move(
        source.direction(),
        source.is_running_intent(),
    ));

    if source.roll_requested() {
        movement_event_writer.write(MovementAction::Roll);
    }
}

pub fn toggle_ground_debug(keyboard_input: Res<ButtonInput<KeyCode>>, mut toggles: ResMut<ControllerDebug>) {
    if keyboard_input.just_pressed(KeyCode::F3) {
        toggles.show_ground_probe = !toggles.show_ground_probe;
        let shown = toggles.show_ground_probe;
        info!("ground probe gizmos: {shown}");
    }
}
