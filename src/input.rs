//! Input channel and action bindings.
//!
//! Raw device events arrive as [`CharacterInput`] events and are routed to
//! whichever entity holds [`InputFocus`]. Characters and vehicles map input
//! codes onto named actions through [`ActionBindings`], which tracks the held
//! state and the press/release edges of every action.

use bevy::prelude::*;

/// A physical key or mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputCode {
    Key(KeyCode),
    Mouse(MouseButton),
}

impl From<KeyCode> for InputCode {
    fn from(code: KeyCode) -> Self {
        Self::Key(code)
    }
}

impl From<MouseButton> for InputCode {
    fn from(button: MouseButton) -> Self {
        Self::Mouse(button)
    }
}

/// Held state and edges of one action.
///
/// Edges are only set while the owner reacts to the change and are cleared
/// right after, so `just_pressed` is never observed across frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyBinding {
    pub codes: Vec<InputCode>,
    pub is_pressed: bool,
    pub just_pressed: bool,
    pub just_released: bool,
}

impl KeyBinding {
    pub fn new(codes: impl IntoIterator<Item = InputCode>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
            ..default()
        }
    }
}

/// Actions a character on foot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum CharacterAction {
    Up,
    Down,
    Left,
    Right,
    Run,
    Jump,
    Use,
    Enter,
    EnterPassenger,
    SeatSwitch,
    Primary,
    Secondary,
}

impl CharacterAction {
    /// The four movement actions.
    pub const DIRECTIONS: [CharacterAction; 4] = [
        CharacterAction::Up,
        CharacterAction::Down,
        CharacterAction::Left,
        CharacterAction::Right,
    ];
}

/// Actions a vehicle understands while a character controls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum VehicleAction {
    Throttle,
    Reverse,
    Brake,
    Left,
    Right,
    ExitVehicle,
    SeatSwitch,
    View,
}

impl VehicleAction {
    pub const DIRECTIONS: [VehicleAction; 4] = [
        VehicleAction::Throttle,
        VehicleAction::Reverse,
        VehicleAction::Left,
        VehicleAction::Right,
    ];
}

/// Named actions bound to input codes.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionBindings<A> {
    entries: Vec<(A, KeyBinding)>,
}

impl<A> Default for ActionBindings<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<A: Copy + PartialEq> ActionBindings<A> {
    pub fn new(bindings: impl IntoIterator<Item = (A, Vec<InputCode>)>) -> Self {
        Self {
            entries: bindings
                .into_iter()
                .map(|(action, codes)| (action, KeyBinding::new(codes)))
                .collect(),
        }
    }

    pub fn binding(&self, action: A) -> Option<&KeyBinding> {
        self.entries
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, binding)| binding)
    }

    fn binding_mut(&mut self, action: A) -> Option<&mut KeyBinding> {
        self.entries
            .iter_mut()
            .find(|(a, _)| *a == action)
            .map(|(_, binding)| binding)
    }

    pub fn is_pressed(&self, action: A) -> bool {
        self.binding(action).is_some_and(|b| b.is_pressed)
    }

    pub fn just_pressed(&self, action: A) -> bool {
        self.binding(action).is_some_and(|b| b.just_pressed)
    }

    pub fn just_released(&self, action: A) -> bool {
        self.binding(action).is_some_and(|b| b.just_released)
    }

    /// Codes bound to `action`.
    pub fn codes(&self, action: A) -> &[InputCode] {
        self.binding(action).map(|b| b.codes.as_slice()).unwrap_or(&[])
    }

    /// Actions bound to `code`, in binding order.
    pub fn actions_for(&self, code: InputCode) -> Vec<A> {
        self.entries
            .iter()
            .filter(|(_, binding)| binding.codes.contains(&code))
            .map(|(action, _)| *action)
            .collect()
    }

    /// Set the held state. Returns `true` and raises the matching edge if it changed.
    pub fn set(&mut self, action: A, pressed: bool) -> bool {
        let Some(binding) = self.binding_mut(action) else {
            return false;
        };
        if binding.is_pressed == pressed {
            return false;
        }
        binding.is_pressed = pressed;
        binding.just_pressed = pressed;
        binding.just_released = !pressed;
        true
    }

    /// Mark `action` released without raising an edge.
    pub fn force_release(&mut self, action: A) {
        if let Some(binding) = self.binding_mut(action) {
            binding.is_pressed = false;
        }
    }

    pub fn clear_edges(&mut self, action: A) {
        if let Some(binding) = self.binding_mut(action) {
            binding.just_pressed = false;
            binding.just_released = false;
        }
    }

    /// Actions currently held, in binding order.
    pub fn pressed(&self) -> Vec<A> {
        self.entries
            .iter()
            .filter(|(_, binding)| binding.is_pressed)
            .map(|(action, _)| *action)
            .collect()
    }

    pub fn any_pressed(&self, actions: &[A]) -> bool {
        actions.iter().any(|a| self.is_pressed(*a))
    }

    pub fn any_just_pressed(&self, actions: &[A]) -> bool {
        actions.iter().any(|a| self.just_pressed(*a))
    }

    pub fn iter(&self) -> impl Iterator<Item = (A, &KeyBinding)> {
        self.entries.iter().map(|(action, binding)| (*action, binding))
    }
}

impl ActionBindings<CharacterAction> {
    /// Default keyboard and mouse layout for characters.
    pub fn character_defaults() -> Self {
        use CharacterAction::*;
        Self::new([
            (Up, vec![KeyCode::KeyW.into()]),
            (Down, vec![KeyCode::KeyS.into()]),
            (Left, vec![KeyCode::KeyA.into()]),
            (Right, vec![KeyCode::KeyD.into()]),
            (Run, vec![KeyCode::ShiftLeft.into()]),
            (Jump, vec![KeyCode::Space.into()]),
            (Use, vec![KeyCode::KeyE.into()]),
            (Enter, vec![KeyCode::KeyF.into()]),
            (EnterPassenger, vec![KeyCode::KeyG.into()]),
            (SeatSwitch, vec![KeyCode::KeyX.into()]),
            (Primary, vec![MouseButton::Left.into()]),
            (Secondary, vec![MouseButton::Right.into()]),
        ])
    }
}

impl ActionBindings<VehicleAction> {
    /// Default keyboard layout for vehicles.
    pub fn vehicle_defaults() -> Self {
        use VehicleAction::*;
        Self::new([
            (Throttle, vec![KeyCode::KeyW.into()]),
            (Reverse, vec![KeyCode::KeyS.into()]),
            (Brake, vec![KeyCode::Space.into()]),
            (Left, vec![KeyCode::KeyA.into()]),
            (Right, vec![KeyCode::KeyD.into()]),
            (ExitVehicle, vec![KeyCode::KeyF.into()]),
            (SeatSwitch, vec![KeyCode::KeyX.into()]),
            (View, vec![KeyCode::KeyV.into()]),
        ])
    }
}

/// Raw input routed to the entity holding [`InputFocus`].
#[derive(Event, Debug, Clone, PartialEq)]
pub enum CharacterInput {
    Keyboard {
        code: KeyCode,
        pressed: bool,
        /// Whether a shift key is held, for the global shortcuts.
        shift: bool,
    },
    MouseButton {
        button: MouseButton,
        pressed: bool,
    },
    MouseMove {
        delta: Vec2,
    },
    MouseWheel {
        value: f32,
    },
    /// Walk toward a world-space point, as from a tap or click.
    MoveTo {
        point: Vec3,
    },
}

/// The entity that receives [`CharacterInput`].
#[derive(Resource, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Resource)]
pub struct InputFocus {
    pub receiver: Option<Entity>,
}

impl InputFocus {
    pub fn is(&self, entity: Entity) -> bool {
        self.receiver == Some(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_raises_edges_only_on_change() {
        let mut actions = ActionBindings::character_defaults();

        assert!(actions.set(CharacterAction::Jump, true));
        assert!(actions.is_pressed(CharacterAction::Jump));
        assert!(actions.just_pressed(CharacterAction::Jump));
        assert!(!actions.just_released(CharacterAction::Jump));

        actions.clear_edges(CharacterAction::Jump);
        assert!(!actions.set(CharacterAction::Jump, true), "repeat press is not an edge");
        assert!(!actions.just_pressed(CharacterAction::Jump));

        assert!(actions.set(CharacterAction::Jump, false));
        assert!(actions.just_released(CharacterAction::Jump));
    }

    #[test]
    fn codes_map_back_to_actions() {
        let actions = ActionBindings::character_defaults();
        assert_eq!(actions.actions_for(KeyCode::KeyF.into()), vec![CharacterAction::Enter]);
        assert_eq!(
            actions.actions_for(MouseButton::Left.into()),
            vec![CharacterAction::Primary]
        );
        assert!(actions.actions_for(KeyCode::KeyZ.into()).is_empty());
    }

    #[test]
    fn unbound_actions_are_ignored() {
        let mut actions: ActionBindings<VehicleAction> = ActionBindings::default();
        assert!(!actions.set(VehicleAction::Throttle, true));
        assert!(!actions.is_pressed(VehicleAction::Throttle));
        assert!(actions.codes(VehicleAction::Throttle).is_empty());
    }

    #[test]
    fn pressed_lists_held_actions() {
        let mut actions = ActionBindings::vehicle_defaults();
        actions.set(VehicleAction::Left, true);
        actions.set(VehicleAction::Throttle, true);

        assert_eq!(actions.pressed(), vec![VehicleAction::Throttle, VehicleAction::Left]);
        assert!(actions.any_pressed(&VehicleAction::DIRECTIONS));
    }
}
