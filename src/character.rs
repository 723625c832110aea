//! The character component and its per-frame orchestration.
//!
//! A [`Character`] owns everything the controller tracks about one actor:
//! smoothed velocity and heading, the targets its current state chose, the
//! last ground contact, its seat and vehicle links, and its action bindings.
//!
//! Functions in this module take `&mut World` plus the character entity so
//! that states, vehicles and input handlers can call into each other without
//! fighting over borrows, the same way the controller systems do.

use bevy::prelude::*;

use crate::behaviour;
use crate::config::ControllerConfig;
use crate::detection::GroundContact;
use crate::input::{ActionBindings, CharacterAction, InputCode, InputFocus};
use crate::intent::{camera_relative_movement, flatten, signed_angle_y, JumpRequest};
use crate::signals::{on_foot_hints, CameraRequest, ControlHint, ControlHints, ScenarioRequest};
use crate::spring::{RelativeSpringSimulator, VectorSpringSimulator};
use crate::state::{self, CharacterState, StateKind};
use crate::vehicle::{self, VehicleEntryInstance};

/// Visual lean per unit of angular velocity times speed.
const TILT_FACTOR: f32 = 2.3;

/// Core character component.
///
/// Position belongs to the physics body while `physics_enabled` is set and
/// the character is registered, and to the entity's `Transform` otherwise.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct Character {
    // === Locomotion ===
    /// Smoothed local velocity (X = left, Z = forward).
    pub velocity: Vec3,
    /// Velocity of the local velocity spring.
    pub acceleration: Vec3,
    /// Local velocity the current state asks for.
    pub velocity_target: Vec3,
    /// Per-axis weight of the arcade velocity in the physics post-step.
    pub arcade_velocity_influence: Vec3,
    /// Add the arcade velocity to the simulated one instead of blending.
    pub arcade_velocity_is_additive: bool,
    pub move_speed: f32,

    // === Heading ===
    /// Horizontal unit facing.
    pub orientation: Vec3,
    /// Facing the rotation spring turns toward.
    pub orientation_target: Vec3,
    pub angular_velocity: f32,
    /// Camera view direction, used for camera-relative movement.
    pub view_vector: Vec3,
    /// Sideways lean of the model, in radians.
    pub tilt: f32,

    #[reflect(ignore)]
    pub velocity_simulator: VectorSpringSimulator,
    #[reflect(ignore)]
    pub rotation_simulator: RelativeSpringSimulator,

    // === Physics ===
    pub jump: Option<JumpRequest>,
    pub ground: Option<GroundContact>,
    /// Velocity of the last airborne post-step, used to pick the landing state.
    pub ground_impact_velocity: Vec3,
    /// Debug marker at the ground ray's end.
    pub ray_marker: Vec3,
    pub physics_enabled: bool,
    /// Zero the body velocity on the next physics sync.
    pub velocity_reset_pending: bool,
    /// Teleport the body here on the next physics sync.
    pub pending_teleport: Option<Vec3>,

    // === Vehicles ===
    pub occupying_seat: Option<Entity>,
    pub controlled_vehicle: Option<Entity>,
    pub vehicle_entry: Option<VehicleEntryInstance>,

    // === Navigation ===
    /// Point the character walks toward, set by click-to-move input.
    pub move_target: Option<Vec3>,

    // === State machine ===
    #[reflect(ignore)]
    pub state: CharacterState,
    /// Seconds since the current state was entered.
    pub state_timer: f32,
    /// Duration of the clip the current state started.
    pub animation_length: f32,
    /// Bumped on every transition.
    pub state_generation: u32,

    #[reflect(ignore)]
    pub actions: ActionBindings<CharacterAction>,
}

impl Default for Character {
    fn default() -> Self {
        Self::new(&ControllerConfig::default())
    }
}

impl Character {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            velocity_target: Vec3::ZERO,
            arcade_velocity_influence: config.default_arcade_influence,
            arcade_velocity_is_additive: false,
            move_speed: config.move_speed,
            orientation: Vec3::Z,
            orientation_target: Vec3::Z,
            angular_velocity: 0.0,
            view_vector: Vec3::Z,
            tilt: 0.0,
            velocity_simulator: config.velocity_spring.vector_simulator(),
            rotation_simulator: config.rotation_spring.rotation_simulator(),
            jump: None,
            ground: None,
            ground_impact_velocity: Vec3::ZERO,
            ray_marker: Vec3::ZERO,
            physics_enabled: true,
            velocity_reset_pending: false,
            pending_teleport: None,
            occupying_seat: None,
            controlled_vehicle: None,
            vehicle_entry: None,
            move_target: None,
            state: CharacterState::Idle,
            state_timer: 0.0,
            animation_length: 0.0,
            state_generation: 0,
            actions: ActionBindings::character_defaults(),
        }
    }

    /// Kind of the current state.
    pub fn state_kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn is_grounded(&self) -> bool {
        self.ground.is_some()
    }

    /// Face `direction` on the ground plane, immediately or through the spring.
    pub fn set_orientation(&mut self, direction: Vec3, instantly: bool) {
        let flat = flatten(direction);
        if flat == Vec3::ZERO {
            return;
        }
        self.orientation_target = flat;
        if instantly {
            self.orientation = flat;
        }
    }

    /// Face the held direction keys relative to the camera.
    ///
    /// Does nothing while a vehicle entry or move target steers the character.
    pub fn set_camera_relative_orientation_target(&mut self) {
        if self.vehicle_entry.is_some() || self.move_target.is_some() {
            return;
        }
        let movement = camera_relative_movement(self.view_vector, &self.actions);
        if movement == Vec3::ZERO {
            let current = self.orientation;
            self.set_orientation(current, false);
        } else {
            self.set_orientation(movement, false);
        }
    }

    /// Ask for a forward local speed.
    pub fn set_arcade_velocity_target(&mut self, forward: f32) {
        self.velocity_target = Vec3::new(0.0, 0.0, forward);
    }

    pub fn set_arcade_velocity_influence(&mut self, x: f32, y: f32, z: f32) {
        self.arcade_velocity_influence = Vec3::new(x, y, z);
    }

    /// Request a jump; `forced_speed` makes it a directed jump.
    pub fn request_jump(&mut self, forced_speed: Option<f32>) {
        self.jump = Some(JumpRequest { forced_speed });
    }

    /// Stop dead: zero the smoothed velocity and the body velocity.
    pub fn reset_velocity(&mut self) {
        self.velocity = Vec3::ZERO;
        self.acceleration = Vec3::ZERO;
        self.velocity_simulator.init();
        self.velocity_reset_pending = true;
    }

    /// Snap orientation and target to the facing of `rotation`.
    pub fn reset_orientation(&mut self, rotation: Quat) {
        self.set_orientation(rotation * Vec3::Z, true);
    }

    pub fn set_physics_enabled(&mut self, enabled: bool) {
        self.physics_enabled = enabled;
    }

    /// Restore the spring and arcade settings every state starts from.
    pub fn apply_state_defaults(&mut self, config: &ControllerConfig) {
        self.velocity_simulator.mass = config.velocity_spring.mass;
        self.velocity_simulator.damping = config.velocity_spring.damping;
        self.rotation_simulator.mass = config.rotation_spring.mass;
        self.rotation_simulator.damping = config.rotation_spring.damping;
        self.arcade_velocity_is_additive = false;
        self.arcade_velocity_influence = config.default_arcade_influence;
        self.state_timer = 0.0;
        self.animation_length = 0.0;
    }

    /// Advance the local velocity spring toward the target.
    pub fn spring_movement(&mut self, dt: f32) {
        self.velocity_simulator.target = self.velocity_target;
        self.velocity_simulator.simulate(dt);
        self.velocity = self.velocity_simulator.position;
        self.acceleration = self.velocity_simulator.velocity;
    }

    /// Turn the orientation toward the orientation target.
    pub fn spring_rotation(&mut self, dt: f32) {
        let angle = signed_angle_y(self.orientation, self.orientation_target);
        self.rotation_simulator.target = angle;
        self.rotation_simulator.simulate(dt);
        self.orientation = Quat::from_rotation_y(self.rotation_simulator.position) * self.orientation;
        self.angular_velocity = self.rotation_simulator.velocity;
    }

    /// Model rotation: facing the orientation, leaning into turns.
    pub fn model_rotation(&mut self) -> Quat {
        self.tilt = -self.angular_velocity * TILT_FACTOR * self.velocity.length();
        let yaw = self.orientation.x.atan2(self.orientation.z);
        Quat::from_rotation_y(yaw) * Quat::from_rotation_z(self.tilt)
    }
}

fn config_of(world: &World, entity: Entity) -> ControllerConfig {
    world
        .get::<ControllerConfig>(entity)
        .copied()
        .unwrap_or_default()
}

/// Current position of the character.
pub fn position(world: &World, entity: Entity) -> Vec3 {
    world
        .get::<Transform>(entity)
        .map(|t| t.translation)
        .unwrap_or(Vec3::ZERO)
}

/// Move the character, teleporting its body if it has one.
pub fn set_position(world: &mut World, entity: Entity, position: Vec3) {
    if let Some(mut transform) = world.get_mut::<Transform>(entity) {
        transform.translation = position;
    }
    if let Some(mut character) = world.get_mut::<Character>(entity) {
        if character.physics_enabled {
            character.pending_teleport = Some(position);
        }
    }
}

pub fn set_rotation(world: &mut World, entity: Entity, rotation: Quat) {
    if let Some(mut transform) = world.get_mut::<Transform>(entity) {
        transform.rotation = rotation;
    }
}

/// Point the model along the orientation.
pub fn rotate_model(world: &mut World, entity: Entity) {
    let Some(rotation) = world
        .get_mut::<Character>(entity)
        .map(|mut c| c.model_rotation())
    else {
        return;
    };
    set_rotation(world, entity, rotation);
}

/// Run one frame of the character: behaviour, vehicle approach, state logic, springs.
pub fn update_character(world: &mut World, entity: Entity, dt: f32) {
    behaviour::run_behaviour(world, entity, dt);

    let Some(character) = world.get::<Character>(entity) else {
        return;
    };
    let entry = character.vehicle_entry;
    let move_target = character.move_target;

    if let Some(entry) = entry {
        vehicle::update_entry(world, entity, entry);
    }
    if let Some(target) = move_target {
        steer_to_point(world, entity, target);
    }

    state::update_state(world, entity, dt);

    let physics_enabled = match world.get_mut::<Character>(entity) {
        Some(mut character) if character.physics_enabled => {
            character.spring_movement(dt);
            character.spring_rotation(dt);
            true
        }
        _ => false,
    };
    if physics_enabled {
        rotate_model(world, entity);
    }
}

/// Set an action and let the state react to the edge.
pub fn trigger_action(world: &mut World, entity: Entity, action: CharacterAction, pressed: bool) {
    let changed = world
        .get_mut::<Character>(entity)
        .is_some_and(|mut c| c.actions.set(action, pressed));
    if !changed {
        return;
    }

    state::dispatch_input_change(world, entity);

    if let Some(mut character) = world.get_mut::<Character>(entity) {
        character.actions.clear_edges(action);
    }
}

/// Release every held action.
pub fn reset_controls(world: &mut World, entity: Entity) {
    let held = world
        .get::<Character>(entity)
        .map(|c| c.actions.pressed())
        .unwrap_or_default();
    for action in held {
        trigger_action(world, entity, action, false);
    }
}

fn trigger_code(world: &mut World, entity: Entity, code: InputCode, pressed: bool) {
    let actions = world
        .get::<Character>(entity)
        .map(|c| c.actions.actions_for(code))
        .unwrap_or_default();
    for action in actions {
        trigger_action(world, entity, action, pressed);
    }
}

pub fn handle_keyboard_event(world: &mut World, entity: Entity, code: KeyCode, pressed: bool, shift: bool) {
    let Some(character) = world.get::<Character>(entity) else {
        return;
    };
    if let Some(vehicle) = character.controlled_vehicle {
        vehicle::handle_keyboard_event(world, vehicle, code, pressed, shift);
        return;
    }

    match (code, pressed, shift) {
        (KeyCode::KeyC, true, true) => {
            reset_controls(world, entity);
            if let Some(mut focus) = world.get_resource_mut::<InputFocus>() {
                focus.receiver = None;
            }
            world.send_event(CameraRequest::FreeCamera { caller: entity });
        }
        (KeyCode::KeyR, true, true) => {
            world.send_event(ScenarioRequest::Restart);
        }
        _ => trigger_code(world, entity, code.into(), pressed),
    }
}

fn controlled_vehicle(world: &World, entity: Entity) -> Option<Entity> {
    world.get::<Character>(entity).and_then(|c| c.controlled_vehicle)
}

pub fn handle_mouse_button(world: &mut World, entity: Entity, button: MouseButton, pressed: bool) {
    if let Some(vehicle) = controlled_vehicle(world, entity) {
        vehicle::handle_mouse_button(world, vehicle, button, pressed);
        return;
    }
    trigger_code(world, entity, button.into(), pressed);
}

pub fn handle_mouse_move(world: &mut World, entity: Entity, delta: Vec2) {
    if let Some(vehicle) = controlled_vehicle(world, entity) {
        vehicle::handle_mouse_move(world, vehicle, delta);
        return;
    }
    world.send_event(CameraRequest::Orbit { delta });
}

pub fn handle_mouse_wheel(world: &mut World, entity: Entity, value: f32) {
    if let Some(vehicle) = controlled_vehicle(world, entity) {
        vehicle::handle_mouse_wheel(world, vehicle, value);
        return;
    }
    world.send_event(ScenarioRequest::ScrollTimeScale(value));
}

/// Walk toward `point` until close enough, then stop.
pub fn move_to_point(world: &mut World, entity: Entity, point: Vec3) {
    {
        let Some(mut character) = world.get_mut::<Character>(entity) else {
            return;
        };
        if character.controlled_vehicle.is_some() || !character.state.can_find_vehicles_to_enter() {
            return;
        }
        character.move_target = Some(point);
    }
    steer_to_point(world, entity, point);
    trigger_action(world, entity, CharacterAction::Up, true);
}

fn steer_to_point(world: &mut World, entity: Entity, target: Vec3) {
    let here = position(world, entity);
    let arrival = config_of(world, entity).entry_arrival_distance;
    let offset = Vec3::new(target.x - here.x, 0.0, target.z - here.z);

    if offset.length() < arrival {
        if let Some(mut character) = world.get_mut::<Character>(entity) {
            character.move_target = None;
        }
        trigger_action(world, entity, CharacterAction::Up, false);
    } else if let Some(mut character) = world.get_mut::<Character>(entity) {
        character.set_orientation(offset, false);
    }
}

/// Announce this character's camera and controls. Vehicles take over while driven.
pub fn input_receiver_init(world: &mut World, entity: Entity) {
    let Some(character) = world.get::<Character>(entity) else {
        return;
    };
    if let Some(vehicle) = character.controlled_vehicle {
        vehicle::input_receiver_init(world, vehicle);
        return;
    }

    let radius = config_of(world, entity).camera_follow_radius;
    world.send_event(CameraRequest::Follow {
        target: entity,
        radius,
        follow_mode: false,
    });
    display_controls(world, on_foot_hints());
}

pub fn display_controls(world: &mut World, hints: Vec<ControlHint>) {
    world.send_event(ControlHints { hints });
}
