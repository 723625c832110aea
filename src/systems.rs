//! Core controller systems.
//!
//! Input dispatch and the per-frame character update run in `Update`. The
//! physics callbacks run in `FixedPostUpdate` around the backend's step and
//! are generic over the physics backend, so different physics engines can be
//! used.
//!
//! All of them are exclusive systems: character logic reaches across
//! characters, seats and vehicles through `&mut World`.

use bevy::ecs::event::EventCursor;
use bevy::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::character::{self, Character};
use crate::config::ControllerConfig;
use crate::detection::GroundSensor;
use crate::input::{CharacterInput, InputFocus};
use crate::reconcile::{reconcile, ReconcileInput, ReconcileParams};
use crate::registry::CharacterRegistry;
use crate::vehicle::{self, Vehicle};

fn registered(world: &World) -> Vec<Entity> {
    world
        .get_resource::<CharacterRegistry>()
        .map(|registry| registry.iter().collect())
        .unwrap_or_default()
}

/// Registered characters whose bodies are simulated, with their configuration.
fn simulated_characters(world: &mut World) -> Vec<(Entity, ControllerConfig)> {
    let registry = world.get_resource::<CharacterRegistry>().cloned().unwrap_or_default();
    world
        .query::<(Entity, &Character, Option<&ControllerConfig>)>()
        .iter(world)
        .filter(|(entity, c, _)| c.physics_enabled && registry.contains(*entity))
        .map(|(entity, _, config)| (entity, config.copied().unwrap_or_default()))
        .collect()
}

/// Route queued [`CharacterInput`] to the entity holding [`InputFocus`].
///
/// The receiver is looked up again for every event, since a handler can move
/// the focus (Shift+C drops it).
pub fn dispatch_input(world: &mut World, mut cursor: Local<EventCursor<CharacterInput>>) {
    let inputs: Vec<CharacterInput> = match world.get_resource::<Events<CharacterInput>>() {
        Some(events) => cursor.read(events).cloned().collect(),
        None => return,
    };

    for input in inputs {
        let Some(receiver) = world.get_resource::<InputFocus>().and_then(|f| f.receiver) else {
            continue;
        };
        if world.get::<Character>(receiver).is_some() {
            route_to_character(world, receiver, input);
        } else if world.get::<Vehicle>(receiver).is_some() {
            route_to_vehicle(world, receiver, input);
        }
    }
}

fn route_to_character(world: &mut World, entity: Entity, input: CharacterInput) {
    match input {
        CharacterInput::Keyboard {
            code,
            pressed,
            shift,
        } => character::handle_keyboard_event(world, entity, code, pressed, shift),
        CharacterInput::MouseButton { button, pressed } => {
            character::handle_mouse_button(world, entity, button, pressed)
        }
        CharacterInput::MouseMove { delta } => character::handle_mouse_move(world, entity, delta),
        CharacterInput::MouseWheel { value } => character::handle_mouse_wheel(world, entity, value),
        CharacterInput::MoveTo { point } => character::move_to_point(world, entity, point),
    }
}

fn route_to_vehicle(world: &mut World, entity: Entity, input: CharacterInput) {
    match input {
        CharacterInput::Keyboard {
            code,
            pressed,
            shift,
        } => vehicle::handle_keyboard_event(world, entity, code, pressed, shift),
        CharacterInput::MouseButton { button, pressed } => {
            vehicle::handle_mouse_button(world, entity, button, pressed)
        }
        CharacterInput::MouseMove { delta } => vehicle::handle_mouse_move(world, entity, delta),
        CharacterInput::MouseWheel { value } => vehicle::handle_mouse_wheel(world, entity, value),
        CharacterInput::MoveTo { .. } => {}
    }
}

/// Run the state machine and springs of every registered character.
pub fn update_characters(world: &mut World) {
    let dt = world
        .get_resource::<Time>()
        .map(|t| t.delta_secs())
        .unwrap_or(0.0);

    for entity in registered(world) {
        character::update_character(world, entity, dt);
    }
}

/// Keep physics bodies in step with registration and `physics_enabled`.
///
/// Also applies teleports and velocity resets that states queued since the
/// last step. Requests for characters without a simulated body are dropped.
pub fn sync_physics_bodies<B: CharacterPhysicsBackend>(world: &mut World) {
    let registry = world.get_resource::<CharacterRegistry>().cloned().unwrap_or_default();
    let characters: Vec<(Entity, bool, Option<Vec3>, bool)> = world
        .query::<(Entity, &Character)>()
        .iter(world)
        .map(|(entity, c)| {
            (
                entity,
                c.physics_enabled && registry.contains(entity),
                c.pending_teleport,
                c.velocity_reset_pending,
            )
        })
        .collect();

    for (entity, wanted, teleport, reset) in characters {
        let has_body = B::has_body(world, entity);
        if wanted && !has_body {
            B::add_body(world, entity);
        } else if !wanted && has_body {
            B::remove_body(world, entity);
        }

        if wanted {
            if let Some(position) = teleport {
                B::set_position(world, entity, position);
            }
            if reset {
                B::set_velocity(world, entity, Vec3::ZERO);
            }
        }

        if teleport.is_some() || reset {
            if let Some(mut c) = world.get_mut::<Character>(entity) {
                c.pending_teleport = None;
                c.velocity_reset_pending = false;
            }
        }
    }
}

/// Sense the ground under every simulated character.
pub fn physics_pre_step<B: CharacterPhysicsBackend>(world: &mut World) {
    for (entity, config) in simulated_characters(world) {
        let sensor = GroundSensor::from_config(&config);
        let origin = B::get_position(world, entity);
        let contact = sensor.sense::<B>(world, entity, origin);

        if let Some(mut c) = world.get_mut::<Character>(entity) {
            c.ground = contact;
            c.ray_marker = sensor.marker(origin, contact.as_ref());
        }
    }
}

/// Reconcile the simulated velocity with the arcade velocity.
///
/// Ground snapping runs at the fixed timestep's rate unless the
/// configuration overrides it.
pub fn physics_post_step<B: CharacterPhysicsBackend>(world: &mut World) {
    let step_rate = 1.0 / B::get_fixed_timestep(world);

    for (entity, config) in simulated_characters(world) {
        let Some(c) = world.get::<Character>(entity) else {
            continue;
        };
        let mut params = ReconcileParams::from(&config);
        params.move_speed = c.move_speed;
        params.physics_frame_rate = config.physics_frame_rate.unwrap_or(step_rate);
        let input = ReconcileInput {
            simulated_velocity: B::get_velocity(world, entity),
            body_position: B::get_position(world, entity),
            local_velocity: c.velocity,
            velocity_target: c.velocity_target,
            orientation: c.orientation,
            influence: c.arcade_velocity_influence,
            additive: c.arcade_velocity_is_additive,
            ground: c.ground,
            jump: c.jump,
        };

        let outcome = reconcile(&input, &params);

        B::set_velocity(world, entity, outcome.velocity);
        if let Some(position) = outcome.position {
            B::set_position(world, entity, position);
        }
        if let Some(mut c) = world.get_mut::<Character>(entity) {
            if let Some(velocity) = outcome.airborne_velocity {
                c.ground_impact_velocity = velocity;
            }
            if outcome.jumped {
                c.jump = None;
            }
        }

        // the model follows the body
        let body = B::get_position(world, entity);
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            if transform.translation != body {
                transform.translation = body;
            }
        }
    }
}
