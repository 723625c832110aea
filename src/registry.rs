//! Which characters take part in the simulation.
//!
//! Only registered characters are updated, receive physics bodies and can
//! take input focus.

use bevy::prelude::*;
use thiserror::Error;

use crate::character::{self, Character};
use crate::input::InputFocus;
use crate::state::{self, CharacterState};
use crate::vehicle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("character {0} is already registered")]
    AlreadyRegistered(Entity),
    #[error("character {0} is not registered")]
    NotRegistered(Entity),
}

/// Registered characters, in registration order.
#[derive(Resource, Reflect, Debug, Clone, Default)]
#[reflect(Resource)]
pub struct CharacterRegistry {
    characters: Vec<Entity>,
}

impl CharacterRegistry {
    pub fn contains(&self, entity: Entity) -> bool {
        self.characters.contains(&entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.characters.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

fn is_registered(world: &World, entity: Entity) -> bool {
    world
        .get_resource::<CharacterRegistry>()
        .is_some_and(|registry| registry.contains(entity))
}

/// Register a character and put it in its idle state.
pub fn add_character(world: &mut World, entity: Entity) -> Result<(), RegistryError> {
    if is_registered(world, entity) {
        warn!("Adding character to a world in which it already exists.");
        return Err(RegistryError::AlreadyRegistered(entity));
    }
    world
        .get_resource_or_init::<CharacterRegistry>()
        .characters
        .push(entity);

    if let Some(mut c) = world.get_mut::<Character>(entity) {
        c.set_physics_enabled(true);
    }
    state::set_state(world, entity, CharacterState::Idle);
    Ok(())
}

/// Unregister a character, releasing its seat and input focus.
pub fn remove_character(world: &mut World, entity: Entity) -> Result<(), RegistryError> {
    if !is_registered(world, entity) {
        warn!("Removing character from a world in which it isn't present.");
        return Err(RegistryError::NotRegistered(entity));
    }
    world
        .resource_mut::<CharacterRegistry>()
        .characters
        .retain(|registered| *registered != entity);

    vehicle::stop_controlling_vehicle(world, entity);
    vehicle::leave_seat(world, entity);
    if let Some(mut focus) = world.get_resource_mut::<InputFocus>() {
        if focus.is(entity) {
            focus.receiver = None;
        }
    }
    Ok(())
}

/// Route input to a registered character.
pub fn take_control(world: &mut World, entity: Entity) -> Result<(), RegistryError> {
    if !is_registered(world, entity) {
        warn!("Attempting to take control of a character that doesn't belong to a world.");
        return Err(RegistryError::NotRegistered(entity));
    }
    world.get_resource_or_init::<InputFocus>().receiver = Some(entity);
    character::input_receiver_init(world, entity);
    Ok(())
}
