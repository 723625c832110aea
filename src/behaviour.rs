//! Pluggable per-character AI.
//!
//! A [`Behaviour`] component drives a character the same way a player does:
//! by pressing and releasing actions through [`crate::character::trigger_action`]
//! (or by asking for a walk with [`crate::character::move_to_point`]). It runs
//! at the start of the character's frame, before its state reacts.

use bevy::prelude::*;

/// Logic that steers one character every frame.
pub trait CharacterBehaviour: Send + Sync + 'static {
    fn update(&mut self, world: &mut World, character: Entity, dt: f32);
}

impl<F> CharacterBehaviour for F
where
    F: FnMut(&mut World, Entity, f32) + Send + Sync + 'static,
{
    fn update(&mut self, world: &mut World, character: Entity, dt: f32) {
        self(world, character, dt);
    }
}

/// The behaviour attached to a character.
#[derive(Component)]
pub struct Behaviour(Box<dyn CharacterBehaviour>);

impl Behaviour {
    pub fn new(behaviour: impl CharacterBehaviour) -> Self {
        Self(Box::new(behaviour))
    }
}

/// Attach `behaviour` to `character`, replacing any previous one.
pub fn set_behaviour(world: &mut World, character: Entity, behaviour: impl CharacterBehaviour) {
    match world.get_entity_mut(character) {
        Ok(mut entity) => {
            entity.insert(Behaviour::new(behaviour));
        }
        Err(_) => warn!("Cannot set a behaviour on missing entity {character}"),
    }
}

pub fn clear_behaviour(world: &mut World, character: Entity) {
    if let Ok(mut entity) = world.get_entity_mut(character) {
        entity.remove::<Behaviour>();
    }
}

/// Run the behaviour of `character`, if it has one.
///
/// The component is taken out for the call, so a behaviour set during the
/// update replaces the running one.
pub fn run_behaviour(world: &mut World, character: Entity, dt: f32) {
    let Some(mut behaviour) = world
        .get_entity_mut(character)
        .ok()
        .and_then(|mut entity| entity.take::<Behaviour>())
    else {
        return;
    };

    behaviour.0.update(world, character, dt);

    if let Ok(mut entity) = world.get_entity_mut(character) {
        if !entity.contains::<Behaviour>() {
            entity.insert(behaviour);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Resource, Default)]
    struct Calls(Vec<(Entity, f32)>);

    #[test]
    fn closure_behaviour_runs_with_the_frame_time() {
        let mut world = World::new();
        world.init_resource::<Calls>();
        let character = world.spawn_empty().id();
        set_behaviour(&mut world, character, |world: &mut World, entity: Entity, dt: f32| {
            world.resource_mut::<Calls>().0.push((entity, dt));
        });

        run_behaviour(&mut world, character, 0.5);
        run_behaviour(&mut world, character, 0.25);

        assert_eq!(world.resource::<Calls>().0, vec![(character, 0.5), (character, 0.25)]);
        assert!(world.get::<Behaviour>(character).is_some(), "put back after running");
    }

    #[test]
    fn behaviour_can_hand_over_to_another() {
        let mut world = World::new();
        world.init_resource::<Calls>();
        let character = world.spawn_empty().id();
        set_behaviour(&mut world, character, |world: &mut World, entity: Entity, _dt: f32| {
            set_behaviour(world, entity, |world: &mut World, entity: Entity, _dt: f32| {
                world.resource_mut::<Calls>().0.push((entity, -1.0));
            });
        });

        run_behaviour(&mut world, character, 0.1);
        run_behaviour(&mut world, character, 0.1);

        assert_eq!(world.resource::<Calls>().0, vec![(character, -1.0)]);
    }

    #[test]
    fn characters_without_behaviour_are_skipped() {
        let mut world = World::new();
        let character = world.spawn_empty().id();
        run_behaviour(&mut world, character, 0.1);
        clear_behaviour(&mut world, character);
        assert!(world.get::<Behaviour>(character).is_none());
    }
}
