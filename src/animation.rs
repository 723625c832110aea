//! Animation clip lookup.
//!
//! The controller never plays animations itself. States ask for a clip by
//! name, the request goes out as an [`AnimationRequest`] event for the
//! rendering side, and the clip's duration comes back so the state knows when
//! its animation has ended.

use std::collections::HashMap;

use bevy::prelude::*;

/// Durations of the clips a character can play, by name.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct AnimationClips {
    #[reflect(ignore)]
    clips: HashMap<String, f32>,
}

impl AnimationClips {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a clip.
    pub fn with_clip(mut self, name: impl Into<String>, duration: f32) -> Self {
        self.insert(name, duration);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, duration: f32) {
        self.clips.insert(name.into(), duration);
    }

    pub fn duration(&self, name: &str) -> Option<f32> {
        self.clips.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Ask the renderer to cross-fade `entity` into `clip`.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct AnimationRequest {
    pub entity: Entity,
    pub clip: String,
    pub fade_in: f32,
}

/// Request `clip` on `entity` and return its duration.
///
/// A clip the entity doesn't have logs a warning and lasts zero seconds.
pub fn play_animation(world: &mut World, entity: Entity, clip: &str, fade_in: f32) -> f32 {
    let duration = world
        .get::<AnimationClips>(entity)
        .and_then(|clips| clips.duration(clip));

    match duration {
        Some(duration) => {
            world.send_event(AnimationRequest {
                entity,
                clip: clip.to_string(),
                fade_in,
            });
            duration
        }
        None => {
            warn!("Animation {clip} not found on {entity}");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_clip_returns_duration_and_emits_request() {
        let mut world = World::new();
        world.init_resource::<Events<AnimationRequest>>();
        let entity = world
            .spawn(AnimationClips::new().with_clip("idle", 2.5))
            .id();

        let duration = play_animation(&mut world, entity, "idle", 0.1);

        assert_eq!(duration, 2.5);
        let events = world.resource::<Events<AnimationRequest>>();
        let mut cursor = events.get_cursor();
        let sent: Vec<_> = cursor.read(events).cloned().collect();
        assert_eq!(
            sent,
            vec![AnimationRequest {
                entity,
                clip: "idle".into(),
                fade_in: 0.1
            }]
        );
    }

    #[test]
    fn missing_clip_lasts_zero_seconds() {
        let mut world = World::new();
        world.init_resource::<Events<AnimationRequest>>();
        let entity = world.spawn(AnimationClips::new()).id();

        assert_eq!(play_animation(&mut world, entity, "sprint", 0.1), 0.0);
        assert!(world.resource::<Events<AnimationRequest>>().is_empty());
    }

    #[test]
    fn entity_without_clips_lasts_zero_seconds() {
        let mut world = World::new();
        let entity = world.spawn_empty().id();
        assert_eq!(play_animation(&mut world, entity, "idle", 0.1), 0.0);
    }
}
