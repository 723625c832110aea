//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the character controller. The controller only needs a
//! closest-hit raycast, velocity and position access, and a way to add a
//! character's body to the simulated world or take it out again.

use bevy::prelude::*;

use crate::collision::RayHit;

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the character
/// controller. All methods are static and operate directly on the ECS world,
/// so the controller systems can call them from exclusive systems.
///
/// # Example
///
/// For an example implementation, see the `rapier` module's `Rapier3dBackend`
/// which implements this trait for Bevy Rapier3D.
///
/// ```rust
/// use bevy::prelude::*;
/// use arcade_character_controller::prelude::*;
///
/// fn body_speed<B: CharacterPhysicsBackend>(world: &World, entity: Entity) -> f32 {
///     B::get_velocity(world, entity).length()
/// }
/// ```
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Cast a ray and return the closest solid hit, if any.
    ///
    /// Sensors never count as hits and `request.exclude` is skipped.
    fn raycast_closest(world: &mut World, request: &RaycastRequest) -> Option<RayHit>;

    /// Get the current linear velocity of a body.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of a body.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Get the current position of a body.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Move a body without simulating the motion in between.
    fn set_position(world: &mut World, entity: Entity, position: Vec3);

    /// Velocity of `entity` at a world-space `point`, including its rotation.
    ///
    /// Static and unknown bodies report zero.
    fn velocity_at_point(world: &World, entity: Entity, point: Vec3) -> Vec3;

    /// Whether the body of `entity` currently takes part in the simulation.
    fn has_body(world: &World, entity: Entity) -> bool;

    /// Add the body of `entity` to the simulation.
    fn add_body(world: &mut World, entity: Entity);

    /// Take the body of `entity` out of the simulation.
    fn remove_body(world: &mut World, entity: Entity);

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.timestep().as_secs_f32())
            .filter(|&d| d > 0.0)
            .unwrap_or_else(|| Time::<Fixed>::default().timestep().as_secs_f32())
    }
}

/// Helper struct for building raycasts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastRequest {
    /// Start point of the ray.
    pub start: Vec3,
    /// End point of the ray.
    pub end: Vec3,
    /// Collision layers the ray can hit.
    pub filter: u32,
    /// Entity to exclude from results.
    pub exclude: Option<Entity>,
}

impl RaycastRequest {
    /// Create a new segment raycast from `start` to `end`.
    pub fn new(start: Vec3, end: Vec3, filter: u32) -> Self {
        Self {
            start,
            end,
            filter,
            exclude: None,
        }
    }

    /// Exclude an entity from the raycast.
    pub fn excluding(mut self, entity: Entity) -> Self {
        self.exclude = Some(entity);
        self
    }

    /// Normalized direction from start to end.
    pub fn direction(&self) -> Vec3 {
        (self.end - self.start).normalize_or_zero()
    }

    /// Length of the ray.
    pub fn max_distance(&self) -> f32 {
        self.start.distance(self.end)
    }
}
