//! Raycast result structures.
//!
//! Backends report closest-hit queries as [`RayHit`]; the ground sensor turns
//! them into a [`GroundContact`](crate::detection::GroundContact).

use bevy::prelude::*;

/// Information about the closest surface struck by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World position of the hit point.
    pub point: Vec3,
    /// Surface normal at the hit point.
    pub normal: Vec3,
    /// Body that was hit (if the backend knows it).
    pub entity: Option<Entity>,
    /// Distance from the ray start to the hit point.
    pub distance: f32,
}

impl RayHit {
    pub fn new(point: Vec3, normal: Vec3, entity: Option<Entity>, distance: f32) -> Self {
        Self {
            point,
            normal,
            entity,
            distance,
        }
    }
}

/// Collision layer bits used by characters and their ground queries.
pub struct CollisionLayers;

impl CollisionLayers {
    /// Static and dynamic level geometry.
    pub const DEFAULT: u32 = 1;
    /// Character bodies.
    pub const CHARACTERS: u32 = 2;
    /// Triangle-mesh level geometry.
    pub const TRIMESH: u32 = 4;
}
