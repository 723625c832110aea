//! Ground detection.
//!
//! The ground sensor casts a single ray straight down from the body origin,
//! `ray_cast_length + ray_safe_offset` long, against the configured ground
//! layers. A hit becomes a [`GroundContact`] which also records how fast the
//! struck surface is moving under the feet, so moving platforms carry the
//! character along.

use bevy::prelude::*;

use crate::backend::{CharacterPhysicsBackend, RaycastRequest};
use crate::collision::RayHit;
use crate::config::ControllerConfig;

/// Ground under a character, recomputed every physics pre-step.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    /// Hit point in world space.
    pub point: Vec3,
    /// Unit surface normal at the hit point.
    pub normal: Vec3,
    /// Body that was struck, if any.
    pub body: Option<Entity>,
    /// Velocity of the struck body at the hit point.
    pub point_velocity: Vec3,
}

impl GroundContact {
    pub fn from_hit(hit: RayHit, point_velocity: Vec3) -> Self {
        Self {
            point: hit.point,
            normal: hit.normal,
            body: hit.entity,
            point_velocity,
        }
    }

    /// Contact on a static surface.
    pub fn stationary(point: Vec3, normal: Vec3) -> Self {
        Self {
            point,
            normal,
            body: None,
            point_velocity: Vec3::ZERO,
        }
    }
}

/// Downward ray used to find the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundSensor {
    /// Distance from the body origin to the feet.
    pub ray_length: f32,
    /// Extra length below the feet.
    pub safe_offset: f32,
    /// Collision layers the ray can hit.
    pub filter: u32,
}

impl GroundSensor {
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            ray_length: config.ray_cast_length,
            safe_offset: config.ray_safe_offset,
            filter: config.ground_filter,
        }
    }

    /// Total length of the cast.
    #[inline]
    pub fn cast_length(&self) -> f32 {
        self.ray_length + self.safe_offset
    }

    /// Raycast from `origin` to the bottom of the sensor, skipping `owner`.
    pub fn request(&self, origin: Vec3, owner: Entity) -> RaycastRequest {
        RaycastRequest::new(origin, self.fallback_marker(origin), self.filter).excluding(owner)
    }

    /// Where the ray marker sits when nothing was hit.
    pub fn fallback_marker(&self, origin: Vec3) -> Vec3 {
        origin - Vec3::Y * self.cast_length()
    }

    /// Cast the ray and resolve the struck body's velocity at the hit point.
    pub fn sense<B: CharacterPhysicsBackend>(
        &self,
        world: &mut World,
        owner: Entity,
        origin: Vec3,
    ) -> Option<GroundContact> {
        let hit = B::raycast_closest(world, &self.request(origin, owner))?;
        let point_velocity = hit
            .entity
            .map(|body| B::velocity_at_point(world, body, hit.point))
            .unwrap_or(Vec3::ZERO);
        Some(GroundContact::from_hit(hit, point_velocity))
    }

    /// Position of the debug ray marker for a sensing result.
    pub fn marker(&self, origin: Vec3, contact: Option<&GroundContact>) -> Vec3 {
        contact
            .map(|c| c.point)
            .unwrap_or_else(|| self.fallback_marker(origin))
    }
}
