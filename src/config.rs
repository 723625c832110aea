//! Controller configuration components.
//!
//! This module defines the tuning of a character: movement speed, ground ray
//! geometry, jump strength, default spring parameters and the distances used
//! while looking for and approaching vehicles.

use bevy::prelude::*;

use crate::collision::CollisionLayers;
use crate::spring::{RelativeSpringSimulator, VectorSpringSimulator};

/// Parameters of a fixed-step spring.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SpringConfig {
    /// Simulation frames per second.
    pub fps: f32,
    /// Inertia; higher mass reacts slower.
    pub mass: f32,
    /// Velocity retained per frame (0.0-1.0).
    pub damping: f32,
}

impl SpringConfig {
    pub const fn new(fps: f32, mass: f32, damping: f32) -> Self {
        Self { fps, mass, damping }
    }

    /// Build a velocity simulator with these parameters.
    pub fn vector_simulator(&self) -> VectorSpringSimulator {
        VectorSpringSimulator::new(self.fps, self.mass, self.damping)
    }

    /// Build a heading simulator with these parameters.
    pub fn rotation_simulator(&self) -> RelativeSpringSimulator {
        RelativeSpringSimulator::new(self.fps, self.mass, self.damping)
    }
}

/// Configuration parameters for the character controller.
///
/// States reset the spring mass/damping and arcade influence to these
/// defaults every time they are entered, then apply their own overrides.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct ControllerConfig {
    // === Movement Settings ===
    /// Scale from the smoothed local velocity to world units per second.
    pub move_speed: f32,

    /// Per-axis weight of the arcade velocity against the simulated one.
    pub default_arcade_influence: Vec3,

    // === Spring Settings ===
    /// Spring smoothing the local velocity toward the state's target.
    pub velocity_spring: SpringConfig,

    /// Spring turning the orientation toward the orientation target.
    pub rotation_spring: SpringConfig,

    // === Sensor Settings ===
    /// Distance from the body origin to the feet.
    pub ray_cast_length: f32,

    /// Extra ray length below the feet, also used to lift the body on jump.
    pub ray_safe_offset: f32,

    /// Collision layers the ground ray can hit.
    pub ground_filter: u32,

    /// Rate used to turn vertical velocity into a per-step position offset
    /// while grounded. `None` follows the fixed timestep.
    pub physics_frame_rate: Option<f32>,

    // === Jump Settings ===
    /// Vertical velocity added by every jump.
    pub jump_impulse: f32,

    /// Multiplier on the smoothed local speed for directed jumps.
    pub directed_jump_multiplier: f32,

    // === Vehicle Settings ===
    /// Radius searched for vehicles to enter.
    pub vehicle_search_radius: f32,

    /// Horizontal distance to the entry point at which entering starts.
    pub entry_arrival_distance: f32,

    /// Maximum height difference to the entry point at which entering starts.
    pub entry_max_height_difference: f32,

    /// Height of the character origin above a seat point.
    pub seat_height_offset: f32,

    /// Height of the character origin above an entry point while standing.
    pub standing_height_offset: f32,

    // === Camera Settings ===
    /// Follow distance requested when this character receives input focus.
    pub camera_follow_radius: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Movement settings
            move_speed: 4.0,
            default_arcade_influence: Vec3::new(1.0, 0.0, 1.0),

            // Spring settings
            velocity_spring: SpringConfig::new(60.0, 50.0, 0.8),
            rotation_spring: SpringConfig::new(60.0, 10.0, 0.5),

            // Sensor settings
            ray_cast_length: 0.57,
            ray_safe_offset: 0.03,
            ground_filter: CollisionLayers::DEFAULT,
            physics_frame_rate: None,

            // Jump settings
            jump_impulse: 4.0,
            directed_jump_multiplier: 4.0,

            // Vehicle settings
            vehicle_search_radius: 10.0,
            entry_arrival_distance: 0.2,
            entry_max_height_difference: 2.0,
            seat_height_offset: 0.6,
            standing_height_offset: 0.53,

            camera_follow_radius: 1.6,
        }
    }
}

impl ControllerConfig {
    /// Total length of the ground ray.
    #[inline]
    pub fn ground_cast_length(&self) -> f32 {
        self.ray_cast_length + self.ray_safe_offset
    }

    /// Builder: set move speed.
    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    /// Builder: set the ground ray geometry.
    pub fn with_ray(mut self, length: f32, safe_offset: f32) -> Self {
        self.ray_cast_length = length;
        self.ray_safe_offset = safe_offset;
        self
    }

    /// Builder: set the layers the ground ray can hit.
    pub fn with_ground_filter(mut self, filter: u32) -> Self {
        self.ground_filter = filter;
        self
    }

    /// Builder: set the default velocity spring.
    pub fn with_velocity_spring(mut self, mass: f32, damping: f32) -> Self {
        self.velocity_spring.mass = mass;
        self.velocity_spring.damping = damping;
        self
    }

    /// Builder: set the default rotation spring.
    pub fn with_rotation_spring(mut self, mass: f32, damping: f32) -> Self {
        self.rotation_spring.mass = mass;
        self.rotation_spring.damping = damping;
        self
    }

    /// Builder: set the default arcade influence.
    pub fn with_arcade_influence(mut self, influence: Vec3) -> Self {
        self.default_arcade_influence = influence;
        self
    }

    /// Builder: set jump strength.
    pub fn with_jump(mut self, impulse: f32, directed_multiplier: f32) -> Self {
        self.jump_impulse = impulse;
        self.directed_jump_multiplier = directed_multiplier;
        self
    }

    /// Builder: set the vehicle search radius.
    pub fn with_vehicle_search_radius(mut self, radius: f32) -> Self {
        self.vehicle_search_radius = radius;
        self
    }

    /// Builder: override the physics frame rate used by ground snapping.
    pub fn with_physics_frame_rate(mut self, rate: f32) -> Self {
        self.physics_frame_rate = Some(rate);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tuning() {
        let config = ControllerConfig::default();
        assert_eq!(config.move_speed, 4.0);
        assert_eq!(config.velocity_spring, SpringConfig::new(60.0, 50.0, 0.8));
        assert_eq!(config.rotation_spring, SpringConfig::new(60.0, 10.0, 0.5));
        assert_eq!(config.default_arcade_influence, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(config.ground_filter, CollisionLayers::DEFAULT);
        assert_eq!(config.physics_frame_rate, None);
    }

    #[test]
    fn ground_cast_length_includes_safe_offset() {
        let config = ControllerConfig::default().with_ray(1.0, 0.25);
        assert_eq!(config.ground_cast_length(), 1.25);
    }

    #[test]
    fn builders_chain() {
        let config = ControllerConfig::default()
            .with_move_speed(6.0)
            .with_velocity_spring(20.0, 0.7)
            .with_vehicle_search_radius(3.0);

        assert_eq!(config.move_speed, 6.0);
        assert_eq!(config.velocity_spring.mass, 20.0);
        assert_eq!(config.velocity_spring.damping, 0.7);
        assert_eq!(config.velocity_spring.fps, 60.0);
        assert_eq!(config.vehicle_search_radius, 3.0);
    }

    #[test]
    fn spring_config_builds_simulators() {
        let sim = SpringConfig::new(30.0, 7.0, 0.5).vector_simulator();
        assert_eq!(sim.mass, 7.0);
        assert_eq!(sim.damping, 0.5);
    }
}
