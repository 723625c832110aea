//! Velocity reconciliation.
//!
//! After every physics step the simulated body velocity is blended with the
//! "arcade" velocity the character wants, then corrected for the ground:
//! vertical motion is removed, the ground body's motion is added and the
//! result is turned onto the slope. Jumps are resolved last.
//!
//! Everything here is pure; [`crate::systems::physics_post_step`] reads the
//! inputs from the world and writes the outcome back through the backend.

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::detection::GroundContact;
use crate::intent::{have_different_signs, to_world_xz, JumpRequest};

/// Frame rate used when neither the configuration nor the world provides one.
/// Matches the default `Time<Fixed>` step.
pub const DEFAULT_PHYSICS_FRAME_RATE: f32 = 64.0;

/// Character state read by the reconciler.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput {
    /// Body velocity after the physics step.
    pub simulated_velocity: Vec3,
    /// Body position after the physics step.
    pub body_position: Vec3,
    /// Smoothed local velocity.
    pub local_velocity: Vec3,
    /// Local velocity target of the current state.
    pub velocity_target: Vec3,
    /// Unit horizontal facing.
    pub orientation: Vec3,
    pub influence: Vec3,
    pub additive: bool,
    pub ground: Option<GroundContact>,
    pub jump: Option<JumpRequest>,
}

/// Constants the reconciler needs from the configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileParams {
    pub move_speed: f32,
    pub ray_cast_length: f32,
    pub ray_safe_offset: f32,
    pub physics_frame_rate: f32,
    pub jump_impulse: f32,
    pub directed_jump_multiplier: f32,
}

impl From<&ControllerConfig> for ReconcileParams {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            move_speed: config.move_speed,
            ray_cast_length: config.ray_cast_length,
            ray_safe_offset: config.ray_safe_offset,
            physics_frame_rate: config.physics_frame_rate.unwrap_or(DEFAULT_PHYSICS_FRAME_RATE),
            jump_impulse: config.jump_impulse,
            directed_jump_multiplier: config.directed_jump_multiplier,
        }
    }
}

/// What to write back to the body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileOutcome {
    pub velocity: Vec3,
    /// New body position, when it has to move.
    pub position: Option<Vec3>,
    /// Velocity to remember as the landing impact, while airborne.
    pub airborne_velocity: Option<Vec3>,
    /// Whether a pending jump was consumed.
    pub jumped: bool,
}

/// World-space velocity the character wants, from its smoothed local velocity.
pub fn arcade_velocity(orientation: Vec3, local_velocity: Vec3, move_speed: f32) -> Vec3 {
    to_world_xz(orientation, local_velocity * move_speed)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Blend the simulated velocity with the arcade velocity, per axis.
///
/// In blend mode every axis is interpolated by its influence. In additive
/// mode the weighted arcade velocity is added on an axis only while the body
/// is slower than the target there, or moving against the arcade velocity.
pub fn blend_velocity(
    simulated: Vec3,
    arcade: Vec3,
    target_world: Vec3,
    influence: Vec3,
    additive: bool,
) -> Vec3 {
    if additive {
        let add = arcade * influence;
        let axis = |s: f32, a: f32, t: f32, add: f32| {
            if s.abs() < t.abs() || have_different_signs(s, a) {
                s + add
            } else {
                s
            }
        };
        Vec3::new(
            axis(simulated.x, arcade.x, target_world.x, add.x),
            axis(simulated.y, arcade.y, target_world.y, add.y),
            axis(simulated.z, arcade.z, target_world.z, add.z),
        )
    } else {
        Vec3::new(
            lerp(simulated.x, arcade.x, influence.x),
            lerp(simulated.y, arcade.y, influence.y),
            lerp(simulated.z, arcade.z, influence.z),
        )
    }
}

/// Resolve one post-step for a character with physics enabled.
pub fn reconcile(input: &ReconcileInput, params: &ReconcileParams) -> ReconcileOutcome {
    let arcade = arcade_velocity(input.orientation, input.local_velocity, params.move_speed);
    let target_world = to_world_xz(input.orientation, input.velocity_target * params.move_speed);
    let mut velocity = blend_velocity(
        input.simulated_velocity,
        arcade,
        target_world,
        input.influence,
        input.additive,
    );

    let mut position = None;
    let mut airborne_velocity = None;

    match input.ground {
        Some(ground) => {
            velocity.y = 0.0;
            velocity += ground.point_velocity;
            velocity = Quat::from_rotation_arc(Vec3::Y, ground.normal) * velocity;

            let mut snapped = input.body_position;
            snapped.y =
                ground.point.y + params.ray_cast_length + velocity.y / params.physics_frame_rate;
            position = Some(snapped);
        }
        None => {
            airborne_velocity = Some(velocity);
        }
    }

    let jumped = input.jump.is_some();
    if let Some(jump) = input.jump {
        match jump.forced_speed {
            Some(forced) => {
                let speed = (input.local_velocity.length() * params.directed_jump_multiplier).max(forced);
                velocity = input.orientation * speed;
            }
            None => {
                if let Some(ground) = input.ground {
                    velocity -= ground.point_velocity;
                }
            }
        }
        velocity.y += params.jump_impulse;

        let mut lifted = position.unwrap_or(input.body_position);
        lifted.y += params.ray_safe_offset * 2.0;
        position = Some(lifted);
    }

    ReconcileOutcome {
        velocity,
        position,
        airborne_velocity,
        jumped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params() -> ReconcileParams {
        ReconcileParams::from(&ControllerConfig::default())
    }

    fn standing_still() -> ReconcileInput {
        ReconcileInput {
            simulated_velocity: Vec3::ZERO,
            body_position: Vec3::new(0.0, 0.6, 0.0),
            local_velocity: Vec3::ZERO,
            velocity_target: Vec3::ZERO,
            orientation: Vec3::Z,
            influence: Vec3::new(1.0, 0.0, 1.0),
            additive: false,
            ground: None,
            jump: None,
        }
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn blend_is_idempotent_when_already_at_target(#[case] additive: bool) {
        let arcade = Vec3::new(1.0, 0.0, 3.2);
        let blended = blend_velocity(arcade, arcade, arcade, Vec3::new(1.0, 0.0, 1.0), additive);
        assert!(close(blended, arcade), "{blended:?}");
    }

    #[test]
    fn blend_mode_interpolates_per_axis() {
        let blended = blend_velocity(
            Vec3::new(0.0, -3.0, 4.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::new(0.5, 0.0, 0.25),
            false,
        );
        assert!(close(blended, Vec3::new(1.0, -3.0, 3.0)));
    }

    #[test]
    fn additive_mode_adds_only_below_target_or_against_motion() {
        let blended = blend_velocity(
            Vec3::new(5.0, 0.0, -1.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::splat(0.5),
            true,
        );
        // x is already faster than the target in the same direction
        assert_eq!(blended.x, 5.0);
        // z opposes the arcade velocity
        assert_eq!(blended.z, 0.0);
    }

    #[test]
    fn grounded_body_snaps_to_ray_length_above_ground() {
        let mut input = standing_still();
        input.body_position = Vec3::new(0.0, 1.05, 0.0);
        input.simulated_velocity = Vec3::new(0.0, -2.0, 0.0);
        input.ground = Some(GroundContact::stationary(Vec3::new(0.0, 0.5, 0.0), Vec3::Y));

        let outcome = reconcile(&input, &params());

        assert_eq!(outcome.velocity.y, 0.0);
        let position = outcome.position.expect("grounded body is repositioned");
        assert!((position.y - (0.5 + 0.57)).abs() < 1e-5);
        assert!(outcome.airborne_velocity.is_none());
    }

    #[test]
    fn slope_snap_uses_the_step_rate() {
        let mut input = standing_still();
        input.local_velocity = Vec3::new(0.0, 0.0, 1.0);
        input.ground = Some(GroundContact::stationary(
            Vec3::ZERO,
            Vec3::new(0.0, 1.0, -1.0).normalize(),
        ));
        let mut params = params();
        params.physics_frame_rate = 50.0;

        let outcome = reconcile(&input, &params);

        let position = outcome.position.expect("grounded body is repositioned");
        assert!(outcome.velocity.y > 0.0);
        assert!((position.y - (0.57 + outcome.velocity.y / 50.0)).abs() < 1e-5);
    }

    #[test]
    fn grounded_velocity_follows_slope_and_platform() {
        let mut input = standing_still();
        input.local_velocity = Vec3::new(0.0, 0.0, 1.0);
        let normal = Vec3::new(0.0, 1.0, -1.0).normalize();
        input.ground = Some(GroundContact {
            point: Vec3::ZERO,
            normal,
            body: None,
            point_velocity: Vec3::new(1.0, 0.0, 0.0),
        });

        let outcome = reconcile(&input, &params());

        assert!(outcome.velocity.dot(normal).abs() < 1e-4, "velocity lies on the slope");
        assert!(outcome.velocity.y > 0.0, "walking forward goes uphill");
        assert!((outcome.velocity.x - 1.0).abs() < 1e-4, "platform motion carried");
    }

    #[test]
    fn airborne_velocity_is_remembered() {
        let mut input = standing_still();
        input.simulated_velocity = Vec3::new(0.0, -7.0, 0.0);

        let outcome = reconcile(&input, &params());

        assert_eq!(outcome.velocity, Vec3::new(0.0, -7.0, 0.0));
        assert_eq!(outcome.airborne_velocity, Some(outcome.velocity));
        assert!(outcome.position.is_none());
    }

    #[test]
    fn jump_in_place_adds_impulse_and_lifts_body() {
        let mut input = standing_still();
        input.ground = Some(GroundContact::stationary(Vec3::ZERO, Vec3::Y));
        input.jump = Some(JumpRequest::in_place());

        let outcome = reconcile(&input, &params());

        assert!(outcome.jumped);
        assert!((outcome.velocity.y - 4.0).abs() < 1e-5);
        let position = outcome.position.expect("jump lifts the body");
        assert!((position.y - (0.57 + 0.06)).abs() < 1e-5);
    }

    #[test]
    fn jump_in_place_cancels_platform_motion() {
        let mut input = standing_still();
        input.ground = Some(GroundContact {
            point: Vec3::ZERO,
            normal: Vec3::Y,
            body: None,
            point_velocity: Vec3::new(3.0, 0.0, 0.0),
        });
        input.jump = Some(JumpRequest::in_place());

        let outcome = reconcile(&input, &params());

        assert!(outcome.velocity.x.abs() < 1e-5);
    }

    #[test]
    fn directed_jump_uses_the_larger_speed() {
        let mut input = standing_still();
        input.orientation = Vec3::X;
        input.local_velocity = Vec3::new(0.0, 0.0, 1.5);
        input.jump = Some(JumpRequest::directed(4.0));

        let outcome = reconcile(&input, &params());

        assert!(close(outcome.velocity, Vec3::new(6.0, 4.0, 0.0)), "{:?}", outcome.velocity);
    }
}
