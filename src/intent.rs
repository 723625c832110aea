//! Movement intent helpers.
//!
//! Characters express what they want to do as a local velocity target, a
//! world-space orientation target and an optional [`JumpRequest`]. The
//! functions here convert between the local frame (X = left, Z = forward)
//! and world space on the horizontal plane.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::input::{ActionBindings, CharacterAction};

/// Dot-product tolerance under which two directions count as parallel.
const PARALLEL_TOLERANCE: f32 = 0.0005;

/// A jump waiting for the next physics post-step.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct JumpRequest {
    /// Directed jump speed along the orientation, replacing the current velocity.
    ///
    /// `None` keeps the current velocity and cancels the platform's motion instead.
    pub forced_speed: Option<f32>,
}

impl JumpRequest {
    /// Jump in place, keeping momentum.
    pub fn in_place() -> Self {
        Self { forced_speed: None }
    }

    /// Jump along the orientation with at least `speed`.
    pub fn directed(speed: f32) -> Self {
        Self {
            forced_speed: Some(speed),
        }
    }
}

/// Rotate `local` into world space by the horizontal `heading`.
///
/// `heading` is a unit forward vector; the result keeps `local.y`.
pub fn to_world_xz(heading: Vec3, local: Vec3) -> Vec3 {
    Vec3::new(
        heading.x * local.z + heading.z * local.x,
        local.y,
        heading.z * local.z - heading.x * local.x,
    )
}

/// Angle between two unit vectors, snapped to exactly 0 or PI near the poles.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let dot = a.dot(b);
    if dot > 1.0 - PARALLEL_TOLERANCE {
        0.0
    } else if dot < -1.0 + PARALLEL_TOLERANCE {
        PI
    } else {
        dot.acos()
    }
}

/// Signed angle turning `from` into `to` around world up.
///
/// Positive angles turn counter-clockwise seen from above.
pub fn signed_angle_y(from: Vec3, to: Vec3) -> f32 {
    let angle = angle_between(from, to);
    if Vec3::Y.dot(from.cross(to)) < 0.0 {
        -angle
    } else {
        angle
    }
}

/// Unit vector from the held direction keys, in the local frame.
pub fn local_movement_direction(actions: &ActionBindings<CharacterAction>) -> Vec3 {
    let axis = |positive: CharacterAction, negative: CharacterAction| {
        let mut value = 0.0;
        if actions.is_pressed(positive) {
            value += 1.0;
        }
        if actions.is_pressed(negative) {
            value -= 1.0;
        }
        value
    };
    Vec3::new(
        axis(CharacterAction::Left, CharacterAction::Right),
        0.0,
        axis(CharacterAction::Up, CharacterAction::Down),
    )
    .normalize_or_zero()
}

/// Held direction keys rotated into world space by the flattened camera view.
pub fn camera_relative_movement(view_vector: Vec3, actions: &ActionBindings<CharacterAction>) -> Vec3 {
    let flat_view = Vec3::new(view_vector.x, 0.0, view_vector.z).normalize_or_zero();
    to_world_xz(flat_view, local_movement_direction(actions))
}

/// Flatten onto the ground plane and normalize.
pub fn flatten(direction: Vec3) -> Vec3 {
    Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero()
}

pub fn have_different_signs(a: f32, b: f32) -> bool {
    (a < 0.0) != (b < 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn forward_heading_is_identity() {
        let local = Vec3::new(0.3, 0.7, 0.9);
        assert!(close(to_world_xz(Vec3::Z, local), local));
    }

    #[test]
    fn heading_rotates_forward_axis() {
        assert!(close(to_world_xz(Vec3::X, Vec3::Z), Vec3::X));
        assert!(close(to_world_xz(Vec3::X, Vec3::X), Vec3::NEG_Z));
    }

    #[test]
    fn signed_angle_sign_follows_up_axis() {
        assert!((signed_angle_y(Vec3::Z, Vec3::X) - FRAC_PI_2).abs() < 1e-5);
        assert!((signed_angle_y(Vec3::Z, Vec3::NEG_X) + FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn nearly_parallel_vectors_snap() {
        let almost = Vec3::new(0.01, 0.0, 1.0).normalize();
        assert_eq!(signed_angle_y(Vec3::Z, almost), 0.0);
        assert_eq!(angle_between(Vec3::Z, Vec3::NEG_Z), PI);
    }

    #[test]
    fn different_signs() {
        assert!(have_different_signs(-1.0, 2.0));
        assert!(!have_different_signs(1.0, 2.0));
        assert!(!have_different_signs(0.0, 3.0));
    }

    #[test]
    fn diagonal_movement_is_normalized() {
        let mut actions = ActionBindings::character_defaults();
        actions.set(CharacterAction::Up, true);
        actions.set(CharacterAction::Left, true);

        let direction = local_movement_direction(&actions);
        assert!((direction.length() - 1.0).abs() < 1e-5);
        assert!(direction.x > 0.0 && direction.z > 0.0);
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut actions = ActionBindings::character_defaults();
        actions.set(CharacterAction::Up, true);
        actions.set(CharacterAction::Down, true);

        assert_eq!(local_movement_direction(&actions), Vec3::ZERO);
    }

    #[test]
    fn camera_relative_forward_follows_view() {
        let mut actions = ActionBindings::character_defaults();
        actions.set(CharacterAction::Up, true);

        let movement = camera_relative_movement(Vec3::new(1.0, -0.5, 0.0), &actions);
        assert!(close(movement, Vec3::X));
    }
}
