//! Outgoing requests to collaborators the controller doesn't own.
//!
//! The camera, the HUD and the scenario runner listen for these events.

use bevy::prelude::*;

/// Camera changes asked for by whoever holds input focus.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum CameraRequest {
    /// Orbit `target` at `radius`. `follow_mode` locks the camera behind it.
    Follow {
        target: Entity,
        radius: f32,
        follow_mode: bool,
    },
    /// Orbit by a mouse delta.
    Orbit { delta: Vec2 },
    /// Detach into a free-flying camera, returning focus to `caller` afterwards.
    FreeCamera { caller: Entity },
}

/// One line of the on-screen controls overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlHint {
    pub keys: Vec<String>,
    pub description: String,
}

impl ControlHint {
    pub fn new<const N: usize>(keys: [&str; N], description: &str) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            description: description.to_string(),
        }
    }
}

/// Replace the on-screen controls overlay. Empty hides it.
#[derive(Event, Debug, Clone, PartialEq, Default)]
pub struct ControlHints {
    pub hints: Vec<ControlHint>,
}

/// Requests for the scenario runner.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum ScenarioRequest {
    /// Respawn everything in the current scenario.
    Restart,
    /// Scroll the simulation time scale by a wheel amount.
    ScrollTimeScale(f32),
}

/// Hints shown while walking around.
pub fn on_foot_hints() -> Vec<ControlHint> {
    vec![
        ControlHint::new(["W", "A", "S", "D"], "Movement"),
        ControlHint::new(["Shift"], "Sprint"),
        ControlHint::new(["Space"], "Jump"),
        ControlHint::new(["F", "or", "G"], "Enter vehicle"),
        ControlHint::new(["Shift", "+", "R"], "Respawn"),
        ControlHint::new(["Shift", "+", "C"], "Free camera"),
    ]
}
