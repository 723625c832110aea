//! # `arcade_character_controller`
//!
//! An arcade-style 3D character controller with vehicle seats and a physics
//! backend abstraction.
//!
//! This crate provides a responsive, spring-smoothed character controller that:
//! - Moves a physics body with velocities chosen by a state machine
//! - Smooths velocity and heading with fixed-rate spring simulators
//! - Snaps to the ground found by a single downward ray, riding moving platforms
//! - Walks up to, enters, drives, switches seats in and leaves vehicles
//! - Abstracts the physics backend for easy swapping (Rapier3D included)
//!
//! ## Architecture
//!
//! Every frame, in `Update`:
//! 1. Raw input is routed to the entity holding [`input::InputFocus`]
//! 2. Each registered character runs its state, then its velocity and rotation springs
//!
//! Every physics step, in `FixedPostUpdate`:
//! 1. Bodies are added or removed to match registration and `physics_enabled`
//! 2. A ray finds the ground under each character
//! 3. The backend steps the simulation
//! 4. The simulated velocity is reconciled with the arcade velocity
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use arcade_character_controller::prelude::*;
//!
//! let config = ControllerConfig::default().with_move_speed(4.0);
//! let character = Character::new(&config);
//! let clips = AnimationClips::new().with_clip("idle", 2.0).with_clip("run", 0.7);
//!
//! // Spawn these with a physics body, then register the entity with `add_character`.
//! # let _ = (character, clips);
//! ```

use bevy::prelude::*;

pub mod animation;
pub mod backend;
pub mod behaviour;
pub mod character;
pub mod closest;
pub mod collision;
pub mod config;
pub mod detection;
pub mod input;
pub mod intent;
pub mod reconcile;
pub mod registry;
pub mod signals;
pub mod spring;
pub mod state;
pub mod systems;
pub mod vehicle;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::animation::{AnimationClips, AnimationRequest};
    pub use crate::backend::CharacterPhysicsBackend;
    pub use crate::behaviour::{clear_behaviour, set_behaviour, Behaviour, CharacterBehaviour};
    pub use crate::character::Character;
    pub use crate::closest::ClosestEntityFinder;
    pub use crate::collision::CollisionLayers;
    pub use crate::config::{ControllerConfig, SpringConfig};
    pub use crate::detection::GroundContact;
    pub use crate::input::{CharacterAction, CharacterInput, InputFocus, VehicleAction};
    pub use crate::intent::JumpRequest;
    pub use crate::registry::{add_character, remove_character, take_control, CharacterRegistry, RegistryError};
    pub use crate::signals::{CameraRequest, ControlHint, ControlHints, ScenarioRequest};
    pub use crate::spring::{RelativeSpringSimulator, VectorSpringSimulator};
    pub use crate::state::{CharacterState, StateKind};
    pub use crate::vehicle::{
        SeatType, Vehicle, VehicleCategory, VehicleDoor, VehicleEntryInstance, VehicleInput,
        VehicleSeat,
    };
    pub use crate::{CharacterControllerPlugin, CharacterSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dCharacterBundle};
}

/// System sets of the character controller.
///
/// `Input` and `Simulate` run in `Update`, the physics callbacks in
/// `FixedPostUpdate`. Backends order the physics sets around their step.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterSet {
    /// Route raw input to the focused entity.
    Input,
    /// Run character states, springs and door animation.
    Simulate,
    /// Sync bodies and sense the ground.
    PrePhysicsStep,
    /// Reconcile simulated and arcade velocity.
    PostPhysicsStep,
}

/// Main plugin for the character controller system.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (raycasting, velocity and position access, body toggling).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use arcade_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
///     .add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct CharacterControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for CharacterControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for CharacterControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<character::Character>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<animation::AnimationClips>();
        app.register_type::<detection::GroundContact>();
        app.register_type::<intent::JumpRequest>();
        app.register_type::<input::InputFocus>();
        app.register_type::<registry::CharacterRegistry>();
        app.register_type::<vehicle::Vehicle>();
        app.register_type::<vehicle::VehicleSeat>();
        app.register_type::<vehicle::VehicleDoor>();
        app.register_type::<vehicle::VehicleEntryInstance>();

        app.init_resource::<registry::CharacterRegistry>();
        app.init_resource::<input::InputFocus>();

        app.add_event::<input::CharacterInput>();
        app.add_event::<animation::AnimationRequest>();
        app.add_event::<signals::CameraRequest>();
        app.add_event::<signals::ControlHints>();
        app.add_event::<signals::ScenarioRequest>();
        app.add_event::<vehicle::VehicleInput>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.configure_sets(Update, (CharacterSet::Input, CharacterSet::Simulate).chain());
        app.configure_sets(
            FixedPostUpdate,
            (CharacterSet::PrePhysicsStep, CharacterSet::PostPhysicsStep).chain(),
        );

        app.add_systems(Update, systems::dispatch_input.in_set(CharacterSet::Input));
        app.add_systems(
            Update,
            (systems::update_characters, vehicle::animate_doors)
                .chain()
                .in_set(CharacterSet::Simulate),
        );

        app.add_systems(
            FixedPostUpdate,
            (
                systems::sync_physics_bodies::<B>,
                systems::physics_pre_step::<B>,
            )
                .chain()
                .in_set(CharacterSet::PrePhysicsStep),
        );
        app.add_systems(
            FixedPostUpdate,
            systems::physics_post_step::<B>.in_set(CharacterSet::PostPhysicsStep),
        );
    }
}
