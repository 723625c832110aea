//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.
//!
//! Run Rapier in the fixed schedule so the controller's pre- and post-step
//! systems can wrap its step:
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_rapier3d::prelude::*;
//! use arcade_character_controller::prelude::*;
//!
//! App::new()
//!     .add_plugins(DefaultPlugins)
//!     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
//!     .add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default())
//!     .run();
//! ```

use bevy::ecs::system::SystemState;
use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::prelude::*;

use crate::backend::{CharacterPhysicsBackend, RaycastRequest};
use crate::collision::{CollisionLayers, RayHit};
use crate::CharacterSet;

/// Whether a hit normal faces back along the ray.
///
/// Rejects back faces of trimeshes, and the zero normal of a ray that
/// starts inside a solid collider.
fn faces_ray(normal: Vec3, direction: Vec3) -> bool {
    normal.dot(direction) < 0.0
}

/// Rapier3D physics backend for the character controller.
///
/// Bodies are taken out of the simulation with [`RigidBodyDisabled`] and
/// [`ColliderDisabled`] rather than despawned, so a character keeps its
/// collider setup while seated in a vehicle.
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn raycast_closest(world: &mut World, request: &RaycastRequest) -> Option<RayHit> {
        let direction = request.direction();
        if direction == Vec3::ZERO {
            return None;
        }

        let mut state: SystemState<ReadRapierContext> = SystemState::new(world);
        let rapier_context = state.get(world);
        let Ok(context) = rapier_context.single() else {
            return None;
        };

        let mut filter = QueryFilter::default()
            .exclude_sensors()
            .groups(CollisionGroups::new(
                Group::ALL,
                Group::from_bits_truncate(request.filter),
            ));
        if let Some(exclude) = request.exclude {
            filter = filter.exclude_rigid_body(exclude);
        }

        context
            .cast_ray_and_get_normal(
                request.start,
                direction,
                request.max_distance(),
                true,
                filter,
            )
            .filter(|(_, hit)| faces_ray(hit.normal, direction))
            .map(|(hit_entity, hit)| {
                RayHit::new(hit.point, hit.normal, Some(hit_entity), hit.time_of_impact)
            })
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| world.get::<GlobalTransform>(entity).map(|t| t.translation()))
            .unwrap_or(Vec3::ZERO)
    }

    fn set_position(world: &mut World, entity: Entity, position: Vec3) {
        // Rapier picks up the changed transform on its next sync.
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = position;
        }
    }

    fn velocity_at_point(world: &World, entity: Entity, point: Vec3) -> Vec3 {
        match world.get::<RigidBody>(entity) {
            None | Some(RigidBody::Fixed) => return Vec3::ZERO,
            Some(_) => {}
        }
        let Some(velocity) = world.get::<Velocity>(entity) else {
            return Vec3::ZERO;
        };

        let local_center = world
            .get::<ReadMassProperties>(entity)
            .map(|props| props.local_center_of_mass)
            .unwrap_or(Vec3::ZERO);
        let center = world
            .get::<GlobalTransform>(entity)
            .map(|t| t.transform_point(local_center))
            .unwrap_or(point);

        velocity.linvel + velocity.angvel.cross(point - center)
    }

    fn has_body(world: &World, entity: Entity) -> bool {
        world.get::<RigidBody>(entity).is_some() && world.get::<RigidBodyDisabled>(entity).is_none()
    }

    fn add_body(world: &mut World, entity: Entity) {
        if let Ok(mut entity) = world.get_entity_mut(entity) {
            entity.remove::<(RigidBodyDisabled, ColliderDisabled)>();
        }
    }

    fn remove_body(world: &mut World, entity: Entity) {
        if let Ok(mut entity) = world.get_entity_mut(entity) {
            entity.insert((RigidBodyDisabled, ColliderDisabled));
        }
    }
}

/// Plugin that orders the controller's physics callbacks around Rapier's step.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        // Pending teleports must land before Rapier syncs transforms, and the
        // reconciler needs the written-back velocities.
        app.configure_sets(
            FixedPostUpdate,
            (
                CharacterSet::PrePhysicsStep.before(PhysicsSet::SyncBackend),
                CharacterSet::PostPhysicsStep.after(PhysicsSet::Writeback),
            ),
        );
    }
}

/// Bundle of Rapier components for a character body.
///
/// Add a collider alongside it; a capsule of radius 0.25 and half height 0.25
/// matches the default ray length.
///
/// # Example
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use arcade_character_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         Character::default(),
///         ControllerConfig::default(),
///         Rapier3dCharacterBundle::new(),
///         Collider::capsule_y(0.25, 0.25),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `locked_axes`: [`LockedAxes::ROTATION_LOCKED`], the model is turned by the controller
/// - `damping`: none, the reconciler owns horizontal motion
/// - `friction`: zero, combined with [`CoefficientCombineRule::Min`]
/// - `collision_groups`: member of [`CollisionLayers::CHARACTERS`], colliding with everything
#[derive(Bundle)]
pub struct Rapier3dCharacterBundle {
    /// The rigid body type. Should typically be [`RigidBody::Dynamic`] for characters.
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity. Updated by Rapier each physics step.
    pub velocity: Velocity,
    pub locked_axes: LockedAxes,
    pub damping: Damping,
    pub friction: Friction,
    /// Keeps the ground ray from striking other characters.
    pub collision_groups: CollisionGroups,
    /// Computed mass properties. Rapier updates this based on the entity's collider.
    pub mass_properties: ReadMassProperties,
}

impl Default for Rapier3dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dCharacterBundle {
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 0.0,
            },
            friction: Friction {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            },
            collision_groups: CollisionGroups::new(
                Group::from_bits_truncate(CollisionLayers::CHARACTERS),
                Group::ALL,
            ),
            mass_properties: ReadMassProperties::default(),
        }
    }

    /// Set the rigid body type for the character.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set the damping coefficients for velocity reduction.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }

    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }

    /// Replace the collision groups, e.g. to let characters stand on each other.
    pub fn with_collision_groups(mut self, memberships: u32, filters: u32) -> Self {
        self.collision_groups = CollisionGroups::new(
            Group::from_bits_truncate(memberships),
            Group::from_bits_truncate(filters),
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        app
    }

    #[test]
    fn rapier_backend_get_position() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((Transform::from_xyz(1.0, 2.0, 3.0), RigidBody::Dynamic))
            .id();

        app.update();

        let pos = Rapier3dBackend::get_position(app.world(), entity);
        assert!((pos - Vec3::new(1.0, 2.0, 3.0)).length() < 0.01);
    }

    #[test]
    fn rapier_backend_velocity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                RigidBody::Dynamic,
                Velocity::linear(Vec3::new(5.0, 0.0, 3.0)),
            ))
            .id();

        Rapier3dBackend::set_velocity(app.world_mut(), entity, Vec3::new(1.0, 0.0, 0.0));

        let vel = Rapier3dBackend::get_velocity(app.world(), entity);
        assert!((vel - Vec3::X).length() < 0.01);
    }

    #[test]
    fn removing_a_body_disables_it() {
        let mut app = create_test_app();
        let entity = app
            .world_mut()
            .spawn((Transform::default(), Rapier3dCharacterBundle::new()))
            .id();
        assert!(Rapier3dBackend::has_body(app.world(), entity));

        Rapier3dBackend::remove_body(app.world_mut(), entity);
        assert!(!Rapier3dBackend::has_body(app.world(), entity));
        assert!(app.world().get::<ColliderDisabled>(entity).is_some());

        Rapier3dBackend::add_body(app.world_mut(), entity);
        assert!(Rapier3dBackend::has_body(app.world(), entity));
        assert!(app.world().get::<ColliderDisabled>(entity).is_none());
    }

    #[test]
    fn fixed_and_missing_bodies_have_no_point_velocity() {
        let mut app = create_test_app();
        let fixed = app
            .world_mut()
            .spawn((Transform::default(), RigidBody::Fixed, Velocity::linear(Vec3::X)))
            .id();
        let plain = app.world_mut().spawn(Transform::default()).id();

        assert_eq!(Rapier3dBackend::velocity_at_point(app.world(), fixed, Vec3::ZERO), Vec3::ZERO);
        assert_eq!(Rapier3dBackend::velocity_at_point(app.world(), plain, Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn spinning_platform_moves_its_rim() {
        let mut app = create_test_app();
        let platform = app
            .world_mut()
            .spawn((
                Transform::default(),
                GlobalTransform::default(),
                RigidBody::KinematicVelocityBased,
                Velocity {
                    linvel: Vec3::ZERO,
                    angvel: Vec3::Y,
                },
            ))
            .id();

        let rim = Rapier3dBackend::velocity_at_point(app.world(), platform, Vec3::new(2.0, 0.0, 0.0));
        // rotating about +Y carries +X toward -Z
        assert!((rim - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn character_bundle_defaults() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                Rapier3dCharacterBundle::new(),
                Collider::capsule_y(0.25, 0.25),
            ))
            .id();

        app.update();

        assert_eq!(app.world().get::<RigidBody>(entity), Some(&RigidBody::Dynamic));
        assert_eq!(app.world().get::<LockedAxes>(entity), Some(&LockedAxes::ROTATION_LOCKED));
        assert_eq!(app.world().get::<Friction>(entity).map(|f| f.coefficient), Some(0.0));
    }

    #[test]
    fn ground_rays_keep_only_front_faces() {
        let down = Vec3::NEG_Y;
        assert!(faces_ray(Vec3::Y, down));
        assert!(faces_ray(Vec3::new(0.0, 0.9, -0.4).normalize(), down));
        assert!(!faces_ray(Vec3::NEG_Y, down), "back face");
        assert!(!faces_ray(Vec3::ZERO, down), "ray started inside the collider");
        assert!(!faces_ray(Vec3::X, down), "grazing hit");
    }
}
