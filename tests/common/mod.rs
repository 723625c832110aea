//! Shared helpers for the integration tests.
//!
//! [`MockBackend`] stands in for a physics engine: bodies fall under gravity
//! without colliding, and the ground is a set of flat horizontal slabs that
//! only the downward raycast can see.

#![allow(dead_code)]

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use arcade_character_controller::backend::{CharacterPhysicsBackend, RaycastRequest};
use arcade_character_controller::collision::RayHit;
use arcade_character_controller::prelude::*;

pub const GRAVITY: f32 = -9.81;
pub const TIMESTEP: f64 = 1.0 / 60.0;

/// A simulated body.
#[derive(Component, Debug, Clone, Copy)]
pub struct MockBody {
    pub velocity: Vec3,
    /// Moves at constant velocity, ignoring gravity.
    pub kinematic: bool,
    pub active: bool,
}

impl MockBody {
    pub fn dynamic() -> Self {
        Self {
            velocity: Vec3::ZERO,
            kinematic: false,
            active: true,
        }
    }

    pub fn kinematic(velocity: Vec3) -> Self {
        Self {
            velocity,
            kinematic: true,
            active: true,
        }
    }
}

/// Flat square ground, `half_extent` wide around its center.
#[derive(Debug, Clone, Copy)]
pub struct MockSlab {
    pub center: Vec3,
    pub half_extent: f32,
    /// Surface normal reported by hits. The slab itself stays flat.
    pub normal: Vec3,
    pub layers: u32,
    /// Body carrying the slab; its transform moves the slab.
    pub body: Option<Entity>,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct MockGround {
    pub slabs: Vec<MockSlab>,
}

pub struct MockBackend;

impl CharacterPhysicsBackend for MockBackend {
    fn plugin() -> impl Plugin {
        MockPhysicsPlugin
    }

    fn raycast_closest(world: &mut World, request: &RaycastRequest) -> Option<RayHit> {
        let ground = world.get_resource::<MockGround>()?;
        let start = request.start;
        let mut best: Option<RayHit> = None;

        for slab in &ground.slabs {
            if slab.layers & request.filter == 0 || (slab.body.is_some() && slab.body == request.exclude) {
                continue;
            }
            let center = slab
                .body
                .and_then(|body| world.get::<Transform>(body))
                .map_or(slab.center, |t| t.translation);
            let inside = (start.x - center.x).abs() <= slab.half_extent
                && (start.z - center.z).abs() <= slab.half_extent;
            if !inside || center.y > start.y || center.y < request.end.y {
                continue;
            }
            let distance = start.y - center.y;
            if best.is_none_or(|hit| distance < hit.distance) {
                best = Some(RayHit::new(
                    Vec3::new(start.x, center.y, start.z),
                    slab.normal,
                    slab.body,
                    distance,
                ));
            }
        }
        best
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<MockBody>(entity)
            .map(|b| b.velocity)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut body) = world.get_mut::<MockBody>(entity) {
            body.velocity = velocity;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_position(world: &mut World, entity: Entity, position: Vec3) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = position;
        }
    }

    fn velocity_at_point(world: &World, entity: Entity, _point: Vec3) -> Vec3 {
        Self::get_velocity(world, entity)
    }

    fn has_body(world: &World, entity: Entity) -> bool {
        world.get::<MockBody>(entity).is_some_and(|b| b.active)
    }

    fn add_body(world: &mut World, entity: Entity) {
        if let Some(mut body) = world.get_mut::<MockBody>(entity) {
            body.active = true;
            return;
        }
        world.entity_mut(entity).insert(MockBody::dynamic());
    }

    fn remove_body(world: &mut World, entity: Entity) {
        if let Some(mut body) = world.get_mut::<MockBody>(entity) {
            body.active = false;
            body.velocity = Vec3::ZERO;
        }
    }
}

pub struct MockPhysicsPlugin;

impl Plugin for MockPhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MockGround>();
        app.add_systems(
            FixedPostUpdate,
            mock_step
                .after(CharacterSet::PrePhysicsStep)
                .before(CharacterSet::PostPhysicsStep),
        );
    }
}

fn mock_step(time: Res<Time>, mut bodies: Query<(&mut MockBody, &mut Transform)>) {
    let dt = time.delta_secs();
    for (mut body, mut transform) in &mut bodies {
        if !body.active {
            continue;
        }
        if !body.kinematic {
            body.velocity.y += GRAVITY * dt;
        }
        transform.translation += body.velocity * dt;
    }
}

/// App with the controller on the mock backend, advancing one physics step per update.
pub fn create_test_app() -> App {
    create_test_app_with_timestep(TIMESTEP)
}

/// Like [`create_test_app`], with frames and physics steps of `timestep` seconds.
pub fn create_test_app_with_timestep(timestep: f64) -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(CharacterControllerPlugin::<MockBackend>::default());
    app.insert_resource(Time::<Fixed>::from_seconds(timestep));
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(timestep)));

    app.finish();
    app.cleanup();
    // the first update only starts the clocks
    app.update();
    app
}

pub fn tick(app: &mut App) {
    app.update();
}

pub fn run_frames(app: &mut App, frames: usize) {
    for _ in 0..frames {
        tick(app);
    }
}

/// Static ground whose top is at `height`.
pub fn spawn_floor(app: &mut App, height: f32) {
    app.world_mut()
        .resource_mut::<MockGround>()
        .slabs
        .push(MockSlab {
            center: Vec3::new(0.0, height, 0.0),
            half_extent: 100.0,
            normal: Vec3::Y,
            layers: CollisionLayers::DEFAULT,
            body: None,
        });
}

/// Static ground at `height` whose hits report `normal`, standing in for a slope.
pub fn spawn_slope(app: &mut App, height: f32, normal: Vec3) {
    app.world_mut()
        .resource_mut::<MockGround>()
        .slabs
        .push(MockSlab {
            center: Vec3::new(0.0, height, 0.0),
            half_extent: 100.0,
            normal: normal.normalize(),
            layers: CollisionLayers::DEFAULT,
            body: None,
        });
}

/// Kinematic platform whose top follows its transform.
pub fn spawn_platform(app: &mut App, position: Vec3, half_extent: f32, velocity: Vec3) -> Entity {
    let platform = app
        .world_mut()
        .spawn((Transform::from_translation(position), MockBody::kinematic(velocity)))
        .id();
    app.world_mut()
        .resource_mut::<MockGround>()
        .slabs
        .push(MockSlab {
            center: position,
            half_extent,
            normal: Vec3::Y,
            layers: CollisionLayers::DEFAULT,
            body: Some(platform),
        });
    platform
}

/// Character with a body and the clips the locomotion states rely on.
pub fn spawn_character(app: &mut App, position: Vec3) -> Entity {
    let config = ControllerConfig::default();
    app.world_mut()
        .spawn((
            Transform::from_translation(position),
            Character::new(&config),
            config,
            AnimationClips::new()
                .with_clip("idle", 2.0)
                .with_clip("jump_idle", 1.0)
                .with_clip("jump_running", 1.0)
                .with_clip("falling", 1.0),
            MockBody::dynamic(),
        ))
        .id()
}

/// Register and focus a character, then let it settle on the ground.
pub fn spawn_player(app: &mut App, position: Vec3) -> Entity {
    let entity = spawn_character(app, position);
    add_character(app.world_mut(), entity).expect("fresh character");
    take_control(app.world_mut(), entity).expect("registered character");
    run_frames(app, 10);
    entity
}

pub fn press(app: &mut App, code: KeyCode) {
    app.world_mut().send_event(CharacterInput::Keyboard {
        code,
        pressed: true,
        shift: false,
    });
}

pub fn release(app: &mut App, code: KeyCode) {
    app.world_mut().send_event(CharacterInput::Keyboard {
        code,
        pressed: false,
        shift: false,
    });
}

pub fn character(app: &App, entity: Entity) -> &Character {
    app.world()
        .get::<Character>(entity)
        .expect("character entity")
}

pub fn position(app: &App, entity: Entity) -> Vec3 {
    app.world()
        .get::<Transform>(entity)
        .map(|t| t.translation)
        .expect("transform")
}

pub fn state(app: &App, entity: Entity) -> StateKind {
    character(app, entity).state_kind()
}
