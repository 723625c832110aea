//! Vehicles, seats and doors, and how characters get in and out of them.
//!
//! A [`Vehicle`] lists its [`VehicleSeat`] entities. Seats are posed by their
//! own transform (usually a child of the vehicle) and list the entry points a
//! character walks to before climbing in. A seat may have a [`VehicleDoor`]
//! whose rotation (0 closed, 1 open) decides whether the character has to
//! open it first.
//!
//! While a character sits in a vehicle it has no physics body and follows the
//! seat through its vehicle's transform every frame.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::character::{self, Character};
use crate::closest::ClosestEntityFinder;
use crate::config::ControllerConfig;
use crate::input::{ActionBindings, CharacterAction, InputFocus, VehicleAction};
use crate::signals::{CameraRequest, ControlHint, ScenarioRequest};
use crate::spring::SpringSimulator;
use crate::state::{self, CharacterState};

/// Door rotation counted as settled on its target.
const DOOR_SETTLE_EPSILON: f32 = 0.01;
/// Doors open less than this are opened before entering.
const DOOR_OPEN_FOR_ENTRY: f32 = 0.5;
const DEFAULT_CAMERA_RADIUS: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum VehicleCategory {
    #[default]
    Car,
    Helicopter,
    Airplane,
}

/// A drivable vehicle.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct Vehicle {
    pub category: VehicleCategory,
    /// Seat entities, in the order they are searched.
    pub seats: Vec<Entity>,
    pub controlling_character: Option<Entity>,
    /// Camera follow distance while driven.
    pub camera_radius: f32,
    #[reflect(ignore)]
    pub actions: ActionBindings<VehicleAction>,
}

impl Default for Vehicle {
    fn default() -> Self {
        Self::new(VehicleCategory::Car)
    }
}

impl Vehicle {
    pub fn new(category: VehicleCategory) -> Self {
        Self {
            category,
            seats: Vec::new(),
            controlling_character: None,
            camera_radius: DEFAULT_CAMERA_RADIUS,
            actions: ActionBindings::vehicle_defaults(),
        }
    }

    pub fn with_seats(mut self, seats: impl IntoIterator<Item = Entity>) -> Self {
        self.seats = seats.into_iter().collect();
        self
    }

    pub fn with_camera_radius(mut self, radius: f32) -> Self {
        self.camera_radius = radius;
        self
    }

    pub fn no_direction_pressed(&self) -> bool {
        !self.actions.any_pressed(&VehicleAction::DIRECTIONS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum SeatType {
    #[default]
    Driver,
    Passenger,
}

/// A seat inside a vehicle.
///
/// `occupied_by` is the backlink of `Character::occupying_seat`; both are
/// only changed through [`occupy_seat`] and [`leave_seat`].
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct VehicleSeat {
    pub vehicle: Entity,
    pub seat_type: SeatType,
    /// Seats reachable by sliding over without getting out.
    pub connected_seats: Vec<Entity>,
    pub entry_points: Vec<Entity>,
    pub door: Option<Entity>,
    pub occupied_by: Option<Entity>,
}

impl VehicleSeat {
    pub fn new(vehicle: Entity, seat_type: SeatType) -> Self {
        Self {
            vehicle,
            seat_type,
            connected_seats: Vec::new(),
            entry_points: Vec::new(),
            door: None,
            occupied_by: None,
        }
    }

    pub fn with_entry_points(mut self, points: impl IntoIterator<Item = Entity>) -> Self {
        self.entry_points = points.into_iter().collect();
        self
    }

    pub fn with_connected_seats(mut self, seats: impl IntoIterator<Item = Entity>) -> Self {
        self.connected_seats = seats.into_iter().collect();
        self
    }

    pub fn with_door(mut self, door: Entity) -> Self {
        self.door = Some(door);
        self
    }
}

/// A hinged door, swung by a spring between closed (0) and open (1).
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct VehicleDoor {
    pub rotation: f32,
    pub target_rotation: f32,
    /// Whether the door is still swinging toward its target.
    pub achieving_target_rotation: bool,
    #[reflect(ignore)]
    simulator: SpringSimulator,
}

impl Default for VehicleDoor {
    fn default() -> Self {
        Self {
            rotation: 0.0,
            target_rotation: 0.0,
            achieving_target_rotation: false,
            simulator: SpringSimulator::default(),
        }
    }
}

impl VehicleDoor {
    pub fn open(&mut self) {
        self.swing_to(1.0);
    }

    pub fn close(&mut self) {
        self.swing_to(0.0);
    }

    fn swing_to(&mut self, target: f32) {
        self.target_rotation = target;
        self.achieving_target_rotation = true;
    }

    /// Pin the door fully open, e.g. while someone climbs through it.
    pub fn hold_open(&mut self) {
        self.rotation = 1.0;
        self.target_rotation = 1.0;
        self.achieving_target_rotation = false;
        self.simulator.reset_to(1.0, 0.0);
        self.simulator.target = 1.0;
    }

    pub fn update(&mut self, dt: f32) {
        if !self.achieving_target_rotation {
            return;
        }
        self.simulator.target = self.target_rotation;
        self.simulator.simulate(dt);
        self.rotation = self.simulator.position;

        if (self.rotation - self.target_rotation).abs() < DOOR_SETTLE_EPSILON {
            self.rotation = self.target_rotation;
            self.achieving_target_rotation = false;
            self.simulator.reset_to(self.target_rotation, 0.0);
        }
    }
}

/// Side of a reference frame, from the frame's own point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Which side of `reference` the point lies on. Local +X is left.
pub fn relative_side(reference: &Transform, point: Vec3) -> Side {
    let local = reference.rotation.inverse() * (point - reference.translation);
    if local.x > 0.0 {
        Side::Left
    } else {
        Side::Right
    }
}

/// Transform of `entity` in world space, composed through its `ChildOf` chain.
pub fn world_transform(world: &World, entity: Entity) -> Option<Transform> {
    let mut transform = *world.get::<Transform>(entity)?;
    let mut current = entity;
    while let Some(parent) = world.get::<ChildOf>(current).map(|child_of| child_of.parent()) {
        let Some(parent_transform) = world.get::<Transform>(parent) else {
            break;
        };
        transform = parent_transform.mul_transform(transform);
        current = parent;
    }
    Some(transform)
}

/// A character's pending walk to a vehicle entry point.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct VehicleEntryInstance {
    pub vehicle: Entity,
    pub target_seat: Entity,
    pub entry_point: Entity,
    /// Take the wheel once inside, switching seats if entering as a passenger.
    pub wants_to_drive: bool,
}

/// Vehicle action change, for the drivetrain.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct VehicleInput {
    pub vehicle: Entity,
    pub action: VehicleAction,
    pub pressed: bool,
}

/// Interpolation between two poses in a vehicle's frame.
#[derive(Debug, Clone, Default)]
pub struct SeatApproach {
    pub start_position: Vec3,
    pub end_position: Vec3,
    pub start_rotation: Quat,
    pub end_rotation: Quat,
    /// Progress spring running from 0 to 1.
    pub factor: SpringSimulator,
}

impl SeatApproach {
    pub fn new(start: (Vec3, Quat), end: (Vec3, Quat)) -> Self {
        let mut factor = SpringSimulator::new(60.0, 10.0, 0.5);
        factor.target = 1.0;
        Self {
            start_position: start.0,
            end_position: end.0,
            start_rotation: start.1,
            end_rotation: end.1,
            factor,
        }
    }

    /// Advance the progress spring and return the new progress.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.factor.simulate(dt);
        self.factor.position
    }

    pub fn position(&self, t: f32) -> Vec3 {
        self.start_position.lerp(self.end_position, t)
    }

    pub fn rotation(&self, t: f32) -> Quat {
        self.start_rotation.slerp(self.end_rotation, t)
    }
}

pub fn ease_in_out_sine(x: f32) -> f32 {
    -((PI * x).cos() - 1.0) / 2.0
}

fn config_of(world: &World, character: Entity) -> ControllerConfig {
    world
        .get::<ControllerConfig>(character)
        .copied()
        .unwrap_or_default()
}

fn seat_type(world: &World, seat: Entity) -> Option<SeatType> {
    world.get::<VehicleSeat>(seat).map(|s| s.seat_type)
}

/// Pose of `entity` in the frame of `vehicle`.
pub(crate) fn local_pose(world: &World, vehicle: Entity, entity: Entity) -> Option<(Vec3, Quat)> {
    let frame = world_transform(world, vehicle)?;
    let pose = world_transform(world, entity)?;
    let position = frame.compute_affine().inverse().transform_point3(pose.translation);
    Some((position, frame.rotation.inverse() * pose.rotation))
}

/// Pose of `entity` in the frame of `vehicle`, raised by `height` along the vehicle's up.
pub(crate) fn raised_local_pose(world: &World, vehicle: Entity, entity: Entity, height: f32) -> Option<(Vec3, Quat)> {
    local_pose(world, vehicle, entity).map(|(position, rotation)| (position + Vec3::Y * height, rotation))
}

/// Put a character at a pose given in the frame of `vehicle`.
pub(crate) fn place_in_vehicle(world: &mut World, character: Entity, vehicle: Entity, position: Vec3, rotation: Quat) {
    let Some(frame) = world_transform(world, vehicle) else {
        return;
    };
    character::set_position(world, character, frame.transform_point(position));
    character::set_rotation(world, character, frame.rotation * rotation);
}

/// Put a character on its seat.
pub(crate) fn place_on_seat(world: &mut World, character: Entity, seat: Entity) {
    let Some(vehicle) = world.get::<VehicleSeat>(seat).map(|s| s.vehicle) else {
        return;
    };
    let height = config_of(world, character).seat_height_offset;
    if let Some((position, rotation)) = raised_local_pose(world, vehicle, seat, height) {
        place_in_vehicle(world, character, vehicle, position, rotation);
    }
}

/// Seated state for a seat: driving from the driver seat, sitting elsewhere.
pub(crate) fn seated_state(world: &World, seat: Entity) -> CharacterState {
    match seat_type(world, seat) {
        Some(SeatType::Driver) => CharacterState::Driving { seat },
        _ => CharacterState::Sitting { seat },
    }
}

/// First connected seat that is free or already held by `character`.
pub(crate) fn free_connected_seat(
    world: &World,
    seat: Entity,
    character: Entity,
    seat_type_filter: Option<SeatType>,
) -> Option<Entity> {
    let connected = &world.get::<VehicleSeat>(seat)?.connected_seats;
    connected.iter().copied().find(|candidate| {
        world.get::<VehicleSeat>(*candidate).is_some_and(|s| {
            seat_type_filter.is_none_or(|t| s.seat_type == t)
                && s.occupied_by.is_none_or(|occupant| occupant == character)
        })
    })
}

pub(crate) fn door_of(world: &World, seat: Entity) -> Option<Entity> {
    world.get::<VehicleSeat>(seat)?.door
}

pub(crate) fn with_door(world: &mut World, seat: Entity, f: impl FnOnce(&mut VehicleDoor)) {
    let Some(door) = door_of(world, seat) else {
        return;
    };
    if let Some(mut door) = world.get_mut::<VehicleDoor>(door) {
        f(&mut door);
    }
}

/// Look for the nearest vehicle, seat and entry point, and start walking there.
///
/// `wants_to_drive` considers driver seats and passenger seats connected to a
/// driver seat; otherwise only passenger seats. Does nothing when any of the
/// three searches comes up empty.
pub fn find_vehicle_to_enter(world: &mut World, character: Entity, wants_to_drive: bool) {
    let here = character::position(world, character);
    let radius = config_of(world, character).vehicle_search_radius;

    let candidates: Vec<Entity> = world
        .query_filtered::<Entity, With<Vehicle>>()
        .iter(world)
        .collect();
    let mut vehicles = ClosestEntityFinder::new(here, Some(radius));
    for vehicle in candidates {
        if let Some(transform) = world_transform(world, vehicle) {
            vehicles.consider(vehicle, transform.translation);
        }
    }
    let Some(vehicle) = vehicles.into_closest() else {
        debug!("No vehicle within {radius} of {character}");
        return;
    };

    let seats = world
        .get::<Vehicle>(vehicle)
        .map(|v| v.seats.clone())
        .unwrap_or_default();
    let mut seat_finder = ClosestEntityFinder::new(here, None);
    for seat in seats {
        let Some(candidate) = world.get::<VehicleSeat>(seat) else {
            continue;
        };
        let eligible = match (wants_to_drive, candidate.seat_type) {
            (true, SeatType::Driver) => true,
            (true, SeatType::Passenger) => candidate
                .connected_seats
                .iter()
                .any(|connected| seat_type(world, *connected) == Some(SeatType::Driver)),
            (false, other) => other == SeatType::Passenger,
        };
        if !eligible {
            continue;
        }
        if let Some(transform) = world_transform(world, seat) {
            seat_finder.consider(seat, transform.translation);
        }
    }
    let Some(target_seat) = seat_finder.into_closest() else {
        debug!("No eligible seat in {vehicle} for {character}");
        return;
    };

    let entry_points = world
        .get::<VehicleSeat>(target_seat)
        .map(|s| s.entry_points.clone())
        .unwrap_or_default();
    let mut entry_finder = ClosestEntityFinder::new(here, None);
    for point in entry_points {
        if let Some(transform) = world_transform(world, point) {
            entry_finder.consider(point, transform.translation);
        }
    }
    let Some(entry_point) = entry_finder.into_closest() else {
        debug!("Seat {target_seat} has no entry point");
        return;
    };

    character::trigger_action(world, character, CharacterAction::Up, true);
    if let Some(mut c) = world.get_mut::<Character>(character) {
        c.vehicle_entry = Some(VehicleEntryInstance {
            vehicle,
            target_seat,
            entry_point,
            wants_to_drive,
        });
    }
}

/// Steer toward the entry point and climb in once close enough.
pub fn update_entry(world: &mut World, character: Entity, entry: VehicleEntryInstance) {
    let can_enter = world
        .get::<Character>(character)
        .is_some_and(|c| c.state.can_enter_vehicles());
    if !can_enter {
        return;
    }

    let Some(point) = world_transform(world, entry.entry_point) else {
        if let Some(mut c) = world.get_mut::<Character>(character) {
            c.vehicle_entry = None;
        }
        return;
    };
    let config = config_of(world, character);
    let mut offset = point.translation - character::position(world, character);
    if let Some(mut c) = world.get_mut::<Character>(character) {
        c.set_orientation(offset, false);
    }

    let height_difference = offset.y;
    offset.y = 0.0;
    if offset.length() < config.entry_arrival_distance && height_difference < config.entry_max_height_difference {
        enter_vehicle(world, character, entry.target_seat, entry.entry_point);
    }
}

/// Start climbing into `seat`, opening its door first if needed.
pub fn enter_vehicle(world: &mut World, character: Entity, seat: Entity, entry_point: Entity) {
    character::reset_controls(world, character);

    let door_rotation = door_of(world, seat)
        .and_then(|door| world.get::<VehicleDoor>(door))
        .map(|door| door.rotation);
    let next = match door_rotation {
        Some(rotation) if rotation < DOOR_OPEN_FOR_ENTRY => CharacterState::open_vehicle_door(seat, entry_point),
        _ => CharacterState::entering_vehicle(seat, entry_point),
    };
    state::set_state(world, character, next);
}

/// Put a character straight into `seat`, skipping the entry sequence.
pub fn teleport_to_vehicle(world: &mut World, character: Entity, vehicle: Entity, seat: Entity) {
    if world.get::<VehicleSeat>(seat).map(|s| s.vehicle) != Some(vehicle) {
        warn!("Seat {seat} does not belong to vehicle {vehicle}");
        return;
    }
    {
        let Some(mut c) = world.get_mut::<Character>(character) else {
            return;
        };
        c.reset_velocity();
        c.set_physics_enabled(false);
    }
    character::rotate_model(world, character);

    place_on_seat(world, character, seat);
    occupy_seat(world, character, seat);
    let next = seated_state(world, seat);
    state::set_state(world, character, next);
}

/// Get out of the occupied seat, if any.
pub fn exit_vehicle(world: &mut World, character: Entity) {
    let Some(seat) = world.get::<Character>(character).and_then(|c| c.occupying_seat) else {
        return;
    };
    let airplane = world
        .get::<VehicleSeat>(seat)
        .and_then(|s| world.get::<Vehicle>(s.vehicle))
        .is_some_and(|v| v.category == VehicleCategory::Airplane);

    let next = if airplane {
        CharacterState::exiting_airplane(seat)
    } else {
        CharacterState::exiting_vehicle(seat)
    };
    state::set_state(world, character, next);
    stop_controlling_vehicle(world, character);
}

pub fn occupy_seat(world: &mut World, character: Entity, seat: Entity) {
    if let Some(mut c) = world.get_mut::<Character>(character) {
        c.occupying_seat = Some(seat);
    }
    if let Some(mut s) = world.get_mut::<VehicleSeat>(seat) {
        s.occupied_by = Some(character);
    }
}

pub fn leave_seat(world: &mut World, character: Entity) {
    let Some(seat) = world
        .get_mut::<Character>(character)
        .and_then(|mut c| c.occupying_seat.take())
    else {
        return;
    };
    if let Some(mut s) = world.get_mut::<VehicleSeat>(seat) {
        if s.occupied_by == Some(character) {
            s.occupied_by = None;
        }
    }
}

fn has_focus(world: &World, entity: Entity) -> bool {
    world
        .get_resource::<InputFocus>()
        .is_some_and(|focus| focus.is(entity))
}

/// Hand the character's input over to `vehicle`.
pub fn start_controlling_vehicle(world: &mut World, character: Entity, vehicle: Entity) {
    let Some(current) = world.get::<Character>(character).map(|c| c.controlled_vehicle) else {
        return;
    };
    if current == Some(vehicle) {
        return;
    }

    transfer_controls(world, character, vehicle);
    character::reset_controls(world, character);

    if let Some(mut c) = world.get_mut::<Character>(character) {
        c.controlled_vehicle = Some(vehicle);
    }
    if let Some(mut v) = world.get_mut::<Vehicle>(vehicle) {
        v.controlling_character = Some(character);
    }
    if has_focus(world, character) {
        input_receiver_init(world, vehicle);
    }
}

/// Take input back from the controlled vehicle.
pub fn stop_controlling_vehicle(world: &mut World, character: Entity) {
    let Some(vehicle) = world.get::<Character>(character).and_then(|c| c.controlled_vehicle) else {
        return;
    };
    let controlled_by_us = world
        .get::<Vehicle>(vehicle)
        .is_none_or(|v| v.controlling_character == Some(character));
    if !controlled_by_us {
        return;
    }

    if let Some(mut v) = world.get_mut::<Vehicle>(vehicle) {
        v.controlling_character = None;
    }
    reset_controls(world, vehicle);
    if let Some(mut c) = world.get_mut::<Character>(character) {
        c.controlled_vehicle = None;
    }
    if has_focus(world, character) {
        character::input_receiver_init(world, character);
    }
}

/// Press the vehicle actions that share a code with a held character action.
pub fn transfer_controls(world: &mut World, character: Entity, vehicle: Entity) {
    let (Some(c), Some(v)) = (world.get::<Character>(character), world.get::<Vehicle>(vehicle)) else {
        return;
    };
    let mut transfers = Vec::new();
    for (_, binding) in c.actions.iter() {
        for code in &binding.codes {
            for action in v.actions.actions_for(*code) {
                transfers.push((action, binding.is_pressed));
            }
        }
    }
    for (action, pressed) in transfers {
        trigger_action(world, vehicle, action, pressed);
    }
}

/// Set a vehicle action, forward it to the drivetrain and react to the edge.
pub fn trigger_action(world: &mut World, vehicle: Entity, action: VehicleAction, pressed: bool) {
    let changed = world
        .get_mut::<Vehicle>(vehicle)
        .is_some_and(|mut v| v.actions.set(action, pressed));
    if !changed {
        return;
    }

    world.send_event(VehicleInput {
        vehicle,
        action,
        pressed,
    });
    on_input_change(world, vehicle);

    if let Some(mut v) = world.get_mut::<Vehicle>(vehicle) {
        v.actions.clear_edges(action);
    }
}

pub fn reset_controls(world: &mut World, vehicle: Entity) {
    let held = world
        .get::<Vehicle>(vehicle)
        .map(|v| v.actions.pressed())
        .unwrap_or_default();
    for action in held {
        trigger_action(world, vehicle, action, false);
    }
}

pub fn handle_keyboard_event(world: &mut World, vehicle: Entity, code: KeyCode, pressed: bool, shift: bool) {
    match (code, pressed, shift) {
        (KeyCode::KeyC, true, true) => {
            reset_controls(world, vehicle);
            let caller = world
                .get::<Vehicle>(vehicle)
                .and_then(|v| v.controlling_character)
                .unwrap_or(vehicle);
            if let Some(mut focus) = world.get_resource_mut::<InputFocus>() {
                focus.receiver = None;
            }
            world.send_event(CameraRequest::FreeCamera { caller });
        }
        (KeyCode::KeyR, true, true) => {
            world.send_event(ScenarioRequest::Restart);
        }
        _ => {
            let actions = world
                .get::<Vehicle>(vehicle)
                .map(|v| v.actions.actions_for(code.into()))
                .unwrap_or_default();
            for action in actions {
                trigger_action(world, vehicle, action, pressed);
            }
        }
    }
}

pub fn handle_mouse_button(world: &mut World, vehicle: Entity, button: MouseButton, pressed: bool) {
    let actions = world
        .get::<Vehicle>(vehicle)
        .map(|v| v.actions.actions_for(button.into()))
        .unwrap_or_default();
    for action in actions {
        trigger_action(world, vehicle, action, pressed);
    }
}

pub fn handle_mouse_move(world: &mut World, _vehicle: Entity, delta: Vec2) {
    world.send_event(CameraRequest::Orbit { delta });
}

pub fn handle_mouse_wheel(world: &mut World, _vehicle: Entity, value: f32) {
    world.send_event(ScenarioRequest::ScrollTimeScale(value));
}

/// Exit and seat switching, on behalf of the controlling character.
pub fn on_input_change(world: &mut World, vehicle: Entity) {
    let Some(v) = world.get::<Vehicle>(vehicle) else {
        return;
    };
    let Some(character) = v.controlling_character else {
        return;
    };
    let exit = v.actions.just_pressed(VehicleAction::ExitVehicle);
    let switch = v.actions.just_pressed(VehicleAction::SeatSwitch);

    if exit {
        let can_leave = world
            .get::<Character>(character)
            .is_some_and(|c| c.state.can_leave_vehicles());
        if can_leave {
            exit_vehicle(world, character);
        }
    } else if switch {
        let Some(seat) = world.get::<Character>(character).and_then(|c| c.occupying_seat) else {
            return;
        };
        if let Some(to_seat) = free_connected_seat(world, seat, character, None) {
            state::set_state(world, character, CharacterState::switching_seats(seat, to_seat));
            stop_controlling_vehicle(world, character);
        }
    }
}

/// Announce the vehicle camera and controls.
pub fn input_receiver_init(world: &mut World, vehicle: Entity) {
    let Some(v) = world.get::<Vehicle>(vehicle) else {
        return;
    };
    let radius = v.camera_radius;
    let hints = vehicle_hints(v.category);
    world.send_event(CameraRequest::Follow {
        target: vehicle,
        radius,
        follow_mode: false,
    });
    character::display_controls(world, hints);
}

pub fn vehicle_hints(category: VehicleCategory) -> Vec<ControlHint> {
    let mut hints = match category {
        VehicleCategory::Car => vec![
            ControlHint::new(["W", "S"], "Accelerate, Brake / Reverse"),
            ControlHint::new(["A", "D"], "Steering"),
            ControlHint::new(["Space"], "Handbrake"),
        ],
        VehicleCategory::Helicopter => vec![
            ControlHint::new(["W", "S"], "Ascend, Descend"),
            ControlHint::new(["A", "D"], "Yaw"),
        ],
        VehicleCategory::Airplane => vec![
            ControlHint::new(["W", "S"], "Throttle"),
            ControlHint::new(["A", "D"], "Roll"),
            ControlHint::new(["Space"], "Brake"),
        ],
    };
    hints.extend([
        ControlHint::new(["V"], "View select"),
        ControlHint::new(["F"], "Exit vehicle"),
        ControlHint::new(["X"], "Switch seats"),
        ControlHint::new(["Shift", "+", "R"], "Respawn"),
        ControlHint::new(["Shift", "+", "C"], "Free camera"),
    ]);
    hints
}

/// Swing every door toward its target.
pub fn animate_doors(time: Res<Time>, mut doors: Query<&mut VehicleDoor>) {
    let dt = time.delta_secs();
    for mut door in &mut doors {
        door.update(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn door_swings_open_and_settles() {
        let mut door = VehicleDoor::default();
        door.open();
        assert!(door.achieving_target_rotation);

        for _ in 0..600 {
            door.update(1.0 / 60.0);
        }

        assert!(!door.achieving_target_rotation);
        assert_eq!(door.rotation, 1.0);
    }

    #[test]
    fn held_open_door_is_settled() {
        let mut door = VehicleDoor::default();
        door.hold_open();
        assert_eq!(door.rotation, 1.0);
        assert!(!door.achieving_target_rotation);

        door.close();
        assert_eq!(door.target_rotation, 0.0);
        assert!(door.achieving_target_rotation);

        // Reported rotation trails the simulation by one fixed frame.
        door.update(1.0 / 60.0);
        assert_eq!(door.rotation, 1.0);
        door.update(1.0 / 60.0);
        assert!(door.rotation < 1.0);
        assert!(door.achieving_target_rotation);
    }

    #[test]
    fn side_follows_local_x() {
        let reference = Transform::default();
        assert_eq!(relative_side(&reference, Vec3::X), Side::Left);
        assert_eq!(relative_side(&reference, Vec3::NEG_X), Side::Right);

        let turned = Transform::from_rotation(Quat::from_rotation_y(FRAC_PI_2));
        // Local +X now points along world -Z
        assert_eq!(relative_side(&turned, Vec3::NEG_Z), Side::Left);
    }

    #[test]
    fn world_transform_walks_parents() {
        let mut world = World::new();
        let vehicle = world
            .spawn(Transform::from_xyz(5.0, 0.0, 0.0).with_rotation(Quat::from_rotation_y(FRAC_PI_2)))
            .id();
        let seat = world
            .spawn((Transform::from_xyz(1.0, 0.0, 0.0), ChildOf(vehicle)))
            .id();

        let transform = world_transform(&world, seat).unwrap();
        assert!((transform.translation - Vec3::new(5.0, 0.0, -1.0)).length() < 1e-5);

        let (local, _) = local_pose(&world, vehicle, seat).unwrap();
        assert!((local - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn occupy_and_leave_keep_backlink() {
        let mut world = World::new();
        let vehicle = world.spawn((Transform::default(), Vehicle::default())).id();
        let seat = world
            .spawn((Transform::default(), VehicleSeat::new(vehicle, SeatType::Driver)))
            .id();
        let character = world.spawn(Character::default()).id();

        occupy_seat(&mut world, character, seat);
        assert_eq!(world.get::<Character>(character).unwrap().occupying_seat, Some(seat));
        assert_eq!(world.get::<VehicleSeat>(seat).unwrap().occupied_by, Some(character));

        leave_seat(&mut world, character);
        assert_eq!(world.get::<Character>(character).unwrap().occupying_seat, None);
        assert_eq!(world.get::<VehicleSeat>(seat).unwrap().occupied_by, None);
    }

    #[test]
    fn connected_seat_skips_occupied() {
        let mut world = World::new();
        let vehicle = world.spawn(Vehicle::default()).id();
        let someone = world.spawn_empty().id();
        let me = world.spawn_empty().id();
        let taken = world
            .spawn(VehicleSeat {
                occupied_by: Some(someone),
                ..VehicleSeat::new(vehicle, SeatType::Passenger)
            })
            .id();
        let free = world.spawn(VehicleSeat::new(vehicle, SeatType::Passenger)).id();
        let seat = world
            .spawn(VehicleSeat::new(vehicle, SeatType::Driver).with_connected_seats([taken, free]))
            .id();

        assert_eq!(free_connected_seat(&world, seat, me, None), Some(free));
        assert_eq!(free_connected_seat(&world, seat, me, Some(SeatType::Driver)), None);
    }

    #[test]
    fn sine_easing_endpoints() {
        assert!(ease_in_out_sine(0.0).abs() < 1e-6);
        assert!((ease_in_out_sine(0.5) - 0.5).abs() < 1e-6);
        assert!((ease_in_out_sine(1.0) - 1.0).abs() < 1e-6);
    }
}
