//! Getting into, sitting in, and getting out of vehicles.
//!
//! Approach states move the character between poses expressed in the
//! vehicle's frame, so a vehicle that moves meanwhile carries the character
//! along. Physics stays off from the first step toward a door until the
//! character is standing outside again.

use bevy::prelude::*;

use super::{CharacterState, StateContext};
use crate::character;
use crate::input::CharacterAction;
use crate::vehicle::{
    self, ease_in_out_sine, relative_side, world_transform, SeatApproach, Side, Vehicle, VehicleCategory,
    VehicleSeat,
};

/// Time into the door animations at which the door itself moves.
const DOOR_SWING_TIME: f32 = 0.3;
/// Airplane boarding clips end this much before their last frame.
const AIRPLANE_END_EARLY: f32 = 0.3;

fn side_clip(side: Side, left: &'static str, right: &'static str) -> &'static str {
    match side {
        Side::Left => left,
        Side::Right => right,
    }
}

fn seat_info(ctx: &StateContext, seat: Entity) -> Option<VehicleSeat> {
    ctx.world.get::<VehicleSeat>(seat).cloned()
}

fn category(ctx: &StateContext, vehicle: Entity) -> VehicleCategory {
    ctx.world
        .get::<Vehicle>(vehicle)
        .map(|v| v.category)
        .unwrap_or_default()
}

/// Current character pose in the frame of `vehicle`.
fn character_local_pose(ctx: &StateContext, vehicle: Entity) -> (Vec3, Quat) {
    vehicle::local_pose(ctx.world, vehicle, ctx.entity).unwrap_or((Vec3::ZERO, Quat::IDENTITY))
}

/// Stop the body and hand the position over to the transform.
fn detach_from_physics(ctx: &mut StateContext) {
    {
        let mut c = ctx.character_mut();
        c.reset_velocity();
        c.tilt = 0.0;
        c.set_physics_enabled(false);
    }
    character::rotate_model(ctx.world, ctx.entity);
}

pub(super) fn enter(state: &mut CharacterState, ctx: &mut StateContext) -> Option<CharacterState> {
    let config = ctx.config();
    let airplane = matches!(state, CharacterState::ExitingAirplane { .. });

    match state {
        CharacterState::OpenVehicleDoor {
            seat,
            entry_point,
            approach,
            ..
        } => {
            let (Some(info), Some(entry)) = (seat_info(ctx, *seat), world_transform(ctx.world, *entry_point)) else {
                warn!("Cannot open the door of seat {seat}: seat or entry point missing");
                return Some(CharacterState::Idle);
            };
            let seat_position = world_transform(ctx.world, *seat).map_or(entry.translation, |t| t.translation);
            let clip = side_clip(
                relative_side(&entry, seat_position),
                "open_door_standing_left",
                "open_door_standing_right",
            );
            ctx.play_animation(clip, 0.1);

            detach_from_physics(ctx);
            let start = character_local_pose(ctx, info.vehicle);
            let end = vehicle::raised_local_pose(ctx.world, info.vehicle, *entry_point, config.standing_height_offset)
                .unwrap_or(start);
            *approach = SeatApproach::new(start, end);
        }
        CharacterState::EnteringVehicle {
            seat,
            entry_point,
            approach,
            end_early,
            position_offset,
        } => {
            let (Some(info), Some(entry)) = (seat_info(ctx, *seat), world_transform(ctx.world, *entry_point)) else {
                warn!("Cannot enter seat {seat}: seat or entry point missing");
                return Some(CharacterState::Idle);
            };
            vehicle::with_door(ctx.world, *seat, |door| door.hold_open());

            let seat_position = world_transform(ctx.world, *seat).map_or(entry.translation, |t| t.translation);
            let side = relative_side(&entry, seat_position);
            let clip = if category(ctx, info.vehicle) == VehicleCategory::Airplane {
                *end_early = AIRPLANE_END_EARLY;
                side_clip(side, "enter_airplane_left", "enter_airplane_right")
            } else {
                *end_early = 0.0;
                side_clip(side, "sit_down_left", "sit_down_right")
            };
            ctx.play_animation(clip, 0.1);

            detach_from_physics(ctx);
            let current = character_local_pose(ctx, info.vehicle);
            let start = vehicle::raised_local_pose(ctx.world, info.vehicle, *entry_point, config.standing_height_offset)
                .unwrap_or(current);
            let end = vehicle::raised_local_pose(ctx.world, info.vehicle, *seat, config.seat_height_offset)
                .unwrap_or(start);
            *position_offset = start.0 - current.0;
            *approach = SeatApproach::new((start.0, current.1), end);
        }
        CharacterState::Driving { seat } => {
            ctx.play_animation("driving", 0.1);
            let Some(info) = seat_info(ctx, *seat) else {
                return None;
            };
            vehicle::place_on_seat(ctx.world, ctx.entity, *seat);
            vehicle::start_controlling_vehicle(ctx.world, ctx.entity, info.vehicle);
            ctx.character_mut().vehicle_entry = None;
        }
        CharacterState::Sitting { seat } => {
            ctx.play_animation("sitting", 0.1);
            vehicle::place_on_seat(ctx.world, ctx.entity, *seat);
        }
        CharacterState::SwitchingSeats {
            from_seat,
            to_seat,
            approach,
        } => {
            let Some(info) = seat_info(ctx, *to_seat) else {
                return None;
            };
            vehicle::leave_seat(ctx.world, ctx.entity);
            vehicle::occupy_seat(ctx.world, ctx.entity, *to_seat);

            let from = world_transform(ctx.world, *from_seat).unwrap_or_default();
            let to_position = world_transform(ctx.world, *to_seat).map_or(from.translation, |t| t.translation);
            let clip = side_clip(
                relative_side(&from, to_position),
                "sitting_shift_left",
                "sitting_shift_right",
            );
            ctx.play_animation(clip, 0.1);

            let height = config.seat_height_offset;
            let start = vehicle::raised_local_pose(ctx.world, info.vehicle, *from_seat, height)
                .unwrap_or_else(|| character_local_pose(ctx, info.vehicle));
            let end = vehicle::raised_local_pose(ctx.world, info.vehicle, *to_seat, height).unwrap_or(start);
            *approach = SeatApproach::new(start, end);
        }
        CharacterState::CloseVehicleDoorInside { seat, .. } => {
            let seat_transform = world_transform(ctx.world, *seat).unwrap_or_default();
            let door_position = vehicle::door_of(ctx.world, *seat)
                .and_then(|door| world_transform(ctx.world, door))
                .map_or(seat_transform.translation, |t| t.translation);
            let clip = side_clip(
                relative_side(&seat_transform, door_position),
                "close_door_sitting_left",
                "close_door_sitting_right",
            );
            ctx.play_animation(clip, 0.1);
        }
        CharacterState::ExitingVehicle { seat, approach } | CharacterState::ExitingAirplane { seat, approach } => {
            let Some(info) = seat_info(ctx, *seat) else {
                return Some(CharacterState::Idle);
            };
            vehicle::with_door(ctx.world, *seat, |door| door.open());

            let seat_transform = world_transform(ctx.world, *seat).unwrap_or_default();
            let exit_point = info.entry_points.first().copied();
            let exit_position = exit_point
                .and_then(|point| world_transform(ctx.world, point))
                .map_or(seat_transform.translation, |t| t.translation);
            let clip = if airplane {
                "jump_idle"
            } else {
                side_clip(
                    relative_side(&seat_transform, exit_position),
                    "stand_up_left",
                    "stand_up_right",
                )
            };
            ctx.play_animation(clip, 0.1);

            let start = character_local_pose(ctx, info.vehicle);
            let end = exit_point
                .and_then(|point| {
                    vehicle::raised_local_pose(ctx.world, info.vehicle, point, config.standing_height_offset)
                })
                .unwrap_or(start);
            *approach = SeatApproach::new(start, end);
        }
        _ => {}
    }
    None
}

pub(super) fn input_change(state: &CharacterState, ctx: &mut StateContext) -> Option<CharacterState> {
    // Passengers keep their own input; drivers go through the vehicle.
    let CharacterState::Sitting { seat } = *state else {
        return None;
    };

    if ctx.just_pressed(CharacterAction::SeatSwitch) {
        return vehicle::free_connected_seat(ctx.world, seat, ctx.entity, None)
            .map(|to_seat| CharacterState::switching_seats(seat, to_seat));
    }
    if ctx.just_pressed(CharacterAction::Enter) {
        vehicle::exit_vehicle(ctx.world, ctx.entity);
    }
    None
}

pub(super) fn update(state: &mut CharacterState, ctx: &mut StateContext, dt: f32) -> Option<CharacterState> {
    let door_held = matches!(state, CharacterState::ExitingVehicle { .. });

    match state {
        CharacterState::OpenVehicleDoor {
            seat,
            entry_point,
            door_opened,
            approach,
        } => {
            let ended = ctx.animation_ended(dt);
            if (ctx.timer() > DOOR_SWING_TIME || ended) && !*door_opened {
                *door_opened = true;
                vehicle::with_door(ctx.world, *seat, |door| door.open());
            }

            if ended {
                return if ctx.any_direction() {
                    ctx.character_mut().vehicle_entry = None;
                    Some(CharacterState::Idle)
                } else {
                    Some(CharacterState::entering_vehicle(*seat, *entry_point))
                };
            }

            let vehicle = seat_info(ctx, *seat)?.vehicle;
            let t = approach.advance(dt);
            vehicle::place_in_vehicle(ctx.world, ctx.entity, vehicle, approach.position(t), approach.rotation(t));
            None
        }
        CharacterState::EnteringVehicle {
            seat,
            approach,
            end_early,
            position_offset,
            ..
        } => {
            let length = ctx.character().animation_length - *end_early;
            let vehicle = seat_info(ctx, *seat)?.vehicle;

            if ctx.timer() > length - dt {
                vehicle::occupy_seat(ctx.world, ctx.entity, *seat);
                vehicle::place_on_seat(ctx.world, ctx.entity, *seat);
                return Some(vehicle::seated_state(ctx.world, *seat));
            }

            vehicle::with_door(ctx.world, *seat, |door| door.hold_open());
            let progress = (ctx.timer() / length).clamp(0.0, 1.0);
            let spring = approach.advance(dt);
            let offset = position_offset.lerp(Vec3::ZERO, spring);
            let position = (approach.start_position - offset).lerp(approach.end_position, ease_in_out_sine(progress));
            vehicle::place_in_vehicle(ctx.world, ctx.entity, vehicle, position, approach.rotation(spring));
            None
        }
        CharacterState::Driving { seat } => {
            vehicle::place_on_seat(ctx.world, ctx.entity, *seat);
            let vehicle_idle = seat_info(ctx, *seat)
                .and_then(|info| ctx.world.get::<Vehicle>(info.vehicle))
                .is_none_or(|v| v.no_direction_pressed());
            (vehicle_idle && door_left_open(ctx, *seat)).then(|| CharacterState::close_vehicle_door_inside(*seat))
        }
        CharacterState::Sitting { seat } => {
            vehicle::place_on_seat(ctx.world, ctx.entity, *seat);
            if ctx.no_direction() && door_left_open(ctx, *seat) {
                return Some(CharacterState::close_vehicle_door_inside(*seat));
            }

            let entry = ctx.character().vehicle_entry?;
            if entry.wants_to_drive {
                let driver_seat = vehicle::free_connected_seat(
                    ctx.world,
                    *seat,
                    ctx.entity,
                    Some(vehicle::SeatType::Driver),
                );
                if let Some(driver_seat) = driver_seat {
                    return Some(CharacterState::switching_seats(*seat, driver_seat));
                }
            }
            ctx.character_mut().vehicle_entry = None;
            None
        }
        CharacterState::SwitchingSeats { to_seat, approach, .. } => {
            if ctx.animation_ended(dt) {
                vehicle::place_on_seat(ctx.world, ctx.entity, *to_seat);
                return Some(vehicle::seated_state(ctx.world, *to_seat));
            }
            let vehicle = seat_info(ctx, *to_seat)?.vehicle;
            let length = ctx.character().animation_length;
            let t = ease_in_out_sine((ctx.timer() / length).clamp(0.0, 1.0));
            vehicle::place_in_vehicle(ctx.world, ctx.entity, vehicle, approach.position(t), approach.rotation(t));
            None
        }
        CharacterState::CloseVehicleDoorInside { seat, door_closed } => {
            vehicle::place_on_seat(ctx.world, ctx.entity, *seat);
            let ended = ctx.animation_ended(dt);
            if (ctx.timer() > DOOR_SWING_TIME || ended) && !*door_closed {
                *door_closed = true;
                vehicle::with_door(ctx.world, *seat, |door| door.close());
            }
            ended.then(|| vehicle::seated_state(ctx.world, *seat))
        }
        CharacterState::ExitingVehicle { seat, approach } | CharacterState::ExitingAirplane { seat, approach } => {
            if ctx.animation_ended(dt) {
                finish_exit(ctx, approach);
                return Some(CharacterState::Idle);
            }
            let vehicle = seat_info(ctx, *seat)?.vehicle;
            if door_held {
                vehicle::with_door(ctx.world, *seat, |door| door.hold_open());
            }
            let t = approach.advance(dt);
            vehicle::place_in_vehicle(ctx.world, ctx.entity, vehicle, approach.position(t), approach.rotation(t));
            None
        }
        _ => None,
    }
}

/// Whether the seat's door stands open and is done moving.
fn door_left_open(ctx: &StateContext, seat: Entity) -> bool {
    vehicle::door_of(ctx.world, seat)
        .and_then(|door| ctx.world.get::<vehicle::VehicleDoor>(door))
        .is_some_and(|door| !door.achieving_target_rotation && door.rotation > 0.0)
}

/// Stand outside at the end of the approach, with physics back on.
fn finish_exit(ctx: &mut StateContext, approach: &SeatApproach) {
    let frame = ctx
        .character()
        .occupying_seat
        .and_then(|seat| ctx.world.get::<VehicleSeat>(seat))
        .and_then(|info| world_transform(ctx.world, info.vehicle));

    vehicle::leave_seat(ctx.world, ctx.entity);
    {
        let mut c = ctx.character_mut();
        c.set_physics_enabled(true);
        c.reset_velocity();
    }

    if let Some(frame) = frame {
        let rotation = frame.rotation * approach.end_rotation;
        ctx.set_position(frame.transform_point(approach.end_position));
        ctx.character_mut().reset_orientation(rotation);
    }
}

/// Leaving the vehicle states any other way than through an exit puts the
/// character back on its feet outside the vehicle logic.
pub(super) fn exit(state: &CharacterState, ctx: &mut StateContext, next: &CharacterState) {
    if !state.is_vehicle_state() || next.is_vehicle_state() {
        return;
    }
    vehicle::stop_controlling_vehicle(ctx.world, ctx.entity);
    vehicle::leave_seat(ctx.world, ctx.entity);
    if !ctx.character().physics_enabled {
        let mut c = ctx.character_mut();
        c.set_physics_enabled(true);
        c.reset_velocity();
    }
}
