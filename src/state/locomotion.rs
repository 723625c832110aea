//! On-foot states: standing, walking, sprinting, jumping, falling and landing.

use std::f32::consts::PI;

use super::{CharacterState, StartDirection, StateContext, Turn};
use crate::input::CharacterAction;
use crate::intent::{camera_relative_movement, signed_angle_y};

/// Airborne velocity below which a landing becomes a roll.
const ROLL_IMPACT_SPEED: f32 = -6.0;
/// Airborne velocity below which a moving landing keeps running.
const RUNNING_IMPACT_SPEED: f32 = -2.0;
/// Above this smoothed speed a character walks straight away instead of starting to walk.
const WALK_SPEED: f32 = 0.5;
/// Turns held this early in a start-walk become an idle rotation.
const START_WALK_CANCEL_TIME: f32 = 0.1;
const IDLE_ROTATE_ANGLE: f32 = PI * 0.4;

const JUMP_IDLE_TAKEOFF: f32 = 0.2;
const JUMP_IDLE_LANDING: f32 = 0.3;
const JUMP_RUNNING_TAKEOFF: f32 = 0.13;
const JUMP_RUNNING_LANDING: f32 = 0.24;
const JUMP_RUNNING_SPEED: f32 = 4.0;
const AIR_STEER_SPEED: f32 = 0.8;

pub(super) fn enter(state: &mut CharacterState, ctx: &mut StateContext) -> Option<CharacterState> {
    match state {
        CharacterState::Idle => {
            {
                let mut c = ctx.character_mut();
                c.velocity_simulator.damping = 0.6;
                c.velocity_simulator.mass = 10.0;
                c.set_arcade_velocity_target(0.0);
            }
            ctx.play_animation("idle", 0.1);
        }
        CharacterState::IdleRotate(turn) => {
            {
                let mut c = ctx.character_mut();
                c.rotation_simulator.mass = 30.0;
                c.rotation_simulator.damping = 0.6;
                c.velocity_simulator.damping = 0.6;
                c.velocity_simulator.mass = 10.0;
                c.set_arcade_velocity_target(0.0);
            }
            let clip = match turn {
                Turn::Left => "rotate_left",
                Turn::Right => "rotate_right",
            };
            ctx.play_animation(clip, 0.1);
        }
        CharacterState::StartWalk(direction) => {
            {
                let mut c = ctx.character_mut();
                c.rotation_simulator.mass = 20.0;
                c.rotation_simulator.damping = 0.7;
                c.set_arcade_velocity_target(0.8);
            }
            let clip = match direction {
                StartDirection::Forward => "start_forward",
                StartDirection::Left => "start_left",
                StartDirection::Right => "start_right",
                StartDirection::BackLeft => "start_back_left",
                StartDirection::BackRight => "start_back_right",
            };
            ctx.play_animation(clip, 0.1);
        }
        CharacterState::Walk => {
            ctx.character_mut().set_arcade_velocity_target(0.8);
            ctx.play_animation("run", 0.1);
        }
        CharacterState::Sprint => {
            {
                let mut c = ctx.character_mut();
                c.velocity_simulator.mass = 10.0;
                c.rotation_simulator.damping = 0.8;
                c.rotation_simulator.mass = 50.0;
                c.set_arcade_velocity_target(1.4);
            }
            ctx.play_animation("sprint", 0.1);
        }
        CharacterState::EndWalk => {
            ctx.character_mut().set_arcade_velocity_target(0.0);
            ctx.play_animation("stop", 0.1);
        }
        CharacterState::JumpIdle { .. } => {
            {
                let mut c = ctx.character_mut();
                c.velocity_simulator.mass = 50.0;
                c.set_arcade_velocity_target(0.0);
            }
            ctx.play_animation("jump_idle", 0.1);
        }
        CharacterState::JumpRunning { .. } => {
            ctx.character_mut().velocity_simulator.mass = 100.0;
            ctx.play_animation("jump_running", 0.03);
        }
        CharacterState::Falling => {
            {
                let mut c = ctx.character_mut();
                c.velocity_simulator.mass = 100.0;
                c.rotation_simulator.damping = 0.3;
                c.arcade_velocity_is_additive = true;
                c.set_arcade_velocity_influence(0.05, 0.0, 0.05);
            }
            ctx.play_animation("falling", 0.3);
        }
        CharacterState::DropIdle => {
            {
                let mut c = ctx.character_mut();
                c.velocity_simulator.damping = 0.5;
                c.velocity_simulator.mass = 7.0;
                c.set_arcade_velocity_target(0.0);
            }
            ctx.play_animation("drop_idle", 0.1);
            if ctx.any_direction() {
                return Some(CharacterState::StartWalk(StartDirection::Forward));
            }
        }
        CharacterState::DropRunning => {
            ctx.character_mut().set_arcade_velocity_target(0.8);
            ctx.play_animation("drop_running", 0.1);
        }
        CharacterState::DropRolling => {
            {
                let mut c = ctx.character_mut();
                c.velocity_simulator.mass = 1.0;
                c.velocity_simulator.damping = 0.6;
                c.set_arcade_velocity_target(0.8);
            }
            ctx.play_animation("drop_running_roll", 0.03);
        }
        _ => {}
    }
    None
}

/// Checks are ordered by priority, highest first.
pub(super) fn input_change(state: &CharacterState, ctx: &mut StateContext) -> Option<CharacterState> {
    let jump = ctx.just_pressed(CharacterAction::Jump);

    match state {
        CharacterState::Idle | CharacterState::IdleRotate(_) => {
            if ctx.any_direction() {
                Some(walk_or_start_walk(ctx))
            } else if jump {
                Some(CharacterState::jump_idle())
            } else {
                None
            }
        }
        CharacterState::StartWalk(_) => {
            if ctx.just_pressed(CharacterAction::Run) {
                Some(CharacterState::Sprint)
            } else if ctx.no_direction() {
                Some(cancelled_start_walk(ctx))
            } else if jump {
                Some(CharacterState::jump_running())
            } else {
                None
            }
        }
        CharacterState::Walk => {
            if ctx.no_direction() {
                if ctx.speed() > 1.0 {
                    Some(CharacterState::EndWalk)
                } else {
                    Some(CharacterState::Idle)
                }
            } else if jump {
                Some(CharacterState::jump_running())
            } else if ctx.is_pressed(CharacterAction::Run) {
                Some(CharacterState::Sprint)
            } else {
                None
            }
        }
        CharacterState::Sprint => {
            if ctx.no_direction() {
                Some(CharacterState::EndWalk)
            } else if jump {
                Some(CharacterState::jump_running())
            } else if !ctx.is_pressed(CharacterAction::Run) {
                Some(CharacterState::Walk)
            } else {
                None
            }
        }
        CharacterState::EndWalk => {
            if ctx.any_direction() {
                if ctx.is_pressed(CharacterAction::Run) {
                    Some(CharacterState::Sprint)
                } else {
                    Some(walk_or_start_walk(ctx))
                }
            } else if jump {
                Some(CharacterState::jump_idle())
            } else {
                None
            }
        }
        CharacterState::DropIdle => {
            if ctx.any_direction() {
                Some(CharacterState::StartWalk(StartDirection::Forward))
            } else if jump {
                Some(CharacterState::jump_idle())
            } else {
                None
            }
        }
        CharacterState::DropRunning => {
            if jump {
                Some(CharacterState::jump_running())
            } else if ctx.any_direction() && ctx.just_pressed(CharacterAction::Run) {
                Some(CharacterState::Sprint)
            } else if ctx.no_direction() {
                Some(CharacterState::EndWalk)
            } else {
                None
            }
        }
        _ => None,
    }
}

pub(super) fn update(state: &mut CharacterState, ctx: &mut StateContext, dt: f32) -> Option<CharacterState> {
    match state {
        CharacterState::Idle => fall_in_air(ctx),
        CharacterState::IdleRotate(_) => {
            if ctx.animation_ended(dt) {
                return Some(CharacterState::Idle);
            }
            fall_in_air(ctx)
        }
        CharacterState::StartWalk(_) => {
            ctx.face_camera_relative();
            if ctx.timer() < START_WALK_CANCEL_TIME {
                if let Some(turn) = sharp_turn(ctx) {
                    return Some(CharacterState::IdleRotate(turn));
                }
            }
            if ctx.animation_ended(dt) {
                return Some(CharacterState::Walk);
            }
            fall_in_air(ctx)
        }
        CharacterState::Walk | CharacterState::Sprint => {
            ctx.face_camera_relative();
            fall_in_air(ctx)
        }
        CharacterState::EndWalk => {
            if ctx.animation_ended(dt) {
                return Some(CharacterState::Idle);
            }
            fall_in_air(ctx)
        }
        CharacterState::JumpIdle { jumped } => {
            ctx.face_camera_relative();
            if *jumped {
                steer_in_air(ctx);
            }
            if ctx.timer() > JUMP_IDLE_TAKEOFF && !*jumped {
                *jumped = true;
                take_off_idle(ctx);
                None
            } else if ctx.timer() > JUMP_IDLE_LANDING && ctx.has_ground() {
                Some(drop_state(ctx))
            } else if ctx.animation_ended(dt) {
                Some(CharacterState::Falling)
            } else {
                None
            }
        }
        CharacterState::JumpRunning { jumped } => {
            ctx.face_camera_relative();
            if *jumped {
                steer_in_air(ctx);
            }
            if ctx.timer() > JUMP_RUNNING_TAKEOFF && !*jumped {
                *jumped = true;
                let mut c = ctx.character_mut();
                c.request_jump(Some(JUMP_RUNNING_SPEED));
                c.rotation_simulator.damping = 0.3;
                c.arcade_velocity_is_additive = true;
                c.set_arcade_velocity_influence(0.05, 0.0, 0.05);
                None
            } else if ctx.timer() > JUMP_RUNNING_LANDING && ctx.has_ground() {
                Some(drop_state(ctx))
            } else if ctx.animation_ended(dt) {
                Some(CharacterState::Falling)
            } else {
                None
            }
        }
        CharacterState::Falling => {
            ctx.face_camera_relative();
            steer_in_air(ctx);
            ctx.has_ground().then(|| drop_state(ctx))
        }
        CharacterState::DropIdle => {
            ctx.face_camera_relative();
            if ctx.animation_ended(dt) {
                return Some(CharacterState::Idle);
            }
            fall_in_air(ctx)
        }
        CharacterState::DropRunning => {
            ctx.face_camera_relative();
            if ctx.animation_ended(dt) {
                return Some(CharacterState::Walk);
            }
            fall_in_air(ctx)
        }
        CharacterState::DropRolling => {
            ctx.face_camera_relative();
            if !ctx.animation_ended(dt) {
                None
            } else if ctx.any_direction() {
                Some(CharacterState::Walk)
            } else {
                Some(CharacterState::EndWalk)
            }
        }
        _ => None,
    }
}

fn take_off_idle(ctx: &mut StateContext) {
    let platform_moving = ctx
        .character()
        .ground
        .is_some_and(|ground| ground.point_velocity.length() > 0.0);

    let mut c = ctx.character_mut();
    c.request_jump(None);
    c.velocity_simulator.mass = 100.0;
    c.rotation_simulator.damping = 0.3;
    if platform_moving {
        c.set_arcade_velocity_influence(0.0, 0.0, 0.0);
    } else {
        c.set_arcade_velocity_influence(0.3, 0.0, 0.3);
    }
}

/// Keep drifting forward only while a direction is held.
fn steer_in_air(ctx: &mut StateContext) {
    let forward = if ctx.any_direction() { AIR_STEER_SPEED } else { 0.0 };
    ctx.character_mut().set_arcade_velocity_target(forward);
}

fn fall_in_air(ctx: &StateContext) -> Option<CharacterState> {
    (!ctx.has_ground()).then_some(CharacterState::Falling)
}

/// Landing state for the velocity the character had in the air.
pub(super) fn drop_state(ctx: &StateContext) -> CharacterState {
    let impact = ctx.character().ground_impact_velocity.y;

    if impact < ROLL_IMPACT_SPEED {
        CharacterState::DropRolling
    } else if ctx.any_direction() {
        if impact < RUNNING_IMPACT_SPEED {
            CharacterState::DropRunning
        } else if ctx.is_pressed(CharacterAction::Run) {
            CharacterState::Sprint
        } else {
            CharacterState::Walk
        }
    } else {
        CharacterState::DropIdle
    }
}

fn walk_or_start_walk(ctx: &StateContext) -> CharacterState {
    if ctx.speed() > WALK_SPEED {
        CharacterState::Walk
    } else {
        start_walk_state(ctx)
    }
}

/// Start-walk variant for the angle between the facing and the held direction.
pub(super) fn start_walk_state(ctx: &StateContext) -> CharacterState {
    let character = ctx.character();
    let movement = camera_relative_movement(character.view_vector, &character.actions);
    CharacterState::StartWalk(start_direction(signed_angle_y(character.orientation, movement)))
}

fn start_direction(angle: f32) -> StartDirection {
    if angle > PI * 0.8 {
        StartDirection::BackLeft
    } else if angle < -PI * 0.8 {
        StartDirection::BackRight
    } else if angle > PI * 0.3 {
        StartDirection::Left
    } else if angle < -PI * 0.3 {
        StartDirection::Right
    } else {
        StartDirection::Forward
    }
}

fn sharp_turn(ctx: &StateContext) -> Option<Turn> {
    let character = ctx.character();
    let angle = signed_angle_y(character.orientation, character.orientation_target);
    if angle > IDLE_ROTATE_ANGLE {
        Some(Turn::Left)
    } else if angle < -IDLE_ROTATE_ANGLE {
        Some(Turn::Right)
    } else {
        None
    }
}

fn cancelled_start_walk(ctx: &StateContext) -> CharacterState {
    if ctx.timer() < START_WALK_CANCEL_TIME {
        if let Some(turn) = sharp_turn(ctx) {
            return CharacterState::IdleRotate(turn);
        }
    }
    CharacterState::Idle
}
