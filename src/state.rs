//! Character state machine.
//!
//! Every character is in exactly one [`CharacterState`]. States choose the
//! velocity and orientation targets, tune the springs, start animations and
//! decide on transitions, either on an input edge ([`CharacterState::on_input_change`])
//! or as time passes ([`CharacterState::update`]).
//!
//! Transitions are returned as `Option<CharacterState>` and installed by
//! [`set_state`]. Entering a state restores the spring defaults from
//! [`ControllerConfig`], runs the state's entry hook and then lets it react to
//! the input already held.
//!
//! Input handlers and vehicle helpers may install a state while another one
//! is still deciding. Every installation bumps `Character::state_generation`;
//! a decision made by a state that has since been replaced is dropped.

use bevy::prelude::*;

use crate::animation::play_animation;
use crate::character::{self, Character};
use crate::config::ControllerConfig;
use crate::input::CharacterAction;
use crate::vehicle::{self, SeatApproach};

mod locomotion;
mod vehicles;

/// Transitions installed back to back before the chain is cut.
const MAX_CHAINED_TRANSITIONS: usize = 8;

/// Which way an idle turn goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum Turn {
    Left,
    Right,
}

/// Direction of the first step from standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum StartDirection {
    Forward,
    Left,
    Right,
    BackLeft,
    BackRight,
}

/// Every state a character can be in.
#[derive(Debug, Clone, Default)]
pub enum CharacterState {
    #[default]
    Idle,
    IdleRotate(Turn),
    StartWalk(StartDirection),
    Walk,
    Sprint,
    EndWalk,
    JumpIdle {
        jumped: bool,
    },
    JumpRunning {
        jumped: bool,
    },
    Falling,
    DropIdle,
    DropRunning,
    DropRolling,
    /// Walk up to the door and open it.
    OpenVehicleDoor {
        seat: Entity,
        entry_point: Entity,
        door_opened: bool,
        approach: SeatApproach,
    },
    /// Climb from the entry point into the seat.
    EnteringVehicle {
        seat: Entity,
        entry_point: Entity,
        approach: SeatApproach,
        end_early: f32,
        position_offset: Vec3,
    },
    Driving {
        seat: Entity,
    },
    Sitting {
        seat: Entity,
    },
    SwitchingSeats {
        from_seat: Entity,
        to_seat: Entity,
        approach: SeatApproach,
    },
    CloseVehicleDoorInside {
        seat: Entity,
        door_closed: bool,
    },
    ExitingVehicle {
        seat: Entity,
        approach: SeatApproach,
    },
    ExitingAirplane {
        seat: Entity,
        approach: SeatApproach,
    },
}

/// Fieldless mirror of [`CharacterState`], for inspection and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum StateKind {
    Idle,
    IdleRotateLeft,
    IdleRotateRight,
    StartWalkForward,
    StartWalkLeft,
    StartWalkRight,
    StartWalkBackLeft,
    StartWalkBackRight,
    Walk,
    Sprint,
    EndWalk,
    JumpIdle,
    JumpRunning,
    Falling,
    DropIdle,
    DropRunning,
    DropRolling,
    OpenVehicleDoor,
    EnteringVehicle,
    Driving,
    Sitting,
    SwitchingSeats,
    CloseVehicleDoorInside,
    ExitingVehicle,
    ExitingAirplane,
}

impl CharacterState {
    pub fn jump_idle() -> Self {
        Self::JumpIdle { jumped: false }
    }

    pub fn jump_running() -> Self {
        Self::JumpRunning { jumped: false }
    }

    pub fn open_vehicle_door(seat: Entity, entry_point: Entity) -> Self {
        Self::OpenVehicleDoor {
            seat,
            entry_point,
            door_opened: false,
            approach: SeatApproach::default(),
        }
    }

    pub fn entering_vehicle(seat: Entity, entry_point: Entity) -> Self {
        Self::EnteringVehicle {
            seat,
            entry_point,
            approach: SeatApproach::default(),
            end_early: 0.0,
            position_offset: Vec3::ZERO,
        }
    }

    pub fn switching_seats(from_seat: Entity, to_seat: Entity) -> Self {
        Self::SwitchingSeats {
            from_seat,
            to_seat,
            approach: SeatApproach::default(),
        }
    }

    pub fn close_vehicle_door_inside(seat: Entity) -> Self {
        Self::CloseVehicleDoorInside {
            seat,
            door_closed: false,
        }
    }

    pub fn exiting_vehicle(seat: Entity) -> Self {
        Self::ExitingVehicle {
            seat,
            approach: SeatApproach::default(),
        }
    }

    pub fn exiting_airplane(seat: Entity) -> Self {
        Self::ExitingAirplane {
            seat,
            approach: SeatApproach::default(),
        }
    }

    pub fn kind(&self) -> StateKind {
        match self {
            Self::Idle => StateKind::Idle,
            Self::IdleRotate(Turn::Left) => StateKind::IdleRotateLeft,
            Self::IdleRotate(Turn::Right) => StateKind::IdleRotateRight,
            Self::StartWalk(StartDirection::Forward) => StateKind::StartWalkForward,
            Self::StartWalk(StartDirection::Left) => StateKind::StartWalkLeft,
            Self::StartWalk(StartDirection::Right) => StateKind::StartWalkRight,
            Self::StartWalk(StartDirection::BackLeft) => StateKind::StartWalkBackLeft,
            Self::StartWalk(StartDirection::BackRight) => StateKind::StartWalkBackRight,
            Self::Walk => StateKind::Walk,
            Self::Sprint => StateKind::Sprint,
            Self::EndWalk => StateKind::EndWalk,
            Self::JumpIdle { .. } => StateKind::JumpIdle,
            Self::JumpRunning { .. } => StateKind::JumpRunning,
            Self::Falling => StateKind::Falling,
            Self::DropIdle => StateKind::DropIdle,
            Self::DropRunning => StateKind::DropRunning,
            Self::DropRolling => StateKind::DropRolling,
            Self::OpenVehicleDoor { .. } => StateKind::OpenVehicleDoor,
            Self::EnteringVehicle { .. } => StateKind::EnteringVehicle,
            Self::Driving { .. } => StateKind::Driving,
            Self::Sitting { .. } => StateKind::Sitting,
            Self::SwitchingSeats { .. } => StateKind::SwitchingSeats,
            Self::CloseVehicleDoorInside { .. } => StateKind::CloseVehicleDoorInside,
            Self::ExitingVehicle { .. } => StateKind::ExitingVehicle,
            Self::ExitingAirplane { .. } => StateKind::ExitingAirplane,
        }
    }

    /// States that belong to getting into, sitting in, or out of a vehicle.
    pub fn is_vehicle_state(&self) -> bool {
        matches!(
            self,
            Self::OpenVehicleDoor { .. }
                | Self::EnteringVehicle { .. }
                | Self::Driving { .. }
                | Self::Sitting { .. }
                | Self::SwitchingSeats { .. }
                | Self::CloseVehicleDoorInside { .. }
                | Self::ExitingVehicle { .. }
                | Self::ExitingAirplane { .. }
        )
    }

    /// Whether pressing enter starts a vehicle search.
    pub fn can_find_vehicles_to_enter(&self) -> bool {
        !self.is_vehicle_state()
    }

    /// Whether a pending vehicle entry may start the entering sequence.
    pub fn can_enter_vehicles(&self) -> bool {
        matches!(
            self,
            Self::Idle
                | Self::IdleRotate(_)
                | Self::StartWalk(_)
                | Self::Walk
                | Self::Sprint
                | Self::EndWalk
                | Self::DropIdle
                | Self::DropRunning
                | Self::DropRolling
        )
    }

    /// Whether the vehicle's exit action is honoured.
    pub fn can_leave_vehicles(&self) -> bool {
        !matches!(self, Self::CloseVehicleDoorInside { .. })
    }

    /// Runs once when the state is installed.
    ///
    /// Returns a state to switch to straight away.
    pub fn on_enter(&mut self, ctx: &mut StateContext) -> Option<CharacterState> {
        if self.is_vehicle_state() {
            vehicles::enter(self, ctx)
        } else {
            locomotion::enter(self, ctx)
        }
    }

    /// Reacts to a press or release of any action.
    pub fn on_input_change(&self, ctx: &mut StateContext) -> Option<CharacterState> {
        let generation = ctx.character().state_generation;

        if self.can_find_vehicles_to_enter() && ctx.just_pressed(CharacterAction::Enter) {
            vehicle::find_vehicle_to_enter(ctx.world, ctx.entity, true);
        } else if self.can_find_vehicles_to_enter() && ctx.just_pressed(CharacterAction::EnterPassenger) {
            vehicle::find_vehicle_to_enter(ctx.world, ctx.entity, false);
        } else if self.can_enter_vehicles()
            && ctx.character().vehicle_entry.is_some()
            && ctx.any_direction_just_pressed()
        {
            let mut character = ctx.character_mut();
            character.vehicle_entry = None;
            character.actions.force_release(CharacterAction::Up);
        }

        if ctx.character().state_generation != generation {
            return None;
        }

        if self.is_vehicle_state() {
            vehicles::input_change(self, ctx)
        } else {
            locomotion::input_change(self, ctx)
        }
    }

    /// Runs every frame after the state timer advanced by `dt`.
    pub fn update(&mut self, ctx: &mut StateContext, dt: f32) -> Option<CharacterState> {
        if self.is_vehicle_state() {
            vehicles::update(self, ctx, dt)
        } else {
            locomotion::update(self, ctx, dt)
        }
    }

    /// Runs when the state is replaced by `next`.
    pub fn on_exit(&self, ctx: &mut StateContext, next: &CharacterState) {
        vehicles::exit(self, ctx, next);
    }
}

/// World access for a state acting on one character.
pub struct StateContext<'w> {
    pub world: &'w mut World,
    pub entity: Entity,
}

impl<'w> StateContext<'w> {
    pub fn new(world: &'w mut World, entity: Entity) -> Self {
        Self { world, entity }
    }

    pub fn character(&self) -> &Character {
        self.world
            .get::<Character>(self.entity)
            .expect("state context requires a Character")
    }

    pub fn character_mut(&mut self) -> Mut<'_, Character> {
        self.world
            .get_mut::<Character>(self.entity)
            .expect("state context requires a Character")
    }

    pub fn config(&self) -> ControllerConfig {
        self.world
            .get::<ControllerConfig>(self.entity)
            .copied()
            .unwrap_or_default()
    }

    pub fn timer(&self) -> f32 {
        self.character().state_timer
    }

    /// Whether the clip started on entry finishes within this frame.
    pub fn animation_ended(&self, dt: f32) -> bool {
        let character = self.character();
        character.state_timer > character.animation_length - dt
    }

    /// Start a clip and remember its duration.
    pub fn play_animation(&mut self, clip: &str, fade_in: f32) {
        let duration = play_animation(self.world, self.entity, clip, fade_in);
        self.character_mut().animation_length = duration;
    }

    pub fn is_pressed(&self, action: CharacterAction) -> bool {
        self.character().actions.is_pressed(action)
    }

    pub fn just_pressed(&self, action: CharacterAction) -> bool {
        self.character().actions.just_pressed(action)
    }

    pub fn any_direction(&self) -> bool {
        self.character()
            .actions
            .any_pressed(&CharacterAction::DIRECTIONS)
    }

    pub fn no_direction(&self) -> bool {
        !self.any_direction()
    }

    pub fn any_direction_just_pressed(&self) -> bool {
        self.character()
            .actions
            .any_just_pressed(&CharacterAction::DIRECTIONS)
    }

    pub fn has_ground(&self) -> bool {
        self.character().ground.is_some()
    }

    /// Length of the smoothed local velocity.
    pub fn speed(&self) -> f32 {
        self.character().velocity.length()
    }

    pub fn position(&self) -> Vec3 {
        character::position(self.world, self.entity)
    }

    pub fn rotation(&self) -> Quat {
        self.world
            .get::<Transform>(self.entity)
            .map(|t| t.rotation)
            .unwrap_or_default()
    }

    pub fn set_position(&mut self, position: Vec3) {
        character::set_position(self.world, self.entity, position);
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        character::set_rotation(self.world, self.entity, rotation);
    }

    pub fn face_camera_relative(&mut self) {
        self.character_mut().set_camera_relative_orientation_target();
    }
}

/// Replace the state of `entity`, following any immediate redirects.
pub fn set_state(world: &mut World, entity: Entity, state: CharacterState) {
    let mut pending = Some(state);
    for _ in 0..MAX_CHAINED_TRANSITIONS {
        let Some(state) = pending.take() else {
            return;
        };
        pending = enter_state(world, entity, state);
    }
    if let Some(state) = pending {
        warn!(
            "Dropping transition of {entity} to {:?}: too many chained transitions",
            state.kind()
        );
    }
}

fn enter_state(world: &mut World, entity: Entity, mut state: CharacterState) -> Option<CharacterState> {
    let Some(previous) = world.get::<Character>(entity).map(|c| c.state.clone()) else {
        warn!("Cannot set state of {entity}: it has no Character");
        return None;
    };
    debug!("{entity}: {:?} -> {:?}", previous.kind(), state.kind());

    let mut ctx = StateContext::new(world, entity);
    previous.on_exit(&mut ctx, &state);

    let config = ctx.config();
    let generation = {
        let mut character = ctx.character_mut();
        character.apply_state_defaults(&config);
        character.state_generation = character.state_generation.wrapping_add(1);
        character.state = state.clone();
        character.state_generation
    };

    let redirect = state.on_enter(&mut ctx);
    if ctx.character().state_generation != generation {
        return None;
    }
    ctx.character_mut().state = state;

    redirect.or_else(|| evaluate_input_change(world, entity))
}

fn evaluate_input_change(world: &mut World, entity: Entity) -> Option<CharacterState> {
    let (state, generation) = world
        .get::<Character>(entity)
        .map(|c| (c.state.clone(), c.state_generation))?;

    let next = state.on_input_change(&mut StateContext::new(world, entity));

    let current = world.get::<Character>(entity)?.state_generation;
    if current == generation {
        next
    } else {
        None
    }
}

/// Let the current state react to an input edge.
pub fn dispatch_input_change(world: &mut World, entity: Entity) {
    if let Some(next) = evaluate_input_change(world, entity) {
        set_state(world, entity, next);
    }
}

/// Advance the current state by `dt`.
pub fn update_state(world: &mut World, entity: Entity, dt: f32) {
    let Some((mut state, generation)) = world.get_mut::<Character>(entity).map(|mut c| {
        c.state_timer += dt;
        (c.state.clone(), c.state_generation)
    }) else {
        return;
    };

    let next = state.update(&mut StateContext::new(world, entity), dt);

    let Some(mut character) = world.get_mut::<Character>(entity) else {
        return;
    };
    if character.state_generation != generation {
        return;
    }
    character.state = state;
    drop(character);

    if let Some(next) = next {
        set_state(world, entity, next);
    }
}
