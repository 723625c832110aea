//! Fixed-step spring simulators.
//!
//! Every simulator advances in whole frames of `1 / fps` seconds and carries
//! the leftover time into the next call. The reported `position` and
//! `velocity` are interpolated between the last two simulated frames, so the
//! output stays smooth at any render frame rate while the spring itself is
//! fully deterministic.
//!
//! A single frame integrates as:
//!
//! ```text
//! acceleration = (target - position) / mass
//! velocity     = (velocity + acceleration) * damping
//! position     = position + velocity
//! ```

use std::f32::consts::{PI, TAU};

use bevy::prelude::*;

/// One simulated frame of a spring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationFrame<T> {
    pub position: T,
    pub velocity: T,
}

impl<T: Copy> SimulationFrame<T> {
    pub fn new(position: T, velocity: T) -> Self {
        Self { position, velocity }
    }
}

/// Splits elapsed time into whole simulation frames.
#[derive(Debug, Clone, Copy)]
struct FixedStepClock {
    frame_time: f32,
    offset: f32,
}

impl FixedStepClock {
    fn new(fps: f32) -> Self {
        Self {
            frame_time: 1.0 / fps.max(f32::EPSILON),
            offset: 0.0,
        }
    }

    /// Consumes `dt` and returns how many whole frames fit into the accumulated time.
    fn advance(&mut self, dt: f32) -> usize {
        let total = self.offset + dt.max(0.0);
        let frames = (total / self.frame_time).floor() as usize;
        self.offset = total % self.frame_time;
        frames
    }

    /// Interpolation factor between the two cached frames.
    fn alpha(&self) -> f32 {
        self.offset / self.frame_time
    }
}

/// Keeps the last two simulated frames.
fn push_frame<T: Copy>(cache: &mut [SimulationFrame<T>; 2], frame: SimulationFrame<T>) {
    cache[0] = cache[1];
    cache[1] = frame;
}

fn spring_step(position: f32, target: f32, velocity: f32, mass: f32, damping: f32) -> SimulationFrame<f32> {
    let acceleration = (target - position) / mass;
    let velocity = (velocity + acceleration) * damping;
    SimulationFrame::new(position + velocity, velocity)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Wraps an angle into `[-PI, PI)`.
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Scalar spring, used for door swings and seat approach factors.
#[derive(Debug, Clone)]
pub struct SpringSimulator {
    pub position: f32,
    pub velocity: f32,
    pub target: f32,
    pub mass: f32,
    pub damping: f32,
    clock: FixedStepClock,
    cache: [SimulationFrame<f32>; 2],
}

impl SpringSimulator {
    pub fn new(fps: f32, mass: f32, damping: f32) -> Self {
        Self::with_start(fps, mass, damping, 0.0, 0.0)
    }

    /// Creates a simulator already resting at `position` with `velocity`.
    pub fn with_start(fps: f32, mass: f32, damping: f32, position: f32, velocity: f32) -> Self {
        let frame = SimulationFrame::new(position, velocity);
        Self {
            position,
            velocity,
            target: position,
            mass,
            damping,
            clock: FixedStepClock::new(fps),
            cache: [frame; 2],
        }
    }

    /// Resets position, velocity and target to zero.
    pub fn init(&mut self) {
        self.position = 0.0;
        self.velocity = 0.0;
        self.target = 0.0;
        self.clock.offset = 0.0;
        self.cache = [SimulationFrame::new(0.0, 0.0); 2];
    }

    /// Jumps to `position` with `velocity` without simulating.
    pub fn reset_to(&mut self, position: f32, velocity: f32) {
        self.position = position;
        self.velocity = velocity;
        self.cache = [SimulationFrame::new(position, velocity); 2];
    }

    pub fn simulate(&mut self, dt: f32) {
        for _ in 0..self.clock.advance(dt) {
            let last = self.cache[1];
            let frame = spring_step(last.position, self.target, last.velocity, self.mass, self.damping);
            push_frame(&mut self.cache, frame);
        }

        let alpha = self.clock.alpha();
        self.position = lerp(self.cache[0].position, self.cache[1].position, alpha);
        self.velocity = lerp(self.cache[0].velocity, self.cache[1].velocity, alpha);
    }
}

impl Default for SpringSimulator {
    fn default() -> Self {
        Self::new(60.0, 10.0, 0.5)
    }
}

/// Per-axis spring over a [`Vec3`], used for the character's local velocity.
#[derive(Debug, Clone)]
pub struct VectorSpringSimulator {
    pub position: Vec3,
    pub velocity: Vec3,
    pub target: Vec3,
    pub mass: f32,
    pub damping: f32,
    clock: FixedStepClock,
    cache: [SimulationFrame<Vec3>; 2],
}

impl VectorSpringSimulator {
    pub fn new(fps: f32, mass: f32, damping: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            target: Vec3::ZERO,
            mass,
            damping,
            clock: FixedStepClock::new(fps),
            cache: [SimulationFrame::new(Vec3::ZERO, Vec3::ZERO); 2],
        }
    }

    /// Resets position, velocity and target to zero.
    pub fn init(&mut self) {
        self.position = Vec3::ZERO;
        self.velocity = Vec3::ZERO;
        self.target = Vec3::ZERO;
        self.clock.offset = 0.0;
        self.cache = [SimulationFrame::new(Vec3::ZERO, Vec3::ZERO); 2];
    }

    pub fn simulate(&mut self, dt: f32) {
        for _ in 0..self.clock.advance(dt) {
            let last = self.cache[1];
            let x = spring_step(last.position.x, self.target.x, last.velocity.x, self.mass, self.damping);
            let y = spring_step(last.position.y, self.target.y, last.velocity.y, self.mass, self.damping);
            let z = spring_step(last.position.z, self.target.z, last.velocity.z, self.mass, self.damping);
            push_frame(
                &mut self.cache,
                SimulationFrame::new(
                    Vec3::new(x.position, y.position, z.position),
                    Vec3::new(x.velocity, y.velocity, z.velocity),
                ),
            );
        }

        let alpha = self.clock.alpha();
        self.position = self.cache[0].position.lerp(self.cache[1].position, alpha);
        self.velocity = self.cache[0].velocity.lerp(self.cache[1].velocity, alpha);
    }
}

impl Default for VectorSpringSimulator {
    fn default() -> Self {
        Self::new(60.0, 50.0, 0.8)
    }
}

/// Angular spring that reports rotation deltas instead of absolute angles.
///
/// `target` is the angle still to turn, measured from the current heading.
/// After each call, `position` holds the rotation to apply since the previous
/// call. The spring rebases itself to zero on the last frame of every call, so
/// the error never accumulates past a full turn, and the shortest way around
/// is always taken.
#[derive(Debug, Clone)]
pub struct RelativeSpringSimulator {
    pub position: f32,
    pub velocity: f32,
    pub target: f32,
    pub mass: f32,
    pub damping: f32,
    clock: FixedStepClock,
    cache: [SimulationFrame<f32>; 2],
    last_lerp: f32,
}

impl RelativeSpringSimulator {
    pub fn new(fps: f32, mass: f32, damping: f32) -> Self {
        Self {
            position: 0.0,
            velocity: 0.0,
            target: 0.0,
            mass,
            damping,
            clock: FixedStepClock::new(fps),
            cache: [SimulationFrame::new(0.0, 0.0); 2],
            last_lerp: 0.0,
        }
    }

    /// Resets the simulator to rest.
    pub fn init(&mut self) {
        self.position = 0.0;
        self.velocity = 0.0;
        self.target = 0.0;
        self.last_lerp = 0.0;
        self.clock.offset = 0.0;
        self.cache = [SimulationFrame::new(0.0, 0.0); 2];
    }

    pub fn simulate(&mut self, dt: f32) {
        let frames = self.clock.advance(dt);
        for i in 0..frames {
            let mut source = self.cache[1];
            if i + 1 == frames {
                self.last_lerp -= source.position;
                source.position = 0.0;
            }
            let acceleration = wrap_angle(self.target - source.position) / self.mass;
            let velocity = (source.velocity + acceleration) * self.damping;
            push_frame(
                &mut self.cache,
                SimulationFrame::new(source.position + velocity, velocity),
            );
        }

        let alpha = self.clock.alpha();
        let interpolated = self.cache[1].position * alpha;
        self.position = interpolated - self.last_lerp;
        self.last_lerp = interpolated;
        self.velocity = lerp(self.cache[0].velocity, self.cache[1].velocity, alpha);
    }
}

impl Default for RelativeSpringSimulator {
    fn default() -> Self {
        Self::new(60.0, 10.0, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn scalar_spring_converges_to_target() {
        let mut spring = SpringSimulator::new(60.0, 10.0, 0.5);
        spring.target = 1.0;

        for _ in 0..300 {
            spring.simulate(DT);
        }

        assert!((spring.position - 1.0).abs() < 1e-3, "position {}", spring.position);
        assert!(spring.velocity.abs() < 1e-3);
    }

    #[test]
    fn vector_spring_converges_on_every_axis() {
        let mut spring = VectorSpringSimulator::new(60.0, 50.0, 0.8);
        spring.target = Vec3::new(0.0, 0.0, 1.4);

        for _ in 0..600 {
            spring.simulate(DT);
        }

        assert!((spring.position - spring.target).length() < 1e-3);
    }

    #[test]
    fn short_steps_carry_over_into_the_next_frame() {
        let mut spring = SpringSimulator::new(60.0, 10.0, 0.5);
        spring.target = 1.0;

        spring.simulate(DT * 0.4);
        assert_eq!(spring.cache[1].position, 0.0, "no whole frame elapsed yet");

        spring.simulate(DT * 0.7);
        assert!(spring.cache[1].position > 0.0, "leftover time completes a frame");
    }

    #[test]
    fn identical_inputs_give_identical_results() {
        let mut a = VectorSpringSimulator::new(60.0, 50.0, 0.8);
        let mut b = VectorSpringSimulator::new(60.0, 50.0, 0.8);
        a.target = Vec3::new(0.3, 0.0, 0.8);
        b.target = a.target;

        for dt in [0.01, 0.033, 0.007, 0.05] {
            a.simulate(dt);
            b.simulate(dt);
        }

        assert_eq!(a.position, b.position);
        assert_eq!(a.velocity, b.velocity);
    }

    #[test]
    fn wrap_angle_stays_in_half_open_range() {
        assert!((wrap_angle(1.5 * PI) + 0.5 * PI).abs() < 1e-5);
        assert!((wrap_angle(-1.5 * PI) - 0.5 * PI).abs() < 1e-5);
        assert!((wrap_angle(PI) + PI).abs() < 1e-5);
        assert!((wrap_angle(0.25) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn relative_spring_takes_the_short_way_round() {
        let mut spring = RelativeSpringSimulator::new(60.0, 10.0, 0.5);
        spring.target = 1.5 * PI;

        let mut turned = 0.0;
        for _ in 0..3 {
            spring.simulate(DT);
            turned += spring.position;
        }

        assert!(turned < 0.0, "turned {turned} should go through -PI/2");
    }

    #[test]
    fn relative_spring_flip_between_plus_and_minus_three_stays_within_pi() {
        let mut spring = RelativeSpringSimulator::new(60.0, 10.0, 0.5);

        for target in [3.0, -3.0, 3.0, -3.0] {
            spring.target = target;
            for _ in 0..30 {
                spring.simulate(DT);
                assert!(spring.position.is_finite());
                assert!(spring.position.abs() <= PI, "stepped {} toward {target}", spring.position);
            }
        }
    }

    #[test]
    fn relative_spring_reaches_a_retargeted_heading() {
        let mut spring = RelativeSpringSimulator::new(60.0, 10.0, 0.5);
        let goal = 0.8;
        let mut heading = 0.0;

        for _ in 0..600 {
            spring.target = goal - heading;
            spring.simulate(DT);
            heading += spring.position;
        }

        assert!((heading - goal).abs() < 1e-2, "heading {heading}");
    }

    #[test]
    fn init_returns_to_rest() {
        let mut spring = VectorSpringSimulator::new(60.0, 50.0, 0.8);
        spring.target = Vec3::ONE;
        spring.simulate(0.5);
        spring.init();

        assert_eq!(spring.position, Vec3::ZERO);
        assert_eq!(spring.velocity, Vec3::ZERO);
        assert_eq!(spring.target, Vec3::ZERO);
    }
}
