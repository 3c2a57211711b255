//! Snappy platformer motor: grounded/airborne locomotion, air-time gravity,
//! and the timed jump.
//!
//! Falling speed grows with time spent airborne, `(gravity + air_time) *
//! fall_scale`, rather than following constant acceleration. Horizontal
//! movement is a fixed speed along the input direction with no inertia.
#![forbid(unsafe_code)]

pub mod jump;

use log::debug;
use rapier3d::math::Vector;
use rapier3d::prelude::Real;

pub use jump::{ease_out_expo, JumpPhase, JumpStep};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotorConfig {
    /// Horizontal speed while grounded, units/s.
    pub walk_speed: Real,
    /// Horizontal speed while airborne (including the jump ascent), units/s.
    pub air_speed: Real,
    pub gravity: Real,
    pub fall_scale: Real,
    pub jump_height: Real,
    /// Seconds from launch to apex.
    pub jump_duration: Real,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            walk_speed: 8.0,
            air_speed: 6.0,
            gravity: 1.0,
            fall_scale: 4.0,
            jump_height: 12.0,
            jump_duration: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Locomotion {
    Grounded,
    #[default]
    Airborne,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotorState {
    pub locomotion: Locomotion,
    /// Seconds continuously airborne; zero while grounded.
    pub air_time: Real,
    pub jump: JumpPhase,
}

impl MotorState {
    pub fn grounded(&self) -> bool {
        self.locomotion == Locomotion::Grounded
    }
}

/// Net movement axes after key cancellation, each in `{-1, 0, 1}`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoveAxes {
    pub forward: Real,
    pub strafe: Real,
}

impl MoveAxes {
    pub fn from_keys(forward: bool, backward: bool, left: bool, right: bool) -> Self {
        Self {
            forward: key_axis(forward, backward),
            strafe: key_axis(right, left),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.forward == 0.0 && self.strafe == 0.0
    }
}

fn key_axis(positive: bool, negative: bool) -> Real {
    (positive as i8 - negative as i8) as Real
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HorizontalIntent {
    /// Unit direction, or zero when there is no net input.
    pub direction: Vector<Real>,
    pub speed: Real,
    pub translation: Vector<Real>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VerticalStep {
    pub height: Real,
    pub landed: bool,
    pub left_ground: bool,
}

/// Yaw in radians; zero yaw faces -Z.
pub fn forward_vector(yaw: Real) -> Vector<Real> {
    Vector::new(yaw.sin(), 0.0, -yaw.cos())
}

pub fn right_vector(yaw: Real) -> Vector<Real> {
    Vector::new(yaw.cos(), 0.0, yaw.sin())
}

/// Normalized planar direction for the given axes. Zero input yields zero.
pub fn move_direction(yaw: Real, axes: MoveAxes) -> Vector<Real> {
    let wish = forward_vector(yaw) * axes.forward + right_vector(yaw) * axes.strafe;
    let norm = wish.norm();
    if norm > 1.0e-6 {
        wish / norm
    } else {
        Vector::zeros()
    }
}

#[derive(Clone, Debug)]
pub struct CharacterMotor {
    config: MotorConfig,
    state: MotorState,
}

impl CharacterMotor {
    pub fn new(config: MotorConfig) -> Self {
        Self {
            config,
            state: MotorState::default(),
        }
    }

    pub fn config(&self) -> MotorConfig {
        self.config
    }

    pub fn config_mut(&mut self) -> &mut MotorConfig {
        &mut self.config
    }

    pub fn state(&self) -> &MotorState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MotorState {
        &mut self.state
    }

    pub fn is_ascending(&self) -> bool {
        !self.state.jump.is_idle()
    }

    /// Starts a jump from `height`. Dropped unless grounded and idle.
    pub fn try_jump(&mut self, height: Real) -> bool {
        if !self.state.grounded() || self.is_ascending() {
            return false;
        }
        self.state.locomotion = Locomotion::Airborne;
        self.state.jump = jump::begin(height, self.config.jump_height);
        debug!(
            "jump from {:.3} to {:.3}",
            height,
            height + self.config.jump_height
        );
        true
    }

    /// Speed is picked from the current grounded state, before this frame's
    /// ground probe.
    pub fn horizontal_intent(&self, yaw: Real, axes: MoveAxes, dt: Real) -> HorizontalIntent {
        let direction = move_direction(yaw, axes);
        let speed = if self.state.grounded() {
            self.config.walk_speed
        } else {
            self.config.air_speed
        };
        HorizontalIntent {
            direction,
            speed,
            translation: direction * speed * dt.max(0.0),
        }
    }

    /// Drives height during an ascent. Air time keeps accumulating since the
    /// character is not grounded.
    pub fn advance_jump(&mut self, height: Real, dt: Real) -> JumpStep {
        let dt = dt.max(0.0);
        let step = jump::advance(&mut self.state.jump, self.config.jump_duration, dt, height);
        self.state.air_time += dt;
        if step.finished {
            debug!("jump apex reached at {:.3}", step.height);
        }
        step
    }

    /// Gravity and landing for frames without an active ascent.
    /// `support` is the standing height reported by the ground probe.
    pub fn resolve_vertical(&mut self, height: Real, support: Option<Real>, dt: Real) -> VerticalStep {
        let dt = dt.max(0.0);
        match support {
            Some(standing_height) => {
                if self.state.grounded() {
                    return VerticalStep {
                        height,
                        landed: false,
                        left_ground: false,
                    };
                }
                debug!(
                    "landed at {:.3} after {:.3}s airborne",
                    standing_height, self.state.air_time
                );
                self.state.locomotion = Locomotion::Grounded;
                self.state.air_time = 0.0;
                VerticalStep {
                    height: standing_height,
                    landed: true,
                    left_ground: false,
                }
            }
            None => {
                let left_ground = self.state.grounded();
                self.state.locomotion = Locomotion::Airborne;
                let fall_speed = (self.config.gravity + self.state.air_time) * self.config.fall_scale;
                self.state.air_time += dt;
                VerticalStep {
                    height: height - fall_speed * dt,
                    landed: false,
                    left_ground,
                }
            }
        }
    }
}

impl Default for CharacterMotor {
    fn default() -> Self {
        Self::new(MotorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grounded_motor() -> CharacterMotor {
        let mut motor = CharacterMotor::default();
        motor.resolve_vertical(1.0, Some(1.0), 0.016);
        assert!(motor.state().grounded());
        motor
    }

    #[test]
    fn opposing_keys_cancel() {
        let axes = MoveAxes::from_keys(true, true, true, true);
        assert!(axes.is_zero());
        let motor = grounded_motor();
        let intent = motor.horizontal_intent(0.7, axes, 0.1);
        assert_eq!(intent.translation, Vector::zeros());
        assert_eq!(intent.direction, Vector::zeros());

        let strafe_only = MoveAxes::from_keys(true, true, false, true);
        assert_eq!(strafe_only.forward, 0.0);
        assert_eq!(strafe_only.strafe, 1.0);
    }

    #[test]
    fn diagonal_input_is_normalized() {
        let motor = grounded_motor();
        let intent = motor.horizontal_intent(0.0, MoveAxes::from_keys(true, false, false, true), 0.5);
        assert!((intent.direction.norm() - 1.0).abs() < 1.0e-5);
        assert!((intent.translation.norm() - 4.0).abs() < 1.0e-4);
        assert!(intent.translation.x > 0.0 && intent.translation.z < 0.0);
    }

    #[test]
    fn speed_depends_on_grounded_state() {
        let airborne = CharacterMotor::default();
        let forward = MoveAxes::from_keys(true, false, false, false);
        assert_eq!(airborne.horizontal_intent(0.0, forward, 1.0).speed, 6.0);
        assert_eq!(grounded_motor().horizontal_intent(0.0, forward, 1.0).speed, 8.0);
    }

    #[test]
    fn gravity_uses_air_time_before_increment() {
        let mut motor = CharacterMotor::default();
        let step = motor.resolve_vertical(5.0, None, 0.1);
        assert!((step.height - 4.6).abs() < 1.0e-5);
        assert!((motor.state().air_time - 0.1).abs() < 1.0e-6);

        let step = motor.resolve_vertical(step.height, None, 0.1);
        assert!((step.height - (4.6 - 1.1 * 4.0 * 0.1)).abs() < 1.0e-5);
        assert!((motor.state().air_time - 0.2).abs() < 1.0e-6);
    }

    #[test]
    fn landing_snaps_and_resets_air_time() {
        let mut motor = CharacterMotor::default();
        motor.resolve_vertical(5.0, None, 0.1);
        let step = motor.resolve_vertical(3.05, Some(3.0), 0.1);
        assert!(step.landed);
        assert_eq!(step.height, 3.0);
        assert_eq!(motor.state().air_time, 0.0);
        assert!(motor.state().grounded());

        let step = motor.resolve_vertical(3.02, Some(3.0), 0.1);
        assert!(!step.landed);
        assert_eq!(step.height, 3.02);
    }

    #[test]
    fn walking_off_a_ledge_starts_falling() {
        let mut motor = grounded_motor();
        let step = motor.resolve_vertical(1.0, None, 0.1);
        assert!(step.left_ground);
        assert!(step.height < 1.0);
        assert_eq!(motor.state().locomotion, Locomotion::Airborne);
    }

    #[test]
    fn jump_requires_grounded_and_idle() {
        let mut airborne = CharacterMotor::default();
        assert!(!airborne.try_jump(1.0));
        assert!(airborne.state().jump.is_idle());

        let mut motor = grounded_motor();
        assert!(motor.try_jump(1.0));
        assert!(!motor.state().grounded());
        let phase = motor.state().jump;
        assert_eq!(phase.target_height(), Some(13.0));

        motor.advance_jump(2.0, 0.1);
        let before = motor.state().jump;
        assert!(!motor.try_jump(5.0));
        assert_eq!(motor.state().jump, before);
        assert_eq!(motor.state().jump.target_height(), Some(13.0));
    }

    #[test]
    fn jump_scenario_matches_ease_out_profile() {
        let mut motor = grounded_motor();
        motor.try_jump(1.0);
        let mid = motor.advance_jump(1.0, 0.25);
        assert!(!mid.finished);
        assert!(mid.height > 1.0 + 6.0 && mid.height < 13.0);

        let end = motor.advance_jump(mid.height, 0.25);
        assert!(end.finished);
        assert_eq!(end.height, 13.0);
        assert!(motor.state().jump.is_idle());
        assert!(!motor.state().grounded());
        assert!((motor.state().air_time - 0.5).abs() < 1.0e-6);
    }
}
