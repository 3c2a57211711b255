//! Player controller composition (input + look + motor + collision guard).
//!
//! Frame order is fixed: look update, jump trigger, horizontal intent from
//! the updated yaw, wall-probe gating, then vertical resolution by either the
//! jump ascent or gravity and the ground probe.
#![forbid(unsafe_code)]

pub mod input;
pub mod settings;

use character_collision::{CharacterCollision, CollisionProfile, ProbeService};
use character_motor::{CharacterMotor, JumpPhase, MotorConfig};
use collectibles::CharacterVolume;
use player_camera::{CameraPose, PlayerCamera};
use rapier3d::math::Vector;
use rapier3d::prelude::{ColliderHandle, Real};

pub use input::{EdgeInput, InputIntent, InputSource, MoveKey, RawInput};
pub use settings::{ControllerSettings, SettingsError};

pub const DEFAULT_SPAWN: [Real; 3] = [0.0, 5.0, 0.0];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerFrame {
    pub position: Vector<Real>,
    pub yaw: Real,
    pub pitch: Real,
    pub grounded: bool,
    pub air_time: Real,
    pub jump: JumpPhase,
    pub camera: CameraPose,
    /// Horizontal translation committed this frame.
    pub moved: Vector<Real>,
    pub blocked: bool,
    pub jumped: bool,
    pub landed: bool,
}

#[derive(Clone, Debug)]
pub struct PlayerController {
    camera: PlayerCamera,
    motor: CharacterMotor,
    collision: CharacterCollision,
    position: Vector<Real>,
}

impl PlayerController {
    pub fn new(
        camera: PlayerCamera,
        motor: MotorConfig,
        profile: CollisionProfile,
        position: Vector<Real>,
    ) -> Self {
        Self {
            camera,
            motor: CharacterMotor::new(motor),
            collision: CharacterCollision::new(profile),
            position,
        }
    }

    pub fn with_defaults(position: Vector<Real>) -> Self {
        Self::new(
            PlayerCamera::default(),
            MotorConfig::default(),
            CollisionProfile::default(),
            position,
        )
    }

    pub fn position(&self) -> Vector<Real> {
        self.position
    }

    pub fn camera(&self) -> &PlayerCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut PlayerCamera {
        &mut self.camera
    }

    pub fn motor(&self) -> &CharacterMotor {
        &self.motor
    }

    pub fn motor_mut(&mut self) -> &mut CharacterMotor {
        &mut self.motor
    }

    pub fn collision(&self) -> &CharacterCollision {
        &self.collision
    }

    /// Registers the character's own collider so probes skip it.
    pub fn set_body(&mut self, body: Option<ColliderHandle>) {
        self.collision.set_body(body);
    }

    pub fn volume(&self) -> CharacterVolume {
        let profile = self.collision.profile();
        CharacterVolume {
            center: self.position,
            half_height: profile.half_height,
            radius: profile.radius,
        }
    }

    pub fn tick<P, I>(&mut self, probes: &P, input: &mut I, dt: Real) -> PlayerFrame
    where
        P: ProbeService + ?Sized,
        I: InputSource + ?Sized,
    {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let intent = InputIntent::read(input);
        self.camera.apply_look_delta(intent.look_delta);

        let jumped = intent.jump && self.motor.try_jump(self.position.y);

        let horizontal = self
            .motor
            .horizontal_intent(self.camera.yaw_radians(), intent.axes, dt);
        let gate = self.collision.gate_move(
            probes,
            self.position,
            horizontal.direction,
            horizontal.translation,
        );
        self.position += gate.translation;

        let mut landed = false;
        if self.motor.is_ascending() {
            let step = self.motor.advance_jump(self.position.y, dt);
            self.position.y = step.height;
        } else {
            let support = self
                .collision
                .probe_ground(probes, self.position)
                .map(|support| support.standing_height);
            let step = self.motor.resolve_vertical(self.position.y, support, dt);
            self.position.y = step.height;
            landed = step.landed;
        }

        let camera = self.camera.update_from_origin(self.position);
        let state = self.motor.state();
        PlayerFrame {
            position: self.position,
            yaw: self.camera.yaw(),
            pitch: self.camera.pitch(),
            grounded: state.grounded(),
            air_time: state.air_time,
            jump: state.jump,
            camera,
            moved: gate.translation,
            blocked: gate.blocked,
            jumped,
            landed,
        }
    }
}
