//! Controller tuning loaded from TOML.
//!
//! Every field is optional; missing values keep the built-in defaults.
//!
//! ```toml
//! [look]
//! sensitivity = 40.0
//!
//! [motor]
//! walk_speed = 8.0
//! jump_height = 12.0
//!
//! [collision]
//! on_probe_error = "allow_move"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use character_collision::{CollisionProfile, ProbeErrorPolicy};
use character_motor::MotorConfig;
use player_camera::{PlayerCamera, DEFAULT_LOOK_SENSITIVITY, DEFAULT_PIVOT_HEIGHT};
use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::Deserialize;

use crate::PlayerController;

#[derive(Clone, Debug)]
pub struct SettingsError {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl SettingsError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            path: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "controller settings error")?;
        if let Some(path) = &self.path {
            write!(f, " ({})", path.display())?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for SettingsError {}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerSettings {
    pub look: LookSettings,
    pub motor: MotorSettings,
    pub collision: CollisionSettings,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookSettings {
    pub sensitivity: Real,
    pub pivot_height: Real,
}

impl Default for LookSettings {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_LOOK_SENSITIVITY,
            pivot_height: DEFAULT_PIVOT_HEIGHT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotorSettings {
    pub walk_speed: Real,
    pub air_speed: Real,
    pub gravity: Real,
    pub fall_scale: Real,
    pub jump_height: Real,
    pub jump_duration: Real,
}

impl Default for MotorSettings {
    fn default() -> Self {
        let config = MotorConfig::default();
        Self {
            walk_speed: config.walk_speed,
            air_speed: config.air_speed,
            gravity: config.gravity,
            fall_scale: config.fall_scale,
            jump_height: config.jump_height,
            jump_duration: config.jump_duration,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollisionSettings {
    pub half_height: Real,
    pub radius: Real,
    pub wall_probe_lift: Real,
    pub wall_probe_distance: Real,
    pub ground_probe_distance: Real,
    pub on_probe_error: String,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        let profile = CollisionProfile::default();
        Self {
            half_height: profile.half_height,
            radius: profile.radius,
            wall_probe_lift: profile.wall_probe_lift,
            wall_probe_distance: profile.wall_probe_distance,
            ground_probe_distance: profile.ground_probe_distance,
            on_probe_error: profile.on_probe_error.as_str().to_string(),
        }
    }
}

impl ControllerSettings {
    pub fn parse_toml(text: &str) -> Result<Self, SettingsError> {
        let settings: Self =
            toml::from_str(text).map_err(|err| SettingsError::new(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let with_path = |mut err: SettingsError| {
            err.path = Some(path.to_path_buf());
            err
        };
        let contents = std::fs::read_to_string(path)
            .map_err(|err| with_path(SettingsError::new(format!("read failed: {}", err))))?;
        Self::parse_toml(&contents).map_err(with_path)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut errors = Vec::new();
        let mut require = |ok: bool, message: &str| {
            if !ok {
                errors.push(message.to_string());
            }
        };
        let look = &self.look;
        require(look.sensitivity.is_finite(), "look.sensitivity must be finite");
        require(look.pivot_height.is_finite(), "look.pivot_height must be finite");

        let motor = &self.motor;
        require(non_negative(motor.walk_speed), "motor.walk_speed must be finite and >= 0");
        require(non_negative(motor.air_speed), "motor.air_speed must be finite and >= 0");
        require(motor.gravity.is_finite(), "motor.gravity must be finite");
        require(non_negative(motor.fall_scale), "motor.fall_scale must be finite and >= 0");
        require(non_negative(motor.jump_height), "motor.jump_height must be finite and >= 0");
        require(
            non_negative(motor.jump_duration),
            "motor.jump_duration must be finite and >= 0",
        );

        let collision = &self.collision;
        require(positive(collision.half_height), "collision.half_height must be finite and > 0");
        require(
            positive(collision.radius) && collision.radius <= collision.half_height,
            "collision.radius must be > 0 and <= half_height",
        );
        require(
            collision.wall_probe_lift.is_finite(),
            "collision.wall_probe_lift must be finite",
        );
        require(
            positive(collision.wall_probe_distance),
            "collision.wall_probe_distance must be finite and > 0",
        );
        require(
            collision.ground_probe_distance.is_finite()
                && collision.ground_probe_distance >= collision.half_height,
            "collision.ground_probe_distance must be finite and >= half_height",
        );
        require(
            ProbeErrorPolicy::parse(&collision.on_probe_error).is_some(),
            "collision.on_probe_error must be allow_move or block_move",
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::new(errors.join("; ")))
        }
    }

    pub fn camera(&self) -> PlayerCamera {
        PlayerCamera::new(self.look.sensitivity).with_pivot_height(self.look.pivot_height)
    }

    pub fn motor_config(&self) -> MotorConfig {
        let motor = &self.motor;
        MotorConfig {
            walk_speed: motor.walk_speed,
            air_speed: motor.air_speed,
            gravity: motor.gravity,
            fall_scale: motor.fall_scale,
            jump_height: motor.jump_height,
            jump_duration: motor.jump_duration,
        }
    }

    pub fn collision_profile(&self) -> Result<CollisionProfile, SettingsError> {
        let collision = &self.collision;
        let on_probe_error = ProbeErrorPolicy::parse(&collision.on_probe_error).ok_or_else(|| {
            SettingsError::new(format!(
                "unknown probe error policy {:?}",
                collision.on_probe_error
            ))
        })?;
        Ok(CollisionProfile {
            half_height: collision.half_height,
            radius: collision.radius,
            wall_probe_lift: collision.wall_probe_lift,
            wall_probe_distance: collision.wall_probe_distance,
            ground_probe_distance: collision.ground_probe_distance,
            on_probe_error,
        })
    }

    pub fn build_controller(&self, spawn: Vector<Real>) -> Result<PlayerController, SettingsError> {
        Ok(PlayerController::new(
            self.camera(),
            self.motor_config(),
            self.collision_profile()?,
            spawn,
        ))
    }
}

fn non_negative(value: Real) -> bool {
    value.is_finite() && value >= 0.0
}

fn positive(value: Real) -> bool {
    value.is_finite() && value > 0.0
}
