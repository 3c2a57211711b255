//! Look controller: yaw/pitch from look deltas, camera pivot from player pose.
#![forbid(unsafe_code)]

use rapier3d::math::Vector;
use rapier3d::prelude::Real;

/// Pitch pivot limit in degrees, applied symmetrically.
pub const PITCH_LIMIT: Real = 45.0;
pub const DEFAULT_LOOK_SENSITIVITY: Real = 40.0;
pub const DEFAULT_PIVOT_HEIGHT: Real = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub pivot: Vector<Real>,
    /// Degrees, unbounded.
    pub yaw: Real,
    /// Degrees, within `[-PITCH_LIMIT, PITCH_LIMIT]`.
    pub pitch: Real,
}

#[derive(Clone, Copy, Debug)]
pub struct PlayerCamera {
    sensitivity: Real,
    pivot_height: Real,
    yaw: Real,
    pitch: Real,
    pivot: Vector<Real>,
}

impl Default for PlayerCamera {
    fn default() -> Self {
        Self::new(DEFAULT_LOOK_SENSITIVITY)
    }
}

impl PlayerCamera {
    pub fn new(sensitivity: Real) -> Self {
        Self {
            sensitivity,
            pivot_height: DEFAULT_PIVOT_HEIGHT,
            yaw: 0.0,
            pitch: 0.0,
            pivot: Vector::zeros(),
        }
    }

    pub fn with_pivot_height(mut self, pivot_height: Real) -> Self {
        self.pivot_height = pivot_height;
        self
    }

    pub fn sensitivity(&self) -> Real {
        self.sensitivity
    }

    pub fn yaw(&self) -> Real {
        self.yaw
    }

    pub fn yaw_radians(&self) -> Real {
        self.yaw.to_radians()
    }

    pub fn pitch(&self) -> Real {
        self.pitch
    }

    pub fn set_look(&mut self, yaw: Real, pitch: Real) {
        self.yaw = finite_or_zero(yaw);
        self.pitch = finite_or_zero(pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Horizontal delta turns the body, vertical delta tilts the pivot
    /// (moving the pointer up looks up).
    pub fn apply_look_delta(&mut self, delta: [Real; 2]) {
        let dx = finite_or_zero(delta[0]);
        let dy = finite_or_zero(delta[1]);
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch - dy * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn update_from_origin(&mut self, origin: Vector<Real>) -> CameraPose {
        self.pivot = origin + Vector::new(0.0, self.pivot_height, 0.0);
        self.pose()
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            pivot: self.pivot,
            yaw: self.yaw,
            pitch: self.pitch,
        }
    }
}

fn finite_or_zero(value: Real) -> Real {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_deltas_by_sensitivity() {
        let mut camera = PlayerCamera::default();
        camera.apply_look_delta([0.5, 0.25]);
        assert_eq!(camera.yaw(), 20.0);
        assert_eq!(camera.pitch(), -10.0);
    }

    #[test]
    fn pitch_stays_clamped_for_any_delta_sequence() {
        let mut camera = PlayerCamera::default();
        let deltas = [
            [0.0, -3.0],
            [1.0, 0.2],
            [0.0, 10.0],
            [-0.3, -0.01],
            [0.0, Real::NAN],
            [Real::INFINITY, Real::NEG_INFINITY],
            [0.0, 0.9],
            [0.0, -0.9],
        ];
        for delta in deltas {
            camera.apply_look_delta(delta);
            assert!(camera.pitch() >= -PITCH_LIMIT && camera.pitch() <= PITCH_LIMIT);
            assert!(camera.yaw().is_finite());
        }
        camera.apply_look_delta([0.0, -100.0]);
        assert_eq!(camera.pitch(), PITCH_LIMIT);
        camera.apply_look_delta([0.0, 100.0]);
        assert_eq!(camera.pitch(), -PITCH_LIMIT);
    }

    #[test]
    fn zero_delta_does_not_drift() {
        let mut camera = PlayerCamera::default();
        camera.set_look(123.0, 31.5);
        for _ in 0..1000 {
            camera.apply_look_delta([0.0, 0.0]);
        }
        assert_eq!(camera.yaw(), 123.0);
        assert_eq!(camera.pitch(), 31.5);
    }

    #[test]
    fn pivot_follows_origin() {
        let mut camera = PlayerCamera::default();
        let pose = camera.update_from_origin(Vector::new(1.0, 5.0, -2.0));
        assert_eq!(pose.pivot, Vector::new(1.0, 7.0, -2.0));
    }
}
