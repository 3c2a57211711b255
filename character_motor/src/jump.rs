//! Timed jump ascent.
//!
//! A jump is a scripted rise from the launch height to `launch + jump_height`
//! over a fixed duration. Completion is detected by polling elapsed time each
//! frame; once finished the phase returns to idle and gravity takes over.

use rapier3d::prelude::Real;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum JumpPhase {
    #[default]
    Idle,
    Ascending {
        start_height: Real,
        target_height: Real,
        elapsed: Real,
    },
}

impl JumpPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, JumpPhase::Idle)
    }

    pub fn target_height(&self) -> Option<Real> {
        match self {
            JumpPhase::Idle => None,
            JumpPhase::Ascending { target_height, .. } => Some(*target_height),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JumpStep {
    pub height: Real,
    pub finished: bool,
}

/// Exponential ease-out: very fast start, long tail. Exactly 1 at `t >= 1`.
pub fn ease_out_expo(t: Real) -> Real {
    let t = t.clamp(0.0, 1.0);
    if t >= 1.0 {
        1.0
    } else {
        1.0 - (2.0 as Real).powf(-10.0 * t)
    }
}

pub fn ascent_height(
    start_height: Real,
    jump_height: Real,
    elapsed: Real,
    duration: Real,
) -> Real {
    let t = if duration > 0.0 { elapsed / duration } else { 1.0 };
    if t >= 1.0 {
        return start_height + jump_height;
    }
    start_height + jump_height * ease_out_expo(t)
}

pub(crate) fn begin(start_height: Real, jump_height: Real) -> JumpPhase {
    JumpPhase::Ascending {
        start_height,
        target_height: start_height + jump_height,
        elapsed: 0.0,
    }
}

/// Advances an ascending phase by `dt`. Idle phases are left untouched and
/// report `finished` with the given fallback height.
pub(crate) fn advance(phase: &mut JumpPhase, duration: Real, dt: Real, fallback: Real) -> JumpStep {
    let JumpPhase::Ascending {
        start_height,
        target_height,
        elapsed,
    } = phase
    else {
        return JumpStep {
            height: fallback,
            finished: true,
        };
    };
    *elapsed += dt.max(0.0);
    let height = ascent_height(
        *start_height,
        *target_height - *start_height,
        *elapsed,
        duration,
    );
    let finished = *elapsed >= duration;
    if finished {
        *phase = JumpPhase::Idle;
    }
    JumpStep { height, finished }
}
