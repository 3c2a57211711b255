use character_motor::MoveAxes;
use rapier3d::prelude::Real;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveKey {
    Forward,
    Backward,
    Left,
    Right,
}

/// Per-frame input as the controller consumes it.
///
/// `jump_triggered` is edge-detected: true for exactly one frame per physical
/// press. `consume_look_delta` drains the accumulated pointer motion.
pub trait InputSource {
    fn key_held(&self, key: MoveKey) -> bool;
    fn consume_look_delta(&mut self) -> [Real; 2];
    fn jump_triggered(&mut self) -> bool;
}

/// Level-style snapshot of the device state for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    /// Jump button held this frame.
    pub jump: bool,
    pub look_delta: [Real; 2],
}

/// Turns a stream of [`RawInput`] snapshots into an [`InputSource`].
#[derive(Clone, Debug, Default)]
pub struct EdgeInput {
    current: RawInput,
    jump_was_held: bool,
    jump_pending: bool,
    look_pending: [Real; 2],
}

impl EdgeInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self, raw: RawInput) {
        if raw.jump && !self.jump_was_held {
            self.jump_pending = true;
        }
        self.jump_was_held = raw.jump;
        self.look_pending[0] += raw.look_delta[0];
        self.look_pending[1] += raw.look_delta[1];
        self.current = raw;
    }

    pub fn current(&self) -> RawInput {
        self.current
    }
}

impl InputSource for EdgeInput {
    fn key_held(&self, key: MoveKey) -> bool {
        match key {
            MoveKey::Forward => self.current.forward,
            MoveKey::Backward => self.current.backward,
            MoveKey::Left => self.current.left,
            MoveKey::Right => self.current.right,
        }
    }

    fn consume_look_delta(&mut self) -> [Real; 2] {
        std::mem::take(&mut self.look_pending)
    }

    fn jump_triggered(&mut self) -> bool {
        std::mem::take(&mut self.jump_pending)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputIntent {
    pub axes: MoveAxes,
    pub jump: bool,
    pub look_delta: [Real; 2],
}

impl InputIntent {
    /// Reads one frame of intent, consuming the look delta and jump edge.
    pub fn read<I: InputSource + ?Sized>(input: &mut I) -> Self {
        let axes = MoveAxes::from_keys(
            input.key_held(MoveKey::Forward),
            input.key_held(MoveKey::Backward),
            input.key_held(MoveKey::Left),
            input.key_held(MoveKey::Right),
        );
        Self {
            axes,
            look_delta: input.consume_look_delta(),
            jump: input.jump_triggered(),
        }
    }
}
