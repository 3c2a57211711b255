//! Scripted input for headless runs.
//!
//! ```toml
//! [[frames]]
//! repeat = 90
//!
//! [[frames]]
//! repeat = 60
//! forward = true
//! look = [0.01, 0.0]
//!
//! [[frames]]
//! jump = true
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use player_controller::RawInput;
use serde::Deserialize;

const MAX_SCRIPT_FRAMES: u64 = 1_000_000;

#[derive(Clone, Debug)]
pub struct InputScriptError {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl fmt::Display for InputScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input script error")?;
        if let Some(path) = &self.path {
            write!(f, " ({})", path.display())?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for InputScriptError {}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputScript {
    #[serde(default)]
    pub frames: Vec<ScriptFrame>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptFrame {
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    #[serde(default)]
    pub forward: bool,
    #[serde(default)]
    pub backward: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub jump: bool,
    #[serde(default)]
    pub look: [f32; 2],
}

impl ScriptFrame {
    fn raw(&self) -> RawInput {
        RawInput {
            forward: self.forward,
            backward: self.backward,
            left: self.left,
            right: self.right,
            jump: self.jump,
            look_delta: self.look,
        }
    }
}

impl InputScript {
    pub fn parse_toml(text: &str) -> Result<Self, InputScriptError> {
        toml::from_str(text).map_err(|err| InputScriptError {
            path: None,
            message: err.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, InputScriptError> {
        let contents = std::fs::read_to_string(path).map_err(|err| InputScriptError {
            path: Some(path.to_path_buf()),
            message: format!("read failed: {}", err),
        })?;
        Self::parse_toml(&contents).map_err(|mut err| {
            err.path = Some(path.to_path_buf());
            err
        })
    }

    /// Expands repeats into one raw snapshot per tick.
    pub fn expand(&self) -> Result<Vec<RawInput>, InputScriptError> {
        let total: u64 = self.frames.iter().map(|frame| u64::from(frame.repeat)).sum();
        if total > MAX_SCRIPT_FRAMES {
            return Err(InputScriptError {
                path: None,
                message: format!("script expands to {} frames (max {})", total, MAX_SCRIPT_FRAMES),
            });
        }
        if let Some(index) = self
            .frames
            .iter()
            .position(|frame| !frame.look.iter().all(|value| value.is_finite()))
        {
            return Err(InputScriptError {
                path: None,
                message: format!("frame {} has a non-finite look delta", index),
            });
        }
        let mut frames = Vec::with_capacity(total as usize);
        for frame in &self.frames {
            let raw = frame.raw();
            frames.extend(std::iter::repeat(raw).take(frame.repeat as usize));
        }
        Ok(frames)
    }
}

fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_repeats_in_order() {
        let script = InputScript::parse_toml(
            r#"
[[frames]]
repeat = 2

[[frames]]
forward = true
jump = true
look = [0.5, 0.0]
"#,
        )
        .expect("script");
        let frames = script.expand().expect("frames");
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], RawInput::default());
        assert!(frames[2].forward && frames[2].jump);
        assert_eq!(frames[2].look_delta, [0.5, 0.0]);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = InputScript::parse_toml("[[frames]]\ncrouch = true\n").unwrap_err();
        assert!(err.message.contains("crouch"), "{}", err);
    }

    #[test]
    fn rejects_oversized_scripts() {
        let script = InputScript::parse_toml("[[frames]]\nrepeat = 4000000000\n").expect("script");
        assert!(script.expand().is_err());
    }
}
