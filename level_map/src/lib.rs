//! Level description format, validation, and probe-world construction.
#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use collectibles::{CollectibleSet, DEFAULT_COLLECTIBLE_RADIUS, DEFAULT_REMOVAL_DELAY};
use log::warn;
use physics_rapier::PhysicsWorld;
use rapier3d::math::Vector;
use rapier3d::prelude::{ColliderBuilder, Real};
use serde::Deserialize;

const LEVEL_MAP_VERSION: u32 = 1;
/// Planes are modelled as thin slabs whose top face sits at `pos.y`.
const PLANE_HALF_THICKNESS: Real = 0.05;

pub const DEFAULT_LEVEL_TOML: &str = include_str!("../levels/castle_grounds.toml");

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelMap {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub spawn: [Real; 3],
    #[serde(default)]
    pub removal_delay: Option<Real>,
    #[serde(default)]
    pub solids: Vec<SolidSpec>,
    #[serde(default)]
    pub collectibles: Vec<CollectibleSpec>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolidSpec {
    pub id: String,
    pub kind: SolidKind,
    pub pos: [Real; 3],
    /// Full extents. For planes the Y extent is ignored.
    pub size: [Real; 3],
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SolidKind {
    Plane,
    Box,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectibleSpec {
    pub id: String,
    pub pos: [Real; 3],
    #[serde(default)]
    pub radius: Option<Real>,
}

#[derive(Clone, Debug, Default)]
pub struct LevelMapValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LevelMapValidation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct LevelMapError {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl LevelMapError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            path: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for LevelMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level map error")?;
        if let Some(path) = &self.path {
            write!(f, " ({})", path.display())?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for LevelMapError {}

impl LevelMap {
    pub fn parse_toml(text: &str) -> Result<Self, LevelMapError> {
        toml::from_str(text).map_err(|err| LevelMapError::new(err.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, LevelMapError> {
        let contents = std::fs::read_to_string(path).map_err(|err| LevelMapError {
            path: Some(path.to_path_buf()),
            message: format!("read failed: {}", err),
        })?;
        Self::parse_toml(&contents).map_err(|mut err| {
            err.path = Some(path.to_path_buf());
            err
        })
    }

    pub fn default_level() -> Result<Self, LevelMapError> {
        Self::parse_toml(DEFAULT_LEVEL_TOML)
    }

    pub fn spawn(&self) -> Vector<Real> {
        Vector::from(self.spawn)
    }

    pub fn validate(&self) -> LevelMapValidation {
        let mut validation = LevelMapValidation::default();
        if self.version != LEVEL_MAP_VERSION {
            validation
                .errors
                .push(format!("unsupported version {}", self.version));
        }
        if !vector_is_finite(self.spawn) {
            validation.errors.push("spawn must be finite".to_string());
        }
        if let Some(delay) = self.removal_delay {
            if !delay.is_finite() || delay < 0.0 {
                validation
                    .errors
                    .push("removal_delay must be finite and >= 0".to_string());
            }
        }
        if self.solids.is_empty() {
            validation
                .warnings
                .push("level contains no solids; the player will fall forever".to_string());
        }
        if self.collectibles.is_empty() {
            validation
                .warnings
                .push("level contains no collectibles".to_string());
        }

        let mut seen = HashSet::new();
        for solid in &self.solids {
            if solid.id.trim().is_empty() {
                validation
                    .errors
                    .push("solid id must not be empty".to_string());
            } else if !seen.insert(solid.id.as_str()) {
                validation
                    .errors
                    .push(format!("duplicate solid id '{}'", solid.id));
            }
            if !vector_is_finite(solid.pos) {
                validation
                    .errors
                    .push(format!("solid '{}' has invalid pos", solid.id));
            }
            let sized = match solid.kind {
                SolidKind::Plane => [solid.size[0], solid.size[2]]
                    .iter()
                    .all(|value| value.is_finite() && *value > 0.0),
                SolidKind::Box => solid
                    .size
                    .iter()
                    .all(|value| value.is_finite() && *value > 0.0),
            };
            if !sized {
                validation
                    .errors
                    .push(format!("solid '{}' has invalid size", solid.id));
            }
        }

        let mut seen = HashSet::new();
        for collectible in &self.collectibles {
            if collectible.id.trim().is_empty() {
                validation
                    .errors
                    .push("collectible id must not be empty".to_string());
            } else if !seen.insert(collectible.id.as_str()) {
                validation
                    .errors
                    .push(format!("duplicate collectible id '{}'", collectible.id));
            }
            if !vector_is_finite(collectible.pos) {
                validation
                    .errors
                    .push(format!("collectible '{}' has invalid pos", collectible.id));
            }
            if let Some(radius) = collectible.radius {
                if !radius.is_finite() || radius <= 0.0 {
                    validation
                        .errors
                        .push(format!("collectible '{}' radius must be > 0", collectible.id));
                }
            }
        }
        validation
    }

    fn ensure_valid(&self) -> Result<(), LevelMapError> {
        let validation = self.validate();
        for warning in &validation.warnings {
            warn!("level '{}': {}", self.name, warning);
        }
        if validation.is_ok() {
            Ok(())
        } else {
            Err(LevelMapError::new(validation.errors.join("; ")))
        }
    }

    /// Builds the static probe world. The returned world is already refreshed.
    pub fn build_physics(&self) -> Result<PhysicsWorld, LevelMapError> {
        self.ensure_valid()?;
        let mut world = PhysicsWorld::new();
        for solid in &self.solids {
            let [x, y, z] = solid.pos;
            let [sx, sy, sz] = solid.size;
            let collider = match solid.kind {
                SolidKind::Plane => {
                    ColliderBuilder::cuboid(sx * 0.5, PLANE_HALF_THICKNESS, sz * 0.5)
                        .translation(Vector::new(x, y - PLANE_HALF_THICKNESS, z))
                        .build()
                }
                SolidKind::Box => ColliderBuilder::cuboid(sx * 0.5, sy * 0.5, sz * 0.5)
                    .translation(Vector::new(x, y, z))
                    .build(),
            };
            world.insert_static_collider(collider);
        }
        world.refresh();
        Ok(world)
    }

    pub fn build_collectibles(&self) -> Result<CollectibleSet, LevelMapError> {
        self.ensure_valid()?;
        let mut set = CollectibleSet::new(self.removal_delay.unwrap_or(DEFAULT_REMOVAL_DELAY));
        for collectible in &self.collectibles {
            set.spawn(
                collectible.id.clone(),
                Vector::from(collectible.pos),
                collectible.radius.unwrap_or(DEFAULT_COLLECTIBLE_RADIUS),
            );
        }
        Ok(set)
    }
}

fn vector_is_finite(value: [Real; 3]) -> bool {
    value.iter().all(|component| component.is_finite())
}

fn default_visible() -> bool {
    true
}
