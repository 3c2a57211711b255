//! Probe-based collision guard and the probe service seam.
//!
//! Policy: horizontal moves are all-or-nothing. A wall probe hit rejects the
//! whole displacement for the frame; there is no sliding and no step-up.
#![forbid(unsafe_code)]

use std::fmt;

use log::warn;
use physics_rapier::PhysicsWorld;
use rapier3d::math::{Point, Vector};
use rapier3d::prelude::{ColliderHandle, Real};

const MIN_DIRECTION_NORM_SQUARED: Real = 1.0e-8;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProbeResult {
    pub hit: bool,
    pub point: Option<Vector<Real>>,
    pub normal: Option<Vector<Real>>,
}

impl ProbeResult {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn hit(point: Vector<Real>, normal: Vector<Real>) -> Self {
        Self {
            hit: true,
            point: Some(point),
            normal: Some(normal),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProbeError {
    /// The backend cannot answer queries right now.
    Unavailable(String),
    /// The query itself was malformed (non-finite or zero-length direction).
    InvalidQuery(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Unavailable(message) => write!(f, "probe backend unavailable: {}", message),
            ProbeError::InvalidQuery(message) => write!(f, "invalid probe query: {}", message),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Short-range ray queries against static world geometry.
pub trait ProbeService {
    fn probe(
        &self,
        origin: Vector<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        exclude: Option<ColliderHandle>,
    ) -> Result<ProbeResult, ProbeError>;
}

impl ProbeService for PhysicsWorld {
    fn probe(
        &self,
        origin: Vector<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        exclude: Option<ColliderHandle>,
    ) -> Result<ProbeResult, ProbeError> {
        if self.needs_refresh() {
            return Err(ProbeError::Unavailable(
                "query pipeline not refreshed after collider changes".to_string(),
            ));
        }
        let direction = validated_direction(direction)?;
        if !max_distance.is_finite() || max_distance < 0.0 {
            return Err(ProbeError::InvalidQuery(format!(
                "max distance {} must be finite and >= 0",
                max_distance
            )));
        }
        let hit = self.cast_ray(Point::from(origin), direction, max_distance, exclude);
        Ok(match hit {
            Some(hit) => ProbeResult::hit(hit.point.coords, hit.normal),
            None => ProbeResult::miss(),
        })
    }
}

fn validated_direction(direction: Vector<Real>) -> Result<Vector<Real>, ProbeError> {
    let norm_squared = direction.norm_squared();
    if !norm_squared.is_finite() || norm_squared < MIN_DIRECTION_NORM_SQUARED {
        return Err(ProbeError::InvalidQuery(format!(
            "direction [{}, {}, {}] is not a usable ray direction",
            direction.x, direction.y, direction.z
        )));
    }
    Ok(direction / norm_squared.sqrt())
}

/// What to do with a horizontal move when the wall probe itself fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProbeErrorPolicy {
    /// Fail open: the move is committed as if nothing was hit.
    #[default]
    AllowMove,
    /// Fail closed: the move is rejected for the frame.
    BlockMove,
}

impl ProbeErrorPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeErrorPolicy::AllowMove => "allow_move",
            ProbeErrorPolicy::BlockMove => "block_move",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "allow_move" | "fail_open" => Some(ProbeErrorPolicy::AllowMove),
            "block_move" | "fail_closed" => Some(ProbeErrorPolicy::BlockMove),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionProfile {
    /// Half the capsule height; the origin sits this far above the feet.
    pub half_height: Real,
    pub radius: Real,
    /// Height above the origin the wall probe is cast from.
    pub wall_probe_lift: Real,
    pub wall_probe_distance: Real,
    /// Downward probe length from the origin; slightly more than `half_height`.
    pub ground_probe_distance: Real,
    pub on_probe_error: ProbeErrorPolicy,
}

impl Default for CollisionProfile {
    fn default() -> Self {
        Self {
            half_height: 1.0,
            radius: 0.5,
            wall_probe_lift: 0.5,
            wall_probe_distance: 0.5,
            ground_probe_distance: 1.1,
            on_probe_error: ProbeErrorPolicy::AllowMove,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveGate {
    /// The translation actually committed: the request or zero.
    pub translation: Vector<Real>,
    pub blocked: bool,
    pub wall_normal: Option<Vector<Real>>,
    pub probe_failed: bool,
}

impl MoveGate {
    fn committed(translation: Vector<Real>) -> Self {
        Self {
            translation,
            blocked: false,
            wall_normal: None,
            probe_failed: false,
        }
    }

    fn rejected(wall_normal: Option<Vector<Real>>) -> Self {
        Self {
            translation: Vector::zeros(),
            blocked: true,
            wall_normal,
            probe_failed: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundSupport {
    pub point: Vector<Real>,
    pub normal: Option<Vector<Real>>,
    /// Origin height that puts the feet on `point`.
    pub standing_height: Real,
}

#[derive(Clone, Debug)]
pub struct CharacterCollision {
    profile: CollisionProfile,
    body: Option<ColliderHandle>,
}

impl CharacterCollision {
    pub fn new(profile: CollisionProfile) -> Self {
        Self {
            profile,
            body: None,
        }
    }

    pub fn profile(&self) -> CollisionProfile {
        self.profile
    }

    pub fn set_profile(&mut self, profile: CollisionProfile) {
        self.profile = profile;
    }

    /// The character's own collider, excluded from every probe.
    pub fn body(&self) -> Option<ColliderHandle> {
        self.body
    }

    pub fn set_body(&mut self, body: Option<ColliderHandle>) {
        self.body = body;
    }

    /// Wall probe along `direction`; commits `translation` only on a clean miss.
    /// A zero direction means no movement intent and issues no probe.
    pub fn gate_move<P: ProbeService + ?Sized>(
        &self,
        probes: &P,
        position: Vector<Real>,
        direction: Vector<Real>,
        translation: Vector<Real>,
    ) -> MoveGate {
        if direction.norm_squared() < MIN_DIRECTION_NORM_SQUARED {
            return MoveGate::committed(Vector::zeros());
        }
        let origin = position + Vector::new(0.0, self.profile.wall_probe_lift, 0.0);
        match probes.probe(
            origin,
            direction,
            self.profile.wall_probe_distance,
            self.body,
        ) {
            Ok(result) if result.hit => MoveGate::rejected(result.normal),
            Ok(_) => MoveGate::committed(translation),
            Err(err) => {
                warn!(
                    "wall probe failed ({}); policy {}",
                    err,
                    self.profile.on_probe_error.as_str()
                );
                let mut gate = match self.profile.on_probe_error {
                    ProbeErrorPolicy::AllowMove => MoveGate::committed(translation),
                    ProbeErrorPolicy::BlockMove => MoveGate::rejected(None),
                };
                gate.probe_failed = true;
                gate
            }
        }
    }

    /// Downward probe from the origin. Backend failures read as "no ground".
    pub fn probe_ground<P: ProbeService + ?Sized>(
        &self,
        probes: &P,
        position: Vector<Real>,
    ) -> Option<GroundSupport> {
        let result = match probes.probe(
            position,
            Vector::new(0.0, -1.0, 0.0),
            self.profile.ground_probe_distance,
            self.body,
        ) {
            Ok(result) => result,
            Err(err) => {
                warn!("ground probe failed ({}); treating as airborne", err);
                return None;
            }
        };
        if !result.hit {
            return None;
        }
        let point = result.point.unwrap_or(position);
        Some(GroundSupport {
            point,
            normal: result.normal,
            standing_height: point.y + self.profile.half_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::prelude::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct ScriptedProbes {
        wall: Option<Result<ProbeResult, ProbeError>>,
        ground: Option<Result<ProbeResult, ProbeError>>,
        calls: RefCell<Vec<(Vector<Real>, Vector<Real>, Real)>>,
    }

    impl ProbeService for ScriptedProbes {
        fn probe(
            &self,
            origin: Vector<Real>,
            direction: Vector<Real>,
            max_distance: Real,
            _exclude: Option<ColliderHandle>,
        ) -> Result<ProbeResult, ProbeError> {
            self.calls
                .borrow_mut()
                .push((origin, direction, max_distance));
            let scripted = if direction.y < 0.0 {
                &self.ground
            } else {
                &self.wall
            };
            scripted.clone().unwrap_or(Ok(ProbeResult::miss()))
        }
    }

    fn build_room(world: &mut PhysicsWorld) {
        let floor = ColliderBuilder::cuboid(10.0, 0.5, 10.0)
            .translation(vector![0.0, -0.5, 0.0])
            .build();
        world.insert_static_collider(floor);
        let wall = ColliderBuilder::cuboid(0.5, 5.0, 10.0)
            .translation(vector![2.0, 5.0, 0.0])
            .build();
        world.insert_static_collider(wall);
    }

    #[test]
    fn wall_hit_rejects_entire_move() {
        let probes = ScriptedProbes {
            wall: Some(Ok(ProbeResult::hit(
                vector![0.4, 1.5, 0.0],
                vector![-1.0, 0.0, 0.0],
            ))),
            ..Default::default()
        };
        let collision = CharacterCollision::new(CollisionProfile::default());
        let gate = collision.gate_move(
            &probes,
            vector![0.0, 1.0, 0.0],
            vector![1.0, 0.0, 0.0],
            vector![0.13, 0.0, 0.0],
        );
        assert!(gate.blocked);
        assert_eq!(gate.translation, Vector::zeros());
        assert_eq!(gate.wall_normal, Some(vector![-1.0, 0.0, 0.0]));

        let calls = probes.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vector![0.0, 1.5, 0.0]);
        assert_eq!(calls[0].2, 0.5);
    }

    #[test]
    fn zero_direction_commits_nothing_without_probing() {
        let probes = ScriptedProbes::default();
        let collision = CharacterCollision::new(CollisionProfile::default());
        let gate = collision.gate_move(
            &probes,
            vector![0.0, 1.0, 0.0],
            Vector::zeros(),
            Vector::zeros(),
        );
        assert!(!gate.blocked);
        assert_eq!(gate.translation, Vector::zeros());
        assert!(probes.calls.borrow().is_empty());
    }

    #[test]
    fn probe_failure_follows_policy() {
        let failing = || ScriptedProbes {
            wall: Some(Err(ProbeError::Unavailable("offline".to_string()))),
            ..Default::default()
        };
        let request = vector![0.1, 0.0, 0.0];
        let direction = vector![1.0, 0.0, 0.0];

        let open = CharacterCollision::new(CollisionProfile::default());
        let gate = open.gate_move(&failing(), Vector::zeros(), direction, request);
        assert!(gate.probe_failed);
        assert!(!gate.blocked);
        assert_eq!(gate.translation, request);

        let closed = CharacterCollision::new(CollisionProfile {
            on_probe_error: ProbeErrorPolicy::BlockMove,
            ..CollisionProfile::default()
        });
        let gate = closed.gate_move(&failing(), Vector::zeros(), direction, request);
        assert!(gate.probe_failed);
        assert!(gate.blocked);
        assert_eq!(gate.translation, Vector::zeros());
    }

    #[test]
    fn ground_probe_reports_standing_height() {
        let probes = ScriptedProbes {
            ground: Some(Ok(ProbeResult::hit(
                vector![0.0, 3.0, 0.0],
                vector![0.0, 1.0, 0.0],
            ))),
            ..Default::default()
        };
        let collision = CharacterCollision::new(CollisionProfile::default());
        let support = collision
            .probe_ground(&probes, vector![0.0, 3.95, 0.0])
            .expect("support");
        assert_eq!(support.standing_height, 4.0);
        assert_eq!(probes.calls.borrow()[0].2, 1.1);
    }

    #[test]
    fn ground_probe_failure_reads_as_airborne() {
        let probes = ScriptedProbes {
            ground: Some(Err(ProbeError::Unavailable("offline".to_string()))),
            ..Default::default()
        };
        let collision = CharacterCollision::new(CollisionProfile::default());
        assert!(collision.probe_ground(&probes, Vector::zeros()).is_none());
    }

    #[test]
    fn rapier_world_blocks_at_wall_and_finds_floor() {
        let mut world = PhysicsWorld::new();
        build_room(&mut world);
        let body = world.insert_character_volume(1.0, 0.5, vector![1.2, 1.0, 0.0]);
        world.refresh();

        let mut collision = CharacterCollision::new(CollisionProfile::default());
        collision.set_body(Some(body));
        let position = vector![1.2, 1.0, 0.0];

        let toward_wall = collision.gate_move(
            &world,
            position,
            vector![1.0, 0.0, 0.0],
            vector![0.1, 0.0, 0.0],
        );
        assert!(toward_wall.blocked);

        let away = collision.gate_move(
            &world,
            position,
            vector![-1.0, 0.0, 0.0],
            vector![-0.1, 0.0, 0.0],
        );
        assert!(!away.blocked);

        let support = collision.probe_ground(&world, position).expect("floor");
        assert!((support.standing_height - 1.0).abs() < 1.0e-4);
    }

    #[test]
    fn stale_world_reports_unavailable() {
        let mut world = PhysicsWorld::new();
        build_room(&mut world);
        let result = world.probe(
            vector![0.0, 1.0, 0.0],
            vector![0.0, -1.0, 0.0],
            1.1,
            None,
        );
        assert!(matches!(result, Err(ProbeError::Unavailable(_))));
    }

    #[test]
    fn degenerate_direction_is_rejected() {
        let mut world = PhysicsWorld::new();
        world.refresh();
        let result = world.probe(Vector::zeros(), Vector::zeros(), 1.0, None);
        assert!(matches!(result, Err(ProbeError::InvalidQuery(_))));
    }
}
