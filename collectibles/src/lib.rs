//! Single-fire collectible pickups.
//!
//! Each collectible is a sphere tested against the character capsule once per
//! frame. The first overlap marks it collected, notifies the sink, and asks
//! the world to remove it after a delay. Collected items are skipped forever.
#![forbid(unsafe_code)]

use log::{info, warn};
use rapier3d::math::{Isometry, Vector};
use rapier3d::parry::query;
use rapier3d::prelude::{Ball, Capsule, Real};

pub const DEFAULT_COLLECTIBLE_RADIUS: Real = 0.75;
pub const DEFAULT_REMOVAL_DELAY: Real = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectibleId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct Collectible {
    id: CollectibleId,
    name: String,
    position: Vector<Real>,
    radius: Real,
    collected: bool,
}

impl Collectible {
    pub fn id(&self) -> CollectibleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vector<Real> {
        self.position
    }

    pub fn radius(&self) -> Real {
        self.radius
    }

    pub fn collected(&self) -> bool {
        self.collected
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CollectibleAcquired {
    pub id: CollectibleId,
    pub name: String,
    pub position: Vector<Real>,
}

/// Receiver for pickup side effects (on-screen text, sound, despawn).
/// Calls are fire-and-forget.
pub trait PickupSink {
    fn acquired(&mut self, event: &CollectibleAcquired);
    fn schedule_removal(&mut self, id: CollectibleId, delay: Real);
}

/// Collects everything it is told; useful as an outbox drained by the world.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PickupLog {
    pub acquired: Vec<CollectibleAcquired>,
    pub removals: Vec<(CollectibleId, Real)>,
}

impl PickupLog {
    pub fn clear(&mut self) {
        self.acquired.clear();
        self.removals.clear();
    }
}

impl PickupSink for PickupLog {
    fn acquired(&mut self, event: &CollectibleAcquired) {
        self.acquired.push(event.clone());
    }

    fn schedule_removal(&mut self, id: CollectibleId, delay: Real) {
        self.removals.push((id, delay));
    }
}

/// The character's overlap volume: a Y-aligned capsule centred on the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharacterVolume {
    pub center: Vector<Real>,
    pub half_height: Real,
    pub radius: Real,
}

impl CharacterVolume {
    fn capsule(&self) -> Capsule {
        let half_segment = (self.half_height - self.radius).max(0.0);
        Capsule::new_y(half_segment, self.radius)
    }
}

#[derive(Clone, Debug)]
pub struct CollectibleSet {
    items: Vec<Collectible>,
    removal_delay: Real,
    next_id: u32,
}

impl Default for CollectibleSet {
    fn default() -> Self {
        Self::new(DEFAULT_REMOVAL_DELAY)
    }
}

impl CollectibleSet {
    pub fn new(removal_delay: Real) -> Self {
        Self {
            items: Vec::new(),
            removal_delay,
            next_id: 0,
        }
    }

    pub fn spawn(&mut self, name: impl Into<String>, position: Vector<Real>, radius: Real) -> CollectibleId {
        let id = CollectibleId(self.next_id);
        self.next_id += 1;
        self.items.push(Collectible {
            id,
            name: name.into(),
            position,
            radius,
            collected: false,
        });
        id
    }

    pub fn get(&self, id: CollectibleId) -> Option<&Collectible> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collectible> {
        self.items.iter()
    }

    pub fn remaining(&self) -> usize {
        self.items.iter().filter(|item| !item.collected).count()
    }

    /// Tests every uncollected item against `volume`; returns how many fired.
    pub fn update(&mut self, volume: &CharacterVolume, sink: &mut dyn PickupSink) -> usize {
        let capsule = volume.capsule();
        let capsule_pos = Isometry::translation(volume.center.x, volume.center.y, volume.center.z);
        let mut fired = 0;
        for item in self.items.iter_mut().filter(|item| !item.collected) {
            let ball = Ball::new(item.radius);
            let ball_pos = Isometry::translation(item.position.x, item.position.y, item.position.z);
            let overlapping = match query::intersection_test(&capsule_pos, &capsule, &ball_pos, &ball) {
                Ok(overlapping) => overlapping,
                Err(err) => {
                    warn!("overlap test for {} unsupported: {:?}", item.name, err);
                    false
                }
            };
            if !overlapping {
                continue;
            }
            item.collected = true;
            fired += 1;
            info!("collected {} ({:?})", item.name, item.id);
            sink.acquired(&CollectibleAcquired {
                id: item.id,
                name: item.name.clone(),
                position: item.position,
            });
            sink.schedule_removal(item.id, self.removal_delay);
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume_at(x: Real, y: Real, z: Real) -> CharacterVolume {
        CharacterVolume {
            center: Vector::new(x, y, z),
            half_height: 1.0,
            radius: 0.5,
        }
    }

    #[test]
    fn fires_once_while_overlap_persists() {
        let mut set = CollectibleSet::default();
        let star = set.spawn("star", Vector::new(0.0, 14.0, -15.0), DEFAULT_COLLECTIBLE_RADIUS);
        let mut log = PickupLog::default();

        for _ in 0..5 {
            set.update(&volume_at(0.0, 13.5, -15.0), &mut log);
        }

        assert_eq!(log.acquired.len(), 1);
        assert_eq!(log.acquired[0].id, star);
        assert_eq!(log.removals, vec![(star, DEFAULT_REMOVAL_DELAY)]);
        assert!(set.get(star).is_some_and(Collectible::collected));
        assert_eq!(set.remaining(), 0);
    }

    #[test]
    fn collected_flag_never_reverts() {
        let mut set = CollectibleSet::default();
        let star = set.spawn("star", Vector::zeros(), 0.75);
        let mut log = PickupLog::default();
        set.update(&volume_at(0.0, 0.0, 0.0), &mut log);
        for step in 0..10 {
            set.update(&volume_at(step as Real * 10.0, 0.0, 0.0), &mut log);
            assert!(set.get(star).is_some_and(Collectible::collected));
        }
        assert_eq!(log.acquired.len(), 1);
    }

    #[test]
    fn distant_character_collects_nothing() {
        let mut set = CollectibleSet::default();
        set.spawn("star", Vector::new(0.0, 14.0, -15.0), 0.75);
        let mut log = PickupLog::default();
        let fired = set.update(&volume_at(0.0, 1.0, 0.0), &mut log);
        assert_eq!(fired, 0);
        assert!(log.acquired.is_empty());
        assert_eq!(set.remaining(), 1);
    }

    #[test]
    fn capsule_extent_counts_toward_overlap() {
        let mut set = CollectibleSet::default();
        set.spawn("low", Vector::new(0.0, 2.0, 0.0), 0.3);
        let mut log = PickupLog::default();
        // Capsule top reaches y = 1.9 from a centre of 0.9, ball bottom at 1.7.
        assert_eq!(set.update(&volume_at(0.0, 0.9, 0.0), &mut log), 1);
    }
}
