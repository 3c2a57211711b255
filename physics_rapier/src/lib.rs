//! Rapier-backed static collision world used for ray probes.
//!
//! Only the query side of Rapier is used: colliders are static (level
//! geometry) or repositioned explicitly (the player volume). There is no
//! rigid-body stepping.
#![forbid(unsafe_code)]

use rapier3d::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub collider: ColliderHandle,
    pub distance: Real,
    pub point: Point<Real>,
    pub normal: Vector<Real>,
}

pub struct PhysicsWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    query_pipeline: QueryPipeline,
    dirty: bool,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
            dirty: false,
        }
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn query_pipeline(&self) -> &QueryPipeline {
        &self.query_pipeline
    }

    /// True when colliders changed since the last [`PhysicsWorld::refresh`].
    pub fn needs_refresh(&self) -> bool {
        self.dirty
    }

    /// Rebuilds the query acceleration structure. Queries issued before a
    /// refresh do not see inserted or moved colliders.
    pub fn refresh(&mut self) {
        self.query_pipeline.update(&self.colliders);
        self.dirty = false;
    }

    pub fn insert_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.dirty = true;
        self.colliders.insert(collider)
    }

    /// Inserts the character's own capsule as a sensor so probes can be
    /// tested against it and excluded from it.
    pub fn insert_character_volume(
        &mut self,
        half_height: Real,
        radius: Real,
        position: Vector<Real>,
    ) -> ColliderHandle {
        let half_segment = (half_height - radius).max(0.0);
        let collider = ColliderBuilder::capsule_y(half_segment, radius)
            .translation(position)
            .sensor(true)
            .build();
        self.insert_static_collider(collider)
    }

    pub fn set_collider_translation(&mut self, handle: ColliderHandle, position: Vector<Real>) {
        if let Some(collider) = self.colliders.get_mut(handle) {
            collider.set_translation(position);
            self.dirty = true;
        }
    }

    pub fn cast_ray(
        &self,
        origin: Point<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        exclude: Option<ColliderHandle>,
    ) -> Option<RayHit> {
        let mut filter = QueryFilter::default();
        if let Some(handle) = exclude {
            filter = filter.exclude_collider(handle);
        }
        let ray = Ray::new(origin, direction);
        let (collider, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            max_distance,
            true,
            filter,
        )?;
        Some(RayHit {
            collider,
            distance: hit.time_of_impact,
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_floor(world: &mut PhysicsWorld) {
        let floor = ColliderBuilder::cuboid(5.0, 0.1, 5.0)
            .translation(vector![0.0, -0.1, 0.0])
            .build();
        world.insert_static_collider(floor);
    }

    #[test]
    fn ray_reports_floor_point_and_normal() {
        let mut world = PhysicsWorld::new();
        build_floor(&mut world);
        world.refresh();

        let hit = world
            .cast_ray(point![0.0, 1.0, 0.0], vector![0.0, -1.0, 0.0], 1.1, None)
            .expect("floor hit");
        assert!((hit.point.y - 0.0).abs() < 1.0e-4);
        assert!((hit.distance - 1.0).abs() < 1.0e-4);
        assert!(hit.normal.y > 0.99);
    }

    #[test]
    fn ray_respects_max_distance() {
        let mut world = PhysicsWorld::new();
        build_floor(&mut world);
        world.refresh();

        let hit = world.cast_ray(point![0.0, 3.0, 0.0], vector![0.0, -1.0, 0.0], 1.1, None);
        assert!(hit.is_none());
    }

    #[test]
    fn excluded_character_volume_is_ignored() {
        let mut world = PhysicsWorld::new();
        build_floor(&mut world);
        let me = world.insert_character_volume(1.0, 0.5, vector![0.0, 1.0, 0.0]);
        world.refresh();

        let origin = point![0.0, 1.0, 0.0];
        let down = vector![0.0, -1.0, 0.0];
        let unfiltered = world.cast_ray(origin, down, 1.1, None).expect("hit");
        assert_eq!(unfiltered.collider, me);

        let filtered = world.cast_ray(origin, down, 1.1, Some(me)).expect("floor hit");
        assert_ne!(filtered.collider, me);
        assert!((filtered.point.y - 0.0).abs() < 1.0e-4);
    }

    #[test]
    fn moved_colliders_need_refresh() {
        let mut world = PhysicsWorld::new();
        let me = world.insert_character_volume(1.0, 0.5, vector![0.0, 0.0, 0.0]);
        world.refresh();
        assert!(!world.needs_refresh());

        world.set_collider_translation(me, vector![10.0, 0.0, 0.0]);
        assert!(world.needs_refresh());
        world.refresh();
        let hit = world.cast_ray(point![10.0, 5.0, 0.0], vector![0.0, -1.0, 0.0], 10.0, None);
        assert_eq!(hit.map(|hit| hit.collider), Some(me));
    }
}
