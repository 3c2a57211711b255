//! Headless simulation harness: one fixed schedule driving the player
//! controller and the collectible trigger against a level's probe world.
#![forbid(unsafe_code)]

use std::fmt;
use std::hash::{Hash, Hasher};

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::{Schedule, ScheduleLabel};
use collectibles::{CollectibleSet, PickupLog};
use level_map::{LevelMap, LevelMapError};
use log::debug;
use physics_rapier::PhysicsWorld;
use player_controller::{
    ControllerSettings, EdgeInput, PlayerController, PlayerFrame, RawInput, SettingsError,
};
use rapier3d::prelude::Real;

#[derive(Component, Debug)]
pub struct Player {
    pub controller: PlayerController,
    pub last_frame: Option<PlayerFrame>,
}

#[derive(Resource)]
pub struct Physics(pub PhysicsWorld);

#[derive(Resource, Debug)]
pub struct Collectibles(pub CollectibleSet);

/// Pickup notifications and removal requests emitted since the last drain.
#[derive(Resource, Debug, Default)]
pub struct Pickups(pub PickupLog);

#[derive(Resource, Copy, Clone, Debug)]
pub struct FixedTimeStep {
    pub dt_seconds: Real,
}

impl Default for FixedTimeStep {
    fn default() -> Self {
        Self {
            dt_seconds: 1.0 / 60.0,
        }
    }
}

#[derive(Resource, Copy, Clone, Debug, Default)]
pub struct SimClock {
    pub tick: u64,
    pub seconds: f64,
}

/// Scripted raw input; once exhausted every frame is idle.
#[derive(Resource, Debug, Default)]
pub struct InputStream {
    frames: Vec<RawInput>,
    cursor: usize,
}

impl InputStream {
    pub fn new(frames: Vec<RawInput>) -> Self {
        Self { frames, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len().saturating_sub(self.cursor)
    }

    fn next(&mut self) -> RawInput {
        let frame = self.frames.get(self.cursor).copied().unwrap_or_default();
        if self.cursor < self.frames.len() {
            self.cursor += 1;
        }
        frame
    }
}

#[derive(Resource, Debug, Default)]
pub struct PlayerInput(pub EdgeInput);

#[derive(ScheduleLabel, Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct FixedUpdate;

pub struct SimSchedule {
    fixed: Schedule,
}

impl SimSchedule {
    pub fn new() -> Self {
        let mut fixed = Schedule::new(FixedUpdate);
        fixed.add_systems((feed_input, step_players, collect_pickups, advance_clock).chain());
        Self { fixed }
    }

    pub fn run_fixed(&mut self, world: &mut World) {
        self.fixed.run(world);
    }
}

impl Default for SimSchedule {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum SimSetupError {
    Level(LevelMapError),
    Settings(SettingsError),
}

impl fmt::Display for SimSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimSetupError::Level(err) => write!(f, "{}", err),
            SimSetupError::Settings(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SimSetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimSetupError::Level(err) => Some(err),
            SimSetupError::Settings(err) => Some(err),
        }
    }
}

impl From<LevelMapError> for SimSetupError {
    fn from(err: LevelMapError) -> Self {
        SimSetupError::Level(err)
    }
}

impl From<SettingsError> for SimSetupError {
    fn from(err: SettingsError) -> Self {
        SimSetupError::Settings(err)
    }
}

/// Builds a world for `level` with the player at its spawn point.
/// Returns the world and the player entity.
pub fn new_world(
    level: &LevelMap,
    settings: &ControllerSettings,
) -> Result<(World, Entity), SimSetupError> {
    let mut physics = level.build_physics()?;
    let collectibles = level.build_collectibles()?;
    let spawn = level.spawn();
    let mut controller = settings.build_controller(spawn)?;
    let profile = controller.collision().profile();
    let body = physics.insert_character_volume(profile.half_height, profile.radius, spawn);
    physics.refresh();
    controller.set_body(Some(body));

    let mut world = World::new();
    world.insert_resource(FixedTimeStep::default());
    world.insert_resource(SimClock::default());
    world.insert_resource(InputStream::default());
    world.insert_resource(PlayerInput::default());
    world.insert_resource(Physics(physics));
    world.insert_resource(Collectibles(collectibles));
    world.insert_resource(Pickups::default());
    let player = world
        .spawn(Player {
            controller,
            last_frame: None,
        })
        .id();
    debug!("spawned player {:?} in level '{}'", player, level.name);
    Ok((world, player))
}

fn feed_input(mut stream: ResMut<InputStream>, mut input: ResMut<PlayerInput>) {
    let frame = stream.next();
    input.0.begin_frame(frame);
}

fn step_players(
    mut players: Query<&mut Player>,
    mut physics: ResMut<Physics>,
    mut input: ResMut<PlayerInput>,
    time: Res<FixedTimeStep>,
) {
    let physics = &mut physics.0;
    for mut player in &mut players {
        let player = &mut *player;
        let frame = player.controller.tick(&*physics, &mut input.0, time.dt_seconds);
        if let Some(body) = player.controller.collision().body() {
            physics.set_collider_translation(body, frame.position);
        }
        player.last_frame = Some(frame);
    }
    if physics.needs_refresh() {
        physics.refresh();
    }
}

fn collect_pickups(
    players: Query<&Player>,
    mut collectibles: ResMut<Collectibles>,
    mut pickups: ResMut<Pickups>,
) {
    for player in &players {
        let volume = player.controller.volume();
        collectibles.0.update(&volume, &mut pickups.0);
    }
}

fn advance_clock(mut clock: ResMut<SimClock>, time: Res<FixedTimeStep>) {
    clock.tick += 1;
    clock.seconds += f64::from(time.dt_seconds);
}

pub fn hash_entity_state(world: &World, entity: Entity) -> Option<u64> {
    let player = world.get::<Player>(entity)?;
    let controller = &player.controller;
    let state = controller.motor().state();
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for component in controller.position().iter() {
        component.to_bits().hash(&mut hasher);
    }
    controller.camera().yaw().to_bits().hash(&mut hasher);
    controller.camera().pitch().to_bits().hash(&mut hasher);
    state.air_time.to_bits().hash(&mut hasher);
    state.grounded().hash(&mut hasher);
    Some(hasher.finish())
}
