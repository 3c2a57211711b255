mod script;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use ecs::{
    hash_entity_state, FixedTimeStep, InputStream, Pickups, Player, SimClock, SimSchedule,
};
use engine_core::logging;
use level_map::LevelMap;
use player_controller::ControllerSettings;

use crate::script::InputScript;

const EXIT_SUCCESS: i32 = 0;
const EXIT_USAGE: i32 = 2;
const EXIT_LEVEL: i32 = 10;
const EXIT_SETTINGS: i32 = 11;
const EXIT_INPUT: i32 = 12;

#[derive(Parser)]
#[command(name = "tools", version, about = "Headless locomotion tools")]
struct Cli {
    /// off, error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted headless simulation and print the final state hash.
    Sim(SimArgs),
    /// Validate a level file and report errors and warnings.
    CheckLevel {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

#[derive(Parser)]
struct SimArgs {
    #[arg(long, default_value_t = 600)]
    ticks: u32,

    /// Fixed step in seconds.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Print player status every N ticks (0 disables).
    #[arg(long, default_value_t = 60)]
    report_every: u32,

    #[arg(long, value_name = "PATH")]
    level: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let Some(level_filter) = logging::parse_level_filter(&cli.log_level) else {
        eprintln!("unknown log level: {}", cli.log_level);
        std::process::exit(EXIT_USAGE);
    };
    logging::init(level_filter);
    let exit_code = match cli.command {
        Commands::Sim(args) => run_sim(args),
        Commands::CheckLevel { path } => check_level(&path),
    };
    std::process::exit(exit_code);
}

fn run_sim(args: SimArgs) -> i32 {
    if !args.dt.is_finite() || args.dt <= 0.0 {
        eprintln!("--dt must be finite and > 0");
        return EXIT_USAGE;
    }
    let level = match load_level(args.level.as_deref()) {
        Ok(level) => level,
        Err(code) => return code,
    };
    let settings = match args.settings.as_deref() {
        Some(path) => match ControllerSettings::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("{}", err);
                return EXIT_SETTINGS;
            }
        },
        None => ControllerSettings::default(),
    };
    let inputs = match args.input.as_deref() {
        Some(path) => match InputScript::load(path).and_then(|script| script.expand()) {
            Ok(inputs) => inputs,
            Err(err) => {
                eprintln!("{}", err);
                return EXIT_INPUT;
            }
        },
        None => Vec::new(),
    };

    let (mut world, player) = match ecs::new_world(&level, &settings) {
        Ok(result) => result,
        Err(ecs::SimSetupError::Level(err)) => {
            eprintln!("{}", err);
            return EXIT_LEVEL;
        }
        Err(ecs::SimSetupError::Settings(err)) => {
            eprintln!("{}", err);
            return EXIT_SETTINGS;
        }
    };
    world.insert_resource(FixedTimeStep { dt_seconds: args.dt });
    world.insert_resource(InputStream::new(inputs));

    println!(
        "sim: level '{}' ({} solids, {} collectibles), {} ticks at dt={}",
        level.name,
        level.solids.len(),
        level.collectibles.len(),
        args.ticks,
        args.dt
    );
    let mut schedule = SimSchedule::new();
    for _ in 0..args.ticks {
        schedule.run_fixed(&mut world);
        let tick = world.resource::<SimClock>().tick;

        {
            let mut pickups = world.resource_mut::<Pickups>();
            for event in pickups.0.acquired.drain(..) {
                println!(
                    "tick {:>6}: collected {} at ({:.2}, {:.2}, {:.2})",
                    tick, event.name, event.position.x, event.position.y, event.position.z
                );
            }
            for (id, delay) in pickups.0.removals.drain(..) {
                println!("tick {:>6}: removal of {:?} scheduled in {}s", tick, id, delay);
            }
        }

        if args.report_every > 0 && tick % u64::from(args.report_every) == 0 {
            if let Some(frame) = world.get::<Player>(player).and_then(|player| player.last_frame) {
                println!(
                    "tick {:>6}: pos=({:.3}, {:.3}, {:.3}) yaw={:.1} pitch={:.1} grounded={} air_time={:.3}",
                    tick,
                    frame.position.x,
                    frame.position.y,
                    frame.position.z,
                    frame.yaw,
                    frame.pitch,
                    frame.grounded,
                    frame.air_time
                );
            }
        }
    }

    let clock = *world.resource::<SimClock>();
    let hash = hash_entity_state(&world, player).unwrap_or_default();
    println!(
        "sim ok (ticks={}, seconds={:.3}, hash={:016x})",
        clock.tick, clock.seconds, hash
    );
    EXIT_SUCCESS
}

fn check_level(path: &Path) -> i32 {
    let level = match load_level(Some(path)) {
        Ok(level) => level,
        Err(code) => return code,
    };
    let validation = level.validate();
    for warning in &validation.warnings {
        println!("warning: {}", warning);
    }
    for error in &validation.errors {
        println!("error: {}", error);
    }
    if validation.is_ok() {
        println!(
            "level '{}' ok ({} solids, {} collectibles)",
            level.name,
            level.solids.len(),
            level.collectibles.len()
        );
        EXIT_SUCCESS
    } else {
        EXIT_LEVEL
    }
}

fn load_level(path: Option<&Path>) -> Result<LevelMap, i32> {
    let loaded = match path {
        Some(path) => LevelMap::load(path),
        None => LevelMap::default_level(),
    };
    loaded.map_err(|err| {
        eprintln!("{}", err);
        EXIT_LEVEL
    })
}
