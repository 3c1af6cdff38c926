//! Two agents in a walled room split by a door.
//!
//! The scout keeps a decaying memory of what it has seen and only steps onto
//! cells it believes are free; the wanderer moves at random. Run with
//! `RUST_LOG=gridworld_core=debug` to see every applied action, and pass a
//! YAML `WorldConfig` path to override the defaults.

use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use gridworld::core::{DeterministicRng, SplitMix64};
use gridworld::prelude::*;
use gridworld::tools::SharedTraceLog;

struct Scout {
    tracker: Option<StateTracker>,
    rng: SplitMix64,
}

impl Scout {
    fn new() -> Self {
        Self {
            tracker: None,
            rng: SplitMix64::new(0),
        }
    }
}

impl AgentPolicy for Scout {
    fn initialize(&mut self, init: &AgentInit) {
        self.tracker = Some(StateTracker::new(init.agent, 20.0));
        self.rng = SplitMix64::new(init.seed);
    }

    fn decide(&mut self, input: DecisionInput) -> Decision {
        let Some(tracker) = self.tracker.as_mut() else {
            return input.idle();
        };
        tracker.update(&input.observation);

        let here = input.observation.own.location;
        if input.feasible.contains(&ActionKind::OpenDoor) {
            let closed = input.observation.nearest_first().into_iter().find(|e| {
                e.kind.is_door() && !e.traversable && here.distance(e.location) <= 1.5
            });
            if let Some(door) = closed {
                let id = door.id;
                return input.act(ActionRequest::new(ActionKind::OpenDoor).target(id));
            }
        }

        let map = tracker.traversability_map();
        let open: Vec<ActionKind> = input
            .feasible
            .iter()
            .copied()
            .filter(|kind| {
                kind.direction().is_some_and(|d| {
                    let (dx, dy) = d.delta();
                    map.is_traversable(here.offset(dx, dy))
                })
            })
            .collect();
        if open.is_empty() {
            return input.idle();
        }
        let pick = open[self.rng.next_index(open.len())];
        input.act(ActionRequest::new(pick))
    }
}

struct Wanderer {
    rng: SplitMix64,
}

impl AgentPolicy for Wanderer {
    fn initialize(&mut self, init: &AgentInit) {
        self.rng = SplitMix64::new(init.seed);
    }

    fn decide(&mut self, input: DecisionInput) -> Decision {
        let moves: Vec<ActionKind> = input
            .feasible
            .iter()
            .copied()
            .filter(|kind| kind.direction().is_some())
            .collect();
        if moves.is_empty() {
            return input.idle();
        }
        let pick = moves[self.rng.next_index(moves.len())];
        input.act(ActionRequest::new(pick))
    }
}

fn build(config: WorldConfig) -> Result<(GridWorld, EntityId)> {
    let width = config.grid.width as i32;
    let height = config.grid.height as i32;
    let mut world = GridWorld::new(config);

    let split = width / 2;
    for y in 0..height {
        if y == height / 2 {
            world.register_object(ObjectSpec::door((split, y), false))?;
        } else {
            world.register_object(ObjectSpec::wall((split, y)))?;
        }
    }

    let scout_senses = SenseCapability::none()
        .with(TypeFilter::Objects, 3.0)
        .with(TypeFilter::Avatars, 5.0);
    let scout = world.register_agent(
        AvatarSpec::new((0, 0)).named("scout").senses(scout_senses),
        Scout::new(),
    )?;
    world.register_agent(
        AvatarSpec::new((width - 1, height - 1))
            .named("wanderer")
            .speed_in_ticks(2),
        Wanderer {
            rng: SplitMix64::new(0),
        },
    )?;

    world.add_goal(LimitedTimeGoal::new(200));
    Ok((world, scout))
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => WorldConfig::load(&path)?,
        None => WorldConfig::new(12, 7).with_tick_duration(0.0),
    };

    let (mut world, scout) = build(config)?;
    let trace = SharedTraceLog::new();
    world.set_trace_sink(trace.clone());

    let ticks = world.run()?;
    let log = trace.snapshot();
    let succeeded = log.successes();
    let doors_opened = log.for_action("OpenDoor").filter(|e| e.succeeded).count();

    tracing::info!(
        ticks,
        actions = log.len(),
        succeeded,
        doors_opened,
        "Patrol finished"
    );

    let scout_at = world.state().location_of(scout);
    let door_open = world
        .state()
        .store()
        .objects()
        .find_map(|e| e.door_open());
    println!(
        "{}",
        serde_json::json!({
            "ticks": ticks,
            "scout": scout_at.map(|l| [l.x, l.y]),
            "door_open": door_open,
            "trace_events": log.len(),
        })
    );
    Ok(())
}
