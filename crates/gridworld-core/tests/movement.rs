use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use gridworld_core::{
    ActionArgs, ActionFailure, ActionKind, ActionRegistry, ActionRequest, ActionResult,
    AgentInit, AgentPolicy, AvatarSpec, Decision, DecisionInput, DeterministicRng, GridShape,
    GridWorld, Location, ObjectSpec, SplitMix64, WorldConfig, WorldState,
};

struct Scripted {
    plan: VecDeque<Option<ActionRequest>>,
    results: Rc<RefCell<Vec<ActionResult>>>,
}

impl Scripted {
    fn new(plan: impl IntoIterator<Item = ActionKind>) -> (Self, Rc<RefCell<Vec<ActionResult>>>) {
        let results = Rc::new(RefCell::new(Vec::new()));
        let policy = Self {
            plan: plan.into_iter().map(|k| Some(ActionRequest::new(k))).collect(),
            results: Rc::clone(&results),
        };
        (policy, results)
    }
}

impl AgentPolicy for Scripted {
    fn decide(&mut self, input: DecisionInput) -> Decision {
        match self.plan.pop_front().flatten() {
            Some(request) => input.act(request),
            None => input.idle(),
        }
    }

    fn receive_result(&mut self, result: &ActionResult) {
        self.results.borrow_mut().push(result.clone());
    }
}

fn quiet(width: u32, height: u32) -> WorldConfig {
    WorldConfig::new(width, height).with_tick_duration(0.0)
}

#[test]
fn moves_off_the_grid_fail_and_leave_everyone_in_place() {
    let mut state = WorldState::new(GridShape::new(3, 3));
    let agent = state.insert_avatar(AvatarSpec::new((0, 0))).unwrap();
    let registry = ActionRegistry::builtin();

    for kind in [
        ActionKind::MoveNorth,
        ActionKind::MoveNorthEast,
        ActionKind::MoveWest,
        ActionKind::MoveSouthWest,
        ActionKind::MoveNorthWest,
    ] {
        let action = registry.get(kind).unwrap();
        assert_eq!(
            action.is_possible(&state, agent, &ActionArgs::new()),
            Err(ActionFailure::OutOfBounds),
            "{kind}"
        );
    }
    assert_eq!(state.location_of(agent), Some(Location::new(0, 0)));

    let mut world = GridWorld::new(quiet(3, 3));
    let (policy, results) = Scripted::new([ActionKind::MoveWest]);
    let agent = world.register_agent(AvatarSpec::new((0, 2)), policy).unwrap();
    world.step().unwrap();
    assert_eq!(results.borrow()[0], ActionResult::from(ActionFailure::OutOfBounds));
    assert_eq!(world.state().location_of(agent), Some(Location::new(0, 2)));
}

#[test]
fn corridor_walk_stops_at_an_intraversable_object() {
    let config = WorldConfig::new(5, 1).with_tick_duration(0.1);
    let mut world = GridWorld::new(config);
    let (policy, results) = Scripted::new([ActionKind::MoveEast, ActionKind::MoveEast]);
    let agent = world.register_agent(AvatarSpec::new((0, 0)), policy).unwrap();
    world.register_object(ObjectSpec::block((2, 0))).unwrap();

    let first = world.step().unwrap();
    assert!(first.result_for(agent).unwrap().succeeded);
    assert_eq!(world.state().location_of(agent), Some(Location::new(1, 0)));

    let second = world.step().unwrap();
    assert_eq!(
        second.result_for(agent).unwrap().failure,
        Some(ActionFailure::NotPassableObject)
    );
    assert_eq!(world.state().location_of(agent), Some(Location::new(1, 0)));
    assert_eq!(results.borrow().len(), 2);
}

#[test]
fn contested_cell_goes_to_the_earlier_registered_agent() {
    let mut world = GridWorld::new(quiet(3, 1));
    let (a_policy, _) = Scripted::new([ActionKind::MoveEast]);
    let (b_policy, b_results) = Scripted::new([ActionKind::MoveWest]);
    let a = world.register_agent(AvatarSpec::new((0, 0)), a_policy).unwrap();
    let b = world.register_agent(AvatarSpec::new((2, 0)), b_policy).unwrap();

    world.step().unwrap();
    assert_eq!(world.state().location_of(a), Some(Location::new(1, 0)));
    assert_eq!(world.state().location_of(b), Some(Location::new(2, 0)));
    assert_eq!(b_results.borrow()[0].failure, Some(ActionFailure::Occupied));
}

#[test]
fn registration_order_not_position_decides_contests() {
    let mut world = GridWorld::new(quiet(3, 1));
    let (b_policy, _) = Scripted::new([ActionKind::MoveWest]);
    let (a_policy, a_results) = Scripted::new([ActionKind::MoveEast]);
    let b = world.register_agent(AvatarSpec::new((2, 0)), b_policy).unwrap();
    let a = world.register_agent(AvatarSpec::new((0, 0)), a_policy).unwrap();

    world.step().unwrap();
    assert_eq!(world.state().location_of(b), Some(Location::new(1, 0)));
    assert_eq!(world.state().location_of(a), Some(Location::new(0, 0)));
    assert_eq!(a_results.borrow()[0].failure, Some(ActionFailure::Occupied));
}

#[test]
fn traversable_agents_share_cells() {
    let mut world = GridWorld::new(quiet(2, 1));
    let (policy, results) = Scripted::new([ActionKind::MoveEast]);
    let mover = world.register_agent(AvatarSpec::new((0, 0)), policy).unwrap();
    let (idle, _) = Scripted::new([]);
    world
        .register_agent(AvatarSpec::new((1, 0)).traversable(true), idle)
        .unwrap();

    world.step().unwrap();
    assert!(results.borrow()[0].succeeded);
    assert_eq!(world.state().location_of(mover), Some(Location::new(1, 0)));
}

struct RandomWalker {
    rng: SplitMix64,
}

impl AgentPolicy for RandomWalker {
    fn initialize(&mut self, init: &AgentInit) {
        self.rng = SplitMix64::new(init.seed);
    }

    fn decide(&mut self, input: DecisionInput) -> Decision {
        let moves: Vec<_> = input
            .feasible
            .iter()
            .copied()
            .filter(|k| k.direction().is_some())
            .collect();
        if moves.is_empty() {
            return input.idle();
        }
        let pick = moves[self.rng.next_index(moves.len())];
        input.act(ActionRequest::new(pick))
    }
}

#[test]
fn random_walkers_never_stack_intraversable_occupants() {
    let mut world = GridWorld::new(quiet(6, 6).with_seed(7));
    for (x, y) in [(2, 2), (3, 3), (5, 0)] {
        world.register_object(ObjectSpec::wall((x, y))).unwrap();
    }
    let mut agents = Vec::new();
    for i in 0..8 {
        let spec = AvatarSpec::new((i % 6, i / 6 * 4 + 1)).traversable(i % 4 == 0);
        let walker = RandomWalker {
            rng: SplitMix64::new(0),
        };
        agents.push(world.register_agent(spec, walker).unwrap());
    }

    for _ in 0..200 {
        world.step().unwrap();
        assert!(world.state().occupancy_violations().is_empty());
    }
    for agent in agents {
        let at = world.state().location_of(agent).unwrap();
        assert!(world.state().shape().contains(at));
    }
}

#[test]
fn identical_seeds_replay_identically() {
    fn run(seed: u64) -> Vec<Location> {
        let mut world = GridWorld::new(quiet(8, 8).with_seed(seed));
        let mut agents = Vec::new();
        for i in 0..4 {
            let walker = RandomWalker {
                rng: SplitMix64::new(0),
            };
            agents.push(world.register_agent(AvatarSpec::new((i * 2, i)), walker).unwrap());
        }
        world.run_for(50).unwrap();
        agents
            .into_iter()
            .filter_map(|a| world.state().location_of(a))
            .collect()
    }

    assert_eq!(run(11), run(11));
}
