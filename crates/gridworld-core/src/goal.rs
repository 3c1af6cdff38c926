use crate::WorldState;

/// A run-level completion check. The run is done once every registered goal
/// reports true on the same tick; with no goals it never is.
pub trait Goal: 'static {
    fn goal_reached(&mut self, world: &WorldState) -> bool;
}

impl<F> Goal for F
where
    F: FnMut(&WorldState) -> bool + 'static,
{
    fn goal_reached(&mut self, world: &WorldState) -> bool {
        self(world)
    }
}

/// Reached once `max_ticks` ticks have run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitedTimeGoal {
    pub max_ticks: u64,
}

impl LimitedTimeGoal {
    pub fn new(max_ticks: u64) -> Self {
        Self { max_ticks }
    }
}

impl Goal for LimitedTimeGoal {
    fn goal_reached(&mut self, world: &WorldState) -> bool {
        world.tick() >= self.max_ticks
    }
}
