use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use gridworld_tools::{TraceEvent, TraceSink};

use crate::{
    rng, ActionFailure, ActionRegistry, ActionRequest, ActionResult, AgentInit, AgentPolicy,
    AvatarSpec, DecisionInput, EntityId, Goal, ObjectSpec, Observation, TimeFocus, UserInput,
    WorldConfig, WorldError, WorldState,
};

/// Per-tick behaviour attached to a static object.
pub trait ObjectHook: 'static {
    fn update(&mut self, object: EntityId, world: &mut WorldState);
}

impl<F> ObjectHook for F
where
    F: FnMut(EntityId, &mut WorldState) + 'static,
{
    fn update(&mut self, object: EntityId, world: &mut WorldState) {
        self(object, world)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Done,
}

/// One buffered request and what became of it.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedAction {
    pub agent: EntityId,
    /// Requested action name; `None` when the policy chose nothing.
    pub action: Option<String>,
    pub result: ActionResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// The tick this report covers.
    pub tick: u64,
    pub done: bool,
    pub results: Vec<AppliedAction>,
    /// Processing time, excluding pacing sleep.
    pub elapsed: Duration,
    pub overrun: bool,
}

impl TickReport {
    fn finished(tick: u64) -> Self {
        Self {
            tick,
            done: true,
            results: Vec::new(),
            elapsed: Duration::ZERO,
            overrun: false,
        }
    }

    pub fn result_for(&self, agent: EntityId) -> Option<&ActionResult> {
        self.results
            .iter()
            .find(|applied| applied.agent == agent)
            .map(|applied| &applied.result)
    }
}

struct AgentSlot {
    id: EntityId,
    policy: Box<dyn AgentPolicy>,
    last_observation: Option<Observation>,
}

/// The tick scheduler. Owns the world state and serves registered avatars in
/// registration order: all decisions of a tick are taken before any action of
/// that tick is applied.
pub struct GridWorld {
    config: WorldConfig,
    state: WorldState,
    registry: ActionRegistry,
    agents: Vec<AgentSlot>,
    hooks: BTreeMap<EntityId, Box<dyn ObjectHook>>,
    goals: Vec<Box<dyn Goal>>,
    pending_input: BTreeMap<EntityId, UserInput>,
    status: RunStatus,
    trace: Option<Box<dyn TraceSink>>,
    clock: Option<(Instant, u64)>,
}

impl GridWorld {
    pub fn new(config: WorldConfig) -> Self {
        Self::with_registry(config, ActionRegistry::builtin())
    }

    pub fn with_registry(config: WorldConfig, registry: ActionRegistry) -> Self {
        Self {
            state: WorldState::new(config.grid),
            config,
            registry,
            agents: Vec::new(),
            hooks: BTreeMap::new(),
            goals: Vec::new(),
            pending_input: BTreeMap::new(),
            status: RunStatus::Running,
            trace: None,
            clock: None,
        }
    }

    pub fn set_trace_sink(&mut self, sink: impl TraceSink + 'static) {
        self.trace = Some(Box::new(sink));
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn tick(&self) -> u64 {
        self.state.tick()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_done(&self) -> bool {
        self.status == RunStatus::Done
    }

    /// Places an avatar and hands `policy` its initialisation record.
    pub fn register_agent(
        &mut self,
        spec: AvatarSpec,
        policy: impl AgentPolicy,
    ) -> Result<EntityId, WorldError> {
        let id = self.state.insert_avatar(spec)?;
        let entity = self.state.get(id).ok_or(WorldError::UnknownEntity(id))?;
        let avatar = entity.avatar().ok_or(WorldError::NotAnAgent(id))?;
        let init = AgentInit {
            agent: id,
            name: entity.name.clone(),
            team: avatar.team.clone(),
            actions: avatar.actions.clone(),
            senses: avatar.senses.clone(),
            properties: entity.property_map(),
            writable: avatar.writable().clone(),
            seed: rng::agent_seed(self.config.seed, id),
        };

        let mut policy: Box<dyn AgentPolicy> = Box::new(policy);
        policy.initialize(&init);
        tracing::info!(agent = %id, name = %init.name, team = %init.team, "Registered agent");
        self.agents.push(AgentSlot {
            id,
            policy,
            last_observation: None,
        });
        Ok(id)
    }

    pub fn register_object(&mut self, spec: ObjectSpec) -> Result<EntityId, WorldError> {
        self.state.insert_object(spec)
    }

    pub fn register_object_with_hook(
        &mut self,
        spec: ObjectSpec,
        hook: impl ObjectHook,
    ) -> Result<EntityId, WorldError> {
        let id = self.state.insert_object(spec)?;
        self.hooks.insert(id, Box::new(hook));
        Ok(id)
    }

    pub fn add_goal(&mut self, goal: impl Goal) {
        self.goals.push(Box::new(goal));
    }

    /// Queues input for `agent`. It reaches the policy on the avatar's next
    /// eligible tick if the avatar is human-controlled; a newer input replaces
    /// an unconsumed one.
    pub fn push_user_input(&mut self, agent: EntityId, input: UserInput) -> Result<(), WorldError> {
        let entity = self
            .state
            .get(agent)
            .ok_or(WorldError::UnknownEntity(agent))?;
        if !entity.is_avatar() {
            return Err(WorldError::NotAnAgent(agent));
        }
        self.pending_input.insert(agent, input);
        Ok(())
    }

    /// Removes an entity (and what it carries) outside the action protocol.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Vec<EntityId>, WorldError> {
        let removed = self.state.remove(id)?;
        self.forget_removed();
        Ok(removed)
    }

    /// The latest observation `agent`'s policy passed back.
    pub fn last_observation(&self, agent: EntityId) -> Option<&Observation> {
        self.agents
            .iter()
            .find(|slot| slot.id == agent)
            .and_then(|slot| slot.last_observation.as_ref())
    }

    /// Runs one tick. Structural errors abort the tick and are returned.
    pub fn step(&mut self) -> Result<TickReport, WorldError> {
        let tick = self.state.tick();
        if self.is_done() {
            return Ok(TickReport::finished(tick));
        }
        let started = Instant::now();
        let clock = *self.clock.get_or_insert((started, tick));

        if self.goals_reached() {
            self.status = RunStatus::Done;
            tracing::info!(tick, "Goals reached, run finished");
            return Ok(TickReport::finished(tick));
        }

        self.state.rebuild_grid();
        let buffer = self.decide_all(tick)?;
        let results = self.apply_all(tick, buffer);
        self.run_hooks();
        self.forget_removed();
        self.state.advance_tick();

        let elapsed = started.elapsed();
        let overrun = self.pace(started, clock);
        tracing::debug!(
            tick,
            actions = results.len(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "Tick complete"
        );
        Ok(TickReport {
            tick,
            done: false,
            results,
            elapsed,
            overrun,
        })
    }

    /// Steps until the goals are reached. Returns the number of ticks run.
    pub fn run(&mut self) -> Result<u64, WorldError> {
        self.run_for(u64::MAX)
    }

    /// Steps until the goals are reached or `max_ticks` ticks have run.
    pub fn run_for(&mut self, max_ticks: u64) -> Result<u64, WorldError> {
        let first = self.state.tick();
        tracing::info!(tick = first, agents = self.agents.len(), "Run started");
        let mut ran = 0;
        while ran < max_ticks && !self.is_done() {
            let report = self.step()?;
            if !report.done {
                ran += 1;
            }
        }
        tracing::info!(ticks = ran, done = self.is_done(), "Run stopped");
        Ok(ran)
    }

    fn goals_reached(&mut self) -> bool {
        if self.goals.is_empty() {
            return false;
        }
        let mut reached = true;
        for goal in &mut self.goals {
            reached &= goal.goal_reached(&self.state);
        }
        reached
    }

    fn decide_all(
        &mut self,
        tick: u64,
    ) -> Result<Vec<(EntityId, Option<ActionRequest>)>, WorldError> {
        let mut buffer = Vec::with_capacity(self.agents.len());
        for slot in &mut self.agents {
            let Some(entity) = self.state.get(slot.id) else {
                continue;
            };
            let Some(avatar) = entity.avatar() else {
                continue;
            };
            let observation = self.state.observe(slot.id)?;

            if avatar.is_busy(tick) {
                slot.last_observation = Some(slot.policy.observe(observation));
                continue;
            }

            let feasible = self.registry.feasible(&self.state, slot.id, &avatar.actions);
            if feasible.is_empty() {
                tracing::warn!(agent = %slot.id, tick, "No feasible actions");
            }
            let user_input = if avatar.human_controlled {
                self.pending_input.remove(&slot.id)
            } else {
                None
            };
            let input = DecisionInput {
                agent: slot.id,
                tick,
                observation,
                properties: entity.property_map(),
                feasible,
                user_input,
            };

            let decision = slot.policy.decide(input);
            slot.last_observation = Some(decision.observation);
            if let Err(err) = self.state.apply_agent_properties(slot.id, &decision.properties) {
                tracing::error!(agent = %err.entity(), tick, error = %err, "Rejected property update");
                return Err(err);
            }
            buffer.push((slot.id, decision.action));
        }
        Ok(buffer)
    }

    fn apply_all(
        &mut self,
        tick: u64,
        buffer: Vec<(EntityId, Option<ActionRequest>)>,
    ) -> Vec<AppliedAction> {
        let mut applied = Vec::with_capacity(buffer.len());
        for (agent, request) in buffer {
            let result = self.apply_one(agent, request.as_ref());
            let action = request.map(|r| r.name);
            tracing::debug!(
                agent = %agent,
                action = action.as_deref().unwrap_or("-"),
                succeeded = result.succeeded,
                message = %result.message,
                "Applied action"
            );

            if let (Some(sink), Some(name)) = (self.trace.as_mut(), action.as_ref()) {
                sink.emit(
                    TraceEvent::new(tick, name.clone(), agent.raw())
                        .with_outcome(result.succeeded),
                );
            }
            if let Some(slot) = self.agents.iter_mut().find(|slot| slot.id == agent) {
                slot.policy.receive_result(&result);
            }
            applied.push(AppliedAction {
                agent,
                action,
                result,
            });
        }
        applied
    }

    fn apply_one(&mut self, agent: EntityId, request: Option<&ActionRequest>) -> ActionResult {
        let Some(entity) = self.state.get(agent) else {
            return ActionFailure::AgentRemoved.into();
        };
        let Some(request) = request else {
            return ActionResult::no_action();
        };
        let kind = match self.registry.resolve(&request.name) {
            Ok(kind) => kind,
            Err(failure) => return failure.into(),
        };
        if !entity.avatar().is_some_and(|a| a.actions.contains(kind)) {
            return ActionFailure::AgentNotCapable.into();
        }
        let Some(action) = self.registry.get(kind) else {
            return ActionFailure::UnknownAction(request.name.clone()).into();
        };

        if let Err(failure) = action.is_possible(&self.state, agent, &request.args) {
            return failure.into();
        }
        let result = action.mutate(&mut self.state, agent, &request.args);
        self.state.set_busy(agent, action.duration_in_ticks());
        result
    }

    fn run_hooks(&mut self) {
        let state = &mut self.state;
        for (object, hook) in self.hooks.iter_mut() {
            if state.contains(*object) {
                hook.update(*object, state);
            }
        }
    }

    fn forget_removed(&mut self) {
        let state = &self.state;
        self.hooks.retain(|id, _| state.contains(*id));
        self.agents.retain(|slot| state.contains(slot.id));
        self.pending_input.retain(|id, _| state.contains(*id));
    }

    /// Sleeps out the rest of the tick. Returns whether the tick overran.
    fn pace(&self, started: Instant, (run_start, first_tick): (Instant, u64)) -> bool {
        let Some(target) = self.config.tick_duration() else {
            return false;
        };
        let deadline = match self.config.time_focus {
            TimeFocus::ConstantTick => started.checked_add(target),
            TimeFocus::GlobalDuration => {
                let ticks = self.state.tick().saturating_sub(first_tick);
                let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
                run_start.checked_add(target.saturating_mul(ticks))
            }
        };
        // Deadlines `Instant` cannot represent are left unpaced.
        let Some(deadline) = deadline else {
            return false;
        };
        let now = Instant::now();
        if now < deadline {
            std::thread::sleep(deadline - now);
            false
        } else {
            tracing::warn!(
                tick = self.state.tick().saturating_sub(1),
                target_ms = target.as_secs_f64() * 1000.0,
                overrun_ms = (now - deadline).as_secs_f64() * 1000.0,
                "Tick overran its target duration"
            );
            true
        }
    }
}

impl core::fmt::Debug for GridWorld {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GridWorld")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("registry", &self.registry)
            .field("agents", &self.agents.iter().map(|s| s.id).collect::<Vec<_>>())
            .field("status", &self.status)
            .finish()
    }
}
