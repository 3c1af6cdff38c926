//! The contract between the scheduler and externally supplied decision logic.
//!
//! Per tick an avatar's policy sees at most two calls: `observe` while the
//! avatar is busy, otherwise `decide` followed by `receive_result` once the
//! buffered request was applied.

mod channel;
mod keymap;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    ActionArgs, ActionKind, ActionResult, ActionSet, EntityId, Observation, PropertyMap,
    SenseCapability,
};

pub use channel::{channel_policy, ChannelPolicy, PolicyEndpoint, PolicyReply, PolicyRequest};
pub use keymap::KeymapPolicy;

/// External input for a human-controlled avatar, e.g. a pressed key.
pub type UserInput = serde_json::Value;

/// Handed to a policy once, when its avatar is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInit {
    pub agent: EntityId,
    pub name: String,
    pub team: String,
    pub actions: ActionSet,
    pub senses: SenseCapability,
    pub properties: PropertyMap,
    pub writable: BTreeSet<String>,
    /// Deterministic per-agent seed derived from the world seed.
    pub seed: u64,
}

/// Everything a policy gets to choose an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub agent: EntityId,
    pub tick: u64,
    pub observation: Observation,
    pub properties: PropertyMap,
    pub feasible: Vec<ActionKind>,
    #[serde(default)]
    pub user_input: Option<UserInput>,
}

impl DecisionInput {
    /// Hands observation and properties back unchanged, requesting nothing.
    pub fn idle(self) -> Decision {
        Decision {
            observation: self.observation,
            properties: self.properties,
            action: None,
        }
    }

    pub fn act(self, request: ActionRequest) -> Decision {
        Decision {
            observation: self.observation,
            properties: self.properties,
            action: Some(request),
        }
    }
}

/// An action by name plus its keyword arguments. Names that match no
/// registered action come back as an `UnknownAction` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub name: String,
    #[serde(default)]
    pub args: ActionArgs,
}

impl ActionRequest {
    pub fn new(kind: ActionKind) -> Self {
        Self::named(kind.name())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: ActionArgs::default(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.args = self.args.with(key, value);
        self
    }

    pub fn target(self, object: EntityId) -> Self {
        self.arg(ActionArgs::OBJECT_ID, object.raw())
    }
}

impl From<ActionKind> for ActionRequest {
    fn from(kind: ActionKind) -> Self {
        Self::new(kind)
    }
}

/// What a policy returns from `decide`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub observation: Observation,
    pub properties: PropertyMap,
    pub action: Option<ActionRequest>,
}

pub trait AgentPolicy: 'static {
    fn initialize(&mut self, _init: &AgentInit) {}

    /// Filters the observation for display mirroring on ticks where the
    /// avatar is busy. `decide` hands back its own filtered copy otherwise.
    fn observe(&mut self, observation: Observation) -> Observation {
        observation
    }

    fn decide(&mut self, input: DecisionInput) -> Decision;

    fn receive_result(&mut self, _result: &ActionResult) {}
}

impl<P: AgentPolicy + ?Sized> AgentPolicy for Box<P> {
    fn initialize(&mut self, init: &AgentInit) {
        (**self).initialize(init)
    }

    fn observe(&mut self, observation: Observation) -> Observation {
        (**self).observe(observation)
    }

    fn decide(&mut self, input: DecisionInput) -> Decision {
        (**self).decide(input)
    }

    fn receive_result(&mut self, result: &ActionResult) {
        (**self).receive_result(result)
    }
}

/// Never requests an action.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdlePolicy;

impl AgentPolicy for IdlePolicy {
    fn decide(&mut self, input: DecisionInput) -> Decision {
        input.idle()
    }
}
