use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};

use crate::{
    ActionResult, AgentInit, AgentPolicy, Decision, DecisionInput, EntityId, Observation,
};

/// Scheduler to policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolicyRequest {
    Initialize(AgentInit),
    Observe(Observation),
    Decide(DecisionInput),
    Result(ActionResult),
}

/// Policy to scheduler. Only `Observe` and `Decide` are answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolicyReply {
    Observed(Observation),
    Decided(Decision),
}

/// Creates a connected pair: the [`ChannelPolicy`] is registered with the
/// world, the [`PolicyEndpoint`] serves the real policy elsewhere (typically
/// another thread).
pub fn channel_policy() -> (ChannelPolicy, PolicyEndpoint) {
    let (request_tx, request_rx) = mpsc::channel();
    let (reply_tx, reply_rx) = mpsc::channel();
    (
        ChannelPolicy {
            agent: None,
            requests: request_tx,
            replies: reply_rx,
        },
        PolicyEndpoint {
            requests: request_rx,
            replies: reply_tx,
        },
    )
}

/// Forwards every handshake over a channel and blocks on the answer.
///
/// A disconnected endpoint is not fatal: the avatar idles and a warning is
/// logged.
#[derive(Debug)]
pub struct ChannelPolicy {
    agent: Option<EntityId>,
    requests: Sender<PolicyRequest>,
    replies: Receiver<PolicyReply>,
}

impl ChannelPolicy {
    fn round_trip(&self, request: PolicyRequest) -> Option<PolicyReply> {
        if self.requests.send(request).is_err() {
            tracing::warn!(agent = ?self.agent, "Policy endpoint disconnected");
            return None;
        }
        match self.replies.recv() {
            Ok(reply) => Some(reply),
            Err(_) => {
                tracing::warn!(agent = ?self.agent, "Policy endpoint hung up before replying");
                None
            }
        }
    }
}

impl AgentPolicy for ChannelPolicy {
    fn initialize(&mut self, init: &AgentInit) {
        self.agent = Some(init.agent);
        if self.requests.send(PolicyRequest::Initialize(init.clone())).is_err() {
            tracing::warn!(agent = %init.agent, "Policy endpoint disconnected");
        }
    }

    fn observe(&mut self, observation: Observation) -> Observation {
        match self.round_trip(PolicyRequest::Observe(observation.clone())) {
            Some(PolicyReply::Observed(filtered)) => filtered,
            Some(other) => {
                tracing::warn!(agent = ?self.agent, reply = ?other, "Unexpected reply to observe");
                observation
            }
            None => observation,
        }
    }

    fn decide(&mut self, input: DecisionInput) -> Decision {
        match self.round_trip(PolicyRequest::Decide(input.clone())) {
            Some(PolicyReply::Decided(decision)) => decision,
            Some(other) => {
                tracing::warn!(agent = ?self.agent, reply = ?other, "Unexpected reply to decide");
                input.idle()
            }
            None => input.idle(),
        }
    }

    fn receive_result(&mut self, result: &ActionResult) {
        if self.requests.send(PolicyRequest::Result(result.clone())).is_err() {
            tracing::warn!(agent = ?self.agent, "Policy endpoint disconnected");
        }
    }
}

/// The policy-side half of a [`channel_policy`] pair.
#[derive(Debug)]
pub struct PolicyEndpoint {
    requests: Receiver<PolicyRequest>,
    replies: Sender<PolicyReply>,
}

impl PolicyEndpoint {
    /// Answers one request. Returns `false` once the world side is gone.
    pub fn serve_one(&self, policy: &mut dyn AgentPolicy) -> bool {
        let Ok(request) = self.requests.recv() else {
            return false;
        };
        let reply = match request {
            PolicyRequest::Initialize(init) => {
                policy.initialize(&init);
                None
            }
            PolicyRequest::Observe(observation) => {
                Some(PolicyReply::Observed(policy.observe(observation)))
            }
            PolicyRequest::Decide(input) => Some(PolicyReply::Decided(policy.decide(input))),
            PolicyRequest::Result(result) => {
                policy.receive_result(&result);
                None
            }
        };
        match reply {
            Some(reply) => self.replies.send(reply).is_ok(),
            None => true,
        }
    }

    /// Serves requests until the world side drops its [`ChannelPolicy`].
    pub fn serve(self, mut policy: impl AgentPolicy) {
        while self.serve_one(&mut policy) {}
    }
}
