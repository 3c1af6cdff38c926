//! Umbrella crate that re-exports the `gridworld-*` building blocks.
//!
//! `core` is the simulation kernel, `memory` the per-agent belief cache and
//! `tools` the action trace primitives. Everything is on by default.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use gridworld_core as core;

#[cfg(feature = "memory")]
#[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
pub use gridworld_memory as memory;

#[cfg(feature = "tools")]
#[cfg_attr(docsrs, doc(cfg(feature = "tools")))]
pub use gridworld_tools as tools;

/// The types most simulations touch.
#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub mod prelude {
    pub use gridworld_core::{
        ActionKind, ActionRequest, ActionResult, AgentInit, AgentPolicy, AvatarSpec, Decision,
        DecisionInput, EntityId, GridWorld, LimitedTimeGoal, Location, ObjectSpec, Observation,
        SenseCapability, TypeFilter, WorldConfig, WorldError, WorldState,
    };

    #[cfg(feature = "memory")]
    pub use gridworld_memory::{StateTracker, TraversabilityMap};
}
