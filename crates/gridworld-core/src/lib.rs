//! Deterministic, discrete-tick multi-agent grid simulation kernel.
//!
//! One [`GridWorld`] owns every entity, the sparse occupancy grid and the
//! action registry. Each call to [`GridWorld::step`] runs one round:
//! observe and decide for every eligible avatar (in registration order), then
//! apply all buffered actions (same order), then run per-object hooks.
//! Decision logic lives outside the kernel behind the [`AgentPolicy`] trait.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod config;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod goal;
pub mod grid;
pub mod ids;
pub mod observation;
pub mod policy;
pub mod properties;
pub mod rng;
pub mod sense;
pub mod state;
pub mod store;
pub mod world;

pub use action::{
    Action, ActionArgs, ActionFailure, ActionKind, ActionRegistry, ActionResult, CloseDoor,
    Direction, DropObject, GrabObject, Move, OpenDoor, RemoveObject,
};
pub use config::{TimeFocus, WorldConfig};
pub use entity::{
    ActionSet, Avatar, AvatarSnapshot, AvatarSpec, Entity, EntityKind, EntitySnapshot, LastAction,
    ObjectKind, ObjectSpec,
};
pub use error::WorldError;
pub use geometry::{GridShape, Location};
pub use goal::{Goal, LimitedTimeGoal};
pub use grid::GridIndex;
pub use ids::{EntityId, IdGenerator};
pub use observation::Observation;
pub use policy::{
    channel_policy, ActionRequest, AgentInit, AgentPolicy, ChannelPolicy, Decision, DecisionInput,
    IdlePolicy, KeymapPolicy, PolicyEndpoint, PolicyReply, PolicyRequest, UserInput,
};
pub use properties::PropertyMap;
pub use rng::{DeterministicRng, SplitMix64};
pub use sense::{SenseCapability, SenseRange, TypeFilter};
pub use state::WorldState;
pub use store::EntityStore;
pub use world::{AppliedAction, GridWorld, ObjectHook, RunStatus, TickReport};
