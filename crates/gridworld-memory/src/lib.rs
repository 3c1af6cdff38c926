//! Agent-side memory for gridworld decision policies.
//!
//! A [`StateTracker`] consumes an avatar's observations tick by tick and keeps
//! what it has seen, fading each memory linearly until it is forgotten. The
//! derived [`TraversabilityMap`] is what a path planner reads.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

mod map;
mod tracker;

pub use map::TraversabilityMap;
pub use tracker::{decay_rate, Remembered, StateTracker, TrackerUpdate, FORGET_EPSILON};
