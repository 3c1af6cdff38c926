//! Tooling primitives for the gridworld simulation kernel.
//!
//! This crate has no dependency on the kernel itself: the scheduler emits plain
//! [`TraceEvent`]s into whatever [`TraceSink`] the caller installs, so replay and
//! inspection tools can consume traces without linking the simulation.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{SharedTraceLog, TraceEvent, TraceLog, TraceSink};
