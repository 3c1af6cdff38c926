#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::{Arc, Mutex};

/// One applied action: which agent ran what at which tick, and whether it
/// succeeded. Idle decisions are not traced.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    /// Registry name of the action, e.g. `MoveEast`.
    pub action: Cow<'static, str>,
    /// Raw id of the acting agent.
    pub actor: u64,
    pub succeeded: bool,
}

impl TraceEvent {
    /// A failed attempt until [`with_outcome`](Self::with_outcome) says
    /// otherwise.
    pub fn new(tick: u64, action: impl Into<Cow<'static, str>>, actor: u64) -> Self {
        Self {
            tick,
            action: action.into(),
            actor,
            succeeded: false,
        }
    }

    pub fn with_outcome(mut self, succeeded: bool) -> Self {
        self.succeeded = succeeded;
        self
    }
}

/// Where the scheduler sends a [`TraceEvent`] after each applied action, in
/// application order.
pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

/// In-memory action trace.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    /// Actions applied at `tick`, in application order.
    pub fn at_tick(&self, tick: u64) -> impl Iterator<Item = &TraceEvent> {
        self.events.iter().filter(move |e| e.tick == tick)
    }

    pub fn for_action<'a>(&'a self, action: &'a str) -> impl Iterator<Item = &'a TraceEvent> {
        self.events.iter().filter(move |e| e.action == action)
    }

    pub fn by_actor(&self, actor: u64) -> impl Iterator<Item = &TraceEvent> {
        self.events.iter().filter(move |e| e.actor == actor)
    }

    pub fn successes(&self) -> usize {
        self.events.iter().filter(|e| e.succeeded).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl TraceSink for TraceLog {
    fn emit(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

/// A cloneable handle to a [`TraceLog`].
///
/// Hand one clone to the scheduler as its sink and keep another to read the
/// recorded events back.
#[derive(Debug, Default, Clone)]
pub struct SharedTraceLog {
    inner: Arc<Mutex<TraceLog>>,
}

impl SharedTraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> TraceLog {
        match self.inner.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(log) => log.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TraceSink for SharedTraceLog {
    fn emit(&mut self, event: TraceEvent) {
        match self.inner.lock() {
            Ok(mut log) => log.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
