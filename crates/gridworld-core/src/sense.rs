use serde::{Deserialize, Serialize};

use crate::{EntityKind, ObjectKind};

/// Which entities a sensing entry applies to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFilter {
    /// Wildcard: every entity.
    All,
    Avatars,
    Objects,
    Kind(ObjectKind),
}

impl TypeFilter {
    pub fn matches(&self, kind: &EntityKind) -> bool {
        match (self, kind) {
            (TypeFilter::All, _) => true,
            (TypeFilter::Avatars, EntityKind::Avatar) => true,
            (TypeFilter::Objects, EntityKind::Object(_)) => true,
            (TypeFilter::Kind(want), EntityKind::Object(have)) => want == have,
            _ => false,
        }
    }
}

/// Perception radius. There is no "disabled" value: a kind that cannot be
/// perceived simply has no matching [`SenseCapability`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenseRange {
    Limited(f64),
    Unlimited,
}

impl SenseRange {
    /// Non-positive or non-finite radii mean unlimited range.
    pub fn from_radius(radius: f64) -> Self {
        if radius.is_finite() && radius > 0.0 {
            SenseRange::Limited(radius)
        } else {
            SenseRange::Unlimited
        }
    }

    pub fn radius(self) -> Option<f64> {
        match self {
            SenseRange::Limited(r) => Some(r),
            SenseRange::Unlimited => None,
        }
    }

    pub fn contains(self, distance: f64) -> bool {
        match self {
            SenseRange::Limited(r) => distance <= r,
            SenseRange::Unlimited => true,
        }
    }

    pub fn widest(self, other: SenseRange) -> SenseRange {
        match (self, other) {
            (SenseRange::Limited(a), SenseRange::Limited(b)) => SenseRange::Limited(a.max(b)),
            _ => SenseRange::Unlimited,
        }
    }
}

impl From<f64> for SenseRange {
    fn from(radius: f64) -> Self {
        SenseRange::from_radius(radius)
    }
}

/// Per-avatar perception: an ordered list of `(filter, range)` entries.
///
/// An observation is the union of [`WorldState::objects_in_range`] over every
/// entry, so the effective range for one entity kind is the widest range among
/// the entries that match it.
///
/// [`WorldState::objects_in_range`]: crate::WorldState::objects_in_range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenseCapability {
    entries: Vec<(TypeFilter, SenseRange)>,
}

impl SenseCapability {
    /// Perceives nothing.
    pub fn none() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Perceives every entity at any distance.
    pub fn omniscient() -> Self {
        Self::none().with(TypeFilter::All, SenseRange::Unlimited)
    }

    /// Adds an entry, replacing an earlier one with the same filter.
    pub fn with(mut self, filter: TypeFilter, range: impl Into<SenseRange>) -> Self {
        self.insert(filter, range.into());
        self
    }

    pub fn insert(&mut self, filter: TypeFilter, range: SenseRange) {
        match self.entries.iter_mut().find(|(f, _)| *f == filter) {
            Some(entry) => entry.1 = range,
            None => self.entries.push((filter, range)),
        }
    }

    pub fn entries(&self) -> &[(TypeFilter, SenseRange)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Effective range for `kind`, or `None` if no entry matches it.
    pub fn range_for(&self, kind: &EntityKind) -> Option<SenseRange> {
        self.entries
            .iter()
            .filter(|(filter, _)| filter.matches(kind))
            .map(|(_, range)| *range)
            .reduce(SenseRange::widest)
    }
}

impl Default for SenseCapability {
    fn default() -> Self {
        Self::omniscient()
    }
}
