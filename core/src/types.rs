//! Shared primitive types used across the generator.

use serde::{Deserialize, Serialize};

/// Identifier of a user, engineer, request or criterion row.
pub type EntityId = i64;

/// Identifier of a catalog topic (1-based, dense).
pub type TopicId = i64;

/// Rows the generator asked the store to write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Requested(pub usize);

/// Rows the store actually wrote. Never assume this equals `Requested`:
/// conflict-ignore inserts drop rows whose key already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Persisted(pub usize);

impl std::ops::Add for Persisted {
    type Output = Persisted;

    fn add(self, rhs: Persisted) -> Persisted {
        Persisted(self.0 + rhs.0)
    }
}

/// The two request kinds. Structurally identical for scheduling and allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Feature,
    Bug,
}

impl RequestKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Bug => "bug",
        }
    }
}

/// A half-open identifier range `[start, start + len)`.
///
/// Sparse entities (users, engineers) draw identifiers uniformly from the
/// window; dense entities (requests, criteria) count up from `start`.
/// Range teardown deletes exactly the rows inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdWindow {
    pub start: EntityId,
    pub len: i64,
}

impl IdWindow {
    pub const fn new(start: EntityId, len: i64) -> Self {
        Self { start, len }
    }

    /// Last identifier inside the window (inclusive).
    pub fn last(&self) -> EntityId {
        self.start + self.len - 1
    }

    pub fn contains(&self, id: EntityId) -> bool {
        id >= self.start && id <= self.last()
    }

    /// The `n`th dense identifier of the window.
    pub fn nth(&self, n: usize) -> EntityId {
        self.start + n as i64
    }
}
