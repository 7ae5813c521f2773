//! Domain layer for the lineage graph
//!
//! # Domain Models
//!
//! - `JobRun`: one execution of a pipeline task, keyed by the producer's run id
//! - `Dataset`: a named artifact read or written by runs
//! - Edges: `(run_id, dataset_id, direction)` triples, unique per triple
//!
//! # Port Trait
//!
//! - `LineageStore`: the only owner of nodes and edges
//!
//! Nodes are created lazily on first reference and never deleted. Edges are
//! created on first reference of their triple and are immutable afterwards.

pub mod event;
pub mod identity;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LineageError, Result};

pub use event::{DatasetRef, LineageEvent};
pub use identity::{DatasetEntry, NormalizedEvent};

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// One execution of a job
///
/// `name` and `created_at` are fixed by the first event that mentions the
/// run; later events for the same `run_id` never overwrite them.
///
/// # Examples
///
/// ```rust
/// use lineage_graph::domain::JobRun;
///
/// let run = JobRun::new("r1", "daily_orders", chrono::Utc::now());
/// assert_eq!(run.run_id, "r1");
/// assert_eq!(run.name, "daily_orders");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRun {
    /// Producer-supplied run identifier
    pub run_id: String,
    /// Logical job name
    pub name: String,
    /// First observation timestamp
    pub created_at: DateTime<Utc>,
}

impl JobRun {
    pub fn new(run_id: impl Into<String>, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            name: name.into(),
            created_at,
        }
    }
}

/// Named data artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Canonical key (see `identity::dataset_key`)
    pub dataset_id: String,
    /// Display name
    pub name: String,
}

impl Dataset {
    pub fn new(dataset_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            name: name.into(),
        }
    }
}

/// Edge direction, relative to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Run consumed the dataset
    Input,
    /// Run produced the dataset
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "INPUT",
            Direction::Output => "OUTPUT",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "INPUT" => Ok(Direction::Input),
            "OUTPUT" => Ok(Direction::Output),
            _ => Err(LineageError::serialization(format!(
                "Invalid edge direction: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relationship between a run and a dataset
///
/// Unique per `(run_id, dataset_id, direction)`; the same dataset may be
/// linked to one run in both directions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub run_id: String,
    pub dataset_id: String,
    pub direction: Direction,
}

impl Edge {
    pub fn new(run_id: impl Into<String>, dataset_id: impl Into<String>, direction: Direction) -> Self {
        Self {
            run_id: run_id.into(),
            dataset_id: dataset_id.into(),
            direction,
        }
    }
}

/// Edges of a single run as `(dataset_id, direction)` pairs
pub type EdgeSet = BTreeSet<(String, Direction)>;

/// Node and edge counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub job_runs: usize,
    pub datasets: usize,
    pub edges: usize,
}

/// What applying one event changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Edges that did not exist before this event
    pub edges_added: usize,
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait: LineageStore
// ═══════════════════════════════════════════════════════════════════════════

/// Lineage graph storage abstraction
///
/// Every operation is atomic with respect to concurrent callers on the same
/// key, and every mutation is visible to the next read from any caller.
///
/// # Implementations
///
/// - `InMemoryLineageStore`: sharded concurrent maps
/// - `SqliteLineageStore`: file or in-memory SQLite database
#[async_trait]
pub trait LineageStore: Send + Sync {
    /// Insert the run if absent, otherwise return the stored run untouched
    ///
    /// When several callers race on the same `run_id`, exactly one creates
    /// it; the others get that row back, including its `created_at`.
    async fn upsert_job_run(
        &self,
        run_id: &str,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<JobRun>;

    /// Insert the dataset if absent, otherwise return the stored one
    async fn upsert_dataset(&self, dataset_id: &str, name: &str) -> Result<Dataset>;

    /// Record an edge; returns `false` if it already existed
    ///
    /// # Errors
    ///
    /// `MissingNode` if either endpoint has not been upserted.
    async fn add_edge(&self, run_id: &str, dataset_id: &str, direction: Direction)
        -> Result<bool>;

    async fn get_job_run(&self, run_id: &str) -> Result<Option<JobRun>>;

    async fn get_dataset(&self, dataset_id: &str) -> Result<Option<Dataset>>;

    /// All edges of a run (empty for unknown runs)
    async fn get_edges(&self, run_id: &str) -> Result<EdgeSet>;

    async fn stats(&self) -> Result<StoreStats>;

    /// Apply one normalized event: the run first, then each dataset
    /// followed by its edge, inputs before outputs
    ///
    /// Every step is idempotent, so re-applying after a partial failure is
    /// safe. Stores with transactions override this to commit the whole
    /// event at once.
    async fn apply(&self, event: &NormalizedEvent, created_at: DateTime<Utc>) -> Result<ApplyOutcome> {
        self.upsert_job_run(&event.run_id, &event.job_name, created_at)
            .await?;

        let mut outcome = ApplyOutcome::default();
        for (entry, edge) in event.linked_datasets() {
            self.upsert_dataset(&entry.dataset_id, &entry.name).await?;
            if self
                .add_edge(&edge.run_id, &edge.dataset_id, edge.direction)
                .await?
            {
                outcome.edges_added += 1;
            }
        }
        Ok(outcome)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_run_serde() {
        let run = JobRun::new("r1", "j1", Utc::now());

        let json = serde_json::to_string(&run).unwrap();
        assert!(json.contains("\"run_id\":\"r1\""));

        let deserialized: JobRun = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, run);
    }

    #[test]
    fn test_direction_wire_format() {
        assert_eq!(serde_json::to_string(&Direction::Input).unwrap(), "\"INPUT\"");
        assert_eq!(serde_json::to_string(&Direction::Output).unwrap(), "\"OUTPUT\"");
        assert_eq!(Direction::from_str("OUTPUT").unwrap(), Direction::Output);
        assert!(Direction::from_str("output").is_err());
    }

    #[test]
    fn test_edge_serde() {
        let edge = Edge::new("r1", "orders", Direction::Output);
        assert_eq!(
            serde_json::to_value(&edge).unwrap(),
            serde_json::json!({"run_id": "r1", "dataset_id": "orders", "direction": "OUTPUT"})
        );
    }

    #[test]
    fn test_edge_set_is_unique_per_triple() {
        let mut edges = EdgeSet::new();
        assert!(edges.insert(("orders".to_string(), Direction::Output)));
        assert!(!edges.insert(("orders".to_string(), Direction::Output)));
        // Same dataset in the other direction is a distinct edge
        assert!(edges.insert(("orders".to_string(), Direction::Input)));
        assert_eq!(edges.len(), 2);
    }
}
