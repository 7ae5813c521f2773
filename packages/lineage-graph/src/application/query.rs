//! Graph query engine

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::locks::RunLocks;
use crate::domain::{Direction, LineageStore};
use crate::error::Result;

/// Lineage view of one run
///
/// `inputs` and `outputs` are de-duplicated dataset ids, sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageGraph {
    pub run_id: String,
    pub job_name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn LineageStore>,
    locks: Arc<RunLocks>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn LineageStore>, locks: Arc<RunLocks>) -> Self {
        Self { store, locks }
    }

    /// Snapshot of a run's lineage; `None` for a run never ingested
    ///
    /// A run that exists without any edges is returned with empty lists.
    pub async fn lineage(&self, run_id: &str) -> Result<Option<LineageGraph>> {
        let (run, edges) = {
            let _guard = self.locks.lock(run_id).await;
            let Some(run) = self.store.get_job_run(run_id).await? else {
                debug!(run_id, "Lineage requested for unknown run");
                return Ok(None);
            };
            (run, self.store.get_edges(run_id).await?)
        };

        let mut graph = LineageGraph {
            run_id: run.run_id,
            job_name: run.name,
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        // EdgeSet iterates in dataset_id order, so both lists come out sorted
        for (dataset_id, direction) in edges {
            match direction {
                Direction::Input => graph.inputs.push(dataset_id),
                Direction::Output => graph.outputs.push(dataset_id),
            }
        }
        Ok(Some(graph))
    }
}
