//! In-memory LineageStore
//!
//! Runs and datasets live in `DashMap`s; every upsert goes through the
//! map's entry API, which holds the shard lock for that key, so concurrent
//! upserts of one key create exactly one node. Edges are stored on the run
//! node as a set, which makes the `(run, dataset, direction)` uniqueness a
//! property of the data structure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::domain::{Dataset, Direction, EdgeSet, JobRun, LineageStore, StoreStats};
use crate::error::{LineageError, Result};

#[derive(Debug, Clone)]
struct RunNode {
    run: JobRun,
    edges: EdgeSet,
}

/// DashMap-based LineageStore implementation
#[derive(Debug, Clone, Default)]
pub struct InMemoryLineageStore {
    runs: Arc<DashMap<String, RunNode>>,
    datasets: Arc<DashMap<String, Dataset>>,
}

impl InMemoryLineageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the shard count (must be a power of two)
    pub fn with_shard_amount(shards: usize) -> Self {
        Self {
            runs: Arc::new(DashMap::with_shard_amount(shards)),
            datasets: Arc::new(DashMap::with_shard_amount(shards)),
        }
    }
}

#[async_trait]
impl LineageStore for InMemoryLineageStore {
    async fn upsert_job_run(
        &self,
        run_id: &str,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<JobRun> {
        let node = self
            .runs
            .entry(run_id.to_string())
            .or_insert_with(|| RunNode {
                run: JobRun::new(run_id, name, created_at),
                edges: EdgeSet::new(),
            });
        Ok(node.run.clone())
    }

    async fn upsert_dataset(&self, dataset_id: &str, name: &str) -> Result<Dataset> {
        let dataset = self
            .datasets
            .entry(dataset_id.to_string())
            .or_insert_with(|| Dataset::new(dataset_id, name));
        Ok(dataset.value().clone())
    }

    async fn add_edge(
        &self,
        run_id: &str,
        dataset_id: &str,
        direction: Direction,
    ) -> Result<bool> {
        if !self.datasets.contains_key(dataset_id) {
            return Err(LineageError::missing_node(format!("dataset '{}'", dataset_id)));
        }
        let mut node = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| LineageError::missing_node(format!("run '{}'", run_id)))?;
        Ok(node.edges.insert((dataset_id.to_string(), direction)))
    }

    async fn get_job_run(&self, run_id: &str) -> Result<Option<JobRun>> {
        Ok(self.runs.get(run_id).map(|node| node.run.clone()))
    }

    async fn get_dataset(&self, dataset_id: &str) -> Result<Option<Dataset>> {
        Ok(self.datasets.get(dataset_id).map(|d| d.value().clone()))
    }

    async fn get_edges(&self, run_id: &str) -> Result<EdgeSet> {
        Ok(self
            .runs
            .get(run_id)
            .map(|node| node.edges.clone())
            .unwrap_or_default())
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            job_runs: self.runs.len(),
            datasets: self.datasets.len(),
            edges: self.runs.iter().map(|node| node.edges.len()).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_upsert_job_run_keeps_first_observation() {
        let store = InMemoryLineageStore::new();
        let first = Utc::now();

        let created = store.upsert_job_run("r1", "j1", first).await.unwrap();
        let again = store
            .upsert_job_run("r1", "renamed", first + chrono::Duration::seconds(5))
            .await
            .unwrap();

        assert_eq!(created, again);
        assert_eq!(again.name, "j1");
        assert_eq!(again.created_at, first);
        assert_eq!(store.stats().await.unwrap().job_runs, 1);
    }

    #[tokio::test]
    async fn test_upsert_dataset_reuses_node() {
        let store = InMemoryLineageStore::new();
        store.upsert_dataset("orders", "orders").await.unwrap();
        store.upsert_dataset("orders", "orders").await.unwrap();

        assert_eq!(store.stats().await.unwrap().datasets, 1);
        assert_eq!(
            store.get_dataset("orders").await.unwrap(),
            Some(Dataset::new("orders", "orders"))
        );
    }

    #[tokio::test]
    async fn test_add_edge_is_idempotent() {
        let store = InMemoryLineageStore::new();
        store.upsert_job_run("r1", "j1", Utc::now()).await.unwrap();
        store.upsert_dataset("orders", "orders").await.unwrap();

        assert!(store.add_edge("r1", "orders", Direction::Output).await.unwrap());
        assert!(!store.add_edge("r1", "orders", Direction::Output).await.unwrap());

        let edges = store.get_edges("r1").await.unwrap();
        assert_eq!(edges.len(), 1);
        assert!(edges.contains(&("orders".to_string(), Direction::Output)));
    }

    #[tokio::test]
    async fn test_add_edge_requires_nodes() {
        let store = InMemoryLineageStore::new();
        store.upsert_dataset("orders", "orders").await.unwrap();

        let err = store
            .add_edge("ghost", "orders", Direction::Input)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingNode);

        store.upsert_job_run("r1", "j1", Utc::now()).await.unwrap();
        let err = store
            .add_edge("r1", "ghost", Direction::Input)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingNode);
        assert!(store.get_edges("r1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_run() {
        let store = InMemoryLineageStore::new();
        assert!(store.get_job_run("missing").await.unwrap().is_none());
        assert!(store.get_edges("missing").await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_create_one_run() {
        let store = InMemoryLineageStore::with_shard_amount(4);
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .upsert_job_run("r1", &format!("name-{}", i), Utc::now())
                    .await
                    .unwrap()
            }));
        }

        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }

        // Every caller observed the same row
        assert!(seen.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.stats().await.unwrap().job_runs, 1);
    }
}
