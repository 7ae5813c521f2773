//! Application layer - ingestion and query use cases

pub mod ingest;
pub mod locks;
pub mod query;

use std::sync::Arc;

use crate::domain::LineageStore;

pub use ingest::{IngestReport, IngestionEngine};
pub use locks::RunLocks;
pub use query::{LineageGraph, QueryEngine};

/// Both engines wired to one store and one set of run locks
#[derive(Clone)]
pub struct LineageService {
    store: Arc<dyn LineageStore>,
    ingestion: IngestionEngine,
    query: QueryEngine,
}

impl LineageService {
    pub fn new(store: Arc<dyn LineageStore>, lock_stripes: usize) -> Self {
        let locks = Arc::new(RunLocks::new(lock_stripes));
        Self {
            ingestion: IngestionEngine::new(store.clone(), locks.clone()),
            query: QueryEngine::new(store.clone(), locks),
            store,
        }
    }

    pub fn ingestion(&self) -> &IngestionEngine {
        &self.ingestion
    }

    pub fn query(&self) -> &QueryEngine {
        &self.query
    }

    pub fn store(&self) -> &Arc<dyn LineageStore> {
        &self.store
    }
}
