//! Lineage graph - ingestion and query core of the lineage collector
//!
//! Consumes OpenLineage-style run events (possibly duplicated, possibly out
//! of order) and maintains a graph of job runs, datasets, and the
//! INPUT/OUTPUT edges between them.
//!
//! ## Core Guarantees
//!
//! 1. **Idempotency**: applying an event twice leaves the same graph as applying it once
//! 2. **Uniqueness**: one node per `run_id`, one per `dataset_id`, one edge per
//!    `(run_id, dataset_id, direction)`
//! 3. **Per-run serialization**: ingestion and queries for the same run never interleave
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lineage_graph::{InMemoryLineageStore, LineageEvent, LineageService};
//!
//! let service = LineageService::new(Arc::new(InMemoryLineageStore::new()), 16);
//!
//! let event = LineageEvent::new("r1", "j1").with_output("orders");
//! service.ingestion().ingest(&event).await?;
//!
//! let graph = service.query().lineage("r1").await?.unwrap();
//! assert_eq!(graph.outputs, vec!["orders"]);
//! ```

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, LineageError, Result};

pub use application::{
    IngestReport, IngestionEngine, LineageGraph, LineageService, QueryEngine, RunLocks,
};
pub use domain::{
    Dataset, DatasetRef, Direction, Edge, EdgeSet, JobRun, LineageEvent, LineageStore, StoreStats,
};
pub use infrastructure::InMemoryLineageStore;

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteLineageStore;
