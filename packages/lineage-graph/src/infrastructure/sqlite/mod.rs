//! SQLite LineageStore
//!
//! Schema:
//! - `job_runs(run_id PK)`
//! - `datasets(dataset_id PK)`
//! - `lineage_edges(run_id, dataset_id, direction)` with the triple as
//!   primary key, so a repeated edge is rejected by the database itself
//!
//! Upserts use `ON CONFLICT DO NOTHING` followed by a read, which returns
//! whichever row won. `apply` runs a whole event in one transaction.

mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::{
    ApplyOutcome, Dataset, Direction, EdgeSet, JobRun, LineageStore, NormalizedEvent, StoreStats,
};
use crate::error::{LineageError, Result};

/// How long a writer waits on a locked database file before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based LineageStore implementation
#[derive(Clone)]
pub struct SqliteLineageStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLineageStore {
    /// Open (or create) a database file
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();
        debug!(path = %path.display(), "Opening SQLite lineage store");
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory SQLite store (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

// Statement helpers take `&Connection` so they run the same on a plain
// connection and inside a transaction.

fn upsert_job_run(
    conn: &Connection,
    run_id: &str,
    name: &str,
    created_at: DateTime<Utc>,
) -> Result<JobRun> {
    conn.execute(
        "INSERT INTO job_runs (run_id, name, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(run_id) DO NOTHING",
        params![run_id, name, created_at],
    )?;
    get_job_run(conn, run_id)?
        .ok_or_else(|| LineageError::database(format!("job run '{}' vanished after upsert", run_id)))
}

fn get_job_run(conn: &Connection, run_id: &str) -> Result<Option<JobRun>> {
    let run = conn
        .query_row(
            "SELECT run_id, name, created_at FROM job_runs WHERE run_id = ?1",
            params![run_id],
            |row| {
                Ok(JobRun {
                    run_id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(run)
}

fn upsert_dataset(conn: &Connection, dataset_id: &str, name: &str) -> Result<Dataset> {
    conn.execute(
        "INSERT INTO datasets (dataset_id, name) VALUES (?1, ?2)
         ON CONFLICT(dataset_id) DO NOTHING",
        params![dataset_id, name],
    )?;
    get_dataset(conn, dataset_id)?.ok_or_else(|| {
        LineageError::database(format!("dataset '{}' vanished after upsert", dataset_id))
    })
}

fn get_dataset(conn: &Connection, dataset_id: &str) -> Result<Option<Dataset>> {
    let dataset = conn
        .query_row(
            "SELECT dataset_id, name FROM datasets WHERE dataset_id = ?1",
            params![dataset_id],
            |row| {
                Ok(Dataset {
                    dataset_id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(dataset)
}

fn exists(conn: &Connection, sql: &str, key: &str) -> Result<bool> {
    Ok(conn
        .query_row(sql, params![key], |_| Ok(()))
        .optional()?
        .is_some())
}

fn add_edge(conn: &Connection, run_id: &str, dataset_id: &str, direction: Direction) -> Result<bool> {
    // Checked up front so the caller gets MissingNode rather than a
    // generic constraint failure.
    if !exists(conn, "SELECT 1 FROM job_runs WHERE run_id = ?1", run_id)? {
        return Err(LineageError::missing_node(format!("run '{}'", run_id)));
    }
    if !exists(conn, "SELECT 1 FROM datasets WHERE dataset_id = ?1", dataset_id)? {
        return Err(LineageError::missing_node(format!("dataset '{}'", dataset_id)));
    }

    let inserted = conn.execute(
        "INSERT INTO lineage_edges (run_id, dataset_id, direction) VALUES (?1, ?2, ?3)
         ON CONFLICT(run_id, dataset_id, direction) DO NOTHING",
        params![run_id, dataset_id, direction.as_str()],
    )?;
    Ok(inserted > 0)
}

fn get_edges(conn: &Connection, run_id: &str) -> Result<EdgeSet> {
    let mut stmt =
        conn.prepare("SELECT dataset_id, direction FROM lineage_edges WHERE run_id = ?1")?;
    let rows = stmt
        .query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(dataset_id, direction)| Ok((dataset_id, Direction::from_str(&direction)?)))
        .collect()
}

fn count(conn: &Connection, table: &str) -> Result<usize> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
    Ok(n as usize)
}

#[async_trait]
impl LineageStore for SqliteLineageStore {
    async fn upsert_job_run(
        &self,
        run_id: &str,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<JobRun> {
        upsert_job_run(&self.conn.lock(), run_id, name, created_at)
    }

    async fn upsert_dataset(&self, dataset_id: &str, name: &str) -> Result<Dataset> {
        upsert_dataset(&self.conn.lock(), dataset_id, name)
    }

    async fn add_edge(
        &self,
        run_id: &str,
        dataset_id: &str,
        direction: Direction,
    ) -> Result<bool> {
        add_edge(&self.conn.lock(), run_id, dataset_id, direction)
    }

    async fn get_job_run(&self, run_id: &str) -> Result<Option<JobRun>> {
        get_job_run(&self.conn.lock(), run_id)
    }

    async fn get_dataset(&self, dataset_id: &str) -> Result<Option<Dataset>> {
        get_dataset(&self.conn.lock(), dataset_id)
    }

    async fn get_edges(&self, run_id: &str) -> Result<EdgeSet> {
        get_edges(&self.conn.lock(), run_id)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();
        Ok(StoreStats {
            job_runs: count(&conn, "job_runs")?,
            datasets: count(&conn, "datasets")?,
            edges: count(&conn, "lineage_edges")?,
        })
    }

    async fn apply(&self, event: &NormalizedEvent, created_at: DateTime<Utc>) -> Result<ApplyOutcome> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        upsert_job_run(&tx, &event.run_id, &event.job_name, created_at)?;
        let mut outcome = ApplyOutcome::default();
        for (entry, edge) in event.linked_datasets() {
            upsert_dataset(&tx, &entry.dataset_id, &entry.name)?;
            if add_edge(&tx, &edge.run_id, &edge.dataset_id, edge.direction)? {
                outcome.edges_added += 1;
            }
        }

        // Dropping `tx` on any error above rolls the whole event back
        tx.commit()?;
        Ok(outcome)
    }
}
