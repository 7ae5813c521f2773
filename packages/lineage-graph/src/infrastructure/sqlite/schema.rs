use rusqlite::Connection;

use crate::error::Result;

/// Create tables and indexes if they do not exist yet
pub(super) fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    // Job runs table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS job_runs (
            run_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // Datasets table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS datasets (
            dataset_id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    // Edges table: the composite key is the uniqueness guarantee
    conn.execute(
        "CREATE TABLE IF NOT EXISTS lineage_edges (
            run_id TEXT NOT NULL,
            dataset_id TEXT NOT NULL,
            direction TEXT NOT NULL CHECK (direction IN ('INPUT', 'OUTPUT')),
            PRIMARY KEY (run_id, dataset_id, direction),
            FOREIGN KEY (run_id) REFERENCES job_runs(run_id),
            FOREIGN KEY (dataset_id) REFERENCES datasets(dataset_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_edges_dataset
         ON lineage_edges(dataset_id)",
        [],
    )?;

    Ok(())
}
