//! Ingestion engine
//!
//! Applies one lineage event as a single idempotent unit:
//!
//! 1. decode/normalize (malformed events are rejected before any mutation)
//! 2. upsert the run
//! 3. upsert each input dataset, then its INPUT edge
//! 4. upsert each output dataset, then its OUTPUT edge
//! 5. commit (transactional stores) or rely on per-operation atomicity
//!
//! The run's lock stripe is held for steps 2-5, so a concurrent query for
//! the same run sees either none or all of this event.
//!
//! A failure after step 1 is reported to the caller as-is. Re-delivering
//! the same event is the recovery path: every step is an upsert.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

use super::locks::RunLocks;
use crate::domain::identity::normalize;
use crate::domain::{LineageEvent, LineageStore, NormalizedEvent};
use crate::error::Result;

/// Summary of one applied event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub run_id: String,
    /// Distinct input datasets named by the event
    pub inputs: usize,
    /// Distinct output datasets named by the event
    pub outputs: usize,
    /// Edges recorded for the first time (0 on redelivery)
    pub edges_added: usize,
}

#[derive(Clone)]
pub struct IngestionEngine {
    store: Arc<dyn LineageStore>,
    locks: Arc<RunLocks>,
}

impl IngestionEngine {
    pub fn new(store: Arc<dyn LineageStore>, locks: Arc<RunLocks>) -> Self {
        Self { store, locks }
    }

    /// Decode a raw JSON payload and ingest it
    pub async fn ingest_json(&self, payload: &[u8]) -> Result<IngestReport> {
        let event = LineageEvent::from_json(payload)?;
        self.ingest(&event).await
    }

    pub async fn ingest(&self, event: &LineageEvent) -> Result<IngestReport> {
        let normalized = normalize(event)?;
        let span = info_span!(
            "ingest",
            run_id = %normalized.run_id,
            event_type = event.event_type.as_deref().unwrap_or("-"),
        );

        self.apply_normalized(event, &normalized)
            .instrument(span)
            .await
    }

    async fn apply_normalized(
        &self,
        event: &LineageEvent,
        normalized: &NormalizedEvent,
    ) -> Result<IngestReport> {
        debug!(
            job = %normalized.job_name,
            inputs = normalized.inputs.len(),
            outputs = normalized.outputs.len(),
            producer = event.producer.as_deref().unwrap_or("-"),
            "Received lineage event"
        );

        let outcome = {
            let _guard = self.locks.lock(&normalized.run_id).await;
            self.store.apply(normalized, Utc::now()).await?
        };

        info!(edges_added = outcome.edges_added, "Lineage event applied");

        Ok(IngestReport {
            run_id: normalized.run_id.clone(),
            inputs: normalized.inputs.len(),
            outputs: normalized.outputs.len(),
            edges_added: outcome.edges_added,
        })
    }
}
