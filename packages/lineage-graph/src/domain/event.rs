//! Lineage event payload
//!
//! Producers send OpenLineage-style run events:
//!
//! ```json
//! {
//!   "eventType": "COMPLETE",
//!   "eventTime": "2024-01-01T00:00:00Z",
//!   "run": { "runId": "r1" },
//!   "job": { "namespace": "airflow", "name": "load_orders" },
//!   "inputs": [{ "namespace": "snowflake", "name": "raw.orders" }],
//!   "outputs": [{ "name": "orders" }]
//! }
//! ```
//!
//! Only `run.runId` and `job.name` are required. Everything else in the
//! OpenLineage envelope is optional, and unknown fields (facets etc.) are
//! ignored.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LineageError, Result};

/// Dataset reference inside an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl DatasetRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }
}

/// Validated lineage event
///
/// Built either by [`LineageEvent::from_json`] or programmatically:
///
/// ```rust
/// use lineage_graph::domain::LineageEvent;
///
/// let event = LineageEvent::new("r2", "j2")
///     .with_input("orders")
///     .with_output("summary");
/// assert_eq!(event.inputs.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageEvent {
    pub run_id: String,
    pub job_name: String,
    pub job_namespace: Option<String>,
    /// `START`, `COMPLETE`, `FAIL`, ... (informational)
    pub event_type: Option<String>,
    /// Producer clock, kept verbatim (informational)
    pub event_time: Option<String>,
    pub producer: Option<String>,
    pub inputs: Vec<DatasetRef>,
    pub outputs: Vec<DatasetRef>,
}

impl LineageEvent {
    pub fn new(run_id: impl Into<String>, job_name: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            job_name: job_name.into(),
            job_namespace: None,
            event_type: None,
            event_time: None,
            producer: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(DatasetRef::new(name));
        self
    }

    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(DatasetRef::new(name));
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Decode a JSON payload and check the required fields
    ///
    /// # Errors
    ///
    /// `MalformedEvent` when the body is not JSON, a field has the wrong
    /// type, or a required field is missing or empty.
    pub fn from_json(payload: &[u8]) -> Result<Self> {
        let wire: WireEvent = serde_json::from_slice(payload)
            .map_err(|e| LineageError::malformed(format!("invalid event payload: {}", e)))?;
        let event = wire.into_event()?;
        event.validate()?;
        Ok(event)
    }

    /// Reject events whose keys would be empty
    pub fn validate(&self) -> Result<()> {
        if self.run_id.is_empty() {
            return Err(LineageError::missing_field("run.runId"));
        }
        if self.job_name.is_empty() {
            return Err(LineageError::missing_field("job.name"));
        }
        for (field, datasets) in [("inputs", &self.inputs), ("outputs", &self.outputs)] {
            if let Some(i) = datasets.iter().position(|d| d.name.is_empty()) {
                return Err(LineageError::missing_field(&format!("{}[{}].name", field, i)));
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Wire format
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default)]
    event_time: Option<String>,
    #[serde(default)]
    producer: Option<String>,
    #[serde(default)]
    run: Option<WireRun>,
    #[serde(default)]
    job: Option<WireJob>,
    #[serde(default, deserialize_with = "null_as_empty")]
    inputs: Vec<WireDataset>,
    #[serde(default, deserialize_with = "null_as_empty")]
    outputs: Vec<WireDataset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRun {
    #[serde(default)]
    run_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireJob {
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDataset {
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl WireEvent {
    fn into_event(self) -> Result<LineageEvent> {
        let run_id = self
            .run
            .and_then(|r| r.run_id)
            .ok_or_else(|| LineageError::missing_field("run.runId"))?;
        let job = self
            .job
            .ok_or_else(|| LineageError::missing_field("job.name"))?;
        let job_name = job
            .name
            .ok_or_else(|| LineageError::missing_field("job.name"))?;

        Ok(LineageEvent {
            run_id,
            job_name,
            job_namespace: job.namespace,
            event_type: self.event_type,
            event_time: self.event_time,
            producer: self.producer,
            inputs: datasets("inputs", self.inputs)?,
            outputs: datasets("outputs", self.outputs)?,
        })
    }
}

fn datasets(field: &str, wire: Vec<WireDataset>) -> Result<Vec<DatasetRef>> {
    wire.into_iter()
        .enumerate()
        .map(|(i, d)| {
            let name = d
                .name
                .ok_or_else(|| LineageError::missing_field(&format!("{}[{}].name", field, i)))?;
            Ok(DatasetRef {
                name,
                namespace: d.namespace,
            })
        })
        .collect()
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Result<LineageEvent> {
        LineageEvent::from_json(value.to_string().as_bytes())
    }

    #[test]
    fn test_minimal_event() {
        let event = decode(json!({
            "run": {"runId": "r1"},
            "job": {"name": "j1"},
            "outputs": [{"name": "orders"}]
        }))
        .unwrap();

        assert_eq!(event.run_id, "r1");
        assert_eq!(event.job_name, "j1");
        assert!(event.inputs.is_empty());
        assert_eq!(event.outputs, vec![DatasetRef::new("orders")]);
    }

    #[test]
    fn test_full_openlineage_envelope() {
        let event = decode(json!({
            "eventType": "COMPLETE",
            "eventTime": "2024-03-01T10:00:00.000Z",
            "producer": "https://github.com/OpenLineage/OpenLineage/tree/1.0.0/integration/airflow",
            "schemaURL": "https://openlineage.io/spec/2-0-2/OpenLineage.json#/$defs/RunEvent",
            "run": {"runId": "r1", "facets": {"nominalTime": {}}},
            "job": {"namespace": "airflow", "name": "snowflake_dag.load"},
            "inputs": [{"namespace": "snowflake://acct", "name": "raw.orders", "facets": {}}],
            "outputs": []
        }))
        .unwrap();

        assert_eq!(event.event_type.as_deref(), Some("COMPLETE"));
        assert_eq!(event.job_namespace.as_deref(), Some("airflow"));
        assert_eq!(event.inputs[0].namespace.as_deref(), Some("snowflake://acct"));
        assert_eq!(event.inputs[0].name, "raw.orders");
    }

    #[test]
    fn test_null_dataset_lists_default_to_empty() {
        let event = decode(json!({
            "run": {"runId": "r1"},
            "job": {"name": "j1"},
            "inputs": null,
            "outputs": null
        }))
        .unwrap();
        assert!(event.inputs.is_empty());
        assert!(event.outputs.is_empty());
    }

    #[test]
    fn test_missing_run_id() {
        let err = decode(json!({"run": {}, "job": {"name": "j1"}})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedEvent);
        assert!(err.message.contains("run.runId"));

        let err = decode(json!({"job": {"name": "j1"}})).unwrap_err();
        assert!(err.message.contains("run.runId"));
    }

    #[test]
    fn test_missing_job_name() {
        let err = decode(json!({"run": {"runId": "r1"}, "job": {}})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedEvent);
        assert!(err.message.contains("job.name"));
    }

    #[test]
    fn test_empty_required_fields() {
        let err = decode(json!({"run": {"runId": ""}, "job": {"name": "j1"}})).unwrap_err();
        assert!(err.message.contains("run.runId"));

        let err = decode(json!({"run": {"runId": "r1"}, "job": {"name": ""}})).unwrap_err();
        assert!(err.message.contains("job.name"));
    }

    #[test]
    fn test_dataset_without_name() {
        let err = decode(json!({
            "run": {"runId": "r1"},
            "job": {"name": "j1"},
            "outputs": [{"name": "orders"}, {"namespace": "s3"}]
        }))
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedEvent);
        assert!(err.message.contains("outputs[1].name"));
    }

    #[test]
    fn test_wrong_types_are_malformed() {
        let err = decode(json!({"run": {"runId": 42}, "job": {"name": "j1"}})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedEvent);

        let err = decode(json!({"run": {"runId": "r1"}, "job": {"name": "j1"}, "inputs": "orders"}))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedEvent);
    }

    #[test]
    fn test_not_json() {
        let err = LineageEvent::from_json(b"run=r1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedEvent);
    }
}
