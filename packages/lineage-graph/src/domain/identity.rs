//! Canonical keys for runs and datasets
//!
//! All key derivation goes through this module. Keys are verbatim today;
//! case-folding or namespace prefixing would change only these functions.

use std::collections::HashSet;

use super::{Direction, Edge, LineageEvent};
use crate::error::Result;

pub type RunKey = String;
pub type DatasetKey = String;

/// Canonical key of a job run
pub fn run_key(run_id: &str) -> RunKey {
    run_id.to_string()
}

/// Canonical key of a dataset, derived from its `name`
pub fn dataset_key(name: &str) -> DatasetKey {
    name.to_string()
}

/// Dataset as it will be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    pub dataset_id: DatasetKey,
    pub name: String,
}

/// Event reduced to canonical keys
///
/// `inputs` and `outputs` keep first-seen order with repeats removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub run_id: RunKey,
    pub job_name: String,
    pub inputs: Vec<DatasetEntry>,
    pub outputs: Vec<DatasetEntry>,
}

impl NormalizedEvent {
    /// Inputs then outputs, tagged with their edge direction
    pub fn edges_by_direction(&self) -> [(Direction, &[DatasetEntry]); 2] {
        [
            (Direction::Input, self.inputs.as_slice()),
            (Direction::Output, self.outputs.as_slice()),
        ]
    }

    /// Each dataset paired with the edge it gets, inputs first
    pub fn linked_datasets(&self) -> impl Iterator<Item = (&DatasetEntry, Edge)> {
        self.edges_by_direction()
            .into_iter()
            .flat_map(move |(direction, entries)| {
                entries.iter().map(move |entry| {
                    (entry, Edge::new(&self.run_id, &entry.dataset_id, direction))
                })
            })
    }
}

/// Derive canonical keys for every entity an event mentions
///
/// Fails with `MalformedEvent` before anything is touched.
pub fn normalize(event: &LineageEvent) -> Result<NormalizedEvent> {
    event.validate()?;

    Ok(NormalizedEvent {
        run_id: run_key(&event.run_id),
        job_name: event.job_name.clone(),
        inputs: entries(event.inputs.iter().map(|d| d.name.as_str())),
        outputs: entries(event.outputs.iter().map(|d| d.name.as_str())),
    })
}

fn entries<'a>(names: impl Iterator<Item = &'a str>) -> Vec<DatasetEntry> {
    let mut seen: HashSet<DatasetKey> = HashSet::new();
    let mut out: Vec<DatasetEntry> = Vec::new();
    for name in names {
        let dataset_id = dataset_key(name);
        if !seen.insert(dataset_id.clone()) {
            continue;
        }
        out.push(DatasetEntry {
            dataset_id,
            name: name.to_string(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_keys_are_verbatim() {
        assert_eq!(run_key("3f2c-aa"), "3f2c-aa");
        assert_eq!(dataset_key("Raw.Orders"), "Raw.Orders");
    }

    #[test]
    fn test_normalize_dedups_within_event() {
        let event = LineageEvent::new("r1", "j1")
            .with_input("orders")
            .with_input("customers")
            .with_input("orders")
            .with_output("summary");

        let normalized = normalize(&event).unwrap();
        let inputs: Vec<_> = normalized.inputs.iter().map(|e| e.dataset_id.as_str()).collect();
        assert_eq!(inputs, vec!["orders", "customers"]);
        assert_eq!(normalized.outputs.len(), 1);
    }

    #[test]
    fn test_same_dataset_in_both_directions_is_kept() {
        let event = LineageEvent::new("r1", "j1")
            .with_input("orders")
            .with_output("orders");

        let normalized = normalize(&event).unwrap();
        assert_eq!(normalized.inputs.len(), 1);
        assert_eq!(normalized.outputs.len(), 1);
    }

    #[test]
    fn test_edges_follow_entries() {
        let normalized = normalize(
            &LineageEvent::new("r1", "j1")
                .with_input("orders")
                .with_output("orders")
                .with_output("summary"),
        )
        .unwrap();

        let edges: Vec<Edge> = normalized.linked_datasets().map(|(_, edge)| edge).collect();
        assert_eq!(
            edges,
            vec![
                Edge::new("r1", "orders", Direction::Input),
                Edge::new("r1", "orders", Direction::Output),
                Edge::new("r1", "summary", Direction::Output),
            ]
        );
        let names: Vec<&str> = normalized
            .linked_datasets()
            .map(|(entry, _)| entry.name.as_str())
            .collect();
        assert_eq!(names, vec!["orders", "orders", "summary"]);
    }

    #[test]
    fn test_normalize_large_distinct_list() {
        let mut event = LineageEvent::new("r1", "j1");
        for i in 0..60_000 {
            event = event.with_input(format!("d{}", i));
        }
        // Every name repeated once more at the end
        for i in 0..60_000 {
            event = event.with_input(format!("d{}", i));
        }

        let started = std::time::Instant::now();
        let normalized = normalize(&event).unwrap();
        let elapsed = started.elapsed();

        assert_eq!(normalized.inputs.len(), 60_000);
        assert_eq!(normalized.inputs[0].dataset_id, "d0");
        assert_eq!(normalized.inputs[59_999].dataset_id, "d59999");
        assert!(elapsed < std::time::Duration::from_secs(5), "took {:?}", elapsed);
    }

    #[test]
    fn test_normalize_rejects_empty_run_id() {
        let err = normalize(&LineageEvent::new("", "j1")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedEvent);
    }

    #[test]
    fn test_edges_by_direction_order() {
        let normalized = normalize(&LineageEvent::new("r1", "j1").with_output("b").with_input("a")).unwrap();
        let [(first, inputs), (second, outputs)] = normalized.edges_by_direction();
        assert_eq!(first, Direction::Input);
        assert_eq!(inputs[0].dataset_id, "a");
        assert_eq!(second, Direction::Output);
        assert_eq!(outputs[0].dataset_id, "b");
    }
}
