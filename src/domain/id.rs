//! Identifier generation for locally created entities
//!
//! ID Format:
//! - Entities: `{prefix}-{7-char-hash}` (e.g., `machine-7f2b4c1`, `ord-9d3e5f2`)
//! - Solver task IDs: `{order-id}-task-{index}` (e.g., `ord-9d3e5f2-task-0`)
//!
//! Hash is derived from a seed (usually the entity name) plus the creation
//! timestamp. Documents coming back from the gateway keep whatever ID they
//! were stored with, so IDs are plain strings everywhere else.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid task ID format: expected '{{order-id}}-task-{{index}}', got '{0}'")]
    InvalidTaskRef(String),

    #[error("Invalid task index: {0}")]
    InvalidIndex(String),
}

/// Kinds of locally created entities, each with its own ID prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Machine,
    Operator,
    Product,
    Operation,
    Order,
    SetupTime,
    Temporal,
    Batching,
    Maintenance,
    Scenario,
}

impl EntityKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Machine => "machine",
            EntityKind::Operator => "operator",
            EntityKind::Product => "product",
            EntityKind::Operation => "op",
            EntityKind::Order => "ord",
            EntityKind::SetupTime => "setup",
            EntityKind::Temporal => "temporal",
            EntityKind::Batching => "batching",
            EntityKind::Maintenance => "maintenance",
            EntityKind::Scenario => "scenario",
        }
    }
}

/// Generates a 7-character hash from seed and timestamp
fn generate_hash(seed: &str, timestamp: DateTime<Utc>) -> String {
    let input = format!("{}{}", seed, timestamp.timestamp_nanos_opt().unwrap_or(0));
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..7].to_string()
}

/// Creates a new ID for an entity of the given kind
///
/// Callers creating several entities in one go must pass distinct seeds
/// (e.g. name plus position), since they usually share a timestamp.
pub fn new_id(kind: EntityKind, seed: &str, timestamp: DateTime<Utc>) -> String {
    format!("{}-{}", kind.prefix(), generate_hash(seed, timestamp))
}

/// Reference to one task of a solver job: `{job-id}-task-{index}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskRef {
    job_id: String,
    index: usize,
}

impl TaskRef {
    pub fn new(job_id: impl Into<String>, index: usize) -> Self {
        Self {
            job_id: job_id.into(),
            index,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-task-{}", self.job_id, self.index)
    }
}

impl FromStr for TaskRef {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (job_id, index) = s
            .rsplit_once("-task-")
            .ok_or_else(|| IdError::InvalidTaskRef(s.to_string()))?;

        if job_id.is_empty() {
            return Err(IdError::InvalidTaskRef(s.to_string()));
        }

        let index = index
            .parse::<usize>()
            .map_err(|_| IdError::InvalidIndex(index.to_string()))?;

        Ok(Self::new(job_id, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_id_has_prefix_and_hash() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let id = new_id(EntityKind::Machine, "CNC Alpha", ts);
        assert!(id.starts_with("machine-"));
        assert_eq!(id.len(), "machine-".len() + 7);
    }

    #[test]
    fn new_id_is_deterministic() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(
            new_id(EntityKind::Order, "x", ts),
            new_id(EntityKind::Order, "x", ts)
        );
    }

    #[test]
    fn new_id_differs_by_seed() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        assert_ne!(
            new_id(EntityKind::Product, "a#0", ts),
            new_id(EntityKind::Product, "a#1", ts)
        );
    }

    #[test]
    fn task_ref_parses_order_ids_with_dashes() {
        let r: TaskRef = "ord-9d3e5f2-task-3".parse().unwrap();
        assert_eq!(r.job_id(), "ord-9d3e5f2");
        assert_eq!(r.index(), 3);
        assert_eq!(r.to_string(), "ord-9d3e5f2-task-3");
    }

    #[test]
    fn task_ref_rejects_missing_marker() {
        assert_eq!(
            "ord-1".parse::<TaskRef>(),
            Err(IdError::InvalidTaskRef("ord-1".to_string()))
        );
    }

    #[test]
    fn task_ref_rejects_bad_index() {
        assert!(matches!(
            "ord-1-task-x".parse::<TaskRef>(),
            Err(IdError::InvalidIndex(_))
        ));
    }

    #[test]
    fn task_ref_rejects_empty_job() {
        assert!("-task-1".parse::<TaskRef>().is_err());
    }
}
