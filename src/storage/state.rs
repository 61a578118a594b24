//! Production state store
//!
//! Read-through cache of the active factory configuration, the active
//! schedule and the production orders, each kept in its own gateway
//! document. The whole snapshot is loaded at once and reused until it is
//! invalidated.
//!
//! ## Write safety
//!
//! - Optimistic concurrency: every cached document remembers its gateway id
//!   and revision (`updated_at`, falling back to `created_at`). Before a
//!   write the remote document is re-read; if it no longer matches, the
//!   write is refused with [`StateError::Conflict`].
//! - Sequencing: each write is tagged with a per-document sequence number.
//!   A response carrying an older number than the latest one issued for the
//!   same document is ignored.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{FactoryConfig, ProductionOrder, Scenario, ScenarioStatus, ScheduleResult};

use super::gateway::{doc_type, Document, DocumentStore, GatewayError};

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("{doc_type} was changed by someone else (cached revision {cached}, remote {remote}); reload and retry")]
    Conflict {
        doc_type: &'static str,
        cached: String,
        remote: String,
    },

    #[error("Invalid {doc_type} document: {message}")]
    Corrupt {
        doc_type: &'static str,
        message: String,
    },

    #[error("Scenario has not been simulated yet")]
    NotSimulated,
}

/// Gateway identity of a cached document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocMeta {
    pub id: String,
    pub revision: Option<String>,
}

impl DocMeta {
    fn of(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            revision: document.revision().map(str::to_string),
        }
    }

    fn describe(meta: Option<&DocMeta>) -> String {
        match meta {
            Some(DocMeta {
                id,
                revision: Some(rev),
            }) => format!("{}@{}", id, rev),
            Some(DocMeta { id, revision: None }) => id.clone(),
            None => "none".to_string(),
        }
    }
}

/// Everything the dashboard works from
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub config: Option<FactoryConfig>,
    pub schedule: Option<ScheduleResult>,
    pub orders: Vec<ProductionOrder>,
    meta: BTreeMap<&'static str, DocMeta>,
}

impl Snapshot {
    pub fn meta(&self, doc_type: &str) -> Option<&DocMeta> {
        self.meta.get(doc_type)
    }

    /// Config, or an empty one when none has been saved yet
    pub fn config_or_default(&self) -> FactoryConfig {
        self.config.clone().unwrap_or_default()
    }
}

fn corrupt(doc_type: &'static str, e: serde_json::Error) -> StateError {
    StateError::Corrupt {
        doc_type,
        message: e.to_string(),
    }
}

/// Orders may be stored as `{orders: [...]}`, `{data: [...]}` or a bare array
pub fn parse_orders(json_data: &Value) -> Result<Vec<ProductionOrder>, serde_json::Error> {
    let list = match json_data {
        Value::Array(_) => json_data,
        _ => match json_data.get("orders").or_else(|| json_data.get("data")) {
            Some(list @ Value::Array(_)) => list,
            _ => return Ok(Vec::new()),
        },
    };
    serde_json::from_value(list.clone())
}

/// A cleared schedule is stored as `null` (wrapped as `{data: null}`)
pub fn parse_schedule(json_data: &Value) -> Result<Option<ScheduleResult>, serde_json::Error> {
    match json_data {
        Value::Null => Ok(None),
        Value::Object(map) if map.get("data").is_some_and(Value::is_null) => Ok(None),
        other => serde_json::from_value(other.clone()).map(Some),
    }
}

/// Per-document write sequence numbers
#[derive(Debug, Default)]
struct Sequencer {
    issued: BTreeMap<&'static str, u64>,
}

impl Sequencer {
    fn issue(&mut self, doc_type: &'static str) -> u64 {
        let seq = self.issued.entry(doc_type).or_insert(0);
        *seq += 1;
        *seq
    }

    fn is_current(&self, doc_type: &'static str, seq: u64) -> bool {
        self.issued.get(doc_type).is_some_and(|&latest| latest == seq)
    }
}

/// Acknowledged write, to be applied to the cache
#[derive(Debug)]
struct Written {
    doc_type: &'static str,
    seq: u64,
    meta: DocMeta,
}

pub struct StateStore<S> {
    gateway: S,
    cache: Option<Snapshot>,
    sequences: Sequencer,
}

impl<S: DocumentStore> StateStore<S> {
    pub fn new(gateway: S) -> Self {
        Self {
            gateway,
            cache: None,
            sequences: Sequencer::default(),
        }
    }

    pub fn gateway(&self) -> &S {
        &self.gateway
    }

    fn fetch(&self) -> Result<Snapshot, StateError> {
        let mut snapshot = Snapshot::default();

        if let Some(doc) = self.gateway.latest(doc_type::FACTORY_CONFIG)? {
            snapshot.config = Some(
                serde_json::from_value(doc.json_data.clone())
                    .map_err(|e| corrupt(doc_type::FACTORY_CONFIG, e))?,
            );
            snapshot.meta.insert(doc_type::FACTORY_CONFIG, DocMeta::of(&doc));
        }

        if let Some(doc) = self.gateway.latest(doc_type::SCHEDULE)? {
            snapshot.schedule =
                parse_schedule(&doc.json_data).map_err(|e| corrupt(doc_type::SCHEDULE, e))?;
            snapshot.meta.insert(doc_type::SCHEDULE, DocMeta::of(&doc));
        }

        if let Some(doc) = self.gateway.latest(doc_type::ORDERS)? {
            snapshot.orders =
                parse_orders(&doc.json_data).map_err(|e| corrupt(doc_type::ORDERS, e))?;
            snapshot.meta.insert(doc_type::ORDERS, DocMeta::of(&doc));
        }

        tracing::debug!(
            config = snapshot.config.is_some(),
            schedule_tasks = snapshot.schedule.as_ref().map_or(0, |s| s.tasks.len()),
            orders = snapshot.orders.len(),
            "loaded production state"
        );
        Ok(snapshot)
    }

    /// Reloads everything from the gateway
    pub fn load(&mut self) -> Result<&Snapshot, StateError> {
        let snapshot = self.fetch()?;
        Ok(self.cache.insert(snapshot))
    }

    /// Cached snapshot, loading it on first use
    pub fn snapshot(&mut self) -> Result<&Snapshot, StateError> {
        Ok(self.cached()?)
    }

    fn cached(&mut self) -> Result<&mut Snapshot, StateError> {
        let snapshot = match self.cache.take() {
            Some(snapshot) => snapshot,
            None => self.fetch()?,
        };
        Ok(self.cache.insert(snapshot))
    }

    /// Drops the cache; the next read goes to the gateway
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Writes one document after checking it has not moved remotely
    fn write(&mut self, doc_type: &'static str, data: &Value, description: &str) -> Result<Written, StateError> {
        let cached = self.cached()?.meta(doc_type).cloned();
        let seq = self.sequences.issue(doc_type);

        let remote = self.gateway.latest(doc_type)?.map(|d| DocMeta::of(&d));
        if remote != cached {
            tracing::warn!(%doc_type, "refusing write over a remote change");
            return Err(StateError::Conflict {
                doc_type,
                cached: DocMeta::describe(cached.as_ref()),
                remote: DocMeta::describe(remote.as_ref()),
            });
        }

        let id = match cached {
            Some(meta) => {
                self.gateway.update(doc_type, &meta.id, data)?;
                meta.id
            }
            None => self.gateway.create(doc_type, data, description)?,
        };

        let meta = match self.gateway.get(doc_type, &id)? {
            Some(doc) => DocMeta::of(&doc),
            None => DocMeta { id, revision: None },
        };

        tracing::debug!(%doc_type, seq, id = %meta.id, "document written");
        Ok(Written { doc_type, seq, meta })
    }

    /// Applies a write acknowledgement unless a newer write was issued since
    fn accept(&mut self, written: Written) -> Result<Option<&mut Snapshot>, StateError> {
        if !self.sequences.is_current(written.doc_type, written.seq) {
            tracing::debug!(doc_type = %written.doc_type, seq = written.seq, "ignoring stale response");
            return Ok(None);
        }
        let snapshot = self.cached()?;
        snapshot.meta.insert(written.doc_type, written.meta);
        Ok(Some(snapshot))
    }

    /// Saves the configuration; a config without machines clears the schedule
    pub fn update_config(&mut self, config: FactoryConfig, description: &str) -> Result<(), StateError> {
        let data = serde_json::to_value(&config).map_err(|e| corrupt(doc_type::FACTORY_CONFIG, e))?;
        let written = self.write(doc_type::FACTORY_CONFIG, &data, description)?;

        let emptied = config.machines.is_empty();
        if let Some(snapshot) = self.accept(written)? {
            snapshot.config = Some(config);
        }

        if emptied {
            tracing::info!("configuration has no machines, clearing schedule");
            self.save_schedule(None)?;
        }
        Ok(())
    }

    /// Saves the order list; an empty list clears the schedule
    pub fn update_orders(&mut self, orders: Vec<ProductionOrder>) -> Result<(), StateError> {
        let data = serde_json::json!({ "orders": orders });
        let written = self.write(doc_type::ORDERS, &data, "Production Orders")?;

        let emptied = orders.is_empty();
        if let Some(snapshot) = self.accept(written)? {
            snapshot.orders = orders;
        }

        if emptied {
            tracing::info!("no orders left, clearing schedule");
            self.save_schedule(None)?;
        }
        Ok(())
    }

    /// Replaces the active schedule (`None` clears it)
    pub fn save_schedule(&mut self, schedule: Option<ScheduleResult>) -> Result<(), StateError> {
        let data = match &schedule {
            Some(s) => serde_json::to_value(s).map_err(|e| corrupt(doc_type::SCHEDULE, e))?,
            None => Value::Null,
        };
        let written = self.write(doc_type::SCHEDULE, &data, "Latest Optimization Result")?;

        if let Some(snapshot) = self.accept(written)? {
            snapshot.schedule = schedule;
        }
        Ok(())
    }

    /// Makes a simulated scenario the production schedule
    pub fn promote(&mut self, scenario: &mut Scenario) -> Result<(), StateError> {
        if !scenario.is_simulated() {
            return Err(StateError::NotSimulated);
        }
        let Some(mut schedule) = scenario.simulated_schedule.clone() else {
            return Err(StateError::NotSimulated);
        };

        let now = Utc::now();
        if schedule.id.is_none() {
            schedule.id = Some(format!("prod-{}", now.timestamp_millis()));
        }
        schedule.updated_at = Some(now.to_rfc3339());

        self.save_schedule(Some(schedule))?;
        scenario.status = ScenarioStatus::Approved;
        tracing::info!(scenario = %scenario.id, "scenario promoted to production");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::{Cell, RefCell};

    use super::*;

    /// In-memory gateway with a ticking clock
    #[derive(Default)]
    pub struct MemoryGateway {
        docs: RefCell<BTreeMap<String, Vec<Document>>>,
        clock: Cell<u32>,
        pub fail: Cell<bool>,
    }

    impl MemoryGateway {
        fn tick(&self) -> String {
            let t = self.clock.get() + 1;
            self.clock.set(t);
            format!("2025-03-03T08:{:02}:{:02}Z", t / 60, t % 60)
        }

        fn check(&self) -> Result<(), GatewayError> {
            if self.fail.get() {
                return Err(GatewayError::Transport {
                    service: "gateway",
                    message: "connection refused".to_string(),
                });
            }
            Ok(())
        }

        /// Simulates another client writing the document
        pub fn touch(&self, doc_type: &str, id: &str) {
            let now = self.tick();
            if let Some(doc) = self
                .docs
                .borrow_mut()
                .get_mut(doc_type)
                .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            {
                doc.updated_at = Some(now);
            }
        }

        pub fn seed(&self, doc_type: &str, data: Value) -> String {
            self.create(doc_type, &data, "seed").unwrap()
        }

        pub fn documents(&self, doc_type: &str) -> Vec<Document> {
            self.docs.borrow().get(doc_type).cloned().unwrap_or_default()
        }
    }

    impl DocumentStore for MemoryGateway {
        fn list(&self, doc_type: &str) -> Result<Vec<Document>, GatewayError> {
            self.check()?;
            Ok(self.documents(doc_type))
        }

        fn create(&self, doc_type: &str, data: &Value, _description: &str) -> Result<String, GatewayError> {
            self.check()?;
            let now = self.tick();
            let mut docs = self.docs.borrow_mut();
            let list = docs.entry(doc_type.to_string()).or_default();
            let id = format!("{}-{}", doc_type, list.len() + 1);
            list.push(Document {
                id: id.clone(),
                created_at: Some(now),
                updated_at: None,
                json_data: data.clone(),
            });
            Ok(id)
        }

        fn update(&self, doc_type: &str, id: &str, data: &Value) -> Result<(), GatewayError> {
            self.check()?;
            let now = self.tick();
            let mut docs = self.docs.borrow_mut();
            let doc = docs
                .get_mut(doc_type)
                .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
                .ok_or_else(|| GatewayError::Status {
                    service: "gateway",
                    status: 404,
                    body: "not found".to_string(),
                })?;
            doc.json_data = data.clone();
            doc.updated_at = Some(now);
            Ok(())
        }

        fn delete(&self, doc_type: &str, id: &str) -> Result<(), GatewayError> {
            self.check()?;
            if let Some(docs) = self.docs.borrow_mut().get_mut(doc_type) {
                docs.retain(|d| d.id != id);
            }
            Ok(())
        }
    }
}
