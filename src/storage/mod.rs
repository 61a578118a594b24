//! # Storage Layer
//!
//! Everything that leaves the process: the document gateway, the solver,
//! the local configuration file and the what-if draft.
//!
//! ## Where data lives
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Factory config | JSON document | gateway `active_factory_config` |
//! | Active schedule | JSON document | gateway `active_schedule` |
//! | Production orders | JSON document (`{orders: [...]}`) | gateway `production_orders` |
//! | Conversations | JSON documents | gateway `conversations` |
//! | What-if draft | JSON file | `{data_dir}/whatif.json` |
//! | Settings | TOML | `{config_dir}/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`StateStore`] refuses writes over remote changes and ignores stale
//!   acknowledgements
//! - [`DraftStore`] uses file locking (`fs2`) and atomic writes (temp file + rename)
//!
//! ## Key Types
//!
//! - [`StateStore`] - Cached production state over a [`DocumentStore`]
//! - [`GatewayClient`] - HTTP gateway and assistant client
//! - [`SolverClient`] - HTTP solver client
//! - [`Config`] - User configuration

mod config;
pub mod conversations;
mod draft;
mod gateway;
mod solver;
mod state;

pub use config::{Config, ConfigError, GanttConfig, ENV_GATEWAY_URL, ENV_SOLVER_URL, ENV_TOKEN};
pub use draft::DraftStore;
pub use gateway::{
    doc_type, interpret_answer, latest, tag_payload, AskRequest, Assistant, Document, DocumentStore,
    GatewayClient, GatewayError,
};
pub use solver::{Simulation, Solver, SolverClient, SolverError};
pub use state::{parse_orders, parse_schedule, DocMeta, Snapshot, StateError, StateStore};

#[cfg(test)]
pub(crate) use state::fake::MemoryGateway;
