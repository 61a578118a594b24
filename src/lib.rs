//! Plantboard - production planning from the terminal
//!
//! Keeps a factory configuration (machines, operators, product templates)
//! and production orders in a remote document gateway, asks an external
//! solver for schedules, and shows them as a Gantt chart. Hypothetical
//! changes go through what-if scenarios that are simulated before they can
//! be promoted to production.

pub mod cli;
pub mod domain;
pub mod gantt;
pub mod storage;

pub use domain::{FactoryConfig, ProductionOrder, Scenario, ScheduleResult};
pub use gantt::{Chart, GanttMode, ViewMode};
