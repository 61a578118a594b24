//! Factory configuration model
//!
//! The active configuration is a single JSON document on the gateway
//! (`active_factory_config`). Field names follow the stored layout, and
//! every collection defaults to empty so partially filled documents load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::order::Priority;

/// A production line or machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Machine {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl Machine {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            capabilities: Vec::new(),
        }
    }

    /// Key used when talking to the solver (older documents carry no ID)
    pub fn key(&self) -> &str {
        if self.id.is_empty() {
            &self.name
        } else {
            &self.id
        }
    }

    /// Returns true if this machine is referenced by `id_or_name`
    pub fn matches(&self, id_or_name: &str) -> bool {
        (!self.id.is_empty() && self.id == id_or_name) || self.name == id_or_name
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// A machine operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Operator {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Minutes per skill, when the operator is faster or slower than nominal
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub processing_times: BTreeMap<String, f64>,
}

impl Operator {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            skills: Vec::new(),
            processing_times: BTreeMap::new(),
        }
    }

    /// Key used when talking to the solver, like [`Machine::key`]
    pub fn key(&self) -> &str {
        if self.id.is_empty() {
            &self.name
        } else {
            &self.id
        }
    }
}

/// One step of a product's routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default = "default_capability")]
    pub machine_capability_required: String,
    pub duration_minutes: f64,
}

fn default_capability() -> String {
    "general".to_string()
}

/// Product template ("typical job") that production orders instantiate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

/// Changeover time on a machine, optionally between two products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupTime {
    #[serde(default)]
    pub id: String,
    /// Machine ID or name, or `all`
    pub machine: String,
    pub duration_minutes: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SetupTime {
    /// Machine wildcard used by setup rules
    pub const ALL_MACHINES: &'static str = "all";

    pub fn applies_to(&self, machine: &str) -> bool {
        self.machine == machine || self.machine == Self::ALL_MACHINES
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TemporalKind {
    #[default]
    MinLag,
    MaxLag,
    Overlap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalConstraint {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: TemporalKind,
    pub from_operation: String,
    pub to_operation: String,
    pub duration_minutes: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryResource {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiOperatorConstraint {
    #[serde(default)]
    pub id: String,
    pub machine: String,
    pub required_operators: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConstraint {
    #[serde(default)]
    pub id: String,
    pub machine: String,
    pub min_size: u32,
    pub max_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceConstraint {
    #[serde(default)]
    pub id: String,
    pub machine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_hours: Option<f64>,
    pub duration_minutes: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An open working window, in minutes from the shift start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub start_minute: i64,
    pub end_minute: i64,
}

impl Shift {
    pub fn new(start_minute: i64, end_minute: i64) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }
}

/// Declared working shifts of one machine or operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAvailability {
    pub resource_id: String,
    #[serde(default)]
    pub shifts: Vec<Shift>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Constraints {
    pub setup_times: Vec<SetupTime>,
    pub temporal: Vec<TemporalConstraint>,
    pub auxiliary_resources: Vec<AuxiliaryResource>,
    pub multi_operator: Vec<MultiOperatorConstraint>,
    pub batching: Vec<BatchConstraint>,
    pub maintenance: Vec<MaintenanceConstraint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource_availabilities: Vec<ResourceAvailability>,
}

/// The active factory configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FactoryConfig {
    pub machines: Vec<Machine>,
    pub operators: Vec<Operator>,
    pub constraints: Constraints,
    pub typical_jobs: Vec<Product>,
}

impl FactoryConfig {
    /// Finds a machine by ID or name
    pub fn machine(&self, id_or_name: &str) -> Option<&Machine> {
        self.machines.iter().find(|m| m.matches(id_or_name))
    }

    pub fn operator(&self, id_or_name: &str) -> Option<&Operator> {
        self.operators
            .iter()
            .find(|o| o.id == id_or_name || o.name == id_or_name)
    }

    /// Finds a product template by ID, falling back to a name match
    pub fn product(&self, id: Option<&str>, name: Option<&str>) -> Option<&Product> {
        self.typical_jobs.iter().find(|p| {
            id.is_some_and(|id| !p.id.is_empty() && p.id == id) || name.is_some_and(|n| p.name == n)
        })
    }

    /// Finds a product template by case-insensitive name
    pub fn product_by_name(&self, name: &str) -> Option<&Product> {
        let lower = name.to_lowercase();
        self.typical_jobs
            .iter()
            .find(|p| p.name.to_lowercase() == lower)
    }

    /// Removes a machine by ID or name, returning it if present
    pub fn remove_machine(&mut self, id_or_name: &str) -> Option<Machine> {
        let idx = self.machines.iter().position(|m| m.matches(id_or_name))?;
        Some(self.machines.remove(idx))
    }

    pub fn remove_operator(&mut self, id_or_name: &str) -> Option<Operator> {
        let idx = self
            .operators
            .iter()
            .position(|o| o.id == id_or_name || o.name == id_or_name)?;
        Some(self.operators.remove(idx))
    }

    pub fn remove_product(&mut self, id_or_name: &str) -> Option<Product> {
        let idx = self
            .typical_jobs
            .iter()
            .position(|p| p.id == id_or_name || p.name == id_or_name)?;
        Some(self.typical_jobs.remove(idx))
    }

    /// Declared shifts for a resource (empty when none are declared)
    pub fn shifts_for(&self, resource_id: &str) -> &[Shift] {
        self.constraints
            .resource_availabilities
            .iter()
            .find(|a| a.resource_id == resource_id)
            .map(|a| a.shifts.as_slice())
            .unwrap_or(&[])
    }
}
