//! Production order model
//!
//! Orders are stored together in one `production_orders` document as
//! `{ "orders": [...] }`. Only `production` orders reach the solver; the
//! other types describe planned interventions on a machine.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Production,
    ColorChange,
    Cleaning,
    PreventiveMaintenance,
    ToolChange,
    QualityControl,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Production => "production",
            OrderType::ColorChange => "color_change",
            OrderType::Cleaning => "cleaning",
            OrderType::PreventiveMaintenance => "preventive_maintenance",
            OrderType::ToolChange => "tool_change",
            OrderType::QualityControl => "quality_control",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Weight sent to the solver (higher is more important)
    pub fn weight(&self) -> u32 {
        match self {
            Priority::Low => 1,
            Priority::Normal => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    #[default]
    Pending,
    Scheduled,
    InProgress,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Pending => "pending",
            OrderStatus::Scheduled => "scheduled",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorChangeDetails {
    pub from_color: String,
    pub to_color: String,
    pub machine_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningDetails {
    pub machine_id: String,
    pub estimated_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceDetails {
    pub machine_id: String,
    pub maintenance_type: String,
    pub estimated_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolChangeDetails {
    pub machine_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_tool: Option<String>,
    pub to_tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityControlDetails {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<f64>,
}

/// A production order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub id: String,
    #[serde(rename = "type", default)]
    pub order_type: OrderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    /// References a product template by ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Snapshot of the product name at order time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    /// ISO date or date-time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_change_details: Option<ColorChangeDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaning_details: Option<CleaningDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_details: Option<MaintenanceDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_change_details: Option<ToolChangeDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_control_details: Option<QualityControlDetails>,
}

impl ProductionOrder {
    /// Creates a pending production order for a product
    pub fn production(id: impl Into<String>, product_id: &str, product_name: &str, quantity: f64) -> Self {
        Self {
            id: id.into(),
            order_type: OrderType::Production,
            client: None,
            product_id: Some(product_id.to_string()),
            product_name: Some(product_name.to_string()),
            quantity: Some(quantity),
            deadline: None,
            priority: Priority::Normal,
            status: OrderStatus::Pending,
            color: None,
            color_change_details: None,
            cleaning_details: None,
            maintenance_details: None,
            tool_change_details: None,
            quality_control_details: None,
        }
    }

    /// Creates an order of the given type with no type-specific details yet
    pub fn of_type(id: impl Into<String>, order_type: OrderType) -> Self {
        Self {
            order_type,
            product_id: None,
            product_name: None,
            quantity: None,
            ..Self::production(id, "", "", 0.0)
        }
    }

    /// Quantity to produce, defaulting to one unit
    pub fn effective_quantity(&self) -> f64 {
        match self.quantity {
            Some(q) if q > 0.0 => q,
            _ => 1.0,
        }
    }

    /// Parses the deadline into an instant
    ///
    /// Accepts RFC 3339, a naive date-time (local time) or a bare date
    /// (midnight UTC).
    pub fn deadline_instant(&self) -> Option<DateTime<Utc>> {
        parse_instant(self.deadline.as_deref()?)
    }
}

/// Parses an ISO-ish timestamp as stored by the dashboard
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
        return Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
