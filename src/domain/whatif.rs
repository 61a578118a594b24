//! What-if scenarios
//!
//! A scenario is an ordered list of hypothetical modifications simulated
//! against the current configuration without touching production. The
//! solver owns the semantics of each modification; this side only builds
//! and records them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::{new_id, EntityKind};
use super::schedule::{ScheduleResult, SHIFT_START_HOUR};

/// A single hypothetical change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireModification", into = "WireModification")]
pub enum Modification {
    DelayOrder { order_id: String, delay_hours: f64 },
    MachineDown { machine_id: String },
    OperatorUnavailable { operator_id: String },
    /// New start in minutes from the shift start
    TaskMove { task_id: String, new_start_minute: i64 },
    Custom { description: String, parameters: Map<String, Value> },
}

impl Modification {
    pub fn kind(&self) -> &'static str {
        match self {
            Modification::DelayOrder { .. } => "delay_order",
            Modification::MachineDown { .. } => "machine_down",
            Modification::OperatorUnavailable { .. } => "operator_unavailable",
            Modification::TaskMove { .. } => "task_move",
            Modification::Custom { .. } => "custom",
        }
    }

    pub fn description(&self) -> String {
        match self {
            Modification::DelayOrder {
                order_id,
                delay_hours,
            } => format!("Delayed order {} by {}h", order_id, delay_hours),
            Modification::MachineDown { machine_id } => format!("Machine {} down", machine_id),
            Modification::OperatorUnavailable { operator_id } => {
                format!("Operator {} unavailable", operator_id)
            }
            Modification::TaskMove {
                task_id,
                new_start_minute,
            } => format!(
                "Moved task {} to {}",
                task_id,
                format_minute_of_shift(*new_start_minute)
            ),
            Modification::Custom { description, .. } => description.clone(),
        }
    }
}

/// Formats minutes from the shift start as a wall-clock `HH:MM`
pub fn format_minute_of_shift(minute: i64) -> String {
    let total = (i64::from(SHIFT_START_HOUR) * 60 + minute).rem_euclid(24 * 60);
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Modification as exchanged with the solver
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireModification {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    parameters: Map<String, Value>,
}

fn string_param(params: &Map<String, Value>, key: &str) -> Result<String, String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("missing parameter '{}'", key))
}

fn number_param(params: &Map<String, Value>, key: &str) -> Result<f64, String> {
    match params.get(key) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| format!("invalid '{}'", key)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid '{}': {}", key, s)),
        _ => Err(format!("missing parameter '{}'", key)),
    }
}

impl TryFrom<WireModification> for Modification {
    type Error = String;

    fn try_from(wire: WireModification) -> Result<Self, Self::Error> {
        let p = &wire.parameters;
        Ok(match wire.kind.as_str() {
            "delay_order" => Modification::DelayOrder {
                order_id: string_param(p, "orderId")?,
                delay_hours: number_param(p, "delayHours")?,
            },
            "machine_down" => Modification::MachineDown {
                machine_id: string_param(p, "machineId")?,
            },
            "operator_unavailable" => Modification::OperatorUnavailable {
                operator_id: string_param(p, "operatorId")?,
            },
            "task_move" => Modification::TaskMove {
                task_id: string_param(p, "taskId")?,
                new_start_minute: number_param(p, "newStartTime")?.floor() as i64,
            },
            _ => Modification::Custom {
                description: wire.description,
                parameters: wire.parameters,
            },
        })
    }
}

impl From<Modification> for WireModification {
    fn from(m: Modification) -> Self {
        let kind = m.kind().to_string();
        let description = m.description();
        let mut parameters = Map::new();

        match m {
            Modification::DelayOrder {
                order_id,
                delay_hours,
            } => {
                parameters.insert("orderId".into(), Value::from(order_id));
                parameters.insert("delayHours".into(), Value::from(delay_hours));
            }
            Modification::MachineDown { machine_id } => {
                parameters.insert("machineId".into(), Value::from(machine_id));
            }
            Modification::OperatorUnavailable { operator_id } => {
                parameters.insert("operatorId".into(), Value::from(operator_id));
            }
            Modification::TaskMove {
                task_id,
                new_start_minute,
            } => {
                parameters.insert("taskId".into(), Value::from(task_id));
                // The solver accepts minutes as a string
                parameters.insert(
                    "newStartTime".into(),
                    Value::from(new_start_minute.to_string()),
                );
            }
            Modification::Custom {
                parameters: custom, ..
            } => parameters = custom,
        }

        Self {
            kind,
            description,
            parameters,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    #[default]
    Draft,
    Simulated,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactStatus {
    Improved,
    Degraded,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobImpact {
    pub job_id: String,
    pub job_name: String,
    pub end_time_before: String,
    pub end_time_after: String,
    /// Positive means later
    pub delta_hours: f64,
    pub status: ImpactStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalMetrics {
    pub makespan_before: f64,
    pub makespan_after: f64,
    pub makespan_delta: f64,
    pub utilization_before: f64,
    pub utilization_after: f64,
    pub deadlines_met_before: u32,
    pub deadlines_met_after: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImpactAnalysis {
    #[serde(default)]
    pub job_impacts: Vec<JobImpact>,
    #[serde(default)]
    pub global_metrics: GlobalMetrics,
}

impl ImpactAnalysis {
    pub fn count(&self, status: ImpactStatus) -> usize {
        self.job_impacts.iter().filter(|j| j.status == status).count()
    }
}

/// A what-if scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub description: String,
    pub base_schedule_id: String,
    #[serde(default)]
    pub modifications: Vec<Modification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated_schedule: Option<ScheduleResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_analysis: Option<ImpactAnalysis>,
    pub created_at: String,
    #[serde(default)]
    pub status: ScenarioStatus,
}

impl Scenario {
    /// Starts a draft scenario for manual adjustments on a base schedule
    pub fn manual(base_schedule_id: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(EntityKind::Scenario, "manual", now),
            name: "Manual Adjustment".to_string(),
            description: "Drag and drop adjustments".to_string(),
            base_schedule_id: base_schedule_id.unwrap_or("current").to_string(),
            modifications: Vec::new(),
            simulated_schedule: None,
            impact_analysis: None,
            created_at: now.to_rfc3339(),
            status: ScenarioStatus::Draft,
        }
    }

    /// Appends a modification; any previous simulation is now stale
    pub fn push(&mut self, modification: Modification) {
        self.modifications.push(modification);
        self.status = ScenarioStatus::Draft;
    }

    /// Records a simulation result
    pub fn record_simulation(&mut self, schedule: ScheduleResult, impact: Option<ImpactAnalysis>) {
        self.simulated_schedule = Some(schedule);
        self.impact_analysis = impact;
        self.status = ScenarioStatus::Simulated;
    }

    pub fn is_simulated(&self) -> bool {
        self.status == ScenarioStatus::Simulated && self.simulated_schedule.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn task_move_wire_shape() {
        let m = Modification::TaskMove {
            task_id: "ord-1-task-0".to_string(),
            new_start_minute: 90,
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["type"], "task_move");
        assert_eq!(json["parameters"]["taskId"], "ord-1-task-0");
        assert_eq!(json["parameters"]["newStartTime"], "90");
        assert_eq!(json["description"], "Moved task ord-1-task-0 to 09:30");
    }

    #[test]
    fn parse_wire_modifications() {
        let delay: Modification = serde_json::from_value(json!({
            "type": "delay_order",
            "description": "x",
            "parameters": {"orderId": "ord-1", "delayHours": 4}
        }))
        .unwrap();
        assert_eq!(
            delay,
            Modification::DelayOrder {
                order_id: "ord-1".to_string(),
                delay_hours: 4.0
            }
        );

        let moved: Modification = serde_json::from_value(json!({
            "type": "task_move",
            "description": "x",
            "parameters": {"taskId": "t", "newStartTime": "75.9"}
        }))
        .unwrap();
        assert_eq!(
            moved,
            Modification::TaskMove {
                task_id: "t".to_string(),
                new_start_minute: 75
            }
        );
    }

    #[test]
    fn unknown_type_is_custom() {
        let m: Modification = serde_json::from_value(json!({
            "type": "shift_change",
            "description": "Night shift added",
            "parameters": {"shift": "night"}
        }))
        .unwrap();
        assert_eq!(m.kind(), "custom");
        assert_eq!(m.description(), "Night shift added");
    }

    #[test]
    fn missing_parameter_is_an_error() {
        let result: Result<Modification, _> = serde_json::from_value(json!({
            "type": "machine_down",
            "description": "x",
            "parameters": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn format_minute_wraps_around_midnight() {
        assert_eq!(format_minute_of_shift(0), "08:00");
        assert_eq!(format_minute_of_shift(960), "00:00");
        assert_eq!(format_minute_of_shift(-30), "07:30");
        assert_eq!(
            format_minute_of_shift(0),
            format!("{:02}:00", SHIFT_START_HOUR)
        );
    }

    #[test]
    fn push_resets_simulation_status() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let mut scenario = Scenario::manual(None, now);
        assert_eq!(scenario.base_schedule_id, "current");

        scenario.record_simulation(ScheduleResult::default(), None);
        assert!(scenario.is_simulated());

        scenario.push(Modification::MachineDown {
            machine_id: "M1".to_string(),
        });
        assert_eq!(scenario.status, ScenarioStatus::Draft);
        assert!(!scenario.is_simulated());
    }

    #[test]
    fn parse_impact_analysis() {
        let impact: ImpactAnalysis = serde_json::from_value(json!({
            "jobImpacts": [{
                "jobId": "j", "jobName": "J", "endTimeBefore": "a", "endTimeAfter": "b",
                "deltaHours": 1.5, "status": "degraded"
            }],
            "globalMetrics": {"makespanBefore": 100, "makespanAfter": 190, "makespanDelta": 90}
        }))
        .unwrap();
        assert_eq!(impact.count(ImpactStatus::Degraded), 1);
        assert_eq!(impact.global_metrics.makespan_delta, 90.0);
    }
}
