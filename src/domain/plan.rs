//! Solver request planning
//!
//! Turns the active configuration and the production orders into the
//! request the external solver expects. Only production orders whose
//! product template exists become jobs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::factory::{FactoryConfig, Machine, Operator};
use super::order::{OrderType, ProductionOrder};

/// Job colors, assigned by position when an order has none
pub const JOB_PALETTE: [&str; 10] = [
    "#3b82f6", "#8b5cf6", "#10b981", "#f59e0b", "#ec4899", "#06b6d4", "#6366f1", "#d946ef",
    "#f43f5e", "#84cc16",
];

pub fn palette_color(index: usize) -> &'static str {
    JOB_PALETTE[index % JOB_PALETTE.len()]
}

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("No orders to schedule")]
    NoOrders,

    #[error("No valid jobs to schedule: production orders must reference an existing product")]
    NoJobs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverTask {
    pub id: String,
    pub name: String,
    pub eligible_lines: Vec<String>,
    pub duration: i64,
    pub skill: String,
    pub order: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_start: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverJob {
    pub id: String,
    pub name: String,
    pub tasks: Vec<SolverTask>,
    pub color: String,
    pub priority: u32,
    /// Minutes from shift start; `None` when the deadline already passed
    pub due_date: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverLine {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOperator {
    pub id: String,
    pub name: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRule {
    pub line_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_job_id: Option<String>,
    pub duration: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub resource_id: String,
    pub intervals: Vec<Interval>,
}

/// Body of `POST /solve`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub jobs: Vec<SolverJob>,
    pub lines: Vec<SolverLine>,
    pub operators: Vec<SolverOperator>,
    #[serde(default)]
    pub setup_times: Vec<SetupRule>,
    #[serde(default)]
    pub availabilities: Vec<Availability>,
}

impl SolveRequest {
    /// Plans a solve request
    ///
    /// `shift_start` anchors due dates; orders without a deadline are due
    /// 24 hours after it.
    pub fn build(
        config: &FactoryConfig,
        orders: &[ProductionOrder],
        shift_start: DateTime<Utc>,
    ) -> Result<Self, PlanError> {
        if orders.is_empty() {
            return Err(PlanError::NoOrders);
        }

        let mut jobs: Vec<SolverJob> = Vec::new();

        for order in orders {
            if order.order_type != OrderType::Production || order.product_id.is_none() {
                continue;
            }

            let Some(product) = config.product(order.product_id.as_deref(), order.product_name.as_deref())
            else {
                continue;
            };

            let quantity = order.effective_quantity();
            let deadline = order
                .deadline_instant()
                .unwrap_or(shift_start + Duration::hours(24));
            let due_minutes = (deadline - shift_start).num_seconds().div_euclid(60);

            let tasks = product
                .operations
                .iter()
                .enumerate()
                .map(|(idx, op)| SolverTask {
                    id: format!("{}-task-{}", order.id, idx),
                    name: op.name.clone(),
                    eligible_lines: eligible_lines(&config.machines, &op.machine_capability_required),
                    duration: (op.duration_minutes * quantity).ceil() as i64,
                    skill: if op.machine_capability_required.is_empty() {
                        "general".to_string()
                    } else {
                        op.machine_capability_required.clone()
                    },
                    order: idx,
                    manual_start: None,
                })
                .collect();

            let color = order
                .color
                .clone()
                .unwrap_or_else(|| palette_color(jobs.len()).to_string());

            jobs.push(SolverJob {
                id: order.id.clone(),
                name: format!(
                    "{} (Qty: {})",
                    order.product_name.as_deref().unwrap_or(&product.name),
                    quantity
                ),
                tasks,
                color,
                priority: order.priority.weight(),
                due_date: (due_minutes > 0).then_some(due_minutes),
            });
        }

        if jobs.is_empty() {
            return Err(PlanError::NoJobs);
        }

        Ok(Self {
            jobs,
            lines: config.machines.iter().map(line).collect(),
            operators: config.operators.iter().map(operator).collect(),
            setup_times: config
                .constraints
                .setup_times
                .iter()
                .map(|s| SetupRule {
                    line_id: s.machine.clone(),
                    from_job_id: s.from_product.clone(),
                    to_job_id: s.to_product.clone(),
                    duration: s.duration_minutes.ceil() as i64,
                })
                .collect(),
            availabilities: config
                .constraints
                .resource_availabilities
                .iter()
                .map(|a| Availability {
                    resource_id: a.resource_id.clone(),
                    intervals: a
                        .shifts
                        .iter()
                        .map(|s| Interval {
                            start: s.start_minute,
                            end: s.end_minute,
                        })
                        .collect(),
                })
                .collect(),
        })
    }
}

/// Machines able to run an operation; every machine when none declares the capability
fn eligible_lines(machines: &[Machine], capability: &str) -> Vec<String> {
    let capable: Vec<String> = machines
        .iter()
        .filter(|m| m.has_capability(capability))
        .map(|m| m.key().to_string())
        .collect();

    if capable.is_empty() {
        machines.iter().map(|m| m.key().to_string()).collect()
    } else {
        capable
    }
}

fn line(machine: &Machine) -> SolverLine {
    SolverLine {
        id: machine.key().to_string(),
        name: machine.name.clone(),
    }
}

fn operator(op: &Operator) -> SolverOperator {
    SolverOperator {
        id: op.key().to_string(),
        name: op.name.clone(),
        skills: op.skills.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::factory::{Operation, Product, ResourceAvailability, SetupTime, Shift};
    use crate::domain::order::Priority;
    use chrono::TimeZone;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap()
    }

    fn config() -> FactoryConfig {
        let mut filler = Machine::new("m-fill", "Filler");
        filler.capabilities = vec!["filling".to_string()];
        let capper = Machine::new("m-cap", "Capper");

        let mut config = FactoryConfig {
            machines: vec![filler, capper],
            operators: vec![Operator::new("", "Bob")],
            typical_jobs: vec![Product {
                id: "p-stick".to_string(),
                name: "Stick".to_string(),
                priority: Priority::Normal,
                operations: vec![
                    Operation {
                        id: "op-1".to_string(),
                        name: "Fill".to_string(),
                        machine_capability_required: "filling".to_string(),
                        duration_minutes: 1.5,
                    },
                    Operation {
                        id: "op-2".to_string(),
                        name: "Cap".to_string(),
                        machine_capability_required: "capping".to_string(),
                        duration_minutes: 0.2,
                    },
                ],
                deadline: None,
            }],
            ..Default::default()
        };
        config.constraints.setup_times.push(SetupTime {
            id: "s".to_string(),
            machine: "m-fill".to_string(),
            duration_minutes: 14.2,
            from_product: None,
            to_product: None,
            description: None,
        });
        config
            .constraints
            .resource_availabilities
            .push(ResourceAvailability {
                resource_id: "m-cap".to_string(),
                shifts: vec![Shift::new(0, 480)],
            });
        config
    }

    #[test]
    fn builds_jobs_from_production_orders() {
        let mut order = ProductionOrder::production("ord-1", "p-stick", "Stick", 10.0);
        order.priority = Priority::Urgent;

        let request = SolveRequest::build(&config(), &[order], anchor()).unwrap();
        assert_eq!(request.jobs.len(), 1);

        let job = &request.jobs[0];
        assert_eq!(job.name, "Stick (Qty: 10)");
        assert_eq!(job.priority, 4);
        assert_eq!(job.color, JOB_PALETTE[0]);
        assert_eq!(job.due_date, Some(24 * 60));

        assert_eq!(job.tasks[0].id, "ord-1-task-0");
        assert_eq!(job.tasks[0].duration, 15);
        assert_eq!(job.tasks[0].eligible_lines, vec!["m-fill"]);
        // No machine can cap, so every machine is eligible
        assert_eq!(job.tasks[1].eligible_lines, vec!["m-fill", "m-cap"]);
        assert_eq!(job.tasks[1].duration, 2);
        assert_eq!(job.tasks[1].order, 1);
    }

    #[test]
    fn maps_lines_operators_and_constraints() {
        let order = ProductionOrder::production("ord-1", "p-stick", "Stick", 1.0);
        let request = SolveRequest::build(&config(), &[order], anchor()).unwrap();

        assert_eq!(request.lines[1].id, "m-cap");
        assert_eq!(request.operators[0].id, "Bob");
        assert_eq!(request.setup_times[0].duration, 15);
        assert_eq!(request.availabilities[0].intervals[0].end, 480);

        let json = serde_json::to_value(&request).unwrap();
        assert!(json["setupTimes"][0]["lineId"].is_string());
        assert!(json["jobs"][0]["tasks"][0]["eligibleLines"].is_array());
    }

    #[test]
    fn past_deadline_has_no_due_date() {
        let mut order = ProductionOrder::production("ord-1", "p-stick", "Stick", 1.0);
        order.deadline = Some("2025-03-01".to_string());
        let request = SolveRequest::build(&config(), &[order], anchor()).unwrap();
        assert_eq!(request.jobs[0].due_date, None);
    }

    #[test]
    fn skips_non_production_and_unknown_products() {
        let cleaning = ProductionOrder::of_type("ord-2", OrderType::Cleaning);
        let unknown = ProductionOrder::production("ord-3", "p-missing", "Missing", 1.0);
        assert_eq!(
            SolveRequest::build(&config(), &[cleaning, unknown], anchor()),
            Err(PlanError::NoJobs)
        );
    }

    #[test]
    fn product_name_fallback_links_template() {
        let order = ProductionOrder::production("ord-4", "stale-id", "Stick", 1.0);
        assert!(SolveRequest::build(&config(), &[order], anchor()).is_ok());
    }

    #[test]
    fn empty_orders_rejected() {
        assert_eq!(
            SolveRequest::build(&config(), &[], anchor()),
            Err(PlanError::NoOrders)
        );
    }

    #[test]
    fn palette_wraps() {
        assert_eq!(palette_color(10), palette_color(0));
    }
}
