//! Scheduling solver client
//!
//! The solver is a separate service with two endpoints: `POST /solve` for a
//! full optimization and `POST /whatif/simulate` to re-solve a scenario's
//! modifications against the current request.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{ImpactAnalysis, Scenario, ScheduleResult, ScheduledTask, SolveRequest};

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Solver unreachable: {0}")]
    Transport(String),

    #[error("Solver reported '{status}': {message}")]
    Failed {
        status: String,
        message: String,
        logs: Vec<String>,
    },

    #[error("Invalid solver response: {0}")]
    InvalidResponse(String),
}

impl From<ureq::Error> for SolverError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => SolverError::Status {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => SolverError::Transport(transport.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SolveResponse {
    status: String,
    #[serde(default)]
    makespan: Option<f64>,
    #[serde(default)]
    tasks: Vec<Value>,
    #[serde(default)]
    logs: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    status: String,
    #[serde(default)]
    tasks: Option<Vec<Value>>,
    #[serde(default)]
    simulated_schedule: Option<Value>,
    #[serde(default)]
    impact_analysis: Option<ImpactAnalysis>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    logs: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateRequest<'a> {
    scenario: &'a Scenario,
    current_solve_request: &'a SolveRequest,
    current_tasks: &'a [ScheduledTask],
}

/// Result of a what-if simulation
#[derive(Debug, Clone)]
pub struct Simulation {
    pub schedule: ScheduleResult,
    pub impact: Option<ImpactAnalysis>,
}

fn check_status(status: &str, error: Option<String>, logs: &[String]) -> Result<(), SolverError> {
    if status == "success" {
        return Ok(());
    }
    let message = error
        .or_else(|| logs.last().cloned())
        .unwrap_or_else(|| "Unknown error".to_string());
    Err(SolverError::Failed {
        status: status.to_string(),
        message,
        logs: logs.to_vec(),
    })
}

fn invalid(e: serde_json::Error) -> SolverError {
    SolverError::InvalidResponse(e.to_string())
}

fn parse_solve(body: Value, now: DateTime<Utc>) -> Result<ScheduleResult, SolverError> {
    let response: SolveResponse = serde_json::from_value(body).map_err(invalid)?;
    check_status(&response.status, response.error, &response.logs)?;

    ScheduleResult::from_solver(
        Some(format!("prod-{}", now.timestamp_millis())),
        &response.tasks,
        response.makespan,
        response.logs,
        now,
    )
    .map_err(invalid)
}

/// Reads a simulation answer
///
/// Tasks may sit at the top level or inside `simulatedSchedule`; either way
/// they are flattened.
fn parse_simulation(body: Value, now: DateTime<Utc>) -> Result<Simulation, SolverError> {
    let response: SimulateResponse = serde_json::from_value(body).map_err(invalid)?;
    check_status(&response.status, response.error, &response.logs)?;

    let simulated = response.simulated_schedule.unwrap_or(Value::Null);
    let tasks = match response.tasks {
        Some(tasks) => tasks,
        None => simulated
            .get("tasks")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    };
    let makespan = simulated.get("makespan").and_then(Value::as_f64);
    let logs = simulated
        .get("logs")
        .and_then(|l| serde_json::from_value::<Vec<String>>(l.clone()).ok())
        .unwrap_or_default();

    let schedule = ScheduleResult::from_solver(None, &tasks, makespan, logs, now).map_err(invalid)?;
    Ok(Simulation {
        schedule,
        impact: response.impact_analysis,
    })
}

pub trait Solver {
    fn solve(&self, request: &SolveRequest) -> Result<ScheduleResult, SolverError>;

    fn simulate(
        &self,
        scenario: &Scenario,
        request: &SolveRequest,
        current_tasks: &[ScheduledTask],
    ) -> Result<Simulation, SolverError>;
}

pub struct SolverClient {
    agent: ureq::Agent,
    base_url: String,
}

impl SolverClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Value, SolverError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "solver request");

        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_json(body)
            .map_err(|e| {
                let err = SolverError::from(e);
                tracing::warn!(%url, error = %err, "solver call failed");
                err
            })?;

        response
            .into_json::<Value>()
            .map_err(|e| SolverError::InvalidResponse(e.to_string()))
    }
}

impl Solver for SolverClient {
    fn solve(&self, request: &SolveRequest) -> Result<ScheduleResult, SolverError> {
        let body = self.post("/solve", request)?;
        let schedule = parse_solve(body, Utc::now())?;
        tracing::info!(tasks = schedule.tasks.len(), makespan = schedule.makespan, "solve complete");
        Ok(schedule)
    }

    fn simulate(
        &self,
        scenario: &Scenario,
        request: &SolveRequest,
        current_tasks: &[ScheduledTask],
    ) -> Result<Simulation, SolverError> {
        let body = self.post(
            "/whatif/simulate",
            &SimulateRequest {
                scenario,
                current_solve_request: request,
                current_tasks,
            },
        )?;
        parse_simulation(body, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    #[test]
    fn successful_solve_is_flattened() {
        let body = json!({
            "status": "success",
            "makespan": 120,
            "tasks": [
                {"id": "ord-1-task-0", "jobId": "ord-1", "name": "Cut", "line": "m-1", "start": 0, "end": 60, "duration": 60},
                {"id": "ord-1", "name": "Widgets", "color": "#fff", "tasks": [
                    {"id": "ord-1-task-1", "name": "Paint", "line": "m-2", "start": 60, "duration": 60}
                ]}
            ],
            "logs": ["Solver Status: OPTIMAL"]
        });

        let schedule = parse_solve(body, now()).unwrap();
        assert_eq!(schedule.tasks.len(), 2);
        assert_eq!(schedule.makespan, 120.0);
        assert_eq!(schedule.tasks[1].job_name, "Widgets");
        assert_eq!(schedule.tasks[1].color.as_deref(), Some("#fff"));
        assert_eq!(schedule.id.as_deref(), Some(format!("prod-{}", now().timestamp_millis()).as_str()));
    }

    #[test]
    fn failed_solve_carries_logs() {
        let body = json!({
            "status": "failed",
            "logs": ["Solver Status: INFEASIBLE", "Infeasible constraints."]
        });

        match parse_solve(body, now()) {
            Err(SolverError::Failed { status, message, logs }) => {
                assert_eq!(status, "failed");
                assert_eq!(message, "Infeasible constraints.");
                assert_eq!(logs.len(), 2);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn simulation_reads_nested_schedule() {
        let body = json!({
            "status": "success",
            "simulatedSchedule": {
                "tasks": [{"id": "t", "line": "m-1", "start": 30, "duration": 60}],
                "makespan": 90,
                "logs": ["ok"]
            },
            "impactAnalysis": {
                "jobImpacts": [],
                "globalMetrics": {
                    "makespanBefore": 60, "makespanAfter": 90, "makespanDelta": 30,
                    "utilizationBefore": 0.5, "utilizationAfter": 0.4,
                    "deadlinesMetBefore": 1, "deadlinesMetAfter": 1
                }
            }
        });

        let sim = parse_simulation(body, now()).unwrap();
        assert_eq!(sim.schedule.tasks.len(), 1);
        assert_eq!(sim.schedule.makespan, 90.0);
        assert_eq!(sim.schedule.logs, vec!["ok".to_string()]);
        assert_eq!(sim.impact.unwrap().global_metrics.makespan_delta, 30.0);
    }

    #[test]
    fn simulation_error_message_is_surfaced() {
        let body = json!({"status": "error", "error": "boom"});
        let err = parse_simulation(body, now()).unwrap_err();
        assert_eq!(err.to_string(), "Solver reported 'error': boom");
    }

    #[test]
    fn simulate_request_shape() {
        let scenario = Scenario::manual(None, now());
        let request = SolveRequest {
            jobs: vec![],
            lines: vec![],
            operators: vec![],
            setup_times: vec![],
            availabilities: vec![],
        };
        let body = serde_json::to_value(SimulateRequest {
            scenario: &scenario,
            current_solve_request: &request,
            current_tasks: &[],
        })
        .unwrap();

        assert!(body.get("scenario").is_some());
        assert!(body["currentSolveRequest"]["jobs"].is_array());
        assert!(body["currentTasks"].as_array().unwrap().is_empty());
    }
}
