//! Solving and what-if simulation against the current production state

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::domain::{Modification, Scenario, ScheduleResult, SolveRequest};
use crate::storage::{DocumentStore, Snapshot, Solver, StateStore};

/// Solver request for the stored configuration and orders
pub fn current_request(snapshot: &Snapshot, anchor: DateTime<Utc>) -> Result<SolveRequest> {
    let config = snapshot
        .config
        .as_ref()
        .context("No factory configuration yet; add machines and products first")?;
    Ok(SolveRequest::build(config, &snapshot.orders, anchor)?)
}

/// Runs a full optimization and stores the result as the active schedule
pub fn optimize<S, V>(state: &mut StateStore<S>, solver: &V, anchor: DateTime<Utc>) -> Result<ScheduleResult>
where
    S: DocumentStore,
    V: Solver,
{
    let request = current_request(state.snapshot()?, anchor)?;
    tracing::info!(jobs = request.jobs.len(), lines = request.lines.len(), "optimizing");

    let schedule = solver.solve(&request)?;
    state.save_schedule(Some(schedule.clone()))?;
    Ok(schedule)
}

/// Re-solves the scenario's modifications against the active schedule
pub fn simulate<V: Solver>(
    solver: &V,
    snapshot: &Snapshot,
    scenario: &mut Scenario,
    anchor: DateTime<Utc>,
) -> Result<()> {
    let request = current_request(snapshot, anchor)?;
    let current = snapshot
        .schedule
        .as_ref()
        .map(|s| s.tasks.as_slice())
        .unwrap_or_default();

    let simulation = solver
        .simulate(scenario, &request, current)
        .context("Simulation failed; the modification is kept in the draft")?;
    tracing::debug!(
        scenario = %scenario.id,
        tasks = simulation.schedule.tasks.len(),
        "simulation complete"
    );
    scenario.record_simulation(simulation.schedule, simulation.impact);
    Ok(())
}

/// Adds a modification to the scenario and simulates the result
///
/// The modification stays on the scenario even when the simulation fails.
pub fn apply<S, V>(
    state: &mut StateStore<S>,
    solver: &V,
    scenario: &mut Scenario,
    modification: Modification,
    anchor: DateTime<Utc>,
) -> Result<()>
where
    S: DocumentStore,
    V: Solver,
{
    tracing::info!(change = %modification.description(), "what-if modification");
    scenario.push(modification);
    simulate(solver, state.snapshot()?, scenario, anchor)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::domain::{
        FactoryConfig, Machine, Operation, Priority, Product, ProductionOrder, ScenarioStatus,
        ScheduledTask,
    };
    use crate::storage::{MemoryGateway, Simulation, SolverError};
    use chrono::TimeZone;
    use serde_json::json;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 7, 0, 0).unwrap()
    }

    /// Solver placing every task back to back on the first eligible line
    #[derive(Default)]
    struct StubSolver {
        fail: bool,
        seen_current: Cell<usize>,
    }

    impl StubSolver {
        fn place(request: &SolveRequest) -> ScheduleResult {
            let mut start = 0;
            let mut tasks = Vec::new();
            for job in &request.jobs {
                for task in &job.tasks {
                    tasks.push(
                        serde_json::from_value::<ScheduledTask>(json!({
                            "id": task.id,
                            "jobId": job.id,
                            "name": task.name,
                            "line": task.eligible_lines[0],
                            "start": start,
                            "duration": task.duration
                        }))
                        .unwrap(),
                    );
                    start += task.duration;
                }
            }
            ScheduleResult {
                tasks,
                makespan: start as f64,
                ..Default::default()
            }
        }

        fn failure() -> SolverError {
            SolverError::Failed {
                status: "failed".to_string(),
                message: "infeasible".to_string(),
                logs: vec![],
            }
        }
    }

    impl Solver for StubSolver {
        fn solve(&self, request: &SolveRequest) -> Result<ScheduleResult, SolverError> {
            if self.fail {
                return Err(Self::failure());
            }
            Ok(Self::place(request))
        }

        fn simulate(
            &self,
            _scenario: &Scenario,
            request: &SolveRequest,
            current_tasks: &[ScheduledTask],
        ) -> Result<Simulation, SolverError> {
            self.seen_current.set(current_tasks.len());
            if self.fail {
                return Err(Self::failure());
            }
            Ok(Simulation {
                schedule: Self::place(request),
                impact: None,
            })
        }
    }

    fn seeded_store() -> StateStore<MemoryGateway> {
        let mut press = Machine::new("m-1", "Press");
        press.capabilities = vec!["cut".to_string()];
        let config = FactoryConfig {
            machines: vec![press],
            typical_jobs: vec![Product {
                id: "p-1".to_string(),
                name: "Widget".to_string(),
                priority: Priority::Normal,
                operations: vec![Operation {
                    id: "op-1".to_string(),
                    name: "Cut".to_string(),
                    machine_capability_required: "cut".to_string(),
                    duration_minutes: 30.0,
                }],
                deadline: None,
            }],
            ..Default::default()
        };

        let mut store = StateStore::new(MemoryGateway::default());
        store.update_config(config, "test").unwrap();
        store
            .update_orders(vec![ProductionOrder::production("ord-1", "p-1", "Widget", 2.0)])
            .unwrap();
        store
    }

    #[test]
    fn optimize_stores_the_schedule() {
        let mut store = seeded_store();
        let schedule = optimize(&mut store, &StubSolver::default(), anchor()).unwrap();

        assert_eq!(schedule.tasks.len(), 1);
        assert_eq!(schedule.tasks[0].id, "ord-1-task-0");
        assert_eq!(schedule.makespan, 60.0);

        store.invalidate();
        let stored = store.snapshot().unwrap().schedule.clone().unwrap();
        assert_eq!(stored.tasks.len(), 1);
    }

    #[test]
    fn optimize_without_config_fails() {
        let mut store = StateStore::new(MemoryGateway::default());
        let err = optimize(&mut store, &StubSolver::default(), anchor()).unwrap_err();
        assert!(err.to_string().contains("No factory configuration"));
    }

    #[test]
    fn solver_failure_leaves_schedule_untouched() {
        let mut store = seeded_store();
        let solver = StubSolver {
            fail: true,
            ..Default::default()
        };

        assert!(optimize(&mut store, &solver, anchor()).is_err());
        assert!(store.snapshot().unwrap().schedule.is_none());
    }

    #[test]
    fn apply_simulates_against_current_tasks() {
        let mut store = seeded_store();
        let solver = StubSolver::default();
        optimize(&mut store, &solver, anchor()).unwrap();

        let mut scenario = Scenario::manual(Some("prod-1"), Utc::now());
        apply(
            &mut store,
            &solver,
            &mut scenario,
            Modification::TaskMove {
                task_id: "ord-1-task-0".to_string(),
                new_start_minute: 90,
            },
            anchor(),
        )
        .unwrap();

        assert!(scenario.is_simulated());
        assert_eq!(solver.seen_current.get(), 1);
    }

    #[test]
    fn failed_simulation_keeps_modification() {
        let mut store = seeded_store();
        let solver = StubSolver {
            fail: true,
            ..Default::default()
        };
        let mut scenario = Scenario::manual(None, Utc::now());

        let err = apply(
            &mut store,
            &solver,
            &mut scenario,
            Modification::MachineDown {
                machine_id: "m-1".to_string(),
            },
            anchor(),
        )
        .unwrap_err();

        assert!(format!("{:#}", err).contains("infeasible"));
        assert_eq!(scenario.modifications.len(), 1);
        assert_eq!(scenario.status, ScenarioStatus::Draft);
    }
}
