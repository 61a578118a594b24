//! What-if commands
//!
//! Modifications accumulate on a local draft scenario. Each one is
//! simulated as soon as it is added; production only changes on `promote`.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Subcommand;

use super::output::Output;
use super::planning;
use super::schedule::print_tasks;
use super::session::Session;
use crate::domain::{
    shift_start, FactoryConfig, ImpactAnalysis, ImpactStatus, Modification, Scenario,
    SHIFT_START_HOUR,
};

#[derive(Subcommand)]
pub enum WhatIfCommands {
    /// Move a task to a new start time
    Move {
        /// Task ID
        task: String,

        /// New start: minutes from the shift start, or a wall-clock HH:MM
        #[arg(long, allow_hyphen_values = true)]
        start: String,
    },

    /// Delay an order
    Delay {
        /// Order ID
        order: String,

        #[arg(long)]
        hours: f64,
    },

    /// Take a machine out of service
    MachineDown {
        /// Machine ID or name
        machine: String,
    },

    /// Mark an operator as unavailable
    OperatorOff {
        /// Operator ID or name
        operator: String,
    },

    /// Show the draft scenario and its impact
    Show,

    /// Make the simulated schedule the production schedule
    Promote,

    /// Throw the draft away
    Discard,
}

pub fn run(cmd: WhatIfCommands, session: &mut Session, output: &Output) -> Result<()> {
    match cmd {
        WhatIfCommands::Move { task, start } => {
            let new_start_minute = parse_start(&start)?;
            let schedule = session.state().snapshot()?.schedule.clone().unwrap_or_default();
            if schedule.task(&task).is_none() {
                bail!("Task not found in the active schedule: {}", task);
            }
            modify(
                session,
                output,
                Modification::TaskMove {
                    task_id: task,
                    new_start_minute,
                },
            )
        }
        WhatIfCommands::Delay { order, hours } => {
            if !hours.is_finite() || hours <= 0.0 {
                bail!("Delay must be a positive number of hours");
            }
            if !session.state().snapshot()?.orders.iter().any(|o| o.id == order) {
                bail!("Order not found: {}", order);
            }
            modify(
                session,
                output,
                Modification::DelayOrder {
                    order_id: order,
                    delay_hours: hours,
                },
            )
        }
        WhatIfCommands::MachineDown { machine } => {
            let config = session.state().snapshot()?.config_or_default();
            let modification = machine_down(&config, &machine)?;
            modify(session, output, modification)
        }
        WhatIfCommands::OperatorOff { operator } => {
            let config = session.state().snapshot()?.config_or_default();
            let modification = operator_off(&config, &operator)?;
            modify(session, output, modification)
        }
        WhatIfCommands::Show => show(session, output),
        WhatIfCommands::Promote => promote(session, output),
        WhatIfCommands::Discard => {
            if session.drafts()?.clear()? {
                output.success("Discarded what-if draft");
            } else {
                output.success("No what-if draft to discard");
            }
            Ok(())
        }
    }
}

/// Parses minutes from the shift start, or a wall-clock `HH:MM`
fn parse_start(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    match raw.split_once(':') {
        Some((hours, minutes)) => {
            let hours: i64 = hours.parse().with_context(|| format!("Invalid time '{}'", raw))?;
            let minutes: i64 = minutes.parse().with_context(|| format!("Invalid time '{}'", raw))?;
            if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
                bail!("Invalid time '{}'", raw);
            }
            Ok(hours * 60 + minutes - i64::from(SHIFT_START_HOUR) * 60)
        }
        None => raw
            .parse()
            .with_context(|| format!("Invalid start '{}': expected minutes or HH:MM", raw)),
    }
}

/// Draft scenario, or a fresh one on the active schedule
fn current_draft(session: &mut Session) -> Result<Scenario> {
    let base = session
        .state()
        .snapshot()?
        .schedule
        .as_ref()
        .and_then(|s| s.id.clone());
    session
        .drafts()?
        .load_or_else(|| Scenario::manual(base.as_deref(), Utc::now()))
}

fn modify(session: &mut Session, output: &Output, modification: Modification) -> Result<()> {
    let description = modification.description();
    let mut scenario = current_draft(session)?;

    let (state, solver) = session.planner();
    let simulated = planning::apply(state, solver, &mut scenario, modification, shift_start());

    session.drafts()?.save(&scenario)?;
    simulated?;

    if output.is_json() {
        output.data(&scenario);
        return Ok(());
    }

    output.success(&format!("{} ({} modification(s) in draft)", description, scenario.modifications.len()));
    if let Some(impact) = &scenario.impact_analysis {
        output.lines(&impact_summary(impact));
    }
    Ok(())
}

/// Human-readable impact lines
pub(super) fn impact_summary(impact: &ImpactAnalysis) -> Vec<String> {
    let m = &impact.global_metrics;
    vec![
        format!(
            "Makespan: {} -> {} min ({:+})",
            m.makespan_before, m.makespan_after, m.makespan_delta
        ),
        format!(
            "Utilization: {:.0}% -> {:.0}%",
            m.utilization_before * 100.0,
            m.utilization_after * 100.0
        ),
        format!("Deadlines met: {} -> {}", m.deadlines_met_before, m.deadlines_met_after),
        format!(
            "Jobs: {} improved, {} degraded, {} unchanged",
            impact.count(ImpactStatus::Improved),
            impact.count(ImpactStatus::Degraded),
            impact.count(ImpactStatus::Neutral)
        ),
    ]
}

fn show(session: &mut Session, output: &Output) -> Result<()> {
    let Some(scenario) = session.drafts()?.load()? else {
        if output.is_json() {
            output.data(&serde_json::Value::Null);
        } else {
            println!("No what-if draft");
        }
        return Ok(());
    };

    if output.is_json() {
        output.data(&scenario);
        return Ok(());
    }

    println!("{} [{:?}] on {}", scenario.name, scenario.status, scenario.base_schedule_id);
    for (i, modification) in scenario.modifications.iter().enumerate() {
        println!("  {}. {}", i + 1, modification.description());
    }

    if let Some(impact) = &scenario.impact_analysis {
        println!();
        for line in impact_summary(impact) {
            println!("{}", line);
        }
        for job in impact.job_impacts.iter().filter(|j| j.status != ImpactStatus::Neutral) {
            println!("  {:<24} {:+.1}h", job.job_name, job.delta_hours);
        }
    }

    if let Some(schedule) = &scenario.simulated_schedule {
        println!();
        let config = session.state().snapshot()?.config_or_default();
        print_tasks(schedule, &config);
    }
    Ok(())
}

fn promote(session: &mut Session, output: &Output) -> Result<()> {
    let drafts = session.drafts()?;
    let mut scenario = drafts.load()?.context("No what-if draft to promote")?;

    session
        .state()
        .promote(&mut scenario)
        .context("Failed to promote scenario")?;
    drafts.clear()?;

    output.success(&format!(
        "Promoted {} modification(s) to production",
        scenario.modifications.len()
    ));
    Ok(())
}

fn machine_down(config: &FactoryConfig, machine: &str) -> Result<Modification> {
    let machine = config
        .machine(machine)
        .with_context(|| format!("Machine not found: {}", machine))?;
    Ok(Modification::MachineDown {
        machine_id: machine.key().to_string(),
    })
}

fn operator_off(config: &FactoryConfig, operator: &str) -> Result<Modification> {
    let operator = config
        .operator(operator)
        .with_context(|| format!("Operator not found: {}", operator))?;
    Ok(Modification::OperatorUnavailable {
        operator_id: operator.key().to_string(),
    })
}
