//! Active schedule commands

use anyhow::Result;
use clap::Subcommand;

use super::chart_text::clock;
use super::output::Output;
use super::planning;
use super::render::show_chart;
use super::session::Session;
use crate::domain::{shift_start, FactoryConfig, ScheduleResult};
use crate::gantt::{Chart, GanttMode, ViewMode};

#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// List the tasks of the active schedule
    Show,

    /// Solve the current orders and make the result the active schedule
    Optimize,

    /// Draw the active schedule as a Gantt chart
    Gantt {
        /// Time granularity (hour, day, week)
        #[arg(long)]
        view: Option<ViewMode>,

        /// Zoom factor (0.25 to 4)
        #[arg(long)]
        zoom: Option<f64>,

        /// Output width in columns (defaults to the terminal width)
        #[arg(long)]
        width: Option<usize>,
    },
}

pub fn run(cmd: ScheduleCommands, session: &mut Session, output: &Output) -> Result<()> {
    match cmd {
        ScheduleCommands::Show => show(session, output),
        ScheduleCommands::Optimize => optimize(session, output),
        ScheduleCommands::Gantt { view, zoom, width } => gantt(session, output, view, zoom, width),
    }
}

fn machine_name<'a>(config: &'a FactoryConfig, line: &'a str) -> &'a str {
    config.machine(line).map_or(line, |m| m.name.as_str())
}

/// Prints one row per task, ordered by start
pub(super) fn print_tasks(schedule: &ScheduleResult, config: &FactoryConfig) {
    let anchor = shift_start();
    let mut tasks: Vec<_> = schedule.tasks.iter().collect();
    tasks.sort_by(|a, b| a.start.total_cmp(&b.start));

    println!("{:<22} {:<16} {:<6} {:<6} JOB", "TASK", "MACHINE", "START", "END");
    println!("{}", "-".repeat(70));
    for task in tasks {
        println!(
            "{:<22} {:<16} {:<6} {:<6} {}",
            task.id,
            machine_name(config, &task.line),
            task.start_at(anchor).map_or_else(|| "-".to_string(), clock),
            task.end_at(anchor).map_or_else(|| "-".to_string(), clock),
            if task.job_name.is_empty() { &task.job_id } else { &task.job_name }
        );
    }
}

fn show(session: &mut Session, output: &Output) -> Result<()> {
    let snapshot = session.state().snapshot()?;
    let Some(schedule) = &snapshot.schedule else {
        if output.is_json() {
            output.data(&serde_json::Value::Null);
        } else {
            println!("No active schedule (run `plantboard schedule optimize`)");
        }
        return Ok(());
    };

    if output.is_json() {
        output.data(schedule);
        return Ok(());
    }

    println!(
        "Schedule {}: {} tasks, makespan {} min",
        schedule.id.as_deref().unwrap_or("-"),
        schedule.tasks.len(),
        schedule.makespan
    );
    println!();
    print_tasks(schedule, &snapshot.config_or_default());
    Ok(())
}

fn optimize(session: &mut Session, output: &Output) -> Result<()> {
    let (state, solver) = session.planner();
    let schedule = planning::optimize(state, solver, shift_start())?;

    // The draft was built on the previous schedule
    if session.drafts()?.clear()? {
        tracing::info!("discarded what-if draft based on the previous schedule");
    }

    if output.is_json() {
        output.data(&schedule);
        return Ok(());
    }

    output.success(&format!(
        "Optimized: {} tasks, makespan {} min",
        schedule.tasks.len(),
        schedule.makespan
    ));
    if let Some(last) = schedule.logs.last() {
        println!("Solver: {}", last);
    }
    Ok(())
}

fn gantt(
    session: &mut Session,
    output: &Output,
    view: Option<ViewMode>,
    zoom: Option<f64>,
    width: Option<usize>,
) -> Result<()> {
    let view = view.unwrap_or(session.config.gantt.view);
    let zoom = zoom.unwrap_or(session.config.gantt.zoom);

    let snapshot = session.state().snapshot()?;
    let schedule = snapshot.schedule.clone().unwrap_or_default();
    let chart = Chart::build(
        &schedule,
        &snapshot.config_or_default(),
        shift_start(),
        view,
        zoom,
        GanttMode::Production,
    );

    show_chart(&chart, width, output);
    Ok(())
}
