//! Offline Gantt rendering from local files

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde_json::Value;

use super::chart_text;
use super::output::Output;
use crate::domain::{parse_instant, shift_start, FactoryConfig, ScheduleResult};
use crate::gantt::{Chart, GanttMode, ViewMode};

const FALLBACK_WIDTH: usize = 100;

#[derive(Args)]
pub struct RenderArgs {
    /// Factory configuration (JSON)
    #[arg(long)]
    pub factory: PathBuf,

    /// Schedule or solver response (JSON)
    #[arg(long)]
    pub schedule: PathBuf,

    /// Time granularity (hour, day, week)
    #[arg(long, default_value = "day")]
    pub view: ViewMode,

    /// Zoom factor (0.25 to 4)
    #[arg(long, default_value = "1.0")]
    pub zoom: f64,

    /// Output width in columns (defaults to the terminal width)
    #[arg(long)]
    pub width: Option<usize>,

    /// Shift start the task minutes count from (defaults to 08:00 today)
    #[arg(long)]
    pub anchor: Option<String>,
}

fn read_json(path: &Path, what: &str) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file: {}", what, path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {} file: {}", what, path.display()))
}

/// Reads a schedule: a stored schedule, a solver response with nested
/// jobs, or a bare task array
fn load_schedule(value: &Value, now: DateTime<Utc>) -> Result<ScheduleResult> {
    let (tasks, makespan) = match value {
        Value::Array(tasks) => (tasks.as_slice(), None),
        Value::Object(map) => match map.get("tasks") {
            Some(Value::Array(tasks)) => (tasks.as_slice(), map.get("makespan").and_then(Value::as_f64)),
            Some(_) => bail!("Schedule 'tasks' must be an array"),
            None => (&[][..], None),
        },
        _ => bail!("Schedule must be an object or an array of tasks"),
    };

    let id = value.get("id").and_then(Value::as_str).map(str::to_string);
    ScheduleResult::from_solver(id, tasks, makespan, Vec::new(), now).context("Invalid schedule tasks")
}

fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(FALLBACK_WIDTH)
}

/// Prints a chart as text, or as its serialized snapshot in JSON mode
pub(super) fn show_chart(chart: &Chart, width: Option<usize>, output: &Output) {
    if output.is_json() {
        output.data(&chart.snapshot());
        return;
    }

    let width = width.unwrap_or_else(terminal_width);
    output.lines(&chart_text::render(chart, width));

    if chart.is_empty() {
        return;
    }
    output.blank();
    let mut legend = vec![format!("view {} @ {}x", chart.view, chart.zoom)];
    if !chart.masks.is_empty() {
        legend.push("░ closed".to_string());
    }
    if !chart.gaps.is_empty() {
        legend.push("~ setup".to_string());
    }
    println!("{}", legend.join("   "));
    for gap in &chart.gaps {
        println!(
            "  {} {}-{}: {}",
            gap.machine,
            chart_text::clock(gap.start),
            chart_text::clock(gap.end),
            gap.label
        );
    }
}

pub fn run(args: RenderArgs, output: &Output) -> Result<()> {
    let config: FactoryConfig = serde_json::from_value(read_json(&args.factory, "factory")?)
        .with_context(|| format!("Invalid factory configuration: {}", args.factory.display()))?;
    let schedule = load_schedule(&read_json(&args.schedule, "schedule")?, Utc::now())?;

    let anchor = match &args.anchor {
        Some(raw) => parse_instant(raw).with_context(|| format!("Invalid anchor '{}'", raw))?,
        None => shift_start(),
    };
    output.verbose_ctx(
        "render",
        &format!("{} tasks, {} machines, anchor {}", schedule.tasks.len(), config.machines.len(), anchor),
    );

    let chart = Chart::build(&schedule, &config, anchor, args.view, args.zoom, GanttMode::Production);
    let dropped = schedule.tasks.len().saturating_sub(chart.tasks.len());
    if dropped > 0 {
        output.warn(&format!(
            "{} task(s) reference unknown machines or fall outside the calendar and were skipped",
            dropped
        ));
    }

    show_chart(&chart, args.width, output);
    Ok(())
}
