//! Chart layout
//!
//! Builds the displayable task list from a schedule and places each task
//! on its machine row.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{palette_color, FactoryConfig, ScheduleResult};

use super::timeline::{Span, TimeScale, ViewMode};

/// A task as drawn on the chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GanttTask {
    pub id: String,
    pub name: String,
    /// Machine display name (the row key)
    pub machine: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub draggable: bool,
}

impl GanttTask {
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Converts schedule tasks into chart tasks
///
/// Tasks referencing a machine missing from the configuration are dropped,
/// and so are tasks whose times cannot be placed on a calendar. The rest
/// are keyed by the machine's display name. Every task can be dragged,
/// whether a move is accepted is up to the caller.
pub fn gantt_tasks(
    schedule: &ScheduleResult,
    config: &FactoryConfig,
    anchor: DateTime<Utc>,
) -> Vec<GanttTask> {
    schedule
        .tasks
        .iter()
        .filter_map(|task| config.machine(&task.line).map(|machine| (task, machine)))
        .enumerate()
        .filter_map(|(index, (task, machine))| {
            let start = task.start_at(anchor)?;
            let end = task.end_at(anchor)?;
            Some(GanttTask {
                id: task.id.clone(),
                name: if task.name.is_empty() {
                    task.id.clone()
                } else {
                    task.name.clone()
                },
                machine: machine.name.clone(),
                start,
                end: end.max(start),
                color: Some(
                    task.color
                        .clone()
                        .unwrap_or_else(|| palette_color(index).to_string()),
                ),
                draggable: true,
            })
        })
        .collect()
}

/// Distinct machines referenced by the tasks, sorted
pub fn machine_rows(tasks: &[GanttTask]) -> Vec<String> {
    let mut rows: Vec<String> = tasks.iter().map(|t| t.machine.clone()).collect();
    rows.sort();
    rows.dedup();
    rows
}

/// A placed task bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub task_id: String,
    pub row: usize,
    #[serde(flatten)]
    pub span: Span,
}

/// Rows, scale and bars for one task list
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub rows: Vec<String>,
    pub bars: Vec<Bar>,
    /// `None` when there is nothing to draw
    pub scale: Option<TimeScale>,
}

impl Layout {
    pub fn compute(tasks: &[GanttTask], view: ViewMode, zoom: f64) -> Self {
        let rows = machine_rows(tasks);
        let scale = TimeScale::fit(tasks.iter().map(|t| (t.start, t.end)), view, zoom);

        let bars = match &scale {
            Some(scale) => tasks
                .iter()
                .filter_map(|task| {
                    let row = rows.iter().position(|r| *r == task.machine)?;
                    Some(Bar {
                        task_id: task.id.clone(),
                        row,
                        span: scale.span(task.start, task.end),
                    })
                })
                .collect(),
            None => Vec::new(),
        };

        Self { rows, bars, scale }
    }

    pub fn is_empty(&self) -> bool {
        self.scale.is_none()
    }

    pub fn row_of(&self, machine: &str) -> Option<usize> {
        self.rows.iter().position(|r| r == machine)
    }

    pub fn bar(&self, task_id: &str) -> Option<&Bar> {
        self.bars.iter().find(|b| b.task_id == task_id)
    }
}
