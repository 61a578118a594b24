//! Schedule model
//!
//! A schedule is the solver's task placement. Times are minutes relative to
//! the shift start (08:00 local on the day being planned); the Gantt layer
//! turns them into instants.

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hour of day the planning horizon starts at
pub const SHIFT_START_HOUR: u32 = 8;

/// Returns 08:00 local time on the given day, as a UTC instant
pub fn shift_start_on(day: DateTime<Local>) -> DateTime<Utc> {
    let naive = day
        .date_naive()
        .and_time(NaiveTime::from_hms_opt(SHIFT_START_HOUR, 0, 0).unwrap_or_default());
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| day.with_timezone(&Utc))
}

/// Returns today's shift start
pub fn shift_start() -> DateTime<Utc> {
    shift_start_on(Local::now())
}

/// Converts an instant into whole minutes from the shift start (floored)
pub fn minutes_from(anchor: DateTime<Utc>, instant: DateTime<Utc>) -> i64 {
    (instant - anchor).num_milliseconds().div_euclid(60_000)
}

/// A task placed by the solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    #[serde(alias = "task_id")]
    pub id: String,
    #[serde(default, alias = "job_id")]
    pub job_id: String,
    #[serde(default, alias = "job_name")]
    pub job_name: String,
    #[serde(default, alias = "task_name")]
    pub name: String,
    /// Machine ID or name
    #[serde(default, alias = "line_id", alias = "machine")]
    pub line: String,
    /// Minutes from shift start
    #[serde(default)]
    pub start: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    /// Minutes; when absent the task is shown as one hour long
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_start: Option<i64>,
}

impl ScheduledTask {
    /// Default length for tasks the solver sent without a duration
    pub const DEFAULT_DURATION_MINUTES: f64 = 60.0;

    pub fn duration_minutes(&self) -> f64 {
        self.duration
            .or_else(|| self.end.map(|end| end - self.start))
            .unwrap_or(Self::DEFAULT_DURATION_MINUTES)
    }

    pub fn end_minute(&self) -> f64 {
        self.start + self.duration_minutes()
    }

    /// Absolute start instant, given the shift start
    ///
    /// `None` when the offset falls outside the representable range.
    pub fn start_at(&self, anchor: DateTime<Utc>) -> Option<DateTime<Utc>> {
        anchor.checked_add_signed(minutes(self.start)?)
    }

    pub fn end_at(&self, anchor: DateTime<Utc>) -> Option<DateTime<Utc>> {
        anchor.checked_add_signed(minutes(self.end_minute())?)
    }
}

fn minutes(m: f64) -> Option<Duration> {
    let ms = (m * 60_000.0).round();
    if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(ms as i64)
}

/// A complete schedule snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub tasks: Vec<ScheduledTask>,
    #[serde(default)]
    pub makespan: f64,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ScheduleResult {
    /// Makespan computed from the tasks (latest end, or 0 when empty)
    pub fn computed_makespan(&self) -> f64 {
        self.tasks
            .iter()
            .map(ScheduledTask::end_minute)
            .fold(0.0, f64::max)
    }

    pub fn task(&self, id: &str) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Tasks assigned to the operator named `name`, earliest first
    pub fn operator_tasks(&self, name: &str) -> Vec<&ScheduledTask> {
        let mut tasks: Vec<_> = self
            .tasks
            .iter()
            .filter(|t| t.operator_name.as_deref() == Some(name))
            .collect();
        tasks.sort_by(|a, b| a.start.total_cmp(&b.start));
        tasks
    }

    /// Builds a schedule from a solver answer, flattening nested jobs
    pub fn from_solver(
        id: Option<String>,
        tasks: &[Value],
        makespan: Option<f64>,
        logs: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        let tasks = flatten_solver_tasks(tasks)?;
        let mut schedule = Self {
            id,
            tasks,
            makespan: 0.0,
            logs,
            updated_at: Some(now.to_rfc3339()),
        };
        schedule.makespan = makespan.unwrap_or_else(|| schedule.computed_makespan());
        Ok(schedule)
    }
}

/// Flattens the solver's task list
///
/// The solver returns `jobs[].tasks[]`; each nested task inherits the job's
/// name and color. Entries without a `tasks` array are taken as flat tasks.
pub fn flatten_solver_tasks(entries: &[Value]) -> Result<Vec<ScheduledTask>, serde_json::Error> {
    let mut flat = Vec::new();

    for entry in entries {
        match entry.get("tasks").and_then(Value::as_array) {
            Some(nested) => {
                let job_name = entry.get("name").and_then(Value::as_str).unwrap_or_default();
                let job_id = entry.get("id").and_then(Value::as_str).unwrap_or_default();
                let job_color = entry.get("color").and_then(Value::as_str);

                for raw in nested {
                    let mut task: ScheduledTask = serde_json::from_value(raw.clone())?;
                    task.job_name = job_name.to_string();
                    if task.job_id.is_empty() {
                        task.job_id = job_id.to_string();
                    }
                    if task.color.is_none() {
                        task.color = job_color.map(str::to_string);
                    }
                    flat.push(task);
                }
            }
            None => flat.push(serde_json::from_value(entry.clone())?),
        }
    }

    Ok(flat)
}
