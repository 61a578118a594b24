//! Chart overlays
//!
//! Closed time derived from declared shifts, and changeover bridges between
//! consecutive tasks that match a configured setup time.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::{FactoryConfig, SetupTime, Shift};

use super::layout::GanttTask;

/// Length of the availability horizon, from the shift start
pub const HORIZON_MINUTES: i64 = 24 * 60;

/// How far an idle gap may be from a setup rule and still match it
pub const SETUP_TOLERANCE_MINUTES: f64 = 2.0;

/// Closed minute ranges `[start, end)` over the horizon for a shift list
///
/// No shifts means no closed time. Shifts are clamped to the horizon and
/// empty ones are ignored; overlapping or touching shifts merge, so the
/// running end only moves forward.
pub fn closed_minutes(shifts: &[Shift]) -> Vec<(i64, i64)> {
    if shifts.is_empty() {
        return Vec::new();
    }

    let mut open: Vec<(i64, i64)> = shifts
        .iter()
        .map(|s| {
            (
                s.start_minute.clamp(0, HORIZON_MINUTES),
                s.end_minute.clamp(0, HORIZON_MINUTES),
            )
        })
        .filter(|(start, end)| end > start)
        .collect();
    open.sort_by_key(|&(start, _)| start);

    let mut closed = Vec::new();
    let mut last_end = 0;
    for (start, end) in open {
        if start > last_end {
            closed.push((last_end, start));
        }
        last_end = last_end.max(end);
    }
    if last_end < HORIZON_MINUTES {
        closed.push((last_end, HORIZON_MINUTES));
    }

    closed
}

/// A closed interval on one resource's timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityMask {
    pub resource_id: String,
    /// Row the mask is drawn on (machine name), when the resource is a machine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Closed intervals for every resource with declared shifts
pub fn availability_masks(config: &FactoryConfig, anchor: DateTime<Utc>) -> Vec<AvailabilityMask> {
    config
        .constraints
        .resource_availabilities
        .iter()
        .flat_map(|availability| {
            let machine = config
                .machine(&availability.resource_id)
                .map(|m| m.name.clone());
            closed_minutes(&availability.shifts)
                .into_iter()
                .map(move |(start, end)| AvailabilityMask {
                    resource_id: availability.resource_id.clone(),
                    machine: machine.clone(),
                    start: anchor + Duration::minutes(start),
                    end: anchor + Duration::minutes(end),
                })
        })
        .collect()
}

/// Idle time between two tasks explained by a setup rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupGap {
    pub machine: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
}

/// Whether a rule covers a machine row (rules may name the machine by ID)
fn rule_covers(rule: &SetupTime, machine: &str, config: &FactoryConfig) -> bool {
    rule.applies_to(machine)
        || config
            .machine(&rule.machine)
            .is_some_and(|m| m.name == machine)
}

/// Finds setup gaps between consecutive tasks on each machine
///
/// The first rule in list order whose duration is within tolerance of the
/// gap wins.
pub fn setup_gaps(tasks: &[GanttTask], config: &FactoryConfig) -> Vec<SetupGap> {
    let rules = &config.constraints.setup_times;
    if rules.is_empty() {
        return Vec::new();
    }

    let mut by_machine: BTreeMap<&str, Vec<&GanttTask>> = BTreeMap::new();
    for task in tasks {
        by_machine.entry(task.machine.as_str()).or_default().push(task);
    }

    let mut gaps = Vec::new();
    for (machine, mut row) in by_machine {
        row.sort_by_key(|t| t.start);

        for pair in row.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            let gap_minutes = (second.start - first.end).num_milliseconds() as f64 / 60_000.0;
            if gap_minutes <= 0.0 {
                continue;
            }

            let matched = rules.iter().find(|rule| {
                rule_covers(rule, machine, config)
                    && (rule.duration_minutes - gap_minutes).abs() < SETUP_TOLERANCE_MINUTES
            });
            if let Some(rule) = matched {
                gaps.push(SetupGap {
                    machine: machine.to_string(),
                    start: first.end,
                    end: second.start,
                    label: format!("{}m", rule.duration_minutes),
                });
            }
        }
    }

    gaps
}
