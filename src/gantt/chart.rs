//! A complete chart: tasks, layout and overlays for one schedule

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{FactoryConfig, ScheduleResult};

use super::drag::GanttMode;
use super::layout::{gantt_tasks, Bar, GanttTask, Layout};
use super::overlay::{availability_masks, setup_gaps, AvailabilityMask, SetupGap};
use super::timeline::{clamp_zoom, Tick, ViewMode};

#[derive(Debug, Clone)]
pub struct Chart {
    pub tasks: Vec<GanttTask>,
    pub layout: Layout,
    pub masks: Vec<AvailabilityMask>,
    pub gaps: Vec<SetupGap>,
    pub view: ViewMode,
    pub zoom: f64,
    pub mode: GanttMode,
}

impl Chart {
    pub fn build(
        schedule: &ScheduleResult,
        config: &FactoryConfig,
        anchor: DateTime<Utc>,
        view: ViewMode,
        zoom: f64,
        mode: GanttMode,
    ) -> Self {
        let tasks = gantt_tasks(schedule, config, anchor);
        let zoom = clamp_zoom(zoom);
        let layout = Layout::compute(&tasks, view, zoom);
        let masks = availability_masks(config, anchor);
        let gaps = setup_gaps(&tasks, config);

        Self {
            tasks,
            layout,
            masks,
            gaps,
            view,
            zoom,
            mode,
        }
    }

    /// Re-lays out the same tasks at another view or zoom
    pub fn rescale(&mut self, view: ViewMode, zoom: f64) {
        self.view = view;
        self.zoom = clamp_zoom(zoom);
        self.layout = Layout::compute(&self.tasks, self.view, self.zoom);
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    pub fn task(&self, id: &str) -> Option<&GanttTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn ticks(&self) -> Vec<Tick> {
        self.layout
            .scale
            .map(|scale| scale.ticks(self.view))
            .unwrap_or_default()
    }

    /// Serializable view of the chart
    pub fn snapshot(&self) -> ChartSnapshot<'_> {
        ChartSnapshot {
            view: self.view,
            zoom: self.zoom,
            empty: self.is_empty(),
            total_width: self.layout.scale.map(|s| s.total_width()),
            start: self.layout.scale.map(|s| s.min_time()),
            end: self.layout.scale.map(|s| s.max_time()),
            rows: &self.layout.rows,
            tasks: &self.tasks,
            bars: &self.layout.bars,
            masks: &self.masks,
            setup_gaps: &self.gaps,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChartSnapshot<'a> {
    pub view: ViewMode,
    pub zoom: f64,
    pub empty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    pub rows: &'a [String],
    pub tasks: &'a [GanttTask],
    pub bars: &'a [Bar],
    pub masks: &'a [AvailabilityMask],
    pub setup_gaps: &'a [SetupGap],
}
