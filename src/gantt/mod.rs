//! Gantt chart core
//!
//! Pure layout and interaction logic shared by the offline renderer and the
//! interactive dashboard. Pixels here are abstract units; front ends decide
//! how many of them fit in a terminal cell.

mod chart;
mod drag;
mod layout;
mod overlay;
mod timeline;

pub use chart::{Chart, ChartSnapshot};
pub use drag::{
    DragController, DragOutcome, DragSession, DragState, DropTarget, GanttEvents, GanttMode, Point,
    DEAD_ZONE_PX, ROW_HEIGHT_PX,
};
pub use layout::{gantt_tasks, machine_rows, Bar, GanttTask, Layout};
pub use overlay::{
    availability_masks, closed_minutes, setup_gaps, AvailabilityMask, SetupGap, HORIZON_MINUTES,
    SETUP_TOLERANCE_MINUTES,
};
pub use timeline::{
    clamp_zoom, zoom_in, zoom_out, Span, Tick, TimeScale, ViewMode, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP,
};
