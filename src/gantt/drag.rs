//! Drag-to-reschedule
//!
//! A drag session starts on pointer-down over a draggable task and ends on
//! pointer-up or cancel. Intermediate moves only update the pointer
//! position; the caller hears about the move once, on release, and only if
//! the pointer left the dead zone.
//!
//! Only the time change is reported. The row under the pointer is tracked
//! as a candidate machine so views can highlight it, but a drop never
//! reassigns the machine.

use chrono::{DateTime, Utc};

use super::layout::GanttTask;
use super::timeline::TimeScale;

/// Movement (px, either axis) below which a release counts as a click
pub const DEAD_ZONE_PX: f64 = 5.0;

/// Height of a machine row, used to turn vertical movement into rows
pub const ROW_HEIGHT_PX: f64 = 80.0;

/// Whether moves are committed changes or hypothetical ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GanttMode {
    #[default]
    Production,
    WhatIf,
}

/// Receives the outcome of a drag
pub trait GanttEvents {
    /// Asks the owner to switch into what-if mode before a move lands
    fn request_what_if(&mut self);

    fn task_moved(&mut self, task_id: &str, new_start: DateTime<Utc>, new_end: DateTime<Utc>);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// State of an active drag
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub task_id: String,
    pub origin: Point,
    pub current: Point,
    pub original_start: DateTime<Utc>,
    pub original_end: DateTime<Utc>,
    pub original_machine: String,
}

impl DragSession {
    pub fn delta(&self) -> (f64, f64) {
        (self.current.x - self.origin.x, self.current.y - self.origin.y)
    }

    pub fn has_moved(&self) -> bool {
        let (dx, dy) = self.delta();
        dx.abs() > DEAD_ZONE_PX || dy.abs() > DEAD_ZONE_PX
    }

    /// Where the task would land if released now
    pub fn preview(&self, scale: &TimeScale, rows: &[String]) -> DropTarget {
        let (dx, dy) = self.delta();
        let new_start = self.original_start + scale.duration_for(dx);
        let new_end = new_start + (self.original_end - self.original_start);

        DropTarget {
            task_id: self.task_id.clone(),
            new_start,
            new_end,
            candidate_machine: candidate_row(rows, &self.original_machine, dy),
        }
    }
}

/// Where a dragged task lands
#[derive(Debug, Clone, PartialEq)]
pub struct DropTarget {
    pub task_id: String,
    pub new_start: DateTime<Utc>,
    pub new_end: DateTime<Utc>,
    /// Row under the pointer, for display only
    pub candidate_machine: String,
}

/// Row reached by moving `dy` pixels from `machine`, clamped to the chart
fn candidate_row(rows: &[String], machine: &str, dy: f64) -> String {
    let Some(current) = rows.iter().position(|r| r == machine) else {
        return machine.to_string();
    };
    let offset = (dy / ROW_HEIGHT_PX).round() as i64;
    let max = rows.len().saturating_sub(1) as i64;
    let target = (current as i64 + offset).clamp(0, max) as usize;
    rows[target].clone()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Result of a release
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// No session was active
    Idle,
    /// Released inside the dead zone
    Click { task_id: String },
    Moved(DropTarget),
}

/// Drives the drag state machine
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::Dragging(session) => Some(session),
            DragState::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Starts a session on `task_id`
    ///
    /// Ignored (returns false) when a session is already active or the task
    /// is unknown or not draggable.
    pub fn pointer_down(&mut self, tasks: &[GanttTask], task_id: &str, at: Point) -> bool {
        if self.is_dragging() {
            return false;
        }
        let Some(task) = tasks.iter().find(|t| t.id == task_id && t.draggable) else {
            return false;
        };

        self.state = DragState::Dragging(DragSession {
            task_id: task.id.clone(),
            origin: at,
            current: at,
            original_start: task.start,
            original_end: task.end,
            original_machine: task.machine.clone(),
        });
        true
    }

    pub fn pointer_move(&mut self, at: Point) {
        if let DragState::Dragging(session) = &mut self.state {
            session.current = at;
        }
    }

    /// Ends the session and notifies `events` if the task moved
    ///
    /// Outside what-if mode, `request_what_if` fires before `task_moved`.
    pub fn pointer_up(
        &mut self,
        at: Point,
        scale: &TimeScale,
        rows: &[String],
        mode: GanttMode,
        events: &mut dyn GanttEvents,
    ) -> DragOutcome {
        let DragState::Dragging(mut session) = std::mem::take(&mut self.state) else {
            return DragOutcome::Idle;
        };
        session.current = at;

        if !session.has_moved() {
            return DragOutcome::Click {
                task_id: session.task_id,
            };
        }

        let target = session.preview(scale, rows);
        if mode != GanttMode::WhatIf {
            events.request_what_if();
        }
        events.task_moved(&target.task_id, target.new_start, target.new_end);

        DragOutcome::Moved(target)
    }

    /// Drops the session without notifying anyone
    pub fn cancel(&mut self) -> Option<DragSession> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(session) => Some(session),
            DragState::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::timeline::ViewMode;
    use chrono::{Duration, TimeZone};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        moves: Vec<(String, DateTime<Utc>, DateTime<Utc>)>,
    }

    impl GanttEvents for Recorder {
        fn request_what_if(&mut self) {
            self.calls.push("what_if".to_string());
        }

        fn task_moved(&mut self, task_id: &str, new_start: DateTime<Utc>, new_end: DateTime<Utc>) {
            self.calls.push("moved".to_string());
            self.moves.push((task_id.to_string(), new_start, new_end));
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap()
    }

    fn task(id: &str, machine: &str, draggable: bool) -> GanttTask {
        GanttTask {
            id: id.to_string(),
            name: id.to_string(),
            machine: machine.to_string(),
            start: t0(),
            end: t0() + Duration::minutes(45),
            color: None,
            draggable,
        }
    }

    fn rows() -> Vec<String> {
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    }

    /// 0.01 px per millisecond
    fn scale() -> TimeScale {
        TimeScale::with_density(t0() - Duration::hours(1), 0.01)
    }

    #[test]
    fn move_shifts_by_delta_and_keeps_duration() {
        let tasks = vec![task("t1", "A", true)];
        // Hour view at zoom 1: 100 px per hour, so 50 px is 30 minutes
        let scale = TimeScale::fit([(t0(), t0())], ViewMode::Hour, 1.0).unwrap();
        let mut drag = DragController::new();
        let mut events = Recorder::default();

        assert!(drag.pointer_down(&tasks, "t1", Point::new(100.0, 10.0)));
        drag.pointer_move(Point::new(120.0, 12.0));
        let outcome = drag.pointer_up(
            Point::new(150.0, 10.0),
            &scale,
            &rows(),
            GanttMode::WhatIf,
            &mut events,
        );

        let DragOutcome::Moved(target) = outcome else {
            panic!("expected a move, got {:?}", outcome);
        };
        assert_eq!(target.new_start, t0() + Duration::minutes(30));
        assert_eq!(target.new_end - target.new_start, Duration::minutes(45));
        assert_eq!(events.calls, vec!["moved"]);
        assert_eq!(events.moves[0].0, "t1");
        assert!(!drag.is_dragging());
    }

    #[test]
    fn fifty_pixels_at_one_hundredth_px_per_ms_is_five_seconds() {
        let session = DragSession {
            task_id: "t1".to_string(),
            origin: Point::new(0.0, 0.0),
            current: Point::new(50.0, 0.0),
            original_start: t0(),
            original_end: t0() + Duration::minutes(10),
            original_machine: "A".to_string(),
        };

        let target = session.preview(&scale(), &rows());
        assert_eq!(target.new_start, t0() + Duration::milliseconds(5000));
        assert_eq!(target.new_end - target.new_start, Duration::minutes(10));
        assert_eq!(target.candidate_machine, "A");
    }

    #[test]
    fn release_in_dead_zone_is_a_click() {
        let tasks = vec![task("t1", "A", true)];
        let mut drag = DragController::new();
        let mut events = Recorder::default();

        drag.pointer_down(&tasks, "t1", Point::new(10.0, 10.0));
        let outcome = drag.pointer_up(
            Point::new(15.0, 5.0),
            &scale(),
            &rows(),
            GanttMode::Production,
            &mut events,
        );

        assert_eq!(
            outcome,
            DragOutcome::Click {
                task_id: "t1".to_string()
            }
        );
        assert!(events.calls.is_empty());
        assert!(!drag.is_dragging());
    }

    #[test]
    fn production_mode_requests_what_if_first() {
        let tasks = vec![task("t1", "A", true)];
        let mut drag = DragController::new();
        let mut events = Recorder::default();

        drag.pointer_down(&tasks, "t1", Point::new(0.0, 0.0));
        drag.pointer_up(
            Point::new(0.0, 6.0),
            &scale(),
            &rows(),
            GanttMode::Production,
            &mut events,
        );

        assert_eq!(events.calls, vec!["what_if", "moved"]);
        // Vertical only: time unchanged
        assert_eq!(events.moves[0].1, t0());
    }

    #[test]
    fn non_draggable_and_unknown_tasks_are_ignored() {
        let tasks = vec![task("locked", "A", false)];
        let mut drag = DragController::new();
        assert!(!drag.pointer_down(&tasks, "locked", Point::new(0.0, 0.0)));
        assert!(!drag.pointer_down(&tasks, "missing", Point::new(0.0, 0.0)));
        assert_eq!(drag.state(), &DragState::Idle);
    }

    #[test]
    fn second_pointer_down_is_ignored() {
        let tasks = vec![task("t1", "A", true), task("t2", "B", true)];
        let mut drag = DragController::new();
        assert!(drag.pointer_down(&tasks, "t1", Point::new(0.0, 0.0)));
        assert!(!drag.pointer_down(&tasks, "t2", Point::new(0.0, 0.0)));
        assert_eq!(drag.session().unwrap().task_id, "t1");
    }

    #[test]
    fn cancel_discards_without_events() {
        let tasks = vec![task("t1", "A", true)];
        let mut drag = DragController::new();
        let mut events = Recorder::default();

        drag.pointer_down(&tasks, "t1", Point::new(0.0, 0.0));
        drag.pointer_move(Point::new(300.0, 0.0));
        assert!(drag.cancel().is_some());

        let outcome = drag.pointer_up(
            Point::new(300.0, 0.0),
            &scale(),
            &rows(),
            GanttMode::Production,
            &mut events,
        );
        assert_eq!(outcome, DragOutcome::Idle);
        assert!(events.calls.is_empty());
    }

    #[test]
    fn candidate_machine_follows_vertical_movement() {
        let tasks = vec![task("t1", "B", true)];
        let mut drag = DragController::new();
        drag.pointer_down(&tasks, "t1", Point::new(0.0, 0.0));

        drag.pointer_move(Point::new(0.0, 90.0));
        let preview = drag.session().unwrap().preview(&scale(), &rows());
        assert_eq!(preview.candidate_machine, "C");

        drag.pointer_move(Point::new(0.0, -500.0));
        let preview = drag.session().unwrap().preview(&scale(), &rows());
        assert_eq!(preview.candidate_machine, "A");
    }
}
