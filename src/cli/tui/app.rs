//! Dashboard state and logic
//!
//! Input handling only queues [`Action`]s; anything touching the gateway or
//! the solver runs afterwards in [`App::process`], so failures end up on the
//! status line instead of tearing the dashboard down.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::prelude::*;

use super::event::{Event, EventHandler};
use super::ui::Terminal;
use super::views;
use crate::cli::chart_text::{clock, Viewport, LABEL_WIDTH};
use crate::cli::planning;
use crate::cli::session::Session;
use crate::domain::{minutes_from, shift_start, FactoryConfig, Modification, Scenario, ScheduleResult};
use crate::gantt::{
    zoom_in, zoom_out, Bar, Chart, DragController, DragOutcome, DropTarget, GanttEvents, GanttMode,
    GanttTask, Point, ViewMode, ROW_HEIGHT_PX,
};
use crate::storage::{DocumentStore, DraftStore, Solver, StateStore};

/// Chart pixels per terminal column
pub const COLUMN_PX: f64 = 10.0;

/// Columns moved per scroll step
const SCROLL_COLUMNS: f64 = 8.0;

const HELP: &str = "[j/k]rows [h/l]tasks [m]ove [/]scroll [+/-]zoom [v]iew [w]hat-if [p]romote [x]discard [o]ptimize [r]eload [q]uit";

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Keyboard drag of the selected task
    Move,
    Confirm(ConfirmAction),
}

/// Confirmation actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    Promote,
    Discard,
    Optimize,
}

impl ConfirmAction {
    fn prompt(&self) -> &'static str {
        match self {
            ConfirmAction::Promote => "Promote the what-if schedule to production? [y/n]",
            ConfirmAction::Discard => "Discard the what-if draft? [y/n]",
            ConfirmAction::Optimize => "Re-optimize all orders and replace the schedule? [y/n]",
        }
    }

    fn action(self) -> Action {
        match self {
            ConfirmAction::Promote => Action::Promote,
            ConfirmAction::Discard => Action::Discard,
            ConfirmAction::Optimize => Action::Optimize,
        }
    }
}

/// Work queued by input handling
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    EnterWhatIf,
    MoveTask {
        task_id: String,
        new_start: DateTime<Utc>,
    },
    Promote,
    Discard,
    Optimize,
    Reload,
}

/// Collects chart callbacks as actions
#[derive(Debug, Default)]
struct Pending(Vec<Action>);

impl GanttEvents for Pending {
    fn request_what_if(&mut self) {
        self.0.push(Action::EnterWhatIf);
    }

    fn task_moved(&mut self, task_id: &str, new_start: DateTime<Utc>, _new_end: DateTime<Utc>) {
        self.0.push(Action::MoveTask {
            task_id: task_id.to_string(),
            new_start,
        });
    }
}

/// Production state shown by the dashboard
#[derive(Debug, Default)]
pub struct Board {
    pub config: FactoryConfig,
    pub production: ScheduleResult,
    pub scenario: Option<Scenario>,
}

/// Application state
pub struct App {
    board: Board,

    /// Shift start the schedule minutes count from
    anchor: DateTime<Utc>,

    chart: Chart,

    /// Production or what-if display
    mode: GanttMode,

    drag: DragController,

    pending: Pending,

    /// Selected task ID
    selected: Option<String>,

    /// Horizontal scroll in chart pixels
    scroll_px: f64,

    /// First machine row on screen
    row_scroll: usize,

    /// Last known terminal area
    screen: Rect,

    input_mode: InputMode,

    /// Status message to display
    status_message: Option<String>,

    /// Whether to quit
    should_quit: bool,
}

impl App {
    /// Create an application over already loaded state
    pub fn new(board: Board, anchor: DateTime<Utc>, view: ViewMode, zoom: f64) -> Self {
        let chart = Chart::build(
            &board.production,
            &board.config,
            anchor,
            view,
            zoom,
            GanttMode::Production,
        );
        let mut app = Self {
            board,
            anchor,
            chart,
            mode: GanttMode::Production,
            drag: DragController::new(),
            pending: Pending::default(),
            selected: None,
            scroll_px: 0.0,
            row_scroll: 0,
            screen: Rect::new(0, 0, 120, 40),
            input_mode: InputMode::Normal,
            status_message: None,
            should_quit: false,
        };
        if app.board.scenario.is_some() {
            app.mode = GanttMode::WhatIf;
        }
        app.rebuild();
        app
    }

    /// Load production state and any what-if draft through the session
    pub fn load(session: &mut Session, view: ViewMode, zoom: f64) -> Result<Self> {
        let drafts = session.drafts()?;
        let mut app = Self::new(Board::default(), shift_start(), view, zoom);
        app.reload(session.state(), &drafts)?;
        Ok(app)
    }

    /// Run the main loop
    pub fn run(&mut self, terminal: &mut Terminal, events: EventHandler, session: &mut Session) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|frame| {
                self.screen = frame.area();
                views::gantt::draw(frame, self);
            })?;

            match events.next()? {
                Event::Key(key) => self.handle_key(key),
                Event::Mouse(mouse) => self.handle_mouse(mouse),
                Event::Resize(width, height) => {
                    self.screen = Rect::new(0, 0, width, height);
                    self.clamp_scroll();
                }
                Event::Tick => {}
            }

            self.process(session);
        }
        Ok(())
    }

    // =========================================================================
    // Accessors for views
    // =========================================================================

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn mode(&self) -> GanttMode {
        self.mode
    }

    pub fn scenario(&self) -> Option<&Scenario> {
        self.board.scenario.as_ref()
    }

    pub fn production(&self) -> &ScheduleResult {
        &self.board.production
    }

    pub fn input_mode(&self) -> &InputMode {
        &self.input_mode
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn selected_task(&self) -> Option<&GanttTask> {
        self.selected.as_deref().and_then(|id| self.chart.task(id))
    }

    pub fn row_scroll(&self) -> usize {
        self.row_scroll
    }

    /// Chart columns currently on screen
    pub fn viewport(&self) -> Viewport {
        let area = views::gantt::chart_area(self.screen);
        Viewport {
            offset_px: self.scroll_px,
            px_per_col: COLUMN_PX,
            columns: (area.width as usize).saturating_sub(LABEL_WIDTH + 1).max(1),
        }
    }

    /// Where the dragged task would land, once it left the dead zone
    pub fn drop_preview(&self) -> Option<DropTarget> {
        let session = self.drag.session().filter(|s| s.has_moved())?;
        let scale = self.chart.layout.scale?;
        Some(session.preview(&scale, &self.chart.layout.rows))
    }

    pub fn prompt(&self) -> Option<&'static str> {
        match &self.input_mode {
            InputMode::Confirm(action) => Some(action.prompt()),
            InputMode::Move => Some("Moving: [h/l] time [j/k] row, [Enter] drop, [Esc] cancel"),
            InputMode::Normal => None,
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Schedule on the chart: the simulated one in what-if mode, if any
    fn displayed(&self) -> &ScheduleResult {
        match (self.mode, &self.board.scenario) {
            (GanttMode::WhatIf, Some(scenario)) => scenario
                .simulated_schedule
                .as_ref()
                .unwrap_or(&self.board.production),
            _ => &self.board.production,
        }
    }

    fn rebuild(&mut self) {
        let chart = Chart::build(
            self.displayed(),
            &self.board.config,
            self.anchor,
            self.chart.view,
            self.chart.zoom,
            self.mode,
        );
        self.chart = chart;
        self.drag.cancel();

        let still_there = self.selected.as_deref().is_some_and(|id| self.chart.task(id).is_some());
        if !still_there {
            self.selected = self.ordered_bars().first().map(|b| b.task_id.clone());
        }
        self.clamp_scroll();
    }

    fn rescale(&mut self, view: ViewMode, zoom: f64) {
        let left_edge = self
            .chart
            .layout
            .scale
            .map(|scale| scale.min_time() + scale.duration_for(self.scroll_px));
        self.chart.rescale(view, zoom);
        self.scroll_px = match (left_edge, self.chart.layout.scale) {
            (Some(at), Some(scale)) => scale.x_of(at),
            _ => 0.0,
        };
        self.clamp_scroll();
        self.status_message = Some(format!("View {} @ {}x", self.chart.view, self.chart.zoom));
    }

    fn clamp_scroll(&mut self) {
        let total = self.chart.layout.scale.map_or(0.0, |s| s.total_width());
        let shown = self.viewport().columns as f64 * COLUMN_PX;
        self.scroll_px = self.scroll_px.clamp(0.0, (total - shown).max(0.0));

        let visible_rows = self.visible_rows();
        let max_row = self.chart.layout.rows.len().saturating_sub(visible_rows);
        self.row_scroll = self.row_scroll.min(max_row);
    }

    fn visible_rows(&self) -> usize {
        (views::gantt::chart_area(self.screen).height as usize)
            .saturating_sub(1)
            .max(1)
    }

    fn scroll_by(&mut self, columns: f64) {
        self.scroll_px += columns * COLUMN_PX;
        self.clamp_scroll();
    }

    /// Scrolls so chart pixel `x` and machine row `row` are on screen
    fn follow(&mut self, x: f64, row: usize) {
        let shown = self.viewport().columns as f64 * COLUMN_PX;
        if x < self.scroll_px {
            self.scroll_px = x - shown / 4.0;
        } else if x >= self.scroll_px + shown {
            self.scroll_px = x - shown * 3.0 / 4.0;
        }

        let visible = self.visible_rows();
        if row < self.row_scroll {
            self.row_scroll = row;
        } else if row >= self.row_scroll + visible {
            self.row_scroll = row + 1 - visible;
        }
        self.clamp_scroll();
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Bars by row, then by start
    fn ordered_bars(&self) -> Vec<&Bar> {
        let mut bars: Vec<&Bar> = self.chart.layout.bars.iter().collect();
        bars.sort_by(|a, b| a.row.cmp(&b.row).then(a.span.left.total_cmp(&b.span.left)));
        bars
    }

    fn selected_bar(&self) -> Option<&Bar> {
        self.selected.as_deref().and_then(|id| self.chart.layout.bar(id))
    }

    fn select(&mut self, task_id: String) {
        if let Some(bar) = self.chart.layout.bar(&task_id) {
            let (left, row) = (bar.span.left, bar.row);
            self.follow(left, row);
        }
        self.selected = Some(task_id);
    }

    /// Previous or next task in start order, across rows
    fn select_step(&mut self, delta: i64) {
        let bars = self.ordered_bars();
        if bars.is_empty() {
            return;
        }
        let current = self
            .selected
            .as_deref()
            .and_then(|id| bars.iter().position(|b| b.task_id == id));
        let next = match current {
            Some(index) => (index as i64 + delta).clamp(0, bars.len() as i64 - 1) as usize,
            None => 0,
        };
        let id = bars[next].task_id.clone();
        self.select(id);
    }

    /// Nearest task on the next row up or down that has any
    fn select_row(&mut self, delta: i64) {
        let Some((row, left)) = self.selected_bar().map(|b| (b.row as i64, b.span.left)) else {
            self.select_step(0);
            return;
        };

        let rows = self.chart.layout.rows.len() as i64;
        let mut target = row + delta;
        while (0..rows).contains(&target) {
            let nearest = self
                .chart
                .layout
                .bars
                .iter()
                .filter(|b| b.row as i64 == target)
                .min_by(|a, b| (a.span.left - left).abs().total_cmp(&(b.span.left - left).abs()))
                .map(|b| b.task_id.clone());
            if let Some(id) = nearest {
                self.select(id);
                return;
            }
            target += delta;
        }
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Handle a key event
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.input_mode.clone() {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Move => self.handle_move_key(key),
            InputMode::Confirm(action) => self.handle_confirm_key(key, action),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        self.status_message = None;

        match key.code {
            KeyCode::Esc if self.drag.is_dragging() => {
                self.drag.cancel();
                self.status_message = Some("Move cancelled".to_string());
            }
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.select_row(1),
            KeyCode::Char('k') | KeyCode::Up => self.select_row(-1),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => self.select_step(1),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::BackTab => self.select_step(-1),
            KeyCode::Char('m') | KeyCode::Enter => self.begin_move(),
            KeyCode::Char(']') => self.scroll_by(SCROLL_COLUMNS),
            KeyCode::Char('[') => self.scroll_by(-SCROLL_COLUMNS),
            KeyCode::Home => {
                self.scroll_px = 0.0;
                self.row_scroll = 0;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.rescale(self.chart.view, zoom_in(self.chart.zoom)),
            KeyCode::Char('-') => self.rescale(self.chart.view, zoom_out(self.chart.zoom)),
            KeyCode::Char('v') => self.rescale(self.chart.view.next(), self.chart.zoom),
            KeyCode::Char('w') => self.toggle_what_if(),
            KeyCode::Char('p') => {
                if self.board.scenario.as_ref().is_some_and(Scenario::is_simulated) {
                    self.input_mode = InputMode::Confirm(ConfirmAction::Promote);
                } else {
                    self.status_message = Some("Nothing simulated to promote".to_string());
                }
            }
            KeyCode::Char('x') => {
                if self.board.scenario.is_some() {
                    self.input_mode = InputMode::Confirm(ConfirmAction::Discard);
                } else {
                    self.status_message = Some("No what-if draft".to_string());
                }
            }
            KeyCode::Char('o') => self.input_mode = InputMode::Confirm(ConfirmAction::Optimize),
            KeyCode::Char('r') => self.pending.0.push(Action::Reload),
            KeyCode::Char('?') => self.status_message = Some(HELP.to_string()),
            _ => {}
        }
    }

    fn handle_move_key(&mut self, key: KeyEvent) {
        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            SCROLL_COLUMNS * COLUMN_PX
        } else {
            COLUMN_PX
        };

        match key.code {
            KeyCode::Char('h') | KeyCode::Left => self.nudge(-step, 0.0),
            KeyCode::Char('H') => self.nudge(-SCROLL_COLUMNS * COLUMN_PX, 0.0),
            KeyCode::Char('l') | KeyCode::Right => self.nudge(step, 0.0),
            KeyCode::Char('L') => self.nudge(SCROLL_COLUMNS * COLUMN_PX, 0.0),
            KeyCode::Char('k') | KeyCode::Up => self.nudge(0.0, -ROW_HEIGHT_PX),
            KeyCode::Char('j') | KeyCode::Down => self.nudge(0.0, ROW_HEIGHT_PX),
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.input_mode = InputMode::Normal;
                if let Some(at) = self.drag.session().map(|s| s.current) {
                    self.release(at);
                }
            }
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.drag.cancel();
                self.status_message = Some("Move cancelled".to_string());
            }
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, action: ConfirmAction) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.pending.0.push(action.action());
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.status_message = Some("Cancelled".to_string());
            }
            _ => {}
        }
    }

    /// Handle a mouse event; left-button drags move tasks
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.input_mode != InputMode::Normal {
            return;
        }
        let at = self.pointer_at(mouse.column, mouse.row);

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(id) = self.bar_at(at) {
                    self.drag.pointer_down(&self.chart.tasks, &id, at);
                    self.selected = Some(id);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => self.drag.pointer_move(at),
            MouseEventKind::Up(MouseButton::Left) => self.release(at),
            MouseEventKind::ScrollDown => self.scroll_by(SCROLL_COLUMNS),
            MouseEventKind::ScrollUp => self.scroll_by(-SCROLL_COLUMNS),
            _ => {}
        }
    }

    /// Chart pixel position of a terminal cell
    fn pointer_at(&self, column: u16, line: u16) -> Point {
        let area = views::gantt::chart_area(self.screen);
        let cells_x = i64::from(area.x) + LABEL_WIDTH as i64 + 1;
        let rows_y = i64::from(area.y) + 1;

        let x = self.scroll_px + ((i64::from(column) - cells_x) as f64 + 0.5) * COLUMN_PX;
        let row = i64::from(line) - rows_y + self.row_scroll as i64;
        let y = (row as f64 + 0.5) * ROW_HEIGHT_PX;
        Point::new(x, y)
    }

    /// Task whose bar covers a chart pixel, allowing half a column of slack
    fn bar_at(&self, at: Point) -> Option<String> {
        if at.y < 0.0 {
            return None;
        }
        let row = (at.y / ROW_HEIGHT_PX).floor() as usize;
        let in_row = || self.chart.layout.bars.iter().filter(move |b| b.row == row);
        let slack = COLUMN_PX / 2.0;

        in_row()
            .find(|b| at.x >= b.span.left && at.x < b.span.right())
            .or_else(|| in_row().find(|b| at.x >= b.span.left - slack && at.x < b.span.right() + slack))
            .map(|b| b.task_id.clone())
    }

    fn begin_move(&mut self) {
        let Some((id, at)) = self.selected_bar().map(|bar| {
            (
                bar.task_id.clone(),
                Point::new(
                    bar.span.left + bar.span.width / 2.0,
                    (bar.row as f64 + 0.5) * ROW_HEIGHT_PX,
                ),
            )
        }) else {
            self.status_message = Some("Select a task first".to_string());
            return;
        };

        if self.drag.pointer_down(&self.chart.tasks, &id, at) {
            self.input_mode = InputMode::Move;
        }
    }

    fn nudge(&mut self, dx: f64, dy: f64) {
        let Some(current) = self.drag.session().map(|s| s.current) else {
            self.input_mode = InputMode::Normal;
            return;
        };
        let at = Point::new(current.x + dx, current.y + dy);
        self.drag.pointer_move(at);

        if let Some(target) = self.drop_preview() {
            if let (Some(scale), Some(row)) = (self.chart.layout.scale, self.chart.layout.row_of(&target.candidate_machine)) {
                self.follow(scale.x_of(target.new_start), row);
            }
        }
    }

    /// Ends a drag at `at`, queueing the move if there was one
    fn release(&mut self, at: Point) {
        let Some(scale) = self.chart.layout.scale else {
            self.drag.cancel();
            return;
        };

        let outcome = self.drag.pointer_up(at, &scale, &self.chart.layout.rows, self.mode, &mut self.pending);
        match outcome {
            DragOutcome::Moved(target) => {
                let machine = self.chart.task(&target.task_id).map(|t| t.machine.clone());
                if machine.is_some_and(|m| m != target.candidate_machine) {
                    self.status_message = Some(format!(
                        "Only the start time changes; the task stays on its machine (dropped at {})",
                        clock(target.new_start)
                    ));
                }
            }
            DragOutcome::Click { task_id } => self.selected = Some(task_id),
            DragOutcome::Idle => {}
        }
    }

    fn toggle_what_if(&mut self) {
        match self.mode {
            GanttMode::Production => self.pending.0.push(Action::EnterWhatIf),
            GanttMode::WhatIf => {
                self.mode = GanttMode::Production;
                self.rebuild();
                self.status_message = Some(if self.board.scenario.is_some() {
                    "Showing production (what-if draft kept)".to_string()
                } else {
                    "Showing production".to_string()
                });
            }
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Queued actions, oldest first
    #[cfg(test)]
    pub fn pending(&self) -> &[Action] {
        &self.pending.0
    }

    fn process(&mut self, session: &mut Session) {
        if self.pending.0.is_empty() {
            return;
        }
        let drafts = match session.drafts() {
            Ok(drafts) => drafts,
            Err(e) => {
                self.pending.0.clear();
                self.status_message = Some(format!("Error: {:#}", e));
                return;
            }
        };
        let (state, solver) = session.planner();
        self.process_with(state, solver, &drafts);
    }

    /// Runs queued actions; a failure stops the queue and lands on the status line
    pub fn process_with<S, V>(&mut self, state: &mut StateStore<S>, solver: &V, drafts: &DraftStore)
    where
        S: DocumentStore,
        V: Solver,
    {
        for action in std::mem::take(&mut self.pending.0) {
            if let Err(e) = self.perform(action, state, solver, drafts) {
                tracing::warn!(error = %format!("{:#}", e), "dashboard action failed");
                self.status_message = Some(format!("Error: {:#}", e));
                break;
            }
        }
    }

    fn perform<S, V>(
        &mut self,
        action: Action,
        state: &mut StateStore<S>,
        solver: &V,
        drafts: &DraftStore,
    ) -> Result<()>
    where
        S: DocumentStore,
        V: Solver,
    {
        match action {
            Action::EnterWhatIf => {
                let scenario = self.start_scenario();
                self.board.scenario = Some(scenario);
                self.mode = GanttMode::WhatIf;
                self.rebuild();
                self.status_message = Some("What-if mode: moves are simulated, production is untouched".to_string());
            }
            Action::MoveTask { task_id, new_start } => {
                let name = self.chart.task(&task_id).map_or(task_id.clone(), |t| t.name.clone());
                let modification = Modification::TaskMove {
                    task_id,
                    new_start_minute: minutes_from(self.anchor, new_start),
                };

                let mut scenario = self.start_scenario();
                let simulated = planning::apply(state, solver, &mut scenario, modification, self.anchor);
                let saved = drafts.save(&scenario);

                self.board.scenario = Some(scenario);
                self.mode = GanttMode::WhatIf;
                self.rebuild();
                simulated?;
                saved?;

                let makespan = self
                    .board
                    .scenario
                    .as_ref()
                    .and_then(|s| s.simulated_schedule.as_ref())
                    .map_or(0.0, |s| s.makespan);
                self.status_message = Some(format!(
                    "Moved {} to {}; simulated makespan {} min",
                    name,
                    clock(new_start),
                    makespan
                ));
            }
            Action::Promote => {
                let Some(scenario) = self.board.scenario.as_mut() else {
                    bail!("No what-if draft to promote");
                };
                state.promote(scenario).context("Failed to promote scenario")?;
                let count = scenario.modifications.len();
                drafts.clear()?;
                self.reload(state, drafts)?;
                self.status_message = Some(format!("Promoted {} modification(s) to production", count));
            }
            Action::Discard => {
                drafts.clear()?;
                self.board.scenario = None;
                self.mode = GanttMode::Production;
                self.rebuild();
                self.status_message = Some("Discarded what-if draft".to_string());
            }
            Action::Optimize => {
                let schedule = planning::optimize(state, solver, self.anchor)?;
                drafts.clear()?;
                self.status_message = Some(format!(
                    "Optimized: {} tasks, makespan {} min",
                    schedule.tasks.len(),
                    schedule.makespan
                ));
                self.board.production = schedule;
                self.board.scenario = None;
                self.mode = GanttMode::Production;
                self.rebuild();
            }
            Action::Reload => {
                self.reload(state, drafts)?;
                self.status_message = Some("Reloaded".to_string());
            }
        }
        Ok(())
    }

    /// The draft scenario, started on the production schedule if missing
    fn start_scenario(&mut self) -> Scenario {
        let base = self.board.production.id.clone();
        self.board
            .scenario
            .take()
            .unwrap_or_else(|| Scenario::manual(base.as_deref(), Utc::now()))
    }

    fn reload<S: DocumentStore>(&mut self, state: &mut StateStore<S>, drafts: &DraftStore) -> Result<()> {
        let snapshot = state.load().context("Failed to load production state")?;
        self.board.config = snapshot.config_or_default();
        self.board.production = snapshot.schedule.clone().unwrap_or_default();
        self.board.scenario = drafts.load()?;
        self.mode = if self.board.scenario.is_some() {
            GanttMode::WhatIf
        } else {
            GanttMode::Production
        };
        self.rebuild();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Machine, Operation, Priority, Product, ProductionOrder, ScheduledTask, SolveRequest};
    use crate::storage::{MemoryGateway, Simulation, SolverError};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap()
    }

    fn config() -> FactoryConfig {
        let mut press = Machine::new("m-1", "Press");
        press.capabilities = vec!["cut".to_string()];
        FactoryConfig {
            machines: vec![press, Machine::new("m-2", "Oven")],
            typical_jobs: vec![Product {
                id: "p-1".to_string(),
                name: "Widget".to_string(),
                priority: Priority::Normal,
                operations: vec![Operation {
                    id: "op-1".to_string(),
                    name: "Cut".to_string(),
                    machine_capability_required: "cut".to_string(),
                    duration_minutes: 60.0,
                }],
                deadline: None,
            }],
            ..Default::default()
        }
    }

    fn schedule() -> ScheduleResult {
        serde_json::from_value(json!({
            "id": "prod-1",
            "tasks": [
                {"id": "a", "name": "Cut", "line": "m-1", "start": 0, "duration": 60},
                {"id": "b", "name": "Trim", "line": "m-1", "start": 120, "duration": 60},
                {"id": "c", "name": "Bake", "line": "m-2", "start": 60, "duration": 90}
            ],
            "makespan": 180
        }))
        .unwrap()
    }

    fn app() -> App {
        let board = Board {
            config: config(),
            production: schedule(),
            scenario: None,
        };
        App::new(board, anchor(), ViewMode::Day, 1.0)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    /// Terminal cell over the middle of a task's bar
    fn cell_of(app: &App, task_id: &str) -> (u16, u16) {
        let bar = app.chart.layout.bar(task_id).unwrap();
        let area = views::gantt::chart_area(app.screen);
        let column = ((bar.span.left + bar.span.width / 2.0 - app.scroll_px) / COLUMN_PX).floor() as u16;
        (
            area.x + LABEL_WIDTH as u16 + 1 + column,
            area.y + 1 + (bar.row - app.row_scroll) as u16,
        )
    }

    /// Solver that applies task moves to the current tasks
    struct EchoSolver;

    impl Solver for EchoSolver {
        fn solve(&self, _request: &SolveRequest) -> Result<ScheduleResult, SolverError> {
            Ok(ScheduleResult {
                id: Some("prod-2".to_string()),
                ..schedule()
            })
        }

        fn simulate(
            &self,
            scenario: &Scenario,
            _request: &SolveRequest,
            current_tasks: &[ScheduledTask],
        ) -> Result<Simulation, SolverError> {
            let mut tasks = current_tasks.to_vec();
            for modification in &scenario.modifications {
                if let Modification::TaskMove {
                    task_id,
                    new_start_minute,
                } = modification
                {
                    if let Some(task) = tasks.iter_mut().find(|t| &t.id == task_id) {
                        task.start = *new_start_minute as f64;
                    }
                }
            }
            Ok(Simulation {
                schedule: ScheduleResult {
                    tasks,
                    makespan: 240.0,
                    ..Default::default()
                },
                impact: None,
            })
        }
    }

    fn store() -> StateStore<MemoryGateway> {
        let mut store = StateStore::new(MemoryGateway::default());
        store.update_config(config(), "test").unwrap();
        store
            .update_orders(vec![ProductionOrder::production("ord-1", "p-1", "Widget", 1.0)])
            .unwrap();
        store.save_schedule(Some(schedule())).unwrap();
        store
    }

    // =========================================================================
    // Selection and view
    // =========================================================================

    #[test]
    fn starts_on_the_first_task() {
        let app = app();
        assert_eq!(app.mode(), GanttMode::Production);
        // Rows are sorted by machine name: Oven, then Press
        assert_eq!(app.selected_task().unwrap().id, "c");
    }

    #[test]
    fn arrow_keys_walk_tasks_and_rows() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('l')));
        assert_eq!(app.selected_task().unwrap().id, "a");
        app.handle_key(key(KeyCode::Char('l')));
        assert_eq!(app.selected_task().unwrap().id, "b");
        app.handle_key(key(KeyCode::Char('l')));
        assert_eq!(app.selected_task().unwrap().id, "b");

        app.handle_key(key(KeyCode::Char('k')));
        assert_eq!(app.selected_task().unwrap().id, "c");
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.selected_task().unwrap().id, "a");
    }

    #[test]
    fn zoom_and_view_keys_rescale() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('+')));
        assert_eq!(app.chart().zoom, 1.25);
        app.handle_key(key(KeyCode::Char('-')));
        app.handle_key(key(KeyCode::Char('-')));
        assert_eq!(app.chart().zoom, 0.75);
        for _ in 0..10 {
            app.handle_key(key(KeyCode::Char('-')));
        }
        assert_eq!(app.chart().zoom, 0.25);

        app.handle_key(key(KeyCode::Char('v')));
        assert_eq!(app.chart().view, ViewMode::Day.next());
    }

    #[test]
    fn scrolling_stays_inside_the_chart() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('[')));
        assert_eq!(app.viewport().offset_px, 0.0);

        for _ in 0..500 {
            app.handle_key(key(KeyCode::Char(']')));
        }
        let total = app.chart().layout.scale.unwrap().total_width();
        let vp = app.viewport();
        assert!(vp.offset_px + vp.columns as f64 * COLUMN_PX >= total - COLUMN_PX);
        assert!(vp.offset_px <= total);
    }

    #[test]
    fn quit_keys() {
        let mut app = app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);

        let mut app = app_with_scenario();
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    fn app_with_scenario() -> App {
        let board = Board {
            config: config(),
            production: schedule(),
            scenario: Some(Scenario::manual(Some("prod-1"), Utc::now())),
        };
        App::new(board, anchor(), ViewMode::Day, 1.0)
    }

    // =========================================================================
    // Dragging
    // =========================================================================

    #[test]
    fn keyboard_move_queues_what_if_then_move() {
        let mut app = app();
        app.select("a".to_string());

        app.handle_key(key(KeyCode::Char('m')));
        assert_eq!(app.input_mode(), &InputMode::Move);

        // Day view: 30 px per hour, so three steps of 10 px are one hour
        for _ in 0..3 {
            app.handle_key(key(KeyCode::Right));
        }
        let preview = app.drop_preview().unwrap();
        assert_eq!(preview.new_start, anchor() + Duration::hours(1));

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.input_mode(), &InputMode::Normal);
        assert_eq!(
            app.pending(),
            &[
                Action::EnterWhatIf,
                Action::MoveTask {
                    task_id: "a".to_string(),
                    new_start: anchor() + Duration::hours(1),
                },
            ]
        );
    }

    #[test]
    fn escape_cancels_a_move() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('m')));
        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Esc));

        assert_eq!(app.input_mode(), &InputMode::Normal);
        assert!(app.drop_preview().is_none());
        assert!(app.pending().is_empty());
    }

    #[test]
    fn vertical_moves_only_change_time() {
        let mut app = app_with_scenario();
        app.select("c".to_string());
        app.handle_key(key(KeyCode::Char('m')));
        app.handle_key(key(KeyCode::Down));

        let preview = app.drop_preview().unwrap();
        assert_eq!(preview.candidate_machine, "Press");
        assert_eq!(preview.new_start, anchor() + Duration::hours(1));

        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Enter));

        // Already in what-if mode: no switch requested
        assert!(matches!(app.pending(), [Action::MoveTask { task_id, .. }] if task_id == "c"));
        assert!(app.status_message().unwrap().contains("stays on its machine"));
    }

    #[test]
    fn mouse_drag_moves_a_task() {
        let mut app = app_with_scenario();
        let (column, row) = cell_of(&app, "b");

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), column, row));
        assert_eq!(app.selected_task().unwrap().id, "b");
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), column + 3, row));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), column + 6, row));

        match app.pending() {
            [Action::MoveTask { task_id, new_start }] => {
                assert_eq!(task_id, "b");
                assert_eq!(*new_start, anchor() + Duration::hours(4));
            }
            other => panic!("unexpected actions: {:?}", other),
        }
    }

    #[test]
    fn escape_cancels_a_mouse_drag() {
        let mut app = app_with_scenario();
        let (column, row) = cell_of(&app, "b");

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), column, row));
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), column + 10, row));
        assert!(app.drop_preview().is_some());

        app.handle_key(key(KeyCode::Esc));
        assert!(app.drop_preview().is_none());
        assert_eq!(app.status_message(), Some("Move cancelled"));

        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), column + 10, row));
        assert!(app.pending().is_empty());
        assert_eq!(app.selected_task().unwrap().id, "b");
    }

    #[test]
    fn mouse_click_only_selects() {
        let mut app = app();
        let (column, row) = cell_of(&app, "b");

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), column, row));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), column, row));

        assert_eq!(app.selected_task().unwrap().id, "b");
        assert!(app.pending().is_empty());
    }

    #[test]
    fn clicks_on_empty_space_do_nothing() {
        let mut app = app();
        let before = app.selected_task().map(|t| t.id.clone());
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 0, 0));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 40, 0));

        assert_eq!(app.selected_task().map(|t| t.id.clone()), before);
        assert!(app.pending().is_empty());
    }

    // =========================================================================
    // Confirmations
    // =========================================================================

    #[test]
    fn promote_needs_a_simulation() {
        let mut app = app_with_scenario();
        app.handle_key(key(KeyCode::Char('p')));
        assert_eq!(app.input_mode(), &InputMode::Normal);
        assert_eq!(app.status_message(), Some("Nothing simulated to promote"));
    }

    #[test]
    fn confirm_then_cancel() {
        let mut app = app_with_scenario();
        app.handle_key(key(KeyCode::Char('x')));
        assert_eq!(app.input_mode(), &InputMode::Confirm(ConfirmAction::Discard));
        assert!(app.prompt().unwrap().contains("Discard"));

        app.handle_key(key(KeyCode::Char('n')));
        assert_eq!(app.input_mode(), &InputMode::Normal);
        assert!(app.pending().is_empty());

        app.handle_key(key(KeyCode::Char('x')));
        app.handle_key(key(KeyCode::Char('y')));
        assert_eq!(app.pending(), &[Action::Discard]);
    }

    // =========================================================================
    // Actions
    // =========================================================================

    #[test]
    fn dropped_move_is_simulated_and_drafted() {
        let dir = tempfile::tempdir().unwrap();
        let drafts = DraftStore::new(dir.path().join("whatif.json"));
        let mut state = store();
        let mut app = app();

        app.select("a".to_string());
        app.handle_key(key(KeyCode::Char('m')));
        for _ in 0..6 {
            app.handle_key(key(KeyCode::Right));
        }
        app.handle_key(key(KeyCode::Enter));
        app.process_with(&mut state, &EchoSolver, &drafts);

        assert!(app.pending().is_empty());
        assert_eq!(app.mode(), GanttMode::WhatIf);
        let moved = app.chart().task("a").unwrap();
        assert_eq!(moved.start, anchor() + Duration::hours(2));
        assert!(app.status_message().unwrap().starts_with("Moved Cut"));

        let draft = drafts.load().unwrap().unwrap();
        assert_eq!(
            draft.modifications,
            vec![Modification::TaskMove {
                task_id: "a".to_string(),
                new_start_minute: 120,
            }]
        );
        assert!(draft.is_simulated());

        // Production is untouched until promotion
        assert_eq!(app.production().task("a").unwrap().start, 0.0);
    }

    #[test]
    fn promote_replaces_production() {
        let dir = tempfile::tempdir().unwrap();
        let drafts = DraftStore::new(dir.path().join("whatif.json"));
        let mut state = store();
        let mut app = app();

        app.pending.0.push(Action::MoveTask {
            task_id: "b".to_string(),
            new_start: anchor() + Duration::hours(3),
        });
        app.process_with(&mut state, &EchoSolver, &drafts);

        app.handle_key(key(KeyCode::Char('p')));
        app.handle_key(key(KeyCode::Enter));
        app.process_with(&mut state, &EchoSolver, &drafts);

        assert_eq!(app.mode(), GanttMode::Production);
        assert!(app.scenario().is_none());
        assert_eq!(app.production().task("b").unwrap().start, 180.0);
        assert!(drafts.load().unwrap().is_none());
    }

    #[test]
    fn failures_land_on_the_status_line() {
        let dir = tempfile::tempdir().unwrap();
        let drafts = DraftStore::new(dir.path().join("whatif.json"));
        let mut state = StateStore::new(MemoryGateway::default());
        state.gateway().fail.set(true);
        let mut app = app();

        app.pending.0.push(Action::Reload);
        app.pending.0.push(Action::Discard);
        app.process_with(&mut state, &EchoSolver, &drafts);

        assert!(app.status_message().unwrap().starts_with("Error:"));
        assert!(app.pending().is_empty());
        // The queue stopped at the failure
        assert_eq!(app.production().tasks.len(), 3);
    }

    #[test]
    fn discard_returns_to_production() {
        let dir = tempfile::tempdir().unwrap();
        let drafts = DraftStore::new(dir.path().join("whatif.json"));
        let mut state = store();
        let mut app = app_with_scenario();
        drafts.save(app.scenario().unwrap()).unwrap();

        app.pending.0.push(Action::Discard);
        app.process_with(&mut state, &EchoSolver, &drafts);

        assert_eq!(app.mode(), GanttMode::Production);
        assert!(app.scenario().is_none());
        assert!(drafts.load().unwrap().is_none());
    }

    #[test]
    fn toggling_what_if_keeps_the_draft() {
        let dir = tempfile::tempdir().unwrap();
        let drafts = DraftStore::new(dir.path().join("whatif.json"));
        let mut state = store();
        let mut app = app();

        app.handle_key(key(KeyCode::Char('w')));
        app.process_with(&mut state, &EchoSolver, &drafts);
        assert_eq!(app.mode(), GanttMode::WhatIf);
        assert_eq!(app.scenario().unwrap().base_schedule_id, "prod-1");

        app.handle_key(key(KeyCode::Char('w')));
        assert_eq!(app.mode(), GanttMode::Production);
        assert!(app.scenario().is_some());
    }
}
