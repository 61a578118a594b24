//! Character-cell Gantt rendering
//!
//! Both the plain-text output and the dashboard draw the chart on a grid of
//! terminal cells. A [`Viewport`] decides which slice of the chart's pixel
//! space lands in which column.

use chrono::{DateTime, Local, Utc};

use crate::gantt::{Chart, ViewMode};

use super::tui::utils::truncate_str;

/// Width of the machine-name column
pub const LABEL_WIDTH: usize = 14;

const MIN_COLUMNS: usize = 10;

/// Formats an instant for the time axis
pub fn axis_label(at: DateTime<Utc>, view: ViewMode) -> String {
    let local = at.with_timezone(&Local);
    match view {
        ViewMode::Week => local.format("%a %d").to_string(),
        _ => local.format("%H:%M").to_string(),
    }
}

pub fn clock(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}

/// What one cell of a machine row shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Empty,
    Closed,
    Setup,
    /// Part of the bar at `layout.bars[bar]`
    Bar { bar: usize, ch: char },
}

impl Cell {
    pub fn glyph(&self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Closed => '░',
            Cell::Setup => '~',
            Cell::Bar { ch, .. } => *ch,
        }
    }
}

/// Slice of chart pixels shown in a fixed number of columns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset_px: f64,
    pub px_per_col: f64,
    pub columns: usize,
}

impl Viewport {
    /// Whole chart squeezed into `columns`
    pub fn fit(total_width: f64, columns: usize) -> Self {
        let columns = columns.max(1);
        Self {
            offset_px: 0.0,
            px_per_col: (total_width / columns as f64).max(f64::MIN_POSITIVE),
            columns,
        }
    }

    /// Column holding pixel `x`, if visible
    pub fn column_of(&self, x: f64) -> Option<usize> {
        let col = ((x - self.offset_px) / self.px_per_col).floor();
        (col >= 0.0 && col < self.columns as f64).then_some(col as usize)
    }

    /// Visible columns covered by `[left, right)`, at least one wide
    pub fn range(&self, left: f64, right: f64) -> Option<(usize, usize)> {
        let start = ((left - self.offset_px) / self.px_per_col).floor();
        let end = ((right - self.offset_px) / self.px_per_col).ceil().max(start + 1.0);
        let columns = self.columns as f64;
        if end <= 0.0 || start >= columns {
            return None;
        }
        Some((start.max(0.0) as usize, end.min(columns) as usize))
    }
}

/// Glyphs of a bar: `[name--]`, or `|` when one column wide
fn bar_glyphs(name: &str, width: usize) -> Vec<char> {
    match width {
        0 => Vec::new(),
        1 => vec!['|'],
        _ => {
            let label: Vec<char> = truncate_str(name, width - 2).chars().collect();
            let mut glyphs = Vec::with_capacity(width);
            glyphs.push('[');
            glyphs.extend((0..width - 2).map(|i| label.get(i).copied().unwrap_or('-')));
            glyphs.push(']');
            glyphs
        }
    }
}

/// Time axis line, labels on whole hours (days in week view)
pub fn axis(chart: &Chart, viewport: &Viewport) -> String {
    let mut line = vec![' '; viewport.columns];
    let mut next_free = 0;
    for tick in chart.ticks().iter().filter(|t| t.on_hour) {
        let Some(col) = viewport.column_of(tick.x) else {
            continue;
        };
        let label: Vec<char> = axis_label(tick.at, chart.view).chars().collect();
        if col < next_free || col + label.len() > viewport.columns {
            continue;
        }
        line[col..col + label.len()].copy_from_slice(&label);
        next_free = col + label.len() + 1;
    }
    line.into_iter().collect()
}

/// Cells of one machine row; bars are drawn over setup gaps over closed time
pub fn row_cells(chart: &Chart, row: usize, viewport: &Viewport) -> Vec<Cell> {
    let mut cells = vec![Cell::Empty; viewport.columns];
    let (Some(scale), Some(machine)) = (chart.layout.scale, chart.layout.rows.get(row)) else {
        return cells;
    };

    let paint = |left: f64, right: f64, cell: Cell, cells: &mut Vec<Cell>| {
        if let Some((from, to)) = viewport.range(left, right) {
            cells[from..to].fill(cell);
        }
    };

    for mask in chart.masks.iter().filter(|m| m.machine.as_deref() == Some(machine.as_str())) {
        paint(scale.x_of(mask.start), scale.x_of(mask.end), Cell::Closed, &mut cells);
    }
    for gap in chart.gaps.iter().filter(|g| &g.machine == machine) {
        paint(scale.x_of(gap.start), scale.x_of(gap.end), Cell::Setup, &mut cells);
    }

    for (index, bar) in chart.layout.bars.iter().enumerate().filter(|(_, b)| b.row == row) {
        let Some((from, to)) = viewport.range(bar.span.left, bar.span.right()) else {
            continue;
        };
        let name = chart.task(&bar.task_id).map_or(bar.task_id.as_str(), |t| t.name.as_str());
        for (offset, ch) in bar_glyphs(name, to - from).into_iter().enumerate() {
            cells[from + offset] = Cell::Bar { bar: index, ch };
        }
    }

    cells
}

/// Renders the whole chart into lines at most `width` characters wide
///
/// `░` marks closed time and `~` a setup changeover.
pub fn render(chart: &Chart, width: usize) -> Vec<String> {
    let Some(scale) = chart.layout.scale else {
        return vec!["No tasks scheduled".to_string()];
    };

    let columns = width.saturating_sub(LABEL_WIDTH + 1).max(MIN_COLUMNS);
    let viewport = Viewport::fit(scale.total_width(), columns);

    let mut lines = vec![format!("{:<w$} {}", "", axis(chart, &viewport), w = LABEL_WIDTH)];
    for (row, machine) in chart.layout.rows.iter().enumerate() {
        let cells: String = row_cells(chart, row, &viewport).iter().map(Cell::glyph).collect();
        lines.push(format!("{:<w$} {}", truncate_str(machine, LABEL_WIDTH), cells, w = LABEL_WIDTH));
    }
    lines
}
