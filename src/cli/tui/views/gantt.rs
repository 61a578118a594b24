//! Gantt view: one row per machine, bars on a scrollable time axis

use std::rc::Rc;

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use crate::cli::chart_text::{self, Cell, LABEL_WIDTH};
use crate::cli::tui::app::{App, InputMode};
use crate::cli::tui::utils::{parse_color, truncate_str};
use crate::cli::whatif::impact_summary;
use crate::gantt::GanttMode;

fn chunks(area: Rect) -> Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(6),    // Chart
            Constraint::Length(6), // Details
            Constraint::Length(3), // Status bar
        ])
        .split(area)
}

/// Inner area of the chart block for a terminal of size `screen`
///
/// Line 0 is the time axis, machine rows follow.
pub fn chart_area(screen: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(chunks(screen)[1])
}

/// Draw the dashboard
pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = chunks(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_chart(frame, app, chunks[1]);
    draw_details(frame, app, chunks[2]);
    draw_status_bar(frame, app, chunks[3]);
}

fn mode_label(mode: GanttMode) -> Span<'static> {
    match mode {
        GanttMode::Production => Span::styled(" PRODUCTION ", Style::default().fg(Color::Black).bg(Color::Green)),
        GanttMode::WhatIf => Span::styled(" WHAT-IF ", Style::default().fg(Color::Black).bg(Color::Magenta)),
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let chart = app.chart();
    let production = app.production();

    let mut spans = vec![mode_label(app.mode()), Span::raw("  ")];
    spans.push(Span::raw(format!(
        "schedule {} | {} tasks | makespan {} min",
        production.id.as_deref().unwrap_or("-"),
        production.tasks.len(),
        production.makespan
    )));
    if let Some(scenario) = app.scenario() {
        spans.push(Span::styled(
            format!("  | draft: {} change(s)", scenario.modifications.len()),
            Style::default().fg(Color::Magenta),
        ));
    }
    spans.push(Span::styled(
        format!("  | {} @ {}x", chart.view, chart.zoom),
        Style::default().fg(Color::DarkGray),
    ));

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Plantboard "),
    );
    frame.render_widget(paragraph, area);
}

/// Style for one chart cell
fn cell_style(app: &App, cell: Cell, selected: Option<&str>, dragged: Option<&str>) -> Style {
    match cell {
        Cell::Empty => Style::default(),
        Cell::Closed => Style::default().fg(Color::DarkGray),
        Cell::Setup => Style::default().fg(Color::Yellow),
        Cell::Bar { bar, .. } => {
            let chart = app.chart();
            let task = chart.layout.bars.get(bar).and_then(|b| chart.task(&b.task_id));
            let color = task
                .and_then(|t| t.color.as_deref())
                .and_then(parse_color)
                .unwrap_or(Color::Cyan);
            let mut style = Style::default().fg(Color::Black).bg(color);

            let id = task.map(|t| t.id.as_str());
            if id.is_some() && id == selected {
                style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
            }
            if id.is_some() && id == dragged {
                style = style.add_modifier(Modifier::DIM);
            }
            style
        }
    }
}

/// Joins runs of equally styled glyphs into spans
fn styled_runs(glyphs: impl IntoIterator<Item = (char, Style)>) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut run = String::new();
    let mut current = Style::default();

    for (ch, style) in glyphs {
        if style != current && !run.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut run), current));
        }
        current = style;
        run.push(ch);
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, current));
    }
    spans
}

fn draw_chart(frame: &mut Frame, app: &App, area: Rect) {
    let chart = app.chart();
    let block = Block::default().borders(Borders::ALL).title(" Gantt ");

    let Some(scale) = chart.layout.scale else {
        let paragraph = Paragraph::new("No tasks scheduled. Press [o] to optimize the current orders.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let viewport = app.viewport();
    let inner = block.inner(area);
    let preview = app.drop_preview();

    // Ghost of the drop position, on the task's own row
    let ghost = preview.as_ref().and_then(|target| {
        let task = chart.task(&target.task_id)?;
        let row = chart.layout.row_of(&task.machine)?;
        let (from, to) = viewport.range(scale.x_of(target.new_start), scale.x_of(target.new_end))?;
        Some((row, from, to))
    });

    let mut lines = vec![Line::from(Span::styled(
        format!("{:<w$} {}", "", chart_text::axis(chart, &viewport), w = LABEL_WIDTH),
        Style::default().fg(Color::DarkGray),
    ))];

    let selected = app.selected_task().map(|t| t.id.as_str());
    let dragged = preview.as_ref().map(|p| p.task_id.as_str());

    let visible = (inner.height as usize).saturating_sub(1);
    for (row, machine) in chart.layout.rows.iter().enumerate().skip(app.row_scroll()).take(visible) {
        let candidate = preview.as_ref().is_some_and(|p| &p.candidate_machine == machine);
        let label_style = if candidate {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        let mut spans = vec![Span::styled(
            format!("{:<w$} ", truncate_str(machine, LABEL_WIDTH), w = LABEL_WIDTH),
            label_style,
        )];

        let glyphs = chart_text::row_cells(chart, row, &viewport)
            .into_iter()
            .enumerate()
            .map(|(col, cell)| match ghost {
                Some((ghost_row, from, to)) if ghost_row == row && (from..to).contains(&col) => {
                    ('▒', Style::default().fg(Color::Yellow))
                }
                _ => (cell.glyph(), cell_style(app, cell, selected, dragged)),
            });
        spans.extend(styled_runs(glyphs));
        lines.push(Line::from(spans));
    }

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn draw_details(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();

    match (app.drop_preview(), app.selected_task()) {
        (Some(target), _) => {
            lines.push(Line::from(vec![
                Span::styled("Drop at ", Style::default().fg(Color::Yellow)),
                Span::raw(format!(
                    "{} - {}",
                    chart_text::clock(target.new_start),
                    chart_text::clock(target.new_end)
                )),
            ]));
            lines.push(Line::from(Span::styled(
                "Only the start time changes; the machine stays the same",
                Style::default().fg(Color::DarkGray),
            )));
        }
        (None, Some(task)) => {
            lines.push(Line::from(vec![
                Span::styled(task.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(format!("  ({})", task.id), Style::default().fg(Color::DarkGray)),
            ]));
            lines.push(Line::from(format!(
                "{}  {} - {}  ({} min)",
                task.machine,
                chart_text::clock(task.start),
                chart_text::clock(task.end),
                task.duration().num_minutes()
            )));
        }
        (None, None) => lines.push(Line::from("No task selected")),
    }

    if app.mode() == GanttMode::WhatIf {
        if let Some(impact) = app.scenario().and_then(|s| s.impact_analysis.as_ref()) {
            let summary = impact_summary(impact);
            lines.push(Line::from(Span::styled(
                summary.first().cloned().unwrap_or_default(),
                Style::default().fg(Color::Magenta),
            )));
            if let Some(jobs) = summary.last() {
                lines.push(Line::from(jobs.clone()));
            }
        }
    }

    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Details "));
    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (content, style) = match (app.input_mode(), app.prompt()) {
        (InputMode::Normal, _) | (_, None) => {
            let msg = app.status_message().unwrap_or("[?]help [m]ove [w]hat-if [q]uit");
            let style = if msg.starts_with("Error:") {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            (msg.to_string(), style)
        }
        (_, Some(prompt)) => (format!("{} (Esc to cancel)", prompt), Style::default().fg(Color::Yellow)),
    };

    let paragraph = Paragraph::new(content)
        .style(style)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(paragraph, area);
}
