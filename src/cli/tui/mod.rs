//! Interactive Gantt dashboard
//!
//! Shows the active schedule in a terminal UI built on ratatui. Tasks can be
//! dragged with the mouse or moved from the keyboard; every move lands in
//! the what-if draft and is simulated before anything reaches production.

mod app;
mod event;
mod ui;
pub(super) mod utils;
mod views;

use std::panic::{self, AssertUnwindSafe};

use anyhow::{anyhow, Result};

use super::session::Session;
use crate::gantt::ViewMode;
use app::App;
use event::EventHandler;

/// Launch the dashboard
pub fn run(mut session: Session, view: Option<ViewMode>) -> Result<()> {
    let view = view.unwrap_or(session.config.gantt.view);
    let zoom = session.config.gantt.zoom;
    tracing::debug!(%view, zoom, "starting dashboard");

    // Initialize terminal
    let mut terminal = ui::init_terminal()?;

    // Load state; restore the terminal first if that fails
    let mut app = match App::load(&mut session, view, zoom) {
        Ok(app) => app,
        Err(e) => {
            ui::restore_terminal()?;
            return Err(e);
        }
    };

    let event_handler = EventHandler::new(250);

    // Run the main loop with panic safety so the terminal is always restored
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        app.run(&mut terminal, event_handler, &mut session)
    }));

    let restore_result = ui::restore_terminal();

    match result {
        Ok(inner_result) => {
            restore_result?;
            inner_result
        }
        Err(panic_payload) => {
            let _ = restore_result;
            if let Some(s) = panic_payload.downcast_ref::<&str>() {
                Err(anyhow!("Dashboard panicked: {}", s))
            } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                Err(anyhow!("Dashboard panicked: {}", s))
            } else {
                Err(anyhow!("Dashboard panicked with unknown error"))
            }
        }
    }
}
