//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Factory | Shop-floor setup | `machine add`, `operator list`, `product add` |
//! | Orders | Demand to schedule | `order add`, `order list` |
//! | Schedule | Solving and charts | `schedule optimize`, `schedule gantt` |
//! | What-if | Hypothetical changes | `whatif move`, `whatif promote` |
//! | Assistant | Conversational setup | `chat new orders`, `chat send` |
//! | Offline | Local files only | `render --factory f.json --schedule s.json` |
//! | Dashboard | Interactive Gantt | `dashboard --view hour` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output, or set `PLANTBOARD_LOG`
//! to any `tracing` filter:
//! ```bash
//! plantboard --verbose schedule optimize
//! PLANTBOARD_LOG=plantboard=trace plantboard status
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod chart_text;
mod chat;
mod factory_cmd;
mod order;
mod output;
mod planning;
mod render;
mod schedule;
mod session;
mod tui;
mod whatif;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
