//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::session::Session;
use super::{chat, factory_cmd, order, render, schedule, tui, whatif};
use crate::gantt::ViewMode;
use crate::storage::Config;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "PLANTBOARD_LOG";

#[derive(Parser)]
#[command(name = "plantboard")]
#[command(author, version, about = "Production planning from the terminal: factory setup, scheduling and what-if analysis")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, env = "PLANTBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show configuration, orders, schedule and what-if draft at a glance
    Status,

    /// Manage machines
    #[command(subcommand)]
    Machine(factory_cmd::MachineCommands),

    /// Manage operators
    #[command(subcommand)]
    Operator(factory_cmd::OperatorCommands),

    /// Manage product templates
    #[command(subcommand)]
    Product(factory_cmd::ProductCommands),

    /// Manage production orders
    #[command(subcommand)]
    Order(order::OrderCommands),

    /// Show, optimize or chart the active schedule
    #[command(subcommand)]
    Schedule(schedule::ScheduleCommands),

    /// Explore hypothetical changes without touching production
    #[command(subcommand, name = "whatif")]
    WhatIf(whatif::WhatIfCommands),

    /// Talk to the planning assistant
    #[command(subcommand)]
    Chat(chat::ChatCommands),

    /// Render a Gantt chart from local files (no network)
    Render(render::RenderArgs),

    /// Interactive Gantt dashboard
    Dashboard {
        /// Initial time granularity (hour, day, week)
        #[arg(long)]
        view: Option<ViewMode>,
    },
}

/// Installs the stderr log subscriber
///
/// `PLANTBOARD_LOG` wins when set; otherwise `fallback` applies.
fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn log_level(cli: &Cli) -> &'static str {
    match (&cli.command, cli.verbose) {
        (Commands::Dashboard { .. }, _) => "off",
        (_, true) => "plantboard=debug",
        (_, false) => "warn",
    }
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(log_level(&cli));
    let output = Output::new(cli.format);

    output.verbose_ctx("main", "plantboard starting");

    // `render` is offline and needs neither settings nor services
    let config_path = cli.config;
    let session = || -> Result<Session> { Ok(Session::open(Config::load(config_path.as_deref())?)) };

    match cli.command {
        Commands::Render(args) => render::run(args, &output)?,
        Commands::Status => status(&mut session()?, &output)?,
        Commands::Machine(cmd) => factory_cmd::run_machine(cmd, &mut session()?, &output)?,
        Commands::Operator(cmd) => factory_cmd::run_operator(cmd, &mut session()?, &output)?,
        Commands::Product(cmd) => factory_cmd::run_product(cmd, &mut session()?, &output)?,
        Commands::Order(cmd) => order::run(cmd, &mut session()?, &output)?,
        Commands::Schedule(cmd) => schedule::run(cmd, &mut session()?, &output)?,
        Commands::WhatIf(cmd) => whatif::run(cmd, &mut session()?, &output)?,
        Commands::Chat(cmd) => chat::run(cmd, &mut session()?, &output)?,
        Commands::Dashboard { view } => tui::run(session()?, view)?,
    }

    output.verbose_ctx("main", "command completed successfully");
    Ok(())
}

/// Overview of the production state
fn status(session: &mut Session, output: &Output) -> Result<()> {
    let draft = session.drafts()?.load()?;
    let snapshot = session.state().load()?;
    let config = snapshot.config_or_default();

    if output.is_json() {
        output.data(&serde_json::json!({
            "config": {
                "saved": snapshot.config.is_some(),
                "machines": config.machines.len(),
                "operators": config.operators.len(),
                "products": config.typical_jobs.len(),
            },
            "orders": snapshot.orders.len(),
            "schedule": snapshot.schedule.as_ref().map(|s| serde_json::json!({
                "id": s.id,
                "tasks": s.tasks.len(),
                "makespan": s.makespan,
                "updated_at": s.updated_at,
            })),
            "whatif": draft.as_ref().map(|d| serde_json::json!({
                "id": d.id,
                "status": d.status,
                "modifications": d.modifications.len(),
            })),
        }));
        return Ok(());
    }

    println!("Factory");
    println!("  Machines:  {}", config.machines.len());
    println!("  Operators: {}", config.operators.len());
    println!("  Products:  {}", config.typical_jobs.len());
    println!();
    println!("Orders: {}", snapshot.orders.len());

    match &snapshot.schedule {
        Some(schedule) => println!(
            "Schedule: {} tasks, makespan {} min{}",
            schedule.tasks.len(),
            schedule.makespan,
            schedule
                .updated_at
                .as_deref()
                .map(|at| format!(" (updated {})", at))
                .unwrap_or_default()
        ),
        None => println!("Schedule: none (run `plantboard schedule optimize`)"),
    }

    if let Some(draft) = draft {
        println!(
            "What-if draft: {} modification(s), {:?}",
            draft.modifications.len(),
            draft.status
        );
    }

    Ok(())
}
