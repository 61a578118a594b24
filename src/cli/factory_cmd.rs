//! Factory configuration commands: machines, operators and products

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Subcommand;

use super::chart_text::clock;
use super::output::Output;
use super::session::Session;
use crate::domain::{
    new_id, shift_start, EntityKind, FactoryConfig, Machine, Operation, Operator, Priority, Product,
};

#[derive(Subcommand)]
pub enum MachineCommands {
    /// List machines
    List,

    /// Add a machine
    Add {
        /// Display name (unique)
        name: String,

        /// Capability offered by the machine (repeatable)
        #[arg(long = "capability", short = 'c')]
        capabilities: Vec<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Remove a machine by ID or name
    Remove { id: String },
}

#[derive(Subcommand)]
pub enum OperatorCommands {
    /// List operators
    List,

    /// Add an operator
    Add {
        name: String,

        /// Skill held by the operator (repeatable)
        #[arg(long = "skill", short = 's')]
        skills: Vec<String>,

        /// Processing time for a skill, as SKILL=MINUTES (repeatable)
        #[arg(long = "time")]
        times: Vec<String>,
    },

    /// Remove an operator by ID or name
    Remove { id: String },

    /// Show an operator's tasks in the active schedule
    Tasks {
        /// Operator ID or name
        operator: String,
    },
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// List product templates
    List,

    /// Add a product template
    ///
    /// Example:
    ///   plantboard product add Widget --op Cut:cutting:15 --op Paint:painting:30
    Add {
        name: String,

        /// Operation as NAME:CAPABILITY:MINUTES, in routing order (repeatable)
        #[arg(long = "op", required = true)]
        operations: Vec<String>,

        #[arg(long, default_value = "normal")]
        priority: Priority,

        /// Default deadline (ISO 8601)
        #[arg(long)]
        deadline: Option<String>,
    },

    /// Remove a product by ID or name
    Remove { id: String },
}

/// Loads the active config, applies `edit` and saves it back
fn edit_config<T, F>(session: &mut Session, description: &str, edit: F) -> Result<T>
where
    F: FnOnce(&mut FactoryConfig) -> Result<T>,
{
    let mut config = session.state().snapshot()?.config_or_default();
    let result = edit(&mut config)?;
    session
        .state()
        .update_config(config, description)
        .context("Failed to save factory configuration")?;
    Ok(result)
}

/// Parses `NAME:CAPABILITY:MINUTES`
fn parse_operation(spec: &str, index: usize, seed: &str) -> Result<Operation> {
    let parts: Vec<&str> = spec.split(':').map(str::trim).collect();
    let [name, capability, minutes] = parts.as_slice() else {
        bail!("Invalid operation '{}': expected NAME:CAPABILITY:MINUTES", spec);
    };
    if name.is_empty() {
        bail!("Invalid operation '{}': name is empty", spec);
    }
    let duration_minutes: f64 = minutes
        .parse()
        .with_context(|| format!("Invalid duration in operation '{}'", spec))?;
    if duration_minutes <= 0.0 {
        bail!("Invalid operation '{}': duration must be positive", spec);
    }

    Ok(Operation {
        id: new_id(EntityKind::Operation, &format!("{}{}{}", seed, name, index), Utc::now()),
        name: name.to_string(),
        machine_capability_required: if capability.is_empty() {
            "general".to_string()
        } else {
            capability.to_lowercase()
        },
        duration_minutes,
    })
}

/// Parses `SKILL=MINUTES`
fn parse_time(spec: &str) -> Result<(String, f64)> {
    let (skill, minutes) = spec
        .split_once('=')
        .with_context(|| format!("Invalid processing time '{}': expected SKILL=MINUTES", spec))?;
    let minutes: f64 = minutes
        .trim()
        .parse()
        .with_context(|| format!("Invalid minutes in '{}'", spec))?;
    Ok((skill.trim().to_lowercase(), minutes))
}

fn normalize(values: Vec<String>) -> Vec<String> {
    let mut values: Vec<String> = values
        .into_iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect();
    values.sort();
    values.dedup();
    values
}

// ============================================================================
// Machines
// ============================================================================

pub fn run_machine(cmd: MachineCommands, session: &mut Session, output: &Output) -> Result<()> {
    match cmd {
        MachineCommands::List => list_machines(session, output),
        MachineCommands::Add {
            name,
            capabilities,
            description,
        } => add_machine(session, output, &name, capabilities, description),
        MachineCommands::Remove { id } => remove_machine(session, output, &id),
    }
}

fn list_machines(session: &mut Session, output: &Output) -> Result<()> {
    let machines = session.state().snapshot()?.config_or_default().machines;

    if output.is_json() {
        output.data(&machines);
        return Ok(());
    }

    if machines.is_empty() {
        println!("No machines configured");
        return Ok(());
    }

    println!("{:<18} {:<20} CAPABILITIES", "ID", "NAME");
    println!("{}", "-".repeat(60));
    for machine in &machines {
        println!("{:<18} {:<20} {}", machine.id, machine.name, machine.capabilities.join(", "));
    }
    Ok(())
}

fn add_machine(
    session: &mut Session,
    output: &Output,
    name: &str,
    capabilities: Vec<String>,
    description: Option<String>,
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Machine name cannot be empty");
    }

    let machine = edit_config(session, "Factory configuration", |config| {
        if config.machines.iter().any(|m| m.name.eq_ignore_ascii_case(name)) {
            bail!("A machine named '{}' already exists", name);
        }
        let mut machine = Machine::new(new_id(EntityKind::Machine, name, Utc::now()), name);
        machine.capabilities = normalize(capabilities);
        machine.description = description;
        config.machines.push(machine.clone());
        Ok(machine)
    })?;

    if output.is_json() {
        output.data(&machine);
    } else {
        output.success(&format!("Added machine: {} - {}", machine.id, machine.name));
    }
    Ok(())
}

fn remove_machine(session: &mut Session, output: &Output, id: &str) -> Result<()> {
    let (removed, remaining) = edit_config(session, "Factory configuration", |config| {
        let removed = config
            .remove_machine(id)
            .with_context(|| format!("Machine not found: {}", id))?;
        Ok((removed, config.machines.len()))
    })?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "removed": removed.id,
            "schedule_cleared": remaining == 0,
        }));
    } else {
        output.success(&format!("Removed machine: {} - {}", removed.id, removed.name));
        if remaining == 0 {
            println!("No machines left; the active schedule was cleared");
        }
    }
    Ok(())
}

// ============================================================================
// Operators
// ============================================================================

pub fn run_operator(cmd: OperatorCommands, session: &mut Session, output: &Output) -> Result<()> {
    match cmd {
        OperatorCommands::List => list_operators(session, output),
        OperatorCommands::Add { name, skills, times } => add_operator(session, output, &name, skills, &times),
        OperatorCommands::Remove { id } => remove_operator(session, output, &id),
        OperatorCommands::Tasks { operator } => operator_tasks(session, output, &operator),
    }
}

fn list_operators(session: &mut Session, output: &Output) -> Result<()> {
    let operators = session.state().snapshot()?.config_or_default().operators;

    if output.is_json() {
        output.data(&operators);
        return Ok(());
    }

    if operators.is_empty() {
        println!("No operators configured");
        return Ok(());
    }

    println!("{:<18} {:<20} SKILLS", "ID", "NAME");
    println!("{}", "-".repeat(60));
    for operator in &operators {
        println!("{:<18} {:<20} {}", operator.id, operator.name, operator.skills.join(", "));
    }
    Ok(())
}

fn add_operator(
    session: &mut Session,
    output: &Output,
    name: &str,
    skills: Vec<String>,
    times: &[String],
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Operator name cannot be empty");
    }
    let processing_times: BTreeMap<String, f64> = times
        .iter()
        .map(|t| parse_time(t))
        .collect::<Result<_>>()?;

    let operator = edit_config(session, "Factory configuration", |config| {
        if config.operators.iter().any(|o| o.name.eq_ignore_ascii_case(name)) {
            bail!("An operator named '{}' already exists", name);
        }
        let mut operator = Operator::new(new_id(EntityKind::Operator, name, Utc::now()), name);
        operator.skills = normalize(skills);
        operator.processing_times = processing_times;
        config.operators.push(operator.clone());
        Ok(operator)
    })?;

    if output.is_json() {
        output.data(&operator);
    } else {
        output.success(&format!("Added operator: {} - {}", operator.id, operator.name));
    }
    Ok(())
}

fn remove_operator(session: &mut Session, output: &Output, id: &str) -> Result<()> {
    let removed = edit_config(session, "Factory configuration", |config| {
        config
            .remove_operator(id)
            .with_context(|| format!("Operator not found: {}", id))
    })?;

    output.success(&format!("Removed operator: {} - {}", removed.id, removed.name));
    Ok(())
}

/// Work station view: the operator's share of the active schedule
fn operator_tasks(session: &mut Session, output: &Output, id: &str) -> Result<()> {
    let snapshot = session.state().snapshot()?;
    let config = snapshot.config_or_default();
    let operator = config
        .operator(id)
        .with_context(|| format!("Operator not found: {}", id))?;
    let tasks = snapshot
        .schedule
        .as_ref()
        .map(|s| s.operator_tasks(&operator.name))
        .unwrap_or_default();

    if output.is_json() {
        output.data(&serde_json::json!({
            "operator": operator,
            "tasks": tasks,
        }));
        return Ok(());
    }

    println!("{} has {} task(s) scheduled", operator.name, tasks.len());
    if tasks.is_empty() {
        return Ok(());
    }

    let anchor = shift_start();
    let at = |instant: Option<chrono::DateTime<Utc>>| instant.map_or_else(|| "-".to_string(), clock);
    println!();
    println!("{:<6} {:<6} {:<8} {:<16} {:<20} JOB", "START", "END", "MINUTES", "MACHINE", "TASK");
    println!("{}", "-".repeat(76));
    for task in tasks {
        println!(
            "{:<6} {:<6} {:<8} {:<16} {:<20} {}",
            at(task.start_at(anchor)),
            at(task.end_at(anchor)),
            task.duration_minutes().round(),
            config.machine(&task.line).map_or(task.line.as_str(), |m| m.name.as_str()),
            if task.name.is_empty() { &task.id } else { &task.name },
            if task.job_name.is_empty() { &task.job_id } else { &task.job_name }
        );
    }
    Ok(())
}

// ============================================================================
// Products
// ============================================================================

pub fn run_product(cmd: ProductCommands, session: &mut Session, output: &Output) -> Result<()> {
    match cmd {
        ProductCommands::List => list_products(session, output),
        ProductCommands::Add {
            name,
            operations,
            priority,
            deadline,
        } => add_product(session, output, &name, &operations, priority, deadline),
        ProductCommands::Remove { id } => remove_product(session, output, &id),
    }
}

fn list_products(session: &mut Session, output: &Output) -> Result<()> {
    let products = session.state().snapshot()?.config_or_default().typical_jobs;

    if output.is_json() {
        output.data(&products);
        return Ok(());
    }

    if products.is_empty() {
        println!("No products configured");
        return Ok(());
    }

    println!("{:<18} {:<20} {:<8} ROUTING", "ID", "NAME", "PRIORITY");
    println!("{}", "-".repeat(70));
    for product in &products {
        let routing: Vec<String> = product
            .operations
            .iter()
            .map(|op| format!("{} ({}, {}m)", op.name, op.machine_capability_required, op.duration_minutes))
            .collect();
        println!(
            "{:<18} {:<20} {:<8} {}",
            product.id,
            product.name,
            product.priority.as_str(),
            routing.join(" -> ")
        );
    }
    Ok(())
}

fn add_product(
    session: &mut Session,
    output: &Output,
    name: &str,
    operations: &[String],
    priority: Priority,
    deadline: Option<String>,
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Product name cannot be empty");
    }
    let operations = operations
        .iter()
        .enumerate()
        .map(|(index, spec)| parse_operation(spec, index, name))
        .collect::<Result<Vec<_>>>()?;

    let product = edit_config(session, "Factory configuration", |config| {
        if config.product_by_name(name).is_some() {
            bail!("A product named '{}' already exists", name);
        }
        let product = Product {
            id: new_id(EntityKind::Product, name, Utc::now()),
            name: name.to_string(),
            priority,
            operations,
            deadline,
        };
        config.typical_jobs.push(product.clone());
        Ok(product)
    })?;

    if output.is_json() {
        output.data(&product);
    } else {
        output.success(&format!(
            "Added product: {} - {} ({} operations)",
            product.id,
            product.name,
            product.operations.len()
        ));
    }
    Ok(())
}

fn remove_product(session: &mut Session, output: &Output, id: &str) -> Result<()> {
    let removed = edit_config(session, "Factory configuration", |config| {
        config
            .remove_product(id)
            .with_context(|| format!("Product not found: {}", id))
    })?;

    output.success(&format!("Removed product: {} - {}", removed.id, removed.name));
    Ok(())
}
