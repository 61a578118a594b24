//! Production order commands

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Subcommand;

use super::output::Output;
use super::session::Session;
use crate::domain::{new_id, parse_instant, seeded_color, EntityKind, Priority, ProductionOrder};

#[derive(Subcommand)]
pub enum OrderCommands {
    /// List production orders
    List,

    /// Add a production order for a product template
    Add {
        /// Product ID or name
        #[arg(long)]
        product: String,

        #[arg(long, default_value = "1")]
        quantity: f64,

        /// Deadline (ISO 8601); defaults to the product's deadline
        #[arg(long)]
        deadline: Option<String>,

        /// Defaults to the product's priority
        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long)]
        client: Option<String>,
    },

    /// Remove an order
    Remove { id: String },

    /// Remove every order (also clears the active schedule)
    Clear,
}

pub fn run(cmd: OrderCommands, session: &mut Session, output: &Output) -> Result<()> {
    match cmd {
        OrderCommands::List => list_orders(session, output),
        OrderCommands::Add {
            product,
            quantity,
            deadline,
            priority,
            client,
        } => add_order(session, output, &product, quantity, deadline, priority, client),
        OrderCommands::Remove { id } => remove_order(session, output, &id),
        OrderCommands::Clear => clear_orders(session, output),
    }
}

fn list_orders(session: &mut Session, output: &Output) -> Result<()> {
    let orders = session.state().snapshot()?.orders.clone();

    if output.is_json() {
        output.data(&orders);
        return Ok(());
    }

    if orders.is_empty() {
        println!("No orders");
        return Ok(());
    }

    println!(
        "{:<14} {:<12} {:<20} {:>6} {:<8} {:<12} DEADLINE",
        "ID", "TYPE", "PRODUCT", "QTY", "PRIORITY", "STATUS"
    );
    println!("{}", "-".repeat(90));
    for order in &orders {
        println!(
            "{:<14} {:<12} {:<20} {:>6} {:<8} {:<12} {}",
            order.id,
            order.order_type.as_str(),
            order.product_name.as_deref().unwrap_or("-"),
            order.quantity.map(|q| q.to_string()).unwrap_or_else(|| "-".to_string()),
            order.priority.as_str(),
            order.status.as_str(),
            order.deadline.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn add_order(
    session: &mut Session,
    output: &Output,
    product: &str,
    quantity: f64,
    deadline: Option<String>,
    priority: Option<Priority>,
    client: Option<String>,
) -> Result<()> {
    if quantity <= 0.0 {
        bail!("Quantity must be positive");
    }

    let snapshot = session.state().snapshot()?;
    let template = snapshot
        .config
        .as_ref()
        .and_then(|c| c.product(Some(product), Some(product)))
        .with_context(|| {
            format!(
                "Product not found: {} (add it with `plantboard product add`)",
                product
            )
        })?
        .clone();
    let mut orders = snapshot.orders.clone();

    let deadline = deadline.or_else(|| template.deadline.clone());
    if let Some(d) = &deadline {
        if parse_instant(d).is_none() {
            bail!("Invalid deadline '{}': expected an ISO 8601 date or date-time", d);
        }
    }

    let now = Utc::now();
    let id = new_id(
        EntityKind::Order,
        &format!("{}{}", template.name, orders.len()),
        now,
    );
    let mut order = ProductionOrder::production(id, &template.id, &template.name, quantity);
    order.deadline = deadline;
    order.priority = priority.unwrap_or(template.priority);
    order.client = client;
    order.color = Some(seeded_color(&order.id));

    orders.push(order.clone());
    session
        .state()
        .update_orders(orders)
        .context("Failed to save orders")?;

    if output.is_json() {
        output.data(&order);
    } else {
        output.success(&format!(
            "Added order: {} - {} x{}",
            order.id, template.name, quantity
        ));
    }
    Ok(())
}

fn remove_order(session: &mut Session, output: &Output, id: &str) -> Result<()> {
    let mut orders = session.state().snapshot()?.orders.clone();
    let Some(index) = orders.iter().position(|o| o.id == id) else {
        bail!("Order not found: {}", id);
    };
    let removed = orders.remove(index);
    let emptied = orders.is_empty();

    session
        .state()
        .update_orders(orders)
        .context("Failed to save orders")?;

    output.success(&format!("Removed order: {}", removed.id));
    if emptied && output.is_text() {
        println!("No orders left; the active schedule was cleared");
    }
    Ok(())
}

fn clear_orders(session: &mut Session, output: &Output) -> Result<()> {
    let count = session.state().snapshot()?.orders.len();
    session
        .state()
        .update_orders(Vec::new())
        .context("Failed to save orders")?;

    output.success(&format!("Removed {} order(s); the active schedule was cleared", count));
    Ok(())
}
