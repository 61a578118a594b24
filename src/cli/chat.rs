//! Assistant conversation commands

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Subcommand;

use super::output::Output;
use super::session::Session;
use crate::domain::{commit_pending, CommitSummary, Conversation, ConversationMode, ModeKind, Role};
use crate::storage::{conversations, DocumentStore, StateStore};

#[derive(Subcommand)]
pub enum ChatCommands {
    /// List conversations, most recent first
    List,

    /// Start a conversation (config, whatif, orders or general)
    New {
        mode: ModeKind,
    },

    /// Print a conversation
    Show { id: String },

    /// Send a message and print the reply
    Send {
        id: String,

        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Delete a conversation
    Delete { id: String },

    /// Apply what the assistant extracted
    ///
    /// Orders conversations add their pending orders and products;
    /// config conversations publish their configuration as the active one.
    Commit { id: String },
}

pub fn run(cmd: ChatCommands, session: &mut Session, output: &Output) -> Result<()> {
    match cmd {
        ChatCommands::List => list(session, output),
        ChatCommands::New { mode } => start(session, output, mode),
        ChatCommands::Show { id } => show(session, output, &id),
        ChatCommands::Send { id, text } => send(session, output, &id, &text.join(" ")),
        ChatCommands::Delete { id } => {
            conversations::delete(session.gateway(), &id)
                .with_context(|| format!("Failed to delete conversation {}", id))?;
            output.success(&format!("Deleted conversation: {}", id));
            Ok(())
        }
        ChatCommands::Commit { id } => commit_cmd(session, output, &id),
    }
}

fn load(session: &Session, id: &str) -> Result<Conversation> {
    conversations::get(session.gateway(), id)?.with_context(|| format!("Conversation not found: {}", id))
}

fn list(session: &mut Session, output: &Output) -> Result<()> {
    let all = conversations::list(session.gateway())?;

    if output.is_json() {
        let items: Vec<_> = all
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "title": c.title,
                    "mode": c.kind().as_str(),
                    "messages": c.messages.len(),
                    "pending": c.has_pending(),
                    "updated_at": c.updated_at,
                })
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    if all.is_empty() {
        println!("No conversations");
        return Ok(());
    }

    println!("{:<28} {:<8} {:>5} TITLE", "ID", "MODE", "MSGS");
    println!("{}", "-".repeat(70));
    for conv in &all {
        println!(
            "{:<28} {:<8} {:>5} {}{}",
            conv.id.as_deref().unwrap_or("-"),
            conv.kind().as_str(),
            conv.messages.len(),
            conv.title,
            if conv.has_pending() { " (pending)" } else { "" }
        );
    }
    Ok(())
}

fn start(session: &mut Session, output: &Output, mode: ModeKind) -> Result<()> {
    let mut conv = Conversation::start(mode, &session.config.language, Utc::now());
    if matches!(mode, ModeKind::Config | ModeKind::WhatIf) {
        if let Some(config) = session.state().snapshot()?.config.clone() {
            conv.seed_config(config);
        }
    }
    conversations::save(session.gateway(), &mut conv).context("Failed to save conversation")?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": conv.id,
            "mode": mode.as_str(),
            "title": conv.title,
        }));
        return Ok(());
    }

    output.success(&format!(
        "Started conversation: {}",
        conv.id.as_deref().unwrap_or("-")
    ));
    for message in &conv.messages {
        println!("assistant: {}", message.text());
    }
    Ok(())
}

fn show(session: &mut Session, output: &Output, id: &str) -> Result<()> {
    let conv = load(session, id)?;

    if output.is_json() {
        output.data(&conv);
        return Ok(());
    }

    println!("{} [{}]", conv.title, conv.kind().as_str());
    println!("{}", "-".repeat(60));
    for message in &conv.messages {
        let who = match message.role {
            Role::User => "you",
            Role::Model => "assistant",
        };
        println!("{}: {}", who, message.text());
    }

    if let ConversationMode::Orders {
        pending_orders,
        pending_products,
    } = &conv.mode
    {
        if !pending_orders.is_empty() || !pending_products.is_empty() {
            println!();
            println!(
                "Pending: {} order(s), {} product(s); run `plantboard chat commit {}`",
                pending_orders.len(),
                pending_products.len(),
                id
            );
        }
    }
    Ok(())
}

fn send(session: &mut Session, output: &Output, id: &str, text: &str) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        bail!("Message cannot be empty");
    }

    let mut conv = load(session, id)?;
    let language = session.config.language.clone();
    let answer = conversations::exchange(session.gateway(), &mut conv, text, &language, Utc::now());

    // Keep the user's message even if the assistant failed
    conversations::save(session.gateway(), &mut conv).context("Failed to save conversation")?;
    let outcome = answer.context("Assistant request failed")?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "reply": outcome.text,
            "config_updated": outcome.config_updated,
            "orders_extracted": outcome.orders_extracted,
            "products_extracted": outcome.products_extracted,
        }));
        return Ok(());
    }

    println!("assistant: {}", outcome.text);
    if outcome.config_updated {
        println!();
        println!("Working configuration updated; run `plantboard chat commit {}` to publish it", id);
    }
    if outcome.orders_extracted > 0 || outcome.products_extracted > 0 {
        println!();
        println!(
            "Extracted {} order(s) and {} product(s); run `plantboard chat commit {}` to add them",
            outcome.orders_extracted, outcome.products_extracted, id
        );
    }
    Ok(())
}

/// What a commit changed
#[derive(Debug, PartialEq)]
pub(super) enum Committed {
    Orders(CommitSummary),
    Config { machines: usize },
}

/// Applies a conversation's extracted data to the production state
pub(super) fn commit<S: DocumentStore>(state: &mut StateStore<S>, conv: &mut Conversation) -> Result<Committed> {
    match &conv.mode {
        ConversationMode::Orders { .. } => {
            if !conv.has_pending() {
                bail!("Nothing pending in this conversation");
            }
            let snapshot = state.snapshot()?;
            let mut config = snapshot.config_or_default();
            let mut orders = snapshot.orders.clone();

            let (pending_orders, pending_products) = conv.take_pending();
            let summary = commit_pending(&mut config, &mut orders, pending_orders, pending_products);

            if summary.products_added > 0 {
                state.update_config(config, "Products from assistant")?;
            }
            if summary.orders_added > 0 {
                state.update_orders(orders)?;
            }
            Ok(Committed::Orders(summary))
        }
        ConversationMode::Config { factory_config } => {
            let config = factory_config.clone();
            let machines = config.machines.len();
            state.update_config(config, "Configuration from assistant")?;
            Ok(Committed::Config { machines })
        }
        ConversationMode::WhatIf { .. } | ConversationMode::General => {
            bail!("Only orders and config conversations can be committed")
        }
    }
}

fn commit_cmd(session: &mut Session, output: &Output, id: &str) -> Result<()> {
    let mut conv = load(session, id)?;
    let committed = commit(session.state(), &mut conv)?;
    conversations::save(session.gateway(), &mut conv).context("Failed to save conversation")?;

    match committed {
        Committed::Orders(summary) => {
            if output.is_json() {
                output.data(&serde_json::json!({
                    "orders_added": summary.orders_added,
                    "products_added": summary.products_added,
                }));
            } else {
                output.success(&format!(
                    "Added {} order(s) and {} new product(s)",
                    summary.orders_added, summary.products_added
                ));
            }
        }
        Committed::Config { machines } => {
            if output.is_json() {
                output.data(&serde_json::json!({ "published": true, "machines": machines }));
            } else {
                output.success(&format!("Published configuration ({} machines)", machines));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FactoryConfig, Machine, Priority, Product, ProductionOrder};
    use crate::storage::MemoryGateway;

    fn orders_conversation() -> Conversation {
        let mut conv = Conversation::start(ModeKind::Orders, "en", Utc::now());
        conv.mode = ConversationMode::Orders {
            pending_orders: vec![ProductionOrder::production("ord-1", "", "Gear", 3.0)],
            pending_products: vec![Product {
                id: "product-1".to_string(),
                name: "Gear".to_string(),
                priority: Priority::Normal,
                operations: vec![],
                deadline: None,
            }],
        };
        conv
    }

    #[test]
    fn committing_orders_links_products() {
        let mut state = StateStore::new(MemoryGateway::default());
        let mut conv = orders_conversation();

        let committed = commit(&mut state, &mut conv).unwrap();
        assert_eq!(
            committed,
            Committed::Orders(CommitSummary {
                products_added: 1,
                orders_added: 1
            })
        );
        assert!(!conv.has_pending());

        state.invalidate();
        let snapshot = state.snapshot().unwrap();
        assert_eq!(snapshot.orders[0].product_id.as_deref(), Some("product-1"));
        assert_eq!(snapshot.config.as_ref().unwrap().typical_jobs.len(), 1);
    }

    #[test]
    fn nothing_pending_is_an_error() {
        let mut state = StateStore::new(MemoryGateway::default());
        let mut conv = Conversation::start(ModeKind::Orders, "en", Utc::now());
        assert!(commit(&mut state, &mut conv).is_err());
    }

    #[test]
    fn config_conversation_publishes_its_config() {
        let mut state = StateStore::new(MemoryGateway::default());
        let mut conv = Conversation::start(ModeKind::Config, "en", Utc::now());
        conv.seed_config(FactoryConfig {
            machines: vec![Machine::new("m-1", "Press"), Machine::new("m-2", "Oven")],
            ..Default::default()
        });

        assert_eq!(commit(&mut state, &mut conv).unwrap(), Committed::Config { machines: 2 });
        assert_eq!(state.snapshot().unwrap().config.as_ref().unwrap().machines.len(), 2);
    }

    #[test]
    fn general_conversation_cannot_commit() {
        let mut state = StateStore::new(MemoryGateway::default());
        let mut conv = Conversation::start(ModeKind::General, "en", Utc::now());
        assert!(commit(&mut state, &mut conv).is_err());
    }
}
