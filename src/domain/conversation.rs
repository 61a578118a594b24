//! Assistant conversations
//!
//! Conversations are stored as `conversations` documents. Each one has a
//! mode that decides what the assistant is asked to extract:
//!
//! - `config`: machines, operators and constraints, merged into a draft
//!   factory configuration carried by the conversation
//! - `whatif`: free-form scenario discussion over a configuration snapshot
//! - `orders`: production orders and new products, held as pending until
//!   committed to the gateway
//! - `general`: plain chat
//!
//! The stored JSON keeps a flat layout (`mode`, `factoryConfig`,
//! `pendingOrders`, `pendingProducts`); in memory the mode owns its payload.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::factory::{
    BatchConstraint, FactoryConfig, Machine, MaintenanceConstraint, Operation, Operator, Product,
    SetupTime, TemporalConstraint,
};
use super::id::{new_id, EntityKind};
use super::order::{CleaningDetails, ColorChangeDetails, OrderType, Priority, ProductionOrder};

/// Title length kept when the first user message renames a conversation
const TITLE_LEN: usize = 30;

/// Default duration of an operation the assistant gave no time for
const DEFAULT_OPERATION_MINUTES: f64 = 15.0;

/// Estimated duration of extracted cleaning and maintenance orders
const DEFAULT_INTERVENTION_MINUTES: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePart {
    pub text: String,
}

/// A chat message in the assistant's history format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<MessagePart>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![MessagePart { text: text.into() }],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![MessagePart { text: text.into() }],
        }
    }

    /// All parts joined
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Mode tag without payload, as chosen when starting a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeKind {
    Config,
    WhatIf,
    Orders,
    #[default]
    General,
}

impl ModeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeKind::Config => "config",
            ModeKind::WhatIf => "whatif",
            ModeKind::Orders => "orders",
            ModeKind::General => "general",
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            ModeKind::Config => "New Configuration",
            ModeKind::WhatIf => "What-If Scenario",
            ModeKind::Orders => "Production Orders",
            ModeKind::General => "General Chat",
        }
    }

    /// Opening message from the assistant
    pub fn greeting(&self, language: &str) -> &'static str {
        let french = language.eq_ignore_ascii_case("fr");
        match self {
            ModeKind::Config => {
                "I'm ready to help you configure your factory. Tell me about your machines, operators, and constraints."
            }
            ModeKind::WhatIf => {
                "Describe the scenario you want to test (e.g., 'What if Machine A breaks down for 4 hours?')."
            }
            ModeKind::Orders if french => ORDERS_GREETING_FR,
            ModeKind::Orders => ORDERS_GREETING_EN,
            ModeKind::General if french => "Bonjour! Comment puis-je vous aider aujourd'hui?",
            ModeKind::General => "Hello! How can I help you today?",
        }
    }

    /// JSON schema the assistant must answer with, if the mode extracts data
    pub fn response_schema(&self) -> Option<Value> {
        match self {
            ModeKind::Config => Some(config_schema()),
            ModeKind::Orders => Some(orders_schema()),
            ModeKind::WhatIf | ModeKind::General => None,
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "config" => Ok(ModeKind::Config),
            "whatif" | "what-if" => Ok(ModeKind::WhatIf),
            "orders" => Ok(ModeKind::Orders),
            "general" => Ok(ModeKind::General),
            other => Err(format!(
                "unknown mode '{}' (expected config, whatif, orders or general)",
                other
            )),
        }
    }
}

const ORDERS_GREETING_EN: &str = "**Production Orders Assistant**

I'm here to help you create production orders. Just describe what you need to produce!

**Examples:**
- \"100 deodorant sticks for Thursday\"
- \"500 urgent roll-ons for tomorrow morning\"
- \"Color change from white to black on line A\"
- \"Preventive maintenance on CNC_Alpha Friday\"

I'll extract the product (creating it if needed), the quantity, the deadline and the priority.";

const ORDERS_GREETING_FR: &str = "**Assistant Commandes Production**

Je suis là pour vous aider à créer des commandes de production. Décrivez-moi simplement ce que vous devez produire !

**Exemples :**
- \"100 déodorants stick pour jeudi\"
- \"500 roll-on urgents pour demain matin\"
- \"Changement de couleur blanc vers noir sur la ligne A\"
- \"Maintenance préventive sur CNC_Alpha vendredi\"

J'extrais le produit (créé s'il n'existe pas), la quantité, la deadline et la priorité.";

/// Mode with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationMode {
    Config {
        factory_config: FactoryConfig,
    },
    WhatIf {
        factory_config: FactoryConfig,
    },
    Orders {
        pending_orders: Vec<ProductionOrder>,
        pending_products: Vec<Product>,
    },
    General,
}

impl ConversationMode {
    /// Empty payload for a mode
    pub fn empty(kind: ModeKind) -> Self {
        match kind {
            ModeKind::Config => ConversationMode::Config {
                factory_config: FactoryConfig::default(),
            },
            ModeKind::WhatIf => ConversationMode::WhatIf {
                factory_config: FactoryConfig::default(),
            },
            ModeKind::Orders => ConversationMode::Orders {
                pending_orders: Vec::new(),
                pending_products: Vec::new(),
            },
            ModeKind::General => ConversationMode::General,
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            ConversationMode::Config { .. } => ModeKind::Config,
            ConversationMode::WhatIf { .. } => ModeKind::WhatIf,
            ConversationMode::Orders { .. } => ModeKind::Orders,
            ConversationMode::General => ModeKind::General,
        }
    }

    pub fn factory_config(&self) -> Option<&FactoryConfig> {
        match self {
            ConversationMode::Config { factory_config }
            | ConversationMode::WhatIf { factory_config } => Some(factory_config),
            _ => None,
        }
    }
}

/// A stored conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireConversation", into = "WireConversation")]
pub struct Conversation {
    /// Gateway document ID (not part of the stored payload)
    pub id: Option<String>,
    pub title: String,
    pub messages: Vec<Message>,
    pub mode: ConversationMode,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireConversation {
    #[serde(default)]
    title: String,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    factory_config: Option<FactoryConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_orders: Option<Vec<ProductionOrder>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_products: Option<Vec<Product>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

impl From<WireConversation> for Conversation {
    fn from(wire: WireConversation) -> Self {
        let kind = wire
            .mode
            .as_deref()
            .and_then(|m| m.parse::<ModeKind>().ok())
            .unwrap_or_default();

        let mode = match kind {
            ModeKind::Config => ConversationMode::Config {
                factory_config: wire.factory_config.unwrap_or_default(),
            },
            ModeKind::WhatIf => ConversationMode::WhatIf {
                factory_config: wire.factory_config.unwrap_or_default(),
            },
            ModeKind::Orders => ConversationMode::Orders {
                pending_orders: wire.pending_orders.unwrap_or_default(),
                pending_products: wire.pending_products.unwrap_or_default(),
            },
            ModeKind::General => ConversationMode::General,
        };

        Self {
            id: None,
            title: wire.title,
            messages: wire.messages,
            mode,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        }
    }
}

impl From<Conversation> for WireConversation {
    fn from(conv: Conversation) -> Self {
        let kind = conv.mode.kind();
        let (factory_config, pending_orders, pending_products) = match conv.mode {
            ConversationMode::Config { factory_config }
            | ConversationMode::WhatIf { factory_config } => (Some(factory_config), None, None),
            ConversationMode::Orders {
                pending_orders,
                pending_products,
            } => (None, Some(pending_orders), Some(pending_products)),
            ConversationMode::General => (None, None, None),
        };

        Self {
            title: conv.title,
            messages: conv.messages,
            mode: Some(kind.as_str().to_string()),
            factory_config,
            pending_orders,
            pending_products,
            created_at: conv.created_at,
            updated_at: conv.updated_at,
        }
    }
}

/// What one assistant answer changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerOutcome {
    pub text: String,
    pub config_updated: bool,
    pub orders_extracted: usize,
    pub products_extracted: usize,
}

impl Conversation {
    /// Starts a conversation with the mode's greeting
    pub fn start(kind: ModeKind, language: &str, now: DateTime<Utc>) -> Self {
        let stamp = now.to_rfc3339();
        Self {
            id: None,
            title: kind.default_title().to_string(),
            messages: vec![Message::model(kind.greeting(language))],
            mode: ConversationMode::empty(kind),
            created_at: Some(stamp.clone()),
            updated_at: Some(stamp),
        }
    }

    /// Seeds a config or what-if conversation with the active configuration
    pub fn seed_config(&mut self, config: FactoryConfig) {
        match &mut self.mode {
            ConversationMode::Config { factory_config }
            | ConversationMode::WhatIf { factory_config } => {
                *factory_config = config;
                self.messages.push(Message::model(
                    "*System*: Initialized with **Active Factory Configuration**.",
                ));
            }
            _ => {}
        }
    }

    pub fn kind(&self) -> ModeKind {
        self.mode.kind()
    }

    /// Context string sent alongside prompts
    pub fn context(&self) -> Option<String> {
        let config = self.mode.factory_config()?;
        serde_json::to_string(config)
            .ok()
            .map(|json| format!("Current Factory Config: {}", json))
    }

    /// Appends a user message, renaming the conversation on the first one
    pub fn push_user(&mut self, text: &str, now: DateTime<Utc>) {
        if self.messages.len() <= 1 {
            self.title = short_title(text);
        }
        self.messages.push(Message::user(text));
        self.updated_at = Some(now.to_rfc3339());
    }

    /// Applies an assistant answer and appends its reply
    ///
    /// Structured answers are merged into the mode's payload; anything
    /// else is shown as text.
    pub fn apply_answer(&mut self, answer: &Value, now: DateTime<Utc>) -> AnswerOutcome {
        let mut outcome = AnswerOutcome::default();
        let response_text = answer
            .get("assistant_response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if let Some(extracted) = answer.get("extracted_config").filter(|v| v.is_object()) {
            outcome.text = response_text;
            if let ConversationMode::Config { factory_config }
            | ConversationMode::WhatIf { factory_config } = &mut self.mode
            {
                merge_extracted_config(factory_config, extracted, now);
                outcome.config_updated = true;
            }
            if outcome.text.is_empty() {
                outcome.text = "Configuration updated based on your request.".to_string();
            }
        } else if answer.get("extracted_orders").is_some() || answer.get("extracted_products").is_some() {
            outcome.text = if response_text.is_empty() {
                "I have noted your orders.".to_string()
            } else {
                response_text
            };
            if let ConversationMode::Orders {
                pending_orders,
                pending_products,
            } = &mut self.mode
            {
                let (orders, products) = extract_orders(answer, now);
                outcome.orders_extracted = orders.len();
                outcome.products_extracted = products.len();
                pending_orders.extend(orders);
                pending_products.extend(products);
            }
        } else if let Some(text) = answer.as_str() {
            outcome.text = text.to_string();
        } else if !response_text.is_empty() {
            outcome.text = response_text;
        } else if !answer.is_null() {
            outcome.text = answer.to_string();
        }

        if outcome.text.is_empty() {
            outcome.text = "I processed your request but have nothing specific to show.".to_string();
        }

        self.messages.push(Message::model(outcome.text.clone()));
        self.updated_at = Some(now.to_rfc3339());
        outcome
    }

    /// Takes the pending orders and products, leaving them empty
    pub fn take_pending(&mut self) -> (Vec<ProductionOrder>, Vec<Product>) {
        match &mut self.mode {
            ConversationMode::Orders {
                pending_orders,
                pending_products,
            } => (
                std::mem::take(pending_orders),
                std::mem::take(pending_products),
            ),
            _ => (Vec::new(), Vec::new()),
        }
    }

    pub fn has_pending(&self) -> bool {
        matches!(&self.mode, ConversationMode::Orders { pending_orders, pending_products }
            if !pending_orders.is_empty() || !pending_products.is_empty())
    }
}

fn short_title(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() > TITLE_LEN {
        format!("{}...", text.chars().take(TITLE_LEN).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Color derived from a seed, used for orders the assistant created
pub fn seeded_color(seed: &str) -> String {
    let hash = blake3::hash(seed.as_bytes());
    format!("#{}", &hash.to_hex()[..6])
}

// ============================================================================
// Config extraction
// ============================================================================

#[derive(Debug, Deserialize)]
struct ExtractedMachine {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    capabilities: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractedOperator {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    processing_times: BTreeMap<String, f64>,
}

/// Items of an extracted list that parse; malformed entries are dropped
fn parse_items<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Union of two capability or skill lists, lower-cased, first-seen order
fn union_lowercase(existing: &[String], extra: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in existing.iter().chain(extra) {
        let lower = item.to_lowercase();
        if !out.contains(&lower) {
            out.push(lower);
        }
    }
    out
}

/// Merges an `extracted_config` object into a configuration
///
/// Machines and operators are matched by case-insensitive name; matches get
/// their capabilities or skills unioned, new entries are appended with a
/// generated ID. Constraint lists are appended.
pub fn merge_extracted_config(config: &mut FactoryConfig, extracted: &Value, now: DateTime<Utc>) {
    let machines: Vec<ExtractedMachine> = parse_items(extracted.get("machines"));
    for (idx, found) in machines.into_iter().enumerate() {
        let lower = found.name.to_lowercase();
        match config
            .machines
            .iter_mut()
            .find(|m| m.name.to_lowercase() == lower)
        {
            Some(existing) => {
                existing.capabilities = union_lowercase(&existing.capabilities, &found.capabilities);
            }
            None => {
                let id = found
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| new_id(EntityKind::Machine, &format!("{}{}", found.name, idx), now));
                let mut machine = Machine::new(id, found.name);
                machine.capabilities = found.capabilities;
                config.machines.push(machine);
            }
        }
    }

    let operators: Vec<ExtractedOperator> = parse_items(extracted.get("operators"));
    for (idx, found) in operators.into_iter().enumerate() {
        let lower = found.name.to_lowercase();
        match config
            .operators
            .iter_mut()
            .find(|o| o.name.to_lowercase() == lower)
        {
            Some(existing) => {
                existing.skills = union_lowercase(&existing.skills, &found.skills);
                existing.processing_times.extend(found.processing_times);
            }
            None => {
                let id = found
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| new_id(EntityKind::Operator, &format!("{}{}", found.name, idx), now));
                let mut operator = Operator::new(id, found.name);
                operator.skills = found.skills;
                operator.processing_times = found.processing_times;
                config.operators.push(operator);
            }
        }
    }

    let constraints = &mut config.constraints;

    let mut setup: Vec<SetupTime> = parse_items(extracted.get("constraints_setup_times"));
    assign_ids(&mut setup, EntityKind::SetupTime, now, |s| &mut s.id);
    constraints.setup_times.extend(setup);

    let mut temporal: Vec<TemporalConstraint> = parse_items(extracted.get("constraints_temporal"));
    assign_ids(&mut temporal, EntityKind::Temporal, now, |t| &mut t.id);
    constraints.temporal.extend(temporal);

    let mut batching: Vec<BatchConstraint> = parse_items(extracted.get("constraints_batching"));
    assign_ids(&mut batching, EntityKind::Batching, now, |b| &mut b.id);
    constraints.batching.extend(batching);

    let mut maintenance: Vec<MaintenanceConstraint> =
        parse_items(extracted.get("constraints_maintenance"));
    assign_ids(&mut maintenance, EntityKind::Maintenance, now, |m| &mut m.id);
    constraints.maintenance.extend(maintenance);
}

fn assign_ids<T>(
    items: &mut [T],
    kind: EntityKind,
    now: DateTime<Utc>,
    id: impl Fn(&mut T) -> &mut String,
) {
    for (idx, item) in items.iter_mut().enumerate() {
        let slot = id(item);
        if slot.is_empty() {
            *slot = new_id(kind, &idx.to_string(), now);
        }
    }
}

// ============================================================================
// Orders extraction
// ============================================================================

#[derive(Debug, Deserialize)]
struct ExtractedOperation {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    capability_required: Option<String>,
    #[serde(default)]
    duration_minutes: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ExtractedProduct {
    name: String,
    #[serde(default)]
    default_operations: Vec<ExtractedOperation>,
}

#[derive(Debug, Deserialize)]
struct ExtractedOrder {
    #[serde(rename = "type", default)]
    order_type: OrderType,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    quantity: Option<f64>,
    #[serde(default)]
    deadline: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    client: Option<String>,
    #[serde(default)]
    color_from: Option<String>,
    #[serde(default)]
    color_to: Option<String>,
    #[serde(default)]
    machine_id: Option<String>,
}

/// Builds pending orders and products from an orders-mode answer
pub fn extract_orders(answer: &Value, now: DateTime<Utc>) -> (Vec<ProductionOrder>, Vec<Product>) {
    let products: Vec<ExtractedProduct> = parse_items(answer.get("extracted_products"));
    let products = products
        .into_iter()
        .enumerate()
        .map(|(pidx, p)| {
            let operations = p
                .default_operations
                .into_iter()
                .enumerate()
                .map(|(idx, op)| Operation {
                    id: new_id(EntityKind::Operation, &format!("{}{}", p.name, idx), now),
                    name: op.name.unwrap_or_else(|| format!("Operation {}", idx + 1)),
                    machine_capability_required: op
                        .capability_required
                        .filter(|c| !c.is_empty())
                        .unwrap_or_else(|| "general".to_string()),
                    duration_minutes: op
                        .duration_minutes
                        .filter(|d| *d > 0.0)
                        .unwrap_or(DEFAULT_OPERATION_MINUTES),
                })
                .collect();

            Product {
                id: new_id(EntityKind::Product, &format!("{}{}", p.name, pidx), now),
                name: p.name,
                priority: Priority::Normal,
                operations,
                deadline: None,
            }
        })
        .collect();

    let orders: Vec<ExtractedOrder> = parse_items(answer.get("extracted_orders"));
    let orders = orders
        .into_iter()
        .enumerate()
        .map(|(idx, o)| {
            let id = new_id(
                EntityKind::Order,
                &format!("{}{}", o.product_name.as_deref().unwrap_or_default(), idx),
                now,
            );
            let mut order = ProductionOrder::of_type(id, o.order_type);
            order.priority = o
                .priority
                .as_deref()
                .and_then(|p| p.parse().ok())
                .unwrap_or_default();
            order.client = o.client;
            order.deadline = o.deadline;
            order.color = Some(seeded_color(&order.id));

            match o.order_type {
                OrderType::Production => {
                    order.product_name = o.product_name;
                    order.quantity = Some(o.quantity.filter(|q| *q > 0.0).unwrap_or(1.0));
                }
                OrderType::ColorChange => {
                    order.color_change_details = Some(ColorChangeDetails {
                        from_color: o.color_from.unwrap_or_default(),
                        to_color: o.color_to.unwrap_or_default(),
                        machine_id: o.machine_id.unwrap_or_default(),
                    });
                }
                OrderType::Cleaning | OrderType::PreventiveMaintenance => {
                    order.cleaning_details = Some(CleaningDetails {
                        machine_id: o.machine_id.unwrap_or_default(),
                        estimated_duration: DEFAULT_INTERVENTION_MINUTES,
                    });
                }
                OrderType::ToolChange | OrderType::QualityControl => {}
            }
            order
        })
        .collect();

    (orders, products)
}

/// Counts of what a commit added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub products_added: usize,
    pub orders_added: usize,
}

/// Adds pending products to the configuration and pending orders to the list
///
/// Products whose name already exists (case-insensitive) are skipped.
/// Production orders are linked to a product ID by name when possible.
pub fn commit_pending(
    config: &mut FactoryConfig,
    orders: &mut Vec<ProductionOrder>,
    pending_orders: Vec<ProductionOrder>,
    pending_products: Vec<Product>,
) -> CommitSummary {
    let mut summary = CommitSummary::default();

    for product in pending_products {
        if config.product_by_name(&product.name).is_none() {
            config.typical_jobs.push(product);
            summary.products_added += 1;
        }
    }

    for mut order in pending_orders {
        if order.order_type == OrderType::Production {
            if let Some(product) = order
                .product_name
                .as_deref()
                .and_then(|name| config.product_by_name(name))
            {
                order.product_id = Some(product.id.clone());
            }
        }
        orders.push(order);
        summary.orders_added += 1;
    }

    summary
}

// ============================================================================
// Response schemas
// ============================================================================

fn config_schema() -> Value {
    let list = |props: Value| json!({"type": "array", "items": {"type": "object", "properties": props}});

    json!({
        "type": "object",
        "properties": {
            "assistant_response": {"type": "string"},
            "extracted_config": {
                "type": "object",
                "description": "Extracted factory entities and constraints",
                "properties": {
                    "machines": list(json!({
                        "name": {"type": "string"},
                        "capabilities": {"type": "array", "items": {"type": "string"}}
                    })),
                    "operators": list(json!({
                        "name": {"type": "string"},
                        "skills": {"type": "array", "items": {"type": "string"}},
                        "processing_times": {
                            "type": "object",
                            "additionalProperties": {"type": "number"},
                            "description": "Maps skill name to duration in minutes"
                        }
                    })),
                    "constraints_setup_times": list(json!({
                        "machine": {"type": "string"},
                        "duration_minutes": {"type": "number"},
                        "from_product": {"type": "string"},
                        "to_product": {"type": "string"}
                    })),
                    "constraints_temporal": list(json!({
                        "type": {"type": "string"},
                        "from_operation": {"type": "string"},
                        "to_operation": {"type": "string"},
                        "duration_minutes": {"type": "number"}
                    })),
                    "constraints_batching": list(json!({
                        "machine": {"type": "string"},
                        "min_size": {"type": "number"},
                        "max_size": {"type": "number"}
                    })),
                    "constraints_maintenance": list(json!({
                        "machine": {"type": "string"},
                        "duration_minutes": {"type": "number"},
                        "frequency_hours": {"type": "number"}
                    }))
                }
            }
        },
        "required": ["assistant_response"]
    })
}

fn orders_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "assistant_response": {
                "type": "string",
                "description": "Human-friendly response acknowledging the orders"
            },
            "extracted_orders": {
                "type": "array",
                "description": "Production orders extracted from user message",
                "items": {
                    "type": "object",
                    "properties": {
                        "type": {
                            "type": "string",
                            "enum": ["production", "color_change", "cleaning", "preventive_maintenance", "tool_change", "quality_control"]
                        },
                        "product_name": {"type": "string", "description": "Name of the product (for production orders)"},
                        "quantity": {"type": "number", "description": "Quantity to produce"},
                        "deadline": {"type": "string", "description": "ISO date string for deadline (YYYY-MM-DD)"},
                        "priority": {"type": "string", "enum": ["low", "normal", "high", "urgent"]},
                        "client": {"type": "string", "description": "Client name if mentioned"},
                        "notes": {"type": "string", "description": "Any special notes or requirements"},
                        "color_from": {"type": "string", "description": "For color_change: starting color"},
                        "color_to": {"type": "string", "description": "For color_change: target color"},
                        "machine_id": {"type": "string", "description": "For maintenance/cleaning: machine name"}
                    },
                    "required": ["type"]
                }
            },
            "extracted_products": {
                "type": "array",
                "description": "New products that need to be created (if mentioned products don't exist)",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "default_operations": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "name": {"type": "string"},
                                    "capability_required": {"type": "string"},
                                    "duration_minutes": {"type": "number"}
                                }
                            }
                        }
                    },
                    "required": ["name"]
                }
            }
        },
        "required": ["assistant_response"]
    })
}
