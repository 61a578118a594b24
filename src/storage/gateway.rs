//! Document-storage gateway client
//!
//! The gateway stores untyped JSON documents grouped by type:
//!
//! | Call | Endpoint |
//! |------|----------|
//! | create | `POST /api/v1/data/{type}` with `{json_data, description}` |
//! | list | `GET /api/v1/data/{type}/all` |
//! | update | `PUT /api/v1/data/{type}/one/{id}` with `{json_data}` |
//! | delete | `DELETE /api/v1/data/{type}/{id}` |
//!
//! It also fronts the AI assistant at `POST /api/v2/assistant/ask`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::{parse_instant, Message};

/// Document types used by the dashboard
pub mod doc_type {
    pub const FACTORY_CONFIG: &str = "active_factory_config";
    pub const SCHEDULE: &str = "active_schedule";
    pub const ORDERS: &str = "production_orders";
    pub const CONVERSATIONS: &str = "conversations";
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} unreachable: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Maps a ureq failure, reading the body of HTTP error responses
    pub(crate) fn from_ureq(service: &'static str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => GatewayError::Status {
                service,
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => GatewayError::Transport {
                service,
                message: transport.to_string(),
            },
        }
    }
}

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub json_data: Value,
}

impl Document {
    /// Revision marker used for optimistic concurrency
    pub fn revision(&self) -> Option<&str> {
        self.updated_at.as_deref().or(self.created_at.as_deref())
    }

    fn created(&self) -> DateTime<Utc> {
        self.created_at
            .as_deref()
            .and_then(parse_instant)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Picks the most recently created document
///
/// Documents without a parseable `created_at` sort as the oldest; on ties
/// the first one listed wins.
pub fn latest(documents: Vec<Document>) -> Option<Document> {
    documents.into_iter().fold(None, |best, doc| match best {
        Some(b) if b.created() >= doc.created() => Some(b),
        _ => Some(doc),
    })
}

/// Tags a payload with the application identifier
///
/// Objects get an `app_identifier` key; anything else is wrapped as
/// `{data, app_identifier}`.
pub fn tag_payload(data: &Value, app_identifier: &str) -> Value {
    match data {
        Value::Object(map) => {
            let mut map = map.clone();
            map.insert("app_identifier".to_string(), Value::from(app_identifier));
            Value::Object(map)
        }
        other => json!({ "data": other, "app_identifier": app_identifier }),
    }
}

/// Generic document CRUD
pub trait DocumentStore {
    fn list(&self, doc_type: &str) -> Result<Vec<Document>, GatewayError>;

    /// Creates a document and returns its id
    fn create(&self, doc_type: &str, data: &Value, description: &str) -> Result<String, GatewayError>;

    fn update(&self, doc_type: &str, id: &str, data: &Value) -> Result<(), GatewayError>;

    fn delete(&self, doc_type: &str, id: &str) -> Result<(), GatewayError>;

    fn latest(&self, doc_type: &str) -> Result<Option<Document>, GatewayError> {
        Ok(latest(self.list(doc_type)?))
    }

    fn get(&self, doc_type: &str, id: &str) -> Result<Option<Document>, GatewayError> {
        Ok(self.list(doc_type)?.into_iter().find(|d| d.id == id))
    }
}

/// Body of an assistant request
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest<'a> {
    pub prompt: &'a str,
    pub system_instruction: String,
    pub provider: &'static str,
    pub level: &'static str,
    pub history: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<Value>,
}

impl<'a> AskRequest<'a> {
    pub fn new(
        prompt: &'a str,
        context: Option<&str>,
        json_schema: Option<Value>,
        history: &'a [Message],
        language: &str,
    ) -> Self {
        let system_instruction = match context {
            Some(context) => format!(
                "You are an expert scheduler assistant. Context: {}. IMPORTANT: Respond in {}.",
                context, language
            ),
            None => format!(
                "You are an expert scheduler assistant. IMPORTANT: Respond in {}.",
                language
            ),
        };

        Self {
            prompt,
            system_instruction,
            provider: "google",
            level: "mid",
            history,
            json_schema,
        }
    }

    pub fn is_structured(&self) -> bool {
        self.json_schema.is_some()
    }
}

/// Reads `results.assistant_response`, decoding structured answers
///
/// Structured answers usually arrive as a JSON string; when it does not
/// parse, the raw text is kept.
pub fn interpret_answer(body: &Value, structured: bool) -> Result<Value, GatewayError> {
    let answer = body
        .pointer("/results/assistant_response")
        .cloned()
        .ok_or_else(|| GatewayError::InvalidResponse("missing results.assistant_response".to_string()))?;

    match answer {
        Value::String(text) if structured => match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse structured assistant response, keeping raw text");
                Ok(Value::String(text))
            }
        },
        other => Ok(other),
    }
}

pub trait Assistant {
    fn ask(&self, request: &AskRequest<'_>) -> Result<Value, GatewayError>;
}

/// HTTP client for the gateway
pub struct GatewayClient {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
    app_identifier: String,
}

impl GatewayClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        app_identifier: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            app_identifier: app_identifier.into(),
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %url, "gateway request");

        let request = self
            .agent
            .request(method, &url)
            .set("Content-Type", "application/json");
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    fn read_json(response: ureq::Response) -> Result<Value, GatewayError> {
        response
            .into_json::<Value>()
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    fn send(&self, method: &str, path: &str, body: Option<Value>) -> Result<Value, GatewayError> {
        let request = self.request(method, path);
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };

        match result {
            Ok(response) => Self::read_json(response),
            Err(e) => {
                let err = GatewayError::from_ureq("gateway", e);
                tracing::warn!(%method, %path, error = %err, "gateway call failed");
                Err(err)
            }
        }
    }
}

/// Extracts `results[0].inserted_id` from a create response
fn inserted_id(body: &Value) -> Result<String, GatewayError> {
    body.pointer("/results/0/inserted_id")
        .and_then(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .ok_or_else(|| GatewayError::InvalidResponse("missing results[0].inserted_id".to_string()))
}

/// Parses the `results` array of a list response
fn parse_documents(body: Value) -> Result<Vec<Document>, GatewayError> {
    match body.get("results") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(results) => serde_json::from_value(results.clone())
            .map_err(|e| GatewayError::InvalidResponse(format!("bad document list: {}", e))),
    }
}

impl DocumentStore for GatewayClient {
    fn list(&self, doc_type: &str) -> Result<Vec<Document>, GatewayError> {
        let body = self.send("GET", &format!("/api/v1/data/{}/all", doc_type), None)?;
        let documents = parse_documents(body)?;
        tracing::debug!(%doc_type, count = documents.len(), "listed documents");
        Ok(documents)
    }

    fn create(&self, doc_type: &str, data: &Value, description: &str) -> Result<String, GatewayError> {
        let body = json!({
            "json_data": tag_payload(data, &self.app_identifier),
            "description": description,
        });
        let response = self.send("POST", &format!("/api/v1/data/{}", doc_type), Some(body))?;
        inserted_id(&response)
    }

    fn update(&self, doc_type: &str, id: &str, data: &Value) -> Result<(), GatewayError> {
        let body = json!({ "json_data": tag_payload(data, &self.app_identifier) });
        self.send("PUT", &format!("/api/v1/data/{}/one/{}", doc_type, id), Some(body))?;
        Ok(())
    }

    fn delete(&self, doc_type: &str, id: &str) -> Result<(), GatewayError> {
        self.send("DELETE", &format!("/api/v1/data/{}/{}", doc_type, id), None)?;
        Ok(())
    }
}

impl Assistant for GatewayClient {
    fn ask(&self, request: &AskRequest<'_>) -> Result<Value, GatewayError> {
        let body = serde_json::to_value(request)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let response = self.send("POST", "/api/v2/assistant/ask", Some(body))?;
        interpret_answer(&response, request.is_structured())
    }
}
