//! Assistant conversations stored as `conversations` documents

use chrono::{DateTime, Utc};

use crate::domain::{AnswerOutcome, Conversation};

use super::gateway::{doc_type, AskRequest, Assistant, Document, DocumentStore, GatewayError};

fn decode(document: Document) -> Option<Conversation> {
    match serde_json::from_value::<Conversation>(document.json_data) {
        Ok(mut conversation) => {
            conversation.id = Some(document.id);
            if conversation.created_at.is_none() {
                conversation.created_at = document.created_at;
            }
            Some(conversation)
        }
        Err(e) => {
            tracing::warn!(id = %document.id, error = %e, "skipping unreadable conversation");
            None
        }
    }
}

fn encode(conversation: &Conversation) -> Result<serde_json::Value, GatewayError> {
    serde_json::to_value(conversation).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}

/// Lists conversations, most recently updated first
pub fn list<S: DocumentStore>(store: &S) -> Result<Vec<Conversation>, GatewayError> {
    let mut conversations: Vec<Conversation> = store
        .list(doc_type::CONVERSATIONS)?
        .into_iter()
        .filter_map(decode)
        .collect();

    conversations.sort_by(|a, b| {
        let key = |c: &Conversation| c.updated_at.clone().or_else(|| c.created_at.clone());
        key(b).cmp(&key(a))
    });
    Ok(conversations)
}

pub fn get<S: DocumentStore>(store: &S, id: &str) -> Result<Option<Conversation>, GatewayError> {
    Ok(store.get(doc_type::CONVERSATIONS, id)?.and_then(decode))
}

/// Creates or updates a conversation, filling in its id on creation
pub fn save<S: DocumentStore>(store: &S, conversation: &mut Conversation) -> Result<(), GatewayError> {
    let data = encode(conversation)?;
    match &conversation.id {
        Some(id) => store.update(doc_type::CONVERSATIONS, id, &data),
        None => {
            let id = store.create(doc_type::CONVERSATIONS, &data, &conversation.title)?;
            conversation.id = Some(id);
            Ok(())
        }
    }
}

pub fn delete<S: DocumentStore>(store: &S, id: &str) -> Result<(), GatewayError> {
    store.delete(doc_type::CONVERSATIONS, id)
}

/// One chat turn: record the user message, ask, and apply the answer
///
/// The user message is kept even when the assistant call fails.
pub fn exchange<A: Assistant>(
    assistant: &A,
    conversation: &mut Conversation,
    text: &str,
    language: &str,
    now: DateTime<Utc>,
) -> Result<AnswerOutcome, GatewayError> {
    let history = conversation.messages.clone();
    conversation.push_user(text, now);

    let context = conversation.context();
    let request = AskRequest::new(
        text,
        context.as_deref(),
        conversation.kind().response_schema(),
        &history,
        language,
    );

    let answer = assistant.ask(&request)?;
    Ok(conversation.apply_answer(&answer, now))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::domain::{Machine, ModeKind};
    use crate::storage::state::fake::MemoryGateway;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    /// Assistant returning a canned answer and recording requests
    struct Canned {
        answer: Result<Value, ()>,
        seen: RefCell<Vec<Value>>,
    }

    impl Canned {
        fn new(answer: Value) -> Self {
            Self {
                answer: Ok(answer),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Assistant for Canned {
        fn ask(&self, request: &AskRequest<'_>) -> Result<Value, GatewayError> {
            self.seen.borrow_mut().push(serde_json::to_value(request).unwrap());
            self.answer.clone().map_err(|_| GatewayError::Transport {
                service: "gateway",
                message: "timeout".to_string(),
            })
        }
    }

    #[test]
    fn save_assigns_id_then_updates() {
        let gateway = MemoryGateway::default();
        let mut conv = Conversation::start(ModeKind::General, "en", now());

        save(&gateway, &mut conv).unwrap();
        let id = conv.id.clone().unwrap();

        conv.push_user("Hello there", now());
        save(&gateway, &mut conv).unwrap();

        let loaded = get(&gateway, &id).unwrap().unwrap();
        assert_eq!(loaded.title, "Hello there");
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(gateway.documents(doc_type::CONVERSATIONS).len(), 1);
    }

    #[test]
    fn list_sorts_recent_first_and_skips_garbage() {
        let gateway = MemoryGateway::default();
        let mut old = Conversation::start(ModeKind::General, "en", now());
        save(&gateway, &mut old).unwrap();

        let mut recent = Conversation::start(ModeKind::Orders, "en", now() + chrono::Duration::hours(1));
        save(&gateway, &mut recent).unwrap();

        gateway.seed(doc_type::CONVERSATIONS, json!({"messages": "not a list"}));

        let all = list(&gateway).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind(), ModeKind::Orders);
    }

    #[test]
    fn delete_removes_document() {
        let gateway = MemoryGateway::default();
        let mut conv = Conversation::start(ModeKind::General, "en", now());
        save(&gateway, &mut conv).unwrap();

        delete(&gateway, conv.id.as_deref().unwrap()).unwrap();
        assert!(list(&gateway).unwrap().is_empty());
    }

    #[test]
    fn exchange_sends_context_schema_and_prior_history() {
        let assistant = Canned::new(json!({
            "assistant_response": "Added the press.",
            "extracted_config": {"machines": [{"name": "Press"}]}
        }));
        let mut conv = Conversation::start(ModeKind::Config, "en", now());
        conv.seed_config(crate::domain::FactoryConfig {
            machines: vec![Machine::new("m-1", "Lathe")],
            ..Default::default()
        });

        let outcome = exchange(&assistant, &mut conv, "Add a press", "en", now()).unwrap();

        assert!(outcome.config_updated);
        assert_eq!(outcome.text, "Added the press.");
        assert_eq!(conv.mode.factory_config().unwrap().machines.len(), 2);

        let seen = assistant.seen.borrow();
        assert_eq!(seen[0]["prompt"], "Add a press");
        assert!(seen[0]["system_instruction"].as_str().unwrap().contains("Current Factory Config"));
        assert!(seen[0].get("json_schema").is_some());
        // Greeting and seed note, without the new prompt
        assert_eq!(seen[0]["history"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn failed_exchange_keeps_user_message() {
        let assistant = Canned {
            answer: Err(()),
            seen: RefCell::new(Vec::new()),
        };
        let mut conv = Conversation::start(ModeKind::General, "en", now());

        assert!(exchange(&assistant, &mut conv, "Hi", "en", now()).is_err());
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.title, "Hi");
    }
}
