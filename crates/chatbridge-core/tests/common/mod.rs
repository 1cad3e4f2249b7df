#![allow(dead_code)]

use async_trait::async_trait;
use chatbridge_client::{Backend, ClientError};
use chatbridge_config::Settings;
use chatbridge_types::{
    ChatCompletionRequest, ChatMessage, Message, MessageRole, ModelEntry, ModelRef, Part,
    ProviderCatalog, ProviderEntry, Session, SessionTime, ToolState,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory agent server driven by a script of poll answers.
#[derive(Default)]
pub struct ScriptedBackend {
    pub create_calls: AtomicUsize,
    pub get_message_calls: AtomicUsize,
    pub get_messages_calls: AtomicUsize,
    pub create_delay: Mutex<Option<Duration>>,
    pub fail_create: AtomicBool,
    pub fail_send: AtomicBool,
    pub fail_list: AtomicBool,
    pub fail_get_messages: AtomicBool,
    /// Message returned by `send_prompt`.
    pub reply: Mutex<Option<Message>>,
    /// Messages the agent appends on its own after the reply.
    pub follow_ups: Mutex<Vec<Message>>,
    /// Answers for successive `get_message` calls.
    pub polls: Mutex<VecDeque<Result<Message, ClientError>>>,
    pub history: Mutex<Vec<Message>>,
    pub prompts: Mutex<Vec<(String, String, ModelRef)>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: Message) -> Self {
        *self.reply.lock().unwrap() = Some(reply);
        self
    }

    pub fn with_polls(self, polls: Vec<Result<Message, ClientError>>) -> Self {
        *self.polls.lock().unwrap() = polls.into();
        self
    }

    pub fn with_follow_ups(self, follow_ups: Vec<Message>) -> Self {
        *self.follow_ups.lock().unwrap() = follow_ups;
        self
    }

    pub fn with_history(self, history: Vec<Message>) -> Self {
        *self.history.lock().unwrap() = history;
        self
    }

    pub fn with_create_delay(self, delay: Duration) -> Self {
        *self.create_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.get_message_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn create_session(&self, title: &str) -> Result<Session, ClientError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ClientError::Connection("connection refused".into()));
        }
        Ok(Session {
            id: format!("ses_{}", n),
            title: Some(title.to_string()),
            time: Some(SessionTime {
                created: 1_700_000_000_000,
                updated: 1_700_000_000_000,
            }),
        })
    }

    async fn send_prompt(
        &self,
        session_id: &str,
        content: &str,
        model: &ModelRef,
    ) -> Result<Message, ClientError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: 404,
                body: format!("session {} not found", session_id),
            });
        }
        self.prompts.lock().unwrap().push((
            session_id.to_string(),
            content.to_string(),
            model.clone(),
        ));
        let reply = self
            .reply
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| assistant("msg_reply", vec![Part::text("ok")]));

        let mut history = self.history.lock().unwrap();
        let index = history.len();
        history.push(Message::new(
            format!("msg_user_{}", index),
            session_id,
            MessageRole::User,
            vec![Part::text(content)],
        ));
        history.push(reply.clone());
        history.extend(self.follow_ups.lock().unwrap().iter().cloned());
        Ok(reply)
    }

    async fn get_message(
        &self,
        _session_id: &str,
        message_id: &str,
    ) -> Result<Message, ClientError> {
        self.get_message_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.polls.lock().unwrap().pop_front();
        let mut history = self.history.lock().unwrap();
        match next {
            Some(Ok(message)) => {
                if let Some(slot) = history.iter_mut().find(|m| m.id() == message.id()) {
                    *slot = message.clone();
                }
                Ok(message)
            }
            Some(Err(error)) => Err(error),
            None => history
                .iter()
                .find(|m| m.id() == message_id)
                .cloned()
                .ok_or_else(|| ClientError::Status {
                    status: 404,
                    body: "message not found".into(),
                }),
        }
    }

    async fn get_messages(&self, _session_id: &str) -> Result<Vec<Message>, ClientError> {
        self.get_messages_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get_messages.load(Ordering::SeqCst) {
            return Err(ClientError::Connection("reset by peer".into()));
        }
        Ok(self.history.lock().unwrap().clone())
    }

    async fn list_providers(&self) -> Result<ProviderCatalog, ClientError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ClientError::Connection("connection refused".into()));
        }
        let mut models = BTreeMap::new();
        models.insert(
            "grok-code".to_string(),
            ModelEntry {
                id: "grok-code".to_string(),
                name: None,
            },
        );
        Ok(ProviderCatalog {
            providers: vec![ProviderEntry {
                id: "opencode".to_string(),
                name: Some("OpenCode".to_string()),
                models,
            }],
            default: Default::default(),
        })
    }
}

pub fn assistant(id: &str, parts: Vec<Part>) -> Message {
    Message::new(id, "ses_1", MessageRole::Assistant, parts)
}

pub fn running_tool(tool: &str) -> Part {
    Part::tool(
        tool,
        "call_1",
        ToolState::Running {
            input: None,
            title: Some(format!("running {}", tool)),
        },
    )
}

pub fn completed_tool(tool: &str, output: &str) -> Part {
    Part::tool(
        tool,
        "call_1",
        ToolState::Completed {
            input: None,
            output: Some(output.to_string()),
            title: None,
        },
    )
}

/// Settings with instant polling and no pacing.
pub fn fast_settings() -> Settings {
    let mut settings = Settings::default();
    settings.poll.interval_ms = 1;
    settings.poll.max_attempts = 5;
    settings.stream.pacing_ms = 0;
    settings
}

pub fn chat_request(text: &str) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: "gpt-4".to_string(),
        messages: vec![ChatMessage::new("user", text)],
        stream: None,
        user: None,
        temperature: None,
        max_tokens: None,
        top_p: None,
    }
}
