use chatbridge_client::Backend;
use chatbridge_config::{ModelsSettings, Settings, StreamSettings};
use chatbridge_types::{
    ChatCompletionRequest, ChatCompletionResponse, Choice, ErrorBody, ModelCard, ModelList,
    ResponseMessage, CHAT_COMPLETION_OBJECT, FINISH_STOP,
};
use chatbridge_util::id::completion_id;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use crate::aggregate::{aggregate, select_turn};
use crate::emitter::{EmitOutcome, FrameWriter, StreamEvent};
use crate::error::BridgeError;
use crate::poller::{TurnPoller, TurnState};
use crate::prompt::{combine_messages, map_model};
use crate::registry::{SessionHandle, SessionRegistry};
use crate::usage::estimate_usage;

/// Rendered result of one turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub session: SessionHandle,
    pub content: String,
    pub state: TurnState,
    pub fetches: u32,
}

/// Exclusive hold on a session's turn lock. Dropping it releases the lock and
/// removes the map entry once no other turn references it.
struct TurnSlot<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TurnSlot<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Runs OpenAI chat requests as turns against the agent server.
pub struct Bridge {
    backend: Arc<dyn Backend>,
    registry: SessionRegistry,
    poller: TurnPoller,
    stream: StreamSettings,
    models: ModelsSettings,
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Bridge {
    pub fn new(backend: Arc<dyn Backend>, settings: &Settings) -> Self {
        Self {
            registry: SessionRegistry::new(Arc::clone(&backend), settings.session.clone()),
            poller: TurnPoller::new(Arc::clone(&backend), settings.poll),
            stream: settings.stream,
            models: settings.models.clone(),
            turn_locks: DashMap::new(),
            backend,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn validate(request: &ChatCompletionRequest) -> Result<(), BridgeError> {
        if request.model.trim().is_empty() {
            return Err(BridgeError::InvalidRequest("model is required".to_string()));
        }
        if request.messages.is_empty() {
            return Err(BridgeError::InvalidRequest(
                "messages must not be empty".to_string(),
            ));
        }
        if combine_messages(&request.messages).is_empty() {
            return Err(BridgeError::InvalidRequest(
                "messages contain no text content".to_string(),
            ));
        }
        Ok(())
    }

    async fn acquire_turn(&self, session_id: &str) -> TurnSlot<'_> {
        let lock = Arc::clone(&self.turn_locks.entry(session_id.to_string()).or_default());
        let guard = lock.lock_owned().await;
        TurnSlot {
            locks: &self.turn_locks,
            session_id: session_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of sessions with a turn currently running or waiting.
    pub fn active_turns(&self) -> usize {
        self.turn_locks.len()
    }

    /// Submits the request as one turn and renders everything it produced.
    pub async fn run_turn(
        &self,
        request: &ChatCompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<TurnResult, BridgeError> {
        Self::validate(request)?;
        let prompt = combine_messages(&request.messages);
        let model = map_model(&request.model, &self.models);
        let session = self.registry.resolve(request.user.as_deref()).await?;

        // Held until the refetch so the message window only sees this turn.
        let _turn = self.acquire_turn(&session.id).await;

        let before_count = match self.backend.get_messages(&session.id).await {
            Ok(messages) => messages.len(),
            Err(error) => {
                tracing::warn!(%error, session_id = %session.id, "failed to count messages before prompt");
                0
            }
        };

        tracing::info!(
            session_id = %session.id,
            model = %model,
            degraded = session.degraded,
            before_count,
            "submitting prompt"
        );
        let submitted = self
            .backend
            .send_prompt(&session.id, &prompt, &model)
            .await
            .map_err(|e| BridgeError::BackendUnavailable(format!("failed to submit prompt: {}", e)))?;

        let outcome = self.poller.wait(&session.id, submitted, cancel).await;

        let selected = match self.backend.get_messages(&session.id).await {
            Ok(all) => select_turn(all, before_count, &outcome.message),
            Err(error) => {
                tracing::warn!(%error, session_id = %session.id, "failed to refetch messages, using polled message only");
                vec![outcome.message.clone()]
            }
        };

        let content = aggregate(&selected);
        tracing::info!(
            session_id = %session.id,
            state = ?outcome.state,
            fetches = outcome.fetches,
            messages = selected.len(),
            chars = content.chars().count(),
            "turn finished"
        );

        Ok(TurnResult {
            session,
            content,
            state: outcome.state,
            fetches: outcome.fetches,
        })
    }

    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, BridgeError> {
        let turn = self.run_turn(request, &CancellationToken::new()).await?;
        let usage = estimate_usage(&request.messages, &turn.content);

        Ok(ChatCompletionResponse {
            id: completion_id(),
            object: CHAT_COMPLETION_OBJECT.to_string(),
            created: chrono::Utc::now().timestamp(),
            model: request.model.clone(),
            choices: vec![Choice {
                index: 0,
                message: ResponseMessage {
                    role: "assistant".to_string(),
                    content: turn.content,
                },
                finish_reason: Some(FINISH_STOP.to_string()),
            }],
            usage,
        })
    }

    /// Streams the turn into `tx`. A closed channel or a cancelled token
    /// abandons polling and emits nothing further.
    pub async fn stream(
        &self,
        request: &ChatCompletionRequest,
        tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> EmitOutcome {
        let mut writer = FrameWriter::new(tx, request.model.clone(), self.stream);
        if !writer.open().await {
            return EmitOutcome::Disconnected;
        }

        let result = tokio::select! {
            result = self.run_turn(request, &cancel) => result,
            _ = writer.closed() => {
                cancel.cancel();
                tracing::info!(id = %writer.id(), "consumer disconnected before turn settled");
                return EmitOutcome::Disconnected;
            }
            _ = cancel.cancelled() => return EmitOutcome::Disconnected,
        };
        if cancel.is_cancelled() || writer.is_closed() {
            return EmitOutcome::Disconnected;
        }

        match result {
            Ok(turn) => writer.emit(&turn.content).await,
            Err(error) => writer.fail(ErrorBody::new(error.to_string(), error.kind())).await,
        }
    }

    /// Catalog models as `provider/model`, followed by the configured aliases.
    pub async fn models(&self) -> ModelList {
        let created = chrono::Utc::now().timestamp();
        let mut data = Vec::new();

        match self.backend.list_providers().await {
            Ok(catalog) => {
                for model in catalog.model_refs() {
                    data.push(ModelCard::new(
                        model.to_string(),
                        model.provider_id.clone(),
                        created,
                    ));
                }
            }
            Err(error) => {
                tracing::warn!(%error, "failed to list providers, returning aliases only");
            }
        }

        for alias in self.models.aliases.keys() {
            data.push(ModelCard::new(alias.clone(), "chatbridge", created));
        }

        ModelList::new(data)
    }
}
