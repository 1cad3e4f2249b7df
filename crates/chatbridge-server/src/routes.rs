use axum::{
    extract::{rejection::JsonRejection, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chatbridge_core::{Bridge, StreamEvent};
use chatbridge_types::{ChatCompletionRequest, ModelList};
use futures::StreamExt;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, Result};
use crate::server::ServerState;

/// Frames buffered between the bridge task and the HTTP body.
pub const STREAM_BUFFER: usize = 64;
pub const DONE_SENTINEL: &str = "[DONE]";

pub fn router() -> Router<Arc<ServerState>> {
    Router::new().route("/health", get(health)).nest(
        "/v1",
        Router::new()
            .route("/chat/completions", post(chat_completions))
            .route("/models", get(list_models))
            .route("/health", get(health)),
    )
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "chatbridge",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_models(State(state): State<Arc<ServerState>>) -> Json<ModelList> {
    Json(state.bridge.models().await)
}

async fn chat_completions(
    State(state): State<Arc<ServerState>>,
    payload: std::result::Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    Bridge::validate(&request)?;

    tracing::info!(
        model = %request.model,
        stream = request.is_stream(),
        messages = request.messages.len(),
        user = request.user.as_deref().unwrap_or_default(),
        "chat completion request"
    );

    if request.is_stream() {
        return Ok(stream_completion(state, request).into_response());
    }

    let response = state.bridge.complete(&request).await?;
    Ok(Json(response).into_response())
}

fn stream_completion(
    state: Arc<ServerState>,
    request: ChatCompletionRequest,
) -> Sse<impl futures::Stream<Item = std::result::Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<StreamEvent>(STREAM_BUFFER);
    let bridge = Arc::clone(&state.bridge);

    tokio::spawn(async move {
        let outcome = bridge.stream(&request, tx, CancellationToken::new()).await;
        tracing::debug!(?outcome, "stream task finished");
    });

    let events = ReceiverStream::new(rx).map(|event| Ok(sse_event(event)));
    Sse::new(events).keep_alive(KeepAlive::default())
}

fn sse_event(event: StreamEvent) -> Event {
    let encoded = match &event {
        StreamEvent::Chunk(chunk) => Event::default().json_data(chunk),
        StreamEvent::Error(error) => Event::default().json_data(error),
        StreamEvent::Done => return Event::default().data(DONE_SENTINEL),
    };
    encoded.unwrap_or_else(|error| {
        tracing::warn!(%error, "failed to encode stream frame");
        Event::default()
            .data(r#"{"error":{"message":"failed to encode frame","type":"internal_error"}}"#)
    })
}
