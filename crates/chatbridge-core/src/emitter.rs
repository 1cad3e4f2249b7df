//! Turns aggregated text into chat-completion chunk frames.

use chatbridge_config::StreamSettings;
use chatbridge_types::{ChatCompletionChunk, ErrorBody};
use chatbridge_util::id::completion_id;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// One item on the consumer channel. Each is delivered whole.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Chunk(ChatCompletionChunk),
    Error(ErrorBody),
    /// End-of-stream sentinel, sent exactly once as the last event.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    Completed,
    Failed,
    Disconnected,
}

#[derive(Debug)]
struct Disconnected;

/// Splits `text` into runs of at most `window` chars.
pub fn split_windows(text: &str, window: usize) -> Vec<&str> {
    let window = window.max(1);
    let mut out = Vec::new();
    let mut start = 0;
    for (count, (idx, _)) in text.char_indices().enumerate() {
        if count > 0 && count % window == 0 {
            out.push(&text[start..idx]);
            start = idx;
        }
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

/// Writes the frames of one streamed completion.
pub struct FrameWriter {
    tx: mpsc::Sender<StreamEvent>,
    settings: StreamSettings,
    id: String,
    created: i64,
    model: String,
    opened: bool,
    body_frames: usize,
}

impl FrameWriter {
    pub fn new(
        tx: mpsc::Sender<StreamEvent>,
        model: impl Into<String>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            tx,
            settings,
            id: completion_id(),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
            opened: false,
            body_frames: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn body_frames(&self) -> usize {
        self.body_frames
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer has gone away.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    /// Sends the role frame if enabled. Returns `false` when the consumer is
    /// gone.
    pub async fn open(&mut self) -> bool {
        self.try_open().await.is_ok()
    }

    async fn try_open(&mut self) -> Result<(), Disconnected> {
        if self.opened {
            return Ok(());
        }
        self.opened = true;
        if self.settings.emit_role_frame {
            let frame = ChatCompletionChunk::role(&self.id, self.created, &self.model);
            self.send(StreamEvent::Chunk(frame)).await?;
        }
        Ok(())
    }

    async fn send(&self, event: StreamEvent) -> Result<(), Disconnected> {
        self.tx.send(event).await.map_err(|_| Disconnected)
    }

    async fn pace(&self) -> Result<(), Disconnected> {
        if self.settings.pacing_ms == 0 {
            return Ok(());
        }
        tokio::select! {
            _ = sleep(self.settings.pacing()) => Ok(()),
            _ = self.tx.closed() => Err(Disconnected),
        }
    }

    async fn write_body(&mut self, text: &str) -> Result<(), Disconnected> {
        self.try_open().await?;
        for window in split_windows(text, self.settings.window) {
            if self.body_frames > 0 {
                self.pace().await?;
            }
            let frame = ChatCompletionChunk::content(&self.id, self.created, &self.model, window);
            self.send(StreamEvent::Chunk(frame)).await?;
            self.body_frames += 1;
        }
        Ok(())
    }

    /// Streams `text` and closes with the `stop` frame and the sentinel.
    pub async fn emit(mut self, text: &str) -> EmitOutcome {
        if self.write_body(text).await.is_err() {
            return self.disconnected();
        }
        let finish = ChatCompletionChunk::finish(&self.id, self.created, &self.model);
        if self.send(StreamEvent::Chunk(finish)).await.is_err()
            || self.send(StreamEvent::Done).await.is_err()
        {
            return self.disconnected();
        }
        tracing::debug!(id = %self.id, frames = self.body_frames, "stream completed");
        EmitOutcome::Completed
    }

    /// Ends the stream with an error event in place of the `stop` frame.
    pub async fn fail(self, error: ErrorBody) -> EmitOutcome {
        tracing::warn!(id = %self.id, frames = self.body_frames, error = %error.error.message, "stream failed");
        if self.send(StreamEvent::Error(error)).await.is_err()
            || self.send(StreamEvent::Done).await.is_err()
        {
            return self.disconnected();
        }
        EmitOutcome::Failed
    }

    fn disconnected(&self) -> EmitOutcome {
        tracing::info!(id = %self.id, frames = self.body_frames, "consumer disconnected, stopping stream");
        EmitOutcome::Disconnected
    }
}
