use chatbridge_client::{Backend, ClientError};
use chatbridge_config::PollSettings;
use chatbridge_types::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Submitted,
    Polling,
    Settled,
    /// The attempt ceiling was reached with tools still in flight.
    TimedOut,
    /// A fetch failed; the outcome carries the last good snapshot.
    Aborted,
    Cancelled,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TurnState::Submitted | TurnState::Polling)
    }
}

#[derive(Debug)]
pub struct PollOutcome {
    pub message: Message,
    pub state: TurnState,
    pub fetches: u32,
    pub error: Option<ClientError>,
}

impl PollOutcome {
    pub fn is_settled(&self) -> bool {
        self.state == TurnState::Settled
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Sleep cancelled")]
pub struct SleepCancelled;

pub async fn sleep_with_cancel(
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), SleepCancelled> {
    tokio::select! {
        _ = sleep(duration) => Ok(()),
        _ = cancel.cancelled() => Err(SleepCancelled),
    }
}

/// Waits for a submitted turn to stop running tools.
pub struct TurnPoller {
    backend: Arc<dyn Backend>,
    settings: PollSettings,
}

impl TurnPoller {
    pub fn new(backend: Arc<dyn Backend>, settings: PollSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Drives the turn to a terminal state. Never fails: timeouts, fetch
    /// errors and cancellation all yield the best snapshot seen so far.
    pub async fn wait(
        &self,
        session_id: &str,
        submitted: Message,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let mut message = submitted;
        let mut fetches = 0u32;
        let mut error = None;
        let mut state = TurnState::Submitted;

        while !state.is_terminal() {
            state = if message.is_settled() {
                TurnState::Settled
            } else if fetches >= self.settings.max_attempts {
                tracing::warn!(
                    session_id,
                    message_id = %message.id(),
                    fetches,
                    "turn did not settle before poll ceiling"
                );
                TurnState::TimedOut
            } else if sleep_with_cancel(self.settings.interval(), cancel)
                .await
                .is_err()
            {
                tracing::debug!(session_id, fetches, "poll cancelled");
                TurnState::Cancelled
            } else {
                fetches += 1;
                match self.backend.get_message(session_id, message.id()).await {
                    Ok(latest) => {
                        message = latest;
                        TurnState::Polling
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            session_id,
                            message_id = %message.id(),
                            fetches,
                            "message fetch failed, returning last snapshot"
                        );
                        error = Some(e);
                        TurnState::Aborted
                    }
                }
            };
        }

        tracing::debug!(session_id, ?state, fetches, "poll finished");
        PollOutcome {
            message,
            state,
            fetches,
            error,
        }
    }
}
