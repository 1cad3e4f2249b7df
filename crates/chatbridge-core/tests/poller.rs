mod common;

use chatbridge_client::ClientError;
use chatbridge_config::PollSettings;
use chatbridge_core::{TurnPoller, TurnState};
use chatbridge_types::{Message, Part};
use serde_json::json;
use common::{assistant, completed_tool, running_tool, ScriptedBackend};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn poller(backend: Arc<ScriptedBackend>, max_attempts: u32) -> TurnPoller {
    TurnPoller::new(
        backend,
        PollSettings {
            interval_ms: 1000,
            max_attempts,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn settled_message_needs_no_fetch() {
    let backend = Arc::new(ScriptedBackend::new());
    let submitted = assistant("msg_1", vec![Part::text("hi"), completed_tool("bash", "ok")]);

    let outcome = poller(backend.clone(), 60)
        .wait("ses_1", submitted, &CancellationToken::new())
        .await;

    assert_eq!(outcome.state, TurnState::Settled);
    assert_eq!(outcome.fetches, 0);
    assert_eq!(backend.fetches(), 0);
}

#[tokio::test(start_paused = true)]
async fn settles_within_k_plus_one_fetches() {
    for k in 0..4usize {
        let mut polls = Vec::new();
        for _ in 0..k {
            polls.push(Ok(assistant("msg_1", vec![running_tool("bash")])));
        }
        polls.push(Ok(assistant("msg_1", vec![completed_tool("bash", "done")])));
        let backend = Arc::new(ScriptedBackend::new().with_polls(polls));

        let outcome = poller(backend.clone(), 60)
            .wait(
                "ses_1",
                assistant("msg_1", vec![running_tool("bash")]),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(outcome.state, TurnState::Settled);
        assert!(outcome.fetches as usize <= k + 1);
        assert!(outcome.message.is_settled());
    }
}

#[tokio::test(start_paused = true)]
async fn ceiling_returns_last_snapshot_as_timeout() {
    let polls = (0..10)
        .map(|i| {
            Ok(assistant(
                "msg_1",
                vec![Part::text(format!("step {}", i)), running_tool("bash")],
            ))
        })
        .collect();
    let backend = Arc::new(ScriptedBackend::new().with_polls(polls));
    let start = tokio::time::Instant::now();

    let outcome = poller(backend.clone(), 3)
        .wait(
            "ses_1",
            assistant("msg_1", vec![running_tool("bash")]),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.state, TurnState::TimedOut);
    assert_eq!(outcome.fetches, 3);
    assert_eq!(backend.fetches(), 3);
    assert_eq!(outcome.message.parts[0], Part::text("step 2"));
    assert!(outcome.error.is_none());
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn fetch_error_aborts_with_last_good_snapshot() {
    let backend = Arc::new(ScriptedBackend::new().with_polls(vec![
        Ok(assistant("msg_1", vec![Part::text("partial"), running_tool("bash")])),
        Err(ClientError::Connection("connection reset".into())),
        Ok(assistant("msg_1", vec![completed_tool("bash", "never seen")])),
    ]));

    let outcome = poller(backend.clone(), 60)
        .wait(
            "ses_1",
            assistant("msg_1", vec![running_tool("bash")]),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.state, TurnState::Aborted);
    assert_eq!(outcome.fetches, 2);
    assert_eq!(outcome.message.parts[0], Part::text("partial"));
    assert!(matches!(outcome.error, Some(ClientError::Connection(_))));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_at_next_sleep() {
    let backend = Arc::new(ScriptedBackend::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = poller(backend.clone(), 60)
        .wait("ses_1", assistant("msg_1", vec![running_tool("bash")]), &cancel)
        .await;

    assert_eq!(outcome.state, TurnState::Cancelled);
    assert_eq!(outcome.fetches, 0);
    assert_eq!(backend.fetches(), 0);
}

#[tokio::test(start_paused = true)]
async fn undecodable_running_tool_keeps_polling() {
    let raw = json!({
        "info": {"id": "msg_1", "sessionID": "ses_1", "role": "assistant"},
        "parts": [{"type": "tool", "tool": "bash", "callID": "c1",
                   "state": {"status": "running", "input": "ls -la"}}]
    });
    let garbled: Message = serde_json::from_value(raw).unwrap();
    let backend = Arc::new(ScriptedBackend::new().with_polls(vec![
        Ok(garbled.clone()),
        Ok(assistant("msg_1", vec![completed_tool("bash", "listing")])),
    ]));

    let outcome = poller(backend.clone(), 60)
        .wait("ses_1", garbled, &CancellationToken::new())
        .await;

    assert_eq!(outcome.state, TurnState::Settled);
    assert_eq!(outcome.fetches, 2);
    assert!(outcome.message.is_settled());
}
