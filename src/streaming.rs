//! Server-Sent Events (SSE) streaming for chat completions.
//!
//! OpenAI-compatible streaming protocol:
//! - each chunk is sent as `data: {json}\n\n`
//! - the last data frame before close is the literal `data: [DONE]\n\n`
//! - the terminal chunk before `[DONE]` carries a non-null `finish_reason`
//!   (`"stop"` or `"timeout"`), on every path that reaches the client.

use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::Utc;
use futures::stream::Stream;
use serde_json::json;
use tokio::sync::mpsc;

use crate::models::{ChatChoiceDelta, ChatCompletionChunk, ChatDelta};
use crate::runner::{RunStatus, RunnerOutcome, RunnerRequest};
use crate::session_manager::SessionGuard;
use crate::state::AppState;

fn chunk_event(id: &str, model: &str, created: u64, delta: ChatDelta, finish: Option<&str>) -> Event {
    let chunk = ChatCompletionChunk {
        id: id.to_string(),
        object: "chat.completion.chunk".to_string(),
        created,
        model: model.to_string(),
        choices: vec![ChatChoiceDelta {
            index: 0,
            delta,
            finish_reason: finish.map(str::to_string),
        }],
    };
    Event::default().data(serde_json::to_string(&chunk).unwrap())
}

/// Create the SSE body for one completion request.
///
/// The runner is spawned onto its own task; stdout fragments arrive over
/// the channel in delivery order and each becomes one `delta.content`
/// chunk. The stream owns the `SessionGuard`: when the client disconnects,
/// axum drops the stream, the guard drops, and its cancellation token makes
/// the runner kill the subprocess.
pub fn stream_chat_completion(
    state: AppState,
    req: RunnerRequest,
    guard: SessionGuard,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let now = Utc::now();
    let id = format!("chatcmpl-{}", now.timestamp_millis());
    let created = now.timestamp() as u64;
    let model = req.model.clone();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = guard.cancellation_token();
    let runner = state.runner.clone();
    let task = tokio::spawn(async move { runner.run(req, tx, cancel).await });

    let stream = async_stream::stream! {
        // Keep the guard alive for the lifetime of the stream.
        let _guard = guard;

        // Role announcement, before any content.
        yield Ok(chunk_event(
            &id,
            &model,
            created,
            ChatDelta { role: Some("assistant".to_string()), content: None },
            None,
        ));

        // One content chunk per stdout fragment, FIFO. The channel closes
        // when the runner finishes, which ends this loop.
        while let Some(text) = rx.recv().await {
            yield Ok(chunk_event(
                &id,
                &model,
                created,
                ChatDelta { role: None, content: Some(text) },
                None,
            ));
        }

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(_) => RunnerOutcome::failed("completion task panicked"),
        };

        let finish = match outcome.status {
            // Client already gone; nothing left to tell it.
            RunStatus::Cancelled => return,
            RunStatus::Stop => "stop",
            RunStatus::Timeout => "timeout",
            RunStatus::Failed(message) => {
                yield Ok(Event::default().data(json!({ "error": message }).to_string()));
                "stop"
            }
        };

        yield Ok(chunk_event(&id, &model, created, ChatDelta::default(), Some(finish)));

        // Nothing may be written after the sentinel.
        yield Ok(Event::default().data("[DONE]"));
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
