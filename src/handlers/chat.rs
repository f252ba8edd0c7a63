//! Chat completion handler.
//!
//! Pipeline: read body (size-capped) → parse → validate → flatten →
//! acquire a subprocess slot → run. Validation failures never reach the
//! runner, so a rejected request has no process side effects.

use axum::{
    body::Body,
    extract::{Request, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::info;

use crate::{
    error::ProxyError,
    models::{ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage},
    prompt,
    runner::{RunStatus, RunnerRequest},
    state::AppState,
    streaming,
};

/// Handle chat completion requests (streaming and non-streaming).
pub async fn handle_chat_completion(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<axum::response::Response, ProxyError> {
    let body = axum::body::to_bytes(request.into_body(), state.config.max_body_bytes)
        .await
        .map_err(|err| {
            if is_length_limit(&err) {
                ProxyError::BodyTooLarge
            } else {
                ProxyError::BodyRead(err.to_string())
            }
        })?;

    let req: ChatCompletionRequest =
        serde_json::from_slice(&body).map_err(|err| ProxyError::InvalidJson(err.to_string()))?;
    validate(&req, &state)?;

    info!(
        model = %req.model,
        messages = req.messages.len(),
        stream = req.stream,
        "completion request"
    );

    let flattened = prompt::flatten(&req.messages);
    let runner_req = RunnerRequest {
        model: req.model,
        system_prompt: flattened.system,
        transcript: flattened.transcript,
    };

    let guard = state
        .sessions
        .try_acquire()
        .ok_or(ProxyError::AtCapacity)?;

    if req.stream {
        return Ok(streaming::stream_chat_completion(state, runner_req, guard).into_response());
    }

    // Buffered mode: drop the receiver and read the accumulated output.
    let model = runner_req.model.clone();
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    let cancel = guard.cancellation_token();
    let outcome = state.runner.run(runner_req, tx, cancel).await;
    drop(guard);

    let now = Utc::now();
    match outcome.status {
        RunStatus::Stop => Ok(Json(ChatCompletionResponse {
            id: format!("chatcmpl-{}", now.timestamp_millis()),
            object: "chat.completion".to_string(),
            created: now.timestamp() as u64,
            model,
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content: outcome.output,
                },
                finish_reason: "stop".to_string(),
            }],
        })
        .into_response()),
        RunStatus::Timeout => Err(ProxyError::Timeout(state.config.timeout_ms / 1000)),
        RunStatus::Failed(message) => Err(ProxyError::Process(message)),
        RunStatus::Cancelled => Err(ProxyError::Process("request cancelled".to_string())),
    }
}

/// True when the body read failed on the configured size ceiling; anything
/// else (transport errors and the like) must not masquerade as 413.
fn is_length_limit(err: &axum::Error) -> bool {
    let mut source = Some(err as &(dyn std::error::Error + 'static));
    while let Some(cause) = source {
        if cause.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        source = cause.source();
    }
    false
}

/// Ordered, short-circuiting request validation.
fn validate(req: &ChatCompletionRequest, state: &AppState) -> Result<(), ProxyError> {
    if !state.config.models.iter().any(|m| m == &req.model) {
        return Err(ProxyError::InvalidModel {
            got: req.model.clone(),
            allowed: state.config.models_list(),
        });
    }
    if req.messages.is_empty() {
        return Err(ProxyError::EmptyMessages);
    }
    if !req.messages.iter().any(|m| m.role == "user") {
        return Err(ProxyError::NoUserMessage);
    }
    Ok(())
}
