//! Route handlers for the HTTP edge shim.
//!
//! `/v1/chat/completions` and `/v1/messages` are OpenAI- and
//! Anthropic-shaped fronts onto the same canonical router. Streaming
//! relays canonical `StreamEvent`s as one JSON object per SSE `data:`
//! frame rather than re-encoding each provider's own delta shape —
//! deliberately thin, matching the rest of this binary.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Json};
use futures::StreamExt;
use gateway_core::{Election, EventStream, RequestContext, Router, Scheduler};
use serde_json::json;

use crate::dto::{AnthropicMessagesRequest, AnthropicMessagesResponse, OpenAiChatRequest, OpenAiChatResponse};
use crate::error::ApiError;

pub struct AppState {
    pub router: Router,
    pub scheduler: Arc<Scheduler>,
    pub election: Arc<Election>,
    pub dispatcher: Arc<gateway_core::Dispatcher>,
}

pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn admin_scheduler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scheduler.snapshot())
}

pub async fn admin_election(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.election.current())
}

pub async fn admin_dispatcher(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.dispatcher.snapshot())
}

pub async fn openai_chat_completions(State(state): State<Arc<AppState>>, Json(body): Json<OpenAiChatRequest>) -> axum::response::Response {
    let stream = body.stream;
    let req = body.into_canonical();
    let ctx = RequestContext::with_timeout(Duration::from_secs(120));

    if stream {
        return match state.router.stream(&ctx, &req).await {
            Ok(events) => sse_from_events(events).into_response(),
            Err(err) => ApiError::from(err).into_response(),
        };
    }

    match state.router.complete(&ctx, &req).await {
        Ok(response) => Json(OpenAiChatResponse::from(response)).into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

pub async fn anthropic_messages(State(state): State<Arc<AppState>>, Json(body): Json<AnthropicMessagesRequest>) -> axum::response::Response {
    let stream = body.stream;
    let req = body.into_canonical();
    let ctx = RequestContext::with_timeout(Duration::from_secs(120));

    if stream {
        return match state.router.stream(&ctx, &req).await {
            Ok(events) => sse_from_events(events).into_response(),
            Err(err) => ApiError::from(err).into_response(),
        };
    }

    match state.router.complete(&ctx, &req).await {
        Ok(response) => Json(AnthropicMessagesResponse::from(response)).into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

fn sse_from_events(events: EventStream) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let frames = events.map(|item| {
        let event = match item {
            Ok(event) => Event::default().json_data(&event).unwrap_or_else(|_| Event::default().data("{}")),
            Err(err) => Event::default().event("error").data(err.message()),
        };
        Ok(event)
    });

    Sse::new(frames)
}
