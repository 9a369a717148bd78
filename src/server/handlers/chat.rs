use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;

use crate::core::errors::ApiError;
use crate::llm::ChatMessage;
use crate::rag::{AnswerEvent, SourceCitation};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChatApiRequest {
    /// Prior conversation turns, oldest first.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub query: String,
}

#[derive(Serialize)]
pub struct ChatApiResponse {
    pub response: String,
    pub sources: Vec<SourceCitation>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatApiRequest>,
) -> Result<Json<ChatApiResponse>, ApiError> {
    let record = state.rag.ask(&request.query, &request.messages).await?;

    Ok(Json(ChatApiResponse {
        response: record.answer,
        sources: record.sources,
    }))
}

/// Streams the answer over SSE: a `sources` event, `message` events as
/// tokens arrive, then `done` or `error`. Closing the connection drops the
/// stream, which cancels the upstream generation.
pub async fn stream_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatApiRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let rx = state
        .rag
        .ask_stream(&request.query, &request.messages)
        .await?;

    let stream = ReceiverStream::new(rx).map(|answer_event| {
        let name = match &answer_event {
            AnswerEvent::Sources { .. } => "sources",
            AnswerEvent::Token { .. } => "message",
            AnswerEvent::Done => "done",
            AnswerEvent::Error { .. } => "error",
        };
        let data = serde_json::to_string(&answer_event).unwrap_or_default();
        Ok(Event::default().event(name).data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
