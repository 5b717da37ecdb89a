//! HTTP handlers for the chat widget API.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use tracing::{info, warn};
use uuid::Uuid;

use crate::llm::messages::{normalize, RawHistoryEntry};
use crate::rag::seed_corpus;
use crate::types::{AppError, MessageRole, Result, Session, StoredMessage};
use crate::AppState;

/// Error text streamed to the widget when every provider has failed.
const EXHAUSTED_MESSAGE: &str =
    "The assistant is unavailable right now. Please try again in a moment.";

// ============= Chat =============

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Chat endpoint: retrieves FAQ context for the message and streams the
/// assistant reply as SSE (`data: {"response": ...}` events terminated by
/// `data: [DONE]`).
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Response> {
    let message = payload.message.trim().to_string();
    if message.is_empty() {
        return Err(AppError::InvalidInput("Message required".to_string()));
    }

    let cookie_name = state.config.session.cookie_name.clone();
    let existing_id = cookie_value(&headers, &cookie_name);
    let mut session = match &existing_id {
        Some(id) => state
            .sessions
            .get(id)
            .await?
            .unwrap_or_else(|| Session::new(id.clone())),
        None => Session::new(format!("sess_{}", Uuid::new_v4().simple())),
    };
    let is_new_cookie = existing_id.is_none();
    let session_id = session.id.clone();

    session.push(StoredMessage::now(MessageRole::User, message.clone()));

    // retrieval failures degrade to empty context inside build_context
    let context = state.retriever.build_context(&message).await;

    // every stored message passes through the boundary decoder once more
    let raw: Vec<RawHistoryEntry> = session
        .messages
        .iter()
        .map(|m| RawHistoryEntry {
            role: Some(m.role.as_str().to_string()),
            content: serde_json::Value::String(m.content.clone()),
        })
        .collect();
    let history = normalize(&raw);

    let reply = state
        .chat
        .respond(&history, Some(context.as_str()), true)
        .await;

    let sessions = state.sessions.clone();
    let stream = async_stream::stream! {
        match reply {
            Err(e) => {
                warn!(error = %e, "chat chain exhausted");
                yield Ok::<Event, Infallible>(
                    Event::default().data(json!({ "error": EXHAUSTED_MESSAGE }).to_string()),
                );
            }
            Ok(reply) => {
                let mut tokens = reply.into_token_stream();
                let mut full_response = String::new();
                while let Some(fragment) = tokens.next().await {
                    match fragment {
                        Ok(text) => {
                            full_response.push_str(&text);
                            yield Ok(Event::default()
                                .data(json!({ "response": text }).to_string()));
                        }
                        Err(e) => {
                            warn!(error = %e, "reply stream failed mid-flight");
                            yield Ok(Event::default()
                                .data(json!({ "error": EXHAUSTED_MESSAGE }).to_string()));
                            break;
                        }
                    }
                }

                if !full_response.is_empty() {
                    session.push(StoredMessage::now(MessageRole::Assistant, full_response));
                    if let Err(e) = sessions.save(&session).await {
                        warn!(error = %e, "failed to persist session");
                    }
                }
            }
        }
        yield Ok(Event::default().data("[DONE]"));
    };

    let sse = Sse::new(stream).keep_alive(KeepAlive::default());
    let mut response = sse.into_response();

    if is_new_cookie {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            cookie_name, session_id, state.config.session.ttl_seconds
        );
        if let Ok(value) = cookie.parse() {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }

    Ok(response)
}

// ============= History =============

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<StoredMessage>,
}

/// Return the session's message history; an unknown or expired session
/// yields an empty list rather than an error.
pub async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HistoryResponse>> {
    let messages = match cookie_value(&headers, &state.config.session.cookie_name) {
        Some(id) => state
            .sessions
            .get(&id)
            .await?
            .map(|session| session.messages)
            .unwrap_or_default(),
        None => Vec::new(),
    };
    Ok(Json(HistoryResponse { messages }))
}

// ============= Seed =============

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub success: bool,
    pub count: usize,
}

/// Embed the FAQ corpus and (re)write the vector store.
pub async fn seed(State(state): State<AppState>) -> Result<Json<SeedResponse>> {
    let count = seed_corpus(&state.embeddings, state.vectors.as_ref()).await?;
    Ok(Json(SeedResponse {
        success: true,
        count,
    }))
}

// ============= Feedback =============

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub rating: Option<u8>,
    pub comment: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Feedback,
    Issue,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
}

/// Accept a rating or issue report from the widget.
pub async fn feedback(
    State(_state): State<AppState>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>> {
    if payload.kind == FeedbackKind::Feedback
        && !payload.rating.is_some_and(|r| (1..=5).contains(&r))
    {
        return Err(AppError::InvalidInput("Invalid feedback data".to_string()));
    }

    info!(
        kind = ?payload.kind,
        rating = ?payload.rating,
        comment = payload.comment.as_deref().unwrap_or(""),
        email = payload.email.as_deref().unwrap_or(""),
        "feedback received"
    );

    Ok(Json(FeedbackResponse {
        success: true,
        message: "Thank you for your feedback!".to_string(),
    }))
}

// ============= Health =============

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// ============= Helpers =============

/// Extract a cookie value from the request headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}
