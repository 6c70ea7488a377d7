use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use agora_db::migrations::TIMESTAMP_FORMAT;
use agora_types::api::{
    DEFAULT_PAGE_SIZE, MAX_MESSAGE_CHARS, MAX_PAGE_SIZE, MessagePage, SendMessageRequest,
};
use agora_types::{Message, MessageId};

use crate::convert;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::state::{AppState, blocking};
use crate::threads::load_for_participant;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination: the `next_cursor` of the previous page.
    /// Omitted for the most recent page.
    pub cursor: Option<MessageId>,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
pub struct SinceQuery {
    pub since: DateTime<Utc>,
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    load_for_participant(&state, thread_id, claims.sub).await?;

    let tid = thread_id.to_string();
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let cursor = query.cursor;

    let (rows, next_cursor) =
        blocking(&state, move |db| db.get_messages(&tid, limit, cursor)).await?;

    debug!(
        "Thread {} page: {} messages (cursor {:?}, next {:?})",
        thread_id,
        rows.len(),
        cursor,
        next_cursor
    );

    Ok(Json(MessagePage {
        messages: rows.into_iter().map(convert::message).collect(),
        next_cursor,
    }))
}

pub async fn get_messages_since(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Query(query): Query<SinceQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    load_for_participant(&state, thread_id, claims.sub).await?;

    let tid = thread_id.to_string();
    let since = query.since.format(TIMESTAMP_FORMAT).to_string();
    let rows = blocking(&state, move |db| db.get_messages_since(&tid, &since)).await?;

    let messages: Vec<Message> = rows.into_iter().map(convert::message).collect();
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("message content is empty"));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest("message content is too long"));
    }

    let thread = load_for_participant(&state, thread_id, claims.sub).await?;
    if thread.other_participant(claims.sub) != Some(req.recipient_id) {
        return Err(ApiError::BadRequest("recipient is not the other participant"));
    }

    let tid = thread_id.to_string();
    let sender = claims.sub.to_string();
    let recipient = req.recipient_id.to_string();
    let content = content.to_string();
    let row = blocking(&state, move |db| {
        db.insert_message(&tid, &sender, &recipient, &content)
    })
    .await?;

    let message = convert::message(row);
    debug!("Message {} stored in thread {}", message.id, thread_id);
    Ok((StatusCode::CREATED, Json(message)))
}
