use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use agora_types::Thread;
use agora_types::api::CreateThreadRequest;

use crate::convert;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::state::{AppState, blocking};

/// Load a thread and check the caller takes part in it.
pub(crate) async fn load_for_participant(
    state: &AppState,
    thread_id: Uuid,
    user_id: Uuid,
) -> Result<Thread, ApiError> {
    let tid = thread_id.to_string();
    let row = blocking(state, move |db| db.get_thread(&tid))
        .await?
        .ok_or(ApiError::NotFound("thread"))?;

    let thread = convert::thread(row);
    if !thread.has_participant(user_id) {
        return Err(ApiError::Forbidden);
    }
    Ok(thread)
}

pub async fn list_threads(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = blocking(&state, move |db| db.list_threads_for_user(&uid)).await?;
    let threads: Vec<Thread> = rows.into_iter().map(convert::thread).collect();
    Ok(Json(threads))
}

pub async fn create_thread(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateThreadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.participant_id == claims.sub {
        return Err(ApiError::BadRequest("cannot open a thread with yourself"));
    }

    let participant = req.participant_id.to_string();
    let me = claims.sub.to_string();
    let thread_id = Uuid::new_v4().to_string();

    let row = blocking(&state, move |db| {
        if !db.user_exists(&participant)? {
            return Ok(None);
        }
        db.create_thread(&thread_id, &me, &participant).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("participant"))?;

    let thread = convert::thread(row);
    info!("Thread {} ready for {} and {}", thread.id, claims.sub, req.participant_id);
    Ok((StatusCode::CREATED, Json(thread)))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = load_for_participant(&state, thread_id, claims.sub).await?;
    Ok(Json(thread))
}
