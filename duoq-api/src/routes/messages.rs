use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use duoq_shared::errors::{AppError, AppResult};
use duoq_shared::types::auth::AuthUser;
use duoq_shared::types::ApiResponse;

use crate::models::{Message, NewMessage};
use crate::schema::messages;
use crate::services::match_service;
use crate::AppState;

// --- GET /matches/:id/messages ---

/// Full conversation, oldest first. The id tiebreak is insertion order
/// because message ids are time-ordered (uuid v7).
pub async fn list_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Message>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    match_service::require_membership(&mut conn, match_id, user.id)?;

    let conversation: Vec<Message> = messages::table
        .filter(messages::match_id.eq(match_id))
        .order((messages::created_at.asc(), messages::id.asc()))
        .load::<Message>(&mut conn)?;

    Ok(Json(ApiResponse::ok(conversation)))
}

// --- POST /matches/:id/messages ---

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

pub async fn post_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<PostMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let content = match_service::normalize_content(&req.content)?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    match_service::require_membership(&mut conn, match_id, user.id)?;

    let new_message = NewMessage {
        id: Uuid::now_v7(),
        match_id,
        sender_id: user.id,
        content,
    };

    let message: Message = diesel::insert_into(messages::table)
        .values(&new_message)
        .get_result(&mut conn)?;

    tracing::debug!(match_id = %match_id, message_id = %message.id, "message posted");

    Ok(Json(ApiResponse::ok(message)))
}
