use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use duoq_shared::errors::{AppError, AppResult, ErrorCode};
use duoq_shared::types::auth::AuthUser;
use duoq_shared::types::ApiResponse;

use crate::models::{Match, Message, Profile};
use crate::schema::{matches, messages, profiles};
use crate::services::match_service;
use crate::AppState;

// --- POST /matches/swipe ---

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub swiped_id: Uuid,
    pub is_like: bool,
}

#[derive(Debug, Serialize)]
pub struct SwipeResponse {
    pub is_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<Uuid>,
}

pub async fn swipe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SwipeRequest>,
) -> AppResult<Json<ApiResponse<SwipeResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    // Reject unknown targets up front; the swipe FK would only surface this
    // as an opaque storage error.
    let target_exists: bool = profiles::table
        .filter(profiles::user_id.eq(req.swiped_id))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)?;

    if !target_exists {
        return Err(AppError::new(ErrorCode::ProfileNotFound, "swiped profile not found"));
    }

    let formed = match_service::record_swipe(&mut conn, user.id, req.swiped_id, req.is_like)?;

    Ok(Json(ApiResponse::ok(SwipeResponse {
        is_match: formed.is_some(),
        match_id: formed.map(|m| m.id),
    })))
}

// --- GET /matches ---

#[derive(Debug, Serialize)]
pub struct MatchSummary {
    #[serde(rename = "match")]
    pub match_record: Match,
    pub other_profile: Option<Profile>,
    pub last_message: Option<Message>,
}

pub async fn list_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<MatchSummary>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let my_matches: Vec<Match> = matches::table
        .filter(matches::user1_id.eq(user.id).or(matches::user2_id.eq(user.id)))
        .order(matches::matched_at.desc())
        .load::<Match>(&mut conn)?;

    let mut summaries = Vec::with_capacity(my_matches.len());
    for m in my_matches {
        let other_id = m.other_user(user.id);

        let other_profile: Option<Profile> = profiles::table
            .filter(profiles::user_id.eq(other_id))
            .first::<Profile>(&mut conn)
            .optional()?;

        let last_message: Option<Message> = messages::table
            .filter(messages::match_id.eq(m.id))
            .order((messages::created_at.desc(), messages::id.desc()))
            .first::<Message>(&mut conn)
            .optional()?;

        summaries.push(MatchSummary {
            match_record: m,
            other_profile,
            last_message,
        });
    }

    Ok(Json(ApiResponse::ok(summaries)))
}

// --- GET /matches/:id ---

#[derive(Debug, Serialize)]
pub struct MatchDetails {
    #[serde(rename = "match")]
    pub match_record: Match,
    pub other_profile: Option<Profile>,
}

pub async fn get_match(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MatchDetails>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let (m, other_id) = match_service::require_membership(&mut conn, match_id, user.id)?;

    let other_profile: Option<Profile> = profiles::table
        .filter(profiles::user_id.eq(other_id))
        .first::<Profile>(&mut conn)
        .optional()?;

    Ok(Json(ApiResponse::ok(MatchDetails {
        match_record: m,
        other_profile,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swipe_response_reports_the_match_flag() {
        let no_match = serde_json::to_value(SwipeResponse { is_match: false, match_id: None }).unwrap();
        assert_eq!(no_match, serde_json::json!({ "is_match": false }));

        let id = Uuid::new_v4();
        let matched = serde_json::to_value(SwipeResponse { is_match: true, match_id: Some(id) }).unwrap();
        assert_eq!(matched["is_match"], serde_json::json!(true));
        assert_eq!(matched["match_id"], serde_json::json!(id.to_string()));
    }
}
