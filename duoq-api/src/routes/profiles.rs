use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use duoq_shared::errors::{AppError, AppResult, ErrorCode};
use duoq_shared::types::auth::AuthUser;
use duoq_shared::types::ApiResponse;

use crate::models::{Profile, UpdateProfile};
use crate::schema::{profiles, swipes};
use crate::AppState;

const DISCOVER_BATCH_SIZE: i64 = 10;

// --- GET /profiles/me ---

pub async fn get_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = profiles::table
        .filter(profiles::user_id.eq(user.id))
        .first::<Profile>(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    Ok(Json(ApiResponse::ok(profile)))
}

// --- PUT /profiles/me ---

pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateProfile>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = profiles::table
        .filter(profiles::user_id.eq(user.id))
        .first::<Profile>(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let now = chrono::Utc::now();
    let updated = diesel::update(profiles::table.filter(profiles::id.eq(profile.id)))
        .set((
            &payload,
            profiles::last_active.eq(now),
            profiles::updated_at.eq(now),
        ))
        .get_result::<Profile>(&mut conn)?;

    Ok(Json(ApiResponse::ok(updated)))
}

// --- GET /profiles/discover ---

/// Candidate profiles for the swipe deck: everyone except the caller and
/// the targets the caller has already decided on.
pub async fn discover(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Profile>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let already_swiped = swipes::table
        .filter(swipes::swiper_id.eq(user.id))
        .select(swipes::swiped_id);

    let candidates: Vec<Profile> = profiles::table
        .filter(profiles::user_id.ne(user.id))
        .filter(profiles::user_id.ne_all(already_swiped))
        .limit(DISCOVER_BATCH_SIZE)
        .load::<Profile>(&mut conn)?;

    Ok(Json(ApiResponse::ok(candidates)))
}

// --- GET /profiles/:user_id ---

pub async fn get_by_user_id(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = profiles::table
        .filter(profiles::user_id.eq(user_id))
        .first::<Profile>(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    Ok(Json(ApiResponse::ok(profile)))
}
