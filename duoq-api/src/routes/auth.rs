use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use duoq_shared::errors::{AppError, AppResult, ErrorCode};
use duoq_shared::types::auth::{AuthUser, TokenPair};
use duoq_shared::types::ApiResponse;

use crate::models::{NewProfile, NewRefreshToken, NewUser, RefreshToken, User};
use crate::schema::{profiles, refresh_tokens, users};
use crate::services::{auth_service, token_service};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserSummary,
    pub tokens: TokenPair,
}

// --- POST /auth/register ---

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
    pub username: String,
    pub display_name: Option<String>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    auth_service::validate_password(&req.password)?;
    auth_service::validate_username(&req.username)?;

    let password_hash = auth_service::hash_password(&req.password)?;
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let email = req.email.to_lowercase();

    let email_taken: bool = users::table
        .filter(users::email.eq(&email))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)?;

    if email_taken {
        return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
    }

    let username_taken: bool = profiles::table
        .filter(profiles::username.eq(&req.username))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)?;

    if username_taken {
        return Err(AppError::new(ErrorCode::UsernameTaken, "username is already taken"));
    }

    let new_user = NewUser {
        email,
        password_hash,
        // no verification flow; accounts are live immediately
        email_confirmed: true,
    };

    // User and profile are created atomically: a registered account always
    // has a profile row. The pre-checks above are advisory; a concurrent
    // registration racing past them lands on the unique constraints and is
    // mapped back to the taken-field error here.
    let display_name = req.display_name.unwrap_or_else(|| req.username.clone());
    let username = req.username;
    let user: User = conn.transaction::<User, AppError, _>(|conn| {
        let user: User = diesel::insert_into(users::table)
            .values(&new_user)
            .get_result(conn)
            .map_err(map_registration_conflict)?;

        let new_profile = NewProfile {
            user_id: user.id,
            username: username.clone(),
            display_name: Some(display_name.clone()),
        };
        diesel::insert_into(profiles::table)
            .values(&new_profile)
            .execute(conn)
            .map_err(map_registration_conflict)?;

        Ok(user)
    })?;

    let tokens = issue_tokens(&state, &mut conn, &user)?;

    tracing::info!(user_id = %user.id, "user registered");

    Ok(Json(ApiResponse::ok(AuthResponse {
        user: UserSummary { id: user.id, email: user.email },
        tokens,
    })))
}

// --- POST /auth/login ---

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let user: User = users::table
        .filter(users::email.eq(req.email.to_lowercase()))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::InvalidCredentials, "invalid email or password"))?;

    let valid = auth_service::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(AppError::new(ErrorCode::InvalidCredentials, "invalid email or password"));
    }

    let tokens = issue_tokens(&state, &mut conn, &user)?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(ApiResponse::ok(AuthResponse {
        user: UserSummary { id: user.id, email: user.email },
        tokens,
    })))
}

// --- POST /auth/refresh ---

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let token_hash = token_service::hash_token(&req.refresh_token);

    let stored: RefreshToken = refresh_tokens::table
        .filter(refresh_tokens::token_hash.eq(&token_hash))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::TokenInvalid, "unknown refresh token"))?;

    if stored.revoked {
        return Err(AppError::new(ErrorCode::RefreshTokenRevoked, "refresh token has been revoked"));
    }
    if stored.expires_at < chrono::Utc::now() {
        return Err(AppError::new(ErrorCode::TokenExpired, "refresh token has expired"));
    }

    let user: User = users::table
        .find(stored.user_id)
        .first(&mut conn)
        .map_err(|_| AppError::unauthorized("user no longer exists"))?;

    // Rotate: revoke the presented token before issuing a replacement.
    diesel::update(refresh_tokens::table.find(stored.id))
        .set(refresh_tokens::revoked.eq(true))
        .execute(&mut conn)?;

    let tokens = issue_tokens(&state, &mut conn, &user)?;

    Ok(Json(ApiResponse::ok(tokens)))
}

// --- POST /auth/logout ---

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let token_hash = token_service::hash_token(&req.refresh_token);
    diesel::update(refresh_tokens::table.filter(refresh_tokens::token_hash.eq(&token_hash)))
        .set(refresh_tokens::revoked.eq(true))
        .execute(&mut conn)?;

    Ok(Json(ApiResponse::ok_with_message((), "logged out")))
}

// --- GET /auth/me ---

pub async fn me(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UserSummary>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    // The token may outlive the account; a valid signature alone is not
    // proof the user still exists.
    let user: User = users::table
        .find(auth_user.id)
        .first(&mut conn)
        .map_err(|_| AppError::unauthorized("user no longer exists"))?;

    Ok(Json(ApiResponse::ok(UserSummary { id: user.id, email: user.email })))
}

// --- helpers ---

/// Maps a unique violation raised inside the registration transaction to the
/// taken-field error the pre-checks would have produced. Anything else stays
/// a storage error.
fn map_registration_conflict(err: diesel::result::Error) -> AppError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            let source = info
                .constraint_name()
                .map(str::to_owned)
                .unwrap_or_else(|| info.message().to_owned());
            if source.contains("username") {
                AppError::new(ErrorCode::UsernameTaken, "username is already taken")
            } else if source.contains("email") {
                AppError::new(ErrorCode::EmailAlreadyExists, "email already registered")
            } else {
                AppError::Database(DieselError::DatabaseError(
                    DatabaseErrorKind::UniqueViolation,
                    info,
                ))
            }
        }
        other => AppError::Database(other),
    }
}

fn issue_tokens(
    state: &AppState,
    conn: &mut diesel::pg::PgConnection,
    user: &User,
) -> AppResult<TokenPair> {
    let (pair, refresh_hash) = token_service::create_token_pair(
        user.id,
        &user.email,
        &state.config.jwt_secret,
        state.config.jwt_access_ttl,
    )?;

    let new_rt = NewRefreshToken {
        user_id: user.id,
        token_hash: refresh_hash,
        expires_at: chrono::Utc::now() + chrono::Duration::seconds(state.config.jwt_refresh_ttl),
    };
    diesel::insert_into(refresh_tokens::table)
        .values(&new_rt)
        .execute(conn)?;

    Ok(pair)
}
