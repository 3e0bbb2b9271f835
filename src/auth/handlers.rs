use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, is_strong_enough, verify_password, MIN_PASSWORD_LEN},
        repo_types::DEFAULT_ROLE,
        services::{is_valid_username, issue_tokens},
    },
    db::RepoError,
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let Json(mut payload) = payload?;
    payload.username = payload.username.trim().to_string();

    if !is_valid_username(&payload.username) {
        return Err(AppError::InvalidArgument(
            "Username must be 3-32 characters of letters, digits, '.', '_' or '-'".into(),
        ));
    }
    if !is_strong_enough(&payload.password) {
        return Err(AppError::InvalidArgument(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if state.users.find_by_username(&payload.username).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "User {} already exists",
            payload.username
        )));
    }

    let hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(&payload.username, &hash, &[DEFAULT_ROLE.to_string()])
        .await
        .map_err(|e| match e {
            RepoError::UniqueViolation(..) => {
                AppError::Conflict(format!("User {} already exists", payload.username))
            }
            other => other.into(),
        })?;

    let keys = JwtKeys::from_ref(&state);
    let response = issue_tokens(&keys, &user)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(payload) = payload?;
    let username = payload.username.trim();

    let Some(user) = state.users.find_by_username(username).await? else {
        warn!(username, "login unknown username");
        return Err(AppError::Unauthenticated("Invalid credentials".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthenticated("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let response = issue_tokens(&keys, &user)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthenticated("Invalid refresh token".into())
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;

    Ok(Json(issue_tokens(&keys, &user)?))
}

#[instrument(skip(auth), fields(user_id = %auth.id))]
pub async fn get_me(auth: AuthUser) -> Json<PublicUser> {
    Json(PublicUser {
        id: auth.id,
        username: auth.username,
    })
}
