use axum::{extract::State, http::HeaderMap, routing::{get, post}, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{generate_id, PublicUser, User, UserStats},
    routes::extract::{bearer_token, AuthUser},
    services::auth::{hash_password, verify_password},
    AppState,
};

const MIN_PASSWORD_LENGTH: usize = 6;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    message: &'static str,
    user: PublicUser,
    token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    user: PublicUser,
    stats: UserStats,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if request.name.is_empty() || request.email.is_empty() || request.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Name, email, and password are required".to_string(),
        ));
    }
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::InvalidInput(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    if !request.email.contains('@') {
        return Err(AppError::InvalidInput("Invalid email format".to_string()));
    }

    if state.store.get_user_by_email(&request.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let now = Utc::now();
    let user = state
        .store
        .create_user(User {
            id: generate_id("user"),
            email: request.email.to_lowercase(),
            name: request.name,
            password_hash: hash_password(&request.password, &state.config.password_salt),
            created_at: now,
            updated_at: now,
        })
        .await?;
    tracing::info!("Registered user {}", user.id);

    let session = state.sessions.issue(&user);
    Ok(Json(AuthResponse {
        message: "Registration successful",
        user: PublicUser::from(&user),
        token: session.token,
    }))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password are required".to_string(),
        ));
    }

    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());
    let user = state
        .store
        .get_user_by_email(&request.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&request.password, &state.config.password_salt, &user.password_hash) {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    let session = state.sessions.issue(&user);
    tracing::info!("User {} logged in", user.id);
    Ok(Json(AuthResponse {
        message: "Login successful",
        user: PublicUser::from(&user),
        token: session.token,
    }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    headers: HeaderMap,
) -> Json<Value> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(&token);
    }
    tracing::info!("User {} logged out", auth.user_id());
    Json(json!({ "message": "Logged out" }))
}

async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<MeResponse>, AppError> {
    let user = state
        .store
        .get_user(auth.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let stats = state.store.user_stats(&user.id).await?;

    Ok(Json(MeResponse {
        user: PublicUser::from(&user),
        stats,
    }))
}
