use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use crate::{error::AppError, services::auth::{token_from_header, Session}, AppState};

/// The authenticated caller, resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Session);

impl AuthUser {
    pub fn user_id(&self) -> &str {
        &self.0.user_id
    }

    /// Rejects access to records owned by another user.
    pub fn ensure_owner(&self, owner_id: &str) -> Result<(), AppError> {
        if owner_id == self.user_id() {
            Ok(())
        } else {
            tracing::warn!("User {} denied access to a record of {}", self.user_id(), owner_id);
            Err(AppError::Forbidden("Access denied".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let token = token_from_header(header)
            .ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;

        state
            .sessions
            .validate(token)
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))
    }
}

/// Bearer token of the current request, if any.
pub fn bearer_token(parts: &axum::http::HeaderMap) -> Option<String> {
    let header = parts.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    token_from_header(header).map(str::to_string)
}
