use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;
use crate::users::policy::Requester;
use crate::users::repo_types::User;

/// Caller resolved from the bearer token to a live user record.
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn requester(&self) -> Requester {
        Requester::from(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!("missing Authorization header");
                AppError::InvalidToken
            })?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AppError::InvalidToken)?;

        let user = state.auth.resolve_token(token.trim()).await?;
        Ok(AuthUser(user))
    }
}

/// Authenticated caller holding the admin role.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            warn!(user_id = %user.id, "admin route denied");
            return Err(AppError::forbidden("access denied"));
        }
        Ok(AdminUser(user))
    }
}
