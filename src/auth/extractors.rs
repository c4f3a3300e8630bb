use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::{
    auth::jwt::JwtKeys,
    error::AppError,
    state::AppState,
    users::repo::{Role, User},
};

/// Authenticated actor, loaded from the store after token verification.
/// The password hash rides along internally but is never serialized.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = header
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "token verification failed");
            AppError::Unauthorized("Not authorized, token failed".into())
        })?;

        // A valid token may outlive its account.
        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = claims.sub, "token valid but user not found");
                AppError::Unauthorized("User not found".into())
            })?;

        Ok(CurrentUser(user))
    }
}

/// Admin-only guard, composed on top of [`CurrentUser`].
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AppError::Forbidden("Access denied. Admins only.".into()));
        }
        Ok(AdminUser(user))
    }
}

/// Self-or-admin guard: the actor must be the target or hold the admin role.
pub fn require_self_or_admin(actor: &User, target_id: i64) -> Result<(), AppError> {
    if actor.id == target_id || actor.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Access denied. You can only modify your own account.".into(),
        ))
    }
}
