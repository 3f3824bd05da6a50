//! Caller resolution for HTTP handlers.
//!
//! The API gateway terminates authentication and forwards the verified
//! account id in the `x-user-id` header; this module turns that header into
//! a [`Caller`] by looking the account up. Requests without the header (or
//! naming an unknown account) are rejected as unauthorized.

use axum::http::HeaderMap;

use super::error::AppError;
use super::state::AppState;
use crate::api::UserId;
use crate::scheduler::Caller;

/// Header carrying the authenticated account id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolve the calling account from request headers.
pub async fn resolve_caller(state: &AppState, headers: &HeaderMap) -> Result<Caller, AppError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized(format!("missing {} header", USER_ID_HEADER))
        })?;

    let id: i64 = raw.parse().map_err(|_| {
        AppError::Unauthorized(format!("{} header must be an integer id", USER_ID_HEADER))
    })?;

    let user = state
        .repository
        .get_user(UserId::new(id))
        .await?
        .ok_or_else(|| AppError::Unauthorized(format!("unknown account {}", id)))?;

    Ok(Caller::new(user.id, user.role))
}
