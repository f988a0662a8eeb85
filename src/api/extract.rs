use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{
    error::{AppError, AppResult},
    models::User,
};

use super::AppState;

/// Header carrying the id of the user the fronting layer authenticated
pub const USER_ID_HEADER: &str = "x-user-id";

/// The acting user; rejects the request with 401 when absent or unknown
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The acting user if the request names one
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

async fn resolve_user(parts: &Parts, state: &AppState) -> AppResult<Option<User>> {
    let Some(header) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let user_id = header
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Malformed {} header", USER_ID_HEADER)))?;

    match state.store.find_user(user_id).await? {
        Some(user) => Ok(Some(user)),
        None => Err(AppError::Unauthorized(format!("Unknown user {}", user_id))),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> AppResult<Self> {
        resolve_user(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Login required".to_string()))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> AppResult<Self> {
        Ok(MaybeUser(resolve_user(parts, state).await?))
    }
}
