//! Request extractors: bearer-token authentication, and JSON body and query
//! wrappers whose rejections render as [`ApiError`] bodies

use super::state::AppState;
use crate::auth::TokenKind;
use crate::error::ApiError;
use crate::storage::UserStorage;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header, request::Parts},
};
use florafind_types::User;

/// `axum::Json` with `{detail, code}` rejections
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` with `{detail, code}` rejections
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// The user identified by a valid access token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// A [`CurrentUser`] whose account is active; inactive accounts get 403
#[derive(Debug, Clone)]
pub struct ActiveUser(pub User);

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid authorization header".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(ApiError::Unauthorized("Not authenticated".to_string()));
    }
    Ok(token.trim())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.tokens.verify(token, TokenKind::Access)?;

        let user = state
            .storage
            .get_user_by_username(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ActiveUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_active {
            return Err(ApiError::Forbidden("Inactive user".to_string()));
        }
        Ok(ActiveUser(user))
    }
}
