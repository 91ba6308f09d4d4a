//! Account handlers: registration, login, token refresh, password reset and profile

use super::MessageResponse;
use crate::api::rest::extract::{ApiJson, ApiQuery, CurrentUser};
use crate::api::rest::state::AppState;
use crate::auth::mailer::html_escape;
use crate::auth::password::{hash_password_blocking, matches_any_blocking, verify_password_blocking};
use crate::auth::{OutgoingMail, TokenKind, TokenPair};
use crate::error::{ApiError, ApiResult};
use crate::storage::UserStorage;
use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    Json,
};
use chrono::Utc;
use florafind_types::validation::{validate_email, validate_password, validate_username};
use florafind_types::{PasswordHistoryEntry, User, UserProfile};
use serde::Deserialize;

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetFormQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordReset {
    pub token: String,
    pub new_password: String,
}

/// Profile update; every field is optional
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMeRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

async fn hash(password: &str) -> ApiResult<String> {
    hash_password_blocking(password.to_string())
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

/// Reject a password that matches one of the user's recent passwords
async fn ensure_not_recent(state: &AppState, user: &User, password: &str) -> ApiResult<()> {
    let recent = state
        .storage
        .recent_password_hashes(&user.id, state.auth.password_history_size)
        .await?;
    if matches_any_blocking(password.to_string(), recent).await {
        return Err(ApiError::BadRequest(format!(
            "Password must not match any of your last {} passwords",
            state.auth.password_history_size
        )));
    }
    Ok(())
}

/// Store a new password hash on the user and in the history
async fn change_password(state: &AppState, user: &mut User, new_password: &str) -> ApiResult<()> {
    let new_hash = hash(new_password).await?;
    user.password_hash = new_hash.clone();
    user.updated_at = Utc::now();
    state.storage.update_user(user.clone()).await?;
    state
        .storage
        .add_password_history(PasswordHistoryEntry::new(user.id, new_hash))
        .await?;
    Ok(())
}

async fn deliver(state: &AppState, mail: OutgoingMail) {
    if let Err(e) = state.mailer.send(mail).await {
        tracing::warn!(error = %e, "Failed to send account mail");
    }
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let email = request.email.trim().to_string();
    validate_email(&email)?;
    validate_username(&request.username)?;
    validate_password(&request.password)?;

    if state.storage.get_user_by_email(&email).await?.is_some()
        || state
            .storage
            .get_user_by_username(&request.username)
            .await?
            .is_some()
    {
        return Err(ApiError::BadRequest("User already exists".to_string()));
    }

    let password_hash = hash(&request.password).await?;
    let user = User::new(
        email,
        request.username,
        password_hash.clone(),
        request.full_name,
    );
    state.storage.insert_user(user.clone()).await?;
    state
        .storage
        .add_password_history(PasswordHistoryEntry::new(user.id, password_hash))
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Registered user");

    deliver(
        &state,
        OutgoingMail::welcome(&state.auth.sender_email, &user.email, &user.username),
    )
    .await;

    Ok((StatusCode::CREATED, Json(user.profile())))
}

/// Exchange credentials for an access/refresh pair
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    let invalid = || ApiError::Unauthorized("Incorrect email or password".to_string());

    let user = state
        .storage
        .get_user_by_email(request.email.trim())
        .await?
        .ok_or_else(invalid)?;
    if !verify_password_blocking(request.password, user.password_hash.clone()).await {
        tracing::debug!(user_id = %user.id, "Rejected login");
        return Err(invalid());
    }

    Ok(Json(state.tokens.issue_pair(&user.username)?))
}

/// Trade a refresh token for a fresh pair
pub async fn refresh(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RefreshQuery>,
) -> ApiResult<Json<TokenPair>> {
    let claims = state.tokens.verify(&query.refresh_token, TokenKind::Refresh)?;
    let user = state
        .storage
        .get_user_by_username(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(state.tokens.issue_pair(&user.username)?))
}

/// Mail a reset link if the address belongs to an account
pub async fn request_password_reset(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PasswordResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if let Some(user) = state.storage.get_user_by_email(request.email.trim()).await? {
        let token = state.tokens.issue(&user.username, TokenKind::PasswordReset)?;
        let reset_url = format!(
            "{}/auth/password-reset?token={}",
            state.auth.frontend_url, token
        );
        deliver(
            &state,
            OutgoingMail::password_reset(
                &state.auth.sender_email,
                &user.email,
                &reset_url,
                state.auth.password_reset_token_expire_minutes,
            ),
        )
        .await;
        tracing::info!(user_id = %user.id, "Password reset requested");
    }

    Ok(Json(MessageResponse::new(
        "If the email exists, a password reset link has been sent",
    )))
}

/// Minimal HTML form that posts the new password back as JSON
pub async fn password_reset_form(ApiQuery(query): ApiQuery<ResetFormQuery>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Reset your password</title></head>
<body>
  <h1>Reset your password</h1>
  <form id="reset-form">
    <input type="hidden" id="token" value="{token}">
    <label for="new_password">New password</label>
    <input type="password" id="new_password" required minlength="8">
    <button type="submit">Reset password</button>
  </form>
  <p id="result"></p>
  <script>
    document.getElementById("reset-form").addEventListener("submit", async (event) => {{
      event.preventDefault();
      const response = await fetch("/auth/password-reset", {{
        method: "POST",
        headers: {{ "Content-Type": "application/json" }},
        body: JSON.stringify({{
          token: document.getElementById("token").value,
          new_password: document.getElementById("new_password").value
        }})
      }});
      const body = await response.json();
      document.getElementById("result").textContent = body.message || body.detail;
    }});
  </script>
</body>
</html>"#,
        token = html_escape(&query.token)
    ))
}

/// Set a new password using a reset token
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PasswordReset>,
) -> ApiResult<Json<MessageResponse>> {
    let claims = state
        .tokens
        .verify(&request.token, TokenKind::PasswordReset)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_password(&request.new_password)?;

    let mut user = state
        .storage
        .get_user_by_username(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::BadRequest("User not found".to_string()))?;

    ensure_not_recent(&state, &user, &request.new_password).await?;
    change_password(&state, &mut user, &request.new_password).await?;

    tracing::info!(user_id = %user.id, "Password reset completed");

    Ok(Json(MessageResponse::new("Password updated successfully")))
}

/// Current user's profile
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(user.profile())
}

/// Update the current user's profile and, optionally, password
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    ApiJson(request): ApiJson<UpdateMeRequest>,
) -> ApiResult<Json<UserProfile>> {
    if let Some(email) = request.email.map(|e| e.trim().to_string()) {
        if email != user.email {
            validate_email(&email)?;
            if state.storage.get_user_by_email(&email).await?.is_some() {
                return Err(ApiError::BadRequest("Email already registered".to_string()));
            }
            user.email = email;
        }
    }

    if let Some(username) = request.username {
        if username != user.username {
            validate_username(&username)?;
            if state.storage.get_user_by_username(&username).await?.is_some() {
                return Err(ApiError::BadRequest("Username already taken".to_string()));
            }
            user.username = username;
        }
    }

    if request.full_name.is_some() {
        user.full_name = request.full_name;
    }

    user.updated_at = Utc::now();

    match request.new_password {
        Some(new_password) => {
            let current = request.current_password.ok_or_else(|| {
                ApiError::BadRequest("Current password is required to set a new one".to_string())
            })?;
            if !verify_password_blocking(current, user.password_hash.clone()).await {
                return Err(ApiError::BadRequest("Incorrect current password".to_string()));
            }
            validate_password(&new_password)?;
            ensure_not_recent(&state, &user, &new_password).await?;
            change_password(&state, &mut user, &new_password).await?;
        }
        None => state.storage.update_user(user.clone()).await?,
    }

    tracing::info!(user_id = %user.id, "Updated profile");

    Ok(Json(user.profile()))
}
