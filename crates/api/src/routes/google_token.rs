//! Storage of the signed-in user's Google access token.

use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use domain::models::google::{GoogleToken, StoreTokenRequest};
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use super::success;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// PUT /api/google/token
pub async fn store_token(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<StoreTokenRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;
    let now = Utc::now();

    let expires_at = match request.expires_in {
        Some(secs) if secs <= 0 => {
            return Err(ApiError::Validation("expires_in must be positive".into()))
        }
        Some(secs) => Some(now + Duration::seconds(secs)),
        None => None,
    };
    let token = GoogleToken {
        access_token: request.access_token,
        expires_at,
    };

    state.google.tokens().put(user.user_id, &token, now).await?;
    info!(user_id = user.user_id, "Google token stored");

    Ok(success(
        "Google account connected",
        json!({ "expires_at": token.expires_at }),
    ))
}

/// DELETE /api/google/token
pub async fn remove_token(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<Value>, ApiError> {
    if !state.google.tokens().remove(user.user_id).await? {
        return Err(ApiError::NotFound("No Google token stored".into()));
    }
    info!(user_id = user.user_id, "Google token removed");
    Ok(success("Google account disconnected", Value::Null))
}
