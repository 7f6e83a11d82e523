//! Office user lookups. Users are provisioned by the session issuer.

use axum::{extract::State, Json};
use domain::models::user::User;
use persistence::repositories::UserRepository;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    _user: UserAuth,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = UserRepository::new(state.pool.clone()).list().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// GET /api/users/me
pub async fn current_user(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<User>, ApiError> {
    UserRepository::new(state.pool.clone())
        .find_by_id(user.user_id)
        .await?
        .map(|u| Json(u.into()))
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}
