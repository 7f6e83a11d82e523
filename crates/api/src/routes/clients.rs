//! Client (advisory customer) routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::client::{Client, CreateClientRequest, ListClientsQuery, UpdateClientRequest};
use persistence::repositories::ClientRepository;
use serde_json::{json, Value};
use shared::pagination::{PageParams, Paginated};
use tracing::info;
use validator::Validate;

use super::success;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Client {} not found", id))
}

/// GET /api/clients
pub async fn list_clients(
    State(state): State<AppState>,
    _user: UserAuth,
    Query(query): Query<ListClientsQuery>,
) -> Result<Json<Paginated<Client>>, ApiError> {
    let repo = ClientRepository::new(state.pool.clone());
    let params = PageParams {
        page: query.page,
        per_page: query.per_page,
    };
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let clients = repo.list(search, params.limit(), params.offset()).await?;
    let total = repo.count(search).await?;

    Ok(Json(Paginated::new(
        clients.into_iter().map(Into::into).collect(),
        total,
        &params,
    )))
}

/// GET /api/clients/:id
pub async fn get_client(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
) -> Result<Json<Client>, ApiError> {
    ClientRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .map(|c| Json(c.into()))
        .ok_or_else(|| not_found(id))
}

/// POST /api/clients
pub async fn create_client(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    request.validate()?;

    let client: Client = ClientRepository::new(state.pool.clone())
        .create(&request, Utc::now())
        .await?
        .into();

    info!(client_id = client.id, user_id = user.user_id, "Client created");
    Ok((
        StatusCode::CREATED,
        success("Client created", json!({ "client": client })),
    ))
}

/// PUT /api/clients/:id
pub async fn update_client(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;

    let client: Client = ClientRepository::new(state.pool.clone())
        .update(id, &request, Utc::now())
        .await?
        .ok_or_else(|| not_found(id))?
        .into();

    Ok(success("Client updated", json!({ "client": client })))
}

/// DELETE /api/clients/:id
///
/// Refused while tasks, projects or applications reference the client.
pub async fn delete_client(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let deleted = ClientRepository::new(state.pool.clone())
        .delete(id)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_foreign_key_violation() => ApiError::Conflict(
                "Client still has tasks, projects or subsidy applications".to_string(),
            ),
            _ => e.into(),
        })?;

    if !deleted {
        return Err(not_found(id));
    }

    info!(client_id = id, user_id = user.user_id, "Client deleted");
    Ok(success("Client deleted", Value::Null))
}
