//! HTTP binding for the identity engine

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    models::{CreateUserRequest, DeactivateUserRequest, OperationOutcome, UpdateUserRequest},
    state::AppState,
};

/// Create the router for the identity service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/organizations/:org_id/users",
            post(create_user).get(list_users),
        )
        .route(
            "/organizations/:org_id/users/:user_id",
            get(get_user).patch(update_user),
        )
        .route(
            "/organizations/:org_id/users/:user_id/deactivate",
            post(deactivate_user),
        )
        .with_state(state)
}

/// Comma-separated field names, e.g. `?fields=username,email`
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub fields: Option<String>,
}

impl ListUsersQuery {
    fn field_names(&self) -> Vec<String> {
        self.fields
            .as_deref()
            .map(|fields| fields.split(',').map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Map an outcome to its HTTP status; `created` applies on success only
fn respond<T: Serialize>(outcome: OperationOutcome<T>, created: bool) -> impl IntoResponse {
    let status = match outcome.reason {
        Some(kind) => kind.status_code(),
        None if created => StatusCode::CREATED,
        None => StatusCode::OK,
    };
    (status, Json(outcome))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "identity-service"
    }))
}

pub async fn create_user(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(payload): Json<CreateUserRequest>,
) -> impl IntoResponse {
    respond(state.engine.create_user(&org_id, payload).await, true)
}

pub async fn list_users(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Query(query): Query<ListUsersQuery>,
) -> impl IntoResponse {
    respond(
        state.engine.list_users(&org_id, &query.field_names()).await,
        false,
    )
}

pub async fn get_user(
    State(state): State<AppState>,
    Path((org_id, user_id)): Path<(String, Uuid)>,
) -> impl IntoResponse {
    respond(state.engine.get_user(&org_id, user_id).await, false)
}

pub async fn update_user(
    State(state): State<AppState>,
    Path((org_id, user_id)): Path<(String, Uuid)>,
    Json(payload): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    respond(
        state.engine.update_user(&org_id, user_id, payload).await,
        false,
    )
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Path((org_id, user_id)): Path<(String, Uuid)>,
    payload: Option<Json<DeactivateUserRequest>>,
) -> impl IntoResponse {
    let end_date = payload.and_then(|Json(request)| request.end_date);
    respond(
        state
            .engine
            .deactivate_user(&org_id, user_id, end_date)
            .await,
        false,
    )
}
