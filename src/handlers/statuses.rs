use crate::{
    entities::{
        entity_status::{self, EntityType},
        status_change_log,
        status_definition::{self, Effect, StatusType},
    },
    errors::ServiceError,
    handlers::actor_from_headers,
    services::status::{classify, ApplyStatusInput, NewStatusDefinition},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct DefinitionFilters {
    pub status_type: Option<StatusType>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateDefinitionRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    pub effect: Effect,
    pub status_type: StatusType,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ApplyStatusRequest {
    pub entity_type: EntityType,
    #[validate(length(min = 1, message = "Entity id cannot be empty"))]
    pub entity_id: String,
    pub status_id: Uuid,
    pub affected_quantity: Option<i32>,
    pub total_quantity: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RemoveStatusRequest {
    pub entity_type: EntityType,
    #[validate(length(min = 1, message = "Entity id cannot be empty"))]
    pub entity_id: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RemovePartialRequest {
    pub entity_type: EntityType,
    #[validate(length(min = 1, message = "Entity id cannot be empty"))]
    pub entity_id: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusMutationResponse {
    pub success: bool,
    pub message: String,
}

/// Current status of an entity, with classification and (for stock) the
/// quantity split.
#[derive(Debug, Serialize, ToSchema)]
pub struct EntityStatusResponse {
    pub status: Option<entity_status::Model>,
    pub definition: Option<status_definition::Model>,
    pub classification: Option<crate::services::status::StatusClass>,
}

pub fn status_router() -> Router<AppState> {
    Router::new()
        .route("/definitions", get(list_definitions).post(create_definition))
        .route("/definitions/:id", delete(deactivate_definition))
        .route("/apply", post(apply_status))
        .route("/remove", post(remove_status))
        .route("/remove-partial", post(remove_partial_status))
        .route("/:entity_type/:entity_id", get(get_entity_status))
        .route("/:entity_type/:entity_id/history", get(get_status_history))
}

fn parse_entity_type(raw: &str) -> Result<EntityType, ServiceError> {
    EntityType::from_str(&raw.to_uppercase())
        .ok_or_else(|| ServiceError::ValidationError(format!("Unknown entity type '{}'", raw)))
}

/// Active status definitions, optionally filtered by scope.
#[utoipa::path(
    get,
    path = "/api/v1/statuses/definitions",
    params(DefinitionFilters),
    responses((status = 200, description = "Definitions returned", body = [status_definition::Model])),
    tag = "statuses"
)]
pub async fn list_definitions(
    State(state): State<AppState>,
    Query(filters): Query<DefinitionFilters>,
) -> Result<Json<Vec<status_definition::Model>>, ServiceError> {
    let defs = state
        .services
        .status
        .list_definitions(filters.status_type)
        .await?;
    Ok(Json(defs))
}

#[utoipa::path(
    post,
    path = "/api/v1/statuses/definitions",
    request_body = CreateDefinitionRequest,
    responses(
        (status = 201, description = "Definition created", body = status_definition::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "statuses"
)]
pub async fn create_definition(
    State(state): State<AppState>,
    Json(payload): Json<CreateDefinitionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let def = state
        .services
        .status
        .create_definition(NewStatusDefinition {
            name: payload.name,
            effect: payload.effect,
            status_type: payload.status_type,
            color: payload.color,
            text_color: payload.text_color,
            description: payload.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(def)))
}

/// Deactivates a definition (soft delete; referenced statuses keep working).
#[utoipa::path(
    delete,
    path = "/api/v1/statuses/definitions/{id}",
    params(("id" = Uuid, Path, description = "Definition id")),
    responses(
        (status = 200, description = "Definition deactivated", body = StatusMutationResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "statuses"
)]
pub async fn deactivate_definition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusMutationResponse>, ServiceError> {
    state.services.status.deactivate_definition(id).await?;
    Ok(Json(StatusMutationResponse {
        success: true,
        message: "Status definition deactivated".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/statuses/{entity_type}/{entity_id}",
    params(
        ("entity_type" = String, Path, description = "STOCK, LOCATION, or LOT"),
        ("entity_id" = String, Path, description = "Entity identifier")
    ),
    responses((status = 200, description = "Current status returned", body = EntityStatusResponse)),
    tag = "statuses"
)]
pub async fn get_entity_status(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Result<Json<EntityStatusResponse>, ServiceError> {
    let entity_type = parse_entity_type(&entity_type)?;
    let found = state.services.status.get_status(entity_type, &entity_id).await?;

    let classification = found
        .as_ref()
        .and_then(|(_, def)| def.effect())
        .map(classify);

    let (status, definition) = match found {
        Some((s, d)) => (Some(s), Some(d)),
        None => (None, None),
    };

    Ok(Json(EntityStatusResponse {
        status,
        definition,
        classification,
    }))
}

/// Full status transition history of one entity.
#[utoipa::path(
    get,
    path = "/api/v1/statuses/{entity_type}/{entity_id}/history",
    params(
        ("entity_type" = String, Path, description = "STOCK, LOCATION, or LOT"),
        ("entity_id" = String, Path, description = "Entity identifier")
    ),
    responses((status = 200, description = "History returned", body = [status_change_log::Model])),
    tag = "statuses"
)]
pub async fn get_status_history(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Result<Json<Vec<status_change_log::Model>>, ServiceError> {
    let entity_type = parse_entity_type(&entity_type)?;
    let rows = state.services.status.history(entity_type, &entity_id).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/api/v1/statuses/apply",
    request_body = ApplyStatusRequest,
    responses(
        (status = 200, description = "Status applied", body = StatusMutationResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Definition not found", body = crate::errors::ErrorResponse)
    ),
    tag = "statuses"
)]
pub async fn apply_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ApplyStatusRequest>,
) -> Result<Json<StatusMutationResponse>, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let actor = actor_from_headers(&headers);
    let applied = state
        .services
        .status
        .apply_status(
            ApplyStatusInput {
                entity_type: payload.entity_type,
                entity_id: payload.entity_id,
                status_id: payload.status_id,
                affected_quantity: payload.affected_quantity,
                total_quantity: payload.total_quantity,
                reason: payload.reason,
            },
            actor,
        )
        .await?;

    let message = match applied.affected_quantity {
        Some(q) => format!("Status applied to {} unit(s)", q),
        None => "Status applied".to_string(),
    };

    Ok(Json(StatusMutationResponse {
        success: true,
        message,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/statuses/remove",
    request_body = RemoveStatusRequest,
    responses((status = 200, description = "Status removed", body = StatusMutationResponse)),
    tag = "statuses"
)]
pub async fn remove_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RemoveStatusRequest>,
) -> Result<Json<StatusMutationResponse>, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let actor = actor_from_headers(&headers);
    state
        .services
        .status
        .remove_status(payload.entity_type, &payload.entity_id, payload.reason, actor)
        .await?;

    Ok(Json(StatusMutationResponse {
        success: true,
        message: "Status removed".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/statuses/remove-partial",
    request_body = RemovePartialRequest,
    responses(
        (status = 200, description = "Affected quantity reduced", body = StatusMutationResponse),
        (status = 404, description = "No active status", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not product-scoped", body = crate::errors::ErrorResponse)
    ),
    tag = "statuses"
)]
pub async fn remove_partial_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RemovePartialRequest>,
) -> Result<Json<StatusMutationResponse>, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let actor = actor_from_headers(&headers);
    let remaining = state
        .services
        .status
        .remove_partial(
            payload.entity_type,
            &payload.entity_id,
            payload.quantity,
            payload.reason,
            actor,
        )
        .await?;

    let message = if remaining == 0 {
        "Status fully removed".to_string()
    } else {
        format!("Status retained on {} remaining unit(s)", remaining)
    };

    Ok(Json(StatusMutationResponse {
        success: true,
        message,
    }))
}
