use crate::{
    errors::ServiceError,
    handlers::actor_from_headers,
    services::{
        status::OperationKind,
        transfer::{BatchOutcome, PreflightReport, TransferItem},
    },
    AppState,
};
use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

const MAX_BATCH_ITEMS: usize = 200;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BulkMovementRequest {
    #[validate(length(min = 1, message = "Batch must contain at least one item"))]
    pub items: Vec<TransferItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkSubmitResponse {
    pub success: bool,
    pub details: BatchOutcome,
    pub message: String,
}

pub fn transfer_router() -> Router<AppState> {
    Router::new()
        .route("/preflight", post(preflight_bulk_transfer))
        .route("/bulk", post(submit_bulk_transfer))
}

pub fn outbound_router() -> Router<AppState> {
    Router::new().route("/bulk", post(submit_bulk_outbound))
}

fn check_batch(payload: &BulkMovementRequest) -> Result<(), ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    if payload.items.len() > MAX_BATCH_ITEMS {
        return Err(ServiceError::ValidationError(format!(
            "Batch exceeds {} items",
            MAX_BATCH_ITEMS
        )));
    }
    Ok(())
}

fn submit_response(outcome: BatchOutcome) -> BulkSubmitResponse {
    let message = format!(
        "{} item(s) committed, {} failed",
        outcome.success, outcome.failed
    );
    BulkSubmitResponse {
        success: outcome.failed == 0,
        details: outcome,
        message,
    }
}

/// Dry-run validation of a transfer batch. Advisory only: passing here is
/// not a commit guarantee, since no lock is held until submit.
#[utoipa::path(
    post,
    path = "/api/v1/transfers/preflight",
    request_body = BulkMovementRequest,
    responses(
        (status = 200, description = "Per-item verdicts returned", body = PreflightReport),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn preflight_bulk_transfer(
    State(state): State<AppState>,
    Json(payload): Json<BulkMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    check_batch(&payload)?;

    let report = state
        .services
        .transfer
        .preflight(&payload.items, OperationKind::Transfer)
        .await?;

    Ok(Json(report))
}

/// Commits a transfer batch with per-item outcomes; partial success is a
/// normal response, not an error.
#[utoipa::path(
    post,
    path = "/api/v1/transfers/bulk",
    request_body = BulkMovementRequest,
    responses(
        (status = 200, description = "Batch processed", body = BulkSubmitResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn submit_bulk_transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BulkMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    check_batch(&payload)?;

    let actor = actor_from_headers(&headers);
    let outcome = state
        .services
        .transfer
        .commit(&payload.items, OperationKind::Transfer, actor)
        .await?;

    Ok(Json(submit_response(outcome)))
}

/// Commits an outbound (issue) batch. Items carry an optional free-text note
/// that lands on the transaction row.
#[utoipa::path(
    post,
    path = "/api/v1/outbound/bulk",
    request_body = BulkMovementRequest,
    responses(
        (status = 200, description = "Batch processed", body = BulkSubmitResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "outbound"
)]
pub async fn submit_bulk_outbound(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BulkMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    check_batch(&payload)?;

    let actor = actor_from_headers(&headers);
    let outcome = state
        .services
        .transfer
        .commit(&payload.items, OperationKind::Outbound, actor)
        .await?;

    Ok(Json(submit_response(outcome)))
}
