use crate::{
    entities::{entity_status::EntityType, stock_record, stock_transaction},
    errors::ServiceError,
    handlers::actor_from_headers,
    services::{
        ledger::ReceiveStockInput,
        status::{quantity_breakdown, QuantityBreakdown},
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ReceiveStockRequest {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub lot: Option<String>,
    pub cart: Option<String>,
    pub level: Option<i32>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct StockListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockListResponse {
    pub items: Vec<stock_record::Model>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Stock record enriched with its current status and quantity split, the
/// shape the browsing UI renders.
#[derive(Debug, Serialize, ToSchema)]
pub struct StockDetailResponse {
    #[serde(flatten)]
    pub record: stock_record::Model,
    pub status_name: Option<String>,
    pub status_effect: Option<String>,
    pub breakdown: QuantityBreakdown,
}

pub fn stock_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stock).post(receive_stock))
        .route("/:id", get(get_stock))
        .route("/:id/transactions", get(list_stock_transactions))
}

/// Inbound receipt of stock at a location.
#[utoipa::path(
    post,
    path = "/api/v1/stock",
    request_body = ReceiveStockRequest,
    responses(
        (status = 201, description = "Stock received"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn receive_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ReceiveStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let actor = actor_from_headers(&headers);
    let record = state
        .services
        .ledger
        .receive(
            ReceiveStockInput {
                product_id: payload.product_id,
                location_id: payload.location_id,
                lot: payload.lot,
                cart: payload.cart,
                level: payload.level,
                quantity: payload.quantity,
                note: payload.note,
            },
            actor,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Active stock listing (zero-quantity records are excluded).
#[utoipa::path(
    get,
    path = "/api/v1/stock",
    params(StockListQuery),
    responses((status = 200, description = "Stock list returned", body = StockListResponse)),
    tag = "stock"
)]
pub async fn list_stock(
    State(state): State<AppState>,
    Query(query): Query<StockListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let (items, total) = state.services.ledger.list_active(page, limit).await?;

    Ok(Json(StockListResponse {
        items,
        total,
        page,
        limit,
    }))
}

/// One stock record with its status and quantity breakdown.
#[utoipa::path(
    get,
    path = "/api/v1/stock/{id}",
    params(("id" = Uuid, Path, description = "Stock record id")),
    responses(
        (status = 200, description = "Stock record returned", body = StockDetailResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn get_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .services
        .ledger
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Stock record {} not found", id)))?;

    let status = state
        .services
        .status
        .get_status(EntityType::Stock, &id.to_string())
        .await?;

    let breakdown = quantity_breakdown(record.quantity, status.as_ref().map(|(s, _)| s));

    Ok(Json(StockDetailResponse {
        breakdown,
        status_name: status.as_ref().map(|(_, d)| d.name.clone()),
        status_effect: status.as_ref().map(|(_, d)| d.effect.clone()),
        record,
    }))
}

/// Ledger history for one stock record.
#[utoipa::path(
    get,
    path = "/api/v1/stock/{id}/transactions",
    params(("id" = Uuid, Path, description = "Stock record id")),
    responses((status = 200, description = "Transaction history returned")),
    tag = "stock"
)]
pub async fn list_stock_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<stock_transaction::Model>>, ServiceError> {
    let rows = state.services.ledger.transactions(id).await?;
    Ok(Json(rows))
}
