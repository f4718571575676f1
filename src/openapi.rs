use utoipa::OpenApi;

use crate::entities::{entity_status, status_change_log, status_definition, stock_record, stock_transaction};
use crate::handlers::{statuses, stock, transfers};
use crate::services::{status as status_service, transfer};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "WMS API",
        description = "Warehouse stock ledger, status restrictions, and bulk movement coordination",
        version = env!("CARGO_PKG_VERSION")
    ),
    paths(
        stock::receive_stock,
        stock::list_stock,
        stock::get_stock,
        stock::list_stock_transactions,
        statuses::list_definitions,
        statuses::create_definition,
        statuses::deactivate_definition,
        statuses::get_entity_status,
        statuses::get_status_history,
        statuses::apply_status,
        statuses::remove_status,
        statuses::remove_partial_status,
        transfers::preflight_bulk_transfer,
        transfers::submit_bulk_transfer,
        transfers::submit_bulk_outbound,
    ),
    components(schemas(
        stock::ReceiveStockRequest,
        stock::StockListResponse,
        stock::StockDetailResponse,
        statuses::CreateDefinitionRequest,
        statuses::ApplyStatusRequest,
        statuses::RemoveStatusRequest,
        statuses::RemovePartialRequest,
        statuses::StatusMutationResponse,
        statuses::EntityStatusResponse,
        transfers::BulkMovementRequest,
        transfers::BulkSubmitResponse,
        stock_record::Model,
        stock_transaction::Model,
        status_definition::Model,
        entity_status::Model,
        status_change_log::Model,
        status_definition::Effect,
        status_definition::StatusType,
        entity_status::EntityType,
        stock_transaction::TransactionType,
        status_service::StatusClass,
        status_service::QuantityBreakdown,
        transfer::TransferItem,
        transfer::TransferMode,
        transfer::PreflightReport,
        transfer::PreflightResult,
        transfer::PreflightSummary,
        transfer::BatchOutcome,
        transfer::FailureCode,
        crate::errors::ErrorResponse,
    )),
    tags(
        (name = "stock", description = "Stock ledger"),
        (name = "statuses", description = "Status definitions and entity statuses"),
        (name = "transfers", description = "Bulk transfer coordination"),
        (name = "outbound", description = "Bulk outbound issuing")
    )
)]
pub struct ApiDoc;
