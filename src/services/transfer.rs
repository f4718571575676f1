use crate::{
    entities::{
        entity_status::EntityType,
        location, stock_record,
        stock_transaction::TransactionType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        ledger,
        status::{
            capabilities, classify, load_status_with_def, quantity_breakdown, OperationKind,
            StatusClass,
        },
    },
};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Whether a transfer stays inside one warehouse or crosses into another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferMode {
    #[default]
    Internal,
    Cross,
}

/// One caller-queued movement. Items have no server-side identity until the
/// batch is committed; the queue itself lives with the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct TransferItem {
    pub source_stock_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub target_location_id: Option<Uuid>,
    pub target_warehouse_id: Option<Uuid>,
    #[serde(default)]
    pub mode: TransferMode,
    pub note: Option<String>,
}

/// Short failure codes surfaced per item, stable across preflight and commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    StockNotFound,
    InsufficientQuantity,
    StatusRestricted,
    StatusEffectMismatch,
    InvalidTarget,
    MissingTargetWarehouse,
    Conflict,
}

impl FailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCode::StockNotFound => "STOCK_NOT_FOUND",
            FailureCode::InsufficientQuantity => "INSUFFICIENT_QUANTITY",
            FailureCode::StatusRestricted => "STATUS_RESTRICTED",
            FailureCode::StatusEffectMismatch => "STATUS_EFFECT_MISMATCH",
            FailureCode::InvalidTarget => "INVALID_TARGET",
            FailureCode::MissingTargetWarehouse => "MISSING_TARGET_WAREHOUSE",
            FailureCode::Conflict => "CONFLICT",
        }
    }
}

/// A single item's failure: code plus an operator-readable message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}: {message}", .code.as_str())]
pub struct ItemError {
    pub code: FailureCode,
    pub message: String,
}

impl ItemError {
    fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error type inside per-item processing. Database errors are
/// infrastructure: they abort the whole batch instead of being recorded as
/// an item failure.
#[derive(Debug, thiserror::Error)]
enum BatchItemError {
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

/// Per-item advisory verdict. Valid only for the moment it was computed;
/// commit re-checks everything.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PreflightResult {
    pub stock_id: Uuid,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PreflightSummary {
    pub total: usize,
    pub ok: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PreflightReport {
    pub results: Vec<PreflightResult>,
    pub summary: PreflightSummary,
}

/// Aggregated outcome of a committed batch. `errors` entries are prefixed
/// with the 1-based queue position so callers can map failures back to
/// their queue entries.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchOutcome {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

struct CheckedItem {
    stock: stock_record::Model,
    target: Option<location::Model>,
}

/// Runs the shared per-item checks against current state. Used verbatim by
/// preflight (against the pool) and by commit (inside each item's
/// transaction), so the two phases can never disagree on the rules.
async fn validate_item<C: ConnectionTrait>(
    conn: &C,
    item: &TransferItem,
    kind: OperationKind,
) -> Result<CheckedItem, BatchItemError> {
    // 1. The stock record must exist.
    let stock = stock_record::Entity::find_by_id(item.source_stock_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ItemError::new(
                FailureCode::StockNotFound,
                format!("Stock record {} not found", item.source_stock_id),
            )
        })?;

    // 2. Quantity must be positive and available.
    if item.quantity <= 0 || item.quantity > stock.quantity {
        return Err(ItemError::new(
            FailureCode::InsufficientQuantity,
            format!(
                "Requested {} but {} available",
                item.quantity, stock.quantity
            ),
        )
        .into());
    }

    // 3. Neither the stock itself, its location, nor its lot may carry a
    //    status that forbids this operation. A product-scoped status on the
    //    stock record can cover a partial quantity; the unrestricted
    //    remainder stays movable. Location and lot statuses always cover
    //    everything at the location/lot.
    let mut scopes: Vec<(EntityType, String)> = vec![
        (EntityType::Stock, stock.id.to_string()),
        (EntityType::Location, stock.location_id.to_string()),
    ];
    if let Some(lot) = &stock.lot {
        scopes.push((EntityType::Lot, lot.clone()));
    }

    for (entity_type, entity_id) in scopes {
        let Some((status, def)) = load_status_with_def(conn, entity_type, &entity_id).await? else {
            continue;
        };
        let Some(effect) = def.effect() else {
            continue;
        };
        let class = classify(effect);
        if class == StatusClass::Normal {
            continue;
        }
        if class == StatusClass::Warning && capabilities(effect).allows(kind) {
            continue;
        }

        // Quantity actually covered by the restriction at this scope.
        let movable = if entity_type == EntityType::Stock {
            quantity_breakdown(stock.quantity, Some(&status)).normal
        } else {
            0
        };

        if item.quantity > movable {
            let (code, message) = match class {
                StatusClass::Restricted => (
                    FailureCode::StatusRestricted,
                    format!(
                        "Blocked by status '{}' ({} of {} unit(s) movable)",
                        def.name, movable, stock.quantity
                    ),
                ),
                _ => (
                    FailureCode::StatusEffectMismatch,
                    format!(
                        "Status '{}' ({}) does not permit this operation",
                        def.name, def.effect
                    ),
                ),
            };
            return Err(ItemError::new(code, message).into());
        }
    }

    // 4/5. Transfers need a valid, distinct, active target; cross-warehouse
    //      transfers additionally need the destination warehouse.
    let target = match kind {
        OperationKind::Transfer => {
            let target_id = item.target_location_id.ok_or_else(|| {
                ItemError::new(FailureCode::InvalidTarget, "No target location given")
            })?;

            if target_id == stock.location_id {
                return Err(ItemError::new(
                    FailureCode::InvalidTarget,
                    "Target location equals source location",
                )
                .into());
            }

            let target = ledger::load_active_location(conn, target_id)
                .await?
                .ok_or_else(|| {
                    ItemError::new(
                        FailureCode::InvalidTarget,
                        format!("Target location {} not found or inactive", target_id),
                    )
                })?;

            if item.mode == TransferMode::Cross {
                let warehouse_id = item.target_warehouse_id.ok_or_else(|| {
                    ItemError::new(
                        FailureCode::MissingTargetWarehouse,
                        "Cross-warehouse transfer without a target warehouse",
                    )
                })?;
                if target.warehouse_id != warehouse_id {
                    return Err(ItemError::new(
                        FailureCode::InvalidTarget,
                        format!(
                            "Location {} does not belong to warehouse {}",
                            target.code, warehouse_id
                        ),
                    )
                    .into());
                }
            }

            Some(target)
        }
        _ => None,
    };

    Ok(CheckedItem { stock, target })
}

/// Preflight validation and batch commit for bulk transfers and outbound
/// issues. Preflight and commit deliberately share no lock: commit owns
/// correctness through its conditional updates.
#[derive(Clone)]
pub struct TransferService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl TransferService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Dry-run validation of a batch. Each item is judged independently
    /// against a fresh read; no item's verdict can depend on another's.
    /// Purely advisory.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn preflight(
        &self,
        items: &[TransferItem],
        kind: OperationKind,
    ) -> Result<PreflightReport, ServiceError> {
        let mut results = Vec::with_capacity(items.len());
        let mut ok_count = 0usize;

        for item in items {
            match validate_item(&*self.db, item, kind).await {
                Ok(_) => {
                    ok_count += 1;
                    results.push(PreflightResult {
                        stock_id: item.source_stock_id,
                        ok: true,
                        reason: None,
                    });
                }
                Err(BatchItemError::Item(e)) => {
                    results.push(PreflightResult {
                        stock_id: item.source_stock_id,
                        ok: false,
                        reason: Some(e.to_string()),
                    });
                }
                Err(BatchItemError::Db(e)) => return Err(ServiceError::db_error(e)),
            }
        }

        Ok(PreflightReport {
            summary: PreflightSummary {
                total: results.len(),
                ok: ok_count,
            },
            results,
        })
    }

    /// Commits a batch with per-item outcomes.
    ///
    /// Items are processed sequentially: later items may legitimately draw
    /// from stock an earlier item just moved. Every check is re-run against
    /// current state inside each item's own database transaction, so a
    /// preflight pass is never trusted. One item's failure never rolls back
    /// or blocks the others; only a database-level error aborts the
    /// remainder of the batch.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn commit(
        &self,
        items: &[TransferItem],
        kind: OperationKind,
        actor: Uuid,
    ) -> Result<BatchOutcome, ServiceError> {
        let mut outcome = BatchOutcome {
            success: 0,
            failed: 0,
            errors: Vec::new(),
        };

        for (index, item) in items.iter().enumerate() {
            match self.commit_item(item, kind, actor).await {
                Ok(event) => {
                    outcome.success += 1;
                    self.event_sender.emit(event).await;
                }
                Err(BatchItemError::Item(e)) => {
                    outcome.failed += 1;
                    outcome.errors.push(format!("item {}: {}", index + 1, e));
                }
                Err(BatchItemError::Db(e)) => {
                    // Infrastructure failure: already-committed items stay
                    // committed, the rest of the batch is abandoned.
                    return Err(ServiceError::db_error(e));
                }
            }
        }

        info!(
            success = outcome.success,
            failed = outcome.failed,
            "batch commit finished"
        );
        self.event_sender
            .emit(Event::BatchCompleted {
                succeeded: outcome.success,
                failed: outcome.failed,
                completed_at: chrono::Utc::now(),
            })
            .await;

        Ok(outcome)
    }

    /// One item's mutation as a single atomic unit: re-check, conditional
    /// source decrement, destination increment (transfers), history row.
    /// A crash mid-item rolls all of it back together.
    async fn commit_item(
        &self,
        item: &TransferItem,
        kind: OperationKind,
        actor: Uuid,
    ) -> Result<Event, BatchItemError> {
        let item = item.clone();

        let result = self
            .db
            .transaction::<_, Event, BatchItemError>(move |txn| {
                Box::pin(async move {
                    let checked = validate_item(txn, &item, kind).await?;
                    let stock = checked.stock;

                    // The conditional decrement is the authoritative check:
                    // zero rows affected means a concurrent mutation won.
                    let decremented = ledger::try_decrement(txn, stock.id, item.quantity).await?;
                    if !decremented {
                        return Err(ItemError::new(
                            FailureCode::Conflict,
                            format!(
                                "Stock record {} was modified concurrently; retry the item",
                                stock.id
                            ),
                        )
                        .into());
                    }

                    match kind {
                        OperationKind::Transfer => {
                            let target = checked.target.ok_or_else(|| {
                                ItemError::new(
                                    FailureCode::InvalidTarget,
                                    "No target location given",
                                )
                            })?;

                            ledger::add_at_location(
                                txn,
                                stock.product_id,
                                target.id,
                                stock.lot.as_deref(),
                                item.quantity,
                                (None, None),
                            )
                            .await?;

                            ledger::record_transaction(
                                txn,
                                stock.id,
                                stock.product_id,
                                TransactionType::Transfer,
                                item.quantity,
                                Some(stock.location_id),
                                Some(target.id),
                                item.note.clone(),
                                actor,
                            )
                            .await?;

                            Ok(Event::StockTransferred {
                                stock_record_id: stock.id,
                                product_id: stock.product_id,
                                from_location_id: stock.location_id,
                                to_location_id: target.id,
                                quantity: item.quantity,
                            })
                        }
                        _ => {
                            ledger::record_transaction(
                                txn,
                                stock.id,
                                stock.product_id,
                                TransactionType::Outbound,
                                item.quantity,
                                Some(stock.location_id),
                                None,
                                item.note.clone(),
                                actor,
                            )
                            .await?;

                            Ok(Event::StockIssued {
                                stock_record_id: stock.id,
                                product_id: stock.product_id,
                                from_location_id: stock.location_id,
                                quantity: item.quantity,
                            })
                        }
                    }
                })
            })
            .await;

        result.map_err(|e| match e {
            sea_orm::TransactionError::Connection(db_err) => BatchItemError::Db(db_err),
            sea_orm::TransactionError::Transaction(item_err) => item_err,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_error_formats_code_and_message() {
        let e = ItemError::new(FailureCode::InsufficientQuantity, "Requested 5 but 3 available");
        assert_eq!(
            e.to_string(),
            "INSUFFICIENT_QUANTITY: Requested 5 but 3 available"
        );
    }

    #[test]
    fn transfer_mode_defaults_to_internal() {
        let item: TransferItem = serde_json::from_value(serde_json::json!({
            "source_stock_id": "00000000-0000-0000-0000-000000000001",
            "quantity": 1
        }))
        .expect("deserializes without mode");
        assert_eq!(item.mode, TransferMode::Internal);
    }
}
