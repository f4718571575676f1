use crate::{
    entities::{
        location, stock_record,
        stock_transaction::{self, TransactionType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::status::flatten_txn_err,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Atomically decrements a stock record's quantity, refusing to go negative.
///
/// This is the conditional update the whole subsystem's consistency rests on:
/// `UPDATE ... SET quantity = quantity - n WHERE id = ? AND quantity >= n`.
/// Returns `false` when no row matched, i.e. the record is gone, short, or a
/// concurrent mutation won the race. Callers treat that as a per-item
/// failure, never as something to clamp.
pub async fn try_decrement<C: ConnectionTrait>(
    conn: &C,
    stock_id: Uuid,
    quantity: i32,
) -> Result<bool, sea_orm::DbErr> {
    let result = stock_record::Entity::update_many()
        .col_expr(
            stock_record::Column::Quantity,
            Expr::col(stock_record::Column::Quantity).sub(quantity),
        )
        .col_expr(stock_record::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(stock_record::Column::Id.eq(stock_id))
        .filter(stock_record::Column::Quantity.gte(quantity))
        .exec(conn)
        .await?;

    Ok(result.rows_affected > 0)
}

async fn find_slot<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    location_id: Uuid,
    lot: Option<&str>,
) -> Result<Option<stock_record::Model>, sea_orm::DbErr> {
    let mut query = stock_record::Entity::find()
        .filter(stock_record::Column::ProductId.eq(product_id))
        .filter(stock_record::Column::LocationId.eq(location_id));
    query = match lot {
        Some(l) => query.filter(stock_record::Column::Lot.eq(l)),
        None => query.filter(stock_record::Column::Lot.is_null()),
    };
    query.one(conn).await
}

async fn increment_slot<C: ConnectionTrait>(
    conn: &C,
    stock_id: Uuid,
    quantity: i32,
) -> Result<(), sea_orm::DbErr> {
    stock_record::Entity::update_many()
        .col_expr(
            stock_record::Column::Quantity,
            Expr::col(stock_record::Column::Quantity).add(quantity),
        )
        .col_expr(stock_record::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(stock_record::Column::Id.eq(stock_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Adds quantity to the stock record for `(product, location, lot)`, creating
/// the record when none exists. The increment is expressed in SQL so
/// concurrent additions cannot lose updates; a losing concurrent insert is
/// caught by the unique slot index and retried as an increment. `placement`
/// (cart, level) is only used when a new record is created; topping up keeps
/// the existing placement. Returns the record id.
pub async fn add_at_location<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    location_id: Uuid,
    lot: Option<&str>,
    quantity: i32,
    placement: (Option<String>, Option<i32>),
) -> Result<Uuid, sea_orm::DbErr> {
    if let Some(existing) = find_slot(conn, product_id, location_id, lot).await? {
        increment_slot(conn, existing.id, quantity).await?;
        return Ok(existing.id);
    }

    let id = Uuid::new_v4();
    let model = stock_record::ActiveModel {
        id: Set(id),
        product_id: Set(product_id),
        location_id: Set(location_id),
        lot: Set(lot.map(str::to_string)),
        cart: Set(placement.0),
        level: Set(placement.1),
        quantity: Set(quantity),
        ..Default::default()
    };

    match model.insert(conn).await {
        Ok(_) => Ok(id),
        Err(err) => {
            if !matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                return Err(err);
            }
            // Another writer created the slot between the lookup and the
            // insert; fold this addition into its row.
            let existing = find_slot(conn, product_id, location_id, lot)
                .await?
                .ok_or(err)?;
            increment_slot(conn, existing.id, quantity).await?;
            Ok(existing.id)
        }
    }
}

/// Appends a ledger history row. Always called inside the same transaction
/// as the quantity mutation it records.
#[allow(clippy::too_many_arguments)]
pub async fn record_transaction<C: ConnectionTrait>(
    conn: &C,
    stock_record_id: Uuid,
    product_id: Uuid,
    transaction_type: TransactionType,
    quantity: i32,
    from_location_id: Option<Uuid>,
    to_location_id: Option<Uuid>,
    note: Option<String>,
    actor: Uuid,
) -> Result<(), sea_orm::DbErr> {
    let model = stock_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        stock_record_id: Set(stock_record_id),
        product_id: Set(product_id),
        transaction_type: Set(transaction_type.as_str().to_string()),
        quantity: Set(quantity),
        from_location_id: Set(from_location_id),
        to_location_id: Set(to_location_id),
        note: Set(note),
        created_by: Set(actor),
        ..Default::default()
    };
    model.insert(conn).await?;
    Ok(())
}

/// Loads a location and checks it is usable as a stock location.
pub async fn load_active_location<C: ConnectionTrait>(
    conn: &C,
    location_id: Uuid,
) -> Result<Option<location::Model>, sea_orm::DbErr> {
    let loc = location::Entity::find_by_id(location_id).one(conn).await?;
    Ok(loc.filter(|l| l.is_active))
}

#[derive(Debug, Clone)]
pub struct ReceiveStockInput {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub lot: Option<String>,
    pub cart: Option<String>,
    pub level: Option<i32>,
    pub quantity: i32,
    pub note: Option<String>,
}

/// Service owning the authoritative stock table and its history.
#[derive(Clone)]
pub struct StockLedgerService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StockLedgerService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Inbound receipt: creates or tops up the stock record and writes a
    /// RECEIVE history row in one transaction.
    #[instrument(skip(self, input), fields(product_id = %input.product_id, location_id = %input.location_id))]
    pub async fn receive(
        &self,
        input: ReceiveStockInput,
        actor: Uuid,
    ) -> Result<stock_record::Model, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Received quantity must be greater than zero".to_string(),
            ));
        }

        load_active_location(&*self.db, input.location_id)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Location {} not found or inactive",
                    input.location_id
                ))
            })?;

        let in_tx = input.clone();
        let stock_id = self
            .db
            .transaction::<_, Uuid, ServiceError>(move |txn| {
                Box::pin(async move {
                    let stock_id = add_at_location(
                        txn,
                        in_tx.product_id,
                        in_tx.location_id,
                        in_tx.lot.as_deref(),
                        in_tx.quantity,
                        (in_tx.cart.clone(), in_tx.level),
                    )
                    .await
                    .map_err(ServiceError::db_error)?;

                    record_transaction(
                        txn,
                        stock_id,
                        in_tx.product_id,
                        TransactionType::Receive,
                        in_tx.quantity,
                        None,
                        Some(in_tx.location_id),
                        in_tx.note.clone(),
                        actor,
                    )
                    .await
                    .map_err(ServiceError::db_error)?;

                    Ok(stock_id)
                })
            })
            .await
            .map_err(flatten_txn_err)?;

        self.event_sender
            .emit(Event::StockReceived {
                stock_record_id: stock_id,
                product_id: input.product_id,
                location_id: input.location_id,
                quantity: input.quantity,
            })
            .await;

        self.get(stock_id).await?.ok_or_else(|| {
            ServiceError::InternalError("Stock record vanished after receive".to_string())
        })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Option<stock_record::Model>, ServiceError> {
        stock_record::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Active stock listing: zero-quantity records stay in the table as
    /// history anchors but are excluded here.
    #[instrument(skip(self))]
    pub async fn list_active(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<stock_record::Model>, u64), ServiceError> {
        let paginator = stock_record::Entity::find()
            .filter(stock_record::Column::Quantity.gt(0))
            .order_by_asc(stock_record::Column::CreatedAt)
            .paginate(&*self.db, limit.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Ledger history for one stock record, oldest first.
    #[instrument(skip(self))]
    pub async fn transactions(
        &self,
        stock_record_id: Uuid,
    ) -> Result<Vec<stock_transaction::Model>, ServiceError> {
        stock_transaction::Entity::find()
            .filter(stock_transaction::Column::StockRecordId.eq(stock_record_id))
            .order_by_asc(stock_transaction::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}
