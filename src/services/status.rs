use crate::{
    entities::{
        entity_status::{self, EntityType},
        status_change_log,
        status_definition::{self, Effect, StatusType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Operation kinds gated by status effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Inbound,
    Outbound,
    Transfer,
    Audit,
}

/// Explicit effect-to-permission table. Every effect must state what it
/// allows; a new effect cannot silently bypass a check by being missing from
/// a membership list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectCapabilities {
    pub inbound: bool,
    pub outbound: bool,
    pub transfer: bool,
    pub audit: bool,
}

impl EffectCapabilities {
    pub fn allows(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Inbound => self.inbound,
            OperationKind::Outbound => self.outbound,
            OperationKind::Transfer => self.transfer,
            OperationKind::Audit => self.audit,
        }
    }
}

pub fn capabilities(effect: Effect) -> EffectCapabilities {
    match effect {
        Effect::TransactionsAllowed | Effect::Custom => EffectCapabilities {
            inbound: true,
            outbound: true,
            transfer: true,
            audit: true,
        },
        Effect::TransactionsProhibited | Effect::Closed => EffectCapabilities {
            inbound: false,
            outbound: false,
            transfer: false,
            audit: false,
        },
        Effect::InboundOnly => EffectCapabilities {
            inbound: true,
            outbound: false,
            transfer: false,
            audit: true,
        },
        Effect::OutboundOnly => EffectCapabilities {
            inbound: false,
            outbound: true,
            transfer: false,
            audit: true,
        },
        Effect::AuditOnly => EffectCapabilities {
            inbound: false,
            outbound: false,
            transfer: false,
            audit: true,
        },
    }
}

/// Coarse classification that gates downstream transaction checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    Restricted,
    Warning,
    Normal,
}

pub fn classify(effect: Effect) -> StatusClass {
    match effect {
        Effect::TransactionsProhibited | Effect::Closed => StatusClass::Restricted,
        Effect::InboundOnly | Effect::OutboundOnly | Effect::AuditOnly => StatusClass::Warning,
        Effect::TransactionsAllowed | Effect::Custom => StatusClass::Normal,
    }
}

/// How a stock record's total quantity splits under its current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuantityBreakdown {
    pub total: i32,
    pub normal: i32,
    pub affected: i32,
}

/// Single source of truth for the affected/normal split; used by both the
/// read endpoints and preflight arithmetic.
pub fn quantity_breakdown(total: i32, status: Option<&entity_status::Model>) -> QuantityBreakdown {
    let affected = match status {
        Some(s) => s.affected_quantity.unwrap_or(total),
        None => 0,
    };
    QuantityBreakdown {
        total,
        normal: (total - affected).max(0),
        affected,
    }
}

/// Loads the current status of an entity together with its definition.
/// Generic over the connection so preflight (pool) and commit (transaction)
/// share one code path.
pub async fn load_status_with_def<C: ConnectionTrait>(
    conn: &C,
    entity_type: EntityType,
    entity_id: &str,
) -> Result<Option<(entity_status::Model, status_definition::Model)>, sea_orm::DbErr> {
    let found = entity_status::Entity::find()
        .filter(entity_status::Column::EntityType.eq(entity_type.as_str()))
        .filter(entity_status::Column::EntityId.eq(entity_id))
        .find_also_related(status_definition::Entity)
        .one(conn)
        .await?;

    Ok(found.and_then(|(status, def)| def.map(|d| (status, d))))
}

#[derive(Debug, Clone)]
pub struct ApplyStatusInput {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub status_id: Uuid,
    pub affected_quantity: Option<i32>,
    pub total_quantity: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewStatusDefinition {
    pub name: String,
    pub effect: Effect,
    pub status_type: StatusType,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub description: Option<String>,
}

/// Service owning status definitions, per-entity status application, and the
/// status change log.
#[derive(Clone)]
pub struct StatusService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StatusService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Returns all active definitions, optionally filtered by scope.
    #[instrument(skip(self))]
    pub async fn list_definitions(
        &self,
        status_type: Option<StatusType>,
    ) -> Result<Vec<status_definition::Model>, ServiceError> {
        let mut query = status_definition::Entity::find()
            .filter(status_definition::Column::IsActive.eq(true));

        if let Some(st) = status_type {
            query = query.filter(status_definition::Column::StatusType.eq(st.as_str()));
        }

        query
            .order_by_asc(status_definition::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_definition(
        &self,
        input: NewStatusDefinition,
    ) -> Result<status_definition::Model, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Status name cannot be empty".to_string(),
            ));
        }

        let model = status_definition::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            effect: Set(input.effect.as_str().to_string()),
            status_type: Set(input.status_type.as_str().to_string()),
            color: Set(input.color.unwrap_or_else(|| "#e0e0e0".to_string())),
            text_color: Set(input.text_color.unwrap_or_else(|| "#000000".to_string())),
            description: Set(input.description),
            is_active: Set(true),
            ..Default::default()
        };

        model.insert(&*self.db).await.map_err(ServiceError::db_error)
    }

    /// Soft-deletes a definition. Existing entity statuses keep referencing
    /// it; it simply stops being offered for new applications.
    #[instrument(skip(self))]
    pub async fn deactivate_definition(&self, id: Uuid) -> Result<(), ServiceError> {
        let def = status_definition::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Status definition {} not found", id)))?;

        let mut active: status_definition::ActiveModel = def.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.map_err(ServiceError::db_error)?;

        Ok(())
    }

    /// Current status of an entity, with its definition, or `None`.
    #[instrument(skip(self))]
    pub async fn get_status(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Option<(entity_status::Model, status_definition::Model)>, ServiceError> {
        load_status_with_def(&*self.db, entity_type, entity_id)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Applies a status to an entity, replacing any prior one (upsert).
    ///
    /// Re-applying the same status is not a no-op: the row is overwritten
    /// with the new reason/quantity and a transition is always logged.
    #[instrument(skip(self, input), fields(entity_id = %input.entity_id, status_id = %input.status_id))]
    pub async fn apply_status(
        &self,
        input: ApplyStatusInput,
        actor: Uuid,
    ) -> Result<entity_status::Model, ServiceError> {
        let def = status_definition::Entity::find_by_id(input.status_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Status definition {} not found", input.status_id))
            })?;

        if !def.is_active {
            return Err(ServiceError::ValidationError(format!(
                "Status '{}' is no longer active",
                def.name
            )));
        }

        let (affected, total) = match def.status_type() {
            Some(StatusType::Product) => {
                let total = input.total_quantity.ok_or_else(|| {
                    ServiceError::ValidationError(
                        "Total quantity is required for product-scoped statuses".to_string(),
                    )
                })?;
                let requested = input.affected_quantity.unwrap_or(0);
                if requested <= 0 {
                    return Err(ServiceError::ValidationError(
                        "Affected quantity must be greater than zero".to_string(),
                    ));
                }
                // Clamp into [1, total].
                (Some(requested.min(total).max(1)), Some(total))
            }
            // Location scope covers everything; the quantities are not used.
            _ => (input.affected_quantity, input.total_quantity),
        };

        let entity_type = input.entity_type;
        let entity_id = input.entity_id.clone();
        let status_id = input.status_id;
        let reason = input.reason.clone();

        let applied = self
            .db
            .transaction::<_, entity_status::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let prior = entity_status::Entity::find()
                        .filter(entity_status::Column::EntityType.eq(entity_type.as_str()))
                        .filter(entity_status::Column::EntityId.eq(entity_id.as_str()))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let from_status_id = prior.as_ref().map(|p| p.status_id);

                    let applied = match prior {
                        Some(existing) => {
                            let mut active: entity_status::ActiveModel = existing.into();
                            active.status_id = Set(status_id);
                            active.affected_quantity = Set(affected);
                            active.total_quantity_at_application = Set(total);
                            active.reason = Set(reason.clone());
                            active.applied_by = Set(actor);
                            active.applied_at = Set(Utc::now());
                            active.update(txn).await.map_err(ServiceError::db_error)?
                        }
                        None => {
                            let model = entity_status::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                entity_type: Set(entity_type.as_str().to_string()),
                                entity_id: Set(entity_id.clone()),
                                status_id: Set(status_id),
                                affected_quantity: Set(affected),
                                total_quantity_at_application: Set(total),
                                reason: Set(reason.clone()),
                                applied_by: Set(actor),
                                ..Default::default()
                            };
                            model.insert(txn).await.map_err(ServiceError::db_error)?
                        }
                    };

                    record_transition(
                        txn,
                        entity_type,
                        &entity_id,
                        from_status_id,
                        Some(status_id),
                        affected,
                        reason,
                        actor,
                    )
                    .await?;

                    Ok(applied)
                })
            })
            .await
            .map_err(flatten_txn_err)?;

        self.event_sender
            .emit(Event::StatusApplied {
                entity_type: applied.entity_type.clone(),
                entity_id: applied.entity_id.clone(),
                status_id: applied.status_id,
                affected_quantity: applied.affected_quantity,
            })
            .await;

        Ok(applied)
    }

    /// Removes an entity's status entirely.
    ///
    /// Calling this when no status is present still succeeds and still writes
    /// a change-log row; the end state is idempotent, the log is not.
    #[instrument(skip(self))]
    pub async fn remove_status(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        reason: Option<String>,
        actor: Uuid,
    ) -> Result<(), ServiceError> {
        let entity_id = entity_id.to_string();
        let log_entity_id = entity_id.clone();

        let from_status_id = self
            .db
            .transaction::<_, Option<Uuid>, ServiceError>(move |txn| {
                Box::pin(async move {
                    let prior = entity_status::Entity::find()
                        .filter(entity_status::Column::EntityType.eq(entity_type.as_str()))
                        .filter(entity_status::Column::EntityId.eq(entity_id.as_str()))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let from_status_id = prior.as_ref().map(|p| p.status_id);
                    if let Some(existing) = prior {
                        existing.delete(txn).await.map_err(ServiceError::db_error)?;
                    }

                    record_transition(
                        txn,
                        entity_type,
                        &entity_id,
                        from_status_id,
                        None,
                        None,
                        reason,
                        actor,
                    )
                    .await?;

                    Ok(from_status_id)
                })
            })
            .await
            .map_err(flatten_txn_err)?;

        self.event_sender
            .emit(Event::StatusRemoved {
                entity_type: entity_type.as_str().to_string(),
                entity_id: log_entity_id,
                from_status_id,
            })
            .await;

        Ok(())
    }

    /// Reduces the affected quantity of a product-scoped status. When the
    /// remainder reaches zero the status is removed entirely.
    ///
    /// Returns the remaining affected quantity (0 when fully removed).
    #[instrument(skip(self))]
    pub async fn remove_partial(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        quantity_to_remove: i32,
        reason: Option<String>,
        actor: Uuid,
    ) -> Result<i32, ServiceError> {
        if quantity_to_remove <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity to remove must be greater than zero".to_string(),
            ));
        }

        let entity_id = entity_id.to_string();
        let log_entity_id = entity_id.clone();

        let (remaining, status_id) = self
            .db
            .transaction::<_, (i32, Uuid), ServiceError>(move |txn| {
                Box::pin(async move {
                    let (current, def) = load_status_with_def(txn, entity_type, &entity_id)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "No active status on {} {}",
                                entity_type.as_str(),
                                entity_id
                            ))
                        })?;

                    if def.status_type() != Some(StatusType::Product) {
                        return Err(ServiceError::InvalidOperation(format!(
                            "Status '{}' is not product-scoped; remove it entirely instead",
                            def.name
                        )));
                    }

                    let status_id = current.status_id;

                    // Conditional decrement: only a row still holding more
                    // than the removed quantity is updated. Zero rows means
                    // the remainder hit zero (or a concurrent removal drained
                    // it first) and the status comes off entirely.
                    let updated = entity_status::Entity::update_many()
                        .col_expr(
                            entity_status::Column::AffectedQuantity,
                            Expr::col(entity_status::Column::AffectedQuantity)
                                .sub(quantity_to_remove),
                        )
                        .col_expr(entity_status::Column::AppliedBy, Expr::value(actor))
                        .col_expr(entity_status::Column::AppliedAt, Expr::value(Utc::now()))
                        .filter(entity_status::Column::Id.eq(current.id))
                        .filter(entity_status::Column::AffectedQuantity.gt(quantity_to_remove))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    if updated.rows_affected == 0 {
                        entity_status::Entity::delete_by_id(current.id)
                            .exec(txn)
                            .await
                            .map_err(ServiceError::db_error)?;

                        record_transition(
                            txn, entity_type, &entity_id, Some(status_id), None, None, reason,
                            actor,
                        )
                        .await?;

                        return Ok((0, status_id));
                    }

                    let remaining = entity_status::Entity::find_by_id(current.id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .and_then(|s| s.affected_quantity)
                        .unwrap_or(0);

                    // Same from/to id marks this as a partial removal.
                    record_transition(
                        txn,
                        entity_type,
                        &entity_id,
                        Some(status_id),
                        Some(status_id),
                        Some(remaining),
                        reason,
                        actor,
                    )
                    .await?;

                    Ok((remaining, status_id))
                })
            })
            .await
            .map_err(flatten_txn_err)?;

        if remaining <= 0 {
            self.event_sender
                .emit(Event::StatusRemoved {
                    entity_type: entity_type.as_str().to_string(),
                    entity_id: log_entity_id,
                    from_status_id: Some(status_id),
                })
                .await;
        } else {
            self.event_sender
                .emit(Event::StatusApplied {
                    entity_type: entity_type.as_str().to_string(),
                    entity_id: log_entity_id,
                    status_id,
                    affected_quantity: Some(remaining),
                })
                .await;
        }

        Ok(remaining)
    }

    /// Full transition history of an entity, oldest first.
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<status_change_log::Model>, ServiceError> {
        status_change_log::Entity::find()
            .filter(status_change_log::Column::EntityType.eq(entity_type.as_str()))
            .filter(status_change_log::Column::EntityId.eq(entity_id))
            .order_by_asc(status_change_log::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}

#[allow(clippy::too_many_arguments)]
async fn record_transition(
    txn: &DatabaseTransaction,
    entity_type: EntityType,
    entity_id: &str,
    from_status_id: Option<Uuid>,
    to_status_id: Option<Uuid>,
    affected_quantity: Option<i32>,
    reason: Option<String>,
    actor: Uuid,
) -> Result<(), ServiceError> {
    let log = status_change_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        entity_type: Set(entity_type.as_str().to_string()),
        entity_id: Set(entity_id.to_string()),
        from_status_id: Set(from_status_id),
        to_status_id: Set(to_status_id),
        affected_quantity: Set(affected_quantity),
        reason: Set(reason),
        changed_by: Set(actor),
        ..Default::default()
    };
    log.insert(txn).await.map_err(ServiceError::db_error)?;
    Ok(())
}

pub(crate) fn flatten_txn_err(err: TransactionError<ServiceError>) -> ServiceError {
    match err {
        TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_with_affected(affected: Option<i32>) -> entity_status::Model {
        entity_status::Model {
            id: Uuid::new_v4(),
            entity_type: "STOCK".to_string(),
            entity_id: Uuid::new_v4().to_string(),
            status_id: Uuid::new_v4(),
            affected_quantity: affected,
            total_quantity_at_application: Some(10),
            reason: None,
            applied_by: Uuid::nil(),
            applied_at: Utc::now(),
        }
    }

    #[test]
    fn restricted_effects_classify_as_restricted() {
        assert_eq!(classify(Effect::Closed), StatusClass::Restricted);
        assert_eq!(
            classify(Effect::TransactionsProhibited),
            StatusClass::Restricted
        );
    }

    #[test]
    fn directional_effects_classify_as_warning() {
        assert_eq!(classify(Effect::InboundOnly), StatusClass::Warning);
        assert_eq!(classify(Effect::OutboundOnly), StatusClass::Warning);
        assert_eq!(classify(Effect::AuditOnly), StatusClass::Warning);
    }

    #[test]
    fn unrestricted_effects_classify_as_normal() {
        assert_eq!(classify(Effect::TransactionsAllowed), StatusClass::Normal);
        assert_eq!(classify(Effect::Custom), StatusClass::Normal);
    }

    #[test]
    fn outbound_only_blocks_transfers_but_not_outbound() {
        let caps = capabilities(Effect::OutboundOnly);
        assert!(caps.allows(OperationKind::Outbound));
        assert!(!caps.allows(OperationKind::Transfer));
        assert!(!caps.allows(OperationKind::Inbound));
    }

    #[test]
    fn breakdown_without_status_is_all_normal() {
        let b = quantity_breakdown(10, None);
        assert_eq!(b, QuantityBreakdown { total: 10, normal: 10, affected: 0 });
    }

    #[test]
    fn breakdown_with_partial_status() {
        let status = status_with_affected(Some(4));
        let b = quantity_breakdown(10, Some(&status));
        assert_eq!(b, QuantityBreakdown { total: 10, normal: 6, affected: 4 });
    }

    #[test]
    fn breakdown_with_unbounded_status_covers_everything() {
        let status = status_with_affected(None);
        let b = quantity_breakdown(7, Some(&status));
        assert_eq!(b, QuantityBreakdown { total: 7, normal: 0, affected: 7 });
    }

    #[test]
    fn breakdown_never_goes_negative() {
        // Affected can exceed total after stock was drawn down.
        let status = status_with_affected(Some(12));
        let b = quantity_breakdown(10, Some(&status));
        assert_eq!(b.normal, 0);
        assert_eq!(b.affected, 12);
    }
}
