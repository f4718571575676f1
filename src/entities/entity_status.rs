use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of entity a status is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Stock,
    Location,
    Lot,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Stock => "STOCK",
            EntityType::Location => "LOCATION",
            EntityType::Lot => "LOT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "STOCK" => Some(EntityType::Stock),
            "LOCATION" => Some(EntityType::Location),
            "LOT" => Some(EntityType::Lot),
            _ => None,
        }
    }
}

/// The current status of one entity. At most one row per
/// `(entity_type, entity_id)` pair; applying a new status replaces the old
/// row (upsert), and history lives in `status_change_logs`.
///
/// `affected_quantity` is meaningful only for PRODUCT-scoped definitions: it
/// is the portion of the stock's quantity covered by the restriction. A
/// LOCATION-scoped status implicitly covers everything at the location/lot.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = EntityStatus)]
#[sea_orm(table_name = "entity_statuses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub status_id: Uuid,
    pub affected_quantity: Option<i32>,
    pub total_quantity_at_application: Option<i32>,
    pub reason: Option<String>,
    pub applied_by: Uuid,
    pub applied_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::status_definition::Entity",
        from = "Column::StatusId",
        to = "super::status_definition::Column::Id"
    )]
    StatusDefinition,
}

impl Related<super::status_definition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusDefinition.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.applied_at {
            active_model.applied_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
