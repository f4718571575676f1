use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Restriction category of a status definition. The effect alone determines
/// which operation kinds a covered entity still permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    TransactionsAllowed,
    TransactionsProhibited,
    Closed,
    InboundOnly,
    OutboundOnly,
    AuditOnly,
    Custom,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::TransactionsAllowed => "TRANSACTIONS_ALLOWED",
            Effect::TransactionsProhibited => "TRANSACTIONS_PROHIBITED",
            Effect::Closed => "CLOSED",
            Effect::InboundOnly => "INBOUND_ONLY",
            Effect::OutboundOnly => "OUTBOUND_ONLY",
            Effect::AuditOnly => "AUDIT_ONLY",
            Effect::Custom => "CUSTOM",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "TRANSACTIONS_ALLOWED" => Some(Effect::TransactionsAllowed),
            "TRANSACTIONS_PROHIBITED" => Some(Effect::TransactionsProhibited),
            "CLOSED" => Some(Effect::Closed),
            "INBOUND_ONLY" => Some(Effect::InboundOnly),
            "OUTBOUND_ONLY" => Some(Effect::OutboundOnly),
            "AUDIT_ONLY" => Some(Effect::AuditOnly),
            "CUSTOM" => Some(Effect::Custom),
            _ => None,
        }
    }
}

/// Which kind of entity a definition can be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    Product,
    Location,
}

impl StatusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusType::Product => "PRODUCT",
            StatusType::Location => "LOCATION",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PRODUCT" => Some(StatusType::Product),
            "LOCATION" => Some(StatusType::Location),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = StatusDefinition)]
#[sea_orm(table_name = "status_definitions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub effect: String,
    pub status_type: String,
    pub color: String,
    pub text_color: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn effect(&self) -> Option<Effect> {
        Effect::from_str(&self.effect)
    }

    pub fn status_type(&self) -> Option<StatusType> {
        StatusType::from_str(&self.status_type)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        if let ActiveValue::NotSet = active_model.updated_at {
            active_model.updated_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
