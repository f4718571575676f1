use std::sync::Arc;

use axum::Router;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use wms_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::{
        location,
        status_definition::{self, Effect, StatusType},
        stock_record,
    },
    events::EventSender,
    services::ledger::ReceiveStockInput,
    AppState,
};

/// Test harness backed by an in-memory SQLite database run through the real
/// migrator. One connection only: a second connection would see a different
/// in-memory database.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    #[allow(dead_code)]
    event_task: tokio::task::JoinHandle<()>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("failed to open in-memory database");

        db::run_migrations(&pool).await.expect("migrations failed");

        let (tx, rx) = mpsc::channel(64);
        let event_sender = EventSender::new(tx);
        let event_task = tokio::spawn(wms_api::events::process_events(rx));

        let cfg = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            host: "127.0.0.1".to_string(),
            port: 18_080,
            environment: "test".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            auto_migrate: true,
            db_max_connections: 1,
            db_min_connections: 1,
        };

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = wms_api::app(state.clone());

        Self {
            state,
            router,
            event_task,
        }
    }

    pub async fn create_location(
        &self,
        warehouse_id: Uuid,
        code: &str,
        lot: Option<&str>,
    ) -> location::Model {
        let model = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(warehouse_id),
            code: Set(code.to_string()),
            lot: Set(lot.map(str::to_string)),
            is_active: Set(true),
            ..Default::default()
        };
        model
            .insert(&*self.state.db)
            .await
            .expect("failed to insert location")
    }

    pub async fn create_inactive_location(&self, warehouse_id: Uuid, code: &str) -> location::Model {
        let model = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(warehouse_id),
            code: Set(code.to_string()),
            lot: Set(None),
            is_active: Set(false),
            ..Default::default()
        };
        model
            .insert(&*self.state.db)
            .await
            .expect("failed to insert location")
    }

    /// Receives stock through the ledger service so a RECEIVE transaction
    /// row is written, like production inbound.
    pub async fn create_stock(
        &self,
        product_id: Uuid,
        location_id: Uuid,
        lot: Option<&str>,
        quantity: i32,
    ) -> stock_record::Model {
        self.state
            .services
            .ledger
            .receive(
                ReceiveStockInput {
                    product_id,
                    location_id,
                    lot: lot.map(str::to_string),
                    cart: None,
                    level: None,
                    quantity,
                    note: None,
                },
                Uuid::nil(),
            )
            .await
            .expect("failed to receive stock")
    }

    pub async fn create_definition(
        &self,
        name: &str,
        effect: Effect,
        status_type: StatusType,
    ) -> status_definition::Model {
        self.state
            .services
            .status
            .create_definition(wms_api::services::status::NewStatusDefinition {
                name: name.to_string(),
                effect,
                status_type,
                color: None,
                text_color: None,
                description: None,
            })
            .await
            .expect("failed to create status definition")
    }

    /// Direct insert of an inactive definition, bypassing the service.
    pub async fn create_inactive_definition(
        &self,
        name: &str,
        effect: Effect,
        status_type: StatusType,
    ) -> status_definition::Model {
        let model = status_definition::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            effect: Set(effect.as_str().to_string()),
            status_type: Set(status_type.as_str().to_string()),
            color: Set("#e0e0e0".to_string()),
            text_color: Set("#000000".to_string()),
            description: Set(None),
            is_active: Set(false),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        model
            .insert(&*self.state.db)
            .await
            .expect("failed to insert definition")
    }
}
