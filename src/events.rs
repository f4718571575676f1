use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after committed mutations. Consumers (reporting,
/// notifications) subscribe via the processing loop; emission failures are
/// logged and never fail the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StockReceived {
        stock_record_id: Uuid,
        product_id: Uuid,
        location_id: Uuid,
        quantity: i32,
    },
    StockTransferred {
        stock_record_id: Uuid,
        product_id: Uuid,
        from_location_id: Uuid,
        to_location_id: Uuid,
        quantity: i32,
    },
    StockIssued {
        stock_record_id: Uuid,
        product_id: Uuid,
        from_location_id: Uuid,
        quantity: i32,
    },
    StatusApplied {
        entity_type: String,
        entity_id: String,
        status_id: Uuid,
        affected_quantity: Option<i32>,
    },
    StatusRemoved {
        entity_type: String,
        entity_id: String,
        from_status_id: Option<Uuid>,
    },
    BatchCompleted {
        succeeded: usize,
        failed: usize,
        completed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Emits an event without surfacing failures to the caller.
    pub async fn emit(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("dropping event: {}", e);
        }
    }
}

/// Event processing loop, spawned once at startup.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockTransferred {
                product_id,
                from_location_id,
                to_location_id,
                quantity,
                ..
            } => {
                info!(
                    %product_id, %from_location_id, %to_location_id, quantity,
                    "stock transferred"
                );
            }
            Event::StockIssued {
                product_id,
                from_location_id,
                quantity,
                ..
            } => {
                info!(%product_id, %from_location_id, quantity, "stock issued");
            }
            Event::StockReceived {
                product_id,
                location_id,
                quantity,
                ..
            } => {
                info!(%product_id, %location_id, quantity, "stock received");
            }
            Event::StatusApplied {
                entity_type,
                entity_id,
                status_id,
                affected_quantity,
            } => {
                info!(
                    entity_type, entity_id, %status_id, ?affected_quantity,
                    "status applied"
                );
            }
            Event::StatusRemoved {
                entity_type,
                entity_id,
                ..
            } => {
                info!(entity_type, entity_id, "status removed");
            }
            Event::BatchCompleted {
                succeeded, failed, ..
            } => {
                info!(succeeded, failed, "batch completed");
            }
        }
    }

    info!("Event processing loop stopped");
}
