pub mod ledger;
pub mod status;
pub mod transfer;

use crate::{db::DbPool, events::EventSender};
use std::sync::Arc;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub ledger: Arc<ledger::StockLedgerService>,
    pub status: Arc<status::StatusService>,
    pub transfer: Arc<transfer::TransferService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            ledger: Arc::new(ledger::StockLedgerService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            status: Arc::new(status::StatusService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            transfer: Arc::new(transfer::TransferService::new(db_pool, event_sender)),
        }
    }
}
