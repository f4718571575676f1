pub mod entity_status;
pub mod location;
pub mod status_change_log;
pub mod status_definition;
pub mod stock_record;
pub mod stock_transaction;

pub use entity_status::Entity as EntityStatus;
pub use location::Entity as Location;
pub use status_change_log::Entity as StatusChangeLog;
pub use status_definition::Entity as StatusDefinition;
pub use stock_record::Entity as StockRecord;
pub use stock_transaction::Entity as StockTransaction;
