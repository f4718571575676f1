pub mod statuses;
pub mod stock;
pub mod transfers;

use axum::http::HeaderMap;
use uuid::Uuid;

pub use crate::AppState;

/// Actor stamp for audit fields. Authentication itself is handled upstream;
/// this only reads the identity the gateway forwards.
pub fn actor_from_headers(headers: &HeaderMap) -> Uuid {
    headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or(Uuid::nil())
}
