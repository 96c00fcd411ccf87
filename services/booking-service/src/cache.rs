use log::warn;
use redis_client::RedisManager;

use crate::models::BookingStatusUpdate;

const STATUS_TTL_SECONDS: i64 = 24 * 60 * 60;

fn status_key(booking_id: &str) -> String {
    format!("booking_status:{}", booking_id)
}

/// Write-behind snapshot for the streaming path. Advisory only: the booking
/// row stays authoritative and readers re-check the store.
pub async fn set_booking_status(update: &BookingStatusUpdate) {
    let Some(manager) = RedisManager::global() else {
        return;
    };
    let Ok(raw) = serde_json::to_string(update) else {
        return;
    };
    if let Err(e) = manager
        .set_with_ttl(&status_key(&update.booking_id), &raw, STATUS_TTL_SECONDS)
        .await
    {
        warn!(
            "Failed to cache status for booking {}: {:?}",
            update.booking_id, e
        );
    }
}
