use log::{error, info};
use std::time::Duration;

use crate::cache;
use crate::repository::EventRepository;

/// Periodic sweep restoring `held seat => active hold`. Availability queries
/// already treat expired holds as free, so the reaper only rewrites rows.
pub async fn run(repo: EventRepository, interval_seconds: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));
    loop {
        ticker.tick().await;

        let expired = match repo.expired_active_holds().await {
            Ok(holds) => holds,
            Err(e) => {
                error!("Failed to query expired holds: {}", e);
                continue;
            }
        };

        for hold in expired {
            match repo.release_hold(&hold.id).await {
                Ok(_) => {
                    cache::invalidate_seat_views(&hold.event_id).await;
                    info!("Reaped expired hold {} on event {}", hold.id, hold.event_id);
                }
                Err(e) => error!("Failed to reap hold {}: {}", hold.id, e),
            }
        }
    }
}
