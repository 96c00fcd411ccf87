use log::warn;
use redis_client::RedisManager;

use crate::models::{EventFilter, EventRow};

const EVENT_LIST_INDEX: &str = "events:list:keys";

fn event_key(event_id: &str) -> String {
    format!("event:{}", event_id)
}

fn seats_available_key(event_id: &str) -> String {
    format!("seats:available:{}", event_id)
}

fn seats_count_key(event_id: &str) -> String {
    format!("seats:count:{}", event_id)
}

pub fn filter_key(filter: &EventFilter) -> String {
    format!(
        "events:list:city:{}:cat:{}:name:{}:from:{}:to:{}:limit:{}:offset:{}",
        filter.city.as_deref().unwrap_or(""),
        filter.category.as_deref().unwrap_or(""),
        filter.name.as_deref().unwrap_or(""),
        filter
            .date_from
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        filter
            .date_to
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        filter.limit,
        filter.offset,
    )
}

pub async fn get_event(event_id: &str) -> Option<EventRow> {
    let manager = RedisManager::global()?;
    match manager.get(&event_key(event_id)).await {
        Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
        Ok(None) => None,
        Err(e) => {
            warn!("Redis read error for event {}: {:?}", event_id, e);
            None
        }
    }
}

pub async fn set_event(event: &EventRow, ttl_seconds: i64) {
    let Some(manager) = RedisManager::global() else {
        return;
    };
    if let Ok(raw) = serde_json::to_string(event) {
        if let Err(e) = manager.set_with_ttl(&event_key(&event.id), &raw, ttl_seconds).await {
            warn!("Failed to cache event {}: {:?}", event.id, e);
        }
    }
}

pub async fn get_seat_numbers(event_id: &str) -> Option<Vec<String>> {
    let manager = RedisManager::global()?;
    match manager.get(&seats_available_key(event_id)).await {
        Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
        Ok(None) => None,
        Err(e) => {
            warn!("Redis read error for seat set {}: {:?}", event_id, e);
            None
        }
    }
}

pub async fn set_seat_numbers(event_id: &str, seats: &[String], ttl_seconds: i64) {
    let Some(manager) = RedisManager::global() else {
        return;
    };
    if let Ok(raw) = serde_json::to_string(seats) {
        if let Err(e) = manager
            .set_with_ttl(&seats_available_key(event_id), &raw, ttl_seconds)
            .await
        {
            warn!("Failed to cache seat set for {}: {:?}", event_id, e);
        }
    }
}

pub async fn get_seat_count(event_id: &str) -> Option<i64> {
    let manager = RedisManager::global()?;
    match manager.get(&seats_count_key(event_id)).await {
        Ok(Some(raw)) => raw.parse().ok(),
        Ok(None) => None,
        Err(e) => {
            warn!("Redis read error for seat count {}: {:?}", event_id, e);
            None
        }
    }
}

pub async fn set_seat_count(event_id: &str, count: i64, ttl_seconds: i64) {
    let Some(manager) = RedisManager::global() else {
        return;
    };
    if let Err(e) = manager
        .set_with_ttl(&seats_count_key(event_id), &count.to_string(), ttl_seconds)
        .await
    {
        warn!("Failed to cache seat count for {}: {:?}", event_id, e);
    }
}

pub async fn get_event_list(key: &str) -> Option<serde_json::Value> {
    let manager = RedisManager::global()?;
    match manager.get(key).await {
        Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
        Ok(None) => None,
        Err(e) => {
            warn!("Redis read error for {}: {:?}", key, e);
            None
        }
    }
}

pub async fn set_event_list(key: &str, payload: &str, ttl_seconds: i64) {
    let Some(manager) = RedisManager::global() else {
        return;
    };
    if let Err(e) = manager.set_with_ttl(key, payload, ttl_seconds).await {
        warn!("Failed to cache event list {}: {:?}", key, e);
        return;
    }
    if let Err(e) = manager.add_to_index(EVENT_LIST_INDEX, key).await {
        warn!("Failed to index event list key {}: {:?}", key, e);
    }
}

/// Drops every cached event-list page. Called on event creation.
pub async fn invalidate_event_lists() {
    let Some(manager) = RedisManager::global() else {
        return;
    };
    if let Err(e) = manager.drop_indexed_keys(EVENT_LIST_INDEX).await {
        warn!("Failed to invalidate event list caches: {:?}", e);
    }
}

/// Drops the three per-event keys. Called before returning from every hold
/// mutation so readers never see a stale view outlive the store write.
pub async fn invalidate_seat_views(event_id: &str) {
    let Some(manager) = RedisManager::global() else {
        return;
    };
    let keys = vec![
        seats_available_key(event_id),
        seats_count_key(event_id),
        event_key(event_id),
    ];
    if let Err(e) = manager.delete_many(&keys).await {
        warn!("Failed to invalidate seat caches for {}: {:?}", event_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn filter_key_is_stable_and_distinct() {
        let mut filter = EventFilter {
            limit: 20,
            offset: 0,
            ..Default::default()
        };
        let bare = filter_key(&filter);
        assert_eq!(bare, "events:list:city::cat::name::from::to::limit:20:offset:0");

        filter.city = Some("Berlin".into());
        filter.date_from = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let filtered = filter_key(&filter);
        assert_ne!(bare, filtered);
        assert!(filtered.contains("city:Berlin"));
        assert!(filtered.contains("from:2024-06-01"));
    }
}
