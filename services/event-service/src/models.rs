use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const SEAT_AVAILABLE: &str = "available";
pub const SEAT_HELD: &str = "held";
pub const SEAT_BOOKED: &str = "booked";

pub const HOLD_ACTIVE: &str = "active";
pub const HOLD_CONFIRMED: &str = "confirmed";
pub const HOLD_EXPIRED: &str = "expired";

// ===== database rows =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub venue: String,
    pub city: String,
    pub category: String,
    pub event_date: DateTime<Utc>,
    pub total_seats: i32,
    pub price_per_seat: f64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct HoldRow {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub seat_numbers: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HoldRow {
    /// An `active` hold past its expiry is logically expired even before the
    /// row is rewritten by the reaper.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == HOLD_ACTIVE && self.expires_at > now
    }
}

// ===== repository inputs =====

#[derive(Debug, Clone)]
pub struct CreateEventRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub venue: String,
    pub city: String,
    pub category: String,
    pub event_date: DateTime<Utc>,
    pub total_seats: i32,
    pub price_per_seat: f64,
    pub created_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub city: Option<String>,
    pub category: Option<String>,
    pub name: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

// ===== API inputs =====

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "Venue is required"))]
    pub venue: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    pub event_date: DateTime<Utc>,
    #[validate(range(min = 1, max = 10000, message = "Total seats must be between 1 and 10000"))]
    pub total_seats: i32,
    #[validate(range(min = 0.01, message = "Price per seat must be greater than 0"))]
    pub price_per_seat: f64,
}

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub city: Option<String>,
    pub category: Option<String>,
    pub name: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct HoldSeatsInput {
    #[validate(length(min = 1, message = "At least one seat number is required"))]
    pub seat_numbers: Vec<String>,
}

// ===== API responses =====

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub venue: String,
    pub city: String,
    pub category: String,
    pub event_date: DateTime<Utc>,
    pub total_seats: i32,
    pub available_seats: i64,
    pub price_per_seat: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_seat_numbers: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl EventRow {
    pub fn to_response(&self, available_seats: i64) -> EventResponse {
        EventResponse {
            event_id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            venue: self.venue.clone(),
            city: self.city.clone(),
            category: self.category.clone(),
            event_date: self.event_date,
            total_seats: self.total_seats,
            available_seats,
            price_per_seat: self.price_per_seat,
            available_seat_numbers: None,
            created_at: self.created_at,
            created_by: self.created_by.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: i64, limit: i64, offset: i64) -> Self {
        Pagination {
            total,
            limit,
            offset,
            has_more: offset + limit < total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub events: Vec<EventResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct HoldResponse {
    pub hold_id: String,
    pub event_id: String,
    pub held_seats: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub total_price: f64,
}

#[derive(Debug, Serialize)]
pub struct HoldDetailsResponse {
    pub hold_id: String,
    pub user_id: String,
    pub user_name: String,
    pub event_id: String,
    pub event_name: String,
    pub venue: String,
    pub event_date: DateTime<Utc>,
    pub seats: Vec<String>,
    pub total_price: f64,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn pagination_has_more() {
        assert!(Pagination::new(100, 20, 0).has_more);
        assert!(Pagination::new(100, 20, 60).has_more);
        assert!(!Pagination::new(100, 20, 80).has_more);
        assert!(!Pagination::new(5, 20, 0).has_more);
    }

    #[test]
    fn expired_active_hold_is_not_usable() {
        let now = Utc::now();
        let mut hold = HoldRow {
            id: "h1".into(),
            user_id: "u1".into(),
            event_id: "e1".into(),
            seat_numbers: vec!["A1".into()],
            expires_at: now + Duration::minutes(15),
            status: HOLD_ACTIVE.into(),
            created_at: now,
            updated_at: now,
        };
        assert!(hold.is_usable_at(now));

        hold.expires_at = now - Duration::seconds(1);
        assert!(!hold.is_usable_at(now));

        hold.expires_at = now + Duration::minutes(15);
        hold.status = HOLD_EXPIRED.into();
        assert!(!hold.is_usable_at(now));
    }

    #[test]
    fn create_event_input_bounds() {
        let mut input = CreateEventInput {
            name: "Concert 2024".into(),
            description: String::new(),
            venue: "Arena".into(),
            city: "Berlin".into(),
            category: "music".into(),
            event_date: Utc::now(),
            total_seats: 1000,
            price_per_seat: 99.99,
        };
        assert!(input.validate().is_ok());

        input.total_seats = 0;
        assert!(input.validate().is_err());

        input.total_seats = 10_001;
        assert!(input.validate().is_err());

        input.total_seats = 10;
        input.price_per_seat = 0.0;
        assert!(input.validate().is_err());
    }
}
