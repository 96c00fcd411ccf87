use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const BOOKING_PROCESSING: &str = "processing";
pub const BOOKING_CONFIRMED: &str = "confirmed";
pub const BOOKING_FAILED: &str = "failed";

pub const PAYMENT_PENDING: &str = "pending";
pub const PAYMENT_IN_PROGRESS: &str = "payment";
pub const PAYMENT_COMPLETED: &str = "completed";
pub const PAYMENT_FAILED: &str = "failed";
pub const PAYMENT_REFUND_PENDING: &str = "refund_pending";

pub const NOTIFICATION_BOOKING_CONFIRMED: &str = "booking_confirmed";
pub const NOTIFICATION_BOOKING_FAILED: &str = "booking_failed";

/// Bookings only ever move `processing -> confirmed | failed`; a terminal
/// status is never rewritten.
pub fn is_terminal_status(status: &str) -> bool {
    status == BOOKING_CONFIRMED || status == BOOKING_FAILED
}

// ===== database row =====

#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub event_id: String,
    pub event_name: String,
    pub venue: String,
    pub event_date: DateTime<Utc>,
    pub seats: Vec<String>,
    pub total_amount: f64,
    pub status: String,
    pub payment_status: String,
    pub hold_id: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

// ===== repository inputs =====

#[derive(Debug, Clone)]
pub struct CreateBookingRecord {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub event_id: String,
    pub event_name: String,
    pub venue: String,
    pub event_date: DateTime<Utc>,
    pub seats: Vec<String>,
    pub total_amount: f64,
    pub hold_id: String,
}

#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub booking_id: String,
    pub status: String,
    pub payment_status: String,
    pub error_message: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

// ===== API inputs =====

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PaymentInfo {
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    #[validate(range(min = 0.01, message = "Amount must be greater than 0"))]
    pub amount: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitBookingInput {
    #[validate(length(min = 1, message = "Hold ID is required"))]
    pub hold_id: String,
    #[validate(nested)]
    pub payment_info: PaymentInfo,
}

// ===== API responses =====

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking_id: String,
    pub status: String,
    pub message: String,
    pub estimated_time: String,
    pub status_url: String,
    pub stream_url: String,
}

#[derive(Debug, Serialize)]
pub struct BookingEventDetails {
    pub event_id: String,
    pub name: String,
    pub venue: String,
    pub event_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BookingStatusResponse {
    pub booking_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<BookingEventDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seats: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    pub payment_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct UserBookingSummary {
    pub booking_id: String,
    pub status: String,
    pub event_name: String,
    pub venue: String,
    pub event_date: DateTime<Utc>,
    pub seats: Vec<String>,
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserBookingsResponse {
    pub bookings: Vec<UserBookingSummary>,
    pub total: i64,
}

impl BookingRow {
    pub fn to_status_response(&self) -> BookingStatusResponse {
        let mut response = BookingStatusResponse {
            booking_id: self.id.clone(),
            status: self.status.clone(),
            event: None,
            seats: None,
            total_amount: None,
            payment_status: self.payment_status.clone(),
            error_message: self.error_message.clone(),
            created_at: self.created_at,
            confirmed_at: self.confirmed_at,
            failed_at: self.failed_at,
        };

        if self.status == BOOKING_CONFIRMED || self.status == BOOKING_PROCESSING {
            response.event = Some(BookingEventDetails {
                event_id: self.event_id.clone(),
                name: self.event_name.clone(),
                venue: self.venue.clone(),
                event_date: self.event_date,
            });
            response.seats = Some(self.seats.clone());
            response.total_amount = Some(self.total_amount);
        }

        response
    }

    pub fn to_summary(&self) -> UserBookingSummary {
        UserBookingSummary {
            booking_id: self.id.clone(),
            status: self.status.clone(),
            event_name: self.event_name.clone(),
            venue: self.venue.clone(),
            event_date: self.event_date,
            seats: self.seats.clone(),
            total_amount: self.total_amount,
            created_at: self.created_at,
        }
    }
}

// ===== cache snapshot =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingStatusUpdate {
    pub booking_id: String,
    pub status: String,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

// ===== Kafka envelopes =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub booking_id: String,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub hold_id: String,
    pub event_id: String,
    pub event_name: String,
    pub venue: String,
    pub event_date: DateTime<Utc>,
    pub seats: Vec<String>,
    pub payment_info: PaymentInfo,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationBookingData {
    pub booking_id: String,
    pub event_name: String,
    pub venue: String,
    pub event_date: DateTime<Utc>,
    pub seats: Vec<String>,
    pub total_amount: f64,
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    #[serde(rename = "type")]
    pub notification_type: String,
    pub recipient_email: String,
    pub booking_data: NotificationBookingData,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(status: &str) -> BookingRow {
        let now = Utc::now();
        BookingRow {
            id: "b1".into(),
            user_id: "u1".into(),
            user_email: "jo@example.com".into(),
            user_name: "Jo".into(),
            event_id: "e1".into(),
            event_name: "Concert 2024".into(),
            venue: "Arena".into(),
            event_date: now,
            seats: vec!["A1".into(), "A2".into()],
            total_amount: 199.98,
            status: status.into(),
            payment_status: PAYMENT_PENDING.into(),
            hold_id: "h1".into(),
            error_message: None,
            created_at: now,
            confirmed_at: None,
            failed_at: None,
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(is_terminal_status(BOOKING_CONFIRMED));
        assert!(is_terminal_status(BOOKING_FAILED));
        assert!(!is_terminal_status(BOOKING_PROCESSING));
        assert!(!is_terminal_status(""));
    }

    #[test]
    fn status_response_hides_event_for_failed_bookings() {
        let confirmed = sample_row(BOOKING_CONFIRMED).to_status_response();
        assert!(confirmed.event.is_some());
        assert_eq!(confirmed.seats.as_deref(), Some(&["A1".to_string(), "A2".to_string()][..]));

        let failed = sample_row(BOOKING_FAILED).to_status_response();
        assert!(failed.event.is_none());
        assert!(failed.seats.is_none());
        assert!(failed.total_amount.is_none());
    }

    #[test]
    fn booking_request_wire_shape() {
        let request = BookingRequest {
            booking_id: "b1".into(),
            user_id: "u1".into(),
            user_email: "jo@example.com".into(),
            user_name: "Jo".into(),
            hold_id: "h1".into(),
            event_id: "e1".into(),
            event_name: "Concert 2024".into(),
            venue: "Arena".into(),
            event_date: Utc::now(),
            seats: vec!["A1".into()],
            payment_info: PaymentInfo {
                payment_method: "credit_card".into(),
                amount: 99.99,
            },
            timestamp: Utc::now(),
        };

        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        for field in [
            "booking_id",
            "user_id",
            "user_email",
            "user_name",
            "hold_id",
            "event_id",
            "event_name",
            "venue",
            "event_date",
            "seats",
            "payment_info",
            "timestamp",
        ] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(value["payment_info"]["payment_method"], "credit_card");
    }

    #[test]
    fn notification_request_uses_type_tag() {
        let notification = NotificationRequest {
            notification_type: NOTIFICATION_BOOKING_CONFIRMED.into(),
            recipient_email: "jo@example.com".into(),
            booking_data: NotificationBookingData {
                booking_id: "b1".into(),
                event_name: "Concert 2024".into(),
                venue: "Arena".into(),
                event_date: Utc::now(),
                seats: vec!["A1".into()],
                total_amount: 99.99,
                user_name: "Jo".into(),
            },
            timestamp: Utc::now(),
        };

        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&notification).unwrap()).unwrap();
        assert_eq!(value["type"], "booking_confirmed");
        assert_eq!(value["booking_data"]["total_amount"], 99.99);

        let back: NotificationRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back.notification_type, NOTIFICATION_BOOKING_CONFIRMED);
    }

    #[test]
    fn submit_input_validation() {
        let valid = SubmitBookingInput {
            hold_id: "h1".into(),
            payment_info: PaymentInfo {
                payment_method: "credit_card".into(),
                amount: 199.98,
            },
        };
        assert!(valid.validate().is_ok());

        let bad_amount = SubmitBookingInput {
            hold_id: "h1".into(),
            payment_info: PaymentInfo {
                payment_method: "credit_card".into(),
                amount: 0.0,
            },
        };
        assert!(bad_amount.validate().is_err());
    }
}
