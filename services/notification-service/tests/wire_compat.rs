//! The notification envelope is produced by the booking worker and consumed
//! here; both sides must agree on the JSON shape byte for byte.

use chrono::{TimeZone, Utc};

use booking_service::models as producer;
use notification_service::models as consumer;

fn producer_envelope() -> producer::NotificationRequest {
    producer::NotificationRequest {
        notification_type: producer::NOTIFICATION_BOOKING_CONFIRMED.to_string(),
        recipient_email: "jo@example.com".to_string(),
        booking_data: producer::NotificationBookingData {
            booking_id: "b1".to_string(),
            event_name: "Concert 2024".to_string(),
            venue: "Arena".to_string(),
            event_date: Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap(),
            seats: vec!["A1".to_string(), "A2".to_string()],
            total_amount: 199.98,
            user_name: "Jo".to_string(),
        },
        timestamp: Utc.with_ymd_and_hms(2024, 5, 20, 10, 0, 0).unwrap(),
    }
}

#[test]
fn producer_envelope_decodes_on_the_consumer_side() {
    let raw = serde_json::to_string(&producer_envelope()).unwrap();

    let decoded: consumer::NotificationRequest = serde_json::from_str(&raw).unwrap();
    assert_eq!(decoded.notification_type, consumer::NOTIFICATION_BOOKING_CONFIRMED);
    assert_eq!(decoded.recipient_email, "jo@example.com");
    assert_eq!(decoded.booking_data.booking_id, "b1");
    assert_eq!(decoded.booking_data.seats, vec!["A1", "A2"]);
    assert_eq!(decoded.booking_data.total_amount, 199.98);
    assert_eq!(
        decoded.booking_data.event_date,
        Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap()
    );
}

#[test]
fn failed_envelope_renders_the_failure_template() {
    let mut envelope = producer_envelope();
    envelope.notification_type = producer::NOTIFICATION_BOOKING_FAILED.to_string();
    let raw = serde_json::to_string(&envelope).unwrap();

    let decoded: consumer::NotificationRequest = serde_json::from_str(&raw).unwrap();
    let email = decoded.to_email().expect("known type renders an email");
    assert_eq!(email.to, "jo@example.com");
    assert_eq!(email.subject, "Booking Failed - Concert 2024");
}

#[test]
fn unknown_type_from_a_newer_producer_is_dropped() {
    let mut envelope = producer_envelope();
    envelope.notification_type = "booking_waitlisted".to_string();
    let raw = serde_json::to_string(&envelope).unwrap();

    let decoded: consumer::NotificationRequest = serde_json::from_str(&raw).unwrap();
    assert!(decoded.to_email().is_none());
}
