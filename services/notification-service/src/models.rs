use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NOTIFICATION_BOOKING_CONFIRMED: &str = "booking_confirmed";
pub const NOTIFICATION_BOOKING_FAILED: &str = "booking_failed";

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

#[derive(Debug, Clone, PartialEq)]
pub struct EmailTemplate {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl NotificationRequest {
    /// Renders the envelope for this notification, or `None` for an unknown
    /// type. New notification kinds require an explicit arm here.
    pub fn to_email(&self) -> Option<EmailTemplate> {
        match self.notification_type.as_str() {
            NOTIFICATION_BOOKING_CONFIRMED => Some(self.booking_confirmation_email()),
            NOTIFICATION_BOOKING_FAILED => Some(self.booking_failed_email()),
            _ => None,
        }
    }

    fn booking_confirmation_email(&self) -> EmailTemplate {
        let data = &self.booking_data;
        let subject = format!("Booking Confirmed - {}", data.event_name);

        let body = format!(
            "Dear {},\n\n\
             Your booking has been confirmed!\n\n\
             Event: {}\n\
             Venue: {}\n\
             Date: {}\n\
             Seats: {}\n\
             Amount: ${:.2}\n\
             Booking ID: {}\n\n\
             Thank you for your booking!\n\n\
             Event Booking System",
            data.user_name,
            data.event_name,
            data.venue,
            data.event_date.format("%Y-%m-%d %H:%M"),
            data.seats.join(", "),
            data.total_amount,
            data.booking_id,
        );

        EmailTemplate {
            to: self.recipient_email.clone(),
            subject,
            body,
        }
    }

    fn booking_failed_email(&self) -> EmailTemplate {
        let data = &self.booking_data;
        let subject = format!("Booking Failed - {}", data.event_name);

        let body = format!(
            "Dear {},\n\n\
             We're sorry, but your booking could not be completed.\n\n\
             Event: {}\n\
             Booking ID: {}\n\n\
             Any charges will be refunded within 3-5 business days.\n\
             Please try booking again or contact support.\n\n\
             Event Booking System",
            data.user_name, data.event_name, data.booking_id,
        );

        EmailTemplate {
            to: self.recipient_email.clone(),
            subject,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(notification_type: &str) -> NotificationRequest {
        NotificationRequest {
            notification_type: notification_type.to_string(),
            recipient_email: "jo@example.com".into(),
            booking_data: NotificationBookingData {
                booking_id: "b1".into(),
                event_name: "Concert 2024".into(),
                venue: "Arena".into(),
                event_date: Utc::now(),
                seats: vec!["A1".into(), "A2".into()],
                total_amount: 199.98,
                user_name: "Jo".into(),
            },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn confirmation_email_contents() {
        let email = request(NOTIFICATION_BOOKING_CONFIRMED).to_email().unwrap();
        assert_eq!(email.to, "jo@example.com");
        assert_eq!(email.subject, "Booking Confirmed - Concert 2024");
        assert!(email.body.contains("Dear Jo,"));
        assert!(email.body.contains("Venue: Arena"));
        assert!(email.body.contains("Seats: A1, A2"));
        assert!(email.body.contains("Amount: $199.98"));
        assert!(email.body.contains("Booking ID: b1"));
    }

    #[test]
    fn failure_email_contents() {
        let email = request(NOTIFICATION_BOOKING_FAILED).to_email().unwrap();
        assert_eq!(email.subject, "Booking Failed - Concert 2024");
        assert!(email.body.contains("could not be completed"));
        assert!(email.body.contains("refunded within 3-5 business days"));
    }

    #[test]
    fn unknown_type_renders_nothing() {
        assert!(request("booking_rescheduled").to_email().is_none());
    }

    #[test]
    fn envelope_decodes_from_wire_json() {
        let raw = r#"{
            "type": "booking_confirmed",
            "recipient_email": "jo@example.com",
            "booking_data": {
                "booking_id": "b1",
                "event_name": "Concert 2024",
                "venue": "Arena",
                "event_date": "2024-06-01T20:00:00Z",
                "seats": ["A1"],
                "total_amount": 99.99,
                "user_name": "Jo"
            },
            "timestamp": "2024-05-20T10:00:00Z"
        }"#;
        let request: NotificationRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.notification_type, NOTIFICATION_BOOKING_CONFIRMED);
        assert_eq!(request.booking_data.seats, vec!["A1"]);
    }
}
