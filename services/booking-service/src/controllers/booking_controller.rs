use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use kafka_broker::KafkaManager;
use log::{error, info, warn};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::cache;
use crate::config::Config;
use crate::event_client::{EventServiceClient, EventServiceError, ServiceContext};
use crate::middleware::auth::auth_user;
use crate::models::{
    is_terminal_status, BookingRequest, BookingResponse, BookingRow, BookingStatusUpdate,
    CreateBookingRecord, SubmitBookingInput, BOOKING_FAILED,
};
use crate::repository::{BookingRepository, RepositoryError};

fn status_url(booking_id: &str) -> String {
    format!("/api/booking/{}/status", booking_id)
}

fn stream_url(booking_id: &str) -> String {
    format!("/api/booking/{}/stream", booking_id)
}

fn already_exists_response(booking: &BookingRow) -> BookingResponse {
    BookingResponse {
        booking_id: booking.id.clone(),
        status: booking.status.clone(),
        message: "Booking already exists for this hold".to_string(),
        estimated_time: "Already processed".to_string(),
        status_url: status_url(&booking.id),
        stream_url: stream_url(&booking.id),
    }
}

/// One server-sent event frame.
fn sse_frame(event: &str, data: &serde_json::Value) -> String {
    format!("event: {}\ndata: {}\n\n", event, data)
}

fn status_event(booking: &BookingRow, message: String) -> serde_json::Value {
    json!(BookingStatusUpdate {
        booking_id: booking.id.clone(),
        status: booking.status.clone(),
        message,
        updated_at: Utc::now(),
    })
}

fn complete_event(booking: &BookingRow) -> serde_json::Value {
    let mut data = json!({
        "booking_id": booking.id,
        "final_status": booking.status,
    });
    if booking.status == BOOKING_FAILED {
        data["error_message"] = json!(booking.error_message);
    }
    data
}

#[post("/api/booking")]
pub async fn submit_booking(
    req: HttpRequest,
    repo: web::Data<BookingRepository>,
    config: web::Data<Config>,
    event_service: web::Data<EventServiceClient>,
    body: web::Json<SubmitBookingInput>,
) -> impl Responder {
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest().json(json!({
            "error": "validation_failed",
            "message": e.to_string()
        }));
    }

    let user = match auth_user(&req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    // Client-visible idempotency: one booking per hold.
    match repo.get_booking_by_hold(&body.hold_id).await {
        Ok(Some(existing)) => {
            return HttpResponse::Accepted().json(already_exists_response(&existing));
        }
        Ok(None) => {}
        Err(e) => {
            error!("Failed to look up booking by hold: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to create booking"
            }));
        }
    }

    let ctx = ServiceContext {
        user_id: user.user_id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
    };

    let hold = match event_service.get_hold_details(&body.hold_id, &ctx).await {
        Ok(hold) => hold,
        Err(e @ (EventServiceError::HoldNotFound | EventServiceError::HoldExpired)) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "invalid_hold",
                "message": format!("Failed to validate hold: {}", e)
            }));
        }
        Err(e) => {
            // the hold engine being unreachable says nothing about the hold
            error!("Failed to reach event service for hold {}: {}", body.hold_id, e);
            return HttpResponse::ServiceUnavailable().json(json!({
                "error": "service_unavailable",
                "message": "Failed to validate hold with the event service"
            }));
        }
    };

    let record = CreateBookingRecord {
        id: Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        user_email: user.email.clone(),
        user_name: hold.user_name.clone(),
        event_id: hold.event_id.clone(),
        event_name: hold.event_name.clone(),
        venue: hold.venue.clone(),
        event_date: hold.event_date,
        seats: hold.seats.clone(),
        total_amount: body.payment_info.amount,
        hold_id: body.hold_id.clone(),
    };

    let booking = match repo.create_booking(record).await {
        Ok(booking) => booking,
        Err(RepositoryError::DuplicateHold) => {
            // lost the race to a concurrent submit for the same hold
            match repo.get_booking_by_hold(&body.hold_id).await {
                Ok(Some(existing)) => {
                    return HttpResponse::Accepted().json(already_exists_response(&existing));
                }
                _ => {
                    return HttpResponse::InternalServerError().json(json!({
                        "error": "internal_error",
                        "message": "Failed to create booking"
                    }));
                }
            }
        }
        Err(e) => {
            error!("Failed to create booking: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to create booking"
            }));
        }
    };

    let envelope = BookingRequest {
        booking_id: booking.id.clone(),
        user_id: user.user_id.clone(),
        user_email: user.email.clone(),
        user_name: hold.user_name.clone(),
        hold_id: body.hold_id.clone(),
        event_id: hold.event_id,
        event_name: hold.event_name,
        venue: hold.venue,
        event_date: hold.event_date,
        seats: hold.seats,
        payment_info: body.payment_info.clone(),
        timestamp: Utc::now(),
    };

    let payload = match serde_json::to_string(&envelope) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to encode booking request: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to queue booking"
            }));
        }
    };

    let Some(kafka) = KafkaManager::global() else {
        error!("Kafka manager not initialized");
        return HttpResponse::InternalServerError().json(json!({
            "error": "internal_error",
            "message": "Failed to queue booking"
        }));
    };
    if let Err(e) = kafka
        .send_message(&config.booking_topic, &booking.id, &payload)
        .await
    {
        error!("Failed to publish booking request {}: {}", booking.id, e);
        return HttpResponse::InternalServerError().json(json!({
            "error": "internal_error",
            "message": "Failed to queue booking"
        }));
    }

    cache::set_booking_status(&BookingStatusUpdate {
        booking_id: booking.id.clone(),
        status: "PROCESSING".to_string(),
        message: "Booking submitted for processing".to_string(),
        updated_at: Utc::now(),
    })
    .await;

    info!("Accepted booking {} for hold {}", booking.id, booking.hold_id);

    HttpResponse::Accepted().json(BookingResponse {
        booking_id: booking.id.clone(),
        status: "PROCESSING".to_string(),
        message: "Booking is being processed".to_string(),
        estimated_time: "2-3 minutes".to_string(),
        status_url: status_url(&booking.id),
        stream_url: stream_url(&booking.id),
    })
}

#[get("/api/booking/{bookingId}/status")]
pub async fn get_booking_status(
    repo: web::Data<BookingRepository>,
    path: web::Path<String>,
) -> impl Responder {
    let booking_id = path.into_inner();

    match repo.get_booking(&booking_id).await {
        Ok(booking) => HttpResponse::Ok().json(booking.to_status_response()),
        Err(RepositoryError::NotFound) => HttpResponse::NotFound().json(json!({
            "error": "not_found",
            "message": "Booking not found"
        })),
        Err(e) => {
            error!("Failed to load booking {}: {}", booking_id, e);
            HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to retrieve booking"
            }))
        }
    }
}

struct StreamState {
    repo: BookingRepository,
    booking_id: String,
    poll_interval: Duration,
    last_status: Option<String>,
    done: bool,
}

#[get("/api/booking/{bookingId}/stream")]
pub async fn stream_booking_status(
    repo: web::Data<BookingRepository>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> impl Responder {
    let booking_id = path.into_inner();

    // confirm the booking exists before committing to a stream
    if let Err(e) = repo.get_booking(&booking_id).await {
        return match e {
            RepositoryError::NotFound => HttpResponse::NotFound().json(json!({
                "error": "not_found",
                "message": "Booking not found"
            })),
            _ => {
                error!("Failed to load booking {}: {}", booking_id, e);
                HttpResponse::InternalServerError().json(json!({
                    "error": "internal_error",
                    "message": "Failed to retrieve booking"
                }))
            }
        };
    }

    let state = StreamState {
        repo: repo.get_ref().clone(),
        booking_id,
        poll_interval: Duration::from_secs(config.stream_poll_interval_seconds.max(1)),
        last_status: None,
        done: false,
    };

    let stream = futures_util::stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }

        loop {
            if state.last_status.is_some() {
                tokio::time::sleep(state.poll_interval).await;
            }

            let booking = match state.repo.get_booking(&state.booking_id).await {
                Ok(booking) => booking,
                Err(RepositoryError::NotFound) => {
                    state.done = true;
                    return None;
                }
                Err(e) => {
                    warn!("Stream poll failed for {}: {}", state.booking_id, e);
                    if state.last_status.is_none() {
                        state.done = true;
                        return None;
                    }
                    continue;
                }
            };

            let message = match &state.last_status {
                None => format!("Current status: {}", booking.status),
                Some(previous) if *previous != booking.status => {
                    format!("Status updated to: {}", booking.status)
                }
                Some(_) => continue,
            };

            state.last_status = Some(booking.status.clone());

            let mut chunk = sse_frame("status", &status_event(&booking, message));
            if is_terminal_status(&booking.status) {
                chunk.push_str(&sse_frame("complete", &complete_event(&booking)));
                state.done = true;
            }

            return Some((
                Ok::<web::Bytes, actix_web::Error>(web::Bytes::from(chunk)),
                state,
            ));
        }
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream)
}

#[derive(Debug, serde::Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[get("/api/bookings")]
pub async fn list_user_bookings(
    req: HttpRequest,
    repo: web::Data<BookingRepository>,
    query: web::Query<ListBookingsQuery>,
) -> impl Responder {
    let user = match auth_user(&req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let status = query.status.as_deref().filter(|s| !s.is_empty());
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    match repo
        .list_user_bookings(&user.user_id, status, limit, offset)
        .await
    {
        Ok((bookings, total)) => {
            let summaries: Vec<_> = bookings.iter().map(BookingRow::to_summary).collect();
            HttpResponse::Ok().json(json!({
                "bookings": summaries,
                "total": total
            }))
        }
        Err(e) => {
            error!("Failed to list bookings for {}: {}", user.user_id, e);
            HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to retrieve bookings"
            }))
        }
    }
}

#[get("/health")]
pub async fn health(repo: web::Data<BookingRepository>) -> impl Responder {
    match repo.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "healthy",
            "service": "booking-service",
            "timestamp": Utc::now()
        })),
        Err(e) => {
            error!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(json!({
                "error": "service_unavailable",
                "message": "Database ping failed"
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BOOKING_CONFIRMED, PAYMENT_COMPLETED};

    fn sample_row(status: &str, error_message: Option<&str>) -> BookingRow {
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
            seats: vec!["A1".into()],
            total_amount: 99.99,
            status: status.into(),
            payment_status: PAYMENT_COMPLETED.into(),
            hold_id: "h1".into(),
            error_message: error_message.map(str::to_string),
            created_at: now,
            confirmed_at: None,
            failed_at: None,
        }
    }

    #[test]
    fn sse_frames_are_well_formed() {
        let frame = sse_frame("status", &json!({"booking_id": "b1"}));
        assert!(frame.starts_with("event: status\ndata: "));
        assert!(frame.ends_with("\n\n"));
    }

    #[test]
    fn complete_event_carries_error_for_failures() {
        let failed = sample_row(BOOKING_FAILED, Some("Payment failed: declined"));
        let data = complete_event(&failed);
        assert_eq!(data["final_status"], "failed");
        assert_eq!(data["error_message"], "Payment failed: declined");

        let confirmed = sample_row(BOOKING_CONFIRMED, None);
        let data = complete_event(&confirmed);
        assert_eq!(data["final_status"], "confirmed");
        assert!(data.get("error_message").is_none());
    }

    #[test]
    fn tracking_urls_use_booking_id() {
        assert_eq!(status_url("b1"), "/api/booking/b1/status");
        assert_eq!(stream_url("b1"), "/api/booking/b1/stream");
    }
}
