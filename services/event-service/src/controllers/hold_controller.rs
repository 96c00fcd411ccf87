use actix_web::{delete, get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::{error, info};
use serde_json::json;
use std::collections::HashSet;
use validator::Validate;

use crate::cache;
use crate::config::Config;
use crate::middleware::auth::auth_user;
use crate::models::{HoldDetailsResponse, HoldResponse, HoldSeatsInput};
use crate::repository::{EventRepository, RepositoryError};

#[post("/api/events/{id}/hold")]
pub async fn hold_seats(
    req: HttpRequest,
    repo: web::Data<EventRepository>,
    config: web::Data<Config>,
    path: web::Path<String>,
    body: web::Json<HoldSeatsInput>,
) -> impl Responder {
    let event_id = path.into_inner();

    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest().json(json!({
            "error": "validation_failed",
            "message": e.to_string()
        }));
    }

    let mut seen = HashSet::new();
    if !body.seat_numbers.iter().all(|s| seen.insert(s.as_str())) {
        return HttpResponse::BadRequest().json(json!({
            "error": "validation_failed",
            "message": "Duplicate seat numbers in request"
        }));
    }

    let user = match auth_user(&req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let hold = match repo
        .create_hold(
            &user.user_id,
            &event_id,
            &body.seat_numbers,
            config.hold_ttl_minutes,
        )
        .await
    {
        Ok(hold) => hold,
        Err(RepositoryError::EventNotFound) => {
            return HttpResponse::NotFound().json(json!({
                "error": "not_found",
                "message": "Event not found"
            }));
        }
        Err(RepositoryError::SeatsUnknown(missing)) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "validation_failed",
                "message": format!("Seat numbers do not exist: {}", missing.join(", ")),
                "details": { "unknown_seats": missing }
            }));
        }
        Err(RepositoryError::SeatsUnavailable(unavailable)) => {
            return HttpResponse::Conflict().json(json!({
                "error": "seats_unavailable",
                "message": "Some requested seats are not available",
                "details": { "unavailable_seats": unavailable }
            }));
        }
        Err(e) => {
            error!("Failed to hold seats for event {}: {}", event_id, e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to hold seats"
            }));
        }
    };

    cache::invalidate_seat_views(&event_id).await;

    let event = match repo.get_event(&event_id).await {
        Ok(event) => event,
        Err(e) => {
            error!("Failed to load event {} after hold: {}", event_id, e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to retrieve event details"
            }));
        }
    };

    info!(
        "Held {} seats on event {} for user {} (hold {})",
        hold.seat_numbers.len(),
        event_id,
        user.user_id,
        hold.id
    );

    let total_price = event.price_per_seat * hold.seat_numbers.len() as f64;
    HttpResponse::Created().json(HoldResponse {
        hold_id: hold.id,
        event_id: hold.event_id,
        held_seats: hold.seat_numbers,
        expires_at: hold.expires_at,
        total_price,
    })
}

#[get("/api/events/holds/{holdId}")]
pub async fn get_hold_details(
    req: HttpRequest,
    repo: web::Data<EventRepository>,
    path: web::Path<String>,
) -> impl Responder {
    let hold_id = path.into_inner();

    let user = match auth_user(&req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let hold = match repo.get_hold(&hold_id).await {
        Ok(hold) => hold,
        Err(RepositoryError::HoldNotFound) => {
            return HttpResponse::NotFound().json(json!({
                "error": "not_found",
                "message": "Hold not found"
            }));
        }
        Err(e) => {
            error!("Failed to load hold {}: {}", hold_id, e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to retrieve hold"
            }));
        }
    };

    if !hold.is_usable_at(Utc::now()) {
        return HttpResponse::NotFound().json(json!({
            "error": "not_found",
            "message": "Hold not found or no longer active"
        }));
    }

    let event = match repo.get_event(&hold.event_id).await {
        Ok(event) => event,
        Err(e) => {
            error!("Failed to load event {} for hold {}: {}", hold.event_id, hold_id, e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to retrieve event details"
            }));
        }
    };

    let total_price = event.price_per_seat * hold.seat_numbers.len() as f64;
    HttpResponse::Ok().json(HoldDetailsResponse {
        hold_id: hold.id,
        user_id: hold.user_id,
        user_name: user.display_name(),
        event_id: event.id,
        event_name: event.name,
        venue: event.venue,
        event_date: event.event_date,
        seats: hold.seat_numbers,
        total_price,
        expires_at: hold.expires_at,
    })
}

#[delete("/api/events/holds/{holdId}")]
pub async fn release_hold(
    repo: web::Data<EventRepository>,
    path: web::Path<String>,
) -> impl Responder {
    let hold_id = path.into_inner();

    let hold = match repo.release_hold(&hold_id).await {
        Ok(hold) => hold,
        Err(RepositoryError::HoldNotFound) => {
            return HttpResponse::NotFound().json(json!({
                "error": "not_found",
                "message": "Hold not found"
            }));
        }
        Err(e) => {
            error!("Failed to release hold {}: {}", hold_id, e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to release hold"
            }));
        }
    };

    cache::invalidate_seat_views(&hold.event_id).await;
    info!("Released hold {} on event {}", hold_id, hold.event_id);

    HttpResponse::Ok().json(json!({ "message": "Hold released successfully" }))
}

#[post("/api/events/holds/{holdId}/confirm")]
pub async fn confirm_hold(
    repo: web::Data<EventRepository>,
    path: web::Path<String>,
) -> impl Responder {
    let hold_id = path.into_inner();

    let hold = match repo.confirm_hold(&hold_id).await {
        Ok(hold) => hold,
        Err(RepositoryError::HoldNotFound) => {
            return HttpResponse::NotFound().json(json!({
                "error": "not_found",
                "message": "Hold not found"
            }));
        }
        Err(RepositoryError::HoldNotActive) => {
            return HttpResponse::Conflict().json(json!({
                "error": "hold_expired",
                "message": "Hold is no longer active"
            }));
        }
        Err(e) => {
            error!("Failed to confirm hold {}: {}", hold_id, e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to confirm hold"
            }));
        }
    };

    cache::invalidate_seat_views(&hold.event_id).await;
    info!("Confirmed hold {} on event {}", hold_id, hold.event_id);

    HttpResponse::Ok().json(json!({ "message": "Booking confirmed successfully" }))
}
