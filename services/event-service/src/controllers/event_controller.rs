use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::{error, info};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::cache;
use crate::config::Config;
use crate::middleware::auth::auth_user;
use crate::models::{
    CreateEventInput, CreateEventRecord, EventFilter, EventListResponse, EventResponse,
    ListEventsQuery, Pagination,
};
use crate::repository::{EventRepository, RepositoryError};
use crate::seatmap;

fn parse_day(raw: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn build_filter(query: &ListEventsQuery) -> EventFilter {
    let mut limit = query.limit.unwrap_or(20);
    if limit > 100 {
        limit = 100;
    }
    if limit < 1 {
        limit = 20;
    }
    let offset = query.offset.unwrap_or(0).max(0);

    let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

    EventFilter {
        city: non_empty(&query.city),
        category: non_empty(&query.category),
        name: non_empty(&query.name),
        date_from: query.date_from.as_deref().and_then(parse_day),
        date_to: query.date_to.as_deref().and_then(parse_day),
        limit,
        offset,
    }
}

#[post("/api/events")]
pub async fn create_event(
    req: HttpRequest,
    repo: web::Data<EventRepository>,
    config: web::Data<Config>,
    body: web::Json<CreateEventInput>,
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

    let record = CreateEventRecord {
        id: Uuid::new_v4().to_string(),
        name: body.name.clone(),
        description: body.description.clone(),
        venue: body.venue.clone(),
        city: body.city.clone(),
        category: body.category.clone(),
        event_date: body.event_date,
        total_seats: body.total_seats,
        price_per_seat: body.price_per_seat,
        created_by: user.user_id,
    };

    let labels = seatmap::generate_labels(body.total_seats as usize, config.seat_row_width);

    let event = match repo.create_event(record, labels).await {
        Ok(event) => event,
        Err(RepositoryError::InvalidSeatCount(n)) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "validation_failed",
                "message": format!("Invalid seat count: {}", n)
            }));
        }
        Err(RepositoryError::DuplicateEvent) => {
            return HttpResponse::Conflict().json(json!({
                "error": "already_exists",
                "message": "Event already exists"
            }));
        }
        Err(e) => {
            error!("Failed to create event: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to create event"
            }));
        }
    };

    cache::invalidate_event_lists().await;
    info!("Created event {} with {} seats", event.id, event.total_seats);

    let response = event.to_response(event.total_seats as i64);
    HttpResponse::Created().json(response)
}

#[get("/api/events")]
pub async fn list_events(
    repo: web::Data<EventRepository>,
    config: web::Data<Config>,
    query: web::Query<ListEventsQuery>,
) -> impl Responder {
    let filter = build_filter(&query);
    let cache_key = cache::filter_key(&filter);

    if let Some(cached) = cache::get_event_list(&cache_key).await {
        return HttpResponse::Ok().json(cached);
    }

    let (events, total) = match repo.list_events(&filter).await {
        Ok(page) => page,
        Err(e) => {
            error!("Failed to list events: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "internal_error",
                "message": "Failed to retrieve events"
            }));
        }
    };

    let mut responses: Vec<EventResponse> = Vec::with_capacity(events.len());
    for event in &events {
        let available = match cache::get_seat_count(&event.id).await {
            Some(count) => count,
            None => match repo.available_seat_count(&event.id).await {
                Ok(count) => {
                    cache::set_seat_count(&event.id, count, config.cache_ttl_seats_seconds).await;
                    count
                }
                Err(_) => 0,
            },
        };
        responses.push(event.to_response(available));
    }

    let response = EventListResponse {
        events: responses,
        pagination: Pagination::new(total, filter.limit, filter.offset),
    };

    if let Ok(payload) = serde_json::to_string(&response) {
        cache::set_event_list(&cache_key, &payload, config.cache_ttl_list_seconds).await;
    }

    HttpResponse::Ok().json(response)
}

#[get("/api/events/{id}")]
pub async fn get_event(
    repo: web::Data<EventRepository>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> impl Responder {
    let event_id = path.into_inner();

    let event = match cache::get_event(&event_id).await {
        Some(event) => event,
        None => match repo.get_event(&event_id).await {
            Ok(event) => {
                cache::set_event(&event, config.cache_ttl_event_seconds).await;
                event
            }
            Err(RepositoryError::EventNotFound) => {
                return HttpResponse::NotFound().json(json!({
                    "error": "not_found",
                    "message": "Event not found"
                }));
            }
            Err(e) => {
                error!("Failed to load event {}: {}", event_id, e);
                return HttpResponse::InternalServerError().json(json!({
                    "error": "internal_error",
                    "message": "Failed to retrieve event"
                }));
            }
        },
    };

    let available = match cache::get_seat_count(&event_id).await {
        Some(count) => count,
        None => match repo.available_seat_count(&event_id).await {
            Ok(count) => {
                cache::set_seat_count(&event_id, count, config.cache_ttl_seats_seconds).await;
                count
            }
            Err(_) => 0,
        },
    };

    let seat_numbers = match cache::get_seat_numbers(&event_id).await {
        Some(seats) => seats,
        None => match repo.available_seat_numbers(&event_id).await {
            Ok(seats) => {
                cache::set_seat_numbers(&event_id, &seats, config.cache_ttl_seats_seconds).await;
                seats
            }
            Err(_) => Vec::new(),
        },
    };

    let mut response = event.to_response(available);
    response.available_seat_numbers = Some(seat_numbers);

    HttpResponse::Ok().json(response)
}

#[get("/health")]
pub async fn health(repo: web::Data<EventRepository>) -> impl Responder {
    match repo.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "healthy",
            "service": "event-service",
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

    fn query(limit: Option<i64>, offset: Option<i64>) -> ListEventsQuery {
        ListEventsQuery {
            city: None,
            category: None,
            name: None,
            date_from: None,
            date_to: None,
            limit,
            offset,
        }
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(build_filter(&query(None, None)).limit, 20);
        assert_eq!(build_filter(&query(Some(500), None)).limit, 100);
        assert_eq!(build_filter(&query(Some(0), None)).limit, 20);
        assert_eq!(build_filter(&query(Some(-3), None)).limit, 20);
        assert_eq!(build_filter(&query(Some(7), None)).limit, 7);
    }

    #[test]
    fn offset_never_negative() {
        assert_eq!(build_filter(&query(None, Some(-10))).offset, 0);
        assert_eq!(build_filter(&query(None, Some(40))).offset, 40);
    }

    #[test]
    fn day_parsing() {
        let parsed = parse_day("2024-06-01").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-06-01 00:00:00");
        assert!(parse_day("junk").is_none());
        assert!(parse_day("2024-13-40").is_none());
    }

    #[test]
    fn empty_filter_strings_are_dropped() {
        let mut q = query(None, None);
        q.city = Some(String::new());
        q.category = Some("music".into());
        let filter = build_filter(&q);
        assert!(filter.city.is_none());
        assert_eq!(filter.category.as_deref(), Some("music"));
    }
}
