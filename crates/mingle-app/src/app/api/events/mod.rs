use chrono::{DateTime, Utc};
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::db_handler::get_db_from_depot;
use mingle_core::constants::EVENTS_ROUTE_COMPONENT;
use mingle_db::db::enums::{Privacy, RecurrenceRule};
use mingle_db::model::event::Event;
use mingle_service::auth::get_user_from_depot;
use mingle_service::error::ServiceError;
use mingle_service::event::{self, CreateEventContext, ListEventsContext, UpdateEventContext};
use mingle_service::recurrence::Occurrence;

use super::respond::{ErrorResponse, render_error};

mod categories;
mod participants;

/// ## Summary
/// Event creation request payload
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub privacy: Option<Privacy>,
    pub recurrence: Option<RecurrenceRule>,
}

/// ## Summary
/// Event update request payload
///
/// `description` and `location` take doubled `Option`s so an explicit `null`
/// clears the stored text while an absent field leaves it alone.
#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub location: Option<Option<String>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub privacy: Option<Privacy>,
    pub recurrence: Option<RecurrenceRule>,
}

/// ## Summary
/// Event response payload
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: String,
    pub creator_id: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub privacy: Privacy,
    pub recurrence: RecurrenceRule,
    pub next_occurrence: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id.to_string(),
            creator_id: event.creator_id.to_string(),
            name: event.name,
            description: event.description,
            location: event.location,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            privacy: event.privacy,
            recurrence: event.recurrence,
            next_occurrence: event.next_occurrence,
            created_at: event.created_at,
        }
    }
}

/// ## Summary
/// One expanded instance of an event's schedule.
#[derive(Debug, Serialize)]
pub struct OccurrenceResponse {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub next_occurrence: Option<DateTime<Utc>>,
}

impl From<Occurrence> for OccurrenceResponse {
    fn from(occurrence: Occurrence) -> Self {
        Self {
            starts_at: occurrence.starts_at,
            ends_at: occurrence.ends_at,
            next_occurrence: occurrence.next_occurrence,
        }
    }
}

/// ## Summary
/// POST /api/events - Create an event; the caller becomes its accepted host.
/// Privacy defaults to `public` and recurrence to `none` when omitted.
///
/// ## Errors
/// Returns HTTP 400 if the payload is malformed or the event ends before it
/// starts
#[handler]
async fn create_event_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing create event request");

    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let creator_id = current.id;

    let create_req: CreateEventRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = ?e, "Failed to parse create event request");
            res.status_code(StatusCode::BAD_REQUEST);
            res.render(Json(ErrorResponse {
                error: "Invalid request body".to_string(),
            }));
            return;
        }
    };

    let provider = match get_db_from_depot(depot) {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to get database provider");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse {
                error: "Internal server error".to_string(),
            }));
            return;
        }
    };

    let mut conn = match provider.get_connection().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "Failed to get database connection");
            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            res.render(Json(ErrorResponse {
                error: "Database unavailable".to_string(),
            }));
            return;
        }
    };

    let ctx = CreateEventContext {
        name: create_req.name,
        description: create_req.description,
        location: create_req.location,
        starts_at: create_req.starts_at,
        ends_at: create_req.ends_at,
        privacy: create_req.privacy.unwrap_or(Privacy::Public),
        recurrence: create_req.recurrence.unwrap_or(RecurrenceRule::None),
    };

    match event::create_event(&mut conn, creator_id, &ctx).await {
        Ok(created) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(EventResponse::from(created)));
        }
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// GET /api/events - Events visible to the caller, soonest first. Supports
/// `?creator_id=` and `?recurrence=` filters.
///
/// ## Errors
/// Returns HTTP 400 for an unknown recurrence tag or malformed creator ID
#[handler]
async fn list_events_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let viewer_id = current.id;

    let mut ctx = ListEventsContext::default();
    if let Some(raw) = req.query::<String>("creator_id") {
        match Uuid::parse_str(&raw) {
            Ok(creator_id) => ctx.creator_id = Some(creator_id),
            Err(_) => {
                res.status_code(StatusCode::BAD_REQUEST);
                res.render(Json(ErrorResponse {
                    error: "Invalid creator ID format".to_string(),
                }));
                return;
            }
        }
    }
    if let Some(raw) = req.query::<String>("recurrence") {
        match raw.parse::<RecurrenceRule>() {
            Ok(rule) => ctx.recurrence = Some(rule),
            Err(bad_tag) => {
                render_error(res, &ServiceError::InvalidRecurrenceRule(bad_tag));
                return;
            }
        }
    }

    let provider = match get_db_from_depot(depot) {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to get database provider");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse {
                error: "Internal server error".to_string(),
            }));
            return;
        }
    };

    let mut conn = match provider.get_connection().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "Failed to get database connection");
            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            res.render(Json(ErrorResponse {
                error: "Database unavailable".to_string(),
            }));
            return;
        }
    };

    match event::list_events(&mut conn, viewer_id, &ctx).await {
        Ok(listed) => res.render(Json(
            listed
                .into_iter()
                .map(EventResponse::from)
                .collect::<Vec<_>>(),
        )),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// GET /`api/events/{event_id`} - Fetch one event the caller may see.
///
/// ## Errors
/// Returns HTTP 404 for missing events and for private events the caller is
/// not on; the two cases are indistinguishable
#[handler]
async fn get_event_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let viewer_id = current.id;

    let Some(event_id) = parse_event_id_param(req, res) else {
        return;
    };

    let provider = match get_db_from_depot(depot) {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to get database provider");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse {
                error: "Internal server error".to_string(),
            }));
            return;
        }
    };

    let mut conn = match provider.get_connection().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "Failed to get database connection");
            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            res.render(Json(ErrorResponse {
                error: "Database unavailable".to_string(),
            }));
            return;
        }
    };

    match event::get_visible_event(&mut conn, event_id, viewer_id).await {
        Ok(found) => res.render(Json(EventResponse::from(found))),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// PUT /`api/events/{event_id`} - Partial update; creator only. The
/// next-occurrence anchor is recomputed from the effective schedule.
///
/// ## Errors
/// Returns HTTP 403 when the caller is not the creator
#[handler]
async fn update_event_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let actor_id = current.id;

    let Some(event_id) = parse_event_id_param(req, res) else {
        return;
    };

    let update_req: UpdateEventRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = ?e, "Failed to parse update event request");
            res.status_code(StatusCode::BAD_REQUEST);
            res.render(Json(ErrorResponse {
                error: "Invalid request body".to_string(),
            }));
            return;
        }
    };

    let provider = match get_db_from_depot(depot) {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to get database provider");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse {
                error: "Internal server error".to_string(),
            }));
            return;
        }
    };

    let ctx = UpdateEventContext {
        name: update_req.name,
        description: update_req.description,
        location: update_req.location,
        starts_at: update_req.starts_at,
        ends_at: update_req.ends_at,
        privacy: update_req.privacy,
        recurrence: update_req.recurrence,
    };

    let mut conn = match provider.get_connection().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "Failed to get database connection");
            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            res.render(Json(ErrorResponse {
                error: "Database unavailable".to_string(),
            }));
            return;
        }
    };

    match event::update_event(&mut conn, event_id, actor_id, &ctx).await {
        Ok(updated) => res.render(Json(EventResponse::from(updated))),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// DELETE /`api/events/{event_id`} - Remove an event and its roster; creator
/// only.
///
/// ## Errors
/// Returns HTTP 403 when the caller is not the creator
#[handler]
async fn delete_event_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let actor_id = current.id;

    let Some(event_id) = parse_event_id_param(req, res) else {
        return;
    };

    let provider = match get_db_from_depot(depot) {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to get database provider");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse {
                error: "Internal server error".to_string(),
            }));
            return;
        }
    };

    let mut conn = match provider.get_connection().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "Failed to get database connection");
            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            res.render(Json(ErrorResponse {
                error: "Database unavailable".to_string(),
            }));
            return;
        }
    };

    match event::delete_event(&mut conn, event_id, actor_id).await {
        Ok(()) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// GET /`api/events/{event_id}/occurrences?from=&until=` - Expand the
/// event's schedule inside the closed window `[from, until]`.
///
/// ## Errors
/// Returns HTTP 400 if a bound is missing, malformed, or the window ends
/// before it starts
#[handler]
async fn list_occurrences_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let viewer_id = current.id;

    let Some(event_id) = parse_event_id_param(req, res) else {
        return;
    };
    let Some(from) = required_time_query(req, res, "from") else {
        return;
    };
    let Some(until) = required_time_query(req, res, "until") else {
        return;
    };

    let provider = match get_db_from_depot(depot) {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to get database provider");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse {
                error: "Internal server error".to_string(),
            }));
            return;
        }
    };

    let mut conn = match provider.get_connection().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "Failed to get database connection");
            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            res.render(Json(ErrorResponse {
                error: "Database unavailable".to_string(),
            }));
            return;
        }
    };

    match event::occurrences_for_event(&mut conn, event_id, viewer_id, from, until).await {
        Ok(occurrences) => res.render(Json(
            occurrences
                .into_iter()
                .map(OccurrenceResponse::from)
                .collect::<Vec<_>>(),
        )),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// GET /`api/events/{event_id}/next?after=` - First instance starting
/// strictly after `after` (default: now); also re-anchors the stored
/// next-occurrence column. Answers 204 when the series is exhausted.
#[handler]
async fn next_occurrence_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let viewer_id = current.id;

    let Some(event_id) = parse_event_id_param(req, res) else {
        return;
    };

    let after = match req.query::<String>("after") {
        Some(raw) => {
            let Some(parsed) = parse_time_query(&raw, res, "after") else {
                return;
            };
            parsed
        }
        None => Utc::now(),
    };

    let provider = match get_db_from_depot(depot) {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to get database provider");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse {
                error: "Internal server error".to_string(),
            }));
            return;
        }
    };

    let mut conn = match provider.get_connection().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "Failed to get database connection");
            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            res.render(Json(ErrorResponse {
                error: "Database unavailable".to_string(),
            }));
            return;
        }
    };

    match event::roll_next_occurrence(&mut conn, event_id, viewer_id, after).await {
        Ok(Some(next)) => res.render(Json(OccurrenceResponse::from(next))),
        Ok(None) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => render_error(res, &e),
    }
}

/// Pulls and parses the `event_id` path parameter, rendering a 400 on
/// failure. Shared with the roster and category-link submodules.
fn parse_event_id_param(req: &Request, res: &mut Response) -> Option<Uuid> {
    let Some(event_id_str) = req.param::<String>("event_id") else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse {
            error: "Event ID required".to_string(),
        }));
        return None;
    };

    match Uuid::parse_str(&event_id_str) {
        Ok(event_id) => Some(event_id),
        Err(_) => {
            res.status_code(StatusCode::BAD_REQUEST);
            res.render(Json(ErrorResponse {
                error: "Invalid event ID format".to_string(),
            }));
            None
        }
    }
}

/// Parses a required RFC 3339 query parameter.
fn required_time_query(req: &Request, res: &mut Response, name: &str) -> Option<DateTime<Utc>> {
    let Some(raw) = req.query::<String>(name) else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse {
            error: format!("Missing '{name}' query parameter"),
        }));
        return None;
    };
    parse_time_query(&raw, res, name)
}

fn parse_time_query(raw: &str, res: &mut Response, name: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(_) => {
            res.status_code(StatusCode::BAD_REQUEST);
            res.render(Json(ErrorResponse {
                error: format!("Invalid '{name}' timestamp, expected RFC 3339"),
            }));
            None
        }
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(EVENTS_ROUTE_COMPONENT)
        .get(list_events_handler)
        .post(create_event_handler)
        .push(
            Router::with_path("{event_id}")
                .get(get_event_handler)
                .put(update_event_handler)
                .delete(delete_event_handler)
                .push(Router::with_path("occurrences").get(list_occurrences_handler))
                .push(Router::with_path("next").get(next_occurrence_handler))
                .push(categories::routes())
                .push(participants::routes()),
        )
}
