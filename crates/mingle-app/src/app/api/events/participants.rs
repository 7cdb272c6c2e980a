use chrono::{DateTime, Utc};
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::db_handler::get_db_from_depot;
use mingle_db::db::enums::{ParticipantRole, ParticipantStatus};
use mingle_db::model::participant::Participant;
use mingle_db::model::user::User;
use mingle_service::auth::get_user_from_depot;
use mingle_service::participant;

use super::super::respond::{ErrorResponse, render_error};

/// ## Summary
/// Status decision for a pending participant
#[derive(Debug, Deserialize)]
pub struct SetParticipantStatusRequest {
    pub status: ParticipantStatus,
}

/// ## Summary
/// One roster row as stored
#[derive(Debug, Serialize)]
pub struct ParticipantResponse {
    pub event_id: String,
    pub user_id: String,
    pub role: ParticipantRole,
    pub status: ParticipantStatus,
    pub responded_at: DateTime<Utc>,
}

impl From<Participant> for ParticipantResponse {
    fn from(participant: Participant) -> Self {
        Self {
            event_id: participant.event_id.to_string(),
            user_id: participant.user_id.to_string(),
            role: participant.role,
            status: participant.status,
            responded_at: participant.responded_at,
        }
    }
}

/// ## Summary
/// One roster row joined with the member's username
#[derive(Debug, Serialize)]
pub struct RosterEntryResponse {
    pub user_id: String,
    pub username: String,
    pub role: ParticipantRole,
    pub status: ParticipantStatus,
    pub responded_at: DateTime<Utc>,
}

impl From<(Participant, User)> for RosterEntryResponse {
    fn from((participant, user): (Participant, User)) -> Self {
        Self {
            user_id: participant.user_id.to_string(),
            username: user.username,
            role: participant.role,
            status: participant.status,
            responded_at: participant.responded_at,
        }
    }
}

/// ## Summary
/// POST /`api/events/{event_id}/participants` - Join an event as a member.
/// Public events admit immediately, private events require host approval
/// and a friendship with the creator.
///
/// ## Errors
/// Returns HTTP 409 when the caller is already on the roster
#[handler]
async fn join_event_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing join event request");

    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let user_id = current.id;

    let Some(event_id) = super::parse_event_id_param(req, res) else {
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

    match participant::join_event(&mut conn, event_id, user_id).await {
        Ok(joined) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(ParticipantResponse::from(joined)));
        }
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// GET /`api/events/{event_id}/participants` - Roster of an event the caller
/// may see, hosts first.
#[handler]
async fn list_participants_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let viewer_id = current.id;

    let Some(event_id) = super::parse_event_id_param(req, res) else {
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

    match participant::participants_of_event(&mut conn, event_id, viewer_id).await {
        Ok(roster) => res.render(Json(
            roster
                .into_iter()
                .map(RosterEntryResponse::from)
                .collect::<Vec<_>>(),
        )),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// PUT /`api/events/{event_id}/participants/{user_id`} - Host decision on a
/// member's status.
///
/// ## Errors
/// Returns HTTP 403 when the caller is not a host of the event
#[handler]
async fn set_participant_status_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let actor_id = current.id;

    let Some(event_id) = super::parse_event_id_param(req, res) else {
        return;
    };
    let Some(target_user_id) = parse_user_id_param(req, res) else {
        return;
    };

    let status_req: SetParticipantStatusRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = ?e, "Failed to parse participant status request");
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

    match participant::set_participant_status(
        &mut conn,
        event_id,
        target_user_id,
        status_req.status,
        actor_id,
    )
    .await
    {
        Ok(updated) => res.render(Json(ParticipantResponse::from(updated))),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// DELETE /`api/events/{event_id}/participants/{user_id`} - Leave an event,
/// or as a host remove another member. The host's own row is protected.
///
/// ## Errors
/// Returns HTTP 409 when the target row is the event's host
#[handler]
async fn remove_participant_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let actor_id = current.id;

    let Some(event_id) = super::parse_event_id_param(req, res) else {
        return;
    };
    let Some(target_user_id) = parse_user_id_param(req, res) else {
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

    match participant::leave_event(&mut conn, event_id, target_user_id, actor_id).await {
        Ok(()) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => render_error(res, &e),
    }
}

/// Pulls and parses the `user_id` path parameter, rendering a 400 on
/// failure.
fn parse_user_id_param(req: &Request, res: &mut Response) -> Option<Uuid> {
    let Some(user_id_str) = req.param::<String>("user_id") else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse {
            error: "User ID required".to_string(),
        }));
        return None;
    };

    match Uuid::parse_str(&user_id_str) {
        Ok(user_id) => Some(user_id),
        Err(_) => {
            res.status_code(StatusCode::BAD_REQUEST);
            res.render(Json(ErrorResponse {
                error: "Invalid user ID format".to_string(),
            }));
            None
        }
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("participants")
        .get(list_participants_handler)
        .post(join_event_handler)
        .push(
            Router::with_path("{user_id}")
                .put(set_participant_status_handler)
                .delete(remove_participant_handler),
        )
}
