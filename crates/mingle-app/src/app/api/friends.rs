use chrono::{DateTime, Utc};
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::db_handler::get_db_from_depot;
use mingle_core::constants::FRIENDS_ROUTE_COMPONENT;
use mingle_db::db::enums::FriendshipStatus;
use mingle_db::model::friendship::Friendship;
use mingle_service::auth::get_user_from_depot;
use mingle_service::friendship::{self, FriendshipDecision};

use super::respond::{ErrorResponse, render_error};
use super::users::UserResponse;

/// ## Summary
/// Decision payload for answering a friend request
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub decision: FriendshipDecision,
}

/// ## Summary
/// One directed friendship edge as stored
#[derive(Debug, Serialize)]
pub struct FriendshipResponse {
    pub id: String,
    pub requester_id: String,
    pub recipient_id: String,
    pub status: FriendshipStatus,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl From<Friendship> for FriendshipResponse {
    fn from(friendship: Friendship) -> Self {
        Self {
            id: friendship.id.to_string(),
            requester_id: friendship.requester_id.to_string(),
            recipient_id: friendship.recipient_id.to_string(),
            status: friendship.status,
            requested_at: friendship.requested_at,
            responded_at: friendship.responded_at,
        }
    }
}

/// ## Summary
/// GET /api/friends - Users the caller holds an accepted edge toward,
/// alphabetical by username.
#[handler]
async fn list_friends_handler(depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let user_id = current.id;

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

    match friendship::friends_of(&mut conn, user_id).await {
        Ok(friends) => res.render(Json(
            friends
                .into_iter()
                .map(UserResponse::from)
                .collect::<Vec<_>>(),
        )),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// GET /api/friends/requests?direction= - Pending requests involving the
/// caller, newest first. `incoming` (default) lists requests awaiting the
/// caller's answer, `outgoing` lists ones the caller sent.
///
/// ## Errors
/// Returns HTTP 400 for any other direction value
#[handler]
async fn list_requests_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let user_id = current.id;

    let direction = req
        .query::<String>("direction")
        .unwrap_or_else(|| "incoming".to_string());
    if direction != "incoming" && direction != "outgoing" {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse {
            error: "Invalid direction, expected 'incoming' or 'outgoing'".to_string(),
        }));
        return;
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

    let listed = if direction == "outgoing" {
        friendship::outgoing_requests(&mut conn, user_id).await
    } else {
        friendship::incoming_requests(&mut conn, user_id).await
    };

    match listed {
        Ok(requests) => res.render(Json(
            requests
                .into_iter()
                .map(FriendshipResponse::from)
                .collect::<Vec<_>>(),
        )),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// POST /`api/friends/requests/{user_id`} - Send a friend request to the
/// named user.
///
/// ## Errors
/// Returns HTTP 400 for a self-request, HTTP 404 for an unknown recipient,
/// and HTTP 409 when the caller already holds an edge toward this user
#[handler]
async fn send_request_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing send friend request");

    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let requester_id = current.id;

    let Some(recipient_id) = parse_user_id_param(req, res) else {
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

    match friendship::send_request(&mut conn, requester_id, recipient_id).await {
        Ok(sent) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(FriendshipResponse::from(sent)));
        }
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// PUT /`api/friends/requests/{user_id`} - Answer the pending request sent
/// by the named user. Accepting also creates the accepted reverse edge so
/// the friendship reads symmetric.
///
/// ## Errors
/// Returns HTTP 409 when the request was already accepted or rejected
#[handler]
async fn respond_request_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let recipient_id = current.id;

    let Some(requester_id) = parse_user_id_param(req, res) else {
        return;
    };

    let respond_req: RespondRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = ?e, "Failed to parse respond request");
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

    match friendship::respond_to_request(&mut conn, requester_id, recipient_id, respond_req.decision)
        .await
    {
        Ok(answered) => res.render(Json(FriendshipResponse::from(answered))),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// DELETE /`api/friends/requests/{user_id`} - Withdraw the caller's pending
/// request to the named user. The edge stays on record as cancelled; the
/// recipient may still decide it later.
///
/// ## Errors
/// Returns HTTP 409 when the request was already accepted or rejected
#[handler]
async fn cancel_request_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let requester_id = current.id;

    let Some(recipient_id) = parse_user_id_param(req, res) else {
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

    match friendship::cancel_request(&mut conn, requester_id, recipient_id).await {
        Ok(cancelled) => res.render(Json(FriendshipResponse::from(cancelled))),
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
    Router::with_path(FRIENDS_ROUTE_COMPONENT)
        .get(list_friends_handler)
        .push(
            Router::with_path("requests")
                .get(list_requests_handler)
                .push(
                    Router::with_path("{user_id}")
                        .post(send_request_handler)
                        .put(respond_request_handler)
                        .delete(cancel_request_handler),
                ),
        )
}
