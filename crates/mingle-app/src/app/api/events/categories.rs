use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use tracing::error;
use uuid::Uuid;

use crate::db_handler::get_db_from_depot;
use mingle_service::auth::get_user_from_depot;
use mingle_service::category;

use super::super::categories::CategoryResponse;
use super::super::respond::{ErrorResponse, render_error};

/// ## Summary
/// GET /`api/events/{event_id}/categories` - Categories attached to an event
/// the caller may see, alphabetical.
#[handler]
async fn list_event_categories_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
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

    match category::categories_of_event(&mut conn, event_id, viewer_id).await {
        Ok(attached) => res.render(Json(
            attached
                .into_iter()
                .map(CategoryResponse::from)
                .collect::<Vec<_>>(),
        )),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// PUT /`api/events/{event_id}/categories/{category_id`} - Attach a category
/// to an event; creator only.
///
/// ## Errors
/// Returns HTTP 403 when the caller is not the event's creator and HTTP 409
/// when the category is already attached
#[handler]
async fn attach_category_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
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
    let Some(category_id) = parse_category_id_param(req, res) else {
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

    match category::attach_category(&mut conn, event_id, category_id, actor_id).await {
        Ok(()) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// DELETE /`api/events/{event_id}/categories/{category_id`} - Detach a
/// category from an event; creator only.
///
/// ## Errors
/// Returns HTTP 403 when the caller is not the event's creator and HTTP 404
/// when the category is not attached
#[handler]
async fn detach_category_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
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
    let Some(category_id) = parse_category_id_param(req, res) else {
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

    match category::detach_category(&mut conn, event_id, category_id, actor_id).await {
        Ok(()) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => render_error(res, &e),
    }
}

/// Pulls and parses the `category_id` path parameter, rendering a 400 on
/// failure.
fn parse_category_id_param(req: &Request, res: &mut Response) -> Option<Uuid> {
    let Some(category_id_str) = req.param::<String>("category_id") else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse {
            error: "Category ID required".to_string(),
        }));
        return None;
    };

    match Uuid::parse_str(&category_id_str) {
        Ok(category_id) => Some(category_id),
        Err(_) => {
            res.status_code(StatusCode::BAD_REQUEST);
            res.render(Json(ErrorResponse {
                error: "Invalid category ID format".to_string(),
            }));
            None
        }
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("categories")
        .get(list_event_categories_handler)
        .push(
            Router::with_path("{category_id}")
                .put(attach_category_handler)
                .delete(detach_category_handler),
        )
}
