use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::db_handler::get_db_from_depot;
use mingle_core::constants::CATEGORIES_ROUTE_COMPONENT;
use mingle_db::model::category::Category;
use mingle_service::auth::get_user_from_depot;
use mingle_service::category::{self, CreateCategoryContext};

use super::events::EventResponse;
use super::respond::{ErrorResponse, render_error};

/// ## Summary
/// Category creation request payload
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

/// ## Summary
/// Category response payload
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id.to_string(),
            name: category.name,
            description: category.description,
        }
    }
}

/// ## Summary
/// GET /api/categories - The shared category vocabulary, alphabetical.
#[handler]
async fn list_categories_handler(depot: &mut Depot, res: &mut Response) {
    let Ok(_current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
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

    match category::list_categories(&mut conn).await {
        Ok(listed) => res.render(Json(
            listed
                .into_iter()
                .map(CategoryResponse::from)
                .collect::<Vec<_>>(),
        )),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// POST /api/categories - Add a category to the shared vocabulary. Names
/// are unique case-insensitively.
///
/// ## Errors
/// Returns HTTP 409 when the name is already taken
#[handler]
async fn create_category_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing create category request");

    let Ok(_current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };

    let create_req: CreateCategoryRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = ?e, "Failed to parse create category request");
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

    let ctx = CreateCategoryContext {
        name: create_req.name,
        description: create_req.description,
    };

    match category::create_category(&mut conn, &ctx).await {
        Ok(created) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(CategoryResponse::from(created)));
        }
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// GET /`api/categories/{category_id`} - Fetch one category.
#[handler]
async fn get_category_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(_current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
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

    match category::get_category(&mut conn, category_id).await {
        Ok(found) => res.render(Json(CategoryResponse::from(found))),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// DELETE /`api/categories/{category_id`} - Remove a category and its event
/// links. Events themselves are untouched.
#[handler]
async fn delete_category_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(_current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
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

    match category::delete_category(&mut conn, category_id).await {
        Ok(()) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// GET /`api/categories/{category_id}/events` - Events under a category,
/// filtered to what the caller may see, soonest first.
#[handler]
async fn category_events_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let viewer_id = current.id;

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

    match category::events_in_category(&mut conn, category_id, viewer_id).await {
        Ok(listed) => res.render(Json(
            listed
                .into_iter()
                .map(EventResponse::from)
                .collect::<Vec<_>>(),
        )),
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
    Router::with_path(CATEGORIES_ROUTE_COMPONENT)
        .get(list_categories_handler)
        .post(create_category_handler)
        .push(
            Router::with_path("{category_id}")
                .get(get_category_handler)
                .delete(delete_category_handler)
                .push(Router::with_path("events").get(category_events_handler)),
        )
}
