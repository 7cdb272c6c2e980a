use chrono::{DateTime, NaiveDate, Utc};
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::db_handler::get_db_from_depot;
use mingle_core::constants::USERS_ROUTE_COMPONENT;
use mingle_db::model::user::User;
use mingle_service::auth::get_user_from_depot;
use mingle_service::user::{self, RegisterUserContext, UpdateProfileContext};

use super::events::EventResponse;
use super::respond::{ErrorResponse, render_error};

/// ## Summary
/// Registration request payload
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub birthday: Option<NaiveDate>,
}

/// ## Summary
/// Login request payload
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// ## Summary
/// Profile update request payload
///
/// `birthday` takes a doubled `Option` so an explicit `null` clears the
/// stored date while an absent field leaves it alone.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub birthday: Option<Option<NaiveDate>>,
}

/// ## Summary
/// Password change request payload
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// ## Summary
/// User response payload; never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub birthday: Option<NaiveDate>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username,
            email: user.email,
            birthday: user.birthday,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

/// ## Summary
/// POST /api/users - Register a new account. Public: this is the one way to
/// get an account at all.
///
/// ## Errors
/// Returns HTTP 400 if the payload is malformed or fails validation
/// Returns HTTP 409 if the username or email is already taken
#[handler]
async fn register_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing registration request");

    let register_req: RegisterUserRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = ?e, "Failed to parse registration request");
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

    let ctx = RegisterUserContext {
        username: register_req.username,
        email: register_req.email,
        password: register_req.password,
        birthday: register_req.birthday,
    };

    match user::register(&mut conn, &ctx).await {
        Ok(created) => {
            tracing::info!(user_id = %created.id, username = %created.username, "User registered");
            res.status_code(StatusCode::CREATED);
            res.render(Json(UserResponse::from(created)));
        }
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// POST /api/users/login - Verify credentials from the body and stamp
/// `last_login`. Public.
///
/// ## Errors
/// Returns HTTP 401 for unknown usernames, wrong passwords, and deactivated
/// accounts alike
#[handler]
async fn login_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let login_req: LoginRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = ?e, "Failed to parse login request");
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

    match user::login(&mut conn, &login_req.username, &login_req.password).await {
        Ok(logged_in) => res.render(Json(UserResponse::from(logged_in))),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// GET /api/users - List accounts, username order.
#[handler]
async fn list_users_handler(depot: &mut Depot, res: &mut Response) {
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

    match user::list_users(&mut conn).await {
        Ok(listed) => res.render(Json(
            listed
                .into_iter()
                .map(UserResponse::from)
                .collect::<Vec<_>>(),
        )),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// GET /`api/users/{user_id`} - Fetch one account.
///
/// ## Errors
/// Returns HTTP 404 if the user does not exist
#[handler]
async fn get_user_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(_current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };

    let Some(user_id) = parse_user_id_param(req, res) else {
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

    match user::get_user(&mut conn, user_id).await {
        Ok(found) => res.render(Json(UserResponse::from(found))),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// PUT /`api/users/{user_id`} - Partial profile update; accounts can only
/// edit themselves.
///
/// ## Errors
/// Returns HTTP 403 when editing another account
/// Returns HTTP 409 if the new username or email is already taken
#[handler]
async fn update_profile_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let current_id = current.id;

    let Some(user_id) = parse_user_id_param(req, res) else {
        return;
    };

    if current_id != user_id {
        res.status_code(StatusCode::FORBIDDEN);
        res.render(Json(ErrorResponse {
            error: "You can only manage your own account".to_string(),
        }));
        return;
    }

    let update_req: UpdateProfileRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = ?e, "Failed to parse profile update request");
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

    let ctx = UpdateProfileContext {
        username: update_req.username,
        email: update_req.email,
        birthday: update_req.birthday,
    };

    match user::update_profile(&mut conn, user_id, &ctx).await {
        Ok(updated) => res.render(Json(UserResponse::from(updated))),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// PUT /`api/users/{user_id}/password` - Change the password; requires the
/// current one and only works on the caller's own account.
///
/// ## Errors
/// Returns HTTP 401 if the current password does not verify
/// Returns HTTP 403 when targeting another account
#[handler]
async fn change_password_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing password change request");

    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let current_id = current.id;

    let Some(user_id) = parse_user_id_param(req, res) else {
        return;
    };

    if current_id != user_id {
        res.status_code(StatusCode::FORBIDDEN);
        res.render(Json(ErrorResponse {
            error: "You can only manage your own account".to_string(),
        }));
        return;
    }

    let change_req: ChangePasswordRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = ?e, "Failed to parse password change request");
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

    match user::change_password(
        &mut conn,
        user_id,
        &change_req.current_password,
        &change_req.new_password,
    )
    .await
    {
        Ok(()) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// DELETE /`api/users/{user_id`} - Deactivate the caller's own account. The
/// row stays so friendships and events survive, but the account can no
/// longer sign in.
///
/// ## Errors
/// Returns HTTP 403 when targeting another account
#[handler]
async fn deactivate_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let current_id = current.id;

    let Some(user_id) = parse_user_id_param(req, res) else {
        return;
    };

    if current_id != user_id {
        res.status_code(StatusCode::FORBIDDEN);
        res.render(Json(ErrorResponse {
            error: "You can only manage your own account".to_string(),
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

    match user::deactivate(&mut conn, user_id).await {
        Ok(_deactivated) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// GET /`api/users/{user_id}/events` - Events the account participates in,
/// soonest first; accounts can only list their own.
///
/// ## Errors
/// Returns HTTP 403 when targeting another account
#[handler]
async fn joined_events_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(current) = get_user_from_depot(depot) else {
        res.status_code(StatusCode::UNAUTHORIZED);
        res.render(Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }));
        return;
    };
    let current_id = current.id;

    let Some(user_id) = parse_user_id_param(req, res) else {
        return;
    };

    if current_id != user_id {
        res.status_code(StatusCode::FORBIDDEN);
        res.render(Json(ErrorResponse {
            error: "You can only list your own events".to_string(),
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

    match mingle_service::participant::events_joined_by(&mut conn, user_id).await {
        Ok(joined) => res.render(Json(
            joined
                .into_iter()
                .map(EventResponse::from)
                .collect::<Vec<_>>(),
        )),
        Err(e) => render_error(res, &e),
    }
}

/// Pulls and parses the `user_id` path parameter, rendering a 400 on failure.
fn parse_user_id_param(req: &Request, res: &mut Response) -> Option<uuid::Uuid> {
    let Some(user_id_str) = req.param::<String>("user_id") else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse {
            error: "User ID required".to_string(),
        }));
        return None;
    };

    match uuid::Uuid::parse_str(&user_id_str) {
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
    Router::with_path(USERS_ROUTE_COMPONENT)
        .get(list_users_handler)
        .post(register_handler)
        .push(Router::with_path("login").post(login_handler))
        .push(
            Router::with_path("{user_id}")
                .get(get_user_handler)
                .put(update_profile_handler)
                .delete(deactivate_handler)
                .push(Router::with_path("password").put(change_password_handler))
                .push(Router::with_path("events").get(joined_events_handler)),
        )
}
