use salvo::{Depot, Response, Router, handler, writing::Json};

use mingle_service::auth::depot::{CurrentUser, depot_keys};

use super::super::users::UserResponse;

/// ## Summary
/// GET /api/app/whoami - Echo the account the request authenticated as, or
/// a `public` marker when no credentials were presented.
#[handler]
async fn whoami_handler(depot: &mut Depot, res: &mut Response) {
    match depot.get::<CurrentUser>(depot_keys::AUTHENTICATED_USER) {
        Ok(CurrentUser::User(user)) => {
            let body = serde_json::to_value(UserResponse::from(user.clone()))
                .unwrap_or(serde_json::Value::Null);
            res.render(Json(body));
        }
        Ok(CurrentUser::Public) => {
            res.render(Json(serde_json::json!({ "status": "public" })));
        }
        Err(_) => {
            res.render(Json(
                serde_json::json!({ "error": "User not found in depot" }),
            ));
        }
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("whoami").get(whoami_handler)
}
