use salvo::Depot;
use tracing::error;

use crate::db_handler::get_db_from_depot;
use mingle_service::auth::authenticate::authenticate;
use mingle_service::auth::depot::{CurrentUser, depot_keys};

/// ## Summary
/// Authentication middleware that authenticates the request and stores the
/// user in the depot.
///
/// Requests without usable credentials continue as [`CurrentUser::Public`];
/// registration and login must stay reachable without an account, so the
/// decision to reject anonymous callers belongs to each handler.
///
/// ## Side Effects
/// Inserts the resolved [`CurrentUser`] into the depot for downstream
/// handlers to access.
#[salvo::async_trait]
impl salvo::Handler for AuthMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        tracing::trace!("Authenticating request");

        if req.method() == salvo::http::Method::OPTIONS {
            depot.insert(depot_keys::AUTHENTICATED_USER, CurrentUser::Public);
            return;
        }

        let provider = match get_db_from_depot(depot) {
            Ok(p) => p,
            Err(e) => {
                error!(error = ?e, "Failed to get database provider from depot");
                res.status_code(salvo::http::StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };

        let mut conn = match provider.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!(error = ?e, "Failed to get database connection");
                res.status_code(salvo::http::StatusCode::SERVICE_UNAVAILABLE);
                ctrl.skip_rest();
                return;
            }
        };

        match authenticate(req, &mut conn).await {
            Ok(user) => {
                tracing::debug!(username = %user.username, "User authenticated successfully");
                depot.insert(depot_keys::AUTHENTICATED_USER, CurrentUser::User(user));
            }
            Err(service_err) => {
                use mingle_service::error::ServiceError;

                if matches!(&service_err, ServiceError::NotAuthenticated) {
                    tracing::debug!("Request not authenticated, treating as public");
                    depot.insert(depot_keys::AUTHENTICATED_USER, CurrentUser::Public);
                    return;
                }

                // Anything else is an infrastructure failure, not a bad credential.
                error!(error = ?service_err, "Authentication failed with error");
                res.status_code(salvo::http::StatusCode::INTERNAL_SERVER_ERROR);
                res.body("Internal Server Error");
                ctrl.skip_rest();
            }
        }
    }
}

/// ## Summary
/// Middleware handler for authentication.
/// Use this as a handler in routes to protect them with authentication.
pub struct AuthMiddleware;
