use diesel_async::RunQueryDsl;
use salvo::{Depot, Response, Router, handler, http::StatusCode};
use tracing::error;

use crate::db_handler::get_db_from_depot;

/// ## Summary
/// GET /api/app/healthcheck - Liveness probe. Round-trips the database so a
/// healthy answer means the pool is actually usable, not just that the
/// process is up.
#[handler]
async fn healthcheck_handler(depot: &mut Depot, res: &mut Response) {
    let provider = match get_db_from_depot(depot) {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to get database provider");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render("Internal Server Error");
            return;
        }
    };

    let mut conn = match provider.get_connection().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "Healthcheck could not get a database connection");
            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            res.render("Database unavailable");
            return;
        }
    };

    match diesel::sql_query("SELECT 1").execute(&mut conn).await {
        Ok(_) => res.render("OK"),
        Err(e) => {
            error!(error = ?e, "Healthcheck database round-trip failed");
            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            res.render("Database unavailable");
        }
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("healthcheck").get(healthcheck_handler)
}
