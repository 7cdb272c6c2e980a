use salvo::Router;

use mingle_core::constants::APP_ROUTE_COMPONENT;

pub mod healthcheck;
pub mod whoami;

#[must_use]
pub fn routes() -> Router {
    Router::with_path(APP_ROUTE_COMPONENT)
        .push(healthcheck::routes())
        .push(whoami::routes())
}
