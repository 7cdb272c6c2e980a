mod app_specific;
mod categories;
mod events;
mod friends;
mod respond;
mod users;

use salvo::Router;

use crate::middleware::auth::AuthMiddleware;

// Re-export route constants from core
pub use mingle_core::constants::{
    API_ROUTE_COMPONENT, API_ROUTE_PREFIX, APP_ROUTE_COMPONENT, APP_ROUTE_PREFIX,
    CATEGORIES_ROUTE_COMPONENT, CATEGORIES_ROUTE_PREFIX, EVENTS_ROUTE_COMPONENT,
    EVENTS_ROUTE_PREFIX, FRIENDS_ROUTE_COMPONENT, FRIENDS_ROUTE_PREFIX, USERS_ROUTE_COMPONENT,
    USERS_ROUTE_PREFIX,
};

/// ## Summary
/// Constructs the main API router with all feature handlers.
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .hoop(AuthMiddleware)
        .push(app_specific::routes())
        .push(users::routes())
        .push(events::routes())
        .push(friends::routes())
        .push(categories::routes())
}

/// Deserializer for doubled `Option` fields: an absent field stays `None`
/// ("leave alone") while an explicit JSON `null` becomes `Some(None)`
/// ("clear the stored value").
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}
