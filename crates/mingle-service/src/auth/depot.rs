//! Helpers for the per-request principal stored in the Salvo depot.
//!
//! The auth middleware resolves the request's credentials once and stores the
//! outcome under a fixed depot key; handlers pull it back out through these
//! helpers instead of re-reading headers.

use mingle_db::model::user::User;

use crate::error::{ServiceError, ServiceResult};

pub mod depot_keys {
    pub const AUTHENTICATED_USER: &str = "__authenticated_user";
}

/// The principal a request acts as.
#[derive(Debug, Clone)]
pub enum CurrentUser {
    /// A user with verified credentials.
    User(User),
    /// No (valid) credentials were presented.
    Public,
}

/// Get the authenticated user from the depot.
///
/// ## Errors
///
/// Returns `NotAuthenticated` if no user is found in the depot or if the
/// request is public.
pub fn get_user_from_depot(depot: &salvo::Depot) -> ServiceResult<&User> {
    let current_user = depot
        .get::<CurrentUser>(depot_keys::AUTHENTICATED_USER)
        .map_err(|_e| ServiceError::NotAuthenticated)?;

    match current_user {
        CurrentUser::User(user) => Ok(user),
        CurrentUser::Public => Err(ServiceError::NotAuthenticated),
    }
}

/// Check if the request is from an authenticated user (not public).
#[must_use]
pub fn is_authenticated(depot: &salvo::Depot) -> bool {
    depot
        .get::<CurrentUser>(depot_keys::AUTHENTICATED_USER)
        .is_ok_and(|u| matches!(u, CurrentUser::User(_)))
}
