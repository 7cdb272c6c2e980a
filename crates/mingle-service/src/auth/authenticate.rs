use base64::{Engine as _, engine::general_purpose::STANDARD};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use mingle_db::db::connection::DbConnection;
use mingle_db::db::query::user;
use mingle_db::model::user::User;

use crate::auth::password::verify_password;
use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Authenticates a request from its `Authorization: Basic` header.
///
/// The credential's username is looked up, the password is verified against
/// the stored hash, and deactivated accounts are turned away.
///
/// ## Errors
/// Returns `NotAuthenticated` when the header is missing or malformed, the
/// user is unknown, the password does not match, or the account is inactive.
#[tracing::instrument(skip(req, conn))]
pub async fn authenticate(
    req: &salvo::Request,
    conn: &mut DbConnection<'_>,
) -> ServiceResult<User> {
    let (username, password) = basic_credentials(req)?;

    let found = user::by_username(&username)
        .first::<User>(conn)
        .await
        .optional()?
        .ok_or(ServiceError::NotAuthenticated)?;

    verify_password(&password, &found.password_hash)?;

    if !found.is_active {
        tracing::debug!(user_id = %found.id, "Rejected login for deactivated account");
        return Err(ServiceError::NotAuthenticated);
    }

    tracing::trace!(user_id = %found.id, "Request authenticated");
    Ok(found)
}

/// Extracts a `username:password` pair from the Basic authorization header.
fn basic_credentials(req: &salvo::Request) -> ServiceResult<(String, String)> {
    let header = req
        .headers()
        .get(salvo::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ServiceError::NotAuthenticated)?;

    let encoded = header
        .strip_prefix("Basic ")
        .ok_or(ServiceError::NotAuthenticated)?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_e| ServiceError::NotAuthenticated)?;
    let decoded = String::from_utf8(decoded).map_err(|_e| ServiceError::NotAuthenticated)?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or(ServiceError::NotAuthenticated)?;
    Ok((username.to_string(), password.to_string()))
}
