//! Query composition for `user` table operations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::schema::user;
use crate::model::user::{NewUser, User, UserChanges};

/// Returns a query for all users (unfiltered).
#[must_use]
pub fn all() -> user::BoxedQuery<'static, diesel::pg::Pg> {
    user::table.into_boxed()
}

/// Returns a query for a user by ID.
#[must_use]
pub fn by_id(id: Uuid) -> user::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(user::id.eq(id))
}

/// Returns a query for a user by username.
#[must_use]
pub fn by_username(username: &str) -> user::BoxedQuery<'_, diesel::pg::Pg> {
    all().filter(user::username.eq(username))
}

/// Returns a query for a user by email address.
#[must_use]
pub fn by_email(email: &str) -> user::BoxedQuery<'_, diesel::pg::Pg> {
    all().filter(user::email.eq(email))
}

/// ## Summary
/// Inserts a user and returns the stored row.
///
/// ## Errors
/// Returns a database error if the insert fails, including unique violations
/// on username or email.
pub async fn insert_user(
    conn: &mut DbConnection<'_>,
    new_user: &NewUser<'_>,
) -> Result<User, diesel::result::Error> {
    diesel::insert_into(user::table)
        .values(new_user)
        .returning(User::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Stamps the last-login timestamp for a user.
///
/// ## Errors
/// Returns a database error if the update fails or the user does not exist.
pub async fn update_last_login(
    conn: &mut DbConnection<'_>,
    id: Uuid,
    at: DateTime<Utc>,
) -> Result<User, diesel::result::Error> {
    diesel::update(user::table.filter(user::id.eq(id)))
        .set(user::last_login.eq(at))
        .returning(User::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Replaces a user's password hash.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn update_password(
    conn: &mut DbConnection<'_>,
    id: Uuid,
    password_hash: &str,
) -> Result<usize, diesel::result::Error> {
    diesel::update(user::table.filter(user::id.eq(id)))
        .set(user::password_hash.eq(password_hash))
        .execute(conn)
        .await
}

/// ## Summary
/// Applies a partial profile update and returns the stored row.
///
/// The caller must ensure at least one field is set; an empty changeset is a
/// diesel query-builder error.
///
/// ## Errors
/// Returns a database error if the update fails, including unique violations
/// on username or email.
pub async fn update_profile(
    conn: &mut DbConnection<'_>,
    id: Uuid,
    changes: &UserChanges<'_>,
) -> Result<User, diesel::result::Error> {
    diesel::update(user::table.filter(user::id.eq(id)))
        .set(changes)
        .returning(User::as_returning())
        .get_result(conn)
        .await
}
