//! Account lifecycle: registration, login, profile upkeep.

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use mingle_db::db::connection::DbConnection;
use mingle_db::db::query::user;
use mingle_db::db::schema;
use mingle_db::model::user::{NewUser, User, UserChanges};

use crate::auth::password::{hash_password, verify_password};
use crate::error::{ServiceError, ServiceResult};

/// Character limits matching the column widths.
const MAX_USERNAME_CHARS: usize = 45;
const MAX_EMAIL_CHARS: usize = 60;
const MIN_PASSWORD_CHARS: usize = 8;

/// Context for account registration.
pub struct RegisterUserContext {
    pub username: String,
    pub email: String,
    pub password: String,
    pub birthday: Option<NaiveDate>,
}

/// Context for a partial profile update.
///
/// The doubled `Option` on `birthday` distinguishes "leave alone" from
/// "set NULL".
#[derive(Default)]
pub struct UpdateProfileContext {
    pub username: Option<String>,
    pub email: Option<String>,
    pub birthday: Option<Option<NaiveDate>>,
}

/// ## Summary
/// Registers a new account with a hashed password.
///
/// ## Side Effects
/// - Inserts a user row in active state.
///
/// ## Errors
/// - `ValidationError` if username, email, or password is malformed.
/// - `Conflict` if the username or email is already registered, including
///   when a concurrent insert wins the unique constraint race.
pub async fn register(conn: &mut DbConnection<'_>, ctx: &RegisterUserContext) -> ServiceResult<User> {
    validate_username(&ctx.username)?;
    validate_email(&ctx.email)?;
    validate_password(&ctx.password)?;

    // Hash outside the transaction; Argon2 is deliberately slow.
    let password_hash = hash_password(&ctx.password)?;
    let username = ctx.username.clone();
    let email = ctx.email.clone();
    let birthday = ctx.birthday;

    conn.transaction::<User, ServiceError, _>(move |conn| {
        async move {
            let username_taken: Option<User> = user::by_username(&username)
                .first(conn)
                .await
                .optional()?;
            if username_taken.is_some() {
                return Err(ServiceError::Conflict("Username already taken".to_string()));
            }

            let email_taken: Option<User> = user::by_email(&email).first(conn).await.optional()?;
            if email_taken.is_some() {
                return Err(ServiceError::Conflict("Email already registered".to_string()));
            }

            let new_user = NewUser {
                id: Uuid::now_v7(),
                username: &username,
                email: &email,
                password_hash: &password_hash,
                birthday,
            };

            match user::insert_user(conn, &new_user).await {
                Ok(created) => {
                    tracing::info!(
                        user_id = %created.id,
                        username = %created.username,
                        "User registered"
                    );
                    Ok(created)
                }
                Err(diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                )) => Err(ServiceError::Conflict(
                    "Username or email already taken".to_string(),
                )),
                Err(error) => Err(ServiceError::from(error)),
            }
        }
        .scope_boxed()
    })
    .await
}

/// ## Summary
/// Verifies a username/password pair and stamps the login time.
///
/// ## Side Effects
/// - Updates `last_login` on success.
///
/// ## Errors
/// Returns `NotAuthenticated` for unknown usernames, wrong passwords, and
/// deactivated accounts alike; the caller cannot tell which.
pub async fn login(
    conn: &mut DbConnection<'_>,
    username: &str,
    password: &str,
) -> ServiceResult<User> {
    let found: Option<User> = user::by_username(username).first(conn).await.optional()?;
    let found = found.ok_or(ServiceError::NotAuthenticated)?;

    verify_password(password, &found.password_hash)?;
    if !found.is_active {
        return Err(ServiceError::NotAuthenticated);
    }

    let stamped = user::update_last_login(conn, found.id, Utc::now()).await?;
    tracing::debug!(user_id = %stamped.id, "User logged in");
    Ok(stamped)
}

/// Loads a user by ID.
///
/// ## Errors
/// Returns `NotFound` if no such user exists.
pub async fn get_user(conn: &mut DbConnection<'_>, user_id: Uuid) -> ServiceResult<User> {
    let found: Option<User> = user::by_id(user_id).first(conn).await.optional()?;
    found.ok_or_else(|| ServiceError::NotFound(format!("User {user_id} not found")))
}

/// Loads a user by username.
///
/// ## Errors
/// Returns `NotFound` if no such user exists.
pub async fn get_by_username(conn: &mut DbConnection<'_>, username: &str) -> ServiceResult<User> {
    let found: Option<User> = user::by_username(username).first(conn).await.optional()?;
    found.ok_or_else(|| ServiceError::NotFound(format!("User '{username}' not found")))
}

/// Lists all accounts, ordered by username.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_users(conn: &mut DbConnection<'_>) -> ServiceResult<Vec<User>> {
    let users = user::all()
        .order(schema::user::username.asc())
        .load(conn)
        .await?;
    Ok(users)
}

/// ## Summary
/// Applies a partial profile update and returns the stored row.
///
/// ## Errors
/// - `ValidationError` if no field is set or a provided field is malformed.
/// - `NotFound` if the user does not exist.
/// - `Conflict` if the new username or email collides with another account.
pub async fn update_profile(
    conn: &mut DbConnection<'_>,
    user_id: Uuid,
    ctx: &UpdateProfileContext,
) -> ServiceResult<User> {
    if ctx.username.is_none() && ctx.email.is_none() && ctx.birthday.is_none() {
        return Err(ServiceError::ValidationError(
            "No profile fields to update".to_string(),
        ));
    }
    if let Some(username) = &ctx.username {
        validate_username(username)?;
    }
    if let Some(email) = &ctx.email {
        validate_email(email)?;
    }

    let changes = UserChanges {
        username: ctx.username.as_deref(),
        email: ctx.email.as_deref(),
        birthday: ctx.birthday,
        is_active: None,
    };

    user::update_profile(conn, user_id, &changes)
        .await
        .map_err(|error| map_profile_error(user_id, error))
}

/// ## Summary
/// Replaces a user's password after verifying the current one.
///
/// ## Errors
/// - `NotFound` if the user does not exist.
/// - `NotAuthenticated` if the current password does not match.
/// - `ValidationError` if the new password is too short.
pub async fn change_password(
    conn: &mut DbConnection<'_>,
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
) -> ServiceResult<()> {
    validate_password(new_password)?;

    let found = get_user(conn, user_id).await?;
    verify_password(current_password, &found.password_hash)?;

    let password_hash = hash_password(new_password)?;
    user::update_password(conn, user_id, &password_hash).await?;

    tracing::info!(user_id = %user_id, "Password changed");
    Ok(())
}

/// ## Summary
/// Deactivates an account. The row is kept so friendships and events stay
/// intact, but the account can no longer authenticate.
///
/// ## Errors
/// Returns `NotFound` if the user does not exist.
pub async fn deactivate(conn: &mut DbConnection<'_>, user_id: Uuid) -> ServiceResult<User> {
    let changes = UserChanges {
        is_active: Some(false),
        ..UserChanges::default()
    };

    let updated = user::update_profile(conn, user_id, &changes)
        .await
        .map_err(|error| map_profile_error(user_id, error))?;

    tracing::info!(user_id = %user_id, "Account deactivated");
    Ok(updated)
}

fn map_profile_error(user_id: Uuid, error: diesel::result::Error) -> ServiceError {
    match error {
        diesel::result::Error::NotFound => {
            ServiceError::NotFound(format!("User {user_id} not found"))
        }
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ) => ServiceError::Conflict("Username or email already taken".to_string()),
        other => ServiceError::from(other),
    }
}

fn validate_username(username: &str) -> ServiceResult<()> {
    if username.is_empty() {
        return Err(ServiceError::ValidationError(
            "Username must not be empty".to_string(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(ServiceError::ValidationError(format!(
            "Username must be at most {MAX_USERNAME_CHARS} characters"
        )));
    }
    // A colon could not round-trip through Basic credentials.
    if username.contains(':') || username.contains(char::is_whitespace) {
        return Err(ServiceError::ValidationError(
            "Username must not contain whitespace or ':'".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> ServiceResult<()> {
    if email.chars().count() > MAX_EMAIL_CHARS {
        return Err(ServiceError::ValidationError(format!(
            "Email must be at most {MAX_EMAIL_CHARS} characters"
        )));
    }
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !well_formed {
        return Err(ServiceError::ValidationError(
            "Email address is malformed".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ServiceError::ValidationError(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}
