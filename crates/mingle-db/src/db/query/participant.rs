//! Query composition for `event_participant` table operations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::enums::ParticipantStatus;
use crate::db::schema::{event, event_participant, user};
use crate::model::event::Event;
use crate::model::participant::{NewParticipant, Participant};
use crate::model::user::User;

/// Returns a query for all roster rows (unfiltered).
#[must_use]
pub fn all() -> event_participant::BoxedQuery<'static, diesel::pg::Pg> {
    event_participant::table.into_boxed()
}

/// Returns a query for one roster row by its composite key.
#[must_use]
pub fn by_key(
    event_id: Uuid,
    user_id: Uuid,
) -> event_participant::BoxedQuery<'static, diesel::pg::Pg> {
    all()
        .filter(event_participant::event_id.eq(event_id))
        .filter(event_participant::user_id.eq(user_id))
}

/// Returns a query for the roster of an event.
#[must_use]
pub fn by_event(event_id: Uuid) -> event_participant::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(event_participant::event_id.eq(event_id))
}

/// Returns a query for a user's roster rows across events.
#[must_use]
pub fn by_user(user_id: Uuid) -> event_participant::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(event_participant::user_id.eq(user_id))
}

/// ## Summary
/// Inserts a roster row and returns the stored row.
///
/// ## Errors
/// Returns a database error if the insert fails, including the primary-key
/// violation when the user already participates.
pub async fn insert_participant(
    conn: &mut DbConnection<'_>,
    new_participant: &NewParticipant,
) -> Result<Participant, diesel::result::Error> {
    diesel::insert_into(event_participant::table)
        .values(new_participant)
        .returning(Participant::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Sets the participation status and response timestamp of a roster row and
/// returns the updated row.
///
/// ## Errors
/// Returns a database error if the update fails or the row does not exist.
pub async fn update_status(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    user_id: Uuid,
    status: ParticipantStatus,
    responded_at: DateTime<Utc>,
) -> Result<Participant, diesel::result::Error> {
    diesel::update(
        event_participant::table
            .filter(event_participant::event_id.eq(event_id))
            .filter(event_participant::user_id.eq(user_id)),
    )
    .set((
        event_participant::status.eq(status),
        event_participant::responded_at.eq(responded_at),
    ))
    .returning(Participant::as_returning())
    .get_result(conn)
    .await
}

/// ## Summary
/// Removes a roster row.
///
/// ## Errors
/// Returns a database error if the delete fails.
pub async fn delete_participant(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<usize, diesel::result::Error> {
    diesel::delete(
        event_participant::table
            .filter(event_participant::event_id.eq(event_id))
            .filter(event_participant::user_id.eq(user_id)),
    )
    .execute(conn)
    .await
}

/// ## Summary
/// Loads an event's roster together with the account behind each row, hosts
/// first, then alphabetical by username.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn roster_for_event(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
) -> Result<Vec<(Participant, User)>, diesel::result::Error> {
    event_participant::table
        .inner_join(user::table)
        .filter(event_participant::event_id.eq(event_id))
        .order((event_participant::role.asc(), user::username.asc()))
        .select((Participant::as_select(), User::as_select()))
        .load(conn)
        .await
}

/// ## Summary
/// Loads the events a user participates in, soonest first.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn events_for_user(
    conn: &mut DbConnection<'_>,
    user_id: Uuid,
) -> Result<Vec<Event>, diesel::result::Error> {
    event_participant::table
        .inner_join(event::table)
        .filter(event_participant::user_id.eq(user_id))
        .order(event::starts_at.asc())
        .select(Event::as_select())
        .load(conn)
        .await
}
