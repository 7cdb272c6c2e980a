//! Query composition for `event` table operations.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::enums::Privacy;
use crate::db::schema::{event, event_participant};
use crate::model::event::{Event, EventChanges, NewEvent};

/// Returns a query for all events (unfiltered).
#[must_use]
pub fn all() -> event::BoxedQuery<'static, diesel::pg::Pg> {
    event::table.into_boxed()
}

/// Returns a query for an event by ID.
#[must_use]
pub fn by_id(id: Uuid) -> event::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(event::id.eq(id))
}

/// Returns a query for events created by a user.
#[must_use]
pub fn by_creator(creator_id: Uuid) -> event::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(event::creator_id.eq(creator_id))
}

/// Returns a query for events a user may see: public events plus any event
/// whose roster carries the user. Creators always hold a roster row, so their
/// own private events are included.
#[must_use]
pub fn visible_to(user_id: Uuid) -> event::BoxedQuery<'static, diesel::pg::Pg> {
    let participating = event_participant::table
        .filter(event_participant::user_id.eq(user_id))
        .select(event_participant::event_id);

    all().filter(
        event::privacy
            .eq(Privacy::Public)
            .or(event::id.eq_any(participating)),
    )
}

/// ## Summary
/// Inserts an event and returns the stored row.
///
/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert_event(
    conn: &mut DbConnection<'_>,
    new_event: &NewEvent<'_>,
) -> Result<Event, diesel::result::Error> {
    diesel::insert_into(event::table)
        .values(new_event)
        .returning(Event::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Applies a partial update and returns the stored row.
///
/// The caller must ensure at least one field is set; an empty changeset is a
/// diesel query-builder error.
///
/// ## Errors
/// Returns a database error if the update fails or the event does not exist.
pub async fn update_event(
    conn: &mut DbConnection<'_>,
    id: Uuid,
    changes: &EventChanges<'_>,
) -> Result<Event, diesel::result::Error> {
    diesel::update(event::table.filter(event::id.eq(id)))
        .set(changes)
        .returning(Event::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Deletes an event row. Participant and category links are removed by the
/// foreign-key cascade.
///
/// ## Errors
/// Returns a database error if the delete fails.
pub async fn delete_event(
    conn: &mut DbConnection<'_>,
    id: Uuid,
) -> Result<usize, diesel::result::Error> {
    diesel::delete(event::table.filter(event::id.eq(id)))
        .execute(conn)
        .await
}
