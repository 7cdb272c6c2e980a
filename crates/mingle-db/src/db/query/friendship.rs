//! Query composition for `friendship` table operations.
//!
//! A friendship edge is directed (requester → recipient). The service layer
//! keeps mirrored pairs in the same status; these helpers only address single
//! edges or join through them.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::enums::FriendshipStatus;
use crate::db::schema::{friendship, user};
use crate::model::friendship::{Friendship, NewFriendship};
use crate::model::user::User;

/// Returns a query for all friendship edges (unfiltered).
#[must_use]
pub fn all() -> friendship::BoxedQuery<'static, diesel::pg::Pg> {
    friendship::table.into_boxed()
}

/// Returns a query for one directed edge requester → recipient.
#[must_use]
pub fn edge(
    requester_id: Uuid,
    recipient_id: Uuid,
) -> friendship::BoxedQuery<'static, diesel::pg::Pg> {
    all()
        .filter(friendship::requester_id.eq(requester_id))
        .filter(friendship::recipient_id.eq(recipient_id))
}

/// Returns a query for edges sent by a user.
#[must_use]
pub fn by_requester(requester_id: Uuid) -> friendship::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(friendship::requester_id.eq(requester_id))
}

/// Returns a query for edges addressed to a user.
#[must_use]
pub fn by_recipient(recipient_id: Uuid) -> friendship::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(friendship::recipient_id.eq(recipient_id))
}

/// Returns a query for edges addressed to a user in a given status, newest
/// request first.
#[must_use]
pub fn by_recipient_with_status(
    recipient_id: Uuid,
    status: FriendshipStatus,
) -> friendship::BoxedQuery<'static, diesel::pg::Pg> {
    by_recipient(recipient_id)
        .filter(friendship::status.eq(status))
        .order(friendship::requested_at.desc())
}

/// Returns a query for edges sent by a user in a given status, newest request
/// first.
#[must_use]
pub fn by_requester_with_status(
    requester_id: Uuid,
    status: FriendshipStatus,
) -> friendship::BoxedQuery<'static, diesel::pg::Pg> {
    by_requester(requester_id)
        .filter(friendship::status.eq(status))
        .order(friendship::requested_at.desc())
}

/// ## Summary
/// Inserts a friendship edge and returns the stored row.
///
/// ## Errors
/// Returns a database error if the insert fails, including the unique
/// violation on (requester, recipient).
pub async fn insert_friendship(
    conn: &mut DbConnection<'_>,
    new_friendship: &NewFriendship,
) -> Result<Friendship, diesel::result::Error> {
    diesel::insert_into(friendship::table)
        .values(new_friendship)
        .returning(Friendship::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Sets the status and response timestamp of one edge and returns the
/// updated row.
///
/// ## Errors
/// Returns a database error if the update fails or the edge does not exist.
pub async fn update_status(
    conn: &mut DbConnection<'_>,
    id: Uuid,
    status: FriendshipStatus,
    responded_at: DateTime<Utc>,
) -> Result<Friendship, diesel::result::Error> {
    diesel::update(friendship::table.filter(friendship::id.eq(id)))
        .set((
            friendship::status.eq(status),
            friendship::responded_at.eq(responded_at),
        ))
        .returning(Friendship::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Loads the users on the far end of a user's accepted edges.
///
/// Acceptance always mirrors both directions, so scanning the requester side
/// alone sees every friend.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn accepted_peers(
    conn: &mut DbConnection<'_>,
    user_id: Uuid,
) -> Result<Vec<User>, diesel::result::Error> {
    friendship::table
        .inner_join(user::table.on(user::id.eq(friendship::recipient_id)))
        .filter(friendship::requester_id.eq(user_id))
        .filter(friendship::status.eq(FriendshipStatus::Accepted))
        .order(user::username.asc())
        .select(User::as_select())
        .load(conn)
        .await
}
