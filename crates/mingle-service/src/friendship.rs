//! Friend request lifecycle.
//!
//! A friendship is stored as two directed edges (requester → recipient and
//! back). Sending a request creates only the forward edge; deciding it
//! touches both edges in one transaction so the pair can never diverge.
//! `cancelled` is not a terminal state: a cancelled request may be decided
//! again later.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Deserialize;
use uuid::Uuid;

use mingle_db::db::connection::DbConnection;
use mingle_db::db::enums::FriendshipStatus;
use mingle_db::db::query::{friendship, user};
use mingle_db::model::friendship::{Friendship, NewFriendship};
use mingle_db::model::user::User;

use crate::error::{ServiceError, ServiceResult};

/// A recipient's verdict on a pending (or cancelled) friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipDecision {
    Accepted,
    Rejected,
    Cancelled,
}

impl FriendshipDecision {
    /// The edge status this decision resolves to.
    #[must_use]
    pub const fn status(self) -> FriendshipStatus {
        match self {
            Self::Accepted => FriendshipStatus::Accepted,
            Self::Rejected => FriendshipStatus::Rejected,
            Self::Cancelled => FriendshipStatus::Cancelled,
        }
    }
}

/// ## Summary
/// Creates a pending friend request from `requester_id` to `recipient_id`.
///
/// ## Side Effects
/// - Inserts the forward edge in `pending` status. The reverse edge is not
///   created until the request is decided.
///
/// ## Errors
/// - `SelfRequest` if both sides are the same user.
/// - `NotFound` if the recipient does not exist.
/// - `DuplicateRequest` if the forward edge already exists in any status,
///   including when a concurrent insert wins the unique constraint race.
pub async fn send_request(
    conn: &mut DbConnection<'_>,
    requester_id: Uuid,
    recipient_id: Uuid,
) -> ServiceResult<Friendship> {
    if requester_id == recipient_id {
        return Err(ServiceError::SelfRequest);
    }

    conn.transaction::<Friendship, ServiceError, _>(move |conn| {
        async move {
            let recipient: Option<User> = user::by_id(recipient_id).first(conn).await.optional()?;
            if recipient.is_none() {
                return Err(ServiceError::NotFound(format!(
                    "User {recipient_id} not found"
                )));
            }

            let existing: Option<Friendship> = friendship::edge(requester_id, recipient_id)
                .first(conn)
                .await
                .optional()?;
            if existing.is_some() {
                return Err(ServiceError::DuplicateRequest);
            }

            let new_edge = NewFriendship {
                id: Uuid::now_v7(),
                requester_id,
                recipient_id,
                status: FriendshipStatus::Pending,
                responded_at: None,
            };

            match friendship::insert_friendship(conn, &new_edge).await {
                Ok(edge) => {
                    tracing::debug!(
                        requester_id = %requester_id,
                        recipient_id = %recipient_id,
                        "Friend request created"
                    );
                    Ok(edge)
                }
                Err(diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                )) => Err(ServiceError::DuplicateRequest),
                Err(error) => Err(ServiceError::from(error)),
            }
        }
        .scope_boxed()
    })
    .await
}

/// ## Summary
/// Applies the recipient's decision to the request `requester_id` →
/// `recipient_id` and returns the updated forward edge.
///
/// ## Side Effects
/// - Sets the forward edge to the decided status and stamps `responded_at`.
/// - Mirrors the status onto the reverse edge, creating it directly in the
///   decided status when it does not exist yet. Both writes share one
///   transaction, so no partially mirrored pair can be observed.
///
/// ## Errors
/// - `RequestNotFound` if the forward edge does not exist.
/// - `AlreadyFinalized` if the forward edge is already accepted or rejected.
pub async fn respond_to_request(
    conn: &mut DbConnection<'_>,
    requester_id: Uuid,
    recipient_id: Uuid,
    decision: FriendshipDecision,
) -> ServiceResult<Friendship> {
    conn.transaction::<Friendship, ServiceError, _>(move |conn| {
        async move {
            let forward: Option<Friendship> = friendship::edge(requester_id, recipient_id)
                .first(conn)
                .await
                .optional()?;
            let Some(forward) = forward else {
                return Err(ServiceError::RequestNotFound);
            };
            ensure_respondable(forward.status)?;

            let now = Utc::now();
            let updated =
                friendship::update_status(conn, forward.id, decision.status(), now).await?;

            let reverse: Option<Friendship> = friendship::edge(recipient_id, requester_id)
                .first(conn)
                .await
                .optional()?;
            match reverse {
                Some(edge) => {
                    friendship::update_status(conn, edge.id, decision.status(), now).await?;
                }
                None => {
                    let mirror = NewFriendship {
                        id: Uuid::now_v7(),
                        requester_id: recipient_id,
                        recipient_id: requester_id,
                        status: decision.status(),
                        responded_at: Some(now),
                    };
                    friendship::insert_friendship(conn, &mirror).await?;
                }
            }

            tracing::debug!(
                requester_id = %requester_id,
                recipient_id = %recipient_id,
                status = %updated.status,
                "Friend request decided"
            );
            Ok(updated)
        }
        .scope_boxed()
    })
    .await
}

/// ## Summary
/// Cancels a request the requester sent, before the recipient settles it.
///
/// ## Side Effects
/// - Sets the forward edge to `cancelled` and stamps `responded_at`. An
///   existing reverse edge is mirrored; unlike a recipient decision, a
///   missing reverse edge is not created.
///
/// ## Errors
/// - `RequestNotFound` if the forward edge does not exist.
/// - `AlreadyFinalized` if the request is already accepted or rejected.
pub async fn cancel_request(
    conn: &mut DbConnection<'_>,
    requester_id: Uuid,
    recipient_id: Uuid,
) -> ServiceResult<Friendship> {
    conn.transaction::<Friendship, ServiceError, _>(move |conn| {
        async move {
            let forward: Option<Friendship> = friendship::edge(requester_id, recipient_id)
                .first(conn)
                .await
                .optional()?;
            let Some(forward) = forward else {
                return Err(ServiceError::RequestNotFound);
            };
            ensure_respondable(forward.status)?;

            let now = Utc::now();
            let updated =
                friendship::update_status(conn, forward.id, FriendshipStatus::Cancelled, now)
                    .await?;

            let reverse: Option<Friendship> = friendship::edge(recipient_id, requester_id)
                .first(conn)
                .await
                .optional()?;
            if let Some(edge) = reverse {
                friendship::update_status(conn, edge.id, FriendshipStatus::Cancelled, now).await?;
            }

            tracing::debug!(
                requester_id = %requester_id,
                recipient_id = %recipient_id,
                "Friend request cancelled"
            );
            Ok(updated)
        }
        .scope_boxed()
    })
    .await
}

/// Lists the accepted friends of a user, ordered by username.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn friends_of(conn: &mut DbConnection<'_>, user_id: Uuid) -> ServiceResult<Vec<User>> {
    Ok(friendship::accepted_peers(conn, user_id).await?)
}

/// Lists pending requests addressed to a user, newest first.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn incoming_requests(
    conn: &mut DbConnection<'_>,
    user_id: Uuid,
) -> ServiceResult<Vec<Friendship>> {
    let edges = friendship::by_recipient_with_status(user_id, FriendshipStatus::Pending)
        .load(conn)
        .await?;
    Ok(edges)
}

/// Lists pending requests a user has sent, newest first.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn outgoing_requests(
    conn: &mut DbConnection<'_>,
    user_id: Uuid,
) -> ServiceResult<Vec<Friendship>> {
    let edges = friendship::by_requester_with_status(user_id, FriendshipStatus::Pending)
        .load(conn)
        .await?;
    Ok(edges)
}

/// Accepted and rejected edges are settled; pending and cancelled edges may
/// still be decided.
fn ensure_respondable(status: FriendshipStatus) -> ServiceResult<()> {
    match status {
        FriendshipStatus::Accepted | FriendshipStatus::Rejected => {
            Err(ServiceError::AlreadyFinalized)
        }
        FriendshipStatus::Pending | FriendshipStatus::Cancelled => Ok(()),
    }
}
