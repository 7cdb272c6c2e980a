//! Event participation: joining, roster management, leaving.
//!
//! Joining a public event seats the user as accepted immediately; joining a
//! private one parks them as pending until the host accepts. The creator's
//! host row is protected: it can only disappear with the event itself.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use mingle_db::db::connection::DbConnection;
use mingle_db::db::enums::{ParticipantRole, ParticipantStatus, Privacy};
use mingle_db::db::query::{event, participant};
use mingle_db::model::event::Event;
use mingle_db::model::participant::{NewParticipant, Participant};
use mingle_db::model::user::User;

use crate::error::{ServiceError, ServiceResult};
use crate::event::{ensure_creator, get_visible_event};

/// ## Summary
/// Adds a user to an event's roster as a member.
///
/// ## Side Effects
/// - Inserts the roster row: `accepted` for public events, `pending` for
///   private ones.
///
/// ## Errors
/// - `NotFound` if the event does not exist.
/// - `Conflict` if the user already participates.
pub async fn join_event(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    user_id: Uuid,
) -> ServiceResult<Participant> {
    let found: Option<Event> = event::by_id(event_id).first(conn).await.optional()?;
    let Some(found) = found else {
        return Err(ServiceError::NotFound(format!("Event {event_id} not found")));
    };

    let new_participant = NewParticipant {
        event_id,
        user_id,
        role: ParticipantRole::Member,
        status: joining_status(found.privacy),
        responded_at: Utc::now(),
    };

    match participant::insert_participant(conn, &new_participant).await {
        Ok(joined) => {
            tracing::debug!(
                event_id = %event_id,
                user_id = %user_id,
                status = %joined.status,
                "User joined event"
            );
            Ok(joined)
        }
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => Err(ServiceError::Conflict(
            "Already participating in this event".to_string(),
        )),
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::ForeignKeyViolation,
            _,
        )) => Err(ServiceError::NotFound(format!("Event {event_id} not found"))),
        Err(error) => Err(ServiceError::from(error)),
    }
}

/// ## Summary
/// Sets the participation status of a roster row, host-side.
///
/// ## Errors
/// - `NotFound` if the event or the roster row does not exist.
/// - `AuthorizationError` if the actor is not the event's creator.
pub async fn set_participant_status(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    target_user_id: Uuid,
    status: ParticipantStatus,
    actor_id: Uuid,
) -> ServiceResult<Participant> {
    let found: Option<Event> = event::by_id(event_id).first(conn).await.optional()?;
    let Some(found) = found else {
        return Err(ServiceError::NotFound(format!("Event {event_id} not found")));
    };
    ensure_creator(&found, actor_id)?;

    let updated = participant::update_status(conn, event_id, target_user_id, status, Utc::now())
        .await
        .map_err(|error| match error {
            diesel::result::Error::NotFound => ServiceError::NotFound(
                "User is not participating in this event".to_string(),
            ),
            other => ServiceError::from(other),
        })?;

    tracing::debug!(
        event_id = %event_id,
        user_id = %target_user_id,
        status = %updated.status,
        "Participation status changed"
    );
    Ok(updated)
}

/// ## Summary
/// Removes a roster row: a participant leaving, or the host removing someone.
///
/// ## Errors
/// - `NotFound` if the event or the roster row does not exist.
/// - `AuthorizationError` if the actor is neither the target nor the host.
/// - `Conflict` when targeting the creator's own host row; the event must be
///   deleted instead.
pub async fn leave_event(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    target_user_id: Uuid,
    actor_id: Uuid,
) -> ServiceResult<()> {
    let found: Option<Event> = event::by_id(event_id).first(conn).await.optional()?;
    let Some(found) = found else {
        return Err(ServiceError::NotFound(format!("Event {event_id} not found")));
    };
    ensure_may_remove(&found, target_user_id, actor_id)?;

    let deleted = participant::delete_participant(conn, event_id, target_user_id).await?;
    if deleted == 0 {
        return Err(ServiceError::NotFound(
            "User is not participating in this event".to_string(),
        ));
    }

    tracing::debug!(
        event_id = %event_id,
        user_id = %target_user_id,
        "User removed from event"
    );
    Ok(())
}

/// Loads an event's roster with the account behind each row, for a viewer
/// who may see the event.
///
/// ## Errors
/// Returns `NotFound` under the event visibility rules.
pub async fn participants_of_event(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    viewer_id: Uuid,
) -> ServiceResult<Vec<(Participant, User)>> {
    get_visible_event(conn, event_id, viewer_id).await?;
    Ok(participant::roster_for_event(conn, event_id).await?)
}

/// Lists the events a user participates in, soonest first.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn events_joined_by(
    conn: &mut DbConnection<'_>,
    user_id: Uuid,
) -> ServiceResult<Vec<Event>> {
    Ok(participant::events_for_user(conn, user_id).await?)
}

const fn joining_status(privacy: Privacy) -> ParticipantStatus {
    match privacy {
        Privacy::Public => ParticipantStatus::Accepted,
        Privacy::Private => ParticipantStatus::Pending,
    }
}

fn ensure_may_remove(event: &Event, target_user_id: Uuid, actor_id: Uuid) -> ServiceResult<()> {
    if target_user_id == event.creator_id {
        return Err(ServiceError::Conflict(
            "The host cannot leave their own event".to_string(),
        ));
    }
    if actor_id == target_user_id || actor_id == event.creator_id {
        Ok(())
    } else {
        Err(ServiceError::AuthorizationError(
            "Only the participant or the event host can remove a participant".to_string(),
        ))
    }
}
