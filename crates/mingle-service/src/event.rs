//! Event lifecycle and occurrence queries.
//!
//! Creating an event also seats its creator on the roster as accepted host,
//! in the same transaction. Visibility is privacy-based: public events are
//! readable by anyone authenticated, private ones only by their roster.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use mingle_db::db::connection::DbConnection;
use mingle_db::db::enums::{ParticipantRole, ParticipantStatus, Privacy, RecurrenceRule};
use mingle_db::db::query::{event, participant};
use mingle_db::db::schema;
use mingle_db::model::event::{Event, EventChanges, NewEvent};
use mingle_db::model::participant::{NewParticipant, Participant};

use crate::error::{ServiceError, ServiceResult};
use crate::recurrence::{self, Occurrence};

/// Character limits matching the column widths.
const MAX_NAME_CHARS: usize = 60;
const MAX_TEXT_CHARS: usize = 255;

/// Context for event creation.
pub struct CreateEventContext {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub privacy: Privacy,
    pub recurrence: RecurrenceRule,
}

/// Context for a partial event update.
///
/// Doubled `Option`s on `description` and `location` distinguish "leave
/// alone" from "set NULL".
#[derive(Default)]
pub struct UpdateEventContext {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub privacy: Option<Privacy>,
    pub recurrence: Option<RecurrenceRule>,
}

impl UpdateEventContext {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.starts_at.is_none()
            && self.ends_at.is_none()
            && self.privacy.is_none()
            && self.recurrence.is_none()
    }
}

/// Filters for event listing.
#[derive(Default)]
pub struct ListEventsContext {
    pub creator_id: Option<Uuid>,
    pub recurrence: Option<RecurrenceRule>,
}

/// ## Summary
/// Creates an event and seats the creator as accepted host.
///
/// ## Side Effects
/// - Inserts the event with its next-occurrence anchor precomputed.
/// - Inserts the creator's roster row (`host`/`accepted`). Both inserts share
///   one transaction.
///
/// ## Errors
/// Returns `ValidationError` if the name or texts exceed their limits or the
/// event ends before it starts.
pub async fn create_event(
    conn: &mut DbConnection<'_>,
    creator_id: Uuid,
    ctx: &CreateEventContext,
) -> ServiceResult<Event> {
    validate_name(&ctx.name)?;
    validate_text("Description", ctx.description.as_deref())?;
    validate_text("Location", ctx.location.as_deref())?;
    validate_window(ctx.starts_at, ctx.ends_at)?;

    let name = ctx.name.clone();
    let description = ctx.description.clone();
    let location = ctx.location.clone();
    let starts_at = ctx.starts_at;
    let ends_at = ctx.ends_at;
    let privacy = ctx.privacy;
    let rule = ctx.recurrence;
    let next_occurrence = initial_next_occurrence(rule, starts_at, ends_at);

    conn.transaction::<Event, ServiceError, _>(move |conn| {
        async move {
            let new_event = NewEvent {
                id: Uuid::now_v7(),
                creator_id,
                name: &name,
                description: description.as_deref(),
                location: location.as_deref(),
                starts_at,
                ends_at,
                privacy,
                recurrence: rule,
                next_occurrence,
            };
            let created = event::insert_event(conn, &new_event).await?;

            let host = NewParticipant {
                event_id: created.id,
                user_id: creator_id,
                role: ParticipantRole::Host,
                status: ParticipantStatus::Accepted,
                responded_at: Utc::now(),
            };
            participant::insert_participant(conn, &host).await?;

            tracing::info!(
                event_id = %created.id,
                creator_id = %creator_id,
                "Event created"
            );
            Ok(created)
        }
        .scope_boxed()
    })
    .await
}

/// Loads an event the given user may see.
///
/// ## Errors
/// Returns `NotFound` when the event does not exist, and also when it is
/// private and the user is not on its roster; callers cannot probe for the
/// existence of foreign private events.
pub async fn get_visible_event(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    user_id: Uuid,
) -> ServiceResult<Event> {
    let found: Option<Event> = event::by_id(event_id).first(conn).await.optional()?;
    let Some(found) = found else {
        return Err(ServiceError::NotFound(format!("Event {event_id} not found")));
    };

    if found.privacy == Privacy::Public || found.creator_id == user_id {
        return Ok(found);
    }

    let membership: Option<Participant> = participant::by_key(event_id, user_id)
        .first(conn)
        .await
        .optional()?;
    if membership.is_some() {
        Ok(found)
    } else {
        Err(ServiceError::NotFound(format!("Event {event_id} not found")))
    }
}

/// Lists events visible to a user, optionally narrowed by creator and
/// recurrence rule, soonest first.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_events(
    conn: &mut DbConnection<'_>,
    user_id: Uuid,
    ctx: &ListEventsContext,
) -> ServiceResult<Vec<Event>> {
    let mut query = event::visible_to(user_id);
    if let Some(creator_id) = ctx.creator_id {
        query = query.filter(schema::event::creator_id.eq(creator_id));
    }
    if let Some(rule) = ctx.recurrence {
        query = query.filter(schema::event::recurrence.eq(rule));
    }

    let events = query
        .order(schema::event::starts_at.asc())
        .load(conn)
        .await?;
    Ok(events)
}

/// ## Summary
/// Applies a partial update to an event and returns the stored row.
///
/// The next-occurrence anchor is recomputed from the effective schedule, so
/// changing the start, end, or rule keeps the anchor consistent.
///
/// ## Errors
/// - `ValidationError` if no field is set, a text exceeds its limit, or the
///   effective schedule ends before it starts.
/// - `NotFound` if the event does not exist.
/// - `AuthorizationError` if the actor is not the creator.
pub async fn update_event<'a>(
    conn: &mut DbConnection<'a>,
    event_id: Uuid,
    actor_id: Uuid,
    ctx: &'a UpdateEventContext,
) -> ServiceResult<Event> {
    if ctx.is_empty() {
        return Err(ServiceError::ValidationError(
            "No event fields to update".to_string(),
        ));
    }
    if let Some(name) = &ctx.name {
        validate_name(name)?;
    }
    if let Some(description) = &ctx.description {
        validate_text("Description", description.as_deref())?;
    }
    if let Some(location) = &ctx.location {
        validate_text("Location", location.as_deref())?;
    }

    conn.transaction::<Event, ServiceError, _>(move |conn| {
        async move {
            let found: Option<Event> = event::by_id(event_id).first(conn).await.optional()?;
            let Some(found) = found else {
                return Err(ServiceError::NotFound(format!("Event {event_id} not found")));
            };
            ensure_creator(&found, actor_id)?;

            let starts_at = ctx.starts_at.unwrap_or(found.starts_at);
            let ends_at = ctx.ends_at.unwrap_or(found.ends_at);
            let rule = ctx.recurrence.unwrap_or(found.recurrence);
            validate_window(starts_at, ends_at)?;

            let changes = EventChanges {
                name: ctx.name.as_deref(),
                description: ctx.description.as_ref().map(|d| d.as_deref()),
                location: ctx.location.as_ref().map(|l| l.as_deref()),
                starts_at: ctx.starts_at,
                ends_at: ctx.ends_at,
                privacy: ctx.privacy,
                recurrence: ctx.recurrence,
                next_occurrence: Some(initial_next_occurrence(rule, starts_at, ends_at)),
            };

            let updated = event::update_event(conn, event_id, &changes).await?;
            tracing::debug!(event_id = %event_id, "Event updated");
            Ok(updated)
        }
        .scope_boxed()
    })
    .await
}

/// ## Summary
/// Deletes an event. Roster rows and category links go with it through the
/// foreign-key cascade.
///
/// ## Errors
/// - `NotFound` if the event does not exist.
/// - `AuthorizationError` if the actor is not the creator.
pub async fn delete_event(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    actor_id: Uuid,
) -> ServiceResult<()> {
    let found: Option<Event> = event::by_id(event_id).first(conn).await.optional()?;
    let Some(found) = found else {
        return Err(ServiceError::NotFound(format!("Event {event_id} not found")));
    };
    ensure_creator(&found, actor_id)?;

    event::delete_event(conn, event_id).await?;
    tracing::info!(event_id = %event_id, "Event deleted");
    Ok(())
}

/// ## Summary
/// Expands the instances of an event that overlap `[range_start, range_end]`.
///
/// ## Errors
/// - `ValidationError` if the window ends before it starts.
/// - `NotFound` under the same visibility rules as [`get_visible_event`].
pub async fn occurrences_for_event(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    user_id: Uuid,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> ServiceResult<Vec<Occurrence>> {
    if range_start > range_end {
        return Err(ServiceError::ValidationError(
            "Range must start before it ends".to_string(),
        ));
    }

    let found = get_visible_event(conn, event_id, user_id).await?;
    let occurrences = recurrence::occurrences_in_range(
        found.recurrence,
        Occurrence::from(&found),
        range_start,
        range_end,
    )
    .collect();
    Ok(occurrences)
}

/// ## Summary
/// Finds the first instance starting strictly after `after` and persists it
/// as the event's next-occurrence anchor.
///
/// Exhausted series (a non-recurring event that already started) clear the
/// anchor and return `None`.
///
/// ## Errors
/// Returns `NotFound` under the same visibility rules as
/// [`get_visible_event`].
pub async fn roll_next_occurrence(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    user_id: Uuid,
    after: DateTime<Utc>,
) -> ServiceResult<Option<Occurrence>> {
    let found = get_visible_event(conn, event_id, user_id).await?;
    let next = recurrence::first_after(found.recurrence, Occurrence::from(&found), after);

    let changes = EventChanges {
        next_occurrence: Some(next.map(|occurrence| occurrence.starts_at)),
        ..EventChanges::default()
    };
    event::update_event(conn, event_id, &changes).await?;

    Ok(next)
}

pub(crate) fn ensure_creator(event: &Event, actor_id: Uuid) -> ServiceResult<()> {
    if event.creator_id == actor_id {
        Ok(())
    } else {
        Err(ServiceError::AuthorizationError(
            "Only the event creator can modify this event".to_string(),
        ))
    }
}

fn initial_next_occurrence(
    rule: RecurrenceRule,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let base = Occurrence {
        starts_at,
        ends_at,
        next_occurrence: None,
    };
    recurrence::next_occurrence(rule, &base).map(|occurrence| occurrence.starts_at)
}

fn validate_name(name: &str) -> ServiceResult<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "Event name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ServiceError::ValidationError(format!(
            "Event name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_text(field: &str, value: Option<&str>) -> ServiceResult<()> {
    if value.is_some_and(|text| text.chars().count() > MAX_TEXT_CHARS) {
        return Err(ServiceError::ValidationError(format!(
            "{field} must be at most {MAX_TEXT_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_window(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> ServiceResult<()> {
    if starts_at > ends_at {
        return Err(ServiceError::ValidationError(
            "Event must not end before it starts".to_string(),
        ));
    }
    Ok(())
}
