use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use uuid::Uuid;

use crate::db::schema;

// Re-export the column enums for public API
pub use crate::db::enums::{Privacy, RecurrenceRule};

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Identifiable, Queryable, Selectable, Associations,
)]
#[diesel(table_name = schema::event)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(crate::model::user::User, foreign_key = creator_id))]
pub struct Event {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub privacy: Privacy,
    pub recurrence: RecurrenceRule,
    pub next_occurrence: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::event)]
pub struct NewEvent<'a> {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub privacy: Privacy,
    pub recurrence: RecurrenceRule,
    pub next_occurrence: Option<DateTime<Utc>>,
}

/// Partial event update; `None` fields are left untouched. Doubled `Option`s
/// allow clearing the nullable columns.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = schema::event)]
pub struct EventChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<Option<&'a str>>,
    pub location: Option<Option<&'a str>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub privacy: Option<Privacy>,
    pub recurrence: Option<RecurrenceRule>,
    pub next_occurrence: Option<Option<DateTime<Utc>>>,
}
