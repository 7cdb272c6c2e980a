use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use uuid::Uuid;

use crate::db::schema;

// Re-export the roster enums for public API
pub use crate::db::enums::{ParticipantRole, ParticipantStatus};

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Identifiable, Queryable, Selectable, Associations,
)]
#[diesel(table_name = schema::event_participant)]
#[diesel(check_for_backend(Pg))]
#[diesel(primary_key(event_id, user_id))]
#[diesel(belongs_to(crate::model::event::Event, foreign_key = event_id))]
#[diesel(belongs_to(crate::model::user::User, foreign_key = user_id))]
pub struct Participant {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub role: ParticipantRole,
    pub status: ParticipantStatus,
    pub responded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::event_participant)]
pub struct NewParticipant {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub role: ParticipantRole,
    pub status: ParticipantStatus,
    pub responded_at: DateTime<Utc>,
}
