use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use uuid::Uuid;

use crate::db::schema;

// Re-export the status enum for public API
pub use crate::db::enums::FriendshipStatus;

/// One directed friendship edge (requester → recipient). A mutual
/// relationship is represented by two rows, one per direction, kept in the
/// same status by the service layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Identifiable, Queryable, Selectable)]
#[diesel(table_name = schema::friendship)]
#[diesel(check_for_backend(Pg))]
pub struct Friendship {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    pub status: FriendshipStatus,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::friendship)]
pub struct NewFriendship {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    pub status: FriendshipStatus,
    pub responded_at: Option<DateTime<Utc>>,
}
