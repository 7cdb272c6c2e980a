use diesel::{pg::Pg, prelude::*};
use uuid::Uuid;

use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Identifiable, Queryable, Selectable)]
#[diesel(table_name = schema::category)]
#[diesel(check_for_backend(Pg))]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::category)]
pub struct NewCategory<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub description: Option<&'a str>,
}

/// Link row attaching a category to an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = schema::event_category)]
#[diesel(check_for_backend(Pg))]
#[diesel(primary_key(event_id, category_id))]
#[diesel(belongs_to(crate::model::event::Event, foreign_key = event_id))]
#[diesel(belongs_to(Category, foreign_key = category_id))]
pub struct EventCategory {
    pub event_id: Uuid,
    pub category_id: Uuid,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Insertable)]
#[diesel(table_name = schema::event_category)]
pub struct NewEventCategory {
    pub event_id: Uuid,
    pub category_id: Uuid,
}
