//! Query composition for `category` and `event_category` table operations.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::enums::Privacy;
use crate::db::schema::{category, event, event_category, event_participant};
use crate::model::category::{Category, NewCategory, NewEventCategory};
use crate::model::event::Event;

/// Returns a query for all categories (unfiltered).
#[must_use]
pub fn all() -> category::BoxedQuery<'static, diesel::pg::Pg> {
    category::table.into_boxed()
}

/// Returns a query for a category by ID.
#[must_use]
pub fn by_id(id: Uuid) -> category::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(category::id.eq(id))
}

/// Returns a query for a category by name.
#[must_use]
pub fn by_name(name: &str) -> category::BoxedQuery<'_, diesel::pg::Pg> {
    all().filter(category::name.eq(name))
}

/// Returns a query for one event↔category link row.
#[must_use]
pub fn link(
    event_id: Uuid,
    category_id: Uuid,
) -> event_category::BoxedQuery<'static, diesel::pg::Pg> {
    event_category::table
        .filter(event_category::event_id.eq(event_id))
        .filter(event_category::category_id.eq(category_id))
        .into_boxed()
}

/// ## Summary
/// Inserts a category and returns the stored row.
///
/// ## Errors
/// Returns a database error if the insert fails, including the unique
/// violation on the category name.
pub async fn insert_category(
    conn: &mut DbConnection<'_>,
    new_category: &NewCategory<'_>,
) -> Result<Category, diesel::result::Error> {
    diesel::insert_into(category::table)
        .values(new_category)
        .returning(Category::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Deletes a category row; event links go with it via the cascade.
///
/// ## Errors
/// Returns a database error if the delete fails.
pub async fn delete_category(
    conn: &mut DbConnection<'_>,
    id: Uuid,
) -> Result<usize, diesel::result::Error> {
    diesel::delete(category::table.filter(category::id.eq(id)))
        .execute(conn)
        .await
}

/// ## Summary
/// Attaches a category to an event.
///
/// ## Errors
/// Returns a database error if the insert fails, including the primary-key
/// violation when the link already exists.
pub async fn insert_link(
    conn: &mut DbConnection<'_>,
    new_link: &NewEventCategory,
) -> Result<usize, diesel::result::Error> {
    diesel::insert_into(event_category::table)
        .values(new_link)
        .execute(conn)
        .await
}

/// ## Summary
/// Detaches a category from an event.
///
/// ## Errors
/// Returns a database error if the delete fails.
pub async fn delete_link(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    category_id: Uuid,
) -> Result<usize, diesel::result::Error> {
    diesel::delete(
        event_category::table
            .filter(event_category::event_id.eq(event_id))
            .filter(event_category::category_id.eq(category_id)),
    )
    .execute(conn)
    .await
}

/// ## Summary
/// Loads the categories attached to an event.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn categories_for_event(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
) -> Result<Vec<Category>, diesel::result::Error> {
    event_category::table
        .inner_join(category::table)
        .filter(event_category::event_id.eq(event_id))
        .order(category::name.asc())
        .select(Category::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Loads the events attached to a category that the viewer may see: public
/// events plus any event whose roster carries the viewer.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn events_for_category(
    conn: &mut DbConnection<'_>,
    category_id: Uuid,
    viewer_id: Uuid,
) -> Result<Vec<Event>, diesel::result::Error> {
    let participating = event_participant::table
        .filter(event_participant::user_id.eq(viewer_id))
        .select(event_participant::event_id);

    event_category::table
        .inner_join(event::table)
        .filter(event_category::category_id.eq(category_id))
        .filter(
            event::privacy
                .eq(Privacy::Public)
                .or(event::id.eq_any(participating)),
        )
        .order(event::starts_at.asc())
        .select(Event::as_select())
        .load(conn)
        .await
}
