//! Category taxonomy and event tagging.
//!
//! Categories are a flat, global namespace; any authenticated user may create
//! one. Attaching them to an event is reserved for the event's creator.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use mingle_db::db::connection::DbConnection;
use mingle_db::db::query::{category, event};
use mingle_db::db::schema;
use mingle_db::model::category::{Category, NewCategory, NewEventCategory};
use mingle_db::model::event::Event;

use crate::error::{ServiceError, ServiceResult};
use crate::event::ensure_creator;

/// Character limits matching the column widths.
const MAX_NAME_CHARS: usize = 45;
const MAX_DESCRIPTION_CHARS: usize = 255;

/// Context for category creation.
pub struct CreateCategoryContext {
    pub name: String,
    pub description: Option<String>,
}

/// ## Summary
/// Creates a category.
///
/// ## Errors
/// - `ValidationError` if the name or description is malformed.
/// - `Conflict` if a category with the same name already exists.
pub async fn create_category(
    conn: &mut DbConnection<'_>,
    ctx: &CreateCategoryContext,
) -> ServiceResult<Category> {
    validate_name(&ctx.name)?;
    validate_description(ctx.description.as_deref())?;

    let new_category = NewCategory {
        id: Uuid::now_v7(),
        name: &ctx.name,
        description: ctx.description.as_deref(),
    };

    match category::insert_category(conn, &new_category).await {
        Ok(created) => {
            tracing::info!(category_id = %created.id, name = %created.name, "Category created");
            Ok(created)
        }
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => Err(ServiceError::Conflict(format!(
            "Category '{}' already exists",
            ctx.name
        ))),
        Err(error) => Err(ServiceError::from(error)),
    }
}

/// Loads a category by ID.
///
/// ## Errors
/// Returns `NotFound` if no such category exists.
pub async fn get_category(conn: &mut DbConnection<'_>, category_id: Uuid) -> ServiceResult<Category> {
    let found: Option<Category> = category::by_id(category_id).first(conn).await.optional()?;
    found.ok_or_else(|| ServiceError::NotFound(format!("Category {category_id} not found")))
}

/// Lists all categories, ordered by name.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_categories(conn: &mut DbConnection<'_>) -> ServiceResult<Vec<Category>> {
    let categories = category::all()
        .order(schema::category::name.asc())
        .load(conn)
        .await?;
    Ok(categories)
}

/// ## Summary
/// Deletes a category. Event links go with it through the cascade.
///
/// ## Errors
/// Returns `NotFound` if the category does not exist.
pub async fn delete_category(conn: &mut DbConnection<'_>, category_id: Uuid) -> ServiceResult<()> {
    let deleted = category::delete_category(conn, category_id).await?;
    if deleted == 0 {
        return Err(ServiceError::NotFound(format!(
            "Category {category_id} not found"
        )));
    }
    tracing::info!(category_id = %category_id, "Category deleted");
    Ok(())
}

/// ## Summary
/// Attaches a category to an event.
///
/// ## Errors
/// - `NotFound` if the event or category does not exist.
/// - `AuthorizationError` if the actor is not the event's creator.
/// - `Conflict` if the category is already attached.
pub async fn attach_category(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    category_id: Uuid,
    actor_id: Uuid,
) -> ServiceResult<()> {
    let found = owned_event(conn, event_id, actor_id).await?;
    get_category(conn, category_id).await?;

    let new_link = NewEventCategory {
        event_id: found.id,
        category_id,
    };
    match category::insert_link(conn, &new_link).await {
        Ok(_) => {
            tracing::debug!(
                event_id = %event_id,
                category_id = %category_id,
                "Category attached"
            );
            Ok(())
        }
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => Err(ServiceError::Conflict(
            "Category already attached to this event".to_string(),
        )),
        Err(error) => Err(ServiceError::from(error)),
    }
}

/// ## Summary
/// Detaches a category from an event.
///
/// ## Errors
/// - `NotFound` if the event does not exist or the category is not attached.
/// - `AuthorizationError` if the actor is not the event's creator.
pub async fn detach_category(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    category_id: Uuid,
    actor_id: Uuid,
) -> ServiceResult<()> {
    owned_event(conn, event_id, actor_id).await?;

    let deleted = category::delete_link(conn, event_id, category_id).await?;
    if deleted == 0 {
        return Err(ServiceError::NotFound(
            "Category not attached to this event".to_string(),
        ));
    }
    tracing::debug!(
        event_id = %event_id,
        category_id = %category_id,
        "Category detached"
    );
    Ok(())
}

/// Lists the categories attached to an event the viewer may see.
///
/// ## Errors
/// Returns `NotFound` under the event visibility rules.
pub async fn categories_of_event(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    viewer_id: Uuid,
) -> ServiceResult<Vec<Category>> {
    crate::event::get_visible_event(conn, event_id, viewer_id).await?;
    Ok(category::categories_for_event(conn, event_id).await?)
}

/// Lists the events in a category that the viewer may see, soonest first.
///
/// ## Errors
/// Returns `NotFound` if the category does not exist.
pub async fn events_in_category(
    conn: &mut DbConnection<'_>,
    category_id: Uuid,
    viewer_id: Uuid,
) -> ServiceResult<Vec<Event>> {
    get_category(conn, category_id).await?;
    Ok(category::events_for_category(conn, category_id, viewer_id).await?)
}

async fn owned_event(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
    actor_id: Uuid,
) -> ServiceResult<Event> {
    let found: Option<Event> = event::by_id(event_id).first(conn).await.optional()?;
    let Some(found) = found else {
        return Err(ServiceError::NotFound(format!("Event {event_id} not found")));
    };
    ensure_creator(&found, actor_id)?;
    Ok(found)
}

fn validate_name(name: &str) -> ServiceResult<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "Category name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ServiceError::ValidationError(format!(
            "Category name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> ServiceResult<()> {
    if description.is_some_and(|text| text.chars().count() > MAX_DESCRIPTION_CHARS) {
        return Err(ServiceError::ValidationError(format!(
            "Description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(())
}
