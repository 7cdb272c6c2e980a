#![allow(clippy::unused_async, unused_must_use)]
//! Tests for the category vocabulary and event tagging.
//!
//! Categories are a flat shared namespace any account may extend; attaching
//! them to an event is reserved for the event's creator.

use salvo::http::StatusCode;
use serde_json::json;

use super::helpers::*;

/// Creates a public event as the given account and returns its ID.
async fn create_event_as(
    service: &salvo::Service,
    username: &str,
    password: &str,
    name: &str,
) -> String {
    let response = TestRequest::post("/api/events")
        .authed_as(username, password)
        .json_body(&json!({
            "name": name,
            "starts_at": "2031-05-10T18:00:00Z",
            "ends_at": "2031-05-10T22:00:00Z",
        }))
        .send(service)
        .await
        .assert_status(StatusCode::CREATED);
    response.json()["id"]
        .as_str()
        .expect("id is a string")
        .to_string()
}

// ============================================================================
// Vocabulary Tests
// ============================================================================

/// ## Summary
/// Test that category creation returns the stored row.
#[test_log::test(tokio::test)]
async fn create_category_returns_the_stored_row() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let response = TestRequest::post("/api/categories")
        .authed_as("ada", "winterberry")
        .json_body(&json!({"name": "Outdoors", "description": "Fresh air"}))
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);

    let body = response.json();
    assert_eq!(body["name"], "Outdoors");
    assert_eq!(body["description"], "Fresh air");
    assert!(body["id"].as_str().is_some());
}

/// ## Summary
/// Test that the description is optional and reads back as null.
#[test_log::test(tokio::test)]
async fn create_category_with_no_description() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let response = TestRequest::post("/api/categories")
        .authed_as("ada", "winterberry")
        .json_body(&json!({"name": "Music"}))
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);

    assert!(response.json()["description"].is_null());
}

/// ## Summary
/// Test that a duplicate name conflicts.
#[test_log::test(tokio::test)]
async fn create_category_rejects_duplicate_names() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    test_db
        .seed_category("Outdoors", None)
        .await
        .expect("Failed to seed category");
    let service = create_db_test_service(&test_db.url()).await;

    TestRequest::post("/api/categories")
        .authed_as("ada", "winterberry")
        .json_body(&json!({"name": "Outdoors"}))
        .send(&service)
        .await
        .assert_status(StatusCode::CONFLICT)
        .assert_body_contains("Outdoors");
}

/// ## Summary
/// Test that a blank name is rejected.
#[test_log::test(tokio::test)]
async fn create_category_rejects_a_blank_name() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    TestRequest::post("/api/categories")
        .authed_as("ada", "winterberry")
        .json_body(&json!({"name": "   "}))
        .send(&service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

/// ## Summary
/// Test that the listing is alphabetical by name.
#[test_log::test(tokio::test)]
async fn listing_is_alphabetical() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    test_db
        .seed_category("Music", None)
        .await
        .expect("Failed to seed category");
    test_db
        .seed_category("Board games", None)
        .await
        .expect("Failed to seed category");
    test_db
        .seed_category("Outdoors", None)
        .await
        .expect("Failed to seed category");
    let service = create_db_test_service(&test_db.url()).await;

    let response = TestRequest::get("/api/categories")
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    let names: Vec<String> = response
        .json()
        .as_array()
        .expect("body should be an array")
        .iter()
        .map(|category| category["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["Board games", "Music", "Outdoors"]);
}

/// ## Summary
/// Test that fetching an unknown category reads as missing.
#[test_log::test(tokio::test)]
async fn get_category_returns_not_found_for_unknown_ids() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let missing = uuid::Uuid::now_v7();
    TestRequest::get(&format!("/api/categories/{missing}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

/// ## Summary
/// Test that deletion removes the category but leaves tagged events alone.
#[test_log::test(tokio::test)]
async fn delete_category_spares_tagged_events() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let category_id = test_db
        .seed_category("Outdoors", None)
        .await
        .expect("Failed to seed category");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "Picnic").await;
    TestRequest::put(&format!("/api/events/{event_id}/categories/{category_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    TestRequest::delete(&format!("/api/categories/{category_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    TestRequest::get(&format!("/api/categories/{category_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // The link cascades away; the event survives untagged.
    TestRequest::get(&format!("/api/events/{event_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    let response = TestRequest::get(&format!("/api/events/{event_id}/categories"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    assert_eq!(response.json().as_array().map(Vec::len), Some(0));
}

/// ## Summary
/// Test that deleting an unknown category reads as missing.
#[test_log::test(tokio::test)]
async fn delete_category_returns_not_found_for_unknown_ids() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let missing = uuid::Uuid::now_v7();
    TestRequest::delete(&format!("/api/categories/{missing}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Tagging Tests
// ============================================================================

/// ## Summary
/// Test that attaching a category makes it list under the event.
#[test_log::test(tokio::test)]
async fn attach_category_tags_the_event() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let category_id = test_db
        .seed_category("Outdoors", Some("Fresh air"))
        .await
        .expect("Failed to seed category");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "Picnic").await;

    TestRequest::put(&format!("/api/events/{event_id}/categories/{category_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = TestRequest::get(&format!("/api/events/{event_id}/categories"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    let body = response.json();
    let attached = body.as_array().expect("body should be an array");
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0]["name"], "Outdoors");
}

/// ## Summary
/// Test that attaching the same category twice conflicts.
#[test_log::test(tokio::test)]
async fn attach_category_rejects_duplicates() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let category_id = test_db
        .seed_category("Outdoors", None)
        .await
        .expect("Failed to seed category");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "Picnic").await;

    TestRequest::put(&format!("/api/events/{event_id}/categories/{category_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    TestRequest::put(&format!("/api/events/{event_id}/categories/{category_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::CONFLICT);
}

/// ## Summary
/// Test that only the creator may tag an event.
#[test_log::test(tokio::test)]
async fn attach_category_is_creator_only() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    let category_id = test_db
        .seed_category("Outdoors", None)
        .await
        .expect("Failed to seed category");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "Picnic").await;

    TestRequest::put(&format!("/api/events/{event_id}/categories/{category_id}"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

/// ## Summary
/// Test that attaching an unknown category reads as missing.
#[test_log::test(tokio::test)]
async fn attach_category_requires_an_existing_category() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "Picnic").await;

    let missing = uuid::Uuid::now_v7();
    TestRequest::put(&format!("/api/events/{event_id}/categories/{missing}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

/// ## Summary
/// Test that detaching removes the tag and detaching again reads as missing.
#[test_log::test(tokio::test)]
async fn detach_category_removes_the_tag() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let category_id = test_db
        .seed_category("Outdoors", None)
        .await
        .expect("Failed to seed category");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "Picnic").await;

    TestRequest::put(&format!("/api/events/{event_id}/categories/{category_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    TestRequest::delete(&format!("/api/events/{event_id}/categories/{category_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    TestRequest::delete(&format!("/api/events/{event_id}/categories/{category_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

/// ## Summary
/// Test that a category's event listing applies event visibility.
#[test_log::test(tokio::test)]
async fn category_events_apply_visibility() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    let category_id = test_db
        .seed_category("Outdoors", None)
        .await
        .expect("Failed to seed category");
    let service = create_db_test_service(&test_db.url()).await;

    let public_id = create_event_as(&service, "ada", "winterberry", "Open mic").await;
    let response = TestRequest::post("/api/events")
        .authed_as("ada", "winterberry")
        .json_body(&json!({
            "name": "Surprise party",
            "starts_at": "2031-05-11T19:00:00Z",
            "ends_at": "2031-05-11T23:00:00Z",
            "privacy": "private",
        }))
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);
    let private_id = response.json()["id"]
        .as_str()
        .expect("id is a string")
        .to_string();

    for event_id in [&public_id, &private_id] {
        TestRequest::put(&format!("/api/events/{event_id}/categories/{category_id}"))
            .authed_as("ada", "winterberry")
            .send(&service)
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    let response = TestRequest::get(&format!("/api/categories/{category_id}/events"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    let names: Vec<String> = response
        .json()
        .as_array()
        .expect("body should be an array")
        .iter()
        .map(|event| event["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["Open mic"]);

    let response = TestRequest::get(&format!("/api/categories/{category_id}/events"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    assert_eq!(response.json().as_array().map(Vec::len), Some(2));
}

/// ## Summary
/// Test that the categories of a private event are hidden from strangers.
#[test_log::test(tokio::test)]
async fn event_categories_hide_with_the_event() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    let category_id = test_db
        .seed_category("Outdoors", None)
        .await
        .expect("Failed to seed category");
    let service = create_db_test_service(&test_db.url()).await;

    let response = TestRequest::post("/api/events")
        .authed_as("ada", "winterberry")
        .json_body(&json!({
            "name": "Surprise party",
            "starts_at": "2031-05-11T19:00:00Z",
            "ends_at": "2031-05-11T23:00:00Z",
            "privacy": "private",
        }))
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);
    let event_id = response.json()["id"]
        .as_str()
        .expect("id is a string")
        .to_string();

    TestRequest::put(&format!("/api/events/{event_id}/categories/{category_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    TestRequest::get(&format!("/api/events/{event_id}/categories"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
