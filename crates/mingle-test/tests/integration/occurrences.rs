#![allow(clippy::unused_async, unused_must_use)]
//! Tests for recurrence expansion over HTTP.
//!
//! Covers window expansion of recurring series, the monthly day-of-month
//! clamp, and the next-occurrence endpoint that re-anchors the stored
//! column.

use chrono::{DateTime, TimeZone, Utc};
use salvo::http::StatusCode;
use serde_json::json;

use super::helpers::*;

fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn parse_time(value: &serde_json::Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.as_str().expect("timestamp is a string"))
        .expect("timestamp parses")
        .with_timezone(&Utc)
}

/// Creates an event over HTTP as the given user and returns its ID.
async fn create_event(
    service: &salvo::Service,
    username: &str,
    password: &str,
    body: &serde_json::Value,
) -> uuid::Uuid {
    let response = TestRequest::post("/api/events")
        .authed_as(username, password)
        .json_body(body)
        .send(service)
        .await
        .assert_status(StatusCode::CREATED);
    response.json()["id"]
        .as_str()
        .expect("id is a string")
        .parse()
        .expect("id is a UUID")
}

// ============================================================================
// Window Expansion Tests
// ============================================================================

/// ## Summary
/// Test that a one-shot event occurs exactly once inside its window.
#[test_log::test(tokio::test)]
async fn one_shot_events_occur_once_in_the_window() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Picnic",
            "starts_at": "2031-05-10T12:00:00Z",
            "ends_at": "2031-05-10T15:00:00Z",
        }),
    )
    .await;

    let response = TestRequest::get(&format!(
        "/api/events/{event_id}/occurrences?from=2031-05-01T00:00:00Z&until=2031-05-31T23:59:59Z"
    ))
    .authed_as("ada", "winterberry")
    .send(&service)
    .await
    .assert_status(StatusCode::OK);

    let body = response.json();
    let occurrences = body.as_array().expect("body should be an array");
    assert_eq!(occurrences.len(), 1);
    assert_eq!(parse_time(&occurrences[0]["starts_at"]), utc(2031, 5, 10, 12));
    assert_eq!(parse_time(&occurrences[0]["ends_at"]), utc(2031, 5, 10, 15));
}

/// ## Summary
/// Test that a window the event never touches comes back empty.
#[test_log::test(tokio::test)]
async fn disjoint_windows_hold_nothing() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Picnic",
            "starts_at": "2031-05-10T12:00:00Z",
            "ends_at": "2031-05-10T15:00:00Z",
        }),
    )
    .await;

    let response = TestRequest::get(&format!(
        "/api/events/{event_id}/occurrences?from=2031-06-01T00:00:00Z&until=2031-06-30T23:59:59Z"
    ))
    .authed_as("ada", "winterberry")
    .send(&service)
    .await
    .assert_status(StatusCode::OK);

    assert_eq!(response.json().as_array().map(Vec::len), Some(0));
}

/// ## Summary
/// Test that a weekly series expands to every instance in the window, in
/// order.
#[test_log::test(tokio::test)]
async fn weekly_series_expand_across_the_window() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Writing group",
            "starts_at": "2031-06-02T09:00:00Z",
            "ends_at": "2031-06-02T11:00:00Z",
            "recurrence": "weekly",
        }),
    )
    .await;

    let response = TestRequest::get(&format!(
        "/api/events/{event_id}/occurrences?from=2031-06-01T00:00:00Z&until=2031-06-30T23:59:59Z"
    ))
    .authed_as("ada", "winterberry")
    .send(&service)
    .await
    .assert_status(StatusCode::OK);

    let body = response.json();
    let occurrences = body.as_array().expect("body should be an array");
    let starts: Vec<DateTime<Utc>> = occurrences
        .iter()
        .map(|occurrence| parse_time(&occurrence["starts_at"]))
        .collect();
    assert_eq!(
        starts,
        vec![
            utc(2031, 6, 2, 9),
            utc(2031, 6, 9, 9),
            utc(2031, 6, 16, 9),
            utc(2031, 6, 23, 9),
            utc(2031, 6, 30, 9),
        ]
    );
}

/// ## Summary
/// Test that an instance straddling the window start is still reported.
#[test_log::test(tokio::test)]
async fn instances_straddling_the_window_start_are_included() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Brunch",
            "starts_at": "2031-05-10T10:00:00Z",
            "ends_at": "2031-05-10T12:00:00Z",
        }),
    )
    .await;

    // The window opens mid-event.
    let response = TestRequest::get(&format!(
        "/api/events/{event_id}/occurrences?from=2031-05-10T11:00:00Z&until=2031-05-10T23:00:00Z"
    ))
    .authed_as("ada", "winterberry")
    .send(&service)
    .await
    .assert_status(StatusCode::OK);

    assert_eq!(response.json().as_array().map(Vec::len), Some(1));
}

/// ## Summary
/// Test that a monthly series starting on the 31st clamps to the last day of
/// February.
#[test_log::test(tokio::test)]
async fn monthly_series_clamp_to_short_months() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Payday dinner",
            "starts_at": "2031-01-31T18:00:00Z",
            "ends_at": "2031-01-31T20:00:00Z",
            "recurrence": "monthly",
        }),
    )
    .await;

    let response = TestRequest::get(&format!(
        "/api/events/{event_id}/occurrences?from=2031-02-01T00:00:00Z&until=2031-02-28T23:59:59Z"
    ))
    .authed_as("ada", "winterberry")
    .send(&service)
    .await
    .assert_status(StatusCode::OK);

    let body = response.json();
    let occurrences = body.as_array().expect("body should be an array");
    assert_eq!(occurrences.len(), 1);
    assert_eq!(parse_time(&occurrences[0]["starts_at"]), utc(2031, 2, 28, 18));
    assert_eq!(parse_time(&occurrences[0]["ends_at"]), utc(2031, 2, 28, 20));
}

/// ## Summary
/// Test that a window ending before it starts is rejected.
#[test_log::test(tokio::test)]
async fn occurrence_windows_must_be_ordered() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Picnic",
            "starts_at": "2031-05-10T12:00:00Z",
            "ends_at": "2031-05-10T15:00:00Z",
        }),
    )
    .await;

    TestRequest::get(&format!(
        "/api/events/{event_id}/occurrences?from=2031-06-01T00:00:00Z&until=2031-05-01T00:00:00Z"
    ))
    .authed_as("ada", "winterberry")
    .send(&service)
    .await
    .assert_status(StatusCode::BAD_REQUEST);
}

/// ## Summary
/// Test that both window bounds are required.
#[test_log::test(tokio::test)]
async fn occurrence_windows_require_both_bounds() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Picnic",
            "starts_at": "2031-05-10T12:00:00Z",
            "ends_at": "2031-05-10T15:00:00Z",
        }),
    )
    .await;

    TestRequest::get(&format!(
        "/api/events/{event_id}/occurrences?until=2031-05-31T23:59:59Z"
    ))
    .authed_as("ada", "winterberry")
    .send(&service)
    .await
    .assert_status(StatusCode::BAD_REQUEST)
    .assert_body_contains("from");

    TestRequest::get(&format!(
        "/api/events/{event_id}/occurrences?from=2031-05-01T00:00:00Z"
    ))
    .authed_as("ada", "winterberry")
    .send(&service)
    .await
    .assert_status(StatusCode::BAD_REQUEST)
    .assert_body_contains("until");
}

/// ## Summary
/// Test that window bounds must be RFC 3339 timestamps.
#[test_log::test(tokio::test)]
async fn occurrence_bounds_must_be_rfc3339() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Picnic",
            "starts_at": "2031-05-10T12:00:00Z",
            "ends_at": "2031-05-10T15:00:00Z",
        }),
    )
    .await;

    TestRequest::get(&format!(
        "/api/events/{event_id}/occurrences?from=yesterday&until=2031-05-31T23:59:59Z"
    ))
    .authed_as("ada", "winterberry")
    .send(&service)
    .await
    .assert_status(StatusCode::BAD_REQUEST)
    .assert_body_contains("RFC 3339");
}

/// ## Summary
/// Test that expansion obeys event visibility.
#[test_log::test(tokio::test)]
async fn occurrences_respect_event_visibility() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Private retro",
            "starts_at": "2031-05-10T12:00:00Z",
            "ends_at": "2031-05-10T13:00:00Z",
            "privacy": "private",
            "recurrence": "weekly",
        }),
    )
    .await;

    TestRequest::get(&format!(
        "/api/events/{event_id}/occurrences?from=2031-05-01T00:00:00Z&until=2031-05-31T23:59:59Z"
    ))
    .authed_as("grace", "hoppernova")
    .send(&service)
    .await
    .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Next Occurrence Tests
// ============================================================================

/// ## Summary
/// Test that the next endpoint returns the first instance strictly after the
/// given moment and persists it as the anchor.
#[test_log::test(tokio::test)]
async fn next_rolls_the_stored_anchor_forward() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Writing group",
            "starts_at": "2031-01-06T09:00:00Z",
            "ends_at": "2031-01-06T11:00:00Z",
            "recurrence": "weekly",
        }),
    )
    .await;

    // Creation anchors the second instance.
    let anchor = test_db
        .get_event_next_occurrence(event_id)
        .await
        .expect("Failed to query anchor");
    assert_eq!(anchor, Some(utc(2031, 1, 13, 9)));

    // An instance starting exactly at `after` does not count as after it.
    let response = TestRequest::get(&format!(
        "/api/events/{event_id}/next?after=2031-01-20T09:00:00Z"
    ))
    .authed_as("ada", "winterberry")
    .send(&service)
    .await
    .assert_status(StatusCode::OK);

    let body = response.json();
    assert_eq!(parse_time(&body["starts_at"]), utc(2031, 1, 27, 9));
    assert_eq!(parse_time(&body["ends_at"]), utc(2031, 1, 27, 11));

    let anchor = test_db
        .get_event_next_occurrence(event_id)
        .await
        .expect("Failed to query anchor");
    assert_eq!(anchor, Some(utc(2031, 1, 27, 9)));
}

/// ## Summary
/// Test that a one-shot event that has not started yet is its own next
/// instance.
#[test_log::test(tokio::test)]
async fn next_returns_the_own_instance_of_a_future_one_shot() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Picnic",
            "starts_at": "2031-05-10T12:00:00Z",
            "ends_at": "2031-05-10T15:00:00Z",
        }),
    )
    .await;

    let response = TestRequest::get(&format!("/api/events/{event_id}/next"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    assert_eq!(parse_time(&response.json()["starts_at"]), utc(2031, 5, 10, 12));
}

/// ## Summary
/// Test that the boundary defaults to the current moment for recurring
/// series with a past start.
#[test_log::test(tokio::test)]
async fn next_defaults_to_the_current_moment() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Standing lunch",
            "starts_at": "2020-01-06T12:00:00Z",
            "ends_at": "2020-01-06T13:00:00Z",
            "recurrence": "weekly",
        }),
    )
    .await;

    let response = TestRequest::get(&format!("/api/events/{event_id}/next"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    let starts_at = parse_time(&response.json()["starts_at"]);
    assert!(
        starts_at > Utc::now(),
        "next instance should be in the future, got {starts_at}"
    );
}

/// ## Summary
/// Test that an exhausted series answers no content and leaves no anchor.
#[test_log::test(tokio::test)]
async fn exhausted_series_answer_no_content() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    // A one-shot event that already happened has no further instances.
    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Graduation",
            "starts_at": "2020-05-01T10:00:00Z",
            "ends_at": "2020-05-01T12:00:00Z",
        }),
    )
    .await;

    TestRequest::get(&format!("/api/events/{event_id}/next"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NO_CONTENT)
        .assert_body_empty();

    let anchor = test_db
        .get_event_next_occurrence(event_id)
        .await
        .expect("Failed to query anchor");
    assert_eq!(anchor, None);
}

/// ## Summary
/// Test that a malformed `after` bound is rejected.
#[test_log::test(tokio::test)]
async fn next_rejects_malformed_bounds() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event(
        &service,
        "ada",
        "winterberry",
        &json!({
            "name": "Picnic",
            "starts_at": "2031-05-10T12:00:00Z",
            "ends_at": "2031-05-10T15:00:00Z",
        }),
    )
    .await;

    TestRequest::get(&format!("/api/events/{event_id}/next?after=soon"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
