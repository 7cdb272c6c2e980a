#![allow(clippy::unused_async, unused_must_use)]
//! Tests for event rosters: joining, host decisions, leaving.
//!
//! Public events admit joiners immediately; private events park them as
//! pending until the host accepts. The creator's host row only disappears
//! with the event itself.

use salvo::http::StatusCode;
use serde_json::json;

use super::helpers::*;

/// Creates an event as the given account and returns its ID.
async fn create_event_as(
    service: &salvo::Service,
    username: &str,
    password: &str,
    privacy: &str,
) -> uuid::Uuid {
    let response = TestRequest::post("/api/events")
        .authed_as(username, password)
        .json_body(&json!({
            "name": "Board game night",
            "starts_at": "2031-05-10T18:00:00Z",
            "ends_at": "2031-05-10T22:00:00Z",
            "privacy": privacy,
        }))
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
// Joining Tests
// ============================================================================

/// ## Summary
/// Test that joining a public event seats the member as accepted.
#[test_log::test(tokio::test)]
async fn joining_a_public_event_admits_immediately() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let grace_id = test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "public").await;

    let response = TestRequest::post(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);

    let body = response.json();
    assert_eq!(body["role"], "member");
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["user_id"], grace_id.to_string());

    let row = test_db
        .get_participant(event_id, grace_id)
        .await
        .expect("Failed to query roster")
        .expect("joiner should hold a roster row");
    assert_eq!(row.role, ParticipantRole::Member);
    assert_eq!(row.status, ParticipantStatus::Accepted);
}

/// ## Summary
/// Test that joining a private event parks the member as pending.
#[test_log::test(tokio::test)]
async fn joining_a_private_event_parks_as_pending() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let grace_id = test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "private").await;

    let response = TestRequest::post(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);
    assert_eq!(response.json()["status"], "pending");

    let row = test_db
        .get_participant(event_id, grace_id)
        .await
        .expect("Failed to query roster")
        .expect("joiner should hold a roster row");
    assert_eq!(row.status, ParticipantStatus::Pending);
}

/// ## Summary
/// Test that joining twice conflicts.
#[test_log::test(tokio::test)]
async fn joining_twice_conflicts() {
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

    let event_id = create_event_as(&service, "ada", "winterberry", "public").await;

    TestRequest::post(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);
    TestRequest::post(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::CONFLICT);
}

/// ## Summary
/// Test that the creator cannot rejoin their own event; they already hold the
/// host row.
#[test_log::test(tokio::test)]
async fn the_creator_already_participates() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "public").await;

    TestRequest::post(&format!("/api/events/{event_id}/participants"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::CONFLICT);
}

/// ## Summary
/// Test that joining a missing event reads as missing.
#[test_log::test(tokio::test)]
async fn joining_a_missing_event_is_not_found() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let missing = uuid::Uuid::now_v7();
    TestRequest::post(&format!("/api/events/{missing}/participants"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Roster Tests
// ============================================================================

/// ## Summary
/// Test that the roster lists hosts first with usernames.
#[test_log::test(tokio::test)]
async fn roster_lists_hosts_first() {
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

    let event_id = create_event_as(&service, "ada", "winterberry", "public").await;
    TestRequest::post(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);

    let response = TestRequest::get(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    let body = response.json();
    let roster = body.as_array().expect("body should be an array");
    assert_eq!(roster.len(), 2);
    assert_eq!(roster[0]["username"], "ada");
    assert_eq!(roster[0]["role"], "host");
    assert_eq!(roster[1]["username"], "grace");
    assert_eq!(roster[1]["role"], "member");
}

/// ## Summary
/// Test that a private event's roster is hidden from strangers.
#[test_log::test(tokio::test)]
async fn private_rosters_hide_from_strangers() {
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

    let event_id = create_event_as(&service, "ada", "winterberry", "private").await;

    TestRequest::get(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    TestRequest::get(&format!("/api/events/{event_id}/participants"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
}

// ============================================================================
// Host Decision Tests
// ============================================================================

/// ## Summary
/// Test that the host can accept a pending member.
#[test_log::test(tokio::test)]
async fn the_host_accepts_a_pending_member() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let grace_id = test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "private").await;
    TestRequest::post(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);

    let response = TestRequest::put(&format!("/api/events/{event_id}/participants/{grace_id}"))
        .authed_as("ada", "winterberry")
        .json_body(&json!({"status": "accepted"}))
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    assert_eq!(response.json()["status"], "accepted");

    let row = test_db
        .get_participant(event_id, grace_id)
        .await
        .expect("Failed to query roster")
        .expect("member should hold a roster row");
    assert_eq!(row.status, ParticipantStatus::Accepted);
}

/// ## Summary
/// Test that a decision outside the known statuses is rejected.
#[test_log::test(tokio::test)]
async fn decisions_reject_unknown_statuses() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let grace_id = test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "private").await;
    TestRequest::post(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);

    TestRequest::put(&format!("/api/events/{event_id}/participants/{grace_id}"))
        .authed_as("ada", "winterberry")
        .json_body(&json!({"status": "declined"}))
        .send(&service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

/// ## Summary
/// Test that status decisions are host-only; members cannot accept
/// themselves.
#[test_log::test(tokio::test)]
async fn status_decisions_are_host_only() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let grace_id = test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "private").await;
    TestRequest::post(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);

    TestRequest::put(&format!("/api/events/{event_id}/participants/{grace_id}"))
        .authed_as("grace", "hoppernova")
        .json_body(&json!({"status": "accepted"}))
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

/// ## Summary
/// Test that a decision on a non-member reads as missing.
#[test_log::test(tokio::test)]
async fn decisions_on_non_members_are_not_found() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let grace_id = test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "private").await;

    TestRequest::put(&format!("/api/events/{event_id}/participants/{grace_id}"))
        .authed_as("ada", "winterberry")
        .json_body(&json!({"status": "accepted"}))
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Leaving Tests
// ============================================================================

/// ## Summary
/// Test that a member may leave, removing their roster row.
#[test_log::test(tokio::test)]
async fn members_may_leave() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let grace_id = test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "public").await;
    TestRequest::post(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);

    TestRequest::delete(&format!("/api/events/{event_id}/participants/{grace_id}"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let row = test_db
        .get_participant(event_id, grace_id)
        .await
        .expect("Failed to query roster");
    assert!(row.is_none(), "leaving should drop the roster row");
}

/// ## Summary
/// Test that the host may remove another member.
#[test_log::test(tokio::test)]
async fn the_host_may_remove_members() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let grace_id = test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "public").await;
    TestRequest::post(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);

    TestRequest::delete(&format!("/api/events/{event_id}/participants/{grace_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let row = test_db
        .get_participant(event_id, grace_id)
        .await
        .expect("Failed to query roster");
    assert!(row.is_none());
}

/// ## Summary
/// Test that a third account may not remove another member.
#[test_log::test(tokio::test)]
async fn strangers_may_not_remove_members() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let grace_id = test_db
        .seed_user("grace", "grace@example.com", "hoppernova")
        .await
        .expect("Failed to seed user");
    test_db
        .seed_user("mary", "mary@example.com", "sheppards")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "public").await;
    TestRequest::post(&format!("/api/events/{event_id}/participants"))
        .authed_as("grace", "hoppernova")
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);

    TestRequest::delete(&format!("/api/events/{event_id}/participants/{grace_id}"))
        .authed_as("mary", "sheppards")
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

/// ## Summary
/// Test that the host's own row is protected; the event must be deleted
/// instead.
#[test_log::test(tokio::test)]
async fn the_host_row_cannot_be_removed() {
    let test_db = TestDb::new().await.expect("Failed to create test database");
    let ada_id = test_db
        .seed_user("ada", "ada@example.com", "winterberry")
        .await
        .expect("Failed to seed user");
    let service = create_db_test_service(&test_db.url()).await;

    let event_id = create_event_as(&service, "ada", "winterberry", "public").await;

    TestRequest::delete(&format!("/api/events/{event_id}/participants/{ada_id}"))
        .authed_as("ada", "winterberry")
        .send(&service)
        .await
        .assert_status(StatusCode::CONFLICT);
}
