#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Audit trail integration tests.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;
use quill_test_utils::{assert, comment, test_user};

#[tokio::test]
async fn category_lifecycle_is_audited() {
    let app = TestApp::new().await;
    let (user_id, token) = app.register(&test_user("Auditor")).await;

    let (_, body) = app
        .post(
            "/api/categories",
            quill_test_utils::category("Tech"),
            Some(&token),
        )
        .await;
    let id = body["data"]["id"].as_i64().unwrap();

    app.put(
        &format!("/api/categories/{id}"),
        json!({"name": "Technology"}),
        Some(&token),
    )
    .await;
    app.delete(&format!("/api/categories/{id}"), Some(&token))
        .await;

    let (status, page) = app
        .get_auth(&format!("/api/audits/subject/category/{id}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert::page_total(&page, 3);

    // Newest first.
    let events: Vec<&str> = page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["event"].as_str().unwrap())
        .collect();
    assert_eq!(events, vec!["deleted", "updated", "created"]);

    let updated = &page["data"][1];
    assert::json_eq(&updated["old_values"], &json!({"name": "Tech"}));
    assert::json_eq(&updated["new_values"], &json!({"name": "Technology"}));
    assert_eq!(updated["actor_id"], user_id);
    assert_eq!(updated["subject_type"], "category");

    let created = &page["data"][2];
    assert_eq!(created["new_values"]["name"], "Tech");
    assert!(created["new_values"].get("created_at").is_none());

    let audit_id = created["id"].as_i64().unwrap();
    let (status, one) = app
        .get_auth(&format!("/api/audits/{audit_id}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["data"]["event"], "created");
}

#[tokio::test]
async fn unchanged_update_writes_no_audit() {
    let app = TestApp::new().await;
    let (_, token) = app.register(&test_user("Auditor")).await;
    let id = app.create_category("Tech", None).await;

    app.put(&format!("/api/categories/{id}"), json!({"name": "Tech"}), None)
        .await;

    let (_, page) = app.get_auth("/api/audits/subject/category", &token).await;
    assert::page_total(&page, 1);
}

#[tokio::test]
async fn filters_by_subject_type_and_actor() {
    let app = TestApp::new().await;
    let (author_id, author) = app.register(&test_user("Author")).await;
    let (reader_id, reader) = app.register(&test_user("Reader")).await;
    let tech = app.create_category("Technology", None).await;
    let post_id = app.create_post(&author, "Hello", tech).await;
    app.post(
        &format!("/api/posts/{post_id}/comments"),
        comment("nice"),
        Some(&reader),
    )
    .await;

    let (_, posts) = app.get_auth("/api/audits/subject/post", &author).await;
    assert::page_total(&posts, 1);
    assert_eq!(posts["data"][0]["subject_id"], post_id);

    let (_, by_reader) = app
        .get_auth(&format!("/api/audits/actor/{reader_id}"), &author)
        .await;
    assert::page_total(&by_reader, 1);
    assert_eq!(by_reader["data"][0]["subject_type"], "comment");

    let (_, by_author) = app
        .get_auth(&format!("/api/audits/actor/{author_id}"), &author)
        .await;
    assert::page_total(&by_author, 1);

    // Category created anonymously plus the post and comment.
    let (_, all) = app.get_auth("/api/audits", &author).await;
    assert::page_total(&all, 3);
    assert!(all["data"][2]["actor_id"].is_null());

    let (status, _) = app.get_auth("/api/audits/subject/user", &author).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get_auth("/api/audits/9999", &author).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
