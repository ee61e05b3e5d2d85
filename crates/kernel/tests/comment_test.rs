#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Comment integration tests.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;
use quill_test_utils::{assert, comment, test_user};

/// A post by a fresh author; returns `(app, post_id, author_token)`.
async fn app_with_post() -> (TestApp, i64, String) {
    let app = TestApp::new().await;
    let (_, token) = app.register(&test_user("Author")).await;
    let tech = app.create_category("Technology", None).await;
    let post_id = app.create_post(&token, "Hello", tech).await;
    (app, post_id, token)
}

#[tokio::test]
async fn comment_on_post_and_list_oldest_first() {
    let (app, post_id, token) = app_with_post().await;
    let uri = format!("/api/posts/{post_id}/comments");

    let (status, first) = app.post(&uri, comment("first"), Some(&token)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, second) = app.post(&uri, comment("second"), Some(&token)).await;
    let first = first["data"]["id"].as_i64().unwrap();
    let second = second["data"]["id"].as_i64().unwrap();

    let (status, page) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert::page_total(&page, 2);
    assert_eq!(assert::ids(&page), vec![first, second]);
    assert_eq!(page["data"][0]["user_name"], "Author");

    let (_, detail) = app.get(&format!("/api/posts/{post_id}")).await;
    assert_eq!(detail["data"]["comments_count"], 2);
    assert_eq!(assert::ids(&detail["data"]["comments"]), vec![first, second]);
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let app = TestApp::new().await;
    let (_, token) = app.register(&test_user("Author")).await;

    let (status, _) = app
        .post("/api/posts/777/comments", comment("hello"), Some(&token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/posts/777/comments").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_content_is_validated() {
    let (app, post_id, token) = app_with_post().await;
    let uri = format!("/api/posts/{post_id}/comments");

    let (status, _) = app.post(&uri, comment(""), Some(&token)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post(&uri, comment(&"a".repeat(1001)), Some(&token))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.post(&uri, comment("hi"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_the_author_may_modify_a_comment() {
    let (app, post_id, token) = app_with_post().await;
    let (_, other) = app.register(&test_user("Other")).await;

    let (_, body) = app
        .post(
            &format!("/api/posts/{post_id}/comments"),
            comment("mine"),
            Some(&token),
        )
        .await;
    let id = body["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/comments/{id}");

    let (status, _) = app.put(&uri, comment("edited"), Some(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&uri, Some(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.put(&uri, comment("edited"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "edited");
}

#[tokio::test]
async fn trash_and_restore_comment() {
    let (app, post_id, token) = app_with_post().await;
    let (_, body) = app
        .post(
            &format!("/api/posts/{post_id}/comments"),
            comment("soon gone"),
            Some(&token),
        )
        .await;
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = app.delete(&format!("/api/comments/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, page) = app.get(&format!("/api/posts/{post_id}/comments")).await;
    assert::page_total(&page, 0);
    let (_, detail) = app.get(&format!("/api/posts/{post_id}")).await;
    assert_eq!(detail["data"]["comments_count"], 0);

    let (status, trashed) = app.get_auth("/api/comments/trashed", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assert::ids(&trashed), vec![id]);

    let (status, body) = app
        .post(&format!("/api/comments/{id}/restore"), json!({}), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["deleted_at"].is_null());

    let (_, page) = app.get(&format!("/api/posts/{post_id}/comments")).await;
    assert_eq!(assert::ids(&page), vec![id]);
}
