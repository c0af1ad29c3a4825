//! Schema validation tests for the JSON API
//!
//! These tests pin the wire contract: camelCase field names, the
//! denormalized post shape, and the auth payload.

mod common;

use common::TestServer;
use common::schema_validator::assert_matches_schema;
use serde_json::Value;

#[tokio::test]
async fn test_signup_payload_schema() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(&server.url("/api/v1/accounts"))
        .json(&serde_json::json!({
            "name": "Jane Doe",
            "username": "jane",
            "email": "jane@example.com",
            "password": "correct horse battery",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_matches_schema(&json["data"], "auth_payload");
}

#[tokio::test]
async fn test_login_payload_schema() {
    let server = TestServer::new().await;
    server.signup("Jane Doe", "jane", "jane@example.com").await;

    let response = server
        .client
        .post(&server.url("/api/v1/auth/login"))
        .json(&serde_json::json!({
            "identifier": "jane",
            "password": "correct horse battery",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_matches_schema(&json["data"], "auth_payload");
}

#[tokio::test]
async fn test_created_post_schema() {
    let server = TestServer::new().await;
    let (token, _) = server.signup("Jane Doe", "jane", "jane@example.com").await;

    let response = server
        .client
        .post(&server.url("/api/v1/posts"))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "content": "Octopuses have three hearts",
            "postType": "fact",
            "tags": ["biology", "animals"],
            "externalLink": "https://example.com/octopus",
            "imageUrl": "https://example.com/octopus.jpg",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_matches_schema(&json["data"], "display_post");
}

#[tokio::test]
async fn test_feed_entries_schema() {
    let server = TestServer::new().await;
    let (token, _) = server.signup("Jane Doe", "jane", "jane@example.com").await;
    let (voter, _) = server.signup("Sam Reader", "sam", "sam@example.com").await;

    let fact_id = server
        .create_post(&token, "fact", "Octopuses have three hearts", &["biology"])
        .await;
    server
        .create_post(
            &token,
            "question",
            "Why does glass look transparent?",
            &["physics", "optics"],
        )
        .await;
    server.vote(&voter, &fact_id, Some("upvote")).await;

    let response = server
        .client
        .get(&server.url("/api/v1/posts"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let posts: Vec<Value> = response.json().await.unwrap();
    assert_eq!(posts.len(), 2);
    for post in &posts {
        assert_matches_schema(post, "display_post");
    }
}

#[tokio::test]
async fn test_single_post_schema_with_viewer_vote() {
    let server = TestServer::new().await;
    let (token, _) = server.signup("Jane Doe", "jane", "jane@example.com").await;
    let post_id = server
        .create_post(&token, "fact", "Octopuses have three hearts", &["biology"])
        .await;
    server.vote(&token, &post_id, Some("upvote")).await;

    let response = server
        .client
        .get(&server.url(&format!("/api/v1/posts/{}", post_id)))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let json: Value = response.json().await.unwrap();
    assert_matches_schema(&json, "display_post");
    assert_eq!(json["votes"]["userVote"], "upvote");
}

#[tokio::test]
async fn test_notification_schema() {
    let server = TestServer::new().await;
    let (author, _) = server.signup("Jane Doe", "jane", "jane@example.com").await;
    let (voter, _) = server.signup("Sam Reader", "sam", "sam@example.com").await;
    let post_id = server
        .create_post(&author, "fact", "Octopuses have three hearts", &["biology"])
        .await;
    server.vote(&voter, &post_id, Some("upvote")).await;

    let response = server
        .client
        .get(&server.url("/api/v1/notifications"))
        .header("Authorization", format!("Bearer {}", author))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let notifications: Vec<Value> = response.json().await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_matches_schema(&notifications[0], "notification");
}
