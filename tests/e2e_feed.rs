//! E2E tests for the public feed: ordering, pagination, filtering

mod common;

use common::TestServer;
use serde_json::Value;

async fn feed(server: &TestServer, query: &str) -> Vec<Value> {
    let response = server
        .client
        .get(&server.url(&format!("/api/v1/posts{}", query)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200, "feed request failed: {}", query);
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_empty_feed_is_empty_array() {
    let server = TestServer::new().await;

    let posts = feed(&server, "").await;
    assert!(posts.is_empty());
}

#[tokio::test]
async fn test_feed_is_newest_first() {
    let server = TestServer::new().await;
    let (token, _) = server.signup("Jane Doe", "jane", "jane@example.com").await;

    server
        .create_post(&token, "fact", "First fact posted", &["history"])
        .await;
    server
        .create_post(&token, "fact", "Second fact posted", &["history"])
        .await;
    server
        .create_post(&token, "fact", "Third fact posted", &["history"])
        .await;

    let posts = feed(&server, "").await;
    let contents: Vec<&str> = posts
        .iter()
        .map(|p| p["content"].as_str().unwrap())
        .collect();
    assert_eq!(
        contents,
        vec!["Third fact posted", "Second fact posted", "First fact posted"]
    );
}

#[tokio::test]
async fn test_feed_pagination() {
    let server = TestServer::new().await;
    let (token, _) = server.signup("Jane Doe", "jane", "jane@example.com").await;

    for i in 1..=5 {
        server
            .create_post(&token, "fact", &format!("Numbered fact {}", i), &["count"])
            .await;
    }

    let first_page = feed(&server, "?limit=2&skip=0").await;
    let second_page = feed(&server, "?limit=2&skip=2").await;
    let last_page = feed(&server, "?limit=2&skip=4").await;

    assert_eq!(first_page.len(), 2);
    assert_eq!(second_page.len(), 2);
    assert_eq!(last_page.len(), 1);

    assert_eq!(first_page[0]["content"], "Numbered fact 5");
    assert_eq!(second_page[0]["content"], "Numbered fact 3");
    assert_eq!(last_page[0]["content"], "Numbered fact 1");

    // Past the end is an empty page, not an error.
    let past_end = feed(&server, "?limit=2&skip=10").await;
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn test_feed_default_limit_applies() {
    let server = TestServer::new().await;
    let (token, _) = server.signup("Jane Doe", "jane", "jane@example.com").await;

    for i in 1..=12 {
        server
            .create_post(&token, "fact", &format!("Overflow fact {}", i), &["bulk"])
            .await;
    }

    // Test config sets the default page size to 10.
    let posts = feed(&server, "").await;
    assert_eq!(posts.len(), 10);
    assert_eq!(posts[0]["content"], "Overflow fact 12");
}

#[tokio::test]
async fn test_feed_type_filter() {
    let server = TestServer::new().await;
    let (token, _) = server.signup("Jane Doe", "jane", "jane@example.com").await;

    server
        .create_post(&token, "fact", "Octopuses have three hearts", &["biology"])
        .await;
    server
        .create_post(&token, "question", "Why does glass look transparent?", &["physics"])
        .await;

    let facts = feed(&server, "?type=fact").await;
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0]["postType"], "fact");

    let questions = feed(&server, "?type=question").await;
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0]["postType"], "question");

    let lessons = feed(&server, "?type=lesson").await;
    assert!(lessons.is_empty());
}

#[tokio::test]
async fn test_feed_rejects_unknown_type() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/api/v1/posts?type=opinion"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"], "type must be one of: fact, question, lesson");
}

#[tokio::test]
async fn test_feed_rejects_negative_paging() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/api/v1/posts?limit=-1"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_feed_never_reports_viewer_vote() {
    let server = TestServer::new().await;
    let (token, _) = server.signup("Jane Doe", "jane", "jane@example.com").await;
    let post_id = server
        .create_post(&token, "fact", "Octopuses have three hearts", &["biology"])
        .await;
    server.vote(&token, &post_id, Some("upvote")).await;

    // Even authenticated, the list path leaves userVote null; clients
    // resolve their own vote through the single-post or vote reads.
    let response = server
        .client
        .get(&server.url("/api/v1/posts"))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let posts: Vec<Value> = response.json().await.unwrap();

    assert_eq!(posts[0]["votes"]["upvotes"], 1);
    assert_eq!(posts[0]["votes"]["userVote"], Value::Null);
}
