//! Common test utilities for E2E tests

pub mod schema_validator;

use factfeed::{AppState, build_router, config};
use serde_json::Value;
use std::sync::Once;
use tempfile::TempDir;
use tokio::net::TcpListener;

static INIT_METRICS: Once = Once::new();

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        // The registry is process-global; register instruments once.
        INIT_METRICS.call_once(factfeed::metrics::init_metrics);

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
            },
            feed: config::FeedConfig { default_limit: 10 },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config.clone()).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build the same router the binary runs
        let app = build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Sign up a user through the API
    ///
    /// Returns `(token, user_id)` for use in authenticated requests.
    pub async fn signup(&self, name: &str, username: &str, email: &str) -> (String, String) {
        let response = self
            .client
            .post(&self.url("/api/v1/accounts"))
            .json(&serde_json::json!({
                "name": name,
                "username": username,
                "email": email,
                "password": "correct horse battery",
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200, "signup failed for {}", username);
        let json: Value = response.json().await.unwrap();
        let token = json["data"]["token"].as_str().unwrap().to_string();
        let user_id = json["data"]["user"]["id"].as_str().unwrap().to_string();
        (token, user_id)
    }

    /// Create a post through the API, returning its id
    pub async fn create_post(
        &self,
        token: &str,
        post_type: &str,
        content: &str,
        tags: &[&str],
    ) -> String {
        let response = self
            .client
            .post(&self.url("/api/v1/posts"))
            .header("Authorization", format!("Bearer {}", token))
            .json(&serde_json::json!({
                "content": content,
                "postType": post_type,
                "tags": tags,
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200, "create_post failed: {}", content);
        let json: Value = response.json().await.unwrap();
        json["data"]["id"].as_str().unwrap().to_string()
    }

    /// Cast a vote through the API
    pub async fn vote(&self, token: &str, post_id: &str, vote_type: Option<&str>) -> Value {
        let response = self
            .client
            .post(&self.url(&format!("/api/v1/posts/{}/vote", post_id)))
            .header("Authorization", format!("Bearer {}", token))
            .json(&serde_json::json!({ "voteType": vote_type }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200, "vote failed on {}", post_id);
        response.json().await.unwrap()
    }
}
