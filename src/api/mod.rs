//! API layer
//!
//! HTTP handlers for:
//! - Feed and post CRUD
//! - Voting
//! - Accounts and sessions
//! - Notifications
//! - Metrics (Prometheus)

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::AppState;

pub mod accounts;
mod converters;
mod dto;
pub mod metrics;
pub mod notifications;
pub mod posts;
pub mod votes;

pub use converters::*;
pub use dto::*;

pub use metrics::metrics_router;

/// Create the versioned API router
///
/// Routes are split into public and authenticated endpoints.
pub fn api_router() -> Router<AppState> {
    // Public endpoints (no authentication required)
    let public_routes = Router::new()
        // Account creation and login are public
        .route("/v1/accounts", post(accounts::create_account))
        .route("/v1/auth/login", post(accounts::login))
        // Public profile views
        .route("/v1/accounts/:id", get(accounts::get_profile))
        // The feed and single posts are readable without a session
        .route("/v1/posts", get(posts::list_posts))
        .route("/v1/posts/:id", get(posts::get_post));

    // Authenticated endpoints (require valid session)
    let authenticated_routes = Router::new()
        // Session introspection and teardown
        .route(
            "/v1/accounts/verify_credentials",
            get(accounts::verify_credentials),
        )
        .route("/v1/auth/logout", post(accounts::logout))
        // Posts - write operations require auth
        .route("/v1/posts", post(posts::create_post))
        .route("/v1/posts/:id", put(posts::update_post))
        .route("/v1/posts/:id", delete(posts::delete_post))
        // Voting
        .route("/v1/posts/:id/vote", post(votes::vote))
        .route("/v1/posts/:id/vote", get(votes::get_vote))
        // Notifications
        .route("/v1/notifications", get(notifications::get_notifications))
        .route(
            "/v1/notifications/unread_count",
            get(notifications::get_unread_count),
        )
        .route(
            "/v1/notifications/:id/dismiss",
            post(notifications::dismiss_notification),
        )
        .route(
            "/v1/notifications/clear",
            post(notifications::clear_notifications),
        );

    // Merge public and authenticated routes
    // Note: Authentication is enforced by using CurrentUser extractor in handlers
    public_routes.merge(authenticated_routes)
}
