//! Notification endpoints
//!
//! Store reads only; notifications are written by the vote path.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::AppState;
use crate::api::converters::notification_to_response;
use crate::api::dto::NotificationResponse;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::{
    DB_QUERIES_TOTAL, DB_QUERY_DURATION_SECONDS, HTTP_REQUEST_DURATION_SECONDS,
    HTTP_REQUESTS_TOTAL,
};

const DEFAULT_NOTIFICATION_LIMIT: i64 = 20;
const MAX_NOTIFICATION_LIMIT: i64 = 40;

/// Notification list parameters
#[derive(Debug, Default, Deserialize)]
pub struct NotificationParams {
    pub limit: Option<i64>,
    #[serde(default)]
    pub unread: bool,
}

/// GET /api/v1/notifications
pub async fn get_notifications(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Query(params): Query<NotificationParams>,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/v1/notifications"])
        .start_timer();

    let limit = params
        .limit
        .unwrap_or(DEFAULT_NOTIFICATION_LIMIT)
        .clamp(1, MAX_NOTIFICATION_LIMIT);

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["SELECT", "notifications"])
        .start_timer();
    let notifications = state
        .db
        .get_notifications(&session.user_id, limit, params.unread)
        .await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["SELECT", "notifications"])
        .inc();
    db_timer.observe_duration();

    let responses: Vec<NotificationResponse> =
        notifications.iter().map(notification_to_response).collect();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/notifications", "200"])
        .inc();

    Ok(Json(responses))
}

/// GET /api/v1/notifications/unread_count
pub async fn get_unread_count(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/v1/notifications/unread_count"])
        .start_timer();

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["SELECT", "notifications"])
        .start_timer();
    let count = state
        .db
        .count_unread_notifications(&session.user_id)
        .await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["SELECT", "notifications"])
        .inc();
    db_timer.observe_duration();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/notifications/unread_count", "200"])
        .inc();

    Ok(Json(serde_json::json!({ "count": count })))
}

/// POST /api/v1/notifications/:id/dismiss
///
/// Marks one notification read. Scoped to the caller: dismissing
/// another user's notification is a 404, same as a missing one.
pub async fn dismiss_notification(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/v1/notifications/:id/dismiss"])
        .start_timer();

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["UPDATE", "notifications"])
        .start_timer();
    let marked = state
        .db
        .mark_notification_read(&session.user_id, &id)
        .await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["UPDATE", "notifications"])
        .inc();
    db_timer.observe_duration();

    if !marked {
        return Err(AppError::NotFound);
    }

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/notifications/:id/dismiss", "200"])
        .inc();

    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /api/v1/notifications/clear
pub async fn clear_notifications(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/v1/notifications/clear"])
        .start_timer();

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["UPDATE", "notifications"])
        .start_timer();
    state
        .db
        .mark_all_notifications_read(&session.user_id)
        .await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["UPDATE", "notifications"])
        .inc();
    db_timer.observe_duration();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/notifications/clear", "200"])
        .inc();

    Ok(Json(serde_json::json!({ "success": true })))
}
