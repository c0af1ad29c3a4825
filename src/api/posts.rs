//! Post endpoints
//!
//! Feed listing, single-post reads, and authenticated post authoring.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::AppState;
use crate::api::converters::display_post_to_response;
use crate::api::dto::{DisplayPostResponse, MutationResponse};
use crate::auth::{CurrentUser, MaybeUser};
use crate::data::PostType;
use crate::error::AppError;
use crate::metrics::{
    DB_QUERIES_TOTAL, DB_QUERY_DURATION_SECONDS, HTTP_REQUEST_DURATION_SECONDS,
    HTTP_REQUESTS_TOTAL, POSTS_TOTAL,
};
use crate::service::{FeedService, PostInput, PostService};

/// Feed query parameters
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    /// Post type filter (fact, question, lesson)
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

/// Post creation request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub content: String,
    pub post_type: String,
    pub tags: Vec<String>,
    pub external_link: Option<String>,
    pub image_url: Option<String>,
}

/// Post update request
///
/// The post type is fixed at creation; an update revalidates content
/// against the existing type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub content: String,
    pub tags: Vec<String>,
    pub external_link: Option<String>,
    pub image_url: Option<String>,
}

fn parse_type_filter(raw: Option<&str>) -> Result<Option<PostType>, AppError> {
    match raw {
        None => Ok(None),
        Some(raw) => match PostType::parse(raw) {
            Some(post_type) => Ok(Some(post_type)),
            None => Err(AppError::Validation(
                "type must be one of: fact, question, lesson".to_string(),
            )),
        },
    }
}

fn build_feed_service(state: &AppState) -> FeedService {
    FeedService::new(state.db.clone())
}

fn build_post_service(state: &AppState) -> PostService {
    PostService::new(state.db.clone())
}

/// GET /api/v1/posts
///
/// Public feed, newest first. `userVote` is always null here; the
/// single-post read is the path that knows the viewer.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Result<Json<Vec<DisplayPostResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/v1/posts"])
        .start_timer();

    let post_type = parse_type_filter(params.post_type.as_deref())?;
    let limit = params.limit.unwrap_or(state.config.feed.default_limit);
    let skip = params.skip.unwrap_or(0);
    if limit < 0 || skip < 0 {
        return Err(AppError::Validation(
            "limit and skip must be non-negative".to_string(),
        ));
    }

    let feed_service = build_feed_service(&state);

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["SELECT", "posts"])
        .start_timer();
    let display_posts = feed_service.list_posts(post_type, limit, skip).await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["SELECT", "posts"])
        .inc();
    db_timer.observe_duration();

    let responses: Vec<DisplayPostResponse> =
        display_posts.iter().map(display_post_to_response).collect();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/posts", "200"])
        .inc();

    Ok(Json(responses))
}

/// GET /api/v1/posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<DisplayPostResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/v1/posts/:id"])
        .start_timer();

    let feed_service = build_feed_service(&state);
    let viewer_id = session.as_ref().map(|session| session.user_id.as_str());

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["SELECT", "posts"])
        .start_timer();
    let display = feed_service.get_post(&id, viewer_id).await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["SELECT", "posts"])
        .inc();
    db_timer.observe_duration();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/posts/:id", "200"])
        .inc();

    Ok(Json(display_post_to_response(&display)))
}

/// POST /api/v1/posts
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<MutationResponse<DisplayPostResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/v1/posts"])
        .start_timer();

    let post_service = build_post_service(&state);
    let feed_service = build_feed_service(&state);

    let input = PostInput {
        content: req.content,
        tags: req.tags,
        external_link: req.external_link,
        image_url: req.image_url,
    };

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["INSERT", "posts"])
        .start_timer();
    let post = post_service
        .create_post(&session.user_id, &req.post_type, input)
        .await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["INSERT", "posts"])
        .inc();
    db_timer.observe_duration();

    POSTS_TOTAL.inc();

    // Return the denormalized shape the feed serves.
    let display = feed_service
        .get_post(&post.id, Some(&session.user_id))
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/posts", "200"])
        .inc();

    Ok(Json(MutationResponse::new(display_post_to_response(
        &display,
    ))))
}

/// PUT /api/v1/posts/:id
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<MutationResponse<DisplayPostResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["PUT", "/api/v1/posts/:id"])
        .start_timer();

    let post_service = build_post_service(&state);
    let feed_service = build_feed_service(&state);

    let input = PostInput {
        content: req.content,
        tags: req.tags,
        external_link: req.external_link,
        image_url: req.image_url,
    };

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["UPDATE", "posts"])
        .start_timer();
    let post = post_service
        .update_post(&session.user_id, &id, input)
        .await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["UPDATE", "posts"])
        .inc();
    db_timer.observe_duration();

    let display = feed_service
        .get_post(&post.id, Some(&session.user_id))
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["PUT", "/api/v1/posts/:id", "200"])
        .inc();

    Ok(Json(MutationResponse::new(display_post_to_response(
        &display,
    ))))
}

/// DELETE /api/v1/posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["DELETE", "/api/v1/posts/:id"])
        .start_timer();

    let post_service = build_post_service(&state);

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["DELETE", "posts"])
        .start_timer();
    post_service.delete_post(&session.user_id, &id).await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["DELETE", "posts"])
        .inc();
    db_timer.observe_duration();

    POSTS_TOTAL.dec();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["DELETE", "/api/v1/posts/:id", "200"])
        .inc();

    Ok(Json(serde_json::json!({ "success": true })))
}
