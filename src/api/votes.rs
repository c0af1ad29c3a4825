//! Vote endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;

use crate::AppState;
use crate::api::converters::vote_summary_to_response;
use crate::api::dto::{MutationResponse, UserVoteResponse, VoteSummaryResponse};
use crate::auth::CurrentUser;
use crate::data::VoteType;
use crate::error::AppError;
use crate::metrics::{
    DB_QUERIES_TOTAL, DB_QUERY_DURATION_SECONDS, HTTP_REQUEST_DURATION_SECONDS,
    HTTP_REQUESTS_TOTAL,
};
use crate::service::VoteService;

/// Vote request
///
/// `voteType` is nullable: null clears the caller's vote, and
/// re-submitting the direction they already hold toggles it off.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub vote_type: Option<String>,
}

fn parse_vote_type(raw: Option<&str>) -> Result<Option<VoteType>, AppError> {
    match raw {
        None => Ok(None),
        Some(raw) => match VoteType::parse(raw) {
            Some(vote_type) => Ok(Some(vote_type)),
            None => Err(AppError::Validation(
                "voteType must be one of: upvote, downvote".to_string(),
            )),
        },
    }
}

fn build_vote_service(state: &AppState) -> VoteService {
    VoteService::new(state.db.clone())
}

/// POST /api/v1/posts/:id/vote
pub async fn vote(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> Result<Json<MutationResponse<VoteSummaryResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/v1/posts/:id/vote"])
        .start_timer();

    let requested = parse_vote_type(req.vote_type.as_deref())?;
    let vote_service = build_vote_service(&state);

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["UPDATE", "votes"])
        .start_timer();
    let summary = vote_service
        .apply_vote(&session.user_id, &id, requested)
        .await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["UPDATE", "votes"])
        .inc();
    db_timer.observe_duration();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/posts/:id/vote", "200"])
        .inc();

    Ok(Json(MutationResponse::new(vote_summary_to_response(
        &summary,
    ))))
}

/// GET /api/v1/posts/:id/vote
///
/// The caller's own vote on one post; the client uses this to fill in
/// `userVote` for feed entries.
pub async fn get_vote(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<UserVoteResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/v1/posts/:id/vote"])
        .start_timer();

    let vote_service = build_vote_service(&state);

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["SELECT", "votes"])
        .start_timer();
    let summary = vote_service
        .get_vote_summary(&id, Some(&session.user_id))
        .await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["SELECT", "votes"])
        .inc();
    db_timer.observe_duration();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/posts/:id/vote", "200"])
        .inc();

    Ok(Json(UserVoteResponse {
        user_vote: summary.user_vote,
    }))
}
