//! API response DTOs
//!
//! Wire types for the JSON API. Field names are camelCase to match the
//! client contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::VoteType;

/// Author summary embedded in a post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorResponse {
    pub id: String,
    pub name: String,
    pub username: String,
    pub profile_image_url: Option<String>,
}

/// Tag entry embedded in a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: String,
    pub name: String,
}

/// Vote tallies plus the viewer's own vote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSummaryResponse {
    pub upvotes: i64,
    pub downvotes: i64,
    pub user_vote: Option<VoteType>,
}

/// The viewer's vote alone, for the vote read endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVoteResponse {
    pub user_vote: Option<VoteType>,
}

/// Denormalized post: everything a client needs to render one entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPostResponse {
    pub id: String,
    pub author: AuthorResponse,
    pub content: String,
    pub post_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub external_link: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<TagResponse>,
    pub votes: VoteSummaryResponse,
}

/// Public user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub profile_image_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The signed-in user's own view of their account
///
/// Unlike [`ProfileResponse`] this includes the email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub profile_image_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Login and signup payload: the signed-in user plus their session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    pub user: CurrentUserResponse,
    pub token: String,
}

/// Notification response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub content: String,
    pub related_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Envelope returned by mutating endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> MutationResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
