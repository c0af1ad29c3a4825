//! Conversion functions from domain models to API DTOs

use crate::api::dto::*;
use crate::data::{Notification, User};
use crate::service::{DisplayPost, VoteSummary};

/// Convert an assembled DisplayPost to its wire shape
pub fn display_post_to_response(display: &DisplayPost) -> DisplayPostResponse {
    DisplayPostResponse {
        id: display.post.id.clone(),
        author: AuthorResponse {
            id: display.author.id.clone(),
            name: display.author.display_name.clone(),
            username: display.author.username.clone(),
            profile_image_url: display.author.profile_image_url.clone(),
        },
        content: display.post.content.clone(),
        post_type: display.post.post_type.clone(),
        created_at: display.post.created_at,
        updated_at: display.post.updated_at,
        external_link: display.post.external_link.clone(),
        image_url: display.post.image_url.clone(),
        tags: display
            .tags
            .iter()
            .map(|tag| TagResponse {
                id: tag.id.clone(),
                name: tag.name.clone(),
            })
            .collect(),
        votes: VoteSummaryResponse {
            upvotes: display.upvotes,
            downvotes: display.downvotes,
            user_vote: display.user_vote,
        },
    }
}

/// Convert a VoteSummary to its wire shape
pub fn vote_summary_to_response(summary: &VoteSummary) -> VoteSummaryResponse {
    VoteSummaryResponse {
        upvotes: summary.upvotes,
        downvotes: summary.downvotes,
        user_vote: summary.user_vote,
    }
}

/// Convert a User to the public profile shape
pub fn profile_to_response(user: &User) -> ProfileResponse {
    ProfileResponse {
        id: user.id.clone(),
        username: user.username.clone(),
        display_name: user.display_name.clone(),
        profile_image_url: user.profile_image_url.clone(),
        bio: user.bio.clone(),
        created_at: user.created_at,
    }
}

/// Convert a User to their own account view
pub fn current_user_to_response(user: &User) -> CurrentUserResponse {
    CurrentUserResponse {
        id: user.id.clone(),
        username: user.username.clone(),
        display_name: user.display_name.clone(),
        email: user.email.clone(),
        profile_image_url: user.profile_image_url.clone(),
        bio: user.bio.clone(),
        created_at: user.created_at,
    }
}

/// Convert a Notification to its wire shape
pub fn notification_to_response(notification: &Notification) -> NotificationResponse {
    NotificationResponse {
        id: notification.id.clone(),
        notification_type: notification.notification_type.clone(),
        content: notification.content.clone(),
        related_id: notification.related_id.clone(),
        is_read: notification.is_read,
        created_at: notification.created_at,
    }
}
