//! Feed service
//!
//! Assembles the denormalized feed: posts joined with their author,
//! tags, and vote tallies, newest first. Tallies are recomputed from
//! the vote rows on every read; nothing caches counts between requests.

use std::sync::Arc;

use crate::data::{Database, Post, PostType, Tag, User, VoteType};
use crate::error::AppError;

/// A post with everything a client needs to render it.
#[derive(Debug, Clone)]
pub struct DisplayPost {
    pub post: Post,
    pub author: User,
    pub tags: Vec<Tag>,
    pub upvotes: i64,
    pub downvotes: i64,
    /// The viewing user's vote. Always `None` in the list path, where
    /// the viewer is not consulted; populated in the single-post read.
    pub user_vote: Option<VoteType>,
}

/// Feed service
pub struct FeedService {
    db: Arc<Database>,
}

impl FeedService {
    /// Create new feed service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// List posts newest first, optionally filtered by type.
    ///
    /// Ties on creation time break by insertion order. An empty page is
    /// the normal end-of-feed signal, not an error.
    pub async fn list_posts(
        &self,
        post_type: Option<PostType>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DisplayPost>, AppError> {
        let posts = self
            .db
            .get_posts_page(post_type.map(|post_type| post_type.as_str()), limit, offset)
            .await?;
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<String> = posts.iter().map(|post| post.id.clone()).collect();
        let mut author_ids: Vec<String> = posts.iter().map(|post| post.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors = self.db.get_users_batch(&author_ids).await?;
        let mut tags_by_post = self.db.get_tags_for_posts_batch(&post_ids).await?;
        let vote_counts = self.db.get_vote_counts_batch(&post_ids).await?;

        let mut display_posts = Vec::with_capacity(posts.len());
        for post in posts {
            let author = authors.get(&post.author_id).cloned().ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "post {} references missing author {}",
                    post.id,
                    post.author_id
                ))
            })?;
            let tags = tags_by_post.remove(&post.id).unwrap_or_default();
            let (upvotes, downvotes) = vote_counts.get(&post.id).copied().unwrap_or((0, 0));

            display_posts.push(DisplayPost {
                post,
                author,
                tags,
                upvotes,
                downvotes,
                user_vote: None,
            });
        }

        Ok(display_posts)
    }

    /// Single-post read, with `user_vote` populated when the viewer is
    /// known.
    ///
    /// # Errors
    /// `NotFound` if the post does not exist.
    pub async fn get_post(
        &self,
        post_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<DisplayPost, AppError> {
        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;
        let author = self.db.get_user(&post.author_id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "post {} references missing author {}",
                post.id,
                post.author_id
            ))
        })?;

        let mut tags_by_post = self.db.get_tags_for_posts_batch(&[post.id.clone()]).await?;
        let tags = tags_by_post.remove(&post.id).unwrap_or_default();
        let (upvotes, downvotes) = self.db.get_vote_counts(&post.id).await?;

        let user_vote = match viewer_id {
            Some(viewer_id) => self
                .db
                .get_vote(viewer_id, &post.id)
                .await?
                .and_then(|vote| VoteType::parse(&vote.vote_type)),
            None => None,
        };

        Ok(DisplayPost {
            post,
            author,
            tags,
            upvotes,
            downvotes,
            user_vote,
        })
    }
}
