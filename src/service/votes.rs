//! Vote service
//!
//! Applies vote transitions against the one-row-per-(user, post)
//! constraint, retrying writes that lose a race, and notifies post
//! authors about new upvotes.

use std::sync::Arc;

use crate::data::{
    Database, EntityId, Notification, NotificationType, Post, VoteMutation, VoteType,
};
use crate::error::AppError;
use crate::metrics::{NOTIFICATIONS_ENQUEUED_TOTAL, VOTES_TOTAL, VOTE_CONFLICTS_TOTAL};

/// Attempts before a racing vote write gives up with a conflict error.
const MAX_VOTE_RETRIES: usize = 3;

/// Vote tallies for a post plus the acting user's own vote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteSummary {
    pub upvotes: i64,
    pub downvotes: i64,
    pub user_vote: Option<VoteType>,
}

/// Vote service
pub struct VoteService {
    db: Arc<Database>,
}

impl VoteService {
    /// Create new vote service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Apply a vote request for `user_id` on `post_id`.
    ///
    /// Submitting the direction the user already holds removes the vote
    /// (toggle-off); the opposite direction switches it in place; `None`
    /// clears any existing vote. Returns the recounted tallies together
    /// with the user's final vote state.
    ///
    /// # Errors
    /// `NotFound` if the post does not exist, `VoteConflict` if the
    /// write keeps losing races against concurrent votes by the same
    /// user.
    pub async fn apply_vote(
        &self,
        user_id: &str,
        post_id: &str,
        requested: Option<VoteType>,
    ) -> Result<VoteSummary, AppError> {
        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;

        let mut outcome = None;
        for attempt in 1..=MAX_VOTE_RETRIES {
            match self
                .db
                .apply_vote_transition(user_id, post_id, requested)
                .await
            {
                Ok(mutation) => {
                    outcome = Some(mutation);
                    break;
                }
                Err(error) if error.is_unique_violation() => {
                    VOTE_CONFLICTS_TOTAL.inc();
                    tracing::debug!(
                        %post_id,
                        attempt,
                        "vote write lost a race on the (user, post) unique index, retrying"
                    );
                }
                Err(error) => return Err(error),
            }
        }

        let mutation = match outcome {
            Some(mutation) => mutation,
            None => return Err(AppError::VoteConflict),
        };

        VOTES_TOTAL.with_label_values(&[mutation.as_str()]).inc();

        // Only votes that land on upvote notify, and never for the
        // author's own post.
        let lands_on_upvote = matches!(
            mutation,
            VoteMutation::Created(VoteType::Upvote) | VoteMutation::Switched(VoteType::Upvote)
        );
        if lands_on_upvote && user_id != post.author_id {
            self.notify_upvote(&post, post_id).await;
        }

        let (upvotes, downvotes) = self.db.get_vote_counts(post_id).await?;

        Ok(VoteSummary {
            upvotes,
            downvotes,
            user_vote: mutation.final_state(),
        })
    }

    /// Current tallies for a post and the viewer's vote, if any.
    ///
    /// # Errors
    /// `NotFound` if the post does not exist.
    pub async fn get_vote_summary(
        &self,
        post_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<VoteSummary, AppError> {
        if self.db.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let (upvotes, downvotes) = self.db.get_vote_counts(post_id).await?;
        let user_vote = match viewer_id {
            Some(viewer_id) => self
                .db
                .get_vote(viewer_id, post_id)
                .await?
                .and_then(|vote| VoteType::parse(&vote.vote_type)),
            None => None,
        };

        Ok(VoteSummary {
            upvotes,
            downvotes,
            user_vote,
        })
    }

    /// Enqueue an upvote notification for the post author.
    ///
    /// Best effort: the vote is already committed, so a failed insert is
    /// logged and swallowed rather than failing the request.
    async fn notify_upvote(&self, post: &Post, post_id: &str) {
        let notification = Notification {
            id: EntityId::new().0,
            user_id: post.author_id.clone(),
            content: "Someone upvoted your post".to_string(),
            notification_type: NotificationType::Upvote.as_str().to_string(),
            related_id: Some(post_id.to_string()),
            is_read: false,
            created_at: chrono::Utc::now(),
        };

        match self.db.insert_notification(&notification).await {
            Ok(()) => NOTIFICATIONS_ENQUEUED_TOTAL.inc(),
            Err(error) => {
                tracing::warn!(
                    %post_id,
                    error = %error,
                    "failed to enqueue upvote notification"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    use crate::data::User;

    async fn create_test_db() -> (Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-votes.db");
        let db = Database::connect(&db_path).await.unwrap();
        (Arc::new(db), temp_dir)
    }

    async fn seed_user(db: &Database, tag: &str) -> User {
        let user = User {
            id: EntityId::new().0,
            email: format!("{tag}@example.com"),
            username: tag.to_string(),
            display_name: format!("User {tag}"),
            password_hash: "not-a-real-hash".to_string(),
            profile_image_url: None,
            bio: None,
            created_at: Utc::now(),
        };
        db.insert_user(&user).await.unwrap();
        user
    }

    async fn seed_post(db: &Database, author_id: &str) -> Post {
        let post = Post {
            id: EntityId::new().0,
            author_id: author_id.to_string(),
            content: "The Eiffel Tower grows in summer".to_string(),
            post_type: "fact".to_string(),
            external_link: None,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.insert_post_with_tags(&post, &[]).await.unwrap();
        post
    }

    #[tokio::test]
    async fn first_vote_creates_and_counts() {
        let (db, _temp_dir) = create_test_db().await;
        let author = seed_user(&db, "author").await;
        let voter = seed_user(&db, "voter").await;
        let post = seed_post(&db, &author.id).await;
        let service = VoteService::new(db);

        let summary = service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Upvote))
            .await
            .unwrap();

        assert_eq!(summary.upvotes, 1);
        assert_eq!(summary.downvotes, 0);
        assert_eq!(summary.user_vote, Some(VoteType::Upvote));
    }

    #[tokio::test]
    async fn same_direction_again_toggles_off() {
        let (db, _temp_dir) = create_test_db().await;
        let author = seed_user(&db, "author").await;
        let voter = seed_user(&db, "voter").await;
        let post = seed_post(&db, &author.id).await;
        let service = VoteService::new(db.clone());

        service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Downvote))
            .await
            .unwrap();
        let summary = service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Downvote))
            .await
            .unwrap();

        assert_eq!(summary.upvotes, 0);
        assert_eq!(summary.downvotes, 0);
        assert_eq!(summary.user_vote, None);
        assert!(db.get_vote(&voter.id, &post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn opposite_direction_switches_in_place() {
        let (db, _temp_dir) = create_test_db().await;
        let author = seed_user(&db, "author").await;
        let voter = seed_user(&db, "voter").await;
        let post = seed_post(&db, &author.id).await;
        let service = VoteService::new(db.clone());

        service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Upvote))
            .await
            .unwrap();
        let summary = service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Downvote))
            .await
            .unwrap();

        assert_eq!(summary.upvotes, 0);
        assert_eq!(summary.downvotes, 1);
        assert_eq!(summary.user_vote, Some(VoteType::Downvote));

        // Still exactly one row for this user on this post.
        let vote = db.get_vote(&voter.id, &post.id).await.unwrap().unwrap();
        assert_eq!(vote.vote_type, "downvote");
    }

    #[tokio::test]
    async fn null_request_clears_existing_and_noops_on_absent() {
        let (db, _temp_dir) = create_test_db().await;
        let author = seed_user(&db, "author").await;
        let voter = seed_user(&db, "voter").await;
        let post = seed_post(&db, &author.id).await;
        let service = VoteService::new(db.clone());

        let noop = service.apply_vote(&voter.id, &post.id, None).await.unwrap();
        assert_eq!(noop.user_vote, None);
        assert_eq!((noop.upvotes, noop.downvotes), (0, 0));

        service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Upvote))
            .await
            .unwrap();
        let cleared = service.apply_vote(&voter.id, &post.id, None).await.unwrap();
        assert_eq!(cleared.user_vote, None);
        assert_eq!((cleared.upvotes, cleared.downvotes), (0, 0));
    }

    #[tokio::test]
    async fn votes_from_different_users_accumulate() {
        let (db, _temp_dir) = create_test_db().await;
        let author = seed_user(&db, "author").await;
        let first = seed_user(&db, "first").await;
        let second = seed_user(&db, "second").await;
        let post = seed_post(&db, &author.id).await;
        let service = VoteService::new(db);

        service
            .apply_vote(&first.id, &post.id, Some(VoteType::Upvote))
            .await
            .unwrap();
        let summary = service
            .apply_vote(&second.id, &post.id, Some(VoteType::Upvote))
            .await
            .unwrap();

        assert_eq!(summary.upvotes, 2);
        assert_eq!(summary.downvotes, 0);
    }

    #[tokio::test]
    async fn vote_on_missing_post_is_not_found() {
        let (db, _temp_dir) = create_test_db().await;
        let voter = seed_user(&db, "voter").await;
        let service = VoteService::new(db);

        let error = service
            .apply_vote(&voter.id, "01ARZ3NDEKTSV4RRFFQ69G5FAV", Some(VoteType::Upvote))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::NotFound));
    }

    #[tokio::test]
    async fn upvote_notifies_the_author() {
        let (db, _temp_dir) = create_test_db().await;
        let author = seed_user(&db, "author").await;
        let voter = seed_user(&db, "voter").await;
        let post = seed_post(&db, &author.id).await;
        let service = VoteService::new(db.clone());

        service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Upvote))
            .await
            .unwrap();

        let notifications = db.get_notifications(&author.id, 10, false).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].content, "Someone upvoted your post");
        assert_eq!(notifications[0].notification_type, "upvote");
        assert_eq!(notifications[0].related_id.as_deref(), Some(post.id.as_str()));
        assert!(!notifications[0].is_read);
    }

    #[tokio::test]
    async fn downvote_and_self_vote_do_not_notify() {
        let (db, _temp_dir) = create_test_db().await;
        let author = seed_user(&db, "author").await;
        let voter = seed_user(&db, "voter").await;
        let post = seed_post(&db, &author.id).await;
        let service = VoteService::new(db.clone());

        service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Downvote))
            .await
            .unwrap();
        service
            .apply_vote(&author.id, &post.id, Some(VoteType::Upvote))
            .await
            .unwrap();

        let notifications = db.get_notifications(&author.id, 10, false).await.unwrap();
        assert!(notifications.is_empty());
    }

    #[tokio::test]
    async fn switch_to_upvote_notifies() {
        let (db, _temp_dir) = create_test_db().await;
        let author = seed_user(&db, "author").await;
        let voter = seed_user(&db, "voter").await;
        let post = seed_post(&db, &author.id).await;
        let service = VoteService::new(db.clone());

        service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Downvote))
            .await
            .unwrap();
        service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Upvote))
            .await
            .unwrap();

        let notifications = db.get_notifications(&author.id, 10, false).await.unwrap();
        assert_eq!(notifications.len(), 1);
    }

    #[tokio::test]
    async fn toggle_off_does_not_notify() {
        let (db, _temp_dir) = create_test_db().await;
        let author = seed_user(&db, "author").await;
        let voter = seed_user(&db, "voter").await;
        let post = seed_post(&db, &author.id).await;
        let service = VoteService::new(db.clone());

        service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Upvote))
            .await
            .unwrap();
        service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Upvote))
            .await
            .unwrap();

        // The initial upvote notified; the toggle-off must not add more.
        let notifications = db.get_notifications(&author.id, 10, false).await.unwrap();
        assert_eq!(notifications.len(), 1);
    }

    #[tokio::test]
    async fn summary_reflects_the_viewer() {
        let (db, _temp_dir) = create_test_db().await;
        let author = seed_user(&db, "author").await;
        let voter = seed_user(&db, "voter").await;
        let other = seed_user(&db, "other").await;
        let post = seed_post(&db, &author.id).await;
        let service = VoteService::new(db);

        service
            .apply_vote(&voter.id, &post.id, Some(VoteType::Upvote))
            .await
            .unwrap();

        let for_voter = service
            .get_vote_summary(&post.id, Some(&voter.id))
            .await
            .unwrap();
        assert_eq!(for_voter.user_vote, Some(VoteType::Upvote));

        let for_other = service
            .get_vote_summary(&post.id, Some(&other.id))
            .await
            .unwrap();
        assert_eq!(for_other.user_vote, None);

        let anonymous = service.get_vote_summary(&post.id, None).await.unwrap();
        assert_eq!(anonymous.user_vote, None);
        assert_eq!(anonymous.upvotes, 1);
    }
}
