//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx for compile-time checked queries.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        // Foreign keys must be on for the delete cascades the schema
        // relies on; SQLite defaults them off per connection.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, username, display_name, password_hash,
                profile_image_url, bio, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(&user.profile_image_url)
        .bind(&user.bio)
        .bind(&user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get user by email (case-insensitive, column is COLLATE NOCASE)
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get user by username (case-insensitive, column is COLLATE NOCASE)
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get user by email or username, for login
    pub async fn get_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, AppError> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? OR username = ? LIMIT 1")
                .bind(identifier)
                .bind(identifier)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    /// Get the users with the provided IDs, keyed by ID
    pub async fn get_users_batch(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, User>, AppError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new("SELECT * FROM users WHERE id IN (");
        {
            let mut separated = query_builder.separated(", ");
            for user_id in user_ids {
                separated.push_bind(user_id);
            }
        }
        query_builder.push(")");

        let users = query_builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;

        Ok(users.into_iter().map(|user| (user.id.clone(), user)).collect())
    }

    /// Count registered users
    pub async fn count_users(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a new post and its tag links atomically
    pub async fn insert_post_with_tags(
        &self,
        post: &Post,
        tag_ids: &[String],
    ) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result: Result<(), AppError> = async {
            sqlx::query(
                r#"
                INSERT INTO posts (
                    id, author_id, content, post_type, external_link, image_url,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&post.id)
            .bind(&post.author_id)
            .bind(&post.content)
            .bind(&post.post_type)
            .bind(&post.external_link)
            .bind(&post.image_url)
            .bind(&post.created_at)
            .bind(&post.updated_at)
            .execute(&mut *conn)
            .await?;

            for tag_id in tag_ids {
                sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                    .bind(&post.id)
                    .bind(tag_id)
                    .execute(&mut *conn)
                    .await?;
            }

            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(())
            }
            Err(error) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(error)
            }
        }
    }

    /// Update a post's editable fields and replace its tag links atomically.
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching post row exists.
    pub async fn update_post_with_tags(
        &self,
        post_id: &str,
        content: &str,
        external_link: Option<&str>,
        image_url: Option<&str>,
        updated_at: DateTime<Utc>,
        tag_ids: &[String],
    ) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result: Result<bool, AppError> = async {
            let updated = sqlx::query(
                r#"
                UPDATE posts
                SET content = ?, external_link = ?, image_url = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(content)
            .bind(external_link)
            .bind(image_url)
            .bind(updated_at)
            .bind(post_id)
            .execute(&mut *conn)
            .await?;

            if updated.rows_affected() == 0 {
                return Ok(false);
            }

            sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
                .bind(post_id)
                .execute(&mut *conn)
                .await?;

            for tag_id in tag_ids {
                sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                    .bind(post_id)
                    .bind(tag_id)
                    .execute(&mut *conn)
                    .await?;
            }

            Ok(true)
        }
        .await;

        match result {
            Ok(updated) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(updated)
            }
            Err(error) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(error)
            }
        }
    }

    /// Delete a post
    ///
    /// Tag links and votes are removed by foreign key cascade.
    ///
    /// # Returns
    /// `true` if deleted, `false` if no matching post row exists.
    pub async fn delete_post(&self, post_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Get post by ID
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Get a page of posts, newest first
    ///
    /// Ties on created_at break by id ascending; ULIDs make that
    /// insertion order.
    pub async fn get_posts_page(
        &self,
        post_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, AppError> {
        let posts = match post_type {
            Some(post_type) => {
                sqlx::query_as::<_, Post>(
                    "SELECT * FROM posts WHERE post_type = ? ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
                )
                .bind(post_type)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Post>(
                    "SELECT * FROM posts ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(posts)
    }

    /// Count posts
    pub async fn count_posts(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    #[cfg(test)]
    pub async fn set_post_created_at_for_test(
        &self,
        post_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE posts SET created_at = ? WHERE id = ?")
            .bind(created_at)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// Get tag by exact name (case-sensitive)
    pub async fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>, AppError> {
        let tag = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tag)
    }

    /// Find a tag by exact name, creating it if absent.
    ///
    /// Two callers racing on a brand-new name both succeed: the loser's
    /// insert hits the unique index and re-reads the winner's row.
    pub async fn find_or_create_tag(&self, name: &str) -> Result<Tag, AppError> {
        if let Some(tag) = self.get_tag_by_name(name).await? {
            return Ok(tag);
        }

        let tag = Tag {
            id: EntityId::new().0,
            name: name.to_string(),
        };
        let result = sqlx::query("INSERT INTO tags (id, name) VALUES (?, ?)")
            .bind(&tag.id)
            .bind(&tag.name)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(tag),
            Err(error)
                if error
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation()) =>
            {
                self.get_tag_by_name(name)
                    .await?
                    .ok_or(AppError::Database(error))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Get tags for the provided post IDs, keyed by post ID
    pub async fn get_tags_for_posts_batch(
        &self,
        post_ids: &[String],
    ) -> Result<HashMap<String, Vec<Tag>>, AppError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new(
            "SELECT post_tags.post_id, tags.id, tags.name FROM post_tags \
             JOIN tags ON tags.id = post_tags.tag_id WHERE post_tags.post_id IN (",
        );
        {
            let mut separated = query_builder.separated(", ");
            for post_id in post_ids {
                separated.push_bind(post_id);
            }
        }
        query_builder.push(")");

        let rows = query_builder
            .build_query_as::<(String, String, String)>()
            .fetch_all(&self.pool)
            .await?;

        let mut tags: HashMap<String, Vec<Tag>> = HashMap::new();
        for (post_id, tag_id, tag_name) in rows {
            tags.entry(post_id).or_default().push(Tag {
                id: tag_id,
                name: tag_name,
            });
        }

        Ok(tags)
    }

    // =========================================================================
    // Votes
    // =========================================================================

    /// Get a user's vote on a post
    pub async fn get_vote(&self, user_id: &str, post_id: &str) -> Result<Option<Vote>, AppError> {
        let vote =
            sqlx::query_as::<_, Vote>("SELECT * FROM votes WHERE user_id = ? AND post_id = ?")
                .bind(user_id)
                .bind(post_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(vote)
    }

    /// Apply one vote transition atomically.
    ///
    /// Reads the caller's current vote and applies the requested change
    /// in a single write transaction: same direction again deletes
    /// (toggle-off), the opposite direction updates in place, null
    /// deletes, and no existing row inserts. A unique-index violation
    /// surfaces as a Database error for the caller to retry.
    pub async fn apply_vote_transition(
        &self,
        user_id: &str,
        post_id: &str,
        requested: Option<VoteType>,
    ) -> Result<VoteMutation, AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result: Result<VoteMutation, AppError> = async {
            let existing =
                sqlx::query_as::<_, Vote>("SELECT * FROM votes WHERE user_id = ? AND post_id = ?")
                    .bind(user_id)
                    .bind(post_id)
                    .fetch_optional(&mut *conn)
                    .await?;

            let mutation = match (existing, requested) {
                (None, None) => VoteMutation::Noop,
                (None, Some(requested)) => {
                    sqlx::query(
                        r#"
                        INSERT INTO votes (id, user_id, post_id, vote_type, created_at)
                        VALUES (?, ?, ?, ?, ?)
                        "#,
                    )
                    .bind(EntityId::new().0)
                    .bind(user_id)
                    .bind(post_id)
                    .bind(requested.as_str())
                    .bind(Utc::now())
                    .execute(&mut *conn)
                    .await?;
                    VoteMutation::Created(requested)
                }
                (Some(existing), Some(requested)) if existing.vote_type == requested.as_str() => {
                    // Same direction again is toggle-off
                    sqlx::query("DELETE FROM votes WHERE id = ?")
                        .bind(&existing.id)
                        .execute(&mut *conn)
                        .await?;
                    VoteMutation::Removed
                }
                (Some(existing), Some(requested)) => {
                    sqlx::query("UPDATE votes SET vote_type = ? WHERE id = ?")
                        .bind(requested.as_str())
                        .bind(&existing.id)
                        .execute(&mut *conn)
                        .await?;
                    VoteMutation::Switched(requested)
                }
                (Some(existing), None) => {
                    sqlx::query("DELETE FROM votes WHERE id = ?")
                        .bind(&existing.id)
                        .execute(&mut *conn)
                        .await?;
                    VoteMutation::Removed
                }
            };

            Ok(mutation)
        }
        .await;

        match result {
            Ok(mutation) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(mutation)
            }
            Err(error) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(error)
            }
        }
    }

    /// Count upvotes and downvotes for a post
    pub async fn get_vote_counts(&self, post_id: &str) -> Result<(i64, i64), AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT vote_type, COUNT(*) FROM votes WHERE post_id = ? GROUP BY vote_type",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        let mut upvotes = 0;
        let mut downvotes = 0;
        for (vote_type, count) in rows {
            match vote_type.as_str() {
                "upvote" => upvotes = count,
                "downvote" => downvotes = count,
                _ => {}
            }
        }

        Ok((upvotes, downvotes))
    }

    /// Count votes for the provided post IDs, keyed by post ID as
    /// (upvotes, downvotes)
    pub async fn get_vote_counts_batch(
        &self,
        post_ids: &[String],
    ) -> Result<HashMap<String, (i64, i64)>, AppError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new(
            "SELECT post_id, vote_type, COUNT(*) FROM votes WHERE post_id IN (",
        );
        {
            let mut separated = query_builder.separated(", ");
            for post_id in post_ids {
                separated.push_bind(post_id);
            }
        }
        query_builder.push(") GROUP BY post_id, vote_type");

        let rows = query_builder
            .build_query_as::<(String, String, i64)>()
            .fetch_all(&self.pool)
            .await?;

        let mut counts: HashMap<String, (i64, i64)> = HashMap::new();
        for (post_id, vote_type, count) in rows {
            let entry = counts.entry(post_id).or_default();
            match vote_type.as_str() {
                "upvote" => entry.0 = count,
                "downvote" => entry.1 = count,
                _ => {}
            }
        }

        Ok(counts)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Insert a session row
    pub async fn insert_session(&self, session: &SessionRecord) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.created_at)
        .bind(&session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get session by ID
    pub async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, AppError> {
        let session = sqlx::query_as::<_, SessionRecord>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Delete a session row
    ///
    /// # Returns
    /// `true` if deleted, `false` if no matching session row exists.
    pub async fn delete_session(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete sessions that expired before `now`
    pub async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Insert notification
    pub async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, user_id, content, notification_type, related_id, is_read, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(&notification.content)
        .bind(&notification.notification_type)
        .bind(&notification.related_id)
        .bind(notification.is_read)
        .bind(&notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a user's notifications, newest first
    pub async fn get_notifications(
        &self,
        user_id: &str,
        limit: i64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AppError> {
        let notifications = if unread_only {
            sqlx::query_as::<_, Notification>(
                "SELECT * FROM notifications WHERE user_id = ? AND is_read = 0 ORDER BY created_at DESC LIMIT ?"
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, Notification>(
                "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(notifications)
    }

    /// Count a user's unread notifications
    pub async fn count_unread_notifications(&self, user_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Mark one of a user's notifications as read
    ///
    /// # Returns
    /// `true` if marked, `false` if the notification does not exist or
    /// belongs to another user.
    pub async fn mark_notification_read(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Mark all of a user's notifications as read
    pub async fn mark_all_notifications_read(&self, user_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Auth attempts
    // =========================================================================

    /// Record an authentication attempt for audit
    pub async fn insert_auth_attempt(&self, attempt: &AuthAttempt) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO auth_attempts (
                id, identifier, ip_address, user_agent, success, event_type, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&attempt.id)
        .bind(&attempt.identifier)
        .bind(&attempt.ip_address)
        .bind(&attempt.user_agent)
        .bind(attempt.success)
        .bind(&attempt.event_type)
        .bind(&attempt.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
