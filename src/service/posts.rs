//! Post service
//!
//! Creation, editing, and deletion of posts. Content is validated
//! against the per-type length bounds, tag lists against the 1..=5
//! range, and links must parse as URLs. Validation failures come back
//! as a field-keyed error map so clients can show them inline.

use std::sync::Arc;

use crate::data::{Database, EntityId, Post, PostType};
use crate::error::{AppError, ValidationErrors};
use crate::service::TagService;

/// Bounds on the number of tags per post.
const MIN_TAGS: usize = 1;
const MAX_TAGS: usize = 5;

/// Fields accepted when creating or editing a post.
#[derive(Debug, Clone)]
pub struct PostInput {
    pub content: String,
    pub tags: Vec<String>,
    pub external_link: Option<String>,
    pub image_url: Option<String>,
}

fn push_error(errors: &mut ValidationErrors, field: &str, message: String) {
    errors.entry(field.to_string()).or_default().push(message);
}

/// Validate input against the bounds for `post_type`.
///
/// Field keys match the wire names so the error map can be returned to
/// clients as-is. Length is counted in characters, not bytes. Tag count
/// is checked on the submitted list, before deduplication.
fn validate_input(post_type: PostType, input: &PostInput) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let (min, max) = post_type.content_bounds();
    let length = input.content.chars().count();
    if length < min {
        push_error(
            &mut errors,
            "content",
            format!(
                "{} should be at least {} characters",
                post_type.label_plural(),
                min
            ),
        );
    } else if length > max {
        push_error(
            &mut errors,
            "content",
            format!("{} cannot exceed {} characters", post_type.label_plural(), max),
        );
    }

    if input.tags.len() < MIN_TAGS {
        push_error(&mut errors, "tags", "At least one tag is required".to_string());
    } else if input.tags.len() > MAX_TAGS {
        push_error(
            &mut errors,
            "tags",
            format!("Cannot have more than {MAX_TAGS} tags"),
        );
    }

    if let Some(link) = input.external_link.as_deref() {
        if url::Url::parse(link).is_err() {
            push_error(
                &mut errors,
                "externalLink",
                "Please enter a valid URL".to_string(),
            );
        }
    }

    if let Some(image_url) = input.image_url.as_deref() {
        if url::Url::parse(image_url).is_err() {
            push_error(
                &mut errors,
                "imageUrl",
                "Please enter a valid image URL".to_string(),
            );
        }
    }

    errors
}

/// Post service
pub struct PostService {
    db: Arc<Database>,
    tags: TagService,
}

impl PostService {
    /// Create new post service
    pub fn new(db: Arc<Database>) -> Self {
        let tags = TagService::new(db.clone());
        Self { db, tags }
    }

    /// Create a post for `author_id`.
    ///
    /// `post_type` is the wire value (fact, question, lesson) and picks
    /// the content bounds. Tags are resolved to rows, creating any that
    /// do not exist yet, and linked in the same transaction as the post.
    pub async fn create_post(
        &self,
        author_id: &str,
        post_type: &str,
        input: PostInput,
    ) -> Result<Post, AppError> {
        let post_type = match PostType::parse(post_type) {
            Some(post_type) => post_type,
            None => return Err(AppError::invalid_field("postType", "Invalid post type")),
        };

        let errors = validate_input(post_type, &input);
        if !errors.is_empty() {
            return Err(AppError::Invalid(errors));
        }

        let tags = self.tags.resolve_tags(&input.tags).await?;
        let tag_ids: Vec<String> = tags.into_iter().map(|tag| tag.id).collect();

        let now = chrono::Utc::now();
        let post = Post {
            id: EntityId::new().0,
            author_id: author_id.to_string(),
            content: input.content,
            post_type: post_type.as_str().to_string(),
            external_link: input.external_link,
            image_url: input.image_url,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_post_with_tags(&post, &tag_ids).await?;

        Ok(post)
    }

    /// Edit a post owned by `acting_user_id`.
    ///
    /// The post keeps its type; new content is validated against the
    /// existing type's bounds. Tag links are replaced wholesale.
    ///
    /// # Errors
    /// `NotFound` if the post does not exist, `Forbidden` if someone
    /// other than the author tries to edit it.
    pub async fn update_post(
        &self,
        acting_user_id: &str,
        post_id: &str,
        input: PostInput,
    ) -> Result<Post, AppError> {
        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;
        if post.author_id != acting_user_id {
            return Err(AppError::Forbidden);
        }

        let post_type = PostType::parse(&post.post_type).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "stored post type is unknown: {}",
                post.post_type
            ))
        })?;

        let errors = validate_input(post_type, &input);
        if !errors.is_empty() {
            return Err(AppError::Invalid(errors));
        }

        let tags = self.tags.resolve_tags(&input.tags).await?;
        let tag_ids: Vec<String> = tags.into_iter().map(|tag| tag.id).collect();

        let updated_at = chrono::Utc::now();
        let updated = self
            .db
            .update_post_with_tags(
                post_id,
                &input.content,
                input.external_link.as_deref(),
                input.image_url.as_deref(),
                updated_at,
                &tag_ids,
            )
            .await?;
        if !updated {
            // Deleted between the ownership check and the write.
            return Err(AppError::NotFound);
        }

        Ok(Post {
            content: input.content,
            external_link: input.external_link,
            image_url: input.image_url,
            updated_at,
            ..post
        })
    }

    /// Delete a post owned by `acting_user_id`.
    ///
    /// Votes and tag links go with it; tag rows stay.
    pub async fn delete_post(&self, acting_user_id: &str, post_id: &str) -> Result<(), AppError> {
        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;
        if post.author_id != acting_user_id {
            return Err(AppError::Forbidden);
        }

        let deleted = self.db.delete_post(post_id).await?;
        if !deleted {
            return Err(AppError::NotFound);
        }

        Ok(())
    }
}
