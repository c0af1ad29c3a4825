//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
///
/// ULIDs sort lexicographically in creation order, which the feed
/// relies on for a stable tie-break among equal timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered user
///
/// Email and username are unique case-insensitively; the stored
/// casing is whatever the user signed up with.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
    /// Argon2 hash, never serialized to clients
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profile_image_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Post
// =============================================================================

/// A feed post
///
/// One of three types (fact, question, lesson), each with its own
/// content length bounds.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub content: String,
    /// Type: fact, question, lesson
    pub post_type: String,
    /// Optional source link (facts and questions)
    pub external_link: Option<String>,
    /// Optional illustration (lessons)
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostType {
    Fact,
    Question,
    Lesson,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Question => "question",
            Self::Lesson => "lesson",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fact" => Some(Self::Fact),
            "question" => Some(Self::Question),
            "lesson" => Some(Self::Lesson),
            _ => None,
        }
    }

    /// Inclusive content length bounds in characters
    pub fn content_bounds(&self) -> (usize, usize) {
        match self {
            Self::Fact => (5, 300),
            Self::Question => (10, 500),
            Self::Lesson => (50, 2000),
        }
    }

    /// Plural label used in validation messages ("Facts should be...")
    pub fn label_plural(&self) -> &'static str {
        match self {
            Self::Fact => "Facts",
            Self::Question => "Questions",
            Self::Lesson => "Lessons",
        }
    }
}

// =============================================================================
// Tags
// =============================================================================

/// A topic tag
///
/// Names are unique case-sensitively; "Rust" and "rust" are two tags.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Votes
// =============================================================================

/// A user's vote on a post
///
/// At most one row per (user, post), enforced by a unique index.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    /// Type: upvote, downvote
    pub vote_type: String,
    pub created_at: DateTime<Utc>,
}

/// Vote types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
            Self::Downvote => "downvote",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upvote" => Some(Self::Upvote),
            "downvote" => Some(Self::Downvote),
            _ => None,
        }
    }
}

/// Outcome of one vote mutation against the unique (user, post) row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteMutation {
    Created(VoteType),
    Switched(VoteType),
    Removed,
    Noop,
}

impl VoteMutation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Switched(_) => "switched",
            Self::Removed => "removed",
            Self::Noop => "noop",
        }
    }

    /// The caller's vote state after this mutation
    pub fn final_state(&self) -> Option<VoteType> {
        match self {
            Self::Created(vote_type) | Self::Switched(vote_type) => Some(*vote_type),
            Self::Removed | Self::Noop => None,
        }
    }
}

// =============================================================================
// Sessions
// =============================================================================

/// A login session
///
/// The session row is the revocation anchor; the token handed to the
/// client is a signed snapshot that references this row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

/// Notification for user interactions
///
/// Persisted to database (not volatile).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    /// Recipient user ID
    pub user_id: String,
    /// Human-readable content ("Someone upvoted your post")
    pub content: String,
    /// Type: upvote
    pub notification_type: String,
    /// Related post ID (if applicable)
    pub related_id: Option<String>,
    /// Whether user has seen this
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationType {
    Upvote,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
        }
    }
}

// =============================================================================
// Auth audit
// =============================================================================

/// An authentication attempt, recorded for audit
///
/// Failures to write these never fail the login or signup itself.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthAttempt {
    pub id: String,
    /// Masked email or username the attempt was made with
    pub identifier: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    /// Type: login, signup
    pub event_type: String,
    pub created_at: DateTime<Utc>,
}

/// Auth event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventType {
    Login,
    Signup,
}

impl AuthEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
        }
    }
}
