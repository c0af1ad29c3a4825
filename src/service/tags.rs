//! Tag resolution service
//!
//! Maps submitted tag names onto persisted tag rows, creating rows for
//! names seen for the first time.

use std::collections::HashSet;
use std::sync::Arc;

use crate::data::{Database, Tag};
use crate::error::AppError;

/// Tag service
pub struct TagService {
    db: Arc<Database>,
}

impl TagService {
    /// Create new tag service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Resolve tag names to persisted tags.
    ///
    /// Duplicate names collapse to one tag, keeping first-occurrence
    /// order. Names are compared case-sensitively, so "Rust" and "rust"
    /// resolve to two different tags.
    pub async fn resolve_tags(&self, names: &[String]) -> Result<Vec<Tag>, AppError> {
        let mut seen = HashSet::new();
        let mut tags = Vec::with_capacity(names.len());

        for name in names {
            if !seen.insert(name.as_str()) {
                continue;
            }
            tags.push(self.db.find_or_create_tag(name).await?);
        }

        Ok(tags)
    }
}
