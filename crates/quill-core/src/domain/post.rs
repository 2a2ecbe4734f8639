use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post entity - a blog post or draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author identity carried alongside posts in read models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
}

/// A post joined with its author's public identity.
#[derive(Debug, Clone)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: Author,
}

/// The fields an author may change after creation.
///
/// `author_id` is deliberately absent: once set, the author reference is
/// never reassigned.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
}

impl Post {
    /// Create a new post owned by `author_id`.
    pub fn new(
        author_id: Uuid,
        title: String,
        content: String,
        tags: Vec<String>,
        published: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            title,
            content,
            tags,
            published,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user_id` is the author and so may mutate or delete the post.
    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// Merge the provided changes into the post and bump `updated_at`.
    pub fn apply(&mut self, changes: PostChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        if let Some(tags) = changes.tags {
            self.tags = tags;
        }
        if let Some(published) = changes.published {
            self.published = published;
        }
        self.updated_at = Utc::now();
    }
}
