use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Post, PostWithAuthor, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
///
/// IDs are generated by the domain, so create and update are distinct
/// operations rather than a single upsert.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Persist a new entity.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Persist changes to an existing entity.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific lookups.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their unique username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
}

/// Filter and paging parameters for post listings.
#[derive(Debug, Clone, Copy)]
pub struct PostQuery {
    /// 1-based page number.
    pub page: u64,
    pub per_page: u64,
    /// `None` means drafts and published posts alike.
    pub published: Option<bool>,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
            published: None,
        }
    }
}

/// One page of posts with authors resolved, newest first.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<PostWithAuthor>,
    pub total: u64,
    pub total_pages: u64,
    pub page: u64,
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Fetch a post together with its author's public identity.
    async fn find_with_author(&self, id: Uuid) -> Result<Option<PostWithAuthor>, RepoError>;

    /// List posts newest-first with pagination and an optional published
    /// filter.
    async fn list(&self, query: PostQuery) -> Result<PostPage, RepoError>;
}
