//! In-memory repositories.
//!
//! Used as the fallback when no database is configured and as the backing
//! store for hermetic HTTP tests. Data is lost on process restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Author, Post, PostWithAuthor, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, PostPage, PostQuery, PostRepository, UserRepository};

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
}

/// Shared in-memory store. Cloning hands out handles to the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Store>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository {
            store: self.clone(),
        }
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository {
            store: self.clone(),
        }
    }
}

/// In-memory user repository.
pub struct InMemoryUserRepository {
    store: InMemoryStore,
}

/// In-memory post repository. Shares the store with the user repository so
/// author lookups resolve.
pub struct InMemoryPostRepository {
    store: InMemoryStore,
}

fn check_user_uniqueness(store: &Store, user: &User) -> Result<(), RepoError> {
    let taken = store
        .users
        .values()
        .any(|other| other.id != user.id && (other.username == user.username || other.email == user.email));

    if taken {
        return Err(RepoError::Constraint("Entity already exists".to_string()));
    }

    Ok(())
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let store = self.store.inner.read().await;
        Ok(store.users.get(&id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut store = self.store.inner.write().await;

        if store.users.contains_key(&user.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        check_user_uniqueness(&store, &user)?;

        store.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut store = self.store.inner.write().await;

        if !store.users.contains_key(&user.id) {
            return Err(RepoError::NotFound);
        }
        check_user_uniqueness(&store, &user)?;

        store.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut store = self.store.inner.write().await;

        if store.users.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        store.posts.retain(|_, post| post.author_id != id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let store = self.store.inner.read().await;
        Ok(store
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let store = self.store.inner.read().await;
        Ok(store.users.values().find(|user| user.email == email).cloned())
    }
}

fn with_author(store: &Store, post: Post) -> Result<PostWithAuthor, RepoError> {
    let author = store
        .users
        .get(&post.author_id)
        .ok_or_else(|| RepoError::Query(format!("author row missing for post {}", post.id)))?;

    Ok(PostWithAuthor {
        author: Author {
            id: author.id,
            username: author.username.clone(),
        },
        post,
    })
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let store = self.store.inner.read().await;
        Ok(store.posts.get(&id).cloned())
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut store = self.store.inner.write().await;

        if store.posts.contains_key(&post.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }

        store.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut store = self.store.inner.write().await;

        if !store.posts.contains_key(&post.id) {
            return Err(RepoError::NotFound);
        }

        store.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut store = self.store.inner.write().await;

        if store.posts.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_with_author(&self, id: Uuid) -> Result<Option<PostWithAuthor>, RepoError> {
        let store = self.store.inner.read().await;

        store
            .posts
            .get(&id)
            .cloned()
            .map(|post| with_author(&store, post))
            .transpose()
    }

    async fn list(&self, query: PostQuery) -> Result<PostPage, RepoError> {
        let store = self.store.inner.read().await;

        let mut matching: Vec<&Post> = store
            .posts
            .values()
            .filter(|post| query.published.is_none_or(|published| post.published == published))
            .collect();

        // Newest first; ties broken by id so pages are stable.
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let per_page = query.per_page.max(1);
        let page = query.page.max(1);
        let total_pages = total.div_ceil(per_page);

        let posts = matching
            .into_iter()
            .skip(((page - 1) * per_page) as usize)
            .take(per_page as usize)
            .cloned()
            .map(|post| with_author(&store, post))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PostPage {
            posts,
            total,
            total_pages,
            page,
        })
    }
}
