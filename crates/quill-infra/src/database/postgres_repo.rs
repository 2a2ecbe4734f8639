//! PostgreSQL repository implementations.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use quill_core::domain::{Author, PostWithAuthor, User};
use quill_core::error::RepoError;
use quill_core::ports::{PostPage, PostQuery, PostRepository, UserRepository};

use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::PostgresBaseRepository;

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// Mask an email for logging to keep PII out of log output.
fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let (local, domain) = email.split_at(at_pos);
        let masked_local = if local.len() > 1 {
            format!("{}***", &local[..1])
        } else {
            "***".to_string()
        };
        format!("{}{}", masked_local, domain)
    } else {
        "***".to_string()
    }
}

fn resolve_author(
    post: post::Model,
    author: Option<user::Model>,
) -> Result<PostWithAuthor, RepoError> {
    let author = author.ok_or_else(|| {
        RepoError::Query(format!("author row missing for post {}", post.id))
    })?;

    Ok(PostWithAuthor {
        post: post.into(),
        author: Author {
            id: author.id,
            username: author.username,
        },
    })
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_with_author(&self, id: Uuid) -> Result<Option<PostWithAuthor>, RepoError> {
        let result = PostEntity::find_by_id(id)
            .find_also_related(UserEntity)
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        result
            .map(|(post, author)| resolve_author(post, author))
            .transpose()
    }

    async fn list(&self, query: PostQuery) -> Result<PostPage, RepoError> {
        let mut select = PostEntity::find();
        if let Some(published) = query.published {
            select = select.filter(post::Column::Published.eq(published));
        }

        let per_page = query.per_page.max(1);
        let page = query.page.max(1);

        let paginator = select
            .order_by_desc(post::Column::CreatedAt)
            .find_also_related(UserEntity)
            .paginate(&self.db, per_page);

        let counts = paginator
            .num_items_and_pages()
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        let rows = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        let posts = rows
            .into_iter()
            .map(|(post, author)| resolve_author(post, author))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PostPage {
            posts,
            total: counts.number_of_items,
            total_pages: counts.number_of_pages,
            page,
        })
    }
}
