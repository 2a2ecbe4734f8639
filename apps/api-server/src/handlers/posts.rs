//! Post CRUD handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use quill_core::domain::validation::{sanitize_text, validate_new_post, validate_post_patch};
use quill_core::domain::{Post, PostChanges};
use quill_core::ports::PostQuery;
use quill_shared::MessageResponse;
use quill_shared::dto::{PostListQuery, PostListResponse, PostRequest, PostResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const MAX_PAGE_SIZE: u64 = 100;

/// GET /api/posts
pub async fn list(
    state: web::Data<AppState>,
    query: web::Query<PostListQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();

    let page = state
        .posts
        .list(PostQuery {
            page: query.page.unwrap_or(1).max(1),
            per_page: query.limit.unwrap_or(10).clamp(1, MAX_PAGE_SIZE),
            published: query.published,
        })
        .await?;

    Ok(HttpResponse::Ok().json(PostListResponse {
        posts: page.posts.into_iter().map(PostResponse::from).collect(),
        total_pages: page.total_pages,
        current_page: page.page,
        total: page.total,
    }))
}

/// GET /api/posts/{id}
pub async fn get(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let post = state
        .posts
        .find_with_author(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok(HttpResponse::Ok().json(PostResponse::from(post)))
}

/// POST /api/posts - Protected route
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let title = req.title.as_deref().map(sanitize_text);
    let content = req.content.as_deref().map(sanitize_text);

    let errors = validate_new_post(title.as_deref(), content.as_deref());
    if !errors.is_empty() {
        return Err(field_errors(errors));
    }

    let tags = sanitize_tags(req.tags.unwrap_or_default());
    let post = Post::new(
        identity.user_id,
        title.unwrap_or_default(),
        content.unwrap_or_default(),
        tags,
        req.published.unwrap_or(false),
    );

    let post = state.posts.insert(post).await?;
    let created = state
        .posts
        .find_with_author(post.id)
        .await?
        .ok_or_else(|| AppError::Internal("created post vanished".to_string()))?;

    tracing::info!(title = %created.post.title, author = %identity.username, "Post created");
    Ok(HttpResponse::Created().json(PostResponse::from(created)))
}

/// PUT /api/posts/{id} - Protected route
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let req = body.into_inner();

    let mut post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if !post.is_authored_by(identity.user_id) {
        return Err(AppError::Forbidden(
            "Not authorized to update this post".to_string(),
        ));
    }

    let title = req.title.as_deref().map(sanitize_text);
    let content = req.content.as_deref().map(sanitize_text);

    let errors = validate_post_patch(title.as_deref(), content.as_deref());
    if !errors.is_empty() {
        return Err(field_errors(errors));
    }

    post.apply(PostChanges {
        title,
        content,
        tags: req.tags.map(sanitize_tags),
        published: req.published,
    });

    let post = state.posts.update(post).await?;
    let updated = state
        .posts
        .find_with_author(post.id)
        .await?
        .ok_or_else(|| AppError::Internal("updated post vanished".to_string()))?;

    tracing::info!(title = %updated.post.title, author = %identity.username, "Post updated");
    Ok(HttpResponse::Ok().json(PostResponse::from(updated)))
}

/// DELETE /api/posts/{id} - Protected route
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();

    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if !post.is_authored_by(identity.user_id) {
        return Err(AppError::Forbidden(
            "Not authorized to delete this post".to_string(),
        ));
    }

    state.posts.delete(id).await?;

    tracing::info!(title = %post.title, author = %identity.username, "Post deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Post deleted successfully")))
}

fn sanitize_tags(tags: Vec<String>) -> Vec<String> {
    tags.iter().map(|tag| sanitize_text(tag)).collect()
}

fn field_errors(
    errors: std::collections::BTreeMap<&'static str, String>,
) -> AppError {
    AppError::Validation(
        errors
            .into_iter()
            .map(|(field, message)| (field.to_string(), message))
            .collect(),
    )
}
