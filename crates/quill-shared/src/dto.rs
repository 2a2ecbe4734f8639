//! Data Transfer Objects - request/response types for the API.
//!
//! Wire names are camelCase to match what browser clients expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quill_core::domain::{Author, PostWithAuthor, User};

/// Request to register a new user.
///
/// Fields default to empty strings so that missing keys surface as
/// validation errors rather than deserialization failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request to login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for creating or updating a post.
///
/// The same shape serves both operations: creation requires title and
/// content, updates merge whichever fields are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
}

/// Query parameters for the post listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub published: Option<bool>,
}

/// A user's public information. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// The author reference embedded in post responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub username: String,
}

impl From<Author> for AuthorResponse {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            username: author.username,
        }
    }
}

/// A post with its author resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub published: bool,
    pub author: AuthorResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostWithAuthor> for PostResponse {
    fn from(record: PostWithAuthor) -> Self {
        Self {
            id: record.post.id,
            title: record.post.title,
            content: record.post.content,
            tags: record.post.tags,
            published: record.post.published,
            author: record.author.into(),
            created_at: record.post.created_at,
            updated_at: record.post.updated_at,
        }
    }
}

/// One page of posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub total_pages: u64,
    pub current_page: u64,
    pub total: u64,
}

/// Response containing a freshly issued token and the user it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_uses_camel_case_and_omits_password() {
        let user = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "hashed".to_string(),
        );

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();

        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn register_request_defaults_missing_fields_to_empty() {
        let req: RegisterRequest = serde_json::from_str(r#"{"username": "alice"}"#).unwrap();

        assert_eq!(req.username, "alice");
        assert!(req.email.is_empty());
        assert!(req.password.is_empty());
    }

    #[test]
    fn post_request_rejects_non_array_tags() {
        let result =
            serde_json::from_str::<PostRequest>(r#"{"title": "Hi", "tags": "not-a-list"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn post_list_response_wire_names() {
        let body = PostListResponse {
            posts: Vec::new(),
            total_pages: 0,
            current_page: 1,
            total: 0,
        };

        let json = serde_json::to_value(body).unwrap();
        assert!(json.get("totalPages").is_some());
        assert!(json.get("currentPage").is_some());
    }
}
