//! # Quill Client
//!
//! Typed HTTP client for the Quill API. Holds the bearer token issued at
//! registration or login and attaches it to every authenticated request;
//! server error messages are surfaced verbatim.

use std::collections::BTreeMap;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use quill_shared::dto::{
    AuthResponse, LoginRequest, PostListResponse, PostRequest, PostResponse, RegisterRequest,
    UserResponse,
};
use quill_shared::{ErrorBody, MessageResponse};

/// Client-side errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error body.
    #[error("{message}")]
    Api {
        status: StatusCode,
        message: String,
        details: Option<BTreeMap<String, String>>,
    },

    /// The request never produced a usable response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// HTTP client for the Quill API.
pub struct QuillClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl QuillClient {
    /// Create a client against `base_url`, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Resume a session from a previously stored token.
    pub fn with_token(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut client = Self::new(base_url);
        client.token = Some(token.into());
        client
    }

    /// The current bearer token, if any. Callers persist this to resume
    /// sessions later.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Drop the stored credential.
    pub fn logout(&mut self) {
        self.token = None;
    }

    /// Register a new account and store the issued token.
    pub async fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ClientResult<AuthResponse> {
        let body = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };

        let auth: AuthResponse = self
            .handle(
                self.http
                    .post(self.url("/api/auth/register"))
                    .json(&body)
                    .send()
                    .await?,
            )
            .await?;

        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    /// Login and store the issued token.
    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<AuthResponse> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let auth: AuthResponse = self
            .handle(
                self.http
                    .post(self.url("/api/auth/login"))
                    .json(&body)
                    .send()
                    .await?,
            )
            .await?;

        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    /// Fetch the authenticated user.
    pub async fn me(&self) -> ClientResult<UserResponse> {
        self.handle(self.authed(self.http.get(self.url("/api/auth/me"))).send().await?)
            .await
    }

    /// List posts, newest first.
    pub async fn list_posts(
        &self,
        page: Option<u64>,
        limit: Option<u64>,
        published: Option<bool>,
    ) -> ClientResult<PostListResponse> {
        let mut request = self.http.get(self.url("/api/posts"));

        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        if let Some(published) = published {
            request = request.query(&[("published", published)]);
        }

        self.handle(request.send().await?).await
    }

    /// Fetch a single post.
    pub async fn get_post(&self, id: Uuid) -> ClientResult<PostResponse> {
        self.handle(
            self.http
                .get(self.url(&format!("/api/posts/{id}")))
                .send()
                .await?,
        )
        .await
    }

    /// Create a post as the authenticated user.
    pub async fn create_post(&self, body: &PostRequest) -> ClientResult<PostResponse> {
        self.handle(
            self.authed(self.http.post(self.url("/api/posts")))
                .json(body)
                .send()
                .await?,
        )
        .await
    }

    /// Update one of the authenticated user's posts.
    pub async fn update_post(&self, id: Uuid, body: &PostRequest) -> ClientResult<PostResponse> {
        self.handle(
            self.authed(self.http.put(self.url(&format!("/api/posts/{id}"))))
                .json(body)
                .send()
                .await?,
        )
        .await
    }

    /// Delete one of the authenticated user's posts.
    pub async fn delete_post(&self, id: Uuid) -> ClientResult<MessageResponse> {
        self.handle(
            self.authed(self.http.delete(self.url(&format!("/api/posts/{id}"))))
                .send()
                .await?,
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn handle<T: DeserializeOwned>(&self, response: Response) -> ClientResult<T> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let (message, details) = match response.json::<ErrorBody>().await {
            Ok(body) => (body.error, body.details),
            Err(_) => (
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
                None,
            ),
        };

        Err(ClientError::Api {
            status,
            message,
            details,
        })
    }
}
