//! Authentication extractor for protected routes.

use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};

use quill_core::ports::{AuthError, TokenClaims};
use quill_shared::ErrorBody;

use crate::state::AppState;

/// Authenticated user identity, extracted from the `Authorization: Bearer`
/// header.
///
/// Use this in handlers to require authentication:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: uuid::Uuid,
    pub username: String,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

/// Error type for authentication failures. Always a 401.
#[derive(Debug)]
pub struct AuthenticationError(pub AuthError);

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl actix_web::ResponseError for AuthenticationError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let body = match &self.0 {
            AuthError::TokenExpired => ErrorBody::new("Token expired"),
            AuthError::MissingAuth => ErrorBody::new("Authentication required"),
            _ => ErrorBody::new("Invalid token"),
        };

        actix_web::HttpResponse::build(self.status_code()).json(body)
    }
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            tracing::error!("AppState not found in app data");
            return ready(Err(AuthenticationError(AuthError::InvalidToken(
                "Server configuration error".to_string(),
            ))));
        };

        let auth_str = match req.headers().get(header::AUTHORIZATION) {
            Some(value) => match value.to_str() {
                Ok(s) => s,
                Err(_) => {
                    return ready(Err(AuthenticationError(AuthError::InvalidToken(
                        "Invalid authorization header".to_string(),
                    ))));
                }
            },
            None => return ready(Err(AuthenticationError(AuthError::MissingAuth))),
        };

        let Some(token) = auth_str.strip_prefix("Bearer ") else {
            return ready(Err(AuthenticationError(AuthError::InvalidToken(
                "Expected Bearer token".to_string(),
            ))));
        };

        match state.tokens.validate_token(token) {
            Ok(claims) => ready(Ok(Identity::from(claims))),
            Err(e) => ready(Err(AuthenticationError(e))),
        }
    }
}
