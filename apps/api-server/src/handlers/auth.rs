//! Authentication handlers.

use actix_web::{HttpResponse, web};

use quill_core::domain::User;
use quill_core::domain::validation::{
    sanitize_text, validate_email, validate_password, validate_username,
};
use quill_shared::dto::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let username = sanitize_text(&req.username);

    if !validate_username(&username) {
        return Err(AppError::BadRequest(
            "Username must be 3-20 characters long".to_string(),
        ));
    }
    if !validate_email(&req.email) {
        return Err(AppError::BadRequest("Please enter a valid email".to_string()));
    }
    if !validate_password(&req.password) {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters long".to_string(),
        ));
    }

    if state.users.find_by_username(&username).await?.is_some() {
        return Err(AppError::BadRequest("Username already exists".to_string()));
    }
    if state.users.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already exists".to_string()));
    }

    let password_hash = state.passwords.hash(&req.password)?;
    let user = state
        .users
        .insert(User::new(username, req.email, password_hash))
        .await?;

    let token = state.tokens.generate_token(user.id, &user.username)?;

    tracing::info!(username = %user.username, "User registered");
    Ok(HttpResponse::Created().json(AuthResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    // Unknown users and bad passwords fail identically.
    let user = state
        .users
        .find_by_username(&req.username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let valid = state.passwords.verify(&req.password, &user.password_hash)?;
    if !valid {
        return Err(AppError::Unauthorized);
    }

    let token = state.tokens.generate_token(user.id, &user.username)?;

    tracing::info!(username = %user.username, "User logged in");
    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// GET /api/auth/me - Protected route
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    // Resolve from the database so tokens of deleted accounts stop working.
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
