//! Input validation shared by the registration and post handlers.
//!
//! All functions here are pure; handlers decide how failures map to HTTP
//! responses.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum username length.
pub const USERNAME_MIN: usize = 3;
/// Maximum username length.
pub const USERNAME_MAX: usize = 20;
/// Minimum password length.
pub const PASSWORD_MIN: usize = 6;
/// Minimum post title length after trimming.
pub const TITLE_MIN: usize = 3;
/// Minimum post content length after trimming.
pub const CONTENT_MIN: usize = 10;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").unwrap());

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<&'static str, String>;

/// Usernames are 3-20 characters.
pub fn validate_username(username: &str) -> bool {
    (USERNAME_MIN..=USERNAME_MAX).contains(&username.chars().count())
}

/// Emails must match the `local@domain.tld` shape.
pub fn validate_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Passwords are at least 6 characters.
pub fn validate_password(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN
}

/// Validate the body of a new post. Missing fields fail their checks.
pub fn validate_new_post(title: Option<&str>, content: Option<&str>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_title(title.unwrap_or_default(), &mut errors);
    check_content(content.unwrap_or_default(), &mut errors);
    errors
}

/// Validate a partial post update. Only provided fields are checked.
pub fn validate_post_patch(title: Option<&str>, content: Option<&str>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if let Some(title) = title {
        check_title(title, &mut errors);
    }
    if let Some(content) = content {
        check_content(content, &mut errors);
    }
    errors
}

/// Trim whitespace and strip angle brackets from free-text input.
pub fn sanitize_text(input: &str) -> String {
    input.trim().replace(['<', '>'], "")
}

fn check_title(title: &str, errors: &mut FieldErrors) {
    if title.trim().chars().count() < TITLE_MIN {
        errors.insert("title", "Title must be at least 3 characters long".to_string());
    }
}

fn check_content(content: &str, errors: &mut FieldErrors) {
    if content.trim().chars().count() < CONTENT_MIN {
        errors.insert(
            "content",
            "Content must be at least 10 characters long".to_string(),
        );
    }
}
