//! End-to-end tests for the HTTP API, backed by the in-memory repositories.

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use serde_json::{Value, json};

use api_server::handlers::configure_routes;
use api_server::state::AppState;
use quill_infra::auth::JwtConfig;

fn test_state() -> AppState {
    AppState::in_memory(JwtConfig {
        secret: "test-secret-key".to_string(),
        expiration_days: 7,
        issuer: "quill-test".to_string(),
    })
}

macro_rules! test_app {
    () => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(configure_routes),
        )
        .await
    };
}

fn register_req(username: &str, email: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post().uri("/api/auth/register").set_json(json!({
        "username": username,
        "email": email,
        "password": password,
    }))
}

fn login_req(username: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": username, "password": password }))
}

fn bearer(req: test::TestRequest, token: &str) -> test::TestRequest {
    req.insert_header(("Authorization", format!("Bearer {token}")))
}

async fn body_json<B: MessageBody>(resp: ServiceResponse<B>) -> Value {
    test::read_body_json(resp).await
}

#[actix_web::test]
async fn health_reports_ok() {
    let app = test_app!();

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request())
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn register_returns_token_and_password_free_user() {
    let app = test_app!();

    let resp = test::call_service(
        &app,
        register_req("alice", "alice@x.com", "secret1").to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;

    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password_hash").is_none());
}

#[actix_web::test]
async fn register_rejects_short_usernames() {
    let app = test_app!();

    let resp = test::call_service(
        &app,
        register_req("ab", "ab@example.com", "secret1").to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Username must be 3-20 characters long");
}

#[actix_web::test]
async fn register_rejects_overlong_usernames() {
    let app = test_app!();

    let resp = test::call_service(
        &app,
        register_req(&"a".repeat(21), "long@example.com", "secret1").to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn register_rejects_invalid_emails() {
    let app = test_app!();

    for email in ["invalid-email", "missing@tld", "@example.com"] {
        let resp =
            test::call_service(&app, register_req("alice", email, "secret1").to_request()).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "email: {email}");
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Please enter a valid email");
    }
}

#[actix_web::test]
async fn register_rejects_short_passwords() {
    let app = test_app!();

    let resp = test::call_service(
        &app,
        register_req("alice", "alice@example.com", "12345").to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Password must be at least 6 characters long");
}

#[actix_web::test]
async fn register_rejects_taken_username_and_email() {
    let app = test_app!();

    let resp = test::call_service(
        &app,
        register_req("alice", "alice@example.com", "secret1").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(
        &app,
        register_req("alice", "other@example.com", "secret1").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Username already exists");

    let resp = test::call_service(
        &app,
        register_req("bob", "alice@example.com", "secret1").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Email already exists");
}

#[actix_web::test]
async fn login_failures_share_a_generic_message() {
    let app = test_app!();

    test::call_service(
        &app,
        register_req("alice", "alice@x.com", "secret1").to_request(),
    )
    .await;

    // Wrong password.
    let resp = test::call_service(&app, login_req("alice", "wrong").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"], "Invalid credentials");

    // Unknown user: indistinguishable from a wrong password.
    let resp = test::call_service(&app, login_req("nobody", "secret1").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"], "Invalid credentials");
}

#[actix_web::test]
async fn login_requires_both_fields() {
    let app = test_app!();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "username": "alice" }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["error"],
        "Username and password are required"
    );
}

#[actix_web::test]
async fn login_returns_a_working_token() {
    let app = test_app!();

    test::call_service(
        &app,
        register_req("alice", "alice@x.com", "secret1").to_request(),
    )
    .await;

    let resp = test::call_service(&app, login_req("alice", "secret1").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let token = body["token"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        bearer(test::TestRequest::get().uri("/api/auth/me"), &token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["username"], "alice");
}

#[actix_web::test]
async fn me_rejects_missing_or_forged_tokens() {
    let app = test_app!();

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/api/auth/me").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        bearer(test::TestRequest::get().uri("/api/auth/me"), "forged-token").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(("Authorization", "Basic abc"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

fn create_post_req(token: &str, body: Value) -> test::TestRequest {
    bearer(
        test::TestRequest::post().uri("/api/posts").set_json(body),
        token,
    )
}

#[actix_web::test]
async fn creating_posts_requires_authentication() {
    let app = test_app!();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/posts")
            .set_json(json!({ "title": "Hello", "content": "World, at some length" }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_post_validates_title_and_content() {
    let app = test_app!();

    let body = body_json(
        test::call_service(
            &app,
            register_req("alice", "alice@x.com", "secret1").to_request(),
        )
        .await,
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        create_post_req(&token, json!({ "title": "Hi", "content": "short" })).to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(
        body["details"]["title"],
        "Title must be at least 3 characters long"
    );
    assert_eq!(
        body["details"]["content"],
        "Content must be at least 10 characters long"
    );

    // Missing fields fail the same way.
    let resp = test::call_service(&app, create_post_req(&token, json!({})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["details"].get("title").is_some());
    assert!(body["details"].get("content").is_some());
}

#[actix_web::test]
async fn create_post_rejects_non_array_tags() {
    let app = test_app!();

    let body = body_json(
        test::call_service(
            &app,
            register_req("alice", "alice@x.com", "secret1").to_request(),
        )
        .await,
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        create_post_req(
            &token,
            json!({ "title": "Hello", "content": "Long enough content", "tags": "oops" }),
        )
        .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn created_posts_carry_their_author_and_defaults() {
    let app = test_app!();

    let body = body_json(
        test::call_service(
            &app,
            register_req("alice", "alice@x.com", "secret1").to_request(),
        )
        .await,
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();
    let user_id = body["user"]["id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        create_post_req(
            &token,
            json!({ "title": "First post", "content": "Hello from the tests" }),
        )
        .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["author"]["id"], user_id.as_str());
    assert_eq!(body["author"]["username"], "alice");
    assert_eq!(body["published"], false);
    assert_eq!(body["tags"], json!([]));
    assert!(body["author"].get("email").is_none());
}

#[actix_web::test]
async fn create_post_strips_angle_brackets() {
    let app = test_app!();

    let body = body_json(
        test::call_service(
            &app,
            register_req("alice", "alice@x.com", "secret1").to_request(),
        )
        .await,
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        create_post_req(
            &token,
            json!({
                "title": "  Hello <b>world</b>  ",
                "content": "Some content with <script>alert(1)</script> inside",
                "tags": ["<tag>"],
            }),
        )
        .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["title"], "Hello bworld/b");
    assert_eq!(body["content"], "Some content with scriptalert(1)/script inside");
    assert_eq!(body["tags"], json!(["tag"]));
}

#[actix_web::test]
async fn listing_filters_by_published_and_paginates() {
    let app = test_app!();

    let body = body_json(
        test::call_service(
            &app,
            register_req("alice", "alice@x.com", "secret1").to_request(),
        )
        .await,
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    for (title, published) in [
        ("Oldest published", true),
        ("Draft in the middle", false),
        ("Newest published", true),
    ] {
        let resp = test::call_service(
            &app,
            create_post_req(
                &token,
                json!({ "title": title, "content": "Content long enough here", "published": published }),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    // All posts, newest first.
    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/api/posts").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["posts"][0]["title"], "Newest published");
    assert_eq!(body["posts"][2]["title"], "Oldest published");

    // Published only.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/posts?published=true")
            .to_request(),
    )
    .await;
    let body = body_json(resp).await;
    assert_eq!(body["total"], 2);
    assert!(body["posts"]
        .as_array()
        .unwrap()
        .iter()
        .all(|post| post["published"] == true));

    // Drafts only.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/posts?published=false")
            .to_request(),
    )
    .await;
    let body = body_json(resp).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["posts"][0]["title"], "Draft in the middle");

    // Pagination.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/posts?page=2&limit=2")
            .to_request(),
    )
    .await;
    let body = body_json(resp).await;
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 2);
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn fetching_an_unknown_post_is_not_found() {
    let app = test_app!();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/posts/{}", uuid::Uuid::new_v4()))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "Post not found");
}

#[actix_web::test]
async fn only_the_author_may_update_a_post() {
    let app = test_app!();

    let alice = body_json(
        test::call_service(
            &app,
            register_req("alice", "alice@x.com", "secret1").to_request(),
        )
        .await,
    )
    .await;
    let alice_token = alice["token"].as_str().unwrap().to_string();

    let bob = body_json(
        test::call_service(
            &app,
            register_req("bob", "bob@x.com", "secret1").to_request(),
        )
        .await,
    )
    .await;
    let bob_token = bob["token"].as_str().unwrap().to_string();

    let created = body_json(
        test::call_service(
            &app,
            create_post_req(
                &alice_token,
                json!({ "title": "Alice writes", "content": "Original content here" }),
            )
            .to_request(),
        )
        .await,
    )
    .await;
    let post_id = created["id"].as_str().unwrap().to_string();

    // Bob may not touch it.
    let resp = test::call_service(
        &app,
        bearer(
            test::TestRequest::put()
                .uri(&format!("/api/posts/{post_id}"))
                .set_json(json!({ "title": "Bob was here" })),
            &bob_token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(resp).await["error"],
        "Not authorized to update this post"
    );

    // And the post is unchanged.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/posts/{post_id}"))
            .to_request(),
    )
    .await;
    assert_eq!(body_json(resp).await["title"], "Alice writes");

    // Alice merges a partial update.
    let resp = test::call_service(
        &app,
        bearer(
            test::TestRequest::put()
                .uri(&format!("/api/posts/{post_id}"))
                .set_json(json!({ "title": "Alice edits", "published": true })),
            &alice_token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["title"], "Alice edits");
    assert_eq!(body["content"], "Original content here");
    assert_eq!(body["published"], true);
}

#[actix_web::test]
async fn update_validates_provided_fields() {
    let app = test_app!();

    let alice = body_json(
        test::call_service(
            &app,
            register_req("alice", "alice@x.com", "secret1").to_request(),
        )
        .await,
    )
    .await;
    let token = alice["token"].as_str().unwrap().to_string();

    let created = body_json(
        test::call_service(
            &app,
            create_post_req(
                &token,
                json!({ "title": "Alice writes", "content": "Original content here" }),
            )
            .to_request(),
        )
        .await,
    )
    .await;
    let post_id = created["id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        bearer(
            test::TestRequest::put()
                .uri(&format!("/api/posts/{post_id}"))
                .set_json(json!({ "title": "ab" })),
            &token,
        )
        .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Validation failed");
    assert!(body["details"].get("title").is_some());
    assert!(body["details"].get("content").is_none());
}

#[actix_web::test]
async fn only_the_author_may_delete_and_deleted_posts_vanish() {
    let app = test_app!();

    let alice = body_json(
        test::call_service(
            &app,
            register_req("alice", "alice@x.com", "secret1").to_request(),
        )
        .await,
    )
    .await;
    let alice_token = alice["token"].as_str().unwrap().to_string();

    let bob = body_json(
        test::call_service(
            &app,
            register_req("bob", "bob@x.com", "secret1").to_request(),
        )
        .await,
    )
    .await;
    let bob_token = bob["token"].as_str().unwrap().to_string();

    let created = body_json(
        test::call_service(
            &app,
            create_post_req(
                &alice_token,
                json!({ "title": "Short lived", "content": "Content long enough" }),
            )
            .to_request(),
        )
        .await,
    )
    .await;
    let post_id = created["id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        bearer(
            test::TestRequest::delete().uri(&format!("/api/posts/{post_id}")),
            &bob_token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(resp).await["error"],
        "Not authorized to delete this post"
    );

    let resp = test::call_service(
        &app,
        bearer(
            test::TestRequest::delete().uri(&format!("/api/posts/{post_id}")),
            &alice_token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["message"], "Post deleted successfully");

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/posts/{post_id}"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Deleting again is a 404 as well.
    let resp = test::call_service(
        &app,
        bearer(
            test::TestRequest::delete().uri(&format!("/api/posts/{post_id}")),
            &alice_token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
