use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use celebrity_bio::api::auth::bootstrap_admin;
use celebrity_bio::catalog::SearchIndex;
use celebrity_bio::config::{AdminConfig, Config};
use celebrity_bio::db::SqliteRepository;
use celebrity_bio::server::{build_app, AppState};
use celebrity_bio::util::ImageResizer;

const ADMIN_EMAIL: &str = "admin@example.org";
const ADMIN_PASSWORD: &str = "admin-secret";

async fn create_test_server() -> TestServer {
    let mut config = Config::from_yaml("{}").unwrap();
    config.auth.bcrypt_cost = 4;
    config.admin = Some(AdminConfig {
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
        full_name: Some("Admin".to_string()),
    });

    let db = Arc::new(SqliteRepository::new("sqlite::memory:").await.unwrap());
    bootstrap_admin(db.as_ref(), config.admin.as_ref(), config.auth.bcrypt_cost)
        .await
        .unwrap();

    let tmp = std::env::temp_dir().join(format!("celebrity-bio-api-{}", uuid::Uuid::new_v4()));
    let image_resizer = Arc::new(
        ImageResizer::new(tmp.join("images"), tmp.join("originals"), None).unwrap(),
    );
    let search = Arc::new(SearchIndex::new().unwrap());

    let state = AppState::new(config, db, search, image_resizer);
    TestServer::new(build_app(state)).unwrap()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["token"].as_str().unwrap().to_string()
}

async fn admin_token(server: &TestServer) -> String {
    login(server, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

async fn create_celebrity(server: &TestServer, token: &str, body: Value) -> Value {
    let response = server
        .post("/api/admin/celebrities")
        .add_header(header::AUTHORIZATION, bearer(token))
        .json(&body)
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server().await;
    let response = server.get("/api/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_robots_txt_hides_admin() {
    let server = create_test_server().await;
    let response = server.get("/robots.txt").await;
    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("Disallow: /admin"));
    assert!(text.contains("Disallow: /api/admin"));
}

#[tokio::test]
async fn test_admin_requires_session() {
    let server = create_test_server().await;

    let response = server.get("/api/admin/stats").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Unauthorized");

    let response = server
        .get("/api/admin/stats")
        .add_header(header::AUTHORIZATION, bearer("not-a-session"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_rejects_non_admin_role() {
    let server = create_test_server().await;
    let token = admin_token(&server).await;

    let response = server
        .post("/api/admin/users")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({
            "email": "editor@example.org",
            "password": "editor-secret",
            "role": "editor"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let user: Value = response.json();
    assert!(user.get("passwordHash").is_none());

    let editor = login(&server, "editor@example.org", "editor-secret").await;
    let response = server
        .get("/api/admin/stats")
        .add_header(header::AUTHORIZATION, bearer(&editor))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .get("/api/admin/stats")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let stats: Value = response.json();
    assert_eq!(stats["totalUsers"], 2);
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let server = create_test_server().await;
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": "wrong" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let token = admin_token(&server).await;
    let response = server
        .get("/api/auth/session")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let user: Value = response.json();
    assert_eq!(user["email"], ADMIN_EMAIL);
    assert_eq!(user["role"], "admin");
}

#[tokio::test]
async fn test_duplicate_slug_and_email_are_rejected() {
    let server = create_test_server().await;
    let token = admin_token(&server).await;

    let created = create_celebrity(&server, &token, json!({ "fullName": "Barış Manço" })).await;
    assert_eq!(created["slug"], "baris-manco");

    let response = server
        .post("/api/admin/celebrities")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "fullName": "Barış Manço" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Slug already exists");

    let response = server
        .post("/api/admin/celebrities")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "fullName": "  " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/admin/users")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "x" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Email already exists");

    let response = server
        .post("/api/admin/users")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "email": "Admin@Example.ORG", "password": "x" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Email already exists");
}

#[tokio::test]
async fn test_huge_page_numbers_return_empty_pages() {
    let server = create_test_server().await;
    let token = admin_token(&server).await;
    let huge = i64::MAX;

    let response = server.get(&format!("/api/popular?page={}", huge)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["celebrities"].as_array().unwrap().is_empty());

    server
        .get(&format!("/api/news?page={}", huge))
        .await
        .assert_status_ok();

    server
        .get(&format!("/api/admin/celebrities?page={}", huge))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_paths_are_normalized_before_routing() {
    let server = create_test_server().await;
    server.get("/api/health/").await.assert_status_ok();
    server.get("/api//health/").await.assert_status_ok();
}

#[tokio::test]
async fn test_profile_cache_hit_until_admin_write() {
    let server = create_test_server().await;
    let token = admin_token(&server).await;

    let created = create_celebrity(
        &server,
        &token,
        json!({
            "fullName": "Sezen Aksu",
            "profession": "Singer",
            "birthDate": "1954-07-13",
            "visibility": "published",
            "bioShortTr": "Minik Serçe",
            "bioShortEn": "The Little Sparrow"
        }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let first = server.get("/api/celebrities/sezen-aksu?locale=en").await;
    first.assert_status_ok();
    assert_eq!(first.headers()["x-cache"], "MISS");
    let etag = first.headers()[header::ETAG].clone();
    let body: Value = first.json();
    assert_eq!(body["fullName"], "Sezen Aksu");
    assert_eq!(body["translation"]["bioShort"], "The Little Sparrow");
    assert_eq!(body["zodiacSign"], "Cancer");

    let second = server.get("/api/celebrities/sezen-aksu?locale=en").await;
    second.assert_status_ok();
    assert_eq!(second.headers()["x-cache"], "HIT");
    assert_eq!(second.headers()[header::ETAG], etag);

    let not_modified = server
        .get("/api/celebrities/sezen-aksu?locale=en")
        .add_header(header::IF_NONE_MATCH, etag.clone())
        .await;
    not_modified.assert_status(StatusCode::NOT_MODIFIED);

    let response = server
        .put(&format!("/api/admin/celebrities/{}", id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({
            "fullName": "Sezen Aksu",
            "profession": "Singer-songwriter",
            "birthDate": "1954-07-13",
            "visibility": "published",
            "bioShortEn": "The Little Sparrow"
        }))
        .await;
    response.assert_status_ok();

    let third = server.get("/api/celebrities/sezen-aksu?locale=en").await;
    third.assert_status_ok();
    assert_eq!(third.headers()["x-cache"], "MISS");
    let body: Value = third.json();
    assert_eq!(body["profession"], "Singer-songwriter");
}

#[tokio::test]
async fn test_unpublished_profile_is_not_found() {
    let server = create_test_server().await;
    let token = admin_token(&server).await;
    create_celebrity(&server, &token, json!({ "fullName": "Draft Person" })).await;

    let response = server.get("/api/celebrities/draft-person").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].is_string());

    server
        .get("/api/celebrities/nobody")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_validation_and_results() {
    let server = create_test_server().await;
    let token = admin_token(&server).await;

    server
        .get("/api/search?q=a")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    let response = server.get("/api/search").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Query must be at least 2 characters");

    create_celebrity(
        &server,
        &token,
        json!({ "fullName": "Tarkan Tevetoğlu", "nickname": "Tarkan", "visibility": "published" }),
    )
    .await;

    let response = server.get("/api/search?q=tarkan").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["slug"], "tarkan-tevetoglu");
    assert_eq!(body["pagination"]["hasMore"], false);

    let response = server.get("/api/search?q=tar&autocomplete=true").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["results"][0]["fullName"], "Tarkan Tevetoğlu");

    for offset in ["100000000000", "18446744073709551615"] {
        let response = server
            .get(&format!("/api/search?q=tarkan&offset={}", offset))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 1);
        assert!(body["results"].as_array().unwrap().is_empty());
        assert_eq!(body["pagination"]["hasMore"], false);
    }

    server
        .post("/api/search")
        .json(&json!({ "query": "tarkan" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_similar_celebrities_endpoint() {
    let server = create_test_server().await;
    let token = admin_token(&server).await;

    for (name, profession, country) in [
        ("Base Star", "Singer", "Turkey"),
        ("Same Job", "Singer", "France"),
        ("Same Place", "Actor", "Turkey"),
        ("Nothing Shared", "Chef", "Peru"),
    ] {
        create_celebrity(
            &server,
            &token,
            json!({
                "fullName": name,
                "profession": profession,
                "country": country,
                "visibility": "published"
            }),
        )
        .await;
    }

    let response = server.get("/api/celebrities/base-star/similar").await;
    response.assert_status_ok();
    let similar: Vec<Value> = response.json();
    let slugs: Vec<&str> = similar.iter().map(|c| c["slug"].as_str().unwrap()).collect();
    assert_eq!(slugs, vec!["same-job", "same-place"]);

    let response = server.get("/api/celebrities/base-star/similar?limit=1").await;
    let similar: Vec<Value> = response.json();
    assert_eq!(similar.len(), 1);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let server = create_test_server().await;
    let token = admin_token(&server).await;

    let response = server
        .get("/api/auth/session")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    let me: Value = response.json();

    let response = server
        .delete(&format!("/api/admin/users/{}", me["id"]))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
