use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::Layer;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::api::{admin, auth, image, public, search};
use crate::cache::ResponseCache;
use crate::catalog::{refresh_search_index, SearchIndex};
use crate::config::Config;
use crate::db::SqliteRepository;
use crate::util::ImageResizer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<SqliteRepository>,
    pub cache: Arc<ResponseCache>,
    pub search: Arc<SearchIndex>,
    pub image_resizer: Arc<ImageResizer>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<SqliteRepository>,
        search: Arc<SearchIndex>,
        image_resizer: Arc<ImageResizer>,
    ) -> Self {
        let ttl = Duration::from_secs(config.cache.celebrity_ttl_secs);
        Self {
            config: Arc::new(config),
            db,
            cache: Arc::new(ResponseCache::new(ttl)),
            search,
            image_resizer,
        }
    }

    /// Drop cached responses and reindex after a catalog write. Index
    /// failures are logged; the write itself already succeeded.
    pub async fn refresh_catalog(&self) {
        self.cache.invalidate_all().await;
        match refresh_search_index(self.db.as_ref(), &self.search).await {
            Ok(count) => info!("Search index rebuilt with {} celebrities", count),
            Err(e) => error!("Failed to rebuild search index: {}", e),
        }
    }
}

fn admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/celebrities",
            get(admin::list_celebrities).post(admin::create_celebrity),
        )
        .route(
            "/celebrities/:id",
            get(admin::get_celebrity)
                .put(admin::update_celebrity)
                .delete(admin::delete_celebrity),
        )
        .route("/tags", get(admin::list_tags).post(admin::create_tag))
        .route(
            "/tags/:id",
            axum::routing::put(admin::update_tag).delete(admin::delete_tag),
        )
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/:id",
            axum::routing::put(admin::update_user).delete(admin::delete_user),
        )
        .route("/news", get(admin::list_news).post(admin::create_news))
        .route("/news/:id", axum::routing::delete(admin::delete_news))
        .route("/stats", get(admin::stats))
        .route("/search-queries", get(admin::search_queries))
        .route_layer(from_fn_with_state(state, auth::require_admin))
}

pub fn build_router(state: AppState) -> Router {
    let profile_routes = Router::new()
        .route("/api/celebrities/:slug", get(public::get_celebrity))
        .route_layer(from_fn(crate::middleware::etag_validation));

    let api_routes = Router::new()
        .route("/api/celebrities/:slug/similar", get(public::get_similar))
        .route("/api/celebrities/:slug/news", get(public::get_celebrity_news))
        .route("/api/home", get(public::get_home))
        .route("/api/popular", get(public::get_popular))
        .route("/api/birthdays", get(public::get_birthdays))
        .route("/api/tags", get(public::list_tags))
        .route("/api/tags/:slug", get(public::get_tag))
        .route("/api/news", get(public::list_news))
        .route("/api/news/:slug", get(public::get_news))
        .route("/api/search", get(search::search).post(search::log_click))
        .route("/api/auth/login", axum::routing::post(auth::login))
        .route("/api/auth/logout", axum::routing::post(auth::logout))
        .route("/api/auth/session", get(auth::session))
        .route("/api/health", get(public::health))
        .route(
            "/images/celebrities/:slug/:kind",
            get(image::celebrity_image),
        )
        .nest("/api/admin", admin_router(state.clone()));

    let mut router = Router::new()
        .route("/robots.txt", get(public::robots_txt))
        .merge(profile_routes)
        .merge(api_routes)
        .fallback(fallback_handler);

    if let Some(ref appdir) = state.config.appdir {
        router = router.fallback_service(ServeDir::new(appdir));
    }

    router
        .layer(from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The full service: paths are normalized before they reach the router.
pub fn build_app(state: AppState) -> Router {
    let router = build_router(state);
    Router::new().fallback_service(from_fn(crate::middleware::normalize_path).layer(router))
}

async fn fallback_handler(req: Request) -> impl IntoResponse {
    if req.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}
