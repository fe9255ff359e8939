use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::client_info;
use super::error::{ApiError, ApiResult};
use super::types::*;
use crate::cache::{celebrity_key, CachedBody};
use crate::catalog::analytics::spawn_log_view;
use crate::catalog::celebrity::{self, popular_order, BirthdaysPage, HomePage, PopularPage, PopularPeriod};
use crate::catalog::news::{self, NewsDetail, NewsListPage};
use crate::catalog::similar::similar_celebrities;
use crate::catalog::tag::{self, TagPage};
use crate::catalog::{LocalizedTag, Locale};
use crate::db::{AnalyticsRepo, Celebrity, CelebrityRepo, NewsSummary};
use crate::server::AppState;

const SIMILAR_DEFAULT: i64 = 8;
const RELATED_NEWS_DEFAULT: i64 = 5;
const MAX_LIST_LIMIT: i64 = 50;

fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, MAX_LIST_LIMIT)
}

fn cached_response(entry: &CachedBody, hit: bool, ttl_secs: u64) -> Response {
    let mut response = Response::new(Body::from(entry.body.clone()));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        "X-Cache",
        HeaderValue::from_static(if hit { "HIT" } else { "MISS" }),
    );
    if let Ok(etag) = HeaderValue::from_str(&entry.etag) {
        headers.insert(header::ETAG, etag);
    }
    if let Ok(cc) = HeaderValue::from_str(&format!(
        "public, s-maxage={}, stale-while-revalidate={}",
        ttl_secs,
        ttl_secs * 2
    )) {
        headers.insert(header::CACHE_CONTROL, cc);
    }
    response
}

/// Celebrity profile. Bodies are cached per slug and locale; the ETag
/// check itself happens in the `etag_validation` layer.
pub async fn get_celebrity(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<LocaleQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let locale = Locale::from_param(query.locale.as_deref());
    let key = celebrity_key(&slug, locale);
    let ttl = state.cache.ttl().as_secs();

    let (entry, hit) = match state.cache.get(&key).await {
        Some(entry) => (entry, true),
        None => {
            let generation = state.cache.generation();
            let profile = celebrity::load_profile(
                state.db.as_ref(),
                &state.config.site,
                &slug,
                locale,
                Utc::now().date_naive(),
            )
            .await?;
            let body = serde_json::to_vec(&profile)
                .map_err(|e| ApiError::Internal(format!("Failed to serialize profile: {}", e)))?;
            let entry = state
                .cache
                .insert(key, body.into(), Some(profile.celebrity.id), generation)
                .await;
            (entry, false)
        }
    };
    debug!("Profile {} ({}) cache {}", slug, locale, if hit { "hit" } else { "miss" });

    if let Some(id) = entry.entity_id {
        spawn_log_view(Arc::clone(&state.db), id, client_info(&headers));
    }

    Ok(cached_response(&entry, hit, ttl))
}

async fn public_celebrity(state: &AppState, slug: &str) -> ApiResult<Celebrity> {
    let celebrity = state.db.get_celebrity_by_slug(slug).await?;
    if !celebrity.is_public() {
        return Err(ApiError::NotFound(format!("Celebrity not found: {}", slug)));
    }
    Ok(celebrity)
}

pub async fn get_similar(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<Celebrity>>> {
    let celebrity = public_celebrity(&state, &slug).await?;
    let limit = clamp_limit(query.limit, SIMILAR_DEFAULT) as usize;
    let similar = similar_celebrities(state.db.as_ref(), celebrity.id, limit).await?;
    Ok(Json(similar))
}

pub async fn get_celebrity_news(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<NewsSummary>>> {
    let celebrity = public_celebrity(&state, &slug).await?;
    let locale = Locale::from_param(query.locale.as_deref());
    let limit = clamp_limit(query.limit, RELATED_NEWS_DEFAULT);
    let items = news::related_news(state.db.as_ref(), celebrity.id, locale, limit).await?;
    Ok(Json(items))
}

pub async fn get_home(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
) -> ApiResult<Json<HomePage>> {
    let locale = Locale::from_param(query.locale.as_deref());
    let page = celebrity::home_page(state.db.as_ref(), locale, Utc::now().date_naive()).await?;
    Ok(Json(page))
}

pub async fn get_popular(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> ApiResult<Json<PopularPage>> {
    let period = PopularPeriod::from_param(query.period.as_deref());
    let order = popular_order(query.sort_by.as_deref());
    let page = celebrity::popular_page(state.db.as_ref(), period, order, query.page.unwrap_or(1))
        .await?;
    Ok(Json(page))
}

pub async fn get_birthdays(
    State(state): State<AppState>,
    Query(query): Query<BirthdaysQuery>,
) -> ApiResult<Json<BirthdaysPage>> {
    if let Some(month) = query.month {
        if !(1..=12).contains(&month) {
            return Err(ApiError::bad_request("Month must be between 1 and 12"));
        }
    }
    let page =
        celebrity::birthdays_page(state.db.as_ref(), Utc::now().date_naive(), query.month).await?;
    Ok(Json(page))
}

pub async fn list_tags(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
) -> ApiResult<Json<Vec<LocalizedTag>>> {
    let locale = Locale::from_param(query.locale.as_deref());
    Ok(Json(tag::all_tags(state.db.as_ref(), locale).await?))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<TagPage>> {
    let locale = Locale::from_param(query.locale.as_deref());
    let page = tag::tag_page(state.db.as_ref(), &slug, locale, query.page.unwrap_or(1)).await?;
    Ok(Json(page))
}

pub async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> ApiResult<Json<NewsListPage>> {
    let locale = Locale::from_param(query.locale.as_deref());
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let page = news::news_list(state.db.as_ref(), locale, category, query.page.unwrap_or(1)).await?;
    Ok(Json(page))
}

pub async fn get_news(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> ApiResult<Json<NewsDetail>> {
    let locale = Locale::from_param(query.locale.as_deref());
    let detail = news::news_detail(state.db.as_ref(), &state.config.site, &slug, locale).await?;
    Ok(Json(detail))
}

pub async fn health(State(state): State<AppState>) -> Response {
    let timestamp = Utc::now().to_rfc3339();
    match state.db.ping().await {
        Ok(()) => Json(json!({
            "status": "healthy",
            "timestamp": timestamp,
            "database": "ok",
            "indexedCelebrities": state.search.num_docs(),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "timestamp": timestamp,
                "database": e.to_string(),
            })),
        )
            .into_response(),
    }
}

pub async fn robots_txt() -> &'static str {
    "User-agent: *\nAllow: /\nDisallow: /admin\nDisallow: /api/admin\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, SIMILAR_DEFAULT), 8);
        assert_eq!(clamp_limit(Some(0), SIMILAR_DEFAULT), 1);
        assert_eq!(clamp_limit(Some(500), SIMILAR_DEFAULT), 50);
    }
}
