use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use super::client_info;
use super::error::{ApiError, ApiResult};
use super::types::*;
use crate::catalog::analytics::{log_search, spawn_log_search, SearchEvent};
use crate::catalog::search::{SearchRequest, SearchSort};
use crate::server::AppState;

const AUTOCOMPLETE_LIMIT: usize = 8;
const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

fn validate_query(q: Option<&str>) -> ApiResult<String> {
    let q = q.map(str::trim).unwrap_or_default();
    if q.chars().count() < 2 {
        return Err(ApiError::bad_request("Query must be at least 2 characters"));
    }
    Ok(q.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn tag_list(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let text = validate_query(query.q.as_deref())?;

    if query.autocomplete {
        let page = state.search.autocomplete(&text, AUTOCOMPLETE_LIMIT)?;
        return Ok(Json(AutocompleteResponse {
            total: page.hits.len(),
            results: page.hits,
            query: text,
        })
        .into_response());
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let request = SearchRequest {
        text: text.clone(),
        country: non_empty(query.country),
        profession: non_empty(query.profession),
        tags: tag_list(query.tags.as_deref()),
        sort: SearchSort::from_param(query.sort.as_deref()),
        limit,
        offset,
    };

    let started = Instant::now();
    let page = state.search.search(&request)?;
    let processing_time = started.elapsed().as_millis() as u64;

    spawn_log_search(
        Arc::clone(&state.db),
        SearchEvent {
            query: text.clone(),
            results_count: page.total as i64,
            ..Default::default()
        },
        client_info(&headers),
    );

    let response = SearchResponse {
        pagination: SearchPagination {
            limit,
            offset,
            has_more: offset.saturating_add(limit) < page.total,
        },
        total: page.total,
        results: page.hits,
        query: text,
        processing_time,
    };

    Ok((
        [(
            header::CACHE_CONTROL,
            "public, s-maxage=300, stale-while-revalidate=600",
        )],
        Json(response),
    )
        .into_response())
}

/// Record a click on a search result.
pub async fn log_click(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SearchClickRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let (Some(query), Some(celebrity_id)) = (non_empty(req.query), req.celebrity_id) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let event = SearchEvent {
        query,
        results_count: 1,
        matched_celebrity_id: Some(celebrity_id),
        clicked_position: req.position,
    };
    log_search(state.db.as_ref(), &event, &client_info(&headers)).await?;

    Ok(Json(json!({ "success": true })))
}
