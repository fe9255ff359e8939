//! JSON endpoints over the catalog, plus the session-gated admin API.

pub mod admin;
pub mod auth;
pub mod error;
pub mod image;
pub mod public;
pub mod search;
pub mod types;

pub use error::{ApiError, ApiResult};

use axum::http::{header, HeaderMap};

use crate::catalog::analytics::ClientInfo;

fn header_str(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Client address (first `X-Forwarded-For` hop), user agent and referrer.
pub fn client_info(headers: &HeaderMap) -> ClientInfo {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| header_str(headers, "x-real-ip"));

    ClientInfo {
        ip,
        user_agent: header_str(headers, header::USER_AGENT),
        referrer: header_str(headers, header::REFERER),
    }
}
