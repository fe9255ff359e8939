use axum::{
    body::Body,
    extract::Request,
    http::{header, uri::Uri, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::info;

/// Collapse repeated slashes and drop a trailing one, so `/api//tags/`
/// routes like `/api/tags`.
pub async fn normalize_path(mut req: Request, next: Next) -> Response {
    let uri = req.uri();
    let path = uri.path();

    let mut normalized = path.to_string();
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    if normalized != path {
        let mut parts = uri.clone().into_parts();
        let new_path_and_query = if let Some(query) = uri.query() {
            format!("{}?{}", normalized, query)
        } else {
            normalized
        };

        if let Ok(new_uri) = new_path_and_query.parse::<Uri>() {
            parts.path_and_query = new_uri.into_parts().path_and_query;
            if let Ok(new_uri) = Uri::from_parts(parts) {
                *req.uri_mut() = new_uri;
            }
        }
    }

    next.run(req).await
}

pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let content_length = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    info!(
        method = %method,
        url = %uri,
        status = status,
        length = content_length,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "HTTP request"
    );

    response
}

/// Answer 304 when the client already holds the response's ETag.
pub async fn etag_validation(req: Request, next: Next) -> Response {
    let if_none_match = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let response = next.run(req).await;

    let Some(client_etag) = if_none_match else {
        return response;
    };
    if !response.status().is_success() {
        return response;
    }
    let Some(server_etag) = response
        .headers()
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
    else {
        return response;
    };
    if !etags_match(&client_etag, server_etag) {
        return response;
    }

    let mut not_modified = Response::new(Body::empty());
    *not_modified.status_mut() = StatusCode::NOT_MODIFIED;
    let headers = not_modified.headers_mut();
    for name in [header::ETAG, header::CACHE_CONTROL, header::VARY] {
        if let Some(value) = response.headers().get(&name) {
            headers.insert(name.clone(), value.clone());
        }
    }
    if let Some(value) = response.headers().get("x-cache") {
        headers.insert("x-cache", value.clone());
    }
    not_modified
}

fn etags_match(client_etag: &str, server_etag: &str) -> bool {
    let server = server_etag.strip_prefix("W/").unwrap_or(server_etag);
    client_etag.split(',').map(str::trim).any(|etag| {
        etag == "*" || etag.strip_prefix("W/").unwrap_or(etag) == server
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etags_match() {
        assert!(etags_match("\"abc\"", "\"abc\""));
        assert!(etags_match("W/\"abc\"", "\"abc\""));
        assert!(etags_match("\"x\", \"abc\"", "\"abc\""));
        assert!(etags_match("*", "\"abc\""));
        assert!(!etags_match("\"abd\"", "\"abc\""));
    }
}
