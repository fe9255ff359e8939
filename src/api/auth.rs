use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use super::error::{ApiError, ApiResult};
use super::types::{LoginRequest, LoginResponse};
use crate::config::{AdminConfig, AuthConfig};
use crate::db::{DbError, NewUser, Role, Session, SessionRepo, User, UserRepo};
use crate::server::AppState;

pub async fn hash_password(password: String, cost: u32) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

/// Session token from the session cookie, or from an
/// `Authorization: Bearer` header.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string());
    if from_cookie.is_some() {
        return from_cookie;
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// The active user behind the request's session, if any.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Option<(Session, User)> {
    let token = extract_token(headers, &state.config.auth.cookie_name)?;

    let session = match state.db.get_session(&token).await {
        Ok(session) => session,
        Err(DbError::NotFound(_)) => return None,
        Err(e) => {
            warn!("Session lookup failed: {}", e);
            return None;
        }
    };
    if session.is_expired(Utc::now()) {
        debug!("Ignoring expired session for user {}", session.user_id);
        return None;
    }

    match state.db.get_user(session.user_id).await {
        Ok(user) if user.is_active => Some((session, user)),
        Ok(_) => None,
        Err(e) => {
            debug!("Session {} has no usable user: {}", session.user_id, e);
            None
        }
    }
}

fn session_cookie(auth: &AuthConfig, token: &str, max_age: i64) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        auth.cookie_name, token, max_age
    );
    if auth.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_header(value: String) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(&value).map_err(|e| ApiError::Internal(e.to_string()))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    let email = req.email.trim();

    let user = match state.db.get_user_by_email(email).await {
        Ok(user) => user,
        Err(DbError::NotFound(_)) => return Err(ApiError::Unauthorized),
        Err(e) => return Err(e.into()),
    };

    if !user.is_active || !verify_password(req.password, user.password_hash.clone()).await {
        info!("Failed login for {}", email);
        return Err(ApiError::Unauthorized);
    }

    let now = Utc::now();
    let ttl_hours = state.config.auth.session_ttl_hours.max(1);
    let session = Session {
        token: uuid::Uuid::new_v4().to_string(),
        user_id: user.id,
        created_at: now,
        expires_at: now + chrono::Duration::hours(ttl_hours),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
    };
    state.db.create_session(&session).await?;
    state.db.touch_last_login(user.id, now).await?;

    info!("User {} logged in", user.email);

    let cookie = session_cookie(&state.config.auth, &session.token, ttl_hours * 3600);
    let mut response = Json(LoginResponse {
        user: User {
            last_login_at: Some(now),
            ..user
        },
        token: session.token,
    })
    .into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, cookie_header(cookie)?);
    Ok(response)
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    if let Some(token) = extract_token(&headers, &state.config.auth.cookie_name) {
        state.db.delete_session(&token).await?;
    }

    let mut response = Json(json!({ "success": true })).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        cookie_header(session_cookie(&state.config.auth, "", 0))?,
    );
    Ok(response)
}

pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<User>> {
    authenticate(&state, &headers)
        .await
        .map(|(_, user)| Json(user))
        .ok_or(ApiError::Unauthorized)
}

/// Gate for the admin routes. The authenticated user is made available
/// to handlers as a request extension.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Some((_, user)) if user.role == Role::Admin => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Some((_, user)) => {
            debug!("User {} is not an admin", user.email);
            ApiError::Unauthorized.into_response()
        }
        None => ApiError::Unauthorized.into_response(),
    }
}

/// Create the configured admin account when no user exists yet.
pub async fn bootstrap_admin<R>(
    repo: &R,
    admin: Option<&AdminConfig>,
    bcrypt_cost: u32,
) -> ApiResult<Option<User>>
where
    R: UserRepo + ?Sized,
{
    let Some(admin) = admin else {
        return Ok(None);
    };
    if repo.count_users().await? > 0 {
        return Ok(None);
    }

    let password_hash = hash_password(admin.password.clone(), bcrypt_cost).await?;
    let user = repo
        .create_user(&NewUser {
            email: admin.email.trim().to_string(),
            full_name: admin.full_name.clone(),
            password_hash,
            role: Role::Admin,
            is_active: true,
        })
        .await?;
    info!("Created admin user {}", user.email);
    Ok(Some(user))
}
