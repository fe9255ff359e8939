use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::info;

use super::auth::hash_password;
use super::error::{ApiError, ApiResult};
use super::types::*;
use crate::catalog::analytics::{top_search_queries, QueryPeriod};
use crate::catalog::slug::{is_valid_slug, slugify};
use crate::catalog::{Locale, Pagination};
use crate::db::{
    AnalyticsRepo, Celebrity, CelebrityInput, CelebrityRecord, CelebrityRepo, CelebrityTranslation,
    DbError, NewUser, NewsInput, NewsItem, NewsRepo, NewsSummary, NewsTranslation, QueryCount,
    Tag, TagInput, TagRepo, User, UserRepo, UserUpdate,
};
use crate::server::AppState;

const ADMIN_PAGE_SIZE: i64 = 20;
const RECENT_ITEMS: i64 = 5;
const TOP_QUERIES_DEFAULT: i64 = 20;

const TAG_CATEGORIES: [&str; 5] = ["profession", "nationality", "genre", "award", "other"];
const NEWS_CATEGORIES: [&str; 5] = ["announcement", "career", "project", "social", "personal"];

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// Trimmed value, `None` when blank.
fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Explicit slug if given, else one derived from `name`.
fn resolve_slug(slug: Option<String>, name: &str) -> ApiResult<String> {
    let slug = clean(slug).unwrap_or_else(|| slugify(name));
    if !is_valid_slug(&slug) {
        return Err(ApiError::bad_request(format!("Invalid slug: {:?}", slug)));
    }
    Ok(slug)
}

fn slug_conflict(e: DbError) -> ApiError {
    match e {
        DbError::AlreadyExists(_) => ApiError::bad_request("Slug already exists"),
        other => other.into(),
    }
}

fn email_conflict(e: DbError) -> ApiError {
    match e {
        DbError::AlreadyExists(_) => ApiError::bad_request("Email already exists"),
        other => other.into(),
    }
}

// Celebrities

fn celebrity_input(payload: &CelebrityPayload, popularity_score: f64) -> ApiResult<CelebrityInput> {
    let full_name = payload.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(ApiError::bad_request("Full name is required"));
    }
    let slug = resolve_slug(payload.slug.clone(), &full_name)?;

    Ok(CelebrityInput {
        slug,
        first_name: clean(payload.first_name.clone()),
        last_name: clean(payload.last_name.clone()),
        full_name,
        nickname: clean(payload.nickname.clone()),
        birth_date: payload.birth_date,
        death_date: payload.death_date,
        birth_place: clean(payload.birth_place.clone()),
        country: clean(payload.country.clone()),
        nationality: clean(payload.nationality.clone()),
        profession: clean(payload.profession.clone()),
        active_years_start: payload.active_years_start,
        profile_image_url: clean(payload.profile_image_url.clone()),
        cover_image_url: clean(payload.cover_image_url.clone()),
        is_featured: payload.is_featured,
        is_verified: payload.is_verified,
        visibility: payload.visibility,
        popularity_score: payload.popularity_score.unwrap_or(popularity_score),
    })
}

/// Both locales' translations from `payload`. The celebrity id is bound
/// when the record is written.
fn payload_translations(payload: &CelebrityPayload) -> Vec<CelebrityTranslation> {
    let fun_facts = |facts: &Option<Vec<String>>| {
        facts
            .as_ref()
            .filter(|f| !f.is_empty())
            .and_then(|f| serde_json::to_string(f).ok())
    };

    Locale::ALL
        .iter()
        .map(|locale| {
            let (bio_short, bio_long, career, personal, facts, title, description) = match locale {
                Locale::Tr => (
                    &payload.bio_short_tr,
                    &payload.bio_long_tr,
                    &payload.career_tr,
                    &payload.personal_life_tr,
                    &payload.fun_facts_tr,
                    &payload.meta_title_tr,
                    &payload.meta_description_tr,
                ),
                Locale::En => (
                    &payload.bio_short_en,
                    &payload.bio_long_en,
                    &payload.career_en,
                    &payload.personal_life_en,
                    &payload.fun_facts_en,
                    &payload.meta_title_en,
                    &payload.meta_description_en,
                ),
            };
            CelebrityTranslation {
                celebrity_id: 0,
                language_code: locale.as_str().to_string(),
                bio_short: clean(bio_short.clone()),
                bio_long: clean(bio_long.clone()),
                career_summary: clean(career.clone()),
                personal_life: clean(personal.clone()),
                fun_facts: fun_facts(facts),
                meta_title: clean(title.clone()),
                meta_description: clean(description.clone()),
            }
        })
        .collect()
}

async fn check_tag_ids(state: &AppState, tag_ids: &[i64]) -> ApiResult<()> {
    let known: HashSet<i64> = state.db.list_tags().await?.iter().map(|t| t.id).collect();
    if let Some(unknown) = tag_ids.iter().find(|id| !known.contains(id)) {
        return Err(ApiError::bad_request(format!("Unknown tag: {}", unknown)));
    }
    Ok(())
}

fn celebrity_record(payload: &CelebrityPayload, popularity_score: f64) -> ApiResult<CelebrityRecord> {
    Ok(CelebrityRecord {
        input: celebrity_input(payload, popularity_score)?,
        translations: payload_translations(payload),
        tag_ids: payload.tag_ids.clone(),
        social_links: payload.social_links.clone(),
    })
}

async fn admin_celebrity(state: &AppState, celebrity: Celebrity) -> ApiResult<AdminCelebrity> {
    let (tr, en, tag_ids, social_links) = tokio::try_join!(
        state.db.get_translation(celebrity.id, Locale::Tr),
        state.db.get_translation(celebrity.id, Locale::En),
        state.db.list_tag_ids(celebrity.id),
        state.db.list_social_links(celebrity.id),
    )?;
    Ok(AdminCelebrity {
        celebrity,
        translations: tr.into_iter().chain(en).collect(),
        tag_ids,
        social_links,
    })
}

pub async fn list_celebrities(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> ApiResult<Json<AdminList<Celebrity>>> {
    let page = query.page.unwrap_or(1).max(1);
    let (items, total) = tokio::try_join!(
        state
            .db
            .list_all(ADMIN_PAGE_SIZE, Pagination::offset(page, ADMIN_PAGE_SIZE)),
        state.db.count_all(),
    )?;
    Ok(Json(AdminList {
        items,
        pagination: Pagination::new(page, ADMIN_PAGE_SIZE, total),
    }))
}

pub async fn get_celebrity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AdminCelebrity>> {
    let celebrity = state.db.get_celebrity(id).await?;
    Ok(Json(admin_celebrity(&state, celebrity).await?))
}

pub async fn create_celebrity(
    State(state): State<AppState>,
    Json(payload): Json<CelebrityPayload>,
) -> ApiResult<(StatusCode, Json<AdminCelebrity>)> {
    let record = celebrity_record(&payload, 0.0)?;
    if let Some(tag_ids) = &record.tag_ids {
        check_tag_ids(&state, tag_ids).await?;
    }

    let celebrity = state
        .db
        .create_celebrity_record(&record)
        .await
        .map_err(slug_conflict)?;
    info!("Created celebrity {} ({})", celebrity.slug, celebrity.id);

    state.refresh_catalog().await;
    Ok((StatusCode::CREATED, Json(admin_celebrity(&state, celebrity).await?)))
}

pub async fn update_celebrity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CelebrityPayload>,
) -> ApiResult<Json<AdminCelebrity>> {
    let existing = state.db.get_celebrity(id).await?;
    let record = celebrity_record(&payload, existing.popularity_score)?;
    if let Some(tag_ids) = &record.tag_ids {
        check_tag_ids(&state, tag_ids).await?;
    }

    let celebrity = state
        .db
        .update_celebrity_record(id, &record)
        .await
        .map_err(slug_conflict)?;
    info!("Updated celebrity {} ({})", celebrity.slug, id);

    state.refresh_catalog().await;
    Ok(Json(admin_celebrity(&state, celebrity).await?))
}

pub async fn delete_celebrity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state.db.soft_delete_celebrity(id).await?;
    info!("Deleted celebrity {}", id);
    state.refresh_catalog().await;
    Ok(success())
}

// Tags

fn tag_input(payload: TagPayload) -> ApiResult<TagInput> {
    let name_tr = payload.name_tr.trim().to_string();
    let name_en = payload.name_en.trim().to_string();
    if name_tr.is_empty() || name_en.is_empty() {
        return Err(ApiError::bad_request("Both tag names are required"));
    }
    let category = clean(payload.category).unwrap_or_else(|| "other".to_string());
    if !TAG_CATEGORIES.contains(&category.as_str()) {
        return Err(ApiError::bad_request(format!("Invalid category: {}", category)));
    }

    Ok(TagInput {
        slug: resolve_slug(payload.slug, &name_en)?,
        name_tr,
        name_en,
        category,
        icon: clean(payload.icon),
        color: clean(payload.color),
    })
}

pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(state.db.list_tags().await?))
}

pub async fn create_tag(
    State(state): State<AppState>,
    Json(payload): Json<TagPayload>,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    let input = tag_input(payload)?;
    let tag = state.db.create_tag(&input).await.map_err(slug_conflict)?;
    info!("Created tag {} ({})", tag.slug, tag.id);
    state.refresh_catalog().await;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<TagPayload>,
) -> ApiResult<Json<Tag>> {
    let input = tag_input(payload)?;
    let tag = state.db.update_tag(id, &input).await.map_err(slug_conflict)?;
    state.refresh_catalog().await;
    Ok(Json(tag))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state.db.delete_tag(id).await?;
    info!("Deleted tag {}", id);
    state.refresh_catalog().await;
    Ok(success())
}

// Users

fn validate_email(email: &str) -> ApiResult<String> {
    let email = email.trim().to_string();
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(ApiError::bad_request("A valid email is required")),
    }
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db.list_users().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<UserPayload>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let email = validate_email(&payload.email)?;
    let Some(password) = payload.password.filter(|p| !p.is_empty()) else {
        return Err(ApiError::bad_request("Password is required"));
    };
    let password_hash = hash_password(password, state.config.auth.bcrypt_cost).await?;

    let user = state
        .db
        .create_user(&NewUser {
            email,
            full_name: clean(payload.full_name),
            password_hash,
            role: payload.role.unwrap_or_default(),
            is_active: payload.is_active.unwrap_or(true),
        })
        .await
        .map_err(email_conflict)?;
    info!("Created user {} ({:?})", user.email, user.role);
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UserPayload>,
) -> ApiResult<Json<User>> {
    let existing = state.db.get_user(id).await?;
    let email = validate_email(&payload.email)?;
    let password_hash = match payload.password.filter(|p| !p.is_empty()) {
        Some(password) => Some(hash_password(password, state.config.auth.bcrypt_cost).await?),
        None => None,
    };

    let user = state
        .db
        .update_user(
            id,
            &UserUpdate {
                email,
                full_name: clean(payload.full_name),
                password_hash,
                role: payload.role.unwrap_or(existing.role),
                is_active: payload.is_active.unwrap_or(existing.is_active),
            },
        )
        .await
        .map_err(email_conflict)?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current): Extension<User>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if current.id == id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    state.db.delete_user(id).await?;
    info!("User {} deleted user {}", current.email, id);
    Ok(success())
}

// News

fn news_translations(payload: &[NewsTranslationPayload]) -> ApiResult<Vec<NewsTranslation>> {
    let mut seen = HashSet::new();
    let mut translations = Vec::new();
    for t in payload {
        let code = t.language_code.trim().to_lowercase();
        if !Locale::ALL.iter().any(|l| l.as_str() == code) {
            return Err(ApiError::bad_request(format!("Unsupported language: {}", code)));
        }
        if t.title.trim().is_empty() {
            return Err(ApiError::bad_request("News title is required"));
        }
        if !seen.insert(code.clone()) {
            return Err(ApiError::bad_request(format!("Duplicate translation: {}", code)));
        }
        translations.push(NewsTranslation {
            news_id: 0,
            language_code: code,
            title: t.title.trim().to_string(),
            summary: clean(t.summary.clone()),
            content: clean(t.content.clone()),
        });
    }
    if translations.is_empty() {
        return Err(ApiError::bad_request("At least one translation is required"));
    }
    Ok(translations)
}

pub async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<AdminList<NewsSummary>>> {
    let locale = Locale::from_param(query.locale.as_deref());
    let page = query.page.unwrap_or(1).max(1);
    let (items, total) = tokio::try_join!(
        state
            .db
            .recent_news(locale, ADMIN_PAGE_SIZE, Pagination::offset(page, ADMIN_PAGE_SIZE)),
        state.db.count_all_news(),
    )?;
    Ok(Json(AdminList {
        items,
        pagination: Pagination::new(page, ADMIN_PAGE_SIZE, total),
    }))
}

pub async fn create_news(
    State(state): State<AppState>,
    Json(payload): Json<NewsPayload>,
) -> ApiResult<(StatusCode, Json<NewsItem>)> {
    let translations = news_translations(&payload.translations)?;
    let category = clean(payload.category).unwrap_or_else(|| "announcement".to_string());
    if !NEWS_CATEGORIES.contains(&category.as_str()) {
        return Err(ApiError::bad_request(format!("Invalid category: {}", category)));
    }
    let slug = resolve_slug(payload.slug, &translations[0].title)?;

    let mut celebrity_ids = payload.celebrity_ids.clone();
    if let Some(primary) = payload.primary_celebrity_id {
        if !celebrity_ids.contains(&primary) {
            celebrity_ids.push(primary);
        }
    }
    for id in &celebrity_ids {
        state.db.get_celebrity(*id).await.map_err(|e| match e {
            DbError::NotFound(_) => ApiError::bad_request(format!("Unknown celebrity: {}", id)),
            other => other.into(),
        })?;
    }

    let item = state
        .db
        .create_news(
            &NewsInput {
                slug,
                primary_celebrity_id: payload.primary_celebrity_id,
                featured_image_url: clean(payload.featured_image_url),
                category,
                visibility: payload.visibility,
                published_at: payload.published_at,
            },
            &translations,
            &celebrity_ids,
        )
        .await
        .map_err(slug_conflict)?;
    info!("Created news {} ({})", item.slug, item.id);

    state.refresh_catalog().await;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn delete_news(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state.db.soft_delete_news(id).await?;
    info!("Deleted news {}", id);
    state.refresh_catalog().await;
    Ok(success())
}

// Dashboard

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    let (counts, recent_celebrities, recent_news) = tokio::try_join!(
        state.db.catalog_counts(),
        state.db.list_all(RECENT_ITEMS, 0),
        state.db.recent_news(Locale::default(), RECENT_ITEMS, 0),
    )?;
    Ok(Json(DashboardStats {
        counts,
        recent_celebrities,
        recent_news,
    }))
}

pub async fn search_queries(
    State(state): State<AppState>,
    Query(query): Query<TopQueriesQuery>,
) -> ApiResult<Json<Vec<QueryCount>>> {
    let period = QueryPeriod::from_param(query.period.as_deref());
    let limit = query.limit.unwrap_or(TOP_QUERIES_DEFAULT).clamp(1, 100);
    Ok(Json(top_search_queries(state.db.as_ref(), period, limit).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_slug() {
        assert_eq!(resolve_slug(None, "Barış Manço").unwrap(), "baris-manco");
        assert_eq!(resolve_slug(Some(" tarkan ".to_string()), "x").unwrap(), "tarkan");
        assert!(resolve_slug(Some("Not Valid".to_string()), "x").is_err());
        assert!(resolve_slug(None, "!!!").is_err());
    }

    #[test]
    fn test_celebrity_input_requires_name() {
        let payload = CelebrityPayload {
            full_name: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(celebrity_input(&payload, 0.0), Err(ApiError::BadRequest(_))));

        let payload = CelebrityPayload {
            full_name: "Sezen Aksu".to_string(),
            country: Some(" ".to_string()),
            ..Default::default()
        };
        let input = celebrity_input(&payload, 4.5).unwrap();
        assert_eq!(input.slug, "sezen-aksu");
        assert_eq!(input.country, None);
        assert_eq!(input.popularity_score, 4.5);
    }

    #[test]
    fn test_payload_translations() {
        let payload = CelebrityPayload {
            full_name: "Tarkan".to_string(),
            bio_short_tr: Some("Megastar".to_string()),
            fun_facts_en: Some(vec!["Kiss sound".to_string()]),
            ..Default::default()
        };
        let translations = payload_translations(&payload);
        assert_eq!(translations.len(), 2);
        let tr = &translations[0];
        assert_eq!(tr.language_code, "tr");
        assert_eq!(tr.bio_short.as_deref(), Some("Megastar"));
        let en = &translations[1];
        assert_eq!(en.fun_facts.as_deref(), Some(r#"["Kiss sound"]"#));
        assert!(en.bio_short.is_none());
    }

    #[test]
    fn test_tag_input_validation() {
        let ok = tag_input(TagPayload {
            name_tr: "Şarkıcı".to_string(),
            name_en: "Singer".to_string(),
            category: Some("profession".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ok.slug, "singer");

        let bad = tag_input(TagPayload {
            name_tr: "X".to_string(),
            name_en: "X".to_string(),
            category: Some("weird".to_string()),
            ..Default::default()
        });
        assert!(bad.is_err());
    }

    #[test]
    fn test_news_translations() {
        let ok = news_translations(&[NewsTranslationPayload {
            language_code: "TR".to_string(),
            title: " Yeni albüm ".to_string(),
            ..Default::default()
        }])
        .unwrap();
        assert_eq!(ok[0].language_code, "tr");
        assert_eq!(ok[0].title, "Yeni albüm");

        assert!(news_translations(&[]).is_err());
        assert!(news_translations(&[NewsTranslationPayload {
            language_code: "de".to_string(),
            title: "x".to_string(),
            ..Default::default()
        }])
        .is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.org").is_ok());
        assert!(validate_email("nope").is_err());
        assert!(validate_email("@b.org").is_err());
    }
}
