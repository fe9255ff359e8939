use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Locale;

/// Publication state of a celebrity or news item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Draft,
    Published,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    #[default]
    Viewer,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Celebrity {
    pub id: i64,
    pub slug: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub nickname: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub country: Option<String>,
    pub nationality: Option<String>,
    pub profession: Option<String>,
    pub active_years_start: Option<i32>,
    pub profile_image_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub is_featured: bool,
    pub is_verified: bool,
    pub visibility: Visibility,
    pub popularity_score: f64,
    pub total_views: i64,
    pub total_searches: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Celebrity {
    /// Published and not soft-deleted.
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Published && self.deleted_at.is_none()
    }
}

/// Writable celebrity columns, shared by create and update.
#[derive(Debug, Clone, Default)]
pub struct CelebrityInput {
    pub slug: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub nickname: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub country: Option<String>,
    pub nationality: Option<String>,
    pub profession: Option<String>,
    pub active_years_start: Option<i32>,
    pub profile_image_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub is_featured: bool,
    pub is_verified: bool,
    pub visibility: Visibility,
    pub popularity_score: f64,
}

/// A celebrity row and the relations written together with it. `None`
/// leaves the stored tags or links untouched.
#[derive(Debug, Clone, Default)]
pub struct CelebrityRecord {
    pub input: CelebrityInput,
    /// Empty translations only clear a row that already exists.
    pub translations: Vec<CelebrityTranslation>,
    pub tag_ids: Option<Vec<i64>>,
    pub social_links: Option<Vec<SocialLinkInput>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CelebrityTranslation {
    pub celebrity_id: i64,
    pub language_code: String,
    pub bio_short: Option<String>,
    pub bio_long: Option<String>,
    pub career_summary: Option<String>,
    pub personal_life: Option<String>,
    /// JSON array of strings.
    pub fun_facts: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

impl CelebrityTranslation {
    pub fn fun_facts_list(&self) -> Vec<String> {
        self.fun_facts
            .as_deref()
            .and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.bio_short.is_none()
            && self.bio_long.is_none()
            && self.career_summary.is_none()
            && self.personal_life.is_none()
            && self.fun_facts.is_none()
            && self.meta_title.is_none()
            && self.meta_description.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    pub id: i64,
    pub celebrity_id: i64,
    pub platform: String,
    pub handle: Option<String>,
    pub url: Option<String>,
    pub followers_count: Option<i64>,
    pub is_verified: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinkInput {
    pub platform: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub followers_count: Option<i64>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub slug: String,
    pub name_tr: String,
    pub name_en: String,
    pub category: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn localized_name(&self, locale: Locale) -> &str {
        match locale {
            Locale::Tr => &self.name_tr,
            Locale::En => &self.name_en,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagInput {
    pub slug: String,
    pub name_tr: String,
    pub name_en: String,
    pub category: String,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TagWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub tag: Tag,
    pub celebrity_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: i64,
    pub slug: String,
    pub primary_celebrity_id: Option<i64>,
    pub featured_image_url: Option<String>,
    pub category: String,
    pub visibility: Visibility,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl NewsItem {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Published && self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewsInput {
    pub slug: String,
    pub primary_celebrity_id: Option<i64>,
    pub featured_image_url: Option<String>,
    pub category: String,
    pub visibility: Visibility,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NewsTranslation {
    pub news_id: i64,
    pub language_code: String,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
}

/// A news item joined with its translation for one locale.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NewsSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: NewsItem,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub primary_celebrity_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PopularityStat {
    pub id: i64,
    pub celebrity_id: i64,
    pub period_type: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub view_count: i64,
    pub search_count: i64,
    pub popularity_score: f64,
    pub rank_position: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewPopularityStat {
    pub celebrity_id: i64,
    pub view_count: i64,
    pub search_count: i64,
    pub popularity_score: f64,
    pub rank_position: i64,
}

/// A celebrity with the counters it was ranked by.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PopularEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub celebrity: Celebrity,
    pub period_views: i64,
    pub period_searches: i64,
    pub rank_position: Option<i64>,
}

/// Per-celebrity activity counted from the analytics logs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityCount {
    pub celebrity_id: i64,
    pub popularity_score: f64,
    pub view_count: i64,
    pub search_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
}

/// Update for a user; a `None` password hash keeps the current one.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewSearchLog {
    pub query: String,
    pub normalized_query: String,
    pub results_count: i64,
    pub matched_celebrity_id: Option<i64>,
    pub clicked_position: Option<i32>,
    pub user_ip_hash: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewViewLog {
    pub celebrity_id: i64,
    pub page_type: String,
    pub referrer: Option<String>,
    pub user_ip_hash: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueryCount {
    pub query: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCounts {
    pub total_celebrities: i64,
    pub published_celebrities: i64,
    pub total_news: i64,
    pub total_tags: i64,
    pub total_users: i64,
    pub total_views: i64,
    pub total_searches: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

pub type DbResult<T> = Result<T, DbError>;
