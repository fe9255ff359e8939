use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::search::SearchHit;
use crate::db::{Celebrity, NewsSummary, Role, SocialLinkInput, User, Visibility};

#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    pub locale: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub locale: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularQuery {
    pub locale: Option<String>,
    pub page: Option<i64>,
    pub sort_by: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BirthdaysQuery {
    pub locale: Option<String>,
    pub month: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    pub locale: Option<String>,
    pub page: Option<i64>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub locale: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(default)]
    pub autocomplete: bool,
    pub country: Option<String>,
    pub profession: Option<String>,
    /// Comma separated tag slugs.
    pub tags: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AutocompleteResponse {
    pub results: Vec<SearchHit>,
    pub total: usize,
    pub query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPagination {
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub total: usize,
    pub query: String,
    /// Milliseconds spent in the index.
    pub processing_time: u64,
    pub pagination: SearchPagination,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchClickRequest {
    pub query: Option<String>,
    pub celebrity_id: Option<i64>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopQueriesQuery {
    pub period: Option<String>,
    pub limit: Option<i64>,
}

/// Body of the admin celebrity create and update calls. Per-locale text
/// comes as flat `...Tr` / `...En` fields.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CelebrityPayload {
    pub slug: Option<String>,
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
    pub popularity_score: Option<f64>,

    pub bio_short_tr: Option<String>,
    pub bio_long_tr: Option<String>,
    pub career_tr: Option<String>,
    pub personal_life_tr: Option<String>,
    pub fun_facts_tr: Option<Vec<String>>,
    pub meta_title_tr: Option<String>,
    pub meta_description_tr: Option<String>,

    pub bio_short_en: Option<String>,
    pub bio_long_en: Option<String>,
    pub career_en: Option<String>,
    pub personal_life_en: Option<String>,
    pub fun_facts_en: Option<Vec<String>>,
    pub meta_title_en: Option<String>,
    pub meta_description_en: Option<String>,

    pub tag_ids: Option<Vec<i64>>,
    pub social_links: Option<Vec<SocialLinkInput>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagPayload {
    pub slug: Option<String>,
    pub name_tr: String,
    pub name_en: String,
    pub category: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPayload {
    pub email: String,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsTranslationPayload {
    pub language_code: String,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsPayload {
    pub slug: Option<String>,
    pub primary_celebrity_id: Option<i64>,
    pub featured_image_url: Option<String>,
    pub category: Option<String>,
    pub visibility: Visibility,
    pub published_at: Option<DateTime<Utc>>,
    pub translations: Vec<NewsTranslationPayload>,
    pub celebrity_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminList<T> {
    pub items: Vec<T>,
    pub pagination: crate::catalog::Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(flatten)]
    pub counts: crate::db::CatalogCounts,
    pub recent_celebrities: Vec<Celebrity>,
    pub recent_news: Vec<NewsSummary>,
}

/// A celebrity with everything its edit form needs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCelebrity {
    #[serde(flatten)]
    pub celebrity: Celebrity,
    pub translations: Vec<crate::db::CelebrityTranslation>,
    pub tag_ids: Vec<i64>,
    pub social_links: Vec<crate::db::SocialLink>,
}
