use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::*;
use crate::catalog::Locale;

/// Ordering for public celebrity listings. Ties always fall back to id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CelebrityOrder {
    Popularity,
    Views,
    Searches,
    /// Views first, popularity second.
    Trending,
    Newest,
}

impl CelebrityOrder {
    pub(crate) fn sql(&self) -> &'static str {
        match self {
            CelebrityOrder::Popularity => "c.popularity_score DESC, c.id ASC",
            CelebrityOrder::Views => "c.total_views DESC, c.id ASC",
            CelebrityOrder::Searches => "c.total_searches DESC, c.id ASC",
            CelebrityOrder::Trending => "c.total_views DESC, c.popularity_score DESC, c.id ASC",
            CelebrityOrder::Newest => "c.created_at DESC, c.id DESC",
        }
    }
}

/// Window a popularity snapshot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl StatPeriod {
    pub const ALL: [StatPeriod; 3] = [StatPeriod::Daily, StatPeriod::Weekly, StatPeriod::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatPeriod::Daily => "daily",
            StatPeriod::Weekly => "weekly",
            StatPeriod::Monthly => "monthly",
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        match self {
            StatPeriod::Daily => chrono::Duration::days(1),
            StatPeriod::Weekly => chrono::Duration::days(7),
            StatPeriod::Monthly => chrono::Duration::days(30),
        }
    }
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_user(&self, id: i64) -> DbResult<User>;
    async fn get_user_by_email(&self, email: &str) -> DbResult<User>;
    async fn list_users(&self) -> DbResult<Vec<User>>;
    async fn count_users(&self) -> DbResult<i64>;
    async fn create_user(&self, user: &NewUser) -> DbResult<User>;
    async fn update_user(&self, id: i64, user: &UserUpdate) -> DbResult<User>;
    async fn delete_user(&self, id: i64) -> DbResult<()>;
    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> DbResult<()>;
}

#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn get_session(&self, token: &str) -> DbResult<Session>;
    async fn create_session(&self, session: &Session) -> DbResult<()>;
    async fn delete_session(&self, token: &str) -> DbResult<()>;
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> DbResult<u64>;
}

#[async_trait]
pub trait CelebrityRepo: Send + Sync {
    async fn get_celebrity(&self, id: i64) -> DbResult<Celebrity>;
    async fn get_celebrity_by_slug(&self, slug: &str) -> DbResult<Celebrity>;
    async fn get_translation(
        &self,
        celebrity_id: i64,
        locale: Locale,
    ) -> DbResult<Option<CelebrityTranslation>>;
    async fn list_social_links(&self, celebrity_id: i64) -> DbResult<Vec<SocialLink>>;
    async fn list_celebrity_tags(&self, celebrity_id: i64) -> DbResult<Vec<Tag>>;
    async fn list_tag_ids(&self, celebrity_id: i64) -> DbResult<Vec<i64>>;
    /// Tag ids for each of the given celebrities.
    async fn tag_ids_for(&self, celebrity_ids: &[i64]) -> DbResult<HashMap<i64, Vec<i64>>>;
    /// Published peers of `base` sharing its profession, its country or
    /// one of `tag_ids`, in id order.
    async fn similar_candidates(
        &self,
        base: &Celebrity,
        tag_ids: &[i64],
        limit: i64,
    ) -> DbResult<Vec<Celebrity>>;
    async fn list_published(
        &self,
        order: CelebrityOrder,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Celebrity>>;
    async fn count_published(&self) -> DbResult<i64>;
    async fn find_featured(&self) -> DbResult<Option<Celebrity>>;
    async fn born_on(&self, month: u32, day: u32, limit: i64) -> DbResult<Vec<Celebrity>>;
    async fn born_in_month(&self, month: u32) -> DbResult<Vec<Celebrity>>;
    /// Every celebrity that is not soft-deleted, drafts included.
    async fn list_all(&self, limit: i64, offset: i64) -> DbResult<Vec<Celebrity>>;
    async fn count_all(&self) -> DbResult<i64>;
    async fn create_celebrity(&self, input: &CelebrityInput) -> DbResult<Celebrity>;
    async fn update_celebrity(&self, id: i64, input: &CelebrityInput) -> DbResult<Celebrity>;
    /// Create the row and its relations in one transaction.
    async fn create_celebrity_record(&self, record: &CelebrityRecord) -> DbResult<Celebrity>;
    /// Update the row and its relations in one transaction.
    async fn update_celebrity_record(&self, id: i64, record: &CelebrityRecord) -> DbResult<Celebrity>;
    async fn upsert_translation(&self, translation: &CelebrityTranslation) -> DbResult<()>;
    async fn set_celebrity_tags(&self, celebrity_id: i64, tag_ids: &[i64]) -> DbResult<()>;
    async fn set_social_links(&self, celebrity_id: i64, links: &[SocialLinkInput]) -> DbResult<()>;
    async fn soft_delete_celebrity(&self, id: i64) -> DbResult<()>;
    async fn increment_views(&self, id: i64) -> DbResult<()>;
    async fn increment_searches(&self, id: i64) -> DbResult<()>;
    /// (celebrity id, tag slug) for every published celebrity.
    async fn published_tag_slugs(&self) -> DbResult<Vec<(i64, String)>>;
    /// (celebrity id, short bio) in every locale for published celebrities.
    async fn published_short_bios(&self) -> DbResult<Vec<(i64, String)>>;
}

#[async_trait]
pub trait TagRepo: Send + Sync {
    async fn get_tag(&self, id: i64) -> DbResult<Tag>;
    async fn get_tag_by_slug(&self, slug: &str) -> DbResult<Tag>;
    async fn list_tags(&self) -> DbResult<Vec<Tag>>;
    async fn count_tags(&self) -> DbResult<i64>;
    async fn popular_tags(&self, limit: i64) -> DbResult<Vec<TagWithCount>>;
    async fn create_tag(&self, input: &TagInput) -> DbResult<Tag>;
    async fn update_tag(&self, id: i64, input: &TagInput) -> DbResult<Tag>;
    async fn delete_tag(&self, id: i64) -> DbResult<()>;
    async fn celebrities_by_tag(
        &self,
        tag_id: i64,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Celebrity>>;
    async fn count_celebrities_by_tag(&self, tag_id: i64) -> DbResult<i64>;
}

#[async_trait]
pub trait NewsRepo: Send + Sync {
    async fn get_news(&self, id: i64) -> DbResult<NewsItem>;
    async fn get_news_by_slug(&self, slug: &str) -> DbResult<NewsItem>;
    async fn get_news_translation(
        &self,
        news_id: i64,
        locale: Locale,
    ) -> DbResult<Option<NewsTranslation>>;
    async fn news_celebrities(&self, news_id: i64) -> DbResult<Vec<Celebrity>>;
    async fn related_news(
        &self,
        celebrity_id: i64,
        locale: Locale,
        limit: i64,
    ) -> DbResult<Vec<NewsSummary>>;
    async fn list_news(
        &self,
        locale: Locale,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<NewsSummary>>;
    async fn count_news(&self, category: Option<&str>) -> DbResult<i64>;
    /// Latest news regardless of visibility, for the admin views.
    async fn recent_news(&self, locale: Locale, limit: i64, offset: i64) -> DbResult<Vec<NewsSummary>>;
    async fn count_all_news(&self) -> DbResult<i64>;
    async fn create_news(
        &self,
        input: &NewsInput,
        translations: &[NewsTranslation],
        celebrity_ids: &[i64],
    ) -> DbResult<NewsItem>;
    async fn soft_delete_news(&self, id: i64) -> DbResult<()>;
}

#[async_trait]
pub trait AnalyticsRepo: Send + Sync {
    async fn insert_search_log(&self, log: &NewSearchLog) -> DbResult<()>;
    async fn insert_view_log(&self, log: &NewViewLog) -> DbResult<()>;
    async fn top_search_queries(&self, since: DateTime<Utc>, limit: i64) -> DbResult<Vec<QueryCount>>;
    async fn activity_since(&self, since: DateTime<Utc>) -> DbResult<Vec<ActivityCount>>;
    async fn replace_popularity_stats(
        &self,
        period: StatPeriod,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rows: &[NewPopularityStat],
    ) -> DbResult<()>;
    async fn list_popularity_stats(&self, period: StatPeriod) -> DbResult<Vec<PopularityStat>>;
    async fn popular_in_period(
        &self,
        period: StatPeriod,
        order: CelebrityOrder,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<PopularEntry>>;
    async fn count_popular_in_period(&self, period: StatPeriod) -> DbResult<i64>;
    async fn catalog_counts(&self) -> DbResult<CatalogCounts>;
    async fn ping(&self) -> DbResult<()>;
}

pub trait Repository:
    UserRepo + SessionRepo + CelebrityRepo + TagRepo + NewsRepo + AnalyticsRepo + Send + Sync
{
}

impl<T> Repository for T where
    T: UserRepo + SessionRepo + CelebrityRepo + TagRepo + NewsRepo + AnalyticsRepo + Send + Sync
{
}
