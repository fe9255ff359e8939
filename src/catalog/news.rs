use serde::Serialize;

use super::seo::{self, PageMeta};
use super::{Locale, Pagination};
use crate::config::SiteConfig;
use crate::db::{Celebrity, DbError, DbResult, NewsItem, NewsRepo, NewsSummary, NewsTranslation};

pub const NEWS_PAGE_SIZE: i64 = 12;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsListPage {
    pub news: Vec<NewsSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsDetail {
    #[serde(flatten)]
    pub item: NewsItem,
    pub translation: Option<NewsTranslation>,
    pub celebrities: Vec<Celebrity>,
    pub seo: PageMeta,
}

pub async fn news_list<R>(
    repo: &R,
    locale: Locale,
    category: Option<&str>,
    page: i64,
) -> DbResult<NewsListPage>
where
    R: NewsRepo + ?Sized,
{
    let page = page.max(1);
    let offset = Pagination::offset(page, NEWS_PAGE_SIZE);
    let (news, total) = tokio::try_join!(
        repo.list_news(locale, category, NEWS_PAGE_SIZE, offset),
        repo.count_news(category),
    )?;
    Ok(NewsListPage {
        news,
        pagination: Pagination::new(page, NEWS_PAGE_SIZE, total),
    })
}

pub async fn news_detail<R>(
    repo: &R,
    site: &SiteConfig,
    slug: &str,
    locale: Locale,
) -> DbResult<NewsDetail>
where
    R: NewsRepo + ?Sized,
{
    let item = repo.get_news_by_slug(slug).await?;
    if !item.is_public() {
        return Err(DbError::NotFound(format!("News not found: {}", slug)));
    }

    let (translation, celebrities) = tokio::try_join!(
        repo.get_news_translation(item.id, locale),
        repo.news_celebrities(item.id),
    )?;

    let title = translation
        .as_ref()
        .map(|t| format!("{} | {}", t.title, site.name))
        .unwrap_or_else(|| site.name.clone());
    let description = translation
        .as_ref()
        .and_then(|t| t.summary.clone())
        .unwrap_or_default();

    Ok(NewsDetail {
        seo: seo::page_meta(&site.base_url, locale, "news", &item.slug, title, description),
        item,
        translation,
        celebrities,
    })
}

/// Published news linked to a celebrity, newest first.
pub async fn related_news<R>(
    repo: &R,
    celebrity_id: i64,
    locale: Locale,
    limit: i64,
) -> DbResult<Vec<NewsSummary>>
where
    R: NewsRepo + ?Sized,
{
    repo.related_news(celebrity_id, locale, limit).await
}
