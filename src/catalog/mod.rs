//! Page-level data loaders over the repository, plus the similarity scorer,
//! the search index and the small helpers they share.

pub mod analytics;
pub mod celebrity;
pub mod date;
pub mod locale;
pub mod news;
pub mod search;
pub mod seo;
pub mod similar;
pub mod slug;
pub mod tag;

pub use locale::Locale;
pub use search::{SearchError, SearchIndex};

use std::collections::HashMap;

use serde::Serialize;

use crate::db::{CelebrityOrder, Repository, Tag, TagWithCount};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }

    /// Row offset of a 1-based page.
    pub fn offset(page: i64, limit: i64) -> i64 {
        (page.max(1) - 1).saturating_mul(limit.max(0))
    }
}

/// A tag with its name in one language.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedTag {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub category: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celebrity_count: Option<i64>,
}

impl LocalizedTag {
    pub fn new(tag: &Tag, locale: Locale) -> Self {
        Self {
            id: tag.id,
            slug: tag.slug.clone(),
            name: tag.localized_name(locale).to_string(),
            category: tag.category.clone(),
            icon: tag.icon.clone(),
            color: tag.color.clone(),
            celebrity_count: None,
        }
    }

    pub fn with_count(tag: &TagWithCount, locale: Locale) -> Self {
        Self {
            celebrity_count: Some(tag.celebrity_count),
            ..Self::new(&tag.tag, locale)
        }
    }
}

/// Reload every published celebrity into the search index.
pub async fn refresh_search_index<R>(repo: &R, index: &SearchIndex) -> Result<usize, RefreshError>
where
    R: Repository + ?Sized,
{
    let celebrities = repo
        .list_published(CelebrityOrder::Popularity, i64::MAX, 0)
        .await?;

    let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
    for (id, slug) in repo.published_tag_slugs().await? {
        tags.entry(id).or_default().push(slug);
    }
    let mut bios: HashMap<i64, Vec<String>> = HashMap::new();
    for (id, bio) in repo.published_short_bios().await? {
        bios.entry(id).or_default().push(bio);
    }

    let entries: Vec<search::IndexedCelebrity> = celebrities
        .into_iter()
        .map(|celebrity| search::IndexedCelebrity {
            tag_slugs: tags.remove(&celebrity.id).unwrap_or_default(),
            bios: bios.remove(&celebrity.id).unwrap_or_default(),
            celebrity,
        })
        .collect();

    index.rebuild(&entries).await?;
    Ok(entries.len())
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Database(#[from] crate::db::DbError),
    #[error(transparent)]
    Search(#[from] SearchError),
}
