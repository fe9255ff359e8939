use serde::Serialize;

use super::{LocalizedTag, Locale, Pagination};
use crate::db::{Celebrity, DbResult, TagRepo};

pub const TAG_PAGE_SIZE: i64 = 24;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPage {
    pub tag: LocalizedTag,
    pub celebrities: Vec<Celebrity>,
    pub pagination: Pagination,
}

pub async fn all_tags<R>(repo: &R, locale: Locale) -> DbResult<Vec<LocalizedTag>>
where
    R: TagRepo + ?Sized,
{
    let tags = repo.list_tags().await?;
    Ok(tags.iter().map(|t| LocalizedTag::new(t, locale)).collect())
}

/// A tag and one page of its published celebrities, most popular first.
pub async fn tag_page<R>(repo: &R, slug: &str, locale: Locale, page: i64) -> DbResult<TagPage>
where
    R: TagRepo + ?Sized,
{
    let tag = repo.get_tag_by_slug(slug).await?;
    let page = page.max(1);
    let offset = Pagination::offset(page, TAG_PAGE_SIZE);

    let (celebrities, total) = tokio::try_join!(
        repo.celebrities_by_tag(tag.id, TAG_PAGE_SIZE, offset),
        repo.count_celebrities_by_tag(tag.id),
    )?;

    Ok(TagPage {
        tag: LocalizedTag::new(&tag, locale),
        celebrities,
        pagination: Pagination::new(page, TAG_PAGE_SIZE, total),
    })
}
