use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::Value;

use super::date::{calculate_age, zodiac_sign};
use super::seo::{self, PageMeta};
use super::{LocalizedTag, Locale, Pagination};
use crate::config::SiteConfig;
use crate::db::{
    Celebrity, CelebrityOrder, CelebrityRepo, CelebrityTranslation, DbError, DbResult,
    PopularEntry, Repository, SocialLink, StatPeriod,
};

pub const POPULAR_PAGE_SIZE: i64 = 24;
const HOME_LIST_SIZE: i64 = 12;
const HOME_TOP_SEARCHED: i64 = 10;
const HOME_POPULAR_TAGS: i64 = 10;
const TRENDING_TAGS: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSeo {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub json_ld: Value,
}

/// Everything the profile page shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CelebrityProfile {
    #[serde(flatten)]
    pub celebrity: Celebrity,
    pub locale: Locale,
    pub translation: Option<CelebrityTranslation>,
    pub fun_facts: Vec<String>,
    pub social_links: Vec<SocialLink>,
    pub tags: Vec<LocalizedTag>,
    pub age: Option<u32>,
    pub zodiac_sign: Option<&'static str>,
    pub seo: ProfileSeo,
}

/// A celebrity with a few of its tags, as shown on listing cards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CelebrityCard {
    #[serde(flatten)]
    pub celebrity: Celebrity,
    pub bio_short: Option<String>,
    pub tags: Vec<LocalizedTag>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePage {
    pub locale: Locale,
    pub celebrity_of_the_day: Option<CelebrityCard>,
    pub born_today: Vec<Celebrity>,
    pub trending: Vec<CelebrityCard>,
    pub top_searched: Vec<Celebrity>,
    pub popular_tags: Vec<LocalizedTag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopularPeriod {
    Daily,
    Weekly,
    Monthly,
    #[default]
    AllTime,
}

impl PopularPeriod {
    pub fn from_param(value: Option<&str>) -> PopularPeriod {
        match value {
            Some("daily") => PopularPeriod::Daily,
            Some("weekly") => PopularPeriod::Weekly,
            Some("monthly") => PopularPeriod::Monthly,
            _ => PopularPeriod::AllTime,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PopularPeriod::Daily => "daily",
            PopularPeriod::Weekly => "weekly",
            PopularPeriod::Monthly => "monthly",
            PopularPeriod::AllTime => "all-time",
        }
    }

    fn snapshot(&self) -> Option<StatPeriod> {
        match self {
            PopularPeriod::Daily => Some(StatPeriod::Daily),
            PopularPeriod::Weekly => Some(StatPeriod::Weekly),
            PopularPeriod::Monthly => Some(StatPeriod::Monthly),
            PopularPeriod::AllTime => None,
        }
    }
}

/// `sortBy` of the popular page; anything unknown ranks by popularity.
pub fn popular_order(value: Option<&str>) -> CelebrityOrder {
    match value {
        Some("views") => CelebrityOrder::Views,
        Some("searches") => CelebrityOrder::Searches,
        _ => CelebrityOrder::Popularity,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularPage {
    pub period: &'static str,
    pub celebrities: Vec<PopularEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthdaysPage {
    pub today: NaiveDate,
    pub month: u32,
    pub born_today: Vec<Celebrity>,
    pub born_this_month: Vec<Celebrity>,
}

fn not_public(slug: &str) -> DbError {
    DbError::NotFound(format!("Celebrity not found: {}", slug))
}

/// Public profile for `slug`. Drafts, private and deleted entries are
/// reported as not found.
pub async fn load_profile<R>(
    repo: &R,
    site: &SiteConfig,
    slug: &str,
    locale: Locale,
    today: NaiveDate,
) -> DbResult<CelebrityProfile>
where
    R: CelebrityRepo + ?Sized,
{
    let celebrity = repo.get_celebrity_by_slug(slug).await?;
    if !celebrity.is_public() {
        return Err(not_public(slug));
    }

    let (translation, social_links, tags) = tokio::try_join!(
        repo.get_translation(celebrity.id, locale),
        repo.list_social_links(celebrity.id),
        repo.list_celebrity_tags(celebrity.id),
    )?;

    let age = celebrity
        .birth_date
        .and_then(|birth| calculate_age(birth, celebrity.death_date.unwrap_or(today)));
    let zodiac = celebrity.birth_date.map(|birth| zodiac_sign(birth, locale));

    let bio_short = translation.as_ref().and_then(|t| t.bio_short.as_deref());
    let title = translation
        .as_ref()
        .and_then(|t| t.meta_title.clone())
        .unwrap_or_else(|| format!("{} | {}", celebrity.full_name, site.name));
    let description = translation
        .as_ref()
        .and_then(|t| t.meta_description.clone())
        .or_else(|| bio_short.map(str::to_string))
        .or_else(|| celebrity.profession.clone())
        .unwrap_or_default();

    let tag_slugs: Vec<String> = tags.iter().map(|t| t.slug.clone()).collect();
    let json_ld = seo::person_schema(
        &site.base_url,
        locale,
        &celebrity,
        bio_short,
        &social_links,
        &tag_slugs,
    );
    let meta = seo::page_meta(&site.base_url, locale, "u", &celebrity.slug, title, description);

    Ok(CelebrityProfile {
        locale,
        fun_facts: translation
            .as_ref()
            .map(CelebrityTranslation::fun_facts_list)
            .unwrap_or_default(),
        tags: tags.iter().map(|t| LocalizedTag::new(t, locale)).collect(),
        age,
        zodiac_sign: zodiac,
        seo: ProfileSeo { meta, json_ld },
        translation,
        social_links,
        celebrity,
    })
}

async fn card<R>(repo: &R, celebrity: Celebrity, locale: Locale, max_tags: usize) -> DbResult<CelebrityCard>
where
    R: CelebrityRepo + ?Sized,
{
    let (translation, tags) = tokio::try_join!(
        repo.get_translation(celebrity.id, locale),
        repo.list_celebrity_tags(celebrity.id),
    )?;
    Ok(CelebrityCard {
        bio_short: translation.and_then(|t| t.bio_short),
        tags: tags
            .iter()
            .take(max_tags)
            .map(|t| LocalizedTag::new(t, locale))
            .collect(),
        celebrity,
    })
}

/// The featured celebrity, else the most popular one.
pub async fn celebrity_of_the_day<R>(repo: &R, locale: Locale) -> DbResult<Option<CelebrityCard>>
where
    R: CelebrityRepo + ?Sized,
{
    let pick = match repo.find_featured().await? {
        Some(c) => Some(c),
        None => repo
            .list_published(CelebrityOrder::Popularity, 1, 0)
            .await?
            .into_iter()
            .next(),
    };
    match pick {
        Some(c) => Ok(Some(card(repo, c, locale, usize::MAX).await?)),
        None => Ok(None),
    }
}

pub async fn born_today<R>(repo: &R, today: NaiveDate) -> DbResult<Vec<Celebrity>>
where
    R: CelebrityRepo + ?Sized,
{
    repo.born_on(today.month(), today.day(), HOME_LIST_SIZE).await
}

/// Most viewed celebrities, each with its first few tags.
pub async fn trending<R>(repo: &R, locale: Locale, limit: i64) -> DbResult<Vec<CelebrityCard>>
where
    R: CelebrityRepo + ?Sized,
{
    let celebrities = repo.list_published(CelebrityOrder::Trending, limit, 0).await?;
    let mut cards = Vec::with_capacity(celebrities.len());
    for c in celebrities {
        cards.push(card(repo, c, locale, TRENDING_TAGS).await?);
    }
    Ok(cards)
}

pub async fn home_page<R>(repo: &R, locale: Locale, today: NaiveDate) -> DbResult<HomePage>
where
    R: Repository + ?Sized,
{
    let (celebrity_of_the_day, born_today, trending, top_searched, popular_tags) = tokio::try_join!(
        celebrity_of_the_day(repo, locale),
        born_today(repo, today),
        trending(repo, locale, HOME_LIST_SIZE),
        super::analytics::top_searched(repo, HOME_TOP_SEARCHED),
        repo.popular_tags(HOME_POPULAR_TAGS),
    )?;

    Ok(HomePage {
        locale,
        celebrity_of_the_day,
        born_today,
        trending,
        top_searched,
        popular_tags: popular_tags
            .iter()
            .map(|t| LocalizedTag::with_count(t, locale))
            .collect(),
    })
}

pub async fn popular_page<R>(
    repo: &R,
    period: PopularPeriod,
    order: CelebrityOrder,
    page: i64,
) -> DbResult<PopularPage>
where
    R: Repository + ?Sized,
{
    let page = page.max(1);
    let offset = Pagination::offset(page, POPULAR_PAGE_SIZE);

    let (celebrities, total) = match period.snapshot() {
        Some(stat_period) => tokio::try_join!(
            repo.popular_in_period(stat_period, order, POPULAR_PAGE_SIZE, offset),
            repo.count_popular_in_period(stat_period),
        )?,
        None => {
            let (list, total) = tokio::try_join!(
                repo.list_published(order, POPULAR_PAGE_SIZE, offset),
                repo.count_published(),
            )?;
            let entries = list
                .into_iter()
                .enumerate()
                .map(|(i, c)| PopularEntry {
                    period_views: c.total_views,
                    period_searches: c.total_searches,
                    rank_position: Some(offset.saturating_add(i as i64 + 1)),
                    celebrity: c,
                })
                .collect();
            (entries, total)
        }
    };

    Ok(PopularPage {
        period: period.as_str(),
        celebrities,
        pagination: Pagination::new(page, POPULAR_PAGE_SIZE, total),
    })
}

/// Born on `today`, and born at any day of `month` (defaults to today's).
pub async fn birthdays_page<R>(repo: &R, today: NaiveDate, month: Option<u32>) -> DbResult<BirthdaysPage>
where
    R: CelebrityRepo + ?Sized,
{
    let month = month.filter(|m| (1..=12).contains(m)).unwrap_or(today.month());
    let (born_today, born_this_month) =
        tokio::try_join!(born_today(repo, today), repo.born_in_month(month))?;
    Ok(BirthdaysPage {
        today,
        month,
        born_today,
        born_this_month,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        AnalyticsRepo, CelebrityInput, SocialLinkInput, SqliteRepository, TagInput, TagRepo,
        Visibility,
    };
    use chrono::Utc;

    fn site() -> SiteConfig {
        SiteConfig {
            name: "Celebrity Bio".to_string(),
            base_url: "https://example.org".to_string(),
        }
    }

    fn input(slug: &str, popularity: f64) -> CelebrityInput {
        CelebrityInput {
            slug: slug.to_string(),
            full_name: slug.to_string(),
            profession: Some("Singer".to_string()),
            visibility: Visibility::Published,
            popularity_score: popularity,
            ..Default::default()
        }
    }

    async fn repo() -> SqliteRepository {
        SqliteRepository::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_load_profile() {
        let repo = repo().await;
        let mut tarkan = input("tarkan", 90.0);
        tarkan.birth_date = NaiveDate::from_ymd_opt(1972, 10, 17);
        let c = repo.create_celebrity(&tarkan).await.unwrap();
        repo.upsert_translation(&CelebrityTranslation {
            celebrity_id: c.id,
            language_code: "tr".to_string(),
            bio_short: Some("Megastar".to_string()),
            fun_facts: Some(r#"["Öpücük"]"#.to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        repo.set_social_links(
            c.id,
            &[
                SocialLinkInput {
                    platform: "x".to_string(),
                    url: Some("https://x.com/tarkan".to_string()),
                    sort_order: 2,
                    ..Default::default()
                },
                SocialLinkInput {
                    platform: "instagram".to_string(),
                    url: Some("https://instagram.com/tarkan".to_string()),
                    sort_order: 1,
                    ..Default::default()
                },
            ],
        )
        .await
        .unwrap();
        let tag = repo
            .create_tag(&TagInput {
                slug: "pop".to_string(),
                name_tr: "Pop Müzik".to_string(),
                name_en: "Pop Music".to_string(),
                category: "genre".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        repo.set_celebrity_tags(c.id, &[tag.id]).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 10, 16).unwrap();
        let profile = load_profile(&repo, &site(), "tarkan", Locale::Tr, today).await.unwrap();
        assert_eq!(profile.age, Some(51));
        assert_eq!(profile.zodiac_sign, Some("Terazi"));
        assert_eq!(profile.fun_facts, vec!["Öpücük".to_string()]);
        assert_eq!(profile.social_links[0].platform, "instagram");
        assert_eq!(profile.tags[0].name, "Pop Müzik");
        assert_eq!(profile.seo.meta.description, "Megastar");
        assert_eq!(profile.seo.meta.canonical, "https://example.org/tr/u/tarkan");
        assert_eq!(profile.seo.json_ld["knowsAbout"][0], "pop");

        let profile = load_profile(&repo, &site(), "tarkan", Locale::En, today).await.unwrap();
        assert!(profile.translation.is_none());
        assert_eq!(profile.seo.meta.description, "Singer");
    }

    #[tokio::test]
    async fn test_hidden_profiles_are_not_found() {
        let repo = repo().await;
        let mut draft = input("draft", 0.0);
        draft.visibility = Visibility::Draft;
        repo.create_celebrity(&draft).await.unwrap();
        let today = Utc::now().date_naive();

        let err = load_profile(&repo, &site(), "draft", Locale::En, today).await;
        assert!(matches!(err, Err(DbError::NotFound(_))));
        let err = load_profile(&repo, &site(), "missing", Locale::En, today).await;
        assert!(matches!(err, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_deceased_age_stops_at_death() {
        let repo = repo().await;
        let mut manco = input("baris-manco", 50.0);
        manco.birth_date = NaiveDate::from_ymd_opt(1943, 1, 2);
        manco.death_date = NaiveDate::from_ymd_opt(1999, 2, 1);
        repo.create_celebrity(&manco).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let profile = load_profile(&repo, &site(), "baris-manco", Locale::En, today).await.unwrap();
        assert_eq!(profile.age, Some(56));
    }

    #[tokio::test]
    async fn test_home_page() {
        let repo = repo().await;
        let mut birthday = input("birthday", 10.0);
        birthday.birth_date = NaiveDate::from_ymd_opt(1990, 3, 9);
        repo.create_celebrity(&birthday).await.unwrap();
        let top = repo.create_celebrity(&input("top", 99.0)).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let home = home_page(&repo, Locale::En, today).await.unwrap();
        assert_eq!(home.celebrity_of_the_day.unwrap().celebrity.id, top.id);
        assert_eq!(home.born_today.len(), 1);
        assert_eq!(home.trending.len(), 2);

        let mut featured = input("featured", 1.0);
        featured.is_featured = true;
        let featured = repo.create_celebrity(&featured).await.unwrap();
        let pick = celebrity_of_the_day(&repo, Locale::En).await.unwrap().unwrap();
        assert_eq!(pick.celebrity.id, featured.id);
    }

    #[tokio::test]
    async fn test_popular_page_periods() {
        let repo = repo().await;
        let a = repo.create_celebrity(&input("a", 10.0)).await.unwrap();
        let b = repo.create_celebrity(&input("b", 20.0)).await.unwrap();
        repo.increment_views(a.id).await.unwrap();

        let page = popular_page(&repo, PopularPeriod::AllTime, CelebrityOrder::Popularity, 1)
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.celebrities[0].celebrity.id, b.id);
        assert_eq!(page.celebrities[0].rank_position, Some(1));

        let page = popular_page(&repo, PopularPeriod::AllTime, CelebrityOrder::Views, 1)
            .await
            .unwrap();
        assert_eq!(page.celebrities[0].celebrity.id, a.id);
        assert_eq!(page.celebrities[0].period_views, 1);

        // No snapshot yet.
        let page = popular_page(&repo, PopularPeriod::Weekly, CelebrityOrder::Popularity, 1)
            .await
            .unwrap();
        assert!(page.celebrities.is_empty());
        assert_eq!(repo.count_popular_in_period(StatPeriod::Weekly).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_birthdays_page() {
        let repo = repo().await;
        for (slug, m, d) in [("one", 3, 20), ("two", 3, 2), ("three", 4, 1)] {
            let mut c = input(slug, 0.0);
            c.birth_date = NaiveDate::from_ymd_opt(1980, m, d);
            repo.create_celebrity(&c).await.unwrap();
        }
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();

        let page = birthdays_page(&repo, today, None).await.unwrap();
        assert_eq!(page.month, 3);
        assert_eq!(page.born_today.len(), 1);
        let slugs: Vec<&str> = page.born_this_month.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["two", "one"]);

        let page = birthdays_page(&repo, today, Some(4)).await.unwrap();
        assert_eq!(page.born_this_month.len(), 1);
        let page = birthdays_page(&repo, today, Some(13)).await.unwrap();
        assert_eq!(page.month, 3);
    }
}
