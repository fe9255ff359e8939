use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::db::{
    AnalyticsRepo, Celebrity, CelebrityOrder, CelebrityRepo, DbResult, NewPopularityStat,
    NewSearchLog, NewViewLog, QueryCount, StatPeriod,
};

/// Who made a request, as far as analytics cares.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchEvent {
    pub query: String,
    pub results_count: i64,
    pub matched_celebrity_id: Option<i64>,
    pub clicked_position: Option<i32>,
}

/// Window for the top search query report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryPeriod {
    Day,
    #[default]
    Week,
    Month,
}

impl QueryPeriod {
    pub fn from_param(value: Option<&str>) -> QueryPeriod {
        match value {
            Some("day") => QueryPeriod::Day,
            Some("month") => QueryPeriod::Month,
            _ => QueryPeriod::Week,
        }
    }

    fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            QueryPeriod::Day => now - chrono::Duration::days(1),
            QueryPeriod::Week => now - chrono::Duration::days(7),
            QueryPeriod::Month => now - chrono::Duration::days(30),
        }
    }
}

pub fn hash_ip(ip: &str) -> String {
    hex::encode(Sha256::digest(ip.as_bytes()))
}

pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

pub async fn log_search<R>(repo: &R, event: &SearchEvent, client: &ClientInfo) -> DbResult<()>
where
    R: AnalyticsRepo + CelebrityRepo + ?Sized,
{
    let log = NewSearchLog {
        query: event.query.clone(),
        normalized_query: normalize_query(&event.query),
        results_count: event.results_count,
        matched_celebrity_id: event.matched_celebrity_id,
        clicked_position: event.clicked_position,
        user_ip_hash: client.ip.as_deref().map(hash_ip),
        user_agent: client.user_agent.clone(),
    };
    repo.insert_search_log(&log).await?;

    if let Some(id) = event.matched_celebrity_id {
        repo.increment_searches(id).await?;
    }
    Ok(())
}

pub async fn log_view<R>(
    repo: &R,
    celebrity_id: i64,
    page_type: Option<&str>,
    client: &ClientInfo,
    session_id: Option<String>,
) -> DbResult<()>
where
    R: AnalyticsRepo + CelebrityRepo + ?Sized,
{
    let log = NewViewLog {
        celebrity_id,
        page_type: page_type.unwrap_or("profile").to_string(),
        referrer: client.referrer.clone(),
        user_ip_hash: client.ip.as_deref().map(hash_ip),
        user_agent: client.user_agent.clone(),
        session_id,
    };
    repo.insert_view_log(&log).await?;
    repo.increment_views(celebrity_id).await
}

/// Record a search without holding up the response.
pub fn spawn_log_search<R>(repo: Arc<R>, event: SearchEvent, client: ClientInfo)
where
    R: AnalyticsRepo + CelebrityRepo + ?Sized + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = log_search(repo.as_ref(), &event, &client).await {
            warn!("Failed to log search {:?}: {}", event.query, e);
        }
    });
}

/// Record a profile view without holding up the response.
pub fn spawn_log_view<R>(repo: Arc<R>, celebrity_id: i64, client: ClientInfo)
where
    R: AnalyticsRepo + CelebrityRepo + ?Sized + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = log_view(repo.as_ref(), celebrity_id, None, &client, None).await {
            warn!("Failed to log view of celebrity {}: {}", celebrity_id, e);
        }
    });
}

pub async fn top_search_queries<R>(
    repo: &R,
    period: QueryPeriod,
    limit: i64,
) -> DbResult<Vec<QueryCount>>
where
    R: AnalyticsRepo + ?Sized,
{
    repo.top_search_queries(period.since(Utc::now()), limit).await
}

pub async fn top_searched<R>(repo: &R, limit: i64) -> DbResult<Vec<Celebrity>>
where
    R: CelebrityRepo + ?Sized,
{
    repo.list_published(CelebrityOrder::Searches, limit, 0).await
}

/// Replace the snapshot of every period with counts from the logs.
/// Celebrities without activity in a window get no row for it.
pub async fn rollup_popularity<R>(repo: &R, now: DateTime<Utc>) -> DbResult<()>
where
    R: AnalyticsRepo + ?Sized,
{
    for period in StatPeriod::ALL {
        let start = now - period.duration();
        let mut activity: Vec<_> = repo
            .activity_since(start)
            .await?
            .into_iter()
            .filter(|a| a.view_count + a.search_count > 0)
            .collect();

        activity.sort_by_key(|a| (Reverse(a.view_count + a.search_count), a.celebrity_id));

        let rows: Vec<NewPopularityStat> = activity
            .into_iter()
            .enumerate()
            .map(|(i, a)| NewPopularityStat {
                celebrity_id: a.celebrity_id,
                view_count: a.view_count,
                search_count: a.search_count,
                popularity_score: a.popularity_score,
                rank_position: i as i64 + 1,
            })
            .collect();

        debug!("Rolling up {} {} popularity rows", rows.len(), period.as_str());
        repo.replace_popularity_stats(period, start, now, &rows).await?;
    }
    Ok(())
}

pub fn start_rollup_loop<R>(repo: Arc<R>, interval_secs: u64)
where
    R: AnalyticsRepo + ?Sized + 'static,
{
    info!("Popularity rollup every {} seconds", interval_secs);
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(interval_secs.max(1)));
        loop {
            interval.tick().await;
            if let Err(e) = rollup_popularity(repo.as_ref(), Utc::now()).await {
                error!("Popularity rollup failed: {}", e);
            }
        }
    });
}
