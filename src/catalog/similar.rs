use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::db::{Celebrity, CelebrityRepo, DbError, DbResult};

/// Upper bound on peers fetched for scoring.
pub const CANDIDATE_LIMIT: i64 = 50;

const PROFESSION_WEIGHT: f64 = 10.0;
const COUNTRY_WEIGHT: f64 = 5.0;
const TAG_WEIGHT: f64 = 3.0;
const POPULARITY_WEIGHT: f64 = 0.1;

/// Both present, non-blank and equal once trimmed.
fn same_value(a: &Option<String>, b: &Option<String>) -> bool {
    match (a.as_deref().map(str::trim), b.as_deref().map(str::trim)) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    }
}

/// Composite similarity of `candidate` to `base`.
pub fn similarity_score(
    base: &Celebrity,
    base_tags: &HashSet<i64>,
    candidate: &Celebrity,
    candidate_tags: &[i64],
) -> f64 {
    let mut score = 0.0;
    if same_value(&base.profession, &candidate.profession) {
        score += PROFESSION_WEIGHT;
    }
    if same_value(&base.country, &candidate.country) {
        score += COUNTRY_WEIGHT;
    }
    let shared = candidate_tags
        .iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .filter(|id| base_tags.contains(id))
        .count();
    score += TAG_WEIGHT * shared as f64;
    score + candidate.popularity_score * POPULARITY_WEIGHT
}

/// Score `candidates` against `base` and keep the best `limit`, highest
/// score first and lowest id first among equals.
pub fn rank_similar(
    base: &Celebrity,
    base_tags: &[i64],
    candidates: Vec<Celebrity>,
    candidate_tags: &HashMap<i64, Vec<i64>>,
    limit: usize,
) -> Vec<Celebrity> {
    let base_tags: HashSet<i64> = base_tags.iter().copied().collect();

    let mut scored: Vec<(f64, Celebrity)> = candidates
        .into_iter()
        .filter(|c| c.id != base.id && c.is_public())
        .map(|c| {
            let tags = candidate_tags.get(&c.id).map(Vec::as_slice).unwrap_or(&[]);
            (similarity_score(base, &base_tags, &c, tags), c)
        })
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    scored.into_iter().take(limit).map(|(_, c)| c).collect()
}

/// Published celebrities most similar to `celebrity_id`. An unknown id
/// yields an empty list.
pub async fn similar_celebrities<R>(
    repo: &R,
    celebrity_id: i64,
    limit: usize,
) -> DbResult<Vec<Celebrity>>
where
    R: CelebrityRepo + ?Sized,
{
    if limit == 0 {
        return Ok(Vec::new());
    }

    let base = match repo.get_celebrity(celebrity_id).await {
        Ok(c) => c,
        Err(DbError::NotFound(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let base_tags = repo.list_tag_ids(base.id).await?;
    let candidates = repo
        .similar_candidates(&base, &base_tags, CANDIDATE_LIMIT)
        .await?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = candidates.iter().map(|c| c.id).collect();
    let candidate_tags = repo.tag_ids_for(&ids).await?;

    debug!(
        "Scoring {} similarity candidates for celebrity {}",
        candidates.len(),
        base.id
    );

    Ok(rank_similar(&base, &base_tags, candidates, &candidate_tags, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CelebrityInput, SqliteRepository, TagInput, TagRepo, Visibility};
    use chrono::Utc;

    fn celeb(id: i64, profession: Option<&str>, country: Option<&str>, popularity: f64) -> Celebrity {
        let now = Utc::now();
        Celebrity {
            id,
            slug: format!("celebrity-{}", id),
            first_name: None,
            last_name: None,
            full_name: format!("Celebrity {}", id),
            nickname: None,
            birth_date: None,
            death_date: None,
            birth_place: None,
            country: country.map(str::to_string),
            nationality: None,
            profession: profession.map(str::to_string),
            active_years_start: None,
            profile_image_url: None,
            cover_image_url: None,
            is_featured: false,
            is_verified: false,
            visibility: Visibility::Published,
            popularity_score: popularity,
            total_views: 0,
            total_searches: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn ids(list: &[Celebrity]) -> Vec<i64> {
        list.iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_score_terms() {
        let base = celeb(1, Some("Singer"), Some("Turkey"), 0.0);
        let base_tags: HashSet<i64> = [1, 2, 3].into_iter().collect();

        let same_job = celeb(2, Some("Singer"), Some("France"), 0.0);
        assert_eq!(similarity_score(&base, &base_tags, &same_job, &[]), 10.0);

        let same_country = celeb(3, Some("Actor"), Some("Turkey"), 0.0);
        assert_eq!(similarity_score(&base, &base_tags, &same_country, &[]), 5.0);

        let tagged = celeb(4, None, None, 0.0);
        assert_eq!(similarity_score(&base, &base_tags, &tagged, &[2, 3, 9]), 6.0);
        // Duplicate tag ids count once.
        assert_eq!(similarity_score(&base, &base_tags, &tagged, &[2, 2]), 3.0);

        let popular = celeb(5, Some("Singer"), Some("Turkey"), 50.0);
        assert_eq!(similarity_score(&base, &base_tags, &popular, &[1]), 10.0 + 5.0 + 3.0 + 5.0);
    }

    #[test]
    fn test_missing_fields_never_match() {
        let base = celeb(1, None, Some(""), 0.0);
        let other = celeb(2, None, Some(""), 0.0);
        assert_eq!(similarity_score(&base, &HashSet::new(), &other, &[]), 0.0);

        let padded = celeb(3, Some("Singer "), Some(" "), 0.0);
        let plain = celeb(4, Some("Singer"), Some(" "), 0.0);
        assert_eq!(similarity_score(&padded, &HashSet::new(), &plain, &[]), 10.0);
    }

    #[test]
    fn test_rank_orders_by_score_then_id() {
        let base = celeb(1, Some("Singer"), Some("Turkey"), 0.0);
        let candidates = vec![
            celeb(7, Some("Actor"), Some("Turkey"), 0.0),
            celeb(5, Some("Singer"), Some("France"), 0.0),
            celeb(3, Some("Singer"), Some("France"), 0.0),
            celeb(9, Some("Singer"), Some("Turkey"), 0.0),
        ];
        let ranked = rank_similar(&base, &[], candidates, &HashMap::new(), 10);
        assert_eq!(ids(&ranked), vec![9, 3, 5, 7]);
    }

    #[test]
    fn test_rank_excludes_base_and_hidden_and_respects_limit() {
        let base = celeb(1, Some("Singer"), Some("Turkey"), 0.0);
        let mut draft = celeb(2, Some("Singer"), Some("Turkey"), 0.0);
        draft.visibility = Visibility::Draft;
        let mut deleted = celeb(3, Some("Singer"), Some("Turkey"), 0.0);
        deleted.deleted_at = Some(Utc::now());
        let candidates = vec![
            base.clone(),
            draft,
            deleted,
            celeb(4, Some("Singer"), None, 0.0),
            celeb(5, Some("Singer"), None, 0.0),
            celeb(6, Some("Singer"), None, 0.0),
        ];

        let ranked = rank_similar(&base, &[], candidates.clone(), &HashMap::new(), 2);
        assert_eq!(ids(&ranked), vec![4, 5]);

        assert!(rank_similar(&base, &[], candidates, &HashMap::new(), 0).is_empty());
    }

    #[test]
    fn test_tags_outweigh_popularity() {
        let base = celeb(1, None, None, 0.0);
        let mut tags = HashMap::new();
        tags.insert(2, vec![10]);
        tags.insert(3, vec![10, 11]);
        let candidates = vec![celeb(2, None, None, 9.0), celeb(3, None, None, 0.0)];
        let ranked = rank_similar(&base, &[10, 11], candidates, &tags, 5);
        assert_eq!(ids(&ranked), vec![3, 2]);
    }

    async fn create_with(
        repo: &SqliteRepository,
        slug: &str,
        profession: &str,
        country: &str,
        visibility: Visibility,
    ) -> Celebrity {
        repo.create_celebrity(&CelebrityInput {
            slug: slug.to_string(),
            full_name: slug.to_string(),
            profession: Some(profession.to_string()),
            country: Some(country.to_string()),
            visibility,
            ..Default::default()
        })
        .await
        .unwrap()
    }

    async fn create(repo: &SqliteRepository, slug: &str, profession: &str, country: &str) -> Celebrity {
        create_with(repo, slug, profession, country, Visibility::Published).await
    }

    #[tokio::test]
    async fn test_similar_celebrities_from_database() {
        let repo = SqliteRepository::new("sqlite::memory:").await.unwrap();
        let base = create(&repo, "base", "Singer", "Turkey").await;
        let peer = create(&repo, "peer", "Singer", "Turkey").await;
        let tagged = create(&repo, "tagged", "Chef", "Italy").await;
        create(&repo, "stranger", "Chef", "Italy").await;
        let draft = create_with(&repo, "draft", "Singer", "Turkey", Visibility::Draft).await;
        let deleted = create(&repo, "deleted", "Singer", "Turkey").await;
        repo.soft_delete_celebrity(deleted.id).await.unwrap();

        let tag = repo
            .create_tag(&TagInput {
                slug: "pop".to_string(),
                name_tr: "Pop".to_string(),
                name_en: "Pop".to_string(),
                category: "genre".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        repo.set_celebrity_tags(base.id, &[tag.id]).await.unwrap();
        repo.set_celebrity_tags(tagged.id, &[tag.id]).await.unwrap();
        repo.set_celebrity_tags(draft.id, &[tag.id]).await.unwrap();
        repo.set_celebrity_tags(deleted.id, &[tag.id]).await.unwrap();

        let candidates = repo
            .similar_candidates(&base, &[tag.id], CANDIDATE_LIMIT)
            .await
            .unwrap();
        assert_eq!(ids(&candidates), vec![peer.id, tagged.id]);

        let similar = similar_celebrities(&repo, base.id, 8).await.unwrap();
        assert_eq!(ids(&similar), vec![peer.id, tagged.id]);

        assert!(similar_celebrities(&repo, 9999, 8).await.unwrap().is_empty());
        assert!(similar_celebrities(&repo, base.id, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_candidates_are_capped() {
        let repo = SqliteRepository::new("sqlite::memory:").await.unwrap();
        let base = create(&repo, "base", "Singer", "Turkey").await;
        for i in 0..CANDIDATE_LIMIT + 10 {
            create(&repo, &format!("singer-{}", i), "Singer", "France").await;
        }

        let candidates = repo
            .similar_candidates(&base, &[], CANDIDATE_LIMIT)
            .await
            .unwrap();
        assert_eq!(candidates.len(), CANDIDATE_LIMIT as usize);

        let similar = similar_celebrities(&repo, base.id, 100).await.unwrap();
        assert_eq!(similar.len(), CANDIDATE_LIMIT as usize);
        assert!(similar.iter().all(|c| c.id != base.id));
    }
}
