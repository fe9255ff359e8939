use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::model::*;
use super::repo::*;
use crate::catalog::Locale;

const CELEBRITY_COLUMNS: &str = "c.id AS id, c.slug AS slug, c.first_name AS first_name, \
    c.last_name AS last_name, c.full_name AS full_name, c.nickname AS nickname, \
    c.birth_date AS birth_date, c.death_date AS death_date, c.birth_place AS birth_place, \
    c.country AS country, c.nationality AS nationality, c.profession AS profession, \
    c.active_years_start AS active_years_start, c.profile_image_url AS profile_image_url, \
    c.cover_image_url AS cover_image_url, c.is_featured AS is_featured, \
    c.is_verified AS is_verified, c.visibility AS visibility, \
    c.popularity_score AS popularity_score, c.total_views AS total_views, \
    c.total_searches AS total_searches, c.created_at AS created_at, \
    c.updated_at AS updated_at, c.deleted_at AS deleted_at";

const PUBLIC_CELEBRITY: &str = "c.visibility = 'published' AND c.deleted_at IS NULL";

const TAG_COLUMNS: &str = "t.id AS id, t.slug AS slug, t.name_tr AS name_tr, t.name_en AS name_en, \
    t.category AS category, t.icon AS icon, t.color AS color, t.created_at AS created_at";

const NEWS_COLUMNS: &str = "n.id AS id, n.slug AS slug, n.primary_celebrity_id AS primary_celebrity_id, \
    n.featured_image_url AS featured_image_url, n.category AS category, \
    n.visibility AS visibility, n.published_at AS published_at, \
    n.created_at AS created_at, n.deleted_at AS deleted_at";

const PUBLIC_NEWS: &str = "n.visibility = 'published' AND n.deleted_at IS NULL";

const USER_COLUMNS: &str =
    "id, email, full_name, password_hash, role, is_active, created_at, last_login_at";

/// Expired sessions are purged from the database and the cache this often.
const SESSION_PURGE_INTERVAL_SECS: u64 = 600;

pub struct SqliteRepository {
    pool: SqlitePool,
    session_cache: Arc<RwLock<HashMap<String, Session>>>,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to ":memory:" opens its own database.
        let pool = if db_path.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let repo = Self {
            pool,
            session_cache: Arc::new(RwLock::new(HashMap::new())),
        };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub fn start_background_tasks(self: Arc<Self>) {
        let repo_clone = Arc::clone(&self);
        tokio::spawn(async move {
            repo_clone.session_purge_loop().await;
        });
    }

    async fn session_purge_loop(&self) {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(SESSION_PURGE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match self.purge_expired_sessions(Utc::now()).await {
                Ok(0) => {}
                Ok(n) => debug!("Purged {} expired sessions", n),
                Err(e) => error!("Failed to purge expired sessions: {}", e),
            }
        }
    }
}

fn not_found(what: String) -> impl FnOnce(sqlx::Error) -> DbError {
    move |e| match e {
        sqlx::Error::RowNotFound => DbError::NotFound(what),
        _ => DbError::Sqlx(e),
    }
}

fn unique_violation(what: String) -> impl FnOnce(sqlx::Error) -> DbError {
    move |e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => DbError::AlreadyExists(what),
        _ => DbError::Sqlx(e),
    }
}

async fn insert_celebrity_row(conn: &mut SqliteConnection, input: &CelebrityInput) -> DbResult<i64> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO celebrities (slug, first_name, last_name, full_name, nickname,
            birth_date, death_date, birth_place, country, nationality, profession,
            active_years_start, profile_image_url, cover_image_url, is_featured,
            is_verified, visibility, popularity_score, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&input.slug)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.full_name)
    .bind(&input.nickname)
    .bind(input.birth_date)
    .bind(input.death_date)
    .bind(&input.birth_place)
    .bind(&input.country)
    .bind(&input.nationality)
    .bind(&input.profession)
    .bind(input.active_years_start)
    .bind(&input.profile_image_url)
    .bind(&input.cover_image_url)
    .bind(input.is_featured)
    .bind(input.is_verified)
    .bind(input.visibility)
    .bind(input.popularity_score)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(unique_violation(format!("Slug already in use: {}", input.slug)))?;
    Ok(result.last_insert_rowid())
}

async fn update_celebrity_row(
    conn: &mut SqliteConnection,
    id: i64,
    input: &CelebrityInput,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE celebrities SET slug = ?, first_name = ?, last_name = ?, full_name = ?,
            nickname = ?, birth_date = ?, death_date = ?, birth_place = ?, country = ?,
            nationality = ?, profession = ?, active_years_start = ?, profile_image_url = ?,
            cover_image_url = ?, is_featured = ?, is_verified = ?, visibility = ?,
            popularity_score = ?, updated_at = ?
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(&input.slug)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.full_name)
    .bind(&input.nickname)
    .bind(input.birth_date)
    .bind(input.death_date)
    .bind(&input.birth_place)
    .bind(&input.country)
    .bind(&input.nationality)
    .bind(&input.profession)
    .bind(input.active_years_start)
    .bind(&input.profile_image_url)
    .bind(&input.cover_image_url)
    .bind(input.is_featured)
    .bind(input.is_verified)
    .bind(input.visibility)
    .bind(input.popularity_score)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(unique_violation(format!("Slug already in use: {}", input.slug)))?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound(format!("Celebrity not found: {}", id)));
    }
    Ok(())
}

async fn upsert_translation_row(
    conn: &mut SqliteConnection,
    celebrity_id: i64,
    translation: &CelebrityTranslation,
) -> DbResult<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO celebrity_translations
            (celebrity_id, language_code, bio_short, bio_long, career_summary,
             personal_life, fun_facts, meta_title, meta_description)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(celebrity_id)
    .bind(&translation.language_code)
    .bind(&translation.bio_short)
    .bind(&translation.bio_long)
    .bind(&translation.career_summary)
    .bind(&translation.personal_life)
    .bind(&translation.fun_facts)
    .bind(&translation.meta_title)
    .bind(&translation.meta_description)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn clear_translation_row(
    conn: &mut SqliteConnection,
    celebrity_id: i64,
    language_code: &str,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE celebrity_translations SET bio_short = NULL, bio_long = NULL,
            career_summary = NULL, personal_life = NULL, fun_facts = NULL,
            meta_title = NULL, meta_description = NULL
         WHERE celebrity_id = ? AND language_code = ?",
    )
    .bind(celebrity_id)
    .bind(language_code)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn replace_celebrity_tags(
    conn: &mut SqliteConnection,
    celebrity_id: i64,
    tag_ids: &[i64],
) -> DbResult<()> {
    sqlx::query("DELETE FROM celebrity_tags WHERE celebrity_id = ?")
        .bind(celebrity_id)
        .execute(&mut *conn)
        .await?;
    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO celebrity_tags (celebrity_id, tag_id) VALUES (?, ?)")
            .bind(celebrity_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn replace_social_links(
    conn: &mut SqliteConnection,
    celebrity_id: i64,
    links: &[SocialLinkInput],
) -> DbResult<()> {
    sqlx::query("DELETE FROM social_links WHERE celebrity_id = ?")
        .bind(celebrity_id)
        .execute(&mut *conn)
        .await?;
    for link in links {
        sqlx::query(
            "INSERT INTO social_links
                (celebrity_id, platform, handle, url, followers_count, is_verified, sort_order)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(celebrity_id)
        .bind(&link.platform)
        .bind(&link.handle)
        .bind(&link.url)
        .bind(link.followers_count)
        .bind(link.is_verified)
        .bind(link.sort_order)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn write_celebrity_relations(
    conn: &mut SqliteConnection,
    celebrity_id: i64,
    record: &CelebrityRecord,
) -> DbResult<()> {
    for translation in &record.translations {
        if translation.is_empty() {
            clear_translation_row(conn, celebrity_id, &translation.language_code).await?;
        } else {
            upsert_translation_row(conn, celebrity_id, translation).await?;
        }
    }
    if let Some(tag_ids) = &record.tag_ids {
        replace_celebrity_tags(conn, celebrity_id, tag_ids).await?;
    }
    if let Some(links) = &record.social_links {
        replace_social_links(conn, celebrity_id, links).await?;
    }
    Ok(())
}


fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

#[async_trait]
impl UserRepo for SqliteRepository {
    async fn get_user(&self, id: i64) -> DbResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found(format!("User not found: {}", id)))
    }

    async fn get_user_by_email(&self, email: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(format!("User not found: {}", email)))
    }

    async fn list_users(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn count_users(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_user(&self, user: &NewUser) -> DbResult<User> {
        let result = sqlx::query(
            "INSERT INTO users (email, full_name, password_hash, role, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(unique_violation(format!("User already exists: {}", user.email)))?;

        self.get_user(result.last_insert_rowid()).await
    }

    async fn update_user(&self, id: i64, user: &UserUpdate) -> DbResult<User> {
        let result = sqlx::query(
            "UPDATE users SET email = ?, full_name = ?, password_hash = COALESCE(?, password_hash),
             role = ?, is_active = ? WHERE id = ?",
        )
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.is_active)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(unique_violation(format!("User already exists: {}", user.email)))?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("User not found: {}", id)));
        }

        // A deactivated user must not keep a cached session alive.
        if !user.is_active {
            self.session_cache.write().await.retain(|_, s| s.user_id != id);
        }

        self.get_user(id).await
    }

    async fn delete_user(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("User not found: {}", id)));
        }
        self.session_cache.write().await.retain(|_, s| s.user_id != id);
        Ok(())
    }

    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepo for SqliteRepository {
    async fn get_session(&self, token: &str) -> DbResult<Session> {
        {
            let cache = self.session_cache.read().await;
            if let Some(s) = cache.get(token) {
                return Ok(s.clone());
            }
        }

        let session = sqlx::query_as::<_, Session>(
            "SELECT token, user_id, created_at, expires_at, user_agent FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found("Session not found".to_string()))?;

        let mut cache = self.session_cache.write().await;
        cache.insert(session.token.clone(), session.clone());

        Ok(session)
    }

    async fn create_session(&self, session: &Session) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at, user_agent)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(&session.user_agent)
        .execute(&self.pool)
        .await?;

        let mut cache = self.session_cache.write().await;
        cache.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> DbResult<()> {
        self.session_cache.write().await.remove(token);
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> DbResult<u64> {
        self.session_cache
            .write()
            .await
            .retain(|_, s| !s.is_expired(now));
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CelebrityRepo for SqliteRepository {
    async fn get_celebrity(&self, id: i64) -> DbResult<Celebrity> {
        sqlx::query_as::<_, Celebrity>(&format!(
            "SELECT {CELEBRITY_COLUMNS} FROM celebrities c WHERE c.id = ? AND c.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(format!("Celebrity not found: {}", id)))
    }

    async fn get_celebrity_by_slug(&self, slug: &str) -> DbResult<Celebrity> {
        sqlx::query_as::<_, Celebrity>(&format!(
            "SELECT {CELEBRITY_COLUMNS} FROM celebrities c WHERE c.slug = ? AND c.deleted_at IS NULL"
        ))
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(format!("Celebrity not found: {}", slug)))
    }

    async fn get_translation(
        &self,
        celebrity_id: i64,
        locale: Locale,
    ) -> DbResult<Option<CelebrityTranslation>> {
        let translation = sqlx::query_as::<_, CelebrityTranslation>(
            "SELECT celebrity_id, language_code, bio_short, bio_long, career_summary,
                    personal_life, fun_facts, meta_title, meta_description
             FROM celebrity_translations WHERE celebrity_id = ? AND language_code = ?",
        )
        .bind(celebrity_id)
        .bind(locale.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(translation)
    }

    async fn list_social_links(&self, celebrity_id: i64) -> DbResult<Vec<SocialLink>> {
        let links = sqlx::query_as::<_, SocialLink>(
            "SELECT id, celebrity_id, platform, handle, url, followers_count, is_verified, sort_order
             FROM social_links WHERE celebrity_id = ? ORDER BY sort_order ASC, id ASC",
        )
        .bind(celebrity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    async fn list_celebrity_tags(&self, celebrity_id: i64) -> DbResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAG_COLUMNS} FROM tags t
             JOIN celebrity_tags ct ON ct.tag_id = t.id
             WHERE ct.celebrity_id = ? ORDER BY t.name_tr ASC"
        ))
        .bind(celebrity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    async fn list_tag_ids(&self, celebrity_id: i64) -> DbResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT tag_id FROM celebrity_tags WHERE celebrity_id = ? ORDER BY tag_id",
        )
        .bind(celebrity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn tag_ids_for(&self, celebrity_ids: &[i64]) -> DbResult<HashMap<i64, Vec<i64>>> {
        let mut map: HashMap<i64, Vec<i64>> = HashMap::new();
        if celebrity_ids.is_empty() {
            return Ok(map);
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT celebrity_id, tag_id FROM celebrity_tags WHERE celebrity_id IN (",
        );
        {
            let mut ids = qb.separated(", ");
            for id in celebrity_ids {
                ids.push_bind(*id);
            }
        }
        qb.push(")");

        let rows: Vec<(i64, i64)> = qb.build_query_as().fetch_all(&self.pool).await?;
        for (celebrity_id, tag_id) in rows {
            map.entry(celebrity_id).or_default().push(tag_id);
        }
        Ok(map)
    }

    async fn similar_candidates(
        &self,
        base: &Celebrity,
        tag_ids: &[i64],
        limit: i64,
    ) -> DbResult<Vec<Celebrity>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {CELEBRITY_COLUMNS} FROM celebrities c WHERE {PUBLIC_CELEBRITY} AND c.id <> "
        ));
        qb.push_bind(base.id);
        qb.push(" AND (0");
        if let Some(profession) = non_empty(&base.profession) {
            qb.push(" OR TRIM(c.profession) = ");
            qb.push_bind(profession.trim().to_string());
        }
        if let Some(country) = non_empty(&base.country) {
            qb.push(" OR TRIM(c.country) = ");
            qb.push_bind(country.trim().to_string());
        }
        if !tag_ids.is_empty() {
            qb.push(" OR c.id IN (SELECT celebrity_id FROM celebrity_tags WHERE tag_id IN (");
            {
                let mut ids = qb.separated(", ");
                for id in tag_ids {
                    ids.push_bind(*id);
                }
            }
            qb.push("))");
        }
        qb.push(") ORDER BY c.id ASC LIMIT ");
        qb.push_bind(limit);

        let candidates = qb
            .build_query_as::<Celebrity>()
            .fetch_all(&self.pool)
            .await?;
        Ok(candidates)
    }

    async fn list_published(
        &self,
        order: CelebrityOrder,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Celebrity>> {
        let celebrities = sqlx::query_as::<_, Celebrity>(&format!(
            "SELECT {CELEBRITY_COLUMNS} FROM celebrities c WHERE {PUBLIC_CELEBRITY}
             ORDER BY {} LIMIT ? OFFSET ?",
            order.sql()
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(celebrities)
    }

    async fn count_published(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM celebrities c WHERE {PUBLIC_CELEBRITY}"
        ))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn find_featured(&self) -> DbResult<Option<Celebrity>> {
        let featured = sqlx::query_as::<_, Celebrity>(&format!(
            "SELECT {CELEBRITY_COLUMNS} FROM celebrities c
             WHERE {PUBLIC_CELEBRITY} AND c.is_featured = 1
             ORDER BY c.popularity_score DESC, c.id ASC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(featured)
    }

    async fn born_on(&self, month: u32, day: u32, limit: i64) -> DbResult<Vec<Celebrity>> {
        let celebrities = sqlx::query_as::<_, Celebrity>(&format!(
            "SELECT {CELEBRITY_COLUMNS} FROM celebrities c
             WHERE {PUBLIC_CELEBRITY}
               AND CAST(strftime('%m', c.birth_date) AS INTEGER) = ?
               AND CAST(strftime('%d', c.birth_date) AS INTEGER) = ?
             ORDER BY c.popularity_score DESC, c.id ASC LIMIT ?"
        ))
        .bind(month as i64)
        .bind(day as i64)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(celebrities)
    }

    async fn born_in_month(&self, month: u32) -> DbResult<Vec<Celebrity>> {
        let celebrities = sqlx::query_as::<_, Celebrity>(&format!(
            "SELECT {CELEBRITY_COLUMNS} FROM celebrities c
             WHERE {PUBLIC_CELEBRITY}
               AND CAST(strftime('%m', c.birth_date) AS INTEGER) = ?
             ORDER BY strftime('%d', c.birth_date) ASC, c.popularity_score DESC, c.id ASC"
        ))
        .bind(month as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(celebrities)
    }

    async fn list_all(&self, limit: i64, offset: i64) -> DbResult<Vec<Celebrity>> {
        let celebrities = sqlx::query_as::<_, Celebrity>(&format!(
            "SELECT {CELEBRITY_COLUMNS} FROM celebrities c WHERE c.deleted_at IS NULL
             ORDER BY c.updated_at DESC, c.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(celebrities)
    }

    async fn count_all(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM celebrities WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn create_celebrity(&self, input: &CelebrityInput) -> DbResult<Celebrity> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_celebrity_row(&mut conn, input).await?;
        drop(conn);
        self.get_celebrity(id).await
    }

    async fn update_celebrity(&self, id: i64, input: &CelebrityInput) -> DbResult<Celebrity> {
        let mut conn = self.pool.acquire().await?;
        update_celebrity_row(&mut conn, id, input).await?;
        drop(conn);
        self.get_celebrity(id).await
    }

    async fn create_celebrity_record(&self, record: &CelebrityRecord) -> DbResult<Celebrity> {
        let mut tx = self.pool.begin().await?;
        let id = insert_celebrity_row(&mut tx, &record.input).await?;
        write_celebrity_relations(&mut tx, id, record).await?;
        tx.commit().await?;
        self.get_celebrity(id).await
    }

    async fn update_celebrity_record(&self, id: i64, record: &CelebrityRecord) -> DbResult<Celebrity> {
        let mut tx = self.pool.begin().await?;
        update_celebrity_row(&mut tx, id, &record.input).await?;
        write_celebrity_relations(&mut tx, id, record).await?;
        tx.commit().await?;
        self.get_celebrity(id).await
    }

    async fn upsert_translation(&self, translation: &CelebrityTranslation) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_translation_row(&mut conn, translation.celebrity_id, translation).await
    }

    async fn set_celebrity_tags(&self, celebrity_id: i64, tag_ids: &[i64]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        replace_celebrity_tags(&mut tx, celebrity_id, tag_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn set_social_links(&self, celebrity_id: i64, links: &[SocialLinkInput]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        replace_social_links(&mut tx, celebrity_id, links).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn soft_delete_celebrity(&self, id: i64) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE celebrities SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Celebrity not found: {}", id)));
        }
        Ok(())
    }

    async fn increment_views(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE celebrities SET total_views = total_views + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn increment_searches(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE celebrities SET total_searches = total_searches + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn published_tag_slugs(&self) -> DbResult<Vec<(i64, String)>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(&format!(
            "SELECT c.id, t.slug FROM celebrity_tags ct
             JOIN celebrities c ON c.id = ct.celebrity_id
             JOIN tags t ON t.id = ct.tag_id
             WHERE {PUBLIC_CELEBRITY}"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn published_short_bios(&self) -> DbResult<Vec<(i64, String)>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(&format!(
            "SELECT c.id, ctr.bio_short FROM celebrity_translations ctr
             JOIN celebrities c ON c.id = ctr.celebrity_id
             WHERE {PUBLIC_CELEBRITY} AND ctr.bio_short IS NOT NULL"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl TagRepo for SqliteRepository {
    async fn get_tag(&self, id: i64) -> DbResult<Tag> {
        sqlx::query_as::<_, Tag>(&format!("SELECT {TAG_COLUMNS} FROM tags t WHERE t.id = ?"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found(format!("Tag not found: {}", id)))
    }

    async fn get_tag_by_slug(&self, slug: &str) -> DbResult<Tag> {
        sqlx::query_as::<_, Tag>(&format!("SELECT {TAG_COLUMNS} FROM tags t WHERE t.slug = ?"))
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found(format!("Tag not found: {}", slug)))
    }

    async fn list_tags(&self) -> DbResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAG_COLUMNS} FROM tags t ORDER BY t.name_tr ASC, t.id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    async fn count_tags(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn popular_tags(&self, limit: i64) -> DbResult<Vec<TagWithCount>> {
        let tags = sqlx::query_as::<_, TagWithCount>(&format!(
            "SELECT {TAG_COLUMNS}, COUNT(c.id) AS celebrity_count
             FROM tags t
             LEFT JOIN celebrity_tags ct ON ct.tag_id = t.id
             LEFT JOIN celebrities c ON c.id = ct.celebrity_id AND {PUBLIC_CELEBRITY}
             GROUP BY t.id
             ORDER BY celebrity_count DESC, t.id ASC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    async fn create_tag(&self, input: &TagInput) -> DbResult<Tag> {
        let result = sqlx::query(
            "INSERT INTO tags (slug, name_tr, name_en, category, icon, color, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.slug)
        .bind(&input.name_tr)
        .bind(&input.name_en)
        .bind(&input.category)
        .bind(&input.icon)
        .bind(&input.color)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(unique_violation(format!("Slug already in use: {}", input.slug)))?;

        self.get_tag(result.last_insert_rowid()).await
    }

    async fn update_tag(&self, id: i64, input: &TagInput) -> DbResult<Tag> {
        let result = sqlx::query(
            "UPDATE tags SET slug = ?, name_tr = ?, name_en = ?, category = ?, icon = ?, color = ?
             WHERE id = ?",
        )
        .bind(&input.slug)
        .bind(&input.name_tr)
        .bind(&input.name_en)
        .bind(&input.category)
        .bind(&input.icon)
        .bind(&input.color)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(unique_violation(format!("Slug already in use: {}", input.slug)))?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Tag not found: {}", id)));
        }
        self.get_tag(id).await
    }

    async fn delete_tag(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Tag not found: {}", id)));
        }
        Ok(())
    }

    async fn celebrities_by_tag(
        &self,
        tag_id: i64,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Celebrity>> {
        let celebrities = sqlx::query_as::<_, Celebrity>(&format!(
            "SELECT {CELEBRITY_COLUMNS} FROM celebrities c
             JOIN celebrity_tags ct ON ct.celebrity_id = c.id
             WHERE ct.tag_id = ? AND {PUBLIC_CELEBRITY}
             ORDER BY c.popularity_score DESC, c.id ASC LIMIT ? OFFSET ?"
        ))
        .bind(tag_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(celebrities)
    }

    async fn count_celebrities_by_tag(&self, tag_id: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM celebrities c
             JOIN celebrity_tags ct ON ct.celebrity_id = c.id
             WHERE ct.tag_id = ? AND {PUBLIC_CELEBRITY}"
        ))
        .bind(tag_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

fn news_summary_select() -> String {
    format!(
        "SELECT {NEWS_COLUMNS}, nt.title AS title, nt.summary AS summary,
                pc.full_name AS primary_celebrity_name
         FROM news_items n
         LEFT JOIN news_translations nt ON nt.news_id = n.id AND nt.language_code = ?
         LEFT JOIN celebrities pc ON pc.id = n.primary_celebrity_id"
    )
}

#[async_trait]
impl NewsRepo for SqliteRepository {
    async fn get_news(&self, id: i64) -> DbResult<NewsItem> {
        sqlx::query_as::<_, NewsItem>(&format!(
            "SELECT {NEWS_COLUMNS} FROM news_items n WHERE n.id = ? AND n.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(format!("News not found: {}", id)))
    }

    async fn get_news_by_slug(&self, slug: &str) -> DbResult<NewsItem> {
        sqlx::query_as::<_, NewsItem>(&format!(
            "SELECT {NEWS_COLUMNS} FROM news_items n WHERE n.slug = ? AND n.deleted_at IS NULL"
        ))
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(format!("News not found: {}", slug)))
    }

    async fn get_news_translation(
        &self,
        news_id: i64,
        locale: Locale,
    ) -> DbResult<Option<NewsTranslation>> {
        let translation = sqlx::query_as::<_, NewsTranslation>(
            "SELECT news_id, language_code, title, summary, content
             FROM news_translations WHERE news_id = ? AND language_code = ?",
        )
        .bind(news_id)
        .bind(locale.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(translation)
    }

    async fn news_celebrities(&self, news_id: i64) -> DbResult<Vec<Celebrity>> {
        let celebrities = sqlx::query_as::<_, Celebrity>(&format!(
            "SELECT {CELEBRITY_COLUMNS} FROM celebrities c
             JOIN news_celebrities nc ON nc.celebrity_id = c.id
             WHERE nc.news_id = ? AND {PUBLIC_CELEBRITY}
             ORDER BY c.popularity_score DESC, c.id ASC"
        ))
        .bind(news_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(celebrities)
    }

    async fn related_news(
        &self,
        celebrity_id: i64,
        locale: Locale,
        limit: i64,
    ) -> DbResult<Vec<NewsSummary>> {
        let news = sqlx::query_as::<_, NewsSummary>(&format!(
            "{} WHERE {PUBLIC_NEWS}
               AND (n.primary_celebrity_id = ?
                    OR n.id IN (SELECT news_id FROM news_celebrities WHERE celebrity_id = ?))
             ORDER BY n.published_at DESC, n.id DESC LIMIT ?",
            news_summary_select()
        ))
        .bind(locale.as_str())
        .bind(celebrity_id)
        .bind(celebrity_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(news)
    }

    async fn list_news(
        &self,
        locale: Locale,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<NewsSummary>> {
        let news = sqlx::query_as::<_, NewsSummary>(&format!(
            "{} WHERE {PUBLIC_NEWS} AND (? IS NULL OR n.category = ?)
             ORDER BY n.published_at DESC, n.id DESC LIMIT ? OFFSET ?",
            news_summary_select()
        ))
        .bind(locale.as_str())
        .bind(category)
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(news)
    }

    async fn count_news(&self, category: Option<&str>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM news_items n WHERE {PUBLIC_NEWS} AND (? IS NULL OR n.category = ?)"
        ))
        .bind(category)
        .bind(category)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn recent_news(&self, locale: Locale, limit: i64, offset: i64) -> DbResult<Vec<NewsSummary>> {
        let news = sqlx::query_as::<_, NewsSummary>(&format!(
            "{} WHERE n.deleted_at IS NULL ORDER BY n.created_at DESC, n.id DESC LIMIT ? OFFSET ?",
            news_summary_select()
        ))
        .bind(locale.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(news)
    }

    async fn count_all_news(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_items WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_news(
        &self,
        input: &NewsInput,
        translations: &[NewsTranslation],
        celebrity_ids: &[i64],
    ) -> DbResult<NewsItem> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO news_items (slug, primary_celebrity_id, featured_image_url, category,
                visibility, published_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.slug)
        .bind(input.primary_celebrity_id)
        .bind(&input.featured_image_url)
        .bind(&input.category)
        .bind(input.visibility)
        .bind(input.published_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(unique_violation(format!("Slug already in use: {}", input.slug)))?;
        let news_id = result.last_insert_rowid();

        for t in translations {
            sqlx::query(
                "INSERT INTO news_translations (news_id, language_code, title, summary, content)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(news_id)
            .bind(&t.language_code)
            .bind(&t.title)
            .bind(&t.summary)
            .bind(&t.content)
            .execute(&mut *tx)
            .await?;
        }

        for celebrity_id in celebrity_ids {
            sqlx::query("INSERT OR IGNORE INTO news_celebrities (news_id, celebrity_id) VALUES (?, ?)")
                .bind(news_id)
                .bind(celebrity_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.get_news(news_id).await
    }

    async fn soft_delete_news(&self, id: i64) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE news_items SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("News not found: {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl AnalyticsRepo for SqliteRepository {
    async fn insert_search_log(&self, log: &NewSearchLog) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO search_logs (query, normalized_query, results_count, matched_celebrity_id,
                clicked_position, user_ip_hash, user_agent, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&log.query)
        .bind(&log.normalized_query)
        .bind(log.results_count)
        .bind(log.matched_celebrity_id)
        .bind(log.clicked_position)
        .bind(&log.user_ip_hash)
        .bind(&log.user_agent)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_view_log(&self, log: &NewViewLog) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO view_logs (celebrity_id, page_type, referrer, user_ip_hash, user_agent,
                session_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(log.celebrity_id)
        .bind(&log.page_type)
        .bind(&log.referrer)
        .bind(&log.user_ip_hash)
        .bind(&log.user_agent)
        .bind(&log.session_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn top_search_queries(&self, since: DateTime<Utc>, limit: i64) -> DbResult<Vec<QueryCount>> {
        let rows = sqlx::query_as::<_, QueryCount>(
            "SELECT normalized_query AS query, COUNT(*) AS count FROM search_logs
             WHERE created_at >= ? AND normalized_query <> ''
             GROUP BY normalized_query
             ORDER BY count DESC, query ASC LIMIT ?",
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn activity_since(&self, since: DateTime<Utc>) -> DbResult<Vec<ActivityCount>> {
        let rows = sqlx::query_as::<_, ActivityCount>(&format!(
            "SELECT c.id AS celebrity_id, c.popularity_score AS popularity_score,
                (SELECT COUNT(*) FROM view_logs v
                  WHERE v.celebrity_id = c.id AND v.created_at >= ?) AS view_count,
                (SELECT COUNT(*) FROM search_logs s
                  WHERE s.matched_celebrity_id = c.id AND s.created_at >= ?) AS search_count
             FROM celebrities c WHERE {PUBLIC_CELEBRITY} ORDER BY c.id ASC"
        ))
        .bind(since)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn replace_popularity_stats(
        &self,
        period: StatPeriod,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rows: &[NewPopularityStat],
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM popularity_stats WHERE period_type = ?")
            .bind(period.as_str())
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO popularity_stats (celebrity_id, period_type, period_start, period_end,
                    view_count, search_count, popularity_score, rank_position)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(row.celebrity_id)
            .bind(period.as_str())
            .bind(start)
            .bind(end)
            .bind(row.view_count)
            .bind(row.search_count)
            .bind(row.popularity_score)
            .bind(row.rank_position)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_popularity_stats(&self, period: StatPeriod) -> DbResult<Vec<PopularityStat>> {
        let rows = sqlx::query_as::<_, PopularityStat>(
            "SELECT id, celebrity_id, period_type, period_start, period_end, view_count,
                    search_count, popularity_score, rank_position
             FROM popularity_stats WHERE period_type = ? ORDER BY rank_position ASC, celebrity_id ASC",
        )
        .bind(period.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn popular_in_period(
        &self,
        period: StatPeriod,
        order: CelebrityOrder,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<PopularEntry>> {
        let order_by = match order {
            CelebrityOrder::Views | CelebrityOrder::Trending => "ps.view_count DESC, c.id ASC",
            CelebrityOrder::Searches => "ps.search_count DESC, c.id ASC",
            CelebrityOrder::Newest => "c.created_at DESC, c.id DESC",
            CelebrityOrder::Popularity => "ps.popularity_score DESC, c.id ASC",
        };
        let rows = sqlx::query_as::<_, PopularEntry>(&format!(
            "SELECT {CELEBRITY_COLUMNS}, ps.view_count AS period_views,
                    ps.search_count AS period_searches, ps.rank_position AS rank_position
             FROM popularity_stats ps JOIN celebrities c ON c.id = ps.celebrity_id
             WHERE ps.period_type = ? AND {PUBLIC_CELEBRITY}
             ORDER BY {order_by} LIMIT ? OFFSET ?"
        ))
        .bind(period.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_popular_in_period(&self, period: StatPeriod) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM popularity_stats ps JOIN celebrities c ON c.id = ps.celebrity_id
             WHERE ps.period_type = ? AND {PUBLIC_CELEBRITY}"
        ))
        .bind(period.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn catalog_counts(&self) -> DbResult<CatalogCounts> {
        let (total_celebrities, published_celebrities, total_views, total_searches): (
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN visibility = 'published' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(total_views), 0),
                    COALESCE(SUM(total_searches), 0)
             FROM celebrities WHERE deleted_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CatalogCounts {
            total_celebrities,
            published_celebrities,
            total_news: self.count_all_news().await?,
            total_tags: self.count_tags().await?,
            total_users: self.count_users().await?,
            total_views,
            total_searches,
        })
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    async fn repo() -> SqliteRepository {
        SqliteRepository::new("sqlite::memory:").await.unwrap()
    }

    fn celebrity(slug: &str, profession: &str, country: &str) -> CelebrityInput {
        CelebrityInput {
            slug: slug.to_string(),
            full_name: slug.replace('-', " "),
            profession: Some(profession.to_string()),
            country: Some(country.to_string()),
            visibility: Visibility::Published,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_celebrity() {
        let repo = repo().await;
        let mut input = celebrity("tarkan", "Singer", "Turkey");
        input.birth_date = NaiveDate::from_ymd_opt(1972, 10, 17);
        let created = repo.create_celebrity(&input).await.unwrap();

        let fetched = repo.get_celebrity_by_slug("tarkan").await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.birth_date, NaiveDate::from_ymd_opt(1972, 10, 17));
        assert_eq!(fetched.visibility, Visibility::Published);

        let dup = repo.create_celebrity(&input).await;
        assert!(matches!(dup, Err(DbError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_soft_deleted_celebrity_is_not_found() {
        let repo = repo().await;
        let c = repo
            .create_celebrity(&celebrity("gone", "Actor", "Turkey"))
            .await
            .unwrap();
        repo.soft_delete_celebrity(c.id).await.unwrap();

        assert!(matches!(
            repo.get_celebrity(c.id).await,
            Err(DbError::NotFound(_))
        ));
        assert_eq!(repo.count_published().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_similar_candidates_filters() {
        let repo = repo().await;
        let base = repo
            .create_celebrity(&celebrity("base", "Singer", "Turkey"))
            .await
            .unwrap();
        let same_job = repo
            .create_celebrity(&celebrity("same-job", "Singer", "France"))
            .await
            .unwrap();
        let same_country = repo
            .create_celebrity(&celebrity("same-country", "Actor", "Turkey"))
            .await
            .unwrap();
        repo.create_celebrity(&celebrity("unrelated", "Chef", "Italy"))
            .await
            .unwrap();
        let mut draft = celebrity("draft", "Singer", "Turkey");
        draft.visibility = Visibility::Draft;
        repo.create_celebrity(&draft).await.unwrap();

        let candidates = repo.similar_candidates(&base, &[], 50).await.unwrap();
        let ids: Vec<i64> = candidates.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![same_job.id, same_country.id]);
    }

    #[tokio::test]
    async fn test_tags_and_tag_ids_for() {
        let repo = repo().await;
        let a = repo
            .create_celebrity(&celebrity("a", "Singer", "Turkey"))
            .await
            .unwrap();
        let pop = repo
            .create_tag(&TagInput {
                slug: "pop".to_string(),
                name_tr: "Pop".to_string(),
                name_en: "Pop".to_string(),
                category: "genre".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        repo.set_celebrity_tags(a.id, &[pop.id]).await.unwrap();

        let map = repo.tag_ids_for(&[a.id]).await.unwrap();
        assert_eq!(map.get(&a.id), Some(&vec![pop.id]));
        assert_eq!(repo.count_celebrities_by_tag(pop.id).await.unwrap(), 1);

        let popular = repo.popular_tags(10).await.unwrap();
        assert_eq!(popular[0].celebrity_count, 1);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let repo = repo().await;
        let user = repo
            .create_user(&NewUser {
                email: "admin@example.org".to_string(),
                full_name: None,
                password_hash: "x".to_string(),
                role: Role::Admin,
                is_active: true,
            })
            .await
            .unwrap();

        let now = Utc::now();
        let session = Session {
            token: "tok".to_string(),
            user_id: user.id,
            created_at: now,
            expires_at: now - chrono::Duration::seconds(1),
            user_agent: None,
        };
        repo.create_session(&session).await.unwrap();
        assert_eq!(repo.get_session("tok").await.unwrap().user_id, user.id);

        assert_eq!(repo.purge_expired_sessions(now).await.unwrap(), 1);
        assert!(matches!(
            repo.get_session("tok").await,
            Err(DbError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_celebrity_record_is_written_atomically() {
        let repo = repo().await;
        let translation = |code: &str, bio: Option<&str>| CelebrityTranslation {
            language_code: code.to_string(),
            bio_short: bio.map(str::to_string),
            ..Default::default()
        };

        let broken = CelebrityRecord {
            input: celebrity("ghost", "Singer", "Turkey"),
            translations: vec![translation("tr", Some("Hayalet"))],
            tag_ids: Some(vec![9999]),
            social_links: None,
        };
        assert!(repo.create_celebrity_record(&broken).await.is_err());
        assert!(matches!(
            repo.get_celebrity_by_slug("ghost").await,
            Err(DbError::NotFound(_))
        ));
        assert_eq!(repo.count_all().await.unwrap(), 0);

        let record = CelebrityRecord {
            input: celebrity("singer", "Singer", "Turkey"),
            translations: vec![translation("tr", Some("Şarkıcı")), translation("en", None)],
            tag_ids: Some(vec![]),
            social_links: Some(vec![SocialLinkInput {
                platform: "instagram".to_string(),
                handle: Some("singer".to_string()),
                ..Default::default()
            }]),
        };
        let created = repo.create_celebrity_record(&record).await.unwrap();
        let tr = repo.get_translation(created.id, Locale::Tr).await.unwrap().unwrap();
        assert_eq!(tr.bio_short.as_deref(), Some("Şarkıcı"));
        assert!(repo.get_translation(created.id, Locale::En).await.unwrap().is_none());
        assert_eq!(repo.list_social_links(created.id).await.unwrap().len(), 1);

        let mut failed_update = record.clone();
        failed_update.input.profession = Some("Actor".to_string());
        failed_update.translations = vec![translation("tr", None)];
        failed_update.tag_ids = Some(vec![9999]);
        assert!(repo
            .update_celebrity_record(created.id, &failed_update)
            .await
            .is_err());
        let unchanged = repo.get_celebrity(created.id).await.unwrap();
        assert_eq!(unchanged.profession.as_deref(), Some("Singer"));
        let tr = repo.get_translation(created.id, Locale::Tr).await.unwrap().unwrap();
        assert_eq!(tr.bio_short.as_deref(), Some("Şarkıcı"));

        let mut cleared = record.clone();
        cleared.translations = vec![translation("tr", None)];
        cleared.social_links = None;
        repo.update_celebrity_record(created.id, &cleared).await.unwrap();
        let tr = repo.get_translation(created.id, Locale::Tr).await.unwrap().unwrap();
        assert!(tr.is_empty());
        assert_eq!(repo.list_social_links(created.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_email_is_unique_ignoring_case() {
        let repo = repo().await;
        let new_user = |email: &str| NewUser {
            email: email.to_string(),
            full_name: None,
            password_hash: "x".to_string(),
            role: Role::Editor,
            is_active: true,
        };
        let first = repo.create_user(&new_user("admin@example.org")).await.unwrap();

        assert!(matches!(
            repo.create_user(&new_user("Admin@Example.org")).await,
            Err(DbError::AlreadyExists(_))
        ));
        assert_eq!(
            repo.get_user_by_email("ADMIN@example.org").await.unwrap().id,
            first.id
        );
    }

    #[tokio::test]
    async fn test_born_on() {
        let repo = repo().await;
        let mut input = celebrity("birthday", "Actor", "Turkey");
        input.birth_date = NaiveDate::from_ymd_opt(1980, 3, 9);
        repo.create_celebrity(&input).await.unwrap();

        assert_eq!(repo.born_on(3, 9, 10).await.unwrap().len(), 1);
        assert!(repo.born_on(3, 10, 10).await.unwrap().is_empty());
        assert_eq!(repo.born_in_month(3).await.unwrap().len(), 1);
    }
}
