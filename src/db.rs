use chrono::{DateTime, Utc};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::config;
use crate::models::{NewPaste, Paste};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const PASTE_COLUMNS: &str = "id, identifier, title, content, created_at, is_encrypted, \
                             password_hash, expires_at, origin_ip";

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Connect to a database by URL and bring its schema up to date.
    pub async fn connect(config: &config::Database) -> anyhow::Result<Self> {
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        let database = Self { pool };
        database.migrate().await?;
        Ok(database)
    }

    pub async fn migrate(&self) -> crate::AppResult<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    /// Get all pastes that have not expired as of `now`, newest first.
    pub async fn get_live_pastes(&mut self, now: DateTime<Utc>) -> crate::AppResult<Vec<Paste>> {
        let mut conn = self.pool.acquire().await?;
        let pastes = sqlx::query_as::<_, Paste>(&format!(
            "SELECT {PASTE_COLUMNS} FROM paste WHERE expires_at IS NULL OR expires_at > ? ORDER \
             BY id DESC"
        ))
        .bind(now)
        .fetch_all(&mut conn)
        .await?;
        Ok(pastes)
    }

    /// Get a paste by identifier, treating an expired paste as absent.
    pub async fn get_live_paste(
        &mut self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> crate::AppResult<Paste> {
        let mut conn = self.pool.acquire().await?;
        let paste = sqlx::query_as::<_, Paste>(&format!(
            "SELECT {PASTE_COLUMNS} FROM paste WHERE identifier = ? AND (expires_at IS NULL OR \
             expires_at > ?)"
        ))
        .bind(identifier)
        .bind(now)
        .fetch_one(&mut conn)
        .await?;
        Ok(paste)
    }

    /// Insert a paste.
    pub async fn insert_paste(&mut self, paste: &NewPaste) -> crate::AppResult<Paste> {
        let mut conn = self.pool.acquire().await?;
        let paste = sqlx::query_as::<_, Paste>(&format!(
            "INSERT INTO paste (identifier, title, content, created_at, is_encrypted, \
             password_hash, expires_at, origin_ip) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING \
             {PASTE_COLUMNS}"
        ))
        .bind(&paste.identifier)
        .bind(&paste.title)
        .bind(&paste.content)
        .bind(paste.created_at)
        .bind(paste.is_encrypted())
        .bind(&paste.password_hash)
        .bind(paste.expires_at)
        .bind(&paste.origin_ip)
        .fetch_one(&mut conn)
        .await?;
        Ok(paste)
    }

    /// Delete every paste whose expiry is at or before `now` in one transaction.
    ///
    /// Returns the identifiers of the deleted pastes.
    pub async fn delete_expired(&mut self, now: DateTime<Utc>) -> crate::AppResult<Vec<String>> {
        let mut tx = self.pool.begin().await?;

        let expired = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, identifier FROM paste WHERE expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(now)
        .fetch_all(&mut tx)
        .await?;

        for (id, _) in &expired {
            sqlx::query("DELETE FROM paste WHERE id = ?")
                .bind(id)
                .execute(&mut tx)
                .await?;
        }

        tx.commit().await?;

        Ok(expired.into_iter().map(|(_, identifier)| identifier).collect())
    }
}
