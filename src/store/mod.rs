pub mod worker;

use crate::app::time::now_millis;
use crate::game::constants::SPAWN_LENGTH;
use crate::game::types::ScoreboardEntry;
use anyhow::Context;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PlayerRecord {
    pub uuid: String,
    pub name: String,
    pub color: String,
    pub max_length: i64,
}

impl PlayerRecord {
    /// In-memory stand-in used when the database cannot be reached.
    pub fn detached(uuid: &str, name: &str, color: &str) -> Self {
        Self {
            uuid: uuid.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            max_length: SPAWN_LENGTH as i64,
        }
    }
}

impl From<PlayerRecord> for ScoreboardEntry {
    fn from(record: PlayerRecord) -> Self {
        ScoreboardEntry {
            name: record.name,
            max_length_ever_reached: record.max_length.max(0) as usize,
        }
    }
}

/// Durable player identities keyed by uuid.
#[derive(Debug, Clone)]
pub struct PlayerStore {
    pool: SqlitePool,
}

impl PlayerStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        ensure_db_dir(database_url)?;
        let max_connections = if is_memory_url(database_url) {
            1
        } else {
            max_connections.max(1)
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| format!("failed to open database {database_url}"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        Ok(Self { pool })
    }

    pub async fn get(&self, uuid: &str) -> anyhow::Result<Option<PlayerRecord>> {
        sqlx::query_as::<_, PlayerRecord>(
            "SELECT uuid, name, color, max_length FROM players WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load player")
    }

    pub async fn create(&self, uuid: &str, name: &str, color: &str) -> anyhow::Result<()> {
        let now = now_millis();
        sqlx::query(
            "INSERT INTO players (uuid, name, color, max_length, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(uuid) DO NOTHING",
        )
        .bind(uuid)
        .bind(name)
        .bind(color)
        .bind(SPAWN_LENGTH as i64)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("failed to create player")?;
        Ok(())
    }

    /// Returns the stored record, creating it from the given values first
    /// when the identity is unknown.
    pub async fn load_or_create(
        &self,
        uuid: &str,
        name: &str,
        color: &str,
    ) -> anyhow::Result<PlayerRecord> {
        if let Some(record) = self.get(uuid).await? {
            return Ok(record);
        }
        self.create(uuid, name, color).await?;
        self.get(uuid)
            .await?
            .with_context(|| format!("player {uuid} missing after insert"))
    }

    pub async fn update_name(&self, uuid: &str, name: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE players SET name = ?, updated_at = ? WHERE uuid = ?")
            .bind(name)
            .bind(now_millis())
            .bind(uuid)
            .execute(&self.pool)
            .await
            .context("failed to update player name")?;
        Ok(())
    }

    pub async fn update_color(&self, uuid: &str, color: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE players SET color = ?, updated_at = ? WHERE uuid = ?")
            .bind(color)
            .bind(now_millis())
            .bind(uuid)
            .execute(&self.pool)
            .await
            .context("failed to update player color")?;
        Ok(())
    }

    /// Keeps the larger of the stored and candidate lengths.
    pub async fn update_max_length(&self, uuid: &str, candidate: i64) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE players SET max_length = MAX(max_length, ?), updated_at = ? WHERE uuid = ?",
        )
        .bind(candidate)
        .bind(now_millis())
        .bind(uuid)
        .execute(&self.pool)
        .await
        .context("failed to update player max length")?;
        Ok(())
    }

    pub async fn top_n(&self, limit: usize) -> anyhow::Result<Vec<PlayerRecord>> {
        sqlx::query_as::<_, PlayerRecord>(
            "SELECT uuid, name, color, max_length FROM players \
             ORDER BY max_length DESC, name ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("failed to load scoreboard")
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_db_dir(database_url: &str) -> anyhow::Result<()> {
    if is_memory_url(database_url) {
        return Ok(());
    }
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"));
    let Some(path) = path else { return Ok(()) };
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }
    let db_path = PathBuf::from(path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    if !db_path.exists() {
        std::fs::File::create(&db_path)
            .with_context(|| format!("failed to create {}", db_path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> PlayerStore {
        PlayerStore::connect("sqlite::memory:", 5)
            .await
            .expect("in-memory store")
    }

    #[tokio::test]
    async fn load_or_create_inserts_once() {
        let store = memory_store().await;
        assert_eq!(store.get("u1").await.expect("get"), None);

        let created = store
            .load_or_create("u1", "Ada", "#aa0000")
            .await
            .expect("create");
        assert_eq!(created, PlayerRecord::detached("u1", "Ada", "#aa0000"));

        let again = store
            .load_or_create("u1", "Someone Else", "#00bb00")
            .await
            .expect("load");
        assert_eq!(again.name, "Ada");
        assert_eq!(again.color, "#aa0000");
    }

    #[tokio::test]
    async fn max_length_never_decreases() {
        let store = memory_store().await;
        store.create("u1", "Ada", "#aa0000").await.expect("create");

        store.update_max_length("u1", 7).await.expect("update");
        store.update_max_length("u1", 4).await.expect("update");

        let record = store.get("u1").await.expect("get").expect("record");
        assert_eq!(record.max_length, 7);
    }

    #[tokio::test]
    async fn name_and_color_updates_persist() {
        let store = memory_store().await;
        store.create("u1", "Ada", "#aa0000").await.expect("create");
        store.update_name("u1", "Grace").await.expect("name");
        store.update_color("u1", "#123abc").await.expect("color");
        store.update_name("missing", "Nobody").await.expect("no-op");

        let record = store.get("u1").await.expect("get").expect("record");
        assert_eq!(record.name, "Grace");
        assert_eq!(record.color, "#123abc");
    }

    #[tokio::test]
    async fn top_n_orders_by_length() {
        let store = memory_store().await;
        for (uuid, name, len) in [("u1", "Ada", 5), ("u2", "Bob", 12), ("u3", "Cy", 8)] {
            store.create(uuid, name, "#000000").await.expect("create");
            store.update_max_length(uuid, len).await.expect("update");
        }

        let top = store.top_n(2).await.expect("top");
        let names: Vec<&str> = top.iter().map(|record| record.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Cy"]);
    }

    #[test]
    fn memory_urls_skip_directory_creation() {
        assert!(ensure_db_dir("sqlite::memory:").is_ok());
        assert!(ensure_db_dir("postgres://nowhere").is_ok());
    }
}
