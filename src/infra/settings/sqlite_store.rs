use crate::core::settings::{GuildConfig, SettingsStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

pub struct SqliteSettingsStore {
    pool: Pool<Sqlite>,
}

impl SqliteSettingsStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_settings (
                guild_id INTEGER PRIMARY KEY,
                ask_channel_id INTEGER,
                commands_only BOOLEAN,
                events_channel_id INTEGER,
                levels_channel_id INTEGER,
                news_channel_id INTEGER,
                prefixes TEXT,
                welcome_message TEXT,
                welcome_channel_id INTEGER,
                tracked_world TEXT,
                updated_at TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn channel(row: &SqliteRow, column: &str) -> Option<u64> {
    row.get::<Option<i64>, _>(column).map(|id| id as u64)
}

fn row_to_config(row: &SqliteRow) -> Result<GuildConfig, StoreError> {
    // Prefixes are kept as a JSON array; NULL means "use the defaults"
    let prefixes = match row.get::<Option<String>, _>("prefixes") {
        Some(json) => Some(serde_json::from_str::<Vec<String>>(&json)?),
        None => None,
    };

    Ok(GuildConfig {
        guild_id: row.get::<i64, _>("guild_id") as u64,
        ask_channel_id: channel(row, "ask_channel_id"),
        commands_only: row.get("commands_only"),
        events_channel_id: channel(row, "events_channel_id"),
        levels_channel_id: channel(row, "levels_channel_id"),
        news_channel_id: channel(row, "news_channel_id"),
        prefixes,
        welcome_message: row.get("welcome_message"),
        welcome_channel_id: channel(row, "welcome_channel_id"),
        tracked_world: row.get("tracked_world"),
        updated_at: row.get::<Option<DateTime<Utc>>, _>("updated_at"),
    })
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get_config(&self, guild_id: u64) -> Result<Option<GuildConfig>, StoreError> {
        let row = sqlx::query("SELECT * FROM guild_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(row_to_config).transpose()
    }

    async fn save_config(&self, config: GuildConfig) -> Result<(), StoreError> {
        let prefixes = config
            .prefixes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO guild_settings (
                guild_id, ask_channel_id, commands_only, events_channel_id,
                levels_channel_id, news_channel_id, prefixes, welcome_message,
                welcome_channel_id, tracked_world, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                ask_channel_id = excluded.ask_channel_id,
                commands_only = excluded.commands_only,
                events_channel_id = excluded.events_channel_id,
                levels_channel_id = excluded.levels_channel_id,
                news_channel_id = excluded.news_channel_id,
                prefixes = excluded.prefixes,
                welcome_message = excluded.welcome_message,
                welcome_channel_id = excluded.welcome_channel_id,
                tracked_world = excluded.tracked_world,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(config.guild_id as i64)
        .bind(config.ask_channel_id.map(|id| id as i64))
        .bind(config.commands_only)
        .bind(config.events_channel_id.map(|id| id as i64))
        .bind(config.levels_channel_id.map(|id| id as i64))
        .bind(config.news_channel_id.map(|id| id as i64))
        .bind(prefixes)
        .bind(config.welcome_message)
        .bind(config.welcome_channel_id.map(|id| id as i64))
        .bind(config.tracked_world)
        .bind(config.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn delete_config(&self, guild_id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM guild_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_all_configs(&self) -> Result<Vec<GuildConfig>, StoreError> {
        let rows = sqlx::query("SELECT * FROM guild_settings")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(row_to_config).collect()
    }
}
