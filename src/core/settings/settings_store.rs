use super::settings_errors::StoreError;
use super::settings_models::GuildConfig;
use async_trait::async_trait;

/// Persistence port for guild configuration.
///
/// Implementations only store and load whole rows. Validation and write
/// serialization live in `SettingsService`.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns `None` for guilds that never wrote a setting.
    async fn get_config(&self, guild_id: u64) -> Result<Option<GuildConfig>, StoreError>;

    /// Insert or replace the row for `config.guild_id`.
    async fn save_config(&self, config: GuildConfig) -> Result<(), StoreError>;

    /// Returns whether a row existed.
    async fn delete_config(&self, guild_id: u64) -> Result<bool, StoreError>;

    async fn get_all_configs(&self) -> Result<Vec<GuildConfig>, StoreError>;
}
