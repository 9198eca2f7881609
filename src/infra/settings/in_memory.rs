// In-memory implementation of SettingsStore.
//
// Used by the service tests so they don't need a database. It follows the
// same contract as the SQLite store: whole rows in, whole rows out.

use crate::core::settings::{GuildConfig, SettingsStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;

pub struct InMemorySettingsStore {
    /// Maps guild_id -> config
    configs: DashMap<u64, GuildConfig>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self {
            configs: DashMap::new(),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get_config(&self, guild_id: u64) -> Result<Option<GuildConfig>, StoreError> {
        Ok(self.configs.get(&guild_id).map(|entry| entry.clone()))
    }

    async fn save_config(&self, config: GuildConfig) -> Result<(), StoreError> {
        self.configs.insert(config.guild_id, config);
        Ok(())
    }

    async fn delete_config(&self, guild_id: u64) -> Result<bool, StoreError> {
        Ok(self.configs.remove(&guild_id).is_some())
    }

    async fn get_all_configs(&self) -> Result<Vec<GuildConfig>, StoreError> {
        Ok(self
            .configs
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}

impl Default for InMemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemorySettingsStore::new();
        assert!(store.get_config(7).await.unwrap().is_none());

        let mut config = GuildConfig::new(7);
        config.tracked_world = Some("Antica".to_string());
        store.save_config(config.clone()).await.unwrap();
        assert_eq!(store.get_config(7).await.unwrap(), Some(config));

        assert!(store.delete_config(7).await.unwrap());
        assert!(!store.delete_config(7).await.unwrap());
        assert!(store.get_all_configs().await.unwrap().is_empty());
    }
}
