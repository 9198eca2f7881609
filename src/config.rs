// Process configuration, read from the environment (and `.env` via dotenv).

use crate::core::settings::{SettingsDefaults, WorldCatalog};
use anyhow::{Context as _, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub data_dir: PathBuf,
    pub default_prefixes: Vec<String>,
    pub ask_channel_name: String,
    /// Default for `settings commandsonly`.
    pub ask_channel_delete: bool,
    pub lite_servers: Vec<u64>,
    /// Overrides the built-in world list when set.
    pub tibia_worlds: Option<Vec<String>>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        let token = env::var("DISCORD_TOKEN").context(
            "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
        )?;

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let default_prefixes = env::var("DEFAULT_PREFIXES")
            .map(|v| split_list(&v))
            .ok()
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| vec!["!".to_string()]);

        let ask_channel_name =
            env::var("ASK_CHANNEL_NAME").unwrap_or_else(|_| "ask-nabbot".to_string());

        let ask_channel_delete = match env::var("ASK_CHANNEL_DELETE") {
            Ok(v) => v
                .parse::<bool>()
                .with_context(|| format!("ASK_CHANNEL_DELETE must be true or false, got {v:?}"))?,
            Err(_) => true,
        };

        let lite_servers = match env::var("LITE_SERVERS") {
            Ok(v) => split_list(&v)
                .iter()
                .map(|id| {
                    id.parse::<u64>()
                        .with_context(|| format!("Invalid guild id in LITE_SERVERS: {id}"))
                })
                .collect::<Result<Vec<_>>>()?,
            Err(_) => Vec::new(),
        };

        let tibia_worlds = env::var("TIBIA_WORLDS")
            .ok()
            .map(|v| split_list(&v))
            .filter(|list| !list.is_empty());

        Ok(Self {
            token,
            data_dir,
            default_prefixes,
            ask_channel_name,
            ask_channel_delete,
            lite_servers,
            tibia_worlds,
        })
    }

    pub fn settings_db_path(&self) -> PathBuf {
        self.data_dir.join("settings.db")
    }

    pub fn settings_defaults(&self) -> SettingsDefaults {
        SettingsDefaults {
            prefixes: self.default_prefixes.clone(),
            ask_channel_name: self.ask_channel_name.clone(),
            commands_only: self.ask_channel_delete,
            lite_guilds: self.lite_servers.clone(),
        }
    }

    pub fn world_catalog(&self) -> WorldCatalog {
        match &self.tibia_worlds {
            Some(worlds) => WorldCatalog::new(worlds),
            None => WorldCatalog::default(),
        }
    }
}

/// Comma separated list, blanks dropped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
