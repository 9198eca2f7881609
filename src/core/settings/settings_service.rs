// The guild settings service - all the rules for reading and writing
// per-guild configuration live here.
//
// Like the other core services it has no Discord imports. Callers describe the
// guild with a `GuildSnapshot` and get back plain ids and strings.

use super::channel_resolution::{
    ensure_assignable, parse_channel, resolve_strict, resolve_with_fallback,
};
use super::prefixes::{normalize_prefix, validate_prefixes, MAX_PREFIXES};
use super::settings_errors::{PermissionError, SettingsError, ValidationError};
use super::settings_models::{
    ChannelInfo, GuildConfig, GuildSnapshot, PrefixChange, SettingKey, SettingValue,
    SettingsDefaults, WelcomeDelivery, WelcomeMember,
};
use super::settings_store::SettingsStore;
use super::welcome_template::{WelcomeTemplate, MAX_RENDERED_LEN};
use super::worlds::WorldCatalog;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Words that unset a channel, the welcome message or the world.
const CLEAR_WORDS: [&str; 5] = ["none", "clear", "delete", "remove", "reset"];

pub struct SettingsService<S: SettingsStore> {
    store: S,
    defaults: SettingsDefaults,
    worlds: WorldCatalog,
    /// One async mutex per guild. Held across read-modify-write so two
    /// commands in the same guild can't overwrite each other.
    write_locks: DashMap<u64, Arc<Mutex<()>>>,
}

impl<S: SettingsStore> SettingsService<S> {
    pub fn new(store: S, defaults: SettingsDefaults, worlds: WorldCatalog) -> Self {
        Self {
            store,
            defaults,
            worlds,
            write_locks: DashMap::new(),
        }
    }

    pub fn defaults(&self) -> &SettingsDefaults {
        &self.defaults
    }

    /// Stored configuration, or a default-valued one if the guild never wrote
    /// anything. Nothing is persisted by reading.
    pub async fn config(&self, guild_id: u64) -> Result<GuildConfig, SettingsError> {
        Ok(self
            .store
            .get_config(guild_id)
            .await?
            .unwrap_or_else(|| GuildConfig::new(guild_id)))
    }

    /// Effective value of `key`: the configured value or its default.
    pub async fn get(
        &self,
        guild: &GuildSnapshot,
        key: SettingKey,
    ) -> Result<SettingValue, SettingsError> {
        let config = self.config(guild.guild_id).await?;
        Ok(self.effective(&config, guild, key))
    }

    /// Validate `value` and store it. Returns the normalized stored value.
    pub async fn set(
        &self,
        guild: &GuildSnapshot,
        key: SettingKey,
        value: SettingValue,
    ) -> Result<SettingValue, SettingsError> {
        let validated = self.validate(guild, key, value)?;

        let stored = validated.clone();
        self.update(guild.guild_id, |config| {
            // Checked under the lock, against the config being written
            if key == SettingKey::CommandsOnly && stored == SettingValue::Toggle(true) {
                if let Some(reason) = self.commands_only_blocker(config, guild) {
                    return Err(reason.into());
                }
            }
            apply(config, key, stored);
            Ok(())
        })
        .await?;

        tracing::info!(
            guild_id = guild.guild_id,
            setting = %key,
            value = ?validated,
            "Setting updated"
        );
        Ok(validated)
    }

    /// Parse raw command input for `key`, then `set` it.
    pub async fn set_from_input(
        &self,
        guild: &GuildSnapshot,
        key: SettingKey,
        raw: &str,
    ) -> Result<SettingValue, SettingsError> {
        let value = self.parse_input(guild, key, raw)?;
        self.set(guild, key, value).await
    }

    /// Add `raw` as a prefix, or remove it if the guild already has it.
    pub async fn toggle_prefix(
        &self,
        guild_id: u64,
        raw: &str,
    ) -> Result<PrefixChange, SettingsError> {
        let prefix = normalize_prefix(raw)?;
        let defaults = self.defaults.prefixes.clone();

        let change = self
            .update(guild_id, |config| {
                let mut prefixes = config.prefixes.clone().unwrap_or(defaults);

                let change = if let Some(index) = prefixes.iter().position(|p| *p == prefix) {
                    if prefixes.len() == 1 {
                        return Err(ValidationError::LastPrefix.into());
                    }
                    prefixes.remove(index);
                    PrefixChange::Removed {
                        prefix: prefix.clone(),
                        prefixes: prefixes.clone(),
                    }
                } else {
                    if prefixes.len() >= MAX_PREFIXES {
                        return Err(ValidationError::TooManyPrefixes { max: MAX_PREFIXES }.into());
                    }
                    prefixes.push(prefix.clone());
                    PrefixChange::Added {
                        prefix: prefix.clone(),
                        prefixes: prefixes.clone(),
                    }
                };

                config.prefixes = Some(prefixes);
                Ok(change)
            })
            .await?;

        tracing::info!(guild_id, ?change, "Prefixes updated");
        Ok(change)
    }

    /// Prefixes for `guild_id`, falling back to the defaults.
    pub async fn prefixes(&self, guild_id: u64) -> Result<Vec<String>, SettingsError> {
        Ok(self
            .config(guild_id)
            .await?
            .prefixes
            .unwrap_or_else(|| self.defaults.prefixes.clone()))
    }

    /// The ask channel currently in effect.
    ///
    /// A configured channel that no longer exists falls back to the channel
    /// named after the default ask channel name.
    pub async fn ask_channel<'a>(
        &self,
        guild: &'a GuildSnapshot,
    ) -> Result<Option<&'a ChannelInfo>, SettingsError> {
        let config = self.config(guild.guild_id).await?;
        Ok(self.ask_channel_for(&config, guild))
    }

    pub async fn is_ask_channel(
        &self,
        guild: &GuildSnapshot,
        channel_id: u64,
    ) -> Result<bool, SettingsError> {
        Ok(self
            .ask_channel(guild)
            .await?
            .map(|c| c.id == channel_id)
            .unwrap_or(false))
    }

    /// Resolve a channel-typed setting at use time.
    ///
    /// Events, levels and welcome channels fall back to the first channel the
    /// bot can post in. The news channel has no fallback.
    pub async fn resolve_channel<'a>(
        &self,
        guild: &'a GuildSnapshot,
        key: SettingKey,
    ) -> Result<Option<&'a ChannelInfo>, SettingsError> {
        if !key.is_channel() {
            return Err(ValidationError::WrongType {
                key,
                expected: key.expected_type(),
            }
            .into());
        }
        let config = self.config(guild.guild_id).await?;
        Ok(self.channel_for(&config, guild, key))
    }

    /// Whether non-command messages in `channel_id` should be deleted.
    ///
    /// True only in the ask channel, with commands-only on, and while the bot
    /// can still manage messages there.
    pub async fn commands_only_enforced(
        &self,
        guild: &GuildSnapshot,
        channel_id: u64,
    ) -> Result<bool, SettingsError> {
        if !self.is_ask_channel(guild, channel_id).await? {
            return Ok(false);
        }

        let config = self.config(guild.guild_id).await?;
        if !config.commands_only.unwrap_or(self.defaults.commands_only) {
            return Ok(false);
        }

        if let Some(reason) = self.commands_only_blocker(&config, guild) {
            tracing::warn!(
                guild_id = guild.guild_id,
                channel_id,
                %reason,
                "Commands-only is on but can't be enforced"
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Why commands-only can't be on in this guild right now, if anything.
    pub async fn commands_only_unavailable(
        &self,
        guild: &GuildSnapshot,
    ) -> Result<Option<PermissionError>, SettingsError> {
        let config = self.config(guild.guild_id).await?;
        Ok(self.commands_only_blocker(&config, guild))
    }

    /// The welcome message for `member`, if one is configured and there's a
    /// channel to post it in.
    pub async fn welcome_delivery(
        &self,
        guild: &GuildSnapshot,
        member: &WelcomeMember,
    ) -> Result<Option<WelcomeDelivery>, SettingsError> {
        let config = self.config(guild.guild_id).await?;

        let Some(message) = config.welcome_message.as_deref() else {
            return Ok(None);
        };
        let Some(channel) = self.channel_for(&config, guild, SettingKey::WelcomeChannel) else {
            tracing::debug!(
                guild_id = guild.guild_id,
                "Welcome message set but no channel to post it in"
            );
            return Ok(None);
        };

        let template = WelcomeTemplate::parse(message)?;
        let mut content = template.render(guild, member);
        // Templates saved before the expansion check can still overflow
        if content.chars().count() > MAX_RENDERED_LEN {
            tracing::warn!(
                guild_id = guild.guild_id,
                "Rendered welcome message too long, truncating"
            );
            content = content.chars().take(MAX_RENDERED_LEN).collect();
        }
        Ok(Some(WelcomeDelivery {
            channel_id: channel.id,
            content,
        }))
    }

    /// Forget everything about a guild. Called when the bot leaves it.
    ///
    /// The guild's write lock is kept: another task may still hold it.
    pub async fn remove_guild(&self, guild_id: u64) -> Result<bool, SettingsError> {
        let lock = self.lock_for(guild_id);
        let removed = {
            let _guard = lock.lock().await;
            self.store.delete_config(guild_id).await?
        };

        if removed {
            tracing::info!(guild_id, "Removed guild settings");
        }
        Ok(removed)
    }

    /// Number of guilds with stored settings.
    pub async fn configured_guilds(&self) -> Result<usize, SettingsError> {
        Ok(self.store.get_all_configs().await?.len())
    }

    // ------------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------------

    fn lock_for(&self, guild_id: u64) -> Arc<Mutex<()>> {
        self.write_locks.entry(guild_id).or_default().clone()
    }

    /// Read-modify-write under the guild's lock. The config is only saved if
    /// `f` succeeds.
    async fn update<F, T>(&self, guild_id: u64, f: F) -> Result<T, SettingsError>
    where
        F: FnOnce(&mut GuildConfig) -> Result<T, SettingsError>,
    {
        let lock = self.lock_for(guild_id);
        let _guard = lock.lock().await;

        let mut config = self
            .store
            .get_config(guild_id)
            .await?
            .unwrap_or_else(|| GuildConfig::new(guild_id));
        let output = f(&mut config)?;
        config.updated_at = Some(Utc::now());
        self.store.save_config(config).await?;
        Ok(output)
    }

    fn ask_channel_for<'a>(
        &self,
        config: &GuildConfig,
        guild: &'a GuildSnapshot,
    ) -> Option<&'a ChannelInfo> {
        config
            .ask_channel_id
            .and_then(|id| guild.channel(id))
            .or_else(|| {
                guild.channels.iter().find(|c| {
                    c.kind.is_text() && c.name.eq_ignore_ascii_case(&self.defaults.ask_channel_name)
                })
            })
    }

    fn channel_for<'a>(
        &self,
        config: &GuildConfig,
        guild: &'a GuildSnapshot,
        key: SettingKey,
    ) -> Option<&'a ChannelInfo> {
        match key {
            SettingKey::AskChannel => self.ask_channel_for(config, guild),
            SettingKey::NewsChannel => resolve_strict(guild, config.news_channel_id),
            SettingKey::WelcomeChannel if config.welcome_message.is_none() => None,
            other if other.uses_fallback() => {
                resolve_with_fallback(guild, config.channel_id(other))
            }
            _ => None,
        }
    }

    fn effective(&self, config: &GuildConfig, guild: &GuildSnapshot, key: SettingKey) -> SettingValue {
        match key {
            SettingKey::CommandsOnly => SettingValue::Toggle(
                config.commands_only.unwrap_or(self.defaults.commands_only)
                    && self.commands_only_blocker(config, guild).is_none(),
            ),
            SettingKey::Prefix => SettingValue::Prefixes(
                config
                    .prefixes
                    .clone()
                    .unwrap_or_else(|| self.defaults.prefixes.clone()),
            ),
            SettingKey::Welcome => SettingValue::Text(config.welcome_message.clone()),
            SettingKey::World => SettingValue::World(config.tracked_world.clone()),
            channel_key => {
                SettingValue::Channel(self.channel_for(config, guild, channel_key).map(|c| c.id))
            }
        }
    }

    fn validate(
        &self,
        guild: &GuildSnapshot,
        key: SettingKey,
        value: SettingValue,
    ) -> Result<SettingValue, ValidationError> {
        let mismatch = || ValidationError::WrongType {
            key,
            expected: key.expected_type(),
        };

        match (key, value) {
            (k, SettingValue::Channel(None)) if k.is_channel() => Ok(SettingValue::Channel(None)),
            (k, SettingValue::Channel(Some(id))) if k.is_channel() => {
                let channel = guild
                    .channel(id)
                    .ok_or(ValidationError::ForeignChannel(id))?;
                ensure_assignable(channel)?;
                Ok(SettingValue::Channel(Some(id)))
            }
            (SettingKey::CommandsOnly, SettingValue::Toggle(on)) => Ok(SettingValue::Toggle(on)),
            (SettingKey::Prefix, SettingValue::Prefixes(list)) => {
                Ok(SettingValue::Prefixes(validate_prefixes(&list)?))
            }
            (SettingKey::Welcome, SettingValue::Text(None)) => Ok(SettingValue::Text(None)),
            (SettingKey::Welcome, SettingValue::Text(Some(text))) => {
                let text = text.trim().to_string();
                WelcomeTemplate::parse(&text)?.check_fits()?;
                Ok(SettingValue::Text(Some(text)))
            }
            (SettingKey::World, SettingValue::World(world)) => {
                if self.defaults.lite_guilds.contains(&guild.guild_id) {
                    return Err(ValidationError::LiteMode);
                }
                match world {
                    None => Ok(SettingValue::World(None)),
                    Some(raw) => Ok(SettingValue::World(Some(self.worlds.validate(&raw)?))),
                }
            }
            _ => Err(mismatch()),
        }
    }

    fn parse_input(
        &self,
        guild: &GuildSnapshot,
        key: SettingKey,
        raw: &str,
    ) -> Result<SettingValue, ValidationError> {
        let raw = raw.trim();
        let clears = CLEAR_WORDS.iter().any(|w| raw.eq_ignore_ascii_case(w));

        match key {
            k if k.is_channel() => {
                if clears {
                    return Ok(SettingValue::Channel(None));
                }
                Ok(SettingValue::Channel(Some(parse_channel(guild, raw)?.id)))
            }
            SettingKey::CommandsOnly => parse_toggle(raw).map(SettingValue::Toggle),
            SettingKey::Prefix => Ok(SettingValue::Prefixes(
                raw.split_whitespace().map(str::to_string).collect(),
            )),
            SettingKey::Welcome if clears => Ok(SettingValue::Text(None)),
            SettingKey::Welcome => Ok(SettingValue::Text(Some(raw.to_string()))),
            SettingKey::World if clears => Ok(SettingValue::World(None)),
            SettingKey::World => Ok(SettingValue::World(Some(raw.to_string()))),
            _ => Err(ValidationError::WrongType {
                key,
                expected: key.expected_type(),
            }),
        }
    }

    fn commands_only_blocker(
        &self,
        config: &GuildConfig,
        guild: &GuildSnapshot,
    ) -> Option<PermissionError> {
        match self.ask_channel_for(config, guild) {
            None => Some(PermissionError::NoAskChannel),
            Some(ask) if !ask.bot_permissions.manage_messages => {
                Some(PermissionError::ManageMessages { channel_id: ask.id })
            }
            Some(_) => None,
        }
    }
}

fn apply(config: &mut GuildConfig, key: SettingKey, value: SettingValue) {
    match (key, value) {
        (SettingKey::AskChannel, SettingValue::Channel(id)) => config.ask_channel_id = id,
        (SettingKey::EventsChannel, SettingValue::Channel(id)) => config.events_channel_id = id,
        (SettingKey::LevelsChannel, SettingValue::Channel(id)) => config.levels_channel_id = id,
        (SettingKey::NewsChannel, SettingValue::Channel(id)) => config.news_channel_id = id,
        (SettingKey::WelcomeChannel, SettingValue::Channel(id)) => config.welcome_channel_id = id,
        (SettingKey::CommandsOnly, SettingValue::Toggle(on)) => config.commands_only = Some(on),
        (SettingKey::Prefix, SettingValue::Prefixes(list)) => config.prefixes = Some(list),
        (SettingKey::Welcome, SettingValue::Text(text)) => config.welcome_message = text,
        (SettingKey::World, SettingValue::World(world)) => config.tracked_world = world,
        _ => {}
    }
}

fn parse_toggle(raw: &str) -> Result<bool, ValidationError> {
    match raw.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "on" | "enable" | "1" => Ok(true),
        "no" | "n" | "false" | "off" | "disable" | "0" => Ok(false),
        _ => Err(ValidationError::InvalidToggle(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::channel_resolution::tests::{snapshot, text_channel};
    use crate::infra::settings::InMemorySettingsStore;

    fn service() -> SettingsService<InMemorySettingsStore> {
        SettingsService::new(
            InMemorySettingsStore::new(),
            SettingsDefaults::default(),
            WorldCatalog::default(),
        )
    }

    fn guild() -> GuildSnapshot {
        let mut ask = text_channel(100, "ask-nabbot", 2, None);
        ask.bot_permissions.manage_messages = true;
        snapshot(vec![
            text_channel(101, "rules", 0, None),
            text_channel(102, "general", 1, None),
            ask,
            text_channel(103, "events", 0, Some(0)),
            text_channel(104, "level-ups", 1, Some(0)),
        ])
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_sixth_prefix_is_rejected() {
        let service = service();
        let guild = guild();

        service
            .set(
                &guild,
                SettingKey::Prefix,
                SettingValue::Prefixes(strings(&["!", "?", "n/", "."])),
            )
            .await
            .unwrap();
        service.toggle_prefix(guild.guild_id, ";").await.unwrap();

        let err = service.toggle_prefix(guild.guild_id, "$").await.unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Validation(ValidationError::TooManyPrefixes { max: 5 })
        ));

        let prefixes = service.prefixes(guild.guild_id).await.unwrap();
        assert_eq!(prefixes, strings(&["!", "?", "n/", ".", ";"]));
    }

    #[tokio::test]
    async fn test_toggle_prefix_adds_and_removes() {
        let service = service();

        let added = service.toggle_prefix(1, "n/").await.unwrap();
        assert_eq!(
            added,
            PrefixChange::Added {
                prefix: "n/".to_string(),
                prefixes: strings(&["!", "n/"]),
            }
        );

        let removed = service.toggle_prefix(1, "!").await.unwrap();
        assert_eq!(
            removed,
            PrefixChange::Removed {
                prefix: "!".to_string(),
                prefixes: strings(&["n/"]),
            }
        );

        let err = service.toggle_prefix(1, "n/").await.unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Validation(ValidationError::LastPrefix)
        ));
        assert_eq!(service.prefixes(1).await.unwrap(), strings(&["n/"]));
    }

    #[tokio::test]
    async fn test_removed_events_channel_falls_back() {
        let service = service();
        let mut guild = guild();

        service
            .set_from_input(&guild, SettingKey::EventsChannel, "#events")
            .await
            .unwrap();
        assert_eq!(
            service
                .get(&guild, SettingKey::EventsChannel)
                .await
                .unwrap(),
            SettingValue::Channel(Some(103))
        );

        // Channel deleted: the next postable channel in sidebar order wins
        guild.channels.retain(|c| c.id != 103);
        assert_eq!(
            service
                .get(&guild, SettingKey::EventsChannel)
                .await
                .unwrap(),
            SettingValue::Channel(Some(101))
        );

        // The stored value is untouched
        let config = service.config(guild.guild_id).await.unwrap();
        assert_eq!(config.events_channel_id, Some(103));
    }

    #[tokio::test]
    async fn test_levels_channel_without_send_permission_falls_back() {
        let service = service();
        let mut guild = guild();

        service
            .set_from_input(&guild, SettingKey::LevelsChannel, "<#104>")
            .await
            .unwrap();

        for channel in guild.channels.iter_mut() {
            if channel.id == 104 || channel.id == 101 {
                channel.bot_permissions.send = false;
            }
        }

        let resolved = service
            .resolve_channel(&guild, SettingKey::LevelsChannel)
            .await
            .unwrap();
        assert_eq!(resolved.map(|c| c.id), Some(102));
    }

    #[tokio::test]
    async fn test_news_channel_has_no_fallback() {
        let service = service();
        let mut guild = guild();

        assert_eq!(
            service.get(&guild, SettingKey::NewsChannel).await.unwrap(),
            SettingValue::Channel(None)
        );

        service
            .set_from_input(&guild, SettingKey::NewsChannel, "general")
            .await
            .unwrap();
        guild.channels.retain(|c| c.id != 102);

        assert_eq!(
            service.get(&guild, SettingKey::NewsChannel).await.unwrap(),
            SettingValue::Channel(None)
        );
    }

    #[tokio::test]
    async fn test_disabling_welcome_disables_welcome_channel() {
        let service = service();
        let guild = guild();
        let member = WelcomeMember {
            user_id: 30,
            name: "Kharsek".to_string(),
        };

        service
            .set_from_input(&guild, SettingKey::WelcomeChannel, "general")
            .await
            .unwrap();
        assert_eq!(
            service.welcome_delivery(&guild, &member).await.unwrap(),
            None
        );

        service
            .set_from_input(&guild, SettingKey::Welcome, "Welcome {user.mention} to {server}!")
            .await
            .unwrap();
        assert_eq!(
            service.welcome_delivery(&guild, &member).await.unwrap(),
            Some(WelcomeDelivery {
                channel_id: 102,
                content: "Welcome <@30> to Tibia Friends!".to_string(),
            })
        );

        service
            .set_from_input(&guild, SettingKey::Welcome, "none")
            .await
            .unwrap();
        assert_eq!(
            service.welcome_delivery(&guild, &member).await.unwrap(),
            None
        );
        assert_eq!(
            service
                .get(&guild, SettingKey::WelcomeChannel)
                .await
                .unwrap(),
            SettingValue::Channel(None)
        );
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let service = service();
        let guild = guild();

        let cases = vec![
            (SettingKey::AskChannel, SettingValue::Channel(Some(102))),
            (SettingKey::CommandsOnly, SettingValue::Toggle(false)),
            (SettingKey::EventsChannel, SettingValue::Channel(Some(103))),
            (SettingKey::LevelsChannel, SettingValue::Channel(Some(104))),
            (SettingKey::NewsChannel, SettingValue::Channel(Some(101))),
            (
                SettingKey::Prefix,
                SettingValue::Prefixes(strings(&["n/", "!"])),
            ),
            (
                SettingKey::Welcome,
                SettingValue::Text(Some("Hi {user}".to_string())),
            ),
            (SettingKey::WelcomeChannel, SettingValue::Channel(Some(102))),
            (SettingKey::World, SettingValue::World(Some("Secura".to_string()))),
        ];

        for (key, value) in cases {
            let stored = service.set(&guild, key, value.clone()).await.unwrap();
            assert_eq!(stored, value);
            assert_eq!(service.get(&guild, key).await.unwrap(), value, "{key}");
        }
    }

    #[tokio::test]
    async fn test_set_normalizes_values() {
        let service = service();
        let guild = guild();

        let world = service
            .set_from_input(&guild, SettingKey::World, "  sECURA")
            .await
            .unwrap();
        assert_eq!(world, SettingValue::World(Some("Secura".to_string())));

        let toggle = service
            .set_from_input(&guild, SettingKey::CommandsOnly, "NO")
            .await
            .unwrap();
        assert_eq!(toggle, SettingValue::Toggle(false));
    }

    #[tokio::test]
    async fn test_validation_errors_leave_setting_unchanged() {
        let service = service();
        let guild = guild();

        service
            .set_from_input(&guild, SettingKey::World, "Antica")
            .await
            .unwrap();

        let err = service
            .set_from_input(&guild, SettingKey::World, "Narnia")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Validation(ValidationError::UnknownWorld(_))
        ));

        let err = service
            .set(&guild, SettingKey::AskChannel, SettingValue::Channel(Some(999)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Validation(ValidationError::ForeignChannel(999))
        ));

        let err = service
            .set(&guild, SettingKey::World, SettingValue::Toggle(true))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Validation(ValidationError::WrongType { .. })
        ));

        let err = service
            .set_from_input(&guild, SettingKey::Welcome, "Hi {member}")
            .await
            .unwrap_err();
        assert!(err.user_message().is_some());

        let config = service.config(guild.guild_id).await.unwrap();
        assert_eq!(config.tracked_world.as_deref(), Some("Antica"));
        assert_eq!(config.ask_channel_id, None);
        assert_eq!(config.welcome_message, None);
    }

    #[tokio::test]
    async fn test_lite_guilds_cannot_track_worlds() {
        let defaults = SettingsDefaults {
            lite_guilds: vec![1],
            ..SettingsDefaults::default()
        };
        let service = SettingsService::new(
            InMemorySettingsStore::new(),
            defaults,
            WorldCatalog::default(),
        );

        let err = service
            .set_from_input(&guild(), SettingKey::World, "Antica")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Validation(ValidationError::LiteMode)
        ));
    }

    #[tokio::test]
    async fn test_commands_only_requires_manage_messages() {
        let service = service();
        let mut guild = guild();

        // Ask channel found by name, bot can manage messages there
        service
            .set_from_input(&guild, SettingKey::CommandsOnly, "yes")
            .await
            .unwrap();
        assert!(service.commands_only_enforced(&guild, 100).await.unwrap());
        assert!(!service.commands_only_enforced(&guild, 102).await.unwrap());

        // Point the ask channel somewhere the bot can't manage messages
        service
            .set_from_input(&guild, SettingKey::AskChannel, "general")
            .await
            .unwrap();
        assert!(!service.commands_only_enforced(&guild, 102).await.unwrap());

        service
            .set_from_input(&guild, SettingKey::CommandsOnly, "no")
            .await
            .unwrap();
        let err = service
            .set_from_input(&guild, SettingKey::CommandsOnly, "yes")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Permission(PermissionError::ManageMessages { channel_id: 102 })
        ));
        assert_eq!(
            service
                .get(&guild, SettingKey::CommandsOnly)
                .await
                .unwrap(),
            SettingValue::Toggle(false)
        );

        // Once the permission is granted it can be enabled
        for channel in guild.channels.iter_mut().filter(|c| c.id == 102) {
            channel.bot_permissions.manage_messages = true;
        }
        service
            .set_from_input(&guild, SettingKey::CommandsOnly, "yes")
            .await
            .unwrap();
        assert!(service.commands_only_enforced(&guild, 102).await.unwrap());
    }

    #[tokio::test]
    async fn test_commands_only_reads_off_when_it_cannot_be_enforced() {
        let service = service();
        let mut guild = guild();

        // Default is on, and the bot can manage messages in #ask-nabbot
        assert_eq!(
            service.get(&guild, SettingKey::CommandsOnly).await.unwrap(),
            SettingValue::Toggle(true)
        );
        assert_eq!(service.commands_only_unavailable(&guild).await.unwrap(), None);

        for channel in guild.channels.iter_mut().filter(|c| c.id == 100) {
            channel.bot_permissions.manage_messages = false;
        }
        assert_eq!(
            service.get(&guild, SettingKey::CommandsOnly).await.unwrap(),
            SettingValue::Toggle(false)
        );
        assert_eq!(
            service.commands_only_unavailable(&guild).await.unwrap(),
            Some(PermissionError::ManageMessages { channel_id: 100 })
        );

        guild.channels.retain(|c| c.id != 100);
        assert_eq!(
            service.get(&guild, SettingKey::CommandsOnly).await.unwrap(),
            SettingValue::Toggle(false)
        );
        let err = service
            .set_from_input(&guild, SettingKey::CommandsOnly, "yes")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Permission(PermissionError::NoAskChannel)
        ));
        assert_eq!(
            service.commands_only_unavailable(&guild).await.unwrap(),
            Some(PermissionError::NoAskChannel)
        );
    }

    #[tokio::test]
    async fn test_welcome_delivery_fits_in_one_message() {
        let service = service();
        let mut guild = guild();
        guild.name = "N".repeat(100);
        let member = WelcomeMember {
            user_id: 30,
            name: "Kharsek".to_string(),
        };

        let err = service
            .set_from_input(&guild, SettingKey::Welcome, &"{server}".repeat(150))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Validation(ValidationError::WelcomeExpandsTooLong { max: 2000 })
        ));

        // A row written before the expansion check existed
        let mut legacy = GuildConfig::new(guild.guild_id);
        legacy.welcome_message = Some("{server}".repeat(150));
        service.store.save_config(legacy).await.unwrap();

        let delivery = service
            .welcome_delivery(&guild, &member)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivery.content.chars().count(), MAX_RENDERED_LEN);
    }

    #[tokio::test]
    async fn test_remove_guild_keeps_write_lock() {
        let service = service();
        let guild = guild();

        service
            .set_from_input(&guild, SettingKey::World, "Antica")
            .await
            .unwrap();
        let before = service.lock_for(guild.guild_id);

        service.remove_guild(guild.guild_id).await.unwrap();

        // A writer arriving now must queue behind whoever holds `before`
        let after = service.lock_for(guild.guild_id);
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_ask_channel_falls_back_to_default_name() {
        let service = service();
        let mut guild = guild();

        service
            .set_from_input(&guild, SettingKey::AskChannel, "<#102>")
            .await
            .unwrap();
        assert!(service.is_ask_channel(&guild, 102).await.unwrap());

        guild.channels.retain(|c| c.id != 102);
        assert!(service.is_ask_channel(&guild, 100).await.unwrap());

        guild.channels.retain(|c| c.id != 100);
        assert_eq!(service.ask_channel(&guild).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reading_does_not_create_config() {
        let service = service();
        let guild = guild();

        service.get(&guild, SettingKey::Prefix).await.unwrap();
        assert_eq!(service.configured_guilds().await.unwrap(), 0);

        service
            .set_from_input(&guild, SettingKey::World, "Antica")
            .await
            .unwrap();
        assert_eq!(service.configured_guilds().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_guild_deletes_config() {
        let service = service();
        let guild = guild();

        service
            .set_from_input(&guild, SettingKey::World, "Antica")
            .await
            .unwrap();
        assert!(service.remove_guild(guild.guild_id).await.unwrap());
        assert!(!service.remove_guild(guild.guild_id).await.unwrap());

        assert_eq!(
            service.get(&guild, SettingKey::World).await.unwrap(),
            SettingValue::World(None)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_do_not_lose_updates() {
        let service = Arc::new(service());

        let mut handles = Vec::new();
        for prefix in ["?", "n/", ".", ";"] {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service.toggle_prefix(1, prefix).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut prefixes = service.prefixes(1).await.unwrap();
        prefixes.sort();
        assert_eq!(prefixes, strings(&["!", ".", ";", "?", "n/"]));
    }
}
