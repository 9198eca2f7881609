// Settings domain models.
//
// These are pure domain types with no Discord dependencies. The Discord layer
// builds a `GuildSnapshot` from its cache and hands it to the core, so every
// rule about channels and permissions can be tested without a gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored configuration for one guild.
///
/// `None` always means "not configured": the service substitutes the
/// documented default when the value is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildConfig {
    pub guild_id: u64,
    pub ask_channel_id: Option<u64>,
    pub commands_only: Option<bool>,
    pub events_channel_id: Option<u64>,
    pub levels_channel_id: Option<u64>,
    pub news_channel_id: Option<u64>,
    pub prefixes: Option<Vec<String>>,
    pub welcome_message: Option<String>,
    pub welcome_channel_id: Option<u64>,
    pub tracked_world: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl GuildConfig {
    /// A default-valued config, used the first time a guild is written to.
    pub fn new(guild_id: u64) -> Self {
        Self {
            guild_id,
            ask_channel_id: None,
            commands_only: None,
            events_channel_id: None,
            levels_channel_id: None,
            news_channel_id: None,
            prefixes: None,
            welcome_message: None,
            welcome_channel_id: None,
            tracked_world: None,
            updated_at: None,
        }
    }

    /// Raw channel id stored for a channel-typed key.
    pub fn channel_id(&self, key: SettingKey) -> Option<u64> {
        match key {
            SettingKey::AskChannel => self.ask_channel_id,
            SettingKey::EventsChannel => self.events_channel_id,
            SettingKey::LevelsChannel => self.levels_channel_id,
            SettingKey::NewsChannel => self.news_channel_id,
            SettingKey::WelcomeChannel => self.welcome_channel_id,
            _ => None,
        }
    }

    /// Whether `key` holds an explicitly configured value.
    pub fn is_configured(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::CommandsOnly => self.commands_only.is_some(),
            SettingKey::Prefix => self.prefixes.is_some(),
            SettingKey::Welcome => self.welcome_message.is_some(),
            SettingKey::World => self.tracked_world.is_some(),
            channel_key => self.channel_id(channel_key).is_some(),
        }
    }
}

/// Every setting exposed through the `settings` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    AskChannel,
    CommandsOnly,
    EventsChannel,
    LevelsChannel,
    NewsChannel,
    Prefix,
    Welcome,
    WelcomeChannel,
    World,
}

impl SettingKey {
    pub const ALL: [SettingKey; 9] = [
        SettingKey::AskChannel,
        SettingKey::CommandsOnly,
        SettingKey::EventsChannel,
        SettingKey::LevelsChannel,
        SettingKey::NewsChannel,
        SettingKey::Prefix,
        SettingKey::Welcome,
        SettingKey::WelcomeChannel,
        SettingKey::World,
    ];

    /// The subcommand name users type.
    pub fn command_name(&self) -> &'static str {
        match self {
            SettingKey::AskChannel => "askchannel",
            SettingKey::CommandsOnly => "commandsonly",
            SettingKey::EventsChannel => "eventschannel",
            SettingKey::LevelsChannel => "levelschannel",
            SettingKey::NewsChannel => "newschannel",
            SettingKey::Prefix => "prefix",
            SettingKey::Welcome => "welcome",
            SettingKey::WelcomeChannel => "welcomechannel",
            SettingKey::World => "world",
        }
    }

    /// Human readable label for embeds.
    pub fn label(&self) -> &'static str {
        match self {
            SettingKey::AskChannel => "Ask channel",
            SettingKey::CommandsOnly => "Commands only",
            SettingKey::EventsChannel => "Events channel",
            SettingKey::LevelsChannel => "Levels channel",
            SettingKey::NewsChannel => "News channel",
            SettingKey::Prefix => "Prefixes",
            SettingKey::Welcome => "Welcome message",
            SettingKey::WelcomeChannel => "Welcome channel",
            SettingKey::World => "World",
        }
    }

    pub fn is_channel(&self) -> bool {
        matches!(
            self,
            SettingKey::AskChannel
                | SettingKey::EventsChannel
                | SettingKey::LevelsChannel
                | SettingKey::NewsChannel
                | SettingKey::WelcomeChannel
        )
    }

    /// Channels that fall back to the first postable channel when unusable.
    pub fn uses_fallback(&self) -> bool {
        matches!(
            self,
            SettingKey::EventsChannel | SettingKey::LevelsChannel | SettingKey::WelcomeChannel
        )
    }

    /// Name of the value type, used in type mismatch errors.
    pub fn expected_type(&self) -> &'static str {
        match self {
            SettingKey::CommandsOnly => "yes/no",
            SettingKey::Prefix => "prefix list",
            SettingKey::Welcome => "message",
            SettingKey::World => "world name",
            _ => "channel",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_name())
    }
}

/// A typed setting value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Channel(Option<u64>),
    Toggle(bool),
    Prefixes(Vec<String>),
    Text(Option<String>),
    World(Option<String>),
}

/// Coarse channel categories. Only text-like channels can be targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    News,
    Voice,
    Category,
    Other,
}

impl ChannelKind {
    pub fn is_text(&self) -> bool {
        matches!(self, ChannelKind::Text | ChannelKind::News)
    }
}

/// The bot's effective permissions in a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelPermissions {
    pub view: bool,
    pub send: bool,
    pub manage_messages: bool,
}

impl ChannelPermissions {
    pub fn can_post(&self) -> bool {
        self.view && self.send
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub id: u64,
    pub name: String,
    pub kind: ChannelKind,
    /// Position inside its category (or among uncategorized channels).
    pub position: u16,
    /// Position of the parent category, `None` for uncategorized channels.
    pub category_position: Option<u16>,
    pub bot_permissions: ChannelPermissions,
}

impl ChannelInfo {
    /// A text channel the bot can read and write.
    pub fn is_postable(&self) -> bool {
        self.kind.is_text() && self.bot_permissions.can_post()
    }

    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

/// What the core needs to know about a guild at the moment a setting is
/// read or written.
#[derive(Debug, Clone)]
pub struct GuildSnapshot {
    pub guild_id: u64,
    pub name: String,
    pub owner_id: u64,
    pub owner_name: String,
    pub bot_id: u64,
    pub bot_name: String,
    pub channels: Vec<ChannelInfo>,
}

impl GuildSnapshot {
    pub fn channel(&self, channel_id: u64) -> Option<&ChannelInfo> {
        self.channels.iter().find(|c| c.id == channel_id)
    }
}

/// The member being welcomed.
#[derive(Debug, Clone)]
pub struct WelcomeMember {
    pub user_id: u64,
    pub name: String,
}

/// A rendered welcome message and where to post it.
#[derive(Debug, Clone, PartialEq)]
pub struct WelcomeDelivery {
    pub channel_id: u64,
    pub content: String,
}

/// Outcome of `settings prefix <p>`.
#[derive(Debug, Clone, PartialEq)]
pub enum PrefixChange {
    Added { prefix: String, prefixes: Vec<String> },
    Removed { prefix: String, prefixes: Vec<String> },
}

/// Defaults that apply to guilds that never configured a setting.
#[derive(Debug, Clone)]
pub struct SettingsDefaults {
    pub prefixes: Vec<String>,
    pub ask_channel_name: String,
    pub commands_only: bool,
    /// Guilds running in lite mode cannot track a world.
    pub lite_guilds: Vec<u64>,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            prefixes: vec!["!".to_string()],
            ask_channel_name: "ask-nabbot".to_string(),
            commands_only: true,
            lite_guilds: Vec::new(),
        }
    }
}
