// Settings errors.
//
// Validation and permission errors are meant to be shown to the invoking
// user, so their messages are written as replies. Store errors are internal.

use super::settings_models::SettingKey;
use thiserror::Error;

/// A value was rejected. The stored setting is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("`{key}` expects a {expected}.")]
    WrongType {
        key: SettingKey,
        expected: &'static str,
    },

    #[error("I couldn't find a channel named `{0}` in this server.")]
    UnknownChannel(String),

    #[error("Channel `{0}` doesn't belong to this server.")]
    ForeignChannel(u64),

    #[error("<#{0}> is not a text channel.")]
    NotTextChannel(u64),

    #[error("I can't read and send messages in <#{0}>.")]
    CannotPost(u64),

    #[error("`{0}` is not a valid yes/no answer.")]
    InvalidToggle(String),

    #[error("Prefixes can't be empty.")]
    EmptyPrefix,

    #[error("Prefixes can't be longer than {max} characters.")]
    PrefixTooLong { max: usize },

    #[error("Prefixes can't contain line breaks.")]
    MultilinePrefix,

    #[error("`{0}` is already a prefix.")]
    DuplicatePrefix(String),

    #[error("This server can't have more than {max} prefixes.")]
    TooManyPrefixes { max: usize },

    #[error("This server needs at least one prefix.")]
    LastPrefix,

    #[error("There's no world named `{0}`.")]
    UnknownWorld(String),

    #[error("World tracking isn't available on this server.")]
    LiteMode,

    #[error("Welcome messages can't be longer than {max} characters.")]
    WelcomeTooLong { max: usize },

    #[error("That welcome message could be longer than {max} characters once the fields are filled in.")]
    WelcomeExpandsTooLong { max: usize },

    #[error("`{{{0}}}` is not a valid welcome message field.")]
    UnknownToken(String),

    #[error("Unmatched `{{` or `}}` in the welcome message. Use `{{{{` or `}}}}` for literal braces.")]
    UnbalancedBraces,
}

/// The bot lacks a platform permission the setting depends on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PermissionError {
    #[error("I need `Manage Messages` in <#{channel_id}> to delete non-command messages.")]
    ManageMessages { channel_id: u64 },

    #[error("There's no ask channel in this server, so there's nothing to restrict to commands.")]
    NoAskChannel,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SettingsError {
    /// Message to show the user, if this error is meant for them.
    pub fn user_message(&self) -> Option<String> {
        match self {
            SettingsError::Validation(e) => Some(e.to_string()),
            SettingsError::Permission(e) => Some(e.to_string()),
            SettingsError::Store(_) => None,
        }
    }
}
