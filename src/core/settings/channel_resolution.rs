// Channel lookup and fallback resolution.
//
// Nothing here is cached: callers pass a fresh snapshot every time so a
// deleted channel or a revoked permission is noticed on the next use.

use super::settings_errors::ValidationError;
use super::settings_models::{ChannelInfo, GuildSnapshot};

/// Channels in sidebar order: uncategorized first, then by category
/// position, then by position inside the category.
pub fn sidebar_order(snapshot: &GuildSnapshot) -> Vec<&ChannelInfo> {
    let mut channels: Vec<&ChannelInfo> = snapshot.channels.iter().collect();
    channels.sort_by_key(|c| {
        (
            c.category_position.map(|p| p as u32 + 1).unwrap_or(0),
            c.position,
            c.id,
        )
    });
    channels
}

/// First channel in sidebar order the bot can post in.
pub fn first_postable(snapshot: &GuildSnapshot) -> Option<&ChannelInfo> {
    sidebar_order(snapshot)
        .into_iter()
        .find(|c| c.is_postable())
}

/// The configured channel if it still exists and the bot can post there,
/// otherwise the first postable channel.
pub fn resolve_with_fallback(
    snapshot: &GuildSnapshot,
    configured: Option<u64>,
) -> Option<&ChannelInfo> {
    configured
        .and_then(|id| snapshot.channel(id))
        .filter(|c| c.is_postable())
        .or_else(|| first_postable(snapshot))
}

/// The configured channel only if it is still usable.
pub fn resolve_strict(snapshot: &GuildSnapshot, configured: Option<u64>) -> Option<&ChannelInfo> {
    configured
        .and_then(|id| snapshot.channel(id))
        .filter(|c| c.is_postable())
}

/// Parse a user supplied channel reference: `<#id>`, a bare id, `#name` or
/// `name`. Names match text channels case-insensitively. A bare number is
/// tried as an id first, then as a name.
pub fn parse_channel<'a>(
    snapshot: &'a GuildSnapshot,
    raw: &str,
) -> Result<&'a ChannelInfo, ValidationError> {
    let raw = raw.trim();

    if let Some(mention) = raw.strip_prefix("<#").and_then(|rest| rest.strip_suffix('>')) {
        if let Ok(id) = mention.parse::<u64>() {
            return snapshot
                .channel(id)
                .ok_or(ValidationError::ForeignChannel(id));
        }
    }

    let id = raw.parse::<u64>().ok();
    if let Some(channel) = id.and_then(|id| snapshot.channel(id)) {
        return Ok(channel);
    }

    let name = raw.trim_start_matches('#');
    snapshot
        .channels
        .iter()
        .filter(|c| c.kind.is_text())
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| match id {
            Some(id) => ValidationError::ForeignChannel(id),
            None => ValidationError::UnknownChannel(name.to_string()),
        })
}

/// A channel can be assigned to a setting only if it's a text channel the bot
/// can post in.
pub fn ensure_assignable(channel: &ChannelInfo) -> Result<(), ValidationError> {
    if !channel.kind.is_text() {
        return Err(ValidationError::NotTextChannel(channel.id));
    }
    if !channel.bot_permissions.can_post() {
        return Err(ValidationError::CannotPost(channel.id));
    }
    Ok(())
}
