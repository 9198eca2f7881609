// Builds the core's view of a guild from serenity's cache.
//
// Everything is copied out while the cache guard is held so the snapshot can
// cross await points.

use crate::core::settings::{ChannelInfo, ChannelKind, ChannelPermissions, GuildSnapshot};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

/// Snapshot of `guild_id`, or `None` if the guild (or our own member) isn't
/// cached yet.
pub fn guild_snapshot(ctx: &serenity::Context, guild_id: serenity::GuildId) -> Option<GuildSnapshot> {
    let (bot_id, bot_name) = {
        let me = ctx.cache.current_user();
        (me.id, me.name.clone())
    };

    let guild = ctx.cache.guild(guild_id)?;
    let bot_member = guild.members.get(&bot_id)?;

    let category_positions: HashMap<serenity::ChannelId, u16> = guild
        .channels
        .values()
        .filter(|c| c.kind == serenity::ChannelType::Category)
        .map(|c| (c.id, c.position))
        .collect();

    let channels = guild
        .channels
        .values()
        .map(|channel| {
            let perms = guild.user_permissions_in(channel, bot_member);
            ChannelInfo {
                id: channel.id.get(),
                name: channel.name.clone(),
                kind: channel_kind(channel.kind),
                position: channel.position,
                category_position: channel
                    .parent_id
                    .and_then(|parent| category_positions.get(&parent).copied()),
                bot_permissions: ChannelPermissions {
                    view: perms.contains(serenity::Permissions::VIEW_CHANNEL),
                    send: perms.contains(serenity::Permissions::SEND_MESSAGES),
                    manage_messages: perms.contains(serenity::Permissions::MANAGE_MESSAGES),
                },
            }
        })
        .collect();

    let owner_name = guild
        .members
        .get(&guild.owner_id)
        .map(|m| m.user.name.clone())
        .unwrap_or_else(|| "the owner".to_string());

    Some(GuildSnapshot {
        guild_id: guild_id.get(),
        name: guild.name.clone(),
        owner_id: guild.owner_id.get(),
        owner_name,
        bot_id: bot_id.get(),
        bot_name,
        channels,
    })
}

fn channel_kind(kind: serenity::ChannelType) -> ChannelKind {
    match kind {
        serenity::ChannelType::Text => ChannelKind::Text,
        serenity::ChannelType::News => ChannelKind::News,
        serenity::ChannelType::Voice | serenity::ChannelType::Stage => ChannelKind::Voice,
        serenity::ChannelType::Category => ChannelKind::Category,
        _ => ChannelKind::Other,
    }
}
