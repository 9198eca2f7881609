// Gateway events that act on guild settings.

use crate::core::settings::prefixes::{match_prefix, starts_with_mention};
use crate::core::settings::WelcomeMember;
use crate::discord::settings::guild_snapshot::guild_snapshot;
use crate::discord::Data;
use anyhow::Result;
use poise::serenity_prelude::{self as serenity, Context};

/// Post the guild's welcome message for a new member.
pub async fn handle_member_join(
    ctx: &Context,
    data: &Data,
    new_member: &serenity::Member,
) -> Result<()> {
    if new_member.user.bot {
        return Ok(());
    }

    let Some(snapshot) = guild_snapshot(ctx, new_member.guild_id) else {
        return Ok(());
    };

    let member = WelcomeMember {
        user_id: new_member.user.id.get(),
        name: new_member.user.name.clone(),
    };

    let Some(delivery) = data.settings.welcome_delivery(&snapshot, &member).await? else {
        return Ok(());
    };

    serenity::ChannelId::new(delivery.channel_id)
        .say(&ctx.http, delivery.content)
        .await?;

    tracing::debug!(
        guild_id = snapshot.guild_id,
        channel_id = delivery.channel_id,
        user_id = member.user_id,
        "Sent welcome message"
    );
    Ok(())
}

/// Drop the guild's settings once we're actually removed from it.
///
/// Outages also fire GuildDelete, with `unavailable` set; those keep their
/// settings.
pub async fn handle_guild_delete(data: &Data, incomplete: &serenity::UnavailableGuild) -> Result<()> {
    if incomplete.unavailable {
        tracing::warn!(guild_id = incomplete.id.get(), "Guild became unavailable");
        return Ok(());
    }

    data.settings.remove_guild(incomplete.id.get()).await?;
    Ok(())
}

/// Delete non-command messages in the ask channel when commands-only is on.
pub async fn enforce_commands_only(
    ctx: &Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<()> {
    if message.author.bot {
        return Ok(());
    }
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    let Some(snapshot) = guild_snapshot(ctx, guild_id) else {
        return Ok(());
    };

    let channel_id = message.channel_id.get();
    if !data
        .settings
        .commands_only_enforced(&snapshot, channel_id)
        .await?
    {
        return Ok(());
    }

    let prefixes = data.settings.prefixes(snapshot.guild_id).await?;
    let is_command = match_prefix(&message.content, &prefixes).is_some()
        || starts_with_mention(&message.content, snapshot.bot_id);
    if is_command {
        return Ok(());
    }

    if let Err(e) = message.delete(ctx).await {
        tracing::warn!(
            guild_id = snapshot.guild_id,
            channel_id,
            "Failed to delete non-command message: {}",
            e
        );
    }
    Ok(())
}
