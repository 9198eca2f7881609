// Discord commands for guild settings.
//
// **Notice the pattern:**
// 1. Snapshot the guild from the cache
// 2. Call the core settings service
// 3. Format the response based on the result
//
// Validation and permission errors are replies, not command failures.

use crate::core::settings::welcome_template::WelcomeTemplate;
use crate::core::settings::{
    GuildConfig, GuildSnapshot, PermissionError, PrefixChange, SettingKey, SettingValue,
    SettingsError, SettingsService, WelcomeMember,
};
use crate::discord::settings::guild_snapshot::guild_snapshot;
use crate::infra::settings::SqliteSettingsStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Shared state available to every command.
pub struct Data {
    pub settings: Arc<SettingsService<SqliteSettingsStore>>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Discord's limit for an embed field value.
const EMBED_FIELD_MAX: usize = 1024;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Show or change this server's settings.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands(
        "askchannel",
        "commandsonly",
        "eventschannel",
        "levelschannel",
        "newschannel",
        "prefix",
        "welcome",
        "welcomechannel",
        "world"
    )
)]
pub async fn settings(ctx: Context<'_>) -> Result<(), Error> {
    let snapshot = current_snapshot(ctx)?;
    let service = &ctx.data().settings;
    let config = service.config(snapshot.guild_id).await?;
    let blocked = service.commands_only_unavailable(&snapshot).await?;

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("Settings for {}", snapshot.name))
        .description("Use `settings <name> [value]` to change a setting.")
        .color(0x3498db);

    for key in SettingKey::ALL {
        let value = service.get(&snapshot, key).await?;
        let inline = key != SettingKey::Welcome;
        embed = embed.field(
            format!("{} (`{}`)", key.label(), key.command_name()),
            field_value(&value, &note(&config, key, &value, blocked.as_ref())),
            inline,
        );
    }

    if let Some(updated) = config.updated_at {
        embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
            "Last changed {}",
            updated.format("%Y-%m-%d %H:%M UTC")
        )));
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Channel where long replies are allowed.
#[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn askchannel(
    ctx: Context<'_>,
    #[description = "Channel, or `none` to reset"]
    #[rest]
    channel: Option<String>,
) -> Result<(), Error> {
    show_or_set(ctx, SettingKey::AskChannel, channel).await
}

/// Whether only commands are allowed in the ask channel.
#[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn commandsonly(
    ctx: Context<'_>,
    #[description = "yes or no"] value: Option<String>,
) -> Result<(), Error> {
    show_or_set(ctx, SettingKey::CommandsOnly, value).await
}

/// Channel for event announcements.
#[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn eventschannel(
    ctx: Context<'_>,
    #[description = "Channel, or `none` to reset"]
    #[rest]
    channel: Option<String>,
) -> Result<(), Error> {
    show_or_set(ctx, SettingKey::EventsChannel, channel).await
}

/// Channel for level up and death announcements.
#[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn levelschannel(
    ctx: Context<'_>,
    #[description = "Channel, or `none` to reset"]
    #[rest]
    channel: Option<String>,
) -> Result<(), Error> {
    show_or_set(ctx, SettingKey::LevelsChannel, channel).await
}

/// Channel for Tibia news.
#[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn newschannel(
    ctx: Context<'_>,
    #[description = "Channel, or `none` to disable"]
    #[rest]
    channel: Option<String>,
) -> Result<(), Error> {
    show_or_set(ctx, SettingKey::NewsChannel, channel).await
}

/// Add a command prefix, or remove it if it already exists.
#[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn prefix(
    ctx: Context<'_>,
    #[description = "Prefix to add or remove"] prefix: Option<String>,
) -> Result<(), Error> {
    let Some(prefix) = prefix else {
        return show_or_set(ctx, SettingKey::Prefix, None).await;
    };

    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    match ctx.data().settings.toggle_prefix(guild_id, &prefix).await {
        Ok(PrefixChange::Added { prefix, prefixes }) => {
            ctx.say(format!(
                "✅ Added `{}`. Prefixes: {}",
                prefix,
                format_prefixes(&prefixes)
            ))
            .await?;
        }
        Ok(PrefixChange::Removed { prefix, prefixes }) => {
            ctx.say(format!(
                "🗑️ Removed `{}`. Prefixes: {}",
                prefix,
                format_prefixes(&prefixes)
            ))
            .await?;
        }
        Err(err) => report(ctx, err).await?,
    }
    Ok(())
}

/// Message sent when someone joins.
///
/// Fields: {server} {owner} {owner.mention} {user} {user.mention} {bot} {bot.mention}
#[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn welcome(
    ctx: Context<'_>,
    #[description = "Message, or `none` to disable"]
    #[rest]
    message: Option<String>,
) -> Result<(), Error> {
    let Some(message) = message else {
        return show_or_set(ctx, SettingKey::Welcome, None).await;
    };

    let snapshot = current_snapshot(ctx)?;
    let service = &ctx.data().settings;
    let value = match service
        .set_from_input(&snapshot, SettingKey::Welcome, &message)
        .await
    {
        Ok(value) => value,
        Err(err) => return report(ctx, err).await,
    };

    let SettingValue::Text(Some(text)) = value else {
        ctx.say("🛑 Welcome messages disabled.").await?;
        return Ok(());
    };

    let member = WelcomeMember {
        user_id: ctx.author().id.get(),
        name: ctx.author().name.clone(),
    };
    let preview = WelcomeTemplate::parse(&text)?.render(&snapshot, &member);
    let target = service
        .resolve_channel(&snapshot, SettingKey::WelcomeChannel)
        .await?
        .map(|c| c.mention())
        .unwrap_or_else(|| "nowhere (I can't post in any channel)".to_string());

    let embed = serenity::CreateEmbed::new()
        .title("Welcome message preview")
        .description(preview)
        .color(0x2ecc71)
        .footer(serenity::CreateEmbedFooter::new("Shown as it would look for you"));

    ctx.send(
        poise::CreateReply::default()
            .content(format!("✅ Welcome message updated. It will be posted in {}.", target))
            .embed(embed),
    )
    .await?;
    Ok(())
}

/// Channel where welcome messages are posted.
#[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn welcomechannel(
    ctx: Context<'_>,
    #[description = "Channel, or `none` to reset"]
    #[rest]
    channel: Option<String>,
) -> Result<(), Error> {
    show_or_set(ctx, SettingKey::WelcomeChannel, channel).await
}

/// Tibia world tracked by this server.
#[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn world(
    ctx: Context<'_>,
    #[description = "World name, or `none` to stop tracking"]
    #[rest]
    world: Option<String>,
) -> Result<(), Error> {
    show_or_set(ctx, SettingKey::World, world).await
}

// ============================================================================
// Helpers
// ============================================================================

fn current_snapshot(ctx: Context<'_>) -> Result<GuildSnapshot, Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;
    Ok(guild_snapshot(ctx.serenity_context(), guild_id)
        .ok_or("I can't see this server's channels yet, try again in a moment.")?)
}

/// With no input show the current value, otherwise validate and store it.
async fn show_or_set(ctx: Context<'_>, key: SettingKey, input: Option<String>) -> Result<(), Error> {
    let snapshot = current_snapshot(ctx)?;
    let service = &ctx.data().settings;

    let Some(raw) = input else {
        let config = service.config(snapshot.guild_id).await?;
        let blocked = service.commands_only_unavailable(&snapshot).await?;
        let value = service.get(&snapshot, key).await?;
        ctx.say(format!(
            "**{}**: {}{}",
            key.label(),
            describe(&value),
            note(&config, key, &value, blocked.as_ref())
        ))
        .await?;
        return Ok(());
    };

    match service.set_from_input(&snapshot, key, &raw).await {
        Ok(value) => {
            ctx.say(format!("✅ **{}** set to {}.", key.label(), describe(&value)))
                .await?;
        }
        Err(err) => report(ctx, err).await?,
    }
    Ok(())
}

/// Reply with user facing errors, propagate the rest.
async fn report(ctx: Context<'_>, err: SettingsError) -> Result<(), Error> {
    match err.user_message() {
        Some(message) => {
            ctx.say(format!("❌ {}", message)).await?;
            Ok(())
        }
        None => Err(err.into()),
    }
}

fn describe(value: &SettingValue) -> String {
    match value {
        SettingValue::Channel(Some(id)) => format!("<#{}>", id),
        SettingValue::Channel(None) => "Not set".to_string(),
        SettingValue::Toggle(true) => "Yes".to_string(),
        SettingValue::Toggle(false) => "No".to_string(),
        SettingValue::Prefixes(prefixes) => format_prefixes(prefixes),
        SettingValue::Text(Some(text)) => format!("```\n{}\n```", text),
        SettingValue::Text(None) => "Disabled".to_string(),
        SettingValue::World(Some(world)) => format!("**{}**", world),
        SettingValue::World(None) => "None".to_string(),
    }
}

/// `describe` plus `note`, cut down to fit in an embed field. Long welcome
/// messages are shortened inside their code block.
fn field_value(value: &SettingValue, note: &str) -> String {
    let full = format!("{}{}", describe(value), note);
    if full.chars().count() <= EMBED_FIELD_MAX {
        return full;
    }

    let budget = EMBED_FIELD_MAX - note.chars().count();
    match value {
        SettingValue::Text(Some(text)) => {
            // code fences plus the ellipsis
            let keep = budget.saturating_sub("```\n\n```…".chars().count());
            let cut: String = text.chars().take(keep).collect();
            format!("```\n{}…\n```{}", cut, note)
        }
        _ => full.chars().take(EMBED_FIELD_MAX).collect(),
    }
}

/// Explains why the effective value differs from what's stored.
fn note(
    config: &GuildConfig,
    key: SettingKey,
    value: &SettingValue,
    commands_only_blocked: Option<&PermissionError>,
) -> String {
    if key == SettingKey::CommandsOnly {
        if let Some(reason) = commands_only_blocked {
            return format!(" *(off: {})*", reason);
        }
    }
    if !config.is_configured(key) {
        return " *(default)*".to_string();
    }
    if key == SettingKey::WelcomeChannel && config.welcome_message.is_none() {
        return " *(welcome message not set)*".to_string();
    }
    match value {
        SettingValue::Channel(resolved) if key.is_channel() && *resolved != config.channel_id(key) => {
            " *(configured channel unavailable)*".to_string()
        }
        _ => String::new(),
    }
}

fn format_prefixes(prefixes: &[String]) -> String {
    prefixes
        .iter()
        .map(|p| format!("`{}`", p))
        .collect::<Vec<_>>()
        .join(", ")
}
