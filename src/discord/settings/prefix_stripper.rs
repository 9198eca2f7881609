// Per-guild command prefixes for poise's prefix parser.

use crate::core::settings::prefixes::match_prefix;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Prefix options with the guild's stored prefixes hooked in through
/// `stripped_dynamic_prefix`. Bot mentions always work as well.
pub fn prefix_options() -> poise::PrefixFrameworkOptions<Data, Error> {
    poise::PrefixFrameworkOptions {
        stripped_dynamic_prefix: Some(strip_prefix),
        mention_as_prefix: true,
        ..Default::default()
    }
}

/// Split a message into `(prefix, rest)` using the guild's prefixes, or the
/// default prefixes in DMs. Mentions are handled by poise itself.
pub fn strip_prefix<'a>(
    _ctx: &'a serenity::Context,
    message: &'a serenity::Message,
    data: &'a Data,
) -> poise::BoxFuture<'a, Result<Option<(&'a str, &'a str)>, Error>> {
    Box::pin(async move {
        let prefixes = match message.guild_id {
            Some(guild_id) => data.settings.prefixes(guild_id.get()).await?,
            None => data.settings.defaults().prefixes.clone(),
        };

        Ok(match_prefix(&message.content, &prefixes))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_options_use_stored_prefixes() {
        let options = prefix_options();
        assert!(options.stripped_dynamic_prefix.is_some());
        assert!(options.prefix.is_none());
        assert!(options.mention_as_prefix);
    }
}
