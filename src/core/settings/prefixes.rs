// Command prefix validation and matching.

use super::settings_errors::ValidationError;

pub const MAX_PREFIXES: usize = 5;
pub const MAX_PREFIX_LEN: usize = 20;

/// Trim and check a single prefix.
pub fn normalize_prefix(raw: &str) -> Result<String, ValidationError> {
    let prefix = raw.trim();
    if prefix.is_empty() {
        return Err(ValidationError::EmptyPrefix);
    }
    if prefix.contains('\n') || prefix.contains('\r') {
        return Err(ValidationError::MultilinePrefix);
    }
    if prefix.chars().count() > MAX_PREFIX_LEN {
        return Err(ValidationError::PrefixTooLong {
            max: MAX_PREFIX_LEN,
        });
    }
    Ok(prefix.to_string())
}

/// Validate a whole prefix list, keeping its order.
pub fn validate_prefixes(prefixes: &[String]) -> Result<Vec<String>, ValidationError> {
    if prefixes.is_empty() {
        return Err(ValidationError::LastPrefix);
    }
    if prefixes.len() > MAX_PREFIXES {
        return Err(ValidationError::TooManyPrefixes { max: MAX_PREFIXES });
    }

    let mut validated: Vec<String> = Vec::with_capacity(prefixes.len());
    for raw in prefixes {
        let prefix = normalize_prefix(raw)?;
        if validated.contains(&prefix) {
            return Err(ValidationError::DuplicatePrefix(prefix));
        }
        validated.push(prefix);
    }
    Ok(validated)
}

/// Split `content` into `(prefix, rest)` using the longest matching prefix.
///
/// Longest first so `!!` isn't shadowed by `!`.
pub fn match_prefix<'a>(content: &'a str, prefixes: &[String]) -> Option<(&'a str, &'a str)> {
    prefixes
        .iter()
        .filter(|p| !p.is_empty() && content.starts_with(p.as_str()))
        .max_by_key(|p| p.len())
        .map(|p| content.split_at(p.len()))
}

/// Whether `content` starts with a mention of `bot_id`.
pub fn starts_with_mention(content: &str, bot_id: u64) -> bool {
    let plain = format!("<@{}>", bot_id);
    let nick = format!("<@!{}>", bot_id);
    content.starts_with(&plain) || content.starts_with(&nick)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("  n/ ").unwrap(), "n/");
        assert_eq!(normalize_prefix("   "), Err(ValidationError::EmptyPrefix));
        assert_eq!(
            normalize_prefix("a\nb"),
            Err(ValidationError::MultilinePrefix)
        );
        assert_eq!(
            normalize_prefix(&"x".repeat(MAX_PREFIX_LEN + 1)),
            Err(ValidationError::PrefixTooLong {
                max: MAX_PREFIX_LEN
            })
        );
    }

    #[test]
    fn test_validate_prefixes_limits() {
        assert_eq!(
            validate_prefixes(&list(&["!", "?", "n/", ".", ";"])).unwrap().len(),
            5
        );
        assert_eq!(
            validate_prefixes(&list(&["!", "?", "n/", ".", ";", "$"])),
            Err(ValidationError::TooManyPrefixes { max: 5 })
        );
        assert_eq!(
            validate_prefixes(&list(&["!", " ! "])),
            Err(ValidationError::DuplicatePrefix("!".to_string()))
        );
        assert_eq!(validate_prefixes(&[]), Err(ValidationError::LastPrefix));
    }

    #[test]
    fn test_match_prefix_prefers_longest() {
        let prefixes = list(&["!", "!!", "n/"]);
        assert_eq!(match_prefix("!!help", &prefixes), Some(("!!", "help")));
        assert_eq!(match_prefix("!help", &prefixes), Some(("!", "help")));
        assert_eq!(match_prefix("n/world", &prefixes), Some(("n/", "world")));
        assert_eq!(match_prefix("hello", &prefixes), None);
    }

    #[test]
    fn test_starts_with_mention() {
        assert!(starts_with_mention("<@42> settings", 42));
        assert!(starts_with_mention("<@!42> settings", 42));
        assert!(!starts_with_mention("<@43> settings", 42));
    }
}
