// Welcome message templates.
//
// A template is plain text with `{field}` placeholders. `{{` and `}}` are
// literal braces. Templates are parsed once when saved so a broken template is
// rejected up front instead of failing on every member join.

use super::settings_errors::ValidationError;
use super::settings_models::{GuildSnapshot, WelcomeMember};

pub const MAX_WELCOME_LEN: usize = 1200;
/// Discord's limit for a message's content.
pub const MAX_RENDERED_LEN: usize = 2000;

/// Longest guild or user name a field can expand to.
const MAX_NAME_LEN: usize = 100;
/// `<@` + a 20 digit snowflake + `>`.
const MAX_MENTION_LEN: usize = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Server,
    Owner,
    OwnerMention,
    User,
    UserMention,
    Bot,
    BotMention,
}

impl Token {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "server" => Some(Token::Server),
            "owner" => Some(Token::Owner),
            "owner.mention" => Some(Token::OwnerMention),
            "user" => Some(Token::User),
            "user.mention" => Some(Token::UserMention),
            "bot" => Some(Token::Bot),
            "bot.mention" => Some(Token::BotMention),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Literal(String),
    Field(Token),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WelcomeTemplate {
    pieces: Vec<Piece>,
}

impl WelcomeTemplate {
    pub fn parse(source: &str) -> Result<Self, ValidationError> {
        if source.chars().count() > MAX_WELCOME_LEN {
            return Err(ValidationError::WelcomeTooLong {
                max: MAX_WELCOME_LEN,
            });
        }

        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        match n {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(ValidationError::UnbalancedBraces),
                            other => name.push(other),
                        }
                    }
                    if !closed {
                        return Err(ValidationError::UnbalancedBraces);
                    }
                    let token = Token::parse(name.trim())
                        .ok_or_else(|| ValidationError::UnknownToken(name.clone()))?;
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(Piece::Field(token));
                }
                '}' => return Err(ValidationError::UnbalancedBraces),
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(Self { pieces })
    }

    /// Reject templates that could render past Discord's message limit.
    pub fn check_fits(&self) -> Result<(), ValidationError> {
        if self.max_rendered_len() > MAX_RENDERED_LEN {
            return Err(ValidationError::WelcomeExpandsTooLong {
                max: MAX_RENDERED_LEN,
            });
        }
        Ok(())
    }

    /// Length of the message with every field at its longest.
    pub fn max_rendered_len(&self) -> usize {
        self.pieces
            .iter()
            .map(|piece| match piece {
                Piece::Literal(text) => text.chars().count(),
                Piece::Field(Token::OwnerMention | Token::UserMention | Token::BotMention) => {
                    MAX_MENTION_LEN
                }
                Piece::Field(_) => MAX_NAME_LEN,
            })
            .sum()
    }

    pub fn render(&self, guild: &GuildSnapshot, member: &WelcomeMember) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Field(Token::Server) => out.push_str(&guild.name),
                Piece::Field(Token::Owner) => out.push_str(&guild.owner_name),
                Piece::Field(Token::OwnerMention) => out.push_str(&mention(guild.owner_id)),
                Piece::Field(Token::User) => out.push_str(&member.name),
                Piece::Field(Token::UserMention) => out.push_str(&mention(member.user_id)),
                Piece::Field(Token::Bot) => out.push_str(&guild.bot_name),
                Piece::Field(Token::BotMention) => out.push_str(&mention(guild.bot_id)),
            }
        }
        out
    }
}

fn mention(user_id: u64) -> String {
    format!("<@{}>", user_id)
}
