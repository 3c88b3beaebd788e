//! Splits raw message text into a skill candidate and its arguments.
//!
//! A message is *directed at the bot* when it mentions the bot anywhere, even
//! wrapped in punctuation such as `<@BOT>:` or `(<@BOT>)`, or when it starts
//! with the invocation prefix. Direct messages are parsed
//! for a skill name even without either marker, but they only count as
//! directed when one of the markers is present. Workflow messages are never
//! parsed.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::routing::verb_sugar::{self, SugarOutcome};

pub const DEFAULT_INVOCATION_PREFIX: char = '.';

/// A user mention plus any punctuation glued to either side of it.
static MENTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\p{P}*<@([^<>|\s]+)(?:\|[^<>]*)?>\p{P}*").expect("valid user mention regex")
});

#[derive(Clone, Copy, Debug)]
pub struct TokenizerInput<'a> {
    pub text: &'a str,
    pub bot_user_id: &'a str,
    pub invocation_prefix: char,
    pub is_direct_message: bool,
    pub is_workflow_message: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkillCandidate {
    /// Nothing to resolve: the message was not addressed, or was empty after stripping.
    None,
    /// First word of an addressed message, subject to alias and skill lookup.
    Named(String),
    /// Fixed built-in picked by a verb-sugar rule; aliases do not apply.
    Sugar(&'static str),
    /// Leading user mention followed by an unknown verb; kept for diagnostics only.
    Unresolvable(String),
}

impl SkillCandidate {
    pub fn name(&self) -> &str {
        match self {
            Self::None => "",
            Self::Named(name) | Self::Unresolvable(name) => name.as_str(),
            Self::Sugar(name) => *name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedMessage {
    pub directed_at_bot: bool,
    pub candidate: SkillCandidate,
    pub arguments: Vec<String>,
}

impl ParsedMessage {
    fn unaddressed() -> Self {
        Self { directed_at_bot: false, candidate: SkillCandidate::None, arguments: Vec::new() }
    }

    pub fn skill_name(&self) -> &str {
        self.candidate.name()
    }

    pub fn argument_text(&self) -> String {
        self.arguments.join(" ")
    }
}

pub fn parse_message(input: &TokenizerInput<'_>) -> ParsedMessage {
    if input.is_workflow_message {
        return ParsedMessage::unaddressed();
    }

    let text = input.text.trim();
    let prefixed = text.starts_with(input.invocation_prefix);
    let body = if prefixed { &text[input.invocation_prefix.len_utf8()..] } else { text };
    let (body, mentions_bot) = strip_mentions_of(body, input.bot_user_id);
    let directed_at_bot = mentions_bot || prefixed;

    if !directed_at_bot && !input.is_direct_message {
        return ParsedMessage::unaddressed();
    }

    let words: Vec<String> = body.split_whitespace().map(ToOwned::to_owned).collect();

    let (candidate, arguments) = match verb_sugar::expand(&words) {
        SugarOutcome::Rewritten { skill, arguments } => (SkillCandidate::Sugar(skill), arguments),
        SugarOutcome::UnknownVerb { mention, arguments } => {
            (SkillCandidate::Unresolvable(mention), arguments)
        }
        SugarOutcome::NotApplicable => match words.split_first() {
            Some((first, rest)) => (SkillCandidate::Named(first.clone()), rest.to_vec()),
            None => (SkillCandidate::None, Vec::new()),
        },
    };

    ParsedMessage { directed_at_bot, candidate, arguments }
}

/// Extracts the user id from a mention token, accepting `<@ID>` and `<@ID|label>`.
pub fn mentioned_user_id(word: &str) -> Option<&str> {
    let inner = word.strip_prefix("<@")?.strip_suffix('>')?;
    let id = inner.split_once('|').map_or(inner, |(id, _label)| id);
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return None;
    }
    Some(id)
}

/// True when `text` mentions `user_id` anywhere, punctuation included.
pub fn is_mention_of(text: &str, user_id: &str) -> bool {
    MENTION_REGEX.captures_iter(text).any(|captures| &captures[1] == user_id)
}

/// Replaces every mention of `user_id`, with its surrounding punctuation, by a
/// space. Mentions of other users are left untouched.
fn strip_mentions_of(text: &str, user_id: &str) -> (String, bool) {
    let mut found = false;
    let stripped = MENTION_REGEX.replace_all(text, |captures: &Captures<'_>| {
        if &captures[1] == user_id {
            found = true;
            " ".to_owned()
        } else {
            captures[0].to_owned()
        }
    });
    (stripped.into_owned(), found)
}
