//! Pattern-triggered skills.
//!
//! Patterns are evaluated against the whole raw message text, independent of
//! mention or prefix parsing. A skill appears at most once in the result (its
//! earliest-created matching pattern) and results are ordered oldest first.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::event::{Member, OrganizationId};
use crate::domain::skill::{PatternKind, SkillPattern};
use crate::errors::RouteError;
use crate::repositories::PatternRepository;
use crate::routing::until_cancelled;

/// Evaluates one pattern against `text`. Invalid regular expressions never match.
pub fn pattern_matches(pattern: &SkillPattern, text: &str) -> bool {
    if pattern.kind == PatternKind::RegularExpression {
        return compile(pattern).is_some_and(|regex| regex.is_match(text));
    }
    substring_matches(pattern, text)
}

fn compile(pattern: &SkillPattern) -> Option<Regex> {
    match RegexBuilder::new(&pattern.pattern).case_insensitive(!pattern.case_sensitive).build() {
        Ok(regex) => Some(regex),
        Err(error) => {
            warn!(
                event_name = "routing.pattern.invalid_regex",
                pattern_id = %pattern.id.0,
                skill = %pattern.skill_name,
                error = %error,
                "skipping pattern with invalid regular expression"
            );
            None
        }
    }
}

fn substring_matches(pattern: &SkillPattern, text: &str) -> bool {
    let (needle, haystack) = if pattern.case_sensitive {
        (pattern.pattern.clone(), text.to_owned())
    } else {
        (pattern.pattern.to_lowercase(), text.to_lowercase())
    };

    match pattern.kind {
        PatternKind::Contains => haystack.contains(&needle),
        PatternKind::Exact => haystack.trim() == needle.trim(),
        PatternKind::StartsWith => haystack.trim_start().starts_with(&needle),
        PatternKind::EndsWith => haystack.trim_end().ends_with(&needle),
        PatternKind::RegularExpression => false,
    }
}

/// Members see every enabled pattern; foreign senders only see patterns that
/// allow external callers.
pub fn is_visible(pattern: &SkillPattern, sender_is_member: bool) -> bool {
    pattern.enabled && (sender_is_member || pattern.allow_external_callers)
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CompiledKey {
    pattern_id: String,
    source: String,
    case_sensitive: bool,
}

impl CompiledKey {
    fn of(pattern: &SkillPattern) -> Self {
        Self {
            pattern_id: pattern.id.0.clone(),
            source: pattern.pattern.clone(),
            case_sensitive: pattern.case_sensitive,
        }
    }
}

/// Compiled regular expressions shared across messages.
///
/// Entries are keyed by pattern id, source text and case flag, so an edited
/// pattern compiles again. Invalid expressions are remembered as `None` and
/// only warned about once.
#[derive(Debug, Default)]
pub struct RegexCache {
    compiled: RwLock<HashMap<CompiledKey, Option<Regex>>>,
}

impl RegexCache {
    pub fn matches(&self, pattern: &SkillPattern, text: &str) -> bool {
        if pattern.kind != PatternKind::RegularExpression {
            return substring_matches(pattern, text);
        }
        self.compiled_for(pattern).is_some_and(|regex| regex.is_match(text))
    }

    pub fn len(&self) -> usize {
        self.compiled.read().map_or(0, |compiled| compiled.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compiled_for(&self, pattern: &SkillPattern) -> Option<Regex> {
        let key = CompiledKey::of(pattern);
        if let Ok(compiled) = self.compiled.read() {
            if let Some(entry) = compiled.get(&key) {
                return entry.clone();
            }
        }

        let entry = compile(pattern);
        if let Ok(mut compiled) = self.compiled.write() {
            compiled.insert(key, entry.clone());
        }
        entry
    }
}

/// Filters, evaluates, collapses per skill and orders a loaded pattern set.
pub fn select_matches(
    patterns: Vec<SkillPattern>,
    text: &str,
    sender_is_member: bool,
    cache: &RegexCache,
) -> Vec<SkillPattern> {
    let mut earliest: HashMap<String, SkillPattern> = HashMap::new();

    for pattern in patterns {
        if !is_visible(&pattern, sender_is_member) || !cache.matches(&pattern, text) {
            continue;
        }
        match earliest.get(&pattern.skill_id.0) {
            Some(kept) if ordering_key(kept) <= ordering_key(&pattern) => {}
            _ => {
                earliest.insert(pattern.skill_id.0.clone(), pattern);
            }
        }
    }

    let mut matches: Vec<SkillPattern> = earliest.into_values().collect();
    matches.sort_by(|left, right| ordering_key(left).cmp(&ordering_key(right)));
    matches
}

/// Creation time, with the pattern id only separating identical timestamps.
fn ordering_key(pattern: &SkillPattern) -> (DateTime<Utc>, &str) {
    (pattern.created_at, pattern.id.0.as_str())
}

pub struct PatternMatcher {
    repository: Arc<dyn PatternRepository>,
    cache: RegexCache,
}

impl PatternMatcher {
    pub fn new(repository: Arc<dyn PatternRepository>) -> Self {
        Self { repository, cache: RegexCache::default() }
    }

    /// Every visible pattern matching `text`, one per skill, oldest first.
    pub async fn match_patterns(
        &self,
        text: &str,
        sender: &Member,
        organization_id: &OrganizationId,
        cancel: &CancellationToken,
    ) -> Result<Vec<SkillPattern>, RouteError> {
        let sender_is_member = &sender.organization_id == organization_id;
        let patterns =
            until_cancelled(cancel, self.repository.list_patterns(organization_id)).await?;
        let loaded = patterns.len();
        let matches = select_matches(patterns, text, sender_is_member, &self.cache);

        debug!(
            event_name = "routing.pattern.evaluated",
            organization_id = %organization_id.0,
            sender_is_member,
            loaded,
            matched = matches.len(),
            "patterns evaluated"
        );
        Ok(matches)
    }
}
