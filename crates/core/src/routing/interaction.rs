//! Callback tokens and the interaction handler registry.
//!
//! A token is produced once, when a UI element is emitted, and parsed back when
//! the platform reports an interaction with that element. Tokens are versioned
//! `key=value` segments separated by `;` with percent-encoded values:
//!
//! ```text
//! v=1;handler=deploy.confirm;ctx=run%3D42
//! v=1;skill=deploy
//! ```
//!
//! Emitted elements can outlive the code that emitted them, so an unparseable
//! token or an unknown handler routes to [`InteractionRouteResult::Ignore`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::event::InteractionKind;
use crate::errors::CallbackTokenError;
use crate::routing::skills::SkillUnit;

pub const CALLBACK_TOKEN_VERSION: &str = "1";

/// Values whose every `%` starts a complete two-digit escape.
static PERCENT_ESCAPED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[^%]|%[0-9A-Fa-f]{2})*$").expect("valid percent escape regex")
});

/// A live handler for UI round-trips. `id` must stay stable across deployments.
pub trait InteractionHandler: Send + Sync {
    fn id(&self) -> &str;

    fn callback_token(&self) -> CallbackToken {
        CallbackToken::for_handler(self.id())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackTarget {
    Handler(String),
    Skill(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackToken {
    pub target: CallbackTarget,
    /// Correlation data handed back to the handler untouched.
    pub context: Option<String>,
}

impl CallbackToken {
    pub fn for_handler(id: impl Into<String>) -> Self {
        Self { target: CallbackTarget::Handler(id.into()), context: None }
    }

    pub fn for_skill(name: impl Into<String>) -> Self {
        Self { target: CallbackTarget::Skill(name.into()), context: None }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn encode(&self) -> String {
        let (key, value) = match &self.target {
            CallbackTarget::Handler(id) => ("handler", id),
            CallbackTarget::Skill(name) => ("skill", name),
        };
        let mut encoded =
            format!("v={CALLBACK_TOKEN_VERSION};{key}={}", urlencoding::encode(value));
        if let Some(context) = &self.context {
            encoded.push_str(";ctx=");
            encoded.push_str(&urlencoding::encode(context));
        }
        encoded
    }
}

impl fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for CallbackToken {
    type Err = CallbackTokenError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CallbackTokenError::Empty);
        }

        let mut fields: HashMap<&str, String> = HashMap::new();
        for segment in raw.split(';') {
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| CallbackTokenError::MalformedSegment(segment.to_owned()))?;
            let key = key.trim();
            if !matches!(key, "v" | "handler" | "skill" | "ctx") {
                return Err(CallbackTokenError::UnknownKey(key.to_owned()));
            }
            let value = decode_value(value.trim())
                .ok_or_else(|| CallbackTokenError::MalformedSegment(segment.to_owned()))?;
            if fields.insert(key, value).is_some() {
                return Err(CallbackTokenError::DuplicateKey(key.to_owned()));
            }
        }

        match fields.remove("v") {
            Some(version) if version == CALLBACK_TOKEN_VERSION => {}
            Some(version) => return Err(CallbackTokenError::UnsupportedVersion(version)),
            None => return Err(CallbackTokenError::UnsupportedVersion(String::new())),
        }

        let target = match (fields.remove("handler"), fields.remove("skill")) {
            (Some(id), None) if !id.is_empty() => CallbackTarget::Handler(id),
            (None, Some(name)) if !name.is_empty() => CallbackTarget::Skill(name),
            (Some(_), Some(_)) => return Err(CallbackTokenError::ConflictingTargets),
            _ => return Err(CallbackTokenError::MissingTarget),
        };

        Ok(Self { target, context: fields.remove("ctx") })
    }
}

/// Parses a raw token, logging and discarding anything unparseable.
pub fn parse_callback_token(raw: &str) -> Option<CallbackToken> {
    match raw.parse::<CallbackToken>() {
        Ok(token) => Some(token),
        Err(error) => {
            debug!(
                event_name = "routing.interaction.token_rejected",
                error = %error,
                "ignoring unparseable callback token"
            );
            None
        }
    }
}

/// Immutable map from handler id to handler, built once at startup.
#[derive(Clone, Default)]
pub struct InteractionRegistry {
    handlers: HashMap<String, Arc<dyn InteractionHandler>>,
}

impl InteractionRegistry {
    pub fn new(handlers: impl IntoIterator<Item = Arc<dyn InteractionHandler>>) -> Self {
        let handlers =
            handlers.into_iter().map(|handler| (handler.id().to_owned(), handler)).collect();
        Self { handlers }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn InteractionHandler>> {
        self.handlers.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for InteractionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionRegistry").field("handlers", &self.ids()).finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InteractionInvocation {
    pub unit: SkillUnit,
    pub kind: InteractionKind,
    pub target: CallbackTarget,
    pub context: Option<String>,
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionRouteResult {
    Invoke(InteractionInvocation),
    Ignore,
}

impl InteractionRouteResult {
    pub fn is_ignore(&self) -> bool {
        matches!(self, Self::Ignore)
    }
}

/// Percent-decodes one value. Truncated escapes and invalid UTF-8 are rejected.
fn decode_value(value: &str) -> Option<String> {
    if !PERCENT_ESCAPED.is_match(value) {
        return None;
    }
    urlencoding::decode(value).ok().map(|decoded| decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        parse_callback_token, CallbackTarget, CallbackToken, InteractionHandler,
        InteractionRegistry,
    };
    use crate::errors::CallbackTokenError;

    struct Confirm;

    impl InteractionHandler for Confirm {
        fn id(&self) -> &str {
            "deploy.confirm"
        }
    }

    #[test]
    fn handler_tokens_round_trip_with_context() {
        let token = Confirm.callback_token().with_context("run=42; note=50% done");
        let encoded = token.encode();

        assert!(encoded.starts_with("v=1;handler=deploy.confirm;ctx="));
        assert!(!encoded["v=1;".len()..].contains(' '));
        assert_eq!(encoded.parse::<CallbackToken>(), Ok(token));
    }

    #[test]
    fn skill_tokens_round_trip() {
        let token = CallbackToken::for_skill("deploy");

        assert_eq!(token.to_string(), "v=1;skill=deploy");
        assert_eq!("v=1;skill=deploy".parse::<CallbackToken>(), Ok(token));
    }

    #[test]
    fn segment_order_is_not_significant() {
        let token: CallbackToken = "ctx=abc; handler=deploy.confirm ;v=1".parse().expect("parse");

        assert_eq!(token.target, CallbackTarget::Handler("deploy.confirm".to_owned()));
        assert_eq!(token.context.as_deref(), Some("abc"));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let cases = [
            ("", CallbackTokenError::Empty),
            ("   ", CallbackTokenError::Empty),
            ("v=2;handler=x", CallbackTokenError::UnsupportedVersion("2".to_owned())),
            ("handler=x", CallbackTokenError::UnsupportedVersion(String::new())),
            ("v=1;handler", CallbackTokenError::MalformedSegment("handler".to_owned())),
            ("v=1;handler=%zz", CallbackTokenError::MalformedSegment("handler=%zz".to_owned())),
            ("v=1;handler=x;handler=y", CallbackTokenError::DuplicateKey("handler".to_owned())),
            ("v=1;handler=x;kind=y", CallbackTokenError::UnknownKey("kind".to_owned())),
            ("v=1;handler=x;skill=y", CallbackTokenError::ConflictingTargets),
            ("v=1;handler=", CallbackTokenError::MissingTarget),
            ("v=1;ctx=abc", CallbackTokenError::MissingTarget),
        ];

        for (raw, expected) in cases {
            assert_eq!(raw.parse::<CallbackToken>(), Err(expected), "token `{raw}`");
        }
    }

    #[test]
    fn legacy_type_names_do_not_parse() {
        assert_eq!(parse_callback_token("Acme.Skills.ApprovalHandler, Acme"), None);
    }

    #[test]
    fn truncated_percent_escapes_are_rejected() {
        for raw in ["v=1;skill=abc%4", "v=1;skill=abc%", "v=1;skill=%FF"] {
            let segment = raw.trim_start_matches("v=1;").to_owned();
            assert_eq!(
                raw.parse::<CallbackToken>(),
                Err(CallbackTokenError::MalformedSegment(segment)),
                "token `{raw}`"
            );
        }

        let token: CallbackToken = "v=1;skill=a%41;ctx=run%2042".parse().expect("parse");
        assert_eq!(token.target, CallbackTarget::Skill("aA".to_owned()));
        assert_eq!(token.context.as_deref(), Some("run 42"));
    }

    #[test]
    fn encoded_values_never_contain_separators() {
        let token = CallbackToken::for_skill("deploy;v=2").with_context("a=b;c d");

        assert_eq!(token.encode(), "v=1;skill=deploy%3Bv%3D2;ctx=a%3Db%3Bc%20d");
        assert_eq!(token.encode().parse::<CallbackToken>(), Ok(token));
    }

    #[test]
    fn registry_lookups_are_exact() {
        let registry = InteractionRegistry::new([Arc::new(Confirm) as Arc<dyn InteractionHandler>]);

        assert!(registry.get("deploy.confirm").is_some());
        assert!(registry.get("Deploy.Confirm").is_none());
        assert_eq!(registry.ids(), vec!["deploy.confirm"]);
    }
}
