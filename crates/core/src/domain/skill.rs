use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::event::OrganizationId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkillId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternId(pub String);

/// A user-defined script owned by an organization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSkill {
    pub id: SkillId,
    pub name: String,
    pub organization_id: OrganizationId,
    pub language: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    RegularExpression,
    Contains,
    Exact,
    StartsWith,
    EndsWith,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegularExpression => "regular_expression",
            Self::Contains => "contains",
            Self::Exact => "exact",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "regular_expression" | "regex" => Some(Self::RegularExpression),
            "contains" => Some(Self::Contains),
            "exact" | "exact_match" => Some(Self::Exact),
            "starts_with" => Some(Self::StartsWith),
            "ends_with" => Some(Self::EndsWith),
            _ => None,
        }
    }
}

/// A rule that triggers its owning skill without the skill being named.
///
/// `created_at` is assigned once when the pattern is created and is the only
/// key used to order matches and to pick a winner among one skill's patterns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillPattern {
    pub id: PatternId,
    pub name: String,
    pub skill_id: SkillId,
    pub skill_name: String,
    pub organization_id: OrganizationId,
    pub pattern: String,
    pub kind: PatternKind,
    pub case_sensitive: bool,
    pub allow_external_callers: bool,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Named shortcut expanding to a target skill plus a fixed argument prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub target_skill: String,
    pub arguments: String,
    pub organization_id: OrganizationId,
}

/// Existing conversation a routed message can be attached to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRef {
    pub id: String,
    pub thread_id: String,
}
