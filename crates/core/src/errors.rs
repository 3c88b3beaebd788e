use thiserror::Error;

/// Failure reported by one of the read-only repositories or the conversation tracker.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("decode error: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("routing was cancelled")]
    Cancelled,
}

impl RouteError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short machine-readable class used in structured logs and CLI payloads.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Repository(RepositoryError::Unavailable(_)) => "repository_unavailable",
            Self::Repository(RepositoryError::Decode(_)) => "repository_decode",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CallbackTokenError {
    #[error("callback token is empty")]
    Empty,
    #[error("unsupported callback token version `{0}`")]
    UnsupportedVersion(String),
    #[error("malformed callback token segment `{0}`")]
    MalformedSegment(String),
    #[error("duplicate callback token key `{0}`")]
    DuplicateKey(String),
    #[error("unknown callback token key `{0}`")]
    UnknownKey(String),
    #[error("callback token names both a handler and a skill")]
    ConflictingTargets,
    #[error("callback token has no target")]
    MissingTarget,
}
