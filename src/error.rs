use std::path::PathBuf;

use thiserror::Error;

/// Typed failures surfaced by the prompt core.
///
/// Pipeline and renderer code only fails on structurally invalid input;
/// store and fetch failures are reported here and turned into user-facing
/// messages by the caller.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("no {kind} named '{name}'")]
    NotFound { kind: &'static str, name: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no prompts are currently loaded")]
    NoDataLoaded,

    #[error("tag source unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("persisted data in {} is unreadable: {reason}", path.display())]
    CorruptPersisted { path: PathBuf, reason: String },

    #[error("malformed {source_name} payload: {reason}")]
    MalformedPayload { source_name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PromptError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PromptError>;
