use std::path::PathBuf;

use thiserror::Error;

/// Optional platform capability a session can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Capability {
    #[strum(serialize = "immersive mode")]
    Immersive,
    #[strum(serialize = "wake lock")]
    WakeLock,
    #[strum(serialize = "audio output")]
    Audio,
}

/// A platform capability that is missing or refused. Never fatal: the session
/// carries on without it.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{capability} is unavailable: {reason}")]
    Unavailable {
        capability: Capability,
        reason: String,
    },
    #[error("{capability} request was rejected: {reason}")]
    Rejected {
        capability: Capability,
        reason: String,
    },
}

impl CapabilityError {
    pub fn unavailable(capability: Capability, reason: impl ToString) -> Self {
        Self::Unavailable {
            capability,
            reason: reason.to_string(),
        }
    }

    pub fn rejected(capability: Capability, reason: impl ToString) -> Self {
        Self::Rejected {
            capability,
            reason: reason.to_string(),
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            Self::Unavailable { capability, .. } | Self::Rejected { capability, .. } => *capability,
        }
    }
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to write preferences to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid value {value:?} stored under {key}")]
    InvalidValue { key: String, value: String },
}
