use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message keys the profile view resolves through the locale catalog.
pub mod keys {
    pub const ID_NOT_PROVIDED: &str = "id-not-provided";
    pub const PROFILE_NOT_FOUND: &str = "profile-not-found";
    pub const ERROR_FETCHING_PROFILE: &str = "error-fetching-profile";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileErrorKind {
    /// No profile id in the route.
    MissingIdentifier,
    /// Success-shaped response carrying a message such as `not-found` or `blocked`.
    SoftProfileError,
    /// The lookup threw or came back non-OK.
    TransportError,
    /// Visit-log and poll failures. Logged, never shown.
    SilentError,
}

/// What the view renders when something went wrong: the kind plus a message
/// key (or raw error text) to push through the translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewError {
    pub kind: ProfileErrorKind,
    pub key: String,
}

impl ViewError {
    pub fn new(kind: ProfileErrorKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profile id not provided")]
    MissingIdentifier,
    #[error("profile lookup refused: {0}")]
    Soft(String),
    #[error("profile lookup failed: {0}")]
    Transport(String),
}

impl ProfileError {
    pub fn kind(&self) -> ProfileErrorKind {
        match self {
            Self::MissingIdentifier => ProfileErrorKind::MissingIdentifier,
            Self::Soft(_) => ProfileErrorKind::SoftProfileError,
            Self::Transport(_) => ProfileErrorKind::TransportError,
        }
    }

    pub fn message_key(&self) -> &str {
        match self {
            Self::MissingIdentifier => keys::ID_NOT_PROVIDED,
            Self::Soft(key) | Self::Transport(key) => key,
        }
    }
}

impl From<ProfileError> for ViewError {
    fn from(value: ProfileError) -> Self {
        Self::new(value.kind(), value.message_key())
    }
}
