use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque value issued by the service that threads turns into one conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuityToken(String);

impl ContinuityToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A successful answer to one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    /// The advice text
    pub response: String,
    /// Token to echo on the next turn of this conversation
    pub continuity: ContinuityToken,
}

/// Profile returned when a handle exists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Anything else the service sent along
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    /// Best name to show for this user
    pub fn label<'a>(&'a self, handle: &'a str) -> &'a str {
        self.display_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(handle)
    }
}

/// Outcome of looking a handle up
///
/// An unknown handle is an expected answer, not a fault, so it lives here
/// rather than in [`GenieError`](crate::utils::GenieError).
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Verified(UserProfile),
    NotFound { reason: String },
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified(_))
    }
}

// Wire structures

#[derive(Debug, Deserialize)]
pub(crate) struct GenieReply {
    pub response: String,
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WishReply {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HealthReply {
    pub status: String,
}
