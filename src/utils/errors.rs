use thiserror::Error;

use crate::constants::{GENERIC_FAILURE_MESSAGE, TIMEOUT_MESSAGE, UNREACHABLE_MESSAGE};

/// Failure of a call to the advice service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenieError {
    #[error("request timed out")]
    Timeout,

    #[error("service unreachable: {0}")]
    Unreachable(String),

    #[error("service rejected the request: {0}")]
    RemoteRejected(String),

    /// HTTP 500 without a usable `detail`; carries the text for the failed operation
    #[error("server error {status}")]
    ServerFault { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl GenieError {
    /// Text shown to the user in place of the missing response
    pub fn user_message(&self) -> String {
        match self {
            GenieError::Timeout => TIMEOUT_MESSAGE.to_string(),
            GenieError::Unreachable(_) => UNREACHABLE_MESSAGE.to_string(),
            GenieError::RemoteRejected(detail) => detail.clone(),
            GenieError::ServerFault { message, .. } => message.clone(),
            GenieError::MalformedResponse(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Classify a transport-level reqwest failure
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            GenieError::Timeout
        } else if err.is_decode() {
            GenieError::MalformedResponse(err.to_string())
        } else {
            GenieError::Unreachable(err.to_string())
        }
    }
}

/// Reasons a question submission is refused before any turn is recorded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error("handle is empty")]
    EmptyHandle,

    #[error("identity not verified: {0}")]
    IdentityRejected(String),

    #[error("a turn is already in flight")]
    TurnInFlight,

    #[error("the conversation has already started")]
    ConversationStarted,

    #[error("the conversation has not started yet")]
    ConversationNotStarted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(GenieError::Timeout.user_message(), TIMEOUT_MESSAGE);
        assert_eq!(
            GenieError::Unreachable("connection refused".into()).user_message(),
            UNREACHABLE_MESSAGE
        );
        assert_eq!(
            GenieError::RemoteRejected("Thread expired".into()).user_message(),
            "Thread expired"
        );
        assert_eq!(
            GenieError::MalformedResponse("eof".into()).user_message(),
            GENERIC_FAILURE_MESSAGE
        );
        assert_eq!(
            GenieError::ServerFault {
                status: 500,
                message: "Failed to generate wish. Please try again.".into(),
            }
            .user_message(),
            "Failed to generate wish. Please try again."
        );
    }
}
