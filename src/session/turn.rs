use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

/// Stable local identifier assigned to a turn when it is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TurnId(u64);

impl TurnId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a single turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    Pending,
    Fulfilled,
    Failed,
}

/// One question and, once it resolves, its response or failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub question: String,
    pub response: Option<String>,
    pub status: TurnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub submitted_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Local>>,
}

impl ConversationTurn {
    pub(crate) fn pending(id: TurnId, question: String) -> Self {
        Self {
            id,
            question,
            response: None,
            status: TurnStatus::Pending,
            error_message: None,
            submitted_at: Local::now(),
            resolved_at: None,
        }
    }

    pub(crate) fn fulfill(&mut self, response: String) {
        self.response = Some(response);
        self.status = TurnStatus::Fulfilled;
        self.resolved_at = Some(Local::now());
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.error_message = Some(message);
        self.status = TurnStatus::Failed;
        self.resolved_at = Some(Local::now());
    }

    pub fn is_pending(&self) -> bool {
        self.status == TurnStatus::Pending
    }
}
