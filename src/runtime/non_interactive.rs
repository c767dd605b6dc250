use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::{
    avatar::AvatarState,
    cli::OutputFormat,
    identity::IdentityState,
    session::{ConversationTurn, SessionOrchestrator, TurnStatus},
    utils::SubmitError,
};

/// Result of a non-interactive run
#[derive(Debug, Serialize)]
pub struct NonInteractiveResult {
    /// The handle the question was asked under
    pub handle: String,
    /// The question that was asked
    pub question: String,
    /// Where verification of the handle ended up
    pub identity: IdentityState,
    /// Every turn of the session, in order
    pub transcript: Vec<ConversationTurn>,
    /// Any errors that occurred
    pub errors: Vec<String>,
    /// Metadata about the execution
    pub metadata: ExecutionMetadata,
}

#[derive(Debug, Serialize)]
pub struct ExecutionMetadata {
    /// API the session talked to
    pub api_url: String,
    /// Conversation thread, when the service opened one
    pub thread_id: Option<String>,
    /// Execution time in milliseconds
    pub duration_ms: u128,
    /// Avatar outcome at the end of the run
    pub avatar: AvatarState,
}

/// Asks a single question without the interactive surface
pub struct NonInteractiveRunner {
    session: Arc<SessionOrchestrator>,
    api_url: String,
}

impl NonInteractiveRunner {
    pub fn new(session: Arc<SessionOrchestrator>, api_url: impl Into<String>) -> Self {
        Self {
            session,
            api_url: api_url.into(),
        }
    }

    /// Verify `handle`, ask `question` and collect the outcome
    pub async fn execute(&self, handle: &str, question: &str) -> Result<NonInteractiveResult> {
        let start_time = std::time::Instant::now();
        let mut errors = Vec::new();

        self.session.edit_handle(handle);
        match self.session.ask_genie(question).await {
            Ok(id) => {
                if let Some(turn) = self.session.turn(id) {
                    if turn.status == TurnStatus::Failed {
                        errors.push(turn.error_message.unwrap_or_default());
                    }
                }
            }
            Err(SubmitError::IdentityRejected(reason)) => errors.push(reason),
            Err(e) => errors.push(e.to_string()),
        }

        let result = NonInteractiveResult {
            handle: handle.trim().to_string(),
            question: question.trim().to_string(),
            identity: self.session.identity_state(),
            transcript: self.session.transcript(),
            errors,
            metadata: ExecutionMetadata {
                api_url: self.api_url.clone(),
                thread_id: self.session.continuity().map(|t| t.as_str().to_string()),
                duration_ms: start_time.elapsed().as_millis(),
                avatar: self.session.avatar_state(),
            },
        };
        info!(
            duration_ms = result.metadata.duration_ms as u64,
            errors = result.errors.len(),
            "non-interactive run finished"
        );

        self.session.teardown();
        Ok(result)
    }

    /// Format the result according to the output format
    pub fn format_result(&self, result: &NonInteractiveResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_else(|e| {
                format!("{{\"error\": \"Failed to serialize result: {}\"}}", e)
            }),
            OutputFormat::Text => {
                let mut output = String::new();
                for turn in &result.transcript {
                    if let Some(ref response) = turn.response {
                        output.push_str(response);
                        output.push('\n');
                    }
                }

                if !result.errors.is_empty() {
                    output.push_str("\n--- Errors ---\n");
                    for error in &result.errors {
                        output.push_str(&format!("• {}\n", error));
                    }
                }

                output
            }
            OutputFormat::Markdown => {
                let mut output = String::new();

                for turn in &result.transcript {
                    output.push_str(&format!("## {}\n\n", turn.question));
                    match turn.status {
                        TurnStatus::Fulfilled => {
                            output.push_str(turn.response.as_deref().unwrap_or_default());
                        }
                        TurnStatus::Failed => output.push_str(&format!(
                            "> **Error:** {}",
                            turn.error_message.as_deref().unwrap_or_default()
                        )),
                        TurnStatus::Pending => output.push_str("_No answer yet._"),
                    }
                    output.push_str("\n\n");
                }

                if !result.errors.is_empty() {
                    output.push_str("## Errors\n\n");
                    for error in &result.errors {
                        output.push_str(&format!("- {}\n", error));
                    }
                    output.push('\n');
                }

                output.push_str("---\n");
                output.push_str(&format!(
                    "*User: {} | Thread: {} | Duration: {}ms*\n",
                    result.handle,
                    result.metadata.thread_id.as_deref().unwrap_or("none"),
                    result.metadata.duration_ms
                ));

                output
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Config;
    use crate::client::{ContinuityToken, MockAdviceService, TurnReply, UserProfile, Verification};
    use crate::constants::TIMEOUT_MESSAGE;
    use crate::utils::GenieError;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    fn runner(service: MockAdviceService) -> NonInteractiveRunner {
        let session = SessionOrchestrator::new(Arc::new(service), &Config::default());
        NonInteractiveRunner::new(Arc::new(session), "http://localhost:8000")
    }

    fn verified_service() -> MockAdviceService {
        let mut service = MockAdviceService::new();
        service.expect_verify_identity().returning(|h| {
            Ok(Verification::Verified(UserProfile {
                username: Some(h),
                ..UserProfile::default()
            }))
        });
        service.expect_fetch_avatar().returning(|_| None);
        service
    }

    #[tokio::test]
    async fn test_successful_run() {
        let mut service = verified_service();
        service
            .expect_send_turn()
            .with(eq("Start Bijan?".to_string()), eq(None))
            .times(1)
            .returning(|_, _| {
                Ok(TurnReply {
                    response: "Yes, start him.".to_string(),
                    continuity: ContinuityToken::new("t1"),
                })
            });

        let runner = runner(service);
        let result = runner.execute(" coach123 ", "Start Bijan?").await.unwrap();

        assert!(result.errors.is_empty());
        assert_eq!(result.handle, "coach123");
        assert_eq!(result.identity, IdentityState::Valid);
        assert_eq!(result.metadata.thread_id.as_deref(), Some("t1"));
        assert_eq!(
            runner.format_result(&result, OutputFormat::Text),
            "Yes, start him.\n"
        );

        let markdown = runner.format_result(&result, OutputFormat::Markdown);
        assert!(markdown.starts_with("## Start Bijan?\n\nYes, start him."));
        assert!(markdown.contains("Thread: t1"));

        let json: serde_json::Value =
            serde_json::from_str(&runner.format_result(&result, OutputFormat::Json)).unwrap();
        assert_eq!(json["identity"]["state"], "valid");
        assert_eq!(json["transcript"][0]["status"], "fulfilled");
    }

    #[tokio::test]
    async fn test_unknown_handle_is_reported() {
        let mut service = MockAdviceService::new();
        service.expect_verify_identity().returning(|_| {
            Ok(Verification::NotFound {
                reason: "Username ghost not found on Sleeper".to_string(),
            })
        });
        service.expect_send_turn().never();

        let result = runner(service).execute("ghost", "Start Bijan?").await.unwrap();

        assert_eq!(result.errors, vec!["Username ghost not found on Sleeper".to_string()]);
        assert!(result.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_failed_turn_is_reported() {
        let mut service = verified_service();
        service
            .expect_send_turn()
            .returning(|_, _| Err(GenieError::Timeout));

        let runner = runner(service);
        let result = runner.execute("coach123", "Start Bijan?").await.unwrap();

        assert_eq!(result.errors, vec![TIMEOUT_MESSAGE.to_string()]);
        assert_eq!(result.metadata.thread_id, None);
        assert!(runner
            .format_result(&result, OutputFormat::Markdown)
            .contains(&format!("> **Error:** {}", TIMEOUT_MESSAGE)));
    }
}
