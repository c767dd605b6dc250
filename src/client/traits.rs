use async_trait::async_trait;

use super::image::ImageRef;
use super::types::{ContinuityToken, TurnReply, Verification};
use crate::utils::GenieError;

/// Everything the session needs from the Lox Genie backend
///
/// Implementations hold no session state; callers own every state transition.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdviceService: Send + Sync {
    /// Ask one question, continuing the conversation named by `continuity` if given
    async fn send_turn(
        &self,
        message: String,
        continuity: Option<ContinuityToken>,
    ) -> Result<TurnReply, GenieError>;

    /// Look a handle up. An unknown handle is `Ok(Verification::NotFound)`.
    async fn verify_identity(&self, handle: String) -> Result<Verification, GenieError>;

    /// Best-effort avatar download; every failure is `None`
    async fn fetch_avatar(&self, handle: String) -> Option<ImageRef>;

    /// Ask the service to invent a question
    async fn generate_suggestion(&self) -> Result<String, GenieError>;

    /// Whether the service reports itself healthy
    async fn check_health(&self) -> bool;
}
