use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use super::conversation::{Conversation, SessionPhase, TurnTicket};
use super::turn::{ConversationTurn, TurnId};
use crate::app::Config;
use crate::avatar::{AvatarCoordinator, AvatarImage, AvatarState};
use crate::client::{AdviceService, ContinuityToken};
use crate::constants::VERIFIED_MESSAGE;
use crate::identity::{IdentityCoordinator, IdentityRecord, IdentityState};
use crate::notice::{NoticeKind, NotificationTimer, TransientNotification};
use crate::utils::{GenieError, SubmitError};

/// One user's session with the Lox Genie
///
/// Wires the handle-entry and question-entry surfaces to the coordinators:
/// the first question is gated on a verified handle, verification kicks off
/// the avatar lookup in the background, and follow-ups go straight to the
/// conversation. Each piece of state has exactly one owner; locks are only
/// held between awaits.
pub struct SessionOrchestrator {
    service: Arc<dyn AdviceService>,
    identity: Mutex<IdentityCoordinator>,
    avatar: AvatarCoordinator,
    conversation: Mutex<Conversation>,
    notices: NotificationTimer,
}

impl SessionOrchestrator {
    pub fn new(service: Arc<dyn AdviceService>, config: &Config) -> Self {
        Self {
            avatar: AvatarCoordinator::new(Arc::clone(&service), config.backend.avatar_timeout()),
            service,
            identity: Mutex::new(IdentityCoordinator::new()),
            conversation: Mutex::new(Conversation::new()),
            notices: NotificationTimer::from_config(&config.notifications),
        }
    }

    // Handle entry

    /// The handle input changed. Verification and avatar are dropped.
    pub fn edit_handle(&self, raw: &str) {
        self.identity.lock().edit_handle(raw);
        self.avatar.invalidate();
    }

    /// Verify the current handle and report the outcome as a notification
    ///
    /// A `Valid` outcome also starts the avatar lookup without waiting for it.
    pub async fn verify_handle(&self) -> Result<IdentityState, SubmitError> {
        let ticket = self.identity.lock().begin()?;
        let handle = ticket.handle().to_string();

        let outcome = self.service.verify_identity(handle.clone()).await;

        let applied = self.identity.lock().finish(ticket, outcome).cloned();
        let Some(state) = applied else {
            // The handle was edited while we waited
            return Ok(self.identity_state());
        };

        match &state {
            IdentityState::Valid => {
                self.notices.show(VERIFIED_MESSAGE, NoticeKind::Success);
                self.avatar.prefetch(&handle);
            }
            IdentityState::Invalid(reason) => {
                self.notices.show(reason.clone(), NoticeKind::Error);
            }
            IdentityState::Idle | IdentityState::Verifying => {}
        }
        Ok(state)
    }

    // Question entry

    /// Ask the opening question of the session
    ///
    /// Verifies the handle first unless it is already `Valid`; nothing is
    /// appended to the transcript when that verification fails.
    pub async fn ask_genie(&self, question: &str) -> Result<TurnId, SubmitError> {
        if question.trim().is_empty() {
            return Err(SubmitError::EmptyQuestion);
        }
        if self.conversation.lock().has_started() {
            return Err(SubmitError::ConversationStarted);
        }

        let already_valid = self.identity.lock().is_valid();
        if !already_valid {
            match self.verify_handle().await? {
                IdentityState::Valid => {}
                IdentityState::Invalid(reason) => {
                    return Err(SubmitError::IdentityRejected(reason));
                }
                IdentityState::Idle | IdentityState::Verifying => {
                    return Err(SubmitError::IdentityRejected(
                        "Username changed before it could be verified".to_string(),
                    ));
                }
            }
        }

        // No-op when verification already started the lookup for this handle
        let handle = self.identity.lock().record().map(|r| r.handle.clone());
        if let Some(handle) = handle {
            self.avatar.prefetch(&handle);
        }

        let ticket = self.conversation.lock().begin_initial(question)?;
        Ok(self.run_turn(ticket).await)
    }

    /// Ask a follow-up question, continuing the same thread
    pub async fn follow_up(&self, question: &str) -> Result<TurnId, SubmitError> {
        let ticket = self.conversation.lock().begin_follow_up(question)?;
        Ok(self.run_turn(ticket).await)
    }

    async fn run_turn(&self, ticket: TurnTicket) -> TurnId {
        let id = ticket.id();
        debug!(turn_id = %id, "sending turn");
        let outcome = self
            .service
            .send_turn(ticket.question().to_string(), ticket.continuity().cloned())
            .await;
        self.conversation.lock().complete(ticket, outcome);
        id
    }

    /// Ask the service to invent a question for the user
    pub async fn suggest_question(&self) -> Result<String, GenieError> {
        self.service.generate_suggestion().await
    }

    /// Release everything the session holds
    pub fn teardown(&self) {
        info!("tearing down session");
        self.avatar.teardown();
        self.notices.dismiss();
    }

    // Views for renderers

    pub fn transcript(&self) -> Vec<ConversationTurn> {
        self.conversation.lock().turns().to_vec()
    }

    pub fn turn(&self, id: TurnId) -> Option<ConversationTurn> {
        self.conversation.lock().turn(id).cloned()
    }

    pub fn phase(&self) -> SessionPhase {
        self.conversation.lock().phase()
    }

    pub fn continuity(&self) -> Option<ContinuityToken> {
        self.conversation.lock().continuity().cloned()
    }

    pub fn has_started(&self) -> bool {
        self.conversation.lock().has_started()
    }

    pub fn identity_state(&self) -> IdentityState {
        self.identity.lock().state().clone()
    }

    pub fn identity_record(&self) -> Option<IdentityRecord> {
        self.identity.lock().record().cloned()
    }

    pub fn raw_handle(&self) -> String {
        self.identity.lock().raw_handle().to_string()
    }

    pub fn avatar_state(&self) -> AvatarState {
        self.avatar.state()
    }

    pub fn avatar(&self) -> Option<AvatarImage> {
        self.avatar.image()
    }

    pub fn notification(&self) -> Option<TransientNotification> {
        self.notices.current()
    }

    pub fn subscribe_notifications(&self) -> watch::Receiver<Option<TransientNotification>> {
        self.notices.subscribe()
    }
}
