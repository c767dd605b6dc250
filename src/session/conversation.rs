use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use super::turn::{ConversationTurn, TurnId};
use crate::client::{ContinuityToken, TurnReply};
use crate::utils::{GenieError, SubmitError};

static NEXT_CONVERSATION: AtomicU64 = AtomicU64::new(1);

/// Where the conversation is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    /// Nothing asked yet
    Empty,
    /// The first question is in flight
    AwaitingInitialResponse,
    /// The conversation is under way
    Steady { awaiting_follow_up: bool },
}

/// Permission to run one network turn, handed out by [`Conversation`]
///
/// Carries the continuity token captured when the turn was started. It must be
/// handed back to [`Conversation::complete`] with the outcome.
#[derive(Debug)]
pub struct TurnTicket {
    conversation: u64,
    id: TurnId,
    question: String,
    continuity: Option<ContinuityToken>,
}

impl TurnTicket {
    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn continuity(&self) -> Option<&ContinuityToken> {
        self.continuity.as_ref()
    }
}

/// Ordered transcript plus the continuity token; allows one turn in flight
#[derive(Debug)]
pub struct Conversation {
    // Distinguishes tickets issued by different conversations with equal turn ids
    key: u64,
    turns: Vec<ConversationTurn>,
    continuity: Option<ContinuityToken>,
    phase: SessionPhase,
    in_flight: Option<TurnId>,
    next_id: u64,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            key: NEXT_CONVERSATION.fetch_add(1, Ordering::Relaxed),
            turns: Vec::new(),
            continuity: None,
            phase: SessionPhase::Empty,
            in_flight: None,
            next_id: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Turns in submission order
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn turn(&self, id: TurnId) -> Option<&ConversationTurn> {
        self.turns.iter().find(|t| t.id == id)
    }

    pub fn continuity(&self) -> Option<&ContinuityToken> {
        self.continuity.as_ref()
    }

    pub fn has_started(&self) -> bool {
        self.phase != SessionPhase::Empty
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start the first turn of the session
    pub fn begin_initial(&mut self, question: &str) -> Result<TurnTicket, SubmitError> {
        if self.has_started() {
            return Err(SubmitError::ConversationStarted);
        }
        let ticket = self.open_turn(question)?;
        self.phase = SessionPhase::AwaitingInitialResponse;
        Ok(ticket)
    }

    /// Start a follow-up turn. Refused, not queued, while another turn is in flight.
    pub fn begin_follow_up(&mut self, question: &str) -> Result<TurnTicket, SubmitError> {
        match self.phase {
            SessionPhase::Empty => return Err(SubmitError::ConversationNotStarted),
            SessionPhase::AwaitingInitialResponse
            | SessionPhase::Steady {
                awaiting_follow_up: true,
            } => {
                debug!("follow-up refused, a turn is already in flight");
                return Err(SubmitError::TurnInFlight);
            }
            SessionPhase::Steady {
                awaiting_follow_up: false,
            } => {}
        }
        let ticket = self.open_turn(question)?;
        self.phase = SessionPhase::Steady {
            awaiting_follow_up: true,
        };
        Ok(ticket)
    }

    /// Append the pending placeholder before the network call is made
    fn open_turn(&mut self, question: &str) -> Result<TurnTicket, SubmitError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SubmitError::EmptyQuestion);
        }
        if self.in_flight.is_some() {
            return Err(SubmitError::TurnInFlight);
        }

        self.next_id += 1;
        let id = TurnId::new(self.next_id);
        self.turns
            .push(ConversationTurn::pending(id, question.to_string()));
        self.in_flight = Some(id);

        debug!(turn_id = %id, thread_id = self.continuity.as_ref().map(|t| t.as_str()), "turn opened");

        Ok(TurnTicket {
            conversation: self.key,
            id,
            question: question.to_string(),
            continuity: self.continuity.clone(),
        })
    }

    /// Record the outcome of the call started with `ticket`
    ///
    /// Success replaces the continuity token with the one just returned; failure
    /// leaves the previous token in place so the session can carry on.
    pub fn complete(
        &mut self,
        ticket: TurnTicket,
        outcome: Result<TurnReply, GenieError>,
    ) -> Option<&ConversationTurn> {
        if ticket.conversation != self.key {
            warn!(turn_id = %ticket.id, "ignoring outcome for a turn from another conversation");
            return None;
        }
        if self.in_flight != Some(ticket.id) {
            warn!(turn_id = %ticket.id, "ignoring outcome for a turn that is not in flight");
            return None;
        }
        self.in_flight = None;
        self.phase = SessionPhase::Steady {
            awaiting_follow_up: false,
        };

        let index = self.turns.iter().rposition(|t| t.id == ticket.id)?;
        // Only the newest turn can be pending
        debug_assert_eq!(index, self.turns.len() - 1);

        let turn = &mut self.turns[index];
        match outcome {
            Ok(reply) => {
                info!(turn_id = %ticket.id, thread_id = %reply.continuity, "turn fulfilled");
                turn.fulfill(reply.response);
                self.continuity = Some(reply.continuity);
            }
            Err(e) => {
                warn!(turn_id = %ticket.id, error = %e, "turn failed");
                turn.fail(e.user_message());
            }
        }

        Some(&self.turns[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AdviceService, MockAdviceService};
    use crate::constants::UNREACHABLE_MESSAGE;
    use crate::session::TurnStatus;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;

    fn reply(response: &str, thread_id: &str) -> TurnReply {
        TurnReply {
            response: response.to_string(),
            continuity: ContinuityToken::new(thread_id),
        }
    }

    /// Run one turn against `service` the way the orchestrator does
    async fn run(conversation: &mut Conversation, service: &dyn AdviceService, question: &str) {
        let ticket = if conversation.has_started() {
            conversation.begin_follow_up(question).unwrap()
        } else {
            conversation.begin_initial(question).unwrap()
        };
        let outcome = service
            .send_turn(ticket.question().to_string(), ticket.continuity().cloned())
            .await;
        conversation.complete(ticket, outcome);
    }

    #[tokio::test]
    async fn test_token_threads_through_follow_ups() {
        let mut service = MockAdviceService::new();
        let mut seq = Sequence::new();
        service
            .expect_send_turn()
            .with(eq("Should I start X?".to_string()), eq(None))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(reply("Yes", "abc")));
        service
            .expect_send_turn()
            .with(eq("Why?".to_string()), eq(Some(ContinuityToken::new("abc"))))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(reply("Because...", "abc2")));

        let mut conversation = Conversation::new();
        run(&mut conversation, &service, "Should I start X?").await;
        assert_eq!(conversation.continuity(), Some(&ContinuityToken::new("abc")));

        run(&mut conversation, &service, "Why?").await;
        assert_eq!(conversation.continuity(), Some(&ContinuityToken::new("abc2")));

        let transcript: Vec<_> = conversation
            .turns()
            .iter()
            .map(|t| (t.question.as_str(), t.response.as_deref(), t.status))
            .collect();
        assert_eq!(
            transcript,
            vec![
                ("Should I start X?", Some("Yes"), TurnStatus::Fulfilled),
                ("Why?", Some("Because..."), TurnStatus::Fulfilled),
            ]
        );
    }

    #[tokio::test]
    async fn test_each_call_uses_previous_token() {
        let mut service = MockAdviceService::new();
        let mut seq = Sequence::new();
        let mut expected = None;
        for n in 1..=4 {
            let token = format!("t{}", n);
            service
                .expect_send_turn()
                .with(eq(format!("q{}", n)), eq(expected.clone()))
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |q, _| Ok(reply(&format!("a-{}", q), &token)));
            expected = Some(ContinuityToken::new(format!("t{}", n)));
        }

        let mut conversation = Conversation::new();
        for n in 1..=4 {
            run(&mut conversation, &service, &format!("q{}", n)).await;
        }

        assert_eq!(conversation.turns().len(), 4);
        for (n, turn) in conversation.turns().iter().enumerate() {
            assert_eq!(turn.question, format!("q{}", n + 1));
            assert_eq!(turn.response, Some(format!("a-q{}", n + 1)));
        }
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_token() {
        let mut service = MockAdviceService::new();
        let mut seq = Sequence::new();
        service
            .expect_send_turn()
            .with(eq("Should I start X?".to_string()), eq(None))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(reply("Yes", "abc")));
        service
            .expect_send_turn()
            .with(eq("Why?".to_string()), eq(Some(ContinuityToken::new("abc"))))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(GenieError::Unreachable("connection refused".into())));
        service
            .expect_send_turn()
            .with(eq("Still there?".to_string()), eq(Some(ContinuityToken::new("abc"))))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(reply("Yes", "abc3")));

        let mut conversation = Conversation::new();
        run(&mut conversation, &service, "Should I start X?").await;
        run(&mut conversation, &service, "Why?").await;

        let failed = &conversation.turns()[1];
        assert_eq!(failed.status, TurnStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some(UNREACHABLE_MESSAGE));
        assert_eq!(failed.response, None);
        assert_eq!(conversation.continuity(), Some(&ContinuityToken::new("abc")));
        assert_eq!(
            conversation.phase(),
            SessionPhase::Steady {
                awaiting_follow_up: false
            }
        );

        run(&mut conversation, &service, "Still there?").await;
        assert_eq!(conversation.turns().len(), 3);
    }

    #[test]
    fn test_follow_up_while_awaiting_is_a_no_op() {
        let mut conversation = Conversation::new();
        let first = conversation.begin_initial("Should I start X?").unwrap();
        conversation.complete(first, Ok(reply("Yes", "abc")));

        let _in_flight = conversation.begin_follow_up("Why?").unwrap();
        assert_eq!(conversation.turns().len(), 2);

        assert_eq!(
            conversation.begin_follow_up("And then?").unwrap_err(),
            SubmitError::TurnInFlight
        );
        assert_eq!(conversation.turns().len(), 2);
        assert!(conversation.turns()[1].is_pending());
    }

    #[test]
    fn test_follow_up_refused_during_initial_turn() {
        let mut conversation = Conversation::new();
        let _initial = conversation.begin_initial("Should I start X?").unwrap();
        assert_eq!(conversation.phase(), SessionPhase::AwaitingInitialResponse);

        assert_eq!(
            conversation.begin_follow_up("Why?").unwrap_err(),
            SubmitError::TurnInFlight
        );
        assert_eq!(conversation.turns().len(), 1);
    }

    #[test]
    fn test_placeholder_is_inserted_before_resolution() {
        let mut conversation = Conversation::new();
        let ticket = conversation.begin_initial("  Should I start X?  ").unwrap();

        assert_eq!(ticket.question(), "Should I start X?");
        assert_eq!(ticket.continuity(), None);
        let turn = conversation.turn(ticket.id()).unwrap();
        assert_eq!(turn.status, TurnStatus::Pending);
        assert_eq!(turn.response, None);
        assert!(conversation.is_busy());
    }

    #[test]
    fn test_refusals() {
        let mut conversation = Conversation::new();
        assert_eq!(
            conversation.begin_follow_up("Why?").unwrap_err(),
            SubmitError::ConversationNotStarted
        );
        assert_eq!(
            conversation.begin_initial("   ").unwrap_err(),
            SubmitError::EmptyQuestion
        );
        assert_eq!(conversation.phase(), SessionPhase::Empty);

        let ticket = conversation.begin_initial("Should I start X?").unwrap();
        conversation.complete(ticket, Ok(reply("Yes", "abc")));
        assert_eq!(
            conversation.begin_initial("Again?").unwrap_err(),
            SubmitError::ConversationStarted
        );
        assert_eq!(conversation.turns().len(), 1);
    }

    #[test]
    fn test_initial_failure_still_allows_follow_up() {
        let mut conversation = Conversation::new();
        let ticket = conversation.begin_initial("Should I start X?").unwrap();
        conversation.complete(ticket, Err(GenieError::Timeout));

        assert_eq!(conversation.continuity(), None);
        let retry = conversation.begin_follow_up("Should I start X?").unwrap();
        assert_eq!(retry.continuity(), None);
    }

    #[test]
    fn test_foreign_ticket_is_ignored() {
        let mut a = Conversation::new();
        let mut b = Conversation::new();
        let ticket_a = a.begin_initial("first").unwrap();
        let ticket_b = b.begin_initial("first").unwrap();
        a.complete(ticket_a, Ok(reply("done", "abc")));

        // Same id, but `a` has nothing in flight any more
        assert!(a.complete(ticket_b, Ok(reply("late", "zzz"))).is_none());
        assert_eq!(a.turns()[0].response.as_deref(), Some("done"));
        assert_eq!(a.continuity(), Some(&ContinuityToken::new("abc")));
    }

    #[test]
    fn test_foreign_ticket_rejected_while_turn_in_flight() {
        let mut a = Conversation::new();
        let mut b = Conversation::new();
        let ticket_a = a.begin_initial("first").unwrap();
        let ticket_b = b.begin_initial("first").unwrap();
        assert_eq!(ticket_a.id(), ticket_b.id());

        // `a` is waiting on the same turn id, but the ticket is not its own
        assert!(a.complete(ticket_b, Ok(reply("intruder", "zzz"))).is_none());
        assert!(a.is_busy());
        assert_eq!(a.phase(), SessionPhase::AwaitingInitialResponse);
        assert!(a.turns()[0].is_pending());
        assert_eq!(a.continuity(), None);

        let turn = a.complete(ticket_a, Ok(reply("mine", "abc"))).unwrap();
        assert_eq!(turn.response.as_deref(), Some("mine"));
        assert_eq!(a.continuity(), Some(&ContinuityToken::new("abc")));
    }
}
