use crate::identity::IdentityState;
use crate::session::SessionPhase;

/// What a line typed into the chat surface asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineAction<'a> {
    Ignore,
    Quit,
    History,
    Wish,
    Unknown(&'a str),
    /// Edit and verify the handle
    ChangeHandle(&'a str),
    /// `/handle` once the conversation has started
    HandleLocked,
    /// The opening question
    Ask(&'a str),
    FollowUp(&'a str),
    /// A question typed while the previous answer is still pending
    Busy,
}

/// Whether the session is waiting on the service for an answer
pub(crate) fn awaiting_answer(phase: SessionPhase) -> bool {
    matches!(
        phase,
        SessionPhase::AwaitingInitialResponse
            | SessionPhase::Steady {
                awaiting_follow_up: true
            }
    )
}

/// Decide what to do with one line of input
///
/// Before the handle is verified plain lines are taken as the handle.
pub(crate) fn classify_line<'a>(
    line: &'a str,
    phase: SessionPhase,
    identity: &IdentityState,
) -> LineAction<'a> {
    let line = line.trim();
    if line.is_empty() {
        return LineAction::Ignore;
    }

    if let Some(command) = line.strip_prefix('/') {
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map(|(n, a)| (n, a.trim()))
            .unwrap_or((command, ""));
        return match name {
            "quit" | "exit" => LineAction::Quit,
            "history" => LineAction::History,
            "wish" => LineAction::Wish,
            "handle" if phase != SessionPhase::Empty => LineAction::HandleLocked,
            "handle" => LineAction::ChangeHandle(arg),
            other => LineAction::Unknown(other),
        };
    }

    if awaiting_answer(phase) {
        return LineAction::Busy;
    }
    match phase {
        SessionPhase::Empty if *identity == IdentityState::Valid => LineAction::Ask(line),
        SessionPhase::Empty => LineAction::ChangeHandle(line),
        _ => LineAction::FollowUp(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IN_FLIGHT: SessionPhase = SessionPhase::Steady {
        awaiting_follow_up: true,
    };
    const IDLE: SessionPhase = SessionPhase::Steady {
        awaiting_follow_up: false,
    };

    #[test]
    fn test_plain_lines_are_the_handle_until_verified() {
        for state in [
            IdentityState::Idle,
            IdentityState::Verifying,
            IdentityState::Invalid("Username ghost not found on Sleeper".to_string()),
        ] {
            assert_eq!(
                classify_line(" coach123 ", SessionPhase::Empty, &state),
                LineAction::ChangeHandle("coach123")
            );
        }
        assert_eq!(
            classify_line("Start Bijan?", SessionPhase::Empty, &IdentityState::Valid),
            LineAction::Ask("Start Bijan?")
        );
    }

    #[test]
    fn test_questions_refused_while_answer_pending() {
        for phase in [SessionPhase::AwaitingInitialResponse, IN_FLIGHT] {
            assert!(awaiting_answer(phase));
            assert_eq!(
                classify_line("What about Jahmyr?", phase, &IdentityState::Valid),
                LineAction::Busy
            );
        }
        assert!(!awaiting_answer(IDLE));
        assert_eq!(
            classify_line("What about Jahmyr?", IDLE, &IdentityState::Valid),
            LineAction::FollowUp("What about Jahmyr?")
        );
    }

    #[test]
    fn test_handle_locked_after_start() {
        assert_eq!(
            classify_line("/handle other", SessionPhase::Empty, &IdentityState::Valid),
            LineAction::ChangeHandle("other")
        );
        for phase in [SessionPhase::AwaitingInitialResponse, IN_FLIGHT, IDLE] {
            assert_eq!(
                classify_line("/handle other", phase, &IdentityState::Valid),
                LineAction::HandleLocked
            );
        }
    }

    #[test]
    fn test_commands_work_mid_turn() {
        assert_eq!(classify_line("   ", IN_FLIGHT, &IdentityState::Valid), LineAction::Ignore);
        assert_eq!(classify_line("/quit", IN_FLIGHT, &IdentityState::Valid), LineAction::Quit);
        assert_eq!(classify_line("/history", IN_FLIGHT, &IdentityState::Valid), LineAction::History);
        assert_eq!(classify_line("/wish", IDLE, &IdentityState::Valid), LineAction::Wish);
        assert_eq!(
            classify_line("/dance now", IDLE, &IdentityState::Valid),
            LineAction::Unknown("dance")
        );
    }
}
