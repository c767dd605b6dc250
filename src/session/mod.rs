/// Session management module - Gateway

mod conversation;
mod orchestrator;
mod turn;

pub use conversation::{Conversation, SessionPhase, TurnTicket};
pub use orchestrator::SessionOrchestrator;
pub use turn::{ConversationTurn, TurnId, TurnStatus};
