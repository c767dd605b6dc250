use colored::Colorize;

use crate::avatar::AvatarState;
use crate::notice::{NoticeKind, NoticePhase, TransientNotification};
use crate::session::{ConversationTurn, TurnStatus};

const THINKING: &str = "Lox Genie is thinking...";

/// Question header plus the Genie's side of one turn
pub fn render_turn(turn: &ConversationTurn, handle: &str, avatar: AvatarState) -> String {
    // Placeholder icon unless an avatar image is actually held
    let marker = if avatar == AvatarState::Ready { "🖼 " } else { "👤" };

    let answer = match turn.status {
        TurnStatus::Pending => THINKING.dimmed().to_string(),
        TurnStatus::Fulfilled => turn.response.clone().unwrap_or_default(),
        TurnStatus::Failed => format!(
            "Error: {}",
            turn.error_message.as_deref().unwrap_or_default()
        )
        .red()
        .to_string(),
    };

    format!(
        "{} {}\n   {}\n🧞 {}\n",
        marker,
        handle.bold(),
        turn.question,
        answer
    )
}

/// Text for a notification, or `None` once it has cleared
pub fn render_notice(notice: &TransientNotification) -> Option<String> {
    let icon = match notice.kind {
        NoticeKind::Success => "✅",
        NoticeKind::Error => "❌",
    };
    let text = format!("{} {}", icon, notice.text);
    match notice.phase {
        NoticePhase::Active => Some(match notice.kind {
            NoticeKind::Success => text.green().to_string(),
            NoticeKind::Error => text.red().to_string(),
        }),
        NoticePhase::FadingOut => Some(text.dimmed().to_string()),
        NoticePhase::Cleared => None,
    }
}
