use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::{JoinError, JoinSet};

use super::input::{awaiting_answer, classify_line, LineAction};
use super::render::{render_notice, render_turn};
use crate::{
    app::UIConfig,
    avatar::AvatarState,
    identity::IdentityState,
    session::{SessionOrchestrator, TurnId},
    utils::{log_debug, log_error, log_info, SubmitError},
};

const STILL_WAITING: &str = "⏳ Still waiting on the last answer. Try again in a moment.";

type TurnOutcome = Result<TurnId, SubmitError>;

enum Flow {
    Continue,
    Quit,
}

/// Line-based chat surface over a [`SessionOrchestrator`]
///
/// Input keeps being read while a turn is in flight, so a follow-up typed
/// too early is refused on the spot instead of queued.
pub struct InteractiveRunner {
    session: Arc<SessionOrchestrator>,
    ui: UIConfig,
    reported_avatar: Option<AvatarState>,
}

impl InteractiveRunner {
    pub fn new(session: Arc<SessionOrchestrator>, ui: UIConfig) -> Self {
        Self {
            session,
            ui,
            reported_avatar: None,
        }
    }

    pub async fn run(mut self, handle: Option<String>) -> Result<()> {
        println!("🧞 {}", "Lox Genie".bold());
        println!("   Commands: /handle <name>, /wish, /history, /quit");
        println!();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut notices = self.session.subscribe_notifications();
        let mut in_flight: JoinSet<TurnOutcome> = JoinSet::new();

        if let Some(handle) = handle {
            self.session.edit_handle(&handle);
            self.verify().await;
        }
        self.prompt()?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if let Flow::Quit = self.handle_line(line.trim(), &mut in_flight).await {
                        break;
                    }
                    self.prompt()?;
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    self.on_turn_done(joined);
                    self.prompt()?;
                }
                Ok(()) = notices.changed() => {
                    let notice = notices.borrow_and_update().clone();
                    if let Some(text) = notice.as_ref().and_then(render_notice) {
                        println!("{}", text);
                    }
                }
            }
        }

        in_flight.abort_all();
        self.session.teardown();
        log_info("👋", format!("session closed after {} turns", self.session.transcript().len()));
        println!("👋 Goodbye!");
        Ok(())
    }

    async fn handle_line(&mut self, line: &str, in_flight: &mut JoinSet<TurnOutcome>) -> Flow {
        let action = classify_line(line, self.session.phase(), &self.session.identity_state());
        match action {
            LineAction::Ignore => {}
            LineAction::Quit => return Flow::Quit,
            LineAction::History => self.print_history(),
            LineAction::Wish => self.wish(in_flight).await,
            LineAction::Unknown(name) => println!("Unknown command: /{}", name),
            LineAction::ChangeHandle(handle) => {
                self.session.edit_handle(handle);
                self.reported_avatar = None;
                self.verify().await;
            }
            LineAction::HandleLocked => {
                println!("The username can't change once the conversation has started.");
            }
            LineAction::Busy => println!("{}", STILL_WAITING),
            LineAction::Ask(question) | LineAction::FollowUp(question) => {
                self.submit(question.to_string(), in_flight);
            }
        }
        Flow::Continue
    }

    async fn verify(&mut self) {
        println!("{}", "Checking Sleeper username...".dimmed());
        match self.session.verify_handle().await {
            Ok(IdentityState::Valid) => {
                if let Some(record) = self.session.identity_record() {
                    let name = record
                        .profile
                        .as_ref()
                        .map(|p| p.label(&record.handle).to_string())
                        .unwrap_or_else(|| record.handle.clone());
                    println!("👋 Welcome, {}!", name.bold());
                }
            }
            Ok(state) => log_debug(format!("verification settled as {:?}", state)),
            Err(e) => println!("❌ {}", e),
        }
    }

    async fn wish(&mut self, in_flight: &mut JoinSet<TurnOutcome>) {
        match self.session.suggest_question().await {
            Ok(question) => {
                println!("✨ {}", question.italic());
                if self.session.identity_state() == IdentityState::Valid || self.session.has_started()
                {
                    self.submit(question, in_flight);
                }
            }
            Err(e) => println!("❌ {}", e.user_message()),
        }
    }

    /// Start a turn in the background
    fn submit(&mut self, question: String, in_flight: &mut JoinSet<TurnOutcome>) {
        if awaiting_answer(self.session.phase()) {
            println!("{}", STILL_WAITING);
            return;
        }

        let session = Arc::clone(&self.session);
        if session.has_started() {
            in_flight.spawn(async move { session.follow_up(&question).await });
        } else {
            in_flight.spawn(async move { session.ask_genie(&question).await });
        }
        println!("🧞 {}", "Lox Genie is thinking...".dimmed());
    }

    fn on_turn_done(&mut self, joined: Result<TurnOutcome, JoinError>) {
        match joined {
            Ok(Ok(id)) => {
                if let Some(turn) = self.session.turn(id) {
                    println!();
                    println!("{}", render_turn(&turn, &self.handle(), self.session.avatar_state()));
                }
            }
            Ok(Err(SubmitError::TurnInFlight)) => println!("{}", STILL_WAITING),
            Ok(Err(e)) => println!("❌ {}", e),
            Err(e) => log_error("💥", format!("turn task failed: {}", e)),
        }
        self.report_avatar();
    }

    /// Mention the avatar outcome once it settles
    fn report_avatar(&mut self) {
        if !self.ui.show_avatar_status {
            return;
        }
        let state = self.session.avatar_state();
        if matches!(state, AvatarState::Ready | AvatarState::Missing)
            && self.reported_avatar != Some(state)
        {
            self.reported_avatar = Some(state);
            match self.session.avatar() {
                Some(image) => println!(
                    "{}",
                    format!("🖼  Avatar loaded ({} bytes)", image.data.len()).dimmed()
                ),
                None => println!("{}", "👤 No avatar, using placeholder".dimmed()),
            }
        }
    }

    fn print_history(&self) {
        let transcript = self.session.transcript();
        if transcript.is_empty() {
            println!("No questions asked yet.");
            return;
        }
        let handle = self.handle();
        let avatar = self.session.avatar_state();
        for turn in &transcript {
            println!("{}", render_turn(turn, &handle, avatar));
        }
    }

    fn handle(&self) -> String {
        self.session
            .identity_record()
            .map(|r| r.handle)
            .unwrap_or_else(|| self.session.raw_handle())
    }

    fn prompt(&self) -> Result<()> {
        let label = if self.session.has_started() {
            "Follow up"
        } else if self.session.identity_state() == IdentityState::Valid {
            "Ask the Genie"
        } else {
            "Sleeper username"
        };
        print!("{} ", format!("{}>", label).cyan());
        std::io::stdout().flush()?;
        Ok(())
    }
}
