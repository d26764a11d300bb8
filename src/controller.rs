//! Conversation pipeline: accepts user submissions, runs one turn at a time and
//! applies the turn's progress to the message list.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::ChatBackend;
use crate::config::Config;
use crate::error::{ChatError, ChatResult};
use crate::events::TurnEvent;
use crate::language::Language;
use crate::message::{Message, MessageId, MessageList};
use crate::reveal::{self, RevealPacing};

pub const WELCOME_MESSAGE: &str =
    "Hello! I'm Driver's Friend. Ask me anything about driving rules and regulations.";

pub const APOLOGY_MESSAGE: &str = "Sorry, I encountered an error. Please try again later.";

/// Where the session is in the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Request in flight or thinking; no reply text shown yet
    Awaiting,
    /// Reply text is being revealed
    Revealing,
}

/// Tunables for a [`ConversationController`]
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub language: Language,
    pub pacing: RevealPacing,
    pub request_timeout: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            language: Language::default(),
            pacing: RevealPacing::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&Config> for ControllerOptions {
    fn from(config: &Config) -> Self {
        Self {
            language: config.default_language,
            pacing: config.reveal_pacing(),
            request_timeout: config.request_timeout(),
        }
    }
}

struct ActiveTurn {
    handle: JoinHandle<()>,
    events: mpsc::UnboundedReceiver<TurnEvent>,
    placeholder: Option<MessageId>,
}

impl ActiveTurn {
    fn cancel(self) {
        self.handle.abort();
        // Dropping `events` here closes the channel as well.
    }
}

/// Owns the active conversation session
pub struct ConversationController {
    session_id: Uuid,
    messages: MessageList,
    phase: Phase,
    language: Language,
    backend: Arc<dyn ChatBackend>,
    pacing: RevealPacing,
    request_timeout: Duration,
    turn: Option<ActiveTurn>,
    suggestions: Vec<String>,
}

impl ConversationController {
    pub fn new(backend: Arc<dyn ChatBackend>, options: ControllerOptions) -> Self {
        let mut messages = MessageList::new();
        messages.push_bot(WELCOME_MESSAGE);

        let session_id = Uuid::new_v4();
        tracing::debug!(%session_id, language = %options.language, "conversation started");

        Self {
            session_id,
            messages,
            phase: Phase::Idle,
            language: options.language,
            backend,
            pacing: options.pacing,
            request_timeout: options.request_timeout,
            turn: None,
            suggestions: Vec::new(),
        }
    }

    /// Submit user text and start a turn.
    ///
    /// Must be called inside a tokio runtime. Rejected submissions leave the
    /// conversation untouched.
    pub fn submit(&mut self, text: &str) -> ChatResult<MessageId> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::Validation);
        }
        if self.is_busy() {
            tracing::debug!(
                session_id = %self.session_id,
                "submission rejected, response in flight"
            );
            return Err(ChatError::ConcurrentSubmission);
        }

        let user_id = self.messages.push_user(text);
        self.phase = Phase::Awaiting;
        self.suggestions.clear();

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(reveal::run_turn(
            Arc::clone(&self.backend),
            text.to_string(),
            self.language,
            self.request_timeout,
            self.pacing,
            tx,
        ));
        self.turn = Some(ActiveTurn {
            handle,
            events: rx,
            placeholder: None,
        });

        tracing::debug!(
            session_id = %self.session_id,
            message_id = %user_id,
            language = %self.language,
            "turn started"
        );
        Ok(user_id)
    }

    /// Apply every turn event that is ready without waiting.
    ///
    /// Returns whether anything changed, so a UI loop knows to redraw.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            let Some(turn) = self.turn.as_mut() else {
                break;
            };
            match turn.events.try_recv() {
                Ok(event) => {
                    self.apply(event);
                    changed = true;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.abandon_turn();
                    changed = true;
                    break;
                }
            }
        }
        changed
    }

    /// Wait for the next turn event and apply it.
    ///
    /// Returns `false` when no turn is active.
    pub async fn next_event(&mut self) -> bool {
        let Some(turn) = self.turn.as_mut() else {
            return false;
        };
        match turn.events.recv().await {
            Some(event) => self.apply(event),
            None => self.abandon_turn(),
        }
        true
    }

    /// Run the active turn, if any, to completion
    pub async fn wait_idle(&mut self) {
        while self.next_event().await {}
    }

    fn apply(&mut self, event: TurnEvent) {
        match event {
            TurnEvent::Replied(Ok(reply)) => {
                let id = self.messages.push_placeholder(reply.source, reply.url);
                self.suggestions = reply.suggestions.unwrap_or_default();
                if let Some(turn) = self.turn.as_mut() {
                    turn.placeholder = Some(id);
                }
                tracing::debug!(
                    session_id = %self.session_id,
                    message_id = %id,
                    intent = %reply.intent,
                    confidence = reply.confidence,
                    "reply received"
                );
            }
            TurnEvent::Replied(Err(err)) => {
                tracing::warn!(session_id = %self.session_id, error = %err, "chat request failed");
                self.messages.push_bot(APOLOGY_MESSAGE);
                self.finish_turn();
            }
            TurnEvent::RevealStarted => {
                self.phase = Phase::Revealing;
            }
            TurnEvent::Frame(text) => {
                if let Some(id) = self.turn.as_ref().and_then(|t| t.placeholder) {
                    self.messages.replace_text(id, text);
                }
            }
            TurnEvent::Finished => {
                tracing::debug!(session_id = %self.session_id, "reveal finished");
                self.finish_turn();
            }
        }
    }

    fn finish_turn(&mut self) {
        if let Some(turn) = self.turn.take() {
            turn.cancel();
        }
        self.phase = Phase::Idle;
    }

    /// The turn task went away without finishing (panicked or aborted).
    fn abandon_turn(&mut self) {
        let had_placeholder = self.turn.as_ref().is_some_and(|t| t.placeholder.is_some());
        tracing::warn!(session_id = %self.session_id, "turn ended unexpectedly");
        if !had_placeholder {
            self.messages.push_bot(APOLOGY_MESSAGE);
        }
        self.finish_turn();
    }

    /// Cancel any in-flight turn and start over from the welcome message
    pub fn clear(&mut self) {
        if let Some(turn) = self.turn.take() {
            turn.cancel();
        }
        self.messages.clear();
        self.messages.push_bot(WELCOME_MESSAGE);
        self.phase = Phase::Idle;
        self.suggestions.clear();
        tracing::debug!(session_id = %self.session_id, "conversation cleared");
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.messages()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.phase == Phase::Awaiting
    }

    pub fn is_revealing_response(&self) -> bool {
        self.phase == Phase::Revealing
    }

    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Id of the bot message currently being revealed
    pub fn in_flight_message(&self) -> Option<MessageId> {
        self.turn.as_ref().and_then(|t| t.placeholder)
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Takes effect from the next submission on
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Follow-up questions offered with the last reply
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }
}

impl Drop for ConversationController {
    fn drop(&mut self) {
        if let Some(turn) = self.turn.take() {
            turn.cancel();
        }
    }
}
