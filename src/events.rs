use crate::api::BotReply;
use crate::error::ChatError;

/// Progress of a single turn, sent from the turn task to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// Backend call finished
    Replied(Result<BotReply, ChatError>),

    /// Thinking delay elapsed, text starts appearing
    RevealStarted,

    /// Placeholder text after one more token
    Frame(String),

    /// Reveal completed; the last frame held the final text
    Finished,
}

/// TUI-specific events (keyboard, paste, resize)
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Paste event
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),
}
