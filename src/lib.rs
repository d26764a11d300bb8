//! Driver's Friend: terminal client for a driving-regulation chat assistant.

pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod language;
pub mod logging;
pub mod message;
pub mod reveal;
pub mod ui;

pub use api::{BotReply, ChatBackend, HttpBackend};
pub use config::Config;
pub use controller::{ControllerOptions, ConversationController, Phase};
pub use error::{ChatError, ChatResult};
pub use language::Language;
pub use message::{Message, MessageId, MessageList, Sender};
