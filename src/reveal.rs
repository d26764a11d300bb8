//! Staged "thinking, then typing" presentation of a reply that is already
//! fully known to the client.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::api::ChatBackend;
use crate::error::ChatError;
use crate::events::TurnEvent;
use crate::language::Language;

/// Timing of the simulated reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealPacing {
    /// Lower bound of the thinking delay (inclusive)
    pub thinking_min: Duration,
    /// Upper bound of the thinking delay (exclusive)
    pub thinking_max: Duration,
    /// Interval between two revealed tokens
    pub tick: Duration,
}

impl Default for RevealPacing {
    fn default() -> Self {
        Self {
            thinking_min: Duration::from_millis(1000),
            thinking_max: Duration::from_millis(2000),
            tick: Duration::from_millis(100),
        }
    }
}

impl RevealPacing {
    /// Pacing with no waiting at all
    pub fn instant() -> Self {
        Self {
            thinking_min: Duration::ZERO,
            thinking_max: Duration::ZERO,
            tick: Duration::ZERO,
        }
    }

    /// Sample a thinking delay in `[thinking_min, thinking_max)`
    pub fn thinking_delay(&self) -> Duration {
        if self.thinking_max <= self.thinking_min {
            return self.thinking_min;
        }
        let min = self.thinking_min.as_millis() as u64;
        let max = self.thinking_max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..max))
    }
}

/// Split a reply into the tokens revealed one per tick
pub fn tokenize(reply: &str) -> Vec<&str> {
    reply.split_whitespace().collect()
}

/// Every text the placeholder shows while the reply is revealed.
///
/// Intermediate frames carry a trailing space after the newest token. The last
/// frame is the tokens joined by single spaces, so runs of whitespace in the
/// reply collapse. An empty reply yields a single empty frame.
pub fn frames(reply: &str) -> Vec<String> {
    let tokens = tokenize(reply);
    if tokens.is_empty() {
        return vec![String::new()];
    }

    let mut frames = Vec::with_capacity(tokens.len());
    let mut text = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        text.push_str(token);
        if i + 1 == tokens.len() {
            frames.push(text.clone());
        } else {
            frames.push(format!("{} ", text));
        }
    }
    frames
}

/// Whitespace-normalised final text of a reveal
pub fn final_text(reply: &str) -> String {
    tokenize(reply).join(" ")
}

/// Drive one turn: call the backend, then pace the reveal of its answer.
///
/// Stops quietly as soon as the receiving side is gone, which is how a
/// cleared conversation cancels a reveal that is still ticking.
pub async fn run_turn(
    backend: Arc<dyn ChatBackend>,
    text: String,
    language: Language,
    request_timeout: Duration,
    pacing: RevealPacing,
    tx: mpsc::UnboundedSender<TurnEvent>,
) {
    let request = backend.send_message(&text, language);
    let reply = match tokio::time::timeout(request_timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(ChatError::backend(format!(
            "no reply within {}s",
            request_timeout.as_secs_f32()
        ))),
    };

    let response = match &reply {
        Ok(reply) => reply.response.clone(),
        Err(_) => {
            let _ = tx.send(TurnEvent::Replied(reply));
            return;
        }
    };

    if tx.send(TurnEvent::Replied(reply)).is_err() {
        return;
    }

    tokio::time::sleep(pacing.thinking_delay()).await;
    if tx.send(TurnEvent::RevealStarted).is_err() {
        return;
    }

    let mut interval = tokio::time::interval(pacing.tick.max(Duration::from_millis(1)));
    // The first tick of a tokio interval completes immediately.
    interval.tick().await;
    for frame in frames(&response) {
        interval.tick().await;
        if tx.send(TurnEvent::Frame(frame)).is_err() {
            return;
        }
    }

    let _ = tx.send(TurnEvent::Finished);
}
