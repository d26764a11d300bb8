//! Terminal setup and the chat screen's event loop

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::events::TuiEvent;
use crate::ui::conversation::{ConversationAction, ConversationManager};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Redraw cadence while idle; also drives the thinking animation
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

fn enter_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn leave_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Read terminal input on a plain thread and forward it to the async loop
fn spawn_input_reader(tx: mpsc::UnboundedSender<TuiEvent>) {
    std::thread::spawn(move || {
        loop {
            match event::poll(FRAME_INTERVAL) {
                Ok(true) => {}
                Ok(false) => {
                    if tx.is_closed() {
                        return;
                    }
                    continue;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "terminal input failed");
                    return;
                }
            }
            let tui_event = match event::read() {
                Ok(Event::Key(key)) => TuiEvent::Key(key),
                Ok(Event::Paste(text)) => TuiEvent::Paste(text),
                Ok(Event::Resize(w, h)) => TuiEvent::Resize(w, h),
                Ok(_) => continue,
                Err(err) => {
                    tracing::warn!(error = %err, "terminal input failed");
                    return;
                }
            };
            if tx.send(tui_event).is_err() {
                return;
            }
        }
    });
}

/// Run the chat screen until the user quits
pub async fn run(mut manager: ConversationManager) -> Result<()> {
    let mut terminal = enter_terminal()?;
    let result = event_loop(&mut terminal, &mut manager).await;
    leave_terminal(&mut terminal)?;
    result
}

async fn event_loop(terminal: &mut Tui, manager: &mut ConversationManager) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_input_reader(tx);

    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    let mut dirty = true;

    loop {
        if dirty {
            terminal
                .draw(|frame| {
                    let area = frame.size();
                    manager.render(area, frame.buffer_mut());
                })
                .context("Failed to draw frame")?;
            dirty = false;
        }

        tokio::select! {
            _ = frames.tick() => {
                dirty = manager.tick();
            }
            input = rx.recv() => {
                let Some(input) = input else {
                    return Ok(());
                };
                match input {
                    TuiEvent::Key(key) => {
                        if manager.handle_key(key) == ConversationAction::Exit {
                            return Ok(());
                        }
                    }
                    TuiEvent::Paste(text) => manager.handle_paste(&text),
                    TuiEvent::Resize(width, height) => {
                        tracing::debug!(width, height, "terminal resized");
                    }
                }
                dirty = true;
            }
        }
    }
}
