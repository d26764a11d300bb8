use crate::auth::Authenticator;
use crate::controller::ConversationController;
use crate::error::ChatError;
use crate::language::Language;
use crate::ui::conversation::{
    get_help_text, ComposerResult, ConversationComposer, ConversationHistory, ParsedCommand,
    SlashCommand, ThinkingIndicator,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use std::sync::Arc;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Chat screen: owns the controller and keeps the widgets in step with it
pub struct ConversationManager {
    controller: ConversationController,
    auth: Arc<dyn Authenticator>,
    history: ConversationHistory,
    composer: ConversationComposer,
    indicator: ThinkingIndicator,
    notice: Option<String>,
    show_help: bool,
}

impl ConversationManager {
    pub fn new(
        controller: ConversationController,
        auth: Arc<dyn Authenticator>,
        history_limit: usize,
        show_timestamps: bool,
    ) -> Self {
        let language = controller.language();
        let mut manager = Self {
            controller,
            auth,
            history: ConversationHistory::new(history_limit, show_timestamps),
            composer: ConversationComposer::new(
                "Ask about speed limits, parking, right of way...",
                language,
            ),
            indicator: ThinkingIndicator::new(),
            notice: None,
            show_help: false,
        };
        manager.refresh();
        manager
    }

    /// Apply pending turn progress. Returns whether a redraw is needed.
    pub fn tick(&mut self) -> bool {
        let changed = self.controller.poll();
        if changed {
            self.refresh();
        }
        changed || self.indicator.is_active()
    }

    fn refresh(&mut self) {
        self.history.sync(
            self.controller.messages(),
            self.controller.in_flight_message(),
            self.controller.suggestions(),
        );
        // Thinking covers the request and the pause before the first token.
        self.indicator.set_active(self.controller.is_awaiting_response());
        self.composer.set_enabled(!self.controller.is_busy());
        self.composer.set_language(self.controller.language());
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }
        if self.show_help {
            self.show_help = false;
            return ConversationAction::None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('d') => return ConversationAction::Exit,
                KeyCode::Char('l') => {
                    self.clear();
                    return ConversationAction::None;
                }
                _ => {}
            }
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(input) => {
                self.submit(&input);
                ConversationAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        self.composer.paste(text);
    }

    fn submit(&mut self, input: &str) {
        self.notice = None;
        match self.controller.submit(input) {
            Ok(_) => {}
            Err(ChatError::Validation) => {}
            Err(err) => {
                tracing::debug!(error = %err, "submission ignored");
            }
        }
        self.refresh();
    }

    fn clear(&mut self) {
        self.controller.clear();
        self.composer.clear();
        self.notice = None;
        self.refresh();
    }

    fn set_language(&mut self, language: Language) {
        self.controller.set_language(language);
        self.notice = Some(format!("Answers will now be in {}.", language.display_name()));
        self.refresh();
    }

    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        match command.command {
            SlashCommand::Lang => {
                match (command.argument(), command.language_target()) {
                    (None, _) => self.set_language(self.controller.language().next()),
                    (Some(_), Some(language)) => self.set_language(language),
                    (Some(arg), None) => {
                        self.notice = Some(format!(
                            "Unknown language '{}'. Choose one of: {}",
                            arg,
                            Language::codes().join(", ")
                        ));
                    }
                }
                ConversationAction::None
            }
            SlashCommand::Clear => {
                self.clear();
                ConversationAction::None
            }
            SlashCommand::Help => {
                self.show_help = true;
                ConversationAction::None
            }
            SlashCommand::Bye => ConversationAction::Exit,
        }
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_help_visible(&self) -> bool {
        self.show_help
    }

    fn header_line(&self) -> Line<'static> {
        let user = self
            .auth
            .current_user()
            .map(|u| format!("{} (demo)", u.name))
            .unwrap_or_else(|| "signed out".to_string());
        let user_style = if self.auth.is_authenticated() {
            Style::default().fg(Color::Gray)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Line::from(vec![
            Span::styled(
                "🚗 Driver's Friend",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::styled("  │  ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("🌐 {}", self.controller.language().display_name()),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled("  │  ", Style::default().fg(Color::DarkGray)),
            Span::styled(user, user_style),
            Span::styled("  │  /help", Style::default().fg(Color::DarkGray)),
        ])
    }

    /// Render the chat screen
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Min(5),    // History
                Constraint::Length(1), // Indicator / notice
                Constraint::Length(3), // Composer
            ])
            .split(area);

        buf.set_line(chunks[0].x, chunks[0].y, &self.header_line(), chunks[0].width);
        (&self.history).render(chunks[1], buf);

        if self.indicator.is_active() {
            (&self.indicator).render(chunks[2], buf);
        } else if let Some(notice) = &self.notice {
            let line = Line::from(Span::styled(notice.clone(), Style::default().fg(Color::Yellow)));
            buf.set_line(chunks[2].x, chunks[2].y, &line, chunks[2].width);
        }

        (&self.composer).render(chunks[3], buf);

        if self.show_help {
            let width = area.width.saturating_sub(8).min(70);
            let height = area.height.saturating_sub(4).min(14);
            let popup = Rect {
                x: area.x + (area.width.saturating_sub(width)) / 2,
                y: area.y + (area.height.saturating_sub(height)) / 2,
                width,
                height,
            };
            Clear.render(popup, buf);
            Paragraph::new(get_help_text())
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Help (any key to close)")
                        .style(Style::default().fg(Color::Yellow)),
                )
                .render(popup, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BotReply, ChatBackend};
    use crate::auth::DemoAuthenticator;
    use crate::controller::{ControllerOptions, WELCOME_MESSAGE};
    use crate::error::ChatResult;
    use crate::reveal::RevealPacing;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ChatBackend for Echo {
        async fn send_message(&self, text: &str, _language: Language) -> ChatResult<BotReply> {
            Ok(BotReply::text(format!("You asked: {}", text)))
        }
    }

    fn manager() -> ConversationManager {
        let controller = ConversationController::new(
            Arc::new(Echo),
            ControllerOptions {
                pacing: RevealPacing::instant(),
                ..ControllerOptions::default()
            },
        );
        ConversationManager::new(controller, Arc::new(DemoAuthenticator), 100, false)
    }

    fn press(m: &mut ConversationManager, code: KeyCode) -> ConversationAction {
        m.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_line(m: &mut ConversationManager, text: &str) -> ConversationAction {
        for c in text.chars() {
            press(m, KeyCode::Char(c));
        }
        press(m, KeyCode::Esc);
        press(m, KeyCode::Enter)
    }

    #[tokio::test]
    async fn typed_question_runs_a_turn() {
        let mut m = manager();
        type_line(&mut m, "right of way?");
        assert!(m.controller().is_busy());

        while m.controller().is_busy() {
            m.tick();
            tokio::task::yield_now().await;
        }
        let last = m.controller().messages().last().unwrap();
        assert_eq!(last.text, "You asked: right of way?");
    }

    #[tokio::test]
    async fn lang_command_switches_and_reports_unknown_codes() {
        let mut m = manager();
        type_line(&mut m, "/lang de");
        assert_eq!(m.controller().language(), Language::De);

        type_line(&mut m, "/lang xx");
        assert_eq!(m.controller().language(), Language::De);
        assert!(m.notice().unwrap().contains("Unknown language 'xx'"));

        type_line(&mut m, "/lang");
        assert_eq!(m.controller().language(), Language::EnUs);
    }

    #[tokio::test]
    async fn bye_and_ctrl_c_exit() {
        let mut m = manager();
        assert_eq!(type_line(&mut m, "/bye"), ConversationAction::Exit);
        assert_eq!(
            m.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            ConversationAction::Exit
        );
    }

    #[tokio::test]
    async fn help_popup_closes_on_next_key() {
        let mut m = manager();
        type_line(&mut m, "/help");
        assert!(m.is_help_visible());
        press(&mut m, KeyCode::Char('x'));
        assert!(!m.is_help_visible());
    }

    #[tokio::test]
    async fn ctrl_l_clears_mid_turn() {
        let mut m = manager();
        type_line(&mut m, "question");
        m.handle_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL));

        assert!(!m.controller().is_busy());
        assert_eq!(m.controller().messages().len(), 1);
        assert_eq!(m.controller().messages()[0].text, WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn renders_header_and_welcome() {
        let m = manager();
        let area = Rect::new(0, 0, 80, 20);
        let mut buf = Buffer::empty(area);
        m.render(area, &mut buf);

        let screen: String = (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf.get(x, y).symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");
        assert!(screen.contains("Driver's Friend"));
        assert!(screen.contains("English (US)"));
        assert!(screen.contains("Hello!"));
    }
}
