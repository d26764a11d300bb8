use crate::language::Language;
use crate::ui::conversation::commands::{
    command_entries, parse_slash_command, CommandEntry, ParsedCommand,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use std::cell::{Cell, RefCell};

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// State for the text area within the composer.
///
/// `cursor_position` is a byte offset that always sits on a char boundary.
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    pub cursor_position: usize,
}

/// Input line at the bottom of the chat screen
pub struct ConversationComposer {
    state: RefCell<TextAreaState>,
    placeholder: String,
    /// Off while a response is in flight; typing still works, sending does not
    enabled: bool,
    language: Language,
    command_entries: Vec<CommandEntry>,
    filtered_commands: RefCell<Vec<CommandEntry>>,
    show_command_palette: Cell<bool>,
    selected_command: Cell<Option<usize>>,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>, language: Language) -> Self {
        Self {
            state: RefCell::new(TextAreaState::default()),
            placeholder: placeholder.into(),
            enabled: true,
            language,
            command_entries: command_entries(),
            filtered_commands: RefCell::new(Vec::new()),
            show_command_palette: Cell::new(false),
            selected_command: Cell::new(None),
        }
    }

    /// Handle key input
    pub fn handle_key(&self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        let mut state = self.state.borrow_mut();

        match key.code {
            KeyCode::Enter => {
                if self.show_command_palette.get() {
                    if self.apply_selected_command(&mut state) {
                        return ComposerResult::None;
                    }
                }
                if state.content.trim().is_empty() {
                    return ComposerResult::None;
                }
                // Commands stay usable while a reply is being shown.
                if let Some(command) = parse_slash_command(&state.content) {
                    state.content.clear();
                    state.cursor_position = 0;
                    self.close_command_palette();
                    return ComposerResult::Command(command);
                }
                if !self.enabled {
                    return ComposerResult::None;
                }
                let content = std::mem::take(&mut state.content);
                state.cursor_position = 0;
                self.close_command_palette();
                return ComposerResult::Submitted(content);
            }
            KeyCode::Up => {
                if self.show_command_palette.get() {
                    self.move_command_selection(-1);
                }
            }
            KeyCode::Down => {
                if self.show_command_palette.get() {
                    self.move_command_selection(1);
                }
            }
            KeyCode::Esc => {
                if self.show_command_palette.get() {
                    self.close_command_palette();
                }
            }
            KeyCode::Tab => {
                if self.show_command_palette.get() {
                    self.apply_selected_command(&mut state);
                }
            }
            KeyCode::Char(c) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    return ComposerResult::None;
                }
                self.insert_char(&mut state, c);
                self.sync_command_palette(&state);
            }
            KeyCode::Backspace => {
                if self.backspace(&mut state) {
                    self.sync_command_palette(&state);
                }
            }
            KeyCode::Delete => {
                if self.delete(&mut state) {
                    self.sync_command_palette(&state);
                }
            }
            KeyCode::Left => {
                state.cursor_position = prev_boundary(&state.content, state.cursor_position);
            }
            KeyCode::Right => {
                state.cursor_position = next_boundary(&state.content, state.cursor_position);
            }
            KeyCode::Home => {
                state.cursor_position = 0;
            }
            KeyCode::End => {
                state.cursor_position = state.content.len();
            }
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor; newlines become spaces
    pub fn paste(&self, text: &str) {
        let mut state = self.state.borrow_mut();
        for c in text.chars() {
            let c = if c == '\n' || c == '\r' { ' ' } else { c };
            self.insert_char(&mut state, c);
        }
        self.sync_command_palette(&state);
    }

    fn insert_char(&self, state: &mut TextAreaState, c: char) {
        state.content.insert(state.cursor_position, c);
        state.cursor_position += c.len_utf8();
    }

    fn backspace(&self, state: &mut TextAreaState) -> bool {
        if state.cursor_position == 0 {
            return false;
        }
        let start = prev_boundary(&state.content, state.cursor_position);
        state.content.replace_range(start..state.cursor_position, "");
        state.cursor_position = start;
        true
    }

    fn delete(&self, state: &mut TextAreaState) -> bool {
        if state.cursor_position >= state.content.len() {
            return false;
        }
        let end = next_boundary(&state.content, state.cursor_position);
        state.content.replace_range(state.cursor_position..end, "");
        true
    }

    fn sync_command_palette(&self, state: &TextAreaState) {
        let is_command_word =
            state.content.starts_with('/') && !state.content.contains(char::is_whitespace);
        if is_command_word {
            if !self.show_command_palette.get() {
                self.show_command_palette.set(true);
                self.selected_command.set(Some(0));
            }
            self.refresh_command_palette(state);
        } else if self.show_command_palette.get() {
            self.close_command_palette();
        }
    }

    fn close_command_palette(&self) {
        self.show_command_palette.set(false);
        self.filtered_commands.borrow_mut().clear();
        self.selected_command.set(None);
    }

    fn refresh_command_palette(&self, state: &TextAreaState) {
        let query = state.content.trim_start_matches('/').to_lowercase();
        let mut filtered = self.filtered_commands.borrow_mut();
        filtered.clear();

        for entry in &self.command_entries {
            if query.is_empty() || entry.keyword.starts_with(&query) {
                filtered.push(*entry);
            }
        }

        if filtered.is_empty() {
            self.selected_command.set(None);
        } else {
            let index = self.selected_command.get().unwrap_or(0);
            self.selected_command.set(Some(index.min(filtered.len() - 1)));
        }
    }

    fn move_command_selection(&self, delta: isize) {
        let filtered = self.filtered_commands.borrow();
        if filtered.is_empty() {
            self.selected_command.set(None);
            return;
        }

        let len = filtered.len() as isize;
        let current = self.selected_command.get().unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len);
        self.selected_command.set(Some(next as usize));
    }

    fn apply_selected_command(&self, state: &mut TextAreaState) -> bool {
        let filtered = self.filtered_commands.borrow();
        let Some(entry) = self.selected_command.get().and_then(|i| filtered.get(i).copied()) else {
            return false;
        };
        drop(filtered);

        state.content = format!("/{} ", entry.keyword);
        state.cursor_position = state.content.len();
        self.close_command_palette();
        true
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn content(&self) -> String {
        self.state.borrow().content.clone()
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette.get()
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.content.clear();
        state.cursor_position = 0;
        drop(state);
        self.close_command_palette();
    }

    fn title(&self) -> String {
        if self.enabled {
            format!("✍️  Ask a question ({})", self.language.display_name())
        } else {
            "⏳ Waiting for the answer...".to_string()
        }
    }
}

fn prev_boundary(s: &str, pos: usize) -> usize {
    s[..pos].char_indices().next_back().map(|(i, _)| i).unwrap_or(0)
}

fn next_boundary(s: &str, pos: usize) -> usize {
    s[pos..].chars().next().map(|c| pos + c.len_utf8()).unwrap_or(pos)
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = self.state.borrow();

        let border_style = if self.enabled {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title())
            .style(border_style);

        let inner_area = block.inner(area);
        block.render(area, buf);

        if state.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = state.content.clone();
            content.insert(state.cursor_position.min(content.len()), '▌');
            let style = if self.enabled {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let line = Line::from(vec![Span::styled(content, style)]);
            buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
        }

        if self.show_command_palette.get() {
            let filtered = self.filtered_commands.borrow();
            let palette_height = (filtered.len().min(5) + 2) as u16;
            let palette_area = Rect {
                x: area.x,
                y: area.y.saturating_sub(palette_height),
                width: area.width,
                height: palette_height.min(area.y),
            };
            if palette_area.height < 3 {
                return;
            }

            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            let selected = self.selected_command.get();
            for (index, entry) in filtered.iter().enumerate().take(inner.height as usize) {
                let style = if selected == Some(index) {
                    Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled("  ", Style::default()),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);

                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}
