//! Conversation history display component

use crate::message::{Message, MessageId, Sender};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Snapshot of the conversation, ready to draw
pub struct ConversationHistory {
    messages: Vec<Message>,
    in_flight: Option<MessageId>,
    suggestions: Vec<String>,
    show_timestamps: bool,
    max_messages: usize,
}

impl ConversationHistory {
    pub fn new(max_messages: usize, show_timestamps: bool) -> Self {
        Self {
            messages: Vec::new(),
            in_flight: None,
            suggestions: Vec::new(),
            show_timestamps,
            max_messages,
        }
    }

    /// Replace the snapshot with the controller's current state
    pub fn sync(
        &mut self,
        messages: &[Message],
        in_flight: Option<MessageId>,
        suggestions: &[String],
    ) {
        let start = messages.len().saturating_sub(self.max_messages);
        self.messages = messages[start..].to_vec();
        self.in_flight = in_flight;
        self.suggestions = suggestions.to_vec();
    }

    /// Lines for the whole history at the given width
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for message in &self.messages {
            all_lines.extend(self.render_message(message, width));
            all_lines.push(Line::from(""));
        }

        if self.in_flight.is_none() && !self.suggestions.is_empty() {
            all_lines.push(Line::from(Span::styled(
                "You could also ask:",
                Style::default().fg(Color::DarkGray),
            )));
            for suggestion in &self.suggestions {
                all_lines.push(Line::from(vec![
                    Span::raw("  • "),
                    Span::styled(suggestion.clone(), Style::default().fg(Color::Cyan)),
                ]));
            }
        }
        all_lines
    }

    fn render_message(&self, message: &Message, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let role_icon = match message.sender {
            Sender::User => "👤",
            Sender::Bot => "🚗",
        };
        let mut header = format!("{} {}", role_icon, message.sender.display_name());
        if self.show_timestamps {
            let local = message.timestamp.with_timezone(&chrono::Local);
            header.push_str(&format!(" · {}", local.format("%H:%M:%S")));
        }
        lines.push(Line::from(Span::styled(
            header,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
        )));

        let is_in_flight = self.in_flight == Some(message.id);
        let content_lines = wrap_text(&message.text, width.saturating_sub(2) as usize);
        let last = content_lines.len().saturating_sub(1);
        for (i, content_line) in content_lines.into_iter().enumerate() {
            let mut spans = vec![
                Span::raw("  "),
                Span::styled(content_line, content_style(message.sender)),
            ];
            if is_in_flight && i == last {
                spans.push(Span::styled("▋", Style::default().fg(Color::Yellow)));
            }
            lines.push(Line::from(spans));
        }

        // Attribution only once the text is complete.
        if !is_in_flight {
            if let Some((source, url)) = message.attribution() {
                let mut spans = vec![
                    Span::raw("  "),
                    Span::styled("Source: ", Style::default().fg(Color::DarkGray)),
                    Span::styled(
                        source.to_string(),
                        Style::default().add_modifier(Modifier::ITALIC),
                    ),
                ];
                if let Some(url) = url {
                    spans.push(Span::styled(
                        format!(" ({})", url),
                        Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
                    ));
                }
                lines.push(Line::from(spans));
            }
        }

        lines
    }
}

fn content_style(sender: Sender) -> Style {
    match sender {
        Sender::User => Style::default().fg(Color::Blue),
        Sender::Bot => Style::default().fg(Color::Green),
    }
}

/// Wrap text to fit within the given width
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        let current_width = current_line.chars().count();
        let word_width = word.chars().count();
        if current_line.is_empty() {
            current_line.push_str(word);
        } else if current_width + word_width + 1 <= width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line.push_str(word);
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

impl Widget for &ConversationHistory {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 Conversation");

        let inner_area = block.inner(area);
        block.render(area, buf);

        // Keep the newest lines in view.
        let all_lines = self.lines(inner_area.width);
        let height = inner_area.height as usize;
        let start = all_lines.len().saturating_sub(height);

        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageList;

    fn text_of(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect()
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_text("keep to the left lane", 10),
            vec!["keep to", "the left", "lane"]
        );
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn shows_source_after_reveal_and_cursor_during() {
        let mut list = MessageList::new();
        list.push_user("Where can I park?");
        let bot = list.push_placeholder(
            Some("Highway Code".into()),
            Some("https://example.org/hc".into()),
        );
        list.replace_text(bot, "Not on ");

        let mut history = ConversationHistory::new(50, false);
        history.sync(list.messages(), Some(bot), &[]);
        let during = text_of(&history.lines(80));
        assert!(during.iter().any(|l| l.ends_with("Not on▋")));
        assert!(!during.iter().any(|l| l.contains("Source:")));

        list.replace_text(bot, "Not on double yellow lines.");
        history.sync(list.messages(), None, &["Can I park on a pavement?".to_string()]);
        let after = text_of(&history.lines(80));
        assert!(after.iter().any(|l| l == "  Source: Highway Code (https://example.org/hc)"));
        assert!(after.iter().any(|l| l.contains("Can I park on a pavement?")));
    }

    #[test]
    fn keeps_only_the_newest_messages() {
        let mut list = MessageList::new();
        for i in 0..5 {
            list.push_user(format!("q{}", i));
        }
        let mut history = ConversationHistory::new(2, false);
        history.sync(list.messages(), None, &[]);
        let lines = text_of(&history.lines(40));
        assert!(lines.iter().any(|l| l.contains("q3")));
        assert!(lines.iter().any(|l| l.contains("q4")));
        assert!(!lines.iter().any(|l| l.contains("q2")));
    }

    #[test]
    fn renders_by_reference_and_keeps_snapshot() {
        let mut list = MessageList::new();
        list.push_user("Is a hands-free call allowed?");
        let mut history = ConversationHistory::new(10, false);
        history.sync(list.messages(), None, &[]);

        let area = Rect::new(0, 0, 50, 8);
        for _ in 0..2 {
            let mut buf = Buffer::empty(area);
            (&history).render(area, &mut buf);
            let rows: Vec<String> = (0..area.height)
                .map(|y| (0..area.width).map(|x| buf.get(x, y).symbol()).collect())
                .collect();
            assert!(rows.iter().any(|r| r.contains("Is a hands-free call allowed?")));
        }
    }
}
