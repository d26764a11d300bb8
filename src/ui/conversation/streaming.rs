use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};
use std::time::Instant;

/// One-line "thinking" indicator shown while no reply text is visible yet
pub struct ThinkingIndicator {
    since: Option<Instant>,
}

impl ThinkingIndicator {
    pub fn new() -> Self {
        Self { since: None }
    }

    pub fn set_active(&mut self, active: bool) {
        match (active, self.since) {
            (true, None) => self.since = Some(Instant::now()),
            (false, Some(_)) => self.since = None,
            _ => {}
        }
    }

    pub fn is_active(&self) -> bool {
        self.since.is_some()
    }

    fn dots(&self) -> &'static str {
        let elapsed = self.since.map(|s| s.elapsed().as_millis()).unwrap_or(0);
        match (elapsed / 300) % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "",
        }
    }
}

impl Default for ThinkingIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &ThinkingIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.is_active() || area.height == 0 {
            return;
        }

        let indicator = Line::from(vec![
            Span::styled("🚗 ", Style::default().fg(Color::Green)),
            Span::styled("Driver's Friend is thinking", Style::default().fg(Color::Green)),
            Span::styled(self.dots(), Style::default().fg(Color::Yellow)),
        ]);
        buf.set_line(area.x, area.y, &indicator, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_is_sticky_until_turned_off() {
        let mut indicator = ThinkingIndicator::new();
        assert!(!indicator.is_active());
        indicator.set_active(true);
        let since = indicator.since;
        indicator.set_active(true);
        assert_eq!(indicator.since, since);
        indicator.set_active(false);
        assert!(!indicator.is_active());
    }
}
