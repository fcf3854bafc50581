//! Modal input form used for start/resolve dialogs and table filters.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::centered_rect;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    choices: Vec<String>,
}

impl Field {
    pub fn text(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            choices: Vec::new(),
        }
    }

    /// A field cycled with Left/Right through fixed values; starts at `initial`.
    pub fn choice<S: Into<String>>(
        label: &'static str,
        choices: impl IntoIterator<Item = S>,
        initial: &str,
    ) -> Self {
        let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
        let value = choices
            .iter()
            .find(|c| c.as_str() == initial)
            .or_else(|| choices.first())
            .cloned()
            .unwrap_or_default();
        Self {
            label,
            value,
            choices,
        }
    }

    fn is_choice(&self) -> bool {
        !self.choices.is_empty()
    }

    fn cycle(&mut self, forward: bool) {
        let len = self.choices.len();
        if len == 0 {
            return;
        }
        let i = self
            .choices
            .iter()
            .position(|c| *c == self.value)
            .unwrap_or(0);
        let next = if forward { (i + 1) % len } else { (i + len - 1) % len };
        self.value = self.choices[next].clone();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    Editing,
    Submit,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub title: String,
    pub fields: Vec<Field>,
    focus: usize,
}

impl Form {
    pub fn new(title: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            title: title.into(),
            fields,
            focus: 0,
        }
    }

    pub fn value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.trim())
            .unwrap_or("")
    }

    /// `None` for a blank field.
    pub fn optional(&self, label: &str) -> Option<String> {
        let value = self.value(label);
        (!value.is_empty()).then(|| value.to_string())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormEvent {
        let count = self.fields.len().max(1);
        match key.code {
            KeyCode::Esc => return FormEvent::Cancel,
            KeyCode::Enter => return FormEvent::Submit,
            KeyCode::Tab | KeyCode::Down => self.focus = (self.focus + 1) % count,
            KeyCode::BackTab | KeyCode::Up => self.focus = (self.focus + count - 1) % count,
            KeyCode::Left | KeyCode::Right => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.cycle(key.code == KeyCode::Right);
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    if !field.is_choice() {
                        field.value.pop();
                    }
                }
            }
            KeyCode::Char(c) => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    if !field.is_choice() {
                        field.value.push(c);
                    }
                }
            }
            _ => {}
        }
        FormEvent::Editing
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let height = (self.fields.len() as u16) * 2 + 4;
        let popup = centered_rect(60, height, area);

        let mut lines = Vec::with_capacity(self.fields.len() * 2 + 1);
        for (i, field) in self.fields.iter().enumerate() {
            let focused = i == self.focus;
            let label_style = if focused {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            lines.push(Line::from(Span::styled(field.label, label_style)));
            let value = if field.is_choice() {
                format!("< {} >", field.value)
            } else if focused {
                format!("{}_", field.value)
            } else {
                field.value.clone()
            };
            lines.push(Line::from(format!("  {value}")));
        }
        lines.push(Line::from(Span::styled(
            "Enter submit · Esc cancel · Tab next field · ←/→ change choice",
            Style::default().fg(Color::DarkGray),
        )));

        f.render_widget(Clear, popup);
        f.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .title(format!(" {} ", self.title))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            ),
            popup,
        );
    }
}
