//! Transient feedback banners.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::style::Color;

pub const ALERT_TTL: Duration = Duration::from_secs(5);
const MAX_VISIBLE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Danger,
}

impl Level {
    pub fn color(self) -> Color {
        match self {
            Level::Info => Color::Cyan,
            Level::Success => Color::Green,
            Level::Warning => Color::Yellow,
            Level::Danger => Color::Red,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: Level,
    pub message: String,
    pub raised_at: Instant,
}

#[derive(Debug, Default)]
pub struct Alerts {
    queue: VecDeque<Alert>,
}

impl Alerts {
    pub fn push(&mut self, level: Level, message: impl Into<String>) {
        self.push_at(level, message, Instant::now());
    }

    pub fn push_at(&mut self, level: Level, message: impl Into<String>, now: Instant) {
        self.queue.push_back(Alert {
            level,
            message: message.into(),
            raised_at: now,
        });
        while self.queue.len() > MAX_VISIBLE {
            self.queue.pop_front();
        }
    }

    /// Drops alerts older than [`ALERT_TTL`].
    pub fn prune(&mut self, now: Instant) {
        self.queue
            .retain(|a| now.saturating_duration_since(a.raised_at) < ALERT_TTL);
    }

    pub fn dismiss_latest(&mut self) -> Option<Alert> {
        self.queue.pop_back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
