//! Page controllers: one per dashboard screen. Each page owns its state,
//! turns keys into [`Job`]s and redraws from the last applied response.

pub mod anomalies;
pub mod dashboard;
pub mod flows;
pub mod packets;
pub mod protocols;

use std::time::Instant;

use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::alert::Level;
use crate::error::ApiError;
use crate::network::{Feed, Job, Payload};

pub use anomalies::AnomaliesPage;
pub use dashboard::DashboardPage;
pub use flows::FlowsPage;
pub use packets::PacketsPage;
pub use protocols::ProtocolsPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageId {
    Dashboard,
    Packets,
    Flows,
    Protocols,
    Anomalies,
}

impl PageId {
    pub const ALL: [PageId; 5] = [
        PageId::Dashboard,
        PageId::Packets,
        PageId::Flows,
        PageId::Protocols,
        PageId::Anomalies,
    ];

    pub fn title(self) -> &'static str {
        match self {
            PageId::Dashboard => "Dashboard",
            PageId::Packets => "Packets",
            PageId::Flows => "Flows",
            PageId::Protocols => "Protocols",
            PageId::Anomalies => "Anomalies",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// What a page wants done after handling an event.
#[derive(Debug, Default)]
pub struct Effects {
    pub jobs: Vec<Job>,
    pub alerts: Vec<(Level, String)>,
}

impl Effects {
    pub fn fetch(&mut self, job: Job) {
        self.jobs.push(job);
    }

    pub fn alert(&mut self, level: Level, message: impl Into<String>) {
        self.alerts.push((level, message.into()));
    }
}

pub trait Page {
    /// Initial load when the page is shown (or refreshed by hand).
    fn activate(&mut self, now: Instant, fx: &mut Effects);

    /// Periodic refreshes.
    fn tick(&mut self, now: Instant, fx: &mut Effects);

    /// Returns `false` when the key is not meant for this page.
    fn handle_key(&mut self, key: KeyEvent, fx: &mut Effects) -> bool;

    fn apply(&mut self, payload: Payload, fx: &mut Effects);

    fn fail(&mut self, feed: Feed, error: &ApiError, fx: &mut Effects) {
        fx.alert(Level::Danger, failure_message(feed, error));
    }

    /// True while a form has keyboard focus.
    fn editing(&self) -> bool {
        false
    }

    fn help(&self) -> &'static str;

    fn render(&mut self, f: &mut Frame, area: Rect);
}

/// Banner text for a failed request.
pub fn failure_message(feed: Feed, error: &ApiError) -> String {
    if feed.is_command() {
        format!("Failed to {}: {error}", feed.describe())
    } else {
        format!("Error loading {}: {error}", feed.describe())
    }
}

/// Moves a selection through `len` rows, wrapping at both ends.
pub(crate) fn step_selection(selected: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match selected {
        Some(i) if forward => {
            if i >= len - 1 {
                0
            } else {
                i + 1
            }
        }
        Some(i) => {
            if i == 0 {
                len - 1
            } else {
                i - 1
            }
        }
        None => 0,
    })
}

/// Keeps a selection inside a list that may have shrunk.
pub(crate) fn clamp_selection(selected: Option<usize>, len: usize) -> Option<usize> {
    match (selected, len) {
        (_, 0) => None,
        (Some(i), len) => Some(i.min(len - 1)),
        (None, _) => Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_cycle() {
        assert_eq!(PageId::Anomalies.next(), PageId::Dashboard);
        assert_eq!(PageId::Dashboard.prev(), PageId::Anomalies);
    }

    #[test]
    fn selection_wraps() {
        assert_eq!(step_selection(Some(2), 3, true), Some(0));
        assert_eq!(step_selection(Some(0), 3, false), Some(2));
        assert_eq!(step_selection(None, 3, true), Some(0));
        assert_eq!(step_selection(Some(1), 0, true), None);
    }

    #[test]
    fn selection_is_clamped() {
        assert_eq!(clamp_selection(Some(5), 2), Some(1));
        assert_eq!(clamp_selection(Some(0), 0), None);
        assert_eq!(clamp_selection(None, 4), Some(0));
    }

    #[test]
    fn failure_messages_name_the_action() {
        let err = ApiError::Rejected("capture not found".to_string());
        assert_eq!(
            failure_message(Feed::StopCapture, &err),
            "Failed to stop capture: capture not found"
        );
        assert_eq!(
            failure_message(Feed::Flows, &err),
            "Error loading flows: capture not found"
        );
    }
}
