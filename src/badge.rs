//! Severity and status badges.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

/// Anomaly severity on the backend's 1-5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Codes outside 1-5 fall back to `Info`.
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => Severity::Low,
            3 => Severity::Medium,
            4 => Severity::High,
            5 => Severity::Critical,
            _ => Severity::Info,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Severity::Info => "ℹ",
            Severity::Low => "!",
            Severity::Medium | Severity::High => "▲",
            Severity::Critical => "☢",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Severity::Info => Color::Cyan,
            Severity::Low => Color::Green,
            Severity::Medium => Color::Yellow,
            Severity::High => Color::Rgb(253, 126, 20),
            Severity::Critical => Color::Red,
        }
    }

    pub fn badge(self) -> Span<'static> {
        Span::styled(
            format!(" {} {} ", self.icon(), self.label()),
            Style::default()
                .fg(Color::Black)
                .bg(self.color())
                .add_modifier(Modifier::BOLD),
        )
    }
}

/// Glyph used in the dashboard's recent-anomaly list.
pub fn anomaly_icon(severity: u8) -> &'static str {
    match severity {
        s if s >= 4 => "⊗",
        3 => "▲",
        2 => "?",
        _ => "ℹ",
    }
}

/// Running state of a backend service as last reported by a start/stop call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServiceStatus {
    Active,
    #[default]
    Inactive,
}

impl ServiceStatus {
    pub fn is_active(self) -> bool {
        self == ServiceStatus::Active
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceStatus::Active => "Active",
            ServiceStatus::Inactive => "Inactive",
        }
    }

    pub fn badge(self) -> Span<'static> {
        let bg = match self {
            ServiceStatus::Active => Color::Green,
            ServiceStatus::Inactive => Color::DarkGray,
        };
        Span::styled(
            format!(" {} ", self.label()),
            Style::default().fg(Color::Black).bg(bg),
        )
    }

    /// Whether the start control is usable; stop is the inverse.
    pub fn can_start(self) -> bool {
        !self.is_active()
    }

    pub fn can_stop(self) -> bool {
        self.is_active()
    }
}

/// Count badge: red once anything is pending, grey otherwise.
pub fn count_badge(count: usize) -> Span<'static> {
    let bg = if count > 0 { Color::Red } else { Color::DarkGray };
    Span::styled(format!(" {count} "), Style::default().fg(Color::White).bg(bg))
}
