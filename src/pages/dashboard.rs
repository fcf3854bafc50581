use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Row, Table, TableState},
    Frame,
};

use super::{clamp_selection, step_selection, Effects, Page};
use crate::alert::Level;
use crate::badge::{anomaly_icon, count_badge, Severity};
use crate::config::UiConfig;
use crate::error::ApiError;
use crate::format::{format_bytes, format_number, format_timestamp, or_dash, TimeStyle};
use crate::model::{DashboardSummary, LiveStats};
use crate::network::{Feed, Job, Outcome, Payload, Schedule};
use crate::ui::charts::{axis_labels, render_share_chart, render_time_series, Series};
use crate::ui::{block, header_row, highlight, message_row};

/// Auto-refresh steps offered by `+`/`-`; 0 switches refresh off.
const REFRESH_STEPS: [u64; 7] = [0, 1, 2, 5, 10, 15, 30];

pub struct DashboardPage {
    summary: Option<DashboardSummary>,
    live: Option<LiveStats>,
    load_error: Option<String>,
    refresh_secs: u64,
    refresh: Schedule,
    live_refresh: Schedule,
    captures: TableState,
}

impl DashboardPage {
    pub fn new(config: &UiConfig) -> Self {
        let refresh_secs = config.dashboard_refresh_secs.min(30);
        Self {
            summary: None,
            live: None,
            load_error: None,
            refresh_secs,
            refresh: refresh_schedule(refresh_secs),
            live_refresh: Schedule::every(UiConfig::clamp_secs(config.live_stats_secs)),
            captures: TableState::default(),
        }
    }

    pub fn refresh_secs(&self) -> u64 {
        self.refresh_secs
    }

    pub fn summary(&self) -> Option<&DashboardSummary> {
        self.summary.as_ref()
    }

    fn set_refresh(&mut self, secs: u64, now: Instant) {
        self.refresh_secs = secs;
        self.refresh
            .set_period((secs > 0).then(|| Duration::from_secs(secs)), now);
        if secs > 0 {
            tracing::info!(secs, "dashboard auto-refresh set");
        } else {
            tracing::info!("dashboard auto-refresh disabled");
        }
    }

    fn step_refresh(&mut self, faster: bool, now: Instant) {
        let current = REFRESH_STEPS
            .iter()
            .position(|s| *s >= self.refresh_secs)
            .unwrap_or(REFRESH_STEPS.len() - 1);
        let next = if faster {
            current.saturating_sub(1)
        } else {
            (current + 1).min(REFRESH_STEPS.len() - 1)
        };
        self.set_refresh(REFRESH_STEPS[next], now);
    }

    fn selected_capture(&self) -> Option<i64> {
        let summary = self.summary.as_ref()?;
        summary
            .active_captures
            .get(self.captures.selected()?)
            .map(|c| c.id)
    }

    fn render_live(&self, f: &mut Frame, area: Rect) {
        let label = Style::default().fg(Color::Gray);
        let value = Style::default().add_modifier(Modifier::BOLD);
        let bandwidth = self.live.as_ref().map(|l| &l.bandwidth);
        let show = |v: Option<u64>| v.map(format_bytes).unwrap_or_else(|| "-".to_string());

        let top = self
            .live
            .as_ref()
            .and_then(LiveStats::top_protocol)
            .map(|p| format!("{} ({:.1}%)", p.protocol, p.percentage))
            .unwrap_or_else(|| "-".to_string());
        let refresh = if self.refresh_secs == 0 {
            "off".to_string()
        } else {
            format!("{}s", self.refresh_secs)
        };

        let line = Line::from(vec![
            Span::styled("In ", label),
            Span::styled(show(bandwidth.and_then(|b| b.bytes_in)), value),
            Span::styled("   Out ", label),
            Span::styled(show(bandwidth.and_then(|b| b.bytes_out)), value),
            Span::styled("   Total ", label),
            Span::styled(show(bandwidth.and_then(|b| b.total_bytes())), value),
            Span::styled("   Top protocol ", label),
            Span::styled(top, value),
            Span::styled("   Auto-refresh ", label),
            Span::styled(refresh, value),
        ]);
        f.render_widget(Paragraph::new(line).block(block("Live")), area);
    }

    fn render_bandwidth(&self, f: &mut Frame, area: Rect) {
        let samples: Vec<_> = self
            .summary
            .as_ref()
            .map(|s| s.bandwidth.iter().rev().collect())
            .unwrap_or_default();
        let series = [
            Series::from_values("Inbound", samples.iter().map(|s| s.bytes_in)),
            Series::from_values("Outbound", samples.iter().map(|s| s.bytes_out)),
        ];
        let times: Vec<String> = samples
            .iter()
            .map(|s| format_timestamp(&s.timestamp, TimeStyle::Time))
            .collect();
        render_time_series(f, area, "Bandwidth", &series, &axis_labels(&times));
    }

    fn render_protocols(&self, f: &mut Frame, chart: Rect, table: Rect) {
        let protocols = self
            .summary
            .as_ref()
            .map(|s| s.protocols.as_slice())
            .unwrap_or_default();
        let slices: Vec<(String, u64, f64)> = protocols
            .iter()
            .map(|p| (p.protocol.clone(), p.byte_count, p.percentage))
            .collect();
        render_share_chart(f, chart, "Protocol share", &slices);

        let rows: Vec<Row> = if protocols.is_empty() {
            vec![message_row("No protocol data available", false)]
        } else {
            protocols
                .iter()
                .map(|p| {
                    Row::new(vec![
                        p.protocol.clone(),
                        format_number(p.packet_count),
                        format_bytes(p.byte_count),
                        format!("{:.1}%", p.percentage),
                    ])
                })
                .collect()
        };
        let widths = [
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(12),
            Constraint::Length(7),
        ];
        f.render_widget(
            Table::new(rows, widths)
                .header(header_row(&["Protocol", "Packets", "Bytes", "Share"]))
                .block(block("Protocols")),
            table,
        );
    }

    fn render_anomalies(&self, f: &mut Frame, area: Rect) {
        let anomalies = self
            .summary
            .as_ref()
            .map(|s| s.anomalies.as_slice())
            .unwrap_or_default();
        let items: Vec<ListItem> = if anomalies.is_empty() {
            vec![ListItem::new(Span::styled(
                "No anomalies detected",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            anomalies
                .iter()
                .map(|a| {
                    let severity = Severity::from_code(a.severity);
                    ListItem::new(vec![
                        Line::from(vec![
                            Span::styled(
                                format!("{} ", anomaly_icon(a.severity)),
                                Style::default().fg(severity.color()),
                            ),
                            Span::styled(
                                a.event_type.clone(),
                                Style::default().add_modifier(Modifier::BOLD),
                            ),
                            Span::styled(
                                format!("  {}", format_timestamp(&a.timestamp, TimeStyle::Time)),
                                Style::default().fg(Color::DarkGray),
                            ),
                        ]),
                        Line::from(format!("  {}", or_dash(a.description.as_deref()))),
                    ])
                })
                .collect()
        };
        let title = Line::from(vec![Span::raw(" Recent anomalies "), count_badge(anomalies.len())]);
        f.render_widget(
            List::new(items).block(Block::default().borders(Borders::ALL).title(title)),
            area,
        );
    }

    fn render_captures(&mut self, f: &mut Frame, area: Rect) {
        let rows: Vec<Row> = match (&self.summary, &self.load_error) {
            (None, Some(err)) => vec![message_row(format!("Error loading data: {err}"), true)],
            (None, None) => vec![message_row("Loading...", false)],
            (Some(s), _) if s.active_captures.is_empty() => {
                vec![message_row("No active captures", false)]
            }
            (Some(s), _) => s
                .active_captures
                .iter()
                .map(|c| {
                    Row::new(vec![
                        c.name.clone(),
                        c.interface.clone(),
                        format_timestamp(&c.start_time, TimeStyle::Time),
                        format_number(c.packet_count),
                        or_dash(c.filter_expression.as_deref()).to_string(),
                    ])
                })
                .collect(),
        };
        let widths = [
            Constraint::Percentage(25),
            Constraint::Percentage(15),
            Constraint::Percentage(15),
            Constraint::Percentage(15),
            Constraint::Percentage(30),
        ];
        let table = Table::new(rows, widths)
            .header(header_row(&["Name", "Interface", "Started", "Packets", "Filter"]))
            .block(block("Active captures (x stop)"))
            .highlight_style(highlight())
            .highlight_symbol(">> ");
        f.render_stateful_widget(table, area, &mut self.captures);
    }
}

fn refresh_schedule(secs: u64) -> Schedule {
    if secs == 0 {
        Schedule::off()
    } else {
        Schedule::every(Duration::from_secs(secs))
    }
}

impl Page for DashboardPage {
    fn activate(&mut self, now: Instant, fx: &mut Effects) {
        fx.fetch(Job::Summary);
        fx.fetch(Job::LiveStats);
        self.refresh.restart(now);
        self.live_refresh.restart(now);
    }

    fn tick(&mut self, now: Instant, fx: &mut Effects) {
        if self.refresh.due(now) {
            fx.fetch(Job::Summary);
        }
        if self.live_refresh.due(now) {
            fx.fetch(Job::LiveStats);
        }
    }

    fn handle_key(&mut self, key: KeyEvent, fx: &mut Effects) -> bool {
        let len = self
            .summary
            .as_ref()
            .map(|s| s.active_captures.len())
            .unwrap_or(0);
        match key.code {
            KeyCode::Down => self
                .captures
                .select(step_selection(self.captures.selected(), len, true)),
            KeyCode::Up => self
                .captures
                .select(step_selection(self.captures.selected(), len, false)),
            KeyCode::Char('+') | KeyCode::Char('=') => self.step_refresh(false, Instant::now()),
            KeyCode::Char('-') => self.step_refresh(true, Instant::now()),
            KeyCode::Char('x') => match self.selected_capture() {
                Some(capture_id) => fx.fetch(Job::StopCapture { capture_id }),
                None => fx.alert(Level::Warning, "No active capture selected"),
            },
            _ => return false,
        }
        true
    }

    fn apply(&mut self, payload: Payload, fx: &mut Effects) {
        match payload {
            Payload::Summary(summary) => {
                let selected = clamp_selection(self.captures.selected(), summary.active_captures.len());
                self.captures.select(selected);
                self.summary = Some(summary);
                self.load_error = None;
            }
            Payload::LiveStats(live) => self.live = Some(live),
            Payload::Done(Outcome::CaptureStopped(id)) => {
                fx.alert(Level::Success, format!("Capture {id} stopped"));
                fx.fetch(Job::Summary);
            }
            _ => {}
        }
    }

    fn fail(&mut self, feed: Feed, error: &ApiError, fx: &mut Effects) {
        if feed == Feed::Summary {
            self.load_error = Some(error.to_string());
        }
        // Live stats are polled every couple of seconds; a banner per miss is noise.
        if feed != Feed::LiveStats {
            fx.alert(Level::Danger, super::failure_message(feed, error));
        }
    }

    fn help(&self) -> &'static str {
        "↑/↓ select capture · x stop capture · +/- refresh interval · r reload"
    }

    fn render(&mut self, f: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Percentage(45),
                Constraint::Min(8),
            ])
            .split(area);
        self.render_live(f, rows[0]);

        let charts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);
        self.render_bandwidth(f, charts[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Percentage(30),
                Constraint::Percentage(40),
            ])
            .split(rows[2]);
        self.render_protocols(f, charts[1], bottom[0]);
        self.render_anomalies(f, bottom[1]);
        self.render_captures(f, bottom[2]);
    }
}
