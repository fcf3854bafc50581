use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use super::{clamp_selection, step_selection, Effects, Page};
use crate::alert::Level;
use crate::api::{AnomalyQuery, DetectionMethod, DetectionSettings};
use crate::badge::{ServiceStatus, Severity};
use crate::config::UiConfig;
use crate::error::ApiError;
use crate::format::{format_number, format_timestamp, or_dash, TimeStyle};
use crate::model::{Anomaly, AnomalyStatistics};
use crate::network::{Feed, Job, Outcome, Payload};
use crate::pagination::Pager;
use crate::ui::charts::render_bar_chart;
use crate::ui::form::{Field, Form, FormEvent};
use crate::ui::{block, header_row, highlight, message_row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialog {
    Detection,
    Resolve(i64),
}

pub struct AnomaliesPage {
    detection: ServiceStatus,
    pending_method: Option<DetectionMethod>,
    severity_filter: Option<u8>,
    resolved_filter: Option<bool>,
    anomalies: Vec<Anomaly>,
    anomalies_error: Option<String>,
    pager: Pager,
    table: TableState,
    stats: Option<AnomalyStatistics>,
    dialog: Option<(Dialog, Form)>,
}

impl AnomaliesPage {
    pub fn new(config: &UiConfig) -> Self {
        Self {
            detection: ServiceStatus::default(),
            pending_method: None,
            severity_filter: None,
            resolved_filter: None,
            anomalies: Vec::new(),
            anomalies_error: None,
            pager: Pager::new(config.anomalies_per_page),
            table: TableState::default(),
            stats: None,
            dialog: None,
        }
    }

    pub fn detection(&self) -> ServiceStatus {
        self.detection
    }

    pub fn query(&self, page: u32) -> AnomalyQuery {
        AnomalyQuery {
            page,
            per_page: self.pager.per_page,
            severity: self.severity_filter,
            resolved: self.resolved_filter,
            ..Default::default()
        }
    }

    fn reload_from_start(&mut self, fx: &mut Effects) {
        self.pager.reset();
        fx.fetch(Job::Anomalies(self.query(1)));
    }

    fn selected(&self) -> Option<&Anomaly> {
        self.anomalies.get(self.table.selected()?)
    }

    fn open_detection_form(&mut self) {
        let defaults = DetectionSettings::default();
        let form = Form::new(
            "Start anomaly detection",
            vec![
                Field::choice(
                    "Method",
                    DetectionMethod::ALL.iter().map(|m| m.as_str()),
                    defaults.method.as_str(),
                ),
                Field::text("Sensitivity", format!("{:.1}", defaults.sensitivity)),
            ],
        );
        self.dialog = Some((Dialog::Detection, form));
    }

    fn open_resolve_form(&mut self, fx: &mut Effects) {
        let Some(anomaly) = self.selected() else {
            fx.alert(Level::Warning, "No anomaly selected");
            return;
        };
        if anomaly.resolved {
            fx.alert(Level::Info, format!("Anomaly {} is already resolved", anomaly.id));
            return;
        }
        let id = anomaly.id;
        let form = Form::new(
            format!("Resolve anomaly {id}: {}", anomaly.event_type),
            vec![Field::text("Resolution notes", "")],
        );
        self.dialog = Some((Dialog::Resolve(id), form));
    }

    fn handle_dialog(&mut self, key: KeyEvent, fx: &mut Effects) {
        let Some((kind, form)) = self.dialog.as_mut() else {
            return;
        };
        match form.handle_key(key) {
            FormEvent::Editing => {}
            FormEvent::Cancel => self.dialog = None,
            FormEvent::Submit => match *kind {
                Dialog::Detection => match detection_request(form) {
                    Ok(settings) => {
                        self.pending_method = Some(settings.method);
                        fx.fetch(Job::StartDetection(settings));
                        self.dialog = None;
                    }
                    Err(message) => fx.alert(Level::Danger, message),
                },
                Dialog::Resolve(anomaly_id) => {
                    let notes = form.value("Resolution notes").to_string();
                    fx.fetch(Job::ResolveAnomaly { anomaly_id, notes });
                    self.dialog = None;
                }
            },
        }
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let label = Style::default().fg(Color::Gray);
        let value = Style::default().add_modifier(Modifier::BOLD);
        let (total, unresolved, high) = self
            .stats
            .as_ref()
            .map(|s| (s.total, s.by_resolution.unresolved, s.high_severity()))
            .unwrap_or_default();
        let severity = self
            .severity_filter
            .map(|s| Severity::from_code(s).label())
            .unwrap_or("all");
        let resolved = match self.resolved_filter {
            None => "all",
            Some(true) => "resolved",
            Some(false) => "unresolved",
        };
        let line = Line::from(vec![
            Span::styled("Detection ", label),
            self.detection.badge(),
            Span::styled("   Total ", label),
            Span::styled(format_number(total), value),
            Span::styled("   Unresolved ", label),
            Span::styled(format_number(unresolved), value.fg(Color::Yellow)),
            Span::styled("   High severity ", label),
            Span::styled(format_number(high), value.fg(Color::Red)),
            Span::styled("   Severity filter ", label),
            Span::raw(severity),
            Span::styled("   Status filter ", label),
            Span::raw(resolved),
        ]);
        f.render_widget(Paragraph::new(line).block(block("Anomaly detection")), area);
    }

    fn render_table(&mut self, f: &mut Frame, area: Rect) {
        let rows: Vec<Row> = if let Some(err) = &self.anomalies_error {
            vec![message_row(format!("Error loading anomalies: {err}"), true)]
        } else if self.anomalies.is_empty() {
            vec![message_row("No anomalies found", false)]
        } else {
            self.anomalies
                .iter()
                .enumerate()
                .map(|(i, a)| {
                    let status = if a.resolved {
                        Span::styled("Resolved", Style::default().fg(Color::Green))
                    } else {
                        Span::styled("Open", Style::default().fg(Color::Yellow))
                    };
                    Row::new(vec![
                        Line::from(self.pager.row_number(i).to_string()),
                        Line::from(format_timestamp(&a.timestamp, TimeStyle::DateTime)),
                        Line::from(a.event_type.clone()),
                        Line::from(Severity::from_code(a.severity).badge()),
                        Line::from(or_dash(a.source_ip.as_deref()).to_string()),
                        Line::from(or_dash(a.destination_ip.as_deref()).to_string()),
                        Line::from(status),
                    ])
                })
                .collect()
        };
        let widths = [
            Constraint::Length(5),
            Constraint::Length(20),
            Constraint::Percentage(22),
            Constraint::Length(14),
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Length(9),
        ];
        let table = Table::new(rows, widths)
            .header(header_row(&[
                "#", "Time", "Event", "Severity", "Source", "Destination", "Status",
            ]))
            .block(block(format!("Anomalies · {}", self.pager.label())))
            .highlight_style(highlight())
            .highlight_symbol("> ");
        f.render_stateful_widget(table, area, &mut self.table);
    }

    fn render_selected(&self, f: &mut Frame, area: Rect) {
        let lines = match self.selected() {
            None => vec![Line::from(Span::styled(
                "Select an anomaly to see its description",
                Style::default().fg(Color::DarkGray),
            ))],
            Some(a) => {
                let mut lines = vec![
                    Line::from(vec![
                        Severity::from_code(a.severity).badge(),
                        Span::styled(
                            format!(" {} #{}", a.event_type, a.id),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                    ]),
                    Line::from(or_dash(a.description.as_deref()).to_string()),
                ];
                if let Some(notes) = a.resolution_notes.as_deref().filter(|n| !n.is_empty()) {
                    lines.push(Line::from(vec![
                        Span::styled("Resolution: ", Style::default().fg(Color::Green)),
                        Span::raw(notes.to_string()),
                    ]));
                }
                lines
            }
        };
        f.render_widget(
            Paragraph::new(lines)
                .block(block("Details"))
                .wrap(Wrap { trim: true }),
            area,
        );
    }

    fn render_statistics(&self, f: &mut Frame, severity: Rect, events: Rect) {
        let buckets = self
            .stats
            .as_ref()
            .map(AnomalyStatistics::severity_buckets)
            .unwrap_or_default();
        let by_severity: Vec<(String, u64)> = if self.stats.is_some() {
            Severity::ALL
                .iter()
                .zip(buckets)
                .map(|(s, count)| (s.label().to_string(), count))
                .collect()
        } else {
            Vec::new()
        };
        render_bar_chart(f, severity, "By severity", &by_severity, false, format_number);

        let by_event: Vec<(String, u64)> = self
            .stats
            .as_ref()
            .map(|s| {
                s.by_event_type
                    .iter()
                    .map(|e| (e.event_type.clone(), e.count))
                    .collect()
            })
            .unwrap_or_default();
        render_bar_chart(f, events, "By event type", &by_event, true, format_number);
    }
}

impl Page for AnomaliesPage {
    fn activate(&mut self, _now: Instant, fx: &mut Effects) {
        fx.fetch(Job::Anomalies(self.query(self.pager.page)));
        fx.fetch(Job::AnomalyStatistics);
    }

    fn tick(&mut self, _now: Instant, _fx: &mut Effects) {}

    fn handle_key(&mut self, key: KeyEvent, fx: &mut Effects) -> bool {
        if self.dialog.is_some() {
            self.handle_dialog(key, fx);
            return true;
        }
        match key.code {
            KeyCode::Down | KeyCode::Up => {
                let forward = key.code == KeyCode::Down;
                self.table.select(step_selection(
                    self.table.selected(),
                    self.anomalies.len(),
                    forward,
                ));
            }
            KeyCode::Char('[') | KeyCode::Left => {
                if let Some(page) = self.pager.prev() {
                    fx.fetch(Job::Anomalies(self.query(page)));
                }
            }
            KeyCode::Char(']') | KeyCode::Right => {
                if let Some(page) = self.pager.next() {
                    fx.fetch(Job::Anomalies(self.query(page)));
                }
            }
            KeyCode::Char('s') => {
                if self.detection.can_start() {
                    self.open_detection_form();
                } else {
                    fx.alert(Level::Warning, "Anomaly detection is already running");
                }
            }
            KeyCode::Char('x') => {
                if self.detection.can_stop() {
                    fx.fetch(Job::StopDetection);
                } else {
                    fx.alert(Level::Warning, "Anomaly detection is not running");
                }
            }
            KeyCode::Char('v') => {
                self.severity_filter = next_severity_filter(self.severity_filter);
                self.reload_from_start(fx);
            }
            KeyCode::Char('u') => {
                self.resolved_filter = next_resolved_filter(self.resolved_filter);
                self.reload_from_start(fx);
            }
            KeyCode::Enter | KeyCode::Char('o') => self.open_resolve_form(fx),
            _ => return false,
        }
        true
    }

    fn apply(&mut self, payload: Payload, fx: &mut Effects) {
        match payload {
            Payload::Anomalies(page) => {
                self.pager.update(page.current_page, page.pages, page.total);
                let selected = clamp_selection(self.table.selected(), page.anomalies.len());
                self.table.select(selected);
                self.anomalies = page.anomalies;
                self.anomalies_error = None;
            }
            Payload::AnomalyStatistics(stats) => self.stats = Some(stats),
            Payload::Done(Outcome::DetectionStarted) => {
                self.detection = ServiceStatus::Active;
                let method = self.pending_method.take().unwrap_or_default();
                fx.alert(
                    Level::Success,
                    format!(
                        "Anomaly detection started successfully using {} method",
                        method.as_str()
                    ),
                );
            }
            Payload::Done(Outcome::DetectionStopped) => {
                self.detection = ServiceStatus::Inactive;
                fx.alert(Level::Success, "Anomaly detection stopped successfully");
            }
            Payload::Done(Outcome::AnomalyResolved(id)) => {
                tracing::info!(anomaly_id = id, "anomaly resolved");
                fx.alert(Level::Success, "Anomaly resolved successfully");
                fx.fetch(Job::Anomalies(self.query(self.pager.page)));
                fx.fetch(Job::AnomalyStatistics);
            }
            _ => {}
        }
    }

    fn fail(&mut self, feed: Feed, error: &ApiError, fx: &mut Effects) {
        match feed {
            Feed::Anomalies => self.anomalies_error = Some(error.to_string()),
            Feed::StartDetection => self.pending_method = None,
            _ => {}
        }
        fx.alert(Level::Danger, super::failure_message(feed, error));
    }

    fn editing(&self) -> bool {
        self.dialog.is_some()
    }

    fn help(&self) -> &'static str {
        "↑/↓ select · Enter resolve · s start detection · x stop detection · v severity filter · u status filter · [/] page · r reload"
    }

    fn render(&mut self, f: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(10)])
            .split(area);
        self.render_status(f, rows[0]);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(rows[1]);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(6)])
            .split(columns[0]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(columns[1]);

        self.render_table(f, left[0]);
        self.render_selected(f, left[1]);
        self.render_statistics(f, right[0], right[1]);

        if let Some((_, form)) = &self.dialog {
            form.render(f, area);
        }
    }
}

/// All → 1 → … → 5 → all.
fn next_severity_filter(current: Option<u8>) -> Option<u8> {
    match current {
        None => Some(1),
        Some(s) if s >= 5 => None,
        Some(s) => Some(s + 1),
    }
}

/// All → unresolved → resolved → all.
fn next_resolved_filter(current: Option<bool>) -> Option<bool> {
    match current {
        None => Some(false),
        Some(false) => Some(true),
        Some(true) => None,
    }
}

fn detection_request(form: &Form) -> Result<DetectionSettings, &'static str> {
    let method = DetectionMethod::ALL
        .into_iter()
        .find(|m| m.as_str() == form.value("Method"))
        .unwrap_or_default();
    let sensitivity = form
        .value("Sensitivity")
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s > 0.0)
        .ok_or("Please enter a valid sensitivity value (greater than 0)")?;
    Ok(DetectionSettings {
        method,
        sensitivity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnomalyPage;
    use crossterm::event::KeyModifiers;

    fn page() -> AnomaliesPage {
        AnomaliesPage::new(&UiConfig::default())
    }

    fn press(page: &mut AnomaliesPage, code: KeyCode) -> Effects {
        let mut fx = Effects::default();
        page.handle_key(KeyEvent::new(code, KeyModifiers::NONE), &mut fx);
        fx
    }

    fn type_text(page: &mut AnomaliesPage, text: &str) {
        for c in text.chars() {
            press(page, KeyCode::Char(c));
        }
    }

    fn anomaly(id: i64, severity: u8, resolved: bool) -> Anomaly {
        Anomaly {
            id,
            timestamp: "2024-03-01T10:00:00".to_string(),
            event_type: "port_scan".to_string(),
            severity,
            description: Some("many ports".to_string()),
            source_ip: Some("10.0.0.5".to_string()),
            destination_ip: None,
            resolved,
            resolution_notes: None,
        }
    }

    fn load(page: &mut AnomaliesPage, anomalies: Vec<Anomaly>, current: u32, pages: u32) {
        page.apply(
            Payload::Anomalies(AnomalyPage {
                total: anomalies.len() as u64,
                anomalies,
                pages,
                current_page: current,
            }),
            &mut Effects::default(),
        );
    }

    #[test]
    fn activation_loads_table_and_statistics() {
        let mut page = page();
        let mut fx = Effects::default();
        page.activate(Instant::now(), &mut fx);
        assert_eq!(
            fx.jobs,
            vec![
                Job::Anomalies(AnomalyQuery { page: 1, per_page: 10, ..Default::default() }),
                Job::AnomalyStatistics,
            ]
        );
    }

    #[test]
    fn filters_cycle_and_restart_paging() {
        let mut page = page();
        load(&mut page, vec![], 3, 5);
        let fx = press(&mut page, KeyCode::Char('v'));
        assert_eq!(
            fx.jobs,
            vec![Job::Anomalies(AnomalyQuery {
                page: 1,
                per_page: 10,
                severity: Some(1),
                ..Default::default()
            })]
        );
        let fx = press(&mut page, KeyCode::Char('u'));
        assert_eq!(
            fx.jobs,
            vec![Job::Anomalies(AnomalyQuery {
                page: 1,
                per_page: 10,
                severity: Some(1),
                resolved: Some(false),
                ..Default::default()
            })]
        );
    }

    #[test]
    fn severity_filter_wraps_back_to_all() {
        let mut filter = None;
        for _ in 0..6 {
            filter = next_severity_filter(filter);
        }
        assert_eq!(filter, None);
        assert_eq!(next_resolved_filter(Some(true)), None);
    }

    #[test]
    fn empty_result_disables_both_directions() {
        let mut page = page();
        load(&mut page, vec![], 1, 0);
        assert!(press(&mut page, KeyCode::Char(']')).jobs.is_empty());
        assert!(press(&mut page, KeyCode::Char('[')).jobs.is_empty());
    }

    #[test]
    fn sensitivity_must_be_positive() {
        let mut page = page();
        press(&mut page, KeyCode::Char('s'));
        press(&mut page, KeyCode::Tab);
        for _ in 0..3 {
            press(&mut page, KeyCode::Backspace);
        }
        type_text(&mut page, "-1");
        let fx = press(&mut page, KeyCode::Enter);
        assert!(fx.jobs.is_empty());
        assert_eq!(
            fx.alerts[0].1,
            "Please enter a valid sensitivity value (greater than 0)"
        );
    }

    #[test]
    fn detection_lifecycle() {
        let mut page = page();
        press(&mut page, KeyCode::Char('s'));
        press(&mut page, KeyCode::Right);
        let fx = press(&mut page, KeyCode::Enter);
        assert_eq!(
            fx.jobs,
            vec![Job::StartDetection(DetectionSettings {
                method: DetectionMethod::RuleBased,
                sensitivity: 3.0,
            })]
        );

        let mut fx = Effects::default();
        page.apply(Payload::Done(Outcome::DetectionStarted), &mut fx);
        assert!(page.detection().is_active());
        assert_eq!(
            fx.alerts[0].1,
            "Anomaly detection started successfully using rule-based method"
        );

        assert_eq!(press(&mut page, KeyCode::Char('x')).jobs, vec![Job::StopDetection]);
        page.apply(Payload::Done(Outcome::DetectionStopped), &mut Effects::default());
        assert!(!page.detection().is_active());
    }

    #[test]
    fn resolve_sends_notes_and_reloads() {
        let mut page = page();
        load(&mut page, vec![anomaly(7, 4, false)], 1, 1);
        press(&mut page, KeyCode::Enter);
        assert!(page.editing());
        type_text(&mut page, "false positive");
        let fx = press(&mut page, KeyCode::Enter);
        assert_eq!(
            fx.jobs,
            vec![Job::ResolveAnomaly {
                anomaly_id: 7,
                notes: "false positive".to_string(),
            }]
        );

        let mut fx = Effects::default();
        page.apply(Payload::Done(Outcome::AnomalyResolved(7)), &mut fx);
        assert_eq!(
            fx.jobs,
            vec![
                Job::Anomalies(AnomalyQuery { page: 1, per_page: 10, ..Default::default() }),
                Job::AnomalyStatistics,
            ]
        );
    }

    #[test]
    fn resolved_anomalies_cannot_be_resolved_again() {
        let mut page = page();
        load(&mut page, vec![anomaly(7, 2, true)], 1, 1);
        let fx = press(&mut page, KeyCode::Enter);
        assert!(!page.editing());
        assert_eq!(fx.alerts[0].0, Level::Info);
    }
}
