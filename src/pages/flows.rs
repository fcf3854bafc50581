use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Row, Table, TableState},
    Frame,
};

use super::{clamp_selection, step_selection, Effects, Page};
use crate::alert::Level;
use crate::api::{CollectorSettings, FlowQuery, FlowType};
use crate::badge::ServiceStatus;
use crate::config::UiConfig;
use crate::error::ApiError;
use crate::format::{endpoint, format_bytes, format_number, format_timestamp, protocol_name, TimeStyle};
use crate::model::{FlowRecord, Talker, TimeRange, TopTalkers};
use crate::network::{Feed, Job, Outcome, Payload};
use crate::pagination::Pager;
use crate::ui::charts::{render_bar_chart, render_network_map, LinkGraph};
use crate::ui::form::{Field, Form, FormEvent};
use crate::ui::{block, header_row, highlight, message_row};

const MAP_NODES: usize = 12;
const ANY: &str = "any";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Records,
    Talkers,
    Map,
}

impl View {
    fn next(self) -> Self {
        match self {
            View::Records => View::Talkers,
            View::Talkers => View::Map,
            View::Map => View::Records,
        }
    }

    fn title(self) -> &'static str {
        match self {
            View::Records => "records",
            View::Talkers => "top talkers",
            View::Map => "map",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialog {
    Collector,
    Filter,
}

/// Table filters applied to every flow request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowFilter {
    pub flow_type: Option<String>,
    pub source_ip: Option<String>,
    pub destination_ip: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl FlowFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = [
            self.flow_type.as_ref().map(|v| format!("type={v}")),
            self.source_ip.as_ref().map(|v| format!("src={v}")),
            self.destination_ip.as_ref().map(|v| format!("dst={v}")),
            self.start_time.as_ref().map(|v| format!("from={v}")),
            self.end_time.as_ref().map(|v| format!("to={v}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join(" ")
        }
    }
}

pub struct FlowsPage {
    collector: ServiceStatus,
    pending_collector: Option<CollectorSettings>,
    filter: FlowFilter,
    flows: Vec<FlowRecord>,
    flows_error: Option<String>,
    pager: Pager,
    flow_state: TableState,
    talkers: Option<TopTalkers>,
    talkers_error: Option<String>,
    time_range: TimeRange,
    limit: u32,
    view: View,
    dialog: Option<(Dialog, Form)>,
}

impl FlowsPage {
    pub fn new(config: &UiConfig) -> Self {
        Self {
            collector: ServiceStatus::default(),
            pending_collector: None,
            filter: FlowFilter::default(),
            flows: Vec::new(),
            flows_error: None,
            pager: Pager::new(config.flows_per_page),
            flow_state: TableState::default(),
            talkers: None,
            talkers_error: None,
            time_range: config.default_time_range,
            limit: config.top_talkers_limit.max(1),
            view: View::Records,
            dialog: None,
        }
    }

    pub fn collector(&self) -> ServiceStatus {
        self.collector
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn query(&self, page: u32) -> FlowQuery {
        FlowQuery {
            page,
            per_page: self.pager.per_page,
            flow_type: self.filter.flow_type.clone(),
            source_ip: self.filter.source_ip.clone(),
            destination_ip: self.filter.destination_ip.clone(),
            start_time: self.filter.start_time.clone(),
            end_time: self.filter.end_time.clone(),
        }
    }

    fn talkers_job(&self) -> Job {
        Job::TopTalkers {
            time_range: self.time_range,
            limit: self.limit,
        }
    }

    /// Host graph of the flows on the current page.
    pub fn link_graph(&self) -> LinkGraph {
        LinkGraph::build(
            self.flows.iter().map(|f| {
                (
                    f.source_ip.as_str(),
                    f.destination_ip.as_str(),
                    f.bytes.unwrap_or(0),
                )
            }),
            MAP_NODES,
        )
    }

    fn open_collector_form(&mut self) {
        let defaults = CollectorSettings::default();
        let form = Form::new(
            "Start flow collector",
            vec![
                Field::choice(
                    "Flow type",
                    FlowType::ALL.iter().map(|t| t.as_str()),
                    defaults.flow_type.as_str(),
                ),
                Field::text("Port", defaults.port.to_string()),
            ],
        );
        self.dialog = Some((Dialog::Collector, form));
    }

    fn open_filter_form(&mut self) {
        let current = self.filter.flow_type.as_deref().unwrap_or(ANY);
        let types = std::iter::once(ANY).chain(FlowType::ALL.iter().map(|t| t.as_str()));
        let form = Form::new(
            "Filter flows",
            vec![
                Field::choice("Flow type", types, current),
                Field::text("Source IP", self.filter.source_ip.clone().unwrap_or_default()),
                Field::text(
                    "Destination IP",
                    self.filter.destination_ip.clone().unwrap_or_default(),
                ),
                Field::text("Start time", self.filter.start_time.clone().unwrap_or_default()),
                Field::text("End time", self.filter.end_time.clone().unwrap_or_default()),
            ],
        );
        self.dialog = Some((Dialog::Filter, form));
    }

    fn handle_dialog(&mut self, key: KeyEvent, fx: &mut Effects) {
        let Some((kind, form)) = self.dialog.as_mut() else {
            return;
        };
        match form.handle_key(key) {
            FormEvent::Editing => {}
            FormEvent::Cancel => self.dialog = None,
            FormEvent::Submit => match kind {
                Dialog::Collector => match collector_request(form) {
                    Ok(settings) => {
                        self.pending_collector = Some(settings);
                        fx.fetch(Job::StartCollector(settings));
                        self.dialog = None;
                    }
                    Err(message) => fx.alert(Level::Danger, message),
                },
                Dialog::Filter => {
                    self.filter = FlowFilter {
                        flow_type: form.optional("Flow type").filter(|t| t != ANY),
                        source_ip: form.optional("Source IP"),
                        destination_ip: form.optional("Destination IP"),
                        start_time: form.optional("Start time"),
                        end_time: form.optional("End time"),
                    };
                    self.dialog = None;
                    self.pager.reset();
                    fx.fetch(Job::Flows(self.query(1)));
                }
            },
        }
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let label = Style::default().fg(Color::Gray);
        let line = Line::from(vec![
            Span::styled("Collector ", label),
            self.collector.badge(),
            Span::styled("   View ", label),
            Span::raw(self.view.title()),
            Span::styled("   Range ", label),
            Span::raw(self.time_range.as_str()),
            Span::styled("   Filters ", label),
            Span::raw(self.filter.describe()),
        ]);
        f.render_widget(Paragraph::new(line).block(block("Flow collection")), area);
    }

    fn render_records(&mut self, f: &mut Frame, area: Rect) {
        let rows: Vec<Row> = if let Some(err) = &self.flows_error {
            vec![message_row(format!("Error loading flows: {err}"), true)]
        } else if self.flows.is_empty() {
            vec![message_row("No flow records found", false)]
        } else {
            self.flows
                .iter()
                .enumerate()
                .map(|(i, flow)| {
                    Row::new(vec![
                        self.pager.row_number(i).to_string(),
                        format_timestamp(&flow.timestamp, TimeStyle::DateTime),
                        flow.flow_type.clone(),
                        endpoint(&flow.source_ip, flow.source_port),
                        endpoint(&flow.destination_ip, flow.destination_port),
                        protocol_name(flow.protocol),
                        format_bytes(flow.bytes.unwrap_or(0)),
                        format_number(flow.packets.unwrap_or(0)),
                    ])
                })
                .collect()
        };
        let widths = [
            Constraint::Length(6),
            Constraint::Length(20),
            Constraint::Length(8),
            Constraint::Percentage(22),
            Constraint::Percentage(22),
            Constraint::Length(6),
            Constraint::Length(11),
            Constraint::Length(9),
        ];
        let table = Table::new(rows, widths)
            .header(header_row(&[
                "#", "Time", "Type", "Source", "Destination", "Proto", "Bytes", "Packets",
            ]))
            .block(block(format!("Flows · {}", self.pager.label())))
            .highlight_style(highlight())
            .highlight_symbol("> ");
        f.render_stateful_widget(table, area, &mut self.flow_state);
    }

    fn render_talkers(&self, f: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        let empty: &[Talker] = &[];
        let (sources, destinations) = match &self.talkers {
            Some(t) => (t.top_sources.as_slice(), t.top_destinations.as_slice()),
            None => (empty, empty),
        };
        for (column, (title, talkers)) in columns
            .iter()
            .zip([("Top sources", sources), ("Top destinations", destinations)])
        {
            let halves = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(*column);
            self.render_talker_table(f, halves[0], title, talkers);
            let bars: Vec<(String, u64)> = talkers
                .iter()
                .map(|t| (t.ip_address.clone(), t.bytes))
                .collect();
            render_bar_chart(
                f,
                halves[1],
                &format!("{title} by bytes ({})", self.time_range),
                &bars,
                true,
                format_bytes,
            );
        }
    }

    fn render_talker_table(&self, f: &mut Frame, area: Rect, title: &str, talkers: &[Talker]) {
        let rows: Vec<Row> = if let Some(err) = &self.talkers_error {
            vec![message_row(format!("Error loading top talkers: {err}"), true)]
        } else if talkers.is_empty() {
            vec![message_row("No data available", false)]
        } else {
            talkers
                .iter()
                .map(|t| {
                    Row::new(vec![
                        t.ip_address.clone(),
                        format_bytes(t.bytes),
                        format_number(t.packets),
                        format_number(t.flow_count),
                    ])
                })
                .collect()
        };
        let widths = [
            Constraint::Percentage(40),
            Constraint::Percentage(22),
            Constraint::Percentage(20),
            Constraint::Percentage(18),
        ];
        f.render_widget(
            Table::new(rows, widths)
                .header(header_row(&["Address", "Bytes", "Packets", "Flows"]))
                .block(block(title)),
            area,
        );
    }
}

impl Page for FlowsPage {
    fn activate(&mut self, _now: Instant, fx: &mut Effects) {
        fx.fetch(Job::Flows(self.query(self.pager.page)));
        fx.fetch(self.talkers_job());
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
                self.flow_state.select(step_selection(
                    self.flow_state.selected(),
                    self.flows.len(),
                    forward,
                ));
            }
            KeyCode::Char('[') | KeyCode::Left => {
                if let Some(page) = self.pager.prev() {
                    fx.fetch(Job::Flows(self.query(page)));
                }
            }
            KeyCode::Char(']') | KeyCode::Right => {
                if let Some(page) = self.pager.next() {
                    fx.fetch(Job::Flows(self.query(page)));
                }
            }
            KeyCode::Char('s') => {
                if self.collector.can_start() {
                    self.open_collector_form();
                } else {
                    fx.alert(Level::Warning, "Flow collector is already running");
                }
            }
            KeyCode::Char('x') => {
                if self.collector.can_stop() {
                    fx.fetch(Job::StopCollector);
                } else {
                    fx.alert(Level::Warning, "Flow collector is not running");
                }
            }
            KeyCode::Char('f') => self.open_filter_form(),
            KeyCode::Char('c') => {
                if !self.filter.is_empty() {
                    self.filter = FlowFilter::default();
                    self.pager.reset();
                    fx.fetch(Job::Flows(self.query(1)));
                }
            }
            KeyCode::Char('t') => {
                self.time_range = self.time_range.next();
                fx.fetch(self.talkers_job());
            }
            KeyCode::Char('v') => self.view = self.view.next(),
            _ => return false,
        }
        true
    }

    fn apply(&mut self, payload: Payload, fx: &mut Effects) {
        match payload {
            Payload::Flows(page) => {
                self.pager.update(page.current_page, page.pages, page.total);
                let selected = clamp_selection(self.flow_state.selected(), page.flows.len());
                self.flow_state.select(selected);
                self.flows = page.flows;
                self.flows_error = None;
            }
            Payload::TopTalkers(talkers) => {
                self.talkers = Some(talkers);
                self.talkers_error = None;
            }
            Payload::Done(Outcome::CollectorStarted) => {
                self.collector = ServiceStatus::Active;
                let settings = self.pending_collector.take().unwrap_or_default();
                fx.alert(
                    Level::Success,
                    format!(
                        "Flow collector ({}) started successfully on port {}",
                        settings.flow_type.as_str(),
                        settings.port
                    ),
                );
            }
            Payload::Done(Outcome::CollectorStopped) => {
                self.collector = ServiceStatus::Inactive;
                fx.alert(Level::Success, "Flow collector stopped successfully");
            }
            _ => {}
        }
    }

    fn fail(&mut self, feed: Feed, error: &ApiError, fx: &mut Effects) {
        match feed {
            Feed::Flows => self.flows_error = Some(error.to_string()),
            Feed::TopTalkers => self.talkers_error = Some(error.to_string()),
            Feed::StartCollector => self.pending_collector = None,
            _ => {}
        }
        fx.alert(Level::Danger, super::failure_message(feed, error));
    }

    fn editing(&self) -> bool {
        self.dialog.is_some()
    }

    fn help(&self) -> &'static str {
        "v switch view · s start collector · x stop collector · f filter · c clear filter · [/] page · t time range · r reload"
    }

    fn render(&mut self, f: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(8)])
            .split(area);
        self.render_status(f, rows[0]);
        match self.view {
            View::Records => self.render_records(f, rows[1]),
            View::Talkers => self.render_talkers(f, rows[1]),
            View::Map => {
                let graph = self.link_graph();
                render_network_map(f, rows[1], "Host relationships (current page)", &graph);
            }
        }
        if let Some((_, form)) = &self.dialog {
            form.render(f, area);
        }
    }
}

fn collector_request(form: &Form) -> Result<CollectorSettings, &'static str> {
    let flow_type = FlowType::ALL
        .into_iter()
        .find(|t| t.as_str() == form.value("Flow type"))
        .unwrap_or_default();
    let port = form
        .value("Port")
        .parse::<u16>()
        .ok()
        .filter(|p| *p > 0)
        .ok_or("Please enter a valid port number (1-65535)")?;
    Ok(CollectorSettings { flow_type, port })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlowPage;
    use crossterm::event::KeyModifiers;

    fn page() -> FlowsPage {
        FlowsPage::new(&UiConfig::default())
    }

    fn press(page: &mut FlowsPage, code: KeyCode) -> Effects {
        let mut fx = Effects::default();
        page.handle_key(KeyEvent::new(code, KeyModifiers::NONE), &mut fx);
        fx
    }

    fn type_text(page: &mut FlowsPage, text: &str) {
        for c in text.chars() {
            press(page, KeyCode::Char(c));
        }
    }

    fn flow(id: i64, src: &str, dst: &str, bytes: u64) -> FlowRecord {
        FlowRecord {
            id,
            timestamp: "2024-03-01T10:00:00".to_string(),
            flow_type: "netflow".to_string(),
            source_ip: src.to_string(),
            destination_ip: dst.to_string(),
            source_port: Some(1234),
            destination_port: Some(80),
            protocol: Some(6),
            bytes: Some(bytes),
            packets: Some(3),
            start_time: None,
            end_time: None,
            tcp_flags: None,
            tos: None,
            input_interface: None,
            output_interface: None,
        }
    }

    #[test]
    fn activation_loads_first_page_and_talkers() {
        let mut page = page();
        let mut fx = Effects::default();
        page.activate(Instant::now(), &mut fx);
        assert_eq!(
            fx.jobs,
            vec![
                Job::Flows(FlowQuery { page: 1, per_page: 50, ..Default::default() }),
                Job::TopTalkers { time_range: TimeRange::Hour, limit: 10 },
            ]
        );
    }

    #[test]
    fn collector_port_is_validated() {
        let mut page = page();
        press(&mut page, KeyCode::Char('s'));
        press(&mut page, KeyCode::Tab);
        for _ in 0..4 {
            press(&mut page, KeyCode::Backspace);
        }
        type_text(&mut page, "70000");
        let fx = press(&mut page, KeyCode::Enter);
        assert!(fx.jobs.is_empty());
        assert_eq!(fx.alerts[0].1, "Please enter a valid port number (1-65535)");
    }

    #[test]
    fn collector_lifecycle_updates_badge() {
        let mut page = page();
        press(&mut page, KeyCode::Char('s'));
        press(&mut page, KeyCode::Right);
        let fx = press(&mut page, KeyCode::Enter);
        assert_eq!(
            fx.jobs,
            vec![Job::StartCollector(CollectorSettings { flow_type: FlowType::Ipfix, port: 9995 })]
        );

        let mut fx = Effects::default();
        page.apply(Payload::Done(Outcome::CollectorStarted), &mut fx);
        assert!(page.collector().is_active());
        assert_eq!(fx.alerts[0].1, "Flow collector (ipfix) started successfully on port 9995");

        let fx = press(&mut page, KeyCode::Char('s'));
        assert_eq!(fx.alerts[0].0, Level::Warning);
        assert_eq!(press(&mut page, KeyCode::Char('x')).jobs, vec![Job::StopCollector]);

        page.apply(Payload::Done(Outcome::CollectorStopped), &mut Effects::default());
        assert!(!page.collector().is_active());
    }

    #[test]
    fn stop_without_collector_warns() {
        let mut page = page();
        let fx = press(&mut page, KeyCode::Char('x'));
        assert!(fx.jobs.is_empty());
        assert_eq!(fx.alerts[0].0, Level::Warning);
    }

    #[test]
    fn filters_restart_at_first_page() {
        let mut page = page();
        page.apply(
            Payload::Flows(FlowPage { flows: vec![], total: 200, pages: 4, current_page: 3 }),
            &mut Effects::default(),
        );
        press(&mut page, KeyCode::Char('f'));
        press(&mut page, KeyCode::Right);
        press(&mut page, KeyCode::Tab);
        type_text(&mut page, "10.0.0.1");
        let fx = press(&mut page, KeyCode::Enter);
        assert_eq!(
            fx.jobs,
            vec![Job::Flows(FlowQuery {
                page: 1,
                per_page: 50,
                flow_type: Some("netflow".to_string()),
                source_ip: Some("10.0.0.1".to_string()),
                ..Default::default()
            })]
        );

        let fx = press(&mut page, KeyCode::Char('c'));
        assert_eq!(
            fx.jobs,
            vec![Job::Flows(FlowQuery { page: 1, per_page: 50, ..Default::default() })]
        );
    }

    #[test]
    fn paging_stops_at_last_page() {
        let mut page = page();
        page.apply(
            Payload::Flows(FlowPage { flows: vec![], total: 100, pages: 2, current_page: 2 }),
            &mut Effects::default(),
        );
        assert!(press(&mut page, KeyCode::Char(']')).jobs.is_empty());
        assert_eq!(
            press(&mut page, KeyCode::Char('[')).jobs,
            vec![Job::Flows(FlowQuery { page: 1, per_page: 50, ..Default::default() })]
        );
    }

    #[test]
    fn time_range_cycles_top_talkers() {
        let mut page = page();
        let fx = press(&mut page, KeyCode::Char('t'));
        assert_eq!(
            fx.jobs,
            vec![Job::TopTalkers { time_range: TimeRange::SixHours, limit: 10 }]
        );
    }

    #[test]
    fn map_aggregates_host_pairs() {
        let mut page = page();
        page.apply(
            Payload::Flows(FlowPage {
                flows: vec![
                    flow(1, "10.0.0.1", "10.0.0.2", 100),
                    flow(2, "10.0.0.1", "10.0.0.2", 50),
                    flow(3, "10.0.0.3", "10.0.0.1", 10),
                ],
                total: 3,
                pages: 1,
                current_page: 1,
            }),
            &mut Effects::default(),
        );
        let graph = page.link_graph();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert!(graph.edges.iter().any(|e| e.2 == 150));
    }

    #[test]
    fn view_cycles() {
        let mut page = page();
        press(&mut page, KeyCode::Char('v'));
        assert_eq!(page.view(), View::Talkers);
        press(&mut page, KeyCode::Char('v'));
        press(&mut page, KeyCode::Char('v'));
        assert_eq!(page.view(), View::Records);
    }
}
