use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use nucleo::{Matcher, Utf32Str};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use super::{clamp_selection, step_selection, Effects, Page};
use crate::alert::Level;
use crate::api::StartCapture;
use crate::config::UiConfig;
use crate::error::ApiError;
use crate::format::{endpoint, format_number, format_timestamp, or_dash, TimeStyle};
use crate::model::{Capture, DetailValue, NetworkInterface, PacketDetails, PacketRecord};
use crate::network::{Feed, Job, Outcome, Payload, Schedule};
use crate::pagination::Pager;
use crate::ui::form::{Field, Form, FormEvent};
use crate::ui::{block, header_row, highlight, message_row};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Captures,
    Packets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialog {
    StartCapture,
    Filter,
}

pub struct PacketsPage {
    interfaces: Vec<NetworkInterface>,
    captures: Vec<Capture>,
    capture_state: TableState,
    viewing: Option<i64>,
    packets: Vec<PacketRecord>,
    packets_error: Option<String>,
    /// Indexes into `packets` that pass the fuzzy filter.
    visible: Vec<usize>,
    packet_state: TableState,
    pager: Pager,
    details: Option<PacketDetails>,
    filter: String,
    matcher: Matcher,
    focus: Focus,
    dialog: Option<(Dialog, Form)>,
    pending_name: Option<String>,
    live: Schedule,
    live_period: Duration,
    export_dir: PathBuf,
}

impl PacketsPage {
    pub fn new(config: &UiConfig) -> Self {
        Self {
            interfaces: Vec::new(),
            captures: Vec::new(),
            capture_state: TableState::default(),
            viewing: None,
            packets: Vec::new(),
            packets_error: None,
            visible: Vec::new(),
            packet_state: TableState::default(),
            pager: Pager::new(config.packets_per_page),
            details: None,
            filter: String::new(),
            matcher: Matcher::default(),
            focus: Focus::Captures,
            dialog: None,
            pending_name: None,
            live: Schedule::off(),
            live_period: UiConfig::clamp_secs(config.capture_refresh_secs),
            export_dir: config.export_dir.clone(),
        }
    }

    pub fn viewing(&self) -> Option<i64> {
        self.viewing
    }

    pub fn visible_packets(&self) -> impl Iterator<Item = &PacketRecord> {
        self.visible.iter().filter_map(|i| self.packets.get(*i))
    }

    fn selected_capture(&self) -> Option<&Capture> {
        self.captures.get(self.capture_state.selected()?)
    }

    fn selected_packet(&self) -> Option<&PacketRecord> {
        let index = *self.visible.get(self.packet_state.selected()?)?;
        self.packets.get(index)
    }

    fn is_active(&self, capture_id: i64) -> bool {
        self.captures
            .iter()
            .any(|c| c.id == capture_id && c.active)
    }

    fn packets_job(&self, capture_id: i64, page: u32) -> Job {
        Job::Packets {
            capture_id,
            page,
            per_page: self.pager.per_page,
        }
    }

    fn view_capture(&mut self, capture_id: i64, now: Instant, fx: &mut Effects) {
        self.viewing = Some(capture_id);
        self.pager.reset();
        self.packets.clear();
        self.visible.clear();
        self.packet_state.select(None);
        self.packets_error = None;
        self.details = None;
        self.focus = Focus::Packets;
        fx.fetch(self.packets_job(capture_id, 1));
        self.follow_live(now);
    }

    /// Auto-refresh runs only while the viewed capture is still recording.
    fn follow_live(&mut self, now: Instant) {
        let active = self.viewing.is_some_and(|id| self.is_active(id));
        let period = active.then_some(self.live_period);
        if self.live.period() != period {
            self.live.set_period(period, now);
        }
    }

    fn refilter(&mut self) {
        self.visible = fuzzy_filter(&mut self.matcher, &self.filter, &self.packets);
        let selected = clamp_selection(self.packet_state.selected(), self.visible.len());
        self.packet_state.select(selected);
    }

    fn open_start_form(&mut self) {
        let up: Vec<String> = self
            .interfaces
            .iter()
            .filter(|i| i.is_up)
            .map(|i| i.name.clone())
            .collect();
        let interface = if up.is_empty() {
            Field::text("Interface", "")
        } else {
            Field::choice("Interface", up, "")
        };
        let form = Form::new(
            "Start capture",
            vec![
                interface,
                Field::text("Name", ""),
                Field::text("Filter", ""),
                Field::text("Timeout (s)", DEFAULT_TIMEOUT_SECS.to_string()),
            ],
        );
        self.dialog = Some((Dialog::StartCapture, form));
    }

    fn handle_dialog(&mut self, key: KeyEvent, fx: &mut Effects) {
        let Some((kind, form)) = self.dialog.as_mut() else {
            return;
        };
        match form.handle_key(key) {
            FormEvent::Editing => {}
            FormEvent::Cancel => self.dialog = None,
            FormEvent::Submit => match kind {
                Dialog::StartCapture => match start_request(form) {
                    Ok(request) => {
                        self.pending_name = Some(request.name.clone());
                        fx.fetch(Job::StartCapture(request));
                        self.dialog = None;
                    }
                    Err(message) => fx.alert(Level::Danger, message),
                },
                Dialog::Filter => {
                    self.filter = form.value("Query").to_string();
                    self.dialog = None;
                    self.refilter();
                }
            },
        }
    }

    fn export(&self) -> io::Result<(PathBuf, usize)> {
        let capture_id = self.viewing.unwrap_or_default();
        let path = export_path(&self.export_dir, capture_id, self.pager.page);
        let rows: Vec<&PacketRecord> = self.visible_packets().collect();
        let mut out = BufWriter::new(File::create(&path)?);
        write_csv(&mut out, &rows)?;
        out.flush()?;
        Ok((path, rows.len()))
    }

    fn render_interfaces(&self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = if self.interfaces.is_empty() {
            vec![ListItem::new(Span::styled(
                "No interfaces reported",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            self.interfaces
                .iter()
                .map(|i| {
                    let (mark, color) = if i.is_up {
                        ("●", Color::Green)
                    } else {
                        ("○ down", Color::Red)
                    };
                    ListItem::new(Line::from(vec![
                        Span::styled(format!("{:<10}", i.name), Style::default().fg(Color::Cyan)),
                        Span::raw(format!(" {:<16} ", or_dash(i.ip_address.as_deref()))),
                        Span::styled(mark, Style::default().fg(color)),
                    ]))
                })
                .collect()
        };
        f.render_widget(List::new(items).block(block("Interfaces")), area);
    }

    fn render_captures(&mut self, f: &mut Frame, area: Rect) {
        let rows: Vec<Row> = if self.captures.is_empty() {
            vec![message_row("No captures found", false)]
        } else {
            self.captures
                .iter()
                .map(|c| {
                    let status = if c.active {
                        Span::styled(" live ", Style::default().fg(Color::Black).bg(Color::Green))
                    } else {
                        Span::styled("done", Style::default().fg(Color::DarkGray))
                    };
                    let name = if Some(c.id) == self.viewing {
                        Span::styled(c.name.clone(), Style::default().add_modifier(Modifier::BOLD))
                    } else {
                        Span::raw(c.name.clone())
                    };
                    Row::new(vec![
                        Line::from(name),
                        Line::from(c.interface.clone()),
                        Line::from(format_number(c.packet_count)),
                        Line::from(status),
                    ])
                })
                .collect()
        };
        let widths = [
            Constraint::Percentage(40),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
        ];
        let mut table = Table::new(rows, widths)
            .header(header_row(&["Name", "Iface", "Packets", "Status"]))
            .block(block("Captures (Enter view · n new · x stop)"));
        if self.focus == Focus::Captures {
            table = table.highlight_style(highlight()).highlight_symbol(">> ");
        }
        f.render_stateful_widget(table, area, &mut self.capture_state);
    }

    fn render_packets(&mut self, f: &mut Frame, area: Rect) {
        let rows: Vec<Row> = if let Some(err) = &self.packets_error {
            vec![message_row(format!("Error loading packets: {err}"), true)]
        } else if self.viewing.is_none() {
            vec![message_row("Select a capture to view its packets", false)]
        } else if self.packets.is_empty() {
            vec![message_row("No packets found", false)]
        } else if self.visible.is_empty() {
            vec![message_row("No packets match the filter", false)]
        } else {
            self.visible
                .iter()
                .filter_map(|i| self.packets.get(*i))
                .map(|p| {
                    let proto = or_dash(p.protocol.as_deref());
                    let color = protocol_color(proto);
                    let src = endpoint(or_dash(p.source_ip.as_deref()), p.source_port);
                    let dst = endpoint(or_dash(p.destination_ip.as_deref()), p.destination_port);
                    let flags = p
                        .tcp_flags
                        .as_deref()
                        .map(flag_spans)
                        .unwrap_or_default();
                    Row::new(vec![
                        Line::from(format_timestamp(&p.timestamp, TimeStyle::Time)),
                        Line::from(Span::styled(proto.to_string(), Style::default().fg(color))),
                        Line::from(src),
                        Line::from(dst),
                        Line::from(p.length.map(|l| l.to_string()).unwrap_or_default()),
                        Line::from(flags),
                        Line::from(or_dash(p.info.as_deref()).to_string()),
                    ])
                })
                .collect()
        };
        let widths = [
            Constraint::Length(9),
            Constraint::Length(7),
            Constraint::Length(22),
            Constraint::Length(22),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Min(10),
        ];
        let mut title = match self.viewing {
            Some(id) => format!("Packets · capture {id} · {}", self.pager.label()),
            None => "Packets".to_string(),
        };
        if !self.filter.is_empty() {
            title.push_str(&format!(" · filter \"{}\"", self.filter));
        }
        let mut table = Table::new(rows, widths)
            .header(header_row(&["Time", "Proto", "Source", "Destination", "Len", "Flags", "Info"]))
            .block(block(title));
        if self.focus == Focus::Packets {
            table = table.highlight_style(highlight()).highlight_symbol("> ");
        }
        f.render_stateful_widget(table, area, &mut self.packet_state);
    }

    fn render_details(&self, f: &mut Frame, area: Rect) {
        let Some(details) = &self.details else {
            f.render_widget(
                Paragraph::new(Span::styled(
                    "Enter on a packet shows its dissection",
                    Style::default().fg(Color::DarkGray),
                ))
                .block(block("Packet details")),
                area,
            );
            return;
        };
        let d = &details.details;
        let mut lines = Vec::new();
        section(&mut lines, "Summary");
        field(&mut lines, "Time", d.general.timestamp.as_deref().map(|t| format_timestamp(t, TimeStyle::DateTime)));
        field(&mut lines, "Length", show(&d.general.length));
        section(&mut lines, "Ethernet");
        field(&mut lines, "Source MAC", show(&d.ethernet.source_mac));
        field(&mut lines, "Destination MAC", show(&d.ethernet.destination_mac));
        section(&mut lines, "IP");
        field(&mut lines, "Version", show(&d.ip.version));
        field(&mut lines, "Header length", show(&d.ip.header_length));
        field(&mut lines, "Total length", show(&d.ip.total_length));
        field(&mut lines, "TTL", show(&d.ip.ttl));
        field(&mut lines, "Protocol", show(&d.ip.protocol));
        field(&mut lines, "Source", show(&d.ip.source));
        field(&mut lines, "Destination", show(&d.ip.destination));
        if let Some(tcp) = &d.tcp {
            section(&mut lines, "TCP");
            field(&mut lines, "Source port", show(&tcp.source_port));
            field(&mut lines, "Destination port", show(&tcp.destination_port));
            field(&mut lines, "Sequence", show(&tcp.sequence_number));
            field(&mut lines, "Acknowledgment", show(&tcp.acknowledgment_number));
            let mut flags = vec![Span::styled(format!("  {:<18}", "Flags"), Style::default().fg(Color::Gray))];
            flags.extend(tcp.flags.as_ref().map(|v| flag_spans(&v.to_string())).unwrap_or_default());
            lines.push(Line::from(flags));
            field(&mut lines, "Window", show(&tcp.window_size));
        }
        if let Some(udp) = &d.udp {
            section(&mut lines, "UDP");
            field(&mut lines, "Source port", show(&udp.source_port));
            field(&mut lines, "Destination port", show(&udp.destination_port));
            field(&mut lines, "Length", show(&udp.length));
            field(&mut lines, "Checksum", show(&udp.checksum));
        }
        f.render_widget(
            Paragraph::new(lines)
                .block(block(format!("Packet {} details", details.packet_id)))
                .wrap(Wrap { trim: false }),
            area,
        );
    }
}

impl Page for PacketsPage {
    fn activate(&mut self, now: Instant, fx: &mut Effects) {
        fx.fetch(Job::Interfaces);
        fx.fetch(Job::Captures);
        if let Some(capture_id) = self.viewing {
            fx.fetch(self.packets_job(capture_id, self.pager.page));
        }
        self.live.restart(now);
    }

    fn tick(&mut self, now: Instant, fx: &mut Effects) {
        if let Some(capture_id) = self.viewing {
            if self.live.due(now) {
                fx.fetch(self.packets_job(capture_id, self.pager.page));
                fx.fetch(Job::Captures);
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent, fx: &mut Effects) -> bool {
        if self.dialog.is_some() {
            self.handle_dialog(key, fx);
            return true;
        }
        let now = Instant::now();
        match (self.focus, key.code) {
            (Focus::Captures, KeyCode::Down | KeyCode::Up) => {
                let forward = key.code == KeyCode::Down;
                self.capture_state.select(step_selection(
                    self.capture_state.selected(),
                    self.captures.len(),
                    forward,
                ));
            }
            (Focus::Packets, KeyCode::Down | KeyCode::Up) => {
                let forward = key.code == KeyCode::Down;
                self.packet_state.select(step_selection(
                    self.packet_state.selected(),
                    self.visible.len(),
                    forward,
                ));
            }
            (Focus::Captures, KeyCode::Enter) => match self.selected_capture().map(|c| c.id) {
                Some(capture_id) => self.view_capture(capture_id, now, fx),
                None => fx.alert(Level::Warning, "No capture selected"),
            },
            (Focus::Packets, KeyCode::Enter) => {
                if let Some(packet_id) = self.selected_packet().map(|p| p.id) {
                    fx.fetch(Job::PacketDetails { packet_id });
                }
            }
            (Focus::Packets, KeyCode::Esc) => {
                self.focus = Focus::Captures;
                self.details = None;
            }
            (_, KeyCode::Char('n')) => self.open_start_form(),
            (_, KeyCode::Char('x')) => {
                let target = match self.focus {
                    Focus::Captures => self.selected_capture().map(|c| (c.id, c.active)),
                    Focus::Packets => self.viewing.map(|id| (id, self.is_active(id))),
                };
                match target {
                    Some((capture_id, true)) => fx.fetch(Job::StopCapture { capture_id }),
                    Some((_, false)) => fx.alert(Level::Warning, "Capture is not running"),
                    None => fx.alert(Level::Warning, "No capture selected"),
                }
            }
            (_, KeyCode::Char('[') | KeyCode::Left) => {
                if let (Some(capture_id), Some(page)) = (self.viewing, self.pager.prev()) {
                    fx.fetch(self.packets_job(capture_id, page));
                }
            }
            (_, KeyCode::Char(']') | KeyCode::Right) => {
                if let (Some(capture_id), Some(page)) = (self.viewing, self.pager.next()) {
                    fx.fetch(self.packets_job(capture_id, page));
                }
            }
            (_, KeyCode::Char('/')) => {
                let form = Form::new("Filter packets", vec![Field::text("Query", self.filter.clone())]);
                self.dialog = Some((Dialog::Filter, form));
            }
            (_, KeyCode::Char('c')) => {
                self.filter.clear();
                self.refilter();
            }
            (_, KeyCode::Char('e')) => {
                if self.viewing.is_none() || self.visible.is_empty() {
                    fx.alert(Level::Warning, "No packets to export");
                } else {
                    match self.export() {
                        Ok((path, count)) => {
                            tracing::info!(path = %path.display(), count, "exported packets");
                            fx.alert(
                                Level::Success,
                                format!("Exported {count} packets to {}", path.display()),
                            );
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "packet export failed");
                            fx.alert(Level::Danger, format!("Export failed: {err}"));
                        }
                    }
                }
            }
            _ => return false,
        }
        true
    }

    fn apply(&mut self, payload: Payload, fx: &mut Effects) {
        match payload {
            Payload::Interfaces(interfaces) => self.interfaces = interfaces,
            Payload::Captures(captures) => {
                let selected = clamp_selection(self.capture_state.selected(), captures.len());
                self.capture_state.select(selected);
                self.captures = captures;
                self.follow_live(Instant::now());
            }
            Payload::Packets { capture_id, page } => {
                if Some(capture_id) != self.viewing {
                    return;
                }
                self.pager.update(page.current_page, page.pages, page.total);
                self.packets = page.packets;
                self.packets_error = None;
                self.refilter();
            }
            Payload::PacketDetails(details) => self.details = Some(details),
            Payload::Done(Outcome::CaptureStarted(capture_id)) => {
                let name = self.pending_name.take().unwrap_or_else(|| capture_id.to_string());
                fx.alert(Level::Success, format!("Capture \"{name}\" started successfully"));
                fx.fetch(Job::Captures);
                self.view_capture(capture_id, Instant::now(), fx);
            }
            Payload::Done(Outcome::CaptureStopped(capture_id)) => {
                fx.alert(Level::Success, "Capture stopped successfully");
                fx.fetch(Job::Captures);
                if self.viewing == Some(capture_id) {
                    fx.fetch(self.packets_job(capture_id, self.pager.page));
                }
            }
            _ => {}
        }
    }

    fn fail(&mut self, feed: Feed, error: &ApiError, fx: &mut Effects) {
        match feed {
            Feed::Packets => self.packets_error = Some(error.to_string()),
            Feed::StartCapture => self.pending_name = None,
            _ => {}
        }
        fx.alert(Level::Danger, super::failure_message(feed, error));
    }

    fn editing(&self) -> bool {
        self.dialog.is_some()
    }

    fn help(&self) -> &'static str {
        "↑/↓ select · Enter view/details · Esc back · n new capture · x stop · [/] page · / filter · c clear filter · e export CSV"
    }

    fn render(&mut self, f: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(32), Constraint::Percentage(68)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(8), Constraint::Min(6)])
            .split(columns[0]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[1]);

        self.render_interfaces(f, left[0]);
        self.render_captures(f, left[1]);
        self.render_packets(f, right[0]);
        self.render_details(f, right[1]);

        if let Some((_, form)) = &self.dialog {
            form.render(f, area);
        }
    }
}

/// Validates the start-capture form into a request body.
fn start_request(form: &Form) -> Result<StartCapture, &'static str> {
    let interface = form.value("Interface");
    if interface.is_empty() {
        return Err("Please select a capture interface");
    }
    let name = form.value("Name");
    if name.is_empty() {
        return Err("Please enter a name for the capture");
    }
    let timeout = match form.value("Timeout (s)") {
        "" => DEFAULT_TIMEOUT_SECS,
        raw => raw
            .parse()
            .map_err(|_| "Timeout must be a whole number of seconds")?,
    };
    Ok(StartCapture {
        interface: interface.to_string(),
        name: name.to_string(),
        filter_expression: form.value("Filter").to_string(),
        timeout,
    })
}

fn haystack(p: &PacketRecord) -> String {
    format!(
        "{} {} {} {} {}",
        or_dash(p.protocol.as_deref()),
        endpoint(or_dash(p.source_ip.as_deref()), p.source_port),
        endpoint(or_dash(p.destination_ip.as_deref()), p.destination_port),
        p.tcp_flags.as_deref().unwrap_or_default(),
        p.info.as_deref().unwrap_or_default(),
    )
    .to_lowercase()
}

/// Indexes of the packets whose summary fuzzily matches `query`; all of them
/// for a blank query.
pub fn fuzzy_filter(matcher: &mut Matcher, query: &str, packets: &[PacketRecord]) -> Vec<usize> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return (0..packets.len()).collect();
    }
    let mut needle_buf = Vec::new();
    let needle = Utf32Str::new(&query, &mut needle_buf);
    let mut buf = Vec::new();
    packets
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            let hay = haystack(p);
            matcher
                .fuzzy_match(Utf32Str::new(&hay, &mut buf), needle)
                .is_some()
        })
        .map(|(i, _)| i)
        .collect()
}

pub fn export_path(dir: &Path, capture_id: i64, page: u32) -> PathBuf {
    dir.join(format!("capture-{capture_id}-page-{page}.csv"))
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

pub fn write_csv<W: Write>(out: &mut W, packets: &[&PacketRecord]) -> io::Result<()> {
    writeln!(out, "id,timestamp,protocol,source,destination,length,tcp_flags,info")?;
    for p in packets {
        let fields = [
            p.id.to_string(),
            p.timestamp.clone(),
            p.protocol.clone().unwrap_or_default(),
            endpoint(p.source_ip.as_deref().unwrap_or_default(), p.source_port),
            endpoint(p.destination_ip.as_deref().unwrap_or_default(), p.destination_port),
            p.length.map(|l| l.to_string()).unwrap_or_default(),
            p.tcp_flags.clone().unwrap_or_default(),
            p.info.clone().unwrap_or_default(),
        ];
        let line: Vec<Cow<str>> = fields.iter().map(|v| csv_field(v)).collect();
        writeln!(out, "{}", line.join(","))?;
    }
    Ok(())
}

fn protocol_color(protocol: &str) -> Color {
    match protocol.to_ascii_uppercase().as_str() {
        "HTTPS" | "TLS" => Color::Magenta,
        "DNS" => Color::Blue,
        "SSH" => Color::Green,
        "HTTP" => Color::Yellow,
        "TCP" => Color::Cyan,
        "UDP" => Color::LightBlue,
        "ICMP" => Color::LightRed,
        _ => Color::Gray,
    }
}

fn flag_color(flag: char) -> Color {
    match flag {
        'S' => Color::Green,
        'A' => Color::Blue,
        'F' => Color::Yellow,
        'R' => Color::Red,
        'P' => Color::Magenta,
        'U' => Color::LightRed,
        _ => Color::Gray,
    }
}

/// One coloured span per flag letter.
pub fn flag_spans(flags: &str) -> Vec<Span<'static>> {
    flags
        .chars()
        .map(|c| {
            Span::styled(
                c.to_string(),
                Style::default().fg(flag_color(c)).add_modifier(Modifier::BOLD),
            )
        })
        .collect()
}

fn show(value: &Option<DetailValue>) -> Option<String> {
    value.as_ref().map(DetailValue::to_string)
}

fn section(lines: &mut Vec<Line<'static>>, title: &'static str) {
    lines.push(Line::from(Span::styled(
        title,
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )));
}

fn field(lines: &mut Vec<Line<'static>>, label: &'static str, value: Option<String>) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {label:<18}"), Style::default().fg(Color::Gray)),
        Span::raw(value.unwrap_or_else(|| "-".to_string())),
    ]));
}
