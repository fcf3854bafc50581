use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Row, Table},
    Frame,
};

use super::{Effects, Page};
use crate::alert::Level;
use crate::config::UiConfig;
use crate::format::{describe_tcp_flags, format_bytes, format_number, format_timestamp, TimeStyle};
use crate::model::{
    BucketInterval, ProtocolDistribution, ProtocolOverTime, TcpFlagCount, TcpFlagStats, TimeRange,
};
use crate::network::{Job, Payload, Schedule};
use crate::ui::charts::{
    axis_labels, render_bar_chart, render_heat_map, render_share_chart, render_time_series, Series,
};
use crate::ui::{block, header_row, message_row};

pub struct ProtocolsPage {
    distribution: Option<ProtocolDistribution>,
    tcp_flags: Option<TcpFlagStats>,
    over_time: Option<ProtocolOverTime>,
    distribution_range: TimeRange,
    flags_range: TimeRange,
    history_range: TimeRange,
    interval: BucketInterval,
    auto_refresh: Schedule,
    refresh_period: Duration,
}

impl ProtocolsPage {
    pub fn new(config: &UiConfig) -> Self {
        Self {
            distribution: None,
            tcp_flags: None,
            over_time: None,
            distribution_range: config.default_time_range,
            flags_range: config.default_time_range,
            history_range: config.default_time_range,
            interval: BucketInterval::default(),
            auto_refresh: Schedule::off(),
            refresh_period: UiConfig::clamp_secs(config.protocol_refresh_secs),
        }
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh.period().is_some()
    }

    fn jobs(&self) -> [Job; 3] {
        [
            Job::ProtocolDistribution {
                time_range: self.distribution_range,
            },
            Job::TcpFlags {
                time_range: self.flags_range,
            },
            self.history_job(),
        ]
    }

    fn history_job(&self) -> Job {
        Job::ProtocolOverTime {
            time_range: self.history_range,
            interval: self.interval,
        }
    }

    fn toggle_auto_refresh(&mut self, now: Instant, fx: &mut Effects) {
        if self.auto_refresh() {
            self.auto_refresh.set_period(None, now);
            tracing::info!("protocol auto-refresh stopped");
            fx.alert(Level::Info, "Auto-refresh stopped");
        } else {
            self.auto_refresh.set_period(Some(self.refresh_period), now);
            let secs = self.refresh_period.as_secs();
            tracing::info!(secs, "protocol auto-refresh started");
            fx.alert(Level::Info, format!("Auto-refresh every {secs}s"));
        }
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let label = Style::default().fg(Color::Gray);
        let auto = if self.auto_refresh() {
            Span::styled(
                format!(" on {}s ", self.refresh_period.as_secs()),
                Style::default().fg(Color::Black).bg(Color::Green),
            )
        } else {
            Span::styled(" off ", Style::default().fg(Color::Black).bg(Color::DarkGray))
        };
        let line = Line::from(vec![
            Span::styled("Distribution ", label),
            Span::raw(self.distribution_range.as_str()),
            Span::styled("   TCP flags ", label),
            Span::raw(self.flags_range.as_str()),
            Span::styled("   History ", label),
            Span::raw(format!("{} / {}", self.history_range, self.interval)),
            Span::styled("   Auto-refresh ", label),
            auto,
        ]);
        f.render_widget(Paragraph::new(line).block(block("Protocol analysis")), area);
    }

    fn render_distribution(&self, f: &mut Frame, chart: Rect, table: Rect) {
        let protocols = self
            .distribution
            .as_ref()
            .map(|d| d.protocols.as_slice())
            .unwrap_or_default();
        let slices: Vec<(String, u64, f64)> = protocols
            .iter()
            .map(|p| (p.protocol.clone(), p.byte_count, p.percentage))
            .collect();
        render_share_chart(
            f,
            chart,
            &format!("Protocol distribution ({})", self.distribution_range),
            &slices,
        );

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
            Constraint::Percentage(30),
            Constraint::Percentage(22),
            Constraint::Percentage(28),
            Constraint::Percentage(20),
        ];
        f.render_widget(
            Table::new(rows, widths)
                .header(header_row(&["Protocol", "Packets", "Bytes", "Share"]))
                .block(block("Protocols")),
            table,
        );
    }

    fn render_flags(&self, f: &mut Frame, chart: Rect, table: Rect) {
        let flags = self
            .tcp_flags
            .as_ref()
            .map(|t| t.tcp_flags.as_slice())
            .unwrap_or_default();
        let bars: Vec<(String, u64)> = flags.iter().map(|c| (c.flags.clone(), c.count)).collect();
        render_bar_chart(
            f,
            chart,
            &format!("TCP flags ({})", self.flags_range),
            &bars,
            false,
            format_number,
        );

        let rows: Vec<Row> = if flags.is_empty() {
            vec![message_row("No TCP flag data available", false)]
        } else {
            flags
                .iter()
                .map(|c| {
                    Row::new(vec![
                        c.flags.clone(),
                        flag_description(c),
                        format_number(c.count),
                    ])
                })
                .collect()
        };
        let widths = [
            Constraint::Length(8),
            Constraint::Min(20),
            Constraint::Length(10),
        ];
        f.render_widget(
            Table::new(rows, widths)
                .header(header_row(&["Flags", "Meaning", "Count"]))
                .block(block("TCP flags")),
            table,
        );
    }

    fn render_history(&self, f: &mut Frame, chart: Rect, heat: Rect) {
        let empty = ProtocolOverTime::default();
        let data = self.over_time.as_ref().unwrap_or(&empty);
        let (names, cells) = protocol_matrix(data);
        let style = if self.history_range == TimeRange::Week {
            TimeStyle::DateTime
        } else {
            TimeStyle::Time
        };
        let times: Vec<String> = data
            .time_series
            .iter()
            .map(|b| format_timestamp(&b.timestamp, style))
            .collect();

        let series: Vec<Series> = names
            .iter()
            .zip(&cells)
            .map(|(name, values)| Series::from_values(name.clone(), values.iter().copied()))
            .collect();
        render_time_series(
            f,
            chart,
            &format!("Protocol bytes over time ({}, {} buckets)", self.history_range, self.interval),
            &series,
            &axis_labels(&times),
        );
        render_heat_map(f, heat, "Protocol heat map", &names, &cells);
    }
}

/// Backend description, or one built from the flag letters when it is blank.
pub fn flag_description(count: &TcpFlagCount) -> String {
    if count.description.trim().is_empty() {
        describe_tcp_flags(&count.flags)
    } else {
        count.description.clone()
    }
}

/// Protocol names and, per protocol, the bytes in every bucket (zero where a
/// bucket has no entry).
pub fn protocol_matrix(data: &ProtocolOverTime) -> (Vec<String>, Vec<Vec<u64>>) {
    let names = data.protocols();
    let cells = names
        .iter()
        .map(|name| {
            data.time_series
                .iter()
                .map(|bucket| bucket.bytes.get(name).copied().unwrap_or(0))
                .collect()
        })
        .collect();
    (names, cells)
}

impl Page for ProtocolsPage {
    fn activate(&mut self, now: Instant, fx: &mut Effects) {
        for job in self.jobs() {
            fx.fetch(job);
        }
        self.auto_refresh.restart(now);
    }

    fn tick(&mut self, now: Instant, fx: &mut Effects) {
        if self.auto_refresh.due(now) {
            for job in self.jobs() {
                fx.fetch(job);
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent, fx: &mut Effects) -> bool {
        match key.code {
            KeyCode::Char('d') => {
                self.distribution_range = self.distribution_range.next();
                fx.fetch(Job::ProtocolDistribution {
                    time_range: self.distribution_range,
                });
            }
            KeyCode::Char('f') => {
                self.flags_range = self.flags_range.next();
                fx.fetch(Job::TcpFlags {
                    time_range: self.flags_range,
                });
            }
            KeyCode::Char('t') => {
                self.history_range = self.history_range.next();
                fx.fetch(self.history_job());
            }
            KeyCode::Char('i') => {
                self.interval = self.interval.next();
                fx.fetch(self.history_job());
            }
            KeyCode::Char('a') => self.toggle_auto_refresh(Instant::now(), fx),
            _ => return false,
        }
        true
    }

    fn apply(&mut self, payload: Payload, _fx: &mut Effects) {
        match payload {
            Payload::ProtocolDistribution(d) => self.distribution = Some(d),
            Payload::TcpFlags(t) => self.tcp_flags = Some(t),
            Payload::ProtocolOverTime(h) => self.over_time = Some(h),
            _ => {}
        }
    }

    fn help(&self) -> &'static str {
        "d distribution range · f TCP flag range · t history range · i bucket interval · a auto-refresh · r reload"
    }

    fn render(&mut self, f: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Percentage(50),
                Constraint::Min(8),
            ])
            .split(area);
        self.render_status(f, rows[0]);

        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ])
            .split(rows[1]);
        self.render_distribution(f, top[0], top[1]);
        self.render_flags(f, top[2], top[3]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[2]);
        self.render_history(f, bottom[0], bottom[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimeBucket;
    use crossterm::event::KeyModifiers;

    fn page() -> ProtocolsPage {
        ProtocolsPage::new(&UiConfig::default())
    }

    fn press(page: &mut ProtocolsPage, code: KeyCode) -> Effects {
        let mut fx = Effects::default();
        page.handle_key(KeyEvent::new(code, KeyModifiers::NONE), &mut fx);
        fx
    }

    fn bucket(ts: &str, entries: &[(&str, u64)]) -> TimeBucket {
        TimeBucket {
            timestamp: ts.to_string(),
            bytes: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn activation_loads_all_panels() {
        let mut page = page();
        let mut fx = Effects::default();
        page.activate(Instant::now(), &mut fx);
        assert_eq!(
            fx.jobs,
            vec![
                Job::ProtocolDistribution { time_range: TimeRange::Hour },
                Job::TcpFlags { time_range: TimeRange::Hour },
                Job::ProtocolOverTime {
                    time_range: TimeRange::Hour,
                    interval: BucketInterval::FiveMinutes,
                },
            ]
        );
    }

    #[test]
    fn selectors_reload_only_their_panel() {
        let mut page = page();
        assert_eq!(
            press(&mut page, KeyCode::Char('f')).jobs,
            vec![Job::TcpFlags { time_range: TimeRange::SixHours }]
        );
        assert_eq!(
            press(&mut page, KeyCode::Char('i')).jobs,
            vec![Job::ProtocolOverTime {
                time_range: TimeRange::Hour,
                interval: BucketInterval::TenMinutes,
            }]
        );
        assert_eq!(
            press(&mut page, KeyCode::Char('t')).jobs,
            vec![Job::ProtocolOverTime {
                time_range: TimeRange::SixHours,
                interval: BucketInterval::TenMinutes,
            }]
        );
    }

    #[test]
    fn auto_refresh_is_off_until_toggled() {
        let mut page = page();
        let start = Instant::now();
        page.activate(start, &mut Effects::default());
        let mut fx = Effects::default();
        page.tick(start + Duration::from_secs(120), &mut fx);
        assert!(fx.jobs.is_empty());

        press(&mut page, KeyCode::Char('a'));
        assert!(page.auto_refresh());
        let mut fx = Effects::default();
        page.tick(Instant::now() + Duration::from_secs(31), &mut fx);
        assert_eq!(fx.jobs.len(), 3);

        press(&mut page, KeyCode::Char('a'));
        assert!(!page.auto_refresh());
    }

    #[test]
    fn matrix_zero_fills_missing_buckets() {
        let data = ProtocolOverTime {
            time_series: vec![
                bucket("2024-03-01T10:00:00", &[("TCP", 100), ("UDP", 20)]),
                bucket("2024-03-01T10:05:00", &[("TCP", 50)]),
            ],
            ..Default::default()
        };
        let (names, cells) = protocol_matrix(&data);
        assert_eq!(names, vec!["TCP".to_string(), "UDP".to_string()]);
        assert_eq!(cells, vec![vec![100, 50], vec![20, 0]]);
    }

    #[test]
    fn blank_flag_descriptions_are_derived() {
        let count = TcpFlagCount {
            flags: "SA".to_string(),
            count: 4,
            description: String::new(),
        };
        assert_eq!(
            flag_description(&count),
            "SYN - Connection establishment, ACK - Acknowledgment"
        );
    }
}
