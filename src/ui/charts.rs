//! Chart adapters over ratatui's chart, bar chart and canvas widgets.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use ratatui::{
    layout::{Direction, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph,
    },
    Frame,
};

use crate::format::{ellipsize, format_bytes_with};

const PALETTE: [Color; 10] = [
    Color::Rgb(13, 110, 253),
    Color::Rgb(32, 201, 151),
    Color::Rgb(13, 202, 240),
    Color::Rgb(255, 193, 7),
    Color::Rgb(253, 126, 20),
    Color::Rgb(220, 53, 69),
    Color::Rgb(111, 66, 193),
    Color::Rgb(108, 117, 125),
    Color::Rgb(25, 135, 84),
    Color::Rgb(173, 181, 189),
];

pub fn palette(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}

/// A named line in a time-series chart; x is the sample index.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn from_values(name: impl Into<String>, values: impl IntoIterator<Item = u64>) -> Self {
        Self {
            name: name.into(),
            points: values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i as f64, v as f64))
                .collect(),
        }
    }

    fn max_y(&self) -> f64 {
        self.points.iter().map(|(_, y)| *y).fold(0.0, f64::max)
    }
}

fn titled(title: &str) -> Block<'_> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
}

fn empty(f: &mut Frame, area: Rect, title: &str, message: &str) {
    f.render_widget(
        Paragraph::new(Span::styled(
            message.to_string(),
            Style::default().fg(Color::DarkGray),
        ))
        .block(titled(title)),
        area,
    );
}

/// Line chart of byte volumes; `x_labels` are spread along the x axis.
pub fn render_time_series(
    f: &mut Frame,
    area: Rect,
    title: &str,
    series: &[Series],
    x_labels: &[String],
) {
    let width = series.iter().map(|s| s.points.len()).max().unwrap_or(0);
    if width == 0 {
        empty(f, area, title, "No data available");
        return;
    }
    let max_y = series.iter().map(Series::max_y).fold(0.0, f64::max).max(1.0);

    let datasets: Vec<Dataset> = series
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Dataset::default()
                .name(s.name.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(palette(i)))
                .data(&s.points)
        })
        .collect();

    let x_axis_labels: Vec<Span> = x_labels.iter().map(|l| Span::raw(l.clone())).collect();
    let chart = Chart::new(datasets)
        .block(titled(title))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, (width.saturating_sub(1)).max(1) as f64])
                .labels(x_axis_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, max_y])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format_bytes_with(max_y / 2.0, 1)),
                    Span::raw(format_bytes_with(max_y, 1)),
                ]),
        );
    f.render_widget(chart, area);
}

/// First, middle and last label of a sequence, for sparse axis ticks.
pub fn axis_labels(labels: &[String]) -> Vec<String> {
    match labels.len() {
        0 => Vec::new(),
        1 | 2 => labels.to_vec(),
        n => vec![
            labels[0].clone(),
            labels[n / 2].clone(),
            labels[n - 1].clone(),
        ],
    }
}

/// Bar chart with one coloured bar per item.
pub fn render_bar_chart(
    f: &mut Frame,
    area: Rect,
    title: &str,
    items: &[(String, u64)],
    horizontal: bool,
    value_text: fn(u64) -> String,
) {
    if items.is_empty() {
        empty(f, area, title, "No data available");
        return;
    }
    let label_width = if horizontal { 18 } else { 8 };
    let bars: Vec<Bar> = items
        .iter()
        .enumerate()
        .map(|(i, (label, value))| {
            Bar::default()
                .value(*value)
                .label(Line::from(ellipsize(label, label_width)))
                .text_value(value_text(*value))
                .style(Style::default().fg(palette(i)))
                .value_style(Style::default().fg(Color::Black).bg(palette(i)))
        })
        .collect();

    let mut chart = BarChart::default()
        .block(titled(title))
        .data(BarGroup::default().bars(&bars));
    chart = if horizontal {
        chart.direction(Direction::Horizontal).bar_width(1).bar_gap(0)
    } else {
        let slots = items.len().max(1) as u16;
        let width = (area.width.saturating_sub(2) / slots).saturating_sub(1).clamp(3, 12);
        chart.bar_width(width).bar_gap(1)
    };
    f.render_widget(chart, area);
}

/// Share-of-total chart standing in for a pie: one horizontal bar per slice,
/// labelled with percentage and volume.
pub fn render_share_chart(f: &mut Frame, area: Rect, title: &str, slices: &[(String, u64, f64)]) {
    if slices.is_empty() {
        empty(f, area, title, "No protocol data");
        return;
    }
    let bars: Vec<Bar> = slices
        .iter()
        .enumerate()
        .map(|(i, (label, bytes, pct))| {
            Bar::default()
                .value((pct * 10.0).round() as u64)
                .label(Line::from(ellipsize(label, 10)))
                .text_value(format!("{pct:.1}% ({})", format_bytes_with(*bytes as f64, 2)))
                .style(Style::default().fg(palette(i)))
                .value_style(Style::default().fg(Color::Black).bg(palette(i)))
        })
        .collect();
    f.render_widget(
        BarChart::default()
            .block(titled(title))
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(0)
            .max(1000)
            .data(BarGroup::default().bars(&bars)),
        area,
    );
}

/// Hosts and the traffic between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkGraph {
    pub nodes: Vec<String>,
    /// `(from, to, bytes)` as indexes into `nodes`.
    pub edges: Vec<(usize, usize, u64)>,
}

impl LinkGraph {
    /// Aggregates links by host pair and keeps the `max_nodes` busiest hosts.
    pub fn build<'a>(links: impl IntoIterator<Item = (&'a str, &'a str, u64)>, max_nodes: usize) -> Self {
        let mut pairs: BTreeMap<(&str, &str), u64> = BTreeMap::new();
        let mut volume: BTreeMap<&str, u64> = BTreeMap::new();
        for (from, to, bytes) in links {
            let pair = pairs.entry((from, to)).or_insert(0);
            *pair = pair.saturating_add(bytes);
            for host in [from, to] {
                let total = volume.entry(host).or_insert(0);
                *total = total.saturating_add(bytes);
            }
        }

        let mut ranked: Vec<(&str, u64)> = volume.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked.truncate(max_nodes);
        let nodes: Vec<String> = ranked.iter().map(|(n, _)| n.to_string()).collect();

        let index = |name: &str| nodes.iter().position(|n| n == name);
        let edges = pairs
            .into_iter()
            .filter_map(|((from, to), bytes)| Some((index(from)?, index(to)?, bytes)))
            .collect();
        Self { nodes, edges }
    }

    /// Nodes evenly spaced on the unit circle.
    pub fn layout(&self) -> Vec<(f64, f64)> {
        let n = self.nodes.len().max(1) as f64;
        (0..self.nodes.len())
            .map(|i| {
                let angle = TAU * i as f64 / n;
                (angle.cos(), angle.sin())
            })
            .collect()
    }
}

pub fn render_network_map(f: &mut Frame, area: Rect, title: &str, graph: &LinkGraph) {
    if graph.nodes.is_empty() {
        empty(f, area, title, "No connections to map");
        return;
    }
    let positions = graph.layout();
    let heaviest = graph.edges.iter().map(|e| e.2).max().unwrap_or(1).max(1);
    let canvas = Canvas::default()
        .block(titled(title))
        .marker(Marker::Braille)
        .x_bounds([-1.4, 1.4])
        .y_bounds([-1.2, 1.2])
        .paint(|ctx| {
            for (from, to, bytes) in &graph.edges {
                let (x1, y1) = positions[*from];
                let (x2, y2) = positions[*to];
                let color = if bytes.saturating_mul(2) >= heaviest {
                    Color::Yellow
                } else {
                    Color::DarkGray
                };
                ctx.draw(&CanvasLine {
                    x1,
                    y1,
                    x2,
                    y2,
                    color,
                });
            }
            ctx.layer();
            for (i, (x, y)) in positions.iter().enumerate() {
                ctx.print(
                    *x,
                    *y,
                    Span::styled(
                        graph.nodes[i].clone(),
                        Style::default().fg(palette(i)).add_modifier(Modifier::BOLD),
                    ),
                );
            }
        });
    f.render_widget(canvas, area);
}

const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

/// Block glyph for `value` relative to `max`.
pub fn shade(value: u64, max: u64) -> char {
    if value == 0 || max == 0 {
        return SHADES[0];
    }
    let level = ((value as f64 / max as f64) * 4.0).ceil() as usize;
    SHADES[level.clamp(1, 4)]
}

/// Grid of shaded cells: one row per label, one column per bucket.
pub fn render_heat_map(
    f: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[String],
    cells: &[Vec<u64>],
) {
    let max = cells.iter().flatten().copied().max().unwrap_or(0);
    if rows.is_empty() || max == 0 {
        empty(f, area, title, "No data available");
        return;
    }
    let label_width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0).min(12);
    let lines: Vec<Line> = rows
        .iter()
        .zip(cells)
        .enumerate()
        .map(|(i, (label, values))| {
            let mut spans = vec![Span::styled(
                format!("{:<label_width$} ", ellipsize(label, label_width)),
                Style::default().fg(palette(i)),
            )];
            let strip: String = values.iter().map(|v| shade(*v, max)).collect();
            spans.push(Span::styled(strip, Style::default().fg(Color::LightRed)));
            Line::from(spans)
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(titled(title)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_wraps() {
        assert_eq!(palette(0), palette(10));
        assert_ne!(palette(0), palette(1));
    }

    #[test]
    fn graph_merges_pairs_and_ranks_hosts() {
        let graph = LinkGraph::build(
            [
                ("10.0.0.1", "10.0.0.2", 100),
                ("10.0.0.1", "10.0.0.2", 50),
                ("10.0.0.3", "10.0.0.2", 10),
                ("10.0.0.4", "10.0.0.5", 1),
            ],
            3,
        );
        assert_eq!(graph.nodes, ["10.0.0.2", "10.0.0.1", "10.0.0.3"]);
        assert!(graph.edges.contains(&(1, 0, 150)));
        assert!(graph.edges.contains(&(2, 0, 10)));
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn huge_byte_counts_saturate() {
        let graph = LinkGraph::build(
            [("a", "b", u64::MAX), ("a", "b", 7), ("b", "a", u64::MAX - 1)],
            2,
        );
        assert!(graph.edges.contains(&(0, 1, u64::MAX)));
        assert!(graph.edges.contains(&(1, 0, u64::MAX - 1)));

        let backend = ratatui::backend::TestBackend::new(40, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|f| render_network_map(f, f.size(), "Links", &graph))
            .unwrap();
    }

    #[test]
    fn layout_places_nodes_on_unit_circle() {
        let graph = LinkGraph::build([("a", "b", 1), ("c", "d", 1)], 10);
        for (x, y) in graph.layout() {
            assert!(((x * x + y * y) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn shades_scale_with_value() {
        assert_eq!(shade(0, 100), ' ');
        assert_eq!(shade(1, 100), '░');
        assert_eq!(shade(60, 100), '▓');
        assert_eq!(shade(100, 100), '█');
        assert_eq!(shade(5, 0), ' ');
    }

    #[test]
    fn axis_labels_are_sparse() {
        let labels: Vec<String> = (0..7).map(|i| format!("t{i}")).collect();
        assert_eq!(axis_labels(&labels), ["t0", "t3", "t6"]);
        assert!(axis_labels(&[]).is_empty());
    }

    #[test]
    fn series_index_samples() {
        let series = Series::from_values("TCP", [5, 9]);
        assert_eq!(series.points, vec![(0.0, 5.0), (1.0, 9.0)]);
        assert_eq!(series.max_y(), 9.0);
    }
}
