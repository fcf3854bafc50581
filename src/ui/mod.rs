pub mod charts;
pub mod form;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Tabs, Wrap},
    Frame,
};

use crate::app::App;
use crate::pages::PageId;

/// Rect of `percent_x` width and `height` rows centred in `r`.
pub fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height.min(r.height)),
            Constraint::Min(0),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

pub fn block(title: impl Into<String>) -> Block<'static> {
    Block::default()
        .title(format!(" {} ", title.into()))
        .borders(Borders::ALL)
}

pub fn header_row(columns: &[&'static str]) -> Row<'static> {
    Row::new(columns.to_vec()).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

/// Single-cell row for "no data" and inline error messages.
pub fn message_row(message: impl Into<String>, is_error: bool) -> Row<'static> {
    let color = if is_error { Color::Red } else { Color::DarkGray };
    Row::new(vec![message.into()]).style(Style::default().fg(color))
}

pub fn highlight() -> Style {
    Style::default()
        .add_modifier(Modifier::BOLD)
        .fg(Color::Yellow)
}

pub fn draw(f: &mut Frame, app: &mut App) {
    let alert_rows = app.alerts.len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(alert_rows),
            Constraint::Min(10),
            Constraint::Length(1),
        ])
        .split(f.size());

    let titles: Vec<Line> = PageId::ALL
        .iter()
        .enumerate()
        .map(|(i, p)| Line::from(format!("{} {}", i + 1, p.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .block(block(format!("trafficscope · {}", app.base_url)))
        .select(app.active.index())
        .highlight_style(highlight());
    f.render_widget(tabs, chunks[0]);

    if alert_rows > 0 {
        let lines: Vec<Line> = app
            .alerts
            .iter()
            .map(|a| {
                Line::from(vec![
                    Span::styled(" ● ", Style::default().fg(a.level.color())),
                    Span::styled(a.message.clone(), Style::default().fg(a.level.color())),
                    Span::styled("  (Esc to dismiss)", Style::default().fg(Color::DarkGray)),
                ])
            })
            .collect();
        f.render_widget(Paragraph::new(lines), chunks[1]);
    }

    let active = app.active;
    app.page_mut(active).render(f, chunks[2]);

    let hint = if app.show_help {
        app.page(active).help()
    } else {
        "q quit · Tab/1-5 switch page · r reload · ? page keys"
    };
    f.render_widget(
        Paragraph::new(Span::styled(hint, Style::default().fg(Color::DarkGray)))
            .wrap(Wrap { trim: true }),
        chunks[3],
    );
}
