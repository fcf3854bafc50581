use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

use trafficscope::app::App;
use trafficscope::config::Config;
use trafficscope::error::ApiError;
use trafficscope::model::{Anomaly, AnomalyPage, DashboardSummary, ProtocolShare};
use trafficscope::network::{Feed, Payload, Ticket, Update};
use trafficscope::ui;

fn screen(app: &mut App) -> String {
    let backend = TestBackend::new(200, 50);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(|f| ui::draw(f, app)).unwrap();
    text(terminal.backend().buffer())
}

fn text(buffer: &Buffer) -> String {
    let width = buffer.area.width as usize;
    buffer
        .content()
        .chunks(width)
        .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn ticket_for(app: &mut App, feed: Feed) -> Ticket {
    app.take_jobs()
        .into_iter()
        .map(|(ticket, _)| ticket)
        .find(|t| t.feed == feed)
        .unwrap()
}

fn press(app: &mut App, code: KeyCode) {
    app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
}

#[test]
fn tabs_and_loading_state() {
    let mut app = App::new(&Config::default());
    app.start(Instant::now());
    let screen = screen(&mut app);

    for title in ["1 Dashboard", "2 Packets", "3 Flows", "4 Protocols", "5 Anomalies"] {
        assert!(screen.contains(title), "missing tab {title}");
    }
    assert!(screen.contains("http://127.0.0.1:5000"));
    assert!(screen.contains("Loading..."));
}

#[test]
fn dashboard_shows_summary() {
    let mut app = App::new(&Config::default());
    app.start(Instant::now());
    let ticket = ticket_for(&mut app, Feed::Summary);
    app.apply(Update {
        ticket,
        result: Ok(Payload::Summary(DashboardSummary {
            protocols: vec![ProtocolShare {
                protocol: "HTTPS".to_string(),
                packet_count: 1200,
                byte_count: 900_000,
                percentage: 64.5,
            }],
            ..Default::default()
        })),
    });

    let screen = screen(&mut app);
    assert!(screen.contains("HTTPS"));
    assert!(screen.contains("No anomalies detected"));
    assert!(screen.contains("No active captures"));
}

#[test]
fn anomalies_page_lists_rows() {
    let mut app = App::new(&Config::default());
    press(&mut app, KeyCode::Char('5'));
    let ticket = ticket_for(&mut app, Feed::Anomalies);
    app.apply(Update {
        ticket,
        result: Ok(Payload::Anomalies(AnomalyPage {
            anomalies: vec![Anomaly {
                id: 3,
                timestamp: "2024-03-01T10:00:00".to_string(),
                event_type: "port_scan".to_string(),
                severity: 5,
                description: Some("Port scan from 10.0.0.9".to_string()),
                source_ip: Some("10.0.0.9".to_string()),
                destination_ip: None,
                resolved: false,
                resolution_notes: None,
            }],
            total: 1,
            pages: 1,
            current_page: 1,
        })),
    });

    let screen = screen(&mut app);
    assert!(screen.contains("port_scan"));
    assert!(screen.contains("10.0.0.9"));
    assert!(screen.contains("Critical"));
}

#[test]
fn failures_show_dismissable_banner() {
    let mut app = App::new(&Config::default());
    press(&mut app, KeyCode::Char('3'));
    let ticket = ticket_for(&mut app, Feed::Flows);
    app.apply(Update {
        ticket,
        result: Err(ApiError::Rejected("collector offline".to_string())),
    });

    let shown = screen(&mut app);
    assert!(shown.contains("Error loading flows: collector offline"));
    assert!(shown.contains("(Esc to dismiss)"));

    press(&mut app, KeyCode::Esc);
    assert!(!screen(&mut app).contains("(Esc to dismiss)"));
}

#[test]
fn help_line_switches_to_page_keys() {
    let mut app = App::new(&Config::default());
    assert!(screen(&mut app).contains("? page keys"));
    press(&mut app, KeyCode::Char('?'));
    let shown = screen(&mut app);
    assert!(!shown.contains("? page keys"));
    assert!(shown.contains("x stop capture"));
}
