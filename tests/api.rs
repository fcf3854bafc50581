use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, RawQuery, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use trafficscope::api::{
    AnomalyQuery, ApiClient, CollectorSettings, DetectionSettings, FlowQuery, StartCapture,
};
use trafficscope::cli::{self, Commands};
use trafficscope::error::ApiError;
use trafficscope::model::{BucketInterval, TimeRange};

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, entry: String) {
    log.lock().unwrap().push(entry);
}

async fn flows(State(log): State<Log>, RawQuery(query): RawQuery) -> Json<Value> {
    record(&log, format!("flows?{}", query.unwrap_or_default()));
    Json(json!({
        "flows": [{
            "id": 7,
            "timestamp": "2024-03-01T10:00:00",
            "flow_type": "netflow",
            "source_ip": "10.0.0.1",
            "destination_ip": "10.0.0.2",
            "source_port": 51000,
            "destination_port": 443,
            "protocol": 6,
            "bytes": 2048,
            "packets": 4
        }],
        "total": 51,
        "pages": 2,
        "current_page": 2
    }))
}

async fn anomalies(State(log): State<Log>, RawQuery(query): RawQuery) -> Json<Value> {
    record(&log, format!("anomalies?{}", query.unwrap_or_default()));
    Json(json!({"anomalies": [], "total": 0, "pages": 0, "current_page": 1}))
}

async fn series(State(log): State<Log>, RawQuery(query): RawQuery) -> Json<Value> {
    record(&log, format!("series?{}", query.unwrap_or_default()));
    Json(json!({
        "time_series": [
            {"timestamp": "2024-03-01T10:00:00", "TCP": 1200, "UDP": 300},
            {"timestamp": "2024-03-01T10:05:00", "TCP": 800}
        ],
        "time_range": "6h",
        "interval": "10m"
    }))
}

async fn start_capture(State(log): State<Log>, Json(body): Json<Value>) -> Json<Value> {
    record(&log, format!("start-capture {body}"));
    Json(json!({"success": true, "capture_id": 42}))
}

async fn start_collector(State(log): State<Log>, Json(body): Json<Value>) -> Json<Value> {
    record(&log, format!("start-collector {body}"));
    Json(json!({"success": true}))
}

async fn resolve(
    State(log): State<Log>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&log, format!("resolve/{id} {body}"));
    Json(json!({"success": true}))
}

async fn start_detection() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "Anomaly detection is already running"})),
    )
}

async fn stop_detection(State(log): State<Log>, method: Method, uri: Uri) -> Json<Value> {
    record(&log, format!("{method} {uri}"));
    Json(json!({"success": false, "error": "Anomaly detection is not running"}))
}

/// Logs method, path and query, then answers with a canned body for the path.
async fn echo(State(log): State<Log>, method: Method, uri: Uri) -> Json<Value> {
    record(&log, format!("{method} {uri}"));
    let path = uri.path();
    let body = if path == "/api/dashboard/live-stats" {
        json!({"bandwidth": {"bytes_in": 10, "bytes_out": 5}, "protocols": []})
    } else if path == "/api/settings/interfaces" {
        json!([{"id": 1, "name": "eth0", "is_up": false}])
    } else if path.starts_with("/api/packet-analysis/packets/") {
        json!({"packets": [], "total": 0, "pages": 0, "current_page": 2})
    } else if path == "/api/anomaly-detection/statistics" {
        json!({
            "by_severity": [{"severity": 4, "count": 2}],
            "by_event_type": [{"event_type": "port_scan", "count": 2}],
            "by_resolution": {"resolved": 1, "unresolved": 1},
            "total": 2
        })
    } else if path == "/api/protocol-analysis/distribution" {
        json!({
            "protocols": [{"protocol": "TCP", "packet_count": 3, "byte_count": 120, "percentage": 100.0}],
            "time_range": "7d"
        })
    } else if path == "/api/protocol-analysis/tcp-flags" {
        json!({"tcp_flags": [{"flags": "S", "count": 3}], "time_range": "1h"})
    } else {
        json!({"success": true})
    };
    Json(body)
}

async fn packet_details(
    State(log): State<Log>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
) -> Response {
    record(&log, format!("{method} {uri}"));
    if id == 404 {
        let page = "<!doctype html>\n<html lang=en>\n<title>404 Not Found</title>\n<h1>Not Found</h1>";
        return (StatusCode::NOT_FOUND, Html(page)).into_response();
    }
    Json(json!({"packet_id": id, "details": {"ip": {"ttl": 64}}})).into_response()
}

async fn broken_summary() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "database is locked")
}

async fn talkers() -> Json<Value> {
    Json(json!({
        "top_sources": [{"ip_address": "10.0.0.1", "bytes": null, "packets": 3, "flow_count": 1}],
        "top_destinations": [],
        "time_range": "24h"
    }))
}

async fn spawn_backend() -> (String, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .route("/api/dashboard/summary", get(broken_summary))
        .route("/api/dashboard/live-stats", get(echo))
        .route("/api/settings/interfaces", get(echo))
        .route("/api/flow-analysis/stop-collector", post(echo))
        .route("/api/anomaly-detection/statistics", get(echo))
        .route("/api/packet-analysis/stop-capture/:id", post(echo))
        .route("/api/packet-analysis/packets/:id", get(echo))
        .route("/api/packet-analysis/packet-details/:id", get(packet_details))
        .route("/api/protocol-analysis/distribution", get(echo))
        .route("/api/protocol-analysis/tcp-flags", get(echo))
        .route("/api/flow-analysis/flows", get(flows))
        .route("/api/flow-analysis/top-talkers", get(talkers))
        .route("/api/flow-analysis/start-collector", post(start_collector))
        .route("/api/anomaly-detection/anomalies", get(anomalies))
        .route("/api/anomaly-detection/start", post(start_detection))
        .route("/api/anomaly-detection/stop", post(stop_detection))
        .route("/api/anomaly-detection/resolve/:id", post(resolve))
        .route("/api/packet-analysis/start-capture", post(start_capture))
        .route("/api/protocol-analysis/protocol-over-time", get(series))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), log)
}

fn client(base: &str) -> ApiClient {
    ApiClient::new(base, Duration::from_secs(5)).unwrap()
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn flow_filters_become_query_parameters() {
    let (base, log) = spawn_backend().await;
    let query = FlowQuery {
        page: 2,
        per_page: 50,
        flow_type: Some("netflow".to_string()),
        source_ip: Some("10.0.0.1".to_string()),
        ..Default::default()
    };
    let page = client(&base).flows(&query).await.unwrap();

    assert_eq!(page.current_page, 2);
    assert_eq!(page.flows[0].destination_port, Some(443));
    assert_eq!(
        entries(&log),
        vec!["flows?page=2&per_page=50&flow_type=netflow&source_ip=10.0.0.1".to_string()]
    );
}

#[tokio::test]
async fn unset_anomaly_filters_are_omitted() {
    let (base, log) = spawn_backend().await;
    let api = client(&base);
    api.anomalies(&AnomalyQuery {
        page: 1,
        per_page: 10,
        ..Default::default()
    })
    .await
    .unwrap();
    api.anomalies(&AnomalyQuery {
        page: 3,
        per_page: 10,
        severity: Some(4),
        resolved: Some(false),
        ..Default::default()
    })
    .await
    .unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "anomalies?page=1&per_page=10".to_string(),
            "anomalies?page=3&per_page=10&severity=4&resolved=false".to_string(),
        ]
    );
}

#[tokio::test]
async fn protocol_series_sends_range_and_interval() {
    let (base, log) = spawn_backend().await;
    let series = client(&base)
        .protocol_over_time(TimeRange::SixHours, BucketInterval::TenMinutes)
        .await
        .unwrap();

    assert_eq!(series.protocols(), vec!["TCP".to_string(), "UDP".to_string()]);
    assert_eq!(series.time_series[1].bytes.get("UDP"), None);
    assert_eq!(entries(&log), vec!["series?time_range=6h&interval=10m".to_string()]);
}

#[tokio::test]
async fn start_capture_returns_new_id() {
    let (base, log) = spawn_backend().await;
    let id = client(&base)
        .start_capture(&StartCapture {
            interface: "eth0".to_string(),
            name: "web".to_string(),
            filter_expression: "port 443".to_string(),
            timeout: 60,
        })
        .await
        .unwrap();

    assert_eq!(id, 42);
    let body: Value = serde_json::from_str(
        entries(&log)[0].trim_start_matches("start-capture "),
    )
    .unwrap();
    assert_eq!(
        body,
        json!({"interface": "eth0", "name": "web", "filter_expression": "port 443", "timeout": 60})
    );
}

#[tokio::test]
async fn resolve_posts_notes() {
    let (base, log) = spawn_backend().await;
    client(&base)
        .resolve_anomaly(9, "false positive")
        .await
        .unwrap();
    assert_eq!(
        entries(&log),
        vec![r#"resolve/9 {"resolution_notes":"false positive"}"#.to_string()]
    );
}

#[tokio::test]
async fn error_status_uses_backend_message() {
    let (base, _) = spawn_backend().await;
    let err = client(&base)
        .start_detection(&DetectionSettings::default())
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
            assert_eq!(message, "Anomaly detection is already running");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn plain_text_errors_are_kept() {
    let (base, _) = spawn_backend().await;
    let err = client(&base).dashboard_summary().await.unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(message, "database is locked");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn html_error_pages_use_status_reason() {
    let (base, _) = spawn_backend().await;
    let err = client(&base).packet_details(404).await.unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
            assert_eq!(message, "Not Found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unsuccessful_reply_is_rejected() {
    let (base, _) = spawn_backend().await;
    let err = client(&base).stop_detection().await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected(ref m) if m == "Anomaly detection is not running"));
}

#[tokio::test]
async fn read_endpoints_use_documented_paths() {
    let (base, log) = spawn_backend().await;
    let api = client(&base);

    let live = api.live_stats().await.unwrap();
    assert_eq!(live.bandwidth.total_bytes(), Some(15));
    let interfaces = api.interfaces().await.unwrap();
    assert!(!interfaces[0].is_up);
    let packets = api.packets(4, 2, 50).await.unwrap();
    assert_eq!(packets.current_page, 2);
    let details = api.packet_details(11).await.unwrap();
    assert_eq!(details.packet_id, 11);
    let stats = api.anomaly_statistics().await.unwrap();
    assert_eq!(stats.high_severity(), 2);
    let distribution = api.protocol_distribution(TimeRange::Week).await.unwrap();
    assert_eq!(distribution.protocols[0].byte_count, 120);
    let flags = api.tcp_flags(TimeRange::Hour).await.unwrap();
    assert_eq!(flags.tcp_flags[0].count, 3);

    assert_eq!(
        entries(&log),
        vec![
            "GET /api/dashboard/live-stats".to_string(),
            "GET /api/settings/interfaces".to_string(),
            "GET /api/packet-analysis/packets/4?page=2&per_page=50".to_string(),
            "GET /api/packet-analysis/packet-details/11".to_string(),
            "GET /api/anomaly-detection/statistics".to_string(),
            "GET /api/protocol-analysis/distribution?time_range=7d".to_string(),
            "GET /api/protocol-analysis/tcp-flags?time_range=1h".to_string(),
        ]
    );
}

#[tokio::test]
async fn stop_commands_use_documented_paths() {
    let (base, log) = spawn_backend().await;
    let api = client(&base);

    api.stop_capture(4).await.unwrap();
    api.stop_collector().await.unwrap();
    api.stop_detection().await.unwrap_err();

    assert_eq!(
        entries(&log),
        vec![
            "POST /api/packet-analysis/stop-capture/4".to_string(),
            "POST /api/flow-analysis/stop-collector".to_string(),
            "POST /api/anomaly-detection/stop".to_string(),
        ]
    );
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}")).captures().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn cli_prints_talkers_table() {
    let (base, _) = spawn_backend().await;
    let mut out = Vec::new();
    cli::run(
        &client(&base),
        Commands::Talkers {
            range: TimeRange::Day,
            limit: 5,
        },
        &mut out,
    )
    .await
    .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Top sources (24h)"));
    assert!(text.contains("10.0.0.1"));
    assert!(text.contains("No data available"));
}

#[tokio::test]
async fn cli_collector_start_reports_port() {
    let (base, log) = spawn_backend().await;
    let mut out = Vec::new();
    cli::run(
        &client(&base),
        Commands::Collector {
            command: cli::CollectorCommands::Start {
                flow_type: CollectorSettings::default().flow_type,
                port: 2055,
            },
        },
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Flow collector (netflow) started on port 2055\n"
    );
    assert_eq!(
        entries(&log),
        vec![r#"start-collector {"flow_type":"netflow","port":2055}"#.to_string()]
    );
}
