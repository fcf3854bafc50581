//! Typed client for the traffic analysis REST API.

use std::str::FromStr;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::model::{
    AnomalyPage, AnomalyStatistics, BucketInterval, Capture, CommandReply, DashboardSummary,
    FlowPage, LiveStats, NetworkInterface, PacketDetails, PacketPage, ProtocolDistribution,
    ProtocolOverTime, TcpFlagStats, TimeRange, TopTalkers,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnomalyQuery {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowQuery {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartCapture {
    pub interface: String,
    pub name: String,
    pub filter_expression: String,
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    #[default]
    Netflow,
    Ipfix,
    Sflow,
}

impl FlowType {
    pub const ALL: [FlowType; 3] = [FlowType::Netflow, FlowType::Ipfix, FlowType::Sflow];

    pub fn as_str(self) -> &'static str {
        match self {
            FlowType::Netflow => "netflow",
            FlowType::Ipfix => "ipfix",
            FlowType::Sflow => "sflow",
        }
    }
}

impl FromStr for FlowType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown flow type `{s}` (expected netflow, ipfix or sflow)"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CollectorSettings {
    pub flow_type: FlowType,
    pub port: u16,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            flow_type: FlowType::Netflow,
            port: 9995,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    #[default]
    Statistical,
    RuleBased,
    MachineLearning,
}

impl DetectionMethod {
    pub const ALL: [DetectionMethod; 3] = [
        DetectionMethod::Statistical,
        DetectionMethod::RuleBased,
        DetectionMethod::MachineLearning,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DetectionMethod::Statistical => "statistical",
            DetectionMethod::RuleBased => "rule-based",
            DetectionMethod::MachineLearning => "machine-learning",
        }
    }
}

impl FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|m| m.as_str() == s).ok_or_else(|| {
            format!("unknown method `{s}` (expected statistical, rule-based or machine-learning)")
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionSettings {
    pub method: DetectionMethod,
    pub sensitivity: f64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            method: DetectionMethod::Statistical,
            sensitivity: 3.0,
        }
    }
}

#[derive(Serialize)]
struct ResolveBody<'a> {
    resolution_notes: &'a str,
}

#[derive(Serialize)]
struct Page {
    page: u32,
    per_page: u32,
}

#[derive(Serialize)]
struct Window {
    time_range: TimeRange,
}

#[derive(Serialize)]
struct Talkers {
    time_range: TimeRange,
    limit: u32,
}

#[derive(Serialize)]
struct Series {
    time_range: TimeRange,
    interval: BucketInterval,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = base_url.trim_end_matches('/').to_string();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ApiError::BaseUrl(base_url.to_string()));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get<T, Q>(&self, path: &str, query: Option<&Q>) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        debug!(%url, "GET");
        let mut request = self.http.get(&url);
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = checked(request.send().await?).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn command<B>(&self, path: &str, body: &B) -> Result<CommandReply>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self
            .http
            .request(Method::POST, &url)
            .json(body)
            .send()
            .await?;
        let response = checked(response).await?;
        let reply: CommandReply = serde_json::from_slice(&response.bytes().await?)?;
        if !reply.success {
            let message = reply
                .error
                .unwrap_or_else(|| "request was not accepted".to_string());
            warn!(%url, %message, "command rejected");
            return Err(ApiError::Rejected(message));
        }
        Ok(reply)
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary> {
        self.get::<_, ()>("/api/dashboard/summary", None).await
    }

    pub async fn live_stats(&self) -> Result<LiveStats> {
        self.get::<_, ()>("/api/dashboard/live-stats", None).await
    }

    pub async fn interfaces(&self) -> Result<Vec<NetworkInterface>> {
        self.get::<_, ()>("/api/settings/interfaces", None).await
    }

    pub async fn captures(&self) -> Result<Vec<Capture>> {
        self.get::<_, ()>("/api/packet-analysis/captures", None).await
    }

    /// Returns the id of the new capture.
    pub async fn start_capture(&self, request: &StartCapture) -> Result<i64> {
        let reply = self
            .command("/api/packet-analysis/start-capture", request)
            .await?;
        reply
            .capture_id
            .ok_or_else(|| ApiError::Rejected("capture started without an id".to_string()))
    }

    pub async fn stop_capture(&self, capture_id: i64) -> Result<()> {
        let path = format!("/api/packet-analysis/stop-capture/{capture_id}");
        self.command(&path, &serde_json::json!({})).await.map(drop)
    }

    pub async fn packets(&self, capture_id: i64, page: u32, per_page: u32) -> Result<PacketPage> {
        let path = format!("/api/packet-analysis/packets/{capture_id}");
        self.get(&path, Some(&Page { page, per_page })).await
    }

    pub async fn packet_details(&self, packet_id: i64) -> Result<PacketDetails> {
        let path = format!("/api/packet-analysis/packet-details/{packet_id}");
        self.get::<_, ()>(&path, None).await
    }

    pub async fn start_collector(&self, settings: &CollectorSettings) -> Result<()> {
        self.command("/api/flow-analysis/start-collector", settings)
            .await
            .map(drop)
    }

    pub async fn stop_collector(&self) -> Result<()> {
        self.command("/api/flow-analysis/stop-collector", &serde_json::json!({}))
            .await
            .map(drop)
    }

    pub async fn flows(&self, query: &FlowQuery) -> Result<FlowPage> {
        self.get("/api/flow-analysis/flows", Some(query)).await
    }

    pub async fn top_talkers(&self, time_range: TimeRange, limit: u32) -> Result<TopTalkers> {
        self.get(
            "/api/flow-analysis/top-talkers",
            Some(&Talkers { time_range, limit }),
        )
        .await
    }

    pub async fn protocol_distribution(&self, time_range: TimeRange) -> Result<ProtocolDistribution> {
        self.get("/api/protocol-analysis/distribution", Some(&Window { time_range }))
            .await
    }

    pub async fn tcp_flags(&self, time_range: TimeRange) -> Result<TcpFlagStats> {
        self.get("/api/protocol-analysis/tcp-flags", Some(&Window { time_range }))
            .await
    }

    pub async fn protocol_over_time(
        &self,
        time_range: TimeRange,
        interval: BucketInterval,
    ) -> Result<ProtocolOverTime> {
        self.get(
            "/api/protocol-analysis/protocol-over-time",
            Some(&Series {
                time_range,
                interval,
            }),
        )
        .await
    }

    pub async fn start_detection(&self, settings: &DetectionSettings) -> Result<()> {
        self.command("/api/anomaly-detection/start", settings)
            .await
            .map(drop)
    }

    pub async fn stop_detection(&self) -> Result<()> {
        self.command("/api/anomaly-detection/stop", &serde_json::json!({}))
            .await
            .map(drop)
    }

    pub async fn anomalies(&self, query: &AnomalyQuery) -> Result<AnomalyPage> {
        self.get("/api/anomaly-detection/anomalies", Some(query))
            .await
    }

    pub async fn anomaly_statistics(&self) -> Result<AnomalyStatistics> {
        self.get::<_, ()>("/api/anomaly-detection/statistics", None)
            .await
    }

    pub async fn resolve_anomaly(&self, anomaly_id: i64, notes: &str) -> Result<()> {
        let path = format!("/api/anomaly-detection/resolve/{anomaly_id}");
        self.command(
            &path,
            &ResolveBody {
                resolution_notes: notes,
            },
        )
        .await
        .map(drop)
    }
}

/// Turns a non-2xx response into `ApiError::Status`, preferring the
/// backend's own `error` field for the message. HTML error pages fall back
/// to the status reason.
async fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    let text = response.text().await.unwrap_or_default();
    let reason = || {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    };
    let message = serde_json::from_str::<CommandReply>(&text)
        .ok()
        .and_then(|r| r.error)
        .unwrap_or_else(|| {
            let trimmed = text.trim();
            if html || trimmed.is_empty() || trimmed.starts_with('<') {
                reason()
            } else {
                trimmed.chars().take(200).collect()
            }
        });
    Err(ApiError::Status { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_base_url_without_scheme() {
        let err = ApiClient::new("localhost:5000", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ApiError::BaseUrl(_)));
    }

    #[test]
    fn trims_trailing_slash() {
        let client = ApiClient::new("http://127.0.0.1:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base, "http://127.0.0.1:5000");
        assert_eq!(
            client.url("/api/dashboard/summary"),
            "http://127.0.0.1:5000/api/dashboard/summary"
        );
    }

    #[test]
    fn command_bodies_use_backend_spelling() {
        let body = serde_json::to_value(DetectionSettings {
            method: DetectionMethod::MachineLearning,
            sensitivity: 2.5,
        })
        .unwrap();
        assert_eq!(body["method"], "machine-learning");

        let body = serde_json::to_value(CollectorSettings::default()).unwrap();
        assert_eq!(body, serde_json::json!({"flow_type": "netflow", "port": 9995}));
    }
}
