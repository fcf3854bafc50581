// src/model.rs
//! JSON shapes exchanged with the traffic analysis backend.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Aggregates such as `SUM(bytes)` come back as `null` over empty windows.
fn null_as_zero<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthSample {
    pub timestamp: String,
    pub interface: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub bytes_in: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub bytes_out: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub packets_in: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub packets_out: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolShare {
    pub protocol: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub packet_count: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub byte_count: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub timestamp: String,
    pub event_type: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub severity: u8,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub destination_ip: Option<String>,
    #[serde(default)]
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveCapture {
    pub id: i64,
    pub name: String,
    pub interface: String,
    pub start_time: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub packet_count: u64,
    #[serde(default)]
    pub filter_expression: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(default)]
    pub bandwidth: Vec<BandwidthSample>,
    #[serde(default)]
    pub protocols: Vec<ProtocolShare>,
    #[serde(default)]
    pub anomalies: Vec<AnomalySummary>,
    #[serde(default)]
    pub active_captures: Vec<ActiveCapture>,
}

/// Latest bandwidth sample. The backend sends `{}` before anything was recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveBandwidth {
    pub timestamp: Option<String>,
    pub interface: Option<String>,
    pub bytes_in: Option<u64>,
    pub bytes_out: Option<u64>,
    pub packets_in: Option<u64>,
    pub packets_out: Option<u64>,
    pub total_bandwidth: Option<f64>,
}

impl LiveBandwidth {
    pub fn is_empty(&self) -> bool {
        self.bytes_in.is_none() && self.bytes_out.is_none()
    }

    pub fn total_bytes(&self) -> Option<u64> {
        Some(self.bytes_in? + self.bytes_out?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveProtocol {
    pub protocol: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveStats {
    #[serde(default)]
    pub bandwidth: LiveBandwidth,
    #[serde(default)]
    pub protocols: Vec<LiveProtocol>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl LiveStats {
    /// Protocol with the highest share; the first one wins a tie.
    pub fn top_protocol(&self) -> Option<&LiveProtocol> {
        self.protocols
            .iter()
            .fold(None, |best: Option<&LiveProtocol>, p| match best {
                Some(b) if b.percentage >= p.percentage => Some(b),
                _ => Some(p),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: i64,
    pub timestamp: String,
    pub event_type: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub severity: u8,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub destination_ip: Option<String>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyPage {
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
    pub total: u64,
    pub pages: u32,
    pub current_page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityCount {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub severity: u8,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTypeCount {
    pub event_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCounts {
    pub resolved: u64,
    pub unresolved: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyStatistics {
    #[serde(default)]
    pub by_severity: Vec<SeverityCount>,
    #[serde(default)]
    pub by_event_type: Vec<EventTypeCount>,
    #[serde(default)]
    pub by_resolution: ResolutionCounts,
    #[serde(default)]
    pub total: u64,
}

impl AnomalyStatistics {
    /// Counts for severities 1 through 5, zero where the backend reported nothing.
    pub fn severity_buckets(&self) -> [u64; 5] {
        let mut buckets = [0; 5];
        for item in &self.by_severity {
            if (1..=5).contains(&item.severity) {
                buckets[usize::from(item.severity) - 1] = item.count;
            }
        }
        buckets
    }

    pub fn high_severity(&self) -> u64 {
        self.by_severity
            .iter()
            .filter(|s| s.severity >= 4)
            .map(|s| s.count)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub id: i64,
    pub timestamp: String,
    pub flow_type: String,
    pub source_ip: String,
    pub destination_ip: String,
    #[serde(default)]
    pub source_port: Option<u16>,
    #[serde(default)]
    pub destination_port: Option<u16>,
    #[serde(default)]
    pub protocol: Option<u8>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub packets: Option<u64>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub tcp_flags: Option<u8>,
    #[serde(default)]
    pub tos: Option<u8>,
    #[serde(default)]
    pub input_interface: Option<u32>,
    #[serde(default)]
    pub output_interface: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowPage {
    #[serde(default)]
    pub flows: Vec<FlowRecord>,
    pub total: u64,
    pub pages: u32,
    pub current_page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Talker {
    pub ip_address: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub bytes: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub packets: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub flow_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopTalkers {
    #[serde(default)]
    pub top_sources: Vec<Talker>,
    #[serde(default)]
    pub top_destinations: Vec<Talker>,
    #[serde(default)]
    pub time_range: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub id: i64,
    pub name: String,
    pub interface: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub packet_count: u64,
    #[serde(default)]
    pub filter_expression: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketRecord {
    pub id: i64,
    pub timestamp: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub source_port: Option<u16>,
    #[serde(default)]
    pub destination_ip: Option<String>,
    #[serde(default)]
    pub destination_port: Option<u16>,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub tcp_flags: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PacketPage {
    #[serde(default)]
    pub packets: Vec<PacketRecord>,
    pub total: u64,
    pub pages: u32,
    pub current_page: u32,
}

/// A dissected field: numeric when the backend knows it, text such as
/// `"Unknown"` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for DetailValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailValue::Integer(v) => write!(f, "{v}"),
            DetailValue::Float(v) => write!(f, "{v}"),
            DetailValue::Text(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralDetails {
    pub timestamp: Option<String>,
    pub length: Option<DetailValue>,
    pub capture_id: Option<DetailValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthernetDetails {
    pub source_mac: Option<DetailValue>,
    pub destination_mac: Option<DetailValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpDetails {
    pub version: Option<DetailValue>,
    pub header_length: Option<DetailValue>,
    pub total_length: Option<DetailValue>,
    pub ttl: Option<DetailValue>,
    pub protocol: Option<DetailValue>,
    pub source: Option<DetailValue>,
    pub destination: Option<DetailValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpDetails {
    pub source_port: Option<DetailValue>,
    pub destination_port: Option<DetailValue>,
    pub sequence_number: Option<DetailValue>,
    pub acknowledgment_number: Option<DetailValue>,
    pub flags: Option<DetailValue>,
    pub window_size: Option<DetailValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpDetails {
    pub source_port: Option<DetailValue>,
    pub destination_port: Option<DetailValue>,
    pub length: Option<DetailValue>,
    pub checksum: Option<DetailValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketDissection {
    pub general: GeneralDetails,
    pub ethernet: EthernetDetails,
    pub ip: IpDetails,
    pub tcp: Option<TcpDetails>,
    pub udp: Option<UdpDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketDetails {
    pub packet_id: i64,
    #[serde(default)]
    pub details: PacketDissection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolDistribution {
    #[serde(default)]
    pub protocols: Vec<ProtocolShare>,
    #[serde(default)]
    pub time_range: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcpFlagCount {
    pub flags: String,
    pub count: u64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TcpFlagStats {
    #[serde(default)]
    pub tcp_flags: Vec<TcpFlagCount>,
    #[serde(default)]
    pub time_range: String,
}

/// One bucket of the protocol time series: byte totals keyed by protocol name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub timestamp: String,
    #[serde(flatten)]
    pub bytes: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolOverTime {
    #[serde(default)]
    pub time_series: Vec<TimeBucket>,
    #[serde(default)]
    pub time_range: String,
    #[serde(default)]
    pub interval: String,
}

impl ProtocolOverTime {
    /// Every protocol seen in any bucket, sorted by name.
    pub fn protocols(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .time_series
            .iter()
            .flat_map(|b| b.bytes.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default = "default_true")]
    pub is_up: bool,
    #[serde(default)]
    pub is_loopback: bool,
}

fn default_true() -> bool {
    true
}

/// Reply to start/stop/resolve commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub capture_id: Option<i64>,
}

/// Window accepted by the aggregate endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "1h")]
    Hour,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
}

impl TimeRange {
    pub const ALL: [TimeRange; 4] = [
        TimeRange::Hour,
        TimeRange::SixHours,
        TimeRange::Day,
        TimeRange::Week,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::Hour => "1h",
            TimeRange::SixHours => "6h",
            TimeRange::Day => "24h",
            TimeRange::Week => "7d",
        }
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|r| *r == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown time range `{s}` (expected 1h, 6h, 24h or 7d)"))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket width for the protocol time series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[default]
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "10m")]
    TenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    Hour,
}

impl BucketInterval {
    pub const ALL: [BucketInterval; 5] = [
        BucketInterval::OneMinute,
        BucketInterval::FiveMinutes,
        BucketInterval::TenMinutes,
        BucketInterval::ThirtyMinutes,
        BucketInterval::Hour,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BucketInterval::OneMinute => "1m",
            BucketInterval::FiveMinutes => "5m",
            BucketInterval::TenMinutes => "10m",
            BucketInterval::ThirtyMinutes => "30m",
            BucketInterval::Hour => "1h",
        }
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|r| *r == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

impl FromStr for BucketInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| format!("unknown interval `{s}` (expected 1m, 5m, 10m, 30m or 1h)"))
    }
}

impl fmt::Display for BucketInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
