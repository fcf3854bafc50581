//! Background fetching. Pages describe what they need as [`Job`]s; the
//! [`Poller`] runs each one on the tokio runtime and hands the result back to
//! the draw loop over a channel.

use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::api::{AnomalyQuery, ApiClient, CollectorSettings, DetectionSettings, FlowQuery, StartCapture};
use crate::error::ApiError;
use crate::model::{
    AnomalyPage, AnomalyStatistics, BucketInterval, Capture, DashboardSummary, FlowPage, LiveStats,
    NetworkInterface, PacketDetails, PacketPage, ProtocolDistribution, ProtocolOverTime,
    TcpFlagStats, TimeRange, TopTalkers,
};
use crate::pages::PageId;

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Summary,
    LiveStats,
    Interfaces,
    Captures,
    Packets { capture_id: i64, page: u32, per_page: u32 },
    PacketDetails { packet_id: i64 },
    Flows(FlowQuery),
    TopTalkers { time_range: TimeRange, limit: u32 },
    ProtocolDistribution { time_range: TimeRange },
    TcpFlags { time_range: TimeRange },
    ProtocolOverTime { time_range: TimeRange, interval: BucketInterval },
    Anomalies(AnomalyQuery),
    AnomalyStatistics,
    StartCapture(StartCapture),
    StopCapture { capture_id: i64 },
    StartCollector(CollectorSettings),
    StopCollector,
    StartDetection(DetectionSettings),
    StopDetection,
    ResolveAnomaly { anomaly_id: i64, notes: String },
}

/// Independently refreshed data source. Responses are ordered per feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Summary,
    LiveStats,
    Interfaces,
    Captures,
    Packets,
    PacketDetails,
    Flows,
    TopTalkers,
    ProtocolDistribution,
    TcpFlags,
    ProtocolOverTime,
    Anomalies,
    AnomalyStatistics,
    StartCapture,
    StopCapture,
    StartCollector,
    StopCollector,
    StartDetection,
    StopDetection,
    ResolveAnomaly,
}

impl Feed {
    /// Commands are never superseded: every reply is applied.
    pub fn is_command(self) -> bool {
        matches!(
            self,
            Feed::StartCapture
                | Feed::StopCapture
                | Feed::StartCollector
                | Feed::StopCollector
                | Feed::StartDetection
                | Feed::StopDetection
                | Feed::ResolveAnomaly
        )
    }

    pub fn describe(self) -> &'static str {
        match self {
            Feed::Summary => "dashboard summary",
            Feed::LiveStats => "live stats",
            Feed::Interfaces => "interfaces",
            Feed::Captures => "captures",
            Feed::Packets => "packets",
            Feed::PacketDetails => "packet details",
            Feed::Flows => "flows",
            Feed::TopTalkers => "top talkers",
            Feed::ProtocolDistribution => "protocol distribution",
            Feed::TcpFlags => "TCP flags",
            Feed::ProtocolOverTime => "protocol history",
            Feed::Anomalies => "anomalies",
            Feed::AnomalyStatistics => "anomaly statistics",
            Feed::StartCapture => "start capture",
            Feed::StopCapture => "stop capture",
            Feed::StartCollector => "start collector",
            Feed::StopCollector => "stop collector",
            Feed::StartDetection => "start detection",
            Feed::StopDetection => "stop detection",
            Feed::ResolveAnomaly => "resolve anomaly",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    CaptureStarted(i64),
    CaptureStopped(i64),
    CollectorStarted,
    CollectorStopped,
    DetectionStarted,
    DetectionStopped,
    AnomalyResolved(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Summary(DashboardSummary),
    LiveStats(LiveStats),
    Interfaces(Vec<NetworkInterface>),
    Captures(Vec<Capture>),
    Packets { capture_id: i64, page: PacketPage },
    PacketDetails(PacketDetails),
    Flows(FlowPage),
    TopTalkers(TopTalkers),
    ProtocolDistribution(ProtocolDistribution),
    TcpFlags(TcpFlagStats),
    ProtocolOverTime(ProtocolOverTime),
    Anomalies(AnomalyPage),
    AnomalyStatistics(AnomalyStatistics),
    Done(Outcome),
}

impl Job {
    pub fn feed(&self) -> Feed {
        match self {
            Job::Summary => Feed::Summary,
            Job::LiveStats => Feed::LiveStats,
            Job::Interfaces => Feed::Interfaces,
            Job::Captures => Feed::Captures,
            Job::Packets { .. } => Feed::Packets,
            Job::PacketDetails { .. } => Feed::PacketDetails,
            Job::Flows(_) => Feed::Flows,
            Job::TopTalkers { .. } => Feed::TopTalkers,
            Job::ProtocolDistribution { .. } => Feed::ProtocolDistribution,
            Job::TcpFlags { .. } => Feed::TcpFlags,
            Job::ProtocolOverTime { .. } => Feed::ProtocolOverTime,
            Job::Anomalies(_) => Feed::Anomalies,
            Job::AnomalyStatistics => Feed::AnomalyStatistics,
            Job::StartCapture(_) => Feed::StartCapture,
            Job::StopCapture { .. } => Feed::StopCapture,
            Job::StartCollector(_) => Feed::StartCollector,
            Job::StopCollector => Feed::StopCollector,
            Job::StartDetection(_) => Feed::StartDetection,
            Job::StopDetection => Feed::StopDetection,
            Job::ResolveAnomaly { .. } => Feed::ResolveAnomaly,
        }
    }

    pub async fn run(self, client: &ApiClient) -> Result<Payload, ApiError> {
        Ok(match self {
            Job::Summary => Payload::Summary(client.dashboard_summary().await?),
            Job::LiveStats => Payload::LiveStats(client.live_stats().await?),
            Job::Interfaces => Payload::Interfaces(client.interfaces().await?),
            Job::Captures => Payload::Captures(client.captures().await?),
            Job::Packets {
                capture_id,
                page,
                per_page,
            } => Payload::Packets {
                capture_id,
                page: client.packets(capture_id, page, per_page).await?,
            },
            Job::PacketDetails { packet_id } => {
                Payload::PacketDetails(client.packet_details(packet_id).await?)
            }
            Job::Flows(query) => Payload::Flows(client.flows(&query).await?),
            Job::TopTalkers { time_range, limit } => {
                Payload::TopTalkers(client.top_talkers(time_range, limit).await?)
            }
            Job::ProtocolDistribution { time_range } => {
                Payload::ProtocolDistribution(client.protocol_distribution(time_range).await?)
            }
            Job::TcpFlags { time_range } => Payload::TcpFlags(client.tcp_flags(time_range).await?),
            Job::ProtocolOverTime {
                time_range,
                interval,
            } => Payload::ProtocolOverTime(client.protocol_over_time(time_range, interval).await?),
            Job::Anomalies(query) => Payload::Anomalies(client.anomalies(&query).await?),
            Job::AnomalyStatistics => Payload::AnomalyStatistics(client.anomaly_statistics().await?),
            Job::StartCapture(request) => {
                Payload::Done(Outcome::CaptureStarted(client.start_capture(&request).await?))
            }
            Job::StopCapture { capture_id } => {
                client.stop_capture(capture_id).await?;
                Payload::Done(Outcome::CaptureStopped(capture_id))
            }
            Job::StartCollector(settings) => {
                client.start_collector(&settings).await?;
                Payload::Done(Outcome::CollectorStarted)
            }
            Job::StopCollector => {
                client.stop_collector().await?;
                Payload::Done(Outcome::CollectorStopped)
            }
            Job::StartDetection(settings) => {
                client.start_detection(&settings).await?;
                Payload::Done(Outcome::DetectionStarted)
            }
            Job::StopDetection => {
                client.stop_detection().await?;
                Payload::Done(Outcome::DetectionStopped)
            }
            Job::ResolveAnomaly { anomaly_id, notes } => {
                client.resolve_anomaly(anomaly_id, &notes).await?;
                Payload::Done(Outcome::AnomalyResolved(anomaly_id))
            }
        })
    }
}

/// Identifies a request: the page that asked, the feed it refreshes and its
/// position in issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub origin: PageId,
    pub feed: Feed,
    pub seq: u64,
}

pub struct Update {
    pub ticket: Ticket,
    pub result: Result<Payload, ApiError>,
}

/// Hands out tickets and rejects responses overtaken by a newer one on the
/// same feed.
#[derive(Debug, Default)]
pub struct Sequencer {
    issued: u64,
    applied: HashMap<(PageId, Feed), u64>,
}

impl Sequencer {
    pub fn issue(&mut self, origin: PageId, feed: Feed) -> Ticket {
        self.issued += 1;
        Ticket {
            origin,
            feed,
            seq: self.issued,
        }
    }

    pub fn accept(&mut self, ticket: &Ticket) -> bool {
        if ticket.feed.is_command() {
            return true;
        }
        let last = self.applied.entry((ticket.origin, ticket.feed)).or_insert(0);
        if ticket.seq > *last {
            *last = ticket.seq;
            true
        } else {
            debug!(feed = ?ticket.feed, seq = ticket.seq, newest = *last, "dropping stale response");
            false
        }
    }
}

/// Fixed-interval timer driven by the draw loop's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    every: Option<Duration>,
    last: Option<Instant>,
}

impl Schedule {
    pub fn every(period: Duration) -> Self {
        Self {
            every: Some(period),
            last: None,
        }
    }

    pub fn off() -> Self {
        Self {
            every: None,
            last: None,
        }
    }

    pub fn period(&self) -> Option<Duration> {
        self.every
    }

    pub fn set_period(&mut self, period: Option<Duration>, now: Instant) {
        self.every = period;
        self.last = Some(now);
    }

    /// Starts counting from `now`, as after a manual load.
    pub fn restart(&mut self, now: Instant) {
        self.last = Some(now);
    }

    pub fn due(&mut self, now: Instant) -> bool {
        let Some(every) = self.every else {
            return false;
        };
        match self.last {
            Some(last) if now.saturating_duration_since(last) < every => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

pub struct Poller {
    client: ApiClient,
    tx: Sender<Update>,
    runtime: Handle,
}

impl Poller {
    /// Must be created inside a tokio runtime.
    pub fn new(client: ApiClient, tx: Sender<Update>) -> Self {
        Self {
            client,
            tx,
            runtime: Handle::current(),
        }
    }

    pub fn dispatch(&self, ticket: Ticket, job: Job) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = job.run(&client).await;
            if let Err(e) = &result {
                warn!(feed = ticket.feed.describe(), error = %e, "request failed");
            }
            // The receiver is gone once the UI has quit.
            let _ = tx.send(Update { ticket, result });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_responses_are_dropped() {
        let mut seq = Sequencer::default();
        let first = seq.issue(PageId::Flows, Feed::Flows);
        let second = seq.issue(PageId::Flows, Feed::Flows);

        assert!(seq.accept(&second));
        assert!(!seq.accept(&first));
    }

    #[test]
    fn feeds_are_sequenced_independently() {
        let mut seq = Sequencer::default();
        let flows = seq.issue(PageId::Flows, Feed::Flows);
        let talkers = seq.issue(PageId::Flows, Feed::TopTalkers);
        assert!(seq.accept(&talkers));
        assert!(seq.accept(&flows));

        let from_dashboard = seq.issue(PageId::Dashboard, Feed::Captures);
        let from_packets = seq.issue(PageId::Packets, Feed::Captures);
        assert!(seq.accept(&from_packets));
        assert!(seq.accept(&from_dashboard));
    }

    #[test]
    fn command_replies_always_apply() {
        let mut seq = Sequencer::default();
        let first = seq.issue(PageId::Dashboard, Feed::StopCapture);
        let second = seq.issue(PageId::Dashboard, Feed::StopCapture);
        assert!(seq.accept(&second));
        assert!(seq.accept(&first));
    }

    #[test]
    fn schedule_fires_once_per_period() {
        let start = Instant::now();
        let mut schedule = Schedule::every(Duration::from_secs(2));
        schedule.restart(start);
        assert!(!schedule.due(start + Duration::from_secs(1)));
        assert!(schedule.due(start + Duration::from_secs(2)));
        assert!(!schedule.due(start + Duration::from_secs(3)));
        assert!(schedule.due(start + Duration::from_secs(4)));
    }

    #[test]
    fn disabled_schedule_never_fires() {
        let start = Instant::now();
        let mut schedule = Schedule::every(Duration::from_secs(1));
        schedule.set_period(None, start);
        assert!(!schedule.due(start + Duration::from_secs(60)));
        assert!(!Schedule::off().due(start));
    }

    #[test]
    fn commands_map_to_command_feeds() {
        assert!(Job::StopCollector.feed().is_command());
        assert!(!Job::Summary.feed().is_command());
        assert_eq!(
            Job::Packets {
                capture_id: 1,
                page: 1,
                per_page: 50
            }
            .feed(),
            Feed::Packets
        );
    }
}
