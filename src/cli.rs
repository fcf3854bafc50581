//! Command-line surface: the interactive dashboard plus one-shot commands
//! that print a single API response as a table.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::api::{
    AnomalyQuery, ApiClient, CollectorSettings, DetectionMethod, DetectionSettings, FlowQuery,
    FlowType, StartCapture,
};
use crate::badge::Severity;
use crate::format::{
    describe_tcp_flags, endpoint, format_bytes, format_number, format_timestamp, or_dash,
    protocol_name, TimeStyle,
};
use crate::model::{
    AnomalyPage, AnomalyStatistics, Capture, DashboardSummary, FlowPage, NetworkInterface,
    PacketPage, ProtocolDistribution, TcpFlagStats, TimeRange, TopTalkers,
};

/// Terminal dashboard for a network traffic analysis backend
#[derive(Parser, Debug)]
#[command(name = "trafficscope", version, about = "Network traffic analysis dashboard")]
pub struct Cli {
    /// Path to configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL (overrides $TRAFFICSCOPE_URL and the config file)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum CaptureCommands {
    /// Start a packet capture on an interface
    Start {
        interface: String,
        name: String,
        /// BPF filter expression
        #[arg(long, default_value = "")]
        filter: String,
        /// Seconds before the capture stops by itself
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },
    /// Stop a running capture
    Stop { capture_id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum DetectionCommands {
    /// Start anomaly detection
    Start {
        #[arg(long, default_value = "statistical")]
        method: DetectionMethod,
        #[arg(long, default_value_t = 3.0)]
        sensitivity: f64,
    },
    /// Stop anomaly detection
    Stop,
}

#[derive(Subcommand, Debug)]
pub enum CollectorCommands {
    /// Start the flow collector
    Start {
        #[arg(long, default_value = "netflow")]
        flow_type: FlowType,
        #[arg(long, default_value_t = 9995)]
        port: u16,
    },
    /// Stop the flow collector
    Stop,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive dashboard (default)
    Tui,

    /// Print the dashboard summary
    Summary,

    /// List capture interfaces
    Interfaces,

    /// List packet captures
    Captures,

    /// Start or stop a packet capture
    Capture {
        #[command(subcommand)]
        command: CaptureCommands,
    },

    /// List the packets of a capture
    Packets {
        capture_id: i64,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 50)]
        per_page: u32,
    },

    /// List flow records
    Flows {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 50)]
        per_page: u32,
        #[arg(long)]
        flow_type: Option<FlowType>,
        #[arg(long)]
        source_ip: Option<String>,
        #[arg(long)]
        destination_ip: Option<String>,
    },

    /// Show top talkers
    Talkers {
        #[arg(long, default_value = "1h")]
        range: TimeRange,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Show protocol distribution and TCP flag counts
    Protocols {
        #[arg(long, default_value = "1h")]
        range: TimeRange,
    },

    /// List anomalies
    Anomalies {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        per_page: u32,
        /// Only this severity (1-5)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        severity: Option<u8>,
        #[arg(long)]
        resolved: Option<bool>,
        /// Print statistics instead of the list
        #[arg(long)]
        stats: bool,
    },

    /// Mark an anomaly as resolved
    Resolve {
        anomaly_id: i64,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Start or stop anomaly detection
    Detection {
        #[command(subcommand)]
        command: DetectionCommands,
    },

    /// Start or stop the flow collector
    Collector {
        #[command(subcommand)]
        command: CollectorCommands,
    },
}

/// Runs a one-shot command; `Tui` is handled by the caller.
pub async fn run(client: &ApiClient, command: Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Tui => {}
        Commands::Summary => print_summary(out, &client.dashboard_summary().await?)?,
        Commands::Interfaces => print_interfaces(out, &client.interfaces().await?)?,
        Commands::Captures => print_captures(out, &client.captures().await?)?,
        Commands::Capture { command } => match command {
            CaptureCommands::Start {
                interface,
                name,
                filter,
                timeout,
            } => {
                let request = StartCapture {
                    interface,
                    name,
                    filter_expression: filter,
                    timeout,
                };
                let id = client.start_capture(&request).await?;
                writeln!(out, "Capture \"{}\" started (ID: {id})", request.name)?;
            }
            CaptureCommands::Stop { capture_id } => {
                client.stop_capture(capture_id).await?;
                writeln!(out, "Capture {capture_id} stopped")?;
            }
        },
        Commands::Packets {
            capture_id,
            page,
            per_page,
        } => print_packets(out, &client.packets(capture_id, page, per_page).await?)?,
        Commands::Flows {
            page,
            per_page,
            flow_type,
            source_ip,
            destination_ip,
        } => {
            let query = FlowQuery {
                page,
                per_page,
                flow_type: flow_type.map(|t| t.as_str().to_string()),
                source_ip,
                destination_ip,
                ..Default::default()
            };
            print_flows(out, &client.flows(&query).await?, per_page)?;
        }
        Commands::Talkers { range, limit } => {
            print_talkers(out, &client.top_talkers(range, limit).await?)?
        }
        Commands::Protocols { range } => {
            print_distribution(out, &client.protocol_distribution(range).await?)?;
            writeln!(out)?;
            print_tcp_flags(out, &client.tcp_flags(range).await?)?;
        }
        Commands::Anomalies {
            page,
            per_page,
            severity,
            resolved,
            stats,
        } => {
            if stats {
                print_statistics(out, &client.anomaly_statistics().await?)?;
            } else {
                let query = AnomalyQuery {
                    page,
                    per_page,
                    severity,
                    resolved,
                    ..Default::default()
                };
                print_anomalies(out, &client.anomalies(&query).await?, per_page)?;
            }
        }
        Commands::Resolve { anomaly_id, notes } => {
            client.resolve_anomaly(anomaly_id, &notes).await?;
            writeln!(out, "Anomaly {anomaly_id} resolved")?;
        }
        Commands::Detection { command } => match command {
            DetectionCommands::Start {
                method,
                sensitivity,
            } => {
                anyhow::ensure!(
                    sensitivity.is_finite() && sensitivity > 0.0,
                    "sensitivity must be greater than 0"
                );
                client
                    .start_detection(&DetectionSettings {
                        method,
                        sensitivity,
                    })
                    .await?;
                writeln!(
                    out,
                    "Anomaly detection started using {} method",
                    method.as_str()
                )?;
            }
            DetectionCommands::Stop => {
                client.stop_detection().await?;
                writeln!(out, "Anomaly detection stopped")?;
            }
        },
        Commands::Collector { command } => match command {
            CollectorCommands::Start { flow_type, port } => {
                anyhow::ensure!(port > 0, "port must be between 1 and 65535");
                client
                    .start_collector(&CollectorSettings { flow_type, port })
                    .await?;
                writeln!(
                    out,
                    "Flow collector ({}) started on port {port}",
                    flow_type.as_str()
                )?;
            }
            CollectorCommands::Stop => {
                client.stop_collector().await?;
                writeln!(out, "Flow collector stopped")?;
            }
        },
    }
    Ok(())
}

pub fn print_summary(out: &mut impl Write, summary: &DashboardSummary) -> std::io::Result<()> {
    let (bytes_in, bytes_out) = summary
        .bandwidth
        .first()
        .map(|b| (b.bytes_in, b.bytes_out))
        .unwrap_or_default();
    writeln!(
        out,
        "Latest bandwidth: in {}  out {}",
        format_bytes(bytes_in),
        format_bytes(bytes_out)
    )?;
    writeln!(out)?;

    writeln!(out, "{:<12} {:>10} {:>12} {:>8}", "Protocol", "Packets", "Bytes", "Share")?;
    writeln!(out, "{}", "-".repeat(45))?;
    for p in &summary.protocols {
        writeln!(
            out,
            "{:<12} {:>10} {:>12} {:>7.1}%",
            p.protocol,
            format_number(p.packet_count),
            format_bytes(p.byte_count),
            p.percentage
        )?;
    }
    writeln!(out)?;

    writeln!(out, "Recent anomalies: {}", summary.anomalies.len())?;
    for a in &summary.anomalies {
        writeln!(
            out,
            "  [{:<8}] {} {}",
            Severity::from_code(a.severity).label(),
            format_timestamp(&a.timestamp, TimeStyle::DateTime),
            a.event_type
        )?;
    }
    writeln!(out)?;

    writeln!(out, "Active captures: {}", summary.active_captures.len())?;
    for c in &summary.active_captures {
        writeln!(
            out,
            "  #{:<5} {:<20} {:<10} {:>8} packets",
            c.id,
            c.name,
            c.interface,
            format_number(c.packet_count)
        )?;
    }
    Ok(())
}

pub fn print_interfaces(out: &mut impl Write, interfaces: &[NetworkInterface]) -> std::io::Result<()> {
    if interfaces.is_empty() {
        return writeln!(out, "No interfaces reported.");
    }
    writeln!(out, "{:<12} {:<16} {:<18} {:<6}", "Name", "Address", "MAC", "State")?;
    writeln!(out, "{}", "-".repeat(55))?;
    for i in interfaces {
        writeln!(
            out,
            "{:<12} {:<16} {:<18} {:<6}",
            i.name,
            or_dash(i.ip_address.as_deref()),
            or_dash(i.mac_address.as_deref()),
            if i.is_up { "up" } else { "down" }
        )?;
    }
    Ok(())
}

pub fn print_captures(out: &mut impl Write, captures: &[Capture]) -> std::io::Result<()> {
    if captures.is_empty() {
        return writeln!(out, "No captures found.");
    }
    writeln!(
        out,
        "{:<6} {:<20} {:<10} {:<20} {:>10} {:<8}",
        "ID", "Name", "Interface", "Started", "Packets", "Status"
    )?;
    writeln!(out, "{}", "-".repeat(79))?;
    for c in captures {
        writeln!(
            out,
            "{:<6} {:<20} {:<10} {:<20} {:>10} {:<8}",
            c.id,
            c.name,
            c.interface,
            format_timestamp(&c.start_time, TimeStyle::DateTime),
            format_number(c.packet_count),
            if c.active { "active" } else { "done" }
        )?;
    }
    Ok(())
}

pub fn print_packets(out: &mut impl Write, page: &PacketPage) -> std::io::Result<()> {
    writeln!(
        out,
        "{:<8} {:<10} {:<6} {:<22} {:<22} {:>6} {:<5} Info",
        "ID", "Time", "Proto", "Source", "Destination", "Len", "Flags"
    )?;
    writeln!(out, "{}", "-".repeat(90))?;
    for p in &page.packets {
        writeln!(
            out,
            "{:<8} {:<10} {:<6} {:<22} {:<22} {:>6} {:<5} {}",
            p.id,
            format_timestamp(&p.timestamp, TimeStyle::Time),
            or_dash(p.protocol.as_deref()),
            endpoint(or_dash(p.source_ip.as_deref()), p.source_port),
            endpoint(or_dash(p.destination_ip.as_deref()), p.destination_port),
            p.length.map(|l| l.to_string()).unwrap_or_default(),
            or_dash(p.tcp_flags.as_deref()),
            or_dash(p.info.as_deref())
        )?;
    }
    page_footer(out, page.current_page, page.pages, page.total)
}

pub fn print_flows(out: &mut impl Write, page: &FlowPage, per_page: u32) -> std::io::Result<()> {
    if page.flows.is_empty() {
        return writeln!(out, "No flow records found.");
    }
    writeln!(
        out,
        "{:<6} {:<20} {:<8} {:<22} {:<22} {:<5} {:>11} {:>9}",
        "#", "Time", "Type", "Source", "Destination", "Proto", "Bytes", "Packets"
    )?;
    writeln!(out, "{}", "-".repeat(110))?;
    let offset = u64::from(page.current_page.max(1) - 1) * u64::from(per_page);
    for (i, f) in page.flows.iter().enumerate() {
        writeln!(
            out,
            "{:<6} {:<20} {:<8} {:<22} {:<22} {:<5} {:>11} {:>9}",
            offset + i as u64 + 1,
            format_timestamp(&f.timestamp, TimeStyle::DateTime),
            f.flow_type,
            endpoint(&f.source_ip, f.source_port),
            endpoint(&f.destination_ip, f.destination_port),
            protocol_name(f.protocol),
            format_bytes(f.bytes.unwrap_or(0)),
            format_number(f.packets.unwrap_or(0))
        )?;
    }
    page_footer(out, page.current_page, page.pages, page.total)
}

pub fn print_talkers(out: &mut impl Write, talkers: &TopTalkers) -> std::io::Result<()> {
    for (title, list) in [
        ("Top sources", &talkers.top_sources),
        ("Top destinations", &talkers.top_destinations),
    ] {
        writeln!(out, "{title} ({})", talkers.time_range)?;
        writeln!(out, "{:<40} {:>12} {:>10} {:>8}", "Address", "Bytes", "Packets", "Flows")?;
        writeln!(out, "{}", "-".repeat(73))?;
        if list.is_empty() {
            writeln!(out, "No data available")?;
        }
        for t in list {
            writeln!(
                out,
                "{:<40} {:>12} {:>10} {:>8}",
                t.ip_address,
                format_bytes(t.bytes),
                format_number(t.packets),
                format_number(t.flow_count)
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn print_distribution(out: &mut impl Write, dist: &ProtocolDistribution) -> std::io::Result<()> {
    writeln!(out, "Protocol distribution ({})", dist.time_range)?;
    writeln!(out, "{:<12} {:>10} {:>12} {:>8}", "Protocol", "Packets", "Bytes", "Share")?;
    writeln!(out, "{}", "-".repeat(45))?;
    for p in &dist.protocols {
        writeln!(
            out,
            "{:<12} {:>10} {:>12} {:>7.1}%",
            p.protocol,
            format_number(p.packet_count),
            format_bytes(p.byte_count),
            p.percentage
        )?;
    }
    Ok(())
}

pub fn print_tcp_flags(out: &mut impl Write, stats: &TcpFlagStats) -> std::io::Result<()> {
    writeln!(out, "TCP flags ({})", stats.time_range)?;
    writeln!(out, "{:<8} {:>10}  Meaning", "Flags", "Count")?;
    writeln!(out, "{}", "-".repeat(60))?;
    for c in &stats.tcp_flags {
        let meaning = if c.description.trim().is_empty() {
            describe_tcp_flags(&c.flags)
        } else {
            c.description.clone()
        };
        writeln!(out, "{:<8} {:>10}  {}", c.flags, format_number(c.count), meaning)?;
    }
    Ok(())
}

pub fn print_anomalies(out: &mut impl Write, page: &AnomalyPage, per_page: u32) -> std::io::Result<()> {
    if page.anomalies.is_empty() {
        return writeln!(out, "No anomalies found.");
    }
    writeln!(
        out,
        "{:<5} {:<6} {:<20} {:<20} {:<9} {:<16} {:<10}",
        "#", "ID", "Time", "Event", "Severity", "Source", "Status"
    )?;
    writeln!(out, "{}", "-".repeat(92))?;
    let offset = u64::from(page.current_page.max(1) - 1) * u64::from(per_page);
    for (i, a) in page.anomalies.iter().enumerate() {
        writeln!(
            out,
            "{:<5} {:<6} {:<20} {:<20} {:<9} {:<16} {:<10}",
            offset + i as u64 + 1,
            a.id,
            format_timestamp(&a.timestamp, TimeStyle::DateTime),
            a.event_type,
            Severity::from_code(a.severity).label(),
            or_dash(a.source_ip.as_deref()),
            if a.resolved { "resolved" } else { "open" }
        )?;
    }
    page_footer(out, page.current_page, page.pages, page.total)
}

pub fn print_statistics(out: &mut impl Write, stats: &AnomalyStatistics) -> std::io::Result<()> {
    writeln!(out, "Total anomalies:  {}", format_number(stats.total))?;
    writeln!(out, "Unresolved:       {}", format_number(stats.by_resolution.unresolved))?;
    writeln!(out, "High severity:    {}", format_number(stats.high_severity()))?;
    writeln!(out)?;
    writeln!(out, "By severity:")?;
    for (severity, count) in Severity::ALL.iter().zip(stats.severity_buckets()) {
        writeln!(out, "  {:<9} {:>8}", severity.label(), format_number(count))?;
    }
    writeln!(out)?;
    writeln!(out, "By event type:")?;
    for e in &stats.by_event_type {
        writeln!(out, "  {:<24} {:>8}", e.event_type, format_number(e.count))?;
    }
    Ok(())
}

fn page_footer(out: &mut impl Write, current: u32, pages: u32, total: u64) -> std::io::Result<()> {
    writeln!(out, "{}", "-".repeat(20))?;
    writeln!(out, "Page {} of {} ({} total)", current.max(1), pages.max(1), total)
}
