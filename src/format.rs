//! Display formatting shared by every page.

use chrono::{DateTime, NaiveDateTime};

const BYTE_UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

const SI_UNITS: [(f64, &str); 5] = [
    (1e15, "P"),
    (1e12, "T"),
    (1e9, "G"),
    (1e6, "M"),
    (1e3, "k"),
];

/// Human readable size with two decimals, e.g. `1536 -> "1.5 KB"`.
pub fn format_bytes(bytes: u64) -> String {
    format_bytes_with(bytes as f64, 2)
}

/// Base-1024 size rounded to `decimals`, trailing zeros dropped.
pub fn format_bytes_with(bytes: f64, decimals: usize) -> String {
    if bytes == 0.0 || !bytes.is_finite() {
        return "0 Bytes".to_string();
    }
    let sign = if bytes < 0.0 { "-" } else { "" };
    let magnitude = bytes.abs();
    let mut exponent = 0;
    let mut scaled = magnitude;
    while scaled >= 1024.0 && exponent < BYTE_UNITS.len() - 1 {
        scaled /= 1024.0;
        exponent += 1;
    }
    format!(
        "{sign}{} {}",
        trim_decimals(&format!("{scaled:.decimals$}")),
        BYTE_UNITS[exponent]
    )
}

/// Compact count with an SI suffix, e.g. `1500 -> "1.5k"`.
pub fn format_number(n: u64) -> String {
    if n < 1000 {
        return n.to_string();
    }
    let value = n as f64;
    for (scale, symbol) in SI_UNITS {
        if value >= scale {
            return format!("{}{symbol}", trim_decimals(&format!("{:.1}", value / scale)));
        }
    }
    n.to_string()
}

fn trim_decimals(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// IANA protocol number to a name for the common cases.
pub fn protocol_name(protocol: Option<u8>) -> String {
    match protocol {
        Some(6) => "TCP".to_string(),
        Some(17) => "UDP".to_string(),
        Some(1) => "ICMP".to_string(),
        Some(other) => other.to_string(),
        None => "-".to_string(),
    }
}

pub fn tcp_flag_name(flag: char) -> Option<&'static str> {
    Some(match flag {
        'S' => "SYN - Connection establishment",
        'A' => "ACK - Acknowledgment",
        'F' => "FIN - Connection termination",
        'R' => "RST - Connection reset",
        'P' => "PSH - Push data",
        'U' => "URG - Urgent data",
        'E' => "ECE - ECN-Echo",
        'C' => "CWR - Congestion Window Reduced",
        _ => return None,
    })
}

/// Describes a flag string such as `"SA"`.
pub fn describe_tcp_flags(flags: &str) -> String {
    let names: Vec<&str> = flags.chars().filter_map(tcp_flag_name).collect();
    if names.is_empty() {
        "Unknown flag combination".to_string()
    } else {
        names.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStyle {
    Time,
    Date,
    DateTime,
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Renders a backend timestamp; unparsable input comes back unchanged.
pub fn format_timestamp(raw: &str, style: TimeStyle) -> String {
    let Some(ts) = parse_timestamp(raw) else {
        return raw.to_string();
    };
    let pattern = match style {
        TimeStyle::Time => "%H:%M:%S",
        TimeStyle::Date => "%Y-%m-%d",
        TimeStyle::DateTime => "%Y-%m-%d %H:%M:%S",
    };
    ts.format(pattern).to_string()
}

/// `ip:port`, or just the address when the port is absent or zero.
pub fn endpoint(ip: &str, port: Option<u16>) -> String {
    match port.filter(|p| *p != 0) {
        Some(port) => format!("{ip}:{port}"),
        None => ip.to_string(),
    }
}

pub fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}

/// Cuts `s` to `width` columns, marking the cut with `...`.
pub fn ellipsize(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    if width <= 3 {
        return s.chars().take(width).collect();
    }
    let mut out: String = s.chars().take(width - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_pick_the_right_unit() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_048_576), "1 MB");
        assert_eq!(format_bytes(1_073_741_824), "1 GB");
        assert_eq!(format_bytes(1_234_567), "1.18 MB");
    }

    #[test]
    fn bytes_respect_decimals() {
        assert_eq!(format_bytes_with(1_300_000.0, 0), "1 MB");
        assert_eq!(format_bytes_with(1_300_000.0, 1), "1.2 MB");
        assert_eq!(format_bytes_with(0.5, 2), "0.5 Bytes");
        assert_eq!(format_bytes_with(-2048.0, 2), "-2 KB");
    }

    #[test]
    fn numbers_get_si_suffixes() {
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1k");
        assert_eq!(format_number(1500), "1.5k");
        assert_eq!(format_number(2_000_000), "2M");
        assert_eq!(format_number(3_260_000_000), "3.3G");
    }

    #[test]
    fn protocol_numbers_map_to_names() {
        assert_eq!(protocol_name(Some(6)), "TCP");
        assert_eq!(protocol_name(Some(17)), "UDP");
        assert_eq!(protocol_name(Some(1)), "ICMP");
        assert_eq!(protocol_name(Some(47)), "47");
        assert_eq!(protocol_name(None), "-");
    }

    #[test]
    fn tcp_flags_are_described() {
        assert_eq!(
            describe_tcp_flags("SA"),
            "SYN - Connection establishment, ACK - Acknowledgment"
        );
        assert_eq!(describe_tcp_flags("xyz"), "Unknown flag combination");
    }

    #[test]
    fn timestamps_render_per_style() {
        let raw = "2024-03-01T14:05:09.123456";
        assert_eq!(format_timestamp(raw, TimeStyle::Time), "14:05:09");
        assert_eq!(format_timestamp(raw, TimeStyle::Date), "2024-03-01");
        assert_eq!(
            format_timestamp("2024-03-01T14:05:09+00:00", TimeStyle::DateTime),
            "2024-03-01 14:05:09"
        );
        assert_eq!(format_timestamp("yesterday", TimeStyle::Time), "yesterday");
    }

    #[test]
    fn endpoints_skip_missing_ports() {
        assert_eq!(endpoint("10.0.0.1", Some(443)), "10.0.0.1:443");
        assert_eq!(endpoint("10.0.0.1", Some(0)), "10.0.0.1");
        assert_eq!(endpoint("10.0.0.1", None), "10.0.0.1");
    }

    #[test]
    fn ellipsize_marks_the_cut() {
        assert_eq!(ellipsize("10.0.0.1 -> 10.0.0.2", 10), "10.0.0....");
        assert_eq!(ellipsize("short", 10), "short");
    }
}
