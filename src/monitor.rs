//! System resource sampling.
//!
//! Metrics come from the same places an admin would look by hand:
//! `/proc/stat`, `/proc/loadavg`, `free`, `df`, `uptime -p`, `ss`.
//! Parsing is split into pure functions over the captured text so the
//! math is testable without a live system.

use crate::error::Result;
use crate::shell;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time numeric snapshot, as persisted to the monitoring history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub swap_percent: f64,
    pub disk_percent: f64,
    pub load_1min: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub percent: f64,
}

impl MemoryUsage {
    pub fn summary(&self) -> String {
        format!(
            "{}/{}",
            format_bytes(self.used_bytes),
            format_bytes(self.total_bytes)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiskUsage {
    pub filesystem: String,
    pub size: String,
    pub used: String,
    pub available: String,
    pub percent: f64,
    pub mount: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone)]
pub struct ListeningPort {
    pub proto: String,
    pub address: String,
    pub port: u16,
    pub process: Option<String>,
}

// ── Sampling ────────────────────────────────────────────────────────

/// CPU usage from a single `/proc/stat` sample: `100 * (1 - idle/total)`
/// over the aggregate cpu line. A since-boot average, not an instant
/// reading — good enough for threshold alerting.
pub async fn cpu_usage() -> f64 {
    match tokio::fs::read_to_string("/proc/stat").await {
        Ok(text) => parse_cpu_stat(&text).unwrap_or(0.0),
        Err(_) => 0.0,
    }
}

pub async fn memory_usage() -> MemoryUsage {
    match shell::output_of("free", &["-b"]).await {
        Some(text) => parse_free(&text, "Mem:").unwrap_or_default(),
        None => MemoryUsage::default(),
    }
}

pub async fn swap_usage() -> MemoryUsage {
    match shell::output_of("free", &["-b"]).await {
        Some(text) => parse_free(&text, "Swap:").unwrap_or_default(),
        None => MemoryUsage::default(),
    }
}

/// Disk usage of the root filesystem.
pub async fn root_disk_usage() -> DiskUsage {
    match shell::output_of("df", &["-h", "-P", "/"]).await {
        Some(text) => parse_df(&text)
            .into_iter()
            .next()
            .unwrap_or_default(),
        None => DiskUsage::default(),
    }
}

/// Usage of every real filesystem (`df -h -P`, pseudo filesystems
/// filtered out).
pub async fn all_disk_usage() -> Result<Vec<DiskUsage>> {
    let out = shell::run("df", &["-h", "-P", "-x", "tmpfs", "-x", "devtmpfs"]).await?;
    Ok(parse_df(&out.stdout))
}

pub async fn load_average() -> Option<LoadAverage> {
    let text = tokio::fs::read_to_string("/proc/loadavg").await.ok()?;
    parse_loadavg(&text)
}

pub async fn uptime() -> Option<String> {
    shell::output_of("uptime", &["-p"]).await
}

pub fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Listening TCP sockets via `ss -tlnp` (falls back gracefully when the
/// process column needs privileges we don't have).
pub async fn listening_ports() -> Result<Vec<ListeningPort>> {
    let out = shell::run("ss", &["-tlnp"]).await?;
    Ok(parse_ss(&out.stdout))
}

/// One full numeric sample for the alerts history.
pub async fn collect_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        timestamp: Utc::now(),
        cpu_percent: cpu_usage().await,
        memory_percent: memory_usage().await.percent,
        swap_percent: swap_usage().await.percent,
        disk_percent: root_disk_usage().await.percent,
        load_1min: load_average().await.map(|l| l.one).unwrap_or(0.0),
    }
}

// ── Parsing ─────────────────────────────────────────────────────────

pub fn parse_cpu_stat(text: &str) -> Option<f64> {
    let line = text.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<f64> = line
        .split_whitespace()
        .skip(1)
        .take(7)
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() < 5 {
        return None;
    }
    let idle = fields[3];
    let total: f64 = fields.iter().sum();
    if total <= 0.0 {
        return None;
    }
    Some(100.0 * (1.0 - idle / total))
}

/// Parse one row of `free -b` output ("Mem:" or "Swap:").
pub fn parse_free(text: &str, row: &str) -> Option<MemoryUsage> {
    let line = text.lines().find(|l| l.starts_with(row))?;
    let parts: Vec<&str> = line.split_whitespace().collect();
    let total: u64 = parts.get(1)?.parse().ok()?;
    let used: u64 = parts.get(2)?.parse().ok()?;
    let percent = if total > 0 {
        used as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    Some(MemoryUsage {
        total_bytes: total,
        used_bytes: used,
        percent,
    })
}

pub fn parse_df(text: &str) -> Vec<DiskUsage> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                return None;
            }
            let percent: f64 = parts[4].trim_end_matches('%').parse().ok()?;
            Some(DiskUsage {
                filesystem: parts[0].to_string(),
                size: parts[1].to_string(),
                used: parts[2].to_string(),
                available: parts[3].to_string(),
                percent,
                mount: parts[5].to_string(),
            })
        })
        .collect()
}

pub fn parse_loadavg(text: &str) -> Option<LoadAverage> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    Some(LoadAverage {
        one: parts.first()?.parse().ok()?,
        five: parts.get(1)?.parse().ok()?,
        fifteen: parts.get(2)?.parse().ok()?,
    })
}

/// Parse `ss -tlnp` output. The `-t` flag restricts to TCP, so the
/// first column is the socket state, not a protocol.
pub fn parse_ss(text: &str) -> Vec<ListeningPort> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 || parts[0] != "LISTEN" {
                return None;
            }
            let local = parts[3];
            let (address, port_str) = local.rsplit_once(':')?;
            let port: u16 = port_str.parse().ok()?;
            // users:(("nginx",pid=1234,fd=6))
            let process = parts
                .iter()
                .find(|p| p.starts_with("users:"))
                .and_then(|p| p.split('"').nth(1))
                .map(|s| s.to_string());
            Some(ListeningPort {
                proto: "tcp".to_string(),
                address: address.to_string(),
                port,
                process,
            })
        })
        .collect()
}

// ── Rendering ───────────────────────────────────────────────────────

/// Text progress bar, colored by how hot the value is.
pub fn progress_bar(value: f64, max: f64, width: usize) -> String {
    let clamped = value.clamp(0.0, max);
    let filled = ((width as f64) * clamped / max).round() as usize;
    let color = if value < 50.0 {
        "\x1b[32m"
    } else if value < 80.0 {
        "\x1b[33m"
    } else {
        "\x1b[31m"
    };
    format!(
        "{}{}{}\x1b[0m",
        color,
        "█".repeat(filled),
        "░".repeat(width - filled)
    )
}

pub fn format_bytes(bytes: u64) -> String {
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= GIB {
        format!("{:.1} GB", b / GIB)
    } else if b >= MIB {
        format!("{:.1} MB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_stat_math_matches_idle_ratio() {
        // 25% idle over the summed fields => 75% usage
        let text = "cpu  300 0 100 200 100 50 50\ncpu0 1 2 3 4 5 6 7\n";
        let usage = parse_cpu_stat(text).unwrap();
        let total = 300.0 + 100.0 + 200.0 + 100.0 + 50.0 + 50.0;
        let expected = 100.0 * (1.0 - 200.0 / total);
        assert!((usage - expected).abs() < 1e-9);
    }

    #[test]
    fn free_rows_parse_to_percentages() {
        let text = "              total        used        free\n\
                    Mem:     8000000000  2000000000  6000000000\n\
                    Swap:    1000000000   500000000   500000000\n";
        let mem = parse_free(text, "Mem:").unwrap();
        assert_eq!(mem.total_bytes, 8_000_000_000);
        assert!((mem.percent - 25.0).abs() < 1e-9);
        let swap = parse_free(text, "Swap:").unwrap();
        assert!((swap.percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn df_rows_parse_and_skip_header() {
        let text = "Filesystem      Size  Used Avail Use% Mounted on\n\
                    /dev/vda1        79G   23G   53G  31% /\n\
                    /dev/vdb1       500G  400G  100G  80% /var\n";
        let disks = parse_df(text);
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[0].mount, "/");
        assert!((disks[1].percent - 80.0).abs() < 1e-9);
    }

    #[test]
    fn loadavg_parses_three_values() {
        let load = parse_loadavg("0.52 0.58 0.59 1/467 31337\n").unwrap();
        assert!((load.one - 0.52).abs() < 1e-9);
        assert!((load.fifteen - 0.59).abs() < 1e-9);
    }

    #[test]
    fn ss_output_parses_port_and_process() {
        let text = "State  Recv-Q Send-Q Local Address:Port Peer Address:Port Process\n\
                    LISTEN 0      511          0.0.0.0:80        0.0.0.0:*     users:((\"nginx\",pid=1234,fd=6))\n\
                    LISTEN 0      128             [::]:22           [::]:*\n";
        let ports = parse_ss(text);
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].proto, "tcp");
        assert_eq!(ports[0].port, 80);
        assert_eq!(ports[0].process.as_deref(), Some("nginx"));
        assert_eq!(ports[1].port, 22);
        assert!(ports[1].process.is_none());
    }

    #[test]
    fn bytes_humanize_with_unit_steps() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn progress_bar_width_is_stable() {
        let bar = progress_bar(50.0, 100.0, 20);
        let filled = bar.matches('█').count();
        let empty = bar.matches('░').count();
        assert_eq!(filled + empty, 20);
        assert_eq!(filled, 10);
    }
}
