//! Threshold-based alerting over collected metrics.
//!
//! Designed for cron: `forge alerts record` takes one snapshot, appends
//! it to the history file, and raises alerts for any threshold crossed.
//! All three artifacts (`thresholds.json`, `history.json`, `alerts.json`)
//! live under the monitoring directory and follow the same
//! load-tolerantly / save-atomically rules as the main state store.

use crate::error::Result;
use crate::monitor::MetricsSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// History entries kept on disk (oldest evicted first).
pub const HISTORY_CAP: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu_warning: f64,
    pub cpu_critical: f64,
    pub memory_warning: f64,
    pub memory_critical: f64,
    pub disk_warning: f64,
    pub disk_critical: f64,
    /// Load thresholds are per CPU core.
    pub load_warning: f64,
    pub load_critical: f64,
    pub swap_warning: f64,
    pub swap_critical: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_warning: 70.0,
            cpu_critical: 90.0,
            memory_warning: 75.0,
            memory_critical: 90.0,
            disk_warning: 80.0,
            disk_critical: 95.0,
            load_warning: 4.0,
            load_critical: 8.0,
            swap_warning: 50.0,
            swap_critical: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub acknowledged: bool,
}

/// Evaluate one snapshot against the thresholds. Pure, so the rules are
/// testable without touching `/proc`.
pub fn evaluate(snapshot: &MetricsSnapshot, thresholds: &Thresholds, cpus: usize) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let mut check = |metric: &str, value: f64, warning: f64, critical: f64, unit: &str| {
        let severity = if value >= critical {
            Some((Severity::Critical, critical))
        } else if value >= warning {
            Some((Severity::Warning, warning))
        } else {
            None
        };
        if let Some((severity, threshold)) = severity {
            alerts.push(Alert {
                timestamp: snapshot.timestamp,
                metric: metric.to_string(),
                value,
                threshold,
                severity,
                message: format!(
                    "{} at {:.1}{} (threshold {:.1}{})",
                    metric, value, unit, threshold, unit
                ),
                acknowledged: false,
            });
        }
    };

    check("cpu", snapshot.cpu_percent, thresholds.cpu_warning, thresholds.cpu_critical, "%");
    check(
        "memory",
        snapshot.memory_percent,
        thresholds.memory_warning,
        thresholds.memory_critical,
        "%",
    );
    check(
        "disk",
        snapshot.disk_percent,
        thresholds.disk_warning,
        thresholds.disk_critical,
        "%",
    );
    check(
        "swap",
        snapshot.swap_percent,
        thresholds.swap_warning,
        thresholds.swap_critical,
        "%",
    );

    let load_per_cpu = snapshot.load_1min / cpus.max(1) as f64;
    check(
        "load",
        load_per_cpu,
        thresholds.load_warning,
        thresholds.load_critical,
        "/cpu",
    );

    alerts
}

pub struct AlertStore {
    dir: PathBuf,
}

impl AlertStore {
    pub fn new(monitoring_dir: PathBuf) -> Self {
        Self { dir: monitoring_dir }
    }

    fn thresholds_path(&self) -> PathBuf {
        self.dir.join("thresholds.json")
    }

    fn alerts_path(&self) -> PathBuf {
        self.dir.join("alerts.json")
    }

    fn history_path(&self) -> PathBuf {
        self.dir.join("history.json")
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        load_or_default(&self.thresholds_path())
    }

    pub fn save_thresholds(&self, thresholds: &Thresholds) -> Result<()> {
        self.ensure_dir()?;
        write_json(&self.thresholds_path(), thresholds)
    }

    pub fn alerts(&self) -> Vec<Alert> {
        load_or_default(&self.alerts_path())
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alerts().into_iter().filter(|a| !a.acknowledged).collect()
    }

    pub fn save_alerts(&self, alerts: &[Alert]) -> Result<()> {
        self.ensure_dir()?;
        write_json(&self.alerts_path(), &alerts.to_vec())
    }

    pub fn acknowledge_all(&self) -> Result<usize> {
        let mut alerts = self.alerts();
        let count = alerts.iter().filter(|a| !a.acknowledged).count();
        for alert in &mut alerts {
            alert.acknowledged = true;
        }
        self.save_alerts(&alerts)?;
        Ok(count)
    }

    pub fn history(&self) -> Vec<MetricsSnapshot> {
        load_or_default(&self.history_path())
    }

    pub fn clear_history(&self) -> Result<()> {
        self.ensure_dir()?;
        write_json(&self.history_path(), &Vec::<MetricsSnapshot>::new())
    }

    /// Append a snapshot to history (capped) and raise alerts for any
    /// crossed threshold. Returns the newly generated alerts.
    pub fn record(&self, snapshot: MetricsSnapshot, cpus: usize) -> Result<Vec<Alert>> {
        self.ensure_dir()?;

        let mut history = self.history();
        history.push(snapshot.clone());
        if history.len() > HISTORY_CAP {
            let excess = history.len() - HISTORY_CAP;
            history.drain(..excess);
        }
        write_json(&self.history_path(), &history)?;

        let generated = evaluate(&snapshot, &self.thresholds(), cpus);
        if !generated.is_empty() {
            let mut alerts = self.alerts();
            alerts.extend(generated.iter().cloned());
            self.save_alerts(&alerts)?;
        }
        Ok(generated)
    }
}

fn load_or_default<T: serde::de::DeserializeOwned + Default>(path: &Path) -> T {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("{} is corrupt ({}), using defaults", path.display(), e);
            T::default()
        }),
        Err(_) => T::default(),
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(cpu: f64, mem: f64, disk: f64, load: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            cpu_percent: cpu,
            memory_percent: mem,
            swap_percent: 0.0,
            disk_percent: disk,
            load_1min: load,
        }
    }

    #[test]
    fn quiet_system_raises_nothing() {
        let alerts = evaluate(&snapshot(10.0, 30.0, 40.0, 0.5), &Thresholds::default(), 4);
        assert!(alerts.is_empty());
    }

    #[test]
    fn warning_and_critical_buckets() {
        let alerts = evaluate(&snapshot(75.0, 95.0, 40.0, 0.5), &Thresholds::default(), 4);
        assert_eq!(alerts.len(), 2);
        let cpu = alerts.iter().find(|a| a.metric == "cpu").unwrap();
        assert_eq!(cpu.severity, Severity::Warning);
        let memory = alerts.iter().find(|a| a.metric == "memory").unwrap();
        assert_eq!(memory.severity, Severity::Critical);
    }

    #[test]
    fn load_threshold_is_per_cpu() {
        // load 20 on 4 cpus => 5.0/cpu => warning, not critical
        let alerts = evaluate(&snapshot(0.0, 0.0, 0.0, 20.0), &Thresholds::default(), 4);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metric, "load");
        assert_eq!(alerts[0].severity, Severity::Warning);

        // Same load on 1 cpu crosses critical
        let alerts = evaluate(&snapshot(0.0, 0.0, 0.0, 20.0), &Thresholds::default(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
    }

    #[test]
    fn store_round_trips_and_acknowledges() {
        let dir = tempfile::tempdir().unwrap();
        let store = AlertStore::new(dir.path().to_path_buf());

        // Hot snapshot generates alerts and history
        let generated = store.record(snapshot(95.0, 10.0, 10.0, 0.1), 4).unwrap();
        assert_eq!(generated.len(), 1);
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.active_alerts().len(), 1);

        assert_eq!(store.acknowledge_all().unwrap(), 1);
        assert!(store.active_alerts().is_empty());
        // Acknowledged alerts stay in the full log
        assert_eq!(store.alerts().len(), 1);
    }

    #[test]
    fn history_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let store = AlertStore::new(dir.path().to_path_buf());
        // Write an oversized history directly, then record once.
        let big: Vec<MetricsSnapshot> =
            (0..HISTORY_CAP + 10).map(|_| snapshot(0.0, 0.0, 0.0, 0.0)).collect();
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(
            dir.path().join("history.json"),
            serde_json::to_string(&big).unwrap(),
        )
        .unwrap();

        store.record(snapshot(0.0, 0.0, 0.0, 0.0), 4).unwrap();
        assert_eq!(store.history().len(), HISTORY_CAP);
    }
}
