use crate::cli::AlertsCommands;
use crate::output::UserOutput;
use forge::alerts::{evaluate, AlertStore, Thresholds};
use forge::{cron, monitor, Config, Error};

pub async fn run_alerts(
    command: AlertsCommands,
    config: &Config,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let store = AlertStore::new(config.monitoring_dir());
    match command {
        AlertsCommands::Status => {
            let snapshot = monitor::collect_snapshot().await;
            let thresholds = store.thresholds();
            out.status("Current metrics:");
            out.status(&format!(
                "  cpu     {:>6.1}%   (warn {:.0}, crit {:.0})",
                snapshot.cpu_percent, thresholds.cpu_warning, thresholds.cpu_critical
            ));
            out.status(&format!(
                "  memory  {:>6.1}%   (warn {:.0}, crit {:.0})",
                snapshot.memory_percent, thresholds.memory_warning, thresholds.memory_critical
            ));
            out.status(&format!(
                "  disk    {:>6.1}%   (warn {:.0}, crit {:.0})",
                snapshot.disk_percent, thresholds.disk_warning, thresholds.disk_critical
            ));
            out.status(&format!(
                "  swap    {:>6.1}%   (warn {:.0}, crit {:.0})",
                snapshot.swap_percent, thresholds.swap_warning, thresholds.swap_critical
            ));
            out.status(&format!(
                "  load    {:>6.2}    (warn {:.1}/cpu, crit {:.1}/cpu, {} cpus)",
                snapshot.load_1min,
                thresholds.load_warning,
                thresholds.load_critical,
                monitor::cpu_count()
            ));

            let would_alert = evaluate(&snapshot, &thresholds, monitor::cpu_count());
            out.blank();
            if would_alert.is_empty() {
                out.success("All metrics within thresholds");
            } else {
                for alert in would_alert {
                    out.warning(&format!("[{}] {}", alert.severity, alert.message));
                }
            }
            Ok(())
        }
        AlertsCommands::Record => {
            let snapshot = monitor::collect_snapshot().await;
            let generated = store.record(snapshot, monitor::cpu_count())?;
            if generated.is_empty() {
                out.status("Metrics recorded, no thresholds crossed");
            } else {
                for alert in &generated {
                    out.warning(&format!("[{}] {}", alert.severity, alert.message));
                }
                out.status(&format!("Metrics recorded, {} alert(s) raised", generated.len()));
            }
            Ok(())
        }
        AlertsCommands::Show => {
            let active = store.active_alerts();
            if active.is_empty() {
                out.success("No active alerts");
                return Ok(());
            }
            for alert in &active {
                out.status(&format!(
                    "  {} [{}] {}",
                    alert.timestamp.format("%Y-%m-%d %H:%M"),
                    alert.severity,
                    alert.message
                ));
            }
            out.blank();
            out.status(&format!(
                "{} active alert(s). Acknowledge with: forge alerts ack",
                active.len()
            ));
            Ok(())
        }
        AlertsCommands::History { limit } => {
            let history = store.history();
            if history.is_empty() {
                out.warning("No metric history recorded yet.");
                out.status("Set up collection with: forge alerts setup-cron");
                return Ok(());
            }
            let skip = history.len().saturating_sub(limit);
            out.status(&format!(
                "{:<18} {:>6} {:>6} {:>6} {:>6} {:>6}",
                "Time", "CPU%", "Mem%", "Disk%", "Swap%", "Load"
            ));
            for snapshot in history.iter().skip(skip) {
                out.status(&format!(
                    "{:<18} {:>6.1} {:>6.1} {:>6.1} {:>6.1} {:>6.2}",
                    snapshot.timestamp.format("%m-%d %H:%M"),
                    snapshot.cpu_percent,
                    snapshot.memory_percent,
                    snapshot.disk_percent,
                    snapshot.swap_percent,
                    snapshot.load_1min
                ));
            }
            Ok(())
        }
        AlertsCommands::Ack => {
            let count = store.acknowledge_all()?;
            out.success(&format!("Acknowledged {} alert(s)", count));
            Ok(())
        }
        AlertsCommands::Thresholds { set } => {
            let mut thresholds = store.thresholds();
            if set.is_empty() {
                out.status(&serde_json::to_string_pretty(&thresholds)?);
                return Ok(());
            }
            for pair in &set {
                apply_threshold(&mut thresholds, pair)?;
            }
            store.save_thresholds(&thresholds)?;
            out.success("Thresholds updated");
            Ok(())
        }
        AlertsCommands::SetupCron { minutes } => {
            if !(1..=59).contains(&minutes) {
                anyhow::bail!("interval must be between 1 and 59 minutes");
            }
            let entry = cron::monitoring_entry(minutes);
            // Replace any previous collection entry rather than stacking
            cron::remove_matching("alerts record").await?;
            cron::add(&entry.schedule, &entry.command, true).await?;
            out.success(&format!(
                "Metrics collection scheduled: {} ({})",
                entry.schedule,
                cron::schedule_to_human(&entry.schedule)
            ));
            Ok(())
        }
        AlertsCommands::ClearHistory { yes } => {
            if !yes {
                return Err(
                    Error::NeedsConfirmation("clearing the metric history".to_string()).into(),
                );
            }
            store.clear_history()?;
            out.success("Metric history cleared");
            Ok(())
        }
    }
}

fn apply_threshold(thresholds: &mut Thresholds, pair: &str) -> anyhow::Result<()> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected KEY=VALUE, got '{}'", pair))?;
    let value: f64 = value
        .parse()
        .map_err(|_| anyhow::anyhow!("'{}' is not a number", value))?;
    let slot = match key {
        "cpu_warning" => &mut thresholds.cpu_warning,
        "cpu_critical" => &mut thresholds.cpu_critical,
        "memory_warning" => &mut thresholds.memory_warning,
        "memory_critical" => &mut thresholds.memory_critical,
        "disk_warning" => &mut thresholds.disk_warning,
        "disk_critical" => &mut thresholds.disk_critical,
        "load_warning" => &mut thresholds.load_warning,
        "load_critical" => &mut thresholds.load_critical,
        "swap_warning" => &mut thresholds.swap_warning,
        "swap_critical" => &mut thresholds.swap_critical,
        other => anyhow::bail!("unknown threshold '{}'", other),
    };
    *slot = value;
    Ok(())
}
