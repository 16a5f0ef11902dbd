//! Systemd service management.
//!
//! A curated catalogue of the units a web server typically runs, grouped
//! by category, plus thin wrappers over `systemctl` for state queries and
//! lifecycle actions. Units outside the catalogue can still be found via
//! [`search_units`] but lifecycle actions are restricted to known units
//! so a typo can't stop an arbitrary unit.

use crate::error::{Error, Result};
use crate::monitor::format_bytes;
use crate::shell;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
pub struct ServiceDef {
    pub label: &'static str,
    pub unit: &'static str,
    /// Critical services get a confirmation warning before stop and are
    /// surfaced prominently when down.
    pub critical: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub key: &'static str,
    pub label: &'static str,
    pub services: &'static [ServiceDef],
}

macro_rules! svc {
    ($label:expr, $unit:expr, $critical:expr) => {
        ServiceDef {
            label: $label,
            unit: $unit,
            critical: $critical,
        }
    };
}

pub static CATALOGUE: &[Category] = &[
    Category {
        key: "web",
        label: "Web Servers",
        services: &[
            svc!("Nginx", "nginx", true),
            svc!("Apache2", "apache2", true),
            svc!("Caddy", "caddy", true),
        ],
    },
    Category {
        key: "php",
        label: "PHP-FPM",
        services: &[
            svc!("PHP 8.5-FPM", "php8.5-fpm", true),
            svc!("PHP 8.4-FPM", "php8.4-fpm", true),
            svc!("PHP 8.3-FPM", "php8.3-fpm", true),
            svc!("PHP 8.2-FPM", "php8.2-fpm", true),
            svc!("PHP 8.1-FPM", "php8.1-fpm", true),
            svc!("PHP 8.0-FPM", "php8.0-fpm", false),
            svc!("PHP 7.4-FPM", "php7.4-fpm", false),
        ],
    },
    Category {
        key: "database",
        label: "Databases",
        services: &[
            svc!("MySQL", "mysql", true),
            svc!("MariaDB", "mariadb", true),
            svc!("PostgreSQL", "postgresql", true),
            svc!("MongoDB", "mongod", false),
        ],
    },
    Category {
        key: "cache",
        label: "Caching",
        services: &[
            svc!("Redis", "redis-server", true),
            svc!("Memcached", "memcached", false),
        ],
    },
    Category {
        key: "queue",
        label: "Queue & Workers",
        services: &[
            svc!("Supervisor", "supervisor", false),
            svc!("RabbitMQ", "rabbitmq-server", false),
            svc!("Beanstalkd", "beanstalkd", false),
        ],
    },
    Category {
        key: "mail",
        label: "Mail",
        services: &[
            svc!("Postfix", "postfix", false),
            svc!("Dovecot", "dovecot", false),
        ],
    },
    Category {
        key: "monitoring",
        label: "Monitoring",
        services: &[
            svc!("Prometheus", "prometheus", false),
            svc!("Grafana", "grafana-server", false),
            svc!("Node Exporter", "node_exporter", false),
        ],
    },
    Category {
        key: "security",
        label: "Security",
        services: &[
            svc!("UFW (Firewall)", "ufw", true),
            svc!("Fail2ban", "fail2ban", true),
            svc!("ClamAV", "clamav-daemon", false),
            svc!("Freshclam", "clamav-freshclam", false),
        ],
    },
    Category {
        key: "ssl",
        label: "SSL/TLS",
        services: &[svc!("Certbot Timer", "certbot.timer", false)],
    },
    Category {
        key: "system",
        label: "System",
        services: &[
            svc!("Cron", "cron", true),
            svc!("SSH", "ssh", true),
            svc!("Rsyslog", "rsyslog", false),
            svc!("Systemd Timesyncd", "systemd-timesyncd", false),
        ],
    },
    Category {
        key: "docker",
        label: "Containers",
        services: &[
            svc!("Docker", "docker", false),
            svc!("Containerd", "containerd", false),
        ],
    },
];

/// Current activity of a unit as reported by `systemctl is-active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Active,
    Inactive,
    Failed,
    Unknown,
}

impl UnitState {
    pub fn parse(text: &str) -> UnitState {
        match text.trim() {
            "active" => UnitState::Active,
            "inactive" => UnitState::Inactive,
            "failed" => UnitState::Failed,
            _ => UnitState::Unknown,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            UnitState::Active => "●",
            UnitState::Inactive => "○",
            UnitState::Failed => "✗",
            UnitState::Unknown => "?",
        }
    }
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitState::Active => write!(f, "running"),
            UnitState::Inactive => write!(f, "stopped"),
            UnitState::Failed => write!(f, "failed"),
            UnitState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Lifecycle operations forwarded to `systemctl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Reload,
    Enable,
    Disable,
}

impl ServiceAction {
    pub fn verb(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
            ServiceAction::Reload => "reload",
            ServiceAction::Enable => "enable",
            ServiceAction::Disable => "disable",
        }
    }

    /// Stop needs a confirmation on critical services.
    pub fn is_destructive(&self) -> bool {
        matches!(self, ServiceAction::Stop | ServiceAction::Disable)
    }
}

/// Catalogue service plus its live state.
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub label: &'static str,
    pub unit: &'static str,
    pub category: &'static str,
    pub critical: bool,
    pub state: UnitState,
    pub enabled: bool,
    pub substate: Option<String>,
    pub memory: Option<String>,
    pub uptime: Option<String>,
}

/// Look a unit up in the catalogue by unit name or label.
pub fn find_service(name: &str) -> Option<&'static ServiceDef> {
    let lowered = name.to_lowercase();
    CATALOGUE.iter().flat_map(|c| c.services).find(|s| {
        s.unit == name || s.label.to_lowercase() == lowered
    })
}

pub fn category_of(unit: &str) -> Option<&'static Category> {
    CATALOGUE
        .iter()
        .find(|c| c.services.iter().any(|s| s.unit == unit))
}

pub async fn unit_exists(unit: &str) -> bool {
    let file = if unit.contains('.') {
        unit.to_string()
    } else {
        format!("{}.service", unit)
    };
    match shell::run("systemctl", &["list-unit-files", &file, "--no-legend"]).await {
        Ok(out) => out.success() && !out.stdout.trim().is_empty(),
        Err(_) => false,
    }
}

pub async fn unit_state(unit: &str) -> UnitState {
    match shell::run("systemctl", &["is-active", unit]).await {
        Ok(out) => UnitState::parse(&out.stdout),
        Err(_) => UnitState::Unknown,
    }
}

pub async fn is_enabled(unit: &str) -> bool {
    matches!(
        shell::run("systemctl", &["is-enabled", unit]).await,
        Ok(out) if out.stdout.trim() == "enabled"
    )
}

async fn show_property(unit: &str, property: &str) -> Option<String> {
    let value = shell::output_of(
        "systemctl",
        &["show", unit, &format!("--property={}", property), "--value"],
    )
    .await?;
    let value = value.trim().to_string();
    if value.is_empty() || value == "[not set]" {
        None
    } else {
        Some(value)
    }
}

/// Resident memory of the unit, humanized.
pub async fn memory(unit: &str) -> Option<String> {
    let raw = show_property(unit, "MemoryCurrent").await?;
    let bytes: u64 = raw.parse().ok()?;
    Some(format_bytes(bytes))
}

/// How long the unit has been active, from `ActiveEnterTimestamp`.
pub async fn uptime(unit: &str) -> Option<String> {
    let raw = show_property(unit, "ActiveEnterTimestamp").await?;
    parse_uptime(&raw, chrono::Utc::now())
}

pub async fn substate(unit: &str) -> Option<String> {
    show_property(unit, "SubState").await
}

/// Parse systemd's "Wed 2024-01-31 10:30:45 UTC" into a "3d 4h" age.
/// Only UTC timestamps are interpreted; other zones yield None rather
/// than a wrong age.
pub fn parse_uptime(timestamp: &str, now: chrono::DateTime<chrono::Utc>) -> Option<String> {
    let parts: Vec<&str> = timestamp.split_whitespace().collect();
    if parts.len() < 4 || parts[3] != "UTC" {
        return None;
    }
    let datetime = chrono::NaiveDateTime::parse_from_str(
        &format!("{} {}", parts[1], parts[2]),
        "%Y-%m-%d %H:%M:%S",
    )
    .ok()?;
    let start = datetime.and_utc();
    let delta = now.signed_duration_since(start);
    if delta.num_seconds() < 0 {
        return None;
    }

    let days = delta.num_days();
    let hours = delta.num_hours() % 24;
    let minutes = delta.num_minutes() % 60;
    Some(if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    })
}

/// All catalogue services whose unit exists on this host, with live state.
pub async fn installed_services() -> Vec<ServiceStatus> {
    let mut result = Vec::new();
    for category in CATALOGUE {
        for def in category.services {
            if !unit_exists(def.unit).await {
                continue;
            }
            let state = unit_state(def.unit).await;
            let (memory, uptime) = if state == UnitState::Active {
                (memory(def.unit).await, uptime(def.unit).await)
            } else {
                (None, None)
            };
            result.push(ServiceStatus {
                label: def.label,
                unit: def.unit,
                category: category.key,
                critical: def.critical,
                state,
                enabled: is_enabled(def.unit).await,
                substate: substate(def.unit).await,
                memory,
                uptime,
            });
        }
    }
    result
}

/// Apply a lifecycle action to a catalogue unit.
pub async fn apply(unit: &str, action: ServiceAction) -> Result<()> {
    if find_service(unit).is_none() {
        return Err(Error::UnknownService(unit.to_string()));
    }
    let out = shell::run_sudo("systemctl", &[action.verb(), unit]).await?;
    if out.success() {
        Ok(())
    } else {
        Err(Error::ServiceActionFailed {
            service: unit.to_string(),
            action: action.verb().to_string(),
            stderr: if out.stderr.is_empty() {
                out.stdout
            } else {
                out.stderr
            },
        })
    }
}

/// Restart every installed unit in a category, returning per-unit results.
pub async fn restart_category(category_key: &str) -> Vec<(String, Result<()>)> {
    let mut results = Vec::new();
    let Some(category) = CATALOGUE.iter().find(|c| c.key == category_key) else {
        return results;
    };
    for def in category.services {
        if unit_exists(def.unit).await && unit_state(def.unit).await == UnitState::Active {
            results.push((def.unit.to_string(), apply(def.unit, ServiceAction::Restart).await));
        }
    }
    results
}

/// Free-form unit search over `systemctl list-units`.
pub async fn search_units(pattern: &str) -> Result<Vec<(String, String)>> {
    let out = shell::run(
        "systemctl",
        &["list-units", "--type=service", "--all", "--no-legend", "--plain"],
    )
    .await?;
    let needle = pattern.to_lowercase();
    Ok(out
        .stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let unit = parts.next()?.to_string();
            let state = parts.nth(2).unwrap_or("unknown").to_string();
            if unit.to_lowercase().contains(&needle) {
                Some((unit, state))
            } else {
                None
            }
        })
        .collect())
}

/// Recent journal lines for a unit.
pub async fn journal(unit: &str, lines: usize) -> Result<String> {
    let out = shell::run_sudo(
        "journalctl",
        &["-u", unit, "-n", &lines.to_string(), "--no-pager"],
    )
    .await?;
    Ok(out.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_state_parses_systemctl_output() {
        assert_eq!(UnitState::parse("active\n"), UnitState::Active);
        assert_eq!(UnitState::parse("inactive"), UnitState::Inactive);
        assert_eq!(UnitState::parse("failed"), UnitState::Failed);
        assert_eq!(UnitState::parse("activating"), UnitState::Unknown);
    }

    #[test]
    fn catalogue_lookup_by_unit_and_label() {
        assert!(find_service("nginx").is_some());
        assert!(find_service("Redis").is_some());
        assert!(find_service("not-a-service").is_none());
        assert_eq!(category_of("php8.3-fpm").unwrap().key, "php");
    }

    #[test]
    fn uptime_formats_by_magnitude() {
        let now = chrono::DateTime::parse_from_rfc3339("2024-02-02T12:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert_eq!(
            parse_uptime("Wed 2024-01-31 10:30:00 UTC", now).unwrap(),
            "2d 1h"
        );
        assert_eq!(
            parse_uptime("Fri 2024-02-02 09:15:00 UTC", now).unwrap(),
            "2h 45m"
        );
        assert_eq!(
            parse_uptime("Fri 2024-02-02 11:48:00 UTC", now).unwrap(),
            "12m"
        );
    }

    #[test]
    fn uptime_rejects_non_utc_and_garbage() {
        let now = chrono::Utc::now();
        assert!(parse_uptime("Wed 2024-01-31 10:30:00 CET", now).is_none());
        assert!(parse_uptime("", now).is_none());
        assert!(parse_uptime("n/a", now).is_none());
    }
}
