//! Installed-software detection.
//!
//! Each detector probes one tool: is the binary present, what version
//! does it report, and a detail worth showing (running state, extension
//! count). Probes never fail the caller — an undetectable tool simply
//! reports as not installed.

use crate::shell;
use crate::systemd::{self, UnitState};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct SoftwareStatus {
    pub name: &'static str,
    pub installed: bool,
    pub version: Option<String>,
    pub details: Option<String>,
}

impl SoftwareStatus {
    fn missing(name: &'static str) -> Self {
        Self {
            name,
            installed: false,
            version: None,
            details: None,
        }
    }

    fn found(name: &'static str, version: Option<String>, details: Option<String>) -> Self {
        Self {
            name,
            installed: true,
            version,
            details,
        }
    }
}

fn semver_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+\.\d+(?:\.\d+)?)").expect("static regex"))
}

/// First version-looking token in a tool's output.
pub fn extract_version(text: &str) -> Option<String> {
    semver_regex()
        .captures(text)
        .map(|c| c[1].to_string())
}

/// Deadline for every probe: a hung tool must not stall the whole
/// status screen.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

async fn probe_output(program: &str, args: &[&str]) -> Option<String> {
    match shell::run_with_timeout(program, args, PROBE_TIMEOUT).await {
        Ok(out) if out.success() => Some(out.stdout),
        _ => None,
    }
}

async fn running_detail(unit: &str) -> String {
    match systemd::unit_state(unit).await {
        UnitState::Active => "Running".to_string(),
        _ => "Stopped".to_string(),
    }
}

pub async fn detect_nginx() -> SoftwareStatus {
    if !shell::command_exists("nginx") {
        return SoftwareStatus::missing("Nginx");
    }
    // nginx -v writes the version banner to stderr
    let version = match shell::run("nginx", &["-v"]).await {
        Ok(out) => extract_version(&out.stderr),
        Err(_) => None,
    };
    SoftwareStatus::found("Nginx", version, Some(running_detail("nginx").await))
}

pub async fn detect_php() -> SoftwareStatus {
    if !shell::command_exists("php") {
        return SoftwareStatus::missing("PHP");
    }
    let version = probe_output("php", &["-v"])
        .await
        .and_then(|o| extract_version(&o));
    let details = probe_output("php", &["-m"])
        .await
        .map(|o| format!("{} extensions", o.lines().filter(|l| !l.is_empty() && !l.starts_with('[')).count()));
    SoftwareStatus::found("PHP", version, details)
}

pub async fn detect_node() -> SoftwareStatus {
    if !shell::command_exists("node") {
        return SoftwareStatus::missing("Node.js");
    }
    let version = probe_output("node", &["-v"])
        .await
        .map(|o| o.trim_start_matches('v').to_string());
    let details = if std::env::var_os("NVM_DIR").is_some() {
        "via NVM"
    } else {
        "System"
    };
    SoftwareStatus::found("Node.js", version, Some(details.to_string()))
}

pub async fn detect_pm2() -> SoftwareStatus {
    if !shell::command_exists("pm2") {
        return SoftwareStatus::missing("PM2");
    }
    let version = probe_output("pm2", &["--version"]).await;
    let details = probe_output("pm2", &["jlist"])
        .await
        .and_then(|o| serde_json::from_str::<serde_json::Value>(&o).ok())
        .and_then(|v| v.as_array().map(|a| format!("{} processes", a.len())));
    SoftwareStatus::found("PM2", version, details)
}

pub async fn detect_redis() -> SoftwareStatus {
    if !shell::command_exists("redis-cli") {
        return SoftwareStatus::missing("Redis");
    }
    let version = probe_output("redis-cli", &["--version"])
        .await
        .and_then(|o| extract_version(&o));
    // Ubuntu names the unit redis-server; some installs use plain redis
    let detail = match systemd::unit_state("redis-server").await {
        UnitState::Active => "Running".to_string(),
        _ => running_detail("redis").await,
    };
    SoftwareStatus::found("Redis", version, Some(detail))
}

pub async fn detect_certbot() -> SoftwareStatus {
    if !shell::command_exists("certbot") {
        return SoftwareStatus::missing("Certbot");
    }
    let version = probe_output("certbot", &["--version"])
        .await
        .and_then(|o| extract_version(&o));
    SoftwareStatus::found("Certbot", version, Some("Let's Encrypt".to_string()))
}

pub async fn detect_mysql() -> SoftwareStatus {
    if !shell::command_exists("mysql") {
        return SoftwareStatus::missing("MySQL");
    }
    let output = probe_output("mysql", &["--version"]).await.unwrap_or_default();
    let name = if output.contains("MariaDB") {
        "MariaDB"
    } else {
        "MySQL"
    };
    SoftwareStatus::found(name, extract_version(&output), None)
}

pub async fn detect_postgresql() -> SoftwareStatus {
    if !shell::command_exists("psql") {
        return SoftwareStatus::missing("PostgreSQL");
    }
    let version = probe_output("psql", &["--version"])
        .await
        .and_then(|o| extract_version(&o));
    SoftwareStatus::found("PostgreSQL", version, None)
}

pub async fn detect_composer() -> SoftwareStatus {
    if !shell::command_exists("composer") {
        return SoftwareStatus::missing("Composer");
    }
    let version = probe_output("composer", &["--version"])
        .await
        .and_then(|o| extract_version(&o));
    SoftwareStatus::found("Composer", version, None)
}

pub async fn detect_docker() -> SoftwareStatus {
    if !shell::command_exists("docker") {
        return SoftwareStatus::missing("Docker");
    }
    let version = probe_output("docker", &["--version"])
        .await
        .and_then(|o| extract_version(&o));
    SoftwareStatus::found("Docker", version, Some(running_detail("docker").await))
}

/// Probe the full software set, in catalogue order.
pub async fn system_status() -> Vec<SoftwareStatus> {
    vec![
        detect_nginx().await,
        detect_php().await,
        detect_node().await,
        detect_pm2().await,
        detect_redis().await,
        detect_certbot().await,
        detect_mysql().await,
        detect_postgresql().await,
        detect_composer().await,
        detect_docker().await,
    ]
}

/// Whether a specific PHP version's package is installed (dpkg query).
pub async fn php_version_installed(version: &str) -> bool {
    match shell::run("dpkg-query", &["-W", "-f=${Status}", &format!("php{}", version)]).await {
        Ok(out) => out.success() && out.stdout.contains("install ok installed"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_extraction_handles_tool_banners() {
        assert_eq!(
            extract_version("nginx version: nginx/1.24.0 (Ubuntu)"),
            Some("1.24.0".to_string())
        );
        assert_eq!(
            extract_version("PHP 8.3.6 (cli) (built: Apr 11 2024)"),
            Some("8.3.6".to_string())
        );
        assert_eq!(
            extract_version("psql (PostgreSQL) 16.2"),
            Some("16.2".to_string())
        );
        assert_eq!(extract_version("no digits here"), None);
    }
}
