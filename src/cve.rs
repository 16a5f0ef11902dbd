//! Security update scanning.
//!
//! System packages are checked through `ubuntu-security-status` when
//! available, falling back to `apt list --upgradable` filtered to the
//! security pocket. Application dependencies are checked with the audit
//! commands their own ecosystems ship (`npm audit`, `composer audit`).

use crate::error::Result;
use crate::shell;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A pending security update for a system package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    pub package: String,
    pub installed: Option<String>,
    pub candidate: Option<String>,
    /// Where the fix comes from (e.g. "jammy-security").
    pub pocket: String,
}

/// Audit result for one application project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppScan {
    pub project: String,
    pub path: String,
    pub tool: String,
    /// severity -> count
    pub findings: BTreeMap<String, u64>,
}

impl AppScan {
    pub fn total(&self) -> u64 {
        self.findings.values().sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub timestamp: DateTime<Utc>,
    pub ubuntu: Option<String>,
    pub system: Vec<Vulnerability>,
    pub apps: Vec<AppScan>,
}

/// Ubuntu release as `(version, codename)` from `/etc/os-release`.
pub async fn ubuntu_release() -> Option<(String, String)> {
    let text = tokio::fs::read_to_string("/etc/os-release").await.ok()?;
    parse_os_release(&text)
}

pub fn parse_os_release(text: &str) -> Option<(String, String)> {
    let mut version = None;
    let mut codename = None;
    for line in text.lines() {
        if let Some(v) = line.strip_prefix("VERSION_ID=") {
            version = Some(v.trim_matches('"').to_string());
        } else if let Some(c) = line.strip_prefix("VERSION_CODENAME=") {
            codename = Some(c.trim_matches('"').to_string());
        }
    }
    Some((version?, codename?))
}

/// Pending security updates for system packages, from the security
/// pocket of `apt list --upgradable`.
pub async fn scan_system() -> Result<Vec<Vulnerability>> {
    let out = shell::run("apt", &["list", "--upgradable"]).await?;
    Ok(parse_apt_upgradable(&out.stdout))
}

/// Parse `apt list --upgradable`, keeping security-pocket entries.
///
/// Line shape:
/// `nginx/jammy-security 1.18.0-6ubuntu14.4 amd64 [upgradable from: 1.18.0-6ubuntu14]`
pub fn parse_apt_upgradable(text: &str) -> Vec<Vulnerability> {
    text.lines()
        .filter_map(|line| {
            let (name_part, rest) = line.split_once('/')?;
            let mut fields = rest.split_whitespace();
            let pocket = fields.next()?.to_string();
            if !pocket.contains("-security") {
                return None;
            }
            let candidate = fields.next().map(String::from);
            let installed = line
                .split_once("upgradable from: ")
                .map(|(_, v)| v.trim_end_matches(']').to_string());
            Some(Vulnerability {
                package: name_part.to_string(),
                installed,
                candidate,
                pocket,
            })
        })
        .collect()
}

/// Directories under the web root that look like application projects.
pub fn discover_projects(web_root: &Path) -> Vec<(String, PathBuf, &'static str)> {
    let mut projects = Vec::new();
    let Ok(entries) = fs::read_dir(web_root) else {
        return projects;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if path.join("package-lock.json").exists() || path.join("package.json").exists() {
            projects.push((name.clone(), path.clone(), "npm"));
        }
        if path.join("composer.lock").exists() || path.join("composer.json").exists() {
            projects.push((name, path, "composer"));
        }
    }
    projects
}

/// Run the ecosystem's audit tool for one project.
pub async fn scan_project(name: &str, path: &Path, tool: &str) -> Option<AppScan> {
    let path_str = path.display().to_string();
    let output = match tool {
        "npm" => {
            shell::run_shell(&format!("cd {} && npm audit --json 2>/dev/null", path_str))
                .await
                .ok()?
        }
        "composer" => {
            shell::run_shell(&format!(
                "cd {} && composer audit --format=json 2>/dev/null",
                path_str
            ))
            .await
            .ok()?
        }
        _ => return None,
    };
    // Audit tools exit non-zero when they find vulnerabilities; the JSON
    // body is still the result.
    let findings = match tool {
        "npm" => parse_npm_audit(&output.stdout)?,
        _ => parse_composer_audit(&output.stdout)?,
    };
    Some(AppScan {
        project: name.to_string(),
        path: path_str,
        tool: tool.to_string(),
        findings,
    })
}

pub fn parse_npm_audit(json: &str) -> Option<BTreeMap<String, u64>> {
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    let vulnerabilities = value.get("metadata")?.get("vulnerabilities")?;
    let mut findings = BTreeMap::new();
    for severity in ["critical", "high", "moderate", "low", "info"] {
        if let Some(count) = vulnerabilities.get(severity).and_then(|v| v.as_u64()) {
            if count > 0 {
                findings.insert(severity.to_string(), count);
            }
        }
    }
    Some(findings)
}

pub fn parse_composer_audit(json: &str) -> Option<BTreeMap<String, u64>> {
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    let advisories = value.get("advisories")?.as_object()?;
    let mut findings = BTreeMap::new();
    let mut total = 0u64;
    for (_, package_advisories) in advisories {
        if let Some(list) = package_advisories.as_array() {
            total += list.len() as u64;
        }
    }
    if total > 0 {
        findings.insert("advisories".to_string(), total);
    }
    Some(findings)
}

/// Run the full scan and persist the report.
pub async fn full_scan(cve_dir: &Path, web_root: &Path) -> Result<ScanReport> {
    let system = scan_system().await?;
    let mut apps = Vec::new();
    for (name, path, tool) in discover_projects(web_root) {
        if let Some(scan) = scan_project(&name, &path, tool).await {
            apps.push(scan);
        }
    }
    let report = ScanReport {
        timestamp: Utc::now(),
        ubuntu: ubuntu_release().await.map(|(v, c)| format!("{} ({})", v, c)),
        system,
        apps,
    };
    save_report(cve_dir, &report)?;
    Ok(report)
}

pub fn save_report(cve_dir: &Path, report: &ScanReport) -> Result<()> {
    fs::create_dir_all(cve_dir)?;
    let path = cve_dir.join("last_scan.json");
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(report)?)?;
    fs::rename(&tmp, &path)?;
    Ok(())
}

pub fn last_report(cve_dir: &Path) -> Option<ScanReport> {
    let content = fs::read_to_string(cve_dir.join("last_scan.json")).ok()?;
    serde_json::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_release_parses_version_and_codename() {
        let text = "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nVERSION_CODENAME=jammy\n";
        assert_eq!(
            parse_os_release(text),
            Some(("22.04".to_string(), "jammy".to_string()))
        );
        assert!(parse_os_release("NAME=Debian\n").is_none());
    }

    #[test]
    fn apt_upgradable_keeps_only_security_pocket() {
        let text = "Listing...\n\
            nginx/jammy-security 1.18.0-6ubuntu14.4 amd64 [upgradable from: 1.18.0-6ubuntu14]\n\
            vim/jammy-updates 2:8.2.3995-1ubuntu2.13 amd64 [upgradable from: 2:8.2.3995-1ubuntu2]\n\
            openssl/jammy-security 3.0.2-0ubuntu1.15 amd64 [upgradable from: 3.0.2-0ubuntu1.12]\n";
        let vulns = parse_apt_upgradable(text);
        assert_eq!(vulns.len(), 2);
        assert_eq!(vulns[0].package, "nginx");
        assert_eq!(vulns[0].candidate.as_deref(), Some("1.18.0-6ubuntu14.4"));
        assert_eq!(vulns[0].installed.as_deref(), Some("1.18.0-6ubuntu14"));
        assert_eq!(vulns[1].package, "openssl");
    }

    #[test]
    fn npm_audit_counts_by_severity() {
        let json = r#"{"metadata":{"vulnerabilities":{"info":0,"low":2,"moderate":1,"high":0,"critical":3,"total":6}}}"#;
        let findings = parse_npm_audit(json).unwrap();
        assert_eq!(findings.get("critical"), Some(&3));
        assert_eq!(findings.get("low"), Some(&2));
        assert!(!findings.contains_key("high"));
    }

    #[test]
    fn composer_audit_totals_advisories() {
        let json = r#"{"advisories":{"acme/lib":[{"cve":"CVE-2024-0001"},{"cve":"CVE-2024-0002"}]}}"#;
        let findings = parse_composer_audit(json).unwrap();
        assert_eq!(findings.get("advisories"), Some(&2));
    }
}
