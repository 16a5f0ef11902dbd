//! Troubleshooting probes and scripted fixes.

use crate::error::Result;
use crate::install::PHP_VERSIONS;
use crate::monitor;
use crate::shell;
use crate::systemd::{self, ServiceAction, UnitState};

/// Known nginx failure fingerprints and what to do about them.
pub static ERROR_GUIDES: &[(&str, &str)] = &[
    ("unknown directive", "Check for typos in your Nginx configuration."),
    ("duplicate", "Remove duplicate server_name or listen directives."),
    (
        "no such file",
        "Check that all included files and SSL certificates exist.",
    ),
    (
        "permission denied",
        "Check file permissions on configuration and SSL files.",
    ),
    (
        "address already in use",
        "Another process holds the port. See `forge diagnostics ports`.",
    ),
    (
        "host not found in upstream",
        "An upstream hostname does not resolve. Check proxy_pass targets.",
    ),
];

#[derive(Debug, Clone)]
pub struct NginxTestReport {
    pub ok: bool,
    pub output: String,
    pub suggestions: Vec<String>,
}

/// Suggested fixes for an `nginx -t` failure, from known fingerprints.
pub fn nginx_suggestions(output: &str) -> Vec<String> {
    let lowered = output.to_lowercase();
    ERROR_GUIDES
        .iter()
        .filter(|(needle, _)| lowered.contains(needle))
        .map(|(_, advice)| advice.to_string())
        .collect()
}

pub async fn test_nginx() -> Result<NginxTestReport> {
    let out = shell::run_sudo("nginx", &["-t"]).await?;
    // nginx -t writes its verdict to stderr
    let output = if out.stderr.is_empty() {
        out.stdout.clone()
    } else {
        out.stderr.clone()
    };
    Ok(NginxTestReport {
        ok: out.success(),
        suggestions: if out.success() {
            Vec::new()
        } else {
            nginx_suggestions(&output)
        },
        output,
    })
}

#[derive(Debug, Clone)]
pub struct PhpFpmStatus {
    pub version: String,
    pub state: UnitState,
    pub socket: String,
    pub socket_exists: bool,
}

/// Per-version PHP-FPM service and socket status, for installed versions.
pub async fn check_php_fpm() -> Vec<PhpFpmStatus> {
    let mut statuses = Vec::new();
    for version in PHP_VERSIONS {
        let unit = format!("php{}-fpm", version);
        if !systemd::unit_exists(&unit).await {
            continue;
        }
        let socket = format!("/var/run/php/php{}-fpm.sock", version);
        statuses.push(PhpFpmStatus {
            version: version.to_string(),
            state: systemd::unit_state(&unit).await,
            socket_exists: std::path::Path::new(&socket).exists(),
            socket,
        });
    }
    statuses
}

/// Does the www-data user exist (PHP-FPM and nginx workers run as it)?
pub async fn www_data_exists() -> bool {
    matches!(shell::run("id", &["www-data"]).await, Ok(out) if out.success())
}

#[derive(Debug, Clone)]
pub struct PermissionReport {
    pub path: String,
    pub owner: Option<String>,
    pub mode: Option<String>,
    pub warning: Option<String>,
}

/// Flag modes outside the usual web-serving sets.
pub fn permission_warning(is_dir: bool, mode: &str) -> Option<String> {
    let expected: &[&str] = if is_dir {
        &["755", "775", "750"]
    } else {
        &["644", "664", "640"]
    };
    if expected.contains(&mode) {
        None
    } else {
        Some(format!(
            "Unusual {} permissions '{}'. Recommended: {}",
            if is_dir { "directory" } else { "file" },
            mode,
            expected.join(" or ")
        ))
    }
}

pub async fn check_permissions(path: &str) -> Result<PermissionReport> {
    let is_dir = std::path::Path::new(path).is_dir();
    let owner = shell::output_of("stat", &["-c", "%U:%G", path]).await;
    let mode = shell::output_of("stat", &["-c", "%a", path]).await;
    let warning = mode
        .as_deref()
        .and_then(|m| permission_warning(is_dir, m.trim()));
    Ok(PermissionReport {
        path: path.to_string(),
        owner,
        mode,
        warning,
    })
}

/// Who holds the ports a web server cares about.
pub async fn well_known_ports() -> Vec<(u16, &'static str, Option<String>)> {
    static PORTS: &[(u16, &'static str)] = &[
        (22, "SSH"),
        (80, "HTTP"),
        (443, "HTTPS"),
        (3306, "MySQL/MariaDB"),
        (5432, "PostgreSQL"),
        (6379, "Redis"),
        (11211, "Memcached"),
    ];
    let listening = monitor::listening_ports().await.unwrap_or_default();
    PORTS
        .iter()
        .map(|&(port, label)| {
            let holder = listening
                .iter()
                .find(|p| p.port == port)
                .map(|p| p.process.clone().unwrap_or_else(|| "unknown".to_string()));
            (port, label, holder)
        })
        .collect()
}

/// A detected problem with an optional scripted fix.
#[derive(Debug, Clone)]
pub struct Issue {
    pub description: String,
    pub fix: Option<Fix>,
}

#[derive(Debug, Clone)]
pub enum Fix {
    RestartUnit(String),
    Command(String, String),
}

impl Fix {
    pub fn describe(&self) -> String {
        match self {
            Fix::RestartUnit(unit) => format!("restart {}", unit),
            Fix::Command(description, _) => description.clone(),
        }
    }
}

/// Scripted checks for the failure modes this tool sees most.
pub async fn find_common_issues() -> Vec<Issue> {
    let mut issues = Vec::new();

    // Installed-but-down web server
    if shell::command_exists("nginx") && systemd::unit_state("nginx").await != UnitState::Active {
        issues.push(Issue {
            description: "nginx is installed but not running".to_string(),
            fix: Some(Fix::RestartUnit("nginx".to_string())),
        });
    }

    // Running PHP-FPM without its socket
    for fpm in check_php_fpm().await {
        if fpm.state == UnitState::Active && !fpm.socket_exists {
            issues.push(Issue {
                description: format!(
                    "php{}-fpm is running but {} is missing",
                    fpm.version, fpm.socket
                ),
                fix: Some(Fix::RestartUnit(format!("php{}-fpm", fpm.version))),
            });
        }
    }

    // Failed catalogue units
    for service in systemd::installed_services().await {
        if service.state == UnitState::Failed {
            issues.push(Issue {
                description: format!("{} ({}) is in a failed state", service.label, service.unit),
                fix: Some(Fix::RestartUnit(service.unit.to_string())),
            });
        }
    }

    if !www_data_exists().await {
        issues.push(Issue {
            description: "www-data user does not exist".to_string(),
            fix: None,
        });
    }

    issues
}

/// Apply an issue's fix. Returns what was done.
pub async fn apply_fix(fix: &Fix) -> Result<String> {
    match fix {
        Fix::RestartUnit(unit) => {
            systemd::apply(unit, ServiceAction::Restart).await?;
            Ok(format!("restarted {}", unit))
        }
        Fix::Command(description, command) => {
            shell::run_shell(command).await?.into_checked(command)?;
            Ok(description.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nginx_suggestions_match_fingerprints() {
        let output = "nginx: [emerg] unknown directive \"serverr_name\" in /etc/nginx/sites-enabled/foo:3";
        let suggestions = nginx_suggestions(output);
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].contains("typos"));
    }

    #[test]
    fn nginx_suggestions_stack_for_multiple_problems() {
        let output = "duplicate listen options; open() failed: no such file";
        assert_eq!(nginx_suggestions(output).len(), 2);
    }

    #[test]
    fn clean_output_has_no_suggestions() {
        assert!(nginx_suggestions("syntax is ok\ntest is successful").is_empty());
    }

    #[test]
    fn permission_warnings_only_for_unusual_modes() {
        assert!(permission_warning(true, "755").is_none());
        assert!(permission_warning(false, "644").is_none());
        assert!(permission_warning(true, "777").is_some());
        assert!(permission_warning(false, "600").is_some());
    }
}
