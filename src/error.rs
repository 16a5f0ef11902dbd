use miette::Diagnostic;
use std::io;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Command not found: {0}")]
    #[diagnostic(
        code(forge::shell::not_found),
        help("Install it from `forge install` or check your PATH")
    )]
    CommandNotFound(String),

    #[error("`{command}` exited with code {code}: {stderr}")]
    #[diagnostic(code(forge::shell::failed))]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Site not found: {0}")]
    #[diagnostic(
        code(forge::site::not_found),
        help("List configured sites with `forge sites list`")
    )]
    SiteNotFound(String),

    #[error("Site '{0}' already exists")]
    #[diagnostic(
        code(forge::site::exists),
        help("Delete it first with `forge sites delete {0} --yes`")
    )]
    SiteExists(String),

    #[error("Invalid domain name: {0}")]
    #[diagnostic(code(forge::site::invalid_domain))]
    InvalidDomain(String),

    #[error("Nginx configuration test failed:\n{0}")]
    #[diagnostic(
        code(forge::nginx::test_failed),
        help("Run `forge diagnostics nginx` for parsed output and suggested fixes")
    )]
    NginxTestFailed(String),

    #[error("Unknown template variable '{{{{{0}}}}}'")]
    #[diagnostic(code(forge::nginx::template))]
    TemplateVariable(String),

    #[error("Certbot is not installed")]
    #[diagnostic(
        code(forge::ssl::certbot_missing),
        help("Install it with `forge install certbot`")
    )]
    CertbotMissing,

    #[error("No certificate found for '{0}'")]
    #[diagnostic(
        code(forge::ssl::not_found),
        help("Provision one with `forge ssl provision {0}`")
    )]
    CertificateNotFound(String),

    #[error("Unknown service: {0}")]
    #[diagnostic(
        code(forge::service::unknown),
        help("List known services with `forge service status`")
    )]
    UnknownService(String),

    #[error("Failed to {action} '{service}': {stderr}")]
    #[diagnostic(
        code(forge::service::action_failed),
        help("Check the unit's journal: journalctl -u {service} -n 50")
    )]
    ServiceActionFailed {
        service: String,
        action: String,
        stderr: String,
    },

    #[error("Log file not found: {0}")]
    #[diagnostic(code(forge::logs::not_found))]
    LogNotFound(String),

    #[error("Unknown package: {0}")]
    #[diagnostic(
        code(forge::install::unknown_package),
        help("List installable packages with `forge install --list`")
    )]
    UnknownPackage(String),

    #[error("Installing {package} failed at `{step}`: {stderr}")]
    #[diagnostic(code(forge::install::failed))]
    InstallFailed {
        package: String,
        step: String,
        stderr: String,
    },

    #[error("Invalid cron schedule: {0}")]
    #[diagnostic(
        code(forge::cron::invalid_schedule),
        help("Schedules have five fields: minute hour day-of-month month day-of-week")
    )]
    InvalidSchedule(String),

    #[error("Refusing without confirmation: {0}")]
    #[diagnostic(code(forge::confirm), help("Re-run with --yes to proceed"))]
    NeedsConfirmation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::CommandNotFound(cmd) => match cmd.as_str() {
                "nginx" | "certbot" | "redis-cli" | "psql" | "mysql" | "composer" | "node" => {
                    Some(format!("Install it with: forge install {}", install_alias(cmd)))
                }
                _ => Some(format!("'{}' is not on PATH. Is it installed?", cmd)),
            },
            Error::CommandFailed { command, .. } if command.starts_with("sudo") => Some(
                "The command needed elevated privileges. Check that your user can sudo."
                    .to_string(),
            ),
            Error::SiteNotFound(domain) => Some(format!(
                "Check `forge sites list`, or create it with: forge sites create {} --kind static",
                domain
            )),
            Error::NginxTestFailed(_) => Some(
                "The broken vhost was not enabled. Fix the config under \
                 /etc/nginx/sites-available and re-run `sudo nginx -t`."
                    .to_string(),
            ),
            Error::CertbotMissing => {
                Some("Install certbot with: forge install certbot".to_string())
            }
            Error::CertificateNotFound(domain) => Some(format!(
                "Provision a certificate with: forge ssl provision {}",
                domain
            )),
            Error::ServiceActionFailed { service, .. } => Some(format!(
                "Inspect recent unit output with: journalctl -u {} -n 50",
                service
            )),
            Error::LogNotFound(path) => Some(format!(
                "'{}' does not exist. The service may not be installed, or logs \
                 were rotated away.",
                path
            )),
            Error::Config(_) | Error::Yaml(_) => {
                Some("Check ~/.forge/config.yaml for syntax errors".to_string())
            }
            _ => None,
        }
    }
}

/// Map a probed binary name to the matching `forge install` package name.
fn install_alias(command: &str) -> &str {
    match command {
        "redis-cli" => "redis",
        "psql" => "postgresql",
        _ => command,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_not_found_suggests_installer() {
        let err = Error::CommandNotFound("redis-cli".to_string());
        let hint = err.suggestion().expect("should have a suggestion");
        assert!(hint.contains("forge install redis"), "got: {}", hint);
    }

    #[test]
    fn service_failure_points_at_journal() {
        let err = Error::ServiceActionFailed {
            service: "nginx".to_string(),
            action: "restart".to_string(),
            stderr: "boom".to_string(),
        };
        assert!(err.suggestion().unwrap().contains("journalctl -u nginx"));
    }

    #[test]
    fn most_errors_have_no_suggestion() {
        let err = Error::Parse("garbage".to_string());
        assert!(err.suggestion().is_none());
    }
}
