//! Optional tool configuration.
//!
//! `~/.forge/config.yaml` can override the paths this tool operates on.
//! An absent file yields the stock Ubuntu layout; a present file only
//! needs the keys it wants to change.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory for persistent state (`state.json`, `lineage.json`,
    /// `monitoring/`, `cve/`).
    pub state_dir: PathBuf,

    /// Nginx vhost directories.
    pub sites_available: PathBuf,
    pub sites_enabled: PathBuf,

    /// Nginx log directory (per-site access/error logs live here too).
    pub nginx_log_dir: PathBuf,

    /// Let's Encrypt live certificate directory.
    pub letsencrypt_live: PathBuf,

    /// Default number of lines for log tail commands.
    pub default_log_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        Self {
            state_dir: home.join(".forge"),
            sites_available: PathBuf::from("/etc/nginx/sites-available"),
            sites_enabled: PathBuf::from("/etc/nginx/sites-enabled"),
            nginx_log_dir: PathBuf::from("/var/log/nginx"),
            letsencrypt_live: PathBuf::from("/etc/letsencrypt/live"),
            default_log_lines: 50,
        }
    }
}

impl Config {
    /// Load `config.yaml` from the default state dir, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        Self::load_from(&home.join(".forge").join("config.yaml"))
    }

    /// Load from an explicit path; a missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_log_lines == 0 {
            return Err(Error::Config(
                "default_log_lines must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Monitoring artifacts directory (`thresholds.json`, `alerts.json`,
    /// `history.json`).
    pub fn monitoring_dir(&self) -> PathBuf {
        self.state_dir.join("monitoring")
    }

    /// CVE scan artifacts directory.
    pub fn cve_dir(&self) -> PathBuf {
        self.state_dir.join("cve")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/config.yaml")).unwrap();
        assert_eq!(config.sites_available, Path::new("/etc/nginx/sites-available"));
        assert_eq!(config.default_log_lines, 50);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config: Config = serde_yaml::from_str("default_log_lines: 200\n").unwrap();
        assert_eq!(config.default_log_lines, 200);
        assert_eq!(config.sites_enabled, Path::new("/etc/nginx/sites-enabled"));
    }

    #[test]
    fn zero_log_lines_rejected() {
        let config: Config = serde_yaml::from_str("default_log_lines: 0\n").unwrap();
        assert!(config.validate().is_err());
    }
}
