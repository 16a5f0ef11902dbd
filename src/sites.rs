//! Nginx site management.
//!
//! Sites live in `/etc/nginx/sites-available` with enable symlinks in
//! `sites-enabled`, plus a record in the state store. The filesystem is
//! the source of truth for what exists; state enriches listings with the
//! kind/target recorded at creation. Vhosts created by hand are still
//! listed — their kind is detected from the config text.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::net::{DnsProbe, HealthProbe, HttpProbe, ProbeOutcome};
use crate::nginx::{self, SiteKind, VhostContext};
use crate::shell;
use crate::ssl::{self, CertProbe, CertStatus};
use crate::state::{SiteRecord, StateStore};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

pub struct SiteManager {
    config: Config,
    store: StateStore,
}

/// One row of `forge sites list`.
#[derive(Debug, Clone)]
pub struct SiteListing {
    pub domain: String,
    pub enabled: bool,
    pub kind: SiteKind,
    pub target: String,
    pub cert: CertStatus,
    /// Whether the site has a state record (created by this tool).
    pub managed: bool,
}

/// Inputs for creating a site.
#[derive(Debug, Clone)]
pub struct CreateSite {
    pub domain: String,
    pub kind: SiteKind,
    pub include_www: bool,
    pub port: Option<u16>,
    pub document_root: Option<PathBuf>,
    pub php_version: Option<String>,
    pub max_body_size: String,
}

impl CreateSite {
    pub fn new(domain: &str, kind: SiteKind) -> Self {
        Self {
            domain: domain.to_string(),
            kind,
            include_www: true,
            port: None,
            document_root: None,
            php_version: None,
            max_body_size: "100M".to_string(),
        }
    }

    /// Fill in the defaults the original tool prompted for.
    pub fn with_defaults(mut self) -> Self {
        if self.kind.is_proxy() && self.port.is_none() {
            self.port = Some(3000);
        }
        if self.kind == SiteKind::Php {
            if self.document_root.is_none() {
                self.document_root = Some(PathBuf::from(format!("/var/www/{}/public", self.domain)));
            }
            if self.php_version.is_none() {
                self.php_version = Some("8.3".to_string());
            }
        }
        if self.kind == SiteKind::Static && self.document_root.is_none() {
            self.document_root = Some(PathBuf::from(format!("/var/www/{}", self.domain)));
        }
        self
    }

    fn context(&self) -> VhostContext {
        let mut ctx = VhostContext::new(&self.domain);
        ctx.include_www = self.include_www;
        ctx.port = self.port;
        ctx.document_root = self.document_root.clone();
        ctx.php_version = self.php_version.clone();
        ctx.max_body_size = self.max_body_size.clone();
        ctx
    }
}

fn domain_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)+$")
            .expect("static regex")
    })
}

/// Lowercase hostname with at least one dot; rejects anything that could
/// escape into a path or shell position.
pub fn validate_domain(domain: &str) -> Result<()> {
    if domain_regex().is_match(domain) {
        Ok(())
    } else {
        Err(Error::InvalidDomain(domain.to_string()))
    }
}

/// Classify a vhost config by its directives. Returns the kind plus the
/// proxy port or document root found.
pub fn detect_site_kind(content: &str) -> (SiteKind, Option<u16>, Option<String>) {
    static PROXY_RE: OnceLock<Regex> = OnceLock::new();
    static ROOT_RE: OnceLock<Regex> = OnceLock::new();
    let proxy_re = PROXY_RE.get_or_init(|| {
        Regex::new(r"proxy_pass\s+http://127\.0\.0\.1:(\d+)").expect("static regex")
    });
    let root_re =
        ROOT_RE.get_or_init(|| Regex::new(r"(?m)^\s*root\s+([^;]+);").expect("static regex"));

    if content.contains("proxy_pass") {
        let port = proxy_re
            .captures(content)
            .and_then(|c| c[1].parse().ok());
        let kind = if content.contains("Nuxt") {
            SiteKind::Nuxt
        } else {
            // Proxy configs default to the Next.js kind
            SiteKind::Nextjs
        };
        (kind, port, None)
    } else if content.contains("fastcgi_pass") {
        let root = root_re.captures(content).map(|c| c[1].trim().to_string());
        (SiteKind::Php, None, root)
    } else if content.contains("root") {
        let root = root_re.captures(content).map(|c| c[1].trim().to_string());
        (SiteKind::Static, None, root)
    } else {
        (SiteKind::Unknown, None, None)
    }
}

impl SiteManager {
    pub fn new(config: Config) -> Self {
        let store = StateStore::new(config.state_dir.clone());
        Self { config, store }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    fn available_path(&self, domain: &str) -> PathBuf {
        self.config.sites_available.join(domain)
    }

    fn enabled_path(&self, domain: &str) -> PathBuf {
        self.config.sites_enabled.join(domain)
    }

    /// Site names in a vhost directory, excluding the distro default.
    fn list_dir(&self, dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.file_name().into_string().ok())
                    .filter(|name| name != "default")
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn available_sites(&self) -> Vec<String> {
        self.list_dir(&self.config.sites_available)
    }

    pub fn enabled_sites(&self) -> Vec<String> {
        self.list_dir(&self.config.sites_enabled)
    }

    /// Read a vhost config, escalating to sudo when direct read fails.
    pub async fn read_config(&self, domain: &str) -> Result<String> {
        let path = self.available_path(domain);
        if !path.exists() {
            return Err(Error::SiteNotFound(domain.to_string()));
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(_) => {
                let out =
                    shell::run_sudo("cat", &[&path.display().to_string()]).await?;
                Ok(out
                    .into_checked(&format!("sudo cat {}", path.display()))?
                    .stdout)
            }
        }
    }

    /// Full listing: filesystem merged with state and certificate status.
    pub async fn list(&self) -> Vec<SiteListing> {
        let enabled = self.enabled_sites();
        let mut listings = Vec::new();
        for domain in self.available_sites() {
            let cert = ssl::check_ssl_status(&self.config, &domain).await;
            let record = self.store.get_site(&domain);
            let (kind, target, managed) = match record {
                Some(record) => (record.kind, record.target(), true),
                None => {
                    let (kind, port, root) = match self.read_config(&domain).await {
                        Ok(content) => detect_site_kind(&content),
                        Err(_) => (SiteKind::Unknown, None, None),
                    };
                    let target = port
                        .map(|p| format!("127.0.0.1:{}", p))
                        .or(root)
                        .unwrap_or_else(|| "-".to_string());
                    (kind, target, false)
                }
            };
            listings.push(SiteListing {
                enabled: enabled.contains(&domain),
                domain,
                kind,
                target,
                cert,
                managed,
            });
        }
        listings
    }

    /// Render the vhost a create request would write, without touching
    /// the system. Used for `--dry-run` and the TUI preview.
    pub fn render(&self, request: &CreateSite) -> Result<String> {
        validate_domain(&request.domain)?;
        nginx::render(request.kind, false, &request.context())
    }

    /// Create a site: write the vhost, prepare the document root and log
    /// files, enable it, and gate on `nginx -t` before reloading.
    ///
    /// If the config test fails the enable symlink is removed again so a
    /// broken vhost can never take down the reload.
    pub async fn create(&self, request: &CreateSite) -> Result<()> {
        validate_domain(&request.domain)?;
        let available = self.available_path(&request.domain);
        if available.exists() {
            return Err(Error::SiteExists(request.domain.clone()));
        }

        let rendered = self.render(request)?;

        // Write via /tmp then move with sudo: our user cannot write
        // /etc/nginx directly.
        let temp = std::env::temp_dir().join(format!("{}.conf", request.domain));
        std::fs::write(&temp, &rendered)?;
        shell::run_sudo(
            "mv",
            &[&temp.display().to_string(), &available.display().to_string()],
        )
        .await?
        .into_checked("sudo mv vhost into sites-available")?;

        if let Some(ref root) = request.document_root {
            let root_str = root.display().to_string();
            shell::run_sudo("mkdir", &["-p", &root_str]).await?;
            shell::run_sudo("chown", &["-R", "www-data:www-data", &root_str]).await?;
        }

        for log in ["access", "error"] {
            let path = self
                .config
                .nginx_log_dir
                .join(format!("{}.{}.log", request.domain, log));
            shell::run_sudo("touch", &[&path.display().to_string()]).await?;
        }

        shell::run_sudo(
            "ln",
            &[
                "-sf",
                &available.display().to_string(),
                &self.enabled_path(&request.domain).display().to_string(),
            ],
        )
        .await?;

        let test = shell::run_sudo("nginx", &["-t"]).await?;
        if !test.success() {
            shell::run_sudo(
                "rm",
                &["-f", &self.enabled_path(&request.domain).display().to_string()],
            )
            .await
            .ok();
            return Err(Error::NginxTestFailed(if test.stderr.is_empty() {
                test.stdout
            } else {
                test.stderr
            }));
        }
        shell::run_sudo("systemctl", &["reload", "nginx"]).await?;

        let mut record = SiteRecord::new(request.domain.clone(), request.kind);
        record.port = request.port;
        record.document_root = request.document_root.clone();
        record.php_version = request.php_version.clone();
        self.store.upsert_site(record)?;

        tracing::info!("created site {}", request.domain);
        Ok(())
    }

    /// Remove the vhost and its enable symlink. Document root and
    /// certificates are left alone.
    pub async fn delete(&self, domain: &str) -> Result<()> {
        if !self.available_path(domain).exists() {
            return Err(Error::SiteNotFound(domain.to_string()));
        }
        shell::run_sudo("rm", &["-f", &self.enabled_path(domain).display().to_string()])
            .await?;
        shell::run_sudo(
            "rm",
            &["-f", &self.available_path(domain).display().to_string()],
        )
        .await?;
        shell::run_sudo("systemctl", &["reload", "nginx"]).await?;
        self.store.delete_site(domain)?;
        tracing::info!("deleted site {}", domain);
        Ok(())
    }

    /// Enable or disable a site's symlink, returning the new enabled state.
    pub async fn toggle(&self, domain: &str) -> Result<bool> {
        if !self.available_path(domain).exists() {
            return Err(Error::SiteNotFound(domain.to_string()));
        }
        let currently_enabled = self.enabled_path(domain).exists();
        if currently_enabled {
            shell::run_sudo(
                "rm",
                &["-f", &self.enabled_path(domain).display().to_string()],
            )
            .await?;
        } else {
            shell::run_sudo(
                "ln",
                &[
                    "-sf",
                    &self.available_path(domain).display().to_string(),
                    &self.enabled_path(domain).display().to_string(),
                ],
            )
            .await?;
        }
        shell::run_sudo("systemctl", &["reload", "nginx"]).await?;
        self.store.set_site_enabled(domain, !currently_enabled)?;
        Ok(!currently_enabled)
    }

    /// Provision SSL for a site and record the result.
    pub async fn provision_ssl(&self, domain: &str, include_www: bool) -> Result<()> {
        ssl::provision(domain, include_www).await?;
        self.store.update_site_ssl(domain, true)?;
        shell::run_sudo("systemctl", &["reload", "nginx"]).await?;
        Ok(())
    }

    /// Health report: DNS, HTTP, HTTPS, certificate, and config test.
    pub async fn health(&self, domain: &str) -> Vec<(String, ProbeOutcome)> {
        let probes: Vec<Box<dyn HealthProbe>> = vec![
            Box::new(DnsProbe {
                domain: domain.to_string(),
            }),
            Box::new(HttpProbe {
                label: "HTTP".to_string(),
                url: format!("http://{}", domain),
                required: false,
            }),
            Box::new(HttpProbe {
                label: "HTTPS".to_string(),
                url: format!("https://{}", domain),
                required: true,
            }),
            Box::new(CertProbe {
                config: self.config.clone(),
                domain: domain.to_string(),
            }),
        ];

        let mut results = Vec::new();
        for probe in probes {
            results.push((probe.label().to_string(), probe.run().await));
        }

        let nginx_test = match shell::run_sudo("nginx", &["-t"]).await {
            Ok(out) if out.success() => ProbeOutcome::Pass("valid".to_string()),
            Ok(out) => ProbeOutcome::Fail(out.stderr),
            Err(e) => ProbeOutcome::Warn(e.to_string()),
        };
        results.push(("Nginx Config".to_string(), nginx_test));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_validation_accepts_hostnames_only() {
        assert!(validate_domain("example.com").is_ok());
        assert!(validate_domain("sub.domain.example.co.uk").is_ok());
        assert!(validate_domain("my-site.io").is_ok());

        assert!(validate_domain("nodot").is_err());
        assert!(validate_domain("UPPER.com").is_err());
        assert!(validate_domain("-leading.com").is_err());
        assert!(validate_domain("spaces in.com").is_err());
        assert!(validate_domain("../etc/passwd").is_err());
        assert!(validate_domain("a;rm -rf.com").is_err());
    }

    #[test]
    fn proxy_config_detected_with_port() {
        let content = "server {\n    location / {\n        proxy_pass http://127.0.0.1:3000;\n    }\n}";
        let (kind, port, root) = detect_site_kind(content);
        assert_eq!(kind, SiteKind::Nextjs);
        assert_eq!(port, Some(3000));
        assert!(root.is_none());
    }

    #[test]
    fn php_config_detected_with_root() {
        let content =
            "server {\n    root /var/www/blog/public;\n    fastcgi_pass unix:/run/php.sock;\n}";
        let (kind, port, root) = detect_site_kind(content);
        assert_eq!(kind, SiteKind::Php);
        assert!(port.is_none());
        assert_eq!(root.as_deref(), Some("/var/www/blog/public"));
    }

    #[test]
    fn static_config_detected() {
        let content = "server {\n    root /var/www/html;\n    index index.html;\n}";
        let (kind, _, root) = detect_site_kind(content);
        assert_eq!(kind, SiteKind::Static);
        assert_eq!(root.as_deref(), Some("/var/www/html"));
    }

    #[test]
    fn defaults_fill_by_kind() {
        let req = CreateSite::new("example.com", SiteKind::Nextjs).with_defaults();
        assert_eq!(req.port, Some(3000));

        let req = CreateSite::new("example.com", SiteKind::Php).with_defaults();
        assert_eq!(
            req.document_root.as_deref(),
            Some(std::path::Path::new("/var/www/example.com/public"))
        );
        assert_eq!(req.php_version.as_deref(), Some("8.3"));
    }
}
