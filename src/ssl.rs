//! Let's Encrypt certificate management via certbot, plus local
//! certificate inspection via openssl.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::net::{HealthProbe, ProbeOutcome};
use crate::shell;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Local view of a domain's certificate, from the live directory.
#[derive(Debug, Clone, Default)]
pub struct CertStatus {
    pub present: bool,
    pub expiry: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
}

impl CertStatus {
    /// Expiry urgency buckets used by listings: <7 days is urgent,
    /// <30 days is worth flagging.
    pub fn urgency(&self) -> CertUrgency {
        match self.days_remaining {
            None => CertUrgency::None,
            Some(days) if days < 7 => CertUrgency::Critical,
            Some(days) if days < 30 => CertUrgency::Warning,
            Some(_) => CertUrgency::Ok,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertUrgency {
    None,
    Ok,
    Warning,
    Critical,
}

/// Fail early with a targeted error when certbot is absent.
pub fn ensure_certbot() -> Result<()> {
    if shell::command_exists("certbot") {
        Ok(())
    } else {
        Err(Error::CertbotMissing)
    }
}

fn domain_args(domain: &str, include_www: bool) -> Vec<String> {
    let mut args = vec!["-d".to_string(), domain.to_string()];
    if include_www {
        args.push("-d".to_string());
        args.push(format!("www.{}", domain));
    }
    args
}

/// Provision a certificate with the nginx plugin (HTTP-01 validation).
/// Certbot rewrites the vhost for TLS itself; the caller records the SSL
/// flag in state and reloads nginx.
pub async fn provision(domain: &str, include_www: bool) -> Result<()> {
    ensure_certbot()?;
    let mut args = vec!["certbot".to_string(), "--nginx".to_string()];
    args.extend(domain_args(domain, include_www));
    args.extend(
        [
            "--non-interactive",
            "--agree-tos",
            "--register-unsafely-without-email",
        ]
        .map(String::from),
    );
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let out = shell::run("sudo", &arg_refs).await?;
    out.into_checked(&format!("sudo certbot --nginx -d {}", domain))?;
    Ok(())
}

/// The manual DNS-01 walkthrough printed when HTTP validation can't work
/// (port 80 unreachable, DNS not yet pointed here).
pub fn manual_dns_instructions(domain: &str, include_www: bool) -> String {
    let domains = domain_args(domain, include_www).join(" ");
    format!(
        "DNS verification requires a TXT record.\n\
         \n\
         Run manually:\n\
         \n\
             sudo certbot certonly --manual --preferred-challenges dns {}\n\
         \n\
         TXT record format:\n\
             Name:  _acme-challenge.{}\n\
             Type:  TXT\n\
             Value: (provided by certbot)\n",
        domains, domain
    )
}

/// Raw `certbot certificates` listing.
pub async fn list_certificates() -> Result<String> {
    ensure_certbot()?;
    let out = shell::run_sudo("certbot", &["certificates"]).await?;
    let out = out.into_checked("sudo certbot certificates")?;
    Ok(out.stdout)
}

pub async fn renew_all() -> Result<String> {
    ensure_certbot()?;
    let out = shell::run_sudo("certbot", &["renew"]).await?;
    let out = out.into_checked("sudo certbot renew")?;
    Ok(out.stdout)
}

pub async fn revoke(domain: &str) -> Result<()> {
    ensure_certbot()?;
    let out = shell::run_sudo(
        "certbot",
        &["revoke", "--cert-name", domain, "--delete-after-revoke", "-n"],
    )
    .await?;
    if out.success() {
        Ok(())
    } else if out.stderr.contains("No certificate found") || out.stderr.contains("not found") {
        Err(Error::CertificateNotFound(domain.to_string()))
    } else {
        Err(Error::CommandFailed {
            command: format!("sudo certbot revoke --cert-name {}", domain),
            code: out.code,
            stderr: out.stderr,
        })
    }
}

/// Inspect the live certificate for a domain, if any.
pub async fn check_ssl_status(config: &Config, domain: &str) -> CertStatus {
    let cert_path = config
        .letsencrypt_live
        .join(domain)
        .join("fullchain.pem");
    if !cert_path.exists() {
        return CertStatus::default();
    }

    let mut status = CertStatus {
        present: true,
        ..Default::default()
    };

    let path = cert_path.display().to_string();
    if let Ok(out) = shell::run_sudo("openssl", &["x509", "-in", &path, "-noout", "-enddate"]).await
    {
        if out.success() {
            if let Some(expiry) = parse_not_after(&out.stdout) {
                status.days_remaining =
                    Some(expiry.signed_duration_since(Utc::now()).num_days());
                status.expiry = Some(expiry);
            }
        }
    }
    status
}

/// Parse openssl's `notAfter=Dec 31 23:59:59 2024 GMT` line.
pub fn parse_not_after(text: &str) -> Option<DateTime<Utc>> {
    let raw = text.trim().strip_prefix("notAfter=")?;
    // Normalize the space-padded day openssl emits for days 1-9.
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() < 4 {
        return None;
    }
    let normalized = format!("{} {} {} {}", tokens[0], tokens[1], tokens[2], tokens[3]);
    NaiveDateTime::parse_from_str(&normalized, "%b %e %H:%M:%S %Y")
        .ok()
        .map(|dt| dt.and_utc())
}

/// Certificate presence/expiry as a site health probe.
pub struct CertProbe {
    pub config: Config,
    pub domain: String,
}

#[async_trait]
impl HealthProbe for CertProbe {
    fn label(&self) -> &str {
        "SSL"
    }

    async fn run(&self) -> ProbeOutcome {
        let status = check_ssl_status(&self.config, &self.domain).await;
        if !status.present {
            return ProbeOutcome::Warn("no certificate".to_string());
        }
        match status.days_remaining {
            Some(days) if days < 0 => ProbeOutcome::Fail("certificate expired".to_string()),
            Some(days) if days < 7 => {
                ProbeOutcome::Fail(format!("expires in {} days", days))
            }
            Some(days) if days < 30 => {
                ProbeOutcome::Warn(format!("expires in {} days", days))
            }
            Some(days) => ProbeOutcome::Pass(format!("valid, expires in {} days", days)),
            None => ProbeOutcome::Warn("present, expiry unreadable".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_after_parses_openssl_format() {
        let expiry = parse_not_after("notAfter=Dec 31 23:59:59 2024 GMT").unwrap();
        assert_eq!(expiry.to_rfc3339(), "2024-12-31T23:59:59+00:00");
    }

    #[test]
    fn not_after_handles_space_padded_day() {
        let expiry = parse_not_after("notAfter=Jul  3 12:00:00 2026 GMT").unwrap();
        assert_eq!(expiry.to_rfc3339(), "2026-07-03T12:00:00+00:00");
    }

    #[test]
    fn not_after_rejects_garbage() {
        assert!(parse_not_after("").is_none());
        assert!(parse_not_after("notBefore=Dec 31 23:59:59 2024 GMT").is_none());
        assert!(parse_not_after("notAfter=tomorrow").is_none());
    }

    #[test]
    fn urgency_buckets() {
        let mk = |days: i64| CertStatus {
            present: true,
            expiry: None,
            days_remaining: Some(days),
        };
        assert_eq!(mk(90).urgency(), CertUrgency::Ok);
        assert_eq!(mk(29).urgency(), CertUrgency::Warning);
        assert_eq!(mk(3).urgency(), CertUrgency::Critical);
        assert_eq!(CertStatus::default().urgency(), CertUrgency::None);
    }
}
