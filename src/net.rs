//! Network probes: HTTP reachability, DNS resolution, open ports.
//!
//! Site health checks are composed from [`HealthProbe`] implementations
//! so every check renders uniformly (pass/warn/fail plus a detail line).

use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::net::IpAddr;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Global shared HTTP client.
///
/// A single pooled client keeps repeated health checks from exhausting
/// file descriptors. Individual requests set their own timeout.
static SHARED_HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn shared_client() -> &'static Client {
    SHARED_HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create shared HTTP client")
    })
}

#[derive(Debug, Clone)]
pub struct HttpCheckResult {
    pub success: bool,
    pub status: Option<u16>,
    pub latency_ms: u128,
    pub error: Option<String>,
}

/// GET a URL and report status + latency. Network errors are data here,
/// not failures — a down site is a valid probe result.
pub async fn http_check(url: &str, timeout: Duration) -> HttpCheckResult {
    let start = Instant::now();
    match shared_client().get(url).timeout(timeout).send().await {
        Ok(response) => HttpCheckResult {
            success: response.status().is_success() || response.status().is_redirection(),
            status: Some(response.status().as_u16()),
            latency_ms: start.elapsed().as_millis(),
            error: None,
        },
        Err(e) => HttpCheckResult {
            success: false,
            status: None,
            latency_ms: start.elapsed().as_millis(),
            error: Some(trim_reqwest_error(&e)),
        },
    }
}

/// reqwest errors chain the full URL context; keep the interesting tail.
fn trim_reqwest_error(e: &reqwest::Error) -> String {
    let mut source: &dyn std::error::Error = e;
    while let Some(inner) = source.source() {
        source = inner;
    }
    source.to_string()
}

/// This host's public IP, from an external echo service.
pub async fn public_ip() -> Option<String> {
    let response = shared_client()
        .get("https://api.ipify.org")
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .ok()?;
    let text = response.text().await.ok()?;
    let trimmed = text.trim().to_string();
    trimmed.parse::<IpAddr>().ok().map(|_| trimmed)
}

/// Resolve a domain's addresses via the system resolver.
pub async fn resolve(domain: &str) -> Result<Vec<IpAddr>> {
    let addrs = tokio::net::lookup_host((domain, 80))
        .await?
        .map(|sa| sa.ip())
        .collect();
    Ok(addrs)
}

/// Does the domain resolve to this server? Returns (ok, detail).
pub async fn domain_points_here(domain: &str) -> (bool, String) {
    let resolved = match resolve(domain).await {
        Ok(addrs) if !addrs.is_empty() => addrs,
        _ => return (false, format!("{} does not resolve", domain)),
    };
    let Some(our_ip) = public_ip().await else {
        return (
            false,
            format!(
                "resolves to {} (could not determine this server's public IP)",
                resolved[0]
            ),
        );
    };
    let matches = resolved.iter().any(|ip| ip.to_string() == our_ip);
    if matches {
        (true, format!("{} → {}", domain, our_ip))
    } else {
        (
            false,
            format!("resolves to {}, this server is {}", resolved[0], our_ip),
        )
    }
}

/// Local IPv4 addresses as `(interface, address)`, loopback excluded.
pub async fn local_ips() -> Result<Vec<(String, String)>> {
    let out = crate::shell::run("ip", &["-o", "-4", "addr", "show"]).await?;
    Ok(parse_ip_addr_show(&out.stdout))
}

/// Parse `ip -o -4 addr show` lines:
/// `2: eth0    inet 203.0.113.9/24 brd ... scope global eth0`
pub fn parse_ip_addr_show(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _index = fields.next()?;
            let interface = fields.next()?.to_string();
            let inet = fields.next()?;
            if inet != "inet" {
                return None;
            }
            let address = fields.next()?.split('/').next()?.to_string();
            if interface == "lo" {
                return None;
            }
            Some((interface, address))
        })
        .collect()
}

/// TCP connect probe against localhost.
pub async fn port_open(port: u16) -> bool {
    tokio::time::timeout(
        Duration::from_secs(1),
        tokio::net::TcpStream::connect(("127.0.0.1", port)),
    )
    .await
    .map(|r| r.is_ok())
    .unwrap_or(false)
}

// ── Probe trait ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Pass(String),
    Warn(String),
    Fail(String),
}

impl ProbeOutcome {
    pub fn icon(&self) -> &'static str {
        match self {
            ProbeOutcome::Pass(_) => "✓",
            ProbeOutcome::Warn(_) => "○",
            ProbeOutcome::Fail(_) => "✗",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ProbeOutcome::Pass(s) | ProbeOutcome::Warn(s) | ProbeOutcome::Fail(s) => s,
        }
    }
}

/// One named check in a site health report.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn label(&self) -> &str;
    async fn run(&self) -> ProbeOutcome;
}

/// DNS: does the domain point at this server?
pub struct DnsProbe {
    pub domain: String,
}

#[async_trait]
impl HealthProbe for DnsProbe {
    fn label(&self) -> &str {
        "DNS"
    }

    async fn run(&self) -> ProbeOutcome {
        let (ok, detail) = domain_points_here(&self.domain).await;
        if ok {
            ProbeOutcome::Pass(detail)
        } else {
            ProbeOutcome::Fail(detail)
        }
    }
}

/// HTTP(S) reachability with status and latency.
pub struct HttpProbe {
    pub label: String,
    pub url: String,
    /// HTTPS failures are hard failures; plain HTTP failures are warnings
    /// (sites often redirect or only serve TLS).
    pub required: bool,
}

#[async_trait]
impl HealthProbe for HttpProbe {
    fn label(&self) -> &str {
        &self.label
    }

    async fn run(&self) -> ProbeOutcome {
        let result = http_check(&self.url, Duration::from_secs(10)).await;
        match (result.success, result.status) {
            (true, Some(status)) => {
                ProbeOutcome::Pass(format!("{} ({}ms)", status, result.latency_ms))
            }
            (false, Some(status)) => {
                ProbeOutcome::Warn(format!("{} ({}ms)", status, result.latency_ms))
            }
            (false, None) => {
                let detail = result.error.unwrap_or_else(|| "unreachable".to_string());
                if self.required {
                    ProbeOutcome::Fail(detail)
                } else {
                    ProbeOutcome::Warn(detail)
                }
            }
            (true, None) => ProbeOutcome::Pass(format!("{}ms", result.latency_ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_addr_show_parses_and_skips_loopback() {
        let text = "\
1: lo    inet 127.0.0.1/8 scope host lo\\       valid_lft forever\n\
2: eth0    inet 203.0.113.9/24 brd 203.0.113.255 scope global eth0\\       valid_lft forever\n\
3: docker0    inet 172.17.0.1/16 brd 172.17.255.255 scope global docker0\\       valid_lft forever\n";
        let ips = parse_ip_addr_show(text);
        assert_eq!(ips.len(), 2);
        assert_eq!(ips[0], ("eth0".to_string(), "203.0.113.9".to_string()));
        assert_eq!(ips[1].1, "172.17.0.1");
    }

    #[test]
    fn probe_outcome_icons() {
        assert_eq!(ProbeOutcome::Pass("ok".into()).icon(), "✓");
        assert_eq!(ProbeOutcome::Warn("eh".into()).icon(), "○");
        assert_eq!(ProbeOutcome::Fail("no".into()).icon(), "✗");
        assert_eq!(ProbeOutcome::Fail("no".into()).detail(), "no");
    }
}
