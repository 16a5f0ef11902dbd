//! Nginx vhost generation.
//!
//! Templates are plain text with `{{key}}` placeholders; rendering is a
//! literal substitution pass followed by a leftover-placeholder check, so
//! a template/context mismatch fails loudly instead of shipping a broken
//! vhost.

pub mod templates;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

/// The application kind behind a vhost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    /// Next.js app behind a reverse proxy.
    Nextjs,
    /// Nuxt app behind a reverse proxy.
    Nuxt,
    /// PHP application served through PHP-FPM.
    Php,
    /// Plain static files.
    Static,
    /// Config exists but could not be classified.
    Unknown,
}

impl SiteKind {
    /// Whether this kind proxies to a local port.
    pub fn is_proxy(&self) -> bool {
        matches!(self, SiteKind::Nextjs | SiteKind::Nuxt)
    }

    /// Display label used in tables and menus.
    pub fn label(&self) -> &'static str {
        match self {
            SiteKind::Nextjs => "Next.js",
            SiteKind::Nuxt => "Nuxt.js",
            SiteKind::Php => "PHP",
            SiteKind::Static => "Static",
            SiteKind::Unknown => "Unknown",
        }
    }

    /// All kinds a user can create a site from.
    pub fn creatable() -> &'static [SiteKind] {
        &[SiteKind::Nextjs, SiteKind::Nuxt, SiteKind::Php, SiteKind::Static]
    }
}

impl std::fmt::Display for SiteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SiteKind::Nextjs => "nextjs",
            SiteKind::Nuxt => "nuxt",
            SiteKind::Php => "php",
            SiteKind::Static => "static",
            SiteKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SiteKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nextjs" | "next" => Ok(SiteKind::Nextjs),
            "nuxt" => Ok(SiteKind::Nuxt),
            "php" => Ok(SiteKind::Php),
            "static" => Ok(SiteKind::Static),
            other => Err(Error::Parse(format!(
                "unknown site kind '{}' (expected nextjs, nuxt, php or static)",
                other
            ))),
        }
    }
}

/// Everything a template can ask for.
#[derive(Debug, Clone)]
pub struct VhostContext {
    pub domain: String,
    /// Also answer for `www.<domain>`.
    pub include_www: bool,
    /// Backend port for proxy kinds.
    pub port: Option<u16>,
    /// Document root for php/static kinds.
    pub document_root: Option<PathBuf>,
    /// PHP-FPM version for php kinds.
    pub php_version: Option<String>,
    /// `client_max_body_size` value.
    pub max_body_size: String,
}

impl VhostContext {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            include_www: true,
            port: None,
            document_root: None,
            php_version: None,
            max_body_size: "100M".to_string(),
        }
    }

    fn server_names(&self) -> String {
        if self.include_www {
            format!("{} www.{}", self.domain, self.domain)
        } else {
            self.domain.clone()
        }
    }

    fn variables(&self) -> BTreeMap<&'static str, String> {
        let mut vars = BTreeMap::new();
        vars.insert("domain", self.domain.clone());
        vars.insert("server_names", self.server_names());
        vars.insert("max_body_size", self.max_body_size.clone());
        vars.insert("security_headers", templates::SECURITY_HEADERS.to_string());
        vars.insert("gzip", templates::GZIP_CONFIG.to_string());
        vars.insert("ssl", templates::SSL_CONFIG.to_string());
        if let Some(port) = self.port {
            vars.insert("port", port.to_string());
        }
        if let Some(ref root) = self.document_root {
            vars.insert("document_root", root.display().to_string());
        }
        if let Some(ref version) = self.php_version {
            vars.insert("php_version", version.clone());
        }
        vars
    }
}

/// Pick the template for a site kind (TLS variant when `ssl` is set).
pub fn template_for(kind: SiteKind, ssl: bool) -> Result<&'static str> {
    match (kind, ssl) {
        (SiteKind::Nextjs | SiteKind::Nuxt, false) => Ok(templates::NODEJS_TEMPLATE),
        (SiteKind::Nextjs | SiteKind::Nuxt, true) => Ok(templates::NODEJS_TEMPLATE_SSL),
        (SiteKind::Php, false) => Ok(templates::PHP_TEMPLATE),
        (SiteKind::Php, true) => Ok(templates::PHP_TEMPLATE_SSL),
        (SiteKind::Static, _) => Ok(templates::STATIC_TEMPLATE),
        (SiteKind::Unknown, _) => Err(Error::Parse(
            "cannot render a vhost for an unknown site kind".to_string(),
        )),
    }
}

/// Render a vhost config for the given kind and context.
pub fn render(kind: SiteKind, ssl: bool, context: &VhostContext) -> Result<String> {
    render_str(template_for(kind, ssl)?, context)
}

/// Substitute `{{key}}` placeholders; any placeholder left unresolved is
/// an error naming the missing variable.
pub fn render_str(template: &str, context: &VhostContext) -> Result<String> {
    let mut rendered = template.to_string();
    for (key, value) in context.variables() {
        rendered = rendered.replace(&format!("{{{{{}}}}}", key), &value);
    }

    if let Some(start) = rendered.find("{{") {
        let rest = &rendered[start + 2..];
        let name = rest
            .split("}}")
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        return Err(Error::TemplateVariable(name));
    }

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_vhost_renders_port_and_server_names() {
        let mut ctx = VhostContext::new("example.com");
        ctx.port = Some(3000);
        let rendered = render(SiteKind::Nextjs, false, &ctx).unwrap();
        assert!(rendered.contains("proxy_pass http://127.0.0.1:3000;"));
        assert!(rendered.contains("server_name example.com www.example.com;"));
        assert!(rendered.contains("X-Frame-Options"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn php_vhost_renders_fpm_socket() {
        let mut ctx = VhostContext::new("blog.example.com");
        ctx.include_www = false;
        ctx.document_root = Some("/var/www/blog/public".into());
        ctx.php_version = Some("8.3".to_string());
        let rendered = render(SiteKind::Php, false, &ctx).unwrap();
        assert!(rendered.contains("fastcgi_pass unix:/var/run/php/php8.3-fpm.sock;"));
        assert!(rendered.contains("root /var/www/blog/public;"));
        assert!(rendered.contains("server_name blog.example.com;"));
    }

    #[test]
    fn ssl_variant_redirects_and_references_cert() {
        let mut ctx = VhostContext::new("example.com");
        ctx.port = Some(3000);
        let rendered = render(SiteKind::Nuxt, true, &ctx).unwrap();
        assert!(rendered.contains("return 301 https://$host$request_uri;"));
        assert!(rendered.contains("/etc/letsencrypt/live/example.com/fullchain.pem"));
    }

    #[test]
    fn missing_variable_is_reported_by_name() {
        let ctx = VhostContext::new("example.com");
        // No port in context, proxy template needs one.
        let err = render(SiteKind::Nextjs, false, &ctx).unwrap_err();
        assert!(matches!(err, Error::TemplateVariable(ref name) if name == "port"));
    }

    #[test]
    fn site_kind_round_trips_through_str() {
        for kind in SiteKind::creatable() {
            let parsed: SiteKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, *kind);
        }
        assert!("cgi-bin".parse::<SiteKind>().is_err());
    }
}
