use crate::cli::SitesCommands;
use crate::output::UserOutput;
use forge::ssl::CertUrgency;
use forge::{CreateSite, Error, SiteKind, SiteManager};

pub async fn run_sites(
    command: SitesCommands,
    manager: &SiteManager,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    match command {
        SitesCommands::List { json } => list(manager, json, out).await,
        SitesCommands::Create {
            domain,
            kind,
            port,
            document_root,
            php_version,
            no_www,
            max_body_size,
            dry_run,
            ssl,
        } => {
            let kind: SiteKind = kind.parse()?;
            let mut request = CreateSite::new(&domain, kind);
            request.include_www = !no_www;
            request.port = port;
            request.document_root = document_root;
            request.php_version = php_version;
            request.max_body_size = max_body_size;
            let request = request.with_defaults();

            if dry_run {
                out.status(&manager.render(&request)?);
                return Ok(());
            }

            out.status(&format!("Creating site {}...", domain));
            manager.create(&request).await?;
            out.success(&format!("Site {} created and enabled!", domain));

            if ssl {
                out.status("Provisioning SSL certificate...");
                manager.provision_ssl(&domain, request.include_www).await?;
                out.success(&format!("HTTPS enabled for {}", domain));
            }
            Ok(())
        }
        SitesCommands::Delete { domain, yes } => {
            if !yes {
                return Err(Error::NeedsConfirmation(format!(
                    "deleting the vhost for {} (document root and certificates are kept)",
                    domain
                ))
                .into());
            }
            manager.delete(&domain).await?;
            out.success(&format!("Site {} deleted", domain));
            Ok(())
        }
        SitesCommands::Toggle { domain } => {
            let enabled = manager.toggle(&domain).await?;
            out.success(&format!(
                "Site {} {}",
                domain,
                if enabled { "enabled" } else { "disabled" }
            ));
            Ok(())
        }
        SitesCommands::Show { domain } => {
            let content = manager.read_config(&domain).await?;
            out.status(&content);
            Ok(())
        }
        SitesCommands::Health { domain } => {
            out.status(&format!("Health check: {}", domain));
            out.blank();
            for (label, outcome) in manager.health(&domain).await {
                out.status(&format!(
                    "  {} {:<14} {}",
                    outcome.icon(),
                    label,
                    outcome.detail()
                ));
            }
            Ok(())
        }
        SitesCommands::Ssl { domain, no_www } => {
            out.status(&format!("Provisioning SSL certificate for {}...", domain));
            manager.provision_ssl(&domain, !no_www).await?;
            out.success(&format!("HTTPS enabled for {}", domain));
            Ok(())
        }
    }
}

async fn list(manager: &SiteManager, json: bool, out: &dyn UserOutput) -> anyhow::Result<()> {
    let sites = manager.list().await;

    if json {
        let value: Vec<serde_json::Value> = sites
            .iter()
            .map(|site| {
                serde_json::json!({
                    "domain": site.domain,
                    "enabled": site.enabled,
                    "kind": site.kind.to_string(),
                    "target": site.target,
                    "ssl": site.cert.present,
                    "ssl_days_remaining": site.cert.days_remaining,
                    "managed": site.managed,
                })
            })
            .collect();
        out.status(&serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if sites.is_empty() {
        out.warning("No sites found.");
        out.status("Create one with: forge sites create example.com --kind static");
        return Ok(());
    }

    out.status(&format!(
        "{:<28} {:<10} {:<8} {:<9} {}",
        "Site", "Status", "SSL", "Type", "Port/Root"
    ));
    out.status(&format!("{:-<80}", ""));
    for site in &sites {
        let status = if site.enabled {
            "\x1b[32m● enabled\x1b[0m "
        } else {
            "\x1b[2m○ disabled\x1b[0m"
        };
        let ssl = match (site.cert.present, site.cert.urgency()) {
            (false, _) => "\x1b[2mnone\x1b[0m    ".to_string(),
            (true, CertUrgency::Critical) => format!(
                "\x1b[31m{}d!\x1b[0m     ",
                site.cert.days_remaining.unwrap_or(0)
            ),
            (true, CertUrgency::Warning) => format!(
                "\x1b[33m{}d\x1b[0m     ",
                site.cert.days_remaining.unwrap_or(0)
            ),
            (true, _) => "\x1b[32mOK\x1b[0m      ".to_string(),
        };
        out.status(&format!(
            "{:<28} {} {} {:<9} {}",
            site.domain,
            status,
            ssl,
            site.kind.label(),
            site.target
        ));
    }

    let enabled = sites.iter().filter(|s| s.enabled).count();
    let with_ssl = sites.iter().filter(|s| s.cert.present).count();
    out.blank();
    out.status(&format!(
        "Total: {} sites | Enabled: {} | With SSL: {}",
        sites.len(),
        enabled,
        with_ssl
    ));
    Ok(())
}
