use crate::cli::SslCommands;
use crate::output::UserOutput;
use forge::{ssl, Error, SiteManager};

pub async fn run_ssl(
    command: SslCommands,
    manager: &SiteManager,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    match command {
        SslCommands::Provision {
            domain,
            no_www,
            dns,
        } => {
            if dns {
                out.status(&ssl::manual_dns_instructions(&domain, !no_www));
                return Ok(());
            }
            out.status(&format!(
                "Provisioning SSL certificate for {} via HTTP verification...",
                domain
            ));
            match manager.provision_ssl(&domain, !no_www).await {
                Ok(()) => {
                    out.success(&format!("SSL certificate provisioned for {}!", domain));
                    out.status("HTTPS is now enabled");
                }
                Err(e) => {
                    out.error(&e.to_string());
                    out.blank();
                    out.status("Common issues:");
                    out.status("  • Domain DNS must point to this server");
                    out.status("  • Port 80 must be accessible from the internet");
                    out.status("  • Try DNS verification: forge ssl provision --dns");
                    return Err(e.into());
                }
            }
            Ok(())
        }
        SslCommands::List => {
            let listing = ssl::list_certificates().await?;
            if listing.contains("No certificates found") || listing.trim().is_empty() {
                out.warning("No SSL certificates found.");
            } else {
                out.status(&listing);
            }
            Ok(())
        }
        SslCommands::Renew => {
            out.status("Renewing certificates...");
            let output = ssl::renew_all().await?;
            out.status(&output);
            out.success("Certificate renewal complete!");
            Ok(())
        }
        SslCommands::Revoke { domain, yes } => {
            if !yes {
                return Err(Error::NeedsConfirmation(format!(
                    "revoking and deleting the certificate for {}",
                    domain
                ))
                .into());
            }
            ssl::revoke(&domain).await?;
            manager.store().update_site_ssl(&domain, false)?;
            out.success(&format!("Certificate for {} revoked and deleted", domain));
            Ok(())
        }
    }
}
