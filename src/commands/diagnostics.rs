use crate::cli::DiagnosticsCommands;
use crate::output::UserOutput;
use forge::diagnostics;
use forge::systemd::UnitState;

pub async fn run_diagnostics(
    command: DiagnosticsCommands,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    match command {
        DiagnosticsCommands::Nginx => {
            out.status("Testing nginx configuration...");
            let report = diagnostics::test_nginx().await?;
            out.blank();
            if report.ok {
                out.success("Nginx configuration is valid!");
                out.status(&report.output);
            } else {
                out.error("Nginx configuration has errors:");
                out.status(&report.output);
                if !report.suggestions.is_empty() {
                    out.blank();
                    out.status("Suggested fixes:");
                    for suggestion in &report.suggestions {
                        out.status(&format!("  • {}", suggestion));
                    }
                }
                anyhow::bail!("nginx -t failed");
            }
            Ok(())
        }
        DiagnosticsCommands::Php => {
            let statuses = diagnostics::check_php_fpm().await;
            if statuses.is_empty() {
                out.warning("No PHP-FPM versions found installed.");
            }
            for fpm in &statuses {
                match fpm.state {
                    UnitState::Active => {
                        out.success(&format!("PHP {} — running", fpm.version));
                        let icon = if fpm.socket_exists { "●" } else { "✗" };
                        out.status(&format!("  socket: {} {}", icon, fpm.socket));
                        if !fpm.socket_exists {
                            out.warning("  socket missing — PHP-FPM may be misconfigured");
                        }
                    }
                    state => {
                        out.status(&format!("  PHP {} — {}", fpm.version, state));
                    }
                }
            }
            out.blank();
            if diagnostics::www_data_exists().await {
                out.success("www-data user exists");
            } else {
                out.error("www-data user not found!");
            }
            Ok(())
        }
        DiagnosticsCommands::Permissions { path } => {
            let report = diagnostics::check_permissions(&path).await?;
            out.status(&format!("Checking: {}", report.path));
            out.status(&format!(
                "  owner: {}",
                report.owner.as_deref().unwrap_or("unknown")
            ));
            out.status(&format!(
                "  mode:  {}",
                report.mode.as_deref().unwrap_or("unknown")
            ));
            match report.warning {
                Some(warning) => out.warning(&warning),
                None => out.success("Permissions look normal"),
            }
            Ok(())
        }
        DiagnosticsCommands::Ports => {
            out.status(&format!("{:<7} {:<16} {}", "Port", "Expected", "Held by"));
            out.status(&format!("{:-<40}", ""));
            for (port, label, holder) in diagnostics::well_known_ports().await {
                let held = holder.unwrap_or_else(|| "\x1b[2m(free)\x1b[0m".to_string());
                out.status(&format!("{:<7} {:<16} {}", port, label, held));
            }
            Ok(())
        }
        DiagnosticsCommands::Issues { fix } => {
            out.status("Checking for common problems...");
            let issues = diagnostics::find_common_issues().await;
            out.blank();
            if issues.is_empty() {
                out.success("No common issues detected");
                return Ok(());
            }
            for issue in &issues {
                out.warning(&issue.description);
                match (&issue.fix, fix) {
                    (Some(f), true) => match diagnostics::apply_fix(f).await {
                        Ok(done) => out.success(&format!("  fixed: {}", done)),
                        Err(e) => out.error(&format!("  fix failed: {}", e)),
                    },
                    (Some(f), false) => {
                        out.status(&format!("  would fix with: {}", f.describe()));
                    }
                    (None, _) => out.status("  no scripted fix available"),
                }
            }
            if !fix {
                out.blank();
                out.status("Apply the fixes with: forge diagnostics issues --fix");
            }
            Ok(())
        }
    }
}
