use crate::cli::CveCommands;
use crate::output::UserOutput;
use forge::{cve, Config};
use std::path::PathBuf;

pub async fn run_cve(
    command: CveCommands,
    config: &Config,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    match command {
        CveCommands::Scan { web_root } => scan(config, &web_root, out).await,
        CveCommands::Show => {
            match cve::last_report(&config.cve_dir()) {
                Some(report) => print_report(&report, out),
                None => {
                    out.warning("No scan recorded yet. Run: forge cve scan");
                }
            }
            Ok(())
        }
    }
}

async fn scan(config: &Config, web_root: &PathBuf, out: &dyn UserOutput) -> anyhow::Result<()> {
    out.status("Scanning system packages for pending security updates...");
    let report = cve::full_scan(&config.cve_dir(), web_root).await?;
    print_report(&report, out);
    out.blank();
    out.status(&format!(
        "Report saved to {}",
        config.cve_dir().join("last_scan.json").display()
    ));
    Ok(())
}

fn print_report(report: &cve::ScanReport, out: &dyn UserOutput) {
    if let Some(ref ubuntu) = report.ubuntu {
        out.status(&format!(
            "Ubuntu {} — scanned {}",
            ubuntu,
            report.timestamp.format("%Y-%m-%d %H:%M")
        ));
    }
    out.blank();

    if report.system.is_empty() {
        out.success("No pending security updates for system packages");
    } else {
        out.warning(&format!(
            "{} package(s) with pending security updates:",
            report.system.len()
        ));
        for vuln in &report.system {
            out.status(&format!(
                "  {:<24} {} → {}   ({})",
                vuln.package,
                vuln.installed.as_deref().unwrap_or("?"),
                vuln.candidate.as_deref().unwrap_or("?"),
                vuln.pocket
            ));
        }
        out.blank();
        out.status("Apply them with: sudo apt-get upgrade");
    }

    out.blank();
    if report.apps.is_empty() {
        out.status("No application projects found to audit.");
    } else {
        for app in &report.apps {
            if app.total() == 0 {
                out.success(&format!("{} ({}): clean", app.project, app.tool));
            } else {
                let details: Vec<String> = app
                    .findings
                    .iter()
                    .map(|(severity, count)| format!("{} {}", count, severity))
                    .collect();
                out.warning(&format!(
                    "{} ({}): {}",
                    app.project,
                    app.tool,
                    details.join(", ")
                ));
            }
        }
    }
}
