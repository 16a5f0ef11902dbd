use crate::output::UserOutput;
use forge::detect;

pub async fn run_status(json: bool, out: &dyn UserOutput) -> anyhow::Result<()> {
    let statuses = if json {
        detect::system_status().await
    } else {
        out.status("Scanning system...");
        out.blank();
        detect::system_status().await
    };

    if json {
        out.status(&serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    out.status("Server Software Status");
    out.status(&format!("{:-<64}", ""));
    out.status(&format!(
        "{:<16} {:<12} {:<12} {}",
        "Software", "Status", "Version", "Details"
    ));
    for status in &statuses {
        let (icon, label) = if status.installed {
            ("\x1b[32m●\x1b[0m", "Installed")
        } else {
            ("\x1b[2m○\x1b[0m", "Not Found")
        };
        out.status(&format!(
            "{:<14} {} {:<10} {:<12} {}",
            status.name,
            icon,
            label,
            status.version.as_deref().unwrap_or("-"),
            status.details.as_deref().unwrap_or(""),
        ));
    }
    out.blank();

    let installed = statuses.iter().filter(|s| s.installed).count();
    out.status(&format!(
        "{} of {} known tools installed",
        installed,
        statuses.len()
    ));
    Ok(())
}
