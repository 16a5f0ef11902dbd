use crate::cli::CronCommands;
use crate::output::UserOutput;
use forge::{cron, Error};

pub async fn run_cron(command: CronCommands, out: &dyn UserOutput) -> anyhow::Result<()> {
    match command {
        CronCommands::List => {
            let entries = cron::list().await?;
            if entries.is_empty() {
                out.warning("No crontab entries.");
                return Ok(());
            }
            out.status(&format!(
                "{:<16} {:<26} {}",
                "Schedule", "When", "Command"
            ));
            out.status(&format!("{:-<76}", ""));
            for entry in &entries {
                let tag = if entry.managed { " [forge]" } else { "" };
                out.status(&format!(
                    "{:<16} {:<26} {}{}",
                    entry.schedule,
                    cron::schedule_to_human(&entry.schedule),
                    entry.command,
                    tag
                ));
            }
            Ok(())
        }
        CronCommands::Add { schedule, command } => {
            let command = command.join(" ");
            cron::add(&schedule, &command, false).await?;
            out.success(&format!(
                "Added: {} ({}) — {}",
                schedule,
                cron::schedule_to_human(&schedule),
                command
            ));
            Ok(())
        }
        CronCommands::Remove { pattern, yes } => {
            if !yes {
                return Err(Error::NeedsConfirmation(format!(
                    "removing crontab entries matching '{}'",
                    pattern
                ))
                .into());
            }
            let removed = cron::remove_matching(&pattern).await?;
            if removed == 0 {
                out.warning(&format!("No entries matched '{}'", pattern));
            } else {
                out.success(&format!("Removed {} entr(y/ies)", removed));
            }
            Ok(())
        }
        CronCommands::Setup { job, minutes } => {
            let entry = match job.as_str() {
                "ssl-renew" => cron::ssl_renewal_entry(),
                "monitoring" => {
                    if !(1..=59).contains(&minutes) {
                        anyhow::bail!("interval must be between 1 and 59 minutes");
                    }
                    cron::monitoring_entry(minutes)
                }
                "cleanup" => cron::cleanup_entry(),
                other => anyhow::bail!(
                    "unknown job '{}' (expected ssl-renew, monitoring or cleanup)",
                    other
                ),
            };
            // Re-running setup replaces the previous entry for the job
            cron::remove_matching(essential_needle(&job)).await?;
            cron::add(&entry.schedule, &entry.command, true).await?;
            out.success(&format!(
                "Installed: {} ({}) — {}",
                entry.schedule,
                cron::schedule_to_human(&entry.schedule),
                entry.command
            ));
            Ok(())
        }
    }
}

/// The substring that identifies each canned job in an existing crontab.
fn essential_needle(job: &str) -> &str {
    match job {
        "ssl-renew" => "certbot renew",
        "monitoring" => "alerts record",
        _ => "disk cleanup",
    }
}
