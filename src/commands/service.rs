use crate::cli::ServiceCommands;
use crate::output::UserOutput;
use forge::systemd::{self, ServiceAction, UnitState};
use forge::Error;

pub async fn run_service(command: ServiceCommands, out: &dyn UserOutput) -> anyhow::Result<()> {
    match command {
        ServiceCommands::Status { json } => status(json, out).await,
        ServiceCommands::Start { unit } => act(&unit, ServiceAction::Start, out).await,
        ServiceCommands::Stop { unit, yes } => {
            if let Some(def) = systemd::find_service(&unit) {
                if def.critical && !yes {
                    return Err(Error::NeedsConfirmation(format!(
                        "stopping critical service '{}'",
                        def.label
                    ))
                    .into());
                }
            }
            act(&unit, ServiceAction::Stop, out).await
        }
        ServiceCommands::Restart { unit } => act(&unit, ServiceAction::Restart, out).await,
        ServiceCommands::Reload { unit } => act(&unit, ServiceAction::Reload, out).await,
        ServiceCommands::Enable { unit } => act(&unit, ServiceAction::Enable, out).await,
        ServiceCommands::Disable { unit } => act(&unit, ServiceAction::Disable, out).await,
        ServiceCommands::RestartCategory { category } => {
            let results = systemd::restart_category(&category).await;
            if results.is_empty() {
                out.warning(&format!(
                    "No running services in category '{}' (categories: web, php, database, cache, queue, mail, monitoring, security, ssl, system, docker)",
                    category
                ));
                return Ok(());
            }
            let mut failures = 0;
            for (unit, result) in results {
                match result {
                    Ok(()) => out.success(&format!("{} restarted", unit)),
                    Err(e) => {
                        failures += 1;
                        out.error(&format!("{}: {}", unit, e));
                    }
                }
            }
            if failures > 0 {
                anyhow::bail!("{} service(s) failed to restart", failures);
            }
            Ok(())
        }
        ServiceCommands::Logs { unit, lines } => {
            let output = systemd::journal(&unit, lines).await?;
            if output.trim().is_empty() {
                out.warning(&format!("No journal entries for {}", unit));
            } else {
                out.status(&output);
            }
            Ok(())
        }
        ServiceCommands::Find { pattern } => {
            let matches = systemd::search_units(&pattern).await?;
            if matches.is_empty() {
                out.warning(&format!("No units matching '{}'", pattern));
                return Ok(());
            }
            for (unit, state) in matches {
                out.status(&format!("  {:<40} {}", unit, state));
            }
            Ok(())
        }
    }
}

async fn act(unit: &str, action: ServiceAction, out: &dyn UserOutput) -> anyhow::Result<()> {
    out.status(&format!("{}ing {}...", capitalize(action.verb()), unit));
    systemd::apply(unit, action).await?;
    let new_state = systemd::unit_state(unit).await;
    out.success(&format!("{} {}ed (now: {})", unit, action.verb(), new_state));
    Ok(())
}

fn capitalize(verb: &str) -> String {
    let mut chars = verb.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

async fn status(json: bool, out: &dyn UserOutput) -> anyhow::Result<()> {
    let services = systemd::installed_services().await;

    if json {
        let value: Vec<serde_json::Value> = services
            .iter()
            .map(|s| {
                serde_json::json!({
                    "unit": s.unit,
                    "label": s.label,
                    "category": s.category,
                    "state": s.state,
                    "enabled": s.enabled,
                    "critical": s.critical,
                    "memory": s.memory,
                    "uptime": s.uptime,
                })
            })
            .collect();
        out.status(&serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if services.is_empty() {
        out.warning("No known services detected.");
        return Ok(());
    }

    out.status(&format!(
        "{:<22} {:<10} {:<10} {:<5} {:<10} {}",
        "Service", "Status", "State", "Boot", "Memory", "Uptime"
    ));
    out.status(&format!("{:-<72}", ""));
    for service in &services {
        let icon = match service.state {
            UnitState::Active => "\x1b[32m●\x1b[0m",
            UnitState::Inactive => "\x1b[2m○\x1b[0m",
            UnitState::Failed => "\x1b[31m✗\x1b[0m",
            UnitState::Unknown => "\x1b[33m?\x1b[0m",
        };
        let critical = if service.critical { "*" } else { " " };
        out.status(&format!(
            "{} {:<19}{} {:<10} {:<10} {:<5} {:<10} {}",
            icon,
            service.label,
            critical,
            service.state,
            service.substate.as_deref().unwrap_or("-"),
            if service.enabled { "✓" } else { "-" },
            service.memory.as_deref().unwrap_or("-"),
            service.uptime.as_deref().unwrap_or("-"),
        ));
    }

    let running = services
        .iter()
        .filter(|s| s.state == UnitState::Active)
        .count();
    let failed = services
        .iter()
        .filter(|s| s.state == UnitState::Failed)
        .count();
    let critical_down = services
        .iter()
        .filter(|s| s.critical && s.state != UnitState::Active)
        .count();

    out.blank();
    out.status(&format!(
        "Running: {} | Failed: {} | Total: {}   (* critical)",
        running,
        failed,
        services.len()
    ));
    if critical_down > 0 {
        out.warning(&format!("{} critical service(s) not running!", critical_down));
    }
    Ok(())
}
