use crate::cli::LogsCommands;
use crate::output::UserOutput;
use forge::{logs, Config};
use std::path::PathBuf;

pub async fn run_logs(
    command: LogsCommands,
    config: &Config,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    match command {
        LogsCommands::Access { lines, follow } => {
            let path = logs::nginx_access_path(config);
            view(&path, lines.unwrap_or(config.default_log_lines), follow, false, out).await
        }
        LogsCommands::Errors { lines, follow } => {
            let path = logs::nginx_error_path(config);
            view(&path, lines.unwrap_or(config.default_log_lines), follow, true, out).await
        }
        LogsCommands::Site {
            domain,
            error,
            lines,
            follow,
        } => {
            let path = logs::site_log_path(config, &domain, error);
            view(&path, lines.unwrap_or(config.default_log_lines), follow, error, out).await
        }
        LogsCommands::Search {
            pattern,
            error,
            lines,
        } => {
            let path = if error {
                logs::nginx_error_path(config)
            } else {
                logs::nginx_access_path(config)
            };
            let matches = logs::search(&path, &pattern, lines).await?;
            if matches.is_empty() {
                out.status(&format!("No matches for '{}'", pattern));
                return Ok(());
            }
            for line in &matches {
                out.status(&colorize(line, error));
            }
            out.blank();
            out.status(&format!("{} matching line(s)", matches.len()));
            Ok(())
        }
        LogsCommands::Summary { lines } => {
            let path = logs::nginx_error_path(config);
            let entries = logs::tail(&path, lines).await?;
            let summary = logs::summarize_errors(&entries);

            out.status(&format!(
                "Error summary over the last {} lines:",
                entries.len()
            ));
            out.blank();
            if summary.total == 0 {
                out.success("No leveled log entries found.");
                return Ok(());
            }
            let mut levels: Vec<_> = summary.by_level.iter().collect();
            levels.sort_by_key(|(level, _)| **level);
            for (level, count) in levels {
                out.status(&format!("  {:<8} {}", level.label(), count));
            }
            if !summary.top_messages.is_empty() {
                out.blank();
                out.status("Most frequent errors:");
                for (message, count) in &summary.top_messages {
                    out.status(&format!("  {:>4}× {}", count, message));
                }
            }
            Ok(())
        }
    }
}

fn colorize(line: &str, error_log: bool) -> String {
    if error_log {
        logs::colorize_error(line)
    } else {
        logs::colorize_access(line)
    }
}

async fn view(
    path: &PathBuf,
    lines: usize,
    follow: bool,
    error_log: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    for line in logs::tail(path, lines).await? {
        out.status(&colorize(&line, error_log));
    }

    if !follow {
        return Ok(());
    }

    out.blank();
    out.status(&format!(
        "Following {} (Ctrl+C to stop)...",
        path.display()
    ));
    let mut follower = logs::follow(path)?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                out.blank();
                out.status("Stopped following");
                break;
            }
            line = follower.next_line() => {
                match line {
                    Some(line) => out.status(&colorize(&line, error_log)),
                    None => break,
                }
            }
        }
    }
    follower.stop().await;
    Ok(())
}
