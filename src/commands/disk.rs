use crate::cli::DiskCommands;
use crate::output::UserOutput;
use forge::monitor::format_bytes;
use forge::{disk, monitor, shell, Error};

pub async fn run_disk(command: DiskCommands, out: &dyn UserOutput) -> anyhow::Result<()> {
    match command {
        DiskCommands::Overview => overview(out).await,
        DiskCommands::Analyze { path } => {
            out.status(&format!("Analyzing {}...", path));
            let sizes = disk::directory_sizes(&path).await?;
            if sizes.is_empty() {
                out.warning("Nothing measurable found.");
                return Ok(());
            }
            for entry in sizes.iter().take(20) {
                out.status(&format!(
                    "{:>10}  {}",
                    format_bytes(entry.kilobytes * 1024),
                    entry.path
                ));
            }
            Ok(())
        }
        DiskCommands::Cleanup { deep, docker, yes } => {
            let tasks = if deep {
                disk::deep_cleanup_tasks(docker)
            } else {
                disk::quick_cleanup_tasks()
            };

            out.status("Cleanup will run:");
            for task in &tasks {
                out.status(&format!("  • {}", task.description));
            }

            let savings_kb = disk::estimate_quick_savings().await;
            if savings_kb > 0 {
                out.blank();
                out.status(&format!(
                    "Estimated savings: ~{}",
                    format_bytes(savings_kb * 1024)
                ));
            }

            if !yes {
                return Err(Error::NeedsConfirmation("running disk cleanup".to_string()).into());
            }

            out.blank();
            for task in &tasks {
                out.progress(&format!("{}... ", task.description));
                match disk::run_task(task).await {
                    Ok(()) => out.finish_progress("done"),
                    Err(e) => {
                        out.finish_progress("failed");
                        tracing::warn!("cleanup task failed: {}", e);
                    }
                }
            }
            out.success("Cleanup complete");
            Ok(())
        }
        DiskCommands::LargeFiles {
            path,
            min_mb,
            limit,
        } => {
            out.status(&format!("Files over {}MB under {}:", min_mb, path));
            let files = disk::large_files(&path, min_mb, limit).await?;
            if files.is_empty() {
                out.success("None found");
                return Ok(());
            }
            for file in files {
                out.status(&format!("{:>10}  {}", format_bytes(file.bytes), file.path));
            }
            Ok(())
        }
        DiskCommands::OldFiles { path, days, limit } => {
            out.status(&format!("Files untouched for {} days under {}:", days, path));
            let files = disk::old_files(&path, days, limit).await?;
            if files.is_empty() {
                out.success("None found");
                return Ok(());
            }
            for file in files {
                out.status(&format!("{:>10}  {}", format_bytes(file.bytes), file.path));
            }
            Ok(())
        }
    }
}

async fn overview(out: &dyn UserOutput) -> anyhow::Result<()> {
    let disks = monitor::all_disk_usage().await?;
    out.status(&format!(
        "{:<20} {:>7} {:>7} {:>7} {:>6}  {}",
        "Filesystem", "Size", "Used", "Avail", "Use%", "Mount"
    ));
    out.status(&format!("{:-<64}", ""));
    let mut warnings = Vec::new();
    for usage in &disks {
        let pct = if usage.percent >= 90.0 {
            format!("\x1b[31m{:>5.0}%\x1b[0m", usage.percent)
        } else if usage.percent >= 75.0 {
            format!("\x1b[33m{:>5.0}%\x1b[0m", usage.percent)
        } else {
            format!("\x1b[32m{:>5.0}%\x1b[0m", usage.percent)
        };
        out.status(&format!(
            "{:<20} {:>7} {:>7} {:>7} {}  {}",
            usage.filesystem, usage.size, usage.used, usage.available, pct, usage.mount
        ));
        if usage.percent >= 90.0 {
            warnings.push(format!("CRITICAL: {} is {:.0}% full!", usage.mount, usage.percent));
        } else if usage.percent >= 80.0 {
            warnings.push(format!("{} is {:.0}% full", usage.mount, usage.percent));
        }
    }

    // Swap
    out.blank();
    let swap = monitor::swap_usage().await;
    if swap.total_bytes == 0 {
        out.warning("No swap configured");
    } else {
        out.status(&format!(
            "Swap: {} ({:.1}%)",
            swap.summary(),
            swap.percent
        ));
    }

    // Inodes, best effort
    if let Ok(inode_out) = shell::run("df", &["-i", "-P", "/"]).await {
        if inode_out.success() {
            out.blank();
            out.status("Inodes (root):");
            out.status(&inode_out.stdout);
        }
    }

    if !warnings.is_empty() {
        out.blank();
        for warning in warnings {
            out.warning(&warning);
        }
    }
    Ok(())
}
