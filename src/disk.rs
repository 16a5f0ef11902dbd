//! Disk usage analysis and cleanup recipes.

use crate::error::Result;
use crate::shell;

/// One cleanup action: a description and the shell line that does it.
#[derive(Debug, Clone)]
pub struct CleanupTask {
    pub description: &'static str,
    pub command: &'static str,
}

/// Safe cleanups: package cache, old temp files, rotated logs.
pub fn quick_cleanup_tasks() -> Vec<CleanupTask> {
    vec![
        CleanupTask {
            description: "Cleaning APT package cache",
            command: "sudo apt-get clean",
        },
        CleanupTask {
            description: "Removing unused packages and old kernels",
            command: "sudo apt-get autoremove -y",
        },
        CleanupTask {
            description: "Removing /tmp files untouched for 7 days",
            command: "sudo find /tmp -type f -atime +7 -delete",
        },
        CleanupTask {
            description: "Removing /var/tmp files untouched for 7 days",
            command: "sudo find /var/tmp -type f -atime +7 -delete",
        },
        CleanupTask {
            description: "Removing compressed logs older than 30 days",
            command: "sudo find /var/log -name '*.gz' -mtime +30 -delete",
        },
    ]
}

/// Quick cleanup plus purged kernels, journal vacuum, and (optionally)
/// a full docker prune.
pub fn deep_cleanup_tasks(include_docker: bool) -> Vec<CleanupTask> {
    let mut tasks = quick_cleanup_tasks();
    tasks.push(CleanupTask {
        description: "Purging removed packages' config files",
        command: "sudo apt-get autoremove --purge -y",
    });
    tasks.push(CleanupTask {
        description: "Vacuuming journal to 7 days",
        command: "sudo journalctl --vacuum-time=7d",
    });
    tasks.push(CleanupTask {
        description: "Removing rotated logs older than 7 days",
        command: "sudo find /var/log -name '*.1' -mtime +7 -delete",
    });
    if include_docker {
        tasks.push(CleanupTask {
            description: "Pruning unused docker data",
            command: "sudo docker system prune -af",
        });
    }
    tasks
}

/// Run one cleanup task; failures surface as command errors.
pub async fn run_task(task: &CleanupTask) -> Result<()> {
    shell::run_shell(task.command)
        .await?
        .into_checked(task.command)?;
    Ok(())
}

/// Rough estimate (in KB) of what quick cleanup would reclaim.
pub async fn estimate_quick_savings() -> u64 {
    let mut total_kb = 0u64;
    if let Some(out) =
        shell::output_of("sudo", &["du", "-sk", "/var/cache/apt/archives"]).await
    {
        total_kb += first_number(&out);
    }
    if let Ok(out) = shell::run_shell(
        "sudo find /var/log -name '*.gz' -mtime +30 -print0 2>/dev/null | xargs -0 -r du -ck | tail -1",
    )
    .await
    {
        total_kb += first_number(&out.stdout);
    }
    total_kb
}

fn first_number(text: &str) -> u64 {
    text.split_whitespace()
        .next()
        .and_then(|t| t.parse().ok())
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct DirSize {
    pub path: String,
    pub kilobytes: u64,
}

/// Immediate subdirectory sizes under a path, largest first.
pub async fn directory_sizes(path: &str) -> Result<Vec<DirSize>> {
    let out = shell::run_sudo("du", &["-xk", "--max-depth=1", path]).await?;
    // du exits non-zero on permission errors while still printing
    // everything it could measure; use what we got.
    let mut sizes = parse_du(&out.stdout, path);
    sizes.sort_by(|a, b| b.kilobytes.cmp(&a.kilobytes));
    Ok(sizes)
}

/// Parse `du -k` output, dropping the totals row for the root path.
pub fn parse_du(text: &str, root: &str) -> Vec<DirSize> {
    text.lines()
        .filter_map(|line| {
            let (size, path) = line.split_once('\t').or_else(|| line.split_once(' '))?;
            let kilobytes = size.trim().parse().ok()?;
            let path = path.trim();
            if path == root {
                return None;
            }
            Some(DirSize {
                path: path.to_string(),
                kilobytes,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct FoundFile {
    pub path: String,
    pub bytes: u64,
}

/// Files over `min_mb` under a path, largest first, at most `limit`.
pub async fn large_files(path: &str, min_mb: u64, limit: usize) -> Result<Vec<FoundFile>> {
    let size_arg = format!("+{}M", min_mb);
    let out = shell::run_sudo(
        "find",
        &[path, "-xdev", "-type", "f", "-size", &size_arg, "-printf", "%s %p\\n"],
    )
    .await?;
    let mut files = parse_find_sizes(&out.stdout);
    files.sort_by(|a, b| b.bytes.cmp(&a.bytes));
    files.truncate(limit);
    Ok(files)
}

/// Files untouched for `days` under a path, at most `limit`.
pub async fn old_files(path: &str, days: u32, limit: usize) -> Result<Vec<FoundFile>> {
    let age_arg = format!("+{}", days);
    let out = shell::run_sudo(
        "find",
        &[path, "-xdev", "-type", "f", "-mtime", &age_arg, "-printf", "%s %p\\n"],
    )
    .await?;
    let mut files = parse_find_sizes(&out.stdout);
    files.truncate(limit);
    Ok(files)
}

pub fn parse_find_sizes(text: &str) -> Vec<FoundFile> {
    text.lines()
        .filter_map(|line| {
            let (size, path) = line.split_once(' ')?;
            Some(FoundFile {
                bytes: size.parse().ok()?,
                path: path.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn du_output_drops_root_total() {
        let text = "1024\t/var/www/a\n2048\t/var/www/b\n3072\t/var/www\n";
        let sizes = parse_du(text, "/var/www");
        assert_eq!(sizes.len(), 2);
        assert!(sizes.iter().all(|s| s.path != "/var/www"));
    }

    #[test]
    fn find_sizes_parse_paths_with_spaces() {
        let text = "1048576 /var/log/big file.log\n2097152 /var/log/other.log\n";
        let files = parse_find_sizes(text);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "/var/log/big file.log");
        assert_eq!(files[0].bytes, 1_048_576);
    }

    #[test]
    fn deep_cleanup_includes_quick_tasks() {
        let quick = quick_cleanup_tasks();
        let deep = deep_cleanup_tasks(false);
        assert!(deep.len() > quick.len());
        assert!(deep.iter().any(|t| t.command.contains("journalctl")));
        assert!(!deep.iter().any(|t| t.command.contains("docker")));
        assert!(deep_cleanup_tasks(true)
            .iter()
            .any(|t| t.command.contains("docker system prune")));
    }
}
