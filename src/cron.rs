//! Crontab management.
//!
//! Entries are round-tripped through `crontab -l` / `crontab <file>`;
//! this module never edits system cron directories. Canned schedules
//! cover the periodic jobs this tool sets up for itself (certificate
//! renewal, metrics collection, disk cleanup).

use crate::error::{Error, Result};
use crate::shell;

/// Marker appended to entries this tool installs, so they can be listed
/// and removed without touching the user's own lines.
pub const MANAGED_TAG: &str = "# managed by forge";

#[derive(Debug, Clone, PartialEq)]
pub struct CronEntry {
    pub schedule: String,
    pub command: String,
    pub managed: bool,
}

impl CronEntry {
    pub fn line(&self) -> String {
        if self.managed {
            format!("{} {} {}", self.schedule, self.command, MANAGED_TAG)
        } else {
            format!("{} {}", self.schedule, self.command)
        }
    }
}

/// Preset schedules offered by the add menu.
pub fn preset_schedules() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Every 5 minutes", "*/5 * * * *"),
        ("Every 15 minutes", "*/15 * * * *"),
        ("Every hour", "0 * * * *"),
        ("Every day at 3am", "0 3 * * *"),
        ("Every Sunday at 4am", "0 4 * * 0"),
        ("First of the month", "0 2 1 * *"),
    ]
}

/// Five whitespace-separated fields of cron syntax. Field contents are
/// checked for charset, not full range semantics — cron itself is the
/// final validator.
pub fn validate_schedule(schedule: &str) -> Result<()> {
    let fields: Vec<&str> = schedule.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(Error::InvalidSchedule(schedule.to_string()));
    }
    for field in fields {
        let valid = field
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '*' | ',' | '-' | '/'));
        if !valid || field.is_empty() {
            return Err(Error::InvalidSchedule(schedule.to_string()));
        }
    }
    Ok(())
}

/// Parse `crontab -l` output into entries, skipping comments and
/// environment assignments.
pub fn parse_crontab(text: &str) -> Vec<CronEntry> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            // KEY=value environment lines
            if !trimmed.starts_with('@')
                && trimmed
                    .split_whitespace()
                    .next()?
                    .contains('=')
            {
                return None;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() < 6 {
                return None;
            }
            let schedule = fields[..5].join(" ");
            let rest = fields[5..].join(" ");
            let managed = rest.ends_with(MANAGED_TAG);
            let command = if managed {
                rest.trim_end_matches(MANAGED_TAG).trim_end().to_string()
            } else {
                rest
            };
            Some(CronEntry {
                schedule,
                command,
                managed,
            })
        })
        .collect()
}

/// Render a schedule as a sentence for the common patterns, falling back
/// to the raw fields.
pub fn schedule_to_human(schedule: &str) -> String {
    let fields: Vec<&str> = schedule.split_whitespace().collect();
    if fields.len() != 5 {
        return schedule.to_string();
    }
    let (minute, hour, dom, month, dow) = (fields[0], fields[1], fields[2], fields[3], fields[4]);

    match (minute, hour, dom, month, dow) {
        ("*", "*", "*", "*", "*") => "every minute".to_string(),
        (m, "*", "*", "*", "*") if m.starts_with("*/") => {
            format!("every {} minutes", &m[2..])
        }
        ("0", "*", "*", "*", "*") => "every hour".to_string(),
        ("0", h, "*", "*", "*") if h.starts_with("*/") => {
            format!("every {} hours", &h[2..])
        }
        (m, h, "*", "*", "*") if is_number(m) && is_number(h) => {
            format!("daily at {:0>2}:{:0>2}", h, m)
        }
        (m, h, "*", "*", d) if is_number(m) && is_number(h) && is_number(d) => {
            format!("every {} at {:0>2}:{:0>2}", weekday_name(d), h, m)
        }
        (m, h, dom, "*", "*") if is_number(m) && is_number(h) && is_number(dom) => {
            format!("monthly on day {} at {:0>2}:{:0>2}", dom, h, m)
        }
        _ => schedule.to_string(),
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn weekday_name(d: &str) -> &'static str {
    match d {
        "0" | "7" => "Sunday",
        "1" => "Monday",
        "2" => "Tuesday",
        "3" => "Wednesday",
        "4" => "Thursday",
        "5" => "Friday",
        "6" => "Saturday",
        _ => "day",
    }
}

/// Current user's crontab entries (empty when no crontab exists).
pub async fn list() -> Result<Vec<CronEntry>> {
    let out = shell::run("crontab", &["-l"]).await?;
    if !out.success() {
        // "no crontab for <user>" is an empty list, not an error
        if out.stderr.contains("no crontab") {
            return Ok(Vec::new());
        }
        return Err(Error::CommandFailed {
            command: "crontab -l".to_string(),
            code: out.code,
            stderr: out.stderr,
        });
    }
    Ok(parse_crontab(&out.stdout))
}

async fn install_lines(lines: &[String]) -> Result<()> {
    let temp = std::env::temp_dir().join(format!("forge-crontab-{}", std::process::id()));
    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    std::fs::write(&temp, content)?;
    let result = shell::run("crontab", &[&temp.display().to_string()])
        .await?
        .into_checked("crontab <file>");
    std::fs::remove_file(&temp).ok();
    result?;
    Ok(())
}

/// Append an entry to the current user's crontab.
pub async fn add(schedule: &str, command: &str, managed: bool) -> Result<()> {
    validate_schedule(schedule)?;
    let current = raw_lines().await?;
    let entry = CronEntry {
        schedule: schedule.to_string(),
        command: command.to_string(),
        managed,
    };
    let mut lines = current;
    lines.push(entry.line());
    install_lines(&lines).await
}

/// Remove every entry whose command contains `needle`. Returns how many
/// lines were removed.
pub async fn remove_matching(needle: &str) -> Result<usize> {
    let current = raw_lines().await?;
    let kept: Vec<String> = current
        .iter()
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return true;
            }
            !trimmed.contains(needle)
        })
        .cloned()
        .collect();
    let removed = current.len() - kept.len();
    if removed > 0 {
        install_lines(&kept).await?;
    }
    Ok(removed)
}

async fn raw_lines() -> Result<Vec<String>> {
    let out = shell::run("crontab", &["-l"]).await?;
    if !out.success() {
        return Ok(Vec::new());
    }
    Ok(out.stdout.lines().map(String::from).collect())
}

// ── Canned jobs ─────────────────────────────────────────────────────

fn forge_binary() -> String {
    std::env::current_exe()
        .ok()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "forge".to_string())
}

/// Nightly certificate renewal with an nginx reload on success.
pub fn ssl_renewal_entry() -> CronEntry {
    CronEntry {
        schedule: "0 3 * * *".to_string(),
        command: "sudo certbot renew --quiet --post-hook 'systemctl reload nginx'".to_string(),
        managed: true,
    }
}

/// Periodic metrics collection for the alerts history.
pub fn monitoring_entry(every_minutes: u32) -> CronEntry {
    CronEntry {
        schedule: format!("*/{} * * * *", every_minutes),
        command: format!("{} alerts record", forge_binary()),
        managed: true,
    }
}

/// Weekly disk cleanup.
pub fn cleanup_entry() -> CronEntry {
    CronEntry {
        schedule: "0 4 * * 0".to_string(),
        command: format!("{} disk cleanup --yes", forge_binary()),
        managed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_validation() {
        assert!(validate_schedule("*/5 * * * *").is_ok());
        assert!(validate_schedule("0 3 * * 0").is_ok());
        assert!(validate_schedule("0 3 * *").is_err());
        assert!(validate_schedule("a b c d e").is_err());
        assert!(validate_schedule("0 3 * * * extra").is_err());
    }

    #[test]
    fn crontab_parsing_skips_comments_and_env() {
        let text = "# m h dom mon dow command\n\
                    MAILTO=ops@example.com\n\
                    */5 * * * * /usr/local/bin/forge alerts record # managed by forge\n\
                    0 3 * * * certbot renew --quiet\n";
        let entries = parse_crontab(text);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].managed);
        assert_eq!(entries[0].schedule, "*/5 * * * *");
        assert_eq!(entries[0].command, "/usr/local/bin/forge alerts record");
        assert!(!entries[1].managed);
        assert_eq!(entries[1].command, "certbot renew --quiet");
    }

    #[test]
    fn entry_line_round_trips() {
        let entry = CronEntry {
            schedule: "0 4 * * 0".to_string(),
            command: "forge disk cleanup --yes".to_string(),
            managed: true,
        };
        let parsed = parse_crontab(&entry.line());
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0], entry);
    }

    #[test]
    fn human_schedules() {
        assert_eq!(schedule_to_human("* * * * *"), "every minute");
        assert_eq!(schedule_to_human("*/15 * * * *"), "every 15 minutes");
        assert_eq!(schedule_to_human("0 * * * *"), "every hour");
        assert_eq!(schedule_to_human("30 3 * * *"), "daily at 03:30");
        assert_eq!(schedule_to_human("0 4 * * 0"), "every Sunday at 04:00");
        assert_eq!(schedule_to_human("0 2 1 * *"), "monthly on day 1 at 02:00");
        // Unrecognized patterns fall back to the raw fields
        assert_eq!(schedule_to_human("1 2 3 4 5"), "1 2 3 4 5");
    }

    #[test]
    fn canned_entries_are_valid() {
        for entry in [ssl_renewal_entry(), monitoring_entry(5), cleanup_entry()] {
            assert!(validate_schedule(&entry.schedule).is_ok());
            assert!(entry.managed);
        }
    }
}
