//! Log viewing: tail, follow, search, and error summaries.
//!
//! Reading goes through `sudo tail`/`sudo grep` because nginx logs are
//! root-owned. Follow mode streams a `tail -f` child line-by-line through
//! a channel; the child is killed when the follower is dropped.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::shell;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

/// Severity levels found in nginx/syslog-style error lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Notice,
    Info,
    Debug,
}

impl LogLevel {
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Notice => "notice",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Well-known log locations.
pub fn nginx_access_path(config: &Config) -> PathBuf {
    config.nginx_log_dir.join("access.log")
}

pub fn nginx_error_path(config: &Config) -> PathBuf {
    config.nginx_log_dir.join("error.log")
}

pub fn site_log_path(config: &Config, domain: &str, error: bool) -> PathBuf {
    let suffix = if error { "error" } else { "access" };
    config
        .nginx_log_dir
        .join(format!("{}.{}.log", domain, suffix))
}

/// Last `lines` lines of a file, via `sudo tail`.
pub async fn tail(path: &Path, lines: usize) -> Result<Vec<String>> {
    let path_str = path.display().to_string();
    let out = shell::run_sudo("tail", &["-n", &lines.to_string(), &path_str]).await?;
    if !out.success() {
        if out.stderr.contains("No such file") {
            return Err(Error::LogNotFound(path_str));
        }
        return Err(Error::CommandFailed {
            command: format!("sudo tail -n {} {}", lines, path_str),
            code: out.code,
            stderr: out.stderr,
        });
    }
    Ok(out.stdout.lines().map(String::from).collect())
}

/// Case-insensitive search, newest `limit` matches.
pub async fn search(path: &Path, pattern: &str, limit: usize) -> Result<Vec<String>> {
    let path_str = path.display().to_string();
    let out = shell::run_sudo("grep", &["-i", "--", pattern, &path_str]).await?;
    // grep exits 1 on no matches; that's an empty result, not a failure
    if out.code > 1 {
        if out.stderr.contains("No such file") {
            return Err(Error::LogNotFound(path_str));
        }
        return Err(Error::CommandFailed {
            command: format!("sudo grep -i {} {}", pattern, path_str),
            code: out.code,
            stderr: out.stderr,
        });
    }
    let matches: Vec<String> = out.stdout.lines().map(String::from).collect();
    let skip = matches.len().saturating_sub(limit);
    Ok(matches.into_iter().skip(skip).collect())
}

/// A running `tail -f` whose lines arrive over a channel.
pub struct Follower {
    child: Child,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Follower {
    pub async fn next_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub async fn stop(mut self) {
        self.child.kill().await.ok();
    }
}

/// Start following a log file. The child also has `kill_on_drop` set, so
/// dropping the follower cannot leak a tail process.
pub fn follow(path: &Path) -> Result<Follower> {
    let path_str = path.display().to_string();
    let mut child = shell::spawn_piped("sudo", &["tail", "-n", "0", "-F", &path_str])?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Parse("tail child had no stdout".to_string()))?;

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    Ok(Follower { child, rx })
}

// ── Classification ──────────────────────────────────────────────────

fn access_status_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Combined log format: the status code is the first field after the
    // quoted request.
    RE.get_or_init(|| Regex::new(r#""\s+(\d{3})\s"#).expect("static regex"))
}

/// HTTP status code of an access-log line, if it parses.
pub fn access_line_status(line: &str) -> Option<u16> {
    access_status_regex()
        .captures(line)
        .and_then(|c| c[1].parse().ok())
}

/// Severity of an error-log line, from its `[level]` tag.
pub fn error_line_level(line: &str) -> Option<LogLevel> {
    let lowered = line.to_lowercase();
    for (tag, level) in [
        ("[emerg]", LogLevel::Error),
        ("[alert]", LogLevel::Error),
        ("[crit]", LogLevel::Error),
        ("[error]", LogLevel::Error),
        ("[warn]", LogLevel::Warn),
        ("[notice]", LogLevel::Notice),
        ("[info]", LogLevel::Info),
        ("[debug]", LogLevel::Debug),
    ] {
        if lowered.contains(tag) {
            return Some(level);
        }
    }
    None
}

/// ANSI-colorize an access line by status class.
pub fn colorize_access(line: &str) -> String {
    match access_line_status(line) {
        Some(status) if status >= 500 => format!("\x1b[31;1m{}\x1b[0m", line),
        Some(status) if status >= 400 => format!("\x1b[33m{}\x1b[0m", line),
        Some(status) if status >= 300 => format!("\x1b[36m{}\x1b[0m", line),
        Some(_) => line.to_string(),
        None => format!("\x1b[2m{}\x1b[0m", line),
    }
}

/// ANSI-colorize an error line by level.
pub fn colorize_error(line: &str) -> String {
    match error_line_level(line) {
        Some(LogLevel::Error) => format!("\x1b[31;1m{}\x1b[0m", line),
        Some(LogLevel::Warn) => format!("\x1b[33m{}\x1b[0m", line),
        Some(LogLevel::Notice) => format!("\x1b[36m{}\x1b[0m", line),
        Some(LogLevel::Info) => format!("\x1b[34m{}\x1b[0m", line),
        Some(LogLevel::Debug) | None => format!("\x1b[2m{}\x1b[0m", line),
    }
}

// ── Summaries ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ErrorSummary {
    pub total: usize,
    pub by_level: HashMap<LogLevel, usize>,
    /// Most frequent messages (timestamp stripped), with counts.
    pub top_messages: Vec<(String, usize)>,
}

/// Strip the `YYYY/MM/DD HH:MM:SS [level] pid#tid: *conn` prefix so
/// identical errors from different times and connections aggregate.
fn strip_error_prefix(line: &str) -> &str {
    let rest = match line.find(']') {
        Some(idx) => &line[idx + 1..],
        None => line,
    };
    // "1234#0: *56 message" -> "*56 message" -> "message"
    let rest = match rest.find(": ") {
        Some(idx) => &rest[idx + 2..],
        None => rest.trim_start(),
    };
    if let Some(conn) = rest.strip_prefix('*') {
        if let Some(space) = conn.find(' ') {
            if conn[..space].chars().all(|c| c.is_ascii_digit()) {
                return conn[space + 1..].trim_start();
            }
        }
    }
    rest
}

pub fn summarize_errors(lines: &[String]) -> ErrorSummary {
    let mut summary = ErrorSummary::default();
    let mut message_counts: HashMap<String, usize> = HashMap::new();

    for line in lines {
        let Some(level) = error_line_level(line) else {
            continue;
        };
        summary.total += 1;
        *summary.by_level.entry(level).or_default() += 1;
        if level <= LogLevel::Warn {
            let message = strip_error_prefix(line).to_string();
            *message_counts.entry(message).or_default() += 1;
        }
    }

    let mut messages: Vec<(String, usize)> = message_counts.into_iter().collect();
    messages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    messages.truncate(5);
    summary.top_messages = messages;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_OK: &str = r#"203.0.113.9 - - [31/Jan/2024:10:00:00 +0000] "GET / HTTP/1.1" 200 612 "-" "curl/8.0""#;
    const ACCESS_404: &str = r#"203.0.113.9 - - [31/Jan/2024:10:00:01 +0000] "GET /missing HTTP/1.1" 404 153 "-" "curl/8.0""#;
    const ACCESS_500: &str = r#"203.0.113.9 - - [31/Jan/2024:10:00:02 +0000] "POST /api HTTP/1.1" 502 559 "-" "curl/8.0""#;

    #[test]
    fn access_status_extraction() {
        assert_eq!(access_line_status(ACCESS_OK), Some(200));
        assert_eq!(access_line_status(ACCESS_404), Some(404));
        assert_eq!(access_line_status(ACCESS_500), Some(502));
        assert_eq!(access_line_status("garbage line"), None);
    }

    #[test]
    fn error_level_detection() {
        let line = "2024/01/31 10:00:00 [error] 1234#0: *1 connect() failed";
        assert_eq!(error_line_level(line), Some(LogLevel::Error));
        let line = "2024/01/31 10:00:00 [warn] 1234#0: low ulimit";
        assert_eq!(error_line_level(line), Some(LogLevel::Warn));
        assert_eq!(error_line_level("no level here"), None);
    }

    #[test]
    fn colorized_access_lines_keep_content() {
        let colored = colorize_access(ACCESS_500);
        assert!(colored.contains("POST /api"));
        assert!(colored.starts_with("\x1b[31;1m"));
    }

    #[test]
    fn error_summary_counts_and_aggregates() {
        let lines: Vec<String> = vec![
            "2024/01/31 10:00:00 [error] 11#0: *1 connect() failed while proxying".to_string(),
            "2024/01/31 10:05:00 [error] 11#0: *2 connect() failed while proxying".to_string(),
            "2024/01/31 10:06:00 [warn] 11#0: something minor".to_string(),
            "2024/01/31 10:07:00 [notice] 11#0: signal process started".to_string(),
            "not a log line".to_string(),
        ];
        let summary = summarize_errors(&lines);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.by_level[&LogLevel::Error], 2);
        assert_eq!(summary.by_level[&LogLevel::Warn], 1);
        // The repeated connect() failure aggregates despite timestamps
        assert_eq!(summary.top_messages[0].1, 2);
        assert!(summary.top_messages[0].0.contains("connect() failed"));
    }

    #[test]
    fn site_log_paths_follow_naming_scheme() {
        let config = Config::default();
        assert!(site_log_path(&config, "example.com", false)
            .ends_with("example.com.access.log"));
        assert!(site_log_path(&config, "example.com", true)
            .ends_with("example.com.error.log"));
    }
}
