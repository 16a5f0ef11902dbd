use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "forge")]
#[command(about = "Ubuntu server administration: sites, SSL, services, monitoring")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Running without a subcommand opens the interactive menu.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show installed server software and versions
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Install server software
    Install {
        /// Packages to install (e.g. nginx php8.3 redis certbot)
        packages: Vec<String>,
        /// List installable packages
        #[arg(long)]
        list: bool,
    },
    /// Manage nginx sites
    #[command(subcommand)]
    Sites(SitesCommands),
    /// Manage Let's Encrypt certificates
    #[command(subcommand)]
    Ssl(SslCommands),
    /// Manage systemd services
    #[command(subcommand)]
    Service(ServiceCommands),
    /// View server logs
    #[command(subcommand)]
    Logs(LogsCommands),
    /// System resource monitoring
    #[command(subcommand)]
    Monitor(MonitorCommands),
    /// Metric thresholds, alerts and history
    #[command(subcommand)]
    Alerts(AlertsCommands),
    /// Troubleshooting probes and auto-fixes
    #[command(subcommand)]
    Diagnostics(DiagnosticsCommands),
    /// Disk usage and cleanup
    #[command(subcommand)]
    Disk(DiskCommands),
    /// Security update scanning
    #[command(subcommand)]
    Cve(CveCommands),
    /// Crontab management
    #[command(subcommand)]
    Cron(CronCommands),
    /// Show the recorded state change history
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Filter by site domain or PHP version
        #[arg(long)]
        entity: Option<String>,
        /// Full grouped report instead of the recent list
        #[arg(long)]
        report: bool,
    },
    /// Launch the interactive menu
    Tui,
    /// Generate shell completions
    Completions {
        #[arg(value_name = "SHELL")]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum SitesCommands {
    /// List sites with status, SSL and type
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a site from a hardened template
    Create {
        /// Domain name (e.g. example.com)
        domain: String,
        /// Site kind: nextjs, nuxt, php or static
        #[arg(short, long)]
        kind: String,
        /// Backend port for proxy kinds
        #[arg(short, long)]
        port: Option<u16>,
        /// Document root for php/static kinds
        #[arg(long)]
        document_root: Option<PathBuf>,
        /// PHP-FPM version for php kinds
        #[arg(long)]
        php_version: Option<String>,
        /// Do not answer for www.<domain>
        #[arg(long)]
        no_www: bool,
        /// client_max_body_size value
        #[arg(long, default_value = "100M")]
        max_body_size: String,
        /// Print the rendered vhost without creating anything
        #[arg(long)]
        dry_run: bool,
        /// Provision a Let's Encrypt certificate after creation
        #[arg(long)]
        ssl: bool,
    },
    /// Delete a site's vhost (keeps the document root and certificates)
    Delete {
        domain: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Enable or disable a site
    Toggle { domain: String },
    /// Print a site's nginx configuration
    Show { domain: String },
    /// DNS/HTTP/HTTPS/certificate health check
    Health { domain: String },
    /// Provision SSL for an existing site
    Ssl {
        domain: String,
        /// Do not include www.<domain> on the certificate
        #[arg(long)]
        no_www: bool,
    },
}

#[derive(Subcommand)]
pub enum SslCommands {
    /// Provision a certificate via the nginx plugin
    Provision {
        domain: String,
        /// Do not include www.<domain>
        #[arg(long)]
        no_www: bool,
        /// Print manual DNS-challenge instructions instead
        #[arg(long)]
        dns: bool,
    },
    /// List installed certificates
    List,
    /// Renew all certificates
    Renew,
    /// Revoke and delete a certificate
    Revoke {
        domain: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ServiceCommands {
    /// Status table of all known installed services
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a service
    Start { unit: String },
    /// Stop a service
    Stop {
        unit: String,
        /// Skip the critical-service confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Restart a service
    Restart { unit: String },
    /// Reload a service's configuration
    Reload { unit: String },
    /// Enable a service on boot
    Enable { unit: String },
    /// Disable a service on boot
    Disable { unit: String },
    /// Restart every running service in a category (web, php, database, ...)
    RestartCategory { category: String },
    /// Recent journal lines for a unit
    Logs {
        unit: String,
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
    /// Search all systemd units by name
    Find { pattern: String },
}

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Nginx access log
    Access {
        #[arg(short = 'n', long)]
        lines: Option<usize>,
        /// Stream new lines until interrupted
        #[arg(short, long)]
        follow: bool,
    },
    /// Nginx error log
    Errors {
        #[arg(short = 'n', long)]
        lines: Option<usize>,
        #[arg(short, long)]
        follow: bool,
    },
    /// Per-site access or error log
    Site {
        domain: String,
        /// Error log instead of access log
        #[arg(long)]
        error: bool,
        #[arg(short = 'n', long)]
        lines: Option<usize>,
        #[arg(short, long)]
        follow: bool,
    },
    /// Search a log file
    Search {
        pattern: String,
        /// Search the error log instead of the access log
        #[arg(long)]
        error: bool,
        #[arg(short = 'n', long, default_value = "100")]
        lines: usize,
    },
    /// Error counts by level with the most frequent messages
    Summary {
        #[arg(short = 'n', long, default_value = "500")]
        lines: usize,
    },
}

#[derive(Subcommand)]
pub enum MonitorCommands {
    /// CPU, memory, disk, load and uptime
    Overview,
    /// Listening TCP ports
    Ports,
    /// Public and local addresses
    Network,
}

#[derive(Subcommand)]
pub enum AlertsCommands {
    /// Current metrics against thresholds
    Status,
    /// Take one snapshot, append to history, raise alerts (cron target)
    Record,
    /// Active (unacknowledged) alerts
    Show,
    /// Recorded metric history
    History {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Acknowledge all active alerts
    Ack,
    /// Show or change thresholds (e.g. --set cpu_warning=80)
    Thresholds {
        /// key=value pairs to change
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
    /// Install the metrics-collection cron entry
    SetupCron {
        /// Collection interval in minutes
        #[arg(long, default_value = "5")]
        minutes: u32,
    },
    /// Clear the metric history
    ClearHistory {
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum DiagnosticsCommands {
    /// Test the nginx configuration with suggested fixes
    Nginx,
    /// PHP-FPM services and sockets
    Php,
    /// Ownership and mode of a path
    Permissions {
        #[arg(default_value = "/var/www")]
        path: String,
    },
    /// Who holds the well-known ports
    Ports,
    /// Scripted checks for common problems
    Issues {
        /// Apply the suggested fixes
        #[arg(long)]
        fix: bool,
    },
}

#[derive(Subcommand)]
pub enum DiskCommands {
    /// Filesystem, inode and swap usage
    Overview,
    /// Largest immediate subdirectories of a path
    Analyze {
        #[arg(default_value = "/var")]
        path: String,
    },
    /// Run the cleanup recipe
    Cleanup {
        /// Also purge kernels, vacuum the journal, remove rotated logs
        #[arg(long)]
        deep: bool,
        /// Include `docker system prune -af` in deep mode
        #[arg(long)]
        docker: bool,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Files over a size threshold
    LargeFiles {
        #[arg(default_value = "/var")]
        path: String,
        #[arg(long, default_value = "100")]
        min_mb: u64,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Files untouched for N days
    OldFiles {
        #[arg(default_value = "/var/log")]
        path: String,
        #[arg(long, default_value = "90")]
        days: u32,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum CveCommands {
    /// Scan system packages and web-root projects
    Scan {
        /// Where application projects live
        #[arg(long, default_value = "/var/www")]
        web_root: PathBuf,
    },
    /// Show the last scan report
    Show,
}

#[derive(Subcommand)]
pub enum CronCommands {
    /// List crontab entries with readable schedules
    List,
    /// Add an entry (quote the schedule: forge cron add "*/5 * * * *" -- cmd)
    Add {
        /// Five-field cron schedule
        schedule: String,
        /// Command to run
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
    /// Remove entries whose command matches a pattern
    Remove {
        pattern: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Install a canned job: ssl-renew, monitoring or cleanup
    Setup {
        job: String,
        /// Interval in minutes (monitoring job only)
        #[arg(long, default_value = "5")]
        minutes: u32,
    },
}
