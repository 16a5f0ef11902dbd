mod cli;
mod commands;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use forge::{Config, Error as ForgeError, SiteManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(forge_error) = e.downcast_ref::<ForgeError>() {
            eprintln!("Error: {}", forge_error);
            if let Some(suggestion) = forge_error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8, tui_mode: bool) {
    // Raw mode garbles stderr, so the TUI defaults to errors-only;
    // RUST_LOG still overrides either default.
    let default_level = if tui_mode {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .ok();
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let tui_mode = matches!(cli.command, None | Some(Commands::Tui));
    init_tracing(cli.verbose, tui_mode);

    let config = Config::load()?;
    let out = output::CliOutput;

    let Some(command) = cli.command else {
        return commands::run_tui(config).await;
    };

    match command {
        Commands::Status { json } => commands::run_status(json, &out).await,
        Commands::Install { packages, list } => {
            commands::run_install(packages, list, &config, &out).await
        }
        Commands::Sites(sites_command) => {
            let manager = SiteManager::new(config.clone());
            commands::run_sites(sites_command, &manager, &out).await
        }
        Commands::Ssl(ssl_command) => {
            let manager = SiteManager::new(config.clone());
            commands::run_ssl(ssl_command, &manager, &out).await
        }
        Commands::Service(service_command) => commands::run_service(service_command, &out).await,
        Commands::Logs(logs_command) => commands::run_logs(logs_command, &config, &out).await,
        Commands::Monitor(monitor_command) => commands::run_monitor(monitor_command, &out).await,
        Commands::Alerts(alerts_command) => {
            commands::run_alerts(alerts_command, &config, &out).await
        }
        Commands::Diagnostics(diagnostics_command) => {
            commands::run_diagnostics(diagnostics_command, &out).await
        }
        Commands::Disk(disk_command) => commands::run_disk(disk_command, &out).await,
        Commands::Cve(cve_command) => commands::run_cve(cve_command, &config, &out).await,
        Commands::Cron(cron_command) => commands::run_cron(cron_command, &out).await,
        Commands::History {
            limit,
            entity,
            report,
        } => commands::run_history(limit, entity, report, &config, &out),
        Commands::Tui => commands::run_tui(config).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}
