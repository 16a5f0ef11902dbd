use crate::cli::MonitorCommands;
use crate::output::UserOutput;
use forge::{monitor, net, systemd};

pub async fn run_monitor(command: MonitorCommands, out: &dyn UserOutput) -> anyhow::Result<()> {
    match command {
        MonitorCommands::Overview => overview(out).await,
        MonitorCommands::Ports => ports(out).await,
        MonitorCommands::Network => network(out).await,
    }
}

async fn overview(out: &dyn UserOutput) -> anyhow::Result<()> {
    out.status("System Overview");
    out.blank();

    let cpu = monitor::cpu_usage().await;
    out.status(&format!(
        "CPU:      {} {:>5.1}%",
        monitor::progress_bar(cpu, 100.0, 20),
        cpu
    ));

    let memory = monitor::memory_usage().await;
    out.status(&format!(
        "Memory:   {} {:>5.1}% ({})",
        monitor::progress_bar(memory.percent, 100.0, 20),
        memory.percent,
        memory.summary()
    ));

    let disk = monitor::root_disk_usage().await;
    out.status(&format!(
        "Disk:     {} {:>5.1}% ({}/{})",
        monitor::progress_bar(disk.percent, 100.0, 20),
        disk.percent,
        disk.used,
        disk.size
    ));

    let swap = monitor::swap_usage().await;
    if swap.total_bytes > 0 {
        out.status(&format!(
            "Swap:     {} {:>5.1}% ({})",
            monitor::progress_bar(swap.percent, 100.0, 20),
            swap.percent,
            swap.summary()
        ));
    }

    out.blank();
    if let Some(load) = monitor::load_average().await {
        out.status(&format!(
            "Load avg: {:.2} / {:.2} / {:.2}  ({} cpus)",
            load.one,
            load.five,
            load.fifteen,
            monitor::cpu_count()
        ));
    }
    if let Some(uptime) = monitor::uptime().await {
        out.status(&format!("Uptime:   {}", uptime));
    }

    // Quick service pulse, like the original overview
    out.blank();
    out.status("Services:");
    for unit in ["nginx", "php8.3-fpm", "redis-server", "mysql", "postgresql"] {
        if !systemd::unit_exists(unit).await {
            continue;
        }
        let state = systemd::unit_state(unit).await;
        out.status(&format!("  {} {}", state.icon(), unit));
    }
    Ok(())
}

async fn ports(out: &dyn UserOutput) -> anyhow::Result<()> {
    let listening = monitor::listening_ports().await?;
    if listening.is_empty() {
        out.warning("No listening sockets found (is `ss` available?)");
        return Ok(());
    }
    out.status(&format!("{:<8} {:<24} {:<7} {}", "Proto", "Address", "Port", "Process"));
    out.status(&format!("{:-<56}", ""));
    for port in listening {
        out.status(&format!(
            "{:<8} {:<24} {:<7} {}",
            port.proto,
            port.address,
            port.port,
            port.process.as_deref().unwrap_or("-")
        ));
    }
    Ok(())
}

async fn network(out: &dyn UserOutput) -> anyhow::Result<()> {
    out.status("Fetching public IP...");
    match net::public_ip().await {
        Some(ip) => out.status(&format!("Public IP: {}", ip)),
        None => out.warning("Public IP: unable to detect"),
    }

    out.blank();
    out.status("Local addresses:");
    let ips = net::local_ips().await?;
    if ips.is_empty() {
        out.warning("  none found");
    }
    for (interface, address) in ips {
        out.status(&format!("  {:<12} {}", interface, address));
    }
    Ok(())
}
