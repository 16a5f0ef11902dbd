mod alerts;
mod cron;
mod cve;
mod diagnostics;
mod disk;
mod history;
mod install;
mod logs;
mod monitor;
mod service;
mod sites;
mod ssl;
mod status;
mod tui;

pub use alerts::run_alerts;
pub use cron::run_cron;
pub use cve::run_cve;
pub use diagnostics::run_diagnostics;
pub use disk::run_disk;
pub use history::run_history;
pub use install::run_install;
pub use logs::run_logs;
pub use monitor::run_monitor;
pub use service::run_service;
pub use sites::run_sites;
pub use ssl::run_ssl;
pub use status::run_status;
pub use tui::run_tui;
