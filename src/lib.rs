//! # Forge
//!
//! Menu-driven Ubuntu server administration: provisioning, nginx sites,
//! Let's Encrypt certificates, systemd services, logs, monitoring, and
//! diagnostics — a thin, consistent layer over the tools an admin would
//! run by hand.
//!
//! ## Features
//!
//! - **Detection**: probe installed server software and versions
//! - **Provisioning**: scripted `apt`/`curl` recipes for the usual stack
//! - **Sites**: hardened nginx vhosts from templates, with an
//!   `nginx -t` gate and symlink rollback on broken configs
//! - **SSL**: certbot orchestration plus local certificate inspection
//! - **Services**: curated systemd catalogue with lifecycle actions
//! - **Logs**: tail/follow/search with status and level colorizing
//! - **Monitoring**: CPU/memory/disk/load sampling with JSON-backed
//!   thresholds, alerts, and history (cron-friendly)
//! - **State**: JSON records of provisioned sites and PHP versions with
//!   a capped append-only change history
//! - **TUI**: interactive menu over the same operations
//!
//! ## Quick start
//!
//! ```no_run
//! use forge::{Config, SiteManager};
//!
//! # async fn example() -> Result<(), forge::Error> {
//! let config = Config::load()?;
//! let sites = SiteManager::new(config);
//! for site in sites.list().await {
//!     println!("{} ({})", site.domain, site.kind);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency model
//!
//! One blocking operation at a time, driven by the menu or a subcommand.
//! The only background work is reading a spawned child's output
//! (log follow mode); persistent state assumes sequential access.

pub mod alerts;
pub mod config;
pub mod cron;
pub mod cve;
pub mod detect;
pub mod diagnostics;
pub mod disk;
pub mod error;
pub mod install;
pub mod logs;
pub mod monitor;
pub mod net;
pub mod nginx;
pub mod shell;
pub mod sites;
pub mod ssl;
pub mod state;
pub mod systemd;
pub mod tui;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use nginx::SiteKind;
pub use sites::{CreateSite, SiteManager};
pub use state::StateStore;
pub use systemd::{ServiceAction, UnitState};
