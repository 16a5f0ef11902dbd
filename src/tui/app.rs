use crate::alerts::AlertStore;
use crate::config::Config;
use crate::detect::{self, SoftwareStatus};
use crate::logs::{self, Follower};
use crate::monitor::{self, DiskUsage, LoadAverage, MemoryUsage};
use crate::sites::{SiteListing, SiteManager};
use crate::systemd::{self, ServiceAction, ServiceStatus};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const LOG_BUFFER_SIZE: usize = 1000;

/// Ticks between background refreshes of the live views (tick rate is
/// 250ms, so 8 ticks = 2s).
const REFRESH_TICKS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Menu,
    Status,
    Services,
    Sites,
    Monitor,
    Logs,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Menu => "Main",
            View::Status => "System Status",
            View::Services => "Services",
            View::Sites => "Sites",
            View::Monitor => "Monitor",
            View::Logs => "Logs",
        }
    }
}

/// Entries of the main menu, in display order.
pub const MENU_ITEMS: &[(View, &str, &str)] = &[
    (View::Status, "System Status", "Installed software and versions"),
    (View::Sites, "Manage Sites", "Nginx vhosts, SSL, health"),
    (View::Services, "Services", "Start/stop/restart systemd units"),
    (View::Monitor, "Monitor", "CPU, memory, disk, load"),
    (View::Logs, "Logs", "Tail and follow nginx logs"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: MessageLevel,
    pub expires_at: Instant,
}

/// Which log file the logs view is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    NginxAccess,
    NginxError,
}

impl LogSource {
    pub fn label(&self) -> &'static str {
        match self {
            LogSource::NginxAccess => "nginx access.log",
            LogSource::NginxError => "nginx error.log",
        }
    }
}

/// Pending confirmation before a destructive service action.
pub struct PendingAction {
    pub unit: String,
    pub action: ServiceAction,
    pub prompt: String,
}

pub struct App {
    pub config: Config,
    pub sites_manager: SiteManager,
    pub alert_store: AlertStore,

    pub view: View,
    pub menu_index: usize,
    pub status_message: Option<StatusMessage>,
    tick_count: u32,

    // Status view
    pub software: Vec<SoftwareStatus>,
    pub software_loaded: bool,

    // Services view
    pub services: Vec<ServiceStatus>,
    pub service_index: usize,
    pub pending: Option<PendingAction>,

    // Sites view
    pub sites: Vec<SiteListing>,
    pub site_index: usize,

    // Monitor view
    pub cpu_percent: f64,
    pub memory: MemoryUsage,
    pub swap: MemoryUsage,
    pub disk: DiskUsage,
    pub load: Option<LoadAverage>,
    pub uptime: Option<String>,
    pub active_alerts: usize,

    // Logs view
    pub log_source: LogSource,
    pub log_lines: VecDeque<String>,
    pub log_scroll: usize,
    pub following: bool,
    follower: Option<Follower>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let sites_manager = SiteManager::new(config.clone());
        let alert_store = AlertStore::new(config.monitoring_dir());
        Self {
            config,
            sites_manager,
            alert_store,
            view: View::Menu,
            menu_index: 0,
            status_message: None,
            tick_count: 0,
            software: Vec::new(),
            software_loaded: false,
            services: Vec::new(),
            service_index: 0,
            pending: None,
            sites: Vec::new(),
            site_index: 0,
            cpu_percent: 0.0,
            memory: MemoryUsage::default(),
            swap: MemoryUsage::default(),
            disk: DiskUsage::default(),
            load: None,
            uptime: None,
            active_alerts: 0,
            log_source: LogSource::NginxAccess,
            log_lines: VecDeque::new(),
            log_scroll: 0,
            following: false,
            follower: None,
        }
    }

    pub fn message(&mut self, level: MessageLevel, text: impl Into<String>) {
        self.status_message = Some(StatusMessage {
            text: text.into(),
            level,
            expires_at: Instant::now() + Duration::from_secs(4),
        });
    }

    /// Handle one key event. Returns false when the app should exit.
    pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(false);
        }

        // A pending confirmation swallows everything except y/n
        if self.pending.is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    let pending = self.pending.take().expect("checked above");
                    self.run_service_action(&pending.unit, pending.action).await;
                }
                _ => {
                    self.pending = None;
                    self.message(MessageLevel::Info, "Cancelled");
                }
            }
            return Ok(true);
        }

        match self.view {
            View::Menu => self.handle_menu_key(key).await,
            View::Services => self.handle_services_key(key).await,
            View::Sites => self.handle_sites_key(key).await,
            View::Logs => self.handle_logs_key(key).await,
            View::Status | View::Monitor => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.leave_view();
                    Ok(true)
                }
                KeyCode::Char('r') => {
                    self.refresh_view(true).await;
                    Ok(true)
                }
                _ => Ok(true),
            },
        }
    }

    async fn handle_menu_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
            KeyCode::Up | KeyCode::Char('k') => {
                self.menu_index = self.menu_index.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.menu_index = (self.menu_index + 1).min(MENU_ITEMS.len() - 1);
            }
            KeyCode::Enter => {
                self.enter_view(MENU_ITEMS[self.menu_index].0).await;
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if index < MENU_ITEMS.len() {
                    self.menu_index = index;
                    self.enter_view(MENU_ITEMS[index].0).await;
                }
            }
            _ => {}
        }
        Ok(true)
    }

    async fn handle_services_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.leave_view(),
            KeyCode::Up | KeyCode::Char('k') => {
                self.service_index = self.service_index.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if !self.services.is_empty() {
                    self.service_index = (self.service_index + 1).min(self.services.len() - 1);
                }
            }
            KeyCode::Char('s') => self.request_service_action(ServiceAction::Start).await,
            KeyCode::Char('x') => self.request_service_action(ServiceAction::Stop).await,
            KeyCode::Char('r') => self.request_service_action(ServiceAction::Restart).await,
            KeyCode::Char('l') => self.request_service_action(ServiceAction::Reload).await,
            KeyCode::Char('e') => self.request_service_action(ServiceAction::Enable).await,
            KeyCode::Char('d') => self.request_service_action(ServiceAction::Disable).await,
            _ => {}
        }
        Ok(true)
    }

    /// Destructive actions on critical services go through a y/N prompt;
    /// everything else runs immediately.
    async fn request_service_action(&mut self, action: ServiceAction) {
        let Some(service) = self.services.get(self.service_index) else {
            return;
        };
        let unit = service.unit.to_string();
        if action.is_destructive() && service.critical {
            self.pending = Some(PendingAction {
                prompt: format!(
                    "{} is a critical service. Really {} it? [y/N]",
                    service.label,
                    action.verb()
                ),
                unit,
                action,
            });
        } else {
            self.run_service_action(&unit, action).await;
        }
    }

    async fn handle_sites_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.leave_view(),
            KeyCode::Up | KeyCode::Char('k') => {
                self.site_index = self.site_index.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if !self.sites.is_empty() {
                    self.site_index = (self.site_index + 1).min(self.sites.len() - 1);
                }
            }
            KeyCode::Char('t') => {
                if let Some(site) = self.sites.get(self.site_index) {
                    let domain = site.domain.clone();
                    match self.sites_manager.toggle(&domain).await {
                        Ok(enabled) => {
                            self.message(
                                MessageLevel::Success,
                                format!(
                                    "{} {}",
                                    domain,
                                    if enabled { "enabled" } else { "disabled" }
                                ),
                            );
                            self.sites = self.sites_manager.list().await;
                        }
                        Err(e) => self.message(MessageLevel::Error, e.to_string()),
                    }
                }
            }
            KeyCode::Char('r') => {
                self.sites = self.sites_manager.list().await;
                self.message(MessageLevel::Info, "Refreshed");
            }
            _ => {}
        }
        Ok(true)
    }

    async fn handle_logs_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.stop_follow().await;
                self.leave_view();
            }
            KeyCode::Char('a') => {
                self.switch_log_source(LogSource::NginxAccess).await;
            }
            KeyCode::Char('e') => {
                self.switch_log_source(LogSource::NginxError).await;
            }
            KeyCode::Char('f') => {
                if self.following {
                    self.stop_follow().await;
                    self.message(MessageLevel::Info, "Stopped following");
                } else {
                    self.start_follow();
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.log_scroll = self.log_scroll.saturating_add(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.log_scroll = self.log_scroll.saturating_sub(1);
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.log_scroll = 0;
            }
            _ => {}
        }
        Ok(true)
    }

    fn log_path(&self) -> std::path::PathBuf {
        match self.log_source {
            LogSource::NginxAccess => logs::nginx_access_path(&self.config),
            LogSource::NginxError => logs::nginx_error_path(&self.config),
        }
    }

    async fn switch_log_source(&mut self, source: LogSource) {
        if self.log_source == source {
            return;
        }
        self.stop_follow().await;
        self.log_source = source;
        self.load_log_tail().await;
    }

    async fn load_log_tail(&mut self) {
        self.log_lines.clear();
        self.log_scroll = 0;
        match logs::tail(&self.log_path(), 200).await {
            Ok(lines) => self.log_lines.extend(lines),
            Err(e) => self.message(MessageLevel::Error, e.to_string()),
        }
    }

    fn start_follow(&mut self) {
        match logs::follow(&self.log_path()) {
            Ok(follower) => {
                self.follower = Some(follower);
                self.following = true;
                self.log_scroll = 0;
                self.message(MessageLevel::Info, "Following (f to stop)");
            }
            Err(e) => self.message(MessageLevel::Error, e.to_string()),
        }
    }

    async fn stop_follow(&mut self) {
        if let Some(follower) = self.follower.take() {
            follower.stop().await;
        }
        self.following = false;
    }

    async fn run_service_action(&mut self, unit: &str, action: ServiceAction) {
        match systemd::apply(unit, action).await {
            Ok(()) => {
                self.message(
                    MessageLevel::Success,
                    format!("{} {}ed", unit, action.verb()),
                );
            }
            Err(e) => self.message(MessageLevel::Error, e.to_string()),
        }
        self.services = systemd::installed_services().await;
    }

    async fn enter_view(&mut self, view: View) {
        self.view = view;
        self.refresh_view(true).await;
    }

    fn leave_view(&mut self) {
        self.view = View::Menu;
        self.pending = None;
    }

    async fn refresh_view(&mut self, forced: bool) {
        match self.view {
            View::Menu => {}
            View::Status => {
                if forced || !self.software_loaded {
                    self.software = detect::system_status().await;
                    self.software_loaded = true;
                }
            }
            View::Services => {
                self.services = systemd::installed_services().await;
                if self.service_index >= self.services.len() {
                    self.service_index = self.services.len().saturating_sub(1);
                }
            }
            View::Sites => {
                self.sites = self.sites_manager.list().await;
                if self.site_index >= self.sites.len() {
                    self.site_index = self.sites.len().saturating_sub(1);
                }
            }
            View::Monitor => {
                self.cpu_percent = monitor::cpu_usage().await;
                self.memory = monitor::memory_usage().await;
                self.swap = monitor::swap_usage().await;
                self.disk = monitor::root_disk_usage().await;
                self.load = monitor::load_average().await;
                self.uptime = monitor::uptime().await;
                self.active_alerts = self.alert_store.active_alerts().len();
            }
            View::Logs => {
                if forced {
                    self.load_log_tail().await;
                }
            }
        }
    }

    pub async fn on_tick(&mut self) -> anyhow::Result<()> {
        self.tick_count = self.tick_count.wrapping_add(1);

        // Expire transient messages
        if let Some(ref message) = self.status_message {
            if Instant::now() >= message.expires_at {
                self.status_message = None;
            }
        }

        // Drain follower output
        if let Some(ref mut follower) = self.follower {
            let mut received = 0;
            while received < 200 {
                match tokio::time::timeout(Duration::from_millis(1), follower.next_line()).await {
                    Ok(Some(line)) => {
                        self.log_lines.push_back(line);
                        if self.log_lines.len() > LOG_BUFFER_SIZE {
                            self.log_lines.pop_front();
                        }
                        received += 1;
                    }
                    _ => break,
                }
            }
        }

        // Periodic refresh of the live views
        if self.tick_count % REFRESH_TICKS == 0
            && matches!(self.view, View::Monitor | View::Services)
        {
            self.refresh_view(false).await;
        }

        Ok(())
    }
}
