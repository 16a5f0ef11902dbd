//! Persistent state for provisioned sites and PHP versions.
//!
//! Two JSON files under the state directory (default `~/.forge/`):
//!
//! - `state.json` — the current sites/php picture ([`ForgeState`])
//! - `lineage.json` — an append-only change history capped at
//!   [`LINEAGE_CAP`] events, oldest evicted first
//!
//! Access is sequential (one interactive invocation at a time, per the
//! tool's concurrency model); there is no locking. Loading tolerates a
//! missing or corrupt file by falling back to the default state so a
//! damaged JSON file never bricks the tool.

mod types;

pub use types::{
    Action, EntityKind, ForgeState, LineageEvent, PhpRecord, SiteRecord, LINEAGE_CAP,
};

use crate::error::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join("state.json")
    }

    pub fn lineage_path(&self) -> PathBuf {
        self.dir.join("lineage.json")
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Load `state.json`, falling back to the default state when the file
    /// is missing or unreadable.
    pub fn load(&self) -> ForgeState {
        match fs::read_to_string(self.state_path()) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!("state.json is corrupt ({}), starting fresh", e);
                    ForgeState::default()
                }
            },
            Err(_) => ForgeState::default(),
        }
    }

    /// Persist the state, stamping `last_updated`.
    pub fn save(&self, state: &mut ForgeState) -> Result<()> {
        self.ensure_dir()?;
        state.last_updated = Some(chrono::Utc::now());
        write_json_atomic(&self.state_path(), state)?;
        Ok(())
    }

    // ── Sites ───────────────────────────────────────────────────────

    pub fn sites(&self) -> BTreeMap<String, SiteRecord> {
        self.load().sites
    }

    pub fn get_site(&self, domain: &str) -> Option<SiteRecord> {
        self.load().sites.get(domain).cloned()
    }

    /// Insert or update a site record, recording a lineage event.
    pub fn upsert_site(&self, mut record: SiteRecord) -> Result<()> {
        let mut state = self.load();
        let old = state.sites.get(&record.domain).cloned();
        if let Some(ref existing) = old {
            record.created_at = existing.created_at;
        }
        record.updated_at = chrono::Utc::now();

        let action = if old.is_some() {
            Action::Update
        } else {
            Action::Create
        };
        let event = LineageEvent::new(
            EntityKind::Site,
            record.domain.clone(),
            action,
            old.map(|r| serde_json::to_value(r).unwrap_or_default()),
            Some(serde_json::to_value(&record).unwrap_or_default()),
        );

        state.sites.insert(record.domain.clone(), record);
        self.save(&mut state)?;
        self.record(event)
    }

    /// Flip the SSL flag for a site. Unknown domains are a no-op, matching
    /// the filesystem-first workflow where certbot can run for vhosts this
    /// tool never recorded.
    pub fn update_site_ssl(&self, domain: &str, ssl_enabled: bool) -> Result<()> {
        let mut state = self.load();
        let Some(record) = state.sites.get_mut(domain) else {
            return Ok(());
        };
        let old = record.ssl_enabled;
        record.ssl_enabled = ssl_enabled;
        record.updated_at = chrono::Utc::now();
        self.save(&mut state)?;
        self.record(LineageEvent::new(
            EntityKind::Site,
            domain.to_string(),
            Action::SslUpdate,
            Some(serde_json::json!({ "ssl_enabled": old })),
            Some(serde_json::json!({ "ssl_enabled": ssl_enabled })),
        ))
    }

    pub fn set_site_enabled(&self, domain: &str, enabled: bool) -> Result<()> {
        let mut state = self.load();
        let Some(record) = state.sites.get_mut(domain) else {
            return Ok(());
        };
        let old = record.enabled;
        record.enabled = enabled;
        record.updated_at = chrono::Utc::now();
        self.save(&mut state)?;
        self.record(LineageEvent::new(
            EntityKind::Site,
            domain.to_string(),
            Action::Update,
            Some(serde_json::json!({ "enabled": old })),
            Some(serde_json::json!({ "enabled": enabled })),
        ))
    }

    pub fn delete_site(&self, domain: &str) -> Result<()> {
        let mut state = self.load();
        let Some(old) = state.sites.remove(domain) else {
            return Ok(());
        };
        self.save(&mut state)?;
        self.record(LineageEvent::new(
            EntityKind::Site,
            domain.to_string(),
            Action::Delete,
            Some(serde_json::to_value(old).unwrap_or_default()),
            None,
        ))
    }

    // ── PHP ─────────────────────────────────────────────────────────

    pub fn get_php(&self, version: &str) -> Option<PhpRecord> {
        self.load().php.get(version).cloned()
    }

    pub fn upsert_php(&self, mut record: PhpRecord) -> Result<()> {
        let mut state = self.load();
        let old = state.php.get(&record.version).cloned();
        if let Some(ref existing) = old {
            record.installed_at = existing.installed_at;
        }
        record.updated_at = chrono::Utc::now();

        let action = if old.is_some() {
            Action::Update
        } else {
            Action::Install
        };
        let event = LineageEvent::new(
            EntityKind::Php,
            record.version.clone(),
            action,
            old.map(|r| serde_json::to_value(r).unwrap_or_default()),
            Some(serde_json::to_value(&record).unwrap_or_default()),
        );

        state.php.insert(record.version.clone(), record);
        self.save(&mut state)?;
        self.record(event)
    }

    /// Union new extensions into a PHP version's record, creating the
    /// record if needed.
    pub fn add_php_extensions(&self, version: &str, extensions: &[String]) -> Result<()> {
        let mut state = self.load();
        let record = state
            .php
            .entry(version.to_string())
            .or_insert_with(|| PhpRecord::new(version.to_string(), Vec::new()));

        let old: Vec<String> = record.extensions.clone();
        for ext in extensions {
            if !record.extensions.contains(ext) {
                record.extensions.push(ext.clone());
            }
        }
        record.extensions.sort();
        record.updated_at = chrono::Utc::now();
        let new = record.extensions.clone();

        self.save(&mut state)?;
        self.record(LineageEvent::new(
            EntityKind::Php,
            version.to_string(),
            Action::ExtensionsAdd,
            Some(serde_json::json!({ "extensions": old })),
            Some(serde_json::json!({ "extensions": new })),
        ))
    }

    // ── Lineage ─────────────────────────────────────────────────────

    /// Load the full lineage history (empty on missing/corrupt file).
    pub fn lineage(&self) -> Vec<LineageEvent> {
        match fs::read_to_string(self.lineage_path()) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("lineage.json is corrupt ({}), starting fresh", e);
                Vec::new()
            }),
            Err(_) => Vec::new(),
        }
    }

    /// Append an event, evicting oldest entries past [`LINEAGE_CAP`].
    pub fn record(&self, event: LineageEvent) -> Result<()> {
        self.ensure_dir()?;
        let mut events = self.lineage();
        events.push(event);
        if events.len() > LINEAGE_CAP {
            let excess = events.len() - LINEAGE_CAP;
            events.drain(..excess);
        }
        write_json_atomic(&self.lineage_path(), &events)?;
        Ok(())
    }

    /// The most recent `limit` events, oldest first.
    pub fn recent_changes(&self, limit: usize) -> Vec<LineageEvent> {
        let events = self.lineage();
        let skip = events.len().saturating_sub(limit);
        events.into_iter().skip(skip).collect()
    }

    /// All events for one entity, in recording order.
    pub fn entity_history(&self, entity: EntityKind, entity_id: &str) -> Vec<LineageEvent> {
        self.lineage()
            .into_iter()
            .filter(|e| e.entity == entity && e.entity_id == entity_id)
            .collect()
    }

    pub fn clear_lineage(&self) -> Result<()> {
        self.ensure_dir()?;
        write_json_atomic(&self.lineage_path(), &Vec::<LineageEvent>::new())?;
        Ok(())
    }

    /// Human-readable report of the history, grouped by entity kind.
    pub fn lineage_report(&self) -> String {
        let events = self.lineage();
        if events.is_empty() {
            return "No state changes recorded.".to_string();
        }

        let mut report = String::new();
        report.push_str(&format!(
            "State lineage: {} entries, {} to {}\n",
            events.len(),
            events[0].timestamp.format("%Y-%m-%d"),
            events[events.len() - 1].timestamp.format("%Y-%m-%d"),
        ));

        for kind in [EntityKind::Site, EntityKind::Php] {
            let entries: Vec<&LineageEvent> =
                events.iter().filter(|e| e.entity == kind).collect();
            if entries.is_empty() {
                continue;
            }
            report.push_str(&format!("\n[{}]\n", kind));
            let shown = entries.len().min(10);
            for event in &entries[entries.len() - shown..] {
                report.push_str(&format!(
                    "  {} | {:<14} | {}\n",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.action.to_string(),
                    event.entity_id,
                ));
            }
            if entries.len() > shown {
                report.push_str(&format!(
                    "  ... and {} more entries\n",
                    entries.len() - shown
                ));
            }
        }

        report
    }
}

/// Write JSON via a sibling temp file and rename, so a crash mid-write
/// never leaves a truncated state file behind.
fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
