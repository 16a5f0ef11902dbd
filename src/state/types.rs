use crate::nginx::SiteKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Maximum number of lineage events kept on disk. Oldest entries are
/// evicted first; insertion order is otherwise preserved.
pub const LINEAGE_CAP: usize = 1000;

/// On-disk format of `state.json` — the current picture of what this tool
/// has provisioned on the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeState {
    /// Format version, bumped on incompatible layout changes.
    pub version: String,

    /// Configured sites keyed by domain. Keys are unique by construction.
    pub sites: BTreeMap<String, SiteRecord>,

    /// Installed PHP versions keyed by version string ("8.3").
    pub php: BTreeMap<String, PhpRecord>,

    /// Set on every save.
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for ForgeState {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            sites: BTreeMap::new(),
            php: BTreeMap::new(),
            last_updated: None,
        }
    }
}

/// Persisted record for a single site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub domain: String,
    pub kind: SiteKind,
    pub ssl_enabled: bool,

    /// Backend port for reverse-proxy kinds.
    pub port: Option<u16>,

    /// Document root for php/static kinds.
    pub document_root: Option<PathBuf>,

    /// PHP-FPM version for php kinds.
    pub php_version: Option<String>,

    /// Whether the vhost symlink in sites-enabled exists.
    pub enabled: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SiteRecord {
    pub fn new(domain: String, kind: SiteKind) -> Self {
        let now = Utc::now();
        Self {
            domain,
            kind,
            ssl_enabled: false,
            port: None,
            document_root: None,
            php_version: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_document_root(mut self, root: PathBuf) -> Self {
        self.document_root = Some(root);
        self
    }

    pub fn with_php_version(mut self, version: String) -> Self {
        self.php_version = Some(version);
        self
    }

    /// The "Port/Root" column shown in site listings.
    pub fn target(&self) -> String {
        if let Some(port) = self.port {
            format!("127.0.0.1:{}", port)
        } else if let Some(ref root) = self.document_root {
            root.display().to_string()
        } else {
            "-".to_string()
        }
    }
}

/// Persisted record for an installed PHP version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhpRecord {
    pub version: String,
    pub extensions: Vec<String>,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PhpRecord {
    pub fn new(version: String, extensions: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            version,
            extensions,
            installed_at: now,
            updated_at: now,
        }
    }
}

/// What kind of entity a lineage event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Site,
    Php,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Site => write!(f, "site"),
            EntityKind::Php => write!(f, "php"),
        }
    }
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
    SslUpdate,
    Install,
    ExtensionsAdd,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::SslUpdate => "ssl_update",
            Action::Install => "install",
            Action::ExtensionsAdd => "extensions_add",
        };
        write!(f, "{}", s)
    }
}

/// One entry of the append-only change history (`lineage.json`).
///
/// Events capture the state of the entity at recording time. Referential
/// integrity is deliberately not enforced afterwards: deleting a site
/// leaves its past events in place, referencing a domain that no longer
/// exists in `state.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageEvent {
    pub timestamp: DateTime<Utc>,
    pub entity: EntityKind,
    pub entity_id: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<serde_json::Value>,
}

impl LineageEvent {
    pub fn new(
        entity: EntityKind,
        entity_id: String,
        action: Action,
        old: Option<serde_json::Value>,
        new: Option<serde_json::Value>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            entity,
            entity_id,
            action,
            old,
            new,
        }
    }
}
