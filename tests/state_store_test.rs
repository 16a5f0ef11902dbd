use forge::nginx::SiteKind;
use forge::state::{Action, EntityKind, LineageEvent, SiteRecord, StateStore, LINEAGE_CAP};
use tempfile::TempDir;

fn create_store() -> (TempDir, StateStore) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = StateStore::new(dir.path().to_path_buf());
    (dir, store)
}

#[test]
fn empty_store_loads_default_state() {
    let (_dir, store) = create_store();
    let state = store.load();
    assert!(state.sites.is_empty());
    assert!(state.php.is_empty());
    assert!(state.last_updated.is_none());
}

#[test]
fn upsert_and_get_site() {
    let (_dir, store) = create_store();

    let record = SiteRecord::new("example.com".to_string(), SiteKind::Nextjs).with_port(3000);
    store.upsert_site(record).unwrap();

    let loaded = store.get_site("example.com").expect("site should exist");
    assert_eq!(loaded.kind, SiteKind::Nextjs);
    assert_eq!(loaded.port, Some(3000));
    assert_eq!(loaded.target(), "127.0.0.1:3000");
    assert!(store.load().last_updated.is_some());
}

#[test]
fn site_keys_are_unique() {
    let (_dir, store) = create_store();

    store
        .upsert_site(SiteRecord::new("example.com".to_string(), SiteKind::Static))
        .unwrap();
    store
        .upsert_site(SiteRecord::new("example.com".to_string(), SiteKind::Php))
        .unwrap();

    let sites = store.sites();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites["example.com"].kind, SiteKind::Php);
}

#[test]
fn update_preserves_created_at() {
    let (_dir, store) = create_store();

    store
        .upsert_site(SiteRecord::new("example.com".to_string(), SiteKind::Static))
        .unwrap();
    let created_at = store.get_site("example.com").unwrap().created_at;

    store
        .upsert_site(SiteRecord::new("example.com".to_string(), SiteKind::Php))
        .unwrap();
    let updated = store.get_site("example.com").unwrap();
    assert_eq!(updated.created_at, created_at);
    assert!(updated.updated_at >= created_at);
}

#[test]
fn ssl_update_flips_flag_and_records_event() {
    let (_dir, store) = create_store();

    store
        .upsert_site(SiteRecord::new("example.com".to_string(), SiteKind::Static))
        .unwrap();
    store.update_site_ssl("example.com", true).unwrap();

    assert!(store.get_site("example.com").unwrap().ssl_enabled);

    let history = store.entity_history(EntityKind::Site, "example.com");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action, Action::Create);
    assert_eq!(history[1].action, Action::SslUpdate);
}

#[test]
fn ssl_update_for_unknown_site_is_noop() {
    let (_dir, store) = create_store();
    store.update_site_ssl("ghost.example.com", true).unwrap();
    assert!(store.get_site("ghost.example.com").is_none());
    assert!(store.lineage().is_empty());
}

#[test]
fn delete_leaves_stale_lineage_references() {
    let (_dir, store) = create_store();

    store
        .upsert_site(SiteRecord::new("example.com".to_string(), SiteKind::Static))
        .unwrap();
    store.delete_site("example.com").unwrap();

    // The site is gone from state...
    assert!(store.get_site("example.com").is_none());

    // ...but its history remains, referencing the deleted domain.
    let history = store.entity_history(EntityKind::Site, "example.com");
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].action, Action::Delete);
    assert!(history[1].new.is_none());
}

#[test]
fn delete_unknown_site_records_nothing() {
    let (_dir, store) = create_store();
    store.delete_site("nope.example.com").unwrap();
    assert!(store.lineage().is_empty());
}

#[test]
fn lineage_never_exceeds_cap_and_evicts_oldest() {
    let (_dir, store) = create_store();

    for i in 0..LINEAGE_CAP + 25 {
        store
            .record(LineageEvent::new(
                EntityKind::Site,
                format!("site-{}.example.com", i),
                Action::Update,
                None,
                None,
            ))
            .unwrap();
    }

    let events = store.lineage();
    assert_eq!(events.len(), LINEAGE_CAP);
    // Oldest 25 evicted, insertion order preserved for the rest
    assert_eq!(events[0].entity_id, "site-25.example.com");
    assert_eq!(
        events[LINEAGE_CAP - 1].entity_id,
        format!("site-{}.example.com", LINEAGE_CAP + 24)
    );
}

#[test]
fn recent_changes_returns_newest_in_order() {
    let (_dir, store) = create_store();
    for i in 0..10 {
        store
            .record(LineageEvent::new(
                EntityKind::Php,
                format!("8.{}", i),
                Action::Install,
                None,
                None,
            ))
            .unwrap();
    }
    let recent = store.recent_changes(3);
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].entity_id, "8.7");
    assert_eq!(recent[2].entity_id, "8.9");
}

#[test]
fn corrupt_state_file_falls_back_to_default() {
    let (dir, store) = create_store();
    std::fs::create_dir_all(dir.path()).unwrap();
    std::fs::write(dir.path().join("state.json"), "{not json at all").unwrap();
    std::fs::write(dir.path().join("lineage.json"), "[truncated").unwrap();

    assert!(store.load().sites.is_empty());
    assert!(store.lineage().is_empty());

    // And saving over the corrupt file works
    store
        .upsert_site(SiteRecord::new("example.com".to_string(), SiteKind::Static))
        .unwrap();
    assert_eq!(store.sites().len(), 1);
}

#[test]
fn php_extensions_union_without_duplicates() {
    let (_dir, store) = create_store();

    store
        .add_php_extensions("8.3", &["curl".to_string(), "gd".to_string()])
        .unwrap();
    store
        .add_php_extensions("8.3", &["gd".to_string(), "intl".to_string()])
        .unwrap();

    let record = store.get_php("8.3").expect("php record should exist");
    assert_eq!(record.extensions, vec!["curl", "gd", "intl"]);

    let history = store.entity_history(EntityKind::Php, "8.3");
    assert_eq!(history.len(), 2);
    assert!(history
        .iter()
        .all(|e| e.action == Action::ExtensionsAdd));
}

#[test]
fn state_survives_reload_from_disk() {
    let (dir, store) = create_store();
    store
        .upsert_site(
            SiteRecord::new("blog.example.com".to_string(), SiteKind::Php)
                .with_document_root("/var/www/blog/public".into())
                .with_php_version("8.3".to_string()),
        )
        .unwrap();
    drop(store);

    let reopened = StateStore::new(dir.path().to_path_buf());
    let site = reopened.get_site("blog.example.com").unwrap();
    assert_eq!(site.php_version.as_deref(), Some("8.3"));
    assert_eq!(site.target(), "/var/www/blog/public");
}
