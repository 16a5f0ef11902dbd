use forge::Config;
use std::path::Path;

#[test]
fn missing_config_file_yields_ubuntu_defaults() {
    let config = Config::load_from(Path::new("/definitely/not/here/config.yaml")).unwrap();
    assert_eq!(
        config.sites_available,
        Path::new("/etc/nginx/sites-available")
    );
    assert_eq!(config.sites_enabled, Path::new("/etc/nginx/sites-enabled"));
    assert_eq!(config.nginx_log_dir, Path::new("/var/log/nginx"));
    assert_eq!(
        config.letsencrypt_live,
        Path::new("/etc/letsencrypt/live")
    );
    assert_eq!(config.default_log_lines, 50);
}

#[test]
fn config_file_overrides_only_named_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        "state_dir: /srv/forge\ndefault_log_lines: 200\n",
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.state_dir, Path::new("/srv/forge"));
    assert_eq!(config.default_log_lines, 200);
    // Untouched keys keep their defaults
    assert_eq!(config.nginx_log_dir, Path::new("/var/log/nginx"));
}

#[test]
fn derived_directories_hang_off_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "state_dir: /srv/forge\n").unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.monitoring_dir(), Path::new("/srv/forge/monitoring"));
    assert_eq!(config.cve_dir(), Path::new("/srv/forge/cve"));
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "not_a_real_key: true\n").unwrap();
    assert!(Config::load_from(&path).is_err());
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "default_log_lines: 0\n").unwrap();
    assert!(Config::load_from(&path).is_err());
}
