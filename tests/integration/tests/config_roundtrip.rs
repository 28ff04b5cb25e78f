//! Config save/load roundtrip integration tests.

use courier_core::config::{BindMode, Config, DirectoryUser};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("courier.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.gateway.port, config.gateway.port);
    assert_eq!(loaded.gateway.bind, config.gateway.bind);
    assert_eq!(loaded.namespaces.shop_chat.path, "/chat/shop");
    assert_eq!(
        loaded.namespaces.admin_chat.allowed_roles,
        config.namespaces.admin_chat.allowed_roles
    );
    assert_eq!(loaded.calls.session_ttl_secs, config.calls.session_ttl_secs);
    loaded.validate().unwrap();
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("courier.json5");

    let mut config = Config::default();
    config.gateway.port = 9090;
    config.gateway.bind = BindMode::Lan;
    config.auth.jwt_secret = Some("roundtrip".to_string().into());
    config.namespaces.ai_chat.enabled = false;
    config.directory.users.push(DirectoryUser {
        id: "u1".to_string(),
        role: "admin".to_string(),
        email: None,
        name: Some("Ada".to_string()),
        full_name: None,
        avatar: None,
    });
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.gateway.port, 9090);
    assert_eq!(loaded.gateway.bind, BindMode::Lan);
    assert_eq!(
        loaded.auth.jwt_secret.as_ref().map(|s| s.expose_secret()),
        Some("roundtrip")
    );
    assert!(!loaded.namespaces.ai_chat.enabled);
    assert_eq!(loaded.directory.users.len(), 1);
    assert_eq!(loaded.directory.users[0].name.as_deref(), Some("Ada"));
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/courier.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}

#[test]
fn test_saved_config_starts_gateway() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("courier.json5");
    let mut config = Config::default();
    config.namespaces.admin_chat.call_signaling = false;
    config.save(&path).unwrap();

    let loaded = courier_cli::load_config(Some(path.as_path())).unwrap();
    let gateway = courier_gateway::Gateway::from_config(&loaded).unwrap();
    assert_eq!(gateway.namespaces().len(), 4);
    assert!(gateway.notifier().is_some());
}
