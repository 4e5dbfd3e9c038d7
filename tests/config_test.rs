use speechflow_core::config::ConfigManager;
use std::path::PathBuf;

fn shipped_config_dir() -> Option<PathBuf> {
    Some(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config"))
}

#[test]
fn test_shipped_environments_load_and_validate() {
    for environment in ["development", "test", "production"] {
        let manager = ConfigManager::load_from_directory_with_env(shipped_config_dir(), environment);
        assert!(manager.is_ok(), "{environment}: {:?}", manager.err());
    }
}

#[test]
fn test_production_overrides_base() {
    let manager = ConfigManager::load_from_directory_with_env(shipped_config_dir(), "production")
        .unwrap();
    let config = manager.config();

    assert_eq!(config.worker.concurrent_processors, 8);
    assert!(config.upload.enabled);
    assert!(config.logging.json);
    // Untouched by the override file
    assert_eq!(config.queue.max_size, 1000);
}

#[test]
fn test_test_environment_disables_stats_monitor() {
    let manager =
        ConfigManager::load_from_directory_with_env(shipped_config_dir(), "test").unwrap();
    assert!(manager.config().worker.stats_interval().is_none());
    assert_eq!(manager.config().queue.max_size, 100);
}
