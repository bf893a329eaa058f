//! Installing the facade from `stagelog.toml`

use crate::common::*;
use stagelog::{LogConfig, CONFIG_FILE_NAME};
use tempfile::TempDir;

#[test]
fn install_from_file() {
    let (_guard, _) = facade_lock();
    let temp = TempDir::new().unwrap();
    let log_dir = temp.path().join("logs");
    let config_path = temp.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &config_path,
        format!(
            "console = false\nlevel = \"warn\"\ndir = {:?}\nfilename = \"svc.log\"\nstaging_filename = \"svc.log.mmap\"\n",
            log_dir.display().to_string()
        ),
    )
    .unwrap();

    let config = LogConfig::from_file(&config_path).unwrap();
    config.install().unwrap();
    assert_eq!(stagelog::get_level(), Severity::Warn);

    stagelog::info!("below threshold");
    stagelog::warn!("at threshold");
    stagelog::close();

    let content = read(&log_dir.join("svc.log"));
    assert!(!content.contains("below threshold"));
    assert!(content.contains("WARN  at threshold"));
    assert!(log_dir.join("svc.log.mmap").exists());
}

#[test]
fn failed_install_leaves_facade_unchanged() {
    let (_guard, _) = facade_lock();
    let temp = TempDir::new().unwrap();
    stagelog::set_rolling_daily(temp.path(), "keep.log");
    stagelog::set_level(Severity::Info);

    let blocker = temp.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();
    let config = LogConfig {
        dir: blocker,
        level: Severity::Fatal,
        ..LogConfig::default()
    };
    assert!(config.install().is_err());

    assert_eq!(stagelog::get_level(), Severity::Info);
    stagelog::info!("still here");
    stagelog::flush();
    assert!(read(&temp.path().join("keep.log")).contains("still here"));
}
