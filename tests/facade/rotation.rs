//! Size rotation of the process-wide logger

use crate::common::*;
use tempfile::TempDir;

#[test]
fn size_rotation_cycles_suffixes() {
    let (_guard, _) = facade_lock();
    let temp = TempDir::new().unwrap();
    stagelog::logger_set_rolling_file(temp.path(), "app.log", None, 2, 32);

    for i in 0..5 {
        stagelog::info!("rotation round", i);
    }
    stagelog::flush();

    let dir = temp.path();
    assert!(read(&dir.join("app.log")).contains("rotation round 4"));
    // Slots are reused cyclically: 1, 2, 1, 2
    assert!(read(&dir.join("app.log.1")).contains("rotation round 2"));
    assert!(read(&dir.join("app.log.2")).contains("rotation round 3"));
    assert!(!dir.join("app.log.3").exists());
}

#[test]
fn size_rotation_with_staging() {
    let (_guard, _) = facade_lock();
    let temp = TempDir::new().unwrap();
    stagelog::logger_set_rolling_file(temp.path(), "app.log", Some("app.log.mmap"), 3, 32);

    for i in 0..3 {
        stagelog::info!("staged round", i);
        stagelog::flush();
    }
    stagelog::close();

    let dir = temp.path();
    assert!(read(&dir.join("app.log")).contains("staged round 2"));
    assert!(read(&dir.join("app.log.1")).contains("staged round 0"));
    assert!(read(&dir.join("app.log.2")).contains("staged round 1"));
}

#[test]
fn max_count_one_never_rotates() {
    let (_guard, _) = facade_lock();
    let temp = TempDir::new().unwrap();
    stagelog::logger_set_rolling_file(temp.path(), "app.log", None, 1, 8);

    for i in 0..3 {
        stagelog::info!("kept", i);
    }
    stagelog::flush();

    assert_eq!(read(&temp.path().join("app.log")).lines().count(), 3);
    assert!(!temp.path().join("app.log.1").exists());
}
