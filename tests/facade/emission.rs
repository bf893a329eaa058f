//! Emission through the facade functions and macros

use crate::common::*;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

#[test]
fn level_round_trip() {
    let (_guard, _) = facade_lock();
    for level in Severity::ALL_LEVELS {
        stagelog::set_level(level);
        assert_eq!(stagelog::get_level(), level);
    }
}

#[test]
fn macros_record_call_site() {
    let (_guard, _) = facade_lock();
    let temp = TempDir::new().unwrap();
    stagelog::set_rolling_daily(temp.path(), "app.log");

    let line = line!() + 1;
    stagelog::info!("listening on", 8080);
    stagelog::flush();

    let content = read(&temp.path().join("app.log"));
    assert!(
        content.ends_with(&format!("emission.rs:{}: INFO  listening on 8080\n", line)),
        "got {:?}",
        content
    );
}

#[test]
fn functions_record_call_site() {
    let (_guard, _) = facade_lock();
    let temp = TempDir::new().unwrap();
    stagelog::set_rolling_daily(temp.path(), "app.log");

    let line = line!() + 1;
    stagelog::warn(&[&"disk", &"almost full"]);
    stagelog::flush();

    let content = read(&temp.path().join("app.log"));
    assert!(content.ends_with(&format!("emission.rs:{}: WARN  disk almost full\n", line)));
}

#[test]
fn log_with_prefix() {
    let (_guard, _) = facade_lock();
    let temp = TempDir::new().unwrap();
    stagelog::set_rolling_daily(temp.path(), "app.log");

    stagelog::log(Severity::Error, "[db]", &[&"timeout", &30]);
    stagelog::log!(Severity::Fatal, "[db]", "gone");
    stagelog::flush();

    let content = read(&temp.path().join("app.log"));
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("ERROR [db] timeout 30"));
    assert!(lines[1].ends_with("FATAL [db] gone"));
}

#[test]
fn every_level_macro() {
    let (_guard, counters) = facade_lock();
    let temp = TempDir::new().unwrap();
    stagelog::set_rolling_daily(temp.path(), "app.log");
    stagelog::set_level(Severity::All);

    stagelog::all!("a");
    stagelog::debug!("d");
    stagelog::info!("i");
    stagelog::warn!("w");
    stagelog::error!("e");
    stagelog::fatal!("f");
    stagelog::flush();

    let content = read(&temp.path().join("app.log"));
    let names: Vec<&str> = content
        .lines()
        .map(|l| l.split(": ").nth(1).unwrap().split(' ').next().unwrap())
        .collect();
    assert_eq!(names, ["ALL", "DEBUG", "INFO", "WARN", "ERROR", "FATAL"]);
    assert_eq!(counters.get("WARN"), 1);
    assert_eq!(counters.get("ERROR"), 1);
    assert_eq!(counters.get("FATAL"), 1);
    assert_eq!(counters.get("INFO"), 0);
}

#[test]
fn filtered_records_count_but_do_not_write() {
    let (_guard, counters) = facade_lock();
    let temp = TempDir::new().unwrap();
    stagelog::set_rolling_daily(temp.path(), "app.log");
    stagelog::set_level(Severity::Off);

    stagelog::error!("suppressed");
    stagelog::debug!("suppressed");
    stagelog::flush();

    assert_eq!(read(&temp.path().join("app.log")), "");
    assert_eq!(counters.get("ERROR"), 1);
    assert_eq!(counters.get("DEBUG"), 0);
}

#[test]
fn staged_concurrent_writers_then_close() {
    let (_guard, counters) = facade_lock();
    let temp = TempDir::new().unwrap();
    stagelog::logger_set_rolling_daily(temp.path(), "app.log", Some("app.log.mmap"));

    let threads = 8;
    let per_thread = 200;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..per_thread {
                    stagelog::error!("worker", t, "seq", i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    stagelog::close();

    let content = read(&temp.path().join("app.log"));
    assert_eq!(content.lines().count(), threads * per_thread);
    assert_eq!(counters.get("ERROR"), (threads * per_thread) as u64);
    assert!(temp.path().join("app.log.mmap").exists());
}

#[test]
fn new_logger_is_independent_of_facade() {
    let (_guard, _) = facade_lock();
    let temp = TempDir::new().unwrap();
    stagelog::set_rolling_daily(temp.path(), "main.log");

    let audit = stagelog::new_logger(temp.path(), "audit.log", None, FormatFlags::NONE);
    audit.output(None, "user 7 logged in");
    audit.flush();
    stagelog::info!("main only");
    stagelog::flush();

    assert_eq!(read(&temp.path().join("audit.log")), "user 7 logged in\n");
    assert!(!read(&temp.path().join("main.log")).contains("user 7"));
}

#[test]
#[should_panic(expected = "cannot configure process-wide logger")]
fn unopenable_directory_panics() {
    let (_guard, _) = facade_lock();
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();
    stagelog::set_rolling_daily(&blocker, "app.log");
}
