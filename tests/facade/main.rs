//! Integration tests for the process-wide facade.
//!
//! These tests exercise the free functions and macros exactly as an
//! application would: configure once, log from many threads, close.
//! Owned-dispatcher behavior is covered in crates/engine/tests.

#[path = "../common/mod.rs"]
mod common;

mod config;
mod emission;
mod rotation;
