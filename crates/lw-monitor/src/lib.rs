//! LogWatch monitor: library crate for monitoring sessions.
//!
//! Re-exports all modules so external crates (e.g. `lw-e2e-tests`) can
//! drive `Session` and build analyzers from `MonitorConfig`.

pub mod config;
pub mod runner;
pub mod session;
