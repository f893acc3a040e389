//! StreamFlow player backend.
//!
//! Merges per-video and global ad rules into a playback schedule, runs the
//! ad interruption state machine for each mounted player, and serves the
//! catalog and player sessions over HTTP.

pub mod catalog;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod playback;
pub mod schedule;
pub mod server;
pub mod session;
