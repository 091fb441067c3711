//! Headless DuoTrack client.
//!
//! The binary signs in, starts the sync engine and logs what a dashboard
//! would render. [`report`] turns notices and state into log lines.

pub mod auth;
pub mod report;
