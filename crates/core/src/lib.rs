//! Domain types and pure helpers shared by every DuoTrack crate.
//!
//! Nothing in this crate performs I/O. The REST client, the socket
//! channel and the state synchronizer all build on these types.

pub mod dashboard;
pub mod dates;
pub mod error;
pub mod task;
pub mod timer;
pub mod types;
pub mod user;
