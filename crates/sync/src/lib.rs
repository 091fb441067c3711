//! Client-side state synchronisation for DuoTrack.
//!
//! One [`store::Store`] holds the whole view state. Three sources feed it:
//! the dashboard poll, optimistic local actions and socket pushes. Every
//! write goes through [`reducer::reduce`] tagged with its [`reducer::Source`].

pub mod context;
pub mod dashboard;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod goals;
pub mod notice;
pub mod partner;
pub mod presence;
pub mod reducer;
pub mod seq;
pub mod session;
pub mod store;
pub mod tasks;
pub mod timer;

pub use context::SyncContext;
pub use engine::{Engine, EngineConfig};
pub use error::SyncError;
pub use notice::{Notice, Notifier, ToastLevel};
pub use store::{AppState, Store};
