//! REST client for the DuoTrack backend.
//!
//! - [`ClientConfig`] reads endpoints and timings from the environment.
//! - [`TokenStore`] keeps the bearer token, optionally on disk.
//! - [`DuoTrackApi`] wraps every REST endpoint the client consumes.
//! - [`Backend`] is the seam the synchronizer talks to, so tests can swap
//!   in a scripted implementation.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod token;

pub use api::DuoTrackApi;
pub use backend::Backend;
pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use token::TokenStore;
