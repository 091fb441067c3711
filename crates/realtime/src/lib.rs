//! Real-time socket channel between linked partners.
//!
//! Provides typed event parsing, WebSocket connection handling,
//! exponential-backoff reconnection, and a background channel task that
//! re-joins the partner room after every reconnect.
//!
//! # Transport
//!
//! The channel speaks plain WebSocket with JSON text frames
//! (`{"type": ..., "data": ...}`, see [`messages`]). It does not implement
//! the Socket.IO protocol: there is no Engine.IO handshake, no `42[...]`
//! packet framing and no polling fallback. A server built on Socket.IO needs
//! a plain WebSocket endpoint carrying these frames.

pub mod channel;
pub mod client;
pub mod messages;
pub mod reconnect;

pub use channel::{ChannelEvent, JoinIdentity, RealtimeHandle};
pub use client::{RealtimeClient, RealtimeError};
pub use messages::{ClientEvent, ServerEvent};
