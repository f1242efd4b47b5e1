//! # Reelfeed Player Library (reelfeed-player)
//!
//! Playback coordination service for the vertical short-video feed.
//!
//! **Purpose:** Keep one adaptive-streaming engine per visible feed row in
//! lockstep with viewport visibility, prime the next row ahead of the
//! scroll, and publish playback state over HTTP/SSE.
//!
//! **Architecture:** Event-driven session state machines over an engine
//! abstraction, coordinated by a feed controller that owns the item list
//! and the current-row cursor.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
