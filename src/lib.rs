//! # Lumen — a shared-memory Wayland client runtime
//!
//! Lumen keeps a live connection to a Wayland compositor, negotiates an
//! xdg-toplevel surface, renders an animated checkerboard into shared-memory
//! buffers paced by the compositor's frame callbacks, and coalesces raw
//! input sub-events into atomic input frames.
//!
//! ## Architecture
//!
//! - `app`: session state, registry scan, surface handshake, dispatch loop
//! - `shm`: anonymous shared-memory pools backing pixel buffers
//! - `render`: procedural pixel content (the checkerboard)
//! - `frame`: frame-callback pacing and the animation clock
//! - `input`: pointer frame aggregation, keyboard layout tracking, and the
//!   seat device lifecycle
//! - `config`: TOML configuration parsing and validation
//! - `error`: the failure taxonomy
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lumen::{LumenClient, LumenConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LumenConfig::default();
//!     LumenClient::connect(config)?.run()
//! }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod frame;
pub mod input;
pub mod render;
pub mod shm;

// Re-export main types for easy access
pub use app::{LumenApp, LumenClient};
pub use config::LumenConfig;
pub use error::ClientError;
pub use frame::{FrameClock, FramePacer};
pub use input::pointer::PointerFrame;
pub use render::Checkerboard;
pub use shm::ShmPool;

// Re-export common error types
pub use anyhow::{Context, Error, Result};
