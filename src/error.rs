//! Failure taxonomy for the client runtime
//!
//! Everything that can go wrong past bootstrap falls into one of four
//! buckets. Shared-memory name collisions are retried internally by the
//! pool allocator; all other failures propagate to the caller as one of
//! these variants. `ConnectionLost` is fatal and unwinds the whole run.

use std::io;
use thiserror::Error;

/// Errors produced by the Wayland client runtime.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The shared-memory object could not be created or sized, even after
    /// bounded name retries.
    #[error("shared memory allocation failed: {0}")]
    AllocationFailed(#[source] io::Error),

    /// A descriptor could not be mapped into the address space.
    #[error("mapping shared memory failed: {0}")]
    MapFailed(#[source] io::Error),

    /// The compositor rejected us, or we caught ourselves about to break a
    /// protocol invariant (e.g. double-arming the frame callback). Fatal,
    /// never retried.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The dispatch loop returned a terminal failure.
    #[error("connection to compositor lost: {0}")]
    ConnectionLost(String),
}

impl ClientError {
    /// True for errors that must unwind the whole run rather than abort a
    /// single frame.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::ProtocolViolation(_) | ClientError::ConnectionLost(_)
        )
    }
}
