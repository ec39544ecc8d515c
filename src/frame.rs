//! Frame-callback pacing and the animation clock
//!
//! The compositor hands out one-shot frame callbacks; keeping exactly one
//! in flight per surface is what paces redraws. `FramePacer` owns that
//! invariant, `FrameClock` turns callback timestamps into an animation
//! phase. Failing to re-arm halts all future animation permanently, so the
//! callback handler re-arms before it draws anything.

use log::trace;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PacerState {
    /// No callback outstanding.
    Idle,
    /// One frame-callback request in flight.
    AwaitingCallback,
}

/// Tracks the single outstanding frame-callback request for a surface.
///
/// Arms and completions are counted so the pacing invariant — arms equal
/// completions plus the initial arm — stays checkable across a run.
#[derive(Debug)]
pub struct FramePacer {
    state: PacerState,
    arms: u64,
    completions: u64,
}

impl FramePacer {
    pub fn new() -> Self {
        Self {
            state: PacerState::Idle,
            arms: 0,
            completions: 0,
        }
    }

    /// Record a new frame-callback request. Arming while a request is
    /// already in flight is a logical error the protocol cannot recover
    /// from, so it surfaces as a violation rather than being ignored.
    pub fn arm(&mut self) -> Result<(), ClientError> {
        if self.state == PacerState::AwaitingCallback {
            return Err(ClientError::ProtocolViolation(
                "frame callback armed while one is already in flight".into(),
            ));
        }
        self.state = PacerState::AwaitingCallback;
        self.arms += 1;
        trace!("frame pacer armed (total arms: {})", self.arms);
        Ok(())
    }

    /// Record delivery of the outstanding callback.
    pub fn complete(&mut self) -> Result<(), ClientError> {
        if self.state == PacerState::Idle {
            return Err(ClientError::ProtocolViolation(
                "frame callback completed with none outstanding".into(),
            ));
        }
        self.state = PacerState::Idle;
        self.completions += 1;
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.state == PacerState::AwaitingCallback
    }

    pub fn arms(&self) -> u64 {
        self.arms
    }

    pub fn completions(&self) -> u64 {
        self.completions
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}

/// Advances the animation phase from compositor frame timestamps.
#[derive(Debug)]
pub struct FrameClock {
    last_frame_time: u32,
    phase: f32,
    rate: f32,
}

impl FrameClock {
    /// `rate` is the phase advance per second of wall time.
    pub fn new(rate: f32) -> Self {
        Self {
            last_frame_time: 0,
            phase: 0.0,
            rate,
        }
    }

    /// Feed a callback timestamp (milliseconds) and get the current phase.
    ///
    /// The very first callback has no predecessor to measure against, so
    /// its delta is skipped rather than applied as a spurious huge jump.
    pub fn tick(&mut self, time_ms: u32) -> f32 {
        if self.last_frame_time != 0 {
            let elapsed = time_ms.wrapping_sub(self.last_frame_time);
            self.phase += elapsed as f32 / 1000.0 * self.rate;
        }
        self.last_frame_time = time_ms;
        self.phase
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }
}
