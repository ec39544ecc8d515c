//! Input-event aggregation for the seat's devices
//!
//! Wire events arrive as many small sub-events; these modules own the state
//! machines that turn them into coherent, atomic input frames: pointer
//! sub-event coalescing, keyboard layout/modifier tracking, and the
//! per-device acquire/release lifecycle driven by seat capabilities.

pub mod keyboard;
pub mod pointer;
pub mod seat;

pub use keyboard::{KeyPress, KeyboardStateTracker};
pub use pointer::{AxisSourceKind, ButtonPhase, PointerFrame, ScrollAxis};
pub use seat::{DeviceSlot, DeviceTransition};
