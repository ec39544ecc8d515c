//! Seat capability tracking and device lifecycle
//!
//! The seat re-announces its full capability set whenever devices come and
//! go. Each device class runs a tiny `Absent ↔ Present` state machine whose
//! transitions tell the caller exactly when to acquire or release a
//! protocol handle. Idempotence is structural: re-announcing an unchanged
//! capability produces no transition.

/// Lifecycle state of one device class on the seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DeviceState {
    #[default]
    Absent,
    Present,
}

/// What the caller must do after a capability announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceTransition {
    /// Capability appeared: acquire the device handle and attach listeners.
    Acquire,
    /// Capability vanished: release and clear the handle.
    Release,
    /// No change; the announcement repeats what we already track.
    Unchanged,
}

/// Per-device-class capability tracker.
#[derive(Debug, Default)]
pub struct DeviceSlot {
    state: DeviceState,
}

impl DeviceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile with the announced capability bit for this class.
    pub fn sync(&mut self, present: bool) -> DeviceTransition {
        match (self.state, present) {
            (DeviceState::Absent, true) => {
                self.state = DeviceState::Present;
                DeviceTransition::Acquire
            }
            (DeviceState::Present, false) => {
                self.state = DeviceState::Absent;
                DeviceTransition::Release
            }
            _ => DeviceTransition::Unchanged,
        }
    }

    pub fn is_present(&self) -> bool {
        self.state == DeviceState::Present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_then_release() {
        let mut slot = DeviceSlot::new();
        assert_eq!(slot.sync(true), DeviceTransition::Acquire);
        assert!(slot.is_present());
        assert_eq!(slot.sync(false), DeviceTransition::Release);
        assert!(!slot.is_present());
    }

    #[test]
    fn test_repeated_announcement_is_idempotent() {
        let mut slot = DeviceSlot::new();
        assert_eq!(slot.sync(true), DeviceTransition::Acquire);
        // The compositor re-announcing the same set must not re-acquire.
        assert_eq!(slot.sync(true), DeviceTransition::Unchanged);
        assert_eq!(slot.sync(true), DeviceTransition::Unchanged);

        assert_eq!(slot.sync(false), DeviceTransition::Release);
        // Nor release an already-absent device.
        assert_eq!(slot.sync(false), DeviceTransition::Unchanged);
    }

    #[test]
    fn test_initial_absent_announcement_is_noop() {
        let mut slot = DeviceSlot::new();
        assert_eq!(slot.sync(false), DeviceTransition::Unchanged);
        assert!(!slot.is_present());
    }

    #[test]
    fn test_flapping_capability() {
        let mut slot = DeviceSlot::new();
        for _ in 0..3 {
            assert_eq!(slot.sync(true), DeviceTransition::Acquire);
            assert_eq!(slot.sync(false), DeviceTransition::Release);
        }
    }
}
