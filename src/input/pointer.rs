//! Pointer sub-event coalescing into atomic frames
//!
//! Input devices emit logically atomic gestures ("moved here and the wheel
//! ticked") as several separate wire events. The accumulator merges every
//! sub-event between two frame-boundary signals — later values for the same
//! field overwrite earlier ones — and a single flush renders the whole
//! gesture, then resets to empty.

use std::fmt::Write as _;

/// Which sub-event kinds occurred since the last flush.
///
/// Named flags rather than a raw mask so the flush logic stays exhaustive
/// under the compiler's eye.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PointerEventSet {
    pub enter: bool,
    pub leave: bool,
    pub motion: bool,
    pub button: bool,
    pub axis: bool,
    pub axis_source: bool,
    pub axis_stop: bool,
    pub axis_discrete: bool,
}

impl PointerEventSet {
    pub fn any(&self) -> bool {
        self.enter
            || self.leave
            || self.motion
            || self.button
            || self.axis
            || self.axis_source
            || self.axis_stop
            || self.axis_discrete
    }
}

/// The two scroll axes, in their fixed reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAxis {
    Vertical = 0,
    Horizontal = 1,
}

impl ScrollAxis {
    /// All axes in reporting order (vertical first).
    pub const ALL: [ScrollAxis; 2] = [ScrollAxis::Vertical, ScrollAxis::Horizontal];

    pub fn label(self) -> &'static str {
        match self {
            ScrollAxis::Vertical => "vertical",
            ScrollAxis::Horizontal => "horizontal",
        }
    }
}

/// Button press/release phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPhase {
    Pressed,
    Released,
}

impl ButtonPhase {
    fn label(self) -> &'static str {
        match self {
            ButtonPhase::Pressed => "pressed",
            ButtonPhase::Released => "released",
        }
    }
}

/// Where axis motion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSourceKind {
    Wheel,
    Finger,
    Continuous,
    WheelTilt,
}

impl AxisSourceKind {
    fn label(self) -> &'static str {
        match self {
            AxisSourceKind::Wheel => "wheel",
            AxisSourceKind::Finger => "finger",
            AxisSourceKind::Continuous => "continuous",
            AxisSourceKind::WheelTilt => "wheel tilt",
        }
    }
}

/// Accumulated state for one scroll axis.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AxisFrame {
    /// Set when any axis sub-event touched this axis since the last flush.
    pub valid: bool,
    pub value: f64,
    pub discrete: i32,
}

/// Accumulates heterogeneous pointer sub-events into one atomic frame.
///
/// Sub-event handlers only merge; they never flush. The dedicated
/// frame-boundary signal drives `flush`, which renders a summary and
/// resets the accumulator to its empty initial state.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PointerFrame {
    events: PointerEventSet,
    surface_x: f64,
    surface_y: f64,
    button: u32,
    button_phase: Option<ButtonPhase>,
    time: u32,
    serial: u32,
    axes: [AxisFrame; 2],
    axis_source: Option<AxisSourceKind>,
}

impl PointerFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no sub-event has arrived since the last flush.
    pub fn is_empty(&self) -> bool {
        !self.events.any()
    }

    pub fn enter(&mut self, serial: u32, surface_x: f64, surface_y: f64) {
        self.events.enter = true;
        self.serial = serial;
        self.surface_x = surface_x;
        self.surface_y = surface_y;
    }

    pub fn leave(&mut self, serial: u32) {
        self.events.leave = true;
        self.serial = serial;
    }

    pub fn motion(&mut self, time: u32, surface_x: f64, surface_y: f64) {
        self.events.motion = true;
        self.time = time;
        self.surface_x = surface_x;
        self.surface_y = surface_y;
    }

    pub fn button(&mut self, serial: u32, time: u32, button: u32, phase: ButtonPhase) {
        self.events.button = true;
        self.serial = serial;
        self.time = time;
        self.button = button;
        self.button_phase = Some(phase);
    }

    pub fn axis(&mut self, time: u32, axis: ScrollAxis, value: f64) {
        self.events.axis = true;
        self.time = time;
        let slot = &mut self.axes[axis as usize];
        slot.valid = true;
        slot.value = value;
    }

    pub fn axis_source(&mut self, source: AxisSourceKind) {
        self.events.axis_source = true;
        self.axis_source = Some(source);
    }

    pub fn axis_stop(&mut self, time: u32, axis: ScrollAxis) {
        self.events.axis_stop = true;
        self.time = time;
        self.axes[axis as usize].valid = true;
    }

    pub fn axis_discrete(&mut self, axis: ScrollAxis, discrete: i32) {
        self.events.axis_discrete = true;
        let slot = &mut self.axes[axis as usize];
        slot.valid = true;
        slot.discrete = discrete;
    }

    /// Render everything accumulated since the last flush and reset.
    ///
    /// Returns `None` for an empty frame. Reporting order is fixed:
    /// enter/leave/motion/button first, then each valid axis in
    /// vertical-then-horizontal order.
    pub fn flush(&mut self) -> Option<String> {
        if self.is_empty() {
            *self = Self::default();
            return None;
        }

        let mut out = format!("pointer frame @ {}:", self.time);

        if self.events.enter {
            let _ = write!(
                out,
                " entered ({:.2}, {:.2})",
                self.surface_x, self.surface_y
            );
        }
        if self.events.leave {
            let _ = write!(out, " left");
        }
        if self.events.motion {
            let _ = write!(out, " motion ({:.2}, {:.2})", self.surface_x, self.surface_y);
        }
        if self.events.button {
            let phase = self.button_phase.map(ButtonPhase::label).unwrap_or("?");
            let _ = write!(out, " button {} {}", self.button, phase);
        }

        for axis in ScrollAxis::ALL {
            let slot = self.axes[axis as usize];
            if !slot.valid {
                continue;
            }
            let _ = write!(out, " {} axis", axis.label());
            if self.events.axis {
                let _ = write!(out, " value {:.2}", slot.value);
            }
            if self.events.axis_discrete {
                let _ = write!(out, " discrete {}", slot.discrete);
            }
            if self.events.axis_source {
                if let Some(source) = self.axis_source {
                    let _ = write!(out, " via {}", source.label());
                }
            }
            if self.events.axis_stop {
                let _ = write!(out, " (stopped)");
            }
        }

        *self = Self::default();
        Some(out)
    }
}
