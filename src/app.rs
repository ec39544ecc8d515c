//! Wayland session state and event dispatch
//!
//! This module owns the live connection: the registry scan, the
//! surface/toplevel handshake, per-frame buffer allocation and submission,
//! frame-callback pacing, and the routing of seat events into the input
//! aggregators. Everything runs single-threaded — one blocking dispatch per
//! loop iteration, all state mutated from the `Dispatch` impls below.

use std::fs::File;

use anyhow::{Context as _, Result};
use log::{debug, error, info, trace, warn};
use memmap2::MmapOptions;
use wayland_client::{
    delegate_noop,
    protocol::{
        wl_buffer::{self, WlBuffer},
        wl_callback::{self, WlCallback},
        wl_compositor::WlCompositor,
        wl_keyboard::{self, WlKeyboard},
        wl_pointer::{self, WlPointer},
        wl_registry::{self, WlRegistry},
        wl_seat::{self, WlSeat},
        wl_shm::{self, WlShm},
        wl_shm_pool::WlShmPool,
        wl_surface::WlSurface,
    },
    Connection, Dispatch, DispatchError, EventQueue, Proxy, QueueHandle, WEnum,
};
use wayland_protocols::xdg::shell::client::{
    xdg_surface::{self, XdgSurface},
    xdg_toplevel::{self, XdgToplevel},
    xdg_wm_base::{self, XdgWmBase},
};

use crate::config::LumenConfig;
use crate::error::ClientError;
use crate::frame::{FrameClock, FramePacer};
use crate::input::pointer::{AxisSourceKind, ButtonPhase, PointerFrame, ScrollAxis};
use crate::input::seat::{DeviceSlot, DeviceTransition};
use crate::input::KeyboardStateTracker;
use crate::render::{Checkerboard, BYTES_PER_PIXEL};
use crate::shm::ShmPool;

/// All session state: bound globals, the window objects, rendering and
/// pacing state, and the input aggregators.
pub struct LumenApp {
    config: LumenConfig,

    // Globals
    compositor: Option<WlCompositor>,
    shm: Option<WlShm>,
    wm_base: Option<XdgWmBase>,
    seat: Option<WlSeat>,

    // Window objects, held for the lifetime of the window
    surface: Option<WlSurface>,
    #[allow(dead_code)]
    xdg_surface: Option<XdgSurface>,
    #[allow(dead_code)]
    toplevel: Option<XdgToplevel>,
    configured: bool,
    width: u32,
    height: u32,

    // Rendering and pacing
    pacer: FramePacer,
    clock: FrameClock,
    in_flight: Vec<WlBuffer>,

    // Input devices and aggregation
    pointer: Option<WlPointer>,
    keyboard: Option<WlKeyboard>,
    pointer_slot: DeviceSlot,
    keyboard_slot: DeviceSlot,
    touch_slot: DeviceSlot,
    pointer_frame: PointerFrame,
    keyboard_state: KeyboardStateTracker,

    running: bool,
    fatal: Option<ClientError>,
}

impl LumenApp {
    fn new(config: LumenConfig) -> Self {
        let width = config.window.width;
        let height = config.window.height;
        let rate = config.animation.rate;
        Self {
            config,
            compositor: None,
            shm: None,
            wm_base: None,
            seat: None,
            surface: None,
            xdg_surface: None,
            toplevel: None,
            configured: false,
            width,
            height,
            pacer: FramePacer::new(),
            clock: FrameClock::new(rate),
            in_flight: Vec::new(),
            pointer: None,
            keyboard: None,
            pointer_slot: DeviceSlot::new(),
            keyboard_slot: DeviceSlot::new(),
            touch_slot: DeviceSlot::new(),
            pointer_frame: PointerFrame::new(),
            keyboard_state: KeyboardStateTracker::new(),
            running: true,
            fatal: None,
        }
    }

    fn fail(&mut self, err: ClientError) {
        error!("fatal: {err}");
        self.fatal = Some(err);
    }

    /// Check that the registry scan produced everything we cannot run
    /// without.
    fn require_globals(&self) -> Result<(), ClientError> {
        for (missing, name) in [
            (self.compositor.is_none(), "wl_compositor"),
            (self.shm.is_none(), "wl_shm"),
            (self.wm_base.is_none(), "xdg_wm_base"),
        ] {
            if missing {
                return Err(ClientError::ProtocolViolation(format!(
                    "compositor never advertised {name}"
                )));
            }
        }
        Ok(())
    }

    /// Surface → xdg_surface → toplevel handshake, plus the initial
    /// frame-callback arm. The first commit carries no buffer; content is
    /// only attached once the configure ack has gone out.
    fn create_window(&mut self, qh: &QueueHandle<Self>) -> Result<(), ClientError> {
        let compositor = self.compositor.as_ref().expect("checked by require_globals");
        let wm_base = self.wm_base.as_ref().expect("checked by require_globals");

        let surface = compositor.create_surface(qh, ());
        let xdg_surface = wm_base.get_xdg_surface(&surface, qh, ());
        let toplevel = xdg_surface.get_toplevel(qh, ());
        toplevel.set_title(self.config.window.title.clone());
        toplevel.set_app_id(self.config.window.app_id.clone());

        self.pacer.arm()?;
        surface.frame(qh, ());
        surface.commit();

        info!(
            "🪟 Window created: {}x{} \"{}\"",
            self.width, self.height, self.config.window.title
        );

        self.surface = Some(surface);
        self.xdg_surface = Some(xdg_surface);
        self.toplevel = Some(toplevel);
        Ok(())
    }

    /// Produce one frame: carve a fresh buffer over a fresh pool, paint the
    /// checkerboard at the given phase, and hand back the buffer.
    ///
    /// The wl pool object and the descriptor are construction-only — both
    /// are gone before the first pixel is written; the mapping alone backs
    /// the draw and is unmapped before the buffer is handed over.
    fn draw_frame(&self, qh: &QueueHandle<Self>, phase: f32) -> Result<WlBuffer, ClientError> {
        let shm = self
            .shm
            .as_ref()
            .ok_or_else(|| ClientError::ProtocolViolation("wl_shm not bound".into()))?;

        let width = self.width as usize;
        let height = self.height as usize;
        let stride = width * BYTES_PER_PIXEL;
        let size = stride * height;

        let pool = ShmPool::create(size)?;
        let wl_pool = shm.create_pool(pool.fd(), size as i32, qh, ());
        let buffer = wl_pool.create_buffer(
            0,
            width as i32,
            height as i32,
            stride as i32,
            wl_shm::Format::Xrgb8888,
            qh,
            (),
        );
        wl_pool.destroy();

        let mut map = pool.into_mapping();
        let pixels: &mut [u32] = bytemuck::cast_slice_mut(&mut map[..]);
        Checkerboard::fill(pixels, width, height, phase);
        drop(map);

        trace!("frame drawn at phase {phase:.2}");
        Ok(buffer)
    }

    /// Attach, damage, commit — in that order. The buffer is
    /// compositor-owned from here until its release event.
    fn submit(&mut self, buffer: WlBuffer) -> Result<(), ClientError> {
        if !self.configured {
            return Err(ClientError::ProtocolViolation(
                "buffer submitted before the first configure ack".into(),
            ));
        }
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| ClientError::ProtocolViolation("no surface to submit to".into()))?;

        surface.attach(Some(&buffer), 0, 0);
        surface.damage_buffer(0, 0, i32::MAX, i32::MAX);
        surface.commit();
        self.in_flight.push(buffer);
        Ok(())
    }

    /// Draw and submit one frame; a failed draw aborts this frame only,
    /// leaving the last-committed content on screen.
    fn present(&mut self, qh: &QueueHandle<Self>, phase: f32) {
        match self.draw_frame(qh, phase) {
            Ok(buffer) => {
                if let Err(err) = self.submit(buffer) {
                    self.fail(err);
                }
            }
            Err(err) if err.is_fatal() => self.fail(err),
            Err(err) => warn!("frame aborted: {err}"),
        }
    }

    /// Frame-callback delivery: re-arm first, then advance the clock and
    /// draw. Re-arming before the draw means a slow draw can never cost us
    /// the next callback.
    fn on_frame_done(&mut self, qh: &QueueHandle<Self>, time_ms: u32) {
        if let Err(err) = self.pacer.complete() {
            self.fail(err);
            return;
        }

        let Some(surface) = self.surface.clone() else {
            return;
        };
        if let Err(err) = self.pacer.arm() {
            self.fail(err);
            return;
        }
        surface.frame(qh, ());

        let phase = self.clock.tick(time_ms);
        if self.configured {
            self.present(qh, phase);
        }
    }

    /// Map, parse, and install an announced keymap. The descriptor and the
    /// mapping are both gone by the time this returns, whatever the
    /// outcome.
    fn install_keymap(&mut self, fd: std::os::fd::OwnedFd, size: u32) {
        let file = File::from(fd);
        let map = unsafe { MmapOptions::new().len(size as usize).map_copy_read_only(&file) };
        match map {
            Ok(bytes) => match self.keyboard_state.load_keymap_bytes(&bytes) {
                Ok(replaced) => {
                    info!("⌨️ Keymap installed (replaced existing: {replaced})");
                }
                Err(err) => warn!("ignoring unusable keymap: {err}"),
            },
            Err(err) => warn!("failed to map keymap descriptor: {err}"),
        }
    }

    /// Reconcile pointer/keyboard handles with an announced capability set.
    fn sync_seat_devices(&mut self, qh: &QueueHandle<Self>, caps: wl_seat::Capability) {
        let Some(seat) = self.seat.clone() else {
            return;
        };

        match self
            .pointer_slot
            .sync(caps.contains(wl_seat::Capability::Pointer))
        {
            DeviceTransition::Acquire => {
                info!("🖱️ Pointer capability present, acquiring device");
                self.pointer = Some(seat.get_pointer(qh, ()));
            }
            DeviceTransition::Release => {
                info!("🖱️ Pointer capability withdrawn, releasing device");
                if let Some(pointer) = self.pointer.take() {
                    if pointer.version() >= 3 {
                        pointer.release();
                    }
                }
                self.pointer_frame = PointerFrame::new();
            }
            DeviceTransition::Unchanged => {}
        }

        match self
            .keyboard_slot
            .sync(caps.contains(wl_seat::Capability::Keyboard))
        {
            DeviceTransition::Acquire => {
                info!("⌨️ Keyboard capability present, acquiring device");
                self.keyboard = Some(seat.get_keyboard(qh, ()));
            }
            DeviceTransition::Release => {
                info!("⌨️ Keyboard capability withdrawn, releasing device");
                if let Some(keyboard) = self.keyboard.take() {
                    if keyboard.version() >= 3 {
                        keyboard.release();
                    }
                }
            }
            DeviceTransition::Unchanged => {}
        }

        // Touch is tracked for completeness but never acquired.
        match self
            .touch_slot
            .sync(caps.contains(wl_seat::Capability::Touch))
        {
            DeviceTransition::Acquire => debug!("touch capability present (unused)"),
            DeviceTransition::Release => debug!("touch capability withdrawn"),
            DeviceTransition::Unchanged => {}
        }
    }
}

/// The connection, its event queue, and the session state: everything
/// `run` needs to drive the client to completion.
pub struct LumenClient {
    queue: EventQueue<LumenApp>,
    app: LumenApp,
}

impl LumenClient {
    /// Connect to the compositor named by the environment, scan the
    /// registry, and create the window. Any failure here is a bootstrap
    /// failure (process exit code 1).
    pub fn connect(config: LumenConfig) -> Result<Self> {
        let conn = Connection::connect_to_env()
            .context("failed to connect to the Wayland display")?;

        let mut queue = conn.new_event_queue();
        let qh = queue.handle();
        let display = conn.display();
        let _registry = display.get_registry(&qh, ());

        let mut app = LumenApp::new(config);
        queue
            .roundtrip(&mut app)
            .context("initial registry roundtrip failed")?;

        app.require_globals()?;
        app.create_window(&qh)?;

        Ok(Self { queue, app })
    }

    /// Blocking dispatch loop: one batch of queued events per iteration,
    /// suspended until activity or disconnect. Returns cleanly when the
    /// toplevel is closed or the compositor goes away; protocol-level
    /// rejections unwind as errors.
    pub fn run(mut self) -> Result<()> {
        info!("🎬 Entering dispatch loop");

        while self.app.running {
            match self.queue.blocking_dispatch(&mut self.app) {
                Ok(_) => {}
                Err(DispatchError::Backend(err))
                    if matches!(
                        err,
                        wayland_client::backend::WaylandError::Protocol(_)
                    ) =>
                {
                    return Err(ClientError::ProtocolViolation(err.to_string()).into());
                }
                Err(err) => {
                    // Display disconnect ends the run the same way the
                    // dispatch loop ending normally does.
                    info!("connection closed: {err}");
                    break;
                }
            }

            if let Some(err) = self.app.fatal.take() {
                return Err(err.into());
            }
        }

        info!("🛑 Dispatch loop finished");
        Ok(())
    }
}

impl Dispatch<WlRegistry, ()> for LumenApp {
    fn event(
        state: &mut Self,
        registry: &WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => match interface.as_str() {
                "wl_compositor" => {
                    state.compositor =
                        Some(registry.bind::<WlCompositor, _, _>(name, 4, qh, ()));
                    debug!("bound wl_compositor v4");
                }
                "wl_shm" => {
                    state.shm = Some(registry.bind::<WlShm, _, _>(name, 1, qh, ()));
                    debug!("bound wl_shm v1");
                }
                "wl_seat" => {
                    let bind_version = version.min(7);
                    state.seat =
                        Some(registry.bind::<WlSeat, _, _>(name, bind_version, qh, ()));
                    debug!("bound wl_seat v{bind_version}");
                }
                "xdg_wm_base" => {
                    state.wm_base = Some(registry.bind::<XdgWmBase, _, _>(name, 1, qh, ()));
                    debug!("bound xdg_wm_base v1");
                }
                _ => trace!("unbound global: {interface} v{version}"),
            },
            wl_registry::Event::GlobalRemove { name } => {
                debug!("global removed: {name}");
            }
            _ => {}
        }
    }
}

impl Dispatch<WlShm, ()> for LumenApp {
    fn event(
        _: &mut Self,
        _: &WlShm,
        event: wl_shm::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_shm::Event::Format { format } = event {
            trace!("shm format advertised: {format:?}");
        }
    }
}

impl Dispatch<XdgWmBase, ()> for LumenApp {
    fn event(
        _: &mut Self,
        wm_base: &XdgWmBase,
        event: xdg_wm_base::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            wm_base.pong(serial);
        }
    }
}

impl Dispatch<XdgSurface, ()> for LumenApp {
    fn event(
        state: &mut Self,
        xdg_surface: &XdgSurface,
        event: xdg_surface::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            // The ack must precede the commit that carries content.
            xdg_surface.ack_configure(serial);
            let first = !state.configured;
            state.configured = true;
            if first {
                debug!("first configure acked, presenting initial frame");
            }
            let phase = state.clock.phase();
            state.present(qh, phase);
        }
    }
}

impl Dispatch<XdgToplevel, ()> for LumenApp {
    fn event(
        state: &mut Self,
        _: &XdgToplevel,
        event: xdg_toplevel::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, .. } => {
                // Zero means "you pick"; we keep the configured geometry.
                if width > 0 && height > 0 {
                    let (w, h) = (width as u32, height as u32);
                    if (w, h) != (state.width, state.height) {
                        debug!("toplevel resized to {w}x{h}");
                        state.width = w;
                        state.height = h;
                    }
                }
            }
            xdg_toplevel::Event::Close => {
                info!("close requested, shutting down");
                state.running = false;
            }
            _ => {}
        }
    }
}

impl Dispatch<WlCallback, ()> for LumenApp {
    fn event(
        state: &mut Self,
        _: &WlCallback,
        event: wl_callback::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_callback::Event::Done { callback_data } = event {
            state.on_frame_done(qh, callback_data);
        }
    }
}

impl Dispatch<WlBuffer, ()> for LumenApp {
    fn event(
        state: &mut Self,
        buffer: &WlBuffer,
        event: wl_buffer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_buffer::Event::Release = event {
            // Ownership is back with us; the buffer is single-use, so it
            // is destroyed rather than reused.
            state.in_flight.retain(|b| b.id() != buffer.id());
            buffer.destroy();
            trace!("buffer released ({} still in flight)", state.in_flight.len());
        }
    }
}

impl Dispatch<WlSeat, ()> for LumenApp {
    fn event(
        state: &mut Self,
        _: &WlSeat,
        event: wl_seat::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_seat::Event::Capabilities {
                capabilities: WEnum::Value(caps),
            } => {
                state.sync_seat_devices(qh, caps);
            }
            wl_seat::Event::Name { name } => {
                debug!("seat name: {name}");
            }
            _ => {}
        }
    }
}

fn scroll_axis(axis: WEnum<wl_pointer::Axis>) -> Option<ScrollAxis> {
    match axis {
        WEnum::Value(wl_pointer::Axis::VerticalScroll) => Some(ScrollAxis::Vertical),
        WEnum::Value(wl_pointer::Axis::HorizontalScroll) => Some(ScrollAxis::Horizontal),
        _ => None,
    }
}

fn axis_source_kind(source: WEnum<wl_pointer::AxisSource>) -> Option<AxisSourceKind> {
    match source {
        WEnum::Value(wl_pointer::AxisSource::Wheel) => Some(AxisSourceKind::Wheel),
        WEnum::Value(wl_pointer::AxisSource::Finger) => Some(AxisSourceKind::Finger),
        WEnum::Value(wl_pointer::AxisSource::Continuous) => Some(AxisSourceKind::Continuous),
        WEnum::Value(wl_pointer::AxisSource::WheelTilt) => Some(AxisSourceKind::WheelTilt),
        _ => None,
    }
}

impl Dispatch<WlPointer, ()> for LumenApp {
    fn event(
        state: &mut Self,
        _: &WlPointer,
        event: wl_pointer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let frame = &mut state.pointer_frame;
        match event {
            wl_pointer::Event::Enter {
                serial,
                surface_x,
                surface_y,
                ..
            } => frame.enter(serial, surface_x, surface_y),
            wl_pointer::Event::Leave { serial, .. } => frame.leave(serial),
            wl_pointer::Event::Motion {
                time,
                surface_x,
                surface_y,
            } => frame.motion(time, surface_x, surface_y),
            wl_pointer::Event::Button {
                serial,
                time,
                button,
                state: button_state,
            } => {
                let phase = match button_state {
                    WEnum::Value(wl_pointer::ButtonState::Pressed) => ButtonPhase::Pressed,
                    _ => ButtonPhase::Released,
                };
                frame.button(serial, time, button, phase);
            }
            wl_pointer::Event::Axis { time, axis, value } => {
                if let Some(axis) = scroll_axis(axis) {
                    frame.axis(time, axis, value);
                }
            }
            wl_pointer::Event::AxisSource { axis_source } => {
                if let Some(source) = axis_source_kind(axis_source) {
                    frame.axis_source(source);
                }
            }
            wl_pointer::Event::AxisStop { time, axis } => {
                if let Some(axis) = scroll_axis(axis) {
                    frame.axis_stop(time, axis);
                }
            }
            wl_pointer::Event::AxisDiscrete { axis, discrete } => {
                if let Some(axis) = scroll_axis(axis) {
                    frame.axis_discrete(axis, discrete);
                }
            }
            wl_pointer::Event::Frame => {
                if let Some(summary) = frame.flush() {
                    info!("{summary}");
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<WlKeyboard, ()> for LumenApp {
    fn event(
        state: &mut Self,
        _: &WlKeyboard,
        event: wl_keyboard::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_keyboard::Event::Keymap { format, fd, size } => match format {
                WEnum::Value(wl_keyboard::KeymapFormat::XkbV1) => {
                    state.install_keymap(fd, size);
                }
                other => warn!("unsupported keymap format {other:?}, keys will not resolve"),
            },
            wl_keyboard::Event::Enter { keys, .. } => {
                // Keys already held when focus arrives, packed as native
                // u32 scancodes.
                let held: Vec<String> = keys
                    .chunks_exact(4)
                    .filter_map(|raw| {
                        let code = u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]);
                        state.keyboard_state.resolve(code).map(|p| p.sym_name)
                    })
                    .collect();
                info!("keyboard focus entered (held: {held:?})");
            }
            wl_keyboard::Event::Leave { .. } => {
                debug!("keyboard focus left");
            }
            wl_keyboard::Event::Key {
                time, key, state: key_state, ..
            } => {
                let pressed =
                    matches!(key_state, WEnum::Value(wl_keyboard::KeyState::Pressed));
                if let Some(press) = state.keyboard_state.resolve(key) {
                    if pressed {
                        info!(
                            "key press @ {time}: sym {} utf8 '{}'",
                            press.sym_name, press.text
                        );
                    } else {
                        info!("key release @ {time}: sym {}", press.sym_name);
                    }
                }
            }
            wl_keyboard::Event::Modifiers {
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
                ..
            } => {
                state
                    .keyboard_state
                    .update_modifiers(mods_depressed, mods_latched, mods_locked, group);
            }
            wl_keyboard::Event::RepeatInfo { rate, delay } => {
                state.keyboard_state.set_repeat_info(rate, delay);
                debug!("key repeat: {rate}/s after {delay}ms");
            }
            _ => {}
        }
    }
}

// Objects whose events carry nothing we act on.
delegate_noop!(LumenApp: WlCompositor);
delegate_noop!(LumenApp: WlShmPool);
delegate_noop!(LumenApp: ignore WlSurface);
