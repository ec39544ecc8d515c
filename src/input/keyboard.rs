//! Keyboard layout and modifier state tracking
//!
//! The compositor announces keymaps as xkb text; we compile them and keep a
//! live modifier/group state alongside. Keymap and state always travel as
//! one `ActiveLayout` value that is replaced atomically — the new pair is
//! fully built before the old one is dropped, so a key can never be
//! attributed to a stale layout mid-transition.

use log::debug;
use xkbcommon::xkb;

use crate::error::ClientError;

/// Bias between evdev scancodes on the wire and xkb keycodes.
pub const EVDEV_KEYCODE_OFFSET: u32 = 8;

/// A compiled keymap plus the modifier/group state that interprets it.
struct ActiveLayout {
    keymap: xkb::Keymap,
    state: xkb::State,
}

/// A raw keycode resolved against the current layout and modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    /// Symbolic keysym name, e.g. `a`, `Return`, `Shift_L`.
    pub sym_name: String,
    /// UTF-8 text the key produces under current modifiers; may be empty.
    pub text: String,
}

/// Owns the active layout and resolves raw device keycodes.
pub struct KeyboardStateTracker {
    context: xkb::Context,
    layout: Option<ActiveLayout>,
    repeat: Option<(i32, i32)>,
}

impl KeyboardStateTracker {
    pub fn new() -> Self {
        Self {
            context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS),
            layout: None,
            repeat: None,
        }
    }

    /// Compile and install a keymap from its xkb text form.
    ///
    /// Returns whether an existing layout was replaced.
    pub fn load_keymap(&mut self, text: &str) -> Result<bool, ClientError> {
        let keymap = xkb::Keymap::new_from_string(
            &self.context,
            text.to_owned(),
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .ok_or_else(|| ClientError::ProtocolViolation("keymap failed to compile".into()))?;
        let state = xkb::State::new(&keymap);

        let replaced = self.layout.is_some();
        self.layout = Some(ActiveLayout { keymap, state });
        debug!("keymap installed (replaced existing: {replaced})");
        Ok(replaced)
    }

    /// Install a keymap from the NUL-terminated bytes the compositor maps
    /// into us.
    pub fn load_keymap_bytes(&mut self, bytes: &[u8]) -> Result<bool, ClientError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| ClientError::ProtocolViolation("keymap is not valid UTF-8".into()))?
            .trim_end_matches('\0');
        self.load_keymap(text)
    }

    pub fn has_layout(&self) -> bool {
        self.layout.is_some()
    }

    /// Update the live modifier/group state. Never touches the keymap.
    pub fn update_modifiers(&mut self, depressed: u32, latched: u32, locked: u32, group: u32) {
        if let Some(layout) = &mut self.layout {
            layout
                .state
                .update_mask(depressed, latched, locked, 0, 0, group);
        }
    }

    pub fn set_repeat_info(&mut self, rate: i32, delay: i32) {
        self.repeat = Some((rate, delay));
    }

    /// Key-repeat (rate per second, delay ms) as last announced.
    pub fn repeat_info(&self) -> Option<(i32, i32)> {
        self.repeat
    }

    /// Resolve a raw device keycode to its symbolic and text forms under
    /// the current modifier state. The result is only meaningful until the
    /// next modifier or keymap update.
    pub fn resolve(&self, keycode: u32) -> Option<KeyPress> {
        let layout = self.layout.as_ref()?;
        let code: xkb::Keycode = (keycode + EVDEV_KEYCODE_OFFSET).into();
        let sym = layout.state.key_get_one_sym(code);
        Some(KeyPress {
            sym_name: xkb::keysym_get_name(sym),
            text: layout.state.key_get_utf8(code),
        })
    }

    /// Index of a named modifier in the active keymap, for callers that
    /// need to build masks (tests, diagnostics).
    pub fn modifier_index(&self, name: &str) -> Option<u32> {
        let layout = self.layout.as_ref()?;
        match layout.keymap.mod_get_index(name) {
            xkb::MOD_INVALID => None,
            idx => Some(idx),
        }
    }
}

impl Default for KeyboardStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // evdev scancodes used below.
    const KEY_A: u32 = 30;
    const KEY_ENTER: u32 = 28;

    fn us_keymap_text() -> String {
        let ctx = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = xkb::Keymap::new_from_names(
            &ctx,
            "",
            "",
            "us",
            "",
            None,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .expect("compile default us keymap");
        keymap.get_as_string(xkb::KEYMAP_FORMAT_TEXT_V1)
    }

    #[test]
    fn test_resolve_without_layout_is_none() {
        let tracker = KeyboardStateTracker::new();
        assert!(!tracker.has_layout());
        assert!(tracker.resolve(KEY_A).is_none());
    }

    #[test]
    fn test_load_and_resolve_plain_key() {
        let mut tracker = KeyboardStateTracker::new();
        let replaced = tracker.load_keymap(&us_keymap_text()).unwrap();
        assert!(!replaced);

        let press = tracker.resolve(KEY_A).unwrap();
        assert_eq!(press.sym_name, "a");
        assert_eq!(press.text, "a");

        let enter = tracker.resolve(KEY_ENTER).unwrap();
        assert_eq!(enter.sym_name, "Return");
    }

    #[test]
    fn test_modifiers_change_resolution() {
        let mut tracker = KeyboardStateTracker::new();
        tracker.load_keymap(&us_keymap_text()).unwrap();

        let shift = tracker.modifier_index(xkb::MOD_NAME_SHIFT).unwrap();
        tracker.update_modifiers(1 << shift, 0, 0, 0);

        let press = tracker.resolve(KEY_A).unwrap();
        assert_eq!(press.sym_name, "A");
        assert_eq!(press.text, "A");

        // Dropping the modifier restores the plain resolution.
        tracker.update_modifiers(0, 0, 0, 0);
        assert_eq!(tracker.resolve(KEY_A).unwrap().sym_name, "a");
    }

    #[test]
    fn test_reload_reports_replacement() {
        let mut tracker = KeyboardStateTracker::new();
        let text = us_keymap_text();
        assert!(!tracker.load_keymap(&text).unwrap());
        assert!(tracker.load_keymap(&text).unwrap());
        assert!(tracker.has_layout());
    }

    #[test]
    fn test_keymap_bytes_with_trailing_nul() {
        let mut tracker = KeyboardStateTracker::new();
        let mut bytes = us_keymap_text().into_bytes();
        bytes.push(0);
        tracker.load_keymap_bytes(&bytes).unwrap();
        assert!(tracker.has_layout());
    }

    #[test]
    fn test_garbage_keymap_is_rejected() {
        let mut tracker = KeyboardStateTracker::new();
        let err = tracker.load_keymap("not an xkb keymap").unwrap_err();
        assert!(matches!(err, ClientError::ProtocolViolation(_)));
        assert!(!tracker.has_layout());
    }

    #[test]
    fn test_repeat_info_roundtrip() {
        let mut tracker = KeyboardStateTracker::new();
        assert!(tracker.repeat_info().is_none());
        tracker.set_repeat_info(25, 600);
        assert_eq!(tracker.repeat_info(), Some((25, 600)));
    }
}
