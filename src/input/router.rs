//! Key routing
//!
//! Raw keycodes (`KEY_*`) always go through the virtual keyboard channel.
//! Everything else is committed as text when a text-input session is active,
//! and falls back to the virtual keyboard otherwise.

use log::trace;

use crate::constants::{KEY_COPY, KEY_PASTE, RAW_KEYCODE_PREFIX};

/// Text-input protocol session state
///
/// Active when the focused client wants composed text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextInputSession {
    active: bool,
}

impl TextInputSession {
    pub fn new(active: bool) -> Self {
        Self { active }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Update the state, returns true if it changed
    pub fn set_active(&mut self, active: bool) -> bool {
        let changed = self.active != active;
        self.active = active;
        changed
    }
}

/// Where a key symbol has to be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Emit key-down immediately followed by key-up on the virtual keyboard
    RawKey(String),
    /// Send as text on the text-input channel
    ComposedText { text: String, commit: bool },
}

/// Per-key delivery decision over an observed text-input session
pub struct KeyRouter<'a> {
    session: &'a TextInputSession,
}

impl<'a> KeyRouter<'a> {
    pub fn new(session: &'a TextInputSession) -> Self {
        Self { session }
    }

    /// Whether `symbol` names a hardware keycode (e.g. `KEY_ENTER`)
    pub fn is_raw_keycode(symbol: &str) -> bool {
        symbol.starts_with(RAW_KEYCODE_PREFIX)
    }

    /// Decide the output channel for `symbol`
    pub fn route(&self, symbol: &str, is_raw_keycode: bool) -> Dispatch {
        let dispatch = if is_raw_keycode || !self.session.is_active() {
            Dispatch::RawKey(symbol.to_string())
        } else {
            Dispatch::ComposedText {
                text: symbol.to_string(),
                commit: true,
            }
        };
        trace!("Route '{}' (raw={}) -> {:?}", symbol, is_raw_keycode, dispatch);
        dispatch
    }

    /// Route a symbol as activated on the rendered layout
    pub fn route_symbol(&self, symbol: &str) -> Dispatch {
        self.route(symbol, Self::is_raw_keycode(symbol))
    }

    /// Clipboard copy, always a raw key
    pub fn copy() -> Dispatch {
        Dispatch::RawKey(KEY_COPY.to_string())
    }

    /// Clipboard paste, always a raw key
    pub fn paste() -> Dispatch {
        Dispatch::RawKey(KEY_PASTE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_follows_session_state() {
        let inactive = TextInputSession::new(false);
        let active = TextInputSession::new(true);

        assert_eq!(
            KeyRouter::new(&inactive).route("KEY_A", false),
            Dispatch::RawKey("KEY_A".into())
        );
        assert_eq!(
            KeyRouter::new(&active).route("KEY_A", false),
            Dispatch::ComposedText {
                text: "KEY_A".into(),
                commit: true
            }
        );
    }

    #[test]
    fn test_raw_keycode_always_raw() {
        for session in [TextInputSession::new(false), TextInputSession::new(true)] {
            let router = KeyRouter::new(&session);
            assert_eq!(router.route("KEY_COPY", true), Dispatch::RawKey("KEY_COPY".into()));
            assert_eq!(router.route_symbol("KEY_ENTER"), Dispatch::RawKey("KEY_ENTER".into()));
        }
    }

    #[test]
    fn test_route_symbol_detects_prefix() {
        let active = TextInputSession::new(true);
        let router = KeyRouter::new(&active);
        assert_eq!(
            router.route_symbol("ä"),
            Dispatch::ComposedText {
                text: "ä".into(),
                commit: true
            }
        );
        assert!(KeyRouter::is_raw_keycode("KEY_BACKSPACE"));
        assert!(!KeyRouter::is_raw_keycode("key_a"));
    }

    #[test]
    fn test_clipboard_dispatches() {
        assert_eq!(KeyRouter::copy(), Dispatch::RawKey("KEY_COPY".into()));
        assert_eq!(KeyRouter::paste(), Dispatch::RawKey("KEY_PASTE".into()));
    }

    #[test]
    fn test_session_set_active() {
        let mut session = TextInputSession::default();
        assert!(!session.is_active());
        assert!(session.set_active(true));
        assert!(!session.set_active(true));
        assert!(session.is_active());
    }
}
