//! Global constants for pos-osk
//!
//! Consolidates timing, animation and layout identifier constants
//! to eliminate magic numbers throughout the codebase.

// ============================================================================
// Animation Constants
// ============================================================================

/// Progress gained per reference frame
pub const ANIMATION_STEP: f64 = 0.06666;

/// Reference frame duration in microseconds (60 Hz)
pub const REFERENCE_FRAME_US: f64 = 16666.0;

/// Frame interval used by the headless driver (60 Hz)
pub const FRAME_INTERVAL_MS: u64 = 16;

/// Default configured surface height in pixels
pub const DEFAULT_SURFACE_HEIGHT: i32 = 200;

// ============================================================================
// Layout Identifiers
// ============================================================================

/// Source type handled by the synchronizer
pub const SOURCE_TYPE_XKB: &str = "xkb";

/// Permanent terminal layout (never evicted)
pub const TERMINAL_LAYOUT_ID: &str = "terminal";

/// Display name of the terminal layout
pub const TERMINAL_DISPLAY_NAME: &str = "Terminal";

/// Layout installed when no configured source resolves
pub const FALLBACK_LAYOUT_ID: &str = "us";

/// Display name of the fallback layout
pub const FALLBACK_DISPLAY_NAME: &str = "English (USA)";

// ============================================================================
// Key Symbols
// ============================================================================

/// Prefix marking a symbol as a raw keycode name (e.g. `KEY_ENTER`)
pub const RAW_KEYCODE_PREFIX: &str = "KEY_";

/// Clipboard copy keycode
pub const KEY_COPY: &str = "KEY_COPY";

/// Clipboard paste keycode
pub const KEY_PASTE: &str = "KEY_PASTE";

/// Feedback event emitted on key-down
pub const FEEDBACK_BUTTON_PRESSED: &str = "button-pressed";

// ============================================================================
// Environment
// ============================================================================

/// Overrides the configuration file path
pub const ENV_CONFIG_PATH: &str = "POS_OSK_CONFIG";

/// Loads a single test layout and ignores source changes
pub const ENV_TEST_LAYOUT: &str = "POS_TEST_LAYOUT";
