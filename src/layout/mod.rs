//! Keyboard layouts
//!
//! Layout data model shared by the store, the loader and the synchronizer.
//! - `LayoutId`: unique layout name (`us`, `de+neo`, `terminal`)
//! - `LayoutEntry`: a loaded layout resource owned by the store
//! - `Layer`: the level currently presented (normal, caps, symbols)

pub mod loader;
pub mod store;
pub mod sync;

pub use loader::{JsonLayoutLoader, LayoutLoader, LoadError};
pub use store::LayoutStore;
pub use sync::{LayoutSynchronizer, SourceDescriptor, SyncResult};

use smol_str::SmolStr;
use std::fmt;

use crate::constants::{TERMINAL_DISPLAY_NAME, TERMINAL_LAYOUT_ID};

/// Unique layout name
///
/// For xkb layouts this is `layout` or `layout+variant`,
/// for the synthetic terminal layout just `terminal`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutId(SmolStr);

impl LayoutId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name.as_ref()))
    }

    /// Canonical id for an xkb layout and optional variant
    pub fn from_xkb(layout: &str, variant: Option<&str>) -> Self {
        match variant {
            Some(v) if !v.is_empty() => Self(SmolStr::new(format!("{}+{}", layout, v))),
            _ => Self::new(layout),
        }
    }

    pub fn terminal() -> Self {
        Self::new(TERMINAL_LAYOUT_ID)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_terminal(&self) -> bool {
        self.0.as_str() == TERMINAL_LAYOUT_ID
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for LayoutId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Kind of layout source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// Layout backed by an xkb layout/variant
    Xkb,
    /// Synthetic terminal layout (xkb keymap `us`)
    Terminal,
}

/// Keyboard level presented by a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layer {
    #[default]
    Normal,
    Caps,
    Symbols,
    Symbols2,
}

impl Layer {
    /// Parse a level name as used in layout resources ("", "shift", "opt", "opt+shift")
    pub fn from_level(name: &str) -> Option<Self> {
        match name {
            "" => Some(Layer::Normal),
            "shift" => Some(Layer::Caps),
            "opt" => Some(Layer::Symbols),
            "opt+shift" => Some(Layer::Symbols2),
            _ => None,
        }
    }

    /// Parse a user facing layer name ("normal", "caps", "symbols", "symbols2")
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "normal" => Some(Layer::Normal),
            "caps" | "shift" => Some(Layer::Caps),
            "symbols" | "opt" => Some(Layer::Symbols),
            "symbols2" | "opt+shift" => Some(Layer::Symbols2),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Layer::Normal => 0,
            Layer::Caps => 1,
            Layer::Symbols => 2,
            Layer::Symbols2 => 3,
        }
    }
}

/// One key in a layout row
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    /// Symbol sent when the key is activated
    pub symbol: String,
    /// Alternate symbols offered on long press
    pub alternates: Vec<String>,
    /// Label override (defaults to the symbol)
    pub label: Option<String>,
    /// Width in key units
    pub width: f64,
}

impl Key {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            alternates: Vec::new(),
            label: None,
            width: 1.0,
        }
    }
}

/// Rows of keys for one layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyGrid {
    pub rows: Vec<Vec<Key>>,
}

impl KeyGrid {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row in key units
    pub fn width(&self) -> f64 {
        self.rows
            .iter()
            .map(|row| row.iter().map(|k| k.width).sum::<f64>())
            .fold(0.0, f64::max)
    }
}

/// A loaded layout resource: display name, key geometry and symbol table
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResource {
    pub display_name: String,
    pub locale: Option<String>,
    layers: [Option<KeyGrid>; 4],
}

impl LayoutResource {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            locale: None,
            layers: [None, None, None, None],
        }
    }

    /// Built-in terminal layout used when no terminal resource is installed
    pub fn builtin_terminal() -> Self {
        let row = |syms: &[&str]| syms.iter().map(|s| Key::new(*s)).collect::<Vec<_>>();
        let grid = KeyGrid {
            rows: vec![
                row(&["KEY_ESC", "KEY_TAB", "KEY_UP", "KEY_DOWN", "KEY_LEFT", "KEY_RIGHT"]),
                row(&["q", "w", "e", "r", "t", "y", "u", "i", "o", "p"]),
                row(&["a", "s", "d", "f", "g", "h", "j", "k", "l"]),
                row(&["z", "x", "c", "v", "b", "n", "m"]),
            ],
        };
        Self::new(TERMINAL_DISPLAY_NAME).with_layer(Layer::Normal, grid)
    }

    pub fn with_layer(mut self, layer: Layer, grid: KeyGrid) -> Self {
        self.layers[layer.index()] = Some(grid);
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn layer(&self, layer: Layer) -> Option<&KeyGrid> {
        self.layers[layer.index()].as_ref()
    }

    pub fn n_layers(&self) -> usize {
        self.layers.iter().flatten().count()
    }

    /// Maximum row count over all layers
    pub fn n_rows(&self) -> usize {
        self.layers.iter().flatten().map(KeyGrid::n_rows).max().unwrap_or(0)
    }

    /// Column count over all layers (widest row, rounded up)
    pub fn n_cols(&self) -> usize {
        self.layers
            .iter()
            .flatten()
            .map(KeyGrid::width)
            .fold(0.0, f64::max)
            .ceil() as usize
    }

    /// Flat symbol table over all layers
    pub fn symbols(&self) -> Vec<&str> {
        self.layers
            .iter()
            .flatten()
            .flat_map(|g| g.rows.iter().flatten())
            .map(|k| k.symbol.as_str())
            .collect()
    }
}

/// A layout owned by the store
#[derive(Debug, Clone)]
pub struct LayoutEntry {
    pub id: LayoutId,
    pub kind: LayoutKind,
    pub resource: LayoutResource,
    /// Currently presented level
    pub layer: Layer,
}

impl LayoutEntry {
    pub fn new(id: LayoutId, kind: LayoutKind, resource: LayoutResource) -> Self {
        Self {
            id,
            kind,
            resource,
            layer: Layer::Normal,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.resource.display_name
    }
}
