//! Layout loading
//!
//! Resolve a layout id to a loaded `LayoutResource`.
//! `JsonLayoutLoader` reads `<dir>/<layout>[+<variant>].json`:
//!
//! ```json
//! { "name": "German", "locale": "de",
//!   "levels": [ { "level": "", "rows": [ ["q", ["a", "ä"], { "symbol": "KEY_ENTER", "width": 1.5 }] ] } ] }
//! ```

use log::{debug, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{Key, KeyGrid, Layer, LayoutId, LayoutKind, LayoutResource};

/// A layout source could not be resolved or loaded
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid layout id '{0}'")]
    InvalidId(String),
    #[error("no layout resource for '{name}' at {path}")]
    NotFound { name: String, path: PathBuf },
    #[error("failed to read layout '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse layout '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("layout '{0}' has no usable levels")]
    NoLevels(String),
}

/// Layout loader collaborator
pub trait LayoutLoader {
    /// Load the resource for `id`
    fn load(&mut self, kind: LayoutKind, id: &LayoutId) -> Result<LayoutResource, LoadError>;
}

/// Loads layouts from JSON resources in a directory
#[derive(Debug, Clone)]
pub struct JsonLayoutLoader {
    dir: PathBuf,
}

impl JsonLayoutLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn resource_path(&self, id: &LayoutId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl LayoutLoader for JsonLayoutLoader {
    fn load(&mut self, kind: LayoutKind, id: &LayoutId) -> Result<LayoutResource, LoadError> {
        let name = id.as_str();
        if name.is_empty() || name.contains('/') || name.starts_with('+') {
            return Err(LoadError::InvalidId(name.to_string()));
        }

        let path = self.resource_path(id);
        debug!("Loading {:?} layout '{}' from {}", kind, name, path.display());

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound {
                    name: name.to_string(),
                    path,
                });
            }
            Err(e) => {
                return Err(LoadError::Io {
                    name: name.to_string(),
                    source: e,
                })
            }
        };

        parse_layout(name, &content)
    }
}

// === Resource format ===

#[derive(Deserialize)]
struct LayoutFile {
    name: String,
    #[serde(default)]
    locale: Option<String>,
    levels: Vec<LevelFile>,
}

#[derive(Deserialize)]
struct LevelFile {
    #[serde(default)]
    level: String,
    rows: Vec<Vec<KeyFile>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyFile {
    Symbol(String),
    Symbols(Vec<String>),
    Detailed {
        symbol: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default = "default_key_width")]
        width: f64,
    },
}

fn default_key_width() -> f64 {
    1.0
}

impl KeyFile {
    fn into_key(self) -> Option<Key> {
        match self {
            KeyFile::Symbol(symbol) => Some(Key::new(symbol)),
            KeyFile::Symbols(mut symbols) => {
                if symbols.is_empty() {
                    return None;
                }
                let symbol = symbols.remove(0);
                Some(Key {
                    alternates: symbols,
                    ..Key::new(symbol)
                })
            }
            KeyFile::Detailed { symbol, label, width } => Some(Key {
                label,
                width: if width > 0.0 { width } else { 1.0 },
                ..Key::new(symbol)
            }),
        }
    }
}

/// Parse a JSON layout resource
pub fn parse_layout(name: &str, json: &str) -> Result<LayoutResource, LoadError> {
    let file: LayoutFile = serde_json::from_str(json).map_err(|e| LoadError::Parse {
        name: name.to_string(),
        source: e,
    })?;

    let mut resource = LayoutResource::new(file.name);
    if let Some(locale) = file.locale {
        resource = resource.with_locale(locale);
    }

    for (i, level) in file.levels.into_iter().enumerate() {
        let Some(layer) = Layer::from_level(&level.level) else {
            warn!("Unknown layer '{}' at {} in layout '{}'", level.level, i, name);
            continue;
        };

        let mut rows = Vec::with_capacity(level.rows.len());
        for (r, row) in level.rows.into_iter().enumerate() {
            let keys: Vec<Key> = row.into_iter().filter_map(KeyFile::into_key).collect();
            if keys.is_empty() {
                warn!("Empty row {} in layer '{}' of layout '{}'", r, level.level, name);
            }
            rows.push(keys);
        }
        resource = resource.with_layer(layer, KeyGrid { rows });
    }

    if resource.n_layers() == 0 {
        return Err(LoadError::NoLevels(name.to_string()));
    }

    debug!(
        "Using {}x{} layout '{}', {} layers",
        resource.n_cols(),
        resource.n_rows(),
        name,
        resource.n_layers()
    );

    Ok(resource)
}
