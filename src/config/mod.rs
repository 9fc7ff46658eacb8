//! Configuration file management
//!
//! Loads TOML configuration files and provides session settings.
//! Default config path: ~/.config/pos-osk/config.toml
//!
//! The `[input_sources]` section is the configuration snapshot pushed into
//! the session whenever the file changes.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[cfg(target_os = "linux")]
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
#[cfg(target_os = "linux")]
use std::sync::mpsc;

use crate::constants::{DEFAULT_SURFACE_HEIGHT, ENV_CONFIG_PATH, ENV_TEST_LAYOUT, SOURCE_TYPE_XKB};
use crate::layout::SourceDescriptor;
use crate::session::SessionOptions;

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input source settings
    pub input_sources: InputSourcesConfig,
    /// Layout resource settings
    pub layouts: LayoutsConfig,
    /// Keyboard surface settings
    pub surface: SurfaceConfig,
}

/// Input source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSourcesConfig {
    /// Ordered (type, id) pairs, e.g. [["xkb", "us"], ["xkb", "de+neo"]]
    /// Only "xkb" sources get a keyboard layout
    pub sources: Vec<(String, String)>,
    /// XKB options (e.g., "ctrl:nocaps")
    /// A change re-runs layout synchronization
    pub xkb_options: Vec<String>,
}

/// Layout resource settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutsConfig {
    /// Directory holding <layout>[+<variant>].json resources
    pub dir: String,
    /// Load only this layout and ignore source changes (debugging)
    /// Overridden by the POS_TEST_LAYOUT environment variable
    pub test_layout: Option<String>,
}

/// Keyboard surface settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Configured surface height in pixels
    pub height: i32,
    /// Show the keyboard on start-up
    pub start_visible: bool,
}

impl Default for InputSourcesConfig {
    fn default() -> Self {
        Self {
            sources: vec![(SOURCE_TYPE_XKB.to_string(), "us".to_string())],
            xkb_options: vec![],
        }
    }
}

impl Default for LayoutsConfig {
    fn default() -> Self {
        Self {
            dir: "/usr/share/pos-osk/layouts".to_string(),
            test_layout: None,
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            height: DEFAULT_SURFACE_HEIGHT,
            start_visible: false,
        }
    }
}

impl Config {
    /// System-wide config path
    const SYSTEM_CONFIG_PATH: &'static str = "/etc/pos-osk/config.toml";

    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. POS_OSK_CONFIG environment variable
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        // 2. User config: ~/.config/pos-osk/config.toml
        if let Some(config_path) = default_config_path() {
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // 3. System config: /etc/pos-osk/config.toml
        let system_config = Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration with priority:
    /// 1. POS_OSK_CONFIG environment variable
    /// 2. ~/.config/pos-osk/config.toml (user config)
    /// 3. /etc/pos-osk/config.toml (system config)
    /// 4. Built-in defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Self::default()
    }

    /// Load settings from specified path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse settings from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Write the built-in defaults as a config template
    pub fn write_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        info!("Wrote config template: {}", path.display());
        Ok(())
    }

    /// Configured input sources as descriptors, in order
    pub fn source_descriptors(&self) -> Vec<SourceDescriptor> {
        self.input_sources
            .sources
            .iter()
            .map(|(kind, id)| SourceDescriptor::new(kind.as_str(), id.as_str()))
            .collect()
    }

    /// Test layout from POS_TEST_LAYOUT or the config file
    pub fn test_layout(&self) -> Option<String> {
        match std::env::var(ENV_TEST_LAYOUT) {
            Ok(layout) if !layout.is_empty() => Some(layout),
            _ => self.layouts.test_layout.clone().filter(|l| !l.is_empty()),
        }
    }

    /// Layout resource directory with `~` expanded
    pub fn layout_dir(&self) -> PathBuf {
        expand_home(&self.layouts.dir)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            surface_height: self.surface.height.max(0),
            test_layout: self.test_layout(),
        }
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}

/// Config file change watcher (Linux only)
#[cfg(target_os = "linux")]
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
}

#[cfg(target_os = "linux")]
impl ConfigWatcher {
    /// Start watching config file
    pub fn new(config_path: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let file_name = config_path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                // The parent directory also holds unrelated files. Only a
                // change to config.toml may push a new source snapshot.
                use notify::EventKind;
                let ours = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                match event.kind {
                    EventKind::Modify(_) | EventKind::Create(_) if ours => {
                        let _ = tx.send(());
                    }
                    _ => {}
                }
            }
        })?;

        // Watch the parent directory to catch rename operations
        let watch_path = config_path.parent().unwrap_or(config_path);
        watcher.watch(watch_path, RecursiveMode::NonRecursive)?;

        info!("Watching config: {}", config_path.display());
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Check if config file was modified (non-blocking)
    pub fn check_reload(&self) -> bool {
        let mut changed = false;
        while self.rx.try_recv().is_ok() {
            changed = true;
        }
        changed
    }
}

/// Get default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pos-osk").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sources() {
        let config = Config::parse(
            r#"
            [input_sources]
            sources = [["xkb", "us"], ["ibus", "anthy"], ["xkb", "de+neo"]]

            [surface]
            height = 240
            "#,
        )
        .unwrap();

        let sources = config.source_descriptors();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[2], SourceDescriptor::xkb("de+neo"));
        assert!(!sources[1].is_xkb());
        assert_eq!(config.surface.height, 240);
        // Unset sections keep their defaults
        assert_eq!(config.layouts, LayoutsConfig::default());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Config::parse("[surface]\nheight = \"tall\"").is_err());
    }

    #[test]
    fn test_default_template_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pos-osk").join("config.toml");
        Config::write_default_config(&path).unwrap();
        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/usr/share"), PathBuf::from("/usr/share"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/layouts"), home.join("layouts"));
        }
    }
}
