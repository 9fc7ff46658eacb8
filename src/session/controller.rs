//! Session controller
//!
//! Single-threaded and non-blocking: every event is handled synchronously and
//! answered with the commands to execute. Re-entering a handler is ruled out
//! by `&mut self`, so a reconciliation pass can never recurse.

use log::{debug, info, warn};

use super::{Command, SessionError, SessionEvent};
use crate::constants::{DEFAULT_SURFACE_HEIGHT, FEEDBACK_BUTTON_PRESSED};
use crate::input::{Dispatch, KeyRouter, TextInputSession};
use crate::layout::{
    Layer, LayoutEntry, LayoutId, LayoutLoader, LayoutStore, LayoutSynchronizer, SourceDescriptor,
};
use crate::surface::{Timestamp, Visibility, VisibilityAnimator};

/// Session start-up options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Configured surface height in pixels
    pub surface_height: i32,
    /// Load only this xkb layout and ignore source changes
    pub test_layout: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            surface_height: DEFAULT_SURFACE_HEIGHT,
            test_layout: None,
        }
    }
}

/// Layout menu entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSummary {
    pub id: LayoutId,
    pub display_name: String,
    pub active: bool,
}

/// On-screen keyboard session
pub struct SessionController<L: LayoutLoader> {
    sync: LayoutSynchronizer<L>,
    text_input: TextInputSession,
    animator: VisibilityAnimator,
    /// Presented layout (name lookup into the store)
    active: Option<LayoutId>,
    /// Whether source change notifications are applied
    follow_sources: bool,
}

impl<L: LayoutLoader> SessionController<L> {
    /// Create a session with the permanent terminal layout installed
    ///
    /// With a test layout only that layout is loaded and source changes are
    /// ignored for the lifetime of the session.
    pub fn new(loader: L, options: SessionOptions) -> Result<Self, SessionError> {
        let mut sync = LayoutSynchronizer::new(loader);
        sync.install_terminal();

        let mut session = Self {
            sync,
            text_input: TextInputSession::default(),
            animator: VisibilityAnimator::new(options.surface_height),
            active: None,
            follow_sources: options.test_layout.is_none(),
        };

        if let Some(test_layout) = options.test_layout {
            info!("Using test layout '{}'", test_layout);
            let source = SourceDescriptor::xkb(test_layout);
            // Falls back to the default layout if the test layout is unusable
            let result = session.sync.reconcile(&[source], None)?;
            session.active = result.selected;
        }

        Ok(session)
    }

    /// Commands announcing the start-up state, applied once after `new`
    ///
    /// Only a test layout is selected at construction, a regular session
    /// selects its first layout on the first source snapshot.
    pub fn start(&self) -> Vec<Command> {
        self.active.iter().cloned().map(Command::LayoutSelected).collect()
    }

    /// Dispatch an event to its handler
    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<Command>, SessionError> {
        let commands = match event {
            SessionEvent::SourcesChanged(sources) => self.on_sources_changed(&sources)?,
            SessionEvent::KeyPressed(symbol) => self.on_key_pressed(&symbol),
            SessionEvent::KeyActivated(symbol) => self.on_key_activated(&symbol),
            SessionEvent::ClipboardCopy => self.clipboard_copy(),
            SessionEvent::ClipboardPaste => self.clipboard_paste(),
            SessionEvent::TextInputActiveChanged(active) => {
                self.on_text_input_active_changed(active);
                Vec::new()
            }
            SessionEvent::SetVisible(visible) => self.set_visible(visible),
            SessionEvent::FrameTick(now) => self.frame_tick(now),
            SessionEvent::SelectLayout(id) => self.select_layout(&id)?,
            SessionEvent::SetLayer(layer) => self.set_layer(layer),
        };
        Ok(commands)
    }

    // === Layouts ===

    /// Apply a new input source snapshot
    pub fn on_sources_changed(
        &mut self,
        sources: &[SourceDescriptor],
    ) -> Result<Vec<Command>, SessionError> {
        if !self.follow_sources {
            debug!("Test layout active, ignoring source change");
            return Ok(Vec::new());
        }

        debug!("Setting changed, reloading input settings");
        let result = self.sync.reconcile(sources, self.active.as_ref())?;

        let mut commands = Vec::new();
        if let Some(id) = result.selected {
            self.apply_selection(id, &mut commands);
        }
        Ok(commands)
    }

    /// Manually switch the presented layout
    pub fn select_layout(&mut self, id: &str) -> Result<Vec<Command>, SessionError> {
        let id = LayoutId::new(id);
        if !self.sync.store().contains(&id) {
            warn!("Failed to find layout '{}'", id);
            return Err(SessionError::UnknownLayoutSelection(id.to_string()));
        }

        let mut commands = Vec::new();
        self.apply_selection(id, &mut commands);
        Ok(commands)
    }

    fn apply_selection(&mut self, id: LayoutId, commands: &mut Vec<Command>) {
        if self.active.as_ref() == Some(&id) {
            return;
        }

        if let Some(entry) = self.sync.store_mut().get_mut(&id) {
            info!("Switched to layout '{}' ({})", id, entry.display_name());
            entry.layer = Layer::Normal;
        }
        self.active = Some(id.clone());
        commands.push(Command::LayoutSelected(id));
    }

    /// Switch the level of the presented layout
    pub fn set_layer(&mut self, layer: Layer) -> Vec<Command> {
        let mut commands = Vec::new();
        self.update_active_layer(layer, &mut commands);
        commands
    }

    fn update_active_layer(&mut self, layer: Layer, commands: &mut Vec<Command>) {
        let Some(id) = self.active.clone() else {
            return;
        };
        if let Some(entry) = self.sync.store_mut().get_mut(&id) {
            if entry.layer != layer {
                debug!("Layout '{}' layer {:?} -> {:?}", id, entry.layer, layer);
                entry.layer = layer;
                commands.push(Command::LayerChanged { layout: id, layer });
            }
        }
    }

    /// All layouts for the layout menu, sorted by display name
    pub fn layouts(&self) -> Vec<LayoutSummary> {
        let mut layouts: Vec<LayoutSummary> = self
            .sync
            .store()
            .iter()
            .map(|entry| LayoutSummary {
                id: entry.id.clone(),
                display_name: entry.display_name().to_string(),
                active: self.active.as_ref() == Some(&entry.id),
            })
            .collect();
        layouts.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id)));
        layouts
    }

    pub fn active_layout_id(&self) -> Option<&LayoutId> {
        self.active.as_ref()
    }

    pub fn active_layout(&self) -> Option<&LayoutEntry> {
        self.active.as_ref().and_then(|id| self.sync.store().get(id))
    }

    pub fn store(&self) -> &LayoutStore {
        self.sync.store()
    }

    pub fn loader(&self) -> &L {
        self.sync.loader()
    }

    // === Keys ===

    /// Key-down on the rendered layout
    pub fn on_key_pressed(&mut self, symbol: &str) -> Vec<Command> {
        debug!("Key: '{}' down", symbol);
        vec![Command::Feedback(FEEDBACK_BUTTON_PRESSED)]
    }

    /// Key activated on the rendered layout
    pub fn on_key_activated(&mut self, symbol: &str) -> Vec<Command> {
        debug!("Key: '{}' symbol", symbol);
        let dispatch = KeyRouter::new(&self.text_input).route_symbol(symbol);
        Self::dispatch_commands(dispatch)
    }

    pub fn clipboard_copy(&mut self) -> Vec<Command> {
        Self::dispatch_commands(KeyRouter::copy())
    }

    pub fn clipboard_paste(&mut self) -> Vec<Command> {
        Self::dispatch_commands(KeyRouter::paste())
    }

    fn dispatch_commands(dispatch: Dispatch) -> Vec<Command> {
        match dispatch {
            Dispatch::RawKey(symbol) => vec![
                Command::EmitRawKey {
                    symbol: symbol.clone(),
                    down: true,
                },
                Command::EmitRawKey {
                    symbol,
                    down: false,
                },
            ],
            Dispatch::ComposedText { text, commit } => vec![Command::SendText { text, commit }],
        }
    }

    pub fn on_text_input_active_changed(&mut self, active: bool) {
        if self.text_input.set_active(active) {
            debug!("Text input active: {}", active);
        }
    }

    // === Visibility ===

    /// Request the keyboard surface to be shown or hidden
    pub fn set_visible(&mut self, visible: bool) -> Vec<Command> {
        if self.animator.request_visible(visible) {
            vec![Command::StartFrames]
        } else {
            Vec::new()
        }
    }

    /// Advance the show/hide animation
    pub fn frame_tick(&mut self, now: Timestamp) -> Vec<Command> {
        let Some(result) = self.animator.tick(now) else {
            return Vec::new();
        };

        let mut commands = Vec::new();
        if result.show_surface {
            commands.push(Command::ShowSurface);
        }
        commands.push(Command::SetMargins {
            top: 0,
            right: 0,
            bottom: result.margin,
            left: 0,
        });
        if let Some(zone) = result.exclusive_zone {
            commands.push(Command::SetExclusiveZone(zone));
        }
        if result.hide_surface {
            commands.push(Command::HideSurface);
            self.update_active_layer(Layer::Normal, &mut commands);
        }
        if result.finished {
            commands.push(Command::StopFrames);
        }
        commands
    }

    pub fn visibility(&self) -> Visibility {
        self.animator.visibility()
    }

    /// Frame ticks are needed
    pub fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }

    /// Change the configured surface height
    ///
    /// A shown keyboard re-reserves its exclusive zone right away, a running
    /// animation picks the new height up on its next frame.
    pub fn set_surface_height(&mut self, height: i32) -> Vec<Command> {
        self.animator.set_height(height);
        if self.animator.visibility() == Visibility::Shown {
            vec![Command::SetExclusiveZone(self.animator.height())]
        } else {
            Vec::new()
        }
    }
}
