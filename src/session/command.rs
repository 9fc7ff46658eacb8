//! Session events and commands

use crate::layout::{Layer, LayoutId, SourceDescriptor};
use crate::surface::Timestamp;

/// Events fed into the session controller
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Configured input sources changed (full snapshot)
    SourcesChanged(Vec<SourceDescriptor>),
    /// A key went down on the rendered layout
    KeyPressed(String),
    /// A key was activated on the rendered layout
    KeyActivated(String),
    ClipboardCopy,
    ClipboardPaste,
    /// Text-input session became active/inactive
    TextInputActiveChanged(bool),
    SetVisible(bool),
    FrameTick(Timestamp),
    /// Manual layout switch
    SelectLayout(String),
    /// Switch the level of the active layout
    SetLayer(Layer),
}

/// Commands produced by the session controller for its collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Virtual keyboard: key press (`down`) or release
    EmitRawKey { symbol: String, down: bool },
    /// Text input: send text, committing it when `commit` is set
    SendText { text: String, commit: bool },
    /// Layer surface margins
    SetMargins {
        top: i32,
        right: i32,
        bottom: i32,
        left: i32,
    },
    /// Layer surface exclusive zone
    SetExclusiveZone(i32),
    ShowSurface,
    HideSurface,
    /// Register for frame clock ticks
    StartFrames,
    /// Frame clock ticks no longer needed
    StopFrames,
    /// The presented layout changed
    LayoutSelected(LayoutId),
    /// The presented level of a layout changed
    LayerChanged { layout: LayoutId, layer: Layer },
    /// Trigger haptic/audio feedback
    Feedback(&'static str),
}
