//! pos-osk - on-screen keyboard session core
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               SessionController              │
//! ├──────────────────────────────────────────────┤
//! │  sources  →  LayoutSynchronizer → LayoutStore │
//! │  key      →  KeyRouter → raw key / text       │
//! │  visible  →  VisibilityAnimator → margins     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Events go in, `Command`s come out. Rendering, the virtual keyboard and
//! text-input protocols, and the layer surface are collaborators that
//! execute those commands.

pub mod config;
pub mod constants;
pub mod input;
pub mod layout;
pub mod session;
pub mod surface;

pub use input::{Dispatch, KeyRouter, TextInputSession};
pub use layout::{
    JsonLayoutLoader, Layer, LayoutEntry, LayoutId, LayoutKind, LayoutLoader, LayoutResource,
    LayoutStore, LayoutSynchronizer, LoadError, SourceDescriptor, SyncResult,
};
pub use session::{Command, LayoutSummary, SessionController, SessionError, SessionEvent, SessionOptions};
pub use surface::{Direction, TickResult, Timestamp, Visibility, VisibilityAnimator};
