//! Keyboard session
//!
//! Composes layout synchronization, key routing and the visibility animation
//! behind a single event/command interface:
//! - `SessionEvent`: configuration snapshots, key activations, frame ticks
//! - `Command`: what the surface, the output channels and the UI must do

mod command;
mod controller;

pub use command::{Command, SessionEvent};
pub use controller::{LayoutSummary, SessionController, SessionOptions};

use thiserror::Error;

use crate::layout::LoadError;

/// Session level errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// The fallback layout could not be installed (packaging defect)
    #[error("no usable layout, fallback layout failed to load: {source}")]
    EmptyLayoutSet {
        #[source]
        source: LoadError,
    },
    /// `select_layout` named a layout that is not loaded
    #[error("failed to find layout '{0}'")]
    UnknownLayoutSelection(String),
}
