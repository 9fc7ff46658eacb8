//! Input handling
//!
//! Decide how an activated key reaches the focused client.
//! - Raw key channel: virtual keyboard press/release emulation
//! - Composed text channel: text-input protocol commit

pub mod router;

pub use router::{Dispatch, KeyRouter, TextInputSession};
