//! Embedding Session
//!
//! Activation, reauthentication and teardown of the embedded widget, and the
//! bridges that turn its events into host actions.

mod bridges;
mod machine;
mod state;

pub use bridges::{Bridge, BridgeTable};
pub use machine::*;
pub use state::*;
