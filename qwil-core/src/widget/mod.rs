//! Qwil Widget
//!
//! Contracts of the embedded widget, its startup options and the events it emits.

mod contract;
mod event;
mod options;

pub use contract::*;
pub use event::*;
pub use options::*;
