//! The escalation stages, cheapest first.

pub mod interpreter;
pub mod library;
pub mod relay;

pub use interpreter::{InterpreterBridge, InterpreterSettings, InterpreterSource, TokioProcessRunner};
pub use library::{LibrarySettings, LibrarySource, TimedTextClient};
pub use relay::{RelayFetcher, RelaySettings};
