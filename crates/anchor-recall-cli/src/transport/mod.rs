//! Script transport: newline-delimited JSON in, JSON lines out.

pub mod framing;
pub mod stdio;

pub use stdio::{write_outputs, ScriptTransport};
