//! Anchor recall driver: feeds scripted or interactive input into the engine.

pub mod config;
pub mod driver;
pub mod overlay;
pub mod repl;
pub mod transport;
pub mod types;

pub use config::resolve_script_path;
pub use driver::Driver;
pub use overlay::ChannelOverlay;
pub use transport::ScriptTransport;
