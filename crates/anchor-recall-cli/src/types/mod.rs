//! Script commands, driver output and errors.

pub mod command;
pub mod error;
pub mod output;

pub use command::*;
pub use error::*;
pub use output::*;
