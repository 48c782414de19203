//! Error types and exit codes for the driver.

use anchor_recall::CaptureError;

/// Numeric codes reported in `error` output lines.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_COMMAND: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const CAPTURE_ERROR: i32 = -32850;
    pub const NO_SCREEN: i32 = -32851;
}

/// All errors that can occur while driving the engine.
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("No screen loaded")]
    NoScreen,

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        match self {
            CliError::ParseError(_) | CliError::Json(_) => PARSE_ERROR,
            CliError::InvalidCommand(_) => INVALID_COMMAND,
            CliError::NoScreen => NO_SCREEN,
            CliError::Capture(_) => CAPTURE_ERROR,
            CliError::Io(_) => INTERNAL_ERROR,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
