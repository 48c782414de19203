//! Line framing for script commands and output.

use crate::types::{CliError, CliResult, Output, ScriptCommand};

/// Parse a single line as a script command.
pub fn parse_command(line: &str) -> CliResult<ScriptCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(CliError::ParseError("Empty command".to_string()));
    }

    serde_json::from_str(trimmed).map_err(|e| CliError::ParseError(e.to_string()))
}

/// Serialize an output to a JSON line (with trailing newline).
pub fn frame_output(output: &Output) -> CliResult<String> {
    let mut json = serde_json::to_string(output)?;
    json.push('\n');
    Ok(json)
}
