//! Configuration resolution.

use std::path::PathBuf;

/// Environment variable naming a script file to replay.
pub const SCRIPT_ENV: &str = "ANCHOR_RECALL_SCRIPT";

/// Resolve the script to replay. `None` means read from stdin.
pub fn resolve_script_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    match std::env::var(SCRIPT_ENV) {
        Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path)),
        _ => None,
    }
}

/// Where the REPL keeps its history.
pub fn resolve_history_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".anchor_recall_history")
}
