//! Interactive REPL for driving the engine by hand.
//!
//! Launch with `anchor-recall repl`. Type `/help` for commands, Tab for
//! completion. Hold gestures use real time: `/down`, wait, `/up`.

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use tokio::runtime::Handle;

use anchor_recall::ScreenPoint;

use crate::config::resolve_history_path;
use crate::driver::Driver;
use crate::types::{CliError, CliResult, ScreenParams, ScriptCommand};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/screen", "Load a screen image: /screen <file> <cursor-x> <cursor-y>"),
    ("/cursor", "Move the cursor: /cursor <x> <y>"),
    ("/pulse", "Send a primary pulse (capture)"),
    ("/down", "Press the hold key"),
    ("/up", "Release the hold key"),
    ("/hold", "Press, wait <ms>, release: /hold 500"),
    ("/anchors", "List retained anchors"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// Image extensions offered for `/screen` completion.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

/// REPL helper for tab completion.
#[derive(Default)]
struct RecallHelper;

impl Completer for RecallHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<12} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
        if cmd == "/screen" && !args.contains(' ') {
            let mut files = Vec::new();
            if let Ok(entries) = std::fs::read_dir(".") {
                for entry in entries.flatten() {
                    let path = entry.path();
                    let is_image = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()));
                    if is_image {
                        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                            files.push(name.to_string());
                        }
                    }
                }
            }
            files.sort();
            let prefix_start = input.len() - args.len();
            let matches: Vec<Pair> = files
                .iter()
                .filter(|f| f.starts_with(args))
                .map(|f| Pair {
                    display: f.clone(),
                    replacement: format!("{f} "),
                })
                .collect();
            return Ok((prefix_start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for RecallHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for RecallHelper {}
impl Validator for RecallHelper {}
impl Helper for RecallHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Translate one REPL line into script commands.
pub fn parse_line(line: &str) -> CliResult<Vec<ScriptCommand>> {
    let input = line.trim().strip_prefix('/').unwrap_or(line.trim());
    let mut parts = input.split_whitespace();
    let cmd = parts.next().unwrap_or("");
    let args: Vec<&str> = parts.collect();

    let int = |s: &str| -> CliResult<i32> {
        s.parse()
            .map_err(|_| CliError::InvalidCommand(format!("'{s}' is not a number")))
    };

    Ok(match (cmd, args.as_slice()) {
        ("pulse" | "click", []) => vec![ScriptCommand::Pulse],
        ("down", []) => vec![ScriptCommand::HoldDown],
        ("up", []) => vec![ScriptCommand::HoldUp],
        ("hold", [ms]) => {
            let ms: u64 = ms
                .parse()
                .map_err(|_| CliError::InvalidCommand(format!("'{ms}' is not a duration")))?;
            vec![
                ScriptCommand::HoldDown,
                ScriptCommand::Wait { ms },
                ScriptCommand::HoldUp,
            ]
        }
        ("cursor", [x, y]) => vec![ScriptCommand::Cursor {
            x: int(*x)?,
            y: int(*y)?,
        }],
        ("screen", [path, x, y]) => vec![ScriptCommand::Screen(ScreenParams {
            window: 1,
            bounds: None,
            cursor: ScreenPoint::new(int(*x)?, int(*y)?),
            path: Some(path.to_string()),
            data: None,
            mime: None,
        })],
        ("anchors", []) => vec![ScriptCommand::Anchors],
        _ => {
            return Err(CliError::InvalidCommand(format!(
                "Unknown or malformed command '/{input}'. Type /help for commands."
            )))
        }
    })
}

/// Run the interactive REPL. Must be called off the async worker threads.
pub fn run(mut driver: Driver, runtime: Handle) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1manchor-recall v{}\x1b[0m \x1b[90m\u{2014} visual anchor recall\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<RecallHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(RecallHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let hist_path = resolve_history_path();
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let prompt = " \x1b[36mrecall>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match line.trim_start_matches('/') {
                    "exit" | "quit" => break,
                    "help" | "h" | "?" | "" => {
                        cmd_help();
                        continue;
                    }
                    "clear" | "cls" => {
                        eprint!("\x1b[2J\x1b[H");
                        continue;
                    }
                    _ => {}
                }

                match parse_line(line) {
                    Ok(commands) => {
                        for command in commands {
                            if let Err(e) = runtime.block_on(driver.apply(command)) {
                                eprintln!("  {e}");
                            }
                        }
                    }
                    Err(e) => eprintln!("  {e}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
    runtime.block_on(driver.drain());

    if let Some(parent) = hist_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<12} {desc}");
    }
    eprintln!();
    eprintln!("  Tip: Tab completes commands and image files for /screen.");
    eprintln!();
}
