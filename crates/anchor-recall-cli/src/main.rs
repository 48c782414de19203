//! Anchor recall driver entry point.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tokio::io::BufReader;

use anchor_recall::constants;
use anchor_recall::{capture_from_file, normalized_cross_correlation, MatchResult};
use anchor_recall_cli::config::resolve_script_path;
use anchor_recall_cli::transport::{write_outputs, ScriptTransport};
use anchor_recall_cli::Driver;

#[derive(Parser)]
#[command(
    name = "anchor-recall",
    about = "Capture cursor anchors, rank them by confidence, and find them again on screen",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a newline-delimited JSON input script (default: stdin).
    Run {
        /// Script file. Also reads ANCHOR_RECALL_SCRIPT.
        #[arg(short, long)]
        script: Option<String>,
    },

    /// Drive the engine interactively.
    Repl,

    /// Correlate a template image against a screen image.
    Match {
        /// Template image (the anchor).
        template: String,

        /// Image to search.
        screen: String,
    },

    /// Print the engine constants as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   anchor-recall completions bash > ~/.local/share/bash-completion/completions/anchor-recall
    ///   anchor-recall completions zsh > ~/.zfunc/_anchor-recall
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Run { script: None }) {
        Commands::Run { script } => {
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            let writer = tokio::spawn(write_outputs(rx, tokio::io::stdout()));

            let driver = Driver::new(tx, tokio::runtime::Handle::current());
            let mut transport = ScriptTransport::new(driver);
            match resolve_script_path(script.as_deref()) {
                Some(path) => {
                    tracing::info!("Replaying {}", path.display());
                    let file = tokio::fs::File::open(&path).await?;
                    transport.run(BufReader::new(file)).await?;
                }
                None => transport.run(BufReader::new(tokio::io::stdin())).await?,
            }

            // Dropping the driver closes the output channel.
            drop(transport);
            writer.await??;
        }

        Commands::Repl => {
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            let writer = tokio::spawn(write_outputs(rx, tokio::io::stdout()));

            let runtime = tokio::runtime::Handle::current();
            let driver = Driver::new(tx, runtime.clone());
            tokio::task::spawn_blocking(move || anchor_recall_cli::repl::run(driver, runtime))
                .await??;
            writer.await??;
        }

        Commands::Match { template, screen } => {
            let template = capture_from_file(&template)?;
            let screen = capture_from_file(&screen)?;
            let result = match normalized_cross_correlation(&screen, &template) {
                Some((x, y, score)) => MatchResult::new(x, y, score),
                None => anyhow::bail!(
                    "template {}x{} is larger than screen {}x{}",
                    template.width(),
                    template.height(),
                    screen.width(),
                    screen.height()
                ),
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Info => {
            let info = serde_json::json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "trigger_cooldown_ms": constants::TRIGGER_COOLDOWN.as_millis() as u64,
                "hold_threshold_ms": constants::HOLD_THRESHOLD.as_millis() as u64,
                "max_anchors": constants::MAX_ANCHORS,
                "initial_confidence": constants::INITIAL_CONFIDENCE,
                "match_reward": constants::MATCH_REWARD,
                "match_penalty": constants::MATCH_PENALTY,
                "decay_per_second": constants::DECAY_PER_SECOND,
                "prune_confidence": constants::PRUNE_CONFIDENCE,
                "prune_age_secs": constants::PRUNE_AGE_SECS,
                "prune_attempts": constants::PRUNE_ATTEMPTS,
                "match_threshold": constants::MATCH_THRESHOLD,
                "marker_dwell_ms": constants::MARKER_DWELL.as_millis() as u64,
                "anchor_edge": constants::ANCHOR_EDGE,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "anchor-recall", &mut std::io::stdout());
        }
    }

    Ok(())
}
