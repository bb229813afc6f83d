pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::commands::pitch::PitchArgs;

#[derive(Debug, Parser)]
#[command(
    name = "pitchcraft",
    about = "Pitchcraft operator CLI",
    long_about = "Generate startup pitches from trending news, inspect tools and configuration, \
                  and check runtime readiness.",
    after_help = "Examples:\n  \
                  pitchcraft pitch --industry tech --audience students --word cloud\n  \
                  pitchcraft tools --mode serious\n  \
                  pitchcraft doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Generate one startup pitch and print it")]
    Pitch {
        #[arg(long, help = "Industry the startup operates in")]
        industry: String,
        #[arg(long, help = "Target audience of the startup")]
        audience: String,
        #[arg(long, help = "Word the pitch must include")]
        word: String,
        #[arg(long, help = "silly or serious; defaults to agent.mode")]
        mode: Option<String>,
        #[arg(long, help = "Emit the full run envelope as JSON")]
        json: bool,
    },
    #[command(about = "List registered tools and the pipeline of each mode")]
    Tools {
        #[arg(long, help = "Only show the pipeline and tools of this mode")]
        mode: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, credentials and tool registry readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

/// Logs go to stderr so that stdout stays parseable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Pitch { industry, audience, word, mode, json } => {
            commands::pitch::run(PitchArgs { industry, audience, word, mode, json })
        }
        Command::Tools { mode, json } => commands::tools::run(mode.as_deref(), json),
        Command::Config => commands::CommandResult::printed(commands::config::run()),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
