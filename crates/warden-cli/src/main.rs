//! `warden` command-line interface.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "warden",
    version,
    about = "LLM-judged content policy evaluation"
)]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate content against a policy.
    Evaluate(commands::evaluate::EvaluateArgs),
    /// Validate a policy file without evaluating anything.
    Validate(commands::validate::ValidateArgs),
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warden=info",
        1 => "warden=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Evaluate(args) => commands::evaluate::run(args).await,
        Command::Validate(args) => commands::validate::run(args),
    }
}
