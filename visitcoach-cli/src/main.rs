use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "visitcoach", about = "Feedback on home-visit interview practice")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a transcript against the endpoint
    Analyze(commands::analyze::AnalyzeArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Run a recorded response stream through the pipeline
    Replay(commands::replay::ReplayArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args).await,
        Commands::Config(args) => commands::config::run(args),
        Commands::Replay(args) => commands::replay::run(args).await,
    }
}
