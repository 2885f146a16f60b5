use crate::demo::{run_demo, DemoArgs};
use crate::seed::{run_seed, SeedArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hustlr::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Hustlr",
    about = "Run and demonstrate the Hustlr services marketplace from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Write a randomly generated marketplace fixture to disk
    Seed(SeedArgs),
    /// Walk through a provider and consumer exchange against an in-memory store
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed the in-memory store from this JSON fixture
    #[arg(long)]
    pub(crate) fixture: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Seed(args) => run_seed(args),
        Command::Demo(args) => run_demo(args),
    }
}
