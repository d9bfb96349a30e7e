use crate::demo::{run_demo, run_roster_import, DemoArgs, RosterImportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use culture_centre::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Culture Centre",
    about = "Run the school culture centre enrollment service from the command line",
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
    /// Walk through a course request and enrollment against an in-memory class
    Demo(DemoArgs),
    /// Manage class rosters in the JSON store
    Roster {
        #[command(subcommand)]
        command: RosterCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RosterCommand {
    /// Import students from a CSV file (name,username,password)
    Import(RosterImportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Persist classes to this JSON file instead of keeping them in memory
    #[arg(long)]
    pub(crate) data_path: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Roster {
            command: RosterCommand::Import(args),
        } => run_roster_import(args),
    }
}
