pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "budtender",
    about = "Budtender operator CLI",
    long_about = "Inspect configuration, manage the database and catalog, and replay transcripts through the decision engine offline.",
    after_help = "Examples:\n  budtender config\n  budtender seed --catalog stock.json\n  budtender classify --transcript chat.json\n  budtender cache deactivate 67e55044-10b1-426f-9247-bb680e5fe0c8"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load catalog rows into the database (demo stock when no file is given)")]
    Seed {
        #[arg(long, value_name = "JSON", help = "JSON array of catalog items")]
        catalog: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Classify, extract and price the last user message of a transcript offline")]
    Classify {
        #[arg(long, value_name = "JSON", help = "JSON array of catalog items (demo stock by default)")]
        catalog: Option<PathBuf>,
        #[arg(long, value_name = "JSON", help = "JSON array of {role, content} turns")]
        transcript: PathBuf,
    },
    #[command(about = "Administer shared response-cache entries")]
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Subcommand)]
enum CacheAction {
    #[command(about = "Replace the stored response of a cache entry")]
    Update {
        #[arg(value_name = "ENTRY_ID")]
        entry_id: String,
        #[arg(long, value_name = "TEXT", help = "Replacement response text")]
        response: String,
    },
    #[command(about = "Stop a cache entry from matching again")]
    Deactivate {
        #[arg(value_name = "ENTRY_ID")]
        entry_id: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed { catalog } => commands::seed::run(catalog.as_deref()),
        Command::Config => commands::config::run(),
        Command::Classify { catalog, transcript } => {
            commands::classify::run(catalog.as_deref(), &transcript)
        }
        Command::Cache { action: CacheAction::Update { entry_id, response } } => {
            commands::cache::update(&entry_id, &response)
        }
        Command::Cache { action: CacheAction::Deactivate { entry_id } } => {
            commands::cache::deactivate(&entry_id)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
