pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "t3ext",
    about = "t3ext operator CLI",
    long_about = "Inspect configuration, prepare the extension store, and try lookups without Slack.",
    after_help = "Examples:\n  t3ext config\n  t3ext migrate\n  t3ext seed extensions.json\n  t3ext lookup powermail"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Create the extension table in the configured store")]
    Migrate,
    #[command(about = "Upsert extension records from a JSON array file into the store")]
    Seed {
        #[arg(help = "Path to a JSON file holding an array of extension records")]
        file: PathBuf,
    },
    #[command(about = "Look up one extension key and print the Slack message it would produce")]
    Lookup {
        #[arg(help = "Extension key, validated the same way as the slash command text")]
        key: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Migrate => commands::migrate::run(),
        Command::Seed { file } => commands::seed::run(&file),
        Command::Lookup { key } => commands::lookup::run(&key),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
