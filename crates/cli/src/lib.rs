pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "concierge",
    about = "Concierge operator CLI",
    long_about = "Operate concierge migrations, config inspection, and smoke validation.",
    after_help = "Examples:\n  concierge config\n  concierge migrate\n  concierge smoke"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with secret redaction")]
    Config,
    #[command(about = "Run offline end-to-end checks with per-check timing details")]
    Smoke,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Smoke => commands::smoke::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
