pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "slackbridge",
    about = "Slackbridge operator CLI",
    long_about = "Authorize Google access, inspect effective configuration, and check runtime readiness.",
    after_help = "Examples:\n  slackbridge authorize\n  slackbridge doctor --json\n  slackbridge config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the interactive Google consent flow and store the resulting credential")]
    Authorize {
        #[arg(long, default_value_t = 0, help = "Loopback port for the redirect (0 = ephemeral)")]
        port: u16,
        #[arg(long, default_value_t = 300, help = "Seconds to wait for the consent redirect")]
        timeout_secs: u64,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, provider credentials, and Google credential state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    // Operators usually keep provider keys in a local .env.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Authorize { port, timeout_secs } => commands::authorize::run(port, timeout_secs),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
