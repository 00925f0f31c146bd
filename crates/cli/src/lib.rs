pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use harvestdesk_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use harvestdesk_core::{Locale, SessionRole};

use crate::commands::requests::RequestAction;

#[derive(Debug, Parser)]
#[command(
    name = "harvestdesk",
    about = "Harvestdesk operator CLI",
    long_about = "Inspect configuration, check backend readiness, and drive the partner \
                  deletion-request workflow.",
    after_help = "Examples:
  harvestdesk doctor --json
  harvestdesk --user-id u-1 --session-partner-id p-1 requests list
  harvestdesk --role admin --user-id a-1 requests process --id r-1 --decision approved"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a harvestdesk.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override backend.base_url")]
    base_url: Option<String>,
    #[arg(long, global = true, help = "Message locale (vi|en)")]
    locale: Option<Locale>,
    #[arg(long, global = true, help = "Session user id")]
    user_id: Option<String>,
    #[arg(long, global = true, help = "Session role (partner|admin)")]
    role: Option<SessionRole>,
    #[arg(long = "session-partner-id", global = true, help = "Partner the session belongs to")]
    session_partner_id: Option<String>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
}

impl GlobalArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                backend_base_url: self.base_url.clone(),
                log_level: self.log_level.clone(),
                locale: self.locale,
                session_user_id: self.user_id.clone(),
                session_role: self.role,
                session_partner_id: self.session_partner_id.clone(),
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, session identity, and backend reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List, create, revoke, and process deletion requests")]
    Requests {
        #[command(subcommand)]
        action: RequestAction,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.global.load_options();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => commands::doctor::run(options, json),
        Command::Requests { action } => {
            if let Ok(config) = AppConfig::load(options.clone()) {
                init_logging(&config);
            }
            commands::requests::run(options, action)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only the command payload.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
