//! benchforge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Preset error
//! - 4: Template error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use forge_artifacts::ArtifactError;
use forge_presets::PresetError;
use forge_templates::TemplateError;

mod commands;
mod config;

use commands::{Cli, Commands};
use config::ForgeConfig;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const PRESET_ERROR: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match ForgeConfig::load(cli.config.as_deref()) {
        Ok(config) => run(cli.command, &config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

async fn run(command: Commands, config: &ForgeConfig) -> anyhow::Result<()> {
    match command {
        Commands::Presets(args) => commands::presets::execute(args, config).await,
        Commands::Render(args) => commands::render::execute(args, config).await,
        Commands::Generate(args) => commands::generate::execute(args, config).await,
        Commands::Batch(args) => commands::batch::execute(args, config).await,
        Commands::CheckTemplates(args) => commands::check_templates::execute(args, config).await,
    }
}

/// `RUST_LOG` wins when set; otherwise `-v`/`-q` pick the level for the
/// forge crates. Logs go to stderr so rendered output on stdout stays clean.
fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("forge={},warn", level)));

    let json = cli
        .log_json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let plain = (!cli.log_json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let log_result = tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<ArtifactError>() {
            return match err {
                ArtifactError::Preset(_) => ExitCodes::PRESET_ERROR,
                ArtifactError::Template(_) => ExitCodes::TEMPLATE_ERROR,
                ArtifactError::UnknownKind(..) => ExitCodes::INVALID_ARGS,
                ArtifactError::Io { .. } => ExitCodes::GENERAL_ERROR,
            };
        }
        if cause.downcast_ref::<PresetError>().is_some() {
            return ExitCodes::PRESET_ERROR;
        }
        if cause.downcast_ref::<TemplateError>().is_some() {
            return ExitCodes::TEMPLATE_ERROR;
        }
        if cause.downcast_ref::<config::ArgumentError>().is_some() {
            return ExitCodes::INVALID_ARGS;
        }
    }
    ExitCodes::GENERAL_ERROR
}
