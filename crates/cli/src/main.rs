//! Codesmith CLI entry point.
//!
//! This binary is the composition root for the whole system:
//!
//! 1. **Load configuration**: `codesmith.toml` (or `--config`), then
//!    environment overrides, then validation.
//! 2. **Wire observability**: `tracing-subscriber` with a text or JSON layer
//!    and, when `telemetry.otlp_endpoint` is set, an OpenTelemetry exporter.
//! 3. **Construct infrastructure**: the LLM provider, both LLM agents, and the
//!    local checkers, injected into a `PipelineExecutor`.
//! 4. **Dispatch** the subcommand.

mod commands;
mod config;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::OutputOptions;
use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::telemetry::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "codesmith",
    about = "Generate Python code with an LLM, then syntax-check and verify it",
    version
)]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP front end.
    Serve,

    /// Run one request through the pipeline.
    Generate {
        request: String,

        /// Skip the review stage.
        #[arg(long)]
        no_review: bool,

        /// Print the JSON response instead of markdown.
        #[arg(long)]
        json: bool,

        /// Also write the JSON response to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List the example requests, or run one.
    Examples {
        /// Example id to run.
        #[arg(long)]
        run: Option<u32>,

        #[arg(long)]
        no_review: bool,

        #[arg(long)]
        json: bool,
    },

    /// Self-test the syntax checker and reference verifier.
    CheckAgents,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let required = cli.config.as_os_str() != DEFAULT_CONFIG_PATH;
    let config = AppConfig::load(&cli.config, required)?;
    let _telemetry = telemetry::init(cli.log_format, &config.telemetry)?;

    match cli.command {
        Command::Serve => commands::serve(&config).await,
        Command::Generate {
            request,
            no_review,
            json,
            output,
        } => {
            let options = OutputOptions {
                no_review,
                json,
                output: output.as_deref(),
            };
            commands::generate(&config, &request, options).await
        }
        Command::Examples {
            run,
            no_review,
            json,
        } => {
            let options = OutputOptions {
                no_review,
                json,
                output: None,
            };
            commands::examples(&config, run, options).await
        }
        Command::CheckAgents => commands::check_agents(&config).await,
    }
}
