mod commands;
mod inputs;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::inputs::InputArgs;

#[derive(Parser)]
#[command(name = "liftoff", about = "Deploy a containerized service to Google Cloud Run")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision resources, build the image and deploy the service
    Deploy {
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Print the service descriptor without contacting the platform
    Render {
        #[command(flatten)]
        inputs: InputArgs,
        /// Write the descriptor to a file instead of stdout
        #[arg(long, short = 'o', value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Show Cloud Run service status
    Status {
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Check gcloud setup, project readiness and configuration
    Doctor {
        #[command(flatten)]
        inputs: InputArgs,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Deploy { inputs } => commands::deploy(&inputs).await,
        Commands::Render { inputs, output } => commands::render(&inputs, output.as_deref()),
        Commands::Status { inputs } => commands::status(&inputs).await,
        Commands::Doctor { inputs } => commands::doctor(&inputs).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err),
    }
}

fn report_failure(err: &anyhow::Error) -> ExitCode {
    eprintln!("ERROR: {err:#}");
    match err.downcast_ref::<liftoff::Error>() {
        Some(e) => {
            eprintln!("hint: {}", e.hint());
            ExitCode::from(e.exit_code())
        }
        None => ExitCode::FAILURE,
    }
}
