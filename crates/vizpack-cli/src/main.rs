#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use vizpack_core::Config;

#[derive(Parser, Debug)]
#[command(name = "vizpack")]
#[command(author, version, about = "Multi-target build orchestrator for the nimble visualizer", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the project root
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Build every active entry, the host document and the declaration file
    Build {
        /// Deployment mode: production, dev-embedded or dev-live
        #[arg(long, default_value = "production")]
        mode: String,
    },

    /// Build, watch and serve the output directory with live reload
    Dev {
        /// Deployment mode: dev-embedded or dev-live
        #[arg(long, default_value = "dev-live")]
        mode: String,

        /// Port to listen on (overrides devServer.port)
        #[arg(long)]
        port: Option<u16>,

        /// Host to bind to (overrides devServer.host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Print the active entries and the host document entries of a mode
    Entries {
        /// Deployment mode: production, dev-embedded or dev-live
        #[arg(long, default_value = "production")]
        mode: String,
    },

    /// Print the transform chain a file is routed to
    Route {
        /// File path, as it would be imported
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Commands::Build { mode } => {
            let span = tracing::info_span!("build", cmd = "build", cwd = %config.cwd.display());
            let _guard = span.enter();
            commands::build::run(&config, &mode)
        }
        Commands::Dev { mode, port, host } => {
            let mode = commands::parse_mode(&mode);
            let action = commands::dev::DevAction {
                root: commands::project_root(&config.cwd),
                mode,
                port,
                host,
                json: config.json_logs,
            };
            let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
            runtime.block_on(commands::dev::run(action))
        }
        Commands::Entries { mode } => commands::entries::run(&config, &mode),
        Commands::Route { file } => commands::route::run(&config, &file),
    }
}
