//! Command-line interface for the scan export.

use std::fs::File;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{error, info};

use crate::config::PipelineConfig;
use crate::error::ExportError;
use crate::run_log::open_execution_log;
use crate::{ingest, pipeline};

#[derive(Parser)]
#[command(name = "scan-export")]
#[command(about = "Prepare surveillance samples for spatial cluster detection", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build params.csv, sample.csv and the run log from warehouse JSON
    Prepare,

    /// Validate samples and write the scan input files
    Run,

    /// List the recognized species names and labels
    Species,
}

fn init_logging(verbose: u8, target: Option<File>) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(match verbose {
            0 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs();
    if let Some(file) = target {
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
}

fn load_config(cli: &Cli) -> Result<PipelineConfig, ExportError> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_yaml(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

/// Parse arguments, run the command and return the process exit status.
pub fn run() -> i32 {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose, None);
            error!("{e}");
            return e.exit_code();
        }
    };

    // `prepare` starts the execution log that `run` appends to.
    let target = match cli.command {
        Commands::Prepare => Some(true),
        Commands::Run => Some(false),
        Commands::Species => None,
    }
    .and_then(|truncate| {
        let path = config.execution_log_path();
        match open_execution_log(&path, truncate) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Cannot open {}: {e}; logging to stderr", path.display());
                None
            }
        }
    });
    init_logging(cli.verbose, target);

    let outcome = match cli.command {
        Commands::Prepare => ingest::prepare(&config).map(|summary| {
            info!(
                "Prepared {} parameters and {} samples",
                summary.parameters, summary.samples
            );
        }),
        Commands::Run => pipeline::run(&config).map(|summary| {
            println!(
                "{} ({}): {} cases, {} controls written to {}",
                summary.scan_type,
                summary.species_label,
                summary.cases,
                summary.controls,
                config.output_dir().display()
            );
        }),
        Commands::Species => {
            for entry in config.species.entries() {
                println!("{}\t{}", entry.name, entry.label);
            }
            Ok(())
        }
    };

    match outcome {
        Ok(()) => 0,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            e.exit_code()
        }
    }
}
