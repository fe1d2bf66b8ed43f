// file_metadata - print the merged analysis of media files as JSON

use anyhow::{bail, Context, Result};
use clap::Parser;
use file_metadata::{analyze_paths, ConfigOverrides, RoutineFilter};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "file_metadata", version, about = "Extract metadata from media files")]
struct Args {
    /// JSON file with option overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override a single option, e.g. --set max_decoded_pixels=1000000
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Run only the named routines
    #[arg(long = "only", value_name = "ROUTINE")]
    only: Vec<String>,

    /// Routine name prefix
    #[arg(long, default_value = "analyze_")]
    prefix: String,

    /// Routine name suffix
    #[arg(long, default_value = "")]
    suffix: String,

    /// Files to analyze
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the JSON document
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut overrides = match &args.config {
        Some(path) => ConfigOverrides::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConfigOverrides::new(),
    };
    for assignment in &args.set {
        overrides
            .parse_assignment(assignment)
            .with_context(|| format!("Invalid --set {}", assignment))?;
    }

    let filter = RoutineFilter {
        prefix: args.prefix.clone(),
        suffix: args.suffix.clone(),
        names: (!args.only.is_empty()).then(|| args.only.clone()),
    };

    info!("Analyzing {} file(s)", args.paths.len());
    let mut output = Map::new();
    let mut failures = 0;
    for (path, outcome) in analyze_paths(&args.paths, &overrides, &filter) {
        match outcome {
            Ok(result) => {
                output.insert(path.display().to_string(), result.into_json());
            }
            Err(e) => {
                error!("{}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    let json = serde_json::to_string_pretty(&Value::Object(output))
        .context("Failed to serialize results")?;
    println!("{}", json);

    if failures > 0 {
        bail!("{} of {} file(s) could not be analyzed", failures, args.paths.len());
    }
    Ok(())
}
