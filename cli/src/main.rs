use std::{
    env,
    path::{Path, PathBuf},
    process,
};

use anyhow::{bail, Context};
use clap::{ArgAction, Parser};
use collision_core::{CollisionDetector, DetectionConfig, DetectionResult, DEFAULT_CONFIG_FILE};
use console::style;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const EXIT_OK: i32 = 0;
const EXIT_COLLISIONS: i32 = 1;
const EXIT_ERROR: i32 = 255;

/// Name collision detector entry point.
#[derive(Debug, Parser)]
#[command(
    name = "detect-collisions",
    version,
    about = "Find PHP classes, functions and constants declared more than once."
)]
struct Args {
    /// Path to config file (JSON). Defaults to collision-detector.json if present.
    #[arg(long, value_name = "FILE")]
    configuration: Option<PathBuf>,

    /// Emit JSON output for automation.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Log progress to stderr (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Files or directories to scan. Overrides scanPaths from the config file.
    #[arg(value_name = "PATH", num_args = 0..)]
    paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    scan_paths: Vec<String>,
    #[serde(flatten)]
    result: &'a DetectionResult,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let code = match run(&args) {
        Ok(code) => code,
        Err(err) => {
            println!("{} {err}", style("ERROR:").red().bold());
            EXIT_ERROR
        }
    };
    process::exit(code);
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> anyhow::Result<i32> {
    let cwd = env::current_dir().context("Failed to resolve working directory")?;
    let config = load_config(args, &cwd)?;
    if config.scan_paths.is_empty() {
        bail!("no directories provided, use e.g. `detect-collisions src tests`");
    }
    debug!(?config, "configuration loaded");

    let detector = CollisionDetector::new(config);
    let result = detector.detect()?;
    let scan_paths: Vec<String> = detector
        .config()
        .scan_paths
        .iter()
        .map(|p| p.display().to_string())
        .collect();

    if args.json {
        let report = JsonReport {
            scan_paths,
            result: &result,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_human_report(&result, &scan_paths);
    }

    Ok(if result.has_collisions() {
        EXIT_COLLISIONS
    } else {
        EXIT_OK
    })
}

fn load_config(args: &Args, cwd: &Path) -> anyhow::Result<DetectionConfig> {
    let config = match &args.configuration {
        Some(path) => DetectionConfig::from_config_file(&args.paths, cwd, path)?,
        None => {
            let default_path = cwd.join(DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                DetectionConfig::from_config_file(&args.paths, cwd, &default_path)?
            } else {
                DetectionConfig::from_defaults(&args.paths, cwd)?
            }
        }
    };
    Ok(config)
}

fn print_human_report(result: &DetectionResult, scan_paths: &[String]) {
    if !result.has_collisions() {
        println!(
            "{} no name collision found in: {}",
            style("OK:").green().bold(),
            scan_paths.join(", ")
        );
    }

    for (group, name, locations) in result.collisions.iter() {
        println!(
            "{} ({group}) is defined {} times:",
            style(name).bold(),
            locations.len()
        );
        for location in locations {
            println!(" > {}", style(location).cyan());
        }
        println!();
    }

    println!(
        "Analysed {} files, excluded {}.",
        result.files_analysed, result.files_excluded
    );
}
