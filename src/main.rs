#![forbid(unsafe_code)]

mod action;
mod capture;
mod config;
mod constants;
mod detection;
mod error;
mod gui;
mod hotkeys;
#[cfg(unix)]
mod signals;
mod types;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use config::ConfigStore;
use detection::ShapeDetector;

#[derive(Parser, Debug)]
#[command(name = "autoshake", version, about = "Presses a key whenever a bright box shows up in a screen region")]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// trace, debug, info, warn or error (overrides LOG_LEVEL)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Start with detection already enabled
    #[arg(long)]
    active: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the detector on an image file and print what it finds
    Probe {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
    /// Print the resolved config file path
    ConfigPath,
}

fn parse_log_level(value: &str) -> TraceLevel {
    match value.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

fn probe(path: &Path) -> Result<()> {
    let frame = image::open(path)
        .with_context(|| format!("Failed to load image {}", path.display()))?
        .to_rgba8();
    let detector = ShapeDetector::default();
    let boxes = detector.analyze(&frame);
    let qualifying: Vec<_> = boxes.iter().filter(|b| detector.qualifies(b)).collect();

    println!(
        "{}: {}x{}, {} bright component(s), {} qualifying",
        path.display(),
        frame.width(),
        frame.height(),
        boxes.len(),
        qualifying.len()
    );
    for bbox in &qualifying {
        println!("  {}x{} at ({}, {})", bbox.width, bbox.height, bbox.x, bbox.y);
    }
    println!("verdict: {}", if qualifying.is_empty() { "no trigger" } else { "trigger" });
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = parse_log_level(
        &cli.log_level
            .clone()
            .or_else(|| std::env::var("LOG_LEVEL").ok())
            .unwrap_or_else(|| "info".to_string()),
    );
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")?;

    let store = match &cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::at_default_location(),
    };

    match cli.command {
        Some(Command::Probe { image }) => probe(&image),
        Some(Command::ConfigPath) => {
            println!("{}", store.path().display());
            Ok(())
        }
        None => {
            info!(version = env!("CARGO_PKG_VERSION"), config = %store.path().display(), "Starting autoshake");
            let config = store.load();
            gui::run_gui(gui::Launch { store, config, start_active: cli.active })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_subcommands_and_globals() {
        let cli = Cli::parse_from(["autoshake", "probe", "shot.png", "--log-level", "debug"]);
        assert!(matches!(cli.command, Some(Command::Probe { ref image }) if image == Path::new("shot.png")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));

        let cli = Cli::parse_from(["autoshake", "--active", "--config", "/tmp/a.toml"]);
        assert!(cli.active);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/a.toml")));
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("TRACE"), TraceLevel::TRACE);
        assert_eq!(parse_log_level("warn"), TraceLevel::WARN);
        assert_eq!(parse_log_level("verbose"), TraceLevel::INFO);
    }

    #[test]
    fn test_probe_reports_on_synthetic_image() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("frame.png");
        let mut frame = image::RgbaImage::from_pixel(120, 90, image::Rgba([0, 0, 0, 255]));
        for y in 10..60 {
            for x in 10..60 {
                frame.put_pixel(x, y, image::Rgba([255, 255, 255, 255]));
            }
        }
        frame.save(&path).unwrap();

        assert!(probe(&path).is_ok());
        assert!(probe(&dir.path().join("missing.png")).is_err());
    }
}
