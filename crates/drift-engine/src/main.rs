//! # Drift Engine
//!
//! Headless driver for Project Drift, an infinite chunk-streamed world with
//! a floating origin.
//!
//! Usage: `drift [config.toml] [frames]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod simulation;

use std::path::Path;

use anyhow::{Context, Result};
use drift_world::WorldConfig;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::simulation::{Simulation, WalkPlan};

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("drift=info".parse()?))
        .init();

    info!("Project Drift starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let config = load_config(args.next().as_deref())?;
    let plan = match args.next() {
        Some(frames) => WalkPlan::default().with_frames(
            frames
                .parse()
                .with_context(|| format!("invalid frame count: {frames}"))?,
        ),
        None => WalkPlan::default(),
    };

    let summary = Simulation::new(config, plan)?.run()?;
    info!("Simulation finished: {summary}");

    info!("Project Drift shutdown complete");
    Ok(())
}

/// Loads the world configuration and refuses invalid values.
fn load_config(path: Option<&str>) -> Result<WorldConfig> {
    let config = match path {
        Some(path) => WorldConfig::load_from(Path::new(path)),
        None => WorldConfig::load(),
    };
    config
        .validate()
        .context("invalid world configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("drift.toml");
        let mut config = WorldConfig::default();
        config.streaming.view_distance = 3;
        config.save_to(&path).expect("Failed to save config");

        let loaded = load_config(path.to_str()).expect("valid config");
        assert_eq!(loaded.streaming.view_distance, 3);
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("drift.toml");
        std::fs::write(&path, "[streaming]\nchunk_size = -4.0\n").expect("write");

        let err = load_config(path.to_str()).expect_err("negative chunk size");
        assert!(format!("{err:#}").contains("Chunk size must be positive"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config(Some("/nonexistent/drift.toml")).expect("defaults are valid");
        assert_eq!(config, WorldConfig::default());
    }
}
