//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, Command};
use crate::config::{Quality, Tolerance, TransformConfig};
use anyhow::{Context, Result};

/// Convert CLI arguments to a validated `TransformConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the configuration: file defaults first, then explicit flags
    ///
    /// Out-of-range quality or tolerance on the command line is an error,
    /// never silently clamped.
    pub(crate) fn from_cli(cli: &Cli) -> Result<TransformConfig> {
        let mut config = match &cli.config {
            Some(path) => TransformConfig::from_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => TransformConfig::default(),
        };

        match &cli.command {
            Command::Compress(args) => {
                if let Some(quality) = args.quality {
                    config.quality = Quality::new(quality).context("Invalid --quality")?;
                }
            },
            Command::RemoveBg(args) => {
                if let Some(tolerance) = args.tolerance {
                    config.tolerance = Tolerance::new(tolerance).context("Invalid --tolerance")?;
                }
            },
        }

        if let Some(max_pixels) = cli.max_pixels {
            config.max_pixels = Some(max_pixels);
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}
