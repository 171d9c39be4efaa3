//! imgutil CLI
//!
//! Compresses images to JPEG or keys out their background to PNG through the
//! shared `ImageProcessor`.

use super::config::CliConfigBuilder;
use crate::{
    processor::ImageProcessor,
    services::{OutputFormatHandler, OutputKind},
    tracing_config::{TracingConfig, TracingFormat},
    types::EncodedImage,
    utils::format_file_size,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Read, Write};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Image compression and background keying tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgutil")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON configuration file supplying default quality/tolerance/max_pixels
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Reject images with more than this many pixels before decoding them
    #[arg(long, value_name = "PIXELS", global = true)]
    pub max_pixels: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Re-encode images as JPEG at a quality level
    Compress(CompressArgs),
    /// Make pixels matching the top-left color transparent (PNG output)
    #[command(name = "remove-bg")]
    RemoveBg(RemoveBgArgs),
}

impl Command {
    fn kind(&self) -> OutputKind {
        match self {
            Self::Compress(_) => OutputKind::Compressed,
            Self::RemoveBg(_) => OutputKind::NoBackground,
        }
    }

    fn io(&self) -> &InputArgs {
        match self {
            Self::Compress(args) => &args.io,
            Self::RemoveBg(args) => &args.io,
        }
    }
}

/// Inputs and outputs shared by both subcommands
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Input image files or directories (use "-" for stdin)
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output file (single input) or directory (batch processing). Use "-" for stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Pattern for batch processing (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,
}

#[derive(Args, Debug)]
pub struct CompressArgs {
    #[command(flatten)]
    pub io: InputArgs,

    /// JPEG quality (1-100) [default: 80]
    #[arg(short, long, allow_negative_numbers = true)]
    pub quality: Option<i64>,
}

#[derive(Args, Debug)]
pub struct RemoveBgArgs {
    #[command(flatten)]
    pub io: InputArgs,

    /// Manhattan RGB distance below which pixels are keyed (0-765) [default: 50]
    #[arg(short, long, allow_negative_numbers = true)]
    pub tolerance: Option<i64>,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose).context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    info!(
        quality = %config.quality,
        tolerance = %config.tolerance,
        max_pixels = ?config.max_pixels,
        "Starting imgutil"
    );

    let processor = ImageProcessor::new(config).context("Failed to create image processor")?;

    let start_time = Instant::now();
    let processed_count = process_inputs(&cli.command, &processor).await?;
    info!(
        "Processed {} image(s) in {:.2}s",
        processed_count,
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Initialize tracing based on verbosity level, `RUST_LOG` and the terminal
fn init_tracing(verbose_count: u8) -> Result<()> {
    let env_filter = std::env::var("RUST_LOG").ok();
    let stderr_is_terminal = io::stderr().is_terminal();

    tracing_config_for(verbose_count, env_filter, stderr_is_terminal)
        .init()
        .context("Failed to initialize tracing subscriber")?;

    debug!(verbosity = verbose_count, "Tracing initialized");
    Ok(())
}

/// Colored console output on a terminal, plain compact lines when piped;
/// a non-empty `RUST_LOG` overrides the `-v` count
fn tracing_config_for(
    verbose_count: u8,
    env_filter: Option<String>,
    stderr_is_terminal: bool,
) -> TracingConfig {
    let format = if stderr_is_terminal {
        TracingFormat::Console
    } else {
        TracingFormat::Compact
    };
    let config = TracingConfig::new()
        .with_verbosity(verbose_count)
        .with_format(format);

    match env_filter.filter(|f| !f.trim().is_empty()) {
        Some(filter) => config.with_env_filter(filter),
        None => config,
    }
}

async fn process_inputs(command: &Command, processor: &ImageProcessor) -> Result<usize> {
    let io_args = command.io();
    let kind = command.kind();

    // Handle stdin specially (single input)
    if io_args.input.len() == 1 && io_args.input.first().is_some_and(|s| s == "-") {
        return process_stdin(io_args.output.as_deref(), kind, processor).await;
    }

    let mut all_files = Vec::new();
    for input in &io_args.input {
        let path = PathBuf::from(input);

        if path.is_file() {
            if OutputFormatHandler::is_supported_input(&path) {
                all_files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            all_files.extend(find_image_files(
                &path,
                io_args.recursive,
                io_args.pattern.as_deref(),
            )?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    if all_files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(0);
    }

    // Sort files alphanumerically for consistent processing order
    all_files.sort();
    info!("Found {} image file(s) to process", all_files.len());

    if all_files.len() == 1 {
        if let Some(input_file) = all_files.first() {
            let output_path = resolve_single_output(io_args.output.as_deref(), kind)?;
            process_single_file(input_file, &output_path, kind, processor).await?;
        }
        return Ok(1);
    }

    let output_dir = prepare_output_dir(io_args.output.as_deref())?;
    let plan = plan_batch_outputs(&all_files, output_dir.as_deref(), kind)?;

    let progress = ProgressBar::new(all_files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let mut processed_count = 0;
    let mut failed_count = 0;

    for (input_file, output_path) in &plan {
        progress.set_message(format!("Processing {}", input_file.display()));

        match process_single_file(input_file, output_path, kind, processor).await {
            Ok(()) => processed_count += 1,
            Err(e) => {
                failed_count += 1;
                error!("Failed to process {}: {:#}", input_file.display(), e);
            },
        }
        progress.inc(1);
    }

    progress.finish_with_message(format!(
        "{} succeeded, {} failed",
        processed_count, failed_count
    ));

    if processed_count == 0 {
        anyhow::bail!("All {} input(s) failed to process", failed_count);
    }

    Ok(processed_count)
}

/// Pair every batch input with its output path
///
/// Outputs go to `output_dir` or next to their input. Inputs whose default
/// names collide (`cat.png` and `cat.jpg`) keep their source extension in the
/// name instead; a collision that survives that, or an output that would
/// overwrite one of the inputs, aborts the batch before anything is written.
fn plan_batch_outputs(
    files: &[PathBuf],
    output_dir: Option<&Path>,
    kind: OutputKind,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    let dir_for = |input: &Path| -> PathBuf {
        output_dir
            .map(Path::to_path_buf)
            .or_else(|| input.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    };

    let defaults: Vec<PathBuf> = files
        .iter()
        .map(|input| {
            OutputFormatHandler::batch_output_path(input, &dir_for(input.as_path()), kind)
        })
        .collect();
    let mut default_counts: HashMap<&Path, usize> = HashMap::new();
    for path in &defaults {
        *default_counts.entry(path.as_path()).or_default() += 1;
    }

    let mut plan = Vec::with_capacity(files.len());
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    for (input, default) in files.iter().zip(&defaults) {
        let output = if default_counts.get(default.as_path()).copied().unwrap_or(0) > 1 {
            let qualified = dir_for(input.as_path())
                .join(OutputFormatHandler::qualified_batch_file_name(input, kind));
            debug!(
                "{} shares an output name; writing {} instead",
                input.display(),
                qualified.display()
            );
            qualified
        } else {
            default.clone()
        };

        if files.contains(&output) {
            anyhow::bail!(
                "Output {} for {} would overwrite an input file",
                output.display(),
                input.display()
            );
        }
        if let Some(previous) = claimed.insert(output.clone(), input.as_path()) {
            anyhow::bail!(
                "{} and {} would both be written to {}",
                previous.display(),
                input.display(),
                output.display()
            );
        }
        plan.push((input.clone(), output));
    }

    Ok(plan)
}

/// Single-input output path: explicit file, a directory to place the
/// conventional name into, or the conventional name in the working directory
fn resolve_single_output(output: Option<&str>, kind: OutputKind) -> Result<PathBuf> {
    match output {
        Some(out) => {
            let path = PathBuf::from(out);
            if path.is_dir() {
                Ok(path.join(kind.default_file_name()))
            } else {
                Ok(path)
            }
        },
        None => Ok(PathBuf::from(kind.default_file_name())),
    }
}

fn prepare_output_dir(output: Option<&str>) -> Result<Option<PathBuf>> {
    let Some(output) = output else {
        return Ok(None);
    };
    if output == "-" {
        anyhow::bail!("Cannot use stdout (-) as output when processing multiple files");
    }

    let output_path = PathBuf::from(output);
    if !output_path.exists() {
        std::fs::create_dir_all(&output_path).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;
    } else if output_path.is_file() {
        anyhow::bail!(
            "Output path exists and is a file, not a directory: {}",
            output_path.display()
        );
    }
    Ok(Some(output_path))
}

async fn process_stdin(
    output: Option<&str>,
    kind: OutputKind,
    processor: &ImageProcessor,
) -> Result<usize> {
    info!("Reading image from stdin");
    let image_data = read_stdin()?;

    let encoded = run_transform(processor, kind, image_data).await?;

    match output {
        Some("-") => write_stdout(encoded.as_bytes())?,
        other => {
            let path = resolve_single_output(other, kind)?;
            write_output(&encoded, &path)?;
        },
    }

    Ok(1)
}

async fn process_single_file(
    input_path: &Path,
    output_path: &Path,
    kind: OutputKind,
    processor: &ImageProcessor,
) -> Result<()> {
    let start = Instant::now();
    let bytes = std::fs::read(input_path)
        .with_context(|| format!("Failed to read {}", input_path.display()))?;

    let encoded = run_transform(processor, kind, bytes)
        .await
        .with_context(|| format!("Failed to process {}", input_path.display()))?;

    if output_path == Path::new("-") {
        write_stdout(encoded.as_bytes())?;
    } else {
        write_output(&encoded, output_path)?;
        info!(
            "Processed: {} -> {} in {:.2}s",
            input_path.display(),
            output_path.display(),
            start.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

/// Run the transform for `kind` off the async executor and log its outcome
async fn run_transform(
    processor: &ImageProcessor,
    kind: OutputKind,
    bytes: Vec<u8>,
) -> Result<EncodedImage> {
    match kind {
        OutputKind::Compressed => {
            let result = processor.compress_async(bytes).await?;
            info!(
                "Original: {}, compressed: {}{}",
                format_file_size(result.original_bytes),
                format_file_size(result.compressed_bytes),
                result
                    .compression_ratio()
                    .map(|r| format!(" ({}% smaller)", r))
                    .unwrap_or_default()
            );
            Ok(result.encoded)
        },
        OutputKind::NoBackground => {
            let result = processor.remove_background_async(bytes).await?;
            info!(
                "Background {} keyed out of {} pixel(s)",
                result.reference_color,
                result.keyed_pixel_count()
            );
            Ok(result.encoded)
        },
    }
}

fn write_output(encoded: &EncodedImage, path: &Path) -> Result<()> {
    crate::services::ImageIOService::save_encoded(encoded, path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Read image data from stdin
fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read image data from stdin")?;

    if buffer.is_empty() {
        anyhow::bail!("No data received from stdin");
    }

    Ok(buffer)
}

/// Write image data to stdout
fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = io::stdout();
    stdout
        .write_all(data)
        .context("Failed to write image data to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Find supported image files in a directory
///
/// Files named like a previous batch's output (`*_compressed.*`,
/// `*_no_background.*`) are left out so a rerun does not process them again.
fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let path = entry.path();
                if is_batch_candidate(path, pattern) {
                    files.push(path.to_path_buf());
                }
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if is_batch_candidate(&path, pattern) {
                    files.push(path);
                }
            }
        }
    }

    Ok(files)
}

fn is_batch_candidate(path: &Path, pattern: Option<&str>) -> bool {
    if !OutputFormatHandler::is_supported_input(path) || !matches_pattern(path, pattern) {
        return false;
    }
    if OutputFormatHandler::is_generated_output(path) {
        debug!("Skipping earlier output: {}", path.display());
        return false;
    }
    true
}

/// Check if file name matches the given glob pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|filename| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            }),
        None => true,
    }
}
