//! Command-line interface for the background replacement pipeline
//!
//! Drives the same [`CompositionPipeline`] the library exposes: remove a
//! background, search for replacements, composite locally, or run the whole
//! flow end to end.

use crate::{
    compose_from_bytes,
    config::PipelineConfig,
    pipeline::CompositionPipeline,
    position::Offset,
    services::{ConsoleProgressReporter, FormatHandler},
    tracing_config::{events, init_cli_tracing},
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default output name for a bare cutout
const DEFAULT_CUTOUT_OUTPUT: &str = "processed-image.png";

/// Default output name for a composite
const DEFAULT_COMPOSITE_OUTPUT: &str = "composite-image.png";

/// Background replacement pipeline CLI
#[derive(Debug, Parser)]
#[command(name = "bgcompose", version, about)]
pub struct Cli {
    /// Increase verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Remove the background from an image via the removal service
    Remove {
        /// Input image (jpg, jpeg, png, gif, webp)
        input: PathBuf,

        /// Output path for the cutout PNG
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Search the background image service
    Search {
        /// Search query
        query: String,

        /// Result page to fetch
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Composite a cutout over a background locally (no network)
    Compose {
        /// Cutout image (defines the output frame)
        foreground: PathBuf,

        /// Background image (cover-fitted behind the cutout)
        background: PathBuf,

        /// Horizontal cutout offset in pixels
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset_x: i32,

        /// Vertical cutout offset in pixels
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset_y: i32,

        /// Output path for the composite PNG
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the full pipeline: remove, search, pick, composite
    Run {
        /// Input image (jpg, jpeg, png, gif, webp)
        input: PathBuf,

        /// Background search query
        #[arg(short, long)]
        query: String,

        /// Index of the search result to use as background
        #[arg(long, default_value_t = 0)]
        pick: usize,

        /// Horizontal cutout offset in pixels
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset_x: i32,

        /// Vertical cutout offset in pixels
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset_y: i32,

        /// Output path for the composite
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// CLI entry point
///
/// # Errors
/// - Configuration, vendor and file I/O failures
pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_cli_tracing(cli.verbose)?;

    match cli.command {
        Commands::Remove { input, output } => run_remove(&input, output).await,
        Commands::Search { query, page } => run_search(&query, page).await,
        Commands::Compose {
            foreground,
            background,
            offset_x,
            offset_y,
            output,
        } => run_compose(&foreground, &background, offset_x, offset_y, output),
        Commands::Run {
            input,
            query,
            pick,
            offset_x,
            offset_y,
            output,
        } => run_full(&input, &query, pick, offset_x, offset_y, output).await,
    }
}

/// Build a pipeline from the process environment (validated once)
fn pipeline_from_env() -> Result<CompositionPipeline> {
    let config = PipelineConfig::from_env().context("failed to load pipeline configuration")?;
    let pipeline = CompositionPipeline::new(config)?
        .with_progress_reporter(Box::new(ConsoleProgressReporter::new()));
    Ok(pipeline)
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("static spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Load a file into the pipeline's upload slot
fn upload_file(pipeline: &mut CompositionPipeline, input: &Path) -> Result<()> {
    let file_name = input
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("input path has no usable file name: {}", input.display()))?;
    let mime_type = FormatHandler::mime_for_file(file_name)
        .ok_or_else(|| anyhow!("'{file_name}' is not an accepted image type"))?;
    let bytes = std::fs::read(input)
        .with_context(|| format!("failed to read '{}'", input.display()))?;
    pipeline.upload(file_name, mime_type, bytes)?;
    Ok(())
}

async fn run_remove(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let mut pipeline = pipeline_from_env()?;
    upload_file(&mut pipeline, input)?;

    tracing::debug!(event = events::REMOVAL_CALL, input = %input.display());
    let pb = spinner("Removing background...");
    let result = pipeline.remove_background().await;
    pb.finish_and_clear();
    result?;

    let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_CUTOUT_OUTPUT));
    std::fs::write(&output, pipeline.export_cutout()?)
        .with_context(|| format!("failed to write '{}'", output.display()))?;
    println!("✅ Cutout written to {}", output.display());
    Ok(())
}

async fn run_search(query: &str, page: u32) -> Result<()> {
    let mut pipeline = pipeline_from_env()?;

    tracing::debug!(event = events::SEARCH_CALL, query, page);
    let pb = spinner("Searching backgrounds...");
    let result = pipeline.search_backgrounds(query, page).await;
    pb.finish_and_clear();
    result?;

    let candidates = pipeline.session().candidates();
    if candidates.is_empty() {
        println!("No backgrounds found for '{query}'.");
        return Ok(());
    }

    println!(
        "{} of {} results for '{query}' (page {}):",
        candidates.len(),
        pipeline.session().total(),
        pipeline.session().page()
    );
    for (index, candidate) in candidates.iter().enumerate() {
        let description = candidate.description.as_deref().unwrap_or("(no description)");
        println!(
            "{index:>3}  {}  {description} — {}",
            candidate.id, candidate.attribution
        );
    }
    if pipeline.session().has_more() {
        println!("More results available; pass --page {}", page + 1);
    }
    Ok(())
}

fn run_compose(
    foreground: &Path,
    background: &Path,
    offset_x: i32,
    offset_y: i32,
    output: Option<PathBuf>,
) -> Result<()> {
    let cutout = std::fs::read(foreground)
        .with_context(|| format!("failed to read '{}'", foreground.display()))?;
    let background_bytes = std::fs::read(background)
        .with_context(|| format!("failed to read '{}'", background.display()))?;

    tracing::debug!(event = events::COMPOSITE_RENDER, offset_x, offset_y);
    let composite = compose_from_bytes(&cutout, &background_bytes, Offset::new(offset_x, offset_y))?;

    let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_COMPOSITE_OUTPUT));
    std::fs::write(&output, composite)
        .with_context(|| format!("failed to write '{}'", output.display()))?;
    println!("✅ Composite written to {}", output.display());
    Ok(())
}

async fn run_full(
    input: &Path,
    query: &str,
    pick: usize,
    offset_x: i32,
    offset_y: i32,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut pipeline = pipeline_from_env()?;
    upload_file(&mut pipeline, input)?;

    let pb = spinner("Removing background...");
    let result = pipeline.remove_background().await;
    pb.finish_and_clear();
    result?;

    let pb = spinner("Searching backgrounds...");
    let result = pipeline.search_backgrounds(query, 1).await;
    pb.finish_and_clear();
    result?;

    let candidate_id = pipeline
        .session()
        .candidates()
        .get(pick)
        .map(|candidate| candidate.id.clone())
        .ok_or_else(|| {
            anyhow!(
                "result index {pick} out of range ({} results for '{query}')",
                pipeline.session().candidates().len()
            )
        })?;

    let pb = spinner("Fetching background and compositing...");
    let result = pipeline.select_background(&candidate_id).await;
    pb.finish_and_clear();
    result?;

    if offset_x != 0 || offset_y != 0 {
        pipeline.set_offset(Offset::new(offset_x, offset_y))?;
    }

    let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_COMPOSITE_OUTPUT));
    std::fs::write(&output, pipeline.export()?)
        .with_context(|| format!("failed to write '{}'", output.display()))?;
    println!("✅ Composite written to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compose_args() {
        let cli = Cli::parse_from([
            "bgcompose",
            "compose",
            "cutout.png",
            "bg.png",
            "--offset-x",
            "-12",
            "--offset-y",
            "30",
        ]);
        match cli.command {
            Commands::Compose {
                offset_x, offset_y, ..
            } => {
                assert_eq!(offset_x, -12);
                assert_eq!(offset_y, 30);
            },
            _ => panic!("expected compose subcommand"),
        }
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["bgcompose", "run", "photo.jpg", "--query", "forest"]);
        match cli.command {
            Commands::Run {
                pick,
                offset_x,
                offset_y,
                output,
                ..
            } => {
                assert_eq!(pick, 0);
                assert_eq!(offset_x, 0);
                assert_eq!(offset_y, 0);
                assert!(output.is_none());
            },
            _ => panic!("expected run subcommand"),
        }
    }
}
