//! matchgrade: reference-based color grading from the command line.
//!
//! Matches a source image's per-channel histograms to a reference image and
//! writes a graded preview and/or a `.cube` 3D LUT of the same transform.

mod config;
mod image_loader;
mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use matchgrade_core::{
    GradingSession, LutGrid, MoodDescriber, PaletteMoodDescriber, PixelBuffer,
};

use crate::config::{CliOverrides, EnvConfig};
use crate::report::{Dimensions, RunReport};

#[derive(Parser)]
#[command(name = "matchgrade")]
#[command(version, about = "Grade an image toward a reference look and export a .cube LUT")]
#[command(long_about = "
Derives a per-channel tone mapping from a reference image's histograms and
applies it to a source image.

Examples:
  matchgrade grade -s shot.jpg -r look.jpg -o graded.png
  matchgrade grade -s shot.jpg -r look.jpg --lut look.cube --intensity 60
  matchgrade apply-lut -i shot.jpg -l look.cube -o graded.png
  matchgrade describe look.jpg
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Match a source to a reference; write preview, LUT, and/or report
    #[command(visible_alias = "g")]
    Grade(GradeArgs),

    /// Apply an existing .cube LUT to an image
    #[command(name = "apply-lut", visible_alias = "a")]
    ApplyLut(ApplyLutArgs),

    /// Print a one-sentence mood description of an image
    Describe(DescribeArgs),
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("outputs")
        .required(true)
        .multiple(true)
        .args(["output", "lut", "report"])
))]
struct GradeArgs {
    /// Image to be graded
    #[arg(short, long, value_name = "FILE")]
    source: PathBuf,

    /// Image with the desired look
    #[arg(short, long, value_name = "FILE")]
    reference: PathBuf,

    /// Graded preview output (format from extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// .cube LUT output
    #[arg(short, long, value_name = "FILE")]
    lut: Option<PathBuf>,

    /// JSON run report output
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Grade strength in percent (0-100)
    #[arg(
        short,
        long,
        value_name = "PERCENT",
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    intensity: Option<u8>,

    /// LUT grid resolution per axis (2-256)
    #[arg(long, value_name = "N")]
    lut_size: Option<u32>,

    /// TITLE written into the .cube file
    #[arg(long, value_name = "TEXT")]
    title: Option<String>,

    /// JSON file with grade parameters
    #[arg(long, value_name = "FILE")]
    params: Option<PathBuf>,

    /// Also describe the reference's mood
    #[arg(long)]
    describe: bool,
}

#[derive(Args)]
struct ApplyLutArgs {
    /// Input image
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// .cube LUT to apply
    #[arg(short, long, value_name = "FILE")]
    lut: PathBuf,

    /// Output image
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,
}

#[derive(Args)]
struct DescribeArgs {
    /// Image to describe
    input: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Grade(args) => cmd_grade(args).await,
        Commands::ApplyLut(args) => cmd_apply_lut(&args),
        Commands::Describe(args) => cmd_describe(&args),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn cmd_grade(args: GradeArgs) -> Result<()> {
    let overrides = CliOverrides {
        intensity_percent: args.intensity,
        lut_size: args.lut_size,
        title: args.title.clone(),
    };
    let env = EnvConfig::from_env()?;
    let params = config::resolve_params(args.params.as_deref(), &env, &overrides)?;

    let (source, reference) =
        image_loader::load_pair(args.source.clone(), args.reference.clone()).await?;
    let source_dims = Dimensions::from(&source);
    let reference = Arc::new(reference);

    // Runs alongside grading; its outcome never affects the grade.
    let mood_task = args.describe.then(|| {
        let reference = Arc::clone(&reference);
        tokio::task::spawn_blocking(move || PaletteMoodDescriber.describe(&reference))
    });

    let session = GradingSession::new();
    session
        .set_reference(&reference)
        .with_context(|| format!("reference {}", args.reference.display()))?;
    session
        .set_source(source)
        .with_context(|| format!("source {}", args.source.display()))?;

    if let Some(path) = &args.output {
        let graded = session.preview(params.intensity)?;
        image_loader::save_image(&graded, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if let Some(path) = &args.lut {
        session
            .lut(&params)?
            .save_cube(path, &params.lut_title)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let mood = match mood_task {
        Some(task) => match task.await {
            Ok(Ok(sentence)) => {
                println!("{sentence}");
                Some(sentence)
            }
            Ok(Err(e)) => {
                tracing::warn!("mood description skipped: {e}");
                None
            }
            Err(e) => {
                tracing::warn!("mood description task failed: {e}");
                None
            }
        },
        None => None,
    };

    if let Some(path) = &args.report {
        let report = RunReport {
            source: source_dims,
            reference: Dimensions::from(reference.as_ref()),
            params: params.clone(),
            mappings: session.mappings()?.as_ref().clone(),
            preview_path: args.output.as_deref().map(display),
            lut_path: args.lut.as_deref().map(display),
            mood,
        };
        report.save(path)?;
    }

    tracing::info!(intensity = params.intensity_percent(), "grade complete");
    Ok(())
}

fn cmd_apply_lut(args: &ApplyLutArgs) -> Result<()> {
    let lut = LutGrid::load_cube(&args.lut)
        .with_context(|| format!("failed to load LUT {}", args.lut.display()))?;
    let input = image_loader::load_image(&args.input)?;
    let output: PixelBuffer = lut.apply_to_buffer(&input)?;
    image_loader::save_image(&output, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    Ok(())
}

fn cmd_describe(args: &DescribeArgs) -> Result<()> {
    let image = image_loader::load_image(&args.input)?;
    let sentence = PaletteMoodDescriber
        .describe(&image)
        .with_context(|| format!("cannot describe {}", args.input.display()))?;
    println!("{sentence}");
    Ok(())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
