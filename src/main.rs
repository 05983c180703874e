use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use figure_prep::logging::init_logging;
use figure_prep::pipeline::{self, Outcome};
use figure_prep::ui::{self, DesktopOperator};
use figure_prep::Config;

/// Crop a directory tree of figure images to one region and burn bounding
/// boxes into selected subdirectories.
#[derive(Parser, Debug)]
#[command(name = "figure-prep", version, about)]
struct Cli {
    /// Directory whose subdirectories hold the images; a folder dialog opens if omitted
    root: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preview scale factor
    #[arg(long)]
    scale: Option<f64>,

    /// Offset added to the trailing number of renumbered bbox files
    #[arg(long, allow_negative_numbers = true)]
    offset: Option<i64>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    config.apply_env()?;
    if let Some(scale) = cli.scale {
        config.scale_factor = scale;
    }
    if let Some(offset) = cli.offset {
        config.sequence_offset = offset;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let config = load_config(&cli).context("loading configuration")?;

    let Some(root) = cli.root.clone().or_else(ui::pick_root) else {
        info!("no directory chosen, nothing to do");
        return Ok(());
    };
    if !root.is_dir() {
        anyhow::bail!("not a directory: {}", root.display());
    }

    let mut operator = DesktopOperator::new(&config);
    let summary = pipeline::run(&root, &config, &mut operator)
        .with_context(|| format!("processing {}", root.display()))?;

    match summary.outcome {
        Outcome::Completed => {
            info!(
                "cropped {} images, annotated {}",
                summary.cropped, summary.annotated
            );
            let failures = summary.crop_failures + summary.annotate_failures;
            if failures > 0 {
                warn!("{failures} images were skipped, see the log above");
            }
        }
        Outcome::CropCancelled => info!("cancelled before cropping"),
        Outcome::NothingFound => info!("nothing to process"),
    }
    Ok(())
}
