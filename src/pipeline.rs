use std::collections::HashSet;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::{info, instrument, warn};

use crate::batch::{self, AnnotateTarget, Batch};
use crate::config::Config;
use crate::error::{PrepError, PrepResult};
use crate::render;
use crate::session::{BBoxSession, CropSession};

/// The interactive surface the pipeline talks to.
pub trait Operator {
    /// Drive `session` over the down-scaled reference image until it
    /// finishes. Returning with an unfinished session counts as cancel.
    fn select_crop(&mut self, preview: &DynamicImage, session: &mut CropSession)
        -> PrepResult<()>;

    /// Drive `session` over the down-scaled template image.
    fn annotate(&mut self, preview: &DynamicImage, session: &mut BBoxSession) -> PrepResult<()>;

    fn include_in_annotation(&mut self, subdir: &str) -> bool;

    fn notify(&mut self, message: &str);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to process under the chosen root.
    NothingFound,
    CropCancelled,
    Completed,
}

#[derive(Debug)]
pub struct RunSummary {
    pub outcome: Outcome,
    pub cropped: usize,
    pub crop_failures: usize,
    pub annotated: usize,
    pub annotate_failures: usize,
    pub annotated_subdirs: Vec<String>,
}

impl RunSummary {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            cropped: 0,
            crop_failures: 0,
            annotated: 0,
            annotate_failures: 0,
            annotated_subdirs: Vec::new(),
        }
    }
}

/// Crop every image under `root`, then optionally burn bboxes into the
/// selected subdirectories.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn run<O: Operator>(root: &Path, config: &Config, operator: &mut O) -> PrepResult<RunSummary> {
    let scaler = config.scaler()?;
    let batch = Batch::discover(root, config)?;

    if batch.subdirs().is_empty() {
        operator.notify("No subdirectories found in the selected directory.");
        return Ok(RunSummary::new(Outcome::NothingFound));
    }
    if batch.is_empty() {
        operator.notify("No supported image files found.");
        return Ok(RunSummary::new(Outcome::NothingFound));
    }
    info!("collected {} images", batch.len());

    // Step 1: choose the crop region on the reference image.
    let items: Vec<_> = batch.all_items().collect();
    let reference = *items
        .get(config.reference_index)
        .ok_or(PrepError::IndexOutOfRange {
            index: config.reference_index,
            len: items.len(),
        })?;
    let original =
        image::open(&reference.source).map_err(|e| PrepError::decode(&reference.source, e))?;

    let mut crop_session = CropSession::new(scaler);
    operator.select_crop(&render::preview(&original, &scaler), &mut crop_session)?;
    let Some(region) = crop_session.confirmed_region() else {
        operator.notify("Crop region was not confirmed, nothing was written.");
        return Ok(RunSummary::new(Outcome::CropCancelled));
    };

    batch.prepare_output_dirs()?;
    let first = render::crop(&original, region)?;
    first
        .save(&reference.cropped)
        .map_err(|e| PrepError::encode(&reference.cropped, e))?;
    info!(
        "crop region {region} set, saved {}",
        reference.cropped.display()
    );

    // Step 2: same region for everything else.
    let report = batch::crop_batch(
        region,
        items
            .iter()
            .filter(|item| item.source != reference.source)
            .map(|item| (item.source.as_path(), item.cropped.as_path())),
    );
    let mut summary = RunSummary::new(Outcome::Completed);
    summary.cropped = report.written.len() + 1;
    summary.crop_failures = report.failed.len();

    let fresh: HashSet<PathBuf> = report
        .written
        .into_iter()
        .chain([reference.cropped.clone()])
        .collect();

    // Step 3: which subdirectories get boxes.
    let selected: Vec<String> = batch
        .populated_subdirs()
        .filter(|subdir| operator.include_in_annotation(subdir))
        .map(str::to_string)
        .collect();

    if selected.is_empty() {
        info!("no directories selected for bbox annotation");
    } else {
        info!("annotating: {}", selected.join(", "));
        annotate_selected(&batch, &selected, &fresh, config, operator, &mut summary)?;
    }

    operator.notify(&format!(
        "Done. Results are in '{}'.",
        root.join(&config.output_dir).display()
    ));
    Ok(summary)
}

fn annotate_selected<O: Operator>(
    batch: &Batch,
    selected: &[String],
    fresh: &HashSet<PathBuf>,
    config: &Config,
    operator: &mut O,
    summary: &mut RunSummary,
) -> PrepResult<()> {
    let scaler = config.scaler()?;
    let template_items = batch.items_in(&selected[0]);
    let template = template_items
        .get(config.template_index)
        .ok_or(PrepError::IndexOutOfRange {
            index: config.template_index,
            len: template_items.len(),
        })?;

    if !fresh.contains(&template.cropped) {
        warn!(
            "template {} was not cropped in this run, annotation skipped",
            template.cropped.display()
        );
        return Ok(());
    }
    let template_image = match image::open(&template.cropped) {
        Ok(img) => img,
        Err(e) => {
            warn!("cannot read template {}: {e}", template.cropped.display());
            return Ok(());
        }
    };

    let mut session = BBoxSession::new(scaler);
    operator.annotate(&render::preview(&template_image, &scaler), &mut session)?;
    let boxes = session.saved_boxes();
    if boxes.is_empty() {
        info!("no boxes saved, annotation skipped");
        return Ok(());
    }

    // Only crops written by this run; leftovers from earlier runs may use
    // another region.
    let mut targets = Vec::new();
    let mut stale = Vec::new();
    for subdir in selected {
        let dest_dir = batch.bbox_dir_for(subdir);
        for item in batch.items_in(subdir) {
            if fresh.contains(&item.cropped) {
                targets.push(AnnotateTarget {
                    source: item.cropped.clone(),
                    dest_dir: dest_dir.clone(),
                });
            } else {
                let err = PrepError::NotCropped {
                    path: item.cropped.clone(),
                };
                warn!("skipping {}: {err}", item.source.display());
                stale.push(err);
            }
        }
    }

    let report = batch::annotate_batch(&boxes, &targets, config);
    summary.annotated = report.written.len();
    summary.annotate_failures = report.failed.len() + stale.len();
    summary.annotated_subdirs = selected.to_vec();
    info!("saved {} annotated images", summary.annotated);
    Ok(())
}
