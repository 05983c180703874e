use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{Config, StrokeStyle};
use crate::error::{PrepError, PrepResult};
use crate::geometry::Rect;
use crate::render;

// ── Batch discovery ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchItem {
    pub subdir: String,
    pub source: PathBuf,
    pub cropped: PathBuf,
}

/// Images found under the chosen root, grouped by subdirectory.
#[derive(Clone, Debug, Default)]
pub struct Batch {
    output_root: PathBuf,
    bbox_root: PathBuf,
    subdirs: Vec<String>,
    items: BTreeMap<String, Vec<BatchItem>>,
}

impl Batch {
    pub fn discover(root: &Path, config: &Config) -> PrepResult<Self> {
        let output_root = root.join(&config.output_dir);
        let bbox_root = output_root.join(&config.bbox_dir);

        let mut subdirs = Vec::new();
        for entry in read_dir(root)? {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() && name != config.output_dir {
                subdirs.push(name);
            }
        }
        subdirs.sort();

        let mut items = BTreeMap::new();
        for subdir in &subdirs {
            let mut sources: Vec<PathBuf> = read_dir(&root.join(subdir))?
                .into_iter()
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && has_image_extension(path, config))
                .collect();
            if sources.is_empty() {
                debug!("{subdir}: no images, skipping");
                continue;
            }
            sources.sort();

            let list: Vec<BatchItem> = sources
                .into_iter()
                .map(|source| {
                    let stem = source
                        .file_stem()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .to_string();
                    BatchItem {
                        subdir: subdir.clone(),
                        cropped: output_root
                            .join(subdir)
                            .join(format!("{}{}.png", config.cropped_prefix, stem)),
                        source,
                    }
                })
                .collect();
            info!("{subdir}: {} images", list.len());
            items.insert(subdir.clone(), list);
        }

        Ok(Self {
            output_root,
            bbox_root,
            subdirs,
            items,
        })
    }

    /// All candidate subdirectories, including ones without images.
    pub fn subdirs(&self) -> &[String] {
        &self.subdirs
    }

    /// Subdirectories that contributed at least one image, in order.
    pub fn populated_subdirs(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn items_in(&self, subdir: &str) -> &[BatchItem] {
        self.items.get(subdir).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every image, subdirectory by subdirectory.
    pub fn all_items(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn bbox_dir_for(&self, subdir: &str) -> PathBuf {
        self.bbox_root.join(subdir)
    }

    /// Create `<output>/<subdir>` for every populated subdirectory.
    pub fn prepare_output_dirs(&self) -> PrepResult<()> {
        for subdir in self.populated_subdirs() {
            create_dir(&self.output_root.join(subdir))?;
        }
        Ok(())
    }
}

fn read_dir(dir: &Path) -> PrepResult<Vec<fs::DirEntry>> {
    let entries = fs::read_dir(dir).map_err(|e| PrepError::file_io(dir, e))?;
    entries
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PrepError::file_io(dir, e))
}

fn create_dir(dir: &Path) -> PrepResult<()> {
    fs::create_dir_all(dir).map_err(|e| PrepError::file_io(dir, e))
}

fn has_image_extension(path: &Path, config: &Config) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| config.accepts_extension(ext))
}

// ── Batch Cropper ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct CropReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, PrepError)>,
}

/// Crop one image by `region` and write it to `dest`.
pub fn crop_one(region: Rect, source: &Path, dest: &Path) -> PrepResult<()> {
    let img = image::open(source).map_err(|e| PrepError::decode(source, e))?;
    let cropped = render::crop(&img, region)?;
    cropped.save(dest).map_err(|e| PrepError::encode(dest, e))
}

/// Apply the same region to every `(source, dest)` pair, skipping failures.
pub fn crop_batch<'a, I>(region: Rect, pairs: I) -> CropReport
where
    I: IntoIterator<Item = (&'a Path, &'a Path)>,
{
    let mut report = CropReport::default();
    for (source, dest) in pairs {
        match crop_one(region, source, dest) {
            Ok(()) => {
                debug!("cropped {}", dest.display());
                report.written.push(dest.to_path_buf());
            }
            Err(e) => {
                warn!("crop failed for {}: {e}", source.display());
                report.failed.push((source.to_path_buf(), e));
            }
        }
    }
    info!(
        "cropped {} images with region {region} ({} failed)",
        report.written.len(),
        report.failed.len()
    );
    report
}

// ── BBox burn-in ────────────────────────────────────────────────────────────

/// Renumbered file name for `path`: the trailing `_`-separated number of the
/// stem plus `offset`, zero padded to `width`.
pub fn sequence_name(path: &Path, offset: i64, width: usize) -> PrepResult<String> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let missing = || PrepError::MissingSequence {
        name: path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string(),
    };
    let tail = stem.rsplit('_').next().ok_or_else(missing)?;
    let number: i64 = tail.trim().parse().map_err(|_| missing())?;
    let renumbered = number
        .checked_add(offset)
        .ok_or(PrepError::SequenceOverflow { number, offset })?;
    if renumbered < 0 {
        return Err(PrepError::NegativeSequence { number, offset });
    }
    Ok(format!("{renumbered:0width$}.png"))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotateTarget {
    pub source: PathBuf,
    pub dest_dir: PathBuf,
}

#[derive(Debug, Default)]
pub struct AnnotateReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, PrepError)>,
}

pub fn annotate_one(
    boxes: &[Rect],
    target: &AnnotateTarget,
    style: StrokeStyle,
    offset: i64,
    width: usize,
) -> PrepResult<PathBuf> {
    let name = sequence_name(&target.source, offset, width)?;
    let img = image::open(&target.source).map_err(|e| PrepError::decode(&target.source, e))?;
    let annotated = render::burn_boxes(&img, boxes, style);

    create_dir(&target.dest_dir)?;
    let dest = target.dest_dir.join(name);
    annotated.save(&dest).map_err(|e| PrepError::encode(&dest, e))?;
    Ok(dest)
}

/// Burn `boxes` into every target. Writes nothing when `boxes` is empty.
pub fn annotate_batch(
    boxes: &[Rect],
    targets: &[AnnotateTarget],
    config: &Config,
) -> AnnotateReport {
    let mut report = AnnotateReport::default();
    if boxes.is_empty() {
        warn!("no boxes to draw, skipping {} images", targets.len());
        return report;
    }

    for target in targets {
        match annotate_one(
            boxes,
            target,
            config.bbox_style,
            config.sequence_offset,
            config.sequence_width,
        ) {
            Ok(dest) => {
                info!("saved {}", dest.display());
                report.written.push(dest);
            }
            Err(e) => {
                warn!("skipping {}: {e}", target.source.display());
                report.failed.push((target.source.clone(), e));
            }
        }
    }
    report
}
