//! KMZ bundle pipeline: validate, extract, patch, estimate, repack.
//!
//! A KMZ is a zip archive holding a `wpmz/` directory with two required
//! members: `template.kml` (untouched) and `waylines.wpml` (the document
//! the patcher rewrites). The archive is extracted into a scratch
//! directory, patched there, and the whole tree is repackaged; members the
//! patcher never touches come back byte-for-byte.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::info;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::ActionConfig;
use crate::estimate;
use crate::model::{Document, MissionReport};
use crate::patch::{self, PatchError};

/// Default output name, following the flight controller's naming scheme.
pub const DEFAULT_OUTPUT_NAME: &str = "5336EE45-2941-4996-B7F1-22BAA25F2639.kmz";

const WPMZ_DIR: &str = "wpmz";
const TEMPLATE_MEMBER: &str = "template.kml";
const WAYLINES_MEMBER: &str = "waylines.wpml";

/// Errors that can occur in the bundle pipeline.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("input file not found: {0}")]
    NotFound(PathBuf),

    #[error("input file must be .kmz: {0}")]
    NotKmz(PathBuf),

    #[error("input file is empty: {0}")]
    Empty(PathBuf),

    #[error("not a valid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("no `wpmz` directory found in archive")]
    MissingWpmz,

    #[error("`{0}` not found in wpmz directory")]
    MissingMember(&'static str),

    #[error("output already exists: {0} (pass --force to overwrite)")]
    OutputExists(PathBuf),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, BundleError>;

/// Where and how to write the processed bundle.
#[derive(Debug, Default)]
pub struct ProcessOptions {
    /// Output directory; defaults to the input file's directory.
    pub out_dir: Option<PathBuf>,

    /// Output file name; defaults to [`DEFAULT_OUTPUT_NAME`].
    pub output_name: Option<String>,

    /// Overwrite an existing output file.
    pub force: bool,
}

/// The result of one pipeline run.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub output: PathBuf,
    pub report: MissionReport,
}

/// Run the whole pipeline on one input bundle.
pub fn process(
    input: &Path,
    options: &ProcessOptions,
    config: &ActionConfig,
) -> Result<ProcessOutcome> {
    validate_input(input)?;
    let output = resolve_output_path(input, options)?;

    let scratch = TempDir::new()?;
    extract(input, scratch.path())?;
    info!("extracted {} into scratch area", input.display());

    let wpmz = find_wpmz(scratch.path())?;
    let template = wpmz.join(TEMPLATE_MEMBER);
    if !template.is_file() {
        return Err(BundleError::MissingMember(TEMPLATE_MEMBER));
    }
    let waylines = wpmz.join(WAYLINES_MEMBER);
    if !waylines.is_file() {
        return Err(BundleError::MissingMember(WAYLINES_MEMBER));
    }

    let text = fs::read_to_string(&waylines)?;
    let doc = Document::parse(&text);
    let outcome = patch::patch(&doc, config)?;
    if outcome.insertion_count > 0 {
        fs::write(&waylines, outcome.document.to_text())?;
    }
    info!(
        "patched {WAYLINES_MEMBER}: {} anchors, {} insertions",
        outcome.anchor_count, outcome.insertion_count
    );

    let report = MissionReport {
        waypoint_count: outcome.document.placemark_count(),
        insertion_count: outcome.insertion_count,
        estimate: estimate::estimate(&outcome.document.waypoints(), config),
    };

    repack(scratch.path(), &output)?;
    info!("wrote {}", output.display());

    Ok(ProcessOutcome { output, report })
}

fn validate_input(input: &Path) -> Result<()> {
    if !input.exists() {
        return Err(BundleError::NotFound(input.to_path_buf()));
    }
    let is_kmz = input
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("kmz"));
    if !is_kmz {
        return Err(BundleError::NotKmz(input.to_path_buf()));
    }
    if fs::metadata(input)?.len() == 0 {
        return Err(BundleError::Empty(input.to_path_buf()));
    }
    Ok(())
}

fn resolve_output_path(input: &Path, options: &ProcessOptions) -> Result<PathBuf> {
    let dir = match &options.out_dir {
        Some(dir) => dir.clone(),
        None => input.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    };
    let name = options
        .output_name
        .as_deref()
        .unwrap_or(DEFAULT_OUTPUT_NAME);
    let output = dir.join(name);
    if output.exists() && !options.force {
        return Err(BundleError::OutputExists(output));
    }
    Ok(output)
}

fn extract(input: &Path, into: &Path) -> Result<()> {
    let file = fs::File::open(input)?;
    let mut archive = ZipArchive::new(file)?;
    archive.extract(into)?;
    Ok(())
}

/// Find a `wpmz` directory anywhere in the extracted tree, shallowest first.
fn find_wpmz(root: &Path) -> Result<PathBuf> {
    let mut queue = vec![root.to_path_buf()];
    while !queue.is_empty() {
        let mut next = Vec::new();
        for dir in queue {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if !path.is_dir() {
                    continue;
                }
                if path.file_name().is_some_and(|n| n == WPMZ_DIR) {
                    return Ok(path);
                }
                next.push(path);
            }
        }
        queue = next;
    }
    Err(BundleError::MissingWpmz)
}

/// Repackage the scratch tree as a deflate-compressed zip.
fn repack(root: &Path, output: &Path) -> Result<()> {
    let file = fs::File::create(output)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    for path in files {
        let name = archive_name(root, &path);
        writer.start_file(name, options)?;
        writer.write_all(&fs::read(&path)?)?;
    }

    writer.finish()?;
    Ok(())
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Zip member name: the path relative to the scratch root, `/`-separated.
fn archive_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
