//! CLI interface for kmzpatch.
//!
//! Each subcommand is non-interactive: arguments in, patched files and a
//! mission summary out. The summary goes to stderr; `--json` writes the
//! structured report to stdout for scripting.
//!
//! - `kmzpatch process` — the full bundle pipeline (KMZ in, KMZ out).
//! - `kmzpatch patch` — rewrite a bare waypoint document.
//! - `kmzpatch estimate` — report mission time and battery, no rewrite.

mod format;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::bundle::{self, ProcessOptions};
use crate::config::{ActionConfig, Config};
use crate::estimate;
use crate::model::{Document, MissionReport};
use crate::patch;

use format::{format_estimate, format_report};

/// kmzpatch — add uniform waypoint actions to drone mission bundles.
#[derive(Debug, Parser)]
#[command(name = "kmzpatch", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r"Workflow: preparing a mission for upload
  1. kmzpatch process mission.kmz
     -> writes the patched bundle next to the input, prints the mission summary
  2. copy the output .kmz to the controller

Working on a bare document:
  kmzpatch patch wpmz/waylines.wpml --hover-seconds 3
  kmzpatch estimate wpmz/waylines.wpml --json";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process a mission bundle end to end.
    ///
    /// Extracts the KMZ, adds an action block at every waypoint that lacks
    /// one, estimates the mission, and repackages everything else untouched.
    Process {
        /// Input .kmz bundle.
        input: PathBuf,

        /// Output directory (default: the input file's directory).
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Output file name (default: the controller naming convention).
        #[arg(long)]
        output: Option<String>,

        /// Overwrite an existing output file.
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        hover: HoverArgs,

        /// Write the mission report as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Patch a bare waypoint document.
    ///
    /// Rewrites the file in place unless `--out` is given.
    Patch {
        /// Input .wpml document.
        input: PathBuf,

        /// Write the patched document here instead of in place.
        #[arg(long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        hover: HoverArgs,
    },

    /// Estimate mission time and battery for a waypoint document.
    ///
    /// Pure read, no rewrite.
    Estimate {
        /// Input .wpml document.
        input: PathBuf,

        #[command(flatten)]
        hover: HoverArgs,

        /// Write the estimate as JSON to stdout (`null` when unavailable).
        #[arg(long)]
        json: bool,
    },
}

/// Hover flags shared by every subcommand, overriding the config file.
#[derive(Debug, Args)]
pub struct HoverArgs {
    /// Insert only the photograph, without the stabilizing hover.
    #[arg(long)]
    no_hover: bool,

    /// Hover duration in seconds, in (0, 60].
    #[arg(long)]
    hover_seconds: Option<f64>,
}

impl HoverArgs {
    /// Apply these flags on top of the configured defaults.
    fn apply(&self, base: ActionConfig) -> Result<ActionConfig, String> {
        let config = ActionConfig {
            hover_enabled: base.hover_enabled && !self.no_hover,
            hover_seconds: self.hover_seconds.unwrap_or(base.hover_seconds),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config) -> Result<(), String> {
    let cli = Cli::parse();

    match cli.command {
        Command::Process {
            input,
            out_dir,
            output,
            force,
            hover,
            json,
        } => {
            let action = hover.apply(config.action)?;
            let options = ProcessOptions {
                out_dir,
                output_name: output,
                force,
            };
            cmd_process(&input, &options, &action, json)
        }
        Command::Patch { input, out, hover } => {
            let action = hover.apply(config.action)?;
            cmd_patch(&input, out.as_deref(), &action)
        }
        Command::Estimate { input, hover, json } => {
            let action = hover.apply(config.action)?;
            cmd_estimate(&input, &action, json)
        }
    }
}

fn cmd_process(
    input: &Path,
    options: &ProcessOptions,
    action: &ActionConfig,
    json: bool,
) -> Result<(), String> {
    let outcome = bundle::process(input, options, action).map_err(|e| e.to_string())?;

    eprintln!("{}", format_report(&outcome.report));
    eprintln!("Output: {}", outcome.output.display());

    if json {
        let report = serde_json::to_string_pretty(&outcome.report)
            .map_err(|e| format!("failed to serialize report: {e}"))?;
        println!("{report}");
    }

    Ok(())
}

fn cmd_patch(input: &Path, out: Option<&Path>, action: &ActionConfig) -> Result<(), String> {
    let doc = read_document(input)?;
    let outcome = patch::patch(&doc, action).map_err(|e| e.to_string())?;

    let target = out.unwrap_or(input);
    if outcome.insertion_count > 0 || out.is_some() {
        fs::write(target, outcome.document.to_text())
            .map_err(|e| format!("failed to write {}: {e}", target.display()))?;
    }

    eprintln!(
        "Inserted {} action block(s) at {} anchor(s) -> {}",
        outcome.insertion_count,
        outcome.anchor_count,
        target.display()
    );
    Ok(())
}

fn cmd_estimate(input: &Path, action: &ActionConfig, json: bool) -> Result<(), String> {
    let doc = read_document(input)?;
    let waypoints = doc.waypoints();
    let estimate = estimate::estimate(&waypoints, action);

    let report = MissionReport {
        waypoint_count: doc.placemark_count(),
        insertion_count: 0,
        estimate,
    };
    match &report.estimate {
        Some(est) => eprintln!("{}", format_estimate(est)),
        None => eprintln!("Mission estimate unavailable: fewer than two waypoints"),
    }

    if json {
        let body = serde_json::to_string_pretty(&report.estimate)
            .map_err(|e| format!("failed to serialize estimate: {e}"))?;
        println!("{body}");
    }

    Ok(())
}

fn read_document(path: &Path) -> Result<Document, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    Ok(Document::parse(&text))
}
