//! One reconciliation run, end to end.
//!
//! ```text
//! text ──parse───► markers ─┐
//!                           ├─reconcile─► outcomes ─validate─► violations ─► report
//! dir ───catalog─► entries ─┘                  └─rewrite (optional)─► new text
//! ```
//!
//! A malformed marker or an unknown profile fails the run; every other
//! finding ends up in the [`Report`].

use std::path::Path;

use crate::assign::{Assigned, assign_filenames};
use crate::catalog::{Catalog, build_catalog};
use crate::config::Config;
use crate::error::Result;
use crate::marker::{IllustrationMarker, parse_markers};
use crate::reconcile::{Reconciliation, normalize_reference, reconcile};
use crate::report::{Report, build_report};
use crate::rewrite::{Rewrite, rewrite_widths, width_corrections};
use crate::validate::{ValidationIssue, validate};

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub markers: Vec<IllustrationMarker>,
    pub catalog: Catalog,
    pub reconciliation: Reconciliation,
    pub violations: Vec<ValidationIssue>,
    pub report: Report,
    /// Present when `rewrite_widths` is set.
    pub rewrite: Option<Rewrite>,
}

/// A `w=` value changed by the rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidthChange {
    pub line: usize,
    pub filename: String,
    /// `None` when the marker had no `w=`.
    pub old: Option<String>,
    pub new: String,
}

impl RunOutput {
    /// Old and new width of every marker the rewrite changed, in document order.
    pub fn width_changes(&self) -> Vec<WidthChange> {
        let Some(rewrite) = &self.rewrite else {
            return Vec::new();
        };
        let corrections = width_corrections(&self.reconciliation, &self.catalog);
        rewrite
            .updated
            .iter()
            .filter_map(|&idx| {
                let marker = self.markers.get(idx)?;
                let new = corrections.get(&normalize_reference(&marker.filename))?;
                Some(WidthChange {
                    line: marker.span.line,
                    filename: marker.filename.clone(),
                    old: marker.declared_width.clone(),
                    new: new.clone(),
                })
            })
            .collect()
    }
}

/// Parse `text`, inventory `config.image_directory`, and reconcile them.
pub fn run(text: &str, config: &Config) -> Result<RunOutput> {
    config.check()?;
    // Resolve profiles first so a typo fails before any I/O.
    config.selected_profiles()?;

    let markers = parse_markers(text)?;
    let catalog = build_catalog(&config.image_directory, &config.catalog_options())?;
    run_with(text, markers, catalog, config)
}

/// Like [`run`], with an already built catalog.
pub fn run_with_catalog(text: &str, catalog: Catalog, config: &Config) -> Result<RunOutput> {
    config.check()?;
    config.selected_profiles()?;
    let markers = parse_markers(text)?;
    run_with(text, markers, catalog, config)
}

fn run_with(
    text: &str,
    markers: Vec<IllustrationMarker>,
    catalog: Catalog,
    config: &Config,
) -> Result<RunOutput> {
    let profiles = config.selected_profiles()?;
    let cover = config.cover_filename.as_deref();

    let reconciliation = reconcile(&markers, &catalog);
    let violations = validate(&reconciliation, &catalog, &profiles, cover);

    let rewrite = config.rewrite_widths.then(|| {
        let corrections = width_corrections(&reconciliation, &catalog);
        rewrite_widths(text, &markers, &corrections)
    });

    let report = build_report(&markers, &catalog, &reconciliation, &violations);
    tracing::info!(
        "{} illustrations, {} images, {} issues",
        markers.len(),
        catalog.len(),
        report.issues.len()
    );

    Ok(RunOutput {
        markers,
        catalog,
        reconciliation,
        violations,
        report,
        rewrite,
    })
}

/// Assign files to bare illustration tags from `config.image_directory`.
pub fn assign_files(text: &str, config: &Config) -> Result<Assigned> {
    config.check()?;
    let catalog = build_catalog(&config.image_directory, &config.catalog_options())?;
    assign_filenames(text, &catalog)
}

/// Output file name used when none is given: `<stem>-out.txt` next to the input.
pub fn default_output_path(input: &Path) -> std::path::PathBuf {
    let stem = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = stem.split('.').next().unwrap_or_default();
    input.with_file_name(format!("{stem}-out.txt"))
}
