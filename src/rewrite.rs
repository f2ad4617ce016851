//! Width attribute rewriting.
//!
//! Edits are computed against the spans recorded by the parser and spliced
//! into a fresh copy of the text in a single forward pass, so no edit can
//! shift the offsets another edit relies on. Bytes outside edited spans,
//! line endings and the final newline (or its absence) are copied verbatim.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::catalog::Catalog;
use crate::marker::IllustrationMarker;
use crate::patterns::PERCENT_RE;
use crate::reconcile::{ReferenceRole, Reconciliation, normalize_reference};

/// New `w=` value keyed by normalized inline file name.
pub type WidthCorrections = BTreeMap<String, String>;

/// A replacement of `range` in the original text. Empty ranges insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
}

/// Result of [`rewrite_widths`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    /// Indices of markers that were changed.
    pub updated: Vec<usize>,
}

impl Rewrite {
    pub fn is_unchanged(&self) -> bool {
        self.updated.is_empty()
    }
}

/// Corrected widths: the pixel width of every matched inline image.
pub fn width_corrections(reconciliation: &Reconciliation, catalog: &Catalog) -> WidthCorrections {
    reconciliation
        .matched()
        .filter(|(_, refs)| refs.iter().any(|r| r.role == ReferenceRole::Inline))
        .filter_map(|(name, _)| {
            let entry = catalog.get(name)?;
            Some((name.to_string(), format!("{}px", entry.width)))
        })
        .collect()
}

/// Edits that bring one marker's `w=` to `width`.
///
/// - an existing `w=` value is replaced in place, keeping its quotes;
/// - a percentage width is kept as `ew=` unless one is already present;
/// - a missing `w=` is inserted after `fn=`.
pub fn marker_edits(marker: &IllustrationMarker, width: &str) -> Vec<Edit> {
    match marker.attribute("w") {
        Some(w) if w.value == width => Vec::new(),
        Some(w) => {
            let mut edits = vec![Edit {
                range: w.value_span.clone(),
                replacement: width.to_string(),
            }];
            if PERCENT_RE.is_match(&w.value) && marker.attribute("ew").is_none() {
                edits.push(Edit {
                    range: w.token.end..w.token.end,
                    replacement: format!(" ew={}", w.value),
                });
            }
            edits
        }
        None => {
            let at = marker
                .attribute("fn")
                .map_or(marker.span.start + "[Illustration".len(), |f| f.token.end);
            vec![Edit {
                range: at..at,
                replacement: format!(" w={width}"),
            }]
        }
    }
}

/// Apply non-overlapping edits to `text` in one forward pass.
pub fn apply_edits(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.range.start, e.range.end));

    let added: usize = edits.iter().map(|e| e.replacement.len()).sum();
    let mut out = String::with_capacity(text.len() + added);
    let mut last = 0;

    for edit in &edits {
        debug_assert!(edit.range.start >= last, "overlapping edits");
        out.push_str(&text[last..edit.range.start]);
        out.push_str(&edit.replacement);
        last = edit.range.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Update `w=` on every marker whose inline file has a correction.
///
/// All occurrences of a file are updated, whichever order they appear in.
/// Markers already at the corrected width are left untouched.
pub fn rewrite_widths(
    text: &str,
    markers: &[IllustrationMarker],
    corrections: &WidthCorrections,
) -> Rewrite {
    let mut edits = Vec::new();
    let mut updated = Vec::new();

    for (idx, marker) in markers.iter().enumerate() {
        let name = normalize_reference(&marker.filename);
        let Some(width) = corrections.get(&name) else {
            continue;
        };

        let marker_edits = marker_edits(marker, width);
        if marker_edits.is_empty() {
            continue;
        }
        tracing::debug!(
            "line {}: w={:?} -> {}",
            marker.span.line,
            marker.declared_width,
            width
        );
        updated.push(idx);
        edits.extend(marker_edits);
    }

    tracing::info!("updated width on {} illustrations", updated.len());
    Rewrite {
        text: apply_edits(text, edits),
        updated,
    }
}
