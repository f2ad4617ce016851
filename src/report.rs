//! Structured report of a reconciliation run.
//!
//! Purely a projection of the reconciler and validator output. Rows follow
//! document order, one per marker; the issue list is grouped by kind in a
//! fixed order so two runs over the same inputs serialize identically.

use std::fmt::Write as _;

use serde::Serialize;

use crate::catalog::{Catalog, ExcludedKind};
use crate::marker::IllustrationMarker;
use crate::reconcile::{Outcome, Reconciliation, Reference, ReferenceRole};
use crate::validate::ValidationIssue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    MissingFile,
    UnusedFile,
    ForeignFile,
    UnreadableImage,
    DuplicateId,
    Validation,
    NamingConvention,
}

impl IssueKind {
    /// Warnings do not fail a check.
    pub fn is_warning(self) -> bool {
        matches!(self, IssueKind::NamingConvention)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub subject: String,
    pub detail: String,
}

/// One marker occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub id: String,
    pub file_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub byte_size: Option<u64>,
    /// Line breaks are [`LINE_BREAK`](crate::marker::LINE_BREAK) markers.
    pub caption: String,
    /// Page of the scan the illustration sits on.
    pub scan_page: Option<String>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub rows: Vec<ReportRow>,
    pub issues: Vec<Issue>,
}

impl Report {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| !i.kind.is_warning())
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text table for terminals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<16} {:<24} {:>6} {:>6} {:>9}  caption",
            "id", "file", "width", "height", "bytes"
        );
        for row in &self.rows {
            let dim = |v: Option<u64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
            let _ = writeln!(
                out,
                "{:<16} {:<24} {:>6} {:>6} {:>9}  {}",
                row.id,
                row.file_name,
                dim(row.width.map(u64::from)),
                dim(row.height.map(u64::from)),
                dim(row.byte_size),
                row.caption
            );
            for issue in &row.issues {
                let _ = writeln!(out, "    ! {issue}");
            }
        }

        let _ = writeln!(out);
        if self.issues.is_empty() {
            let _ = writeln!(out, "No issues found.");
        }
        for issue in &self.issues {
            let level = if issue.kind.is_warning() { "warning" } else { "error" };
            let _ = writeln!(out, "{level}: {}: {}", issue.subject, issue.detail);
        }
        out
    }
}

/// Assemble rows and issues.
pub fn build_report(
    markers: &[IllustrationMarker],
    catalog: &Catalog,
    reconciliation: &Reconciliation,
    violations: &[ValidationIssue],
) -> Report {
    let mut rows: Vec<ReportRow> = markers
        .iter()
        .enumerate()
        .map(|(idx, marker)| {
            let inline = Reference {
                marker: idx,
                role: ReferenceRole::Inline,
            };
            let entry = reconciliation
                .entry_for(inline)
                .and_then(|name| catalog.get(name));
            ReportRow {
                id: reconciliation.ids.get(idx).cloned().unwrap_or_default(),
                file_name: marker.filename.clone(),
                width: entry.map(|e| e.width),
                height: entry.map(|e| e.height),
                byte_size: entry.map(|e| e.byte_size),
                caption: marker.caption.clone(),
                scan_page: marker.scan_page.clone(),
                issues: Vec::new(),
            }
        })
        .collect();

    let mut issues = Vec::new();

    for outcome in &reconciliation.outcomes {
        if let Outcome::MissingFile {
            file,
            reference,
            detail,
        } = outcome
        {
            let what = match reference.role {
                ReferenceRole::Inline => "missing image file",
                ReferenceRole::Linked => "missing linked image file",
            };
            if let Some(row) = rows.get_mut(reference.marker) {
                row.issues.push(format!("{what} {file}"));
            }
            let marker = markers.get(reference.marker);
            let line = marker.map_or(0, |m| m.span.line);
            let mut text = format!("{what} referenced on line {line}");
            if let Some(page) = marker.and_then(|m| m.scan_page.as_deref()) {
                let _ = write!(text, ", scan page {page}");
            }
            if let Some(d) = detail {
                let _ = write!(text, " ({d})");
            }
            issues.push(Issue {
                kind: IssueKind::MissingFile,
                subject: file.clone(),
                detail: text,
            });
        }
    }

    for dup in &reconciliation.duplicate_ids {
        let lines: Vec<String> = dup
            .markers
            .iter()
            .filter_map(|&m| markers.get(m).map(|m| m.span.line.to_string()))
            .collect();
        for &m in &dup.markers {
            if let Some(row) = rows.get_mut(m) {
                row.issues.push(format!("duplicate id {}", dup.id));
            }
        }
        issues.push(Issue {
            kind: IssueKind::DuplicateId,
            subject: dup.id.clone(),
            detail: format!("id used by illustrations on lines {}", lines.join(", ")),
        });
    }

    for violation in violations {
        let detail = format!(
            "{} {} exceeds {} limit {}",
            violation.kind.as_str(),
            violation.observed,
            violation.profile,
            violation.limit
        );
        let referencing = reconciliation
            .matched()
            .find(|(name, _)| *name == violation.entry)
            .map(|(_, refs)| refs)
            .unwrap_or_default();
        for reference in referencing {
            if let Some(row) = rows.get_mut(reference.marker) {
                let prefix = match reference.role {
                    ReferenceRole::Inline => "",
                    ReferenceRole::Linked => "linked image ",
                };
                row.issues.push(format!("{prefix}{detail}"));
            }
        }
        issues.push(Issue {
            kind: IssueKind::Validation,
            subject: violation.entry.clone(),
            detail,
        });
    }

    for name in reconciliation.unused() {
        issues.push(Issue {
            kind: IssueKind::UnusedFile,
            subject: name.to_string(),
            detail: "image file is not referenced by any illustration".to_string(),
        });
    }

    for excluded in &catalog.excluded {
        issues.push(Issue {
            kind: IssueKind::ForeignFile,
            subject: excluded.name.clone(),
            detail: match excluded.kind {
                ExcludedKind::Directory => "subdirectory in image directory".to_string(),
                ExcludedKind::NotImage => "non-image file in image directory".to_string(),
            },
        });
    }

    for unreadable in &catalog.unreadable {
        issues.push(Issue {
            kind: IssueKind::UnreadableImage,
            subject: unreadable.name.clone(),
            detail: unreadable.reason.clone(),
        });
    }

    for name in &catalog.naming_warnings {
        issues.push(Issue {
            kind: IssueKind::NamingConvention,
            subject: name.clone(),
            detail: "does not match expected naming convention (i_001, i_001a)".to_string(),
        });
    }

    Report { rows, issues }
}
