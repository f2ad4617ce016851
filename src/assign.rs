//! Filename assignment for raw illustration tags.
//!
//! Transcribers leave bare `[Illustration: caption]` tags where a picture sat
//! on the scan. Images are named after their scan page (`i_012.jpg`, or
//! `i_012a.jpg`, `i_012b.jpg`, ... for several on one page), so each tag can
//! be resolved from the closest preceding `// 012.png` comment:
//!
//! 1. `i_{page}` if nothing has used it yet
//! 2. otherwise the first unused `i_{page}a` .. `i_{page}z`
//! 3. otherwise `i_{page}` again
//!
//! Resolved tags get `id=`, `fn=` and `w=` inserted right after the tag name;
//! unresolved tags are left as they are and reported.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::marker::{Directive, scan_directives};
use crate::reconcile::{id_from_filename, normalize_reference};
use crate::rewrite::{Edit, apply_edits};

/// A raw tag that was given a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub line: usize,
    pub scan_page: String,
    pub id: String,
    pub file_name: String,
    pub width: u32,
    /// `*[Illustration`: must be moved to a paragraph break by hand.
    pub starred: bool,
}

/// A raw tag no image could be found for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Unresolved {
    pub line: usize,
    pub scan_page: Option<String>,
}

/// Result of [`assign_filenames`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assigned {
    pub text: String,
    pub assignments: Vec<Assignment>,
    pub unresolved: Vec<Unresolved>,
}

impl Assigned {
    /// Assigned tags written `*[Illustration`.
    pub fn starred(&self) -> usize {
        self.assignments.iter().filter(|a| a.starred).count()
    }
}

/// Give every `[Illustration]` tag without `fn=` a file from `catalog`.
///
/// Files already named by an explicit `fn=` count as used.
pub fn assign_filenames(text: &str, catalog: &Catalog) -> Result<Assigned> {
    let directives = scan_directives(text)?;

    // Top-level images by id; the first name in sorted order wins a shared stem.
    let mut by_id: BTreeMap<String, &str> = BTreeMap::new();
    for name in catalog.entries.keys().filter(|n| !n.contains('/')) {
        by_id.entry(id_from_filename(name)).or_insert(name.as_str());
    }

    let mut usage: HashMap<String, usize> = HashMap::new();
    for file in directives.iter().filter_map(|d| d.value("fn")) {
        *usage.entry(id_from_filename(&normalize_reference(&file))).or_default() += 1;
    }

    let mut edits = Vec::new();
    let mut assignments = Vec::new();
    let mut unresolved = Vec::new();

    for directive in directives.iter().filter(|d| d.value("fn").is_none()) {
        let resolved = directive
            .scan_page
            .as_deref()
            .and_then(|page| pick_id(page, &by_id, &usage).map(|id| (page, id)));

        let Some((page, id)) = resolved else {
            tracing::error!(
                "line {}: no image file for illustration on scan page {}",
                directive.span.line,
                directive.scan_page.as_deref().unwrap_or("(none)")
            );
            unresolved.push(Unresolved {
                line: directive.span.line,
                scan_page: directive.scan_page.clone(),
            });
            continue;
        };

        let Some(entry) = by_id.get(&id).and_then(|name| catalog.get(name)) else {
            continue;
        };
        *usage.entry(id.clone()).or_default() += 1;

        edits.push(tag_edit(directive, &id, &entry.name, entry.width));
        tracing::debug!(
            "line {}: scan page {page} -> {}",
            directive.span.line,
            entry.name
        );
        assignments.push(Assignment {
            line: directive.span.line,
            scan_page: page.to_string(),
            id,
            file_name: entry.name.clone(),
            width: entry.width,
            starred: directive.starred,
        });
    }

    let result = Assigned {
        text: apply_edits(text, edits),
        assignments,
        unresolved,
    };

    tracing::info!("assigned files to {} illustration tags", result.assignments.len());
    if result.starred() > 0 {
        tracing::warn!(
            "{} *[Illustration] tags were assigned; move them to a paragraph break by hand",
            result.starred()
        );
    }
    Ok(result)
}

fn pick_id(page: &str, by_id: &BTreeMap<String, &str>, usage: &HashMap<String, usize>) -> Option<String> {
    let base = format!("i_{page}");
    let unused = |id: &str| by_id.contains_key(id) && usage.get(id).copied().unwrap_or(0) == 0;

    if unused(&base) {
        return Some(base);
    }
    let lettered = ('a'..='z')
        .map(|letter| format!("{base}{letter}"))
        .find(|id| unused(id));
    lettered.or_else(|| by_id.contains_key(&base).then_some(base))
}

fn tag_edit(directive: &Directive, id: &str, file: &str, width: u32) -> Edit {
    let at = directive.header_start;
    Edit {
        range: at..at,
        replacement: format!(" id={id} fn={file} w={width}px"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ImageCatalogEntry;
    use crate::marker::parse_markers;

    fn catalog(names: &[&str]) -> Catalog {
        Catalog::from_entries(names.iter().map(|n| ImageCatalogEntry::new(*n, 600, 400, 1_000)))
    }

    #[test]
    fn test_single_tag() {
        let text = "// 001.png\n[Illustration: A SHIP]\n";
        let result = assign_filenames(text, &catalog(&["i_001.jpg"])).unwrap();
        assert_eq!(
            result.text,
            "// 001.png\n[Illustration id=i_001 fn=i_001.jpg w=600px: A SHIP]\n"
        );
        assert_eq!(parse_markers(&result.text).unwrap()[0].filename, "i_001.jpg");
    }

    #[test]
    fn test_several_tags_on_one_page() {
        let text = "// 001.png\n[Illustration: One]\n[Illustration: Two]\n[Illustration]\n[Illustration]";
        let result =
            assign_filenames(text, &catalog(&["i_001.jpg", "i_001a.jpg", "i_001b.png"])).unwrap();

        let files: Vec<_> = result.assignments.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(files, vec!["i_001.jpg", "i_001a.jpg", "i_001b.png", "i_001.jpg"]);
        assert!(result.text.contains("[Illustration id=i_001a fn=i_001a.jpg w=600px: Two]"));
        assert!(result.text.ends_with("[Illustration id=i_001 fn=i_001.jpg w=600px]"));
    }

    #[test]
    fn test_lettered_only_page() {
        let text = "// 007.png\n[Illustration: Left]\n[Illustration: Right]";
        let result = assign_filenames(text, &catalog(&["i_007a.jpg", "i_007b.jpg"])).unwrap();
        let ids: Vec<_> = result.assignments.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["i_007a", "i_007b"]);
    }

    #[test]
    fn test_explicit_fn_counts_as_used() {
        let text = "// 002.png\n[Illustration fn=i_002.jpg: Named]\n[Illustration: Raw]";
        let result = assign_filenames(text, &catalog(&["i_002.jpg", "i_002a.jpg"])).unwrap();
        assert_eq!(result.assignments.len(), 1);
        assert_eq!(result.assignments[0].file_name, "i_002a.jpg");
        assert!(result.text.starts_with("// 002.png\n[Illustration fn=i_002.jpg: Named]"));
    }

    #[test]
    fn test_unresolved_tags_left_alone() {
        let text = "[Illustration: No page]\n// 003.png\n[Illustration: No file]";
        let result = assign_filenames(text, &catalog(&["i_001.jpg"])).unwrap();
        assert_eq!(result.text, text);
        assert_eq!(result.unresolved.len(), 2);
        assert_eq!(result.unresolved[0].scan_page, None);
        assert_eq!(result.unresolved[1].scan_page.as_deref(), Some("003"));
    }

    #[test]
    fn test_starred_tags_counted() {
        let text = "// 001.png\nText *[Illustration: Mid-paragraph] more text";
        let result = assign_filenames(text, &catalog(&["i_001.jpg"])).unwrap();
        assert_eq!(result.starred(), 1);
        assert!(result.assignments[0].starred);
    }
}
