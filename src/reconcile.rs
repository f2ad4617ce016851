//! Join markers to catalog entries.
//!
//! The file→markers relation is one-to-many and is kept explicit in
//! [`Outcome::Matched`], so anything that later edits "the marker for this
//! file" is handed every occurrence rather than whichever one was seen last.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::marker::IllustrationMarker;

/// Which marker attribute a reference comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceRole {
    /// `fn=`, the image shown in the text.
    Inline,
    /// `link=`, the full-size image the inline one links to.
    Linked,
}

/// One file reference made by one marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Reference {
    /// Index into the marker sequence.
    pub marker: usize,
    pub role: ReferenceRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A catalog entry and every reference to it, in document order.
    Matched {
        entry: String,
        references: Vec<Reference>,
    },
    /// A reference to a name the catalog does not contain.
    MissingFile {
        file: String,
        reference: Reference,
        /// Set when the name exists on disk but was excluded or unreadable.
        detail: Option<String>,
    },
    /// A catalog entry nothing references.
    UnusedFile { entry: String },
}

/// Two or more markers resolving to the same id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateId {
    pub id: String,
    pub markers: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Matched and missing outcomes by first reference, then unused entries by name.
    pub outcomes: Vec<Outcome>,
    /// Resolved id per marker, parallel to the marker sequence.
    pub ids: Vec<String>,
    pub duplicate_ids: Vec<DuplicateId>,
}

impl Reconciliation {
    /// `(entry, references)` for every matched entry.
    pub fn matched(&self) -> impl Iterator<Item = (&str, &[Reference])> {
        self.outcomes.iter().filter_map(|o| match o {
            Outcome::Matched { entry, references } => Some((entry.as_str(), references.as_slice())),
            _ => None,
        })
    }

    pub fn missing(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::MissingFile { .. }))
    }

    pub fn unused(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| match o {
            Outcome::UnusedFile { entry } => Some(entry.as_str()),
            _ => None,
        })
    }

    /// Catalog entry a marker's reference resolved to, if any.
    pub fn entry_for(&self, reference: Reference) -> Option<&str> {
        self.matched()
            .find(|(_, refs)| refs.contains(&reference))
            .map(|(entry, _)| entry)
    }

    pub fn is_duplicate(&self, marker: usize) -> bool {
        self.duplicate_ids.iter().any(|d| d.markers.contains(&marker))
    }
}

/// Normalize a marker file reference to a catalog name.
pub fn normalize_reference(name: &str) -> String {
    let mut name = name.trim().replace('\\', "/");
    while let Some(rest) = name.strip_prefix("./") {
        name = rest.to_string();
    }
    name
}

/// Id derived from a file reference: the file name without extension.
pub fn id_from_filename(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

/// Classify every marker reference and catalog entry.
pub fn reconcile(markers: &[IllustrationMarker], catalog: &Catalog) -> Reconciliation {
    let mut outcomes = Vec::new();
    let mut matched_at: HashMap<String, usize> = HashMap::new();

    for (idx, marker) in markers.iter().enumerate() {
        let inline = Some((marker.filename.as_str(), ReferenceRole::Inline));
        let linked = marker.link.as_deref().map(|l| (l, ReferenceRole::Linked));

        for (file, role) in inline.into_iter().chain(linked) {
            let name = normalize_reference(file);
            let reference = Reference { marker: idx, role };

            if catalog.get(&name).is_some() {
                match matched_at.get(&name) {
                    Some(&at) => {
                        if let Outcome::Matched { references, .. } = &mut outcomes[at] {
                            references.push(reference);
                        }
                    }
                    None => {
                        matched_at.insert(name.clone(), outcomes.len());
                        outcomes.push(Outcome::Matched {
                            entry: name,
                            references: vec![reference],
                        });
                    }
                }
            } else {
                tracing::warn!(
                    "line {}: no image file '{}' for illustration",
                    marker.span.line,
                    name
                );
                outcomes.push(Outcome::MissingFile {
                    detail: catalog.rejection(&name),
                    file: name,
                    reference,
                });
            }
        }
    }

    for name in catalog.entries.keys() {
        if !matched_at.contains_key(name) {
            tracing::warn!("image file '{name}' is not referenced by any illustration");
            outcomes.push(Outcome::UnusedFile {
                entry: name.clone(),
            });
        }
    }

    let ids = resolve_ids(markers);
    let duplicate_ids = find_duplicates(&ids);
    for dup in &duplicate_ids {
        tracing::warn!("id '{}' is used by {} illustrations", dup.id, dup.markers.len());
    }

    Reconciliation {
        outcomes,
        ids,
        duplicate_ids,
    }
}

/// Explicit ids win; otherwise the file stem, suffixed `-k` for the k-th
/// reuse of the same file.
fn resolve_ids(markers: &[IllustrationMarker]) -> Vec<String> {
    let mut uses: HashMap<String, usize> = HashMap::new();
    markers
        .iter()
        .map(|marker| match &marker.id {
            Some(id) => id.clone(),
            None => {
                let name = normalize_reference(&marker.filename);
                let count = uses.entry(name.clone()).or_insert(0);
                *count += 1;
                let stem = id_from_filename(&name);
                if *count == 1 {
                    stem
                } else {
                    format!("{stem}-{count}")
                }
            }
        })
        .collect()
}

fn find_duplicates(ids: &[String]) -> Vec<DuplicateId> {
    let mut by_id: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, id) in ids.iter().enumerate() {
        by_id.entry(id.as_str()).or_default().push(idx);
    }

    let mut duplicates: Vec<DuplicateId> = by_id
        .into_iter()
        .filter(|(_, markers)| markers.len() > 1)
        .map(|(id, markers)| DuplicateId {
            id: id.to_string(),
            markers,
        })
        .collect();
    duplicates.sort_by_key(|d| d.markers[0]);
    duplicates
}
