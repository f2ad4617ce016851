//! Apply validation profiles to matched images.

use serde::Serialize;

use crate::catalog::{Catalog, ImageCatalogEntry};
use crate::profile::{ImageRole, ValidationProfile};
use crate::reconcile::{Reconciliation, normalize_reference};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationKind {
    Bytes,
    Width,
    Height,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::Bytes => "byte size",
            ViolationKind::Width => "width",
            ViolationKind::Height => "height",
        }
    }
}

/// One ceiling exceeded by one image under one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub entry: String,
    pub profile: String,
    pub role: ImageRole,
    pub kind: ViolationKind,
    pub observed: u64,
    pub limit: u64,
}

/// Role of a catalog entry given the configured cover file.
///
/// The cover name is compared the way marker references are, so
/// `./cover.jpg` names the catalog entry `cover.jpg`.
pub fn role_of(entry: &str, cover_filename: Option<&str>) -> ImageRole {
    if cover_filename.is_some_and(|c| normalize_reference(c) == entry) {
        ImageRole::Cover
    } else {
        ImageRole::Ordinary
    }
}

/// Check one entry against one profile. Values equal to a limit pass.
pub fn check_entry(
    entry: &ImageCatalogEntry,
    role: ImageRole,
    profile: &ValidationProfile,
) -> Vec<ValidationIssue> {
    let limits = profile.limits_for(role);
    let checks = [
        (ViolationKind::Bytes, entry.byte_size, limits.max_bytes),
        (ViolationKind::Width, entry.width as u64, limits.max_width as u64),
        (ViolationKind::Height, entry.height as u64, limits.max_height as u64),
    ];

    checks
        .into_iter()
        .filter(|(_, observed, limit)| observed > limit)
        .map(|(kind, observed, limit)| ValidationIssue {
            entry: entry.name.clone(),
            profile: profile.name.clone(),
            role,
            kind,
            observed,
            limit,
        })
        .collect()
}

/// Check every matched entry against every profile.
///
/// Profiles are independent: an image too large for both `epub` and `mobi`
/// yields an issue under each.
pub fn validate(
    reconciliation: &Reconciliation,
    catalog: &Catalog,
    profiles: &[ValidationProfile],
    cover_filename: Option<&str>,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (name, _) in reconciliation.matched() {
        let Some(entry) = catalog.get(name) else {
            continue;
        };
        let role = role_of(name, cover_filename);
        for profile in profiles {
            let found = check_entry(entry, role, profile);
            for issue in &found {
                tracing::warn!(
                    "{}: {} {} exceeds {} limit {}",
                    issue.entry,
                    issue.kind.as_str(),
                    issue.observed,
                    issue.profile,
                    issue.limit
                );
            }
            issues.extend(found);
        }
    }

    tracing::info!("validation found {} violations", issues.len());
    issues
}
