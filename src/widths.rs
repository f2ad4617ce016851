//! Target pixel widths for percentage-sized illustrations.
//!
//! An illustration declared `w=50%` in a book laid out `max_width` pixels
//! wide should be scaled to `max_width / 2` pixels. The table of those
//! targets lives in `images.json`, keyed by `images/<fn>`, for an external
//! resize step to consume.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::marker::IllustrationMarker;
use crate::patterns::PERCENT_RE;

/// One entry of `images.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetWidth {
    pub target_width: u32,
}

/// The `images.json` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidthTable {
    pub entries: BTreeMap<String, TargetWidth>,
}

impl WidthTable {
    /// Load a table; a missing file is an empty table.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(bytes) => {
                tracing::info!("loaded width table from {}", path.display());
                Ok(serde_json::from_slice(&bytes)?)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("{} not found, starting with an empty table", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Insert or replace entries.
    pub fn merge(&mut self, widths: BTreeMap<String, u32>) {
        for (key, width) in widths {
            self.entries.insert(key, TargetWidth { target_width: width });
        }
    }

    pub fn target_width(&self, key: &str) -> Option<u32> {
        self.entries.get(key).map(|t| t.target_width)
    }
}

/// Percentage from `w=`, or from `ew=` when `w` is absolute.
pub fn percent_width(marker: &IllustrationMarker) -> Option<f64> {
    ["w", "ew"].into_iter().find_map(|key| {
        let attr = marker.attribute(key)?;
        PERCENT_RE.captures(&attr.value)?[1].parse().ok()
    })
}

/// Target widths keyed by `images/<fn>` for every percentage-sized marker.
pub fn target_widths(markers: &[IllustrationMarker], max_width: u32) -> BTreeMap<String, u32> {
    let mut widths = BTreeMap::new();
    for marker in markers {
        let Some(percent) = percent_width(marker) else {
            tracing::warn!(
                "line {}: w or ew must be a percentage to calculate a width for {}",
                marker.span.line,
                marker.filename
            );
            continue;
        };

        let width = (percent / 100.0 * max_width as f64).floor() as u32;
        let key = format!("images/{}", marker.filename);
        tracing::debug!("{key}: calculated width {width}");
        widths.insert(key, width);
    }
    widths
}
