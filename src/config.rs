//! Run configuration.
//!
//! A `Config` is an explicit value handed to [`crate::pipeline::run`]; no
//! component reads ambient state. It can be loaded from a JSON file:
//!
//! ```json
//! {
//!   "imageDirectory": "images",
//!   "validationProfiles": ["epub", "mobi"],
//!   "rewriteWidths": false,
//!   "coverFilename": "cover.jpg",
//!   "profiles": [
//!     { "name": "epub", "ordinary": { "maxBytes": 262144, "maxWidth": 1600, "maxHeight": 2560 } }
//!   ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogOptions;
use crate::error::{Error, Result};
use crate::profile::{ProfileTable, ValidationProfile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub image_directory: PathBuf,
    /// Profiles to validate against; empty disables validation.
    pub validation_profiles: Vec<String>,
    pub rewrite_widths: bool,
    pub cover_filename: Option<String>,
    /// Descend into subdirectories of the image directory.
    pub recursive: bool,
    /// Added to, or replacing, the built-in profiles by name.
    pub profiles: Vec<ValidationProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_directory: PathBuf::from("images"),
            validation_profiles: Vec::new(),
            rewrite_widths: false,
            cover_filename: None,
            recursive: false,
            profiles: Vec::new(),
        }
    }
}

impl Config {
    /// Load from a JSON file. Relative image directories are resolved against
    /// the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config: Config = serde_json::from_slice(&fs::read(path)?)?;
        if config.image_directory.is_relative()
            && let Some(base) = path.parent()
        {
            config.image_directory = base.join(&config.image_directory);
        }
        config.check()?;
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn with_image_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_directory = dir.into();
        self
    }

    pub fn with_profile(mut self, name: impl Into<String>) -> Self {
        self.validation_profiles.push(name.into());
        self
    }

    pub fn with_cover(mut self, filename: impl Into<String>) -> Self {
        self.cover_filename = Some(filename.into());
        self
    }

    pub fn with_rewrite_widths(mut self, rewrite: bool) -> Self {
        self.rewrite_widths = rewrite;
        self
    }

    /// Reject values no run could use.
    pub fn check(&self) -> Result<()> {
        if let Some(p) = self.profiles.iter().find(|p| p.name.trim().is_empty()) {
            return Err(Error::InvalidConfig(format!(
                "profile with empty name (max width {})",
                p.ordinary.max_width
            )));
        }
        if self.cover_filename.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(Error::InvalidConfig("empty cover filename".into()));
        }
        Ok(())
    }

    /// Built-in profiles overlaid with configured ones.
    pub fn profile_table(&self) -> ProfileTable {
        let mut table = ProfileTable::builtin();
        for profile in &self.profiles {
            table.insert(profile.clone());
        }
        table
    }

    /// The profiles named in `validation_profiles`.
    pub fn selected_profiles(&self) -> Result<Vec<ValidationProfile>> {
        self.profile_table().select(&self.validation_profiles)
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            recursive: self.recursive,
            cover_filename: self.cover_filename.clone(),
        }
    }
}
