//! Output-format size ceilings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which ceiling set applies to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageRole {
    Ordinary,
    Cover,
}

/// Inclusive upper bounds for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub max_bytes: u64,
    pub max_width: u32,
    pub max_height: u32,
}

/// A named set of ceilings for a target publishing format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationProfile {
    pub name: String,
    pub ordinary: Limits,
    /// Defaults to the ordinary limits when omitted from configuration.
    #[serde(default)]
    pub cover: Option<Limits>,
}

impl ValidationProfile {
    pub fn new(name: impl Into<String>, ordinary: Limits) -> Self {
        Self {
            name: name.into(),
            ordinary,
            cover: None,
        }
    }

    pub fn with_cover(mut self, cover: Limits) -> Self {
        self.cover = Some(cover);
        self
    }

    pub fn limits_for(&self, role: ImageRole) -> Limits {
        match role {
            ImageRole::Ordinary => self.ordinary,
            ImageRole::Cover => self.cover.unwrap_or(self.ordinary),
        }
    }

    /// EPUB: 127 KiB, 800x1280.
    pub fn epub() -> Self {
        let limits = Limits {
            max_bytes: 130_048,
            max_width: 800,
            max_height: 1280,
        };
        Self::new("epub", limits).with_cover(limits)
    }

    /// MOBI/KF8: 127 KiB, 1200x1920.
    pub fn mobi() -> Self {
        let limits = Limits {
            max_bytes: 130_048,
            max_width: 1200,
            max_height: 1920,
        };
        Self::new("mobi", limits).with_cover(limits)
    }
}

/// Profiles by name. Starts with the built-in `epub` and `mobi` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileTable {
    profiles: BTreeMap<String, ValidationProfile>,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileTable {
    pub fn builtin() -> Self {
        let mut table = Self {
            profiles: BTreeMap::new(),
        };
        table.insert(ValidationProfile::epub());
        table.insert(ValidationProfile::mobi());
        table
    }

    /// Add a profile, replacing any existing one with the same name.
    pub fn insert(&mut self, profile: ValidationProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn get(&self, name: &str) -> Option<&ValidationProfile> {
        self.profiles.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Resolve profile names, failing on the first unknown one.
    pub fn select(&self, names: &[String]) -> Result<Vec<ValidationProfile>> {
        names
            .iter()
            .map(|name| {
                self.get(name).cloned().ok_or_else(|| {
                    let known: Vec<_> = self.names().collect();
                    tracing::error!("unknown profile '{name}' (known: {})", known.join(", "));
                    Error::UnknownProfile(name.clone())
                })
            })
            .collect()
    }
}
