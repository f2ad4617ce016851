//! Image directory inventory.
//!
//! Every directory entry is classified before anything tries to measure it:
//! subdirectories and non-image files are recorded as [`ExcludedEntry`]s,
//! images are measured from their header bytes, and images whose header
//! cannot be measured become [`UnreadableImage`]s. Only the latter two steps
//! touch file contents, and neither decodes pixel data.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::patterns::ILLUSTRATION_NAME_RE;
use crate::reconcile::normalize_reference;
use crate::util::{MediaFormat, detect_media_format, extract_image_dimensions, is_image_file};

/// Bytes read to classify and measure a file. Large enough for JPEGs with a
/// full EXIF/ICC segment ahead of the frame header.
pub const HEADER_LEN: u64 = 64 * 1024;

/// One measured image file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCatalogEntry {
    /// Path relative to the image directory, `/`-separated. Unique.
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub format: MediaFormat,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExcludedKind {
    Directory,
    NotImage,
}

/// A directory entry that is never matched against markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedEntry {
    pub name: String,
    pub kind: ExcludedKind,
}

/// A file that passed [`is_image_file`] but could not be measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreadableImage {
    pub name: String,
    pub reason: String,
}

/// Options for [`build_catalog`].
#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    /// Descend into subdirectories instead of excluding them.
    pub recursive: bool,
    /// Exempt from the naming-convention check.
    pub cover_filename: Option<String>,
}

/// Inventory of an image directory.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub entries: BTreeMap<String, ImageCatalogEntry>,
    pub excluded: Vec<ExcludedEntry>,
    pub unreadable: Vec<UnreadableImage>,
    /// Images not named `i_NNN[a-z].ext`.
    pub naming_warnings: Vec<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already measured entries.
    pub fn from_entries(entries: impl IntoIterator<Item = ImageCatalogEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.name.clone(), e)).collect(),
            ..Default::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&ImageCatalogEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Why `name` is present on disk but not in the catalog, if it is.
    pub fn rejection(&self, name: &str) -> Option<String> {
        if let Some(u) = self.unreadable.iter().find(|u| u.name == name) {
            return Some(format!("file exists but is unreadable: {}", u.reason));
        }
        self.excluded
            .iter()
            .find(|e| e.name == name)
            .map(|e| match e.kind {
                ExcludedKind::Directory => "path is a directory".to_string(),
                ExcludedKind::NotImage => "file exists but is not an image".to_string(),
            })
    }
}

impl ImageCatalogEntry {
    pub fn new(name: impl Into<String>, width: u32, height: u32, byte_size: u64) -> Self {
        let name = name.into();
        Self {
            format: detect_media_format(&name, &[]),
            path: PathBuf::from(&name),
            name,
            width,
            height,
            byte_size,
        }
    }
}

/// Inventory `dir`.
///
/// Only failing to list a directory is an error; per-file problems are
/// collected into the catalog.
pub fn build_catalog(dir: impl AsRef<Path>, options: &CatalogOptions) -> Result<Catalog> {
    let dir = dir.as_ref();
    tracing::info!("taking inventory of {}", dir.display());

    let mut catalog = Catalog::new();
    scan_dir(dir, "", options, &mut catalog)?;

    tracing::info!(
        "found {} images ({} excluded, {} unreadable)",
        catalog.entries.len(),
        catalog.excluded.len(),
        catalog.unreadable.len()
    );
    Ok(catalog)
}

fn scan_dir(dir: &Path, prefix: &str, options: &CatalogOptions, catalog: &mut Catalog) -> Result<()> {
    let mut children: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    children.sort_by_key(|e| e.file_name());

    for child in children {
        let file_name = child.file_name().to_string_lossy().into_owned();
        let name = format!("{prefix}{file_name}");
        let path = child.path();
        let file_type = child.file_type()?;

        // Symlinked directories are listed, never followed.
        if file_type.is_symlink() && path.is_dir() {
            tracing::debug!("skipping symlinked directory {name}");
            catalog.excluded.push(ExcludedEntry {
                name,
                kind: ExcludedKind::Directory,
            });
            continue;
        }

        if file_type.is_dir() {
            if options.recursive {
                scan_dir(&path, &format!("{name}/"), options, catalog)?;
            } else {
                tracing::debug!("skipping subdirectory {name}");
                catalog.excluded.push(ExcludedEntry {
                    name,
                    kind: ExcludedKind::Directory,
                });
            }
            continue;
        }

        match measure(&path, &name) {
            Measured::Image(entry) => {
                tracing::debug!(
                    "found image {} {}x{} {} bytes",
                    entry.name,
                    entry.width,
                    entry.height,
                    entry.byte_size
                );
                let is_cover = options
                    .cover_filename
                    .as_deref()
                    .is_some_and(|cover| normalize_reference(cover) == name);
                if !is_cover && !ILLUSTRATION_NAME_RE.is_match(&file_name) {
                    tracing::warn!(
                        "file '{name}' does not match expected naming convention (i_001, i_001a)"
                    );
                    catalog.naming_warnings.push(name.clone());
                }
                catalog.entries.insert(name, entry);
            }
            Measured::NotImage => {
                tracing::debug!("ignoring non-image file {name}");
                catalog.excluded.push(ExcludedEntry {
                    name,
                    kind: ExcludedKind::NotImage,
                });
            }
            Measured::Unreadable(reason) => {
                tracing::warn!("error loading '{name}': {reason} ... skipping");
                catalog.unreadable.push(UnreadableImage { name, reason });
            }
        }
    }
    Ok(())
}

enum Measured {
    Image(ImageCatalogEntry),
    NotImage,
    Unreadable(String),
}

fn measure(path: &Path, name: &str) -> Measured {
    let (header, byte_size) = match read_header(path) {
        Ok(read) => read,
        Err(e) if is_image_file(name, &[]) => return Measured::Unreadable(e.to_string()),
        Err(_) => return Measured::NotImage,
    };

    if !is_image_file(name, &header) {
        return Measured::NotImage;
    }

    let format = detect_media_format(name, &header);
    if !format.is_raster() {
        return Measured::Unreadable(format!(
            "{} has no pixel dimensions",
            format.mime_type()
        ));
    }

    let mut dimensions = extract_image_dimensions(&header);
    if dimensions.is_none() && byte_size > header.len() as u64 {
        dimensions = fs::read(path)
            .ok()
            .and_then(|data| extract_image_dimensions(&data));
    }

    match dimensions {
        Some((width, height)) => Measured::Image(ImageCatalogEntry {
            name: name.to_string(),
            path: path.to_path_buf(),
            format,
            width,
            height,
            byte_size,
        }),
        None => Measured::Unreadable(format!("cannot read {} header", format.mime_type())),
    }
}

fn read_header(path: &Path) -> std::io::Result<(Vec<u8>, u64)> {
    let file = File::open(path)?;
    let byte_size = file.metadata()?.len();
    let mut header = Vec::with_capacity(byte_size.min(HEADER_LEN) as usize);
    file.take(HEADER_LEN).read_to_end(&mut header)?;
    Ok((header, byte_size))
}
