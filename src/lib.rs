//! # plates
//!
//! Reconcile illustration markup in a book's source text with the image files
//! that implement it, and check those images against ebook format limits.
//!
//! ## Features
//!
//! - Parse `[Illustration fn=... w=...: caption]` markers, including captions
//!   that contain their own bracketed constructs
//! - Inventory an image directory without decoding pixel data
//! - Report missing, unused and foreign files and duplicate ids
//! - Validate byte size and dimensions against EPUB/MOBI profiles
//! - Rewrite `w=` attributes to the real image widths, at every occurrence
//! - Fill in `fn=` for bare `[Illustration: caption]` tags from the scan page
//!
//! ## Quick Start
//!
//! ```no_run
//! use plates::{Config, SourceText, run};
//!
//! let source = SourceText::load("book-src.txt").unwrap();
//! let config = Config::default()
//!     .with_image_directory("images")
//!     .with_profile("epub");
//!
//! let output = run(&source.text, &config).unwrap();
//! for issue in &output.report.issues {
//!     println!("{}: {}", issue.subject, issue.detail);
//! }
//! ```
//!
//! ## Working with the stages
//!
//! Every stage is a plain function over plain values:
//!
//! ```
//! use plates::{Catalog, ImageCatalogEntry, parse_markers, reconcile, rewrite_widths, width_corrections};
//!
//! let text = "[Illustration fn=a.jpg w=300px]\n[Illustration fn=a.jpg]";
//! let markers = parse_markers(text).unwrap();
//! let catalog = Catalog::from_entries([ImageCatalogEntry::new("a.jpg", 500, 700, 50_000)]);
//!
//! let reconciliation = reconcile(&markers, &catalog);
//! let corrections = width_corrections(&reconciliation, &catalog);
//! let rewrite = rewrite_widths(text, &markers, &corrections);
//!
//! assert_eq!(rewrite.text, "[Illustration fn=a.jpg w=500px]\n[Illustration fn=a.jpg w=500px]");
//! ```

pub mod assign;
pub mod catalog;
pub mod config;
pub mod error;
pub mod marker;
pub mod pipeline;
pub mod profile;
pub mod reconcile;
pub mod report;
pub mod rewrite;
pub mod source;
pub mod validate;
pub mod widths;
pub(crate) mod patterns;
pub mod util;

pub use assign::{Assigned, Assignment, assign_filenames};
pub use catalog::{Catalog, CatalogOptions, ImageCatalogEntry, build_catalog};
pub use config::Config;
pub use error::{Error, Result};
pub use marker::{IllustrationMarker, Span, parse_markers};
pub use pipeline::{RunOutput, WidthChange, assign_files, run, run_with_catalog};
pub use profile::{ImageRole, Limits, ProfileTable, ValidationProfile};
pub use reconcile::{Outcome, Reconciliation, Reference, ReferenceRole, reconcile};
pub use report::{Issue, IssueKind, Report, ReportRow, build_report};
pub use rewrite::{Rewrite, WidthCorrections, rewrite_widths, width_corrections};
pub use source::SourceText;
pub use validate::{ValidationIssue, ViolationKind, validate};
pub use widths::{WidthTable, target_widths};
