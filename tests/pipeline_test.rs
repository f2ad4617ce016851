//! End-to-end tests over real image directories.
//!
//! Image files are synthesized: just enough header for dimensions, padded
//! with zeros to the requested byte size.

use std::fs;
use std::path::Path;

use plates::{
    CatalogOptions, Config, IssueKind, Limits, Outcome, SourceText, ValidationProfile,
    ViolationKind, WidthCorrections, assign_files, build_catalog, parse_markers, reconcile,
    rewrite_widths, run, validate,
};
use tempfile::TempDir;

fn jpeg(width: u16, height: u16, byte_size: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08];
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
    data.resize(byte_size.max(data.len()), 0);
    data
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 2, 0, 0, 0]);
    data
}

fn gif(width: u16, height: u16) -> Vec<u8> {
    let mut data = b"GIF89a".to_vec();
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data.extend_from_slice(&[0, 0, 0]);
    data
}

fn image_dir(files: &[(&str, Vec<u8>)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, data) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, data).unwrap();
    }
    dir
}

fn config_for(dir: &Path) -> Config {
    Config::default().with_image_directory(dir)
}

// ============================================================================
// Worked examples
// ============================================================================

#[test]
fn test_single_file_referenced_twice() {
    let dir = image_dir(&[("a.jpg", jpeg(500, 700, 50_000))]);
    let text = "Chapter 1\n\n[Illustration fn=a.jpg w=\"300\": First]\n\nLater.\n\n[Illustration fn=a.jpg: Again]\n";

    let markers = parse_markers(text).unwrap();
    let catalog = build_catalog(dir.path(), &CatalogOptions::default()).unwrap();
    let entry = catalog.get("a.jpg").unwrap();
    assert_eq!((entry.width, entry.height, entry.byte_size), (500, 700, 50_000));

    let reconciliation = reconcile(&markers, &catalog);
    assert_eq!(reconciliation.outcomes.len(), 1);
    match &reconciliation.outcomes[0] {
        Outcome::Matched { entry, references } => {
            assert_eq!(entry, "a.jpg");
            assert_eq!(references.len(), 2);
        }
        other => panic!("expected a match, got {other:?}"),
    }

    let violations = validate(&reconciliation, &catalog, &[ValidationProfile::epub()], None);
    assert!(violations.is_empty());

    let corrections = WidthCorrections::from([("a.jpg".to_string(), "500".to_string())]);
    let rewrite = rewrite_widths(text, &markers, &corrections);
    assert_eq!(rewrite.updated, vec![0, 1]);
    assert_eq!(
        rewrite.text,
        "Chapter 1\n\n[Illustration fn=a.jpg w=\"500\": First]\n\nLater.\n\n[Illustration fn=a.jpg w=500: Again]\n"
    );
    assert!(!rewrite.text.contains("300"));
}

#[test]
fn test_unused_file_without_missing() {
    let dir = image_dir(&[("b.jpg", jpeg(10, 10, 100)), ("c.jpg", jpeg(10, 10, 100))]);
    let config = config_for(dir.path());

    let output = run("[Illustration fn=b.jpg]", &config).unwrap();
    let outcomes = &output.reconciliation.outcomes;
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(&outcomes[0], Outcome::Matched { entry, .. } if entry == "b.jpg"));
    assert!(matches!(&outcomes[1], Outcome::UnusedFile { entry } if entry == "c.jpg"));
    assert_eq!(output.reconciliation.missing().count(), 0);
    assert_eq!(output.report.count(IssueKind::UnusedFile), 1);
}

#[test]
fn test_rewrite_all_three_occurrences() {
    let dir = image_dir(&[("i_001.png", png(640, 480))]);
    let config = config_for(dir.path()).with_rewrite_widths(true);
    let text = "[Illustration fn=i_001.png w=100px]\nA\n[Illustration fn=i_001.png w=200px]\nB\n[Illustration fn=i_001.png]";

    let output = run(text, &config).unwrap();
    let rewrite = output.rewrite.unwrap();
    assert_eq!(rewrite.text.matches("w=640px").count(), 3);
    assert!(!rewrite.text.contains("100px"));
    assert!(!rewrite.text.contains("200px"));
    assert!(!rewrite.text.ends_with('\n'));
}

#[test]
fn test_trailing_newline_preserved() {
    let dir = image_dir(&[("i_001.gif", gif(320, 200))]);
    let config = config_for(dir.path()).with_rewrite_widths(true);

    for text in [
        "[Illustration fn=i_001.gif w=1px]",
        "[Illustration fn=i_001.gif w=1px]\n",
        "[Illustration fn=i_001.gif w=1px]\r\n",
    ] {
        let rewritten = run(text, &config).unwrap().rewrite.unwrap().text;
        assert_eq!(
            rewritten,
            text.replace("w=1px", "w=320px"),
            "line endings changed for {text:?}"
        );
    }
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_validation_boundaries_are_inclusive() {
    let dir = image_dir(&[
        ("i_001.jpg", jpeg(800, 1280, 130_048)),
        ("i_002.jpg", jpeg(801, 1280, 1_000)),
        ("i_003.jpg", jpeg(800, 1281, 1_000)),
        ("i_004.jpg", jpeg(10, 10, 130_049)),
    ]);
    let config = config_for(dir.path()).with_profile("epub");
    let text = "[Illustration fn=i_001.jpg] [Illustration fn=i_002.jpg] [Illustration fn=i_003.jpg] [Illustration fn=i_004.jpg]";

    let output = run(text, &config).unwrap();
    let flagged: Vec<_> = output.violations.iter().map(|v| v.entry.as_str()).collect();
    assert_eq!(flagged, vec!["i_002.jpg", "i_003.jpg", "i_004.jpg"]);
    assert!(output.report.rows[0].issues.is_empty());
}

#[test]
fn test_cover_uses_its_own_limits() {
    let dir = image_dir(&[
        ("cover.jpg", jpeg(1200, 1600, 2_000)),
        ("i_001.jpg", jpeg(1200, 1600, 2_000)),
    ]);
    let small = Limits {
        max_bytes: 100_000,
        max_width: 600,
        max_height: 800,
    };
    let large = Limits {
        max_bytes: 100_000,
        max_width: 1600,
        max_height: 2400,
    };
    let mut config = config_for(dir.path())
        .with_profile("kobo")
        .with_cover("cover.jpg");
    config.profiles.push(ValidationProfile::new("kobo", small).with_cover(large));

    let output = run("[Illustration fn=cover.jpg] [Illustration fn=i_001.jpg]", &config).unwrap();
    assert!(output.violations.iter().all(|v| v.entry == "i_001.jpg"));
    assert_eq!(output.violations.len(), 2);
    assert_eq!(output.report.count(IssueKind::NamingConvention), 0);
}

#[test]
fn test_every_selected_profile_checked() {
    let dir = image_dir(&[("i_001.jpg", jpeg(1300, 100, 1_000))]);
    let config = config_for(dir.path()).with_profile("epub").with_profile("mobi");

    let output = run("[Illustration fn=i_001.jpg]", &config).unwrap();
    let flagged: Vec<_> = output
        .violations
        .iter()
        .map(|v| (v.profile.as_str(), v.kind))
        .collect();
    assert_eq!(
        flagged,
        vec![("epub", ViolationKind::Width), ("mobi", ViolationKind::Width)]
    );
    assert_eq!(output.report.rows[0].issues.len(), 2);
}

#[test]
fn test_cover_name_with_dot_slash() {
    let dir = image_dir(&[("cover.jpg", jpeg(1000, 1500, 2_000))]);
    let large = Limits {
        max_bytes: 100_000,
        max_width: 1600,
        max_height: 2400,
    };
    let small = Limits {
        max_bytes: 100_000,
        max_width: 600,
        max_height: 800,
    };
    let mut config = config_for(dir.path())
        .with_profile("kobo")
        .with_cover("./cover.jpg");
    config.profiles.push(ValidationProfile::new("kobo", small).with_cover(large));

    let output = run("[Illustration fn=cover.jpg]", &config).unwrap();
    assert!(output.violations.is_empty());
    assert_eq!(output.report.count(IssueKind::NamingConvention), 0);
}

// ============================================================================
// Catalog findings
// ============================================================================

#[test]
fn test_foreign_and_unreadable_files_reported() {
    let dir = image_dir(&[
        ("i_001.jpg", jpeg(100, 100, 500)),
        ("notes.txt", b"not an image".to_vec()),
        ("i_002.png", b"\x89PNG truncated".to_vec()),
        ("sub/i_003.jpg", jpeg(100, 100, 500)),
    ]);
    let config = config_for(dir.path());

    let output = run("[Illustration fn=i_001.jpg] [Illustration fn=i_002.png]", &config).unwrap();
    assert_eq!(output.report.count(IssueKind::ForeignFile), 2);
    assert_eq!(output.report.count(IssueKind::UnreadableImage), 1);
    assert_eq!(output.report.count(IssueKind::MissingFile), 1);
    assert!(output.report.has_errors());

    let missing = output
        .report
        .issues
        .iter()
        .find(|i| i.kind == IssueKind::MissingFile)
        .unwrap();
    assert_eq!(missing.subject, "i_002.png");
    assert!(missing.detail.contains("unreadable"));
}

#[test]
fn test_recursive_catalog_names() {
    let dir = image_dir(&[("sub/i_003.jpg", jpeg(100, 100, 500))]);
    let mut config = config_for(dir.path());
    config.recursive = true;

    let output = run("[Illustration fn=sub/i_003.jpg]", &config).unwrap();
    assert!(output.catalog.get("sub/i_003.jpg").is_some());
    assert!(!output.report.has_errors());
}

#[test]
fn test_naming_convention_is_warning() {
    let dir = image_dir(&[("Figure One.png", png(10, 10))]);
    let output = run("[Illustration fn=\"Figure One.png\"]", &config_for(dir.path())).unwrap();

    assert_eq!(output.report.count(IssueKind::NamingConvention), 1);
    assert!(!output.report.has_errors());
}

#[test]
fn test_missing_directory_is_error() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir.path().join("nope"));
    assert!(matches!(run("", &config), Err(plates::Error::Io(_))));
}

// ============================================================================
// Filename assignment
// ============================================================================

#[test]
fn test_assign_then_check() {
    let dir = image_dir(&[
        ("i_001.jpg", jpeg(600, 400, 1_000)),
        ("i_001a.jpg", jpeg(500, 400, 1_000)),
        ("i_002.png", png(300, 200)),
    ]);
    let text = "// 001.png\n[Illustration: First]\n[Illustration: Second]\n// 002.png\n[Illustration]\n// 003.png\n[Illustration: Lost]\n";
    let config = config_for(dir.path());

    let assigned = assign_files(text, &config).unwrap();
    let files: Vec<_> = assigned.assignments.iter().map(|a| a.file_name.as_str()).collect();
    assert_eq!(files, vec!["i_001.jpg", "i_001a.jpg", "i_002.png"]);
    assert_eq!(assigned.unresolved.len(), 1);
    assert_eq!(assigned.unresolved[0].line, 7);

    // The unresolved tag still has no fn=, so the assigned text is checked without it.
    let resolved = assigned.text.replace("[Illustration: Lost]", "");
    let output = run(&resolved, &config).unwrap();
    assert_eq!(output.markers.len(), 3);
    assert_eq!(output.markers[1].declared_width.as_deref(), Some("500px"));
    assert_eq!(output.report.count(IssueKind::UnusedFile), 0);
    assert_eq!(output.report.count(IssueKind::MissingFile), 0);
}

// ============================================================================
// Source text round trip
// ============================================================================

#[test]
fn test_windows_1252_document_round_trip() {
    let dir = image_dir(&[("i_001.png", png(300, 10))]);
    let work = TempDir::new().unwrap();
    let input = work.path().join("book-src.txt");
    let output_path = work.path().join("book-out.txt");

    // "Café" in windows-1252.
    fs::write(&input, b"Caf\xE9\n[Illustration fn=i_001.png w=10px: Caf\xE9 scene]\n").unwrap();

    let source = SourceText::load(&input).unwrap();
    assert_eq!(source.encoding_name(), "windows-1252");

    let config = config_for(dir.path()).with_rewrite_widths(true);
    let output = run(&source.text, &config).unwrap();
    assert_eq!(output.markers[0].caption, "Café scene");

    source.save(&output.rewrite.unwrap().text, &output_path).unwrap();
    assert_eq!(
        fs::read(&output_path).unwrap(),
        b"Caf\xE9\n[Illustration fn=i_001.png w=300px: Caf\xE9 scene]\n"
    );
}
