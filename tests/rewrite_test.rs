//! Width rewriting over whole documents.

use plates::{WidthCorrections, parse_markers, rewrite_widths};
use proptest::prelude::*;

/// Text between and around markers, in order.
fn gaps(text: &str) -> Vec<String> {
    let markers = parse_markers(text).unwrap();
    let mut gaps = Vec::new();
    let mut last = 0;
    for marker in &markers {
        gaps.push(text[last..marker.span.start].to_string());
        last = marker.span.end;
    }
    gaps.push(text[last..].to_string());
    gaps
}

#[test]
fn test_mixed_files_and_forms() {
    let text = "\
// 001.png\r
[Illustration fn=i_001.jpg w='40%' ew=25%: One]\r
[Illustration fn=./i_002.jpg]\r
[Illustration fn=i_003.jpg w=10px]\r
";
    let markers = parse_markers(text).unwrap();
    let corrections = WidthCorrections::from([
        ("i_001.jpg".to_string(), "640px".to_string()),
        ("i_002.jpg".to_string(), "320px".to_string()),
    ]);
    let rewrite = rewrite_widths(text, &markers, &corrections);

    assert_eq!(
        rewrite.text,
        "\
// 001.png\r
[Illustration fn=i_001.jpg w='640px' ew=25%: One]\r
[Illustration fn=./i_002.jpg w=320px]\r
[Illustration fn=i_003.jpg w=10px]\r
"
    );
    assert_eq!(rewrite.updated, vec![0, 1]);
}

fn document() -> impl Strategy<Value = String> {
    let width = prop_oneof![
        Just(String::new()),
        "[1-9][0-9]{0,3}px".prop_map(|w| format!(" w={w}")),
        "[1-9][0-9]?%".prop_map(|w| format!(" w={w}")),
        "[1-9][0-9]{0,3}".prop_map(|w| format!(" w=\"{w}\"")),
    ];
    let marker = ("[a-c]\\.jpg", width, "[a-z ]{0,12}")
        .prop_map(|(file, w, caption)| format!("[Illustration fn={file}{w}: {caption}]"));
    prop::collection::vec(("[a-zA-Z .\r\n]{0,30}", marker), 0..10).prop_flat_map(|parts| {
        "[a-zA-Z .\r\n]{0,30}".prop_map(move |tail| {
            let mut text: String = parts.iter().map(|(gap, m)| format!("{gap}{m}")).collect();
            text.push_str(&tail);
            text
        })
    })
}

proptest! {
    #[test]
    fn prop_text_outside_markers_preserved(text in document()) {
        let markers = parse_markers(&text).unwrap();
        let corrections = WidthCorrections::from([
            ("a.jpg".to_string(), "111px".to_string()),
            ("b.jpg".to_string(), "222px".to_string()),
        ]);
        let rewrite = rewrite_widths(&text, &markers, &corrections);

        prop_assert_eq!(gaps(&rewrite.text), gaps(&text));

        let rewritten = parse_markers(&rewrite.text).unwrap();
        prop_assert_eq!(rewritten.len(), markers.len());
        for (before, after) in markers.iter().zip(&rewritten) {
            prop_assert_eq!(&before.filename, &after.filename);
            prop_assert_eq!(&before.caption, &after.caption);
            match corrections.get(&after.filename) {
                Some(width) => prop_assert_eq!(after.declared_width.as_ref(), Some(width)),
                None => prop_assert_eq!(&after.declared_width, &before.declared_width),
            }
        }

        let again = rewrite_widths(&rewrite.text, &rewritten, &corrections);
        prop_assert!(again.is_unchanged());
        prop_assert_eq!(again.text, rewrite.text);
    }
}
