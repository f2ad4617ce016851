//! Illustration markers embedded in the source document.
//!
//! A marker is a bracketed directive tagged `Illustration`:
//!
//! ```text
//! // 012.png
//! [Illustration fn=i_012.jpg id=i012 w=300px alt='A ship': SOUTHAMPTON BAR
//! IN THE OLDEN TIME.]
//! ```
//!
//! - [`attrs`]: `key=value` tokenizer for the attribute section
//! - [`parser`]: depth-counting scanner producing [`IllustrationMarker`]s
//!
//! Every marker and every attribute value carries its exact byte span in the
//! original text, which is what lets [`crate::rewrite`] edit the document in
//! place without re-serializing anything it did not change.

mod attrs;
mod parser;

pub use attrs::{Attribute, tokenize_attributes};
pub use parser::{LINE_BREAK, normalize_caption, parse_markers, scan_directives};

use std::ops::Range;

/// Location of a directive in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the opening `[`.
    pub start: usize,
    /// Byte offset one past the closing `]`.
    pub end: usize,
    /// 1-based line of `start`.
    pub line: usize,
    /// 1-based column (in characters) of `start`.
    pub column: usize,
}

impl Span {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// An `[Illustration ...]` directive as scanned, before its `fn` is required.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub attributes: Vec<Attribute>,
    /// Caption with line breaks replaced by [`LINE_BREAK`].
    pub caption: String,
    pub span: Span,
    /// Byte offset just past the `[Illustration` tag.
    pub header_start: usize,
    /// Scan page from the closest preceding `// NNN.png` comment.
    pub scan_page: Option<String>,
    /// Written `*[Illustration`, i.e. placed mid-paragraph.
    pub starred: bool,
}

/// One textual occurrence of an illustration directive.
#[derive(Debug, Clone, PartialEq)]
pub struct IllustrationMarker {
    /// Explicit `id=`; the reconciler derives one from the filename otherwise.
    pub id: Option<String>,
    /// Inline image (`fn=`), never empty.
    pub filename: String,
    /// Linked full-size image (`link=`).
    pub link: Option<String>,
    /// `w=` as written, e.g. `300px` or `50%`.
    pub declared_width: Option<String>,
    /// Caption with line breaks replaced by [`LINE_BREAK`].
    pub caption: String,
    /// All attributes in source order.
    pub attributes: Vec<Attribute>,
    pub span: Span,
    /// Scan page from the closest preceding `// NNN.png` comment.
    pub scan_page: Option<String>,
}

impl IllustrationMarker {
    /// Effective attribute for `key` (the last occurrence wins).
    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().rev().find(|a| a.key == key)
    }

    /// The full directive text.
    pub fn source<'a>(&self, text: &'a str) -> &'a str {
        &text[self.span.range()]
    }
}
