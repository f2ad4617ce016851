//! Depth-counting marker scanner.
//!
//! Captions routinely contain other bracketed constructs (footnote anchors,
//! `[sic]`, even an `[Illustration ...]` quoted in an editor's note). The
//! directive terminator is therefore the `]` that brings bracket depth back
//! to zero, not the first `]` after the opening tag.

use memchr::{memchr, memchr_iter};

use super::attrs::tokenize_attributes;
use super::{Directive, IllustrationMarker, Span};
use crate::error::{Error, Result};
use crate::patterns::SCAN_PAGE_RE;

/// Explicit line-break marker substituted for newlines inside captions.
pub const LINE_BREAK: &str = "<br>";

const TAG: &[u8] = b"[Illustration";

/// Parse every illustration marker in `text`, in document order.
///
/// Fails on the first structurally invalid directive: the document cannot be
/// reasoned about past an unterminated bracket. A directive without `fn=` is
/// also an error here; [`crate::assign`] is the pass that fills those in.
pub fn parse_markers(text: &str) -> Result<Vec<IllustrationMarker>> {
    let markers = scan_directives(text)?
        .into_iter()
        .map(Directive::into_marker)
        .collect::<Result<Vec<_>>>()?;

    tracing::info!("found {} illustration markers", markers.len());
    Ok(markers)
}

/// Every `[Illustration ...]` directive in `text`, whether or not it names a file.
pub fn scan_directives(text: &str) -> Result<Vec<Directive>> {
    let bytes = text.as_bytes();
    let lines = LineIndex::new(text);
    let pages: Vec<(usize, String)> = SCAN_PAGE_RE
        .captures_iter(text)
        .filter_map(|c| Some((c.get(0)?.start(), c.get(1)?.as_str().to_string())))
        .collect();

    let mut directives = Vec::new();
    let mut pos = 0;

    while let Some(rel) = memchr(b'[', &bytes[pos..]) {
        let start = pos + rel;
        if !opens_marker(bytes, start) {
            pos = start + 1;
            continue;
        }

        let mut directive = parse_directive(text, start, &lines)?;
        let page_idx = pages.partition_point(|(offset, _)| *offset < start);
        directive.scan_page = page_idx.checked_sub(1).map(|i| pages[i].1.clone());

        tracing::debug!(
            "line {}: illustration directive (scan page {:?})",
            directive.span.line,
            directive.scan_page
        );
        pos = directive.span.end;
        directives.push(directive);
    }
    Ok(directives)
}

/// `[Illustration` followed by whitespace, `:` or `]`.
fn opens_marker(bytes: &[u8], start: usize) -> bool {
    if !bytes[start..].starts_with(TAG) {
        return false;
    }
    match bytes.get(start + TAG.len()) {
        Some(b) => b.is_ascii_whitespace() || *b == b':' || *b == b']',
        None => true,
    }
}

/// Scan one directive starting at the `[` at `start`.
fn parse_directive(text: &str, start: usize, lines: &LineIndex) -> Result<Directive> {
    let bytes = text.as_bytes();
    let header_start = start + TAG.len();

    let mut depth = 1usize;
    let mut quote: Option<(u8, usize)> = None;
    let mut caption_start: Option<usize> = None;
    let mut i = header_start;

    let end = loop {
        let Some(&b) = bytes.get(i) else {
            return Err(match quote {
                Some((_, at)) => lines.malformed(text, at, "unterminated quoted attribute value"),
                None => lines.malformed(text, start, "illustration marker is never closed"),
            });
        };

        if let Some((q, _)) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        let in_header = caption_start.is_none() && depth == 1;
        match b {
            b'"' | b'\'' if in_header && bytes[i - 1] == b'=' => quote = Some((b, i)),
            b':' if in_header => caption_start = Some(i + 1),
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    break i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    };

    let close = end - 1;
    let header_end = caption_start.map_or(close, |c| c - 1);
    let (line, column) = lines.locate(text, start);

    Ok(Directive {
        attributes: tokenize_attributes(text, header_start..header_end),
        caption: caption_start
            .map(|c| normalize_caption(&text[c..close]))
            .unwrap_or_default(),
        span: Span {
            start,
            end,
            line,
            column,
        },
        header_start,
        scan_page: None,
        starred: start > 0 && bytes[start - 1] == b'*',
    })
}

impl Directive {
    /// Non-empty value of the last `key=` attribute.
    pub fn value(&self, key: &str) -> Option<String> {
        self.attributes
            .iter()
            .rev()
            .find(|a| a.key == key)
            .map(|a| a.value.clone())
            .filter(|v| !v.is_empty())
    }

    fn into_marker(self) -> Result<IllustrationMarker> {
        let Some(filename) = self.value("fn") else {
            return Err(Error::MalformedMarker {
                offset: self.span.start,
                line: self.span.line,
                column: self.span.column,
                reason: "illustration marker has no fn attribute".to_string(),
            });
        };

        Ok(IllustrationMarker {
            id: self.value("id"),
            link: self.value("link"),
            declared_width: self.value("w"),
            filename,
            caption: self.caption,
            span: self.span,
            attributes: self.attributes,
            scan_page: self.scan_page,
        })
    }
}

/// Trim the caption and join its lines with [`LINE_BREAK`].
pub fn normalize_caption(raw: &str) -> String {
    raw.trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

/// Byte offsets of line starts, for error and span locations.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(memchr_iter(b'\n', text.as_bytes()).map(|i| i + 1));
        Self { starts }
    }

    fn locate(&self, text: &str, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&s| s <= offset);
        let line_start = self.starts[line - 1];
        let column = text[line_start..offset].chars().count() + 1;
        (line, column)
    }

    fn malformed(&self, text: &str, offset: usize, reason: &str) -> Error {
        let (line, column) = self.locate(text, offset);
        Error::MalformedMarker {
            offset,
            line,
            column,
            reason: reason.to_string(),
        }
    }
}
