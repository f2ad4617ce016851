//! Attribute tokenizer for the directive header.
//!
//! Accepts the three forms used in the wild:
//!
//! ```text
//! arg="val"
//! arg='val'
//! arg=val
//! ```

use std::ops::Range;

/// A `key=value` attribute with absolute byte spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
    /// The whole `key=value` token, quotes included.
    pub token: Range<usize>,
    /// The value alone, inside any quotes.
    pub value_span: Range<usize>,
}

/// Split `text[range]` into attributes.
///
/// Spans are absolute offsets into `text`. Bare words without `=` are
/// skipped. An unterminated quote runs to the end of the range; the marker
/// scanner rejects those before calling this.
pub fn tokenize_attributes(text: &str, range: Range<usize>) -> Vec<Attribute> {
    let bytes = text.as_bytes();
    let end = range.end;
    let mut pos = range.start;
    let mut attributes = Vec::new();

    while pos < end {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let token_start = pos;
        while pos < end && bytes[pos] != b'=' && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        if pos >= end || bytes[pos] != b'=' {
            tracing::debug!("ignoring bare word {:?} in marker", &text[token_start..pos]);
            continue;
        }

        let key = &text[token_start..pos];
        pos += 1; // '='

        let (value_span, token_end) = match bytes.get(pos) {
            Some(&(q @ (b'"' | b'\''))) if pos < end => {
                let value_start = pos + 1;
                let value_end = bytes[value_start..end]
                    .iter()
                    .position(|&b| b == q)
                    .map_or(end, |p| value_start + p);
                (value_start..value_end, (value_end + 1).min(end))
            }
            _ => {
                let value_start = pos;
                let mut value_end = pos;
                while value_end < end && !bytes[value_end].is_ascii_whitespace() {
                    value_end += 1;
                }
                (value_start..value_end, value_end)
            }
        };

        if key.is_empty() {
            tracing::debug!("ignoring attribute without a name");
        } else {
            attributes.push(Attribute {
                key: key.to_string(),
                value: text[value_span.clone()].to_string(),
                token: token_start..token_end,
                value_span,
            });
        }
        pos = token_end;
    }

    attributes
}
