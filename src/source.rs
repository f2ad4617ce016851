//! Document text loading and re-encoding.
//!
//! Older transcriptions are frequently Latin-1/Windows-1252 rather than UTF-8.
//! A [`SourceText`] remembers which encoding (and BOM) it was decoded from so
//! that a rewritten document is written back byte-compatible with the input.

use std::fs;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::Result;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decoded document text plus what is needed to encode it back.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub text: String,
    encoding: &'static Encoding,
    bom: bool,
}

impl SourceText {
    /// Wrap text that is already in memory; it is written back as UTF-8.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            encoding: UTF_8,
            bom: false,
        }
    }

    /// Decode raw bytes.
    ///
    /// 1. Strips and remembers a UTF-8 BOM
    /// 2. Tries strict UTF-8
    /// 3. Falls back to Windows-1252 (superset of ISO-8859-1)
    pub fn decode(bytes: &[u8]) -> Self {
        let (body, bom) = match bytes.strip_prefix(UTF8_BOM) {
            Some(rest) => (rest, true),
            None => (bytes, false),
        };

        if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(body) {
            return Self {
                text: text.into_owned(),
                encoding: UTF_8,
                bom,
            };
        }

        tracing::debug!("document is not valid UTF-8, decoding as windows-1252");
        let (text, _) = WINDOWS_1252.decode_without_bom_handling(body);
        Self {
            text: text.into_owned(),
            encoding: WINDOWS_1252,
            bom: false,
        }
    }

    /// Read and decode a document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self::decode(&bytes))
    }

    /// Name of the encoding the text was decoded from.
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Encode `text` the same way the original bytes were encoded.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() + UTF8_BOM.len());
        if self.bom {
            out.extend_from_slice(UTF8_BOM);
        }
        let (bytes, _, _) = self.encoding.encode(text);
        out.extend_from_slice(&bytes);
        out
    }

    /// Encode `text` and write it to `path`.
    pub fn save(&self, text: &str, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.encode(text))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        let source = SourceText::decode("caf\u{e9}\n".as_bytes());
        assert_eq!(source.text, "caf\u{e9}\n");
        assert_eq!(source.encoding_name(), "UTF-8");
    }

    #[test]
    fn test_bom_stripped_and_restored() {
        let bytes = b"\xEF\xBB\xBF[Illustration fn=a.jpg]";
        let source = SourceText::decode(bytes);
        assert_eq!(source.text, "[Illustration fn=a.jpg]");
        assert_eq!(source.encode(&source.text), bytes.to_vec());
    }

    #[test]
    fn test_latin1_fallback_round_trip() {
        let bytes = b"Caf\xE9 [Illustration fn=a.jpg]";
        let source = SourceText::decode(bytes);
        assert_eq!(source.text, "Caf\u{e9} [Illustration fn=a.jpg]");
        assert_eq!(source.encoding_name(), "windows-1252");
        assert_eq!(source.encode(&source.text), bytes.to_vec());
    }
}
