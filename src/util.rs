//! Media classification and header-only image measurement.

use std::path::Path;

// ============================================================================
// Media Format Detection
// ============================================================================

/// Detected media format of a file in the image directory.
///
/// Detection is done via file extension or magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    /// JPEG image
    Jpeg,
    /// PNG image
    Png,
    /// GIF image
    Gif,
    /// WebP image
    WebP,
    /// SVG image (vector)
    Svg,
    /// Anything else (stray documents, thumbnails databases, ...)
    Binary,
}

impl MediaFormat {
    /// Get the MIME type string for this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Png => "image/png",
            MediaFormat::Gif => "image/gif",
            MediaFormat::WebP => "image/webp",
            MediaFormat::Svg => "image/svg+xml",
            MediaFormat::Binary => "application/octet-stream",
        }
    }

    /// Check if this format represents an image.
    pub fn is_image(self) -> bool {
        !matches!(self, MediaFormat::Binary)
    }

    /// Check if this format has pixel dimensions in its header.
    pub fn is_raster(self) -> bool {
        matches!(
            self,
            MediaFormat::Jpeg | MediaFormat::Png | MediaFormat::Gif | MediaFormat::WebP
        )
    }
}

/// Detect media format from file name and/or leading bytes.
///
/// Tries extension-based detection first, then falls back to magic bytes so
/// that images saved without an extension are still recognized.
pub fn detect_media_format(name: &str, header: &[u8]) -> MediaFormat {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg" | "jpeg") => return MediaFormat::Jpeg,
        Some("png") => return MediaFormat::Png,
        Some("gif") => return MediaFormat::Gif,
        Some("webp") => return MediaFormat::WebP,
        Some("svg") => return MediaFormat::Svg,
        _ => {}
    }

    match header {
        [0xFF, 0xD8, ..] => MediaFormat::Jpeg,
        [0x89, b'P', b'N', b'G', ..] => MediaFormat::Png,
        [b'G', b'I', b'F', ..] => MediaFormat::Gif,
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => MediaFormat::WebP,
        _ => MediaFormat::Binary,
    }
}

/// Decide whether a directory entry is an image file.
///
/// Pure predicate over the entry name and its leading bytes; directory
/// traversal never calls the decoder on anything this rejects.
pub fn is_image_file(name: &str, header: &[u8]) -> bool {
    detect_media_format(name, header).is_image()
}

// ============================================================================
// Image Dimension Extraction
// ============================================================================

/// Extract image dimensions from the leading bytes of an image.
///
/// Supports PNG, JPEG, GIF and WebP by parsing header bytes; pixel data is
/// never decoded. Returns `(width, height)` or `None` if the format is
/// unrecognized or the header is truncated.
pub fn extract_image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    match data {
        // JPEG: walk segments up to a SOF marker
        [0xFF, 0xD8, ..] => extract_jpeg_dimensions(data),
        // GIF: logical screen width/height at bytes 6-9 (little-endian)
        [b'G', b'I', b'F', _, _, _, w0, w1, h0, h1, ..] => Some((
            u16::from_le_bytes([*w0, *w1]).into(),
            u16::from_le_bytes([*h0, *h1]).into(),
        )),
        // PNG: width/height at bytes 16-23 in the IHDR chunk
        [0x89, b'P', b'N', b'G', ..] if data.len() >= 24 => Some((
            u32::from_be_bytes(data[16..20].try_into().ok()?),
            u32::from_be_bytes(data[20..24].try_into().ok()?),
        )),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] if data.len() >= 16 => {
            extract_webp_dimensions(data)
        }
        _ => None,
    }
}

/// Extract dimensions from JPEG data by parsing SOF markers.
fn extract_jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 4 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        // SOF markers (Start of Frame) - every encoding type except DHT/JPG/DAC
        if matches!(
            marker,
            0xC0 | 0xC1
                | 0xC2
                | 0xC3
                | 0xC5
                | 0xC6
                | 0xC7
                | 0xC9
                | 0xCA
                | 0xCB
                | 0xCD
                | 0xCE
                | 0xCF
        ) && i + 9 < data.len()
        {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Some((width, height));
        }

        // Skip to next marker
        if i + 3 < data.len() {
            let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + length;
        } else {
            break;
        }
    }
    None
}

/// Extract dimensions from the first chunk of a WebP container.
fn extract_webp_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    match &data[12..16] {
        // Lossy: 3-byte frame tag, 3-byte start code, then 14-bit sizes
        b"VP8 " if data.len() >= 30 => {
            if data[23..26] != [0x9D, 0x01, 0x2A] {
                return None;
            }
            let width = u16::from_le_bytes([data[26], data[27]]) & 0x3FFF;
            let height = u16::from_le_bytes([data[28], data[29]]) & 0x3FFF;
            Some((width as u32, height as u32))
        }
        // Lossless: signature byte then packed (width-1, height-1)
        b"VP8L" if data.len() >= 25 => {
            if data[20] != 0x2F {
                return None;
            }
            let bits = u32::from_le_bytes([data[21], data[22], data[23], data[24]]);
            Some(((bits & 0x3FFF) + 1, ((bits >> 14) & 0x3FFF) + 1))
        }
        // Extended: 24-bit canvas (width-1, height-1)
        b"VP8X" if data.len() >= 30 => {
            let width = u32::from_le_bytes([data[24], data[25], data[26], 0]) + 1;
            let height = u32::from_le_bytes([data[27], data[28], data[29], 0]) + 1;
            Some((width, height))
        }
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
