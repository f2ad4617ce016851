//! Cached regex patterns.
//!
//! Uses LazyLock to compile patterns once on first use.

use regex_lite::Regex;
use std::sync::LazyLock;

/// Matches scan-page comment lines such as `// 012.png`
pub static SCAN_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^// (\d+)\.(?:png|jpg|jpeg)").unwrap()
});

/// Matches the expected illustration file naming convention (`i_001.jpg`, `i_0012b.png`)
pub static ILLUSTRATION_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^i_\d{3,4}[a-z]?\.[A-Za-z]+$").unwrap()
});

/// Matches a percentage width such as `50%` or `62.5%`
pub static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*%\s*$").unwrap()
});
