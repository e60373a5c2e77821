//! Extraction of Drive object ids from share and content links.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{DriveError, Result};

/// `https://drive.google.com/file/d/<ID>/view`
static FILE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://drive\.google\.com/file/d/([a-zA-Z0-9_-]+)")
        .expect("Invalid file URL regex")
});

/// `open?id=<ID>`, `uc?id=<ID>` and `uc?export=download&id=<ID>`.
static QUERY_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:drive|docs)\.google\.com/(?:open|uc)\?(?:[^#]*&)?id=([a-zA-Z0-9_-]+)")
        .expect("Invalid query id regex")
});

static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid ID regex"));

/// Whether `id` is a bare Drive object id, safe to place in a URL path.
pub fn is_valid_id(id: &str) -> bool {
    ID_REGEX.is_match(id)
}

/// Extract an object id from a Drive URL or validate a raw id.
///
/// Content links produced by uploads (`https://drive.google.com/uc?id=<ID>`)
/// are accepted, so an upload result can be fed straight back into a get.
///
/// ```
/// use drive_facade::url_parser::extract_id;
///
/// let id = extract_id("https://drive.google.com/uc?id=1abc123").unwrap();
/// assert_eq!(id, "1abc123");
///
/// let id = extract_id("1abc123").unwrap();
/// assert_eq!(id, "1abc123");
/// ```
pub fn extract_id(url_or_id: &str) -> Result<String> {
    let trimmed = url_or_id.trim();

    for regex in [&*FILE_URL_REGEX, &*QUERY_ID_REGEX] {
        if let Some(id) = regex.captures(trimmed).and_then(|c| c.get(1)) {
            return Ok(id.as_str().to_string());
        }
    }

    if is_valid_id(trimmed) {
        return Ok(trimmed.to_string());
    }

    Err(DriveError::InvalidUrlOrId(url_or_id.to_string()))
}
